use super::checks::{RelationOutcome, Verdict, verify_all};
use super::compare::ValueMatch;
use super::report::render_markdown;
use crate::relation::{self, ColumnKind, MIGRATION_ORDER, Relation};
use crate::store::{SqliteStore, Store};
use crate::value::{Cell, TableData};

fn seeded(rows: usize) -> SqliteStore {
    let mut store = SqliteStore::in_memory().expect("in-memory DB should open");
    store.bootstrap(&MIGRATION_ORDER).expect("bootstrap");
    for relation in MIGRATION_ORDER {
        store
            .replace_table(relation.name, &relation.sample_data(rows))
            .expect("seed relation");
    }
    store
}

fn real_position(relation: &Relation) -> usize {
    relation
        .columns
        .iter()
        .position(|column| column.kind == ColumnKind::Real)
        .expect("relation has a real column")
}

fn nudge_reals(relation: &Relation, rows: usize, delta: f64) -> TableData {
    let position = real_position(relation);
    let mut data = relation.sample_data(rows);
    for row in &mut data.rows {
        if let Cell::Real(value) = row[position] {
            row[position] = Cell::Real(value + delta);
        }
    }
    data
}

fn values_of(report: &super::checks::VerificationReport, relation: &str) -> ValueMatch {
    let entry = report
        .relations
        .iter()
        .find(|entry| entry.relation == relation)
        .expect("relation verified");
    match &entry.outcome {
        RelationOutcome::Checked(checks) => checks.values.clone(),
        RelationOutcome::Error { reason } => panic!("{relation} errored: {reason}"),
    }
}

#[test]
fn identical_engines_pass_exactly() {
    let mut source = seeded(6);
    let mut destination = seeded(6);

    let report = verify_all(&mut source, &mut destination, &MIGRATION_ORDER);

    assert_eq!(report.verdict, Verdict::Pass);
    for relation in MIGRATION_ORDER {
        assert_eq!(values_of(&report, relation.name), ValueMatch::Exact);
    }
    assert!(render_markdown(&report).ends_with("# OVERALL VERIFICATION: PASS"));
}

#[test]
fn empty_relations_are_skipped_and_pass() {
    let mut source = SqliteStore::in_memory().expect("in-memory DB should open");
    source.bootstrap(&MIGRATION_ORDER).expect("bootstrap");
    let mut destination = SqliteStore::in_memory().expect("in-memory DB should open");
    destination.bootstrap(&MIGRATION_ORDER).expect("bootstrap");

    let report = verify_all(&mut source, &mut destination, &MIGRATION_ORDER);

    assert_eq!(report.verdict, Verdict::Pass);
    assert_eq!(values_of(&report, "map_user"), ValueMatch::SkippedEmpty);
    assert!(render_markdown(&report).contains("- **Data Integrity**: SKIPPED (Empty Table)"));
}

#[test]
fn tiny_float_drift_passes_on_rounded_tier() {
    let relation = &relation::AGGREGATED_USER_DEVICE;
    let mut source = seeded(4);
    let mut destination = seeded(4);
    destination
        .replace_table(relation.name, &nudge_reals(relation, 4, 0.00001))
        .expect("replace");

    let report = verify_all(&mut source, &mut destination, &MIGRATION_ORDER);

    assert_eq!(
        values_of(&report, relation.name),
        ValueMatch::Rounded { exact_matched: 0 }
    );
    assert_eq!(report.verdict, Verdict::Pass);
    let markdown = render_markdown(&report);
    assert!(markdown.contains("- **Data Integrity (Rounded Float Match)**: PASS"));
    assert!(markdown.contains("# OVERALL VERIFICATION: PASS"));
}

#[test]
fn large_float_drift_fails_with_fraction() {
    let relation = &relation::MAP_MAP;
    let mut source = seeded(5);
    let mut destination = seeded(5);
    let mut drifted = relation.sample_data(5);
    let position = real_position(relation);
    drifted.rows[2][position] = Cell::Real(1.0e6);
    destination
        .replace_table(relation.name, &drifted)
        .expect("replace");

    let report = verify_all(&mut source, &mut destination, &MIGRATION_ORDER);

    assert_eq!(
        values_of(&report, relation.name),
        ValueMatch::Mismatch {
            matched: 4,
            total: 5
        }
    );
    assert_eq!(report.verdict, Verdict::Fail);
    assert!(render_markdown(&report).contains("Matched 4/5."));
}

#[test]
fn row_count_shortfall_fails() {
    let mut source = seeded(3);
    let mut destination = seeded(3);
    destination
        .replace_table("top_map", &relation::TOP_MAP.sample_data(2))
        .expect("replace");

    let report = verify_all(&mut source, &mut destination, &MIGRATION_ORDER);

    assert_eq!(report.verdict, Verdict::Fail);
    let markdown = render_markdown(&report);
    assert!(markdown.contains("- **Row Count**: FAIL (Source: 3, Destination: 2)"));
    assert!(markdown.ends_with("# OVERALL VERIFICATION: FAIL"));
}

#[test]
fn column_order_does_not_matter() {
    let relation = &relation::TOP_USER;
    let mut source = seeded(3);

    let mut destination = SqliteStore::in_memory().expect("in-memory DB should open");
    destination
        .connection()
        .execute_batch(
            "CREATE TABLE top_user (registered_users INTEGER, quarter INTEGER, year INTEGER, \
             pincode TEXT, state TEXT)",
        )
        .expect("reordered table");
    destination.bootstrap(&MIGRATION_ORDER).expect("bootstrap");
    for other in MIGRATION_ORDER {
        destination
            .replace_table(other.name, &other.sample_data(3))
            .expect("seed");
    }

    let report = verify_all(&mut source, &mut destination, &MIGRATION_ORDER);

    assert_eq!(values_of(&report, relation.name), ValueMatch::Exact);
    assert_eq!(report.verdict, Verdict::Pass);
}

#[test]
fn unreadable_relation_is_an_error_and_others_continue() {
    let mut source = seeded(2);
    let mut destination = SqliteStore::in_memory().expect("in-memory DB should open");
    destination
        .bootstrap(&MIGRATION_ORDER[..9])
        .expect("bootstrap all but top_user");
    for relation in &MIGRATION_ORDER[..9] {
        destination
            .replace_table(relation.name, &relation.sample_data(2))
            .expect("seed");
    }

    let report = verify_all(&mut source, &mut destination, &MIGRATION_ORDER);

    assert_eq!(report.relations.len(), 10);
    assert_eq!(report.verdict, Verdict::Fail);
    assert!(matches!(
        report.relations[9].outcome,
        RelationOutcome::Error { .. }
    ));
    assert_eq!(values_of(&report, "top_map"), ValueMatch::Exact);
    assert!(render_markdown(&report).contains("## Table: top_user\n- **Verification**: ERROR ("));
}

#[test]
fn differing_columns_fail_schema_check() {
    let mut source = seeded(2);
    let mut destination = SqliteStore::in_memory().expect("in-memory DB should open");
    destination
        .connection()
        .execute_batch(
            "CREATE TABLE top_user (state TEXT, pincode TEXT, year INTEGER, quarter INTEGER, \
             registered_users INTEGER, app_opens INTEGER)",
        )
        .expect("wider table");
    destination.bootstrap(&MIGRATION_ORDER).expect("bootstrap");

    let report = verify_all(&mut source, &mut destination, &MIGRATION_ORDER);

    assert_eq!(values_of(&report, "top_user"), ValueMatch::Incomparable);
    let markdown = render_markdown(&report);
    assert!(markdown.contains("- **Schema (Columns)**: FAIL"));
    assert!(markdown.contains("'app_opens'"));
}
