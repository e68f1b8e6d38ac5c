use super::copy::{MigrationState, migrate_all};
use crate::config::EngineKind;
use crate::error::PipelineResult;
use crate::model::MigrationStatus;
use crate::relation::{self, MIGRATION_ORDER, Relation};
use crate::store::{SqliteStore, Store};
use crate::value::TableData;

/// Reports one relation's destination count one short of what was written.
struct UndercountingStore {
    inner: SqliteStore,
    table: &'static str,
    replaced: Vec<String>,
}

impl Store for UndercountingStore {
    fn kind(&self) -> EngineKind {
        self.inner.kind()
    }

    fn location(&self) -> String {
        "undercounting".to_string()
    }

    fn bootstrap(&mut self, relations: &[&Relation]) -> PipelineResult<()> {
        self.inner.bootstrap(relations)
    }

    fn table_exists(&mut self, table: &str) -> PipelineResult<bool> {
        self.inner.table_exists(table)
    }

    fn column_names(&mut self, table: &str) -> PipelineResult<Vec<String>> {
        self.inner.column_names(table)
    }

    fn count_rows(&mut self, table: &str) -> PipelineResult<u64> {
        let count = self.inner.count_rows(table)?;
        if table == self.table {
            return Ok(count.saturating_sub(1));
        }
        Ok(count)
    }

    fn read_table(&mut self, table: &str) -> PipelineResult<TableData> {
        self.inner.read_table(table)
    }

    fn replace_table(&mut self, table: &str, data: &TableData) -> PipelineResult<u64> {
        self.replaced.push(table.to_string());
        self.inner.replace_table(table, data)
    }
}

fn seeded_source(rows: usize) -> SqliteStore {
    let mut store = SqliteStore::in_memory().expect("in-memory DB should open");
    store.bootstrap(&MIGRATION_ORDER).expect("bootstrap");
    for relation in MIGRATION_ORDER {
        store
            .replace_table(relation.name, &relation.sample_data(rows))
            .expect("seed relation");
    }
    store
}

fn empty_destination() -> SqliteStore {
    let mut store = SqliteStore::in_memory().expect("in-memory DB should open");
    store.bootstrap(&MIGRATION_ORDER).expect("bootstrap");
    store
}

#[test]
fn migrates_every_relation_in_order() {
    let mut source = seeded_source(3);
    let mut destination = empty_destination();

    let report = migrate_all(&mut source, &mut destination, &MIGRATION_ORDER);

    assert_eq!(report.state, MigrationState::Migrated);
    assert_eq!(report.succeeded(), 10);
    let order = report
        .relations
        .iter()
        .map(|relation| relation.relation.as_str())
        .collect::<Vec<_>>();
    assert_eq!(order.first(), Some(&"aggregated_insurance"));
    assert_eq!(order.last(), Some(&"top_user"));

    for relation in MIGRATION_ORDER {
        assert_eq!(
            source.read_table(relation.name).expect("source"),
            destination.read_table(relation.name).expect("destination"),
            "{} differs after migration",
            relation.name
        );
    }
}

#[test]
fn rerunning_migration_does_not_duplicate_rows() {
    let mut source = seeded_source(4);
    let mut destination = empty_destination();

    migrate_all(&mut source, &mut destination, &MIGRATION_ORDER);
    let report = migrate_all(&mut source, &mut destination, &MIGRATION_ORDER);

    assert_eq!(report.state, MigrationState::Migrated);
    assert_eq!(destination.count_rows("map_user").expect("count"), 4);
}

#[test]
fn count_mismatch_on_top_user_aborts() {
    let mut source = SqliteStore::in_memory().expect("in-memory DB should open");
    source.bootstrap(&MIGRATION_ORDER).expect("bootstrap");
    source
        .replace_table("top_user", &relation::TOP_USER.sample_data(1000))
        .expect("seed top_user");

    let mut destination = UndercountingStore {
        inner: empty_destination(),
        table: "top_user",
        replaced: Vec::new(),
    };
    let report = migrate_all(&mut source, &mut destination, &MIGRATION_ORDER);

    let MigrationState::Aborted { relation, reason } = &report.state else {
        panic!("expected abort, got {}", report.state);
    };
    assert_eq!(relation, "top_user");
    assert!(reason.contains("source=1000"));
    assert!(reason.contains("destination=999"));

    let failed = report.relations.last().expect("top_user entry");
    assert_eq!(failed.relation, "top_user");
    assert_eq!(failed.status, MigrationStatus::Failed);
    assert_eq!(report.succeeded(), 9);
}

#[test]
fn mismatch_stops_before_later_relations() {
    let mut source = seeded_source(5);
    let mut destination = UndercountingStore {
        inner: empty_destination(),
        table: "map_map",
        replaced: Vec::new(),
    };

    let report = migrate_all(&mut source, &mut destination, &MIGRATION_ORDER);

    assert_eq!(report.state.to_string(), "ABORTED");
    assert_eq!(report.relations.len(), 6);
    assert_eq!(destination.replaced.last().map(String::as_str), Some("map_map"));
    assert!(!destination.replaced.iter().any(|table| table == "map_user"));
    assert_eq!(destination.inner.count_rows("map_user").expect("count"), 0);
}
