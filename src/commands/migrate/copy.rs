use std::fmt;

use tracing::{error, info};

use crate::error::{PipelineError, PipelineResult};
use crate::model::{MigrationStatus, RelationMigration};
use crate::relation::Relation;
use crate::store::Store;

/// Where a migration stands. `Migrated` and `Aborted` are terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationState {
    NotStarted,
    Migrating(&'static str),
    Migrated,
    Aborted { relation: String, reason: String },
}

impl fmt::Display for MigrationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotStarted => f.write_str("NOT_STARTED"),
            Self::Migrating(relation) => write!(f, "MIGRATING({relation})"),
            Self::Migrated => f.write_str("MIGRATED"),
            Self::Aborted { .. } => f.write_str("ABORTED"),
        }
    }
}

#[derive(Debug)]
pub struct MigrationReport {
    pub state: MigrationState,
    pub relations: Vec<RelationMigration>,
}

impl MigrationReport {
    pub fn succeeded(&self) -> usize {
        self.relations
            .iter()
            .filter(|relation| relation.status == MigrationStatus::Migrated)
            .count()
    }
}

/// Copies each relation in order, stopping at the first relation that fails
/// or whose destination count differs from what was read.
pub fn migrate_all(
    source: &mut dyn Store,
    destination: &mut dyn Store,
    relations: &[&'static Relation],
) -> MigrationReport {
    let mut report = MigrationReport {
        state: MigrationState::NotStarted,
        relations: Vec::with_capacity(relations.len()),
    };

    for relation in relations {
        report.state = MigrationState::Migrating(relation.name);
        info!(relation = relation.name, "migrating relation");

        let mut entry = RelationMigration {
            relation: relation.name.to_string(),
            source_rows: 0,
            destination_rows: 0,
            status: MigrationStatus::Failed,
        };

        let outcome = migrate_relation(source, destination, relation, &mut entry);
        report.relations.push(entry);

        if let Err(err) = outcome {
            error!(relation = relation.name, error = %err, "migration aborted");
            report.state = MigrationState::Aborted {
                relation: relation.name.to_string(),
                reason: err.to_string(),
            };
            return report;
        }
    }

    report.state = MigrationState::Migrated;
    report
}

fn migrate_relation(
    source: &mut dyn Store,
    destination: &mut dyn Store,
    relation: &Relation,
    entry: &mut RelationMigration,
) -> PipelineResult<()> {
    let data = source.read_table(relation.name)?;
    entry.source_rows = data.len() as u64;
    info!(relation = relation.name, rows = entry.source_rows, "read source rows");

    let written = destination.replace_table(relation.name, &data)?;
    info!(relation = relation.name, rows = written, "wrote destination rows");

    entry.destination_rows = destination.count_rows(relation.name)?;
    if entry.destination_rows != entry.source_rows {
        return Err(PipelineError::RowCountMismatch {
            relation: relation.name.to_string(),
            source_rows: entry.source_rows,
            destination_rows: entry.destination_rows,
        });
    }

    info!(relation = relation.name, rows = entry.destination_rows, "row counts match");
    entry.status = MigrationStatus::Migrated;
    Ok(())
}
