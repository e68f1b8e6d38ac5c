use std::fmt;

use serde::Serialize;
use tracing::{error, info, warn};

use super::compare::{ValueMatch, compare_values};
use crate::error::PipelineResult;
use crate::relation::Relation;
use crate::store::Store;
use crate::util::now_utc_string;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Pass,
    Fail,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pass => "PASS",
            Self::Fail => "FAIL",
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RelationChecks {
    pub source_rows: u64,
    pub destination_rows: u64,
    /// Sorted column names.
    pub source_columns: Vec<String>,
    pub destination_columns: Vec<String>,
    pub values: ValueMatch,
}

impl RelationChecks {
    pub fn row_count_passed(&self) -> bool {
        self.source_rows == self.destination_rows
    }

    pub fn schema_passed(&self) -> bool {
        self.source_columns == self.destination_columns
    }

    pub fn passed(&self) -> bool {
        self.row_count_passed() && self.schema_passed() && self.values.passed()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RelationOutcome {
    Checked(RelationChecks),
    Error { reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct RelationVerification {
    pub relation: String,
    #[serde(flatten)]
    pub outcome: RelationOutcome,
}

impl RelationVerification {
    pub fn passed(&self) -> bool {
        match &self.outcome {
            RelationOutcome::Checked(checks) => checks.passed(),
            RelationOutcome::Error { .. } => false,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct VerificationReport {
    pub generated_at: String,
    pub source: String,
    pub destination: String,
    pub relations: Vec<RelationVerification>,
    pub verdict: Verdict,
}

/// Runs every check on every relation. A relation that cannot be read is recorded as an
/// error and the remaining relations are still verified.
pub fn verify_all(
    source: &mut dyn Store,
    destination: &mut dyn Store,
    relations: &[&Relation],
) -> VerificationReport {
    let mut results = Vec::with_capacity(relations.len());

    for relation in relations {
        info!(relation = relation.name, "verifying relation");
        let outcome = match check_relation(source, destination, relation) {
            Ok(checks) => {
                if checks.passed() {
                    info!(relation = relation.name, values = ?checks.values, "relation verified");
                } else {
                    warn!(relation = relation.name, values = ?checks.values, "relation differs");
                }
                RelationOutcome::Checked(checks)
            }
            Err(err) => {
                error!(relation = relation.name, error = %err, "relation could not be verified");
                RelationOutcome::Error {
                    reason: err.to_string(),
                }
            }
        };
        results.push(RelationVerification {
            relation: relation.name.to_string(),
            outcome,
        });
    }

    let verdict = if results.iter().all(RelationVerification::passed) {
        Verdict::Pass
    } else {
        Verdict::Fail
    };

    VerificationReport {
        generated_at: now_utc_string(),
        source: source.location(),
        destination: destination.location(),
        relations: results,
        verdict,
    }
}

fn check_relation(
    source: &mut dyn Store,
    destination: &mut dyn Store,
    relation: &Relation,
) -> PipelineResult<RelationChecks> {
    let source_rows = source.count_rows(relation.name)?;
    let destination_rows = destination.count_rows(relation.name)?;

    let mut source_columns = source.column_names(relation.name)?;
    let mut destination_columns = destination.column_names(relation.name)?;
    source_columns.sort();
    destination_columns.sort();

    let source_data = source.read_table(relation.name)?;
    let destination_data = destination.read_table(relation.name)?;
    let values = compare_values(relation, &source_data, &destination_data);

    Ok(RelationChecks {
        source_rows,
        destination_rows,
        source_columns,
        destination_columns,
        values,
    })
}
