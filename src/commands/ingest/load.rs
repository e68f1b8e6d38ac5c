use tracing::info;

use crate::error::PipelineResult;
use crate::relation::Relation;
use crate::store::Store;
use crate::value::{Row, TableData};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded { digest: String },
    Empty,
}

/// Replaces the relation's contents with `rows`. An empty set leaves the relation empty.
pub fn load_relation(
    store: &mut dyn Store,
    relation: &Relation,
    rows: Vec<Row>,
) -> PipelineResult<LoadOutcome> {
    let columns = relation
        .column_names()
        .into_iter()
        .map(str::to_string)
        .collect();
    let data = TableData::new(columns, rows);
    let written = store.replace_table(relation.name, &data)?;

    if written == 0 {
        info!(relation = relation.name, "no data found, relation left empty");
        return Ok(LoadOutcome::Empty);
    }

    let digest = data.digest();
    info!(relation = relation.name, rows = written, digest = %digest, "loaded relation");
    Ok(LoadOutcome::Loaded { digest })
}
