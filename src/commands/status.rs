use std::io::{self, Write};

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::cli::StatusArgs;
use crate::relation::MIGRATION_ORDER;
use crate::store::{self, AccessMode, Store};

pub fn run(args: StatusArgs) -> Result<()> {
    info!(db = %args.db_url.redacted(), "status requested");

    let mut store = store::open(&args.db_url, AccessMode::ReadOnly, args.connect_retries)
        .context("failed to open database")?;

    let mut output = io::BufWriter::new(io::stdout().lock());
    writeln!(output, "database: {}", store.location())?;

    let mut missing = 0;
    for relation in MIGRATION_ORDER {
        match relation_status(store.as_mut(), relation.name)? {
            Some((rows, digest)) => {
                writeln!(output, "{:<24} {:>10}  {}", relation.name, rows, digest)?;
            }
            None => {
                missing += 1;
                warn!(relation = relation.name, "relation missing");
                writeln!(output, "{:<24} {:>10}", relation.name, "missing")?;
            }
        }
    }
    output.flush()?;

    if missing > 0 {
        warn!(missing, "run `pulse init` to create missing relations");
    }
    Ok(())
}

fn relation_status(store: &mut dyn Store, table: &str) -> Result<Option<(u64, String)>> {
    if !store.table_exists(table)? {
        return Ok(None);
    }
    let rows = store.count_rows(table)?;
    let digest = store.read_table(table)?.digest();
    Ok(Some((rows, digest)))
}
