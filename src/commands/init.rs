use anyhow::{Context, Result};
use tracing::info;

use crate::cli::InitArgs;
use crate::relation::MIGRATION_ORDER;
use crate::store::{self, AccessMode};

pub fn run(args: InitArgs) -> Result<()> {
    let mut store = store::open(&args.db_url, AccessMode::ReadWrite, args.connect_retries)
        .context("failed to open database for schema bootstrap")?;
    store
        .bootstrap(&MIGRATION_ORDER)
        .context("failed to create relations")?;

    info!(
        db = %store.location(),
        relations = MIGRATION_ORDER.len(),
        "schema ready"
    );
    Ok(())
}
