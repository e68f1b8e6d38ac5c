use std::io::{self, Write};

use anyhow::{Context, Result, bail};
use chrono::Utc;
use tracing::info;

use super::copy::{MigrationReport, MigrationState, migrate_all};
use crate::cli::MigrateArgs;
use crate::model::MigrationRunManifest;
use crate::relation::MIGRATION_ORDER;
use crate::store::{self, AccessMode};
use crate::util::{now_utc_string, run_id_for, utc_compact_string, write_json_pretty};

pub fn run(args: MigrateArgs) -> Result<()> {
    let started_ts = Utc::now();
    let started_at = now_utc_string();
    let run_id = run_id_for(started_ts);

    let manifest_path = args.migration_manifest_path.clone().unwrap_or_else(|| {
        args.cache_root.join("manifests").join(format!(
            "migration_run_{}.json",
            utc_compact_string(started_ts)
        ))
    });

    info!(
        source = %args.source.redacted(),
        destination = %args.destination.redacted(),
        run_id = %run_id,
        "starting migration"
    );

    let mut source = store::open(&args.source, AccessMode::ReadOnly, args.connect_retries)
        .context("cannot connect to migration source")?;
    let mut destination =
        store::open(&args.destination, AccessMode::ReadWrite, args.connect_retries)
            .context("cannot connect to migration destination")?;
    info!(
        source_engine = %source.kind(),
        destination_engine = %destination.kind(),
        "engines connected"
    );
    destination
        .bootstrap(&MIGRATION_ORDER)
        .context("failed to bootstrap destination schema")?;

    let report = migrate_all(source.as_mut(), destination.as_mut(), &MIGRATION_ORDER);
    print_summary(&report, source.location(), destination.location())?;

    let (failed_relation, failure_reason) = match &report.state {
        MigrationState::Aborted { relation, reason } => {
            (Some(relation.clone()), Some(reason.clone()))
        }
        _ => (None, None),
    };
    let manifest = MigrationRunManifest {
        manifest_version: 1,
        run_id,
        status: report.state.to_string(),
        started_at,
        updated_at: now_utc_string(),
        source: args.source.redacted(),
        destination: args.destination.redacted(),
        relations_planned: MIGRATION_ORDER.len(),
        relations: report.relations.clone(),
        failed_relation,
        failure_reason,
    };
    write_json_pretty(&manifest_path, &manifest)?;
    info!(path = %manifest_path.display(), "wrote migration run manifest");

    if let MigrationState::Aborted { relation, reason } = report.state {
        bail!("migration aborted at {relation}: {reason}");
    }
    Ok(())
}

fn print_summary(report: &MigrationReport, source: String, destination: String) -> Result<()> {
    let mut output = io::BufWriter::new(io::stdout().lock());
    writeln!(output, "source: {source}")?;
    writeln!(output, "destination: {destination}")?;
    for relation in &report.relations {
        writeln!(
            output,
            "{:<24} {:>10} {:>10}  {}",
            relation.relation, relation.source_rows, relation.destination_rows, relation.status
        )?;
    }
    writeln!(
        output,
        "{}: {}/{} relations migrated",
        report.state,
        report.succeeded(),
        MIGRATION_ORDER.len()
    )?;
    output.flush()?;
    Ok(())
}
