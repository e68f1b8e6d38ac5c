use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use tracing::{error, info, warn};

use super::extract::{DATASETS, Dataset, extract_dataset};
use super::load::{LoadOutcome, load_relation};
use crate::cli::IngestArgs;
use crate::model::{
    IngestCounts, IngestOutcome, IngestPaths, IngestRunManifest, RelationIngestStats,
};
use crate::relation::MIGRATION_ORDER;
use crate::store::{self, AccessMode, Store};
use crate::util::{now_utc_string, run_id_for, utc_compact_string, write_json_pretty};

pub fn run(args: IngestArgs) -> Result<()> {
    let started_ts = Utc::now();
    let started_at = now_utc_string();
    let run_id = run_id_for(started_ts);

    let manifest_dir = args.cache_root.join("manifests");
    let ingest_manifest_path = args.ingest_manifest_path.clone().unwrap_or_else(|| {
        manifest_dir.join(format!(
            "ingest_run_{}.json",
            utc_compact_string(started_ts)
        ))
    });

    info!(
        data_dir = %args.data_dir.display(),
        db = %args.db_url,
        run_id = %run_id,
        "starting ingest"
    );

    let mut store = store::open(&args.db_url, AccessMode::ReadWrite, args.connect_retries)
        .context("failed to open ingest target")?;
    store
        .bootstrap(&MIGRATION_ORDER)
        .context("failed to bootstrap schema")?;

    let report = ingest_all(
        store.as_mut(),
        &args.data_dir,
        &args.country,
        args.fail_fast,
    );

    let status = if report.counts.relations_failed > 0 {
        "failed"
    } else {
        "completed"
    };
    let manifest = IngestRunManifest {
        manifest_version: 1,
        run_id: run_id.clone(),
        status: status.to_string(),
        started_at,
        updated_at: now_utc_string(),
        paths: IngestPaths {
            data_dir: args.data_dir.display().to_string(),
            country: args.country.clone(),
            db_url: args.db_url.redacted(),
        },
        counts: report.counts.clone(),
        relations: report.relations,
        warnings: report.warnings,
    };
    write_json_pretty(&ingest_manifest_path, &manifest)?;
    info!(path = %ingest_manifest_path.display(), "wrote ingest run manifest");

    if report.counts.relations_failed > 0 {
        bail!(
            "ingest finished with {} failed relation(s); see {}",
            report.counts.relations_failed,
            ingest_manifest_path.display()
        );
    }

    info!(
        loaded = report.counts.relations_loaded,
        empty = report.counts.relations_empty,
        records = report.counts.records,
        skipped = report.counts.skipped_records,
        "ETL process complete"
    );
    Ok(())
}

#[derive(Debug, Default)]
pub struct IngestReport {
    pub relations: Vec<RelationIngestStats>,
    pub counts: IngestCounts,
    pub warnings: Vec<String>,
}

/// Extracts and loads every dataset. A failing relation is recorded and, unless
/// `fail_fast` is set, the remaining relations still load.
pub fn ingest_all(
    store: &mut dyn Store,
    data_dir: &Path,
    country: &str,
    fail_fast: bool,
) -> IngestReport {
    let mut report = IngestReport::default();

    for dataset in &DATASETS {
        info!(dataset = dataset.label, relation = dataset.relation.name, "loading dataset");
        let stats = ingest_dataset(store, dataset, data_dir, country);

        let counts = &mut report.counts;
        counts.documents += stats.documents;
        counts.unreadable_documents += stats.unreadable_documents;
        counts.records += stats.records;
        counts.skipped_records += stats.skipped_records;
        match stats.outcome {
            IngestOutcome::Loaded => counts.relations_loaded += 1,
            IngestOutcome::Empty => counts.relations_empty += 1,
            IngestOutcome::Failed => counts.relations_failed += 1,
        }
        if stats.unreadable_documents > 0 {
            report.warnings.push(format!(
                "{}: {} unreadable document(s) skipped",
                stats.relation, stats.unreadable_documents
            ));
        }

        let failed = stats.outcome == IngestOutcome::Failed;
        let relation = stats.relation.clone();
        report.relations.push(stats);

        if failed && fail_fast {
            warn!(relation = %relation, "fail-fast set, halting ingest");
            report
                .warnings
                .push(format!("halted after {relation} failed to load"));
            break;
        }
    }

    report
}

fn ingest_dataset(
    store: &mut dyn Store,
    dataset: &Dataset,
    data_dir: &Path,
    country: &str,
) -> RelationIngestStats {
    let mut stats = RelationIngestStats {
        relation: dataset.relation.name.to_string(),
        dataset: dataset.label.to_string(),
        category: dataset.category.to_string(),
        documents: 0,
        unreadable_documents: 0,
        records: 0,
        skipped_records: 0,
        outcome: IngestOutcome::Failed,
        digest: None,
        error: None,
    };

    let extraction = match extract_dataset(dataset, data_dir, country) {
        Ok(extraction) => extraction,
        Err(err) => {
            error!(relation = dataset.relation.name, error = %err, "extraction failed");
            stats.error = Some(format!("{err:#}"));
            return stats;
        }
    };
    stats.documents = extraction.documents;
    stats.unreadable_documents = extraction.unreadable_documents;
    stats.records = extraction.rows.len();
    stats.skipped_records = extraction.skipped_records;
    if extraction.skipped_records > 0 {
        warn!(
            relation = dataset.relation.name,
            skipped = extraction.skipped_records,
            "skipped malformed records"
        );
    }

    match load_relation(store, dataset.relation, extraction.rows) {
        Ok(LoadOutcome::Loaded { digest }) => {
            stats.outcome = IngestOutcome::Loaded;
            stats.digest = Some(digest);
        }
        Ok(LoadOutcome::Empty) => stats.outcome = IngestOutcome::Empty,
        Err(err) => {
            error!(relation = dataset.relation.name, error = %err, "load failed");
            stats.error = Some(err.to_string());
        }
    }
    stats
}
