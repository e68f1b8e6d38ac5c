use std::fmt;

use serde::Serialize;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestOutcome {
    Loaded,
    Empty,
    Failed,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MigrationStatus {
    Migrated,
    Failed,
}

impl MigrationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Migrated => "migrated",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for MigrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestPaths {
    pub data_dir: String,
    pub country: String,
    pub db_url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RelationIngestStats {
    pub relation: String,
    pub dataset: String,
    pub category: String,
    pub documents: usize,
    pub unreadable_documents: usize,
    pub records: usize,
    pub skipped_records: usize,
    pub outcome: IngestOutcome,
    pub digest: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestCounts {
    pub relations_loaded: usize,
    pub relations_empty: usize,
    pub relations_failed: usize,
    pub documents: usize,
    pub unreadable_documents: usize,
    pub records: usize,
    pub skipped_records: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestRunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub status: String,
    pub started_at: String,
    pub updated_at: String,
    pub paths: IngestPaths,
    pub counts: IngestCounts,
    pub relations: Vec<RelationIngestStats>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RelationMigration {
    pub relation: String,
    pub source_rows: u64,
    pub destination_rows: u64,
    pub status: MigrationStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct MigrationRunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub status: String,
    pub started_at: String,
    pub updated_at: String,
    pub source: String,
    pub destination: String,
    pub relations_planned: usize,
    pub relations: Vec<RelationMigration>,
    pub failed_relation: Option<String>,
    pub failure_reason: Option<String>,
}
