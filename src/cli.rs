use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::{
    DB_URL_ENV, DEFAULT_MYSQL_URL, DEFAULT_SQLITE_URL, DESTINATION_URL_ENV, EngineConfig,
    SOURCE_URL_ENV,
};

#[derive(Parser, Debug)]
#[command(
    name = "pulse",
    version,
    about = "Payment statistics ingestion, engine migration and verification"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create every relation if it does not exist yet.
    Init(InitArgs),
    Ingest(IngestArgs),
    Migrate(MigrateArgs),
    Verify(VerifyArgs),
    Status(StatusArgs),
}

#[derive(Args, Debug, Clone)]
pub struct InitArgs {
    #[arg(long, env = DB_URL_ENV, default_value = DEFAULT_SQLITE_URL)]
    pub db_url: EngineConfig,

    #[arg(long, default_value_t = 2)]
    pub connect_retries: u32,
}

#[derive(Args, Debug, Clone)]
pub struct IngestArgs {
    #[arg(long, default_value = "data")]
    pub data_dir: PathBuf,

    #[arg(long, default_value = "india")]
    pub country: String,

    #[arg(long, env = DB_URL_ENV, default_value = DEFAULT_SQLITE_URL)]
    pub db_url: EngineConfig,

    #[arg(long, default_value = ".cache/pulse")]
    pub cache_root: PathBuf,

    #[arg(long)]
    pub ingest_manifest_path: Option<PathBuf>,

    /// Stop at the first relation that fails to load instead of continuing.
    #[arg(long, default_value_t = false)]
    pub fail_fast: bool,

    #[arg(long, default_value_t = 2)]
    pub connect_retries: u32,
}

#[derive(Args, Debug, Clone)]
pub struct MigrateArgs {
    #[arg(long, env = SOURCE_URL_ENV, default_value = DEFAULT_MYSQL_URL)]
    pub source: EngineConfig,

    #[arg(long, env = DESTINATION_URL_ENV, default_value = DEFAULT_SQLITE_URL)]
    pub destination: EngineConfig,

    #[arg(long, default_value = ".cache/pulse")]
    pub cache_root: PathBuf,

    #[arg(long)]
    pub migration_manifest_path: Option<PathBuf>,

    #[arg(long, default_value_t = 2)]
    pub connect_retries: u32,
}

#[derive(Args, Debug, Clone)]
pub struct VerifyArgs {
    #[arg(long, env = SOURCE_URL_ENV, default_value = DEFAULT_MYSQL_URL)]
    pub source: EngineConfig,

    #[arg(long, env = DESTINATION_URL_ENV, default_value = DEFAULT_SQLITE_URL)]
    pub destination: EngineConfig,

    #[arg(long, default_value = "verification_report.md")]
    pub report_path: PathBuf,

    #[arg(long)]
    pub json_report_path: Option<PathBuf>,

    #[arg(long, default_value_t = 2)]
    pub connect_retries: u32,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[arg(long, env = DB_URL_ENV, default_value = DEFAULT_SQLITE_URL)]
    pub db_url: EngineConfig,

    #[arg(long, default_value_t = 0)]
    pub connect_retries: u32,
}
