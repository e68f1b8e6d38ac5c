//! Relational engines behind one synchronous interface.

mod mysql;
mod sqlite;

use std::thread;
use std::time::Duration;

use tracing::warn;

use crate::config::{EngineConfig, EngineKind};
use crate::error::PipelineResult;
use crate::relation::Relation;
use crate::value::TableData;

pub use self::mysql::MysqlStore;
pub use self::sqlite::SqliteStore;

const RETRY_BASE_DELAY: Duration = Duration::from_millis(250);

/// Operations the loader, migrator and verifier need from an engine.
///
/// Table names passed in always come from the relation catalog.
pub trait Store {
    fn kind(&self) -> EngineKind;

    fn location(&self) -> String;

    /// Idempotent `CREATE TABLE IF NOT EXISTS` for every relation.
    fn bootstrap(&mut self, relations: &[&Relation]) -> PipelineResult<()>;

    fn table_exists(&mut self, table: &str) -> PipelineResult<bool>;

    fn column_names(&mut self, table: &str) -> PipelineResult<Vec<String>>;

    fn count_rows(&mut self, table: &str) -> PipelineResult<u64>;

    fn read_table(&mut self, table: &str) -> PipelineResult<TableData>;

    /// Clears `table` and writes `data` inside one transaction; returns rows written.
    fn replace_table(&mut self, table: &str, data: &TableData) -> PipelineResult<u64>;
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum AccessMode {
    ReadWrite,
    ReadOnly,
}

pub fn open(
    config: &EngineConfig,
    mode: AccessMode,
    retries: u32,
) -> PipelineResult<Box<dyn Store>> {
    with_retry(config, retries, || match config {
        EngineConfig::Sqlite { path } => {
            let store = match mode {
                AccessMode::ReadWrite => SqliteStore::open(path)?,
                AccessMode::ReadOnly => SqliteStore::open_read_only(path)?,
            };
            Ok(Box::new(store) as Box<dyn Store>)
        }
        EngineConfig::Mysql { url } => {
            let store = MysqlStore::connect(url, config.redacted())?;
            Ok(Box::new(store) as Box<dyn Store>)
        }
    })
}

fn with_retry<T>(
    config: &EngineConfig,
    retries: u32,
    mut attempt: impl FnMut() -> PipelineResult<T>,
) -> PipelineResult<T> {
    let mut delay = RETRY_BASE_DELAY;
    let mut tries = 0;
    loop {
        match attempt() {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && tries < retries => {
                tries += 1;
                warn!(
                    engine = %config.kind(),
                    location = %config.redacted(),
                    attempt = tries,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "engine unreachable, retrying"
                );
                thread::sleep(delay);
                delay *= 2;
            }
            Err(err) => return Err(err),
        }
    }
}

fn insert_statement(table: &str, columns: &[String], quote: char, rows: usize) -> String {
    let column_list = columns
        .iter()
        .map(|column| format!("{quote}{column}{quote}"))
        .collect::<Vec<_>>()
        .join(", ");
    let placeholders = format!("({})", vec!["?"; columns.len()].join(", "));
    let values = vec![placeholders; rows].join(", ");
    format!("INSERT INTO {table} ({column_list}) VALUES {values}")
}

#[cfg(test)]
mod tests {
    use std::cell::Cell as Counter;

    use super::*;
    use crate::error::PipelineError;

    #[test]
    fn insert_statement_repeats_placeholders_per_row() {
        let columns = vec!["state".to_string(), "year".to_string()];
        assert_eq!(
            insert_statement("top_user", &columns, '`', 2),
            "INSERT INTO top_user (`state`, `year`) VALUES (?, ?), (?, ?)"
        );
    }

    #[test]
    fn retry_stops_on_non_retryable_errors() {
        let config = EngineConfig::Sqlite {
            path: ":memory:".into(),
        };
        let calls = Counter::new(0);
        let result: PipelineResult<()> = with_retry(&config, 3, || {
            calls.set(calls.get() + 1);
            Err(PipelineError::engine(EngineKind::Sqlite, "top_user", "syntax"))
        });
        assert!(result.is_err());
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn retry_gives_up_after_bounded_attempts() {
        let config = EngineConfig::Sqlite {
            path: ":memory:".into(),
        };
        let calls = Counter::new(0);
        let result: PipelineResult<()> = with_retry(&config, 1, || {
            calls.set(calls.get() + 1);
            Err(PipelineError::unreachable(EngineKind::Sqlite, "x", "down"))
        });
        assert!(matches!(result, Err(PipelineError::EngineUnreachable { .. })));
        assert_eq!(calls.get(), 2);
    }
}
