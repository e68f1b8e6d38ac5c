//! MySQL engine over `mysql_async`, driven on a private current-thread runtime.

use std::future::Future;

use mysql_async::prelude::*;
use mysql_async::{Conn, Opts, Pool, TxOpts, Value};
use tokio::runtime::{Builder, Runtime};
use tracing::{debug, info};

use super::{Store, insert_statement};
use crate::config::EngineKind;
use crate::error::{PipelineError, PipelineResult};
use crate::relation::Relation;
use crate::value::{Cell, Row, TableData};

const ENGINE: EngineKind = EngineKind::Mysql;
const MYSQL_MAX_PLACEHOLDERS: usize = 65_535;

pub struct MysqlStore {
    runtime: Runtime,
    pool: Pool,
    location: String,
}

impl MysqlStore {
    pub fn connect(url: &str, location: String) -> PipelineResult<Self> {
        let opts = Opts::from_url(url).map_err(|err| PipelineError::Config(err.to_string()))?;
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|err| PipelineError::unreachable(ENGINE, &location, err))?;

        let pool = {
            let _guard = runtime.enter();
            Pool::new(opts)
        };

        runtime.block_on(async {
            let mut conn = checkout(&pool, &location).await?;
            conn.query_drop("SELECT 1")
                .await
                .map_err(|err| PipelineError::unreachable(ENGINE, &location, err))
        })?;

        info!(location = %location, "connected to mysql");
        Ok(Self {
            runtime,
            pool,
            location,
        })
    }

    fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }
}

impl Drop for MysqlStore {
    fn drop(&mut self) {
        let pool = self.pool.clone();
        if let Err(err) = self.runtime.block_on(pool.disconnect()) {
            debug!(error = %err, "mysql pool disconnect failed");
        }
    }
}

async fn checkout(pool: &Pool, location: &str) -> PipelineResult<Conn> {
    pool.get_conn()
        .await
        .map_err(|err| PipelineError::unreachable(ENGINE, location, err))
}

fn cell_from_value(value: Value) -> Cell {
    match value {
        Value::NULL => Cell::Null,
        Value::Int(value) => Cell::Int(value),
        Value::UInt(value) => i64::try_from(value)
            .map(Cell::Int)
            .unwrap_or(Cell::Real(value as f64)),
        Value::Float(value) => Cell::Real(f64::from(value)),
        Value::Double(value) => Cell::Real(value),
        Value::Bytes(bytes) => Cell::Text(String::from_utf8_lossy(&bytes).into_owned()),
        other @ (Value::Date(..) | Value::Time(..)) => {
            Cell::Text(other.as_sql(true).trim_matches('\'').to_string())
        }
    }
}

fn quoted_columns(columns: &[String]) -> String {
    columns
        .iter()
        .map(|column| format!("`{column}`"))
        .collect::<Vec<_>>()
        .join(", ")
}

impl Store for MysqlStore {
    fn kind(&self) -> EngineKind {
        ENGINE
    }

    fn location(&self) -> String {
        self.location.clone()
    }

    fn bootstrap(&mut self, relations: &[&Relation]) -> PipelineResult<()> {
        self.block_on(async {
            let mut conn = checkout(&self.pool, &self.location).await?;
            for relation in relations {
                conn.query_drop(relation.mysql_ddl())
                    .await
                    .map_err(|err| PipelineError::engine(ENGINE, relation.name, err))?;
            }
            Ok(())
        })
    }

    fn table_exists(&mut self, table: &str) -> PipelineResult<bool> {
        self.block_on(async {
            let mut conn = checkout(&self.pool, &self.location).await?;
            let count: Option<i64> = conn
                .exec_first(
                    "SELECT COUNT(*) FROM INFORMATION_SCHEMA.TABLES
                     WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ?",
                    (table,),
                )
                .await
                .map_err(|err| PipelineError::engine(ENGINE, table, err))?;
            Ok(count.unwrap_or(0) > 0)
        })
    }

    fn column_names(&mut self, table: &str) -> PipelineResult<Vec<String>> {
        let names: Vec<String> = self.block_on(async {
            let mut conn = checkout(&self.pool, &self.location).await?;
            conn.exec(
                "SELECT COLUMN_NAME FROM INFORMATION_SCHEMA.COLUMNS
                 WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ?
                 ORDER BY ORDINAL_POSITION",
                (table,),
            )
            .await
            .map_err(|err| PipelineError::engine(ENGINE, table, err))
        })?;
        if names.is_empty() {
            return Err(PipelineError::engine(ENGINE, table, "no such table"));
        }
        Ok(names)
    }

    fn count_rows(&mut self, table: &str) -> PipelineResult<u64> {
        let count: Option<i64> = self.block_on(async {
            let mut conn = checkout(&self.pool, &self.location).await?;
            conn.exec_first(format!("SELECT COUNT(*) FROM `{table}`"), ())
                .await
                .map_err(|err| PipelineError::engine(ENGINE, table, err))
        })?;
        let count = count.unwrap_or(0);
        u64::try_from(count).map_err(|err| PipelineError::engine(ENGINE, table, err))
    }

    fn read_table(&mut self, table: &str) -> PipelineResult<TableData> {
        let columns = self.column_names(table)?;
        let sql = format!("SELECT {} FROM `{table}`", quoted_columns(&columns));

        // Binary protocol keeps numeric columns typed instead of returning text.
        let raw_rows: Vec<mysql_async::Row> = self.block_on(async {
            let mut conn = checkout(&self.pool, &self.location).await?;
            conn.exec(sql, ())
                .await
                .map_err(|err| PipelineError::engine(ENGINE, table, err))
        })?;

        let rows = raw_rows
            .into_iter()
            .map(|mut row| {
                (0..row.len())
                    .map(|index| cell_from_value(row.take(index).unwrap_or(Value::NULL)))
                    .collect::<Row>()
            })
            .collect();
        Ok(TableData::new(columns, rows))
    }

    fn replace_table(&mut self, table: &str, data: &TableData) -> PipelineResult<u64> {
        let fail = |err: mysql_async::Error| PipelineError::engine(ENGINE, table, err);
        self.block_on(async {
            let mut conn = checkout(&self.pool, &self.location).await?;
            let mut tx = conn
                .start_transaction(TxOpts::default())
                .await
                .map_err(fail)?;
            tx.query_drop(format!("DELETE FROM `{table}`"))
                .await
                .map_err(fail)?;

            if !data.columns.is_empty() {
                let rows_per_batch = (MYSQL_MAX_PLACEHOLDERS / data.columns.len()).max(1);
                for chunk in data.rows.chunks(rows_per_batch) {
                    let sql = insert_statement(table, &data.columns, '`', chunk.len());
                    let params = chunk
                        .iter()
                        .flat_map(|row| row.iter().map(Value::from))
                        .collect::<Vec<Value>>();
                    tx.exec_drop(sql, params).await.map_err(fail)?;
                }
            }

            tx.commit().await.map_err(fail)?;
            Ok(data.rows.len() as u64)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_map_to_engine_neutral_cells() {
        assert_eq!(cell_from_value(Value::NULL), Cell::Null);
        assert_eq!(cell_from_value(Value::Int(-3)), Cell::Int(-3));
        assert_eq!(cell_from_value(Value::UInt(7)), Cell::Int(7));
        assert_eq!(cell_from_value(Value::Double(1.25)), Cell::Real(1.25));
        assert_eq!(
            cell_from_value(Value::Bytes(b"Karnataka".to_vec())),
            Cell::text("Karnataka")
        );
    }

    #[test]
    fn quoted_columns_use_backticks() {
        let columns = vec!["state".to_string(), "count".to_string()];
        assert_eq!(quoted_columns(&columns), "`state`, `count`");
    }
}
