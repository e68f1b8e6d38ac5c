use std::fs;
use std::path::Path;

use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags, params_from_iter};

use super::{Store, insert_statement};
use crate::config::EngineKind;
use crate::error::{PipelineError, PipelineResult};
use crate::relation::Relation;
use crate::value::{Cell, Row, TableData};

const ENGINE: EngineKind = EngineKind::Sqlite;

pub struct SqliteStore {
    connection: Connection,
    location: String,
}

impl SqliteStore {
    pub fn open(path: &Path) -> PipelineResult<Self> {
        if path.as_os_str() == ":memory:" {
            return Self::in_memory();
        }
        let location = path.display().to_string();
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|err| PipelineError::unreachable(ENGINE, &location, err))?;
        }

        let connection = Connection::open(path)
            .map_err(|err| PipelineError::unreachable(ENGINE, &location, err))?;
        configure_connection(&connection, &location)?;
        Ok(Self {
            connection,
            location,
        })
    }

    pub fn open_read_only(path: &Path) -> PipelineResult<Self> {
        let location = path.display().to_string();
        if path.as_os_str() == ":memory:" {
            return Self::in_memory();
        }
        if !path.exists() {
            return Err(PipelineError::unreachable(
                ENGINE,
                &location,
                "database file missing",
            ));
        }
        let connection = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|err| PipelineError::unreachable(ENGINE, &location, err))?;
        Ok(Self {
            connection,
            location,
        })
    }

    pub fn in_memory() -> PipelineResult<Self> {
        let connection = Connection::open_in_memory()
            .map_err(|err| PipelineError::unreachable(ENGINE, ":memory:", err))?;
        Ok(Self {
            connection,
            location: ":memory:".to_string(),
        })
    }

    #[cfg(test)]
    pub fn connection(&self) -> &Connection {
        &self.connection
    }
}

fn configure_connection(connection: &Connection, location: &str) -> PipelineResult<()> {
    connection
        .pragma_update(None, "journal_mode", "WAL")
        .map_err(|err| PipelineError::unreachable(ENGINE, location, err))?;
    connection
        .pragma_update(None, "synchronous", "NORMAL")
        .map_err(|err| PipelineError::unreachable(ENGINE, location, err))?;
    Ok(())
}

fn cell_from_ref(value: ValueRef<'_>) -> Cell {
    match value {
        ValueRef::Null => Cell::Null,
        ValueRef::Integer(value) => Cell::Int(value),
        ValueRef::Real(value) => Cell::Real(value),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            Cell::Text(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}

impl Store for SqliteStore {
    fn kind(&self) -> EngineKind {
        ENGINE
    }

    fn location(&self) -> String {
        format!("sqlite://{}", self.location)
    }

    fn bootstrap(&mut self, relations: &[&Relation]) -> PipelineResult<()> {
        let fail = |err: rusqlite::Error| PipelineError::engine(ENGINE, "schema", err);
        let tx = self.connection.transaction().map_err(fail)?;
        for relation in relations {
            tx.execute_batch(&relation.sqlite_ddl()).map_err(fail)?;
        }
        tx.commit().map_err(fail)
    }

    fn table_exists(&mut self, table: &str) -> PipelineResult<bool> {
        let count: i64 = self
            .connection
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
                [table],
                |row| row.get(0),
            )
            .map_err(|err| PipelineError::engine(ENGINE, table, err))?;
        Ok(count > 0)
    }

    fn column_names(&mut self, table: &str) -> PipelineResult<Vec<String>> {
        let fail = |err: rusqlite::Error| PipelineError::engine(ENGINE, table, err);
        let pragma_sql = format!("PRAGMA table_info(\"{table}\")");
        let mut statement = self.connection.prepare(&pragma_sql).map_err(fail)?;
        let mut rows = statement.query([]).map_err(fail)?;

        let mut names = Vec::new();
        while let Some(row) = rows.next().map_err(fail)? {
            names.push(row.get::<_, String>(1).map_err(fail)?);
        }
        if names.is_empty() {
            return Err(PipelineError::engine(ENGINE, table, "no such table"));
        }
        Ok(names)
    }

    fn count_rows(&mut self, table: &str) -> PipelineResult<u64> {
        let count: i64 = self
            .connection
            .query_row(&format!("SELECT COUNT(*) FROM \"{table}\""), [], |row| {
                row.get(0)
            })
            .map_err(|err| PipelineError::engine(ENGINE, table, err))?;
        u64::try_from(count).map_err(|err| PipelineError::engine(ENGINE, table, err))
    }

    fn read_table(&mut self, table: &str) -> PipelineResult<TableData> {
        let fail = |err: rusqlite::Error| PipelineError::engine(ENGINE, table, err);
        let mut statement = self
            .connection
            .prepare(&format!("SELECT * FROM \"{table}\""))
            .map_err(fail)?;
        let columns = statement
            .column_names()
            .into_iter()
            .map(str::to_string)
            .collect::<Vec<_>>();
        let width = columns.len();

        let rows = statement
            .query_map([], |row| {
                (0..width)
                    .map(|index| row.get_ref(index).map(cell_from_ref))
                    .collect::<rusqlite::Result<Row>>()
            })
            .map_err(fail)?
            .collect::<rusqlite::Result<Vec<Row>>>()
            .map_err(fail)?;

        Ok(TableData::new(columns, rows))
    }

    fn replace_table(&mut self, table: &str, data: &TableData) -> PipelineResult<u64> {
        let fail = |err: rusqlite::Error| PipelineError::engine(ENGINE, table, err);
        let tx = self.connection.transaction().map_err(fail)?;
        tx.execute(&format!("DELETE FROM \"{table}\""), [])
            .map_err(fail)?;

        if !data.columns.is_empty() {
            let sql = insert_statement(table, &data.columns, '"', 1);
            let mut statement = tx.prepare(&sql).map_err(fail)?;
            for row in &data.rows {
                statement
                    .execute(params_from_iter(row.iter()))
                    .map_err(fail)?;
            }
        }

        tx.commit().map_err(fail)?;
        Ok(data.rows.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relation::{MIGRATION_ORDER, TOP_USER};

    fn seeded_top_user(rows: usize) -> SqliteStore {
        let mut store = SqliteStore::in_memory().expect("in-memory DB should open");
        store.bootstrap(&MIGRATION_ORDER).expect("bootstrap");
        store
            .replace_table(TOP_USER.name, &TOP_USER.sample_data(rows))
            .expect("seed top_user");
        store
    }

    #[test]
    fn failed_replace_keeps_previous_contents() {
        let mut store = seeded_top_user(3);
        let before = store.read_table(TOP_USER.name).expect("readable");

        let mut batch = TOP_USER.sample_data(5);
        batch.rows[3].pop();
        let result = store.replace_table(TOP_USER.name, &batch);

        assert!(matches!(result, Err(PipelineError::Engine { .. })));
        assert_eq!(store.count_rows(TOP_USER.name).expect("countable"), 3);
        assert_eq!(store.read_table(TOP_USER.name).expect("readable"), before);
    }

    #[test]
    fn replace_swaps_contents_wholesale() {
        let mut store = seeded_top_user(3);
        let written = store
            .replace_table(TOP_USER.name, &TOP_USER.sample_data(5))
            .expect("replace");

        assert_eq!(written, 5);
        assert_eq!(store.count_rows(TOP_USER.name).expect("countable"), 5);
        assert_eq!(store.kind(), EngineKind::Sqlite);
        assert!(store.table_exists(TOP_USER.name).expect("lookup"));
        assert!(!store.table_exists("top_pincode").expect("lookup"));
    }
}
