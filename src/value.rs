//! Engine-neutral cell values shared by extraction, loading, migration and verification.

use rusqlite::ToSql;
use rusqlite::types::{ToSqlOutput, ValueRef};
use serde::Serialize;
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Null,
    Int(i64),
    Real(f64),
    Text(String),
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }
}

impl ToSql for Cell {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Self::Null => ToSqlOutput::Borrowed(ValueRef::Null),
            Self::Int(value) => ToSqlOutput::Borrowed(ValueRef::Integer(*value)),
            Self::Real(value) => ToSqlOutput::Borrowed(ValueRef::Real(*value)),
            Self::Text(value) => ToSqlOutput::Borrowed(ValueRef::Text(value.as_bytes())),
        })
    }
}

impl From<&Cell> for mysql_async::Value {
    fn from(cell: &Cell) -> Self {
        match cell {
            Cell::Null => mysql_async::Value::NULL,
            Cell::Int(value) => mysql_async::Value::from(*value),
            Cell::Real(value) => mysql_async::Value::from(*value),
            Cell::Text(value) => mysql_async::Value::from(value.as_str()),
        }
    }
}

pub type Row = Vec<Cell>;

/// Full contents of one relation as read from an engine.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableData {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl TableData {
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        Self { columns, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Order-sensitive sha256 over column names and rows.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        for column in &self.columns {
            hasher.update(column.as_bytes());
            hasher.update([0x1f]);
        }
        for row in &self.rows {
            hasher.update([0x1e]);
            for cell in row {
                match cell {
                    Cell::Null => hasher.update([0x00]),
                    Cell::Int(value) => {
                        hasher.update([0x01]);
                        hasher.update(value.to_le_bytes());
                    }
                    Cell::Real(value) => {
                        hasher.update([0x02]);
                        hasher.update(value.to_bits().to_le_bytes());
                    }
                    Cell::Text(value) => {
                        hasher.update([0x03]);
                        hasher.update((value.len() as u64).to_le_bytes());
                        hasher.update(value.as_bytes());
                    }
                }
            }
        }
        format!("{:x}", hasher.finalize())
    }
}
