//! Catalog of the ten normalized relations produced by ingestion.
//!
//! Column names and order are consumed directly by dashboard queries, so they are fixed here
//! and every engine derives its DDL from this table.

use std::fmt;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ColumnKind {
    Text,
    Integer,
    Real,
}

impl ColumnKind {
    pub fn sqlite_type(self) -> &'static str {
        match self {
            Self::Text => "TEXT",
            Self::Integer => "INTEGER",
            Self::Real => "REAL",
        }
    }

    pub fn mysql_type(self) -> &'static str {
        match self {
            Self::Text => "TEXT",
            Self::Integer => "BIGINT",
            Self::Real => "DOUBLE",
        }
    }
}

#[derive(Debug)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnKind,
}

const fn text(name: &'static str) -> Column {
    Column {
        name,
        kind: ColumnKind::Text,
    }
}

const fn integer(name: &'static str) -> Column {
    Column {
        name,
        kind: ColumnKind::Integer,
    }
}

const fn real(name: &'static str) -> Column {
    Column {
        name,
        kind: ColumnKind::Real,
    }
}

#[derive(Debug)]
pub struct Relation {
    pub name: &'static str,
    pub columns: &'static [Column],
}

impl Relation {
    pub fn column_names(&self) -> Vec<&'static str> {
        self.columns.iter().map(|column| column.name).collect()
    }

    pub fn sqlite_ddl(&self) -> String {
        self.create_statement(|column| match column.kind {
            ColumnKind::Text => format!("\"{}\" TEXT", column.name),
            kind => format!("\"{}\" {} DEFAULT NULL", column.name, kind.sqlite_type()),
        })
    }

    pub fn mysql_ddl(&self) -> String {
        self.create_statement(|column| match column.kind {
            ColumnKind::Text => format!("`{}` TEXT", column.name),
            kind => format!("`{}` {} DEFAULT NULL", column.name, kind.mysql_type()),
        })
    }

    fn create_statement(&self, render: impl Fn(&Column) -> String) -> String {
        let columns = self
            .columns
            .iter()
            .map(|column| format!("  {}", render(column)))
            .collect::<Vec<_>>()
            .join(",\n");
        format!("CREATE TABLE IF NOT EXISTS {} (\n{}\n)", self.name, columns)
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

pub static AGGREGATED_TRANSACTION: Relation = Relation {
    name: "aggregated_transaction",
    columns: &[
        text("state"),
        integer("year"),
        integer("quarter"),
        text("transaction_type"),
        integer("transaction_count"),
        real("transaction_amount"),
    ],
};

pub static AGGREGATED_USER: Relation = Relation {
    name: "aggregated_user",
    columns: &[
        text("state"),
        integer("year"),
        integer("quarter"),
        integer("registered_users"),
        integer("app_opens"),
    ],
};

pub static AGGREGATED_INSURANCE: Relation = Relation {
    name: "aggregated_insurance",
    columns: &[
        text("state"),
        integer("year"),
        integer("quarter"),
        text("insurance_type"),
        integer("insurance_count"),
        real("insurance_amount"),
    ],
};

pub static AGGREGATED_USER_DEVICE: Relation = Relation {
    name: "aggregated_user_device",
    columns: &[
        text("state"),
        integer("year"),
        integer("quarter"),
        text("brand"),
        integer("count"),
        real("percentage"),
    ],
};

pub static MAP_MAP: Relation = Relation {
    name: "map_map",
    columns: &[
        text("state"),
        text("district"),
        integer("year"),
        integer("quarter"),
        integer("total_transactions"),
        real("total_amount"),
    ],
};

pub static MAP_USER: Relation = Relation {
    name: "map_user",
    columns: &[
        text("state"),
        text("district"),
        integer("year"),
        integer("quarter"),
        integer("registered_users"),
        integer("app_opens"),
    ],
};

pub static MAP_INSURANCE: Relation = Relation {
    name: "map_insurance",
    columns: &[
        text("state"),
        text("district"),
        integer("year"),
        integer("quarter"),
        integer("insurance_count"),
        real("insurance_amount"),
    ],
};

pub static TOP_MAP: Relation = Relation {
    name: "top_map",
    columns: &[
        text("state"),
        text("pincode"),
        integer("year"),
        integer("quarter"),
        integer("transaction_count"),
        real("transaction_amount"),
    ],
};

pub static TOP_USER: Relation = Relation {
    name: "top_user",
    columns: &[
        text("state"),
        text("pincode"),
        integer("year"),
        integer("quarter"),
        integer("registered_users"),
    ],
};

pub static TOP_INSURANCE: Relation = Relation {
    name: "top_insurance",
    columns: &[
        text("state"),
        text("pincode"),
        integer("year"),
        integer("quarter"),
        integer("insurance_count"),
        real("insurance_amount"),
    ],
};

/// Order in which relations are migrated and verified.
pub static MIGRATION_ORDER: [&Relation; 10] = [
    &AGGREGATED_INSURANCE,
    &AGGREGATED_TRANSACTION,
    &AGGREGATED_USER,
    &AGGREGATED_USER_DEVICE,
    &MAP_INSURANCE,
    &MAP_MAP,
    &MAP_USER,
    &TOP_INSURANCE,
    &TOP_MAP,
    &TOP_USER,
];

#[cfg(test)]
impl Relation {
    /// Deterministic rows for engine round trips in tests.
    pub fn sample_data(&self, rows: usize) -> crate::value::TableData {
        use crate::value::Cell;

        let columns = self.column_names().into_iter().map(str::to_string).collect();
        let rows = (0..rows)
            .map(|index| {
                self.columns
                    .iter()
                    .map(|column| match column.kind {
                        ColumnKind::Text => Cell::text(format!("{}-{index}", column.name)),
                        ColumnKind::Integer => Cell::Int(index as i64),
                        ColumnKind::Real => Cell::Real(index as f64 * 1.25 + 0.5),
                    })
                    .collect()
            })
            .collect();
        crate::value::TableData::new(columns, rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migration_order_covers_every_relation_once() {
        let mut names = MIGRATION_ORDER
            .iter()
            .map(|relation| relation.name)
            .collect::<Vec<_>>();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), 10);
    }

    #[test]
    fn sqlite_ddl_is_idempotent_create() {
        let ddl = TOP_USER.sqlite_ddl();
        assert!(ddl.starts_with("CREATE TABLE IF NOT EXISTS top_user ("));
        assert!(ddl.contains("\"pincode\" TEXT"));
        assert!(ddl.contains("\"registered_users\" INTEGER DEFAULT NULL"));
    }

    #[test]
    fn mysql_ddl_uses_native_types() {
        let ddl = MAP_MAP.mysql_ddl();
        assert!(ddl.contains("`total_transactions` BIGINT DEFAULT NULL"));
        assert!(ddl.contains("`total_amount` DOUBLE DEFAULT NULL"));
    }
}
