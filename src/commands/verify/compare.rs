//! Multiset comparison of two relation snapshots.
//!
//! Rows are reduced to hashable keys so that a relation compares in linear time. Integral reals
//! and integers share a key, since engines disagree on which one a numeric column comes back as.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::relation::{ColumnKind, Relation};
use crate::value::{Cell, TableData};

const ROUNDING_SCALE: f64 = 10_000.0;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "tier", rename_all = "snake_case")]
pub enum ValueMatch {
    Exact,
    /// Matched only after rounding real columns to 4 decimals; `exact_matched` rows matched before.
    Rounded { exact_matched: usize },
    SkippedEmpty,
    /// Column sets differ, so rows cannot be aligned.
    Incomparable,
    Mismatch { matched: usize, total: usize },
}

impl ValueMatch {
    pub fn passed(&self) -> bool {
        matches!(self, Self::Exact | Self::Rounded { .. } | Self::SkippedEmpty)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Key {
    Null,
    Int(i64),
    Bits(u64),
    Scaled(i64),
    Text(String),
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Tier {
    Exact,
    Rounded,
}

fn integral(value: f64) -> Option<i64> {
    if value.fract() == 0.0 && value >= i64::MIN as f64 && value < i64::MAX as f64 {
        Some(value as i64)
    } else {
        None
    }
}

fn key(cell: &Cell, tier: Tier, real_column: bool) -> Key {
    match (cell, tier) {
        (Cell::Null, _) => Key::Null,
        (Cell::Text(value), _) => Key::Text(value.clone()),
        (Cell::Int(value), Tier::Rounded) if real_column => {
            match value.checked_mul(ROUNDING_SCALE as i64) {
                Some(scaled) => Key::Scaled(scaled),
                None => Key::Int(*value),
            }
        }
        (Cell::Real(value), Tier::Rounded) if real_column => {
            let scaled = (value * ROUNDING_SCALE).round();
            match integral(scaled) {
                Some(scaled) => Key::Scaled(scaled),
                None => Key::Bits(value.to_bits()),
            }
        }
        (Cell::Int(value), _) => Key::Int(*value),
        (Cell::Real(value), _) => match integral(*value) {
            Some(value) => Key::Int(value),
            None => Key::Bits(value.to_bits()),
        },
    }
}

/// Positions of `columns` within `table`, or `None` if any name is missing.
fn projection(table: &TableData, columns: &[String]) -> Option<Vec<usize>> {
    columns
        .iter()
        .map(|name| table.columns.iter().position(|column| column == name))
        .collect()
}

fn row_keys(
    table: &TableData,
    positions: &[usize],
    real_columns: &[bool],
    tier: Tier,
) -> Vec<Vec<Key>> {
    table
        .rows
        .iter()
        .map(|row| {
            positions
                .iter()
                .zip(real_columns)
                .map(|(&position, &real)| match row.get(position) {
                    Some(cell) => key(cell, tier, real),
                    None => Key::Null,
                })
                .collect()
        })
        .collect()
}

/// Rows of `source` matched one-to-one by an equal row of `destination`.
fn matched_rows(source: Vec<Vec<Key>>, destination: Vec<Vec<Key>>) -> usize {
    let mut remaining: HashMap<Vec<Key>, usize> = HashMap::new();
    for row in destination {
        *remaining.entry(row).or_default() += 1;
    }

    let mut matched = 0;
    for row in source {
        if let Some(count) = remaining.get_mut(&row) {
            if *count > 0 {
                *count -= 1;
                matched += 1;
            }
        }
    }
    matched
}

/// Compares full-row multisets, exact first, then with real columns rounded to 4 decimals.
pub fn compare_values(
    relation: &Relation,
    source: &TableData,
    destination: &TableData,
) -> ValueMatch {
    if source.is_empty() && destination.is_empty() {
        return ValueMatch::SkippedEmpty;
    }

    let source_names = source.columns.iter().collect::<HashSet<_>>();
    let destination_names = destination.columns.iter().collect::<HashSet<_>>();
    if source_names != destination_names {
        return ValueMatch::Incomparable;
    }

    let columns = source.columns.clone();
    let (Some(source_positions), Some(destination_positions)) = (
        projection(source, &columns),
        projection(destination, &columns),
    ) else {
        return ValueMatch::Incomparable;
    };
    let real_columns = columns
        .iter()
        .map(|name| {
            relation
                .columns
                .iter()
                .any(|column| column.name == name.as_str() && column.kind == ColumnKind::Real)
        })
        .collect::<Vec<_>>();

    let total = source.len().max(destination.len());
    let exact = matched_rows(
        row_keys(source, &source_positions, &real_columns, Tier::Exact),
        row_keys(destination, &destination_positions, &real_columns, Tier::Exact),
    );
    if exact == total {
        return ValueMatch::Exact;
    }

    let rounded = matched_rows(
        row_keys(source, &source_positions, &real_columns, Tier::Rounded),
        row_keys(destination, &destination_positions, &real_columns, Tier::Rounded),
    );
    if rounded == total {
        return ValueMatch::Rounded {
            exact_matched: exact,
        };
    }

    ValueMatch::Mismatch {
        matched: rounded,
        total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integral_reals_and_integers_share_a_key() {
        assert_eq!(key(&Cell::Real(5.0), Tier::Exact, false), Key::Int(5));
        assert_eq!(key(&Cell::Int(5), Tier::Exact, false), Key::Int(5));
        assert_ne!(
            key(&Cell::Real(5.5), Tier::Exact, true),
            key(&Cell::text("5.5"), Tier::Exact, true)
        );
    }

    #[test]
    fn rounding_only_applies_to_real_columns() {
        assert_eq!(
            key(&Cell::Real(0.123412), Tier::Rounded, true),
            key(&Cell::Real(0.12341), Tier::Rounded, true)
        );
        assert_ne!(
            key(&Cell::Real(0.123412), Tier::Rounded, false),
            key(&Cell::Real(0.12341), Tier::Rounded, false)
        );
    }

    #[test]
    fn oversized_integers_in_real_columns_keep_distinct_keys() {
        let near_max = key(&Cell::Int(i64::MAX - 1), Tier::Rounded, true);
        let max = key(&Cell::Int(i64::MAX), Tier::Rounded, true);
        assert_ne!(near_max, max);
        assert_eq!(max, Key::Int(i64::MAX));
        assert_eq!(key(&Cell::Int(3), Tier::Rounded, true), Key::Scaled(30_000));
    }

    #[test]
    fn duplicates_must_be_matched_one_to_one() {
        let source = vec![vec![Key::Int(1)], vec![Key::Int(1)]];
        let destination = vec![vec![Key::Int(1)], vec![Key::Int(2)]];
        assert_eq!(matched_rows(source, destination), 1);
    }
}
