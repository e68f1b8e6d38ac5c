use std::path::Path;

use anyhow::Result;
use tracing::{debug, warn};

use super::normalize::{district_name, state_name};
use super::walker::{Category, LeafDocument, Section, Topic, walk};
use crate::document::{Node, ShapeError};
use crate::relation::{self, Relation};
use crate::value::{Cell, Row};

/// Path-derived coordinates stamped onto every record of one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provenance {
    pub state: String,
    pub year: i64,
    pub quarter: i64,
}

impl Provenance {
    pub fn from_leaf(leaf: &LeafDocument) -> Self {
        Self {
            state: state_name(&leaf.state_dir),
            year: leaf.year,
            quarter: leaf.quarter,
        }
    }
}

/// One outcome per entry: a record, or the reason the entry was skipped.
pub type Outcomes = Vec<Result<Row, ShapeError>>;

pub type Extractor = fn(&Node<'_>, &Provenance) -> Outcomes;

pub struct Dataset {
    pub label: &'static str,
    pub relation: &'static Relation,
    pub category: Category,
    pub extract: Extractor,
}

pub static DATASETS: [Dataset; 10] = [
    Dataset {
        label: "Aggregated Transaction",
        relation: &relation::AGGREGATED_TRANSACTION,
        category: Category::new(Section::Aggregated, Topic::Transaction),
        extract: aggregated_transaction,
    },
    Dataset {
        label: "Aggregated User",
        relation: &relation::AGGREGATED_USER,
        category: Category::new(Section::Aggregated, Topic::User),
        extract: aggregated_user,
    },
    Dataset {
        label: "Aggregated Insurance",
        relation: &relation::AGGREGATED_INSURANCE,
        category: Category::new(Section::Aggregated, Topic::Insurance),
        extract: aggregated_insurance,
    },
    Dataset {
        label: "User Devices",
        relation: &relation::AGGREGATED_USER_DEVICE,
        category: Category::new(Section::Aggregated, Topic::User),
        extract: user_device,
    },
    Dataset {
        label: "Map Transaction",
        relation: &relation::MAP_MAP,
        category: Category::new(Section::Map, Topic::Transaction),
        extract: map_transaction,
    },
    Dataset {
        label: "Map User",
        relation: &relation::MAP_USER,
        category: Category::new(Section::Map, Topic::User),
        extract: map_user,
    },
    Dataset {
        label: "Map Insurance",
        relation: &relation::MAP_INSURANCE,
        category: Category::new(Section::Map, Topic::Insurance),
        extract: map_insurance,
    },
    Dataset {
        label: "Top Transaction",
        relation: &relation::TOP_MAP,
        category: Category::new(Section::Top, Topic::Transaction),
        extract: top_transaction,
    },
    Dataset {
        label: "Top User",
        relation: &relation::TOP_USER,
        category: Category::new(Section::Top, Topic::User),
        extract: top_user,
    },
    Dataset {
        label: "Top Insurance",
        relation: &relation::TOP_INSURANCE,
        category: Category::new(Section::Top, Topic::Insurance),
        extract: top_insurance,
    },
];

#[derive(Debug, Default)]
pub struct Extraction {
    pub rows: Vec<Row>,
    pub documents: usize,
    pub unreadable_documents: usize,
    pub skipped_records: usize,
}

pub fn extract_dataset(dataset: &Dataset, data_dir: &Path, country: &str) -> Result<Extraction> {
    let root = dataset.category.root(data_dir, country);
    let leaves = walk(&root)?;

    let mut extraction = Extraction::default();
    for leaf in &leaves {
        let document = match leaf.load() {
            Ok(document) => document,
            Err(err) => {
                warn!(path = %leaf.path.display(), error = %err, "unreadable document, skipping");
                extraction.unreadable_documents += 1;
                continue;
            }
        };
        extraction.documents += 1;

        let provenance = Provenance::from_leaf(leaf);
        for outcome in (dataset.extract)(&Node::root(&document), &provenance) {
            match outcome {
                Ok(row) => extraction.rows.push(row),
                Err(reason) => {
                    debug!(
                        relation = dataset.relation.name,
                        path = %leaf.path.display(),
                        reason = %reason,
                        "skipped record"
                    );
                    extraction.skipped_records += 1;
                }
            }
        }
    }

    Ok(extraction)
}

fn data_branch<'a>(document: &Node<'a>, key: &str) -> Result<Node<'a>, ShapeError> {
    document.get("data")?.get(key)
}

fn list_branch<'a>(document: &Node<'a>, key: &str) -> Result<Vec<Node<'a>>, ShapeError> {
    data_branch(document, key)?.items()
}

fn state_year_quarter(at: &Provenance) -> Row {
    vec![
        Cell::text(at.state.as_str()),
        Cell::Int(at.year),
        Cell::Int(at.quarter),
    ]
}

fn state_key_year_quarter(at: &Provenance, key: Cell) -> Row {
    vec![
        Cell::text(at.state.as_str()),
        key,
        Cell::Int(at.year),
        Cell::Int(at.quarter),
    ]
}

/// `transactionData[]` of `{name, paymentInstruments: [{count, amount}]}`.
fn payment_categories(document: &Node<'_>, at: &Provenance) -> Outcomes {
    let entries = match list_branch(document, "transactionData") {
        Ok(entries) => entries,
        Err(err) => return vec![Err(err)],
    };

    entries
        .iter()
        .map(|entry| {
            let name = entry.get("name")?.as_str()?;
            let instrument = entry.get("paymentInstruments")?.first()?;
            let mut row = state_year_quarter(at);
            row.push(Cell::text(name));
            row.push(instrument.get("count")?.integer_cell()?);
            row.push(instrument.get("amount")?.real_cell()?);
            Ok(row)
        })
        .collect()
}

pub fn aggregated_transaction(document: &Node<'_>, at: &Provenance) -> Outcomes {
    payment_categories(document, at)
}

pub fn aggregated_insurance(document: &Node<'_>, at: &Provenance) -> Outcomes {
    payment_categories(document, at)
}

pub fn aggregated_user(document: &Node<'_>, at: &Provenance) -> Outcomes {
    vec![user_totals(document, at)]
}

fn user_totals(document: &Node<'_>, at: &Provenance) -> Result<Row, ShapeError> {
    let aggregated = data_branch(document, "aggregated")?;
    let mut row = state_year_quarter(at);
    row.push(aggregated.get("registeredUsers")?.integer_cell()?);
    row.push(aggregated.get("appOpens")?.integer_cell()?);
    Ok(row)
}

/// A null or absent `usersByDevice` list is normal and yields nothing.
pub fn user_device(document: &Node<'_>, at: &Provenance) -> Outcomes {
    let devices = match document
        .get("data")
        .and_then(|data| data.get_opt("usersByDevice"))
    {
        Ok(Some(devices)) => devices,
        Ok(None) => return Vec::new(),
        Err(err) => return vec![Err(err)],
    };
    let entries = match devices.items() {
        Ok(entries) => entries,
        Err(err) => return vec![Err(err)],
    };

    entries
        .iter()
        .map(|device| {
            let mut row = state_year_quarter(at);
            row.push(Cell::text(device.get("brand")?.as_str()?));
            row.push(device.get("count")?.integer_cell()?);
            row.push(device.get("percentage")?.real_cell()?);
            Ok(row)
        })
        .collect()
}

/// `hoverDataList[]` of `{name, metric: [{count, amount}]}`.
fn district_metrics(document: &Node<'_>, at: &Provenance) -> Outcomes {
    let entries = match list_branch(document, "hoverDataList") {
        Ok(entries) => entries,
        Err(err) => return vec![Err(err)],
    };

    entries
        .iter()
        .map(|entry| {
            let district = district_name(entry.get("name")?.as_str()?);
            let metric = entry.get("metric")?.first()?;
            let mut row = state_key_year_quarter(at, Cell::Text(district));
            row.push(metric.get("count")?.integer_cell()?);
            row.push(metric.get("amount")?.real_cell()?);
            Ok(row)
        })
        .collect()
}

pub fn map_transaction(document: &Node<'_>, at: &Provenance) -> Outcomes {
    district_metrics(document, at)
}

pub fn map_insurance(document: &Node<'_>, at: &Provenance) -> Outcomes {
    district_metrics(document, at)
}

/// `hoverData` maps district name to `{registeredUsers, appOpens}`.
pub fn map_user(document: &Node<'_>, at: &Provenance) -> Outcomes {
    let districts = match data_branch(document, "hoverData").and_then(|hover| hover.entries()) {
        Ok(districts) => districts,
        Err(err) => return vec![Err(err)],
    };

    districts
        .iter()
        .map(|(name, metrics)| {
            let mut row = state_key_year_quarter(at, Cell::Text(district_name(name)));
            row.push(metrics.get("registeredUsers")?.integer_cell()?);
            row.push(metrics.get("appOpens")?.integer_cell()?);
            Ok(row)
        })
        .collect()
}

/// `pincodes[]` of `{entityName, metric: {count, amount}}`.
fn pincode_metrics(document: &Node<'_>, at: &Provenance) -> Outcomes {
    let entries = match list_branch(document, "pincodes") {
        Ok(entries) => entries,
        Err(err) => return vec![Err(err)],
    };

    entries
        .iter()
        .map(|entry| {
            let pincode = entry.get("entityName")?.text_cell()?;
            let metric = entry.get("metric")?;
            let mut row = state_key_year_quarter(at, pincode);
            row.push(metric.get("count")?.integer_cell()?);
            row.push(metric.get("amount")?.real_cell()?);
            Ok(row)
        })
        .collect()
}

pub fn top_transaction(document: &Node<'_>, at: &Provenance) -> Outcomes {
    pincode_metrics(document, at)
}

pub fn top_insurance(document: &Node<'_>, at: &Provenance) -> Outcomes {
    pincode_metrics(document, at)
}

/// `pincodes[]` of `{name, registeredUsers}`.
pub fn top_user(document: &Node<'_>, at: &Provenance) -> Outcomes {
    let entries = match list_branch(document, "pincodes") {
        Ok(entries) => entries,
        Err(err) => return vec![Err(err)],
    };

    entries
        .iter()
        .map(|entry| {
            let pincode = entry.get("name")?.text_cell()?;
            let mut row = state_key_year_quarter(at, pincode);
            row.push(entry.get("registeredUsers")?.integer_cell()?);
            Ok(row)
        })
        .collect()
}
