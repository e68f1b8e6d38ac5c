use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::{debug, warn};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Section {
    Aggregated,
    Map,
    Top,
}

impl Section {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Aggregated => "aggregated",
            Self::Map => "map",
            Self::Top => "top",
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Topic {
    Transaction,
    User,
    Insurance,
}

impl Topic {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Transaction => "transaction",
            Self::User => "user",
            Self::Insurance => "insurance",
        }
    }
}

/// One `section/topic` subtree of the input tree.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Category {
    pub section: Section,
    pub topic: Topic,
}

impl Category {
    pub const fn new(section: Section, topic: Topic) -> Self {
        Self { section, topic }
    }

    pub fn root(&self, data_dir: &Path, country: &str) -> PathBuf {
        data_dir
            .join(self.section.as_str())
            .join(self.topic.as_str())
            .join("country")
            .join(country)
            .join("state")
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.section.as_str(), self.topic.as_str())
    }
}

/// A `state/year/quarter.json` leaf. Year and quarter come from the path only.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd)]
pub struct LeafDocument {
    pub state_dir: String,
    pub year: i64,
    pub quarter: i64,
    pub path: PathBuf,
}

impl LeafDocument {
    pub fn load(&self) -> Result<Value> {
        let raw = fs::read(&self.path)
            .with_context(|| format!("failed to read {}", self.path.display()))?;
        serde_json::from_slice(&raw)
            .with_context(|| format!("failed to parse {}", self.path.display()))
    }
}

/// Leaves under a category root, sorted by (state, year, quarter). A missing root is empty.
pub fn walk(root: &Path) -> Result<Vec<LeafDocument>> {
    if !root.exists() {
        debug!(root = %root.display(), "category root missing, no documents");
        return Ok(Vec::new());
    }

    let mut leaves = Vec::new();
    for (state_dir, state_path) in subdirectories(root)? {
        for (year_dir, year_path) in subdirectories(&state_path)? {
            let Ok(year) = year_dir.parse::<i64>() else {
                warn!(path = %year_path.display(), "year directory is not an integer, skipping");
                continue;
            };

            for file_path in quarter_files(&year_path)? {
                let Some(quarter) = parse_quarter(&file_path) else {
                    warn!(path = %file_path.display(), "quarter file name is not 1-4, skipping");
                    continue;
                };
                leaves.push(LeafDocument {
                    state_dir: state_dir.clone(),
                    year,
                    quarter,
                    path: file_path,
                });
            }
        }
    }

    leaves.sort();
    Ok(leaves)
}

fn subdirectories(parent: &Path) -> Result<Vec<(String, PathBuf)>> {
    let entries = fs::read_dir(parent)
        .with_context(|| format!("failed to read {}", parent.display()))?;

    let mut directories = Vec::new();
    for entry in entries {
        let entry =
            entry.with_context(|| format!("failed to read entry in {}", parent.display()))?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
            warn!(path = %path.display(), "non UTF-8 directory name, skipping");
            continue;
        };
        directories.push((name.to_string(), path.clone()));
    }
    Ok(directories)
}

fn quarter_files(year_path: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(year_path)
        .with_context(|| format!("failed to read {}", year_path.display()))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry =
            entry.with_context(|| format!("failed to read entry in {}", year_path.display()))?;
        let path = entry.path();

        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        if is_json && path.is_file() {
            files.push(path);
        }
    }
    Ok(files)
}

fn parse_quarter(path: &Path) -> Option<i64> {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .and_then(|stem| stem.trim().parse::<i64>().ok())
        .filter(|quarter| (1..=4).contains(quarter))
}
