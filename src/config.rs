//! Engine locations, parsed once from flags or environment and passed explicitly to commands.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::Serialize;

use crate::error::PipelineError;

pub const DB_URL_ENV: &str = "PULSE_DB_URL";
pub const SOURCE_URL_ENV: &str = "PULSE_SOURCE_URL";
pub const DESTINATION_URL_ENV: &str = "PULSE_DESTINATION_URL";

pub const DEFAULT_SQLITE_URL: &str = "sqlite://data/phonepe.db";
pub const DEFAULT_MYSQL_URL: &str = "mysql://root@localhost:3306/phonepe";

const SQLITE_MEMORY: &str = ":memory:";

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    Sqlite,
    Mysql,
}

impl EngineKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
            Self::Mysql => "mysql",
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum EngineConfig {
    Sqlite { path: PathBuf },
    Mysql { url: String },
}

impl EngineConfig {
    pub fn kind(&self) -> EngineKind {
        match self {
            Self::Sqlite { .. } => EngineKind::Sqlite,
            Self::Mysql { .. } => EngineKind::Mysql,
        }
    }

    /// Location safe to log: MySQL passwords are masked.
    pub fn redacted(&self) -> String {
        match self {
            Self::Sqlite { path } => format!("sqlite://{}", path.display()),
            Self::Mysql { url } => redact_password(url),
        }
    }
}

impl fmt::Display for EngineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.redacted())
    }
}

impl FromStr for EngineConfig {
    type Err = PipelineError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let raw = raw.trim();
        if raw == "sqlite::memory:" {
            return Ok(Self::Sqlite {
                path: PathBuf::from(SQLITE_MEMORY),
            });
        }
        if let Some(path) = raw
            .strip_prefix("sqlite://")
            .or_else(|| raw.strip_prefix("sqlite:"))
        {
            if path.is_empty() {
                return Err(PipelineError::Config(format!(
                    "sqlite url has no path: {raw}"
                )));
            }
            return Ok(Self::Sqlite {
                path: PathBuf::from(path),
            });
        }
        if let Some(rest) = raw.strip_prefix("mysql://") {
            if rest.is_empty() || !rest.contains('/') {
                return Err(PipelineError::Config(format!(
                    "mysql url must name a database: {}",
                    redact_password(raw)
                )));
            }
            return Ok(Self::Mysql {
                url: raw.to_string(),
            });
        }
        Err(PipelineError::Config(format!(
            "unsupported engine url (expected sqlite:// or mysql://): {}",
            redact_password(raw)
        )))
    }
}

fn redact_password(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    let Some((credentials, host)) = rest.rsplit_once('@') else {
        return url.to_string();
    };
    match credentials.split_once(':') {
        Some((user, _)) => format!("{scheme}://{user}:***@{host}"),
        None => url.to_string(),
    }
}
