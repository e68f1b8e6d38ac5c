//! Error classes that callers branch on: retry, abort, or report.

use thiserror::Error;

use crate::config::EngineKind;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid engine url: {0}")]
    Config(String),

    #[error("{engine} engine unreachable at {location}: {reason}")]
    EngineUnreachable {
        engine: EngineKind,
        location: String,
        reason: String,
    },

    #[error("{engine} query failed on {relation}: {reason}")]
    Engine {
        engine: EngineKind,
        relation: String,
        reason: String,
    },

    #[error(
        "row count mismatch on {relation}: source={source_rows} destination={destination_rows}"
    )]
    RowCountMismatch {
        relation: String,
        source_rows: u64,
        destination_rows: u64,
    },
}

impl PipelineError {
    pub fn engine(
        engine: EngineKind,
        relation: impl Into<String>,
        reason: impl ToString,
    ) -> Self {
        Self::Engine {
            engine,
            relation: relation.into(),
            reason: reason.to_string(),
        }
    }

    pub fn unreachable(
        engine: EngineKind,
        location: impl Into<String>,
        reason: impl ToString,
    ) -> Self {
        Self::EngineUnreachable {
            engine,
            location: location.into(),
            reason: reason.to_string(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::EngineUnreachable { .. })
    }
}

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
