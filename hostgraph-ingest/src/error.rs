use crate::driver::IngestSummary;
use hostgraph_core::{HostnameError, StoreError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Line {line} is not valid UTF-8")]
    Encoding { line: usize },

    #[error("Invalid JSON on line {line}: {source}")]
    Json {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Missing field '{field}' on line {line}")]
    MissingField { line: usize, field: &'static str },

    #[error("Malformed record on line {line}: {source}")]
    Malformed {
        line: usize,
        #[source]
        source: HostnameError,
    },

    #[error("Reserved source '{source_name}' on line {line}")]
    ReservedSource { line: usize, source_name: String },

    #[error(transparent)]
    Store(#[from] StoreError),

    /// The batch stopped partway; `summary` counts the lines handled before the failure.
    #[error("Aborted after {} records: {source}", .summary.records)]
    Aborted {
        summary: Box<IngestSummary>,
        #[source]
        source: Box<IngestError>,
    },
}

impl IngestError {
    /// True for errors that only invalidate the current line.
    pub fn is_record_error(&self) -> bool {
        matches!(
            self,
            IngestError::Encoding { .. }
                | IngestError::Json { .. }
                | IngestError::MissingField { .. }
                | IngestError::Malformed { .. }
                | IngestError::ReservedSource { .. }
        )
    }

    /// Counters of an aborted batch, if the batch got that far.
    pub fn partial_summary(&self) -> Option<&IngestSummary> {
        match self {
            IngestError::Aborted { summary, .. } => Some(summary),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, IngestError>;
