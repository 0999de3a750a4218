//! Error taxonomy for the ingest pipeline.
//!
//! Every variant aborts the current delivery only; the driver logs it and
//! moves on. `Scoresheet` is the one failure that stops a whole file.

use thiserror::Error;

/// Result type for ingest operations.
pub type IngestResult<T> = Result<T, IngestError>;

#[derive(Debug, Error)]
pub enum IngestError {
    /// Connection failure or timeout talking to a remote store.
    #[error("transport error calling {endpoint}: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    /// Remote store answered with a status other than the expected one.
    #[error("unexpected status {status} from {endpoint} (expected {expected})")]
    Status {
        endpoint: String,
        status: u16,
        expected: u16,
    },

    /// Body could not be decoded, or decoded into an unusable record.
    #[error("malformed response from {endpoint}: {reason}")]
    MalformedResponse { endpoint: String, reason: String },

    /// Create call succeeded on the wire but returned no identifier.
    #[error("entity store did not assign an id to {kind} {key:?}")]
    CreationFailed { kind: &'static str, key: String },

    /// Dismissal kind or extras key outside the known vocabulary.
    #[error("unmapped {source_field} {raw:?}")]
    Unclassified {
        source_field: &'static str,
        raw: String,
    },

    /// Translation cannot proceed with the data at hand.
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// Scoresheet file could not be read or parsed.
    #[error("scoresheet error: {0}")]
    Scoresheet(String),

    /// Delivery could not be serialized for the event store.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl IngestError {
    pub fn transport(endpoint: &str, source: reqwest::Error) -> Self {
        Self::Transport {
            endpoint: endpoint.to_string(),
            source,
        }
    }

    pub fn malformed(endpoint: &str, reason: impl Into<String>) -> Self {
        Self::MalformedResponse {
            endpoint: endpoint.to_string(),
            reason: reason.into(),
        }
    }

    /// Short machine-friendly label used in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport { .. } => "transport",
            Self::Status { .. } => "status",
            Self::MalformedResponse { .. } => "malformed_response",
            Self::CreationFailed { .. } => "creation_failed",
            Self::Unclassified { .. } => "unclassified",
            Self::Precondition(_) => "precondition",
            Self::Scoresheet(_) => "scoresheet",
            Self::Serialization(_) => "serialization",
        }
    }
}
