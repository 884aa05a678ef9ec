use thiserror::Error;

/// Errors surfaced by the core simulation components.
///
/// Per-run failures in a sweep are caught at the orchestrator boundary and
/// logged with the failing parameter tuple; they are never retried. "No path
/// available" for an individual send is not an error at all -- it's a skip,
/// handled inline by [`crate::routing`] returning `None`.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("invalid graph parameters: {0}")]
    InvalidGraphParams(String),

    #[error("invalid simulation settings: {0}")]
    InvalidSettings(String),

    #[error("ground truth store I/O error for key {key}: {source}")]
    GroundTruthIo {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("ground truth record malformed for key {key}: {source}")]
    GroundTruthParse {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("observer set is empty or degenerate: {0}")]
    DegenerateObservers(String),
}

pub type SimResult<T> = Result<T, SimError>;
