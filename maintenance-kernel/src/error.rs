//! Error kinds of the maintenance pipeline.
//!
//! Each stage has its own enum; `MaintenanceError` is what a coordinator run
//! surfaces to its caller (HTTP handler, MQTT listener or the CLI).

use std::time::Duration;

/// Failures of the search collaborator itself.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("search backend not configured: missing {0}")]
    Configuration(String),
    #[error("search request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("search backend answered {status}: {body}")]
    Status { status: u16, body: String },
    #[error("invalid search response: {0}")]
    Decode(String),
}

/// Failures of the evidence retrieval stage.
#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    #[error(transparent)]
    Search(#[from] SearchError),
    #[error("search call timed out after {}ms", .0.as_millis())]
    Timeout(Duration),
    #[error("retrieval limiter closed")]
    Closed,
}

impl RetrievalError {
    /// True when the failure comes from missing credentials rather than the
    /// call itself.
    pub fn is_configuration(&self) -> bool {
        matches!(self, RetrievalError::Search(SearchError::Configuration(_)))
    }
}

/// Bad or incomplete inbound events (JSON body, MQTT payload or CSV table).
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("malformed event: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("deviceId is missing or empty")]
    MissingDeviceId,
    #[error("{0} must be a finite number")]
    NonFinite(&'static str),
    #[error("topK must be at least 1")]
    InvalidTopK,
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("table {0} has no rows")]
    EmptyTable(String),
    #[error("unrecognised timestamp '{0}'")]
    BadTimestamp(String),
}

#[derive(Debug, thiserror::Error)]
pub enum MaintenanceError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("retrieval error: {0}")]
    Retrieval(RetrievalError),
    #[error("input error: {0}")]
    Input(#[from] InputError),
}

impl From<RetrievalError> for MaintenanceError {
    fn from(err: RetrievalError) -> Self {
        match err {
            RetrievalError::Search(SearchError::Configuration(missing)) => {
                MaintenanceError::Configuration(missing)
            }
            other => MaintenanceError::Retrieval(other),
        }
    }
}
