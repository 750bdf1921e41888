//! Error types for survey sessions and result aggregation.

use thiserror::Error;

/// Result type for survey operations.
pub type Result<T> = std::result::Result<T, SurveyError>;

/// Errors raised by the session controller, storage and aggregator.
#[derive(Error, Debug)]
pub enum SurveyError {
    /// Submission does not match the current task, or the session is already complete
    #[error("Invalid submission: {0}")]
    InvalidSubmission(String),

    /// A restored session state does not fit the loaded task set
    #[error("Invalid session state: {0}")]
    InvalidSessionState(String),

    /// Task set failed validation on load
    #[error("Invalid task set: {0}")]
    InvalidTaskSet(String),

    /// Writing a finalized response record failed (never retried)
    #[error("Failed to persist response record: {source}")]
    Persistence {
        #[source]
        source: std::io::Error,
    },

    /// A record's rows or columns differ from the records aggregated before it
    #[error("Record {record} does not match the shape of earlier records: {detail}")]
    AggregationShapeMismatch { record: String, detail: String },

    /// A stored record could not be parsed as a rating table
    #[error("Malformed record {record}: {reason}")]
    MalformedRecord { record: String, reason: String },

    /// I/O operation error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
