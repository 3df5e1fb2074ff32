//! Error types for bizlens-core

use thiserror::Error;

/// Main error type for the bizlens-core library
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Tabular input could not be parsed
    #[error("parse error: {0}")]
    Parse(String),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Uploaded table failed integrity validation
    #[error("data validation failed: {0}")]
    Validation(String),

    /// Text-generation request never reached the API (connect/timeout)
    #[error("text-generation network error: {0}")]
    LlmNetwork(String),

    /// Text-generation API returned an error status
    #[error("text-generation API error ({status}): {message}")]
    LlmApi { status: u16, message: String },

    /// Text-generation API returned a response we could not interpret
    #[error("unexpected text-generation response: {0}")]
    LlmResponse(String),
}

/// Result type alias for bizlens-core
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// True when the failure came from the text-generation collaborator,
    /// in any of its three categories.
    pub fn is_llm_error(&self) -> bool {
        matches!(
            self,
            Error::LlmNetwork(_) | Error::LlmApi { .. } | Error::LlmResponse(_)
        )
    }
}
