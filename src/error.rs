//! Error types for the scoring crate

use thiserror::Error;

/// Result type alias using our custom Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the scoring crate
///
/// Scorers never fail; these variants cover persistence and input parsing
/// at the edges. Configuration and CLI errors use `anyhow`.
#[derive(Error, Debug)]
pub enum Error {
    // Persistence errors
    #[error("Storage error: {0}")]
    Storage(String),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    // Input errors
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

// Conversion from serde_json errors
impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        if e.is_data() || e.is_syntax() || e.is_eof() {
            Error::Deserialization(e.to_string())
        } else {
            Error::Serialization(e.to_string())
        }
    }
}
