use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // Validation errors
    #[error("Invalid peripheral address: {address} (expected at least {min_length} characters)")]
    InvalidAddress { address: String, min_length: usize },

    // Transport errors
    #[error("Not connected")]
    NotConnected,

    // Protocol errors
    #[error("Line too large: {length} bytes (max {max_length})")]
    LineTooLong { length: usize, max_length: usize },

    // State errors
    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
