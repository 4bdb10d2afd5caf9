//! Annotator error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnnotatorError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Engine timed out after {0} ms")]
    EngineTimeout(u64),

    #[error("Illegal move {san} in {fen}")]
    IllegalMove { san: String, fen: String },

    #[error("Invalid FEN: {0}")]
    InvalidFen(String),

    #[error("Book lookup failed: {0}")]
    Lookup(String),

    #[error("Import failed: {0}")]
    Import(#[from] chess_core::ImportFormatError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failures on the engine channel. Protocol errors normally surface as an
/// `Evaluation` carrying an error; these are the ones that end a request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("Failed to spawn engine: {0}")]
    Spawn(String),

    #[error("Engine I/O failed: {0}")]
    Io(String),

    #[error("Engine handshake failed: expected {0}")]
    Handshake(&'static str),

    #[error("Engine closed unexpectedly")]
    Closed,

    #[error("Request superseded by a newer one")]
    Superseded,

    #[error("Engine protocol error: {0}")]
    Protocol(String),
}

impl From<std::io::Error> for EngineError {
    fn from(e: std::io::Error) -> Self {
        EngineError::Io(e.to_string())
    }
}
