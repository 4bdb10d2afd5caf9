use thiserror::Error;

/// The move list as a whole could not be read. Single bad moves are not
/// reported here; they are skipped later during replay.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ImportFormatError {
    #[error("Empty game text")]
    Empty,

    #[error("Unbalanced {0} in movetext")]
    Unbalanced(&'static str),

    #[error("Unexpected token in movetext: {0}")]
    UnexpectedToken(String),

    #[error("Invalid descriptor JSON: {0}")]
    Json(String),
}

impl From<serde_json::Error> for ImportFormatError {
    fn from(e: serde_json::Error) -> Self {
        ImportFormatError::Json(e.to_string())
    }
}
