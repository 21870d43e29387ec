use serde::Serialize;

/// Errors surfaced by the store, the query engine and the command channel.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NoiseError {
    /// Malformed or missing request fields. Raised before storage is touched.
    #[error("Invalid request: {0}")]
    Validation(String),

    /// An event already occupies this `datetime` key. The stored event is kept.
    #[error("An event is already logged at {0}")]
    DuplicateKey(String),

    /// The backing store failed underneath a request.
    #[error("Storage error: {0}")]
    Io(String),

    /// Caller bug: a value the caller was required to check is out of range.
    #[error("Precondition violated: {0}")]
    Precondition(String),
}

pub type Result<T, E = NoiseError> = std::result::Result<T, E>;

impl NoiseError {
    /// Stable discriminant used in `error` responses.
    pub fn kind(&self) -> &'static str {
        match self {
            NoiseError::Validation(_) => "validation",
            NoiseError::DuplicateKey(_) => "duplicate-key",
            NoiseError::Io(_) => "io",
            NoiseError::Precondition(_) => "precondition",
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        NoiseError::Validation(message.into())
    }

    pub fn precondition(message: impl Into<String>) -> Self {
        NoiseError::Precondition(message.into())
    }
}

impl From<rusqlite::Error> for NoiseError {
    fn from(err: rusqlite::Error) -> Self {
        NoiseError::Io(err.to_string())
    }
}

impl From<std::io::Error> for NoiseError {
    fn from(err: std::io::Error) -> Self {
        NoiseError::Io(err.to_string())
    }
}

/// Wire form of a [`NoiseError`], carried by `error` responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorInfo {
    pub kind: String,
    pub message: String,
}

impl From<&NoiseError> for ErrorInfo {
    fn from(err: &NoiseError) -> Self {
        Self {
            kind: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}
