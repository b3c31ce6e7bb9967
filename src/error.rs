use thiserror::Error;

#[derive(Debug, Error)]
pub enum RagtrackError {
    #[error("No employee matched \"{0}\"")]
    NoMatch(String),

    #[error("{matched} employees matched \"{query}\"; pass --use-first to take the first match")]
    AmbiguousMatch { query: String, matched: usize },

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("Roster format error: {0}")]
    Format(#[from] FormatError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Business-rule rejections. Raised before anything is persisted;
/// the caller can correct the input and resubmit.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("comment must not be empty")]
    EmptyComment,

    #[error("\"{0}\" is not a RAG status (expected Red, Amber or Green)")]
    InvalidStatus(String),
}

/// Storage-layer faults from the audit store. Never raised for
/// business-rule violations — those are rejected earlier as
/// [`ValidationError`].
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("audit log write failed: {0}")]
    Write(#[source] std::io::Error),

    #[error("audit log read failed: {0}")]
    Read(#[source] std::io::Error),

    #[error("corrupt audit log at line {line}: {source}")]
    Corrupt {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("record encoding failed: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Roster ingestion failures. A malformed payload never partially
/// populates the roster index.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormatError {
    #[error("roster payload is not valid UTF-8")]
    Encoding,

    #[error("roster payload has no header row")]
    MissingHeader,

    #[error("required column \"{0}\" is missing from the roster header")]
    MissingColumn(String),

    #[error("unparsable roster row at line {line}: {reason}")]
    Row { line: usize, reason: String },
}

/// A single delivery attempt failure from a notification transport.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("sink returned status {status}: {message}")]
    Rejected { status: u16, message: String },
}
