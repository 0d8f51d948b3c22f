//! Error types for BinduIO

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// BinduIO error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Source could not be acquired or went away mid-use
    #[error("Source unavailable: {0}")]
    SourceUnavailable(String),

    /// Operation requires state the scanner is not in yet
    #[error("Not ready: {0}")]
    NotReady(&'static str),

    /// Device session lost without a consumer request
    #[error("Device connection lost")]
    DeviceLost,

    /// Completion event did not arrive within the deadline
    #[error("Operation timed out")]
    Timeout,

    /// Device acknowledged the request with a refusal
    #[error("Request rejected by device")]
    Rejected,

    /// Scanner was closed; only close() remains valid
    #[error("Scanner already closed")]
    AlreadyClosed,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Record serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Point log header or record structure is invalid
    #[error("Invalid point log: {0}")]
    InvalidFormat(String),

    /// Configuration parse or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Source kind not recognized by the factory
    #[error("Unknown source kind: {0}")]
    UnknownSource(String),
}

impl From<postcard::Error> for Error {
    fn from(e: postcard::Error) -> Self {
        Error::Serialize(e.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(e: toml::ser::Error) -> Self {
        Error::Config(e.to_string())
    }
}
