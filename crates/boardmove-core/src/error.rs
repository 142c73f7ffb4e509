use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MigrationError {
    /// An expected control or element never appeared within its timeout.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Every content-injection strategy ran without the text showing up.
    #[error("Content injection failed: {0}")]
    InjectionFailed(String),

    /// The board value is missing its required shape.
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("Migration cancelled")]
    Cancelled,

    /// The destination backend itself failed (browser gone, script error).
    #[error("Surface error: {0}")]
    Surface(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Serializable tag for an error, stored in migration reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    NotFound,
    InjectionFailed,
    MalformedInput,
    Cancelled,
    Surface,
    Config,
    Serialization,
    Io,
    Internal,
}

impl MigrationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::InjectionFailed(_) => ErrorKind::InjectionFailed,
            Self::MalformedInput(_) => ErrorKind::MalformedInput,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Surface(_) => ErrorKind::Surface,
            Self::Config(_) => ErrorKind::Config,
            Self::Serialization(_) => ErrorKind::Serialization,
            Self::Io(_) => ErrorKind::Io,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Whether the error only affects the item being migrated.
    ///
    /// Recoverable errors are recorded in the report and the migration moves
    /// on to the next card or column.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_) | Self::InjectionFailed(_) | Self::Surface(_)
        )
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn malformed(what: impl Into<String>) -> Self {
        Self::MalformedInput(what.into())
    }
}

impl From<serde_json::Error> for MigrationError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
