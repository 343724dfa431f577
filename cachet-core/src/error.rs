// Error types for cache header construction

use thiserror::Error;

/// Result alias used across cachet.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while building cache headers.
///
/// Every variant describes a misconfigured handler. They are raised at
/// header-construction time and never degraded into a partial header.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Unknown flag or value key, negative seconds, or a malformed token.
    #[error("Invalid cache directive: {0}")]
    InvalidDirective(String),

    /// A directive that must be derived was supplied by the caller.
    #[error("Conflicting cache directive: {0}")]
    ConflictingDirective(String),

    /// A time that has no HTTP-date representation.
    #[error("Invalid HTTP date: {0}")]
    InvalidDate(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Get the HTTP status code for this error.
    ///
    /// All variants are server-side misconfiguration.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::InvalidDirective(_)
            | Error::ConflictingDirective(_)
            | Error::InvalidDate(_)
            | Error::Config(_) => 500,
        }
    }

    /// Check if this error came from the directive vocabulary.
    pub fn is_directive_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidDirective(_) | Error::ConflictingDirective(_)
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}
