//! Domain error types
//!
//! These errors are framework-agnostic and represent request-level failures.
//! Provider failures have their own type (`ProviderError`) because they never
//! leave the provider boundary.

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum DomainError {
    /// Bad or missing input (e.g. an empty identifier)
    Validation(String),
    /// A mandatory credential or setting is not configured
    Configuration(String),
    /// Cover cache persistence error
    Database(String),
    /// Unexpected failure while aggregating
    Internal(String),
}

impl fmt::Display for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DomainError::Validation(msg) => write!(f, "{}", msg),
            DomainError::Configuration(msg) => write!(f, "{}", msg),
            DomainError::Database(msg) => write!(f, "Database error: {}", msg),
            DomainError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for DomainError {}

// Conversion from SeaORM errors (used by the cover cache)
impl From<sea_orm::DbErr> for DomainError {
    fn from(e: sea_orm::DbErr) -> Self {
        DomainError::Database(e.to_string())
    }
}

/// Why a single provider produced no contribution.
///
/// Never surfaced to HTTP callers; the aggregator logs it and treats the
/// provider as absent.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// Transport-level failure (DNS, connect, body read)
    Http(String),
    /// Non-success HTTP status
    Status(u16),
    /// Payload could not be decoded
    Parse(String),
    /// The provider answered but knows nothing about the identifier
    NotFound,
    /// The soft per-call timeout elapsed
    Timeout,
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderError::Http(msg) => write!(f, "request failed: {}", msg),
            ProviderError::Status(code) => write!(f, "returned status {}", code),
            ProviderError::Parse(msg) => write!(f, "unparseable payload: {}", msg),
            ProviderError::NotFound => write!(f, "no item found"),
            ProviderError::Timeout => write!(f, "timed out"),
        }
    }
}

impl std::error::Error for ProviderError {}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ProviderError::Timeout
        } else if let Some(status) = e.status() {
            ProviderError::Status(status.as_u16())
        } else {
            ProviderError::Http(e.to_string())
        }
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(e: serde_json::Error) -> Self {
        ProviderError::Parse(e.to_string())
    }
}
