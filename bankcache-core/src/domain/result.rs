//! Result and error types for the core library

use thiserror::Error;

/// Core library error type
///
/// The three variants the cache layer cares about are `Provider`, `NotFound`
/// and `Storage`. Callers branch on them: a `NotFound` on a cached read is an
/// empty state, a `Provider` failure on a live read is a bad gateway, and a
/// `Storage` failure is always fatal.
#[derive(Error, Debug)]
pub enum Error {
    /// The account data provider rejected or failed a call.
    ///
    /// `status` is `None` when no HTTP response was received (timeout,
    /// connection refused, TLS failure).
    #[error("Provider error ({}): {body}", describe_status(.status))]
    Provider { status: Option<u16>, body: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a provider error from an HTTP status and response body
    pub fn provider(status: Option<u16>, body: impl Into<String>) -> Self {
        Self::Provider {
            status,
            body: body.into(),
        }
    }

    /// Create a storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub fn is_provider(&self) -> bool {
        matches!(self, Self::Provider { .. })
    }
}

impl From<duckdb::Error> for Error {
    fn from(value: duckdb::Error) -> Self {
        match value {
            duckdb::Error::QueryReturnedNoRows => Error::NotFound("query returned no rows".to_string()),
            error => {
                tracing::error!("an unhandled storage error occurred: {}", error);
                Error::Storage(error.to_string())
            }
        }
    }
}

fn describe_status(status: &Option<u16>) -> String {
    match status {
        Some(code) => code.to_string(),
        None => "no response".to_string(),
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_display_with_status() {
        let err = Error::provider(Some(401), "enrollment.disconnected");
        assert_eq!(
            err.to_string(),
            "Provider error (401): enrollment.disconnected"
        );
        assert!(err.is_provider());
    }

    #[test]
    fn test_provider_error_display_without_status() {
        let err = Error::provider(None, "timed out");
        assert!(err.to_string().contains("no response"));
    }

    #[test]
    fn test_no_rows_maps_to_not_found() {
        let err: Error = duckdb::Error::QueryReturnedNoRows.into();
        assert!(err.is_not_found());
    }
}
