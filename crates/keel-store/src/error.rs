//! Store error types.

use thiserror::Error;

/// Errors that can occur against a backing store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store could not be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A fetched document could not be decoded.
    #[error("malformed document: {0}")]
    MalformedDocument(String),

    /// A write was rejected by the backing store.
    #[error("write rejected: {0}")]
    WriteRejected(String),
}

/// Convenience alias for store results.
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StoreError::Unavailable("connection refused".to_string());
        assert_eq!(err.to_string(), "store unavailable: connection refused");
    }
}
