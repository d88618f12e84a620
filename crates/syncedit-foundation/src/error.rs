//! Error handling for the syncedit engine and its hosts

use thiserror::Error;

/// Core error type used throughout syncedit
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum SyncEditError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization/deserialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Offset {offset} is not a valid position in a document of {len} bytes")]
    InvalidOffset { offset: usize, len: usize },

    #[error("Range {start}..{end} is not a valid range in a document of {len} bytes")]
    InvalidRange { start: usize, end: usize, len: usize },

    #[error("Host is still analyzing the document")]
    HostNotReady,

    #[error("No sync-edit session for document {document}")]
    NoSession { document: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl SyncEditError {
    /// Create a new configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new invalid offset error
    pub fn invalid_offset(offset: usize, len: usize) -> Self {
        Self::InvalidOffset { offset, len }
    }

    /// Create a new invalid range error
    pub fn invalid_range(start: usize, end: usize, len: usize) -> Self {
        Self::InvalidRange { start, end, len }
    }

    /// Create a new missing session error
    pub fn no_session(document: impl Into<String>) -> Self {
        Self::NoSession {
            document: document.into(),
        }
    }

    /// Create a new internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether the error is the transient "host still parsing" condition
    pub fn is_host_not_ready(&self) -> bool {
        matches!(self, Self::HostNotReady)
    }
}

/// Result type alias for convenience
pub type SyncEditResult<T> = Result<T, SyncEditError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_error_chain() {
        fn inner_function() -> Result<(), io::Error> {
            Err(io::Error::new(io::ErrorKind::NotFound, "missing"))
        }

        fn outer_function() -> SyncEditResult<()> {
            inner_function()?;
            Ok(())
        }

        match outer_function().unwrap_err() {
            SyncEditError::Io(io_error) => assert_eq!(io_error.kind(), io::ErrorKind::NotFound),
            other => panic!("Expected IO error, got {other:?}"),
        }
    }

    #[test]
    fn test_error_helpers() {
        match SyncEditError::invalid_range(4, 2, 10) {
            SyncEditError::InvalidRange { start, end, len } => {
                assert_eq!((start, end, len), (4, 2, 10));
            }
            other => panic!("Expected invalid range error, got {other:?}"),
        }

        assert!(SyncEditError::HostNotReady.is_host_not_ready());
        assert!(!SyncEditError::config("bad").is_host_not_ready());
    }

    #[test]
    fn test_error_display() {
        let err = SyncEditError::invalid_offset(12, 5);
        assert_eq!(
            err.to_string(),
            "Offset 12 is not a valid position in a document of 5 bytes"
        );
    }
}
