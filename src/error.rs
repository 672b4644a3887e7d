use thiserror::Error;

/// Main error type for fathom operations
#[derive(Error, Debug)]
pub enum FathomError {
    #[error("Failed to open store at {path}: {reason}")]
    StoreOpen { path: String, reason: String },

    #[error("Exclusive index writer is busy")]
    WriterBusy,

    #[error("Commit failed after {attempts} attempts: {reason}")]
    CommitFailed { attempts: u32, reason: String },

    #[error("Unknown property: {0}")]
    UnknownProperty(String),

    #[error("Unsupported comparator {comparator} on property '{property}'")]
    UnsupportedComparator {
        property: String,
        comparator: String,
    },

    #[error("Malformed query JSON: {0}")]
    MalformedQueryJson(String),

    #[error("Extractor '{plugin}' failed: {message}")]
    ExtractorFault { plugin: String, message: String },

    #[error("Catalogue error: {0}")]
    Catalogue(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for fathom operations
pub type Result<T> = std::result::Result<T, FathomError>;

impl FathomError {
    /// Check if this error indicates a transient failure that could be retried
    pub fn is_retriable(&self) -> bool {
        match self {
            FathomError::WriterBusy => true,
            FathomError::Catalogue(rusqlite::Error::SqliteFailure(err, _)) => {
                matches!(
                    err.code,
                    rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
                )
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FathomError::UnknownProperty("frobnication".to_string());
        assert_eq!(err.to_string(), "Unknown property: frobnication");
    }

    #[test]
    fn test_retriable_errors() {
        assert!(FathomError::WriterBusy.is_retriable());
        assert!(!FathomError::UnknownProperty("x".to_string()).is_retriable());
        assert!(!FathomError::MalformedQueryJson("{".to_string()).is_retriable());
    }
}
