//! Error types for the storage and data-access layers.
//!
//! The session and collection stores never hand these to the REPL: they
//! log them and degrade to a fallback. They surface only through the
//! data-access layer, where the caller decides what to show.

use thiserror::Error;

/// Failure of a storage adapter operation
#[derive(Debug, Error)]
pub enum StorageError {
    /// Storage is disabled or otherwise refuses all access
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// Writing the value would exceed the adapter's quota
    #[error("storage quota exceeded: {needed} bytes needed, {limit} allowed")]
    QuotaExceeded { needed: usize, limit: usize },

    /// Key contains characters the adapter cannot store
    #[error("invalid storage key '{0}'")]
    InvalidKey(String),

    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure of a data-access operation, local or remote
#[derive(Debug, Error)]
pub enum DataError {
    #[error("record rejected for '{collection}': {message}")]
    Validation { collection: String, message: String },

    #[error("no record with id '{id}' in '{collection}'")]
    NotFound { collection: String, id: String },

    #[error("'{0}' does not support this operation")]
    Unsupported(String),

    /// A local write was attempted but the store could not persist it
    #[error("failed to persist '{0}'")]
    NotPersisted(String),

    /// The remote API answered `success: false`
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The remote API rejected the session
    #[error("not authorized")]
    Unauthorized,

    #[error("network error: {0}")]
    Transport(String),

    #[error("malformed response: {0}")]
    Decode(String),
}

impl DataError {
    pub fn validation(collection: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            collection: collection.into(),
            message: message.into(),
        }
    }

    pub fn not_found(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            collection: collection.into(),
            id: id.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quota_message() {
        let err = StorageError::QuotaExceeded {
            needed: 120,
            limit: 100,
        };
        assert_eq!(
            err.to_string(),
            "storage quota exceeded: 120 bytes needed, 100 allowed"
        );
    }

    #[test]
    fn test_storage_error_messages() {
        let errors = [
            StorageError::Unavailable("disabled".to_string()),
            StorageError::InvalidKey("../x".to_string()),
            StorageError::Io(std::io::Error::other("disk full")),
        ];
        for err in &errors {
            let expected = match err {
                StorageError::Unavailable(_) => "storage unavailable: disabled",
                StorageError::InvalidKey(_) => "invalid storage key '../x'",
                StorageError::Io(_) => "storage I/O error: disk full",
                StorageError::QuotaExceeded { .. } => unreachable!(),
            };
            assert_eq!(err.to_string(), expected);
        }
    }

    #[test]
    fn test_data_error_helpers() {
        let err = DataError::not_found("projects", "p-9");
        assert_eq!(err.to_string(), "no record with id 'p-9' in 'projects'");

        let err = DataError::validation("labours", "name is required");
        assert!(err.to_string().contains("labours"));
        assert!(err.to_string().contains("name is required"));
    }
}
