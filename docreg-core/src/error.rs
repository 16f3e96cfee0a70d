//! Error types and result types for registry and collection operations.
//!
//! Every fallible operation in the workspace returns [`RegistryResult<T>`]. Errors raised by the
//! underlying database driver are carried through [`RegistryError::Backend`] untouched, so callers
//! can downcast to the driver's own error type.

use bson::error::Error as BsonError;
use std::error::Error as StdError;
use thiserror::Error;

/// Represents all possible errors that can occur when resolving keys, managing the connection,
/// or working with a collection handle.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// No primary key could be determined for a mapped type, or more than one field was marked
    /// as the key.
    #[error("Key resolution error: {0}")]
    KeyResolution(String),
    /// A collection was requested before the connection manager was started.
    #[error("Connection manager has not been started")]
    NotStarted,
    /// The underlying connection could not be established during start.
    #[error("Connection error: {0}")]
    Connection(String),
    /// A configuration value could not be interpreted.
    #[error("Configuration error: {0}")]
    Configuration(String),
    /// Collection names must be non-empty.
    #[error("Invalid collection name: {0:?}")]
    InvalidCollectionName(String),
    /// Serialization/deserialization error when converting between documents and BSON.
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// The document cannot be stored as given, e.g. its key field is missing.
    #[error("Invalid document: {0}")]
    InvalidDocument(String),
    /// A document with the given key already exists in the collection.
    /// The first argument is the document key, the second is the collection name.
    #[error("Document {0} already exists in collection {1}")]
    DocumentAlreadyExists(String, String),
    /// The requested document was not found in the collection.
    /// The first argument is the document key, the second is the collection name.
    #[error("Document not found {0} in collection {1}")]
    DocumentNotFound(String, String),
    /// An error raised by the storage backend, passed through as-is.
    #[error(transparent)]
    Backend(Box<dyn StdError + Send + Sync>),
    /// An unknown error occurred.
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl RegistryError {
    /// Wraps a driver error without changing its message or source chain.
    pub fn backend<E>(err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        RegistryError::Backend(Box::new(err))
    }

    /// Returns the driver error carried by [`RegistryError::Backend`], if it is an `E`.
    pub fn downcast_backend<E>(&self) -> Option<&E>
    where
        E: StdError + 'static,
    {
        match self {
            RegistryError::Backend(err) => err.downcast_ref::<E>(),
            _ => None,
        }
    }
}

/// A specialized `Result` type for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

impl From<BsonError> for RegistryError {
    fn from(err: BsonError) -> Self {
        RegistryError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt;

    #[derive(Debug)]
    struct DriverError;

    impl fmt::Display for DriverError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "socket closed")
        }
    }

    impl StdError for DriverError {}

    #[test]
    fn backend_errors_keep_their_message() {
        let err = RegistryError::backend(DriverError);
        assert_eq!(err.to_string(), "socket closed");
        assert!(err.downcast_backend::<DriverError>().is_some());
    }

    #[test]
    fn downcast_ignores_other_variants() {
        assert!(RegistryError::NotStarted.downcast_backend::<DriverError>().is_none());
    }
}
