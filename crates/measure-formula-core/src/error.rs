//! Error types for measure-formula-core

use thiserror::Error;

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in measure-formula-core
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// Structure members were requested before the metadata finished loading
    #[error("Structure member metadata has not been loaded yet")]
    MetadataNotLoaded,

    /// Unknown data type name
    #[error("Unknown data type: {0}")]
    UnknownDataType(String),

    /// Unknown datasource backend name
    #[error("Unknown datasource backend: {0}")]
    UnknownBackend(String),

    /// Malformed bracketed field reference
    #[error("Invalid field reference: {0}")]
    InvalidFieldReference(String),
}
