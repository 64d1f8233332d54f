use thiserror::Error;

/// Result type for catalog operations
pub type Result<T> = std::result::Result<T, CatalogError>;

/// Errors raised while building or loading a catalog
#[derive(Error, Debug)]
pub enum CatalogError {
    /// Two tools share the same identifier
    #[error("Duplicate tool id: {0}")]
    DuplicateId(String),

    /// A tool has an empty identifier
    #[error("Tool at position {0} has an empty id")]
    EmptyId(usize),

    /// A tool has an empty display name
    #[error("Tool '{0}' has an empty name")]
    EmptyName(String),

    /// Unknown category label
    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}
