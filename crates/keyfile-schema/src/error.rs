/// Errors from schema parsing and emission.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// The `StreamerInfos` node is present but is not an array.
    #[error("schema list must be a JSON array")]
    NotAnArray,

    /// A schema record could not be decoded.
    #[error("invalid schema record at index {index}: {reason}")]
    InvalidRecord { index: usize, reason: String },

    /// Serialization failure while emitting records.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result alias for schema operations.
pub type SchemaResult<T> = Result<T, SchemaError>;
