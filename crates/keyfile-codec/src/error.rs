/// Errors from encoding, decoding and class resolution.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The Rust type of the object was never registered with a class.
    #[error("object type is not registered with any class")]
    UnregisteredType,

    /// No class of this name is known.
    #[error("unknown class: {0}")]
    UnknownClass(String),

    /// A class name was registered twice for different Rust types.
    #[error("class {0} is already registered")]
    DuplicateClass(String),

    /// A class names a base that has not been registered.
    #[error("class {class} derives from unknown base {base}")]
    UnknownBase { class: String, base: String },

    /// The requested class is not the object's class or one of its bases.
    #[error("class {actual} does not inherit from {expected}")]
    ClassMismatch { expected: String, actual: String },

    /// The payload carries no type tag and no expected class was given.
    #[error("payload has no type tag")]
    MissingTypeTag,

    /// The class is known only from a schema and cannot be encoded.
    #[error("class {0} has no encoder")]
    NotEncodable(String),

    /// Raw byte payload is not valid hex.
    #[error("invalid raw byte payload: {0}")]
    InvalidRawBytes(String),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result alias for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;
