use std::path::PathBuf;

use keyfile_types::KeyId;

use crate::directory::DirId;

/// Errors from document store operations.
#[derive(Debug, thiserror::Error)]
pub enum FileError {
    /// No file name was given.
    #[error("file name is not specified")]
    EmptyFileName,

    /// The target file does not exist.
    #[error("file {0} does not exist")]
    NotFound(PathBuf),

    /// The target file cannot be read or written as the mode requires.
    #[error("no permission to open {0}")]
    PermissionDenied(PathBuf),

    /// `CREATE` was requested for a path that already exists.
    #[error("file {0} already exists")]
    AlreadyExists(PathBuf),

    /// The document is not well-formed JSON.
    #[error("malformed document: {0}")]
    Parse(String),

    /// The document is JSON but not a keyfile document.
    #[error("invalid document format: {0}")]
    Format(String),

    /// The document was written by a newer io-version.
    #[error("document io-version {found} is newer than supported version {supported}")]
    UnsupportedVersion { found: i64, supported: i64 },

    /// A class named by a read request is unknown to the type system.
    #[error("cannot resolve class {0}")]
    ClassResolution(String),

    /// The stored class does not derive from the requested class.
    #[error("stored class {actual} does not inherit from {expected}")]
    InheritanceMismatch { expected: String, actual: String },

    /// Only `READ` and `UPDATE` are accepted when reopening.
    #[error("invalid mode for reopen: {0}")]
    InvalidMode(String),

    /// The store has been closed.
    #[error("document is closed")]
    Closed,

    /// A write was attempted on a store opened for reading.
    #[error("document is read-only")]
    ReadOnly,

    #[error("unknown directory {0:?}")]
    UnknownDirectory(DirId),

    #[error("unknown key {0}")]
    UnknownKey(KeyId),

    /// The key holds a subdirectory, not an object.
    #[error("key {0} is a subdirectory")]
    IsDirectory(KeyId),

    /// The key's object failed to encode and holds no payload.
    #[error("key {0} holds no payload")]
    NoPayload(KeyId),

    /// An identity or timestamp value was malformed.
    #[error("invalid value: {0}")]
    Type(#[from] keyfile_types::TypeError),

    /// I/O error from the filesystem.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Schema list could not be read or written.
    #[error("schema error: {0}")]
    Schema(#[from] keyfile_schema::SchemaError),

    /// Object encoding or decoding failed.
    #[error("codec error: {0}")]
    Codec(#[from] keyfile_codec::CodecError),
}

/// Result alias for document store operations.
pub type FileResult<T> = Result<T, FileError>;
