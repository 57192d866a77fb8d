//! Field names and constants of the on-disk JSON layout.
//!
//! ```text
//! {
//!    "created": "2024-05-01 10:00:00",
//!    "modified": "2024-05-01 10:00:05",
//!    "uuid": "...",
//!    "type": "ROOTfile",
//!    "ROOTVersionCode": 63000,
//!    "version": 1,
//!    "Keys": [ { "name": .., "cycle": .., "created": .., "Object": { "_typename": .. } } ],
//!    "StreamerInfos": [ .. ]
//! }
//! ```

/// Highest io-version this implementation reads and the version it writes.
pub const CURRENT_IO_VERSION: i64 = 1;

/// Value of the top-level type marker.
pub const FILE_TYPE_MARKER: &str = "ROOTfile";

/// Class tag carried by subdirectory payloads.
pub const DIRECTORY_CLASS: &str = "TDirectoryFile";

/// File name suffix appended when missing.
pub const FILE_SUFFIX: &str = ".json";

/// Optional scheme prefix stripped from file names.
pub const SCHEME_PREFIX: &str = "json:";

/// Fallback key name when neither a name nor a class is available.
pub const NONAME: &str = "Noname";

pub const TYPE: &str = "type";
pub const IO_VERSION: &str = "version";
pub const PRODUCER_VERSION: &str = "ROOTVersionCode";
pub const CREATED: &str = "created";
pub const MODIFIED: &str = "modified";
pub const UUID: &str = "uuid";
pub const TITLE: &str = "title";
pub const NAME: &str = "name";
pub const CYCLE: &str = "cycle";
pub const KEYS: &str = "Keys";
pub const OBJECT: &str = "Object";
pub const TYPENAME: &str = "_typename";
pub const STREAMER_INFOS: &str = "StreamerInfos";

/// String literals used for boolean attributes such as `canoptimize`.
pub const TRUE: &str = "true";
pub const FALSE: &str = "false";
