//! Schema registry for keyfile.
//!
//! Every class whose objects are stored in a document has a field layout
//! (historically "streamer info"): an ordered list of field descriptors under
//! a (class name, class version) key. Persisting those layouts next to the
//! objects keeps a document decodable after the class definition changes, or
//! by a reader that never had the class compiled in.
//!
//! # Key Types
//!
//! - [`SchemaRecord`] -- the layout of one class version
//! - [`FieldDescriptor`] -- one field of a layout
//! - [`FieldKind`] -- kind tag plus kind-specific data, decoded once at parse time
//! - [`SchemaRegistry`] -- at most one record per (class, version)
//! - [`SchemaSource`] -- anything that can answer layout lookups
//!
//! # Emission Rules
//!
//! 1. Only layouts needed to decode the document's objects are written.
//! 2. The needed set is closed over base classes and typed object members.
//! 3. Records keep their field order exactly.
//! 4. Unknown element kinds are skipped on read, never fatal.

pub mod element;
pub mod error;
pub mod record;
pub mod registry;

pub use element::{ContainerSpec, CountSpec, FieldDescriptor, FieldKind};
pub use error::{SchemaError, SchemaResult};
pub use record::SchemaRecord;
pub use registry::{ClassKey, SchemaRegistry, SchemaSource};
