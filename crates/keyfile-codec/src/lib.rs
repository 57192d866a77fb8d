//! Object codec and type system for keyfile.
//!
//! The store never encodes object fields itself. It hands objects to an
//! [`ObjectCodec`] and receives a JSON payload carrying a `_typename` tag, and
//! it asks a [`TypeSystem`] about classes: their versions, their bases, and
//! their persisted layouts.
//!
//! # Implementations
//!
//! - [`ClassCatalog`] -- implements both traits for `serde` types registered
//!   with a [`ClassSpec`]. Classes known only from a document's schema list
//!   are registered as emulated and decode to a plain `serde_json::Value`.

pub mod catalog;
pub mod error;
pub mod payload;
pub mod traits;

pub use catalog::{ClassCatalog, ClassSpec};
pub use error::{CodecError, CodecResult};
pub use traits::{ClassDescriptor, ClassState, Decoded, Encoded, LayoutsOf, ObjectCodec, TypeSystem};
