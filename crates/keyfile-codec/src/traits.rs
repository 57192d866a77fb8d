use std::any::Any;
use std::fmt;

use serde_json::Value;

use keyfile_schema::{SchemaRecord, SchemaSource};

use crate::error::CodecResult;

/// How much of a class is available in this process.
///
/// Ordered from least to most capable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ClassState {
    /// Known only from a persisted layout; decodes to a generic value.
    Emulated,
    /// Declared with a layout but without a concrete codec (e.g. an abstract base).
    Declared,
    /// Backed by a concrete Rust type that can be encoded and decoded.
    Compiled,
}

/// What the type system knows about one class.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassDescriptor {
    pub name: String,
    pub title: String,
    pub version: i32,
    pub checksum: u32,
    /// Direct bases, in declaration order.
    pub bases: Vec<String>,
    pub state: ClassState,
}

impl ClassDescriptor {
    pub fn is_emulated(&self) -> bool {
        self.state == ClassState::Emulated
    }
}

/// Result of encoding one object.
#[derive(Clone, Debug, PartialEq)]
pub struct Encoded {
    /// JSON object carrying at least the `_typename` tag.
    pub payload: Value,
    /// The class actually written, which may be more derived than requested.
    pub class_name: String,
    pub class_version: i32,
}

/// Result of decoding one payload.
pub struct Decoded {
    pub object: Box<dyn Any + Send>,
    pub class_name: String,
}

impl Decoded {
    /// Take the object as a concrete type, or give the value back.
    pub fn downcast<T: Any>(self) -> Result<T, Self> {
        let Self { object, class_name } = self;
        match object.downcast::<T>() {
            Ok(boxed) => Ok(*boxed),
            Err(object) => Err(Self { object, class_name }),
        }
    }

    pub fn is<T: Any>(&self) -> bool {
        self.object.is::<T>()
    }
}

impl fmt::Debug for Decoded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Decoded")
            .field("class_name", &self.class_name)
            .finish_non_exhaustive()
    }
}

/// Translates in-memory objects to and from JSON payload fragments.
pub trait ObjectCodec: Send + Sync {
    /// Encode an object.
    ///
    /// `class_hint` names the class the caller believes it holds; the codec
    /// writes the object's actual class, which must be the hint or derive
    /// from it.
    fn encode(&self, object: &dyn Any, class_hint: Option<&str>) -> CodecResult<Encoded>;

    /// Encode an opaque byte buffer under the given class.
    fn encode_raw(&self, bytes: &[u8], class_name: &str) -> CodecResult<Encoded>;

    /// Decode a payload.
    ///
    /// The payload's own type tag wins; `expected` is used only for payloads
    /// without one.
    fn decode(&self, payload: &Value, expected: Option<&str>) -> CodecResult<Decoded>;
}

/// Class dictionary consulted by the codec and the store.
pub trait TypeSystem: Send + Sync {
    fn resolve(&self, class_name: &str) -> Option<ClassDescriptor>;

    /// Inheritance distance from `derived` up to `base`.
    ///
    /// `Some(0)` for the same class, `Some(n)` when `base` is an ancestor `n`
    /// levels up, `None` when `base` is not a base of `derived`.
    fn base_offset(&self, derived: &str, base: &str) -> Option<usize>;

    /// Layout of a class version; `None` asks for the newest one known.
    fn layout(&self, class_name: &str, version: Option<i32>) -> Option<SchemaRecord>;

    /// Make a persisted layout known. Registers the class as emulated when it
    /// was never seen before; returns `true` in that case.
    fn register_layout(&self, record: &SchemaRecord) -> bool;
}

/// Adapts a [`TypeSystem`] into a [`SchemaSource`].
pub struct LayoutsOf<'a>(pub &'a dyn TypeSystem);

impl SchemaSource for LayoutsOf<'_> {
    fn lookup(&self, class_name: &str, version: Option<i32>) -> Option<SchemaRecord> {
        self.0.layout(class_name, version)
    }
}
