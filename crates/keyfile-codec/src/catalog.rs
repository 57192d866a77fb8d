use std::any::{Any, TypeId};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::RwLock;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use keyfile_schema::{FieldDescriptor, SchemaRecord, SchemaRegistry, SchemaSource};

use crate::error::{CodecError, CodecResult};
use crate::payload;
use crate::traits::{ClassDescriptor, ClassState, Decoded, Encoded, ObjectCodec, TypeSystem};

type EncodeFn = fn(&dyn Any) -> Option<serde_json::Result<Value>>;
type DecodeFn = fn(Value) -> serde_json::Result<Box<dyn Any + Send>>;

fn encode_as<T: Serialize + 'static>(object: &dyn Any) -> Option<serde_json::Result<Value>> {
    object.downcast_ref::<T>().map(serde_json::to_value)
}

fn decode_as<T: DeserializeOwned + Send + 'static>(value: Value) -> serde_json::Result<Box<dyn Any + Send>> {
    serde_json::from_value::<T>(value).map(|object| Box::new(object) as Box<dyn Any + Send>)
}

#[derive(Clone, Copy)]
struct Codecs {
    type_id: TypeId,
    encode: EncodeFn,
    decode: DecodeFn,
}

struct ClassEntry {
    descriptor: ClassDescriptor,
    codecs: Option<Codecs>,
}

#[derive(Default)]
struct Catalog {
    classes: HashMap<String, ClassEntry>,
    by_type: HashMap<TypeId, String>,
    layouts: SchemaRegistry,
}

impl Catalog {
    fn base_offset(&self, derived: &str, base: &str) -> Option<usize> {
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([(derived, 0usize)]);
        while let Some((class, depth)) = queue.pop_front() {
            if class == base {
                return Some(depth);
            }
            if !seen.insert(class) {
                continue;
            }
            if let Some(entry) = self.classes.get(class) {
                queue.extend(entry.descriptor.bases.iter().map(|b| (b.as_str(), depth + 1)));
            }
        }
        None
    }
}

/// Declaration of a class: name, version, bases and own fields.
///
/// Base-class elements are generated from `bases` at registration, so
/// `fields` lists only the members the class adds.
#[derive(Clone, Debug)]
pub struct ClassSpec {
    pub name: String,
    pub title: String,
    pub version: i32,
    pub bases: Vec<String>,
    pub fields: Vec<FieldDescriptor>,
    pub can_optimize: bool,
}

impl ClassSpec {
    pub fn new(name: impl Into<String>, version: i32) -> Self {
        Self {
            name: name.into(),
            title: String::new(),
            version,
            bases: Vec::new(),
            fields: Vec::new(),
            can_optimize: true,
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn base(mut self, base: impl Into<String>) -> Self {
        self.bases.push(base.into());
        self
    }

    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    pub fn cannot_optimize(mut self) -> Self {
        self.can_optimize = false;
        self
    }
}

/// Serde-backed class dictionary implementing [`ObjectCodec`] and [`TypeSystem`].
///
/// Registration takes the write lock; encoding, decoding and lookups take the
/// read lock. Layouts read from documents are added through
/// [`TypeSystem::register_layout`], which makes never-seen classes available
/// as emulated classes.
pub struct ClassCatalog {
    inner: RwLock<Catalog>,
}

impl ClassCatalog {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Catalog::default()),
        }
    }

    /// Register a concrete Rust type under a class.
    pub fn register<T>(&self, spec: ClassSpec) -> CodecResult<ClassDescriptor>
    where
        T: Serialize + DeserializeOwned + Send + 'static,
    {
        let codecs = Codecs {
            type_id: TypeId::of::<T>(),
            encode: encode_as::<T>,
            decode: decode_as::<T>,
        };
        self.insert(spec, Some(codecs))
    }

    /// Declare a class that has a layout but no concrete type, such as an
    /// abstract base.
    pub fn declare(&self, spec: ClassSpec) -> CodecResult<ClassDescriptor> {
        self.insert(spec, None)
    }

    fn insert(&self, spec: ClassSpec, codecs: Option<Codecs>) -> CodecResult<ClassDescriptor> {
        let mut cat = self.inner.write().expect("catalog lock poisoned");

        if let Some(existing) = cat.classes.get(&spec.name) {
            if existing.descriptor.state != ClassState::Emulated {
                return Err(CodecError::DuplicateClass(spec.name));
            }
        }
        if let Some(c) = &codecs {
            if cat.by_type.contains_key(&c.type_id) {
                return Err(CodecError::DuplicateClass(spec.name));
            }
        }

        let mut fields = Vec::with_capacity(spec.bases.len() + spec.fields.len());
        for base in &spec.bases {
            let entry = cat.classes.get(base).ok_or_else(|| CodecError::UnknownBase {
                class: spec.name.clone(),
                base: base.clone(),
            })?;
            fields.push(FieldDescriptor::base(
                base.clone(),
                entry.descriptor.version,
                entry.descriptor.checksum,
            ));
        }
        fields.extend(spec.fields);

        let mut record = SchemaRecord::new(spec.name.clone(), spec.version, fields).with_title(spec.title.clone());
        record.can_optimize = spec.can_optimize;

        let descriptor = ClassDescriptor {
            name: spec.name.clone(),
            title: spec.title,
            version: spec.version,
            checksum: record.checksum,
            bases: spec.bases,
            state: if codecs.is_some() {
                ClassState::Compiled
            } else {
                ClassState::Declared
            },
        };

        if let Some(c) = &codecs {
            cat.by_type.insert(c.type_id, spec.name.clone());
        }
        cat.layouts.insert(record);
        cat.classes.insert(
            spec.name.clone(),
            ClassEntry {
                descriptor: descriptor.clone(),
                codecs,
            },
        );
        debug!(class = %spec.name, version = descriptor.version, state = ?descriptor.state, "class registered");
        Ok(descriptor)
    }

    /// Number of known classes, emulated ones included.
    pub fn len(&self) -> usize {
        self.inner.read().expect("catalog lock poisoned").classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sorted names of all known classes.
    pub fn class_names(&self) -> Vec<String> {
        let cat = self.inner.read().expect("catalog lock poisoned");
        let mut names: Vec<String> = cat.classes.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for ClassCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ClassCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassCatalog")
            .field("class_count", &self.len())
            .finish()
    }
}

impl ObjectCodec for ClassCatalog {
    fn encode(&self, object: &dyn Any, class_hint: Option<&str>) -> CodecResult<Encoded> {
        let cat = self.inner.read().expect("catalog lock poisoned");
        let class_name = cat
            .by_type
            .get(&(*object).type_id())
            .ok_or(CodecError::UnregisteredType)?;

        if let Some(hint) = class_hint {
            if cat.base_offset(class_name, hint).is_none() {
                return Err(CodecError::ClassMismatch {
                    expected: hint.to_string(),
                    actual: class_name.clone(),
                });
            }
        }

        let entry = cat
            .classes
            .get(class_name)
            .ok_or_else(|| CodecError::UnknownClass(class_name.clone()))?;
        let codecs = entry
            .codecs
            .ok_or_else(|| CodecError::NotEncodable(class_name.clone()))?;
        let value = (codecs.encode)(object)
            .ok_or(CodecError::UnregisteredType)?
            .map_err(|e| CodecError::Serialization(e.to_string()))?;

        Ok(Encoded {
            payload: payload::tag(value, class_name),
            class_name: class_name.clone(),
            class_version: entry.descriptor.version,
        })
    }

    fn encode_raw(&self, bytes: &[u8], class_name: &str) -> CodecResult<Encoded> {
        let cat = self.inner.read().expect("catalog lock poisoned");
        let entry = cat
            .classes
            .get(class_name)
            .ok_or_else(|| CodecError::UnknownClass(class_name.to_string()))?;
        Ok(Encoded {
            payload: payload::raw(bytes, class_name),
            class_name: class_name.to_string(),
            class_version: entry.descriptor.version,
        })
    }

    fn decode(&self, value: &Value, expected: Option<&str>) -> CodecResult<Decoded> {
        let class_name = payload::type_tag(value)
            .or(expected)
            .ok_or(CodecError::MissingTypeTag)?
            .to_string();

        if let Some(bytes) = payload::raw_bytes(value) {
            return Ok(Decoded {
                object: Box::new(bytes?),
                class_name,
            });
        }

        let cat = self.inner.read().expect("catalog lock poisoned");
        let entry = cat
            .classes
            .get(&class_name)
            .ok_or_else(|| CodecError::UnknownClass(class_name.clone()))?;
        let object = match entry.codecs {
            Some(codecs) => (codecs.decode)(payload::untag(value))
                .map_err(|e| CodecError::Serialization(e.to_string()))?,
            None => Box::new(payload::untag(value)) as Box<dyn Any + Send>,
        };
        Ok(Decoded { object, class_name })
    }
}

impl TypeSystem for ClassCatalog {
    fn resolve(&self, class_name: &str) -> Option<ClassDescriptor> {
        let cat = self.inner.read().expect("catalog lock poisoned");
        cat.classes.get(class_name).map(|e| e.descriptor.clone())
    }

    fn base_offset(&self, derived: &str, base: &str) -> Option<usize> {
        let cat = self.inner.read().expect("catalog lock poisoned");
        cat.base_offset(derived, base)
    }

    fn layout(&self, class_name: &str, version: Option<i32>) -> Option<SchemaRecord> {
        let cat = self.inner.read().expect("catalog lock poisoned");
        cat.layouts.lookup(class_name, version)
    }

    fn register_layout(&self, record: &SchemaRecord) -> bool {
        {
            let cat = self.inner.read().expect("catalog lock poisoned");
            if cat.classes.contains_key(&record.class_name)
                && cat.layouts.contains(&record.class_name, record.class_version)
            {
                return false;
            }
        }

        let mut cat = self.inner.write().expect("catalog lock poisoned");
        cat.layouts.insert(record.clone());
        if let Some(entry) = cat.classes.get_mut(&record.class_name) {
            if entry.descriptor.is_emulated() && record.class_version > entry.descriptor.version {
                entry.descriptor.version = record.class_version;
                entry.descriptor.checksum = record.checksum;
            }
            return false;
        }

        let descriptor = ClassDescriptor {
            name: record.class_name.clone(),
            title: record.title.clone(),
            version: record.class_version,
            checksum: record.checksum,
            bases: record.base_classes().map(str::to_string).collect(),
            state: ClassState::Emulated,
        };
        cat.classes.insert(
            record.class_name.clone(),
            ClassEntry {
                descriptor,
                codecs: None,
            },
        );
        debug!(class = %record.class_name, version = record.class_version, "emulated class registered");
        true
    }
}
