use std::collections::{BTreeMap, VecDeque};
use std::fmt;

use serde_json::Value;
use tracing::{debug, warn};

use keyfile_types::format;

use crate::error::{SchemaError, SchemaResult};
use crate::record::SchemaRecord;

/// Registry key: one layout per (class name, class version).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassKey {
    pub class_name: String,
    pub version: i32,
}

impl ClassKey {
    pub fn new(class_name: impl Into<String>, version: i32) -> Self {
        Self {
            class_name: class_name.into(),
            version,
        }
    }
}

impl fmt::Display for ClassKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@v{}", self.class_name, self.version)
    }
}

/// Anything that can answer class-layout lookups.
///
/// `version = None` asks for the newest layout known for the class.
pub trait SchemaSource {
    fn lookup(&self, class_name: &str, version: Option<i32>) -> Option<SchemaRecord>;
}

/// Set of class layouts, at most one per [`ClassKey`].
///
/// Records are kept in insertion order so a document re-saved without
/// changes emits its layouts in the order they were read.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SchemaRegistry {
    order: Vec<ClassKey>,
    records: BTreeMap<ClassKey, SchemaRecord>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Insert a record. Returns `false` and keeps the existing record when
    /// the (class, version) key is already present.
    pub fn insert(&mut self, record: SchemaRecord) -> bool {
        let key = ClassKey::new(record.class_name.clone(), record.class_version);
        if self.records.contains_key(&key) {
            return false;
        }
        self.order.push(key.clone());
        self.records.insert(key, record);
        true
    }

    pub fn get(&self, class_name: &str, version: i32) -> Option<&SchemaRecord> {
        self.records.get(&ClassKey::new(class_name, version))
    }

    /// The record with the highest version for a class.
    pub fn latest(&self, class_name: &str) -> Option<&SchemaRecord> {
        self.records
            .range(ClassKey::new(class_name, i32::MIN)..=ClassKey::new(class_name, i32::MAX))
            .next_back()
            .map(|(_, record)| record)
    }

    /// Every version held for a class, lowest first.
    pub fn versions<'a>(&'a self, class_name: &str) -> impl Iterator<Item = i32> + 'a {
        self.records
            .range(ClassKey::new(class_name, i32::MIN)..=ClassKey::new(class_name, i32::MAX))
            .map(|(key, _)| key.version)
    }

    pub fn contains(&self, class_name: &str, version: i32) -> bool {
        self.get(class_name, version).is_some()
    }

    /// Records in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &SchemaRecord> {
        self.order.iter().filter_map(|key| self.records.get(key))
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.records.clear();
    }

    /// Gather the layouts needed to decode objects of `roots`.
    ///
    /// Each root and every dependency (base classes, typed object members) is
    /// looked up in `sources` in order; the first source that knows a class
    /// wins. Classes no source knows are skipped.
    pub fn collect<'a, I>(roots: I, sources: &[&dyn SchemaSource]) -> Self
    where
        I: IntoIterator<Item = (&'a str, Option<i32>)>,
    {
        let mut needed = Self::new();
        let mut queue: VecDeque<(String, Option<i32>)> = roots
            .into_iter()
            .map(|(name, version)| (name.to_string(), version))
            .collect();

        while let Some((class_name, version)) = queue.pop_front() {
            let already = match version {
                Some(v) => needed.contains(&class_name, v),
                None => needed.latest(&class_name).is_some(),
            };
            if already {
                continue;
            }
            let Some(record) = sources.iter().find_map(|s| s.lookup(&class_name, version)) else {
                debug!(class = %class_name, "no layout known; not emitted");
                continue;
            };
            queue.extend(record.fields.iter().filter_map(|f| f.dependency()));
            needed.insert(record);
        }
        needed
    }

    /// Encode every record as the `StreamerInfos` array.
    pub fn write_all(&self) -> SchemaResult<Value> {
        let infos = self
            .iter()
            .map(|record| {
                record
                    .to_json()
                    .map_err(|e| SchemaError::Serialization(e.to_string()))
            })
            .collect::<SchemaResult<Vec<_>>>()?;
        Ok(Value::Array(infos))
    }

    /// Decode a `StreamerInfos` array.
    ///
    /// Reading stops at the first element that is not an object with a
    /// `name`, the same policy the key list uses. A record that has a name
    /// but cannot be decoded is an error.
    pub fn read_all(infos: &Value) -> SchemaResult<Self> {
        let nodes = infos.as_array().ok_or(SchemaError::NotAnArray)?;
        let mut registry = Self::new();
        for (index, node) in nodes.iter().enumerate() {
            if node.get(format::NAME).is_none() {
                warn!(
                    index,
                    ignored = nodes.len() - index,
                    "schema list ends at element without a name"
                );
                break;
            }
            let record: SchemaRecord =
                serde_json::from_value(node.clone()).map_err(|e| SchemaError::InvalidRecord {
                    index,
                    reason: e.to_string(),
                })?;
            if !registry.insert(record) {
                warn!(index, "duplicate schema record ignored");
            }
        }
        debug!(records = registry.len(), "schema list read");
        Ok(registry)
    }
}

impl SchemaSource for SchemaRegistry {
    fn lookup(&self, class_name: &str, version: Option<i32>) -> Option<SchemaRecord> {
        match version {
            Some(v) => self.get(class_name, v).cloned(),
            None => self.latest(class_name).cloned(),
        }
    }
}

impl<'a> IntoIterator for &'a SchemaRegistry {
    type Item = &'a SchemaRecord;
    type IntoIter = Box<dyn Iterator<Item = &'a SchemaRecord> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}
