use serde_json::{Map, Value};

use keyfile_codec::payload;
use keyfile_codec::Encoded;
use keyfile_types::{format, Cycle, Datime, KeyId};

use crate::error::{FileError, FileResult};

/// One persisted object record.
///
/// The attribute node (`name`, `title`, `cycle`, `created`) is rendered when
/// the entry is created and again on [`KeyEntry::update_attributes`]; the
/// payload is held separately and only replaced by a re-encode.
#[derive(Clone, Debug, PartialEq)]
pub struct KeyEntry {
    id: KeyId,
    name: String,
    title: String,
    cycle: Cycle,
    created: Datime,
    class_name: String,
    class_version: Option<i32>,
    is_subdirectory: bool,
    attributes: Map<String, Value>,
    payload: Option<Value>,
}

impl KeyEntry {
    /// A fresh entry. `encoded` is `None` when the object failed to encode.
    pub(crate) fn new(
        id: KeyId,
        name: String,
        title: String,
        cycle: Cycle,
        class_name: String,
        encoded: Option<Encoded>,
        reproducible: bool,
    ) -> Self {
        let mut entry = Self {
            id,
            name,
            title,
            cycle,
            created: Datime::now(),
            class_name,
            class_version: None,
            is_subdirectory: false,
            attributes: Map::new(),
            payload: None,
        };
        if let Some(encoded) = encoded {
            entry.set_encoded(encoded);
        }
        entry.update_attributes(reproducible);
        entry
    }

    /// Entry standing for a subdirectory.
    pub(crate) fn directory(id: KeyId, name: String, title: String, cycle: Cycle, reproducible: bool) -> Self {
        let mut entry = Self::new(id, name, title, cycle, format::DIRECTORY_CLASS.to_string(), None, reproducible);
        entry.is_subdirectory = true;
        entry.payload = Some(directory_payload());
        entry
    }

    /// Parse a key node read from a document.
    ///
    /// Nested `Keys` of a subdirectory are not kept in the payload; the
    /// caller unfolds them into the child directory.
    pub fn from_json(id: KeyId, node: &Value) -> FileResult<Self> {
        let map = node
            .as_object()
            .ok_or_else(|| FileError::Format(format!("key {id} is not an object")))?;
        let name = map
            .get(format::NAME)
            .and_then(Value::as_str)
            .ok_or_else(|| FileError::Format(format!("key {id} has no name")))?
            .to_string();
        let title = map
            .get(format::TITLE)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let raw_cycle = map
            .get(format::CYCLE)
            .and_then(Value::as_u64)
            .and_then(|c| u32::try_from(c).ok())
            .ok_or_else(|| FileError::Format(format!("key {name} has no valid cycle")))?;
        let cycle = Cycle::new(raw_cycle)?;
        let created = match map.get(format::CREATED).and_then(Value::as_str) {
            Some(s) => Datime::parse_sql(s)?,
            None => Datime::now(),
        };

        let mut object = map
            .get(format::OBJECT)
            .cloned()
            .ok_or_else(|| FileError::Format(format!("key {name} has no object")))?;
        let class_name = payload::type_tag(&object).unwrap_or_default().to_string();
        let nested = object.get(format::KEYS).is_some_and(Value::is_array);
        let is_subdirectory = class_name == format::DIRECTORY_CLASS || nested;
        if is_subdirectory {
            if let Some(obj) = object.as_object_mut() {
                obj.remove(format::KEYS);
            }
        }

        let mut attributes = map.clone();
        attributes.remove(format::OBJECT);

        Ok(Self {
            id,
            name,
            title,
            cycle,
            created,
            class_name,
            class_version: None,
            is_subdirectory,
            attributes,
            payload: Some(object),
        })
    }

    pub fn id(&self) -> KeyId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Title, or `None` when empty.
    pub fn title(&self) -> Option<&str> {
        Some(self.title.as_str()).filter(|t| !t.is_empty())
    }

    pub fn cycle(&self) -> Cycle {
        self.cycle
    }

    pub fn created(&self) -> Datime {
        self.created
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// Version the payload was written with; `None` for entries read from disk.
    pub fn class_version(&self) -> Option<i32> {
        self.class_version
    }

    pub fn is_subdirectory(&self) -> bool {
        self.is_subdirectory
    }

    /// Whether the entry holds a payload. `false` after a failed encode.
    pub fn is_stored(&self) -> bool {
        self.payload.is_some()
    }

    pub fn payload(&self) -> Option<&Value> {
        self.payload.as_ref()
    }

    /// Rendered attribute node, without the payload.
    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }

    /// Change the title. Takes effect in the document after
    /// [`KeyEntry::update_attributes`].
    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    /// Re-render the attribute node from the entry's fields.
    pub fn update_attributes(&mut self, reproducible: bool) {
        let created = if reproducible { Datime::reproducible() } else { self.created };
        let mut attributes = Map::new();
        attributes.insert(format::NAME.into(), Value::String(self.name.clone()));
        if !self.title.is_empty() {
            attributes.insert(format::TITLE.into(), Value::String(self.title.clone()));
        }
        attributes.insert(format::CYCLE.into(), Value::from(self.cycle.get()));
        attributes.insert(format::CREATED.into(), Value::String(created.to_sql_string()));
        self.attributes = attributes;
    }

    /// Replace the payload after a re-encode. `None` records a failed encode.
    pub(crate) fn replace_payload(&mut self, encoded: Option<Encoded>) {
        match encoded {
            Some(encoded) => self.set_encoded(encoded),
            None => {
                self.payload = None;
                self.class_version = None;
            }
        }
    }

    pub(crate) fn reset_directory_payload(&mut self) {
        self.payload = Some(directory_payload());
    }

    /// Drop the payload.
    pub(crate) fn release(&mut self) {
        self.payload = None;
    }

    fn set_encoded(&mut self, encoded: Encoded) {
        self.class_name = encoded.class_name;
        self.class_version = Some(encoded.class_version);
        self.payload = Some(encoded.payload);
    }

    /// The key node as written: attributes plus `Object`. `None` when the
    /// entry holds no payload.
    pub fn to_json(&self) -> Option<Value> {
        let payload = self.payload.clone()?;
        let mut node = self.attributes.clone();
        node.insert(format::OBJECT.into(), payload);
        Some(Value::Object(node))
    }
}

fn directory_payload() -> Value {
    let mut map = Map::new();
    map.insert(format::TYPENAME.into(), Value::String(format::DIRECTORY_CLASS.to_string()));
    Value::Object(map)
}
