use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use tracing::warn;

use keyfile_types::format;

use crate::element::{FieldDescriptor, FieldKind};

/// Persisted field layout of one class version.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaRecord {
    #[serde(rename = "name")]
    pub class_name: String,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "classversion")]
    pub class_version: i32,
    pub checksum: u32,
    #[serde(
        rename = "canoptimize",
        serialize_with = "bool_as_string",
        deserialize_with = "bool_from_string",
        default = "default_can_optimize"
    )]
    pub can_optimize: bool,
    #[serde(rename = "elements", default, deserialize_with = "known_elements")]
    pub fields: Vec<FieldDescriptor>,
}

impl SchemaRecord {
    /// Create a record whose checksum is computed from its fields.
    pub fn new(class_name: impl Into<String>, class_version: i32, fields: Vec<FieldDescriptor>) -> Self {
        let class_name = class_name.into();
        let checksum = Self::compute_checksum(&class_name, &fields);
        Self {
            class_name,
            title: String::new(),
            class_version,
            checksum,
            can_optimize: true,
            fields,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// CRC-32 over the class name and each field's name, kind, type and shape.
    ///
    /// Titles and element versions do not contribute, so documentation edits
    /// keep the checksum stable.
    pub fn compute_checksum(class_name: &str, fields: &[FieldDescriptor]) -> u32 {
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(class_name.as_bytes());
        for field in fields {
            hasher.update(field.name.as_bytes());
            hasher.update(field.kind.tag().as_bytes());
            hasher.update(&field.type_id.to_le_bytes());
            if let Some(type_name) = &field.type_name {
                hasher.update(type_name.as_bytes());
            }
            for dim in &field.array_dims {
                hasher.update(&dim.to_le_bytes());
            }
        }
        hasher.finalize()
    }

    /// Base classes named by the record's base elements, in order.
    pub fn base_classes(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .filter(|f| matches!(f.kind, FieldKind::Base { .. }))
            .map(|f| f.name.as_str())
    }

    /// Encode as a `StreamerInfos` array element.
    pub fn to_json(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }
}

fn default_can_optimize() -> bool {
    true
}

fn bool_as_string<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(if *value { format::TRUE } else { format::FALSE })
}

fn bool_from_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s != format::FALSE),
        Value::Bool(b) => Ok(b),
        Value::Null => Ok(false),
        other => Err(serde::de::Error::custom(format!(
            "expected \"true\" or \"false\", got {other}"
        ))),
    }
}

/// Decode the `elements` array, skipping kinds this implementation does not
/// know and stopping at the first element without a name.
fn known_elements<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<FieldDescriptor>, D::Error> {
    let nodes = Vec::<Value>::deserialize(deserializer)?;
    let mut fields = Vec::with_capacity(nodes.len());
    for (index, node) in nodes.into_iter().enumerate() {
        let Value::Object(mut map) = node else {
            warn!(index, "schema element is not an object; stopping");
            break;
        };
        if !map.contains_key(format::NAME) {
            warn!(index, "schema element without a name; stopping");
            break;
        }
        let tag = map
            .get("streamerelement")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        if !FieldKind::is_known_tag(&tag) {
            warn!(index, tag = %tag, "skipping schema element of unknown kind");
            continue;
        }
        FieldDescriptor::normalize_legacy_dims(&mut map);
        let field = serde_json::from_value(Value::Object(map)).map_err(serde::de::Error::custom)?;
        fields.push(field);
    }
    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{ContainerSpec, CountSpec};
    use serde_json::json;

    fn sample_record() -> SchemaRecord {
        SchemaRecord::new(
            "Track",
            2,
            vec![
                FieldDescriptor::base("Particle", 1, 77),
                FieldDescriptor::new(
                    "fHits",
                    FieldKind::Loop(CountSpec {
                        version: 2,
                        name: "fNhits".into(),
                        class: "Track".into(),
                    }),
                    501,
                    8,
                )
                .with_type_name("Hit*"),
                FieldDescriptor::new(
                    "fTags",
                    FieldKind::Container(ContainerSpec {
                        stl_type: 1,
                        ctype: 61,
                    }),
                    500,
                    24,
                )
                .with_type_name("vector<string>"),
            ],
        )
        .with_title("reconstructed track")
    }

    #[test]
    fn record_json_shape() {
        let value = sample_record().to_json().unwrap();
        assert_eq!(value["name"], "Track");
        assert_eq!(value["title"], "reconstructed track");
        assert_eq!(value["classversion"], 2);
        assert_eq!(value["canoptimize"], "true");
        assert_eq!(value["elements"].as_array().unwrap().len(), 3);
        assert_eq!(value["elements"][1]["streamerelement"], "TStreamerLoop");
    }

    #[test]
    fn record_preserves_version_checksum_and_order() {
        let record = sample_record();
        let parsed: SchemaRecord = serde_json::from_value(record.to_json().unwrap()).unwrap();
        assert_eq!(parsed.class_version, 2);
        assert_eq!(parsed.checksum, record.checksum);
        let names: Vec<&str> = parsed.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["Particle", "fHits", "fTags"]);
        assert!(matches!(parsed.fields[0].kind, FieldKind::Base { .. }));
        assert!(matches!(parsed.fields[1].kind, FieldKind::Loop(_)));
        assert!(matches!(parsed.fields[2].kind, FieldKind::Container(_)));
    }

    #[test]
    fn cannot_optimize_flag() {
        let mut record = sample_record();
        record.can_optimize = false;
        let value = record.to_json().unwrap();
        assert_eq!(value["canoptimize"], "false");
        let parsed: SchemaRecord = serde_json::from_value(value).unwrap();
        assert!(!parsed.can_optimize);
    }

    #[test]
    fn unknown_element_kind_is_skipped() {
        let value = json!({
            "name": "Thing",
            "title": "",
            "classversion": 1,
            "checksum": 5,
            "canoptimize": "true",
            "elements": [
                {"streamerelement": "TStreamerArtificial", "name": "fX", "type": 1, "size": 4},
                {"streamerelement": "TStreamerBasicType", "name": "fY", "v": 2, "type": 8, "size": 8}
            ]
        });
        let parsed: SchemaRecord = serde_json::from_value(value).unwrap();
        assert_eq!(parsed.fields.len(), 1);
        assert_eq!(parsed.fields[0].name, "fY");
    }

    #[test]
    fn checksum_depends_on_fields() {
        let a = SchemaRecord::compute_checksum("A", &[FieldDescriptor::new("fX", FieldKind::BasicType, 8, 8)]);
        let b = SchemaRecord::compute_checksum("A", &[FieldDescriptor::new("fY", FieldKind::BasicType, 8, 8)]);
        let a_titled = SchemaRecord::compute_checksum(
            "A",
            &[FieldDescriptor::new("fX", FieldKind::BasicType, 8, 8).with_title("x value")],
        );
        assert_ne!(a, b);
        assert_eq!(a, a_titled);
    }

    #[test]
    fn base_classes_listed_in_order() {
        let record = sample_record();
        let bases: Vec<&str> = record.base_classes().collect();
        assert_eq!(bases, ["Particle"]);
    }
}
