use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Count reference of a counted pointer or loop member.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountSpec {
    /// Class version of the class owning the counter.
    #[serde(rename = "countversion")]
    pub version: i32,
    /// Name of the counter member.
    #[serde(rename = "countname")]
    pub name: String,
    /// Class owning the counter member.
    #[serde(rename = "countclass")]
    pub class: String,
}

/// Container layout of an STL-like member.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerSpec {
    /// Container kind (vector, list, map, ...).
    #[serde(rename = "STLtype")]
    pub stl_type: i32,
    /// Element type id.
    #[serde(rename = "Ctype")]
    pub ctype: i32,
}

/// Kind of a field descriptor and the data only that kind carries.
///
/// The kind tag is stored under `streamerelement`; it is decoded once when a
/// record is parsed so nothing downstream dispatches on strings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "streamerelement")]
pub enum FieldKind {
    /// Base-class relation.
    #[serde(rename = "TStreamerBase")]
    Base {
        #[serde(rename = "baseversion")]
        base_version: i32,
        #[serde(rename = "basechecksum")]
        base_checksum: u32,
    },
    /// Fundamental-type member.
    #[serde(rename = "TStreamerBasicType")]
    BasicType,
    /// Pointer to a counted array of fundamental values.
    #[serde(rename = "TStreamerBasicPointer")]
    BasicPointer(CountSpec),
    /// Counted array of objects.
    #[serde(rename = "TStreamerLoop")]
    Loop(CountSpec),
    /// Embedded object of a class with a persistent identity.
    #[serde(rename = "TStreamerObject")]
    Object,
    /// Embedded object of any class.
    #[serde(rename = "TStreamerObjectAny")]
    ObjectAny,
    /// Pointer to an object with a persistent identity.
    #[serde(rename = "TStreamerObjectPointer")]
    ObjectPointer,
    /// Pointer to an object of any class.
    #[serde(rename = "TStreamerObjectAnyPointer")]
    ObjectAnyPointer,
    /// String member.
    #[serde(rename = "TStreamerString")]
    String,
    /// STL-like container member.
    #[serde(rename = "TStreamerSTL")]
    Container(ContainerSpec),
    /// Standard string member.
    #[serde(rename = "TStreamerSTLstring")]
    StdString(ContainerSpec),
}

impl FieldKind {
    /// Every kind tag this implementation understands.
    pub const TAGS: [&'static str; 11] = [
        "TStreamerBase",
        "TStreamerBasicType",
        "TStreamerBasicPointer",
        "TStreamerLoop",
        "TStreamerObject",
        "TStreamerObjectAny",
        "TStreamerObjectPointer",
        "TStreamerObjectAnyPointer",
        "TStreamerString",
        "TStreamerSTL",
        "TStreamerSTLstring",
    ];

    /// The tag written under `streamerelement`.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Base { .. } => "TStreamerBase",
            Self::BasicType => "TStreamerBasicType",
            Self::BasicPointer(_) => "TStreamerBasicPointer",
            Self::Loop(_) => "TStreamerLoop",
            Self::Object => "TStreamerObject",
            Self::ObjectAny => "TStreamerObjectAny",
            Self::ObjectPointer => "TStreamerObjectPointer",
            Self::ObjectAnyPointer => "TStreamerObjectAnyPointer",
            Self::String => "TStreamerString",
            Self::Container(_) => "TStreamerSTL",
            Self::StdString(_) => "TStreamerSTLstring",
        }
    }

    pub fn is_known_tag(tag: &str) -> bool {
        Self::TAGS.contains(&tag)
    }

    /// Layout version of the element kind itself, written as `v`.
    pub fn element_version(&self) -> i32 {
        match self {
            Self::Base { .. } | Self::Container(_) => 3,
            _ => 2,
        }
    }

    /// Whether members of this kind refer to another class by type name.
    fn references_class(&self) -> bool {
        matches!(
            self,
            Self::Object | Self::ObjectAny | Self::ObjectPointer | Self::ObjectAnyPointer
        )
    }
}

/// One field of a class layout.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "v", default)]
    pub element_version: i32,
    /// Declared type id.
    #[serde(rename = "type")]
    pub type_id: i32,
    #[serde(rename = "typename", default, skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    /// Size in bytes of one element.
    pub size: i32,
    /// Maximum index per array dimension; empty for scalars.
    #[serde(rename = "arraydim", default, skip_serializing_if = "Vec::is_empty")]
    pub array_dims: Vec<i32>,
    #[serde(flatten)]
    pub kind: FieldKind,
}

impl FieldDescriptor {
    /// Create a descriptor with the element version taken from its kind.
    pub fn new(name: impl Into<String>, kind: FieldKind, type_id: i32, size: i32) -> Self {
        Self {
            name: name.into(),
            title: None,
            element_version: kind.element_version(),
            type_id,
            type_name: None,
            size,
            array_dims: Vec::new(),
            kind,
        }
    }

    /// Base-class element. By convention its name is the base class name.
    pub fn base(class: impl Into<String>, base_version: i32, base_checksum: u32) -> Self {
        let class = class.into();
        let mut field = Self::new(
            class.clone(),
            FieldKind::Base {
                base_version,
                base_checksum,
            },
            0,
            0,
        );
        field.type_name = Some("BASE".into());
        field.title = Some(format!("base class {class}"));
        field
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_type_name(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    pub fn with_array_dims(mut self, dims: Vec<i32>) -> Self {
        self.array_dims = dims;
        self
    }

    /// The class this field needs a layout for, with a version when it is pinned.
    ///
    /// Base elements pin the base version; object members refer to the latest
    /// layout of their (pointer-stripped) type name.
    pub fn dependency(&self) -> Option<(String, Option<i32>)> {
        match &self.kind {
            FieldKind::Base { base_version, .. } => Some((self.name.clone(), Some(*base_version))),
            kind if kind.references_class() => self
                .type_name
                .as_deref()
                .map(|t| t.trim_end_matches('*').trim())
                .filter(|t| !t.is_empty())
                .map(|t| (t.to_string(), None)),
            _ => None,
        }
    }

    /// Rewrite the legacy `numdim` + `dimN` form into `arraydim`.
    pub(crate) fn normalize_legacy_dims(node: &mut Map<String, Value>) {
        if node.contains_key("arraydim") {
            return;
        }
        let Some(numdim) = node.remove("numdim").and_then(|v| v.as_u64()) else {
            return;
        };
        let dims: Vec<Value> = (0..numdim)
            .filter_map(|i| node.remove(&format!("dim{i}")))
            .collect();
        if !dims.is_empty() {
            node.insert("arraydim".into(), Value::Array(dims));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn base_element_shape() {
        let field = FieldDescriptor::base("TNamed", 1, 0xdead_beef);
        let value = serde_json::to_value(&field).unwrap();
        assert_eq!(value["streamerelement"], "TStreamerBase");
        assert_eq!(value["name"], "TNamed");
        assert_eq!(value["baseversion"], 1);
        assert_eq!(value["basechecksum"], 0xdead_beef_u32);
        assert_eq!(value["v"], 3);
        assert!(value.get("countname").is_none());
    }

    #[test]
    fn counted_pointer_shape() {
        let field = FieldDescriptor::new(
            "fArray",
            FieldKind::BasicPointer(CountSpec {
                version: 2,
                name: "fN".into(),
                class: "TArrayD".into(),
            }),
            48,
            8,
        )
        .with_type_name("double*");
        let value = serde_json::to_value(&field).unwrap();
        assert_eq!(value["streamerelement"], "TStreamerBasicPointer");
        assert_eq!(value["countversion"], 2);
        assert_eq!(value["countname"], "fN");
        assert_eq!(value["countclass"], "TArrayD");
        assert_eq!(value["typename"], "double*");
    }

    #[test]
    fn container_parses_from_json() {
        let value = json!({
            "streamerelement": "TStreamerSTL",
            "name": "fItems",
            "v": 3,
            "type": 500,
            "typename": "vector<int>",
            "size": 24,
            "STLtype": 1,
            "Ctype": 3
        });
        let field: FieldDescriptor = serde_json::from_value(value).unwrap();
        assert_eq!(
            field.kind,
            FieldKind::Container(ContainerSpec {
                stl_type: 1,
                ctype: 3
            })
        );
        assert!(field.title.is_none());
        assert!(field.array_dims.is_empty());
    }

    #[test]
    fn array_dims_written_only_when_present() {
        let scalar = FieldDescriptor::new("fX", FieldKind::BasicType, 8, 8);
        let value = serde_json::to_value(&scalar).unwrap();
        assert!(value.get("arraydim").is_none());

        let array = scalar.with_array_dims(vec![3, 4]);
        let value = serde_json::to_value(&array).unwrap();
        assert_eq!(value["arraydim"], json!([3, 4]));
    }

    #[test]
    fn legacy_dims_are_normalized() {
        let mut node = json!({"numdim": 2, "dim0": 5, "dim1": 6})
            .as_object()
            .cloned()
            .unwrap();
        FieldDescriptor::normalize_legacy_dims(&mut node);
        assert_eq!(node["arraydim"], json!([5, 6]));
        assert!(!node.contains_key("numdim"));
    }

    #[test]
    fn dependency_of_members() {
        let base = FieldDescriptor::base("TAttLine", 2, 1);
        assert_eq!(base.dependency(), Some(("TAttLine".into(), Some(2))));

        let ptr = FieldDescriptor::new("fAxis", FieldKind::ObjectPointer, 64, 8)
            .with_type_name("TAxis*");
        assert_eq!(ptr.dependency(), Some(("TAxis".into(), None)));

        let basic = FieldDescriptor::new("fN", FieldKind::BasicType, 3, 4).with_type_name("int");
        assert!(basic.dependency().is_none());
    }

    #[test]
    fn tags_match_kinds() {
        for tag in FieldKind::TAGS {
            assert!(FieldKind::is_known_tag(tag));
        }
        assert!(!FieldKind::is_known_tag("TStreamerArtificial"));
        assert_eq!(FieldKind::String.tag(), "TStreamerString");
    }
}
