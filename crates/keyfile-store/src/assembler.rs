//! Folding a directory hierarchy into one nested `Keys` array and back.

use serde_json::Value;
use tracing::{debug, warn};

use keyfile_codec::payload;
use keyfile_types::{format, KeyCounter};

use crate::directory::{DirId, DirectoryHost};
use crate::error::{FileError, FileResult};
use crate::key::KeyEntry;

/// What [`TreeAssembler::decompose`] materialized.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Decomposition {
    /// Entries appended, subdirectory entries and their contents included.
    pub entries: usize,
    pub directories: usize,
    /// Trailing elements skipped because they carried no object type tag.
    pub ignored: usize,
}

impl Decomposition {
    fn absorb(&mut self, other: Decomposition) {
        self.entries += other.entries;
        self.directories += other.directories;
        self.ignored += other.ignored;
    }
}

pub struct TreeAssembler;

impl TreeAssembler {
    /// Fold `dir` and everything below it into a `Keys` array.
    ///
    /// Entries appear in insertion order. A subdirectory entry carries its
    /// own folded contents as the `Keys` member of its payload. Entries
    /// without a payload are left out.
    pub fn combine<H: DirectoryHost>(host: &H, dir: DirId) -> FileResult<Value> {
        let entries = host.list_keys(dir)?;
        let mut keys = Vec::with_capacity(entries.len());
        for entry in entries {
            let Some(mut node) = entry.to_json() else {
                debug!(key = %entry.id(), name = entry.name(), "entry has no payload; omitted");
                continue;
            };
            if entry.is_subdirectory() {
                let nested = match host.subdirectory(dir, entry.id()) {
                    Some(child) => Self::combine(host, child)?,
                    None => Value::Array(Vec::new()),
                };
                if let Some(object) = node.get_mut(format::OBJECT).and_then(Value::as_object_mut) {
                    object.insert(format::KEYS.into(), nested);
                }
            }
            keys.push(node);
        }
        Ok(Value::Array(keys))
    }

    /// Unfold a `Keys` array into `dir`.
    ///
    /// Each element gets the next id from `counter`; a subdirectory's id is
    /// taken before the ids of its contents. The walk stops at the first
    /// element without an `Object` carrying a `_typename`, and the number
    /// of elements left unread is reported.
    pub fn decompose<H: DirectoryHost>(
        keys: &Value,
        dir: DirId,
        host: &mut H,
        counter: &mut KeyCounter,
    ) -> FileResult<Decomposition> {
        let nodes = keys
            .as_array()
            .ok_or_else(|| FileError::Format("Keys is not an array".into()))?;
        let mut report = Decomposition::default();

        for (index, node) in nodes.iter().enumerate() {
            let Some(object) = node.get(format::OBJECT).filter(|o| payload::type_tag(o).is_some()) else {
                let ignored = nodes.len() - index;
                warn!(dir = dir.index(), index, ignored, "key list ends at element without an object type");
                report.ignored += ignored;
                break;
            };

            let entry = KeyEntry::from_json(counter.next_id(), node)?;
            let (id, is_subdirectory) = (entry.id(), entry.is_subdirectory());
            let (name, title) = (entry.name().to_string(), entry.title().unwrap_or_default().to_string());
            host.append_key(dir, entry)?;
            report.entries += 1;

            if is_subdirectory {
                let child = host.make_subdirectory(dir, id, &name, &title)?;
                report.directories += 1;
                let nested = object
                    .get(format::KEYS)
                    .cloned()
                    .unwrap_or_else(|| Value::Array(Vec::new()));
                report.absorb(Self::decompose(&nested, child, host, counter)?);
            }
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::DirectoryTree;
    use keyfile_codec::Encoded;
    use keyfile_types::{Cycle, KeyId};
    use serde_json::json;

    fn sample_keys() -> Value {
        json!([
            {"name": "h1", "cycle": 1, "created": "2024-01-01 00:00:00",
             "Object": {"_typename": "Hist", "n": 1}},
            {"name": "sub", "title": "nested", "cycle": 1, "created": "2024-01-01 00:00:00",
             "Object": {"_typename": "TDirectoryFile", "Keys": [
                {"name": "h2", "cycle": 1, "created": "2024-01-01 00:00:00",
                 "Object": {"_typename": "Hist", "n": 2}},
                {"name": "h2", "cycle": 2, "created": "2024-01-01 00:00:00",
                 "Object": {"_typename": "Hist", "n": 3}}
             ]}},
            {"name": "h3", "cycle": 1, "created": "2024-01-01 00:00:00",
             "Object": {"_typename": "Hist", "n": 4}}
        ])
    }

    #[test]
    fn decompose_assigns_ids_in_document_order() {
        let mut tree = DirectoryTree::new();
        let mut counter = KeyCounter::new();
        let report = TreeAssembler::decompose(&sample_keys(), DirId::ROOT, &mut tree, &mut counter).unwrap();
        assert_eq!(report, Decomposition { entries: 5, directories: 1, ignored: 0 });

        let root: Vec<u64> = tree.list_keys(DirId::ROOT).unwrap().iter().map(|e| e.id().get()).collect();
        assert_eq!(root, [1, 2, 5]);
        let sub = tree.subdirectory(DirId::ROOT, KeyId::new(2)).unwrap();
        let inner: Vec<u64> = tree.list_keys(sub).unwrap().iter().map(|e| e.id().get()).collect();
        assert_eq!(inner, [3, 4]);
        assert_eq!(tree.node(sub).unwrap().title(), "nested");
        assert_eq!(counter.last(), Some(KeyId::new(5)));
    }

    #[test]
    fn combine_restores_the_decomposed_tree() {
        let keys = sample_keys();
        let mut tree = DirectoryTree::new();
        TreeAssembler::decompose(&keys, DirId::ROOT, &mut tree, &mut KeyCounter::new()).unwrap();
        assert_eq!(TreeAssembler::combine(&tree, DirId::ROOT).unwrap(), keys);
    }

    #[test]
    fn decompose_stops_at_untyped_element() {
        let keys = json!([
            {"name": "a", "cycle": 1, "Object": {"_typename": "A"}},
            {"name": "b", "cycle": 1, "Object": {"x": 1}},
            {"name": "c", "cycle": 1, "Object": {"_typename": "C"}}
        ]);
        let mut tree = DirectoryTree::new();
        let report = TreeAssembler::decompose(&keys, DirId::ROOT, &mut tree, &mut KeyCounter::new()).unwrap();
        assert_eq!(report.entries, 1);
        assert_eq!(report.ignored, 2);
        assert_eq!(tree.entry_count(), 1);
    }

    #[test]
    fn decompose_rejects_non_array() {
        let mut tree = DirectoryTree::new();
        let result = TreeAssembler::decompose(&json!({}), DirId::ROOT, &mut tree, &mut KeyCounter::new());
        assert!(matches!(result, Err(FileError::Format(_))));
    }

    #[test]
    fn combine_omits_unstored_entries() {
        let mut tree = DirectoryTree::new();
        let stored = Encoded {
            payload: json!({"_typename": "A"}),
            class_name: "A".into(),
            class_version: 1,
        };
        tree.append_key(
            DirId::ROOT,
            KeyEntry::new(KeyId::new(1), "ok".into(), String::new(), Cycle::FIRST, String::new(), Some(stored), false),
        )
        .unwrap();
        tree.append_key(
            DirId::ROOT,
            KeyEntry::new(KeyId::new(2), "bad".into(), String::new(), Cycle::FIRST, "B".into(), None, false),
        )
        .unwrap();
        let keys = TreeAssembler::combine(&tree, DirId::ROOT).unwrap();
        let names: Vec<&str> = keys.as_array().unwrap().iter().map(|k| k["name"].as_str().unwrap()).collect();
        assert_eq!(names, ["ok"]);
    }

    #[test]
    fn empty_subdirectory_combines_to_empty_keys() {
        let mut tree = DirectoryTree::new();
        tree.append_key(
            DirId::ROOT,
            KeyEntry::directory(KeyId::new(1), "d".into(), String::new(), Cycle::FIRST, false),
        )
        .unwrap();
        tree.make_subdirectory(DirId::ROOT, KeyId::new(1), "d", "").unwrap();
        let keys = TreeAssembler::combine(&tree, DirId::ROOT).unwrap();
        assert_eq!(keys[0]["Object"], json!({"_typename": "TDirectoryFile", "Keys": []}));
    }
}
