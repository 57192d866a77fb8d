use keyfile_types::{Cycle, KeyId};

use crate::error::{FileError, FileResult};
use crate::key::KeyEntry;

/// Address of a directory node inside a [`DirectoryTree`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DirId(usize);

impl DirId {
    /// The document's top-level directory.
    pub const ROOT: DirId = DirId(0);

    pub fn index(&self) -> usize {
        self.0
    }
}

/// The directory primitives the tree assembler works against.
pub trait DirectoryHost {
    /// Append an entry to the end of a directory's key list.
    fn append_key(&mut self, dir: DirId, entry: KeyEntry) -> FileResult<()>;

    /// A directory's key list in insertion order.
    fn list_keys(&self, dir: DirId) -> FileResult<&[KeyEntry]>;

    fn parent(&self, dir: DirId) -> Option<DirId>;

    /// The child directory represented by `key` in `dir`.
    fn subdirectory(&self, dir: DirId, key: KeyId) -> Option<DirId>;

    /// Create the child directory for the subdirectory entry `key`.
    fn make_subdirectory(&mut self, parent: DirId, key: KeyId, name: &str, title: &str) -> FileResult<DirId>;
}

/// One directory: its key list and its child directories.
#[derive(Clone, Debug, PartialEq)]
pub struct DirectoryNode {
    name: String,
    title: String,
    parent: Option<DirId>,
    /// Id of the entry that stands for this directory in its parent.
    self_key: Option<KeyId>,
    entries: Vec<KeyEntry>,
    children: Vec<(KeyId, DirId)>,
}

impl DirectoryNode {
    fn new(name: &str, title: &str, parent: Option<DirId>, self_key: Option<KeyId>) -> Self {
        Self {
            name: name.to_string(),
            title: title.to_string(),
            parent,
            self_key,
            entries: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn parent(&self) -> Option<DirId> {
        self.parent
    }

    pub fn self_key(&self) -> Option<KeyId> {
        self.self_key
    }

    pub fn entries(&self) -> &[KeyEntry] {
        &self.entries
    }

    /// Child directories in creation order.
    pub fn children(&self) -> impl Iterator<Item = DirId> + '_ {
        self.children.iter().map(|(_, dir)| *dir)
    }
}

/// Arena of directory nodes. Slot 0 is the root.
///
/// Removed subtrees leave empty slots; a [`DirId`] is never reused within
/// one tree.
#[derive(Clone, Debug, PartialEq)]
pub struct DirectoryTree {
    nodes: Vec<Option<DirectoryNode>>,
}

impl DirectoryTree {
    pub fn new() -> Self {
        Self {
            nodes: vec![Some(DirectoryNode::new("", "", None, None))],
        }
    }

    pub fn node(&self, dir: DirId) -> Option<&DirectoryNode> {
        self.nodes.get(dir.0).and_then(Option::as_ref)
    }

    fn node_mut(&mut self, dir: DirId) -> FileResult<&mut DirectoryNode> {
        self.nodes
            .get_mut(dir.0)
            .and_then(Option::as_mut)
            .ok_or(FileError::UnknownDirectory(dir))
    }

    pub fn contains(&self, dir: DirId) -> bool {
        self.node(dir).is_some()
    }

    /// Live directories, root first.
    pub fn directories(&self) -> impl Iterator<Item = DirId> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.is_some())
            .map(|(index, _)| DirId(index))
    }

    /// Every entry of every live directory.
    pub fn entries(&self) -> impl Iterator<Item = &KeyEntry> {
        self.nodes.iter().flatten().flat_map(|node| node.entries.iter())
    }

    pub fn entry_count(&self) -> usize {
        self.nodes.iter().flatten().map(|node| node.entries.len()).sum()
    }

    /// Directory and position of the entry with `id`.
    pub fn locate(&self, id: KeyId) -> Option<(DirId, usize)> {
        self.nodes.iter().enumerate().find_map(|(index, node)| {
            let node = node.as_ref()?;
            let pos = node.entries.iter().position(|e| e.id() == id)?;
            Some((DirId(index), pos))
        })
    }

    pub fn entry(&self, id: KeyId) -> Option<&KeyEntry> {
        let (dir, pos) = self.locate(id)?;
        self.node(dir).map(|node| &node.entries[pos])
    }

    pub fn entry_mut(&mut self, id: KeyId) -> Option<&mut KeyEntry> {
        let (dir, pos) = self.locate(id)?;
        self.nodes[dir.0].as_mut().map(|node| &mut node.entries[pos])
    }

    pub fn entries_mut(&mut self, dir: DirId) -> FileResult<&mut [KeyEntry]> {
        Ok(&mut self.node_mut(dir)?.entries)
    }

    /// Cycle for a new entry named `name` in `dir`: one past the highest
    /// cycle already present, or 1. Fails when that cycle is `u32::MAX`.
    pub fn next_cycle(&self, dir: DirId, name: &str) -> FileResult<Cycle> {
        let node = self.node(dir).ok_or(FileError::UnknownDirectory(dir))?;
        let cycle = Cycle::after(
            node.entries.iter().filter(|e| e.name() == name).map(KeyEntry::cycle),
        )?;
        Ok(cycle)
    }

    /// Remove an entry, and the subtree it stands for when it is a
    /// subdirectory.
    pub fn remove_key(&mut self, id: KeyId) -> Option<KeyEntry> {
        let (dir, pos) = self.locate(id)?;
        let node = self.nodes[dir.0].as_mut()?;
        let entry = node.entries.remove(pos);
        let child = node
            .children
            .iter()
            .position(|(key, _)| *key == id)
            .map(|i| node.children.remove(i).1);
        if let Some(child) = child {
            self.remove_subtree(child);
        }
        Some(entry)
    }

    fn remove_subtree(&mut self, dir: DirId) {
        let mut pending = vec![dir];
        while let Some(dir) = pending.pop() {
            if let Some(node) = self.nodes.get_mut(dir.0).and_then(Option::take) {
                pending.extend(node.children.iter().map(|(_, child)| *child));
            }
        }
    }

    /// Drop every directory except an empty root.
    pub fn clear(&mut self) {
        *self = Self::new();
    }
}

impl Default for DirectoryTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DirectoryHost for DirectoryTree {
    fn append_key(&mut self, dir: DirId, entry: KeyEntry) -> FileResult<()> {
        self.node_mut(dir)?.entries.push(entry);
        Ok(())
    }

    fn list_keys(&self, dir: DirId) -> FileResult<&[KeyEntry]> {
        self.node(dir)
            .map(|node| node.entries.as_slice())
            .ok_or(FileError::UnknownDirectory(dir))
    }

    fn parent(&self, dir: DirId) -> Option<DirId> {
        self.node(dir).and_then(|node| node.parent)
    }

    fn subdirectory(&self, dir: DirId, key: KeyId) -> Option<DirId> {
        self.node(dir)?
            .children
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, child)| *child)
    }

    fn make_subdirectory(&mut self, parent: DirId, key: KeyId, name: &str, title: &str) -> FileResult<DirId> {
        let child = DirId(self.nodes.len());
        self.node_mut(parent)?.children.push((key, child));
        self.nodes.push(Some(DirectoryNode::new(name, title, Some(parent), Some(key))));
        Ok(child)
    }
}
