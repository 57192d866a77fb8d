//! The document store: one JSON document holding a tree of keyed objects.

use std::any::Any;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use keyfile_codec::{payload, Decoded, Encoded, LayoutsOf};
use keyfile_schema::{SchemaRegistry, SchemaSource};
use keyfile_types::{format, Datime, DocumentUuid, KeyCounter, KeyId, KeyName};

use crate::assembler::TreeAssembler;
use crate::config::StoreContext;
use crate::directory::{DirId, DirectoryHost, DirectoryNode, DirectoryTree};
use crate::error::{FileError, FileResult};
use crate::header::DocumentHeader;
use crate::key::KeyEntry;
use crate::mode::OpenMode;
use crate::registry::RegistryHandle;

/// Path of the platform's null device.
pub const NULL_DEVICE: &str = if cfg!(windows) { "NUL" } else { "/dev/null" };

/// What a new key holds.
#[derive(Clone, Copy)]
pub enum KeySource<'a> {
    /// A registered object. `class`, when given, must be the object's class
    /// or one of its bases.
    Object { object: &'a dyn Any, class: Option<&'a str> },
    /// An opaque byte buffer stored under `class`.
    Raw { bytes: &'a [u8], class: &'a str },
}

impl<'a> KeySource<'a> {
    pub fn object<T: Any>(object: &'a T) -> Self {
        Self::Object { object, class: None }
    }

    pub fn object_as<T: Any>(object: &'a T, class: &'a str) -> Self {
        Self::Object {
            object,
            class: Some(class),
        }
    }

    pub fn raw(bytes: &'a [u8], class: &'a str) -> Self {
        Self::Raw { bytes, class }
    }

    fn class_hint(&self) -> Option<&'a str> {
        match *self {
            Self::Object { class, .. } => class,
            Self::Raw { class, .. } => Some(class),
        }
    }
}

/// State read from disk or prepared for a new document.
struct Loaded {
    header: DocumentHeader,
    document: Map<String, Value>,
    tree: DirectoryTree,
    counter: KeyCounter,
    snapshot: SchemaRegistry,
}

impl Loaded {
    fn fresh() -> Self {
        Self {
            header: DocumentHeader::fresh(),
            document: Map::new(),
            tree: DirectoryTree::new(),
            counter: KeyCounter::new(),
            snapshot: SchemaRegistry::new(),
        }
    }

    fn read(path: &Path, ctx: &StoreContext) -> FileResult<Self> {
        let text = fs::read_to_string(path).map_err(|e| io_error(e, path))?;
        let parsed: Value = serde_json::from_str(&text).map_err(|e| FileError::Parse(e.to_string()))?;
        let Value::Object(mut document) = parsed else {
            return Err(FileError::Format("document root is not an object".into()));
        };
        let header = DocumentHeader::from_root(&document)?;

        let snapshot = match document.remove(format::STREAMER_INFOS) {
            Some(infos) => SchemaRegistry::read_all(&infos)?,
            None => SchemaRegistry::new(),
        };
        let emulated = snapshot
            .iter()
            .filter(|record| ctx.types.register_layout(record))
            .count();

        let keys = document
            .remove(format::KEYS)
            .unwrap_or_else(|| Value::Array(Vec::new()));
        let mut tree = DirectoryTree::new();
        let mut counter = KeyCounter::new();
        let report = TreeAssembler::decompose(&keys, DirId::ROOT, &mut tree, &mut counter)?;

        debug!(
            path = %path.display(),
            entries = report.entries,
            directories = report.directories,
            ignored = report.ignored,
            schemas = snapshot.len(),
            emulated,
            "document read"
        );
        Ok(Self {
            header,
            document,
            tree,
            counter,
            snapshot,
        })
    }
}

/// A JSON document of keyed objects.
///
/// The store owns the document for as long as it is open. Writable stores
/// serialize it on [`JsonFile::close`], which dropping an open store also
/// does.
pub struct JsonFile {
    path: PathBuf,
    mode: OpenMode,
    writable: bool,
    null_device: bool,
    header: DocumentHeader,
    /// Top-level members other than `Keys` and `StreamerInfos`; `None` once closed.
    document: Option<Map<String, Value>>,
    tree: DirectoryTree,
    counter: KeyCounter,
    /// Layouts read from the document.
    snapshot: SchemaRegistry,
    store_schemas: bool,
    ctx: StoreContext,
    handle: Option<RegistryHandle>,
}

impl JsonFile {
    /// Open a document.
    ///
    /// A leading `json:` is stripped from the name and `.json` is appended
    /// when missing. The null device is always opened as `CREATE`.
    pub fn open(name: impl AsRef<Path>, mode: OpenMode, ctx: StoreContext) -> FileResult<Self> {
        let raw = name.as_ref().to_string_lossy();
        let name = raw.strip_prefix(format::SCHEME_PREFIX).unwrap_or(&*raw);
        if name.is_empty() {
            return Err(FileError::EmptyFileName);
        }

        let null_device = name == NULL_DEVICE;
        let (path, mode) = if null_device {
            (PathBuf::from(name), OpenMode::Create)
        } else {
            (with_suffix(name), mode)
        };

        let create = match mode {
            OpenMode::Create => {
                if !null_device && path.exists() {
                    return Err(FileError::AlreadyExists(path));
                }
                true
            }
            OpenMode::Recreate => {
                if path.exists() {
                    if is_read_only(&path)? {
                        return Err(FileError::PermissionDenied(path));
                    }
                    fs::remove_file(&path).map_err(|e| io_error(e, &path))?;
                    debug!(path = %path.display(), "existing document removed");
                }
                true
            }
            OpenMode::Update => {
                if path.exists() {
                    if is_read_only(&path)? {
                        return Err(FileError::PermissionDenied(path));
                    }
                    false
                } else {
                    true
                }
            }
            OpenMode::Read => {
                if !path.exists() {
                    return Err(FileError::NotFound(path));
                }
                false
            }
        };

        let loaded = if create {
            Loaded::fresh()
        } else {
            Loaded::read(&path, &ctx)?
        };

        let writable = mode.is_writable();
        let handle = ctx.registry.register(&path, writable);
        info!(
            path = %path.display(),
            mode = %mode,
            created = create,
            keys = loaded.tree.entry_count(),
            "document opened"
        );

        Ok(Self {
            path,
            mode: if mode == OpenMode::Recreate { OpenMode::Create } else { mode },
            writable,
            null_device,
            header: loaded.header,
            document: Some(loaded.document),
            tree: loaded.tree,
            counter: loaded.counter,
            snapshot: loaded.snapshot,
            store_schemas: ctx.config.store_schemas,
            ctx,
            handle: Some(handle),
        })
    }

    /// Open with a mode option string such as `"recreate"`.
    pub fn open_with(name: impl AsRef<Path>, option: &str, ctx: StoreContext) -> FileResult<Self> {
        Self::open(name, OpenMode::parse(option), ctx)
    }

    // ------------------------------------------------------------------
    // State
    // ------------------------------------------------------------------

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    pub fn is_open(&self) -> bool {
        self.document.is_some()
    }

    pub fn is_writable(&self) -> bool {
        self.is_open() && self.writable
    }

    pub fn header(&self) -> &DocumentHeader {
        &self.header
    }

    pub fn title(&self) -> &str {
        &self.header.title
    }

    pub fn set_title(&mut self, title: impl Into<String>) -> FileResult<()> {
        self.ensure_writable()?;
        self.header.title = title.into();
        Ok(())
    }

    pub fn uuid(&self) -> DocumentUuid {
        self.header.uuid
    }

    /// Layouts read from the document when it was opened.
    pub fn schemas(&self) -> &SchemaRegistry {
        &self.snapshot
    }

    pub fn stores_schemas(&self) -> bool {
        self.store_schemas
    }

    /// Turn schema emission on or off.
    ///
    /// Only allowed while the store is writable and its top directory holds
    /// no keys; returns whether the setting was applied.
    pub fn set_store_schemas(&mut self, store: bool) -> bool {
        let empty = self
            .tree
            .list_keys(DirId::ROOT)
            .map(<[KeyEntry]>::is_empty)
            .unwrap_or(false);
        if !self.is_writable() || !empty {
            debug!(path = %self.path.display(), "schema emission can no longer be changed");
            return false;
        }
        self.store_schemas = store;
        true
    }

    fn ensure_open(&self) -> FileResult<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(FileError::Closed)
        }
    }

    fn ensure_writable(&self) -> FileResult<()> {
        self.ensure_open()?;
        if self.writable {
            Ok(())
        } else {
            Err(FileError::ReadOnly)
        }
    }

    // ------------------------------------------------------------------
    // Writing keys
    // ------------------------------------------------------------------

    /// Append a new key to `dir`.
    ///
    /// The entry is kept even when the object cannot be encoded; it then
    /// reports [`KeyEntry::is_stored`] `== false` and is left out of the
    /// saved document. A missing name falls back to the class name, then
    /// to `Noname`.
    pub fn create_key(
        &mut self,
        dir: DirId,
        source: KeySource<'_>,
        name: Option<&str>,
        title: Option<&str>,
    ) -> FileResult<&KeyEntry> {
        self.ensure_writable()?;
        if !self.tree.contains(dir) {
            return Err(FileError::UnknownDirectory(dir));
        }

        let id = self.counter.next_id();
        let encoded = self.encode(id, source);
        let class_name = encoded
            .as_ref()
            .map(|e| e.class_name.clone())
            .or_else(|| source.class_hint().map(str::to_string))
            .unwrap_or_default();
        let name = match name.filter(|n| !n.is_empty()) {
            Some(name) => name.to_string(),
            None if !class_name.is_empty() => class_name.clone(),
            None => format::NONAME.to_string(),
        };
        let cycle = self.tree.next_cycle(dir, &name)?;

        let entry = KeyEntry::new(
            id,
            name,
            title.unwrap_or_default().to_string(),
            cycle,
            class_name,
            encoded,
            self.ctx.config.reproducible,
        );
        debug!(key = %id, name = entry.name(), cycle = %cycle, class = entry.class_name(), "key created");
        self.tree.append_key(dir, entry)?;
        self.tree.entry(id).ok_or(FileError::UnknownKey(id))
    }

    /// Store `object` under `name` in `dir`.
    pub fn write_object<T: Any>(&mut self, dir: DirId, object: &T, name: &str) -> FileResult<KeyId> {
        self.create_key(dir, KeySource::object(object), Some(name), None)
            .map(KeyEntry::id)
    }

    /// Create a subdirectory of `parent`.
    pub fn create_directory(&mut self, parent: DirId, name: &str, title: &str) -> FileResult<DirId> {
        self.ensure_writable()?;
        if !self.tree.contains(parent) {
            return Err(FileError::UnknownDirectory(parent));
        }
        let name = if name.is_empty() { format::NONAME } else { name };

        let id = self.counter.next_id();
        let cycle = self.tree.next_cycle(parent, name)?;
        let entry = KeyEntry::directory(id, name.to_string(), title.to_string(), cycle, self.ctx.config.reproducible);
        self.tree.append_key(parent, entry)?;
        let dir = self.tree.make_subdirectory(parent, id, name, title)?;
        debug!(key = %id, name, parent = parent.index(), "directory created");
        Ok(dir)
    }

    /// Re-encode the object of an existing key.
    ///
    /// Id and cycle are kept. Returns `false` when the object could not be
    /// encoded; the key then holds no payload.
    pub fn update_object(&mut self, id: KeyId, object: &dyn Any) -> FileResult<bool> {
        self.ensure_writable()?;
        let entry = self.tree.entry(id).ok_or(FileError::UnknownKey(id))?;
        if entry.is_subdirectory() {
            return Err(FileError::IsDirectory(id));
        }
        let encoded = self.encode(id, KeySource::Object { object, class: None });
        let stored = encoded.is_some();
        let reproducible = self.ctx.config.reproducible;
        let entry = self.tree.entry_mut(id).ok_or(FileError::UnknownKey(id))?;
        entry.replace_payload(encoded);
        entry.update_attributes(reproducible);
        Ok(stored)
    }

    /// Re-render a key's attributes, leaving its payload alone.
    pub fn update_attributes(&mut self, id: KeyId) -> FileResult<()> {
        self.ensure_writable()?;
        let reproducible = self.ctx.config.reproducible;
        self.tree
            .entry_mut(id)
            .ok_or(FileError::UnknownKey(id))?
            .update_attributes(reproducible);
        Ok(())
    }

    pub fn set_key_title(&mut self, id: KeyId, title: &str) -> FileResult<()> {
        self.ensure_writable()?;
        let reproducible = self.ctx.config.reproducible;
        let entry = self.tree.entry_mut(id).ok_or(FileError::UnknownKey(id))?;
        entry.set_title(title);
        entry.update_attributes(reproducible);
        Ok(())
    }

    /// Re-render the attributes of every key in `dir`.
    pub fn write_keys(&mut self, dir: DirId) -> FileResult<()> {
        self.ensure_writable()?;
        let reproducible = self.ctx.config.reproducible;
        for entry in self.tree.entries_mut(dir)? {
            entry.update_attributes(reproducible);
        }
        Ok(())
    }

    /// Rewrite the key that stands for `dir` in its parent. For the top
    /// directory this touches the document's modification time.
    pub fn update_directory_header(&mut self, dir: DirId) -> FileResult<()> {
        self.ensure_writable()?;
        let node = self.tree.node(dir).ok_or(FileError::UnknownDirectory(dir))?;
        match node.self_key() {
            Some(id) => {
                let reproducible = self.ctx.config.reproducible;
                let entry = self.tree.entry_mut(id).ok_or(FileError::UnknownKey(id))?;
                entry.reset_directory_payload();
                entry.update_attributes(reproducible);
            }
            None => self.header.modified = Datime::now(),
        }
        Ok(())
    }

    /// Remove a key; a subdirectory key takes its whole subtree with it.
    pub fn delete_key(&mut self, id: KeyId) -> FileResult<()> {
        self.ensure_writable()?;
        let mut entry = self.tree.remove_key(id).ok_or(FileError::UnknownKey(id))?;
        entry.release();
        debug!(key = %id, name = entry.name(), "key deleted");
        Ok(())
    }

    fn encode(&self, id: KeyId, source: KeySource<'_>) -> Option<Encoded> {
        let result = match source {
            KeySource::Object { object, class } => self.ctx.codec.encode(object, class),
            KeySource::Raw { bytes, class } => self.ctx.codec.encode_raw(bytes, class),
        };
        match result {
            Ok(encoded) => Some(encoded),
            Err(error) => {
                warn!(key = %id, %error, "object could not be encoded; key will not be stored");
                None
            }
        }
    }

    // ------------------------------------------------------------------
    // Looking up keys
    // ------------------------------------------------------------------

    pub fn keys(&self, dir: DirId) -> FileResult<&[KeyEntry]> {
        self.tree.list_keys(dir)
    }

    pub fn key(&self, id: KeyId) -> Option<&KeyEntry> {
        self.tree.entry(id)
    }

    /// Key by name in `dir`; without a cycle the highest one is returned.
    pub fn find_key(&self, dir: DirId, key: &KeyName) -> Option<&KeyEntry> {
        let mut matching = self
            .tree
            .list_keys(dir)
            .ok()?
            .iter()
            .filter(|e| e.name() == key.name);
        match key.cycle {
            Some(cycle) => matching.find(|e| e.cycle() == cycle),
            None => matching.max_by_key(|e| e.cycle()),
        }
    }

    /// Key by path from the top directory, such as `"run1/calib/h;2"`.
    pub fn get(&self, path: &str) -> Option<&KeyEntry> {
        let mut segments = path.split('/').filter(|s| !s.is_empty()).peekable();
        let mut dir = DirId::ROOT;
        while let Some(segment) = segments.next() {
            let key = KeyName::parse(segment)
                .map_err(|error| debug!(path, %error, "malformed key path"))
                .ok()?;
            let entry = self.find_key(dir, &key)?;
            if segments.peek().is_none() {
                return Some(entry);
            }
            dir = self.tree.subdirectory(dir, entry.id())?;
        }
        None
    }

    pub fn directory(&self, dir: DirId) -> Option<&DirectoryNode> {
        self.tree.node(dir)
    }

    /// Child directory of `dir` by name, highest cycle when names repeat.
    pub fn subdirectory(&self, dir: DirId, name: &str) -> Option<DirId> {
        let entry = self.find_key(dir, &KeyName::new(name))?;
        self.tree.subdirectory(dir, entry.id())
    }

    pub fn subdirectories(&self, dir: DirId) -> Vec<DirId> {
        self.tree
            .node(dir)
            .map(|node| node.children().collect())
            .unwrap_or_default()
    }

    /// Keys in all directories, subdirectory keys included.
    pub fn entry_count(&self) -> usize {
        self.tree.entry_count()
    }

    // ------------------------------------------------------------------
    // Reading objects
    // ------------------------------------------------------------------

    /// Decode a key's object.
    ///
    /// With `expected`, the stored class must be that class or derive from
    /// it. Reading a compiled class through an emulated one, or the other
    /// way round, is allowed with a warning.
    pub fn try_read_any(&self, id: KeyId, expected: Option<&str>) -> FileResult<Decoded> {
        self.ensure_open()?;
        let entry = self.tree.entry(id).ok_or(FileError::UnknownKey(id))?;
        if entry.is_subdirectory() {
            return Err(FileError::IsDirectory(id));
        }
        let payload = entry.payload().ok_or(FileError::NoPayload(id))?;
        let stored = payload::type_tag(payload).unwrap_or(entry.class_name());

        if let Some(expected) = expected {
            let types = &self.ctx.types;
            let wanted = types
                .resolve(expected)
                .ok_or_else(|| FileError::ClassResolution(expected.to_string()))?;
            if types.base_offset(stored, expected).is_none() {
                return Err(FileError::InheritanceMismatch {
                    expected: expected.to_string(),
                    actual: stored.to_string(),
                });
            }
            if let Some(actual) = types.resolve(stored) {
                if actual.is_emulated() != wanted.is_emulated() {
                    warn!(
                        key = %id,
                        expected,
                        stored,
                        "mixing compiled and emulated classes; decoded object may be incomplete"
                    );
                }
            }
        }

        Ok(self.ctx.codec.decode(payload, expected)?)
    }

    /// Decode a key's object, logging and returning `None` on any failure.
    pub fn read_any(&self, id: KeyId, expected: Option<&str>) -> Option<Decoded> {
        match self.try_read_any(id, expected) {
            Ok(decoded) => Some(decoded),
            Err(error) => {
                warn!(key = %id, %error, "object not read");
                None
            }
        }
    }

    /// Decode a key's object as `T`.
    pub fn read_object<T: Any>(&self, id: KeyId) -> Option<T> {
        self.downcast(id, self.read_any(id, None)?)
    }

    /// Decode a key's object as `T`, requiring the stored class to derive
    /// from `expected`.
    pub fn read_object_as<T: Any>(&self, id: KeyId, expected: &str) -> Option<T> {
        self.downcast(id, self.read_any(id, Some(expected))?)
    }

    /// Decode the object at a key path as `T`.
    pub fn get_object<T: Any>(&self, path: &str) -> Option<T> {
        let id = self.get(path)?.id();
        self.read_object(id)
    }

    fn downcast<T: Any>(&self, id: KeyId, decoded: Decoded) -> Option<T> {
        decoded
            .downcast::<T>()
            .map_err(|decoded| {
                debug!(key = %id, class = %decoded.class_name, "object is not of the requested type");
            })
            .ok()
    }

    // ------------------------------------------------------------------
    // Schemas
    // ------------------------------------------------------------------

    /// Layouts needed to decode the stored objects: each class in use and,
    /// transitively, its bases and typed members. Layouts read from the
    /// document win over those of the type system.
    ///
    /// An entry read from disk does not know which version it was written
    /// with, so every version of its class found in the document is kept.
    pub fn schemas_to_write(&self) -> SchemaRegistry {
        let mut roots: Vec<(&str, Option<i32>)> = Vec::new();
        for entry in self.tree.entries() {
            if !entry.is_stored() || entry.is_subdirectory() || entry.class_name().is_empty() {
                continue;
            }
            let class_name = entry.class_name();
            match entry.class_version() {
                Some(version) => roots.push((class_name, Some(version))),
                None => {
                    let before = roots.len();
                    roots.extend(self.snapshot.versions(class_name).map(|v| (class_name, Some(v))));
                    if roots.len() == before {
                        roots.push((class_name, None));
                    }
                }
            }
        }
        let live = LayoutsOf(self.ctx.types.as_ref());
        let sources: [&dyn SchemaSource; 2] = [&self.snapshot, &live];
        SchemaRegistry::collect(roots, &sources)
    }

    // ------------------------------------------------------------------
    // Saving and closing
    // ------------------------------------------------------------------

    fn save(&mut self) -> FileResult<()> {
        let Some(extras) = self.document.as_ref() else {
            return Ok(());
        };
        let mut root = extras.clone();

        let config = &self.ctx.config;
        self.header.modified = Datime::now();
        self.header.io_version = format::CURRENT_IO_VERSION;
        self.header.producer_version = Some(config.producer_version);
        self.header.write_into(&mut root, config.reproducible);

        root.insert(format::KEYS.into(), TreeAssembler::combine(&self.tree, DirId::ROOT)?);
        root.remove(format::STREAMER_INFOS);
        let mut schemas = 0;
        if self.store_schemas {
            let needed = self.schemas_to_write();
            schemas = needed.len();
            if !needed.is_empty() {
                root.insert(format::STREAMER_INFOS.into(), needed.write_all()?);
            }
        }

        let bytes = render(&Value::Object(root), config.indent)?;
        if self.null_device || !config.atomic_save {
            fs::write(&self.path, &bytes).map_err(|e| io_error(e, &self.path))?;
        } else {
            write_atomic(&self.path, &bytes)?;
        }
        info!(
            path = %self.path.display(),
            keys = self.tree.entry_count(),
            schemas,
            bytes = bytes.len(),
            "document saved"
        );
        Ok(())
    }

    /// Switch between `READ` and `UPDATE`.
    ///
    /// Returns `false` when nothing changed. Leaving a writable mode saves
    /// the document first.
    pub fn reopen(&mut self, mode: OpenMode) -> FileResult<bool> {
        self.ensure_open()?;
        if !matches!(mode, OpenMode::Read | OpenMode::Update) {
            return Err(FileError::InvalidMode(mode.to_string()));
        }
        if mode == self.mode || (mode == OpenMode::Update && self.mode == OpenMode::Create) {
            return Ok(false);
        }

        if mode == OpenMode::Read {
            if self.writable {
                self.save()?;
            }
            self.writable = false;
        } else {
            self.writable = true;
        }
        self.mode = mode;
        if let Some(handle) = self.handle {
            self.ctx.registry.set_writable(handle, self.writable);
        }
        info!(path = %self.path.display(), mode = %mode, "document reopened");
        Ok(true)
    }

    /// Save when writable, then release the document.
    ///
    /// Closing a closed store does nothing. The in-memory tree is released
    /// and the store deregistered even when saving fails.
    pub fn close(&mut self) -> FileResult<()> {
        if !self.is_open() {
            return Ok(());
        }
        let result = if self.writable { self.save() } else { Ok(()) };

        self.writable = false;
        self.document = None;
        self.tree.clear();
        self.snapshot.clear();
        if let Some(handle) = self.handle.take() {
            self.ctx.registry.deregister(handle);
        }
        debug!(path = %self.path.display(), ok = result.is_ok(), "document closed");
        result
    }
}

impl Drop for JsonFile {
    fn drop(&mut self) {
        if let Err(error) = self.close() {
            warn!(path = %self.path.display(), %error, "document not saved on drop");
        }
    }
}

impl std::fmt::Debug for JsonFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonFile")
            .field("path", &self.path)
            .field("mode", &self.mode)
            .field("writable", &self.writable)
            .field("open", &self.is_open())
            .field("keys", &self.tree.entry_count())
            .finish()
    }
}

// ----------------------------------------------------------------------
// Helpers
// ----------------------------------------------------------------------

fn with_suffix(name: &str) -> PathBuf {
    if name.ends_with(format::FILE_SUFFIX) {
        PathBuf::from(name)
    } else {
        PathBuf::from(format!("{name}{}", format::FILE_SUFFIX))
    }
}

fn is_read_only(path: &Path) -> FileResult<bool> {
    let metadata = fs::metadata(path).map_err(|e| io_error(e, path))?;
    Ok(metadata.permissions().readonly())
}

fn io_error(error: io::Error, path: &Path) -> FileError {
    match error.kind() {
        io::ErrorKind::NotFound => FileError::NotFound(path.to_path_buf()),
        io::ErrorKind::PermissionDenied => FileError::PermissionDenied(path.to_path_buf()),
        _ => FileError::Io(error),
    }
}

fn render(document: &Value, indent: usize) -> FileResult<Vec<u8>> {
    let indent = " ".repeat(indent);
    let mut out = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(indent.as_bytes()));
    document
        .serialize(&mut serializer)
        .map_err(|e| FileError::Io(e.into()))?;
    out.push(b'\n');
    Ok(out)
}

/// Write through a temp file in the target's directory, then rename.
fn write_atomic(path: &Path, bytes: &[u8]) -> FileResult<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| io_error(e, dir))?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| io_error(e.error, path))?;
    Ok(())
}
