use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::debug;

/// Token returned by [`OpenFileRegistry::register`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RegistryHandle(u64);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OpenFileRecord {
    pub handle: RegistryHandle,
    pub path: PathBuf,
    pub writable: bool,
}

#[derive(Debug, Default)]
struct Inner {
    next: u64,
    files: Vec<OpenFileRecord>,
}

/// Process-side list of open documents.
///
/// Documents add themselves on a successful open and remove themselves on
/// close. All access goes through one lock.
#[derive(Debug, Default)]
pub struct OpenFileRegistry {
    inner: Mutex<Inner>,
}

impl OpenFileRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, path: &Path, writable: bool) -> RegistryHandle {
        let mut inner = self.inner.lock().expect("lock poisoned");
        inner.next += 1;
        let handle = RegistryHandle(inner.next);
        inner.files.push(OpenFileRecord {
            handle,
            path: path.to_path_buf(),
            writable,
        });
        debug!(path = %path.display(), open = inner.files.len(), "registered open file");
        handle
    }

    /// Remove a document. Returns `false` if the handle was not registered.
    pub fn deregister(&self, handle: RegistryHandle) -> bool {
        let mut inner = self.inner.lock().expect("lock poisoned");
        let before = inner.files.len();
        inner.files.retain(|record| record.handle != handle);
        before != inner.files.len()
    }

    pub fn set_writable(&self, handle: RegistryHandle, writable: bool) {
        let mut inner = self.inner.lock().expect("lock poisoned");
        if let Some(record) = inner.files.iter_mut().find(|r| r.handle == handle) {
            record.writable = writable;
        }
    }

    pub fn is_open(&self, path: &Path) -> bool {
        let inner = self.inner.lock().expect("lock poisoned");
        inner.files.iter().any(|record| record.path == path)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("lock poisoned").files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the open documents, oldest first.
    pub fn list(&self) -> Vec<OpenFileRecord> {
        self.inner.lock().expect("lock poisoned").files.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_and_deregister() {
        let reg = OpenFileRegistry::new();
        let a = reg.register(Path::new("a.json"), true);
        let b = reg.register(Path::new("b.json"), false);
        assert_ne!(a, b);
        assert_eq!(reg.len(), 2);
        assert!(reg.is_open(Path::new("a.json")));

        assert!(reg.deregister(a));
        assert!(!reg.deregister(a));
        assert!(!reg.is_open(Path::new("a.json")));
        assert_eq!(reg.list()[0].path, PathBuf::from("b.json"));
    }

    #[test]
    fn writable_flag_tracks_updates() {
        let reg = OpenFileRegistry::new();
        let h = reg.register(Path::new("x.json"), true);
        reg.set_writable(h, false);
        assert!(!reg.list()[0].writable);
        assert!(reg.deregister(h));
        assert!(reg.is_empty());
    }

    #[test]
    fn shared_between_threads() {
        let reg = std::sync::Arc::new(OpenFileRegistry::new());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let reg = reg.clone();
                std::thread::spawn(move || reg.register(Path::new(&format!("{i}.json")), true))
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(reg.len(), 4);
    }
}
