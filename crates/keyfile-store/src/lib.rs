//! Single-document JSON store of keyed, versioned objects.
//!
//! A [`JsonFile`] holds a tree of directories. Each directory lists
//! [`KeyEntry`]s in write order; writing the same name again adds a new
//! cycle rather than replacing the old entry. On close the tree is folded
//! into one nested `Keys` array, and the class layouts needed to read the
//! objects back are written alongside as `StreamerInfos`.
//!
//! # Key Types
//!
//! - [`JsonFile`] -- An open document: open modes, key creation, lookup, save
//! - [`KeyEntry`] -- One stored object with its name, cycle and payload
//! - [`DirectoryTree`] -- Arena of directory nodes addressed by [`DirId`]
//! - [`TreeAssembler`] -- Folds a directory tree into `Keys` and back
//! - [`StoreContext`] -- Codec, type system, open-file registry and [`FileConfig`]
//! - [`OpenFileRegistry`] -- Shared list of open documents
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use keyfile_codec::{ClassCatalog, ClassSpec};
//! use keyfile_store::{DirId, JsonFile, OpenMode, StoreContext};
//!
//! let catalog = Arc::new(ClassCatalog::new());
//! catalog.register::<Vec<f64>>(ClassSpec::new("Samples", 1)).unwrap();
//!
//! let mut file = JsonFile::open("run.json", OpenMode::Recreate, StoreContext::with_catalog(catalog)).unwrap();
//! file.write_object(DirId::ROOT, &vec![1.0, 2.5], "samples").unwrap();
//! file.close().unwrap();
//! ```

pub mod assembler;
pub mod config;
pub mod directory;
pub mod error;
pub mod file;
pub mod header;
pub mod key;
pub mod mode;
pub mod registry;

pub use assembler::{Decomposition, TreeAssembler};
pub use config::{FileConfig, StoreContext};
pub use directory::{DirId, DirectoryHost, DirectoryNode, DirectoryTree};
pub use error::{FileError, FileResult};
pub use file::{JsonFile, KeySource, NULL_DEVICE};
pub use header::DocumentHeader;
pub use key::KeyEntry;
pub use mode::OpenMode;
pub use registry::{OpenFileRecord, OpenFileRegistry, RegistryHandle};
