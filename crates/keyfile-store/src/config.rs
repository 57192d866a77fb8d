use std::fmt;
use std::sync::Arc;

use keyfile_codec::{ClassCatalog, ObjectCodec, TypeSystem};

use crate::registry::OpenFileRegistry;

/// Settings applied to every document opened with a [`StoreContext`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileConfig {
    /// Emit the `StreamerInfos` list on save.
    pub store_schemas: bool,
    /// Write fixed timestamps and a nil UUID so output is byte-stable.
    pub reproducible: bool,
    /// Spaces per indentation level in the saved document.
    pub indent: usize,
    /// Producer version code written as `ROOTVersionCode`.
    pub producer_version: i64,
    /// Save through a temp file renamed over the target.
    pub atomic_save: bool,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            store_schemas: true,
            reproducible: false,
            indent: 3,
            producer_version: default_producer_version(),
            atomic_save: true,
        }
    }
}

impl FileConfig {
    /// Output that depends only on the stored objects.
    pub fn reproducible() -> Self {
        Self {
            reproducible: true,
            ..Self::default()
        }
    }

    /// Skip the schema list.
    pub fn without_schemas() -> Self {
        Self {
            store_schemas: false,
            ..Self::default()
        }
    }
}

/// `major * 10000 + minor * 100 + patch` of this crate.
fn default_producer_version() -> i64 {
    let part = |s: &str| s.parse::<i64>().unwrap_or(0);
    part(env!("CARGO_PKG_VERSION_MAJOR")) * 10_000
        + part(env!("CARGO_PKG_VERSION_MINOR")) * 100
        + part(env!("CARGO_PKG_VERSION_PATCH"))
}

/// Collaborators shared by every open document.
#[derive(Clone)]
pub struct StoreContext {
    pub codec: Arc<dyn ObjectCodec>,
    pub types: Arc<dyn TypeSystem>,
    pub registry: Arc<OpenFileRegistry>,
    pub config: FileConfig,
}

impl StoreContext {
    pub fn new(codec: Arc<dyn ObjectCodec>, types: Arc<dyn TypeSystem>) -> Self {
        Self {
            codec,
            types,
            registry: Arc::new(OpenFileRegistry::new()),
            config: FileConfig::default(),
        }
    }

    /// Use one catalog as both codec and type system.
    pub fn with_catalog(catalog: Arc<ClassCatalog>) -> Self {
        Self::new(catalog.clone(), catalog)
    }

    pub fn with_registry(mut self, registry: Arc<OpenFileRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_config(mut self, config: FileConfig) -> Self {
        self.config = config;
        self
    }
}

impl fmt::Debug for StoreContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreContext")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = FileConfig::default();
        assert!(config.store_schemas);
        assert!(!config.reproducible);
        assert_eq!(config.indent, 3);
        assert!(config.atomic_save);
        assert!(config.producer_version > 0);
    }

    #[test]
    fn presets() {
        assert!(FileConfig::reproducible().reproducible);
        assert!(!FileConfig::without_schemas().store_schemas);
    }

    #[test]
    fn catalog_context_shares_registry_on_clone() {
        let ctx = StoreContext::with_catalog(Arc::new(ClassCatalog::new()));
        let other = ctx.clone().with_config(FileConfig::reproducible());
        assert!(Arc::ptr_eq(&ctx.registry, &other.registry));
        assert!(other.config.reproducible);
    }
}
