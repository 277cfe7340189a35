//! Plugin manager for registering, loading, and accessing sheet plugins.

use std::path::Path;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use libloading::{Library, Symbol};
use log::{debug, info, warn};

use crate::convert::rule::SpecSheet;
use crate::error::ShadeportError;
use crate::host::NodeSchema;
use crate::plugin::document::DocumentSheetPlugin;
use crate::plugin::repository::PluginRegistry;
use crate::plugin::traits::{Plugin, SheetContext, SheetPlugin};

/// Summary of a registered sheet, for listings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SheetInfo {
    pub id: String,
    pub name: String,
    pub version: (u32, u32, u32),
    pub impl_type: String,
    pub description: String,
}

/// Main plugin manager.
pub struct PluginManager {
    inner: RwLock<PluginRegistry>,
}

impl Default for PluginManager {
    fn default() -> Self {
        Self::new()
    }
}

impl PluginManager {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(PluginRegistry::new()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, PluginRegistry> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, PluginRegistry> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }

    pub fn register_sheet_plugin(&self, plugin: Arc<dyn SheetPlugin>) {
        let id = plugin.id();
        if self.write().sheet_plugins.register(plugin).is_some() {
            warn!("PluginManager: sheet plugin '{}' replaced", id);
        } else {
            debug!("PluginManager: registered sheet plugin '{}'", id);
        }
    }

    pub fn sheet_plugin(&self, id: &str) -> Option<Arc<dyn SheetPlugin>> {
        self.read().sheet_plugins.get(id).cloned()
    }

    pub fn list_sheets(&self) -> Vec<SheetInfo> {
        self.read()
            .sheet_plugins
            .values()
            .map(|plugin| SheetInfo {
                id: plugin.id().to_string(),
                name: plugin.name(),
                version: plugin.version(),
                impl_type: plugin.impl_type(),
                description: plugin.description(),
            })
            .collect()
    }

    pub fn spec_sheet(&self, id: &str, ctx: &SheetContext) -> Result<SpecSheet, ShadeportError> {
        let plugin = self
            .sheet_plugin(id)
            .ok_or_else(|| ShadeportError::Plugin(format!("Sheet '{}' not found", id)))?;
        debug!("PluginManager: building sheet '{}'", id);
        plugin.spec_sheet(ctx)
    }

    pub fn node_schemas(&self, id: &str) -> Vec<NodeSchema> {
        self.sheet_plugin(id)
            .map(|plugin| plugin.node_schemas())
            .unwrap_or_default()
    }

    unsafe fn load_plugin_generic<T: ?Sized + 'static>(
        &self,
        path: &Path,
        symbol: &[u8],
        register: impl FnOnce(&mut PluginRegistry, Arc<T>),
    ) -> Result<(), ShadeportError> {
        let library = unsafe { Library::new(path)? };
        let constructor: Symbol<unsafe extern "C" fn() -> *mut T> = unsafe { library.get(symbol)? };
        let raw = unsafe { constructor() };
        if raw.is_null() {
            return Err(ShadeportError::Plugin(format!(
                "Plugin constructor {} returned null",
                String::from_utf8_lossy(symbol)
            )));
        }
        let plugin = unsafe { Arc::from(Box::from_raw(raw)) };

        let mut inner = self.write();
        register(&mut *inner, plugin);
        inner.dynamic_libraries.push(library);
        Ok(())
    }

    /// Loads a dynamic library exporting `create_sheet_plugin`.
    pub fn load_sheet_plugin_from_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ShadeportError> {
        unsafe {
            self.load_plugin_generic::<dyn SheetPlugin>(
                path.as_ref(),
                b"create_sheet_plugin",
                |inner, plugin| {
                    info!("PluginManager: loaded sheet plugin '{}'", plugin.id());
                    inner.sheet_plugins.register(plugin);
                },
            )
        }
    }

    /// Wraps a `.toml` or `.json` sheet document as a plugin.
    pub fn load_sheet_document<P: AsRef<Path>>(&self, path: P) -> Result<String, ShadeportError> {
        let plugin = DocumentSheetPlugin::load(path.as_ref())?;
        let id = plugin.id().to_string();
        self.register_sheet_plugin(Arc::new(plugin));
        Ok(id)
    }

    /// Loads every plugin library and sheet document directly inside `dir_path`.
    ///
    /// A missing directory is not an error; files that fail to load are
    /// logged and skipped.
    pub fn load_plugins_from_directory<P: AsRef<Path>>(
        &self,
        dir_path: P,
    ) -> Result<usize, ShadeportError> {
        let dir = dir_path.as_ref();
        if !dir.is_dir() {
            warn!("Plugin directory not found: {}", dir.display());
            return Ok(0);
        }

        let mut paths: Vec<_> = std::fs::read_dir(dir)?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<Result<_, _>>()?;
        paths.sort();

        let mut loaded = 0;
        for path in paths.into_iter().filter(|p| p.is_file()) {
            let extension = path.extension().and_then(|s| s.to_str());
            let result = match extension {
                Some("dll") | Some("so") | Some("dylib") => {
                    info!("Attempting to load plugin from: {}", path.display());
                    self.load_sheet_plugin_from_file(&path)
                }
                Some("toml") | Some("json") => self.load_sheet_document(&path).map(|_| ()),
                _ => continue,
            };
            match result {
                Ok(()) => loaded += 1,
                Err(e) => warn!("Skipping {}: {}", path.display(), e),
            }
        }
        Ok(loaded)
    }
}
