//! Generic plugin repository and registry.

use std::sync::Arc;

use indexmap::IndexMap;
use libloading::Library;

use crate::plugin::traits::{Plugin, SheetPlugin};

/// Generic container for plugins of a specific type, in registration order.
pub struct PluginRepository<T: ?Sized> {
    pub plugins: IndexMap<String, Arc<T>>,
}

impl<T: ?Sized + Plugin> PluginRepository<T> {
    pub fn new() -> Self {
        Self {
            plugins: IndexMap::new(),
        }
    }

    /// Registers `plugin`, replacing any plugin with the same id.
    pub fn register(&mut self, plugin: Arc<T>) -> Option<Arc<T>> {
        self.plugins.insert(plugin.id().to_string(), plugin)
    }

    pub fn get(&self, id: &str) -> Option<&Arc<T>> {
        self.plugins.get(id)
    }

    pub fn values(&self) -> impl Iterator<Item = &Arc<T>> {
        self.plugins.values()
    }
}

impl<T: ?Sized + Plugin> Default for PluginRepository<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Internal registry holding all plugin repositories.
///
/// Field order matters: plugins created by a dynamic library must drop
/// before the library is unloaded.
pub(crate) struct PluginRegistry {
    pub sheet_plugins: PluginRepository<dyn SheetPlugin>,
    pub dynamic_libraries: Vec<Library>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self {
            sheet_plugins: PluginRepository::new(),
            dynamic_libraries: Vec::new(),
        }
    }
}
