//! Plugin registry.
//!
//! Holds the plugins handed to the runtime until startup, then loads them
//! into the engine in registration order. Names must be unique across the
//! registry; a duplicate is reported as an error instead of silently
//! shadowing the earlier plugin.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info};

use braze_core::Engine;

use crate::error::{RuntimeError, RuntimeResult};
use crate::plugin::{Plugin, PluginInfo};
use crate::runtime::RuntimeHooks;

/// Registry of plugins owned by the runtime.
#[derive(Clone)]
pub struct PluginRegistry {
    plugins: Arc<RwLock<Vec<Box<dyn Plugin>>>>,
}

impl PluginRegistry {
    /// Creates a new empty registry.
    pub fn new() -> Self {
        Self {
            plugins: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Creates a registry pre-populated with the given plugins.
    ///
    /// Name uniqueness is enforced when the plugins are loaded.
    pub(crate) fn from_plugins(plugins: Vec<Box<dyn Plugin>>) -> Self {
        Self {
            plugins: Arc::new(RwLock::new(plugins)),
        }
    }

    /// Registers a plugin.
    pub async fn register(&self, plugin: Box<dyn Plugin>) -> RuntimeResult<()> {
        let info = plugin.info();
        let mut plugins = self.plugins.write().await;

        if plugins.iter().any(|p| p.info().name == info.name) {
            return Err(RuntimeError::DuplicatePlugin(info.name.to_string()));
        }

        debug!(plugin = %info, "Registered plugin");
        plugins.push(plugin);
        Ok(())
    }

    /// Returns the identities of all registered plugins.
    pub async fn infos(&self) -> Vec<PluginInfo> {
        self.plugins.read().await.iter().map(|p| p.info()).collect()
    }

    /// Returns the number of registered plugins.
    pub async fn count(&self) -> usize {
        self.plugins.read().await.len()
    }

    /// Initializes every plugin against the engine, firing the load hooks
    /// around each one.
    pub(crate) async fn load_all(
        &self,
        engine: &Engine,
        hooks: &RuntimeHooks,
    ) -> RuntimeResult<()> {
        let plugins = self.plugins.read().await;
        debug!("Loading {} plugin(s)", plugins.len());

        let mut seen = HashSet::new();
        for plugin in plugins.iter() {
            let plugin_info = plugin.info();
            if !seen.insert(plugin_info.name) {
                return Err(RuntimeError::DuplicatePlugin(plugin_info.name.to_string()));
            }

            hooks.plugin_will_load.emit(&plugin_info);
            plugin
                .init(engine)
                .map_err(|source| RuntimeError::PluginInit {
                    plugin: plugin_info.name.to_string(),
                    source,
                })?;
            hooks.plugin_loaded.emit(&plugin_info);

            info!(plugin = %plugin_info, "Loaded plugin");
        }

        Ok(())
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new()
    }
}
