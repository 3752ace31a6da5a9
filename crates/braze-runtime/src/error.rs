//! Runtime error types.

use thiserror::Error;

use crate::config::ConfigError;

/// Errors that can occur during runtime operations.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Configuration loading or validation failed.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A plugin with the same name is already registered.
    #[error("Duplicate plugin: {0}")]
    DuplicatePlugin(String),

    /// A plugin's init returned an error.
    #[error("Plugin '{plugin}' failed to initialize")]
    PluginInit {
        plugin: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
