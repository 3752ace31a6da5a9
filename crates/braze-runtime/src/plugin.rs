//! Plugin surface for extending the engine at startup.
//!
//! A plugin is a unit of bot functionality: its `init` runs once while the
//! runtime starts and registers the plugin's handlers on the shared engine.
//!
//! # Example
//!
//! ```rust,ignore
//! use braze_core::prelude::*;
//! use braze_runtime::{Plugin, PluginInfo, PluginResult};
//!
//! struct Echo;
//!
//! impl Plugin for Echo {
//!     fn info(&self) -> PluginInfo {
//!         PluginInfo {
//!             name: "echo",
//!             version: "0.1.0",
//!             description: "replies with the received text",
//!         }
//!     }
//!
//!     fn init(&self, engine: &Engine) -> PluginResult {
//!         engine
//!             .new_handler(&[EventName::MESSAGE])
//!             .use_middleware(middlewares::command(&["echo"]))
//!             .handle(|ctx: Arc<Context>| async move {
//!                 let _ = ctx.reply(ctx.event().plain_text()).await;
//!             });
//!         Ok(())
//!     }
//! }
//! ```

use std::error::Error;
use std::fmt;

use braze_core::Engine;

/// Identity of a plugin, used by the registry and the lifecycle hooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PluginInfo {
    /// Unique name; registering two plugins with the same name is an error.
    pub name: &'static str,
    pub version: &'static str,
    pub description: &'static str,
}

impl fmt::Display for PluginInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} v{}", self.name, self.version)
    }
}

/// Result type plugins return from [`Plugin::init`].
pub type PluginResult = Result<(), Box<dyn Error + Send + Sync>>;

/// A unit of bot functionality registered with the runtime.
pub trait Plugin: Send + Sync {
    /// Identity reported to the registry and hooks.
    fn info(&self) -> PluginInfo;

    /// Called once at startup; registers the plugin's handlers on the engine.
    fn init(&self, engine: &Engine) -> PluginResult;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_info_display() {
        let info = PluginInfo {
            name: "echo",
            version: "0.1.0",
            description: "replies with the received text",
        };
        assert_eq!(info.to_string(), "echo v0.1.0");
    }
}
