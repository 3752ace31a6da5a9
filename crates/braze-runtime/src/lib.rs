//! Braze Runtime - Orchestration layer for the Braze bot framework.
//!
//! This crate provides:
//! - Runtime orchestration (`BrazeRuntime`, `RuntimeBuilder`)
//! - Plugin registration and loading (`Plugin`, `PluginRegistry`)
//! - Configuration loading from files and the environment (`ConfigLoader`)
//! - Logging configuration (`LoggingBuilder`)
//! - Concrete event types for the supported platforms (`model`)
//!
//! # Quick Start
//!
//! ```ignore
//! use braze_runtime::BrazeRuntime;
//!
//! #[tokio::main]
//! async fn main() -> braze_runtime::RuntimeResult<()> {
//!     // Loads braze.toml from the current directory, or defaults.
//!     let runtime = BrazeRuntime::new();
//!
//!     runtime.register_plugin(Box::new(Echo)).await?;
//!     runtime.set_bot(my_bot);
//!
//!     // `events` is the receiving end of the adapter's event channel.
//!     // Runs until the channel closes or Ctrl+C.
//!     runtime.run(events).await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! # Configuration
//!
//! Configuration is layered: defaults, then configuration files
//! (`braze.toml`, with an optional per-profile `braze.{profile}.toml`),
//! then `BRAZE_`-prefixed environment variables. See [`config`] for the
//! full set of knobs.

pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod plugin;
pub mod registry;
pub mod runtime;

// Re-exports
pub use config::{ConfigError, ConfigLoader, ConfigResult, LoggingConfig, Profile, RuntimeConfig};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, SpanEvents};
pub use model::{FriendRequest, GroupMessage, GroupPoke, Heartbeat, PrivateMessage};
pub use plugin::{Plugin, PluginInfo, PluginResult};
pub use registry::PluginRegistry;
pub use runtime::{BrazeRuntime, RuntimeBuilder, RuntimeHooks};

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;

/// Prelude module for convenient imports.
///
/// This provides all the commonly used logging macros:
/// - `trace!`, `debug!`, `info!`, `warn!`, `error!`
/// - `span`, `event`
/// - `instrument` attribute
/// - `Level` for span creation
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
