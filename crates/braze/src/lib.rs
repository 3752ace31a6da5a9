//! # Braze
//!
//! An event-driven chat bot framework with hierarchical dispatch.
//!
//! ## Overview
//!
//! Braze routes platform events through a tree of handlers. Every handler
//! names the event families it listens to, carries a chain of middleware
//! predicates, and may end in an action. Dispatch walks the tree top-down:
//! a node runs only if all of its middlewares pass, children always get the
//! event before the node's own action, and the first action to run marks
//! the event as handled.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────┐  events   ┌─────────┐  dispatch   ┌───────────────────────┐
//! │ Adapter │──────────▶│ Runtime │────────────▶│ Engine (handler tree) │
//! └─────────┘  channel  └─────────┘  own task   │  root                 │
//!                                   per event   │  ├─ "message" ──▶ act │
//!                                               │  │   └─ "message.group"│
//!                                               │  └─ "notice"  ──▶ act │
//!                                               └───────────────────────┘
//! ```
//!
//! - **Runtime**: Loads configuration, initializes logging, loads plugins,
//!   and pumps the adapter's event channel into the engine
//! - **Engine**: Owns the handler tree and spawns one dispatch task per event
//! - **Plugins**: Units of bot functionality that register handlers at startup
//! - **Handlers**: Tree nodes with middlewares and an optional async action
//! - **Middlewares**: Predicates that gate a handler and can stash parsed
//!   state for the action to pick up
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use braze::prelude::*;
//!
//! struct Greeter;
//!
//! impl Plugin for Greeter {
//!     fn info(&self) -> PluginInfo {
//!         PluginInfo { name: "greeter", version: "0.1.0", description: "says hello" }
//!     }
//!
//!     fn init(&self, engine: &Engine) -> PluginResult {
//!         engine
//!             .new_handler(&[EventName::MESSAGE])
//!             .use_middleware(middlewares::command(&["hello"]))
//!             .handle(|ctx: Arc<Context>| async move {
//!                 let _ = ctx.reply("hi there!").await;
//!             });
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> braze::runtime::RuntimeResult<()> {
//!     let runtime = BrazeRuntime::new();
//!     runtime.register_plugin(Box::new(Greeter)).await?;
//!     runtime.set_bot(my_bot);
//!     runtime.run(events).await
//! }
//! ```
//!
//! ## Features
//!
//! - `command` (default): shell-style command parsing middleware
//! - `yaml-config`: YAML configuration file support
//! - `json-log`: JSON log output

pub use braze_core as core;
pub use braze_runtime as runtime;

/// Prelude module for convenient imports.
///
/// This module provides all commonly used types for building bot
/// applications:
///
/// ```rust,ignore
/// use braze::prelude::*;
/// ```
pub mod prelude {
    // Engine, handlers, middlewares, and the core traits
    pub use braze_core::prelude::*;

    // Runtime - main entry point
    pub use braze_runtime::{BrazeRuntime, RuntimeBuilder};

    // Plugin system - primary unit of bot functionality
    pub use braze_runtime::{Plugin, PluginInfo, PluginResult};

    // Concrete event types for the supported platforms
    pub use braze_runtime::model::{
        FriendRequest, GroupMessage, GroupPoke, Heartbeat, PrivateMessage,
    };
}
