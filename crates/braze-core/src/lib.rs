//! # Braze Core
//!
//! The core engine of the Braze bot framework.
//!
//! This crate provides the event model, the hierarchical handler tree, and
//! the dispatch machinery that routes events through it.
//!
//! ## Dispatch Model
//!
//! Handlers form a tree rooted in the [`Engine`]. Each handler is attached
//! under one or more dotted event names (`message`, `message.group`, ...),
//! carries an ordered list of middlewares, and may end in a terminal action.
//! Dispatch walks the tree from the root: a node whose middlewares all pass
//! defers to its matching children, and only runs its own terminal action
//! when no child matches the event.
//!
//! ```text
//! ┌────────┐     ┌────────┐     ┌───────────────────┐
//! │ Event  │────▶│ Engine │────▶│ root              │
//! │ source │     │        │     │ ├─ message        │
//! └────────┘     └────────┘     │ │  └─ message.group
//!                               │ └─ notice         │
//!                               └───────────────────┘
//! ```
//!
//! Inside a middleware or terminal action the [`Context`] exposes the
//! continuation protocol: [`Context::proceed`] hands the event to the rest
//! of the tree and resumes afterwards, [`Context::abort`] stops the dispatch
//! outright, and [`Context::wait_for_next_event`] parks the handler until a
//! follow-up event arrives on a later dispatch.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use braze_core::{BotConfig, Context, Engine, EventName, middlewares};
//!
//! #[tokio::main]
//! async fn main() {
//!     let engine = Engine::new(BotConfig::default());
//!     engine
//!         .new_handler(&[EventName::MESSAGE])
//!         .use_middleware(middlewares::command(&["echo"]))
//!         .handle(|ctx: Arc<Context>| async move {
//!             if let Some(m) = ctx.get::<middlewares::CommandMatch>(middlewares::KEY_COMMAND) {
//!                 let _ = ctx.reply(m.remainder.clone()).await;
//!             }
//!         });
//!
//!     while let Some(event) = events.recv().await {
//!         engine.dispatch(event);
//!     }
//! }
//! ```

pub mod bot;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod event;
pub mod handler;
pub mod hook;
pub mod middlewares;

mod dispatch;

#[cfg(test)]
pub(crate) mod testing;

pub use bot::Bot;
pub use config::BotConfig;
pub use context::Context;
pub use engine::Engine;
pub use error::{ApiError, ApiResult};
pub use event::{Event, EventField, EventName};
pub use handler::{Handler, Middleware, RemoveHandle};
pub use hook::{EngineHooks, HookSet, HookToken};

/// Prelude for common imports.
pub mod prelude {
    pub use std::sync::Arc;

    pub use super::{
        ApiError, ApiResult, Bot, BotConfig, Context, Engine, Event, EventField, EventName,
        Handler, Middleware, RemoveHandle, middlewares,
    };
}
