//! The engine: root of the handler tree and entry point for dispatch.
//!
//! An [`Engine`] owns the root [`Handler`], the bot configuration, an
//! optional bot handle, and its own [`EngineHooks`] instance. Application
//! and plugin code register handlers through it; the event source feeds it
//! with [`Engine::dispatch`], which runs every event on its own tokio task
//! so that dispatches stay concurrent (the wait primitive depends on this).
//!
//! # Example
//!
//! ```rust,ignore
//! use braze_core::prelude::*;
//!
//! let engine = Engine::new(BotConfig::default());
//! engine
//!     .new_handler(&[EventName::MESSAGE])
//!     .use_middleware(middlewares::command(&["ping"]))
//!     .handle(|ctx: Arc<Context>| async move {
//!         let _ = ctx.reply("pong").await;
//!     });
//!
//! while let Some(event) = events.recv().await {
//!     engine.dispatch(event);
//! }
//! ```

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use parking_lot::RwLock;
use tokio::task::JoinHandle;
use tracing::{Instrument, Level, debug, error, span};

use crate::bot::Bot;
use crate::config::BotConfig;
use crate::context::Context;
use crate::dispatch::dispatch_event;
use crate::event::{Event, EventName};
use crate::handler::{Handler, Middleware, RemoveHandle};
use crate::hook::EngineHooks;

pub struct Engine {
    root: Arc<Handler>,
    bot: RwLock<Option<Arc<dyn Bot>>>,
    config: Arc<BotConfig>,
    hooks: EngineHooks,
}

impl Engine {
    pub fn new(config: BotConfig) -> Self {
        Self {
            root: Handler::new_root(),
            bot: RwLock::new(None),
            config: Arc::new(config),
            hooks: EngineHooks::default(),
        }
    }

    /// The root of the handler tree.
    pub fn root(&self) -> Arc<Handler> {
        Arc::clone(&self.root)
    }

    pub fn config(&self) -> Arc<BotConfig> {
        Arc::clone(&self.config)
    }

    /// The engine's lifecycle hooks.
    pub fn hooks(&self) -> &EngineHooks {
        &self.hooks
    }

    /// Attaches the bot used by contexts for outbound API calls.
    pub fn set_bot(&self, bot: Arc<dyn Bot>) {
        *self.bot.write() = Some(bot);
    }

    pub fn bot(&self) -> Option<Arc<dyn Bot>> {
        self.bot.read().clone()
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Registers a top-level handler under the given event names.
    pub fn new_handler(&self, names: &[EventName]) -> Arc<Handler> {
        self.root.new_handler(names)
    }

    /// Registers a removable top-level handler.
    pub fn new_removable_handler(&self, names: &[EventName]) -> (Arc<Handler>, RemoveHandle) {
        self.root.new_removable_handler(names)
    }

    /// Appends an engine-wide middleware; it gates every dispatch.
    pub fn use_middleware(&self, middleware: Middleware) -> &Self {
        self.root.use_middleware(middleware);
        self
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    /// Runs one event through the handler tree on its own task.
    ///
    /// Fires the `event_received` hooks first and the `event_handled` hooks
    /// once the traversal finishes. A panicking middleware or terminal
    /// action aborts that event's traversal; the failure is logged and
    /// never reaches the event source.
    pub fn dispatch(&self, event: Arc<dyn Event>) -> JoinHandle<bool> {
        let root = Arc::clone(&self.root);
        let bot = self.bot.read().clone();
        let config = Arc::clone(&self.config);
        let hooks = self.hooks.clone();
        let span = span!(Level::DEBUG, "dispatch", event_name = %event.name());

        tokio::spawn(
            async move {
                hooks.event_received.emit(&event);
                debug!("{}", event.description());

                let ctx = Context::new(bot, Arc::clone(&event), config);
                let handled = match AssertUnwindSafe(dispatch_event(root, ctx))
                    .catch_unwind()
                    .await
                {
                    Ok(handled) => handled,
                    Err(_) => {
                        error!("dispatch aborted by panic");
                        false
                    }
                };
                if !handled {
                    debug!("event not handled by any handler");
                }

                hooks.event_handled.emit(&(event, handled));
                handled
            }
            .instrument(span),
        )
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(BotConfig::default())
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("root", &self.root)
            .field("has_bot", &self.bot.read().is_some())
            .finish()
    }
}
