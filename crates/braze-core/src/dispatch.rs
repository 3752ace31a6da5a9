//! Event traversal and the continuation protocol.
//!
//! A dispatch walks the handler tree with an explicit queue of pending
//! nodes. At each node the middlewares run in order; the first `false`
//! verdict makes the node decline, which is not consuming, and the walk
//! moves to the next pending node. When every middleware passes, the node
//! either expands (its matching children are queued ahead of everything
//! else, its own terminal action is skipped) or, with no matching child,
//! is a dead end: the terminal action runs if present and the event is
//! consumed either way.
//!
//! Consumption is what [`Context::proceed`] undoes. Every callback gets a
//! single-use [`Action`] holding a fork of the traversal frozen just past
//! the call site. `proceed` runs the fork to completion inside the call and
//! the pre-fork run finishes as soon as the callback returns, so no handler
//! runs twice. [`Context::abort`] drops the fork and halts the walk.
//!
//! A panic inside a middleware or terminal action aborts that one dispatch:
//! the failure is logged and the walk halts, as if the panicking callback
//! had called `abort`. Only a middleware returning `false` is a decline.

use std::any::Any;
use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::FutureExt;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use tracing::warn;

use crate::context::Context;
use crate::handler::{Handler, Middleware};

/// Runs one event through the tree rooted at `root`.
///
/// Returns `true` if any terminal action ran.
pub(crate) async fn dispatch_event(root: Arc<Handler>, ctx: Arc<Context>) -> bool {
    Traversal {
        ctx,
        queue: VecDeque::from([root]),
        current: None,
        handled: false,
    }
    .run()
    .await
}

// =============================================================================
// Action
// =============================================================================

/// The continuation surface handed to one middleware or terminal callback.
///
/// Single use: the first `proceed` consumes the fork, later calls return
/// `false`. The owning traversal invalidates the action once the callback
/// returns, so clones kept by spawned tasks go stale instead of resuming a
/// finished walk.
#[derive(Clone)]
pub(crate) struct Action {
    inner: Arc<ActionInner>,
}

struct ActionInner {
    fork: Mutex<Option<Traversal>>,
    aborted: AtomicBool,
    resumed: Mutex<Option<bool>>,
}

impl Action {
    fn new(fork: Traversal) -> Self {
        Self {
            inner: Arc::new(ActionInner {
                fork: Mutex::new(Some(fork)),
                aborted: AtomicBool::new(false),
                resumed: Mutex::new(None),
            }),
        }
    }

    pub(crate) async fn proceed(&self) -> bool {
        let fork = self.inner.fork.lock().take();
        let Some(fork) = fork else {
            return false;
        };
        if self.inner.aborted.load(Ordering::SeqCst) {
            return false;
        }
        let handled = fork.run().await;
        *self.inner.resumed.lock() = Some(handled);
        handled
    }

    pub(crate) fn abort(&self) {
        self.inner.aborted.store(true, Ordering::SeqCst);
        self.inner.fork.lock().take();
    }

    fn is_aborted(&self) -> bool {
        self.inner.aborted.load(Ordering::SeqCst)
    }

    fn take_resumed(&self) -> Option<bool> {
        self.inner.resumed.lock().take()
    }

    fn invalidate(&self) {
        self.inner.fork.lock().take();
    }
}

// =============================================================================
// Traversal
// =============================================================================

/// Walk state over the tree. Cloning it freezes the remainder of the walk,
/// which is exactly what a fork is.
#[derive(Clone)]
struct Traversal {
    ctx: Arc<Context>,
    queue: VecDeque<Arc<Handler>>,
    current: Option<CurrentNode>,
    handled: bool,
}

#[derive(Clone)]
struct CurrentNode {
    handler: Arc<Handler>,
    middlewares: Vec<Middleware>,
    mw_idx: usize,
}

impl Traversal {
    /// Runs the walk to completion, restoring the context's active handler
    /// to its entry value on the way out. Boxed since forks recurse through
    /// [`Action::proceed`].
    fn run(mut self) -> BoxFuture<'static, bool> {
        Box::pin(async move {
            let ctx = Arc::clone(&self.ctx);
            let entry = ctx.active_handler();
            let handled = self.run_inner().await;
            ctx.set_active_handler(entry);
            handled
        })
    }

    async fn run_inner(&mut self) -> bool {
        let name = self.ctx.event_name();

        'nodes: loop {
            let cur = match self.current.take() {
                Some(cur) => cur,
                None => match self.queue.pop_front() {
                    Some(handler) => CurrentNode {
                        middlewares: handler.middleware_snapshot(),
                        handler,
                        mw_idx: 0,
                    },
                    None => return self.handled,
                },
            };
            self.ctx.set_active_handler(Some(Arc::clone(&cur.handler)));

            let mut idx = cur.mw_idx;
            while idx < cur.middlewares.len() {
                let middleware = cur.middlewares[idx].clone();
                let action = Action::new(Traversal {
                    ctx: Arc::clone(&self.ctx),
                    queue: self.queue.clone(),
                    current: Some(CurrentNode {
                        handler: Arc::clone(&cur.handler),
                        middlewares: cur.middlewares.clone(),
                        mw_idx: idx + 1,
                    }),
                    handled: false,
                });
                self.ctx.install_action(action.clone());
                let verdict = AssertUnwindSafe(middleware.call(Arc::clone(&self.ctx)))
                    .catch_unwind()
                    .await;
                self.ctx.clear_action();

                let resumed = action.take_resumed();
                if let Some(fork_handled) = resumed {
                    self.handled |= fork_handled;
                }
                action.invalidate();

                let pass = match verdict {
                    Ok(pass) => pass,
                    Err(payload) => {
                        warn!(
                            event = %name,
                            "middleware panicked: {}, aborting dispatch",
                            panic_message(&payload),
                        );
                        return self.handled;
                    }
                };
                if action.is_aborted() || resumed.is_some() {
                    return self.handled;
                }
                if !pass {
                    continue 'nodes;
                }
                idx += 1;
            }

            let matched = cur.handler.matched_handlers(&name);
            if !matched.is_empty() {
                for child in matched.into_iter().rev() {
                    self.queue.push_front(child);
                }
                continue 'nodes;
            }

            // Dead end: this node takes the event.
            if let Some(terminal) = cur.handler.terminal_action() {
                let action = Action::new(Traversal {
                    ctx: Arc::clone(&self.ctx),
                    queue: self.queue.clone(),
                    current: None,
                    handled: false,
                });
                self.ctx.install_action(action.clone());
                let outcome = AssertUnwindSafe(terminal.call(Arc::clone(&self.ctx)))
                    .catch_unwind()
                    .await;
                self.ctx.clear_action();
                match outcome {
                    Ok(()) => self.handled = true,
                    Err(payload) => {
                        warn!(
                            event = %name,
                            "terminal action panicked: {}, aborting dispatch",
                            panic_message(&payload),
                        );
                    }
                }
                if let Some(fork_handled) = action.take_resumed() {
                    self.handled |= fork_handled;
                }
                action.invalidate();
            }
            return self.handled;
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}
