//! Handler registry tree.
//!
//! Handlers form a tree rooted at the engine. Each node owns an ordered
//! middleware list, an optional terminal action, and a map from [`EventName`]
//! to ordered child lists. A dispatch walks one subtree per event, consulting
//! [`Handler::matched_handlers`] at every expanded node.
//!
//! Nodes are `Arc`-shared and internally locked per field, so registration
//! and removal may run concurrently with dispatches over unrelated subtrees.
//! Removal is only ever explicit, through the [`RemoveHandle`] returned by
//! [`Handler::new_removable_handler`]; this is the mechanism the
//! wait-for-next-event primitive builds its short-lived listeners on.
//!
//! # Example
//!
//! ```rust,ignore
//! use braze_core::prelude::*;
//!
//! engine
//!     .new_handler(&[EventName::MESSAGE_GROUP])
//!     .use_middleware(middlewares::command(&["ping"]))
//!     .handle(|ctx: Arc<Context>| async move {
//!         let _ = ctx.reply("pong").await;
//!     });
//! ```

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use futures::future::BoxFuture;
use parking_lot::RwLock;

use crate::context::Context;
use crate::event::EventName;

// =============================================================================
// Middleware and terminal action
// =============================================================================

/// A predicate deciding whether a handler accepts the current event.
///
/// Middlewares run in registration order; the first one returning `false`
/// makes the node decline the event. They may also mutate the context bag
/// (the text matchers record their parse results this way) or drive the
/// continuation surface ([`Context::proceed`] / [`Context::abort`]).
#[derive(Clone)]
pub struct Middleware {
    run: Arc<dyn Fn(Arc<Context>) -> BoxFuture<'static, bool> + Send + Sync>,
}

impl Middleware {
    /// Wraps an async predicate.
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(Arc<Context>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        Self {
            run: Arc::new(move |ctx| Box::pin(f(ctx))),
        }
    }

    /// Wraps a plain synchronous predicate.
    ///
    /// The predicate runs when the returned future is polled, so it stays
    /// inside the dispatch's panic boundary.
    pub fn check<F>(f: F) -> Self
    where
        F: Fn(&Context) -> bool + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        Self {
            run: Arc::new(move |ctx| {
                let f = Arc::clone(&f);
                Box::pin(async move { f(&ctx) })
            }),
        }
    }

    pub(crate) fn call(&self, ctx: Arc<Context>) -> BoxFuture<'static, bool> {
        (self.run)(ctx)
    }
}

impl fmt::Debug for Middleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Middleware").finish_non_exhaustive()
    }
}

/// The business-logic callback of a matched handler.
#[derive(Clone)]
pub(crate) struct TerminalAction {
    run: Arc<dyn Fn(Arc<Context>) -> BoxFuture<'static, ()> + Send + Sync>,
}

impl TerminalAction {
    fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(Arc<Context>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self {
            run: Arc::new(move |ctx| Box::pin(f(ctx))),
        }
    }

    pub(crate) fn call(&self, ctx: Arc<Context>) -> BoxFuture<'static, ()> {
        (self.run)(ctx)
    }
}

// =============================================================================
// Handler
// =============================================================================

/// A node in the registry tree.
///
/// Every field carries its own lock: registration on one node never blocks
/// matching on another, and readers at a node only contend with writers at
/// that same node.
pub struct Handler {
    middlewares: RwLock<Vec<Middleware>>,
    terminal: RwLock<Option<TerminalAction>>,
    children: RwLock<HashMap<EventName, Vec<Arc<Handler>>>>,
    parent: RwLock<Weak<Handler>>,
}

impl Handler {
    /// Creates a detached root node. Owned by the engine.
    pub(crate) fn new_root() -> Arc<Self> {
        Arc::new(Self {
            middlewares: RwLock::new(Vec::new()),
            terminal: RwLock::new(None),
            children: RwLock::new(HashMap::new()),
            parent: RwLock::new(Weak::new()),
        })
    }

    /// Creates a child handler attached under the given event names.
    ///
    /// Passing no names attaches it under the universal `all` category. The
    /// child is visited whenever a dispatch expands this node and one of its
    /// names matches a tier of the current event's name.
    pub fn new_handler(self: &Arc<Self>, names: &[EventName]) -> Arc<Handler> {
        let (child, _) = self.attach(names);
        child
    }

    /// Like [`Handler::new_handler`], but also returns a handle that detaches
    /// the node again.
    ///
    /// Calling [`RemoveHandle::remove`] more than once is a no-op.
    pub fn new_removable_handler(self: &Arc<Self>, names: &[EventName]) -> (Arc<Handler>, RemoveHandle) {
        let (child, names) = self.attach(names);
        let handle = RemoveHandle {
            inner: Arc::new(RemoveInner {
                parent: Arc::downgrade(self),
                child: Arc::downgrade(&child),
                names,
                removed: AtomicBool::new(false),
            }),
        };
        (child, handle)
    }

    fn attach(self: &Arc<Self>, names: &[EventName]) -> (Arc<Handler>, Vec<EventName>) {
        let names: Vec<EventName> = if names.is_empty() {
            vec![EventName::ALL]
        } else {
            names.to_vec()
        };
        let child = Arc::new(Handler {
            middlewares: RwLock::new(Vec::new()),
            terminal: RwLock::new(None),
            children: RwLock::new(HashMap::new()),
            parent: RwLock::new(Arc::downgrade(self)),
        });
        let mut children = self.children.write();
        for name in &names {
            children
                .entry(name.clone())
                .or_default()
                .push(Arc::clone(&child));
        }
        (child, names)
    }

    /// Appends a middleware to this node. Chainable.
    pub fn use_middleware(self: &Arc<Self>, middleware: Middleware) -> Arc<Handler> {
        self.middlewares.write().push(middleware);
        Arc::clone(self)
    }

    /// Sets this node's terminal action, replacing any previous one.
    ///
    /// The action runs when a dispatch reaches this node, all middlewares
    /// pass, and no child matches the current event. By default it consumes
    /// the event; call [`Context::proceed`] inside it to pass the event on
    /// to the remaining pending handlers.
    pub fn handle<F, Fut>(self: &Arc<Self>, action: F) -> Arc<Handler>
    where
        F: Fn(Arc<Context>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        *self.terminal.write() = Some(TerminalAction::new(action));
        Arc::clone(self)
    }

    /// Returns the children matching an event name, most specific tier first,
    /// registration order within each tier, ending with the universal tier.
    ///
    /// A child attached under several matching names is returned once, at its
    /// most specific position.
    pub fn matched_handlers(&self, name: &EventName) -> Vec<Arc<Handler>> {
        let children = self.children.read();
        let mut matched: Vec<Arc<Handler>> = Vec::new();
        for tier in name.tiers().chain(std::iter::once(EventName::ALL.as_str())) {
            if let Some(list) = children.get(tier) {
                for child in list {
                    if !matched.iter().any(|seen| Arc::ptr_eq(seen, child)) {
                        matched.push(Arc::clone(child));
                    }
                }
            }
        }
        matched
    }

    /// The node this handler is attached under, if still attached.
    pub fn parent(&self) -> Option<Arc<Handler>> {
        self.parent.read().upgrade()
    }

    pub(crate) fn middleware_snapshot(&self) -> Vec<Middleware> {
        self.middlewares.read().clone()
    }

    pub(crate) fn terminal_action(&self) -> Option<TerminalAction> {
        self.terminal.read().clone()
    }

    fn detach_child(&self, names: &[EventName], child: &Arc<Handler>) {
        let mut children = self.children.write();
        for name in names {
            if let Some(list) = children.get_mut(name.as_str()) {
                list.retain(|entry| !Arc::ptr_eq(entry, child));
                if list.is_empty() {
                    children.remove(name.as_str());
                }
            }
        }
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("middlewares", &self.middlewares.read().len())
            .field("has_terminal", &self.terminal.read().is_some())
            .field("children", &self.children.read().len())
            .finish()
    }
}

// =============================================================================
// RemoveHandle
// =============================================================================

/// Detaches a handler created with [`Handler::new_removable_handler`].
///
/// Cloneable so the node itself and the code that registered it can both
/// request removal; whichever call comes first wins and the rest are no-ops.
#[derive(Debug, Clone)]
pub struct RemoveHandle {
    inner: Arc<RemoveInner>,
}

#[derive(Debug)]
struct RemoveInner {
    parent: Weak<Handler>,
    child: Weak<Handler>,
    names: Vec<EventName>,
    removed: AtomicBool,
}

impl RemoveHandle {
    /// Detaches the handler from every name it was attached under and clears
    /// its parent back-reference. Idempotent.
    pub fn remove(&self) {
        if self.inner.removed.swap(true, Ordering::SeqCst) {
            return;
        }
        let Some(child) = self.inner.child.upgrade() else {
            return;
        };
        if let Some(parent) = self.inner.parent.upgrade() {
            parent.detach_child(&self.inner.names, &child);
        }
        *child.parent.write() = Weak::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matched_handlers_tier_order() {
        let root = Handler::new_root();
        let exact = root.new_handler(&[EventName::custom("message.group.normal")]);
        let group_a = root.new_handler(&[EventName::MESSAGE_GROUP]);
        let group_b = root.new_handler(&[EventName::MESSAGE_GROUP]);
        let message = root.new_handler(&[EventName::MESSAGE]);
        let universal = root.new_handler(&[]);
        // Attached under a name outside the hierarchy of the dispatched event.
        let _notice = root.new_handler(&[EventName::NOTICE]);

        let matched = root.matched_handlers(&EventName::custom("message.group.normal"));
        let expected = [&exact, &group_a, &group_b, &message, &universal];
        assert_eq!(matched.len(), expected.len());
        for (got, want) in matched.iter().zip(expected) {
            assert!(Arc::ptr_eq(got, want));
        }
    }

    #[test]
    fn test_matched_handlers_dedups_multi_name_nodes() {
        let root = Handler::new_root();
        let both = root.new_handler(&[EventName::MESSAGE_GROUP, EventName::MESSAGE]);

        let matched = root.matched_handlers(&EventName::custom("message.group.normal"));
        assert_eq!(matched.len(), 1);
        assert!(Arc::ptr_eq(&matched[0], &both));
    }

    #[test]
    fn test_no_names_attaches_universal() {
        let root = Handler::new_root();
        let catch_all = root.new_handler(&[]);

        let matched = root.matched_handlers(&EventName::META_HEARTBEAT);
        assert_eq!(matched.len(), 1);
        assert!(Arc::ptr_eq(&matched[0], &catch_all));
    }

    #[test]
    fn test_remove_detaches_everywhere() {
        let root = Handler::new_root();
        let (node, handle) =
            root.new_removable_handler(&[EventName::MESSAGE_GROUP, EventName::NOTICE]);
        assert!(node.parent().is_some());

        handle.remove();
        assert!(root.matched_handlers(&EventName::custom("message.group.normal")).is_empty());
        assert!(root.matched_handlers(&EventName::custom("notice.notify.poke")).is_empty());
        assert!(node.parent().is_none());

        // Second removal is a no-op.
        handle.remove();
    }

    #[test]
    fn test_remove_leaves_siblings_alone() {
        let root = Handler::new_root();
        let keep = root.new_handler(&[EventName::MESSAGE]);
        let (_, handle) = root.new_removable_handler(&[EventName::MESSAGE]);
        handle.remove();

        let matched = root.matched_handlers(&EventName::MESSAGE);
        assert_eq!(matched.len(), 1);
        assert!(Arc::ptr_eq(&matched[0], &keep));
    }
}
