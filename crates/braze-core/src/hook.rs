//! Lifecycle hook sets.
//!
//! A [`HookSet`] is a plain value owned by whoever fires it; there is no
//! process-wide registry. The engine carries an [`EngineHooks`] instance and
//! the runtime crate builds its own sets on top of the same type. Clones
//! share the underlying list, so a set can be handed to plugin code and
//! fired from the owner.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::event::Event;

type HookFn<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// An ordered, removable collection of callbacks fired with a shared payload.
pub struct HookSet<T> {
    inner: Arc<HookSetInner<T>>,
}

struct HookSetInner<T> {
    hooks: Mutex<Vec<(u64, HookFn<T>)>>,
    next_id: AtomicU64,
}

impl<T> HookSet<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(HookSetInner {
                hooks: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(0),
            }),
        }
    }

    /// Appends a hook, returning the token that removes it again.
    pub fn add<F>(&self, hook: F) -> HookToken
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.hooks.lock().push((id, Arc::new(hook)));
        HookToken(id)
    }

    /// Removes the hook behind `token`. Removing twice is a no-op.
    pub fn remove(&self, token: HookToken) {
        self.inner.hooks.lock().retain(|(id, _)| *id != token.0);
    }

    /// Calls every hook in registration order.
    ///
    /// The list is snapshotted first, so hooks may add or remove hooks
    /// without deadlocking; such changes take effect from the next emit.
    pub fn emit(&self, payload: &T) {
        let hooks: Vec<HookFn<T>> = self
            .inner
            .hooks
            .lock()
            .iter()
            .map(|(_, hook)| Arc::clone(hook))
            .collect();
        for hook in hooks {
            hook(payload);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.inner.hooks.lock().is_empty()
    }
}

impl<T> Clone for HookSet<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Default for HookSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Identifies one registered hook within its set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HookToken(u64);

/// The hook sets the engine fires around event dispatch.
#[derive(Clone, Default)]
pub struct EngineHooks {
    /// Fired for every inbound event, before any handler sees it.
    pub event_received: HookSet<Arc<dyn Event>>,
    /// Fired after a dispatch finishes, with the handled outcome.
    pub event_handled: HookSet<(Arc<dyn Event>, bool)>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hooks_fire_in_registration_order() {
        let set: HookSet<u32> = HookSet::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for tag in ["a", "b"] {
            let seen = Arc::clone(&seen);
            set.add(move |payload: &u32| seen.lock().push(format!("{tag}{payload}")));
        }

        set.emit(&1);
        assert_eq!(*seen.lock(), vec!["a1", "b1"]);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let set: HookSet<()> = HookSet::new();
        let count = Arc::new(Mutex::new(0));

        let token = {
            let count = Arc::clone(&count);
            set.add(move |_| *count.lock() += 1)
        };
        set.emit(&());
        set.remove(token);
        set.remove(token);
        set.emit(&());

        assert_eq!(*count.lock(), 1);
        assert!(set.is_empty());
    }

    #[test]
    fn test_clones_share_the_set() {
        let set: HookSet<()> = HookSet::new();
        let clone = set.clone();
        let count = Arc::new(Mutex::new(0));

        {
            let count = Arc::clone(&count);
            clone.add(move |_| *count.lock() += 1);
        }
        set.emit(&());
        assert_eq!(*count.lock(), 1);
    }
}
