//! Per-dispatch context.
//!
//! A [`Context`] is created for every incoming event and shared by all
//! callbacks that event reaches. It carries the event, the bot that received
//! it, a typed key-value bag the middlewares communicate through, the
//! continuation surface ([`Context::proceed`] / [`Context::abort`]) and the
//! wait-for-next-event primitive built on short-lived removable handlers.
//!
//! # Example
//!
//! ```rust,ignore
//! handler.handle(|ctx: Arc<Context>| async move {
//!     if let Some(name) = ctx.prompt("what should I call you?", Duration::from_secs(30)).await {
//!         let _ = ctx.reply(format!("hello, {name}")).await;
//!     }
//! });
//! ```

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tokio::sync::oneshot;

use crate::bot::Bot;
use crate::config::BotConfig;
use crate::dispatch::Action;
use crate::error::{ApiError, ApiResult};
use crate::event::{Event, EventField, EventName};
use crate::handler::{Handler, Middleware, RemoveHandle};
use crate::middlewares;

/// Shared state of one event dispatch.
pub struct Context {
    bot: Option<Arc<dyn Bot>>,
    event: Arc<dyn Event>,
    config: Arc<BotConfig>,
    data: RwLock<HashMap<String, Arc<dyn Any + Send + Sync>>>,
    action: Mutex<Option<Action>>,
    active: Mutex<Option<Arc<Handler>>>,
}

impl Context {
    pub(crate) fn new(
        bot: Option<Arc<dyn Bot>>,
        event: Arc<dyn Event>,
        config: Arc<BotConfig>,
    ) -> Arc<Self> {
        Arc::new(Self {
            bot,
            event,
            config,
            data: RwLock::new(HashMap::new()),
            action: Mutex::new(None),
            active: Mutex::new(None),
        })
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// The event being dispatched.
    pub fn event(&self) -> Arc<dyn Event> {
        Arc::clone(&self.event)
    }

    /// Shorthand for the dispatched event's name.
    pub fn event_name(&self) -> EventName {
        self.event.name()
    }

    /// The bot the event arrived on, when one is attached.
    pub fn bot(&self) -> Option<Arc<dyn Bot>> {
        self.bot.clone()
    }

    pub fn config(&self) -> &BotConfig {
        &self.config
    }

    /// The handler currently being evaluated, while a dispatch is running.
    ///
    /// Wait listeners attach under this node so they live and die with the
    /// handler that created them.
    pub fn active_handler(&self) -> Option<Arc<Handler>> {
        self.active.lock().clone()
    }

    pub(crate) fn set_active_handler(&self, handler: Option<Arc<Handler>>) {
        *self.active.lock() = handler;
    }

    // =========================================================================
    // Key-value bag
    // =========================================================================

    /// Stores a value under `key`, replacing any previous one.
    ///
    /// Middlewares use this to hand their match results to later middlewares
    /// and to the terminal action.
    pub fn set<T: Send + Sync + 'static>(&self, key: impl Into<String>, value: T) {
        self.data.write().insert(key.into(), Arc::new(value));
    }

    /// Returns the value stored under `key`, if it exists and is a `T`.
    pub fn get<T: Send + Sync + 'static>(&self, key: &str) -> Option<Arc<T>> {
        let value = Arc::clone(self.data.read().get(key)?);
        value.downcast::<T>().ok()
    }

    // =========================================================================
    // Continuation
    // =========================================================================

    /// Passes the event on to the handlers that would otherwise be skipped.
    ///
    /// The remainder of the traversal runs to completion inside this call.
    /// Returns `true` if some terminal action ran in that remainder. Outside
    /// a middleware or terminal action (or called a second time) this does
    /// nothing and returns `false`.
    pub async fn proceed(&self) -> bool {
        let action = self.action.lock().clone();
        match action {
            Some(action) => action.proceed().await,
            None => false,
        }
    }

    /// Halts the whole dispatch. No further middleware, terminal action or
    /// pending handler runs after the current callback returns.
    pub fn abort(&self) {
        let action = self.action.lock().clone();
        if let Some(action) = action {
            action.abort();
        }
    }

    pub(crate) fn install_action(&self, action: Action) {
        *self.action.lock() = Some(action);
    }

    pub(crate) fn clear_action(&self) {
        *self.action.lock() = None;
    }

    // =========================================================================
    // Bot API helpers
    // =========================================================================

    /// Calls a bot API action, bounded by the configured API timeout.
    ///
    /// Fails with [`ApiError::NotConnected`] when no bot is attached.
    pub async fn call_api(&self, action: &str, params: Value) -> ApiResult<Value> {
        let Some(bot) = self.bot.clone() else {
            return Err(ApiError::NotConnected);
        };
        let timeout = Duration::from_secs(self.config.api_timeout_secs);
        match tokio::time::timeout(timeout, bot.call_api(action, params)).await {
            Ok(result) => result,
            Err(_) => Err(ApiError::Timeout),
        }
    }

    /// Sends a message back to where the event came from.
    ///
    /// Group events are answered in the group, everything else directly to
    /// the sending user.
    pub async fn reply(&self, message: impl Into<String>) -> ApiResult<Value> {
        let message = message.into();
        let params = if let Some(group_id) = self.event.field(EventField::GroupId) {
            serde_json::json!({ "group_id": group_id, "message": message })
        } else if let Some(user_id) = self.event.field(EventField::UserId) {
            serde_json::json!({ "user_id": user_id, "message": message })
        } else {
            return Err(ApiError::Unsupported("event carries no reply target"));
        };
        self.call_api("send_msg", params).await
    }

    /// Recalls the message that triggered the current event.
    pub async fn delete_msg(&self) -> ApiResult<Value> {
        let Some(message_id) = self.event.field(EventField::MessageId) else {
            return Err(ApiError::Unsupported("event carries no message id"));
        };
        self.call_api("delete_msg", serde_json::json!({ "message_id": message_id }))
            .await
    }

    // =========================================================================
    // Waiting for events
    // =========================================================================

    /// Parks until the next event passing all of `filters`, at most `timeout`
    /// long.
    ///
    /// The listener is an ephemeral universal-name child of the active
    /// handler; the event that wakes it is consumed by its own dispatch.
    /// Returns `None` on timeout or when called outside a dispatch.
    pub async fn wait_for_next_event(
        &self,
        timeout: Duration,
        filters: Vec<Middleware>,
    ) -> Option<Arc<dyn Event>> {
        let Some(anchor) = self.active_handler() else {
            tracing::warn!("wait_for_next_event called outside of a dispatch, ignoring");
            return None;
        };

        let (tx, rx) = oneshot::channel::<Arc<dyn Event>>();
        let slot = Arc::new(Mutex::new(Some(tx)));
        let (listener, handle) = anchor.new_removable_handler(&[]);
        // Covers every exit path, including cancellation of this future.
        let _guard = RemoveOnDrop(handle.clone());
        for filter in filters {
            listener.use_middleware(filter);
        }
        listener.handle(move |ctx: Arc<Context>| {
            let slot = Arc::clone(&slot);
            let handle = handle.clone();
            async move {
                if let Some(tx) = slot.lock().take() {
                    let _ = tx.send(ctx.event());
                }
                handle.remove();
            }
        });

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(event)) => Some(event),
            _ => None,
        }
    }

    /// Waits for the next event from the same session as the current one.
    pub async fn wait_for_next_event_in_session(&self, timeout: Duration) -> Option<Arc<dyn Event>> {
        let session = middlewares::from_session(self.event.session_id());
        self.wait_for_next_event(timeout, vec![session]).await
    }

    /// Sends `text` and waits for the session's answer, returning its plain
    /// text. `None` when sending fails or nobody answers in time.
    pub async fn prompt(&self, text: impl Into<String>, timeout: Duration) -> Option<String> {
        self.reply(text).await.ok()?;
        let event = self.wait_for_next_event_in_session(timeout).await?;
        Some(event.plain_text())
    }
}

struct RemoveOnDrop(RemoveHandle);

impl Drop for RemoveOnDrop {
    fn drop(&mut self) {
        self.0.remove();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{EchoBot, TestEvent, test_context};

    #[test]
    fn test_bag_roundtrip() {
        let ctx = test_context(EventName::MESSAGE_PRIVATE, "hi");
        ctx.set("attempts", 3_i64);
        ctx.set("who", "alice".to_string());
        assert_eq!(ctx.get::<i64>("attempts").as_deref(), Some(&3));
        assert_eq!(ctx.get::<String>("who").as_deref(), Some(&"alice".to_string()));
        assert!(ctx.get::<i64>("missing").is_none());

        // Same key, wrong type.
        assert!(ctx.get::<String>("attempts").is_none());

        ctx.set("attempts", 4_i64);
        assert_eq!(ctx.get::<i64>("attempts").as_deref(), Some(&4));
    }

    #[tokio::test]
    async fn test_proceed_without_dispatch_is_false() {
        let ctx = test_context(EventName::MESSAGE_PRIVATE, "hi");
        assert!(!ctx.proceed().await);
        ctx.abort();
    }

    #[tokio::test]
    async fn test_reply_routes_to_group_when_present() {
        let bot = Arc::new(EchoBot::default());
        let event = Arc::new(TestEvent::group_message(42, 7, "hello"));
        let ctx = Context::new(Some(bot.clone()), event, Arc::new(BotConfig::default()));

        ctx.reply("welcome").await.unwrap();
        let calls = bot.calls.lock();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "send_msg");
        assert_eq!(calls[0].1["group_id"], 42);
        assert_eq!(calls[0].1["message"], "welcome");
    }

    #[tokio::test]
    async fn test_reply_falls_back_to_user() {
        let bot = Arc::new(EchoBot::default());
        let event = Arc::new(TestEvent::private_message(7, "hello"));
        let ctx = Context::new(Some(bot.clone()), event, Arc::new(BotConfig::default()));

        ctx.reply("welcome").await.unwrap();
        let calls = bot.calls.lock();
        assert_eq!(calls[0].1["user_id"], 7);
    }

    #[tokio::test]
    async fn test_api_calls_without_bot_fail() {
        let event = Arc::new(TestEvent::private_message(7, "hello"));
        let ctx = Context::new(None, event, Arc::new(BotConfig::default()));
        assert!(matches!(ctx.reply("welcome").await, Err(ApiError::NotConnected)));
    }

    #[tokio::test]
    async fn test_delete_msg_uses_message_id() {
        let bot = Arc::new(EchoBot::default());
        let event = Arc::new(TestEvent::private_message(7, "hello"));
        let ctx = Context::new(Some(bot.clone()), event, Arc::new(BotConfig::default()));

        ctx.delete_msg().await.unwrap();
        let calls = bot.calls.lock();
        assert_eq!(calls[0].0, "delete_msg");
        assert_eq!(calls[0].1["message_id"], 99);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_outside_dispatch_is_none() {
        let ctx = test_context(EventName::MESSAGE_PRIVATE, "hi");
        let got = ctx.wait_for_next_event(Duration::from_secs(5), Vec::new()).await;
        assert!(got.is_none());
    }
}
