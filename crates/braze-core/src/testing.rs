//! Shared fixtures for the crate's tests.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};

use crate::bot::Bot;
use crate::config::BotConfig;
use crate::context::Context;
use crate::error::ApiResult;
use crate::event::{Event, EventField, EventName};

pub(crate) struct TestEvent {
    pub name: EventName,
    pub text: String,
    pub user_id: i64,
    pub group_id: Option<i64>,
    pub message_id: Option<i64>,
    pub to_me: bool,
}

impl TestEvent {
    pub fn message(name: EventName, text: &str) -> Self {
        Self {
            name,
            text: text.to_string(),
            user_id: 7,
            group_id: None,
            message_id: None,
            to_me: false,
        }
    }

    pub fn private_message(user_id: i64, text: &str) -> Self {
        Self {
            name: EventName::MESSAGE_PRIVATE,
            text: text.to_string(),
            user_id,
            group_id: None,
            message_id: Some(99),
            to_me: true,
        }
    }

    pub fn group_message(group_id: i64, user_id: i64, text: &str) -> Self {
        Self {
            name: EventName::MESSAGE_GROUP,
            text: text.to_string(),
            user_id,
            group_id: Some(group_id),
            message_id: Some(99),
            to_me: false,
        }
    }
}

impl Event for TestEvent {
    fn name(&self) -> EventName {
        self.name.clone()
    }

    fn session_id(&self) -> String {
        match self.group_id {
            Some(group_id) => format!("{}@{group_id}", self.user_id),
            None => self.user_id.to_string(),
        }
    }

    fn is_message(&self) -> bool {
        self.name.as_str().starts_with("message")
    }

    fn plain_text(&self) -> String {
        self.text.clone()
    }

    fn is_to_me(&self) -> bool {
        self.to_me
    }

    fn field(&self, field: EventField) -> Option<i64> {
        match field {
            EventField::UserId => Some(self.user_id),
            EventField::GroupId => self.group_id,
            EventField::MessageId => self.message_id,
            _ => None,
        }
    }
}

/// Records every API call and answers with a canned success.
#[derive(Default)]
pub(crate) struct EchoBot {
    pub calls: Mutex<Vec<(String, Value)>>,
}

#[async_trait]
impl Bot for EchoBot {
    fn self_id(&self) -> i64 {
        10_000
    }

    async fn call_api(&self, action: &str, params: Value) -> ApiResult<Value> {
        self.calls.lock().push((action.to_string(), params));
        Ok(json!({ "message_id": 1 }))
    }
}

pub(crate) fn test_context(name: EventName, text: &str) -> Arc<Context> {
    Context::new(
        Some(Arc::new(EchoBot::default())),
        Arc::new(TestEvent::message(name, text)),
        Arc::new(BotConfig::default()),
    )
}
