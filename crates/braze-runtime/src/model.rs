//! Decoded inbound event model.
//!
//! The fixed set of event variants an adapter hands to the engine. Each
//! variant implements [`Event`] with a dotted name that slots it into the
//! handler tree (`message.group.normal` is caught by handlers registered
//! under `message`, `message.group`, or the full name) and a session id that
//! groups events belonging to the same conversation: `"{user_id}"` for
//! private chats, `"{user_id}@{group_id}"` for group chats.

use braze_core::{Event, EventField, EventName};

/// A direct message from a single user.
#[derive(Debug, Clone)]
pub struct PrivateMessage {
    pub user_id: i64,
    pub message_id: i64,
    pub text: String,
    /// Message origin: `friend`, `group` (temporary session), or `other`.
    pub sub_type: String,
}

impl PrivateMessage {
    pub fn new(user_id: i64, message_id: i64, text: impl Into<String>) -> Self {
        Self {
            user_id,
            message_id,
            text: text.into(),
            sub_type: "friend".to_string(),
        }
    }
}

impl Event for PrivateMessage {
    fn name(&self) -> EventName {
        if self.sub_type.is_empty() {
            EventName::MESSAGE_PRIVATE
        } else {
            EventName::custom(format!("message.private.{}", self.sub_type))
        }
    }

    fn session_id(&self) -> String {
        self.user_id.to_string()
    }

    fn is_message(&self) -> bool {
        true
    }

    fn plain_text(&self) -> String {
        self.text.clone()
    }

    // A direct message always addresses the bot.
    fn is_to_me(&self) -> bool {
        true
    }

    fn field(&self, field: EventField) -> Option<i64> {
        match field {
            EventField::UserId => Some(self.user_id),
            EventField::MessageId => Some(self.message_id),
            _ => None,
        }
    }

    fn description(&self) -> String {
        format!("private message from {}: {:?}", self.user_id, self.text)
    }
}

/// A message sent in a group chat.
#[derive(Debug, Clone)]
pub struct GroupMessage {
    pub group_id: i64,
    pub user_id: i64,
    pub message_id: i64,
    pub text: String,
    /// Whether the message mentions the bot.
    pub to_me: bool,
    /// Message origin: `normal`, `anonymous`, or `notice`.
    pub sub_type: String,
}

impl GroupMessage {
    pub fn new(group_id: i64, user_id: i64, message_id: i64, text: impl Into<String>) -> Self {
        Self {
            group_id,
            user_id,
            message_id,
            text: text.into(),
            to_me: false,
            sub_type: "normal".to_string(),
        }
    }
}

impl Event for GroupMessage {
    fn name(&self) -> EventName {
        if self.sub_type.is_empty() {
            EventName::MESSAGE_GROUP
        } else {
            EventName::custom(format!("message.group.{}", self.sub_type))
        }
    }

    fn session_id(&self) -> String {
        format!("{}@{}", self.user_id, self.group_id)
    }

    fn is_message(&self) -> bool {
        true
    }

    fn plain_text(&self) -> String {
        self.text.clone()
    }

    fn is_to_me(&self) -> bool {
        self.to_me
    }

    fn field(&self, field: EventField) -> Option<i64> {
        match field {
            EventField::GroupId => Some(self.group_id),
            EventField::UserId => Some(self.user_id),
            EventField::MessageId => Some(self.message_id),
            _ => None,
        }
    }

    fn description(&self) -> String {
        format!(
            "group {} message from {}: {:?}",
            self.group_id, self.user_id, self.text
        )
    }
}

/// A friend request awaiting approval.
#[derive(Debug, Clone)]
pub struct FriendRequest {
    pub user_id: i64,
    /// Opaque token an adapter needs to answer the request.
    pub flag: String,
    /// Self-introduction attached to the request.
    pub comment: String,
}

impl Event for FriendRequest {
    fn name(&self) -> EventName {
        EventName::REQUEST_FRIEND
    }

    fn session_id(&self) -> String {
        self.user_id.to_string()
    }

    fn field(&self, field: EventField) -> Option<i64> {
        match field {
            EventField::UserId => Some(self.user_id),
            _ => None,
        }
    }

    fn description(&self) -> String {
        format!("friend request from {} ({:?})", self.user_id, self.comment)
    }
}

/// A poke directed at someone in a group chat.
#[derive(Debug, Clone)]
pub struct GroupPoke {
    pub group_id: i64,
    pub user_id: i64,
    pub target_id: i64,
}

impl Event for GroupPoke {
    fn name(&self) -> EventName {
        EventName::NOTICE_NOTIFY_POKE
    }

    fn session_id(&self) -> String {
        format!("{}@{}", self.user_id, self.group_id)
    }

    fn field(&self, field: EventField) -> Option<i64> {
        match field {
            EventField::GroupId => Some(self.group_id),
            EventField::UserId => Some(self.user_id),
            EventField::TargetId => Some(self.target_id),
            _ => None,
        }
    }

    fn description(&self) -> String {
        format!(
            "poke in group {}: {} -> {}",
            self.group_id, self.user_id, self.target_id
        )
    }
}

/// Periodic liveness signal from the adapter's connection.
#[derive(Debug, Clone)]
pub struct Heartbeat {
    /// Interval between heartbeats in milliseconds.
    pub interval: u64,
}

impl Event for Heartbeat {
    fn name(&self) -> EventName {
        EventName::META_HEARTBEAT
    }

    fn description(&self) -> String {
        format!("heartbeat ({}ms)", self.interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_message_routing_name() {
        let event = GroupMessage::new(300, 9, 1, "hi");
        let name = event.name();
        assert_eq!(name, EventName::custom("message.group.normal"));

        let tiers: Vec<&str> = name.tiers().collect();
        assert_eq!(tiers, vec!["message.group.normal", "message.group", "message"]);
    }

    #[test]
    fn test_session_ids() {
        assert_eq!(PrivateMessage::new(7, 1, "x").session_id(), "7");
        assert_eq!(GroupMessage::new(300, 9, 1, "x").session_id(), "9@300");
        assert_eq!(
            GroupPoke {
                group_id: 300,
                user_id: 9,
                target_id: 10_000
            }
            .session_id(),
            "9@300"
        );
        assert_eq!(Heartbeat { interval: 5000 }.session_id(), "");
    }

    #[test]
    fn test_field_lookups() {
        let event = GroupMessage::new(300, 9, 42, "x");
        assert_eq!(event.field(EventField::GroupId), Some(300));
        assert_eq!(event.field(EventField::UserId), Some(9));
        assert_eq!(event.field(EventField::MessageId), Some(42));
        assert_eq!(event.field(EventField::TargetId), None);

        let poke = GroupPoke {
            group_id: 300,
            user_id: 9,
            target_id: 10_000,
        };
        assert_eq!(poke.field(EventField::TargetId), Some(10_000));
    }

    #[test]
    fn test_message_family_flags() {
        assert!(PrivateMessage::new(7, 1, "x").is_message());
        assert!(PrivateMessage::new(7, 1, "x").is_to_me());
        assert!(!GroupMessage::new(300, 9, 1, "x").is_to_me());
        assert!(!Heartbeat { interval: 5000 }.is_message());

        let request = FriendRequest {
            user_id: 7,
            flag: "abc".to_string(),
            comment: "hi".to_string(),
        };
        assert!(!request.is_message());
        assert_eq!(request.plain_text(), "");
    }

    #[test]
    fn test_empty_sub_type_falls_back_to_family_name() {
        let mut event = PrivateMessage::new(7, 1, "x");
        event.sub_type = String::new();
        assert_eq!(event.name(), EventName::MESSAGE_PRIVATE);
    }
}
