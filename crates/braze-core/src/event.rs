//! Event names and the event capability surface.
//!
//! Inbound events are produced by an adapter collaborator outside this crate.
//! The engine only consumes the small surface defined here: a dotted
//! hierarchical [`EventName`] used for routing, and the [`Event`] trait that
//! exposes the handful of attributes middlewares and handlers rely on.
//!
//! # Name hierarchy
//!
//! Event names form a hierarchy through their dotted segments:
//! `message.group.normal` is a specialization of `message.group`, which is a
//! specialization of `message`. Every name also belongs to the universal
//! `all` category. Handler matching walks these tiers most specific first.

use std::borrow::{Borrow, Cow};
use std::fmt;

// =============================================================================
// EventName
// =============================================================================

/// Dotted hierarchical identifier for an event's category.
///
/// Well-known categories are available as constants (`EventName::MESSAGE`,
/// `EventName::META_HEARTBEAT`, ...); adapter-specific subcategories can be
/// built with [`EventName::custom`] or the `From<String>` impl.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EventName(Cow<'static, str>);

impl EventName {
    /// The universal category every event belongs to.
    pub const ALL: EventName = EventName(Cow::Borrowed("all"));

    pub const MESSAGE: EventName = EventName(Cow::Borrowed("message"));
    pub const MESSAGE_PRIVATE: EventName = EventName(Cow::Borrowed("message.private"));
    pub const MESSAGE_GROUP: EventName = EventName(Cow::Borrowed("message.group"));

    pub const NOTICE: EventName = EventName(Cow::Borrowed("notice"));
    pub const NOTICE_NOTIFY: EventName = EventName(Cow::Borrowed("notice.notify"));
    pub const NOTICE_NOTIFY_POKE: EventName = EventName(Cow::Borrowed("notice.notify.poke"));

    pub const REQUEST: EventName = EventName(Cow::Borrowed("request"));
    pub const REQUEST_FRIEND: EventName = EventName(Cow::Borrowed("request.friend"));
    pub const REQUEST_GROUP: EventName = EventName(Cow::Borrowed("request.group"));

    pub const META: EventName = EventName(Cow::Borrowed("meta_event"));
    pub const META_LIFECYCLE: EventName = EventName(Cow::Borrowed("meta_event.lifecycle"));
    pub const META_HEARTBEAT: EventName = EventName(Cow::Borrowed("meta_event.heartbeat"));

    /// Creates a name outside the predefined catalog.
    pub fn custom(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    /// Returns the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Iterates this name and its successive generalizations, most specific
    /// first: `a.b.c`, `a.b`, `a`.
    ///
    /// The universal `all` tier is not included; callers that want it append
    /// it after the named tiers.
    pub fn tiers(&self) -> impl Iterator<Item = &str> {
        let mut next = Some(self.0.as_ref());
        std::iter::from_fn(move || {
            let current = next?;
            next = current.rfind('.').map(|dot| &current[..dot]);
            Some(current)
        })
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for EventName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EventName {
    fn from(name: &str) -> Self {
        Self(Cow::Owned(name.to_string()))
    }
}

impl From<String> for EventName {
    fn from(name: String) -> Self {
        Self(Cow::Owned(name))
    }
}

impl PartialEq<&str> for EventName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

// =============================================================================
// Event capability surface
// =============================================================================

/// Structural attributes an event family may carry.
///
/// This is the closed set of lookups the engine and its middlewares perform;
/// events answer with the value or `None` when the attribute does not apply
/// to their family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventField {
    GroupId,
    UserId,
    TargetId,
    OperatorId,
    MessageId,
}

/// The capability surface a decoded inbound event exposes to the engine.
///
/// Implemented by the fixed set of event variants an adapter produces. Only
/// [`Event::name`] is mandatory; the remaining methods default to "not a
/// message, no attributes" so non-message families stay terse.
pub trait Event: Send + Sync {
    /// The dotted category name used for handler matching.
    fn name(&self) -> EventName;

    /// Session identifier grouping related events (same user, same chat).
    ///
    /// Families without a session notion return an empty string.
    fn session_id(&self) -> String {
        String::new()
    }

    /// Whether this is a message-family event.
    fn is_message(&self) -> bool {
        false
    }

    /// The plain-text content, with any rich segments dropped.
    fn plain_text(&self) -> String {
        String::new()
    }

    /// Whether the message addresses the bot directly.
    fn is_to_me(&self) -> bool {
        false
    }

    /// Looks up a structural attribute of this event's family.
    fn field(&self, _field: EventField) -> Option<i64> {
        None
    }

    /// One-line human-readable summary used in logs.
    fn description(&self) -> String {
        self.name().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tiers_most_specific_first() {
        let name = EventName::custom("message.group.normal");
        let tiers: Vec<&str> = name.tiers().collect();
        assert_eq!(tiers, vec!["message.group.normal", "message.group", "message"]);
    }

    #[test]
    fn test_tiers_single_segment() {
        let tiers: Vec<&str> = EventName::MESSAGE.tiers().collect();
        assert_eq!(tiers, vec!["message"]);
    }

    #[test]
    fn test_constants_equal_custom() {
        assert_eq!(EventName::MESSAGE_GROUP, EventName::custom("message.group"));
        assert_eq!(EventName::ALL, "all");
    }

    #[test]
    fn test_borrowed_lookup() {
        use std::collections::HashMap;

        let mut map: HashMap<EventName, i32> = HashMap::new();
        map.insert(EventName::MESSAGE_GROUP, 1);
        assert_eq!(map.get("message.group"), Some(&1));
        assert_eq!(map.get("message"), None);
    }
}
