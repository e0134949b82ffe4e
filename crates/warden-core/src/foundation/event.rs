//! Event system for the Warden framework.
//!
//! This module provides the core event infrastructure:
//!
//! - [`Event`] - Base trait for all events
//! - [`EventType`] - Event type classification (message, notice, request, meta)
//! - [`BoxedEvent`] - Type-erased, cheaply cloneable event container
//!
//! An event is created once per occurrence, never mutated, and dropped after
//! the dispatch pass over it has finished. Everything the filter pipeline
//! needs (identity fields, plain text, mention segments) is exposed through
//! object-safe accessors so that filters never have to know the concrete
//! platform type.

use std::any::Any;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::message::RichTextSegment;

// ============================================================================
// Event Type Classification
// ============================================================================

/// Classification of event types.
///
/// This enum represents the high-level category of an event, which is useful
/// for filtering events without knowing the specific event type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// Message events (private messages, group messages, etc.)
    Message,
    /// Notice events (group changes, recalls, friend adds, etc.)
    Notice,
    /// Request events (friend requests, group join requests, etc.)
    Request,
    /// Meta events (lifecycle, heartbeat, etc.)
    Meta,
    /// Other/unknown event types
    Other,
}

impl FromStr for EventType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "message" => EventType::Message,
            "notice" => EventType::Notice,
            "request" => EventType::Request,
            "meta" | "meta_event" => EventType::Meta,
            _ => EventType::Other,
        })
    }
}

// ============================================================================
// Core Event Trait
// ============================================================================

/// The base trait for all events in the Warden framework.
///
/// Events are type-erased using `dyn Event` and can be downcast to concrete
/// types using `as_any()`.
///
/// Identity accessors return `None` when the event does not carry that
/// dimension (a private message has no group, a heartbeat has no author).
///
/// # Example
///
/// ```rust,ignore
/// struct GroupMessage {
///     bot: String,
///     group: String,
///     sender: String,
///     text: String,
/// }
///
/// impl Event for GroupMessage {
///     fn event_name(&self) -> &'static str { "group_message" }
///     fn event_type(&self) -> EventType { EventType::Message }
///     fn as_any(&self) -> &dyn Any { self }
///     fn bot_id(&self) -> Option<&str> { Some(&self.bot) }
///     fn author_id(&self) -> Option<&str> { Some(&self.sender) }
///     fn group_id(&self) -> Option<&str> { Some(&self.group) }
///     fn plain_text(&self) -> Option<String> { Some(self.text.clone()) }
/// }
/// ```
pub trait Event: Any + Send + Sync {
    /// Returns the human-readable name of this event type.
    fn event_name(&self) -> &'static str;

    /// Returns the high-level event type classification.
    fn event_type(&self) -> EventType {
        EventType::Other
    }

    /// Returns a reference to self as `Any` for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Returns the component (platform) identifier, e.g. `"onebot.v11"`.
    fn component(&self) -> Option<&str> {
        None
    }

    /// Returns the ID of the bot that received this event.
    fn bot_id(&self) -> Option<&str> {
        None
    }

    /// Returns the ID of the user that caused this event.
    fn author_id(&self) -> Option<&str> {
        None
    }

    /// Returns the group ID for group-scoped events.
    fn group_id(&self) -> Option<&str> {
        None
    }

    /// Returns the channel ID for channel-scoped events.
    fn channel_id(&self) -> Option<&str> {
        None
    }

    /// Returns the guild ID for guild-scoped events.
    fn guild_id(&self) -> Option<&str> {
        None
    }

    /// Returns the plain-text content of this event.
    ///
    /// Non-message events return `None`. The default implementation
    /// concatenates the text segments of [`segments`](Self::segments) and
    /// returns `None` if there are no segments at all.
    fn plain_text(&self) -> Option<String> {
        let segments = self.segments();
        if segments.is_empty() {
            return None;
        }
        Some(RichTextSegment::extract_plain_text(&segments))
    }

    /// Returns the structured segments of this event's message.
    ///
    /// Used to scan for mentions. Non-message events return an empty vector.
    fn segments(&self) -> Vec<RichTextSegment> {
        Vec::new()
    }

    /// Returns `true` if any segment mentions the receiving bot.
    fn mentions_bot(&self) -> bool {
        let Some(bot_id) = self.bot_id() else {
            return false;
        };
        self.segments()
            .iter()
            .any(|seg| seg.mentioned_id() == Some(bot_id))
    }
}

// ============================================================================
// Boxed Event
// ============================================================================

/// A type-erased container for events that supports runtime downcasting.
///
/// `BoxedEvent` wraps any type implementing [`Event`] in an `Arc`, allowing
/// it to be passed through the dispatcher without knowing its concrete type.
/// It implements `Deref<Target = dyn Event>`, so trait methods can be called
/// directly:
///
/// ```rust,ignore
/// let event: BoxedEvent = /* ... */;
/// let name = event.event_name();
/// let text = event.plain_text();
/// ```
#[derive(Clone)]
pub struct BoxedEvent {
    inner: Arc<dyn Event>,
}

impl BoxedEvent {
    /// Creates a new `BoxedEvent` from any type implementing `Event`.
    pub fn new<E: Event + 'static>(event: E) -> Self {
        Self {
            inner: Arc::new(event),
        }
    }

    /// Returns the inner `Arc<dyn Event>`.
    pub fn inner(&self) -> &Arc<dyn Event> {
        &self.inner
    }

    /// Attempts to downcast to a concrete event type.
    pub fn downcast_ref<E: Event + 'static>(&self) -> Option<&E> {
        self.inner.as_any().downcast_ref()
    }

    /// Returns `true` if the wrapped event is of type `E`.
    pub fn is<E: Event + 'static>(&self) -> bool {
        self.inner.as_any().is::<E>()
    }
}

impl From<Arc<dyn Event>> for BoxedEvent {
    fn from(inner: Arc<dyn Event>) -> Self {
        Self { inner }
    }
}

impl std::ops::Deref for BoxedEvent {
    type Target = dyn Event;

    fn deref(&self) -> &Self::Target {
        self.inner.as_ref()
    }
}

impl std::fmt::Debug for BoxedEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoxedEvent")
            .field("event_name", &self.event_name())
            .field("event_type", &self.event_type())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Heartbeat;

    impl Event for Heartbeat {
        fn event_name(&self) -> &'static str {
            "heartbeat"
        }

        fn event_type(&self) -> EventType {
            EventType::Meta
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    struct Chat {
        segments: Vec<RichTextSegment>,
    }

    impl Event for Chat {
        fn event_name(&self) -> &'static str {
            "chat"
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn bot_id(&self) -> Option<&str> {
            Some("bot-1")
        }

        fn segments(&self) -> Vec<RichTextSegment> {
            self.segments.clone()
        }
    }

    #[test]
    fn test_non_message_event_has_no_text() {
        let event = BoxedEvent::new(Heartbeat);
        assert_eq!(event.plain_text(), None);
        assert!(!event.mentions_bot());
        assert!(event.is::<Heartbeat>());
    }

    #[test]
    fn test_plain_text_joins_text_segments() {
        let event = Chat {
            segments: vec![
                RichTextSegment::text("hello "),
                RichTextSegment::At("someone".into()),
                RichTextSegment::text("world"),
            ],
        };
        assert_eq!(event.plain_text().as_deref(), Some("hello world"));
        assert!(!event.mentions_bot());
    }

    #[test]
    fn test_mentions_bot() {
        let event = Chat {
            segments: vec![RichTextSegment::At("bot-1".into())],
        };
        assert!(event.mentions_bot());
    }

    #[test]
    fn test_event_type_from_str() {
        assert_eq!("Message".parse(), Ok(EventType::Message));
        assert_eq!("meta_event".parse(), Ok(EventType::Meta));
        assert_eq!("unknown".parse(), Ok(EventType::Other));
    }
}
