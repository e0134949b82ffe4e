#![allow(dead_code)]

use std::any::Any;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use warden_core::{BoxedEvent, Event, EventType, ListenerResult, RichTextSegment};

/// A chat message event for tests.
#[derive(Debug, Clone, Default)]
pub struct TestMessage {
    pub text: Option<String>,
    pub group: Option<String>,
    pub author: Option<String>,
    pub mention_bot: bool,
}

impl TestMessage {
    pub fn text(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            ..Default::default()
        }
    }

    pub fn in_group(mut self, group: &str) -> Self {
        self.group = Some(group.to_string());
        self
    }

    pub fn from(mut self, author: &str) -> Self {
        self.author = Some(author.to_string());
        self
    }

    pub fn boxed(self) -> BoxedEvent {
        BoxedEvent::new(self)
    }
}

impl Event for TestMessage {
    fn event_name(&self) -> &'static str {
        "test_message"
    }

    fn event_type(&self) -> EventType {
        EventType::Message
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn bot_id(&self) -> Option<&str> {
        Some("warden")
    }

    fn author_id(&self) -> Option<&str> {
        self.author.as_deref()
    }

    fn group_id(&self) -> Option<&str> {
        self.group.as_deref()
    }

    fn segments(&self) -> Vec<RichTextSegment> {
        let mut segments = Vec::new();
        if self.mention_bot {
            segments.push(RichTextSegment::at("warden"));
        }
        if let Some(text) = &self.text {
            segments.push(RichTextSegment::text(text.clone()));
        }
        segments
    }
}

/// A non-message event without text.
#[derive(Debug, Clone, Default)]
pub struct MemberJoined {
    pub group: String,
}

impl Event for MemberJoined {
    fn event_name(&self) -> &'static str {
        "member_joined"
    }

    fn event_type(&self) -> EventType {
        EventType::Notice
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn group_id(&self) -> Option<&str> {
        Some(&self.group)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Counter(Arc<AtomicUsize>);

impl Counter {
    pub fn hit(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

pub fn ids(results: &[ListenerResult]) -> Vec<&str> {
    results.iter().map(ListenerResult::listener_id).collect()
}
