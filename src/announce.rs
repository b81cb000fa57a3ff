//! Accessibility announcer capability.
//!
//! The engine emits plain-text narrative messages, one per step transition
//! and per safety-relevant event, to an injected sink. Delivery (live
//! regions, focus, timing) is the host's concern; the core never touches a
//! UI runtime.

use serde::{Deserialize, Serialize};

/// Delivery priority for an announcement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Routine narration; may queue behind other output.
    Polite,
    /// Safety-relevant; should interrupt.
    Assertive,
}

/// Injected announcement sink.
///
/// A capability passed to the executor at construction, not a process-wide
/// singleton.
pub trait Announcer {
    /// Deliver one plain-text message.
    fn announce(&mut self, text: &str, priority: Priority);
}

/// Discards all announcements. Useful for headless tests and hosts without
/// an accessibility layer.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullAnnouncer;

impl Announcer for NullAnnouncer {
    fn announce(&mut self, _text: &str, _priority: Priority) {}
}

/// Collects announcements for inspection.
#[derive(Debug, Clone, Default)]
pub struct BufferAnnouncer {
    /// Messages in delivery order.
    pub messages: Vec<(String, Priority)>,
}

impl BufferAnnouncer {
    /// Create an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Texts only, in delivery order.
    #[must_use]
    pub fn texts(&self) -> Vec<&str> {
        self.messages.iter().map(|(t, _)| t.as_str()).collect()
    }
}

impl Announcer for BufferAnnouncer {
    fn announce(&mut self, text: &str, priority: Priority) {
        self.messages.push((text.to_string(), priority));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_announcer_discards() {
        let mut sink = NullAnnouncer;
        sink.announce("ignored", Priority::Assertive);
    }

    #[test]
    fn test_buffer_announcer_collects_in_order() {
        let mut sink = BufferAnnouncer::new();
        sink.announce("first", Priority::Polite);
        sink.announce("second", Priority::Assertive);

        assert_eq!(sink.texts(), vec!["first", "second"]);
        assert_eq!(sink.messages[1].1, Priority::Assertive);
    }
}
