//! FIFO of pending events

use std::collections::VecDeque;

use super::Event;

/// Events waiting to be handled, oldest first
///
/// The platform layer pushes, application code drains once per frame.
/// Draining never blocks: an empty queue yields `None` immediately.
#[derive(Debug, Default)]
pub struct EventQueue {
    events: VecDeque<Event>,
}

impl EventQueue {
    /// Empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event
    pub fn push(&mut self, event: Event) {
        self.events.push_back(event);
    }

    /// Take the oldest event
    pub fn poll_event(&mut self) -> Option<Event> {
        self.events.pop_front()
    }

    /// Number of pending events
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether no event is pending
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Drop every pending event
    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl Extend<Event> for EventQueue {
    fn extend<I: IntoIterator<Item = Event>>(&mut self, iter: I) {
        self.events.extend(iter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_come_out_in_arrival_order() {
        let mut queue = EventQueue::new();
        queue.push(Event::FocusGained);
        queue.push(Event::TextEntered('x'));
        queue.push(Event::Closed);
        assert_eq!(queue.len(), 3);

        assert_eq!(queue.poll_event(), Some(Event::FocusGained));
        assert_eq!(queue.poll_event(), Some(Event::TextEntered('x')));
        assert_eq!(queue.poll_event(), Some(Event::Closed));
        assert_eq!(queue.poll_event(), None);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_clear_drops_pending_events() {
        let mut queue = EventQueue::new();
        queue.extend([Event::MouseEntered, Event::MouseLeft]);
        queue.clear();
        assert_eq!(queue.poll_event(), None);
    }
}
