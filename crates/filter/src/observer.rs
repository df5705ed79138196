//! Progress and completion notifications for running searches.
//!
//! The engine reports through an observer interface; [`EventSender`] adapts
//! it onto a plain mpsc channel for callers that prefer to poll events on
//! their own thread.

use std::sync::mpsc;

/// Events emitted by a running search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchEvent {
    /// Percentage of the collection scanned by the current chain node.
    /// Coarse-grained; the terminal 100 is emitted on every run exit,
    /// cancelled or not.
    Progress(u8),
    /// Emitted exactly once, only when a run completes without cancellation.
    /// Its absence is how callers recognize an aborted run.
    Finished,
}

/// Sink for search events.
///
/// Callbacks run on the scan thread: they must return promptly and must not
/// call back into the engine's blocking operations (`cancel`, `wait`, bulk
/// mutations), which would join the very thread the callback runs on.
pub trait SearchObserver: Send + Sync {
    fn on_progress(&self, percent: u8);
    fn on_finished(&self);
}

/// Forwards events into an mpsc channel.
///
/// Send errors are ignored: a receiver that went away just means nobody is
/// watching anymore.
pub struct EventSender {
    sender: mpsc::Sender<SearchEvent>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<SearchEvent>) -> Self {
        Self { sender }
    }
}

impl SearchObserver for EventSender {
    fn on_progress(&self, percent: u8) {
        let _ = self.sender.send(SearchEvent::Progress(percent));
    }

    fn on_finished(&self) {
        let _ = self.sender.send(SearchEvent::Finished);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_sender_forwards_in_order() {
        let (tx, rx) = mpsc::channel();
        let sender = EventSender::new(tx);

        sender.on_progress(40);
        sender.on_progress(100);
        sender.on_finished();

        assert_eq!(rx.recv().unwrap(), SearchEvent::Progress(40));
        assert_eq!(rx.recv().unwrap(), SearchEvent::Progress(100));
        assert_eq!(rx.recv().unwrap(), SearchEvent::Finished);
    }

    #[test]
    fn test_event_sender_survives_dropped_receiver() {
        let (tx, rx) = mpsc::channel();
        let sender = EventSender::new(tx);
        drop(rx);
        sender.on_progress(10);
        sender.on_finished();
    }
}
