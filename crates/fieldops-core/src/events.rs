use std::sync::mpsc::{channel, Receiver, Sender};

/// A user-visible, dismissible notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub message: String,
}

impl Notice {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// State-change events consumed by the UI layer to drive re-renders.
///
/// Every component exposes synchronous reads for its current state; these
/// events only say *that* something changed, not *what* it changed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreEvent {
    /// A list's visible items or cursor changed
    ListChanged { list: String },
    /// An entity's local state changed (optimistic apply, reconcile, or
    /// rollback)
    EntityChanged { target: String },
    /// A new search result set is ready
    SearchChanged { query: String },
    /// The comment thread for an entity changed
    ThreadChanged { entity_id: String },
    /// Something failed in a way the user should see
    Notice(Notice),
}

/// Sending half of the UI event channel.
///
/// A dropped receiver is not an error; the UI may have navigated away
/// while an operation was still in flight.
#[derive(Clone)]
pub struct EventSink {
    tx: Option<Sender<CoreEvent>>,
}

impl EventSink {
    pub fn new(tx: Sender<CoreEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    /// A sink with no listener; emitted events are dropped.
    pub fn disconnected() -> Self {
        Self { tx: None }
    }

    pub fn channel() -> (Self, Receiver<CoreEvent>) {
        let (tx, rx) = channel();
        (Self::new(tx), rx)
    }

    pub fn emit(&self, event: CoreEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_delivers_events_in_order() {
        let (sink, rx) = EventSink::channel();
        sink.emit(CoreEvent::ListChanged {
            list: "leads".to_string(),
        });
        sink.emit(CoreEvent::Notice(Notice::error("boom")));

        assert_eq!(
            rx.recv().unwrap(),
            CoreEvent::ListChanged {
                list: "leads".to_string()
            }
        );
        assert_eq!(rx.recv().unwrap(), CoreEvent::Notice(Notice::error("boom")));
    }

    #[test]
    fn test_emit_survives_dropped_receiver() {
        let (sink, rx) = EventSink::channel();
        drop(rx);
        sink.emit(CoreEvent::SearchChanged {
            query: "al".to_string(),
        });
    }

    #[test]
    fn test_disconnected_sink_drops_events() {
        let sink = EventSink::disconnected();
        sink.emit(CoreEvent::ThreadChanged {
            entity_id: "lead-1".to_string(),
        });
    }
}
