use std::sync::{
    mpsc::{self, Receiver, Sender},
    Mutex,
};

use crate::DepotEvent;

/// Consumer of [`DepotEvent`]s.
///
/// The CLI, tests and embedding services each bring their own.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: DepotEvent);
}

/// Forwards events over a standard mpsc channel.
///
/// A dropped receiver is ignored.
pub struct ChannelSink {
    sender: Sender<DepotEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, Receiver<DepotEvent>) {
        let (sender, receiver) = mpsc::channel();
        (
            Self {
                sender,
            },
            receiver,
        )
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: DepotEvent) {
        let _ = self.sender.send(event);
    }
}

/// Discards everything.
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: DepotEvent) {}
}

/// Keeps every event in memory for later inspection.
#[derive(Default)]
pub struct CollectorSink {
    events: Mutex<Vec<DepotEvent>>,
}

impl CollectorSink {
    pub fn events(&self) -> Vec<DepotEvent> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // A panicking emitter must not hide the events collected so far.
    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<DepotEvent>> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl EventSink for CollectorSink {
    fn emit(&self, event: DepotEvent) {
        self.lock().push(event);
    }
}
