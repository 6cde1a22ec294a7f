use std::sync::Mutex;

use {
    freshet_channels::{FeedListener, Result},
    freshet_common::FeedEvent,
};

/// Keeps every delivered event in memory, in arrival order.
#[derive(Debug, Default)]
pub struct InMemorySink {
    events: Mutex<Vec<FeedEvent>>,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the events received so far.
    pub fn events(&self) -> Vec<FeedEvent> {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FeedListener for InMemorySink {
    fn on_event(&self, event: &FeedEvent) -> Result<()> {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event.clone());
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
