use std::sync::Arc;

use freshet_common::FeedEvent;

use crate::Result;

/// Anything that wants to receive feed events.
///
/// Calls arrive synchronously from the dispatching thread, outside the
/// registry lock. An error is logged by the registry and does not stop
/// delivery to the other listeners.
pub trait FeedListener: Send + Sync {
    fn on_event(&self, event: &FeedEvent) -> Result<()>;

    /// Label used in log lines.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Shared listener handle. Identity is the allocation, not the value.
pub type ListenerHandle = Arc<dyn FeedListener>;

impl<F> FeedListener for F
where
    F: Fn(&FeedEvent) -> Result<()> + Send + Sync,
{
    fn on_event(&self, event: &FeedEvent) -> Result<()> {
        self(event)
    }
}
