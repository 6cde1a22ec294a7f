//! Channel subscriptions.
//!
//! The [`SubscriptionRegistry`] maps channel names to the listeners interested
//! in them, asks the transport to join or leave a channel when the first
//! listener arrives or the last one goes, and fans every inbound message out
//! to the listeners of its channel.

pub mod error;
pub mod listener;
pub mod registry;
pub mod transport;

pub use {
    error::{Error, Result},
    listener::{FeedListener, ListenerHandle},
    registry::SubscriptionRegistry,
    transport::ChannelCommands,
};
