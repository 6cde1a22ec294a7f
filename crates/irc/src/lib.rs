//! IRC transport for the edit feed.
//!
//! [`IrcClient`] registers with the server, answers keep-alive pings and
//! hands every channel `PRIVMSG` to a [`SubscriptionRegistry`], with mIRC
//! formatting removed. JOIN and PART requests issued by the registry travel
//! through [`IrcCommands`] and are written once registration completes.
//!
//! [`SubscriptionRegistry`]: freshet_channels::SubscriptionRegistry

pub mod client;
pub mod error;
pub mod message;

pub use {
    client::{IrcClient, IrcCommands, IrcConnection, random_nick},
    error::{Error, Result},
    message::{IrcMessage, Outbound, strip_formatting},
};
