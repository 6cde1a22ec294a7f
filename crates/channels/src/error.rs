use std::error::Error as StdError;

/// Crate-wide result type for subscription operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Typed subscription errors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Channel name is empty or contains characters the transport rejects.
    #[error("invalid channel name: {channel:?}")]
    InvalidChannel { channel: String },

    /// `unlisten` on a channel nobody listens to.
    #[error("no listeners are subscribed to {channel}")]
    NotSubscribed { channel: String },

    /// `unlisten` with a listener that is not subscribed to the channel.
    #[error("listener is not subscribed to {channel}")]
    ListenerNotFound { channel: String },

    /// The same listener handle was registered twice for one channel.
    #[error("listener is already subscribed to {channel}")]
    AlreadySubscribed { channel: String },

    /// The registry was closed and accepts no new subscriptions.
    #[error("subscription registry is closed")]
    Closed,

    /// Wrapped source error raised by a listener.
    #[error("listener failed: {context}: {source}")]
    External {
        context: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
}

impl Error {
    #[must_use]
    pub fn invalid_channel(channel: impl Into<String>) -> Self {
        Self::InvalidChannel {
            channel: channel.into(),
        }
    }

    #[must_use]
    pub fn not_subscribed(channel: impl Into<String>) -> Self {
        Self::NotSubscribed {
            channel: channel.into(),
        }
    }

    #[must_use]
    pub fn listener_not_found(channel: impl Into<String>) -> Self {
        Self::ListenerNotFound {
            channel: channel.into(),
        }
    }

    #[must_use]
    pub fn already_subscribed(channel: impl Into<String>) -> Self {
        Self::AlreadySubscribed {
            channel: channel.into(),
        }
    }

    #[must_use]
    pub fn external(
        context: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::External {
            context: context.into(),
            source: Box::new(source),
        }
    }
}
