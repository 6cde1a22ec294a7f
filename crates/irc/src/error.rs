use std::time::Duration;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to connect to {address}")]
    Connect {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("timed out after {timeout:?} connecting to {address}")]
    ConnectTimeout { address: String, timeout: Duration },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("connection task panicked or was aborted")]
    Task(#[from] tokio::task::JoinError),
}
