use thiserror::Error;

/// Decode failure for a persisted or transmitted [`FeedEvent`](crate::FeedEvent).
#[derive(Debug, Error)]
pub enum MalformedEncoding {
    /// The text form is not valid JSON.
    #[error("feed event is not valid JSON: {0}")]
    Syntax(#[from] serde_json::Error),

    /// The JSON value is not an object.
    #[error("feed event must be encoded as an object")]
    NotAnObject,

    #[error("feed event is missing key `{key}`")]
    MissingKey { key: &'static str },

    #[error("feed event key `{key}` must be {expected}")]
    WrongType {
        key: &'static str,
        expected: &'static str,
    },

    #[error("feed event key `{key}` must not be empty")]
    EmptyField { key: &'static str },

    /// The object carries a key outside the four known ones.
    #[error("feed event has unexpected key `{key}`")]
    UnexpectedKey { key: String },
}

pub type Result<T> = std::result::Result<T, MalformedEncoding>;
