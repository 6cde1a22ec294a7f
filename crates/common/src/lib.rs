//! Shared types used across all freshet crates.
//!
//! The central type is [`FeedEvent`], the immutable envelope of one inbound
//! chat line, together with its lossless key-value and JSON encodings.

pub mod error;
pub mod event;

pub use {
    error::{MalformedEncoding, Result},
    event::{CHANNEL_KEY, FeedEvent, RAW_KEY, SOURCE_KEY, TIME_KEY, now_millis},
};
