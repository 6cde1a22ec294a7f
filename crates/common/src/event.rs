use std::{
    fmt,
    time::{SystemTime, UNIX_EPOCH},
};

use serde_json::{Map, Value};

use crate::error::{MalformedEncoding, Result};

pub const TIME_KEY: &str = "time";
pub const CHANNEL_KEY: &str = "channel";
pub const SOURCE_KEY: &str = "source";
pub const RAW_KEY: &str = "raw";

const KNOWN_KEYS: [&str; 4] = [TIME_KEY, CHANNEL_KEY, SOURCE_KEY, RAW_KEY];

/// One inbound channel message, exactly as it was received.
///
/// Equality and hashing are structural over all four fields. The fields are
/// private so an event cannot change after construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FeedEvent {
    time: i64,
    channel: String,
    source: String,
    raw_text: String,
}

impl FeedEvent {
    /// `channel` and `source` must be non-empty, otherwise
    /// [`FeedEvent::from_text`] rejects the encoded event. Checked in debug
    /// builds.
    pub fn new(
        time: i64,
        channel: impl Into<String>,
        source: impl Into<String>,
        raw_text: impl Into<String>,
    ) -> Self {
        let event = Self {
            time,
            channel: channel.into(),
            source: source.into(),
            raw_text: raw_text.into(),
        };
        debug_assert!(
            !event.channel.is_empty() && !event.source.is_empty(),
            "feed event needs a channel and a source"
        );
        event
    }

    /// Build an event stamped with the current wall-clock time.
    pub fn now(
        channel: impl Into<String>,
        source: impl Into<String>,
        raw_text: impl Into<String>,
    ) -> Self {
        Self::new(now_millis(), channel, source, raw_text)
    }

    /// Receipt time in milliseconds since the Unix epoch.
    pub fn time(&self) -> i64 {
        self.time
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Nickname of the message originator.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    /// Map the event onto a generic key-value record with the keys
    /// `time`, `channel`, `source` and `raw`.
    pub fn to_record(&self) -> Map<String, Value> {
        let mut record = Map::with_capacity(KNOWN_KEYS.len());
        record.insert(TIME_KEY.into(), Value::from(self.time));
        record.insert(CHANNEL_KEY.into(), Value::from(self.channel.as_str()));
        record.insert(SOURCE_KEY.into(), Value::from(self.source.as_str()));
        record.insert(RAW_KEY.into(), Value::from(self.raw_text.as_str()));
        record
    }

    /// Inverse of [`FeedEvent::to_record`].
    ///
    /// All four keys are required, no other key is accepted, `channel` and
    /// `source` must be non-empty and `time` must be an integer.
    pub fn from_record(record: &Map<String, Value>) -> Result<Self> {
        if let Some(key) = record
            .keys()
            .find(|key| !KNOWN_KEYS.contains(&key.as_str()))
        {
            return Err(MalformedEncoding::UnexpectedKey { key: key.clone() });
        }

        let time = required(record, TIME_KEY)?
            .as_i64()
            .ok_or(MalformedEncoding::WrongType {
                key: TIME_KEY,
                expected: "an integer",
            })?;
        let channel = required_str(record, CHANNEL_KEY)?;
        let source = required_str(record, SOURCE_KEY)?;
        let raw_text = required_str(record, RAW_KEY)?;

        for (key, value) in [(CHANNEL_KEY, channel), (SOURCE_KEY, source)] {
            if value.is_empty() {
                return Err(MalformedEncoding::EmptyField { key });
            }
        }

        Ok(Self::new(time, channel, source, raw_text))
    }

    /// Encode the event as a single-line JSON object.
    pub fn to_text(&self) -> String {
        Value::Object(self.to_record()).to_string()
    }

    /// Decode an event produced by [`FeedEvent::to_text`].
    pub fn from_text(text: &str) -> Result<Self> {
        match serde_json::from_str::<Value>(text)? {
            Value::Object(record) => Self::from_record(&record),
            _ => Err(MalformedEncoding::NotAnObject),
        }
    }
}

impl fmt::Display for FeedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} <{}> {}",
            self.time, self.channel, self.source, self.raw_text
        )
    }
}

/// Milliseconds since the Unix epoch, saturating at zero for clocks set
/// before 1970.
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

fn required<'a>(record: &'a Map<String, Value>, key: &'static str) -> Result<&'a Value> {
    record
        .get(key)
        .ok_or(MalformedEncoding::MissingKey { key })
}

fn required_str<'a>(record: &'a Map<String, Value>, key: &'static str) -> Result<&'a str> {
    required(record, key)?
        .as_str()
        .ok_or(MalformedEncoding::WrongType {
            key,
            expected: "a string",
        })
}
