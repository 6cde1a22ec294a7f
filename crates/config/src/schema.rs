//! Config schema: IRC server, subscribed channels, output files and run
//! length.

use std::{fmt, path::PathBuf, str::FromStr, time::Duration};

use {
    secrecy::Secret,
    serde::{Deserialize, Serialize},
};

pub const DEFAULT_HOST: &str = "irc.wikimedia.org";
pub const DEFAULT_PORT: u16 = 6667;
pub const DEFAULT_CHANNEL: &str = "#en.wikipedia";
pub const DEFAULT_PREFIX: &str = "wikipedia-activities";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FreshetConfig {
    pub irc: IrcServerConfig,
    pub feed: FeedConfig,
    pub output: OutputConfig,
    pub run: RunConfig,
}

/// Connection settings for the IRC feed server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IrcServerConfig {
    pub host: String,
    pub port: u16,
    /// Nickname to register with. A random `freshet-bot-<n>` is used when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nick: Option<String>,
    /// Defaults to the nickname.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Defaults to the nickname.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub realname: Option<String>,
    /// Server password, sent as `PASS` before registration.
    #[serde(
        serialize_with = "serialize_redacted",
        skip_serializing_if = "Option::is_none"
    )]
    pub password: Option<Secret<String>>,
    pub connect_timeout_secs: u64,
}

impl Default for IrcServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.into(),
            port: DEFAULT_PORT,
            nick: None,
            username: None,
            realname: None,
            password: None,
            connect_timeout_secs: 10,
        }
    }
}

impl IrcServerConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// `host:port` as accepted by socket connect calls.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Channels to subscribe to on startup.
    pub channels: Vec<String>,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            channels: vec![DEFAULT_CHANNEL.into()],
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One row per parsed edit.
    #[default]
    Csv,
    /// Every event, one JSON object per line.
    Jsonl,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Jsonl => "jsonl",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "jsonl" | "json-lines" => Ok(Self::Jsonl),
            other => Err(format!("unknown output format `{other}` (expected csv or jsonl)")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub format: OutputFormat,
    /// Directory the output file is created in.
    pub dir: PathBuf,
    /// File name prefix; a timestamp and the format extension are appended.
    pub prefix: String,
    /// Write a header row at the top of CSV output.
    pub csv_header: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            dir: PathBuf::from("."),
            prefix: DEFAULT_PREFIX.into(),
            csv_header: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Stop after this many seconds. Runs until interrupted when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<u64>,
}

impl RunConfig {
    pub fn duration(&self) -> Option<Duration> {
        self.duration_secs.map(Duration::from_secs)
    }
}

fn serialize_redacted<S: serde::Serializer>(
    secret: &Option<Secret<String>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match secret {
        Some(_) => serializer.serialize_str("[REDACTED]"),
        None => serializer.serialize_none(),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {rstest::rstest, secrecy::ExposeSecret};

    use super::*;

    #[test]
    fn defaults_point_at_the_wikimedia_feed() {
        let cfg = FreshetConfig::default();
        assert_eq!(cfg.irc.address(), "irc.wikimedia.org:6667");
        assert_eq!(cfg.irc.connect_timeout(), Duration::from_secs(10));
        assert_eq!(cfg.feed.channels, vec!["#en.wikipedia"]);
        assert_eq!(cfg.output.format, OutputFormat::Csv);
        assert_eq!(cfg.output.prefix, "wikipedia-activities");
        assert!(cfg.run.duration().is_none());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let cfg: FreshetConfig = toml::from_str(
            r##"
            [irc]
            port = 6697
            password = "hunter2"

            [feed]
            channels = ["#de.wikipedia", "#fr.wikipedia"]
            "##,
        )
        .unwrap();
        assert_eq!(cfg.irc.host, DEFAULT_HOST);
        assert_eq!(cfg.irc.port, 6697);
        assert_eq!(cfg.irc.password.as_ref().unwrap().expose_secret(), "hunter2");
        assert_eq!(cfg.feed.channels.len(), 2);
        assert_eq!(cfg.output.dir, PathBuf::from("."));
    }

    #[test]
    fn password_never_leaks_through_debug_or_serialization() {
        let cfg: FreshetConfig = toml::from_str("[irc]\npassword = \"hunter2\"\n").unwrap();
        assert!(!format!("{cfg:?}").contains("hunter2"));
        let rendered = toml::to_string(&cfg).unwrap();
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("[REDACTED]"));
    }

    #[rstest]
    #[case("csv", OutputFormat::Csv)]
    #[case("CSV", OutputFormat::Csv)]
    #[case("jsonl", OutputFormat::Jsonl)]
    #[case("json-lines", OutputFormat::Jsonl)]
    fn output_format_parses(#[case] text: &str, #[case] expected: OutputFormat) {
        assert_eq!(text.parse::<OutputFormat>().unwrap(), expected);
    }

    #[test]
    fn unknown_output_format_is_rejected() {
        assert!("xml".parse::<OutputFormat>().is_err());
    }
}
