//! Semantic checks that serde cannot express.

use std::{collections::HashSet, fmt};

use crate::schema::{FreshetConfig, OutputFormat};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
        }
    }
}

/// A single validation finding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Dotted path, e.g. `irc.port`.
    pub path: String,
    pub message: String,
}

impl Diagnostic {
    fn error(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            path: path.into(),
            message: message.into(),
        }
    }

    fn warning(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}] {}", self.severity, self.path, self.message)
    }
}

#[must_use]
pub fn has_errors(diagnostics: &[Diagnostic]) -> bool {
    diagnostics.iter().any(|d| d.severity == Severity::Error)
}

/// Check `config` for values that would fail at runtime.
#[must_use]
pub fn validate(config: &FreshetConfig) -> Vec<Diagnostic> {
    let mut out = Vec::new();
    let irc = &config.irc;

    if irc.host.trim().is_empty() {
        out.push(Diagnostic::error("irc.host", "host must not be empty"));
    }
    if irc.port == 0 {
        out.push(Diagnostic::error("irc.port", "port must be between 1 and 65535"));
    }
    if irc.connect_timeout_secs == 0 {
        out.push(Diagnostic::error(
            "irc.connect_timeout_secs",
            "connect timeout must be at least one second",
        ));
    }
    for (field, value) in [
        ("irc.nick", &irc.nick),
        ("irc.username", &irc.username),
        ("irc.realname", &irc.realname),
    ] {
        if let Some(value) = value {
            if value.trim().is_empty() {
                out.push(Diagnostic::error(field, "must not be blank when set"));
            } else if field != "irc.realname" && value.contains(char::is_whitespace) {
                out.push(Diagnostic::error(field, "must not contain whitespace"));
            }
        }
    }

    if config.feed.channels.is_empty() {
        out.push(Diagnostic::error(
            "feed.channels",
            "at least one channel is required",
        ));
    }
    let mut seen = HashSet::new();
    for (i, channel) in config.feed.channels.iter().enumerate() {
        let path = format!("feed.channels[{i}]");
        if !channel.starts_with(['#', '&']) {
            out.push(Diagnostic::error(
                path,
                format!("`{channel}` must start with `#` or `&`"),
            ));
        } else if channel.contains(|c: char| c.is_whitespace() || c.is_control() || c == ',') {
            out.push(Diagnostic::error(
                path,
                format!("`{channel}` contains a space, comma or control character"),
            ));
        } else if !seen.insert(channel.as_str()) {
            out.push(Diagnostic::warning(
                path,
                format!("`{channel}` is listed more than once"),
            ));
        }
    }

    let prefix = &config.output.prefix;
    if prefix.is_empty() {
        out.push(Diagnostic::error("output.prefix", "prefix must not be empty"));
    } else if prefix.contains(['/', '\\']) {
        out.push(Diagnostic::error(
            "output.prefix",
            "prefix must be a file name, not a path",
        ));
    }
    if config.output.csv_header && config.output.format != OutputFormat::Csv {
        out.push(Diagnostic::warning(
            "output.csv_header",
            "ignored unless output.format is csv",
        ));
    }

    if config.run.duration_secs == Some(0) {
        out.push(Diagnostic::warning(
            "run.duration_secs",
            "a zero duration stops right after connecting",
        ));
    }

    out
}
