//! Line-level IRC framing: inbound message parsing, outbound commands and
//! formatting-code removal.

use std::{borrow::Cow, iter::Peekable, str::Chars};

const BOLD: char = '\x02';
const COLOR: char = '\x03';
const MONOSPACE: char = '\x11';
const RESET: char = '\x0F';
const REVERSE: char = '\x16';
const ITALIC: char = '\x1D';
const STRIKETHROUGH: char = '\x1E';
const UNDERLINE: char = '\x1F';

/// One inbound protocol line, split into prefix, command and parameters.
///
/// The trailing parameter (after ` :`) is the last element of `params`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IrcMessage {
    pub prefix: Option<String>,
    /// Upper-cased command word or three-digit numeric.
    pub command: String,
    pub params: Vec<String>,
}

impl IrcMessage {
    /// Parse a line with or without its `\r\n` terminator. Message tags are
    /// skipped. Returns `None` for blank or prefix-only lines.
    pub fn parse(line: &str) -> Option<Self> {
        let mut rest = line.trim_end_matches(['\r', '\n']).trim_start();

        if rest.starts_with('@') {
            rest = rest.split_once(' ')?.1.trim_start();
        }

        let prefix = match rest.strip_prefix(':') {
            Some(tail) => {
                let (prefix, tail) = tail.split_once(' ')?;
                rest = tail.trim_start();
                Some(prefix.to_owned())
            },
            None => None,
        };

        let (command, mut tail) = rest.split_once(' ').unwrap_or((rest, ""));
        if command.is_empty() {
            return None;
        }

        let mut params = Vec::new();
        loop {
            let param = tail.trim_start_matches(' ');
            if param.is_empty() {
                break;
            }
            if let Some(trailing) = param.strip_prefix(':') {
                params.push(trailing.to_owned());
                break;
            }
            match param.split_once(' ') {
                Some((middle, next)) => {
                    params.push(middle.to_owned());
                    tail = next;
                },
                None => {
                    params.push(param.to_owned());
                    break;
                },
            }
        }

        Some(Self {
            prefix,
            command: command.to_ascii_uppercase(),
            params,
        })
    }

    /// Nickname part of a `nick!user@host` prefix.
    pub fn nick(&self) -> Option<&str> {
        self.prefix
            .as_deref()
            .and_then(|p| p.split(['!', '@']).next())
            .filter(|nick| !nick.is_empty())
    }

    pub fn param(&self, index: usize) -> Option<&str> {
        self.params.get(index).map(String::as_str)
    }

    pub fn trailing(&self) -> Option<&str> {
        self.params.last().map(String::as_str)
    }

    /// Numeric replies in the 400-599 range.
    pub fn is_error_reply(&self) -> bool {
        self.command.len() == 3
            && self
                .command
                .parse::<u16>()
                .is_ok_and(|code| (400..600).contains(&code))
    }
}

/// Commands the client writes after registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Join(String),
    Part(String),
    Pong(String),
    Nick(String),
    Quit(String),
}

impl Outbound {
    /// Wire form, including the `\r\n` terminator.
    pub fn to_line(&self) -> String {
        match self {
            Self::Join(channel) => format!("JOIN {channel}\r\n"),
            Self::Part(channel) => format!("PART {channel}\r\n"),
            Self::Pong(token) => format!("PONG :{token}\r\n"),
            Self::Nick(nick) => format!("NICK {nick}\r\n"),
            Self::Quit(reason) => format!("QUIT :{reason}\r\n"),
        }
    }
}

/// Remove mIRC bold, colour, italic, underline, strikethrough, monospace,
/// reverse and reset codes. Colour codes swallow up to two foreground digits
/// and an optional `,` plus up to two background digits.
pub fn strip_formatting(text: &str) -> Cow<'_, str> {
    if !text.contains(is_format_code) {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            COLOR => {
                if skip_digits(&mut chars) > 0 && chars.peek() == Some(&',') {
                    let mut ahead = chars.clone();
                    ahead.next();
                    if ahead.peek().is_some_and(char::is_ascii_digit) {
                        chars.next();
                        skip_digits(&mut chars);
                    }
                }
            },
            c if is_format_code(c) => {},
            c => out.push(c),
        }
    }
    Cow::Owned(out)
}

fn is_format_code(c: char) -> bool {
    matches!(
        c,
        BOLD | COLOR | MONOSPACE | RESET | REVERSE | ITALIC | STRIKETHROUGH | UNDERLINE
    )
}

fn skip_digits(chars: &mut Peekable<Chars<'_>>) -> usize {
    let mut skipped = 0;
    while skipped < 2 && chars.peek().is_some_and(char::is_ascii_digit) {
        chars.next();
        skipped += 1;
    }
    skipped
}
