//! Edit-line grammar, version 1.
//!
//! Formatting codes are stripped by the transport before a line reaches the
//! parser. What remains must look like:
//!
//! ```text
//! [[<title>]] [<flags>] <diff-url> * <user> * (<diff-bytes>) <summary>
//! ```
//!
//! - `title` is everything up to the first `]]` and must not be blank.
//! - `flags` is a mandatory bracketed segment, possibly empty. `M` minor,
//!   `T` talk, `B` bot edit, `N` new, `!` unpatrolled, `S` special. Other
//!   characters are kept in `unparsed_flags`; whitespace is ignored.
//! - `diff-url` is a single token and may be absent.
//! - `user` sits between two `*` delimiters and must not be blank.
//! - `diff-bytes` is a parenthesised signed decimal integer such as `+42`.
//! - `summary` is the rest of the line and may be empty.
//!
//! Any drift from this shape turns a line into [`NotAnEdit`]; bump
//! [`EDIT_LINE_GRAMMAR_VERSION`] whenever the accepted shape changes.
//!
//! The flag brackets are part of version 1. Lines whose flags appear as a
//! bare token after the title (`[[Page]] MB https://x * u * (+1) s`) are not
//! accepted; reading them needs a new grammar version.

use thiserror::Error;

use crate::record::{EditFlags, EditRecord};

pub const EDIT_LINE_GRAMMAR_VERSION: u32 = 1;

const FIELD_DELIMITER: char = '*';

/// Why a line was not accepted as an edit notification.
///
/// This is an expected outcome for ordinary chat lines, not a failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotAnEdit {
    #[error("line does not match the edit grammar: {0}")]
    Shape(&'static str),

    #[error("edit title is empty")]
    EmptyTitle,

    #[error("edit user is empty")]
    EmptyUser,

    #[error("diff size `{token}` is not an integer")]
    InvalidDiffBytes { token: String },
}

/// Parse one feed line into an [`EditRecord`].
///
/// Never panics and never returns a partially filled record. The result only
/// depends on `line`.
pub fn parse(line: &str) -> Result<EditRecord, NotAnEdit> {
    let rest = line
        .trim_start()
        .strip_prefix("[[")
        .ok_or(NotAnEdit::Shape("missing `[[` before the title"))?;
    let (title, rest) = rest
        .split_once("]]")
        .ok_or(NotAnEdit::Shape("missing `]]` after the title"))?;
    let title = title.trim();
    if title.is_empty() {
        return Err(NotAnEdit::EmptyTitle);
    }

    let rest = rest
        .trim_start()
        .strip_prefix('[')
        .ok_or(NotAnEdit::Shape("missing `[` before the flags"))?;
    let (flag_segment, rest) = rest
        .split_once(']')
        .ok_or(NotAnEdit::Shape("missing `]` after the flags"))?;

    let (diff_url, rest) = rest
        .split_once(FIELD_DELIMITER)
        .ok_or(NotAnEdit::Shape("missing `*` before the user"))?;
    let diff_url = diff_url.trim();
    if diff_url.contains(char::is_whitespace) {
        return Err(NotAnEdit::Shape("diff url is not a single token"));
    }

    let (user, rest) = rest
        .split_once(FIELD_DELIMITER)
        .ok_or(NotAnEdit::Shape("missing `*` after the user"))?;
    let user = user.trim();
    if user.is_empty() {
        return Err(NotAnEdit::EmptyUser);
    }

    let rest = rest
        .trim_start()
        .strip_prefix('(')
        .ok_or(NotAnEdit::Shape("missing `(` before the diff size"))?;
    let (token, summary) = rest
        .split_once(')')
        .ok_or(NotAnEdit::Shape("missing `)` after the diff size"))?;
    let token = token.trim();
    let diff_bytes = token
        .parse::<i64>()
        .map_err(|_| NotAnEdit::InvalidDiffBytes {
            token: token.to_owned(),
        })?;

    let (flags, unparsed_flags) = parse_flags(flag_segment);

    Ok(EditRecord::new(
        title,
        user,
        diff_bytes,
        diff_url,
        summary.trim(),
        flags,
        unparsed_flags,
    ))
}

fn parse_flags(segment: &str) -> (EditFlags, String) {
    let mut flags = EditFlags::default();
    let mut unparsed = String::new();
    for symbol in segment.chars().filter(|c| !c.is_whitespace()) {
        if !flags.set(symbol) {
            unparsed.push(symbol);
        }
    }
    (flags, unparsed)
}
