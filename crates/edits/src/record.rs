use serde::Serialize;

/// The six named boolean attributes of an edit.
///
/// A flag that did not appear in the line is `false`, never unknown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EditFlags {
    pub is_minor: bool,
    pub is_talk: bool,
    pub is_bot_edit: bool,
    pub is_new: bool,
    pub is_unpatrolled: bool,
    pub is_special: bool,
}

impl EditFlags {
    pub const MINOR: char = 'M';
    pub const TALK: char = 'T';
    pub const BOT_EDIT: char = 'B';
    pub const NEW: char = 'N';
    pub const UNPATROLLED: char = '!';
    pub const SPECIAL: char = 'S';

    /// Raise the flag identified by `symbol`.
    ///
    /// Returns `false` when `symbol` does not name a flag.
    pub fn set(&mut self, symbol: char) -> bool {
        let flag = match symbol {
            Self::MINOR => &mut self.is_minor,
            Self::TALK => &mut self.is_talk,
            Self::BOT_EDIT => &mut self.is_bot_edit,
            Self::NEW => &mut self.is_new,
            Self::UNPATROLLED => &mut self.is_unpatrolled,
            Self::SPECIAL => &mut self.is_special,
            _ => return false,
        };
        *flag = true;
        true
    }

    /// Flags in column order: minor, talk, bot edit, new, unpatrolled, special.
    pub fn to_array(self) -> [bool; 6] {
        [
            self.is_minor,
            self.is_talk,
            self.is_bot_edit,
            self.is_new,
            self.is_unpatrolled,
            self.is_special,
        ]
    }
}

/// A successfully parsed edit notification.
///
/// Only [`parse`](crate::parse) constructs records, so every value of this
/// type is complete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EditRecord {
    title: String,
    user: String,
    diff_bytes: i64,
    diff_url: String,
    summary: String,
    flags: EditFlags,
    unparsed_flags: String,
}

impl EditRecord {
    pub(crate) fn new(
        title: &str,
        user: &str,
        diff_bytes: i64,
        diff_url: &str,
        summary: &str,
        flags: EditFlags,
        unparsed_flags: String,
    ) -> Self {
        Self {
            title: title.to_owned(),
            user: user.to_owned(),
            diff_bytes,
            diff_url: diff_url.to_owned(),
            summary: summary.to_owned(),
            flags,
            unparsed_flags,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Editor name, or an address for anonymous edits.
    pub fn user(&self) -> &str {
        &self.user
    }

    /// Size change of the page in bytes; negative for removals.
    pub fn diff_bytes(&self) -> i64 {
        self.diff_bytes
    }

    pub fn diff_url(&self) -> &str {
        &self.diff_url
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn flags(&self) -> EditFlags {
        self.flags
    }

    /// Flag characters the parser did not recognise, in their original order.
    pub fn unparsed_flags(&self) -> &str {
        &self.unparsed_flags
    }
}
