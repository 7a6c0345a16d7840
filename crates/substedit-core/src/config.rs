//! Configuration for the edit mediator and its field table.

use serde::{Deserialize, Serialize};

/// Mediator settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditConfig {
    /// Upper bound on replayed keystrokes for a single operation.
    pub replay_limit: usize,
    /// Line break unit removed as a whole by backspace and delete.
    pub line_break: String,
    /// Locale tag attached to locale-tagged clipboard text.
    pub locale: u32,
    /// Also place locale-tagged text on the clipboard on copy.
    pub copy_locale_text: bool,
}

impl Default for EditConfig {
    fn default() -> Self {
        Self {
            replay_limit: 4096,
            line_break: "\r\n".to_string(),
            locale: 0,
            copy_locale_text: false,
        }
    }
}

impl EditConfig {
    pub(crate) fn line_break_len(&self) -> usize {
        self.line_break.chars().count()
    }
}

/// One `(id, display text)` row of a field table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldEntry {
    pub id: u64,
    pub text: String,
}

/// Serde form of a field table, as supplied by the hosting application.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldMapConfig {
    pub fields: Vec<FieldEntry>,
}
