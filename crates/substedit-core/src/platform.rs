//! Platform abstraction traits for the edit mediator.
//!
//! These traits define the interface between the field-aware logic and the
//! native edit control, clipboard and host window. Implementations wrap a real
//! UI toolkit; `substedit-headless` provides in-memory ones.

use crate::actions::{Key, Modifiers, MouseButtons};
use crate::types::{Point, Selection};

/// Line and column under a point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextHit {
    pub line: usize,
    pub column: usize,
}

/// The native edit control the mediator sits in front of.
///
/// Offsets are char offsets into the raw (physical) text. The `default_*`
/// methods run the control's own handling of an event and return whether the
/// raw text changed; that return value is the change notification the
/// mediator coalesces.
pub trait TextSurface {
    fn raw_text(&self) -> String;

    /// Replace the whole text. Returns whether the text changed.
    fn set_raw_text(&mut self, text: &str) -> bool;

    fn selection(&self) -> Selection;

    /// Select `start..end`; the select-all sentinel selects everything.
    fn set_selection(&mut self, selection: Selection);

    /// Client coordinates of the char at `index`, or of the caret slot after
    /// the last char.
    fn position_from_char_index(&self, index: usize) -> Option<Point>;

    /// Line and column nearest to `point`, or None outside the text area.
    fn hit_test(&self, point: Point) -> Option<TextHit>;

    /// Char offset of the first char of `line`.
    fn line_start(&self, line: usize) -> Option<usize>;

    fn line_from_char_index(&self, index: usize) -> usize;

    fn default_key_down(&mut self, key: Key, modifiers: Modifiers) -> bool;

    fn default_char(&mut self, ch: char) -> bool;

    fn default_mouse_down(&mut self, point: Point, buttons: MouseButtons) -> bool;

    fn default_mouse_move(&mut self, point: Point, buttons: MouseButtons) -> bool;

    fn empty_undo_buffer(&mut self);

    /// Bring the caret into view.
    fn scroll_caret(&mut self) {}
}

/// System clipboard access.
///
/// Reads return None when the clipboard holds no text in that format.
pub trait ClipboardService {
    /// Place text in both the byte and the wide text formats.
    fn set_text(&mut self, text: &str) -> bool;

    /// Text in the byte format.
    fn text(&self) -> Option<String>;

    /// Text in the wide format.
    fn unicode_text(&self) -> Option<String>;

    /// Place text tagged with a locale identifier.
    fn set_locale_text(&mut self, text: &str, locale: u32) -> bool;

    /// Char length of the byte-format text.
    fn text_len(&self) -> Option<usize>;

    fn has_text(&self) -> bool {
        self.text_len().is_some() || self.unicode_text().is_some()
    }
}

/// Host-side notifications.
pub trait EditListener {
    /// Content changed. Sent once per outermost mediator operation.
    fn content_changed(&mut self);

    fn selection_changed(&mut self, _selection: Selection) {}

    fn modified_changed(&mut self, _modified: bool) {}
}
