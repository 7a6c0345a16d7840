//! A multi-line edit control kept entirely in memory.
//!
//! Behaves like a classic native edit control: `"\r\n"` line breaks that the
//! caret steps over as a unit, Enter inserting a line break, Backspace and
//! Delete removing one unit, and a fixed-size character grid for mouse hit
//! testing.

use substedit_core::{
    Key, Modifiers, MouseButtons, Point, Selection, TextBuffer, TextHit, TextRope, TextSurface,
};

/// Width of one character cell in client coordinates.
pub const CELL_WIDTH: i32 = 8;
/// Height of one line in client coordinates.
pub const LINE_HEIGHT: i32 = 16;

const LINE_BREAK: &str = "\r\n";

#[derive(Clone, Debug, Default)]
pub struct HeadlessSurface {
    text: TextRope,
    anchor: usize,
    caret: usize,
    undo: Vec<String>,
}

impl HeadlessSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(text: &str) -> Self {
        Self {
            text: TextRope::from_str(text),
            ..Self::default()
        }
    }

    /// Snapshots the control could undo to.
    pub fn undo_depth(&self) -> usize {
        self.undo.len()
    }

    /// Client coordinates of the cell at `line`, `column`.
    pub fn point_at(line: usize, column: usize) -> Point {
        Point::new(column as i32 * CELL_WIDTH, line as i32 * LINE_HEIGHT)
    }

    fn len(&self) -> usize {
        self.text.len_chars()
    }

    fn has_selection(&self) -> bool {
        self.anchor != self.caret
    }

    fn selected_range(&self) -> (usize, usize) {
        (self.anchor.min(self.caret), self.anchor.max(self.caret))
    }

    fn snapshot(&mut self) {
        self.undo.push(self.text.to_string());
    }

    fn prev_boundary(&self, pos: usize) -> usize {
        if pos >= 2 && self.text.matches_at(pos - 2, LINE_BREAK) {
            pos - 2
        } else {
            pos.saturating_sub(1)
        }
    }

    fn next_boundary(&self, pos: usize) -> usize {
        if self.text.matches_at(pos, LINE_BREAK) {
            pos + 2
        } else {
            (pos + 1).min(self.len())
        }
    }

    fn prev_word(&self, mut pos: usize) -> usize {
        while pos > 0 && self.text.char_at(pos - 1).is_some_and(char::is_whitespace) {
            pos -= 1;
        }
        while pos > 0 && self.text.char_at(pos - 1).is_some_and(|c| !c.is_whitespace()) {
            pos -= 1;
        }
        pos
    }

    fn next_word(&self, mut pos: usize) -> usize {
        while self.text.char_at(pos).is_some_and(|c| !c.is_whitespace()) {
            pos += 1;
        }
        while self.text.char_at(pos).is_some_and(char::is_whitespace) {
            pos += 1;
        }
        pos
    }

    fn line_bounds(&self, line: usize) -> (usize, usize) {
        let start = self.text.line_to_char(line).unwrap_or(0);
        let len = self.text.line_len(line).unwrap_or(0);
        (start, start + len)
    }

    /// Same column on another line, clamped to that line's length.
    fn vertical_target(&self, line: usize) -> usize {
        let current = self.text.char_to_line(self.caret);
        let (current_start, _) = self.line_bounds(current);
        let column = self.caret - current_start;
        let (start, end) = self.line_bounds(line);
        (start + column).min(end)
    }

    fn move_caret(&mut self, target: usize, extend: bool) {
        self.caret = target;
        if !extend {
            self.anchor = target;
        }
    }

    fn remove_selection(&mut self) -> bool {
        if !self.has_selection() {
            return false;
        }
        let (start, end) = self.selected_range();
        self.snapshot();
        self.text.delete(start..end);
        self.anchor = start;
        self.caret = start;
        true
    }

    fn replace_selection(&mut self, text: &str) -> bool {
        let (start, end) = self.selected_range();
        self.snapshot();
        if start < end {
            self.text.delete(start..end);
        }
        self.text.insert(start, text);
        let caret = start + text.chars().count();
        self.anchor = caret;
        self.caret = caret;
        true
    }

    fn index_at(&self, point: Point) -> Option<usize> {
        let hit = self.hit_test(point)?;
        self.line_start(hit.line).map(|start| start + hit.column)
    }
}

impl TextSurface for HeadlessSurface {
    fn raw_text(&self) -> String {
        self.text.to_string()
    }

    fn set_raw_text(&mut self, text: &str) -> bool {
        let changed = self.text.to_string() != text;
        self.text = TextRope::from_str(text);
        self.anchor = 0;
        self.caret = 0;
        self.undo.clear();
        changed
    }

    fn selection(&self) -> Selection {
        Selection::new(self.anchor, self.caret)
    }

    fn set_selection(&mut self, selection: Selection) {
        if selection.is_all() {
            self.anchor = 0;
            self.caret = self.len();
            return;
        }
        let len = self.len();
        self.anchor = selection.anchor_char().min(len);
        self.caret = selection.caret_char().min(len);
    }

    fn position_from_char_index(&self, index: usize) -> Option<Point> {
        if index > self.len() {
            return None;
        }
        let line = self.text.char_to_line(index);
        let start = self.text.line_to_char(line)?;
        Some(Self::point_at(line, index - start))
    }

    fn hit_test(&self, point: Point) -> Option<TextHit> {
        if point.x < 0 || point.y < 0 {
            return None;
        }
        let line = (point.y / LINE_HEIGHT) as usize;
        let line_len = self.text.line_len(line)?;
        let column = ((point.x + CELL_WIDTH / 2) / CELL_WIDTH) as usize;
        Some(TextHit {
            line,
            column: column.min(line_len),
        })
    }

    fn line_start(&self, line: usize) -> Option<usize> {
        self.text.line_to_char(line)
    }

    fn line_from_char_index(&self, index: usize) -> usize {
        self.text.char_to_line(index)
    }

    fn default_key_down(&mut self, key: Key, modifiers: Modifiers) -> bool {
        let extend = modifiers.shift;
        match key {
            Key::ArrowLeft => {
                let target = if self.has_selection() && !extend {
                    self.selected_range().0
                } else if modifiers.ctrl {
                    self.prev_word(self.caret)
                } else {
                    self.prev_boundary(self.caret)
                };
                self.move_caret(target, extend);
                false
            }
            Key::ArrowRight => {
                let target = if self.has_selection() && !extend {
                    self.selected_range().1
                } else if modifiers.ctrl {
                    self.next_word(self.caret)
                } else {
                    self.next_boundary(self.caret)
                };
                self.move_caret(target, extend);
                false
            }
            Key::Home => {
                let (start, _) = self.line_bounds(self.text.char_to_line(self.caret));
                self.move_caret(start, extend);
                false
            }
            Key::End => {
                let (_, end) = self.line_bounds(self.text.char_to_line(self.caret));
                self.move_caret(end, extend);
                false
            }
            Key::ArrowUp | Key::PageUp => {
                let line = self.text.char_to_line(self.caret);
                let target = match (key, line) {
                    (_, 0) => self.caret,
                    (Key::PageUp, _) => self.vertical_target(0),
                    _ => self.vertical_target(line - 1),
                };
                self.move_caret(target, extend);
                false
            }
            Key::ArrowDown | Key::PageDown => {
                let line = self.text.char_to_line(self.caret);
                let last = self.text.len_lines().saturating_sub(1);
                let target = match (key, line) {
                    (_, l) if l >= last => self.caret,
                    (Key::PageDown, _) => self.vertical_target(last),
                    _ => self.vertical_target(line + 1),
                };
                self.move_caret(target, extend);
                false
            }
            Key::Delete => {
                if self.has_selection() {
                    return self.remove_selection();
                }
                if self.caret >= self.len() {
                    return false;
                }
                let end = self.next_boundary(self.caret);
                self.snapshot();
                self.text.delete(self.caret..end);
                true
            }
            _ => false,
        }
    }

    fn default_char(&mut self, ch: char) -> bool {
        match ch {
            '\u{8}' => {
                if self.has_selection() {
                    return self.remove_selection();
                }
                if self.caret == 0 {
                    return false;
                }
                let start = self.prev_boundary(self.caret);
                self.snapshot();
                self.text.delete(start..self.caret);
                self.anchor = start;
                self.caret = start;
                true
            }
            '\r' => self.replace_selection(LINE_BREAK),
            '\t' => self.replace_selection("\t"),
            c if c < ' ' => false,
            c => {
                let mut buf = [0u8; 4];
                self.replace_selection(c.encode_utf8(&mut buf))
            }
        }
    }

    fn default_mouse_down(&mut self, point: Point, buttons: MouseButtons) -> bool {
        if let Some(index) = self.index_at(point) {
            self.move_caret(index, buttons.shift);
        }
        false
    }

    fn default_mouse_move(&mut self, point: Point, buttons: MouseButtons) -> bool {
        if buttons.left {
            if let Some(index) = self.index_at(point) {
                self.caret = index;
            }
        }
        false
    }

    fn empty_undo_buffer(&mut self) {
        self.undo.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_break_is_one_caret_step() {
        let mut surface = HeadlessSurface::with_text("ab\r\ncd");
        surface.set_selection(Selection::caret(2));
        surface.default_key_down(Key::ArrowRight, Modifiers::NONE);
        assert_eq!(surface.selection(), Selection::caret(4));
        surface.default_key_down(Key::ArrowLeft, Modifiers::NONE);
        assert_eq!(surface.selection(), Selection::caret(2));
    }

    #[test]
    fn test_backspace_and_delete() {
        let mut surface = HeadlessSurface::with_text("ab\r\ncd");
        surface.set_selection(Selection::caret(4));
        assert!(surface.default_char('\u{8}'));
        assert_eq!(surface.raw_text(), "abcd");
        assert_eq!(surface.selection(), Selection::caret(2));
        assert!(surface.default_key_down(Key::Delete, Modifiers::NONE));
        assert_eq!(surface.raw_text(), "abd");
        assert_eq!(surface.undo_depth(), 2);
        surface.empty_undo_buffer();
        assert_eq!(surface.undo_depth(), 0);
        surface.set_selection(Selection::caret(3));
        assert!(!surface.default_key_down(Key::Delete, Modifiers::NONE));
    }

    #[test]
    fn test_typing_replaces_selection() {
        let mut surface = HeadlessSurface::with_text("hello");
        surface.set_selection(Selection::new(1, 4));
        assert!(surface.default_char('i'));
        assert_eq!(surface.raw_text(), "hio");
        assert!(surface.default_char('\r'));
        assert_eq!(surface.raw_text(), "hi\r\no");
        assert_eq!(surface.selection(), Selection::caret(4));
        assert!(!surface.default_char('\u{1b}'));
    }

    #[test]
    fn test_vertical_keeps_column() {
        let mut surface = HeadlessSurface::with_text("abcdef\r\nxy\r\nlonger");
        surface.set_selection(Selection::caret(5));
        surface.default_key_down(Key::ArrowDown, Modifiers::NONE);
        assert_eq!(surface.selection(), Selection::caret(10));
        surface.default_key_down(Key::ArrowDown, Modifiers::NONE);
        assert_eq!(surface.selection(), Selection::caret(14));
        surface.default_key_down(Key::ArrowUp, Modifiers::SHIFT);
        assert_eq!(surface.selection(), Selection::new(14, 10));
    }

    #[test]
    fn test_home_end() {
        let mut surface = HeadlessSurface::with_text("ab\r\ncdef");
        surface.set_selection(Selection::caret(5));
        surface.default_key_down(Key::End, Modifiers::NONE);
        assert_eq!(surface.selection(), Selection::caret(8));
        surface.default_key_down(Key::Home, Modifiers::SHIFT);
        assert_eq!(surface.selection(), Selection::new(8, 4));
    }

    #[test]
    fn test_geometry() {
        let surface = HeadlessSurface::with_text("abc\r\nde");
        assert_eq!(
            surface.position_from_char_index(6),
            Some(HeadlessSurface::point_at(1, 1))
        );
        assert_eq!(surface.position_from_char_index(8), None);
        assert_eq!(
            surface.hit_test(Point::new(13, 20)),
            Some(TextHit { line: 1, column: 2 })
        );
        assert_eq!(
            surface.hit_test(Point::new(200, 0)),
            Some(TextHit { line: 0, column: 3 })
        );
        assert_eq!(surface.hit_test(Point::new(0, 40)), None);
        assert_eq!(surface.line_from_char_index(5), 1);
    }

    #[test]
    fn test_set_raw_text_reports_change() {
        let mut surface = HeadlessSurface::with_text("abc");
        surface.set_selection(Selection::caret(2));
        assert!(!surface.set_raw_text("abc"));
        assert_eq!(surface.selection(), Selection::caret(0));
        assert!(surface.set_raw_text("abd"));
        surface.set_selection(Selection::all());
        assert_eq!(surface.selection(), Selection::new(0, 3));
    }
}
