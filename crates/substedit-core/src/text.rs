//! Storage for the logical and physical strings.
//!
//! Both models go through `TextBuffer` so range edits, literal searches and
//! field-text matching share one char-offset vocabulary. `TextRope` backs it
//! with a ropey rope.

use smol_str::{SmolStr, ToSmolStr};
use std::ops::Range;

/// Editable text addressed by char offsets (Unicode scalar values).
pub trait TextBuffer {
    /// UTF-8 length, used to size render buffers.
    fn len_bytes(&self) -> usize;

    fn len_chars(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len_chars() == 0
    }

    fn insert(&mut self, char_offset: usize, text: &str);

    fn delete(&mut self, char_range: Range<usize>);

    /// Delete `char_range`, then insert `text` at its start.
    fn replace(&mut self, char_range: Range<usize>, text: &str) {
        let at = char_range.start;
        self.delete(char_range);
        self.insert(at, text);
    }

    /// Copy of `char_range`, or None when it is reversed or runs past the end.
    fn slice(&self, char_range: Range<usize>) -> Option<SmolStr>;

    fn char_at(&self, char_offset: usize) -> Option<char>;

    fn to_string(&self) -> String;

    /// Whether `pattern` occurs literally at `char_offset`.
    fn matches_at(&self, char_offset: usize, pattern: &str) -> bool {
        let end = char_offset + pattern.chars().count();
        self.slice(char_offset..end)
            .is_some_and(|found| found == pattern)
    }

    /// Char offset of the first occurrence of `pattern` at or after `from`.
    ///
    /// An empty pattern matches at `from` itself.
    fn find(&self, pattern: &str, from: usize) -> Option<usize> {
        if from > self.len_chars() {
            return None;
        }
        if pattern.is_empty() {
            return Some(from);
        }
        let tail = self.slice(from..self.len_chars())?;
        tail.find(pattern)
            .map(|byte| from + tail[..byte].chars().count())
    }
}

/// Rope-backed `TextBuffer` with line queries for the display side.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TextRope {
    rope: ropey::Rope,
}

impl TextRope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_str(text: &str) -> Self {
        Self {
            rope: ropey::Rope::from_str(text),
        }
    }

    /// The rope itself, for chunked iteration.
    pub fn rope(&self) -> &ropey::Rope {
        &self.rope
    }

    /// Number of lines. A trailing line break opens an empty last line.
    pub fn len_lines(&self) -> usize {
        self.rope.len_lines()
    }

    /// Line containing the char offset, clamped to the last line.
    pub fn char_to_line(&self, char_offset: usize) -> usize {
        self.rope.char_to_line(char_offset.min(self.rope.len_chars()))
    }

    /// Char offset of the first char of `line`, or None past the last line.
    pub fn line_to_char(&self, line: usize) -> Option<usize> {
        (line < self.rope.len_lines()).then(|| self.rope.line_to_char(line))
    }

    /// Char length of `line` without its line break.
    pub fn line_len(&self, line: usize) -> Option<usize> {
        if line >= self.rope.len_lines() {
            return None;
        }
        let slice = self.rope.line(line);
        let mut len = slice.len_chars();
        // ropey keeps "\r\n" as one break; strip both halves.
        while len > 0 && matches!(slice.char(len - 1), '\n' | '\r') {
            len -= 1;
        }
        Some(len)
    }
}

impl TextBuffer for TextRope {
    fn len_bytes(&self) -> usize {
        self.rope.len_bytes()
    }

    fn len_chars(&self) -> usize {
        self.rope.len_chars()
    }

    fn insert(&mut self, char_offset: usize, text: &str) {
        self.rope.insert(char_offset, text);
    }

    fn delete(&mut self, char_range: Range<usize>) {
        self.rope.remove(char_range);
    }

    fn slice(&self, char_range: Range<usize>) -> Option<SmolStr> {
        let Range { start, end } = char_range;
        (start <= end && end <= self.rope.len_chars())
            .then(|| self.rope.slice(start..end).to_smolstr())
    }

    fn char_at(&self, char_offset: usize) -> Option<char> {
        self.rope.get_char(char_offset)
    }

    fn to_string(&self) -> String {
        String::from(&self.rope)
    }

    fn matches_at(&self, char_offset: usize, pattern: &str) -> bool {
        if char_offset > self.rope.len_chars() {
            return false;
        }
        let mut chars = self.rope.chars_at(char_offset);
        pattern.chars().all(|p| chars.next() == Some(p))
    }
}

impl From<&str> for TextRope {
    fn from(text: &str) -> Self {
        Self::from_str(text)
    }
}

impl From<String> for TextRope {
    fn from(text: String) -> Self {
        Self::from_str(&text)
    }
}
