//! Selection and screen geometry types shared by the models and the mediator.

use std::ops::Range;

/// Selection range in physical char offsets.
///
/// `start <= end` always holds; `caret_at_end` tells which end carries the
/// caret. The pair `(0, usize::MAX)` means "everything", whatever the length.
#[derive(Clone, Debug, Copy, PartialEq, Eq, Default)]
pub struct Selection {
    pub start: usize,
    pub end: usize,
    pub caret_at_end: bool,
}

impl Selection {
    /// Create a selection. Reversed bounds put the caret at the start.
    pub fn new(anchor: usize, caret: usize) -> Self {
        if anchor <= caret {
            Self {
                start: anchor,
                end: caret,
                caret_at_end: true,
            }
        } else {
            Self {
                start: caret,
                end: anchor,
                caret_at_end: false,
            }
        }
    }

    /// Collapsed selection (caret only).
    pub fn caret(pos: usize) -> Self {
        Self {
            start: pos,
            end: pos,
            caret_at_end: true,
        }
    }

    /// Select-all sentinel.
    pub fn all() -> Self {
        Self {
            start: 0,
            end: usize::MAX,
            caret_at_end: true,
        }
    }

    pub fn is_all(&self) -> bool {
        self.start == 0 && self.end == usize::MAX
    }

    /// Whether something is selected.
    pub fn is_sel(&self) -> bool {
        self.start != self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        !self.is_sel()
    }

    /// Offset of the caret end.
    pub fn caret_char(&self) -> usize {
        if self.caret_at_end {
            self.end
        } else {
            self.start
        }
    }

    /// Offset of the anchored end.
    pub fn anchor_char(&self) -> usize {
        if self.caret_at_end {
            self.start
        } else {
            self.end
        }
    }

    pub fn set_caret_at_end(&mut self, at_end: bool) {
        self.caret_at_end = at_end;
    }

    /// Shift both ends, saturating at zero.
    pub fn offset(&self, delta: isize) -> Self {
        let shift = |p: usize| p.saturating_add_signed(delta);
        Self {
            start: shift(self.start),
            end: shift(self.end),
            caret_at_end: self.caret_at_end,
        }
    }

    /// Ordered range, clamped to a text of `len` chars.
    pub fn to_range(&self, len: usize) -> Range<usize> {
        self.start.min(len)..self.end.min(len)
    }
}

/// Client-area point in surface units.
#[derive(Clone, Debug, Copy, PartialEq, Eq, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}
