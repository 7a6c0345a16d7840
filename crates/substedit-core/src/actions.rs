//! Input vocabulary of the edit mediator.
//!
//! Platform-agnostic definitions of the low-level events a display surface
//! delivers: key presses, translated characters, mouse messages and clipboard
//! commands.

use crate::types::Point;

/// Keys the mediator distinguishes on key-down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    // === Navigation ===
    ArrowLeft,
    ArrowRight,
    ArrowUp,
    ArrowDown,
    Home,
    End,
    PageUp,
    PageDown,

    // === Editing ===
    Delete,
    Insert,
    Enter,
    Tab,
    Escape,

    /// Any other virtual key code.
    Other(u32),
}

impl Key {
    /// Keys moving the caret along a line.
    pub fn is_horizontal(&self) -> bool {
        matches!(
            self,
            Self::ArrowLeft | Self::ArrowRight | Self::Home | Self::End
        )
    }

    /// Keys moving the caret across lines.
    pub fn is_vertical(&self) -> bool {
        matches!(
            self,
            Self::ArrowUp | Self::ArrowDown | Self::PageUp | Self::PageDown
        )
    }

    pub fn is_navigation(&self) -> bool {
        self.is_horizontal() || self.is_vertical()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
}

impl Modifiers {
    pub const NONE: Self = Self {
        ctrl: false,
        alt: false,
        shift: false,
    };

    pub const SHIFT: Self = Self {
        ctrl: false,
        alt: false,
        shift: true,
    };

    pub const CTRL: Self = Self {
        ctrl: true,
        alt: false,
        shift: false,
    };

    pub const CTRL_SHIFT: Self = Self {
        ctrl: true,
        alt: false,
        shift: true,
    };

    /// Same state with Ctrl released, so replayed keys move by one unit.
    pub fn without_ctrl(self) -> Self {
        Self { ctrl: false, ..self }
    }
}

/// Button and key state carried by a mouse message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MouseButtons {
    pub left: bool,
    pub right: bool,
    /// Shift held: a click extends the selection.
    pub shift: bool,
}

impl MouseButtons {
    pub const NONE: Self = Self {
        left: false,
        right: false,
        shift: false,
    };

    pub const LEFT: Self = Self {
        left: true,
        right: false,
        shift: false,
    };

    pub const SHIFT_LEFT: Self = Self {
        left: true,
        right: false,
        shift: true,
    };
}

/// A low-level event delivered to the mediator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditEvent {
    KeyDown { key: Key, modifiers: Modifiers },
    /// A translated character, control characters included.
    Char(char),
    MouseDown { point: Point, buttons: MouseButtons },
    MouseMove { point: Point, buttons: MouseButtons },
    DoubleClick { point: Point },
    Cut,
    Copy,
    Paste,
}

/// Outcome of a dispatched event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// The mediator performed the field-aware equivalent.
    Handled,
    /// Default handling of the surface ran unchanged.
    Forwarded,
}

/// Classification of a translated character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharInput {
    /// Ctrl+A.
    SelectAll,
    /// Ctrl+C.
    Copy,
    /// Ctrl+X.
    Cut,
    /// Ctrl+V.
    Paste,
    Backspace,
    /// Any other character below space except carriage return.
    Control(char),
    Printable(char),
}

impl CharInput {
    pub fn classify(ch: char) -> Self {
        match ch {
            '\u{1}' => Self::SelectAll,
            '\u{3}' => Self::Copy,
            '\u{18}' => Self::Cut,
            '\u{16}' => Self::Paste,
            '\u{8}' => Self::Backspace,
            '\r' => Self::Printable(ch),
            c if c < ' ' => Self::Control(c),
            c => Self::Printable(c),
        }
    }
}
