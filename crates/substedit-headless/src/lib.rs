//! substedit-headless: an in-memory `TextSurface` and `ClipboardService`.
//!
//! Lets the edit mediator run without a UI toolkit, in tests or in hosts that
//! render the text themselves.

pub mod clipboard;
pub mod surface;
pub mod telemetry;

pub use clipboard::MemoryClipboard;
pub use surface::{CELL_WIDTH, HeadlessSurface, LINE_HEIGHT};

use substedit_core::{EditConfig, FieldId, FieldMap, SubstEdit};

/// Mediator over the in-memory control and clipboard.
pub type HeadlessEdit<F> = SubstEdit<F, HeadlessSurface, MemoryClipboard>;

/// Empty headless editor using `map` and the default configuration.
pub fn headless_edit<F: FieldId>(map: FieldMap<F>) -> HeadlessEdit<F> {
    SubstEdit::new(
        HeadlessSurface::new(),
        MemoryClipboard::new(),
        map,
        EditConfig::default(),
    )
}
