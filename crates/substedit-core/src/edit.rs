//! The edit mediator: sits between a native edit control and the dual text
//! model, turning every event that could split a field into an atomic,
//! field-respecting equivalent.
//!
//! Each public operation runs inside a nesting-counted prologue/epilogue.
//! Changes reported by the surface while an operation runs are only counted;
//! the outermost epilogue forwards a single `content_changed` to the host.

use crate::actions::{CharInput, Dispatch, EditEvent, Key, Modifiers, MouseButtons};
use crate::config::EditConfig;
use crate::error::{Result, SubstError};
use crate::field::{DescriptorProvider, FieldId, FieldMap};
use crate::logical::LogicalData;
use crate::physical::{FindDirection, PhysicalData, PhysicalField};
use crate::platform::{ClipboardService, EditListener, TextSurface};
use crate::text::TextBuffer;
use crate::types::{Point, Selection};

const BACKSPACE: char = '\u{8}';

/// Key replayed on the surface to remove its selection.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Collapse {
    Backspace,
    Delete,
}

/// Field-aware front end of a [`TextSurface`].
pub struct SubstEdit<F: FieldId, S: TextSurface, C: ClipboardService> {
    data: PhysicalData<F>,
    surface: S,
    clipboard: C,
    config: EditConfig,
    listener: Option<Box<dyn EditListener>>,
    notify_lock: usize,
    pending_changes: usize,
    hook_lock: usize,
    modified: bool,
    entry_selection: Selection,
}

impl<F: FieldId, S: TextSurface, C: ClipboardService> SubstEdit<F, S, C> {
    /// Attach to `surface` with an empty document.
    pub fn new(surface: S, clipboard: C, map: FieldMap<F>, config: EditConfig) -> Self {
        let mut edit = Self {
            data: PhysicalData::new(map),
            surface,
            clipboard,
            config,
            listener: None,
            notify_lock: 0,
            pending_changes: 0,
            hook_lock: 0,
            modified: false,
            entry_selection: Selection::default(),
        };
        edit.load_surface();
        edit
    }

    /// Attach using the field table a host window provides.
    pub fn attach(
        surface: S,
        clipboard: C,
        provider: &dyn DescriptorProvider<F>,
        config: EditConfig,
    ) -> Self {
        Self::new(surface, clipboard, provider.field_map(), config)
    }

    /// Attach with initial content; the field map is taken from `logical`.
    pub fn with_logical(
        surface: S,
        clipboard: C,
        logical: &LogicalData<F>,
        config: EditConfig,
    ) -> Result<Self> {
        let mut edit = Self::new(surface, clipboard, logical.field_map().clone(), config);
        edit.data = PhysicalData::from_logical(logical)?;
        edit.load_surface();
        Ok(edit)
    }

    fn load_surface(&mut self) {
        self.surface.set_raw_text(&self.data.text());
        self.surface.empty_undo_buffer();
        self.entry_selection = self.surface.selection();
    }

    pub fn set_listener(&mut self, listener: Box<dyn EditListener>) {
        self.listener = Some(listener);
    }

    pub fn data(&self) -> &PhysicalData<F> {
        &self.data
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn clipboard(&self) -> &C {
        &self.clipboard
    }

    pub fn clipboard_mut(&mut self) -> &mut C {
        &mut self.clipboard
    }

    pub fn config(&self) -> &EditConfig {
        &self.config
    }

    // === Notification coalescing ===

    fn prologue(&mut self) {
        if self.notify_lock == 0 {
            self.pending_changes = 0;
            self.entry_selection = self.surface.selection();
        }
        self.notify_lock += 1;
    }

    fn epilogue(&mut self) {
        self.notify_lock -= 1;
        if self.notify_lock > 0 {
            return;
        }
        if self.pending_changes > 0 {
            self.pending_changes = 0;
            self.mark_modified();
            if let Some(listener) = self.listener.as_mut() {
                listener.content_changed();
            }
        }
        let selection = self.surface.selection();
        if selection != self.entry_selection {
            self.entry_selection = selection;
            if let Some(listener) = self.listener.as_mut() {
                listener.selection_changed(selection);
            }
        }
    }

    /// Run `op` as one operation: at most one change notification, sent when
    /// the outermost operation completes, also when `op` fails.
    fn run<T>(&mut self, op: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        self.prologue();
        let result = op(self);
        if self.notify_lock == 1 && self.hook_lock == 0 && result.is_ok() {
            debug_assert_eq!(
                self.surface.raw_text(),
                self.data.text(),
                "display surface out of sync with the model"
            );
        }
        self.epilogue();
        result
    }

    fn note_change(&mut self, changed: bool) {
        if changed {
            self.pending_changes += 1;
        }
    }

    fn mark_modified(&mut self) {
        if !self.modified {
            self.modified = true;
            if let Some(listener) = self.listener.as_mut() {
                listener.modified_changed(true);
            }
        }
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn set_modified(&mut self, modified: bool) {
        if self.modified != modified {
            self.modified = modified;
            if let Some(listener) = self.listener.as_mut() {
                listener.modified_changed(modified);
            }
        }
    }

    // === Hook lock ===

    /// While locked, events go straight to the surface's default handling.
    pub fn lock_hook(&mut self) {
        self.hook_lock += 1;
    }

    pub fn unlock_hook(&mut self) {
        self.hook_lock = self.hook_lock.saturating_sub(1);
    }

    pub fn is_hook_locked(&self) -> bool {
        self.hook_lock > 0
    }

    // === Default handling ===

    fn default_key_down(&mut self, key: Key, modifiers: Modifiers) {
        let changed = self.surface.default_key_down(key, modifiers);
        self.note_change(changed);
    }

    fn default_char(&mut self, ch: char) {
        let changed = self.surface.default_char(ch);
        self.note_change(changed);
    }

    fn default_mouse_down(&mut self, point: Point, buttons: MouseButtons) {
        let changed = self.surface.default_mouse_down(point, buttons);
        self.note_change(changed);
    }

    fn default_mouse_move(&mut self, point: Point, buttons: MouseButtons) {
        let changed = self.surface.default_mouse_move(point, buttons);
        self.note_change(changed);
    }

    fn push_text_to_surface(&mut self) {
        let changed = self.surface.set_raw_text(&self.data.text());
        self.note_change(changed);
    }

    fn caret(&self) -> usize {
        self.surface.selection().caret_char()
    }

    fn step(&self, steps: &mut usize, operation: &'static str) -> Result<()> {
        *steps += 1;
        if *steps > self.config.replay_limit {
            tracing::warn!(operation, limit = self.config.replay_limit, "replay diverged");
            return Err(SubstError::ReplayDiverged {
                operation,
                limit: self.config.replay_limit,
            });
        }
        Ok(())
    }

    /// Reset the surface to the model after it drifted away.
    fn resync_surface(&mut self, caret: usize) {
        tracing::warn!(caret, "display surface diverged from the model, reloading it");
        self.push_text_to_surface();
        self.surface.set_selection(Selection::caret(caret));
        self.surface.empty_undo_buffer();
    }

    // === Event dispatch ===

    /// Handle one low-level event.
    pub fn handle(&mut self, event: EditEvent) -> Result<Dispatch> {
        tracing::trace!(?event, locked = self.is_hook_locked(), "dispatch");
        self.run(|this| {
            if this.is_hook_locked() {
                this.forward(event);
                return Ok(Dispatch::Forwarded);
            }
            this.dispatch(event)
        })
    }

    fn forward(&mut self, event: EditEvent) {
        match event {
            EditEvent::KeyDown { key, modifiers } => self.default_key_down(key, modifiers),
            EditEvent::Char(ch) => self.default_char(ch),
            EditEvent::MouseDown { point, buttons } => self.default_mouse_down(point, buttons),
            EditEvent::MouseMove { point, buttons } => self.default_mouse_move(point, buttons),
            // No default handling in the surface contract.
            EditEvent::DoubleClick { .. } | EditEvent::Cut | EditEvent::Copy | EditEvent::Paste => {}
        }
    }

    fn dispatch(&mut self, event: EditEvent) -> Result<Dispatch> {
        match event {
            EditEvent::KeyDown { key, modifiers } if key.is_horizontal() => {
                self.move_caret_horizontal(key, modifiers)
            }
            EditEvent::KeyDown { key, modifiers } if key.is_vertical() => {
                self.move_caret_vertical(key, modifiers)
            }
            EditEvent::KeyDown {
                key: Key::Delete,
                modifiers,
            } => self.on_delete_key(modifiers),
            EditEvent::KeyDown { key, modifiers } => {
                self.default_key_down(key, modifiers);
                Ok(Dispatch::Forwarded)
            }
            EditEvent::Char(ch) => self.on_char(ch),
            EditEvent::MouseDown { point, buttons } => self.on_mouse_down(point, buttons),
            EditEvent::MouseMove { point, buttons } => self.on_mouse_move(point, buttons),
            EditEvent::DoubleClick { .. } => Ok(Dispatch::Handled),
            EditEvent::Cut => self.copy_selection(true),
            EditEvent::Copy => self.copy_selection(false),
            EditEvent::Paste => self.paste_clipboard(),
        }
    }

    // === Caret movement ===

    fn move_caret_horizontal(&mut self, key: Key, modifiers: Modifiers) -> Result<Dispatch> {
        let modifiers = modifiers.without_ctrl();
        self.default_key_down(key, modifiers);
        let mut steps = 0;
        while self.data.find_field_containing(self.caret()).is_some() {
            self.step(&mut steps, "horizontal caret move")?;
            self.default_key_down(key, modifiers);
        }
        Ok(Dispatch::Handled)
    }

    fn move_caret_vertical(&mut self, key: Key, modifiers: Modifiers) -> Result<Dispatch> {
        let modifiers = modifiers.without_ctrl();
        self.default_key_down(key, modifiers);

        let mut current = self.caret();
        if self.data.find_field_containing(current).is_some() {
            let (direction, substitute) = match key {
                Key::ArrowUp | Key::PageUp => (FindDirection::Backward, Key::ArrowLeft),
                _ => (FindDirection::Forward, Key::ArrowRight),
            };
            let goal = self.data.find_pos_outside_field(current, direction);
            tracing::debug!(current, goal, "walking caret out of a field");
            let mut steps = 0;
            while current != goal {
                self.step(&mut steps, "vertical caret move")?;
                self.default_key_down(substitute, modifiers);
                current = self.caret();
            }
        }
        Ok(Dispatch::Handled)
    }

    // === Deletion ===

    fn on_delete_key(&mut self, modifiers: Modifiers) -> Result<Dispatch> {
        let selection = self.surface.selection();
        if selection.is_sel() {
            self.delete_selection(selection, Collapse::Delete)?;
        } else {
            self.delete_forward(selection, modifiers)?;
        }
        Ok(Dispatch::Handled)
    }

    /// Delete the selection from the model, then let the surface collapse its
    /// own selection with a single backspace or delete.
    fn delete_selection(&mut self, selection: Selection, via: Collapse) -> Result<()> {
        let range = selection.to_range(self.data.len());
        let start = self
            .data
            .find_pos_outside_field(range.start, FindDirection::Backward);
        let end = self
            .data
            .find_pos_outside_field(range.end, FindDirection::Forward);
        self.data.delete_range(range.start, range.end)?;
        if via == Collapse::Delete {
            self.default_key_down(Key::Delete, Modifiers::NONE);
        } else {
            self.default_char(BACKSPACE);
        }
        self.surface.empty_undo_buffer();
        // The model widened to whole fields; the surface only removed the selection.
        if start != range.start || end != range.end {
            self.resync_surface(start.min(self.data.len()));
        }
        Ok(())
    }

    fn delete_forward(&mut self, selection: Selection, modifiers: Modifiers) -> Result<()> {
        let modifiers = modifiers.without_ctrl();
        let caret = selection.caret_char();
        if caret >= self.data.len() {
            self.default_key_down(Key::Delete, modifiers);
            return Ok(());
        }

        let (end, replays) = match self.data.find_field_after(caret) {
            Some(field) if field.start() == caret => (field.end(), field.len()),
            _ => {
                let line_break = self.config.line_break.as_str();
                if !line_break.is_empty() && self.data.rope().matches_at(caret, line_break) {
                    (caret + self.config.line_break_len(), 1)
                } else {
                    (caret + 1, 1)
                }
            }
        };
        if replays > self.config.replay_limit {
            return Err(SubstError::ReplayDiverged {
                operation: "forward delete",
                limit: self.config.replay_limit,
            });
        }

        self.data.delete_range(caret, end)?;
        tracing::debug!(caret, end, replays, "replaying forward delete");
        for _ in 0..replays {
            self.default_key_down(Key::Delete, modifiers);
        }
        self.surface.empty_undo_buffer();
        Ok(())
    }

    fn delete_backward(&mut self, selection: Selection) -> Result<()> {
        let caret = selection.caret_char();
        if caret == 0 {
            self.default_char(BACKSPACE);
            self.surface.empty_undo_buffer();
            return Ok(());
        }

        let line_break = self.config.line_break.as_str();
        let break_len = self.config.line_break_len();
        let start = match self.data.find_field_before(caret) {
            Some(field) if field.end() == caret => field.start(),
            _ if break_len > 0
                && caret >= break_len
                && self.data.rope().matches_at(caret - break_len, line_break) =>
            {
                caret - break_len
            }
            _ => caret - 1,
        };

        self.data.delete_range(start, caret)?;
        tracing::debug!(start, caret, "replaying backspace");
        let mut steps = 0;
        loop {
            self.default_char(BACKSPACE);
            if self.surface.selection().start == start {
                break;
            }
            self.step(&mut steps, "backspace")?;
        }
        self.surface.empty_undo_buffer();
        Ok(())
    }

    // === Character input ===

    fn on_char(&mut self, ch: char) -> Result<Dispatch> {
        let selection = self.surface.selection();
        match CharInput::classify(ch) {
            CharInput::SelectAll => {
                self.surface.set_selection(Selection::all());
                Ok(Dispatch::Handled)
            }
            CharInput::Copy => self.copy_selection(false),
            CharInput::Cut => self.copy_selection(true),
            CharInput::Paste => self.paste_clipboard(),
            CharInput::Backspace => {
                if selection.is_sel() {
                    self.delete_selection(selection, Collapse::Backspace)?;
                } else {
                    self.delete_backward(selection)?;
                }
                Ok(Dispatch::Handled)
            }
            CharInput::Control(c) if selection.is_sel() => {
                self.replace_selection_by_default(c)?;
                Ok(Dispatch::Handled)
            }
            CharInput::Control(c) | CharInput::Printable(c) => {
                if selection.is_sel() {
                    self.delete_selection(selection, Collapse::Backspace)?;
                }
                let caret = self.caret();
                self.insert_char(caret, c)?;
                Ok(Dispatch::Handled)
            }
        }
    }

    /// Let the surface handle a control character over a selection, then
    /// bring the model along with whatever changed.
    fn replace_selection_by_default(&mut self, ch: char) -> Result<()> {
        let old = self.surface.raw_text();
        self.default_char(ch);
        let new = self.surface.raw_text();
        if old != new {
            self.absorb_change(&old, &new)?;
            self.surface.empty_undo_buffer();
        }
        Ok(())
    }

    fn insert_char(&mut self, caret: usize, ch: char) -> Result<()> {
        let old = self.data.text();
        self.default_char(ch);
        let new = self.surface.raw_text();
        if old == new {
            return Ok(());
        }
        match insertion_at(&old, &new, caret) {
            Some(inserted) => self.data.insert_text(caret, &inserted)?,
            None => self.absorb_change(&old, &new)?,
        }
        self.surface.empty_undo_buffer();
        Ok(())
    }

    /// Apply the difference between two surface texts to the model.
    fn absorb_change(&mut self, old: &str, new: &str) -> Result<()> {
        let (start, old_end, new_end) = diff_span(old, new);
        let at = self.data.find_pos_outside_field(start, FindDirection::Backward);
        if old_end > start {
            self.data.delete_range(start, old_end)?;
        }
        let inserted: String = new.chars().skip(start).take(new_end - start).collect();
        if !inserted.is_empty() {
            self.data.insert_text(at, &inserted)?;
        }
        if self.data.text() != new {
            let caret = (at + inserted.chars().count()).min(self.data.len());
            self.resync_surface(caret);
        }
        Ok(())
    }

    // === Mouse ===

    /// Char index under `point`.
    fn char_index_at(&self, point: Point) -> Option<usize> {
        let hit = self.surface.hit_test(point)?;
        self.line_col_to_char(hit.line, hit.column)
    }

    fn snapped_point(&self, point: Point, index: usize) -> Point {
        let snapped = self.data.find_pos_outside_field(index, FindDirection::Closer);
        if snapped == index {
            return point;
        }
        tracing::trace!(index, snapped, "snapping pointer out of a field");
        self.surface
            .position_from_char_index(snapped)
            .unwrap_or(point)
    }

    fn on_mouse_down(&mut self, point: Point, buttons: MouseButtons) -> Result<Dispatch> {
        match self.char_index_at(point) {
            Some(index) if index <= self.data.len() => {
                let point = self.snapped_point(point, index);
                self.default_mouse_down(point, buttons);
            }
            _ => {}
        }
        Ok(Dispatch::Handled)
    }

    fn on_mouse_move(&mut self, point: Point, buttons: MouseButtons) -> Result<Dispatch> {
        if !buttons.left {
            self.default_mouse_move(point, buttons);
            return Ok(Dispatch::Forwarded);
        }
        if let Some(index) = self.char_index_at(point) {
            let point = self.snapped_point(point, index.min(self.data.len()));
            self.default_mouse_move(point, buttons);
        }
        Ok(Dispatch::Handled)
    }

    // === Clipboard ===

    fn copy_selection(&mut self, cut: bool) -> Result<Dispatch> {
        let selection = self.surface.selection();
        if !selection.is_sel() {
            return Ok(Dispatch::Handled);
        }
        let plain = self.data.export_selection(&selection).plain_text()?;
        tracing::debug!(len = plain.len(), cut, "copying selection");
        if !self.clipboard.set_text(&plain) {
            tracing::warn!(len = plain.len(), cut, "clipboard rejected text, selection kept");
            return Ok(Dispatch::Handled);
        }
        if self.config.copy_locale_text
            && !self.clipboard.set_locale_text(&plain, self.config.locale)
        {
            tracing::warn!(locale = self.config.locale, "clipboard rejected locale text");
        }
        if cut {
            self.on_delete_key(Modifiers::NONE)?;
        }
        Ok(Dispatch::Handled)
    }

    fn paste_clipboard(&mut self) -> Result<Dispatch> {
        let Some(text) = self
            .clipboard
            .text()
            .or_else(|| self.clipboard.unicode_text())
        else {
            return Ok(Dispatch::Handled);
        };
        tracing::debug!(len = text.len(), "pasting");

        let mut fragment = LogicalData::new(self.data.field_map().clone());
        fragment.assign_plain_text(&text);

        let mut selection = self.surface.selection();
        if selection.is_sel() {
            self.delete_selection(selection, Collapse::Backspace)?;
            selection = self.surface.selection();
        }
        let start = selection.to_range(self.data.len()).start;
        let inserted = self.data.insert_structured(start, &fragment)?;

        self.push_text_to_surface();
        self.surface.set_selection(Selection::caret(start + inserted));
        self.surface.scroll_caret();
        self.surface.empty_undo_buffer();
        Ok(Dispatch::Handled)
    }

    pub fn can_cut(&self) -> bool {
        self.surface.selection().is_sel()
    }

    pub fn can_copy(&self) -> bool {
        self.surface.selection().is_sel()
    }

    pub fn can_paste(&self) -> bool {
        self.clipboard.has_text()
    }

    pub fn cut(&mut self) -> Result<()> {
        self.handle(EditEvent::Cut).map(|_| ())
    }

    pub fn copy(&mut self) -> Result<()> {
        self.handle(EditEvent::Copy).map(|_| ())
    }

    pub fn paste(&mut self) -> Result<()> {
        self.handle(EditEvent::Paste).map(|_| ())
    }

    // === Content ===

    /// Push the physical text to the surface.
    pub fn initialize_text(&mut self) {
        self.prologue();
        self.push_text_to_surface();
        self.surface.empty_undo_buffer();
        self.epilogue();
    }

    pub fn assign(&mut self, logical: &LogicalData<F>) -> Result<()> {
        self.data.assign_logical(logical)?;
        self.initialize_text();
        Ok(())
    }

    pub fn assign_plain_text(&mut self, text: &str) -> Result<()> {
        self.data.assign_plain_text(text)?;
        self.initialize_text();
        Ok(())
    }

    pub fn plain_text(&self) -> Result<String> {
        self.data.plain_text()
    }

    pub fn delete_contents(&mut self) {
        self.data.clear();
        self.initialize_text();
    }

    /// Insert a field at the caret and put the caret after it.
    pub fn insert_field(&mut self, id: F) -> Result<PhysicalField<F>> {
        self.run(|this| {
            let field = this.data.insert_field(this.caret(), id)?;
            this.push_text_to_surface();
            this.surface.set_selection(Selection::caret(field.end()));
            this.surface.scroll_caret();
            this.surface.empty_undo_buffer();
            Ok(field)
        })
    }

    // === Selection and geometry ===

    pub fn selection(&self) -> Selection {
        self.surface.selection()
    }

    /// Select a range, with both ends moved out of fields.
    pub fn set_selection(&mut self, selection: Selection) {
        let selection = if selection.is_all() {
            selection
        } else {
            let snap = |p: usize| {
                self.data
                    .find_pos_outside_field(p.min(self.data.len()), FindDirection::Closer)
            };
            Selection {
                start: snap(selection.start),
                end: snap(selection.end),
                caret_at_end: selection.caret_at_end,
            }
        };
        self.prologue();
        self.surface.set_selection(selection);
        self.epilogue();
    }

    pub fn find_pos_outside_field(&self, pos: usize, direction: FindDirection) -> usize {
        self.data.find_pos_outside_field(pos, direction)
    }

    /// Char offset of `column` on `line`.
    pub fn line_col_to_char(&self, line: usize, column: usize) -> Option<usize> {
        self.surface.line_start(line).map(|start| start + column)
    }
}

/// The text inserted into `old` at `caret` to give `new`, if that is what
/// happened.
fn insertion_at(old: &str, new: &str, caret: usize) -> Option<String> {
    let old: Vec<char> = old.chars().collect();
    let new: Vec<char> = new.chars().collect();
    if new.len() <= old.len() || caret > old.len() {
        return None;
    }
    let n = new.len() - old.len();
    (new[..caret] == old[..caret] && new[caret + n..] == old[caret..])
        .then(|| new[caret..caret + n].iter().collect())
}

/// Changed span between two texts as `(start, old_end, new_end)`, from the
/// common prefix and suffix.
fn diff_span(old: &str, new: &str) -> (usize, usize, usize) {
    let old: Vec<char> = old.chars().collect();
    let new: Vec<char> = new.chars().collect();
    let prefix = old.iter().zip(&new).take_while(|(a, b)| a == b).count();
    let max_suffix = old.len().min(new.len()) - prefix;
    let suffix = old
        .iter()
        .rev()
        .zip(new.iter().rev())
        .take(max_suffix)
        .take_while(|(a, b)| a == b)
        .count();
    (prefix, old.len() - suffix, new.len() - suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insertion_at_caret() {
        assert_eq!(insertion_at("ab", "aXb", 1).as_deref(), Some("X"));
        assert_eq!(insertion_at("ab", "abXY", 2).as_deref(), Some("XY"));
        assert_eq!(insertion_at("ab", "Xab", 1), None);
        assert_eq!(insertion_at("ab", "a", 1), None);
        assert_eq!(insertion_at("aa", "aaa", 0).as_deref(), Some("a"));
    }

    #[test]
    fn test_diff_span() {
        assert_eq!(diff_span("abcdef", "abXef"), (2, 4, 3));
        assert_eq!(diff_span("abc", "abc"), (3, 3, 3));
        assert_eq!(diff_span("aa", "aaa"), (2, 2, 3));
        assert_eq!(diff_span("año", "ao"), (1, 2, 1));
        assert_eq!(diff_span("", "xy"), (0, 0, 2));
    }
}
