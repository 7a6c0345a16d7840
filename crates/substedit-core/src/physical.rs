//! Physical representation: the rendered string with field spans, kept in
//! lockstep with the logical data it was rendered from.
//!
//! Invariants held between public calls:
//! - `fields` and the logical markers have the same length, and the field at
//!   index `i` belongs to the marker at index `i`;
//! - fields are sorted by `start` and never overlap;
//! - each field spans exactly its descriptor's display text;
//! - the physical text equals the logical data rendered with display texts.
//!
//! Every mutator validates its arguments first and leaves the data untouched
//! when it returns an error.

use std::ops::Range;

use crate::error::{Result, SubstError};
use crate::field::{FieldId, FieldMap};
use crate::logical::{FieldMarker, LogicalData};
use crate::text::{TextBuffer, TextRope};
use crate::types::Selection;

/// The rendered span of one field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PhysicalField<F> {
    pub(crate) id: F,
    pub(crate) start: usize,
    pub(crate) end: usize,
}

impl<F: FieldId> PhysicalField<F> {
    pub fn new(id: F, start: usize, end: usize) -> Self {
        Self { id, start, end }
    }

    pub fn id(&self) -> F {
        self.id
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    /// Boundaries are not inside.
    pub fn contains_strictly(&self, pos: usize) -> bool {
        self.start < pos && pos < self.end
    }

    fn shift(&mut self, delta: isize) {
        self.start = self.start.saturating_add_signed(delta);
        self.end = self.end.saturating_add_signed(delta);
    }
}

/// Which boundary to pick when a position falls inside a field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum FindDirection {
    /// Nearer boundary; a tie goes to the start.
    #[default]
    Closer,
    Backward,
    Forward,
}

/// Physical text and field spans together with the logical data they render.
#[derive(Clone, Debug)]
pub struct PhysicalData<F: FieldId> {
    logical: LogicalData<F>,
    text: TextRope,
    fields: Vec<PhysicalField<F>>,
}

impl<F: FieldId> PhysicalData<F> {
    pub fn new(map: FieldMap<F>) -> Self {
        Self {
            logical: LogicalData::new(map),
            text: TextRope::new(),
            fields: Vec::new(),
        }
    }

    /// Build physical data from logical data, field map included.
    pub fn from_logical(logical: &LogicalData<F>) -> Result<Self> {
        Self::build(logical.clone())
    }

    fn build(mut logical: LogicalData<F>) -> Result<Self> {
        logical.validate_markers()?;
        logical.sort_markers();

        let mut fields = Vec::with_capacity(logical.markers.len());
        let mut rendered = 0;
        for m in &logical.markers {
            let len = logical.map.require(m.id)?.len();
            let start = m.pos + rendered;
            fields.push(PhysicalField::new(m.id, start, start + len));
            rendered += len;
        }
        let text = TextRope::from(logical.render_physical()?);

        let data = Self {
            logical,
            text,
            fields,
        };
        data.debug_verify();
        Ok(data)
    }

    /// Replace the content by a copy of `source`'s text and markers. This
    /// instance keeps its own field map.
    pub fn assign_logical(&mut self, source: &LogicalData<F>) -> Result<()> {
        let mut logical = LogicalData::new(self.logical.map.clone());
        logical.assign(source);
        *self = Self::build(logical)?;
        tracing::trace!(len = self.len(), fields = self.fields.len(), "assigned logical data");
        Ok(())
    }

    /// Replace the content by parsed plain text.
    pub fn assign_plain_text(&mut self, text: &str) -> Result<()> {
        let mut logical = LogicalData::new(self.logical.map.clone());
        logical.assign_plain_text(text);
        *self = Self::build(logical)?;
        Ok(())
    }

    /// Swap the field map and re-render the physical side.
    pub fn set_field_map(&mut self, map: FieldMap<F>) -> Result<()> {
        let mut logical = self.logical.clone();
        logical.set_field_map(map);
        *self = Self::build(logical)?;
        Ok(())
    }

    pub fn clear(&mut self) {
        self.logical.clear();
        self.text = TextRope::new();
        self.fields.clear();
    }

    /// The physical string.
    pub fn text(&self) -> String {
        self.text.to_string()
    }

    pub fn rope(&self) -> &TextRope {
        &self.text
    }

    /// Physical length in chars.
    pub fn len(&self) -> usize {
        self.text.len_chars()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn fields(&self) -> &[PhysicalField<F>] {
        &self.fields
    }

    pub fn logical(&self) -> &LogicalData<F> {
        &self.logical
    }

    pub fn field_map(&self) -> &FieldMap<F> {
        &self.logical.map
    }

    /// Plain-text export of the logical side.
    pub fn plain_text(&self) -> Result<String> {
        self.logical.plain_text()
    }

    /// Map a physical offset to logical space by discounting every field
    /// that ends at or before it.
    pub fn physical_to_logical(&self, pos: usize) -> usize {
        let before = self.fields.partition_point(|f| f.end <= pos);
        let rendered: usize = self.fields[..before].iter().map(PhysicalField::len).sum();
        pos - rendered
    }

    /// The physical string with every field span cut out.
    pub fn logical_text_from_physical(&self) -> String {
        let mut out = String::with_capacity(self.text.len_bytes());
        let mut done = 0;
        for f in &self.fields {
            if done < f.start {
                for chunk in self.text.rope().slice(done..f.start).chunks() {
                    out.push_str(chunk);
                }
            }
            done = f.end;
        }
        if done < self.len() {
            for chunk in self.text.rope().slice(done..).chunks() {
                out.push_str(chunk);
            }
        }
        out
    }

    /// Field with `start < pos < end`.
    pub fn find_field_containing(&self, pos: usize) -> Option<&PhysicalField<F>> {
        let idx = self.fields.partition_point(|f| f.end <= pos);
        self.fields.get(idx).filter(|f| f.contains_strictly(pos))
    }

    /// Last field with `end <= pos`.
    pub fn find_field_before(&self, pos: usize) -> Option<&PhysicalField<F>> {
        let idx = self.fields.partition_point(|f| f.end <= pos);
        idx.checked_sub(1).map(|i| &self.fields[i])
    }

    /// First field with `start >= pos`.
    pub fn find_field_after(&self, pos: usize) -> Option<&PhysicalField<F>> {
        let idx = self.fields.partition_point(|f| f.start < pos);
        self.fields.get(idx)
    }

    /// Fields lying entirely within `[start, end]`.
    pub fn find_fields_between(&self, start: usize, end: usize) -> &[PhysicalField<F>] {
        let range = self.fields_between(start, end);
        &self.fields[range]
    }

    fn fields_between(&self, start: usize, end: usize) -> Range<usize> {
        let lo = self.fields.partition_point(|f| f.start < start);
        let hi = self.fields.partition_point(|f| f.end <= end);
        lo..hi.max(lo)
    }

    pub fn field_index(&self, field: &PhysicalField<F>) -> Option<usize> {
        let idx = self.fields.partition_point(|f| f.start < field.start);
        (self.fields.get(idx) == Some(field)).then_some(idx)
    }

    /// Move `pos` out of the field it is inside of, if any.
    pub fn find_pos_outside_field(&self, pos: usize, direction: FindDirection) -> usize {
        let Some(f) = self.find_field_containing(pos) else {
            return pos;
        };
        match direction {
            FindDirection::Backward => f.start,
            FindDirection::Forward => f.end,
            FindDirection::Closer if pos - f.start <= f.end - pos => f.start,
            FindDirection::Closer => f.end,
        }
    }

    fn check_insert_pos(&self, pos: usize) -> Result<()> {
        let len = self.len();
        if pos > len {
            tracing::warn!(pos, len, "insert position out of range");
            return Err(SubstError::PositionOutOfRange { pos, len });
        }
        if let Some(f) = self.find_field_containing(pos) {
            tracing::warn!(pos, start = f.start, end = f.end, "insert position inside a field");
            return Err(SubstError::InsideField {
                pos,
                start: f.start,
                end: f.end,
            });
        }
        Ok(())
    }

    /// Insert field `id` at `pos`, which must not be inside another field.
    pub fn insert_field(&mut self, pos: usize, id: F) -> Result<PhysicalField<F>> {
        let descriptor = self.logical.map.require(id)?.clone();
        self.check_insert_pos(pos)?;

        let len = descriptor.len();
        let idx = self.fields.partition_point(|f| f.start < pos);
        let logical_pos = self.physical_to_logical(pos);
        for f in &mut self.fields[idx..] {
            f.shift(len as isize);
        }
        let field = PhysicalField::new(id, pos, pos + len);
        self.fields.insert(idx, field);
        self.logical
            .markers
            .insert(idx, FieldMarker::new(id, logical_pos));
        self.text.insert(pos, &descriptor.text);

        tracing::trace!(?id, pos, len, "inserted field");
        self.debug_verify();
        Ok(field)
    }

    /// Delete a field and its marker.
    pub fn delete_field(&mut self, field: &PhysicalField<F>) -> Result<()> {
        let idx = self.field_index(field).ok_or(SubstError::InvalidRange {
            start: field.start,
            end: field.end,
            len: self.len(),
        })?;
        if self.logical.markers.get(idx).map(|m| m.id) != Some(field.id) {
            return Err(SubstError::Desynchronized(format!(
                "no marker paired with field {:?} at index {idx}",
                field.id
            )));
        }
        self.delete_field_at(idx);
        self.debug_verify();
        Ok(())
    }

    fn delete_field_at(&mut self, idx: usize) {
        let field = self.fields.remove(idx);
        self.logical.markers.remove(idx);
        for f in &mut self.fields[idx..] {
            f.shift(-(field.len() as isize));
        }
        self.text.delete(field.range());
        tracing::trace!(id = ?field.id, start = field.start, "deleted field");
    }

    /// Delete `[start, end)`. A boundary inside a field is widened to that
    /// field's edge, so fields are only ever deleted whole.
    ///
    /// Returns the requested length `end - start`, even when widening removed
    /// more. Callers that care compare the range with `find_pos_outside_field`.
    pub fn delete_range(&mut self, start: usize, end: usize) -> Result<usize> {
        let len = self.len();
        if start > end || end > len {
            tracing::warn!(start, end, len, "rejected range delete");
            return Err(SubstError::InvalidRange { start, end, len });
        }
        let requested = end - start;
        let start = self
            .find_field_containing(start)
            .map_or(start, |f| f.start);
        let end = self.find_field_containing(end).map_or(end, |f| f.end);

        let mut cur_end = end;
        loop {
            let between = self.fields_between(start, cur_end);
            if between.is_empty() {
                break;
            }
            let flen = self.fields[between.start].len();
            self.delete_field_at(between.start);
            cur_end -= flen;
        }

        let rem = cur_end - start;
        if rem > 0 {
            let idx = self.fields.partition_point(|f| f.start < start);
            let logical_start = self.physical_to_logical(start);
            self.text.delete(start..cur_end);
            self.logical.text.delete(logical_start..logical_start + rem);
            for f in &mut self.fields[idx..] {
                f.shift(-(rem as isize));
            }
            for m in &mut self.logical.markers[idx..] {
                m.shift(-(rem as isize));
            }
        }

        tracing::trace!(start, end, requested, "deleted range");
        self.debug_verify();
        Ok(requested)
    }

    /// Insert plain text at `pos`, which must not be inside a field.
    pub fn insert_text(&mut self, pos: usize, text: &str) -> Result<()> {
        self.check_insert_pos(pos)?;
        self.insert_text_unchecked(pos, text);
        self.debug_verify();
        Ok(())
    }

    fn insert_text_unchecked(&mut self, pos: usize, text: &str) {
        let n = text.chars().count();
        if n == 0 {
            return;
        }
        let idx = self.fields.partition_point(|f| f.start < pos);
        let logical_pos = self.physical_to_logical(pos);
        self.text.insert(pos, text);
        self.logical.text.insert(logical_pos, text);
        for f in &mut self.fields[idx..] {
            f.shift(n as isize);
        }
        for m in &mut self.logical.markers[idx..] {
            m.shift(n as isize);
        }
        tracing::trace!(pos, len = n, "inserted text");
    }

    /// Merge a logical fragment (text and its fields) at `pos`.
    ///
    /// Returns the physical length inserted.
    pub fn insert_structured(&mut self, pos: usize, source: &LogicalData<F>) -> Result<usize> {
        self.check_insert_pos(pos)?;
        let source_len = source.text_len();
        let mut markers = source.markers.clone();
        for m in &markers {
            self.logical.map.require(m.id)?;
            if m.pos > source_len {
                return Err(SubstError::PositionOutOfRange {
                    pos: m.pos,
                    len: source_len,
                });
            }
        }
        markers.sort_by_key(|m| m.pos);

        self.insert_text_unchecked(pos, &source.text());
        let mut inserted = source_len;
        for m in markers {
            let field = self.insert_field(pos + m.pos + (inserted - source_len), m.id)?;
            inserted += field.len();
        }
        tracing::trace!(pos, inserted, "inserted structured data");
        self.debug_verify();
        Ok(inserted)
    }

    /// Standalone copy of the whole document.
    pub fn export_all(&self) -> LogicalData<F> {
        self.logical.clone()
    }

    /// Standalone copy of the selected part, field positions relative to the
    /// selection start. Fields only partly selected are left out.
    pub fn export_selection(&self, selection: &Selection) -> LogicalData<F> {
        if selection.is_all() {
            return self.export_all();
        }
        let mut exported = LogicalData::new(self.logical.map.clone());
        if !selection.is_sel() {
            return exported;
        }
        let range = selection.to_range(self.len());
        let start = self.find_pos_outside_field(range.start, FindDirection::Forward);
        let end = self.find_pos_outside_field(range.end, FindDirection::Backward);
        if start >= end {
            return exported;
        }

        let logical_start = self.physical_to_logical(start);
        let logical_end = self.physical_to_logical(end);
        exported.text = TextRope::from_str(
            &self
                .logical
                .text
                .slice(logical_start..logical_end)
                .unwrap_or_default(),
        );
        exported.markers = self.logical.markers[self.fields_between(start, end)]
            .iter()
            .map(|m| FieldMarker::new(m.id, m.pos - logical_start))
            .collect();
        exported
    }

    /// Verify every invariant of the dual representation.
    pub fn check_consistency(&self) -> Result<()> {
        let desync = |msg: String| Err(SubstError::Desynchronized(msg));
        let markers = &self.logical.markers;
        if self.fields.len() != markers.len() {
            return desync(format!(
                "{} fields but {} markers",
                self.fields.len(),
                markers.len()
            ));
        }

        let mut prev_end = 0;
        let mut rendered = 0;
        for (i, (f, m)) in self.fields.iter().zip(markers).enumerate() {
            if f.id != m.id {
                return desync(format!("field {i} is {:?} but its marker is {:?}", f.id, m.id));
            }
            let len = self.logical.map.require(f.id)?.len();
            if f.len() != len {
                return desync(format!("field {i} spans {} chars, expected {len}", f.len()));
            }
            if f.start < prev_end {
                return desync(format!("field {i} at {} overlaps or is out of order", f.start));
            }
            if m.pos + rendered != f.start {
                return desync(format!(
                    "field {i} starts at {} but its marker maps to {}",
                    f.start,
                    m.pos + rendered
                ));
            }
            prev_end = f.end;
            rendered += len;
        }
        if prev_end > self.len() {
            return desync(format!("field ends at {prev_end} past the text end"));
        }
        if self.logical.render_physical()? != self.text.to_string() {
            return desync("physical text differs from the rendered logical data".to_string());
        }
        Ok(())
    }

    fn debug_verify(&self) {
        debug_assert!(
            self.check_consistency().is_ok(),
            "{:?}",
            self.check_consistency()
        );
    }
}
