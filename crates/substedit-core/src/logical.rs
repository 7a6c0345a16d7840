//! Logical representation: plain text plus field markers at logical offsets.
//!
//! A field occupies no room in logical space. Its marker only records where
//! the field sits between two characters of the logical text.

use smol_str::SmolStr;

use crate::error::{Result, SubstError};
use crate::field::{FieldDescriptor, FieldId, FieldMap};
use crate::text::{TextBuffer, TextRope};

/// XML entities in escape order. Unescaping walks this list backwards so the
/// ampersand is restored last.
const XML_ENTITIES: [(&str, &str); 5] = [
    ("&", "&amp;"),
    ("<", "&lt;"),
    (">", "&gt;"),
    ("\"", "&quot;"),
    ("'", "&apos;"),
];

/// A field's identity and its logical position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FieldMarker<F> {
    pub(crate) id: F,
    pub(crate) pos: usize,
}

impl<F: FieldId> FieldMarker<F> {
    pub fn new(id: F, pos: usize) -> Self {
        Self { id, pos }
    }

    pub fn id(&self) -> F {
        self.id
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn set_pos(&mut self, pos: usize) {
        self.pos = pos;
    }

    /// Move by `delta`, saturating at zero.
    pub fn shift(&mut self, delta: isize) {
        self.pos = self.pos.saturating_add_signed(delta);
    }
}

/// Logical text with its field markers.
///
/// Marker order is the order markers were added; rendering always walks them
/// by ascending position. The field map is shared and never copied by
/// [`LogicalData::assign`].
#[derive(Clone, Debug)]
pub struct LogicalData<F: FieldId> {
    pub(crate) map: FieldMap<F>,
    pub(crate) text: TextRope,
    pub(crate) markers: Vec<FieldMarker<F>>,
}

impl<F: FieldId> LogicalData<F> {
    pub fn new(map: FieldMap<F>) -> Self {
        Self {
            map,
            text: TextRope::new(),
            markers: Vec::new(),
        }
    }

    /// Plain logical text without fields.
    pub fn with_text(map: FieldMap<F>, text: &str) -> Self {
        Self {
            map,
            text: TextRope::from_str(text),
            markers: Vec::new(),
        }
    }

    /// Logical text with markers, validated against `map`.
    pub fn from_parts(
        map: FieldMap<F>,
        text: &str,
        markers: impl IntoIterator<Item = FieldMarker<F>>,
    ) -> Result<Self> {
        let data = Self {
            map,
            text: TextRope::from_str(text),
            markers: markers.into_iter().collect(),
        };
        data.validate_markers()?;
        Ok(data)
    }

    pub(crate) fn validate_markers(&self) -> Result<()> {
        let len = self.text.len_chars();
        for m in &self.markers {
            self.map.require(m.id)?;
            if m.pos > len {
                return Err(SubstError::PositionOutOfRange { pos: m.pos, len });
            }
        }
        Ok(())
    }

    /// The logical string.
    pub fn text(&self) -> String {
        self.text.to_string()
    }

    pub fn rope(&self) -> &TextRope {
        &self.text
    }

    pub fn text_len(&self) -> usize {
        self.text.len_chars()
    }

    pub fn markers(&self) -> &[FieldMarker<F>] {
        &self.markers
    }

    pub fn field_map(&self) -> &FieldMap<F> {
        &self.map
    }

    pub fn set_field_map(&mut self, map: FieldMap<F>) {
        self.map = map;
    }

    pub fn find_descriptor(&self, id: F) -> Option<&FieldDescriptor<F>> {
        self.map.get(id)
    }

    /// Index of the first marker equal to `marker`.
    pub fn marker_index(&self, marker: &FieldMarker<F>) -> Option<usize> {
        self.markers.iter().position(|m| m == marker)
    }

    /// Append a marker for `id` at position 0. The caller sets its position.
    pub fn append_marker(&mut self, id: F) -> Result<&mut FieldMarker<F>> {
        self.map.require(id)?;
        self.markers.push(FieldMarker::new(id, 0));
        let last = self.markers.len() - 1;
        Ok(&mut self.markers[last])
    }

    /// Insert before index `before`; `None` or an index past the end appends.
    pub fn insert_marker(&mut self, before: Option<usize>, marker: FieldMarker<F>) -> Result<()> {
        self.map.require(marker.id)?;
        match before {
            Some(index) if index < self.markers.len() => self.markers.insert(index, marker),
            _ => self.markers.push(marker),
        }
        Ok(())
    }

    /// Remove the first marker equal to `marker`.
    pub fn remove_marker(&mut self, marker: &FieldMarker<F>) -> bool {
        match self.marker_index(marker) {
            Some(index) => {
                self.markers.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn remove_marker_at(&mut self, index: usize) -> Option<FieldMarker<F>> {
        (index < self.markers.len()).then(|| self.markers.remove(index))
    }

    /// Copy text and markers from `other`, keeping this instance's field map.
    pub fn assign(&mut self, other: &LogicalData<F>) {
        self.text = other.text.clone();
        self.markers = other.markers.clone();
    }

    /// Replace the whole content by plain logical text without fields.
    pub fn assign_text(&mut self, text: &str) {
        self.markers.clear();
        self.text = TextRope::from_str(text);
    }

    pub fn clear(&mut self) {
        self.text = TextRope::new();
        self.markers.clear();
    }

    pub(crate) fn sort_markers(&mut self) {
        self.markers.sort_by_key(|m| m.pos);
    }

    /// Parse plain text: extract literal field display texts, then unescape
    /// the XML entities.
    ///
    /// At each position the descriptors are tried in declaration order. A
    /// match is cut out and becomes a marker, and scanning resumes at the
    /// same position.
    pub fn assign_plain_text(&mut self, text: &str) {
        self.clear();
        self.text = TextRope::from_str(text);

        let mut pos = 0;
        while pos < self.text.len_chars() {
            let hit = self
                .map
                .iter()
                .find(|d| self.text.matches_at(pos, &d.text))
                .map(|d| (d.id, d.len()));
            match hit {
                Some((id, len)) => {
                    self.text.delete(pos..pos + len);
                    self.markers.push(FieldMarker::new(id, pos));
                }
                None => pos += 1,
            }
        }

        for (plain, entity) in XML_ENTITIES.iter().rev() {
            self.replace_all(entity, plain);
        }
        tracing::trace!(
            len = self.text.len_chars(),
            fields = self.markers.len(),
            "parsed plain text"
        );
    }

    /// Export as plain text: XML-escape the logical text, then render the
    /// fields' display text in place. The live instance is left untouched.
    pub fn plain_text(&self) -> Result<String> {
        let mut escaped = self.clone();
        for (plain, entity) in XML_ENTITIES {
            escaped.replace_all(plain, entity);
        }
        escaped.render_physical()
    }

    /// Render the physical string using each field's display text.
    pub fn render_physical(&self) -> Result<String> {
        self.render_physical_with(|d| d.text.clone())
    }

    /// Render the physical string, asking `replacement` for the text of each
    /// field. Used for live previews that show values instead of names.
    pub fn render_physical_with<R: AsRef<str>>(
        &self,
        mut replacement: impl FnMut(&FieldDescriptor<F>) -> R,
    ) -> Result<String> {
        let len = self.text.len_chars();
        let mut order: Vec<&FieldMarker<F>> = self.markers.iter().collect();
        order.sort_by_key(|m| m.pos);

        let mut out = String::with_capacity(self.text.len_bytes());
        let mut copied = 0;
        for marker in order {
            let descriptor = self.map.require(marker.id)?;
            if marker.pos > len {
                return Err(SubstError::PositionOutOfRange {
                    pos: marker.pos,
                    len,
                });
            }
            push_slice(&mut out, &self.text, copied, marker.pos);
            out.push_str(replacement(descriptor).as_ref());
            copied = marker.pos;
        }
        push_slice(&mut out, &self.text, copied, len);
        Ok(out)
    }

    /// Replace `replaced_len` chars at `start` by `new_text`.
    ///
    /// Markers after `start` move by the length difference. A marker that
    /// sat inside the replaced span ends up right after the new text.
    pub fn replace_text_range(
        &mut self,
        start: usize,
        replaced_len: usize,
        new_text: &str,
    ) -> Result<()> {
        let len = self.text.len_chars();
        if start > len || replaced_len > len - start {
            tracing::warn!(start, replaced_len, len, "rejected logical replace");
            return Err(SubstError::InvalidRange {
                start,
                end: start.saturating_add(replaced_len),
                len,
            });
        }
        self.splice(start, replaced_len, new_text);
        Ok(())
    }

    fn splice(&mut self, start: usize, replaced_len: usize, new_text: &str) {
        let new_len = new_text.chars().count();
        let end = start + replaced_len;
        self.text.replace(start..end, new_text);
        for m in &mut self.markers {
            if m.pos <= start {
                continue;
            }
            m.pos = if m.pos < end {
                start + new_len
            } else {
                m.pos - replaced_len + new_len
            };
        }
    }

    /// Replace every occurrence of `old` by `new`, scanning left to right.
    ///
    /// Scanning resumes after the inserted text, so a replacement is never
    /// rescanned. A match with a marker strictly inside it is left alone.
    pub fn replace_all(&mut self, old: &str, new: &str) -> usize {
        if old.is_empty() {
            tracing::warn!("replace_all with an empty pattern");
            return 0;
        }
        let old_len = old.chars().count();
        let new_len = new.chars().count();
        let mut from = 0;
        let mut count = 0;
        while let Some(found) = self.text.find(old, from) {
            let end = found + old_len;
            if self.markers.iter().any(|m| m.pos > found && m.pos < end) {
                from = found + 1;
                continue;
            }
            self.splice(found, old_len, new);
            from = found + new_len;
            count += 1;
        }
        count
    }

    /// Display text of the marker's field, if known.
    pub fn marker_text(&self, marker: &FieldMarker<F>) -> Option<SmolStr> {
        self.map.get(marker.id).map(|d| d.text.clone())
    }
}

fn push_slice(out: &mut String, text: &TextRope, start: usize, end: usize) {
    if start < end {
        for chunk in text.rope().slice(start..end).chunks() {
            out.push_str(chunk);
        }
    }
}

impl<F: FieldId> PartialEq for LogicalData<F> {
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text && self.markers == other.markers
    }
}

impl<F: FieldId> Eq for LogicalData<F> {}
