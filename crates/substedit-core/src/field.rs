//! Field identifiers and the descriptor table that maps them to display text.

use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;

use smol_str::SmolStr;

use crate::config::FieldMapConfig;
use crate::error::{Result, SubstError};

/// Symbolic identifier of a substitution field.
///
/// `INVALID` is the sentinel that terminates descriptor tables; it never names
/// a real field. Hosts implement this for their own enums.
pub trait FieldId: Copy + Eq + Hash + Debug + 'static {
    /// The sentinel value.
    const INVALID: Self;

    /// Widen to the archive representation.
    fn to_raw(self) -> u64;

    /// Narrow from the archive representation. None if it does not fit.
    fn from_raw(raw: u64) -> Option<Self>;

    fn is_valid(self) -> bool {
        self != Self::INVALID
    }
}

macro_rules! impl_field_id {
    ($($ty:ty),*) => {
        $(
            impl FieldId for $ty {
                const INVALID: Self = 0;

                fn to_raw(self) -> u64 {
                    self as u64
                }

                fn from_raw(raw: u64) -> Option<Self> {
                    <$ty>::try_from(raw).ok()
                }
            }
        )*
    };
}

impl_field_id!(u8, u16, u32, u64, usize);

/// A field id together with the text displayed in its place.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldDescriptor<F> {
    pub id: F,
    pub text: SmolStr,
}

impl<F: FieldId> FieldDescriptor<F> {
    pub fn new(id: F, text: impl Into<SmolStr>) -> Self {
        Self {
            id,
            text: text.into(),
        }
    }

    /// Display length in chars.
    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Immutable, shared table of field descriptors.
///
/// Cloning shares the table. Lookups scan in declaration order and the first
/// matching descriptor wins.
#[derive(Clone, Debug)]
pub struct FieldMap<F> {
    descriptors: Arc<[FieldDescriptor<F>]>,
}

impl<F: FieldId> Default for FieldMap<F> {
    fn default() -> Self {
        Self {
            descriptors: Arc::from(Vec::new()),
        }
    }
}

impl<F: FieldId> FieldMap<F> {
    /// Build a map, rejecting sentinel ids and empty display texts.
    pub fn new(descriptors: impl IntoIterator<Item = FieldDescriptor<F>>) -> Result<Self> {
        let descriptors: Vec<_> = descriptors.into_iter().collect();
        for d in &descriptors {
            if !d.id.is_valid() {
                return Err(SubstError::InvalidFieldId);
            }
            if d.is_empty() {
                return Err(SubstError::EmptyDisplayText { id: d.id.to_raw() });
            }
        }
        Ok(Self {
            descriptors: descriptors.into(),
        })
    }

    /// Build a map from a sentinel-terminated table.
    ///
    /// Entries after the first sentinel are ignored. A table without a
    /// sentinel is read in full.
    pub fn from_terminated(table: &[(F, &str)]) -> Result<Self> {
        Self::new(
            table
                .iter()
                .take_while(|(id, _)| id.is_valid())
                .map(|(id, text)| FieldDescriptor::new(*id, *text)),
        )
    }

    /// Build a map from its serde configuration form.
    pub fn from_config(config: &FieldMapConfig) -> Result<Self> {
        let mut descriptors = Vec::with_capacity(config.fields.len());
        for entry in &config.fields {
            let id = F::from_raw(entry.id).ok_or(SubstError::UnknownField { id: entry.id })?;
            descriptors.push(FieldDescriptor::new(id, entry.text.as_str()));
        }
        Self::new(descriptors)
    }

    /// Find the descriptor of `id`.
    pub fn get(&self, id: F) -> Option<&FieldDescriptor<F>> {
        if !id.is_valid() {
            tracing::warn!(?id, "field map lookup with the sentinel id");
            return None;
        }
        self.descriptors.iter().find(|d| d.id == id)
    }

    /// Like `get`, but a miss is an error.
    pub fn require(&self, id: F) -> Result<&FieldDescriptor<F>> {
        if !id.is_valid() {
            return Err(SubstError::InvalidFieldId);
        }
        self.descriptors
            .iter()
            .find(|d| d.id == id)
            .ok_or(SubstError::UnknownField { id: id.to_raw() })
    }

    pub fn contains(&self, id: F) -> bool {
        id.is_valid() && self.descriptors.iter().any(|d| d.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldDescriptor<F>> {
        self.descriptors.iter()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

/// Capability of a host window that knows the field table of its edit controls.
pub trait DescriptorProvider<F: FieldId> {
    fn field_map(&self) -> FieldMap<F>;
}

impl<F: FieldId> DescriptorProvider<F> for FieldMap<F> {
    fn field_map(&self) -> FieldMap<F> {
        self.clone()
    }
}
