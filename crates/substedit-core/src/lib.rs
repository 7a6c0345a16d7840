//! substedit-core: text editing with atomic substitution fields.
//!
//! A document is kept twice:
//! - `LogicalData` - the source string plus zero-width field markers
//! - `PhysicalData` - the displayed string, where each marker is expanded to
//!   its field's display text and occupies a `PhysicalField` span
//!
//! `SubstEdit` mediates between a native edit control (`TextSurface`) and the
//! physical model so that fields are only ever inserted, deleted, copied or
//! stepped over as a whole.

pub mod actions;
pub mod archive;
pub mod config;
pub mod edit;
pub mod error;
pub mod field;
pub mod logical;
pub mod physical;
pub mod platform;
pub mod text;
pub mod types;

pub use actions::{CharInput, Dispatch, EditEvent, Key, Modifiers, MouseButtons};
pub use archive::{ARCHIVE_VERSION, ArchiveReader, ArchiveWriter, PostcardReader, PostcardWriter};
pub use config::{EditConfig, FieldEntry, FieldMapConfig};
pub use edit::SubstEdit;
pub use error::{Result, SubstError};
pub use field::{DescriptorProvider, FieldDescriptor, FieldId, FieldMap};
pub use logical::{FieldMarker, LogicalData};
pub use physical::{FindDirection, PhysicalData, PhysicalField};
pub use platform::{ClipboardService, EditListener, TextHit, TextSurface};
pub use smol_str::SmolStr;
pub use text::{TextBuffer, TextRope};
pub use types::{Point, Selection};
