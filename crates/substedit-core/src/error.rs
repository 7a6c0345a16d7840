//! Error types for field-aware text models and the edit mediator.

use miette::Diagnostic;

/// Errors raised by the logical/physical models, persistence and the mediator.
///
/// Every variant except the codec and archive ones describes a broken
/// precondition or invariant. Mutators reject the call and leave their state
/// untouched when they return one of these.
#[derive(thiserror::Error, Debug, Diagnostic)]
#[non_exhaustive]
pub enum SubstError {
    /// The sentinel id was used where a real field id is required.
    #[error("the sentinel field id is not a valid field")]
    #[diagnostic(code(substedit::invalid_field_id))]
    InvalidFieldId,

    /// A field id that the field map does not describe.
    #[error("field id {id} is not present in the field map")]
    #[diagnostic(
        code(substedit::unknown_field),
        help("every marker must reference a descriptor of the attached field map")
    )]
    UnknownField { id: u64 },

    /// A descriptor with empty display text.
    #[error("field id {id} has empty display text")]
    #[diagnostic(code(substedit::empty_display_text))]
    EmptyDisplayText { id: u64 },

    /// A position past the end of the text.
    #[error("position {pos} is out of range (length {len})")]
    #[diagnostic(code(substedit::position_out_of_range))]
    PositionOutOfRange { pos: usize, len: usize },

    /// A position strictly inside a field span.
    #[error("position {pos} is inside the field spanning {start}..{end}")]
    #[diagnostic(
        code(substedit::inside_field),
        help("snap the position to a field boundary first")
    )]
    InsideField { pos: usize, start: usize, end: usize },

    /// A reversed or out-of-bounds range.
    #[error("invalid range {start}..{end} (length {len})")]
    #[diagnostic(code(substedit::invalid_range))]
    InvalidRange { start: usize, end: usize, len: usize },

    /// Logical and physical representations disagree.
    #[error("logical and physical data are out of sync: {0}")]
    #[diagnostic(code(substedit::desynchronized))]
    Desynchronized(String),

    /// A replayed keystroke loop never reached its target.
    #[error("{operation} did not converge after {limit} replayed steps")]
    #[diagnostic(
        code(substedit::replay_diverged),
        help("the display surface did not move the caret as expected")
    )]
    ReplayDiverged {
        operation: &'static str,
        limit: usize,
    },

    /// Malformed archive contents.
    #[error("archive error: {0}")]
    #[diagnostic(code(substedit::archive))]
    Archive(String),

    /// Encoding or decoding failure in the archive codec.
    #[error("codec error: {0}")]
    #[diagnostic(code(substedit::codec))]
    Codec(#[from] postcard::Error),

    /// Archive written by an unknown format version.
    #[error("unsupported archive version {found}")]
    #[diagnostic(code(substedit::unsupported_version))]
    UnsupportedVersion { found: u64 },
}

/// Result alias used throughout the crate.
pub type Result<T, E = SubstError> = std::result::Result<T, E>;
