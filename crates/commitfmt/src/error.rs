//! Error types for commit formatting.
//!
//! [`FormatError`] covers everything that aborts a render: template authoring
//! mistakes and records missing required structure. Problems with the
//! historical content of a record (bad identities, undecodable bytes) have
//! their own error types, [`IdentError`](crate::ident::IdentError) and
//! [`TranscodeError`](crate::encoding::TranscodeError), which the engine
//! recovers from in place and never surfaces from a render.

use thiserror::Error;

use crate::locator::Anchor;

/// Errors that abort a render.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    /// The record lacks a structural anchor the render needs.
    #[error("malformed record: cannot locate {0}")]
    MalformedRecord(Anchor),

    /// The template contains a directive the engine does not recognize.
    #[error("unknown directive '%{0}'")]
    UnknownDirective(String),

    /// A color directive names a color or attribute that does not exist.
    #[error("unknown color '{0}'")]
    UnknownColor(String),

    /// A reflog directive names a field the reflog service cannot provide.
    #[error("unknown reflog field '%{0}'")]
    UnknownReflogField(String),

    /// An alignment directive was opened while another one was pending.
    #[error("alignment directive '%{0}' opened while another is pending")]
    NestedAlignment(String),

    /// A format name is neither built in nor a configured alias.
    #[error("unknown commit format '{0}'")]
    UnknownFormat(String),

    /// Format aliases refer to each other in a cycle.
    #[error("format alias '{0}' refers to itself")]
    AliasLoop(String),
}

/// Result type for formatting operations.
pub type Result<T> = std::result::Result<T, FormatError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_directive_display() {
        let err = FormatError::UnknownDirective("Q".to_string());
        assert_eq!(err.to_string(), "unknown directive '%Q'");
    }

    #[test]
    fn test_malformed_record_names_anchor() {
        let err = FormatError::MalformedRecord(Anchor::MessageStart);
        assert!(err.to_string().contains("message start"));
    }
}
