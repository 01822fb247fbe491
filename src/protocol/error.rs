//! Chart model error types.

use thiserror::Error;

/// Errors raised while declaring charts, dimensions and variables.
///
/// These are contract violations by the calling collector and are never
/// retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChartError {
    /// An entity with the same id is already declared.
    #[error("duplicate {kind} '{id}'")]
    DuplicateItem { kind: &'static str, id: String },

    /// Parameters are not a list.
    #[error("{kind} parameters must be a list, got {found}")]
    ItemType {
        kind: &'static str,
        found: &'static str,
    },

    /// Parameter list is too short or carries an empty id.
    #[error("{kind} parameters: {reason}")]
    ItemValue { kind: &'static str, reason: String },
}
