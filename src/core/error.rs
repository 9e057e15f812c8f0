use thiserror::Error;

use crate::core::entry::EntryRef;

/// Errors raised by stack editing operations.
///
/// Edits fail before any mutation: a stack that returned an error is exactly
/// as it was.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StackError {
    /// The reference did not resolve to any entry in this stack.
    #[error("no such middleware to {action}: {reference}")]
    NotFound {
        /// The operation that failed, e.g. `"insert before"`.
        action: &'static str,
        /// The reference that resolved to nothing.
        reference: EntryRef,
    },

    /// An explicit position outside the stack's bounds.
    #[error("position {position} is out of bounds for a stack of {len} entries")]
    OutOfBounds {
        /// The requested position.
        position: usize,
        /// The stack's length at the time of the edit.
        len: usize,
    },
}

impl StackError {
    pub(crate) fn not_found(action: &'static str, reference: EntryRef) -> Self {
        Self::NotFound { action, reference }
    }

    pub(crate) fn out_of_bounds(position: usize, len: usize) -> Self {
        Self::OutOfBounds { position, len }
    }
}
