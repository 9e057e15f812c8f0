/// Stack entries: targets, identity tokens, and entry references.
pub mod entry;

/// Errors raised by stack editing operations.
pub mod error;

/// The chain compiler and the runner substitution point.
pub mod runner;

/// The ordered, editable middleware stack.
pub mod stack;
