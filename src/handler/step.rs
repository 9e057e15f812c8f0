use std::fmt;

/// Error raised by a running step to halt the chain.
///
/// Opaque to the engine: a fault unwinds through every already-entered step
/// unchanged, and any enclosing step may inspect it, recover, or re-raise.
pub type Fault = anyhow::Error;

/// Outcome of one step invocation.
pub type StepResult = Result<(), Fault>;

/// One link of a compiled chain.
///
/// A step owns the rest of the chain as a [`Next`] and decides whether and
/// when to invoke it: before its own logic, after, both, or not at all.
/// Skipping the call short-circuits everything scheduled later.
///
/// Steps built from constructible middleware come from [`Middleware::wrap`];
/// callable-value entries are wrapped in an auto-forwarding step by the
/// compiler and never see their `Next`.
///
/// [`Middleware::wrap`]: crate::handler::middleware::Middleware::wrap
pub trait Step<E> {
    /// Run this step against the environment.
    fn call(&mut self, env: &mut E) -> StepResult;
}

/// The owned tail of a compiled chain: everything scheduled after one step.
///
/// Every chain ends in the terminal no-op, which accepts the environment,
/// does nothing, and returns `Ok(())`.
pub struct Next<E> {
    inner: Option<Box<dyn Step<E>>>,
}

impl<E> Next<E> {
    /// The terminal no-op: the rest of an empty chain.
    pub fn end() -> Self {
        Self { inner: None }
    }

    /// Invoke the rest of the chain.
    pub fn call(&mut self, env: &mut E) -> StepResult {
        match &mut self.inner {
            Some(step) => step.call(env),
            None => Ok(()),
        }
    }
}

impl<E> Default for Next<E> {
    fn default() -> Self {
        Self::end()
    }
}

impl<E> From<Box<dyn Step<E>>> for Next<E> {
    fn from(step: Box<dyn Step<E>>) -> Self {
        Self { inner: Some(step) }
    }
}

impl<E> fmt::Debug for Next<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner {
            Some(_) => f.write_str("Next(..)"),
            None => f.write_str("Next(end)"),
        }
    }
}
