use std::fmt;
use std::rc::Rc;

use tracing::trace;

use crate::core::entry::{Entry, EntryId, EntryRef};
use crate::core::error::StackError;
use crate::core::runner::{ChainRunner, Runner};
use crate::handler::middleware::Middleware;
use crate::handler::step::{Fault, StepResult};

/// An ordered, editable stack of middleware compiled into one nested chain
/// on every run.
///
/// The stack is the editing surface: append, insert, replace, and delete
/// reshape the entry list at any time, and the next run picks the changes up
/// because compilation happens per run. Entries are addressed by 0-based
/// position or by the [`EntryId`] returned when they were added.
///
/// First-in is outermost: the entry appended first wraps everything
/// appended after it.
///
/// # Example
///
/// ```
/// use middleware_stack::MiddlewareStack;
///
/// let mut stack = MiddlewareStack::new();
/// let greeting = stack.append_fn(|env: &mut String| {
///     env.push_str("hello");
///     Ok(())
/// });
/// stack.append_fn(|env| {
///     env.push_str(", world");
///     Ok(())
/// });
///
/// let mut env = String::new();
/// stack.run(&mut env)?;
/// assert_eq!(env, "hello, world");
///
/// stack.delete(greeting)?;
/// let mut env = String::new();
/// stack.run(&mut env)?;
/// assert_eq!(env, ", world");
/// # Ok::<(), middleware_stack::Fault>(())
/// ```
pub struct MiddlewareStack<E> {
    entries: Vec<Entry<E>>,
    runner: Rc<dyn Runner<E>>,
}

impl<E: 'static> MiddlewareStack<E> {
    /// Create an empty stack backed by the default [`ChainRunner`].
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            runner: Rc::new(ChainRunner),
        }
    }

    /// Create a stack and declare its contents inline.
    ///
    /// # Example
    ///
    /// ```
    /// use middleware_stack::MiddlewareStack;
    ///
    /// let stack = MiddlewareStack::build(|s| {
    ///     s.append_fn(|env: &mut Vec<i32>| {
    ///         env.push(1);
    ///         Ok(())
    ///     });
    ///     s.append_fn(|env| {
    ///         env.push(2);
    ///         Ok(())
    ///     });
    /// });
    ///
    /// let trace = stack.run_default().unwrap();
    /// assert_eq!(trace, [1, 2]);
    /// ```
    pub fn build(setup: impl FnOnce(&mut Self)) -> Self {
        let mut stack = Self::new();
        setup(&mut stack);
        stack
    }

    /// Create an empty stack that executes through `runner` instead of the
    /// default chain compiler.
    pub fn with_runner(runner: impl Runner<E> + 'static) -> Self {
        Self {
            entries: Vec::new(),
            runner: Rc::new(runner),
        }
    }

    /// Append a constructible middleware unit and return its identity token.
    pub fn append(&mut self, middleware: impl Middleware<E> + 'static) -> EntryId {
        self.push_entry(Entry::unit(middleware))
    }

    /// Append a callable value and return its identity token.
    ///
    /// The callable is invoked with the environment; afterwards the chain
    /// always continues, so a callable cannot short-circuit except by
    /// returning an error.
    pub fn append_fn(&mut self, call: impl Fn(&mut E) -> StepResult + 'static) -> EntryId {
        self.push_entry(Entry::from_fn(call))
    }

    /// Fluent [`append`](Self::append).
    pub fn with(mut self, middleware: impl Middleware<E> + 'static) -> Self {
        self.append(middleware);
        self
    }

    /// Fluent [`append_fn`](Self::append_fn).
    pub fn with_fn(mut self, call: impl Fn(&mut E) -> StepResult + 'static) -> Self {
        self.append_fn(call);
        self
    }

    /// Splice another stack's current entries onto the end of this one.
    ///
    /// The other stack is left untouched; its entries are cloned in with
    /// their identity tokens intact, so a token handed out by `other` keeps
    /// working here. Later edits to either stack do not affect the other.
    ///
    /// Merging splices entries flat. To nest a whole stack as a single
    /// opaque handler instead, append [`to_fn`](Self::to_fn).
    pub fn merge(&mut self, other: &Self) -> &mut Self {
        trace!(
            spliced = other.entries.len(),
            into = self.entries.len(),
            "merged middleware stack"
        );
        self.entries.extend(other.entries.iter().cloned());
        self
    }

    /// Resolve a reference to its current position.
    ///
    /// Identity tokens are looked up by forward scan. Explicit positions
    /// pass through unchecked; range validation belongs to the editing
    /// operation that uses the result.
    pub fn position_of(&self, reference: impl Into<EntryRef>) -> Option<usize> {
        match reference.into() {
            EntryRef::Position(position) => Some(position),
            EntryRef::Id(id) => self.entries.iter().position(|entry| entry.id() == id),
        }
    }

    /// Insert a middleware unit before the referenced entry.
    ///
    /// An explicit position may equal [`len`](Self::len), which appends.
    pub fn insert_before(
        &mut self,
        before: impl Into<EntryRef>,
        middleware: impl Middleware<E> + 'static,
    ) -> Result<EntryId, StackError> {
        self.insert_entry_before(before.into(), Entry::unit(middleware))
    }

    /// Insert a callable value before the referenced entry.
    pub fn insert_before_fn(
        &mut self,
        before: impl Into<EntryRef>,
        call: impl Fn(&mut E) -> StepResult + 'static,
    ) -> Result<EntryId, StackError> {
        self.insert_entry_before(before.into(), Entry::from_fn(call))
    }

    /// Insert a middleware unit directly after the referenced entry.
    pub fn insert_after(
        &mut self,
        after: impl Into<EntryRef>,
        middleware: impl Middleware<E> + 'static,
    ) -> Result<EntryId, StackError> {
        self.insert_entry_after(after.into(), Entry::unit(middleware))
    }

    /// Insert a callable value directly after the referenced entry.
    pub fn insert_after_fn(
        &mut self,
        after: impl Into<EntryRef>,
        call: impl Fn(&mut E) -> StepResult + 'static,
    ) -> Result<EntryId, StackError> {
        self.insert_entry_after(after.into(), Entry::from_fn(call))
    }

    /// Replace the referenced entry with a middleware unit.
    ///
    /// The new entry takes the same slot and gets a fresh identity token,
    /// which is returned. The replaced entry's token stops resolving.
    pub fn replace(
        &mut self,
        target: impl Into<EntryRef>,
        middleware: impl Middleware<E> + 'static,
    ) -> Result<EntryId, StackError> {
        self.replace_entry(target.into(), Entry::unit(middleware))
    }

    /// Replace the referenced entry with a callable value.
    pub fn replace_fn(
        &mut self,
        target: impl Into<EntryRef>,
        call: impl Fn(&mut E) -> StepResult + 'static,
    ) -> Result<EntryId, StackError> {
        self.replace_entry(target.into(), Entry::from_fn(call))
    }

    /// Remove the referenced entry.
    pub fn delete(&mut self, target: impl Into<EntryRef>) -> Result<(), StackError> {
        let target = target.into();
        let position = self.resolve(target, "delete", self.entries.len())?;
        let removed = self.entries.remove(position);
        trace!(id = %removed.id(), position, "deleted middleware");
        Ok(())
    }

    /// Compile the current entries and execute them against `env`.
    ///
    /// Compilation happens on every call, so edits made since the last run
    /// are always picked up and step state never leaks between runs. The
    /// environment is threaded through the chain by mutable borrow and keeps
    /// whatever the handlers did to it, success or fault.
    pub fn run(&self, env: &mut E) -> StepResult {
        trace!(entries = self.entries.len(), "running middleware stack");
        self.runner.run(&self.entries, env)
    }

    /// Run against a freshly defaulted environment and hand it back.
    pub fn run_default(&self) -> Result<E, Fault>
    where
        E: Default,
    {
        let mut env = E::default();
        self.run(&mut env)?;
        Ok(env)
    }

    /// A plain callable running a snapshot of this stack.
    ///
    /// Appending the result to another stack nests this whole stack as one
    /// auto-forwarding handler, in contrast to [`merge`](Self::merge) which
    /// splices entries in individually. Edits made here after the snapshot
    /// are not reflected in the callable.
    pub fn to_fn(&self) -> impl Fn(&mut E) -> StepResult + use<E> {
        let snapshot = self.clone();
        move |env: &mut E| snapshot.run(env)
    }

    /// Number of entries currently installed.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the stack has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn push_entry(&mut self, entry: Entry<E>) -> EntryId {
        let id = entry.id();
        trace!(id = %id, name = entry.name(), "appended middleware");
        self.entries.push(entry);
        id
    }

    fn insert_entry_before(
        &mut self,
        before: EntryRef,
        entry: Entry<E>,
    ) -> Result<EntryId, StackError> {
        let position = self.resolve(before, "insert before", self.entries.len() + 1)?;
        Ok(self.insert_entry(position, entry))
    }

    fn insert_entry_after(
        &mut self,
        after: EntryRef,
        entry: Entry<E>,
    ) -> Result<EntryId, StackError> {
        let position = self.resolve(after, "insert after", self.entries.len())?;
        Ok(self.insert_entry(position + 1, entry))
    }

    fn insert_entry(&mut self, position: usize, entry: Entry<E>) -> EntryId {
        let id = entry.id();
        trace!(id = %id, position, name = entry.name(), "inserted middleware");
        self.entries.insert(position, entry);
        id
    }

    fn replace_entry(
        &mut self,
        target: EntryRef,
        entry: Entry<E>,
    ) -> Result<EntryId, StackError> {
        let position = self.resolve(target, "replace", self.entries.len())?;
        let id = entry.id();
        trace!(id = %id, position, name = entry.name(), "replaced middleware");
        self.entries[position] = entry;
        Ok(id)
    }

    /// Resolve `reference` for an edit, or fail without mutating anything.
    ///
    /// `bound` is the exclusive upper limit for explicit positions: one past
    /// the end for inserts that may append, the current length otherwise.
    fn resolve(
        &self,
        reference: EntryRef,
        action: &'static str,
        bound: usize,
    ) -> Result<usize, StackError> {
        match reference {
            EntryRef::Position(position) => {
                if position < bound {
                    Ok(position)
                } else {
                    Err(StackError::out_of_bounds(position, self.entries.len()))
                }
            }
            EntryRef::Id(id) => self
                .entries
                .iter()
                .position(|entry| entry.id() == id)
                .ok_or_else(|| StackError::not_found(action, reference)),
        }
    }
}

impl<E: 'static> Default for MiddlewareStack<E> {
    fn default() -> Self {
        Self::new()
    }
}

// Derive would bound E: Clone; entries and runner are shared by refcount.
impl<E> Clone for MiddlewareStack<E> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
            runner: Rc::clone(&self.runner),
        }
    }
}

impl<E> fmt::Debug for MiddlewareStack<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewareStack")
            .field("entries", &self.entries)
            .finish()
    }
}
