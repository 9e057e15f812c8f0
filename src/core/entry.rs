use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::handler::middleware::Middleware;
use crate::handler::step::StepResult;

/// A callable-value handler: invoked with the environment, after which the
/// rest of the chain always runs.
pub type CallFn<E> = dyn Fn(&mut E) -> StepResult;

static NEXT_ID: AtomicU64 = AtomicU64::new(0);

/// Identity token of one installed entry.
///
/// Appending and inserting return the token, and every editing operation
/// accepts it wherever a position would do. Tokens are unique within the
/// process and survive cloning and merging, so a token keeps naming the
/// entry it was minted for even after the stack around it is reshuffled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryId(u64);

impl EntryId {
    fn next() -> Self {
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Reference to a stack entry: an explicit 0-based position or an identity
/// token.
///
/// Editing operations take `impl Into<EntryRef>`, so a plain `usize` or an
/// [`EntryId`] works directly at the call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryRef {
    /// Explicit position in the stack.
    Position(usize),
    /// Identity token returned when the entry was added.
    Id(EntryId),
}

impl From<usize> for EntryRef {
    fn from(position: usize) -> Self {
        Self::Position(position)
    }
}

impl From<EntryId> for EntryRef {
    fn from(id: EntryId) -> Self {
        Self::Id(id)
    }
}

impl fmt::Display for EntryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryRef::Position(position) => write!(f, "position {position}"),
            EntryRef::Id(id) => write!(f, "entry {id}"),
        }
    }
}

/// What an entry runs: a constructible unit or a plain callable value.
///
/// Sub-stacks never appear here. Merging flattens another stack's entries
/// into the parent's list before anything is compiled, so by the time a
/// target is executed these two shapes are the only ones left.
pub enum Target<E> {
    /// Constructible unit: builds a fresh step on every compilation.
    Unit(Rc<dyn Middleware<E>>),
    /// Callable value: runs, then the chain forwards unconditionally.
    Call(Rc<CallFn<E>>),
}

impl<E> Clone for Target<E> {
    fn clone(&self) -> Self {
        match self {
            Target::Unit(middleware) => Target::Unit(Rc::clone(middleware)),
            Target::Call(call) => Target::Call(Rc::clone(call)),
        }
    }
}

/// One scheduled handler of a stack: a target plus its identity.
pub struct Entry<E> {
    id: EntryId,
    target: Target<E>,
}

impl<E> Entry<E> {
    /// Entry around a constructible middleware unit.
    pub fn unit(middleware: impl Middleware<E> + 'static) -> Self {
        Self {
            id: EntryId::next(),
            target: Target::Unit(Rc::new(middleware)),
        }
    }

    /// Entry around a callable value.
    pub fn from_fn(call: impl Fn(&mut E) -> StepResult + 'static) -> Self {
        Self {
            id: EntryId::next(),
            target: Target::Call(Rc::new(call)),
        }
    }

    /// This entry's identity token.
    pub fn id(&self) -> EntryId {
        self.id
    }

    /// The unit's diagnostic name; callable values report `"fn"`.
    pub fn name(&self) -> &'static str {
        match &self.target {
            Target::Unit(middleware) => middleware.name(),
            Target::Call(_) => "fn",
        }
    }

    /// What this entry runs.
    pub fn target(&self) -> &Target<E> {
        &self.target
    }
}

// Derive would bound E: Clone; targets are shared by refcount.
impl<E> Clone for Entry<E> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            target: self.target.clone(),
        }
    }
}

impl<E> fmt::Debug for Entry<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("id", &self.id)
            .field("name", &self.name())
            .finish()
    }
}
