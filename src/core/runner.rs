use std::rc::Rc;

use tracing::trace;

use crate::core::entry::{CallFn, Entry, Target};
use crate::handler::step::{Next, Step, StepResult};

/// Strategy that turns the current entry list into an execution.
///
/// The default is [`ChainRunner`]. Substituting a runner replaces the
/// execution semantics wholesale, which is how tests observe or reinterpret
/// a stack without running its handlers.
pub trait Runner<E> {
    /// Execute `entries` against `env`.
    fn run(&self, entries: &[Entry<E>], env: &mut E) -> StepResult;
}

/// The default runner: compile the entries, invoke the result once.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChainRunner;

impl<E: 'static> Runner<E> for ChainRunner {
    fn run(&self, entries: &[Entry<E>], env: &mut E) -> StepResult {
        compile(entries).call(env)
    }
}

/// A compiled chain: the single nested callable built from an entry list.
///
/// Chains are ephemeral. The stack compiles a fresh one for every run, so
/// edits between runs always take effect and never disturb a chain that is
/// already executing.
pub struct Chain<E> {
    root: Next<E>,
}

impl<E> Chain<E> {
    /// Invoke the whole chain against `env`.
    pub fn call(&mut self, env: &mut E) -> StepResult {
        self.root.call(env)
    }
}

/// Compile an entry list into one nested chain.
///
/// Entries are folded from the tail backward so that each produced step owns
/// a concrete rest-of-chain. Constructible units are handed theirs to drive
/// as they see fit; callable values are wrapped so the chain continues
/// unconditionally after them. With no entries the chain is the terminal
/// no-op and calling it succeeds without touching the environment.
pub fn compile<E: 'static>(entries: &[Entry<E>]) -> Chain<E> {
    let mut next = Next::end();
    for entry in entries.iter().rev() {
        next = match entry.target() {
            Target::Unit(middleware) => middleware.wrap(next).into(),
            Target::Call(call) => {
                let step: Box<dyn Step<E>> = Box::new(ForwardStep {
                    call: Rc::clone(call),
                    next,
                });
                step.into()
            }
        };
    }
    trace!(entries = entries.len(), "compiled middleware chain");
    Chain { root: next }
}

/// Wrapper for callable-value entries: run the callable, then continue down
/// the chain.
struct ForwardStep<E> {
    call: Rc<CallFn<E>>,
    next: Next<E>,
}

impl<E> Step<E> for ForwardStep<E> {
    fn call(&mut self, env: &mut E) -> StepResult {
        (*self.call)(env)?;
        self.next.call(env)
    }
}
