//! Composable middleware stacks
//!
//! This library provides an ordered, editable stack of handlers that is
//! compiled into a single nested chain every time it runs. Each
//! constructible middleware wraps the rest of the chain and decides whether
//! and when to continue; plain callables run and always forward; faults
//! unwind through every entered step as ordinary `Result` propagation.
//!
//! # Quick Start
//!
//! ```
//! use middleware_stack::{Middleware, MiddlewareStack, Next, Step, StepResult};
//!
//! struct Tag(&'static str);
//!
//! struct TagStep {
//!     label: &'static str,
//!     next: Next<Vec<&'static str>>,
//! }
//!
//! impl Step<Vec<&'static str>> for TagStep {
//!     fn call(&mut self, env: &mut Vec<&'static str>) -> StepResult {
//!         env.push(self.label);
//!         self.next.call(env)?;
//!         env.push(self.label);
//!         Ok(())
//!     }
//! }
//!
//! impl Middleware<Vec<&'static str>> for Tag {
//!     fn wrap(&self, next: Next<Vec<&'static str>>) -> Box<dyn Step<Vec<&'static str>>> {
//!         Box::new(TagStep { label: self.0, next })
//!     }
//! }
//!
//! let mut stack = MiddlewareStack::new();
//! stack.append(Tag("outer"));
//! stack.append(Tag("inner"));
//!
//! let mut trace = Vec::new();
//! stack.run(&mut trace).unwrap();
//! assert_eq!(trace, ["outer", "inner", "inner", "outer"]);
//! ```

pub mod core;
pub mod handler;

// Convenience re-exports
pub use crate::core::entry::{CallFn, Entry, EntryId, EntryRef, Target};
pub use crate::core::error::StackError;
pub use crate::core::runner::{Chain, ChainRunner, Runner, compile};
pub use crate::core::stack::MiddlewareStack;
pub use crate::handler::middleware::Middleware;
pub use crate::handler::step::{Fault, Next, Step, StepResult};
