use crate::handler::step::{Next, Step};

/// A constructible middleware unit: the factory for one chain step.
///
/// Every compilation instantiates the unit into a fresh [`Step`], handing it
/// ownership of the rest of the chain. The produced step drives `next`
/// itself: call it and wrap work around it, or skip it to short-circuit.
/// Because steps are rebuilt per compilation, any state a step carries
/// starts clean on every run.
///
/// Construction data lives on the factory value. Fields play the role of
/// constructor arguments, and a captured closure serves as the configuration
/// block.
///
/// # Example
///
/// ```
/// use middleware_stack::{Middleware, MiddlewareStack, Next, Step, StepResult};
///
/// /// Lets the rest of the chain run only while the gate is open.
/// struct Gate {
///     open: bool,
/// }
///
/// struct GateStep {
///     open: bool,
///     next: Next<Vec<i32>>,
/// }
///
/// impl Step<Vec<i32>> for GateStep {
///     fn call(&mut self, env: &mut Vec<i32>) -> StepResult {
///         if self.open { self.next.call(env) } else { Ok(()) }
///     }
/// }
///
/// impl Middleware<Vec<i32>> for Gate {
///     fn wrap(&self, next: Next<Vec<i32>>) -> Box<dyn Step<Vec<i32>>> {
///         Box::new(GateStep { open: self.open, next })
///     }
///
///     fn name(&self) -> &'static str {
///         "gate"
///     }
/// }
///
/// let mut stack = MiddlewareStack::new();
/// stack.append(Gate { open: false });
/// stack.append_fn(|env| {
///     env.push(1);
///     Ok(())
/// });
///
/// let mut seen = Vec::new();
/// stack.run(&mut seen).unwrap();
/// assert!(seen.is_empty());
/// ```
pub trait Middleware<E> {
    /// Build this middleware's step around the rest of the chain.
    fn wrap(&self, next: Next<E>) -> Box<dyn Step<E>>;

    /// Name used in diagnostics and stack introspection.
    fn name(&self) -> &'static str {
        "unnamed"
    }
}
