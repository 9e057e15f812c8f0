//! Execution semantics: onion ordering, short-circuiting, fault unwinding,
//! and per-run freshness of compiled steps.

use std::rc::Rc;

use anyhow::anyhow;
use middleware_stack::{Middleware, MiddlewareStack, Next, Step, StepResult};
use proptest::prelude::*;

type Trace = Vec<&'static str>;

/// Records its label on the way in and again on the way out.
struct Tag(&'static str);

struct TagStep {
    label: &'static str,
    next: Next<Trace>,
}

impl Step<Trace> for TagStep {
    fn call(&mut self, env: &mut Trace) -> StepResult {
        env.push(self.label);
        self.next.call(env)?;
        env.push(self.label);
        Ok(())
    }
}

impl Middleware<Trace> for Tag {
    fn wrap(&self, next: Next<Trace>) -> Box<dyn Step<Trace>> {
        Box::new(TagStep { label: self.0, next })
    }

    fn name(&self) -> &'static str {
        "tag"
    }
}

/// Records its label on the way in only, then forwards.
struct Relay(&'static str);

struct RelayStep {
    label: &'static str,
    next: Next<Trace>,
}

impl Step<Trace> for RelayStep {
    fn call(&mut self, env: &mut Trace) -> StepResult {
        env.push(self.label);
        self.next.call(env)
    }
}

impl Middleware<Trace> for Relay {
    fn wrap(&self, next: Next<Trace>) -> Box<dyn Step<Trace>> {
        Box::new(RelayStep { label: self.0, next })
    }
}

/// Never calls the rest of the chain.
struct Halt;

struct HaltStep;

impl Step<Trace> for HaltStep {
    fn call(&mut self, _env: &mut Trace) -> StepResult {
        Ok(())
    }
}

impl Middleware<Trace> for Halt {
    fn wrap(&self, _next: Next<Trace>) -> Box<dyn Step<Trace>> {
        Box::new(HaltStep)
    }
}

/// Records a marker when a fault comes back up, then re-raises it.
struct Reraise(&'static str);

struct ReraiseStep {
    label: &'static str,
    next: Next<Trace>,
}

impl Step<Trace> for ReraiseStep {
    fn call(&mut self, env: &mut Trace) -> StepResult {
        env.push(self.label);
        match self.next.call(env) {
            Ok(()) => Ok(()),
            Err(fault) => {
                env.push("E");
                Err(fault)
            }
        }
    }
}

impl Middleware<Trace> for Reraise {
    fn wrap(&self, next: Next<Trace>) -> Box<dyn Step<Trace>> {
        Box::new(ReraiseStep { label: self.0, next })
    }
}

/// Swallows any fault from deeper in the chain and finishes normally.
struct Swallow;

struct SwallowStep {
    next: Next<Trace>,
}

impl Step<Trace> for SwallowStep {
    fn call(&mut self, env: &mut Trace) -> StepResult {
        env.push("IN_B");
        // A fault from deeper in the chain stops here.
        let _ = self.next.call(env);
        env.push("OUT_B");
        Ok(())
    }
}

impl Middleware<Trace> for Swallow {
    fn wrap(&self, next: Next<Trace>) -> Box<dyn Step<Trace>> {
        Box::new(SwallowStep { next })
    }
}

#[test]
fn test_empty_stack_runs_clean() {
    let stack = MiddlewareStack::<Trace>::new();
    let mut env = Trace::new();
    stack.run(&mut env).unwrap();
    assert!(env.is_empty());
}

#[test]
fn test_units_nest_like_an_onion() {
    let mut stack = MiddlewareStack::new();
    stack.append(Tag("A"));
    stack.append(Tag("B"));

    let mut env = Trace::new();
    stack.run(&mut env).unwrap();
    assert_eq!(env, ["A", "B", "B", "A"]);
}

#[test]
fn test_callables_run_in_sequence() {
    let mut stack = MiddlewareStack::new();
    stack.append_fn(|env: &mut Trace| {
        env.push("A");
        Ok(())
    });
    stack.append_fn(|env| {
        env.push("B");
        Ok(())
    });

    let mut env = Trace::new();
    stack.run(&mut env).unwrap();
    assert_eq!(env, ["A", "B"]);
}

#[derive(Default)]
struct App {
    result: Option<i32>,
}

/// Carries its constructor argument into the step it builds.
struct SetResult {
    value: i32,
}

struct SetResultStep {
    value: i32,
    next: Next<App>,
}

impl Step<App> for SetResultStep {
    fn call(&mut self, env: &mut App) -> StepResult {
        env.result = Some(self.value);
        self.next.call(env)
    }
}

impl Middleware<App> for SetResult {
    fn wrap(&self, next: Next<App>) -> Box<dyn Step<App>> {
        Box::new(SetResultStep {
            value: self.value,
            next,
        })
    }
}

#[test]
fn test_factory_fields_reach_the_step() {
    let mut stack = MiddlewareStack::new();
    stack.append(SetResult { value: 42 });

    let env = stack.run_default().unwrap();
    assert_eq!(env.result, Some(42));
}

/// Uses a captured closure as its configuration block.
struct WithBlock {
    block: Rc<dyn Fn() -> i32>,
}

struct WithBlockStep {
    block: Rc<dyn Fn() -> i32>,
    next: Next<App>,
}

impl Step<App> for WithBlockStep {
    fn call(&mut self, env: &mut App) -> StepResult {
        env.result = Some((self.block)());
        self.next.call(env)
    }
}

impl Middleware<App> for WithBlock {
    fn wrap(&self, next: Next<App>) -> Box<dyn Step<App>> {
        Box::new(WithBlockStep {
            block: Rc::clone(&self.block),
            next,
        })
    }
}

#[test]
fn test_configuration_blocks_reach_the_step() {
    let mut stack = MiddlewareStack::new();
    stack.append(WithBlock {
        block: Rc::new(|| 42),
    });

    let env = stack.run_default().unwrap();
    assert_eq!(env.result, Some(42));
}

#[test]
fn test_skipping_next_short_circuits_the_chain() {
    let mut stack = MiddlewareStack::new();
    stack.append(Relay("A"));
    stack.append(Halt);
    stack.append(Relay("C"));

    let mut env = Trace::new();
    stack.run(&mut env).unwrap();
    assert_eq!(env, ["A"]);
}

#[test]
fn test_faults_unwind_through_entered_steps() {
    let mut stack = MiddlewareStack::new();
    stack.append(Reraise("A"));
    stack.append(Relay("B"));
    stack.append_fn(|_env| Err(anyhow!("boom")));
    stack.append(Relay("D"));

    let mut env = Trace::new();
    let fault = stack.run(&mut env).unwrap_err();
    assert_eq!(fault.to_string(), "boom");
    // D sits behind the fault and never runs.
    assert_eq!(env, ["A", "B", "E"]);
}

#[test]
fn test_a_step_can_recover_mid_chain() {
    let mut stack = MiddlewareStack::new();
    stack.append(Tag("A"));
    stack.append(Swallow);
    stack.append_fn(|env: &mut Trace| {
        env.push("IN_C");
        Err(anyhow!("boom"))
    });

    let mut env = Trace::new();
    stack.run(&mut env).unwrap();
    assert_eq!(env, ["A", "IN_B", "IN_C", "OUT_B", "A"]);
}

/// Tells fresh steps from reused ones by counting its own invocations.
struct Fresh;

struct FreshStep {
    calls: u32,
    next: Next<Trace>,
}

impl Step<Trace> for FreshStep {
    fn call(&mut self, env: &mut Trace) -> StepResult {
        self.calls += 1;
        env.push(if self.calls == 1 { "fresh" } else { "stale" });
        self.next.call(env)
    }
}

impl Middleware<Trace> for Fresh {
    fn wrap(&self, next: Next<Trace>) -> Box<dyn Step<Trace>> {
        Box::new(FreshStep { calls: 0, next })
    }
}

#[test]
fn test_steps_are_rebuilt_for_every_run() {
    let mut stack = MiddlewareStack::new();
    stack.append(Fresh);

    let mut env = Trace::new();
    stack.run(&mut env).unwrap();
    stack.run(&mut env).unwrap();
    assert_eq!(env, ["fresh", "fresh"]);
}

type OrderTrace = Vec<(usize, &'static str)>;

/// Records its index on entry and exit, like [`Tag`] but for generated
/// stacks of arbitrary width.
struct Mark(usize);

struct MarkStep {
    index: usize,
    next: Next<OrderTrace>,
}

impl Step<OrderTrace> for MarkStep {
    fn call(&mut self, env: &mut OrderTrace) -> StepResult {
        env.push((self.index, "enter"));
        self.next.call(env)?;
        env.push((self.index, "exit"));
        Ok(())
    }
}

impl Middleware<OrderTrace> for Mark {
    fn wrap(&self, next: Next<OrderTrace>) -> Box<dyn Step<OrderTrace>> {
        Box::new(MarkStep {
            index: self.0,
            next,
        })
    }
}

/// The trace a forwarding-only stack must produce: every handler's entry
/// mark front to back, then unit exit marks back to front.
fn expected_trace(shape: &[bool]) -> OrderTrace {
    let mut trace = OrderTrace::new();
    for (index, is_unit) in shape.iter().enumerate() {
        trace.push((index, if *is_unit { "enter" } else { "call" }));
    }
    for (index, is_unit) in shape.iter().enumerate().rev() {
        if *is_unit {
            trace.push((index, "exit"));
        }
    }
    trace
}

proptest! {
    /// Any mix of units and callables executes in declared onion order.
    #[test]
    fn test_runs_preserve_onion_order(shape in prop::collection::vec(any::<bool>(), 0..12)) {
        let mut stack = MiddlewareStack::new();
        for (index, is_unit) in shape.iter().enumerate() {
            if *is_unit {
                stack.append(Mark(index));
            } else {
                stack.append_fn(move |env: &mut OrderTrace| {
                    env.push((index, "call"));
                    Ok(())
                });
            }
        }

        let mut trace = OrderTrace::new();
        stack.run(&mut trace).unwrap();
        prop_assert_eq!(trace, expected_trace(&shape));
    }
}
