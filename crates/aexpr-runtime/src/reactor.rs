#![forbid(unsafe_code)]

//! The reactive core: object storage, dependency tracking and change
//! notification.
//!
//! # Re-evaluation protocol
//!
//! When a property is written, every expression registered on it is
//! re-evaluated in creation order:
//!
//! 1. drop all of the expression's registry entries,
//! 2. push a tracking frame and run the function (reads re-register),
//! 3. pop the frame,
//! 4. compare the result with the previous value using strict equality,
//! 5. if different, store it and call the handlers in registration order.
//!
//! Steps 1 to 3 make dependency sets dynamic: a property read only on a
//! branch not taken this time stops triggering the expression.
//!
//! # Re-entrancy
//!
//! No `RefCell` borrow is held while user code (expression bodies or
//! handlers) runs. Handlers may freely write properties, create, revoke or
//! reinstall expressions; such writes cascade synchronously, bounded by
//! [`ReactorConfig::max_cascade_depth`].

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::rc::{Rc, Weak};

use ahash::AHashMap;
use aexpr_core::{Heap, Host, ObjectId, PropertyKey, Result as EvalResult, Value};
use aexpr_interp::Interpreter;
use aexpr_interp::builtins::math_object;

use crate::config::ReactorConfig;
use crate::context::{ContextStack, Frame};
use crate::engine::{self, ExprFunction, Scope};
use crate::error::{Error, Result};
use crate::expression::{
    ActiveExpression, Blueprint, ExprId, ExpressionBuilder, ExpressionState, Handler, Lifecycle,
    Strategy,
};
use crate::registry::DependencyRegistry;
use crate::stats::ReactorStats;
use crate::ticking::TickingExpression;

type Globals = Rc<[(Rc<str>, Value)]>;

struct Inner {
    config: ReactorConfig,
    interpreter: Interpreter,
    heap: RefCell<Heap>,
    registry: RefCell<DependencyRegistry>,
    context: ContextStack,
    expressions: RefCell<AHashMap<ExprId, Rc<ExpressionState>>>,
    polling: RefCell<Vec<Rc<ExpressionState>>>,
    globals: RefCell<Globals>,
    cascade: Cell<usize>,
    next_id: Cell<u64>,
    stats: Cell<ReactorStats>,
}

/// A single-threaded reactive world.
///
/// Cloning yields another handle to the same world. Handlers that need to
/// reach the reactor should capture a [`WeakReactor`]: a strong handle
/// stored inside a handler keeps the reactor alive through a cycle.
#[derive(Clone)]
pub struct Reactor {
    inner: Rc<Inner>,
}

/// Non-owning reactor handle.
#[derive(Clone)]
pub struct WeakReactor {
    inner: Weak<Inner>,
}

impl WeakReactor {
    pub fn upgrade(&self) -> Option<Reactor> {
        self.inner.upgrade().map(|inner| Reactor { inner })
    }
}

impl fmt::Debug for WeakReactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakReactor")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

impl Default for Reactor {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Reactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reactor")
            .field("objects", &self.inner.heap.borrow().len())
            .field("expressions", &self.live_expressions())
            .field("ticking", &self.live_ticking())
            .field("watched", &self.watched_properties())
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

/// Decrements the cascade counter on drop.
struct CascadeGuard<'a> {
    depth: &'a Cell<usize>,
}

impl Drop for CascadeGuard<'_> {
    fn drop(&mut self) {
        self.depth.set(self.depth.get().saturating_sub(1));
    }
}

impl Reactor {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(ReactorConfig::default())
    }

    #[must_use]
    pub fn with_config(config: ReactorConfig) -> Self {
        let interpreter = Interpreter::new().with_max_depth(config.max_eval_depth);
        let install_math = config.install_math;
        let reactor = Self {
            inner: Rc::new(Inner {
                config,
                interpreter,
                heap: RefCell::new(Heap::new()),
                registry: RefCell::new(DependencyRegistry::new()),
                context: ContextStack::new(),
                expressions: RefCell::new(AHashMap::new()),
                polling: RefCell::new(Vec::new()),
                globals: RefCell::new(Rc::from(Vec::new())),
                cascade: Cell::new(0),
                next_id: Cell::new(1),
                stats: Cell::new(ReactorStats::default()),
            }),
        };
        if install_math {
            match math_object(&reactor) {
                Ok(math) => reactor.define_global("Math", math),
                Err(err) => tracing::warn!(message = "aexpr.builtins_failed", error = %err),
            }
        }
        reactor
    }

    pub fn config(&self) -> &ReactorConfig {
        &self.inner.config
    }

    pub fn downgrade(&self) -> WeakReactor {
        WeakReactor {
            inner: Rc::downgrade(&self.inner),
        }
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn stats(&self) -> ReactorStats {
        self.inner.stats.get()
    }

    fn bump(&self, update: impl FnOnce(&mut ReactorStats)) {
        let mut stats = self.inner.stats.get();
        update(&mut stats);
        self.inner.stats.set(stats);
    }

    // --- objects --------------------------------------------------------

    /// Allocate an empty object.
    pub fn alloc(&self) -> ObjectId {
        self.inner.heap.borrow_mut().alloc()
    }

    /// Allocate an object with initial properties.
    pub fn object<K, I>(&self, properties: I) -> ObjectId
    where
        K: Into<Rc<str>>,
        I: IntoIterator<Item = (K, Value)>,
    {
        self.inner.heap.borrow_mut().alloc_with(properties)
    }

    /// Read a property. Inside an evaluation the read registers interest
    /// for the expression on top of the context stack.
    pub fn get(&self, object: ObjectId, name: &str) -> Result<Value> {
        Ok(self.read(object, name)?)
    }

    /// Read a property without registering interest.
    pub fn peek(&self, object: ObjectId, name: &str) -> Result<Value> {
        Ok(self.inner.heap.borrow().get(object, name)?)
    }

    /// Write a property and notify interested expressions.
    ///
    /// Every interested expression is re-evaluated even when an earlier one
    /// fails; the first failure is returned. Writing a value equal to the
    /// current one still re-evaluates, and the equality check then
    /// suppresses the handlers.
    pub fn set(&self, object: ObjectId, name: &str, value: impl Into<Value>) -> Result<()> {
        self.inner
            .heap
            .borrow_mut()
            .set(object, name, value.into())?;
        self.bump(|stats| stats.writes += 1);
        self.notify_write(&PropertyKey::new(object, name))
    }

    /// Property names of `object`, sorted. Not tracked.
    pub fn keys(&self, object: ObjectId) -> Result<Vec<Rc<str>>> {
        Ok(self.inner.heap.borrow().keys(object)?)
    }

    pub fn contains(&self, object: ObjectId) -> bool {
        self.inner.heap.borrow().contains(object)
    }

    /// Free `object` and purge every registry entry that names it.
    ///
    /// Expressions that depended on it keep their other dependencies and
    /// their last value. Returns `false` for an already released handle.
    pub fn release(&self, object: ObjectId) -> bool {
        if !self.inner.heap.borrow_mut().release(object) {
            return false;
        }
        let purged = self.inner.registry.borrow_mut().forget_object(object);
        tracing::debug!(message = "aexpr.release", object = %object, purged);
        true
    }

    pub fn object_count(&self) -> usize {
        self.inner.heap.borrow().len()
    }

    // --- globals and context --------------------------------------------

    /// Bind `name` for every source expression evaluated from now on.
    /// Rebinding replaces the earlier value.
    pub fn define_global(&self, name: impl Into<Rc<str>>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        let mut globals = self.inner.globals.borrow_mut();
        let mut next: Vec<(Rc<str>, Value)> = globals
            .iter()
            .filter(|(existing, _)| *existing != name)
            .cloned()
            .collect();
        next.push((name, value));
        *globals = Rc::from(next);
    }

    pub fn global(&self, name: &str) -> Option<Value> {
        self.inner
            .globals
            .borrow()
            .iter()
            .find(|(existing, _)| &**existing == name)
            .map(|(_, value)| value.clone())
    }

    /// Run `f` with read tracking suspended.
    pub fn untracked<R>(&self, f: impl FnOnce() -> R) -> R {
        let _frame = self.inner.context.push(Frame::Untracked);
        f()
    }

    /// The expression reads are currently attributed to.
    pub fn current_expression(&self) -> Option<ExprId> {
        self.inner.context.current()
    }

    pub fn context_depth(&self) -> usize {
        self.inner.context.depth()
    }

    // --- expression construction ----------------------------------------

    /// Start describing an expression over `function`.
    pub fn expression(&self, function: impl Into<ExprFunction>) -> ExpressionBuilder {
        ExpressionBuilder::new(self.clone(), function.into())
    }

    /// Parse `source` and start describing an expression over it. Nesting
    /// deeper than [`ReactorConfig::max_eval_depth`] is a parse error.
    pub fn expression_source(&self, source: &str) -> Result<ExpressionBuilder> {
        let max_depth = self.inner.config.max_eval_depth;
        Ok(self.expression(ExprFunction::parse_with_max_depth(source, max_depth)?))
    }

    /// Create a tracked expression. The baseline evaluation runs before this
    /// returns and does not fire handlers.
    pub fn track(
        &self,
        function: impl Into<ExprFunction>,
        scope: Scope,
        params: impl IntoIterator<Item = Value>,
    ) -> Result<ActiveExpression> {
        self.expression(function).scope(scope).params(params).track()
    }

    /// Parse `source` and track it.
    pub fn track_source(
        &self,
        source: &str,
        scope: Scope,
        params: impl IntoIterator<Item = Value>,
    ) -> Result<ActiveExpression> {
        self.expression_source(source)?
            .scope(scope)
            .params(params)
            .track()
    }

    /// Track a native closure.
    pub fn track_fn(
        &self,
        body: impl Fn(&dyn Host, &[Value]) -> EvalResult<Value> + 'static,
    ) -> Result<ActiveExpression> {
        self.expression(ExprFunction::native(body)).track()
    }

    /// Create a polled expression.
    pub fn tick(&self, function: impl Into<ExprFunction>) -> Result<TickingExpression> {
        self.expression(function).tick()
    }

    /// Parse `source` and create a polled expression over it.
    pub fn tick_source(&self, source: &str, scope: Scope) -> Result<TickingExpression> {
        self.expression_source(source)?.scope(scope).tick()
    }

    /// Poll every live ticking expression once, in creation order.
    pub fn check_all(&self) -> Result<()> {
        let live: Vec<Rc<ExpressionState>> = self.inner.polling.borrow().clone();
        self.bump(|stats| stats.polls += 1);
        tracing::debug!(message = "ticking.check", live = live.len());
        self.poll_states(live.iter())
    }

    // --- introspection --------------------------------------------------

    pub fn live_expressions(&self) -> usize {
        self.inner
            .expressions
            .borrow()
            .values()
            .filter(|state| state.is_active())
            .count()
    }

    pub fn live_ticking(&self) -> usize {
        self.inner.polling.borrow().len()
    }

    /// Number of properties at least one expression depends on.
    pub fn watched_properties(&self) -> usize {
        self.inner.registry.borrow().len()
    }

    /// Expressions depending on `object.name`, in creation order.
    pub fn dependents(&self, object: ObjectId, name: &str) -> Vec<ExprId> {
        self.inner
            .registry
            .borrow()
            .interested(&PropertyKey::new(object, name))
    }

    pub(crate) fn dependencies_of(&self, id: ExprId) -> Vec<PropertyKey> {
        self.inner.registry.borrow().dependencies_of(id)
    }

    /// Registry mirrors agree. Exposed for invariant tests.
    #[doc(hidden)]
    pub fn registry_is_consistent(&self) -> bool {
        let registry = self.inner.registry.borrow();
        if !registry.is_consistent() {
            return false;
        }
        let expressions = self.inner.expressions.borrow();
        expressions
            .values()
            .filter(|state| !state.lifecycle.get().accepts_reads())
            .all(|state| registry.dependency_count(state.id) == 0)
    }

    // --- lifecycle internals --------------------------------------------

    fn next_expr_id(&self) -> ExprId {
        let raw = self.inner.next_id.get();
        self.inner.next_id.set(raw + 1);
        ExprId::from_raw(raw)
    }

    pub(crate) fn install_tracked(&self, blueprint: Blueprint) -> Result<ActiveExpression> {
        let state = Rc::new(ExpressionState::new(
            self.next_expr_id(),
            Strategy::Tracking,
            blueprint,
        ));
        self.inner
            .expressions
            .borrow_mut()
            .insert(state.id, Rc::clone(&state));
        if let Err(err) = self.baseline(&state) {
            self.inner.expressions.borrow_mut().remove(&state.id);
            state.lifecycle.set(Lifecycle::Disposed);
            return Err(err);
        }
        Ok(ActiveExpression::new(self.clone(), state))
    }

    pub(crate) fn install_polling(&self, blueprint: Blueprint) -> Result<TickingExpression> {
        let state = Rc::new(ExpressionState::new(
            self.next_expr_id(),
            Strategy::Polling,
            blueprint,
        ));
        if let Err(err) = self.baseline(&state) {
            state.lifecycle.set(Lifecycle::Disposed);
            return Err(err);
        }
        if state.is_active() {
            self.inner.polling.borrow_mut().push(Rc::clone(&state));
        }
        Ok(TickingExpression::new(self.clone(), state))
    }

    /// Evaluate without notifying and mark the expression active.
    fn baseline(&self, state: &ExpressionState) -> Result<()> {
        let _cascade = self.enter_cascade(state.id)?;
        let value = match self.evaluate(state) {
            Ok(value) => value,
            Err(err) => {
                self.inner.registry.borrow_mut().remove_all_interest(state.id);
                return Err(err);
            }
        };
        if state.lifecycle.get() != Lifecycle::Uninitialized {
            // Revoked while its own baseline was running.
            self.inner.registry.borrow_mut().remove_all_interest(state.id);
            return Ok(());
        }
        *state.last_value.borrow_mut() = Some(value);
        state.lifecycle.set(Lifecycle::Active);
        tracing::debug!(
            message = "aexpr.install",
            expr = state.id.raw(),
            label = state.label.as_deref(),
            dependencies = self.inner.registry.borrow().dependency_count(state.id),
        );
        Ok(())
    }

    pub(crate) fn revoke_expression(&self, state: &ExpressionState) {
        match state.lifecycle.get() {
            Lifecycle::Revoked | Lifecycle::Disposed => return,
            Lifecycle::Uninitialized | Lifecycle::Active => {}
        }
        state.lifecycle.set(Lifecycle::Revoked);
        let removed = match state.strategy {
            Strategy::Tracking => self.inner.registry.borrow_mut().remove_all_interest(state.id),
            Strategy::Polling => {
                self.inner
                    .polling
                    .borrow_mut()
                    .retain(|live| live.id != state.id);
                0
            }
        };
        tracing::debug!(message = "aexpr.revoke", expr = state.id.raw(), removed);
    }

    pub(crate) fn reinstall_expression(&self, state: &ExpressionState) -> Result<()> {
        match state.lifecycle.get() {
            Lifecycle::Disposed => return Err(Error::Disposed(state.id)),
            Lifecycle::Active | Lifecycle::Uninitialized => return Ok(()),
            Lifecycle::Revoked => {}
        }
        state.lifecycle.set(Lifecycle::Uninitialized);
        if let Err(err) = self.baseline(state) {
            state.lifecycle.set(Lifecycle::Revoked);
            return Err(err);
        }
        tracing::debug!(message = "aexpr.reinstall", expr = state.id.raw());
        Ok(())
    }

    pub(crate) fn dispose_expression(&self, state: &ExpressionState) {
        self.revoke_expression(state);
        state.lifecycle.set(Lifecycle::Disposed);
        state.handlers.borrow_mut().clear();
        self.inner.expressions.borrow_mut().remove(&state.id);
    }

    // --- evaluation -----------------------------------------------------

    fn enter_cascade(&self, expr: ExprId) -> Result<CascadeGuard<'_>> {
        let depth = self.inner.cascade.get();
        let limit = self.inner.config.max_cascade_depth;
        if depth >= limit {
            tracing::warn!(message = "aexpr.cascade_limit", expr = expr.raw(), limit);
            return Err(Error::CascadeLimit { expr, limit });
        }
        self.inner.cascade.set(depth + 1);
        Ok(CascadeGuard {
            depth: &self.inner.cascade,
        })
    }

    /// Run the function under the frame its strategy calls for. Tracked
    /// expressions lose all registry entries first and regain exactly the
    /// ones this run reads.
    fn evaluate(&self, state: &ExpressionState) -> Result<Value> {
        let frame = match state.strategy {
            Strategy::Tracking => {
                self.inner.registry.borrow_mut().remove_all_interest(state.id);
                Frame::Tracking(state.id)
            }
            Strategy::Polling => Frame::Untracked,
        };
        let _frame = self.inner.context.push(frame);
        let span = tracing::debug_span!(
            "aexpr.evaluate",
            expr = state.id.raw(),
            depth = self.inner.context.depth()
        );
        let _entered = span.enter();

        let globals = Rc::clone(&*self.inner.globals.borrow());
        self.bump(|stats| stats.evaluations += 1);
        Ok(engine::run(
            &self.inner.interpreter,
            self,
            &globals,
            &state.function,
            &state.scope,
            &state.params,
        )?)
    }

    /// Re-run an active expression and notify on change.
    ///
    /// On failure the expression keeps the registry entries its partial run
    /// made and its previous value.
    pub(crate) fn reevaluate(&self, state: &ExpressionState) -> Result<()> {
        let _cascade = self.enter_cascade(state.id)?;
        tracing::trace!(
            message = "aexpr.reevaluate",
            expr = state.id.raw(),
            cascade = self.inner.cascade.get()
        );
        let value = self.evaluate(state)?;
        if !state.is_active() {
            return Ok(());
        }
        self.settle(state, value);
        Ok(())
    }

    fn settle(&self, state: &ExpressionState, value: Value) {
        {
            let mut last = state.last_value.borrow_mut();
            if last.as_ref() == Some(&value) {
                return;
            }
            *last = Some(value.clone());
        }
        let handlers: Vec<Handler> = state.handlers.borrow().clone();
        self.bump(|stats| stats.notifications += 1);
        tracing::debug!(
            message = "aexpr.changed",
            expr = state.id.raw(),
            value = %value,
            handlers = handlers.len(),
        );
        for handler in &handlers {
            self.invoke(state.id, handler, &value);
        }
    }

    fn invoke(&self, expr: ExprId, handler: &Handler, value: &Value) {
        self.bump(|stats| stats.handler_calls += 1);
        if !self.inner.config.catch_handler_panics {
            handler(value);
            return;
        }
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| handler(value))) {
            self.bump(|stats| stats.handler_failures += 1);
            tracing::warn!(
                message = "aexpr.handler_failed",
                expr = expr.raw(),
                panic = panic_message(payload.as_ref()),
            );
        }
    }

    fn notify_write(&self, key: &PropertyKey) -> Result<()> {
        let interested = self.inner.registry.borrow().interested(key);
        let mut first_error = None;
        for id in interested {
            let state = self.inner.expressions.borrow().get(&id).cloned();
            let Some(state) = state else {
                continue;
            };
            // An earlier handler in this pass may have revoked it or changed
            // what it depends on.
            if !state.is_active() || !self.inner.registry.borrow().is_interested(key, id) {
                continue;
            }
            if let Err(err) = self.reevaluate(&state) {
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    pub(crate) fn poll_states<'a>(
        &self,
        states: impl IntoIterator<Item = &'a Rc<ExpressionState>>,
    ) -> Result<()> {
        let mut first_error = None;
        for state in states {
            if !state.is_active() {
                continue;
            }
            if let Err(err) = self.reevaluate(state) {
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    // --- host hooks -----------------------------------------------------

    fn read(&self, object: ObjectId, name: &str) -> EvalResult<Value> {
        let value = self.inner.heap.borrow().get(object, name)?;
        if let Some(expr) = self.inner.context.current() {
            let accepts = self
                .inner
                .expressions
                .borrow()
                .get(&expr)
                .is_some_and(|state| state.lifecycle.get().accepts_reads());
            if accepts {
                self.inner
                    .registry
                    .borrow_mut()
                    .watch(PropertyKey::new(object, name))
                    .add_interest(expr);
            }
        }
        Ok(value)
    }
}

impl Host for Reactor {
    fn get_property(&self, object: ObjectId, name: &str) -> EvalResult<Value> {
        self.read(object, name)
    }

    fn set_property(&self, object: ObjectId, name: &str, value: Value) -> EvalResult<()> {
        self.set(object, name, value).map_err(Error::into_eval)
    }

    fn alloc_object(&self, properties: Vec<(Rc<str>, Value)>) -> EvalResult<ObjectId> {
        Ok(self.object(properties))
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::Reactive;
    use aexpr_core::EvalError;
    use std::cell::RefCell;

    fn recorder() -> (Rc<RefCell<Vec<Value>>>, impl Fn(&Value) + 'static) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        (seen, move |value: &Value| sink.borrow_mut().push(value.clone()))
    }

    #[test]
    fn reads_inside_evaluation_register_interest() {
        let reactor = Reactor::new();
        let obj = reactor.object([("a", Value::from(1)), ("b", Value::from(2))]);
        let expr = reactor
            .track_source("o.a", Scope::new().with("o", obj), [])
            .unwrap();
        assert_eq!(expr.dependencies(), vec![PropertyKey::new(obj, "a")]);
        assert_eq!(reactor.dependents(obj, "a"), vec![expr.id()]);
        assert!(reactor.dependents(obj, "b").is_empty());
    }

    #[test]
    fn reads_outside_evaluation_are_not_tracked() {
        let reactor = Reactor::new();
        let obj = reactor.object([("a", Value::from(1))]);
        assert_eq!(reactor.get(obj, "a").unwrap(), Value::from(1));
        assert_eq!(reactor.watched_properties(), 0);
    }

    #[test]
    fn equal_value_suppresses_handlers() {
        let reactor = Reactor::new();
        let obj = reactor.object([("a", Value::from(1))]);
        let (seen, handler) = recorder();
        reactor
            .track_source("o.a > 0", Scope::new().with("o", obj), [])
            .unwrap()
            .on_change(handler);
        reactor.set(obj, "a", 5).unwrap();
        assert!(seen.borrow().is_empty());
        assert_eq!(reactor.stats().evaluations, 2);
        reactor.set(obj, "a", -5).unwrap();
        assert_eq!(*seen.borrow(), vec![Value::Bool(false)]);
    }

    #[test]
    fn cascade_guard_stops_self_feeding_handler() {
        let reactor = Reactor::with_config(ReactorConfig::default().with_max_cascade_depth(4));
        let obj = reactor.object([("n", Value::from(0))]);
        let weak = reactor.downgrade();
        let errors = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&errors);
        let expr = reactor
            .track_source("o.n", Scope::new().with("o", obj), [])
            .unwrap();
        expr.on_change(move |value| {
            if let Some(reactor) = weak.upgrade()
                && let Err(err) = reactor.set(obj, "n", value.to_number() + 1.0)
            {
                sink.borrow_mut().push(err);
            }
        });

        reactor.set(obj, "n", 1).unwrap();
        let errors = errors.borrow();
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], Error::CascadeLimit { limit: 4, .. }));
        assert_eq!(expr.value(), Some(Value::from(4)));
        assert_eq!(reactor.peek(obj, "n").unwrap(), Value::from(5));
        assert_eq!(reactor.context_depth(), 0);
    }

    #[test]
    fn release_purges_registry() {
        let reactor = Reactor::new();
        let a = reactor.object([("v", Value::from(1))]);
        let b = reactor.object([("v", Value::from(2))]);
        let expr = reactor
            .track_source("a.v + b.v", Scope::new().with("a", a).with("b", b), [])
            .unwrap();
        assert!(reactor.release(a));
        assert!(!reactor.release(a));
        assert_eq!(expr.dependencies(), vec![PropertyKey::new(b, "v")]);
        assert!(reactor.registry_is_consistent());
        assert!(matches!(
            reactor.set(a, "v", 3),
            Err(Error::Eval(EvalError::StaleObject(_)))
        ));
    }

    #[test]
    fn untracked_suspends_attribution() {
        let reactor = Reactor::new();
        let obj = reactor.object([("a", Value::from(1)), ("b", Value::from(1))]);
        let expr = reactor
            .track_fn(move |host, _| {
                let a = host.number(obj, "a")?;
                Ok(Value::from(a))
            })
            .unwrap();
        assert_eq!(expr.dependencies().len(), 1);
        reactor.untracked(|| {
            assert_eq!(reactor.current_expression(), None);
            reactor.get(obj, "b").unwrap();
        });
        assert_eq!(reactor.watched_properties(), 1);
    }

    #[test]
    fn define_global_replaces() {
        let reactor = Reactor::with_config(ReactorConfig::default().with_math(false));
        assert_eq!(reactor.global("Math"), None);
        reactor.define_global("k", 1);
        reactor.define_global("k", 2);
        assert_eq!(reactor.global("k"), Some(Value::from(2)));
        let expr = reactor.track_source("k * 10", Scope::new(), []).unwrap();
        assert_eq!(expr.value(), Some(Value::from(20)));
    }

    #[test]
    fn weak_handle_does_not_keep_reactor_alive() {
        let reactor = Reactor::new();
        let weak = reactor.downgrade();
        assert!(weak.upgrade().is_some_and(|r| r.ptr_eq(&reactor)));
        drop(reactor);
        assert!(weak.upgrade().is_none());
    }
}
