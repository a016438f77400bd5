#![forbid(unsafe_code)]

//! Active expressions and the handle types callers hold.
//!
//! # Lifecycle
//!
//! ```text
//!   Uninitialized ──baseline ok──▶ Active ──revoke──▶ Revoked
//!                                    ▲                  │
//!                                    └────reinstall─────┘
//!   any ──dispose──▶ Disposed
//! ```
//!
//! While `Active`, an expression's registry entries are exactly the
//! properties read by its most recent evaluation. A revoked expression holds
//! no registry entries and never runs its handlers.
//!
//! Dropping the last handle does *not* revoke: the reactor keeps the
//! expression alive until [`ActiveExpression::dispose`] is called.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use aexpr_core::{PropertyKey, Value};

use crate::engine::{ExprFunction, Scope};
use crate::error::Result;
use crate::reactor::Reactor;
use crate::ticking::TickingExpression;

/// Opaque, reactor-unique expression identity. Ids increase in creation
/// order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExprId(u64);

impl ExprId {
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ExprId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "aexpr#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Baseline evaluation has not completed.
    Uninitialized,
    Active,
    Revoked,
    Disposed,
}

impl Lifecycle {
    /// Reads performed under this expression's frame register interest.
    pub(crate) fn accepts_reads(self) -> bool {
        matches!(self, Self::Uninitialized | Self::Active)
    }
}

/// How an expression discovers change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Strategy {
    /// Re-evaluated when a property it read is written.
    Tracking,
    /// Re-evaluated only when polled.
    Polling,
}

/// Change callback. Receives the new value.
pub type Handler = Rc<dyn Fn(&Value)>;

pub(crate) struct ExpressionState {
    pub(crate) id: ExprId,
    pub(crate) strategy: Strategy,
    pub(crate) label: Option<Rc<str>>,
    pub(crate) function: ExprFunction,
    pub(crate) scope: Scope,
    pub(crate) params: Vec<Value>,
    pub(crate) lifecycle: Cell<Lifecycle>,
    pub(crate) last_value: RefCell<Option<Value>>,
    pub(crate) handlers: RefCell<Vec<Handler>>,
}

impl ExpressionState {
    pub(crate) fn new(id: ExprId, strategy: Strategy, blueprint: Blueprint) -> Self {
        Self {
            id,
            strategy,
            label: blueprint.label,
            function: blueprint.function,
            scope: blueprint.scope,
            params: blueprint.params,
            lifecycle: Cell::new(Lifecycle::Uninitialized),
            last_value: RefCell::new(None),
            handlers: RefCell::new(Vec::new()),
        }
    }

    pub(crate) fn is_active(&self) -> bool {
        self.lifecycle.get() == Lifecycle::Active
    }
}

impl fmt::Debug for ExpressionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExpressionState")
            .field("id", &self.id)
            .field("strategy", &self.strategy)
            .field("label", &self.label)
            .field("lifecycle", &self.lifecycle.get())
            .field("last_value", &self.last_value.borrow())
            .field("handlers", &self.handlers.borrow().len())
            .finish_non_exhaustive()
    }
}

/// Behaviour shared by tracked and polled expressions.
pub trait Reactive {
    fn id(&self) -> ExprId;

    /// Append a change handler. Handlers run in registration order.
    fn add_handler(&self, handler: Handler);

    /// Stop reacting. Idempotent.
    fn revoke(&self);

    /// Value from the most recent successful evaluation.
    fn value(&self) -> Option<Value>;

    fn is_active(&self) -> bool;

    /// Register `handler` and return `self` for chaining.
    fn on_change(&self, handler: impl Fn(&Value) + 'static) -> &Self
    where
        Self: Sized,
    {
        self.add_handler(Rc::new(handler));
        self
    }
}

/// Handle to a tracked expression.
///
/// Cloning the handle does not clone the expression.
#[derive(Clone)]
pub struct ActiveExpression {
    reactor: Reactor,
    state: Rc<ExpressionState>,
}

impl ActiveExpression {
    pub(crate) fn new(reactor: Reactor, state: Rc<ExpressionState>) -> Self {
        Self { reactor, state }
    }

    pub fn label(&self) -> Option<&str> {
        self.state.label.as_deref()
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.state.lifecycle.get()
    }

    /// Properties read by the most recent evaluation, sorted.
    pub fn dependencies(&self) -> Vec<PropertyKey> {
        self.reactor.dependencies_of(self.state.id)
    }

    pub fn handler_count(&self) -> usize {
        self.state.handlers.borrow().len()
    }

    /// Re-register and re-baseline a revoked expression.
    ///
    /// Handlers are kept and do not fire for the baseline value. No-op when
    /// already active.
    pub fn reinstall(&self) -> Result<()> {
        self.reactor.reinstall_expression(&self.state)
    }

    /// Revoke, drop all handlers and remove the expression from its reactor.
    pub fn dispose(self) {
        self.reactor.dispose_expression(&self.state);
    }

    pub fn reactor(&self) -> &Reactor {
        &self.reactor
    }
}

impl Reactive for ActiveExpression {
    fn id(&self) -> ExprId {
        self.state.id
    }

    fn add_handler(&self, handler: Handler) {
        self.state.handlers.borrow_mut().push(handler);
    }

    fn revoke(&self) {
        self.reactor.revoke_expression(&self.state);
    }

    fn value(&self) -> Option<Value> {
        self.state.last_value.borrow().clone()
    }

    fn is_active(&self) -> bool {
        self.state.is_active()
    }
}

impl fmt::Debug for ActiveExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ActiveExpression").field(&self.state).finish()
    }
}

/// Describes an expression before it is installed.
///
/// ```
/// use aexpr_runtime::{Reactive, Reactor, Scope};
///
/// let reactor = Reactor::new();
/// let obj = reactor.object([("a", 1.into())]);
/// let expr = reactor
///     .expression_source("o.a * 2")
///     .unwrap()
///     .label("double")
///     .scope(Scope::new().with("o", obj))
///     .track()
///     .unwrap();
/// assert_eq!(expr.value(), Some(2.into()));
/// assert_eq!(expr.label(), Some("double"));
/// ```
#[must_use = "an expression is only installed by `track` or `tick`"]
pub struct ExpressionBuilder {
    reactor: Reactor,
    blueprint: Blueprint,
}

/// Everything needed to build an [`ExpressionState`] except its id.
#[derive(Debug)]
pub(crate) struct Blueprint {
    pub(crate) function: ExprFunction,
    pub(crate) label: Option<Rc<str>>,
    pub(crate) scope: Scope,
    pub(crate) params: Vec<Value>,
}

impl ExpressionBuilder {
    pub(crate) fn new(reactor: Reactor, function: ExprFunction) -> Self {
        Self {
            reactor,
            blueprint: Blueprint {
                function,
                label: None,
                scope: Scope::new(),
                params: Vec::new(),
            },
        }
    }

    pub fn label(mut self, label: impl Into<Rc<str>>) -> Self {
        self.blueprint.label = Some(label.into());
        self
    }

    pub fn scope(mut self, scope: Scope) -> Self {
        self.blueprint.scope = scope;
        self
    }

    pub fn param(mut self, value: impl Into<Value>) -> Self {
        self.blueprint.params.push(value.into());
        self
    }

    pub fn params(mut self, values: impl IntoIterator<Item = Value>) -> Self {
        self.blueprint.params.extend(values);
        self
    }

    /// Install as a tracked expression.
    pub fn track(self) -> Result<ActiveExpression> {
        self.reactor.install_tracked(self.blueprint)
    }

    /// Install as a polled expression.
    pub fn tick(self) -> Result<TickingExpression> {
        self.reactor.install_polling(self.blueprint)
    }
}

impl fmt::Debug for ExpressionBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ExpressionBuilder").field(&self.blueprint).finish()
    }
}
