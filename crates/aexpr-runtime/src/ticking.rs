#![forbid(unsafe_code)]

//! Polling expressions.
//!
//! A ticking expression registers nothing: it is re-run only when polled,
//! through [`Reactor::check_all`] or [`check`]. Polling runs the same
//! compare-and-notify step as a tracked expression, so several writes
//! between two polls produce at most one notification carrying the net
//! result.

use std::fmt;
use std::rc::Rc;

use aexpr_core::Value;
use web_time::{Duration, Instant};

use crate::error::Result;
use crate::expression::{ExprId, ExpressionState, Handler, Lifecycle, Reactive};
use crate::reactor::Reactor;

/// Handle to a polled expression.
#[derive(Clone)]
pub struct TickingExpression {
    reactor: Reactor,
    state: Rc<ExpressionState>,
}

impl TickingExpression {
    pub(crate) fn new(reactor: Reactor, state: Rc<ExpressionState>) -> Self {
        Self { reactor, state }
    }

    pub fn label(&self) -> Option<&str> {
        self.state.label.as_deref()
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.state.lifecycle.get()
    }

    /// Poll only this expression.
    pub fn check(&self) -> Result<()> {
        self.reactor.poll_states([&self.state])
    }
}

impl Reactive for TickingExpression {
    fn id(&self) -> ExprId {
        self.state.id
    }

    fn add_handler(&self, handler: Handler) {
        self.state.handlers.borrow_mut().push(handler);
    }

    /// Remove from the live set. Later polls skip it.
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

impl fmt::Debug for TickingExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TickingExpression").field(&self.state).finish()
    }
}

/// Poll the given expressions, in iteration order.
///
/// Revoked expressions are skipped. Every expression is polled even if an
/// earlier one fails; the first failure is returned.
pub fn check<'a>(expressions: impl IntoIterator<Item = &'a TickingExpression>) -> Result<()> {
    let mut first_error = None;
    for expression in expressions {
        if let Err(err) = expression.check() {
            first_error.get_or_insert(err);
        }
    }
    first_error.map_or(Ok(()), Err)
}

// ─── Ticker ──────────────────────────────────────────────────────────────────

/// Fixed-interval driver for [`Reactor::check_all`].
///
/// The caller supplies the clock, which keeps the ticker usable from an
/// event loop, a frame callback or a test with a synthetic clock.
#[derive(Debug, Clone)]
pub struct Ticker {
    interval: Duration,
    last: Option<Instant>,
}

impl Ticker {
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Whether a poll is due at `now`. The first call is always due.
    pub fn is_due(&self, now: Instant) -> bool {
        self.last
            .is_none_or(|last| now.saturating_duration_since(last) >= self.interval)
    }

    /// Run [`Reactor::check_all`] if a poll is due. Returns whether it ran.
    pub fn poll(&mut self, reactor: &Reactor, now: Instant) -> Result<bool> {
        if !self.is_due(now) {
            return Ok(false);
        }
        self.last = Some(now);
        reactor.check_all()?;
        Ok(true)
    }

    /// Time left until the next poll is due.
    pub fn remaining(&self, now: Instant) -> Duration {
        match self.last {
            None => Duration::ZERO,
            Some(last) => self
                .interval
                .saturating_sub(now.saturating_duration_since(last)),
        }
    }
}
