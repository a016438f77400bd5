#![forbid(unsafe_code)]

//! Reactive runtime for active expressions.
//!
//! An active expression is a function re-run whenever one of the properties
//! it read last time is written. If its result changed (strict equality),
//! its handlers are called with the new value.
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! use aexpr_runtime::{Reactive, Reactor, Scope, Value};
//!
//! let reactor = Reactor::new();
//! let obj = reactor.object([("a", Value::from(1)), ("b", Value::from(2))]);
//!
//! let seen = Rc::new(RefCell::new(Vec::new()));
//! let sink = Rc::clone(&seen);
//! let sum = reactor
//!     .track_source("o.a + o.b", Scope::new().with("o", obj), [])
//!     .unwrap();
//! sum.on_change(move |v| sink.borrow_mut().push(v.clone()));
//!
//! reactor.set(obj, "a", 10).unwrap();
//! assert_eq!(*seen.borrow(), vec![Value::from(12)]);
//! ```
//!
//! # Modules
//!
//! - [`reactor`]: object storage, the write path and the re-evaluation protocol
//! - [`expression`]: handles, lifecycle and the [`Reactive`] trait
//! - [`registry`]: property → expression bookkeeping
//! - [`context`]: the stack reads are attributed through
//! - [`ticking`]: polled expressions and the interval [`Ticker`]
//! - [`engine`]: expression functions and their bindings

pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod expression;
pub mod reactor;
pub mod registry;
pub mod stats;
pub mod ticking;

pub use aexpr_core::{EvalError, Host, ObjectId, PropertyKey, Value};
pub use config::{DEFAULT_MAX_CASCADE_DEPTH, ReactorConfig};
pub use context::{ContextStack, Frame, FrameGuard};
pub use engine::{ExprFunction, NativeBody, Scope};
pub use error::{Error, Result};
pub use expression::{
    ActiveExpression, ExprId, ExpressionBuilder, Handler, Lifecycle, Reactive,
};
pub use reactor::{Reactor, WeakReactor};
pub use registry::DependencyRegistry;
pub use stats::ReactorStats;
pub use ticking::{Ticker, TickingExpression, check};
