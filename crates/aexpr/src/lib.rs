#![forbid(unsafe_code)]

//! Active expressions public facade crate.
//!
//! Re-exports the stable surface of the workspace crates. Most users only
//! need the [`prelude`].
//!
//! ```
//! use aexpr::prelude::*;
//!
//! let reactor = Reactor::new();
//! let rect = reactor.object([("w", Value::from(2)), ("h", Value::from(3))]);
//! let area = reactor
//!     .track_source("r.w * r.h", Scope::new().with("r", rect), [])
//!     .unwrap();
//! reactor.set(rect, "w", 4).unwrap();
//! assert_eq!(area.value(), Some(Value::from(12)));
//! ```

pub use aexpr_core as core;
pub use aexpr_interp as interp;
pub use aexpr_runtime as runtime;

pub use aexpr_runtime::{
    ActiveExpression, Error, ExprFunction, Reactive, Reactor, ReactorConfig, Result, Scope,
    Ticker, TickingExpression, Value,
};

pub mod prelude {
    pub use aexpr_core::{EvalError, Host, NativeFunction, ObjectId, PropertyKey, Value};
    pub use aexpr_runtime::{
        ActiveExpression, Error, ExprFunction, ExprId, Lifecycle, Reactive, Reactor,
        ReactorConfig, ReactorStats, Scope, Ticker, TickingExpression, WeakReactor,
    };
}
