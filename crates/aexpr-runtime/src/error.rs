#![forbid(unsafe_code)]

use aexpr_core::EvalError;
use aexpr_interp::ParseError;
use thiserror::Error;

use crate::expression::ExprId;

pub type Result<T> = std::result::Result<T, Error>;

/// Failures surfaced by the reactive runtime.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// An expression body failed, or a direct property access hit a stale
    /// or non-object handle.
    #[error(transparent)]
    Eval(#[from] EvalError),

    /// Expression source text did not parse.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Too many re-evaluations were nested inside one write.
    #[error("cascade limit of {limit} exceeded while re-evaluating {expr}")]
    CascadeLimit { expr: ExprId, limit: usize },

    /// The expression was disposed and cannot be reinstalled.
    #[error("{0} has been disposed")]
    Disposed(ExprId),
}

impl Error {
    /// Flatten into the engine's error type, for failures that surface
    /// through a [`Host`](aexpr_core::Host) hook.
    pub(crate) fn into_eval(self) -> EvalError {
        match self {
            Self::Eval(err) => err,
            other => EvalError::Host(other.to_string()),
        }
    }
}
