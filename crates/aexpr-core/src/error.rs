#![forbid(unsafe_code)]

//! Evaluation failures raised while running an expression body.

use thiserror::Error;

use crate::heap::ObjectId;

pub type Result<T> = std::result::Result<T, EvalError>;

/// Errors raised by the evaluation engine or by a [`Host`](crate::Host)
/// while an expression runs.
///
/// These are ordinary failures of user expressions: reading through an
/// `undefined` intermediate, calling something that is not a function, and so
/// on. They propagate to whoever triggered the evaluation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("unknown identifier: {0}")]
    UnknownIdentifier(String),

    #[error("cannot read property '{property}' of {base}")]
    ReadOfNonObject { property: String, base: &'static str },

    #[error("cannot set property '{property}' of {base}")]
    WriteOfNonObject { property: String, base: &'static str },

    #[error("{callee} is not a function")]
    NotCallable { callee: String },

    #[error("type error: {0}")]
    Type(String),

    #[error("object {0} has been released")]
    StaleObject(ObjectId),

    #[error("evaluation nested deeper than {limit} levels")]
    TooDeep { limit: usize },

    #[error("{function}: {message}")]
    Native { function: String, message: String },

    #[error("unsupported construct: {0}")]
    Unsupported(String),

    #[error("host error: {0}")]
    Host(String),
}

impl EvalError {
    #[must_use]
    pub fn native(function: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Native {
            function: function.into(),
            message: message.into(),
        }
    }

    #[must_use]
    pub fn type_error(message: impl Into<String>) -> Self {
        Self::Type(message.into())
    }
}
