#![forbid(unsafe_code)]

//! Bridge between expression functions and the evaluation engine.
//!
//! An expression function is either parsed source text, run by the
//! tree-walking interpreter, or a native closure. Both see the world only
//! through a [`Host`], so the reactive core observes every read regardless
//! of which kind of body is running.

use std::fmt;
use std::rc::Rc;

use aexpr_core::{Host, Result as EvalResult, Value};
use aexpr_interp::{Environment, Interpreter, Lambda, ParseError};

/// Body of a native expression: receives the host and the positional
/// parameters the expression was created with.
pub type NativeBody = dyn Fn(&dyn Host, &[Value]) -> EvalResult<Value>;

/// The zero-or-more-parameter function an expression re-runs.
#[derive(Clone)]
pub enum ExprFunction {
    Source(Rc<Lambda>),
    Native(Rc<NativeBody>),
}

impl ExprFunction {
    /// Parse `source` as a function, arrow function or bare expression.
    pub fn parse(source: &str) -> Result<Self, ParseError> {
        aexpr_interp::parse(source).map(Self::from)
    }

    /// Parse with an explicit nesting bound instead of the default one.
    pub fn parse_with_max_depth(source: &str, max_depth: usize) -> Result<Self, ParseError> {
        aexpr_interp::parse_with_max_depth(source, max_depth).map(Self::from)
    }

    pub fn native(body: impl Fn(&dyn Host, &[Value]) -> EvalResult<Value> + 'static) -> Self {
        Self::Native(Rc::new(body))
    }

    /// Source text for parsed functions.
    pub fn source(&self) -> Option<&str> {
        match self {
            Self::Source(lambda) => Some(&*lambda.source),
            Self::Native(_) => None,
        }
    }
}

impl From<Lambda> for ExprFunction {
    fn from(lambda: Lambda) -> Self {
        Self::Source(Rc::new(lambda))
    }
}

impl fmt::Debug for ExprFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Source(lambda) => f.debug_tuple("Source").field(&lambda.source).finish(),
            Self::Native(_) => f.write_str("Native(..)"),
        }
    }
}

/// Free variables visible to a source expression, beyond globals and
/// parameters.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    bindings: Vec<(Rc<str>, Value)>,
}

impl Scope {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a binding. A later binding with the same name shadows an earlier one.
    #[must_use]
    pub fn with(mut self, name: impl Into<Rc<str>>, value: impl Into<Value>) -> Self {
        self.bindings.push((name.into(), value.into()));
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.bindings.iter().map(|(name, value)| (&**name, value))
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl<K: Into<Rc<str>>, V: Into<Value>> FromIterator<(K, V)> for Scope {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            bindings: iter
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        }
    }
}

/// Run `function` once against `host`.
///
/// Source bodies see, in increasing precedence: `globals`, `scope`, then the
/// parameters. Each parameter is bound under its declared name and also as
/// `argN`; declared parameters without a supplied value are `undefined`.
pub(crate) fn run(
    interpreter: &Interpreter,
    host: &dyn Host,
    globals: &[(Rc<str>, Value)],
    function: &ExprFunction,
    scope: &Scope,
    params: &[Value],
) -> EvalResult<Value> {
    match function {
        ExprFunction::Native(body) => body(host, params),
        ExprFunction::Source(lambda) => interpreter.evaluate(lambda, host, |env| {
            bind(env, globals, scope, lambda, params);
        }),
    }
}

fn bind(
    env: &mut Environment,
    globals: &[(Rc<str>, Value)],
    scope: &Scope,
    lambda: &Lambda,
    params: &[Value],
) {
    for (name, value) in globals {
        env.define(name.clone(), value.clone());
    }
    for (name, value) in &scope.bindings {
        env.define(name.clone(), value.clone());
    }
    for (index, value) in params.iter().enumerate() {
        env.define(format!("arg{index}"), value.clone());
    }
    for (index, name) in lambda.params.iter().enumerate() {
        env.define(name.clone(), params.get(index).cloned().unwrap_or_default());
    }
}
