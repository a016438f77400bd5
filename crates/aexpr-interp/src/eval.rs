#![forbid(unsafe_code)]

//! Tree-walking evaluator.
//!
//! The evaluator owns no object state. Every property read and write goes
//! through the supplied [`Host`], which is what lets the reactive core see
//! exactly which properties an expression touched, including reads made
//! inside native helper functions.

use std::cmp::Ordering;
use std::rc::Rc;

use aexpr_core::{EvalError, Host, Result, Value};
use ahash::AHashMap;

use crate::ast::{BinaryOp, Expr, Lambda, LogicalOp, Property, UnaryOp};

/// Default bound on expression nesting during evaluation.
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Root binding environment of one evaluation.
///
/// The environment is flat: expressions have no block scoping, and later
/// definitions shadow earlier ones.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    bindings: AHashMap<Rc<str>, Value>,
}

impl Environment {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define(&mut self, name: impl Into<Rc<str>>, value: Value) {
        self.bindings.insert(name.into(), value);
    }

    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&Value> {
        self.bindings.get(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// Evaluates parsed lambdas against a [`Host`].
#[derive(Debug, Clone, Copy)]
pub struct Interpreter {
    max_depth: usize,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl Interpreter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Run `lambda`'s body in a fresh root environment prepared by `setup`.
    ///
    /// `setup` is where callers inject globals, closed-over scope entries and
    /// positional parameters before execution begins.
    pub fn evaluate(
        &self,
        lambda: &Lambda,
        host: &dyn Host,
        setup: impl FnOnce(&mut Environment),
    ) -> Result<Value> {
        let mut env = Environment::new();
        setup(&mut env);
        self.eval(&lambda.body, &env, host, 0)
    }

    /// Evaluate a bare expression in an existing environment.
    pub fn eval_expr(&self, expr: &Expr, env: &Environment, host: &dyn Host) -> Result<Value> {
        self.eval(expr, env, host, 0)
    }

    fn eval(&self, expr: &Expr, env: &Environment, host: &dyn Host, depth: usize) -> Result<Value> {
        if depth > self.max_depth {
            return Err(EvalError::TooDeep {
                limit: self.max_depth,
            });
        }
        let depth = depth + 1;
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Identifier(name) => env
                .lookup(name)
                .cloned()
                .ok_or_else(|| EvalError::UnknownIdentifier(name.to_string())),
            Expr::Member { object, property } => {
                let base = self.eval(object, env, host, depth)?;
                let name = self.property_name(property, env, host, depth)?;
                read_member(host, &base, &name)
            }
            Expr::Call { callee, args } => self.eval_call(callee, args, env, host, depth),
            Expr::Unary { op, operand } => self.eval_unary(*op, operand, env, host, depth),
            Expr::Binary { op, left, right } => {
                let left = self.eval(left, env, host, depth)?;
                let right = self.eval(right, env, host, depth)?;
                Ok(binary(*op, &left, &right))
            }
            Expr::Logical { op, left, right } => {
                let left = self.eval(left, env, host, depth)?;
                let short_circuit = match op {
                    LogicalOp::And => !left.is_truthy(),
                    LogicalOp::Or => left.is_truthy(),
                };
                if short_circuit {
                    Ok(left)
                } else {
                    self.eval(right, env, host, depth)
                }
            }
            Expr::Conditional {
                test,
                consequent,
                alternate,
            } => {
                if self.eval(test, env, host, depth)?.is_truthy() {
                    self.eval(consequent, env, host, depth)
                } else {
                    self.eval(alternate, env, host, depth)
                }
            }
            Expr::Assign {
                object,
                property,
                value,
            } => {
                let base = self.eval(object, env, host, depth)?;
                let name = self.property_name(property, env, host, depth)?;
                let value = self.eval(value, env, host, depth)?;
                let Value::Object(id) = base else {
                    return Err(EvalError::WriteOfNonObject {
                        property: name.to_string(),
                        base: base.describe(),
                    });
                };
                host.set_property(id, &name, value.clone())?;
                Ok(value)
            }
            Expr::Object(entries) => {
                let mut properties = Vec::with_capacity(entries.len());
                for (key, value) in entries {
                    properties.push((Rc::clone(key), self.eval(value, env, host, depth)?));
                }
                Ok(Value::Object(host.alloc_object(properties)?))
            }
        }
    }

    fn property_name(
        &self,
        property: &Property,
        env: &Environment,
        host: &dyn Host,
        depth: usize,
    ) -> Result<Rc<str>> {
        match property {
            Property::Named(name) => Ok(Rc::clone(name)),
            Property::Computed(key) => {
                let key = self.eval(key, env, host, depth)?;
                Ok(match key {
                    Value::Str(s) => s,
                    other => Rc::from(other.to_string()),
                })
            }
        }
    }

    fn eval_call(
        &self,
        callee: &Expr,
        args: &[Expr],
        env: &Environment,
        host: &dyn Host,
        depth: usize,
    ) -> Result<Value> {
        // Method calls bind `this` to the receiver.
        let (this, function) = match callee {
            Expr::Member { object, property } => {
                let receiver = self.eval(object, env, host, depth)?;
                let name = self.property_name(property, env, host, depth)?;
                let function = read_member(host, &receiver, &name)?;
                (receiver, function)
            }
            other => (Value::Undefined, self.eval(other, env, host, depth)?),
        };
        let Value::Function(function) = function else {
            return Err(EvalError::NotCallable {
                callee: callee.describe(),
            });
        };
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.eval(arg, env, host, depth)?);
        }
        function.call(host, &this, &values)
    }

    fn eval_unary(
        &self,
        op: UnaryOp,
        operand: &Expr,
        env: &Environment,
        host: &dyn Host,
        depth: usize,
    ) -> Result<Value> {
        // `typeof missing` is "undefined", not an error.
        if op == UnaryOp::Typeof
            && let Expr::Identifier(name) = operand
            && env.lookup(name).is_none()
        {
            return Ok(Value::from("undefined"));
        }
        let value = self.eval(operand, env, host, depth)?;
        Ok(match op {
            UnaryOp::Not => Value::Bool(!value.is_truthy()),
            UnaryOp::Neg => Value::Number(-value.to_number()),
            UnaryOp::Plus => Value::Number(value.to_number()),
            UnaryOp::Typeof => Value::from(value.type_name()),
        })
    }
}

fn read_member(host: &dyn Host, base: &Value, name: &str) -> Result<Value> {
    match base {
        Value::Object(id) => host.get_property(*id, name),
        Value::Undefined | Value::Null => Err(EvalError::ReadOfNonObject {
            property: name.to_string(),
            base: base.describe(),
        }),
        Value::Str(s) if name == "length" => Ok(Value::Number(s.chars().count() as f64)),
        Value::Function(f) if name == "name" => Ok(Value::from(f.name())),
        _ => Ok(Value::Undefined),
    }
}

fn binary(op: BinaryOp, left: &Value, right: &Value) -> Value {
    match op {
        BinaryOp::Add => {
            if matches!(left, Value::Str(_)) || matches!(right, Value::Str(_)) {
                Value::from(format!("{left}{right}"))
            } else {
                Value::Number(left.to_number() + right.to_number())
            }
        }
        BinaryOp::Sub => Value::Number(left.to_number() - right.to_number()),
        BinaryOp::Mul => Value::Number(left.to_number() * right.to_number()),
        BinaryOp::Div => Value::Number(left.to_number() / right.to_number()),
        BinaryOp::Rem => Value::Number(left.to_number() % right.to_number()),
        BinaryOp::Lt => Value::Bool(compare(left, right) == Some(Ordering::Less)),
        BinaryOp::Le => Value::Bool(matches!(
            compare(left, right),
            Some(Ordering::Less | Ordering::Equal)
        )),
        BinaryOp::Gt => Value::Bool(compare(left, right) == Some(Ordering::Greater)),
        BinaryOp::Ge => Value::Bool(matches!(
            compare(left, right),
            Some(Ordering::Greater | Ordering::Equal)
        )),
        BinaryOp::StrictEq => Value::Bool(left == right),
        BinaryOp::StrictNe => Value::Bool(left != right),
        BinaryOp::LooseEq => Value::Bool(left.loose_eq(right)),
        BinaryOp::LooseNe => Value::Bool(!left.loose_eq(right)),
    }
}

/// Relational comparison; `None` when either side is `NaN`.
fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
        _ => left.to_number().partial_cmp(&right.to_number()),
    }
}
