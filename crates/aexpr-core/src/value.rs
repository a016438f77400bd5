#![forbid(unsafe_code)]

//! Dynamic values flowing through expressions.
//!
//! # Equality
//!
//! `PartialEq` on [`Value`] is *strict* equality: primitives compare by value
//! (`NaN` is never equal to itself, `0 == -0`), objects compare by handle
//! identity and functions by allocation identity. There is no deep
//! comparison. This is the comparison that gates change notification.

use std::fmt;
use std::rc::Rc;

use crate::error::Result;
use crate::heap::ObjectId;
use crate::host::Host;

/// Signature of a native function body: host, `this`, arguments.
pub type NativeFn = dyn Fn(&dyn Host, &Value, &[Value]) -> Result<Value>;

/// A host-provided function callable from expressions.
///
/// Reads performed through the `&dyn Host` argument are attributed to the
/// expression currently being evaluated, so helpers are tracked like inline
/// code.
#[derive(Clone)]
pub struct NativeFunction {
    name: Rc<str>,
    body: Rc<NativeFn>,
}

impl NativeFunction {
    pub fn new(
        name: impl Into<Rc<str>>,
        body: impl Fn(&dyn Host, &Value, &[Value]) -> Result<Value> + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            body: Rc::new(body),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call(&self, host: &dyn Host, this: &Value, args: &[Value]) -> Result<Value> {
        (self.body)(host, this, args)
    }

    /// Identity comparison.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.body, &other.body)
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeFunction({})", self.name)
    }
}

#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    Str(Rc<str>),
    Object(ObjectId),
    Function(NativeFunction),
}

impl Value {
    /// Name reported by `typeof`.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::Null => "object",
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::Str(_) => "string",
            Self::Object(_) => "object",
            Self::Function(_) => "function",
        }
    }

    /// Short description used in error messages.
    #[must_use]
    pub fn describe(&self) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::Null => "null",
            _ => self.type_name(),
        }
    }

    #[must_use]
    pub fn is_nullish(&self) -> bool {
        matches!(self, Self::Undefined | Self::Null)
    }

    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Undefined | Self::Null => false,
            Self::Bool(b) => *b,
            Self::Number(n) => *n != 0.0 && !n.is_nan(),
            Self::Str(s) => !s.is_empty(),
            Self::Object(_) | Self::Function(_) => true,
        }
    }

    /// Numeric coercion for arithmetic.
    #[must_use]
    pub fn to_number(&self) -> f64 {
        match self {
            Self::Undefined => f64::NAN,
            Self::Null => 0.0,
            Self::Bool(b) => f64::from(u8::from(*b)),
            Self::Number(n) => *n,
            Self::Str(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    0.0
                } else {
                    trimmed.parse().unwrap_or(f64::NAN)
                }
            }
            Self::Object(_) | Self::Function(_) => f64::NAN,
        }
    }

    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_object(&self) -> Option<ObjectId> {
        match self {
            Self::Object(id) => Some(*id),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_function(&self) -> Option<&NativeFunction> {
        match self {
            Self::Function(f) => Some(f),
            _ => None,
        }
    }

    /// Loose (`==`) equality: `null == undefined`, numbers and strings and
    /// booleans coerce to numbers; everything else falls back to strict.
    #[must_use]
    pub fn loose_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (a, b) if a.is_nullish() || b.is_nullish() => a.is_nullish() && b.is_nullish(),
            (Self::Number(_) | Self::Str(_) | Self::Bool(_), Self::Number(_) | Self::Bool(_))
            | (Self::Number(_) | Self::Bool(_), Self::Str(_)) => {
                self.to_number() == other.to_number()
            }
            _ => self == other,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Undefined, Self::Undefined) | (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => a == b,
            (Self::Function(a), Self::Function(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => write!(f, "{s:?}"),
            Self::Object(id) => write!(f, "Object({id})"),
            Self::Function(func) => write!(f, "Function({})", func.name()),
            other => write!(f, "{other}"),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undefined => f.write_str("undefined"),
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{}", format_number(*n)),
            Self::Str(s) => f.write_str(s),
            Self::Object(_) => f.write_str("[object Object]"),
            Self::Function(func) => write!(f, "function {}() {{ [native code] }}", func.name()),
        }
    }
}

/// Format a number the way script output expects (`3`, not `3.0`).
#[must_use]
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        let text = if n > 0.0 { "Infinity" } else { "-Infinity" };
        text.to_string()
    } else if n == n.trunc() && n.abs() < 1e21 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(Rc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(Rc::from(s))
    }
}

impl From<ObjectId> for Value {
    fn from(id: ObjectId) -> Self {
        Self::Object(id)
    }
}

impl From<NativeFunction> for Value {
    fn from(f: NativeFunction) -> Self {
        Self::Function(f)
    }
}
