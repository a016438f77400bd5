#![forbid(unsafe_code)]

//! The hook surface between an evaluation engine and the reactive core.
//!
//! An engine never touches object storage directly. Every property read and
//! write goes through a [`Host`], which is where the reactive core attributes
//! reads to the expression on top of its context stack and turns writes into
//! change notifications.

use std::fmt;
use std::rc::Rc;

use crate::error::{EvalError, Result};
use crate::heap::ObjectId;
use crate::value::Value;

/// Identity of an observable property: (object handle, property name).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PropertyKey {
    pub object: ObjectId,
    pub name: Rc<str>,
}

impl PropertyKey {
    pub fn new(object: ObjectId, name: impl Into<Rc<str>>) -> Self {
        Self {
            object,
            name: name.into(),
        }
    }
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.object, self.name)
    }
}

/// Property access hooks an evaluation engine calls into.
pub trait Host {
    /// Read-hook. Fired for every property read an expression performs.
    fn get_property(&self, object: ObjectId, name: &str) -> Result<Value>;

    /// Write-hook. Fired for every property assignment an expression performs.
    fn set_property(&self, object: ObjectId, name: &str, value: Value) -> Result<()>;

    /// Allocate a fresh object (object literals).
    fn alloc_object(&self, properties: Vec<(Rc<str>, Value)>) -> Result<ObjectId>;
}

impl dyn Host + '_ {
    /// Read `object.name` and coerce it to a number.
    pub fn number(&self, object: ObjectId, name: &str) -> Result<f64> {
        Ok(self.get_property(object, name)?.to_number())
    }

    /// Read `object.name`, requiring an object handle.
    pub fn object_at(&self, object: ObjectId, name: &str) -> Result<ObjectId> {
        match self.get_property(object, name)? {
            Value::Object(id) => Ok(id),
            other => Err(EvalError::type_error(format!(
                "property '{name}' of {object} is {}, not an object",
                other.describe()
            ))),
        }
    }
}
