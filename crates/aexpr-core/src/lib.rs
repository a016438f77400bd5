#![forbid(unsafe_code)]

//! Core data model for active expressions: values, the object heap, and the
//! [`Host`] hooks through which engines read and write properties.

pub mod error;
pub mod heap;
pub mod host;
pub mod value;

pub use error::{EvalError, Result};
pub use heap::{Heap, Object, ObjectId};
pub use host::{Host, PropertyKey};
pub use value::{NativeFn, NativeFunction, Value, format_number};
