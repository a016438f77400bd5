#![forbid(unsafe_code)]

//! Expression language for active expressions: tokenizer, parser and a
//! tree-walking evaluator whose property accesses all go through a
//! [`Host`](aexpr_core::Host).
//!
//! ```
//! use aexpr_interp::parse;
//!
//! let lambda = parse("(o1, o2) => o1.val + o2.val").unwrap();
//! assert_eq!(lambda.params.len(), 2);
//! ```

pub mod ast;
pub mod builtins;
pub mod eval;
pub mod lexer;
pub mod parser;

pub use ast::{Expr, Lambda};
pub use eval::{DEFAULT_MAX_DEPTH, Environment, Interpreter};
pub use parser::{ParseError, parse, parse_expression, parse_with_max_depth};
