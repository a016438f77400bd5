#![forbid(unsafe_code)]

//! Expression tree produced by the parser.

use std::fmt;
use std::rc::Rc;

use aexpr_core::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
    Plus,
    Typeof,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Lt,
    Le,
    Gt,
    Ge,
    StrictEq,
    StrictNe,
    LooseEq,
    LooseNe,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

/// Property selector of a member expression.
#[derive(Debug, Clone)]
pub enum Property {
    /// `a.b`
    Named(Rc<str>),
    /// `a[expr]`
    Computed(Box<Expr>),
}

#[derive(Debug, Clone)]
pub enum Expr {
    Literal(Value),
    Identifier(Rc<str>),
    Member {
        object: Box<Expr>,
        property: Property,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Logical {
        op: LogicalOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Conditional {
        test: Box<Expr>,
        consequent: Box<Expr>,
        alternate: Box<Expr>,
    },
    /// Assignment; the parser only accepts member targets.
    Assign {
        object: Box<Expr>,
        property: Property,
        value: Box<Expr>,
    },
    Object(Vec<(Rc<str>, Expr)>),
}

impl Expr {
    /// Short source-like rendering for error messages (`obj.foo`, `double`).
    pub fn describe(&self) -> String {
        match self {
            Self::Identifier(name) => name.to_string(),
            Self::Member {
                object,
                property: Property::Named(name),
            } => format!("{}.{name}", object.describe()),
            Self::Member { object, .. } => format!("{}[...]", object.describe()),
            Self::Call { callee, .. } => format!("{}(...)", callee.describe()),
            Self::Literal(value) => format!("{value:?}"),
            _ => "expression".to_string(),
        }
    }
}

/// A parsed expression function: positional parameter names and a body.
///
/// A bare expression parses to a lambda with no parameters.
#[derive(Debug, Clone)]
pub struct Lambda {
    pub params: Vec<Rc<str>>,
    pub body: Expr,
    pub source: Rc<str>,
}

impl fmt::Display for Lambda {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}
