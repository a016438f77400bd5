#![forbid(unsafe_code)]

//! Pratt parser for expression functions.
//!
//! Accepted top-level shapes:
//!
//! - `() => expr`, `x => expr`, `(x, y) => expr`, `(x) => { return expr; }`
//! - `function (x, y) { return expr; }` (an optional name is ignored)
//! - a bare expression, which becomes a lambda with no parameters.

use core::fmt;
use std::rc::Rc;

use aexpr_core::Value;

use crate::ast::{BinaryOp, Expr, Lambda, LogicalOp, Property, UnaryOp};
use crate::eval::DEFAULT_MAX_DEPTH;
use crate::lexer::{Keyword, Span, Token, TokenKind, tokenize};

#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
    pub span: Span,
    pub expected: Option<Vec<&'static str>>,
}

impl ParseError {
    fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
            expected: None,
        }
    }

    fn with_expected(mut self, expected: Vec<&'static str>) -> Self {
        self.expected = Some(expected);
        self
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (line {}, col {})",
            self.message, self.span.start.line, self.span.start.col
        )?;
        if let Some(expected) = &self.expected {
            write!(f, "; expected: {}", expected.join(", "))?;
        }
        Ok(())
    }
}

impl std::error::Error for ParseError {}

pub type ParseResult<T> = Result<T, ParseError>;

// Binding powers. Left-associative binary operators bind (l, l + 1).
const BP_ASSIGN: u8 = 2;
const BP_CONDITIONAL: u8 = 4;
const BP_PREFIX: u8 = 18;

fn infix_binding_power(op: &str) -> Option<(u8, u8)> {
    Some(match op {
        "||" => (6, 7),
        "&&" => (8, 9),
        "===" | "!==" | "==" | "!=" => (10, 11),
        "<" | "<=" | ">" | ">=" => (12, 13),
        "+" | "-" => (14, 15),
        "*" | "/" | "%" => (16, 17),
        _ => return None,
    })
}

/// Parse expression-function source into a [`Lambda`].
pub fn parse(source: &str) -> ParseResult<Lambda> {
    parse_with_max_depth(source, DEFAULT_MAX_DEPTH)
}

/// Like [`parse`], rejecting sub-expressions nested deeper than `max_depth`.
pub fn parse_with_max_depth(source: &str, max_depth: usize) -> ParseResult<Lambda> {
    let mut parser = Parser::new(source, max_depth);
    let (params, body) = parser.parse_lambda()?;
    parser.eat_punct(";");
    parser.expect_eof()?;
    Ok(Lambda {
        params,
        body,
        source: Rc::from(source.trim()),
    })
}

/// Parse a single expression (no lambda header).
pub fn parse_expression(source: &str) -> ParseResult<Expr> {
    let mut parser = Parser::new(source, DEFAULT_MAX_DEPTH);
    let expr = parser.parse_expr(0)?;
    parser.eat_punct(";");
    parser.expect_eof()?;
    Ok(expr)
}

struct Parser<'a> {
    tokens: Vec<Token<'a>>,
    pos: usize,
    depth: usize,
    max_depth: usize,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str, max_depth: usize) -> Self {
        Self {
            tokens: tokenize(source),
            pos: 0,
            depth: 0,
            max_depth,
        }
    }

    fn parse_lambda(&mut self) -> ParseResult<(Vec<Rc<str>>, Expr)> {
        if matches!(self.peek().kind, TokenKind::Keyword(Keyword::Function)) {
            self.advance();
            if let TokenKind::Identifier(_) = self.peek().kind {
                self.advance();
            }
            self.expect_punct("(")?;
            let params = self.parse_params()?;
            let body = self.parse_block_body()?;
            return Ok((params, body));
        }

        if let TokenKind::Identifier(name) = self.peek().kind
            && self.peek_at(1).kind == TokenKind::Punct("=>")
        {
            self.advance();
            self.advance();
            let body = self.parse_arrow_body()?;
            return Ok((vec![Rc::from(name)], body));
        }

        if self.peek().kind == TokenKind::Punct("(") && self.is_arrow_head() {
            self.advance();
            let params = self.parse_params()?;
            self.expect_punct("=>")?;
            let body = self.parse_arrow_body()?;
            return Ok((params, body));
        }

        Ok((Vec::new(), self.parse_expr(0)?))
    }

    /// Scan from `(` to its matching `)` and report whether `=>` follows.
    fn is_arrow_head(&self) -> bool {
        let mut depth = 0usize;
        for (offset, token) in self.tokens[self.pos..].iter().enumerate() {
            match token.kind {
                TokenKind::Punct("(") => depth += 1,
                TokenKind::Punct(")") => {
                    depth -= 1;
                    if depth == 0 {
                        return self.peek_at(offset + 1).kind == TokenKind::Punct("=>");
                    }
                }
                TokenKind::Eof => return false,
                _ => {}
            }
        }
        false
    }

    /// Parameter list after the opening `(`, consuming the closing `)`.
    fn parse_params(&mut self) -> ParseResult<Vec<Rc<str>>> {
        let mut params = Vec::new();
        if self.eat_punct(")") {
            return Ok(params);
        }
        loop {
            let token = self.advance();
            match token.kind {
                TokenKind::Identifier(name) => params.push(Rc::from(name)),
                other => {
                    return Err(ParseError::new(format!("unexpected {other}"), token.span)
                        .with_expected(vec!["parameter name"]));
                }
            }
            if self.eat_punct(")") {
                return Ok(params);
            }
            self.expect_punct(",")?;
        }
    }

    fn parse_arrow_body(&mut self) -> ParseResult<Expr> {
        if self.peek().kind == TokenKind::Punct("{") && self.is_block_body() {
            return self.parse_block_body();
        }
        self.parse_expr(0)
    }

    fn is_block_body(&self) -> bool {
        matches!(self.peek_at(1).kind, TokenKind::Keyword(Keyword::Return))
    }

    /// `{ return expr; }`
    fn parse_block_body(&mut self) -> ParseResult<Expr> {
        self.expect_punct("{")?;
        let token = self.advance();
        if token.kind != TokenKind::Keyword(Keyword::Return) {
            return Err(
                ParseError::new(format!("unexpected {}", token.kind), token.span)
                    .with_expected(vec!["'return'"]),
            );
        }
        let body = self.parse_expr(0)?;
        self.eat_punct(";");
        self.expect_punct("}")?;
        Ok(body)
    }

    /// Every nested sub-expression re-enters here, so this is where the
    /// nesting bound is enforced.
    fn parse_expr(&mut self, min_bp: u8) -> ParseResult<Expr> {
        if self.depth >= self.max_depth {
            return Err(ParseError::new(
                "expression nested too deeply",
                self.peek().span,
            ));
        }
        self.depth += 1;
        let result = self.parse_binary(min_bp);
        self.depth -= 1;
        result
    }

    fn parse_binary(&mut self, min_bp: u8) -> ParseResult<Expr> {
        let mut lhs = self.parse_prefix()?;
        loop {
            let TokenKind::Punct(op) = self.peek().kind else {
                break;
            };
            if op == "=" {
                if BP_ASSIGN < min_bp {
                    break;
                }
                let span = self.advance().span;
                let Expr::Member { object, property } = lhs else {
                    return Err(ParseError::new("invalid assignment target", span));
                };
                let value = self.parse_expr(BP_ASSIGN)?;
                lhs = Expr::Assign {
                    object,
                    property,
                    value: Box::new(value),
                };
                continue;
            }
            if op == "?" {
                if BP_CONDITIONAL < min_bp {
                    break;
                }
                self.advance();
                let consequent = self.parse_expr(0)?;
                self.expect_punct(":")?;
                let alternate = self.parse_expr(BP_CONDITIONAL)?;
                lhs = Expr::Conditional {
                    test: Box::new(lhs),
                    consequent: Box::new(consequent),
                    alternate: Box::new(alternate),
                };
                continue;
            }
            let Some((l_bp, r_bp)) = infix_binding_power(op) else {
                break;
            };
            if l_bp < min_bp {
                break;
            }
            self.advance();
            let rhs = self.parse_expr(r_bp)?;
            lhs = combine(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_prefix(&mut self) -> ParseResult<Expr> {
        let op = match self.peek().kind {
            TokenKind::Punct("!") => Some(UnaryOp::Not),
            TokenKind::Punct("-") => Some(UnaryOp::Neg),
            TokenKind::Punct("+") => Some(UnaryOp::Plus),
            TokenKind::Keyword(Keyword::Typeof) => Some(UnaryOp::Typeof),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let operand = self.parse_expr(BP_PREFIX)?;
            return Ok(Expr::Unary {
                op,
                operand: Box::new(operand),
            });
        }
        let primary = self.parse_primary()?;
        self.parse_postfix(primary)
    }

    fn parse_postfix(&mut self, mut expr: Expr) -> ParseResult<Expr> {
        loop {
            match self.peek().kind {
                TokenKind::Punct(".") => {
                    self.advance();
                    let token = self.advance();
                    let name = match token.kind {
                        TokenKind::Identifier(name) => Rc::from(name),
                        TokenKind::Keyword(keyword) => Rc::from(keyword.as_str()),
                        other => {
                            return Err(ParseError::new(
                                format!("unexpected {other}"),
                                token.span,
                            )
                            .with_expected(vec!["property name"]));
                        }
                    };
                    expr = Expr::Member {
                        object: Box::new(expr),
                        property: Property::Named(name),
                    };
                }
                TokenKind::Punct("[") => {
                    self.advance();
                    let key = self.parse_expr(0)?;
                    self.expect_punct("]")?;
                    expr = Expr::Member {
                        object: Box::new(expr),
                        property: Property::Computed(Box::new(key)),
                    };
                }
                TokenKind::Punct("(") => {
                    self.advance();
                    let args = self.parse_arguments()?;
                    expr = Expr::Call {
                        callee: Box::new(expr),
                        args,
                    };
                }
                _ => return Ok(expr),
            }
        }
    }

    fn parse_arguments(&mut self) -> ParseResult<Vec<Expr>> {
        let mut args = Vec::new();
        if self.eat_punct(")") {
            return Ok(args);
        }
        loop {
            args.push(self.parse_expr(BP_ASSIGN)?);
            if self.eat_punct(")") {
                return Ok(args);
            }
            self.expect_punct(",")?;
            // Trailing comma.
            if self.eat_punct(")") {
                return Ok(args);
            }
        }
    }

    fn parse_primary(&mut self) -> ParseResult<Expr> {
        let token = self.advance();
        let expr = match token.kind {
            TokenKind::Number(n) => Expr::Literal(Value::Number(n)),
            TokenKind::String(s) => Expr::Literal(Value::from(s)),
            TokenKind::Identifier(name) => Expr::Identifier(Rc::from(name)),
            TokenKind::Keyword(Keyword::True) => Expr::Literal(Value::Bool(true)),
            TokenKind::Keyword(Keyword::False) => Expr::Literal(Value::Bool(false)),
            TokenKind::Keyword(Keyword::Null) => Expr::Literal(Value::Null),
            TokenKind::Keyword(Keyword::Undefined) => Expr::Literal(Value::Undefined),
            TokenKind::Keyword(Keyword::Function) => {
                return Err(ParseError::new(
                    "nested function expressions are not supported",
                    token.span,
                ));
            }
            TokenKind::Punct("(") => {
                let inner = self.parse_expr(0)?;
                self.expect_punct(")")?;
                inner
            }
            TokenKind::Punct("{") => self.parse_object_literal()?,
            TokenKind::Unterminated => {
                return Err(ParseError::new("unterminated string literal", token.span));
            }
            other => {
                return Err(
                    ParseError::new(format!("unexpected {other}"), token.span)
                        .with_expected(vec!["expression"]),
                );
            }
        };
        Ok(expr)
    }

    /// Object literal after the opening `{`.
    fn parse_object_literal(&mut self) -> ParseResult<Expr> {
        let mut entries = Vec::new();
        loop {
            if self.eat_punct("}") {
                return Ok(Expr::Object(entries));
            }
            let token = self.advance();
            let key: Rc<str> = match &token.kind {
                TokenKind::Identifier(name) => Rc::from(*name),
                TokenKind::String(s) => Rc::from(s.as_str()),
                TokenKind::Number(n) => Rc::from(aexpr_core::format_number(*n)),
                TokenKind::Keyword(keyword) => Rc::from(keyword.as_str()),
                other => {
                    return Err(ParseError::new(format!("unexpected {other}"), token.span)
                        .with_expected(vec!["property name"]));
                }
            };
            let value = if self.eat_punct(":") {
                self.parse_expr(BP_ASSIGN)?
            } else if matches!(token.kind, TokenKind::Identifier(_)) {
                // Shorthand `{ a }`.
                Expr::Identifier(Rc::clone(&key))
            } else {
                return Err(ParseError::new("expected ':' after property name", token.span));
            };
            entries.push((key, value));
            if !self.eat_punct(",") {
                self.expect_punct("}")?;
                return Ok(Expr::Object(entries));
            }
        }
    }

    fn peek(&self) -> &Token<'a> {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> &Token<'a> {
        let last = self.tokens.len() - 1;
        &self.tokens[(self.pos + offset).min(last)]
    }

    fn advance(&mut self) -> Token<'a> {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn eat_punct(&mut self, punct: &'static str) -> bool {
        if self.peek().kind == TokenKind::Punct(punct) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_punct(&mut self, punct: &'static str) -> ParseResult<()> {
        if self.eat_punct(punct) {
            return Ok(());
        }
        let token = self.peek();
        Err(
            ParseError::new(format!("unexpected {}", token.kind), token.span)
                .with_expected(vec![punct]),
        )
    }

    fn expect_eof(&self) -> ParseResult<()> {
        let token = self.peek();
        if token.kind == TokenKind::Eof {
            return Ok(());
        }
        Err(
            ParseError::new(format!("unexpected {}", token.kind), token.span)
                .with_expected(vec!["end of input"]),
        )
    }
}

fn combine(op: &str, left: Expr, right: Expr) -> Expr {
    let left = Box::new(left);
    let right = Box::new(right);
    let op = match op {
        "&&" => {
            return Expr::Logical {
                op: LogicalOp::And,
                left,
                right,
            };
        }
        "||" => {
            return Expr::Logical {
                op: LogicalOp::Or,
                left,
                right,
            };
        }
        "+" => BinaryOp::Add,
        "-" => BinaryOp::Sub,
        "*" => BinaryOp::Mul,
        "/" => BinaryOp::Div,
        "%" => BinaryOp::Rem,
        "<" => BinaryOp::Lt,
        "<=" => BinaryOp::Le,
        ">" => BinaryOp::Gt,
        ">=" => BinaryOp::Ge,
        "===" => BinaryOp::StrictEq,
        "!==" => BinaryOp::StrictNe,
        "==" => BinaryOp::LooseEq,
        _ => BinaryOp::LooseNe,
    };
    Expr::Binary { op, left, right }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(lambda: &Lambda) -> Vec<&str> {
        lambda.params.iter().map(|p| &**p).collect()
    }

    #[test]
    fn bare_expression_has_no_params() {
        let lambda = parse("obj.a + obj.b").unwrap();
        assert!(lambda.params.is_empty());
        assert!(matches!(
            lambda.body,
            Expr::Binary {
                op: BinaryOp::Add,
                ..
            }
        ));
    }

    #[test]
    fn arrow_headers() {
        assert!(parse("() => 23").unwrap().params.is_empty());
        assert_eq!(params(&parse("o => o.val").unwrap()), ["o"]);
        assert_eq!(
            params(&parse("(o1, o2, o3) => o1.val + o2.val + o3.val").unwrap()),
            ["o1", "o2", "o3"]
        );
        assert_eq!(params(&parse("(x) => { return x; }").unwrap()), ["x"]);
    }

    #[test]
    fn function_header() {
        let lambda = parse("function predicate(a) { return a.x * 2; }").unwrap();
        assert_eq!(params(&lambda), ["a"]);
    }

    #[test]
    fn parenthesized_expression_is_not_an_arrow() {
        let lambda = parse("(a.b + 1) * 2").unwrap();
        assert!(lambda.params.is_empty());
        assert!(matches!(
            lambda.body,
            Expr::Binary {
                op: BinaryOp::Mul,
                ..
            }
        ));
    }

    #[test]
    fn precedence_and_associativity() {
        // 1 - 2 - 3 parses as (1 - 2) - 3.
        let Expr::Binary { op, left, .. } = parse_expression("1 - 2 - 3").unwrap() else {
            panic!("expected binary");
        };
        assert_eq!(op, BinaryOp::Sub);
        assert!(matches!(*left, Expr::Binary { op: BinaryOp::Sub, .. }));

        // a || b && c parses as a || (b && c).
        let Expr::Logical { op, right, .. } = parse_expression("a || b && c").unwrap() else {
            panic!("expected logical");
        };
        assert_eq!(op, LogicalOp::Or);
        assert!(matches!(*right, Expr::Logical { op: LogicalOp::And, .. }));
    }

    #[test]
    fn conditional_and_assignment_are_right_associative() {
        assert!(matches!(
            parse_expression("a ? b : c ? d : e").unwrap(),
            Expr::Conditional { .. }
        ));
        let Expr::Assign { value, .. } = parse_expression("a.x = b.y = 3").unwrap() else {
            panic!("expected assignment");
        };
        assert!(matches!(*value, Expr::Assign { .. }));
    }

    #[test]
    fn object_literals_and_calls() {
        let expr = parse_expression("f({ bar: 42, 'q': 1, n }, Math.max(a, b,))").unwrap();
        let Expr::Call { args, .. } = expr else {
            panic!("expected call");
        };
        assert_eq!(args.len(), 2);
        assert!(matches!(&args[0], Expr::Object(entries) if entries.len() == 3));
    }

    #[test]
    fn invalid_assignment_target() {
        let err = parse("a = 1").unwrap_err();
        assert_eq!(err.message, "invalid assignment target");
    }

    #[test]
    fn errors_carry_position_and_expectation() {
        let err = parse("obj.\n  + 1").unwrap_err();
        assert_eq!(err.span.start.line, 2);
        assert_eq!(err.expected, Some(vec!["property name"]));
        assert!(err.to_string().contains("line 2"));

        let err = parse("(a, 1) => a").unwrap_err();
        assert_eq!(err.expected, Some(vec!["parameter name"]));

        let err = parse("a b").unwrap_err();
        assert_eq!(err.expected, Some(vec!["end of input"]));
    }

    #[test]
    fn nesting_bound_applies_to_every_entry_point() {
        let source = format!("{}1{}", "(".repeat(9), ")".repeat(9));
        assert!(parse_with_max_depth(&source, 10).is_ok());
        let err = parse_with_max_depth(&source, 9).unwrap_err();
        assert_eq!(err.message, "expression nested too deeply");
        assert_eq!(err.span.start.col, 10);

        let deep = format!("{}x", "-".repeat(DEFAULT_MAX_DEPTH));
        assert!(parse_expression(&deep).is_err());
        assert!(parse(&format!("o => {deep}")).is_err());
        assert!(parse(&format!("function (o) {{ return {deep}; }}")).is_err());
    }
}
