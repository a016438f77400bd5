#![forbid(unsafe_code)]

//! Tokenizer for the expression language.
//!
//! Produces tokens with stable line/column spans so parse errors can point at
//! the offending source. Whitespace, newlines and `//`/`/* */` comments are
//! skipped.

use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub line: usize,
    pub col: usize,
    pub byte: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

impl Span {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Function,
    Return,
    True,
    False,
    Null,
    Undefined,
    Typeof,
}

impl Keyword {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Function => "function",
            Self::Return => "return",
            Self::True => "true",
            Self::False => "false",
            Self::Null => "null",
            Self::Undefined => "undefined",
            Self::Typeof => "typeof",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind<'a> {
    Keyword(Keyword),
    Identifier(&'a str),
    Number(f64),
    String(String),
    Punct(&'static str),
    /// A byte sequence that starts no valid token.
    Unknown(char),
    /// A string literal missing its closing quote.
    Unterminated,
    Eof,
}

impl fmt::Display for TokenKind<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Keyword(k) => write!(f, "'{}'", k.as_str()),
            Self::Identifier(name) => write!(f, "identifier '{name}'"),
            Self::Number(n) => write!(f, "number {n}"),
            Self::String(s) => write!(f, "string {s:?}"),
            Self::Punct(p) => write!(f, "'{p}'"),
            Self::Unknown(c) => write!(f, "character {c:?}"),
            Self::Unterminated => f.write_str("unterminated string"),
            Self::Eof => f.write_str("end of input"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token<'a> {
    pub kind: TokenKind<'a>,
    pub span: Span,
}

/// Longest operators first so `===` wins over `==` and `=`.
const PUNCTUATORS: &[&str] = &[
    "===", "!==", "=>", "==", "!=", "<=", ">=", "&&", "||", "+", "-", "*", "/", "%", "<", ">",
    "!", "?", ":", ".", ",", "(", ")", "{", "}", "[", "]", "=", ";",
];

pub struct Lexer<'a> {
    input: &'a str,
    bytes: &'a [u8],
    idx: usize,
    line: usize,
    col: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            bytes: input.as_bytes(),
            idx: 0,
            line: 1,
            col: 1,
        }
    }

    pub fn tokenize(mut self) -> Vec<Token<'a>> {
        let mut out = Vec::new();
        loop {
            let token = self.next_token();
            let is_eof = matches!(token.kind, TokenKind::Eof);
            out.push(token);
            if is_eof {
                break;
            }
        }
        out
    }

    fn next_token(&mut self) -> Token<'a> {
        self.skip_trivia();
        let start = self.position();
        let Some(&b) = self.bytes.get(self.idx) else {
            return Token {
                kind: TokenKind::Eof,
                span: Span::new(start, start),
            };
        };
        if b == b'"' || b == b'\'' {
            return self.lex_string(start, b);
        }
        if b.is_ascii_digit() || (b == b'.' && self.peek_byte().is_some_and(|n| n.is_ascii_digit()))
        {
            return self.lex_number(start);
        }
        if is_ident_start(b) {
            return self.lex_identifier(start);
        }
        let rest = &self.input[self.idx..];
        if let Some(&punct) = PUNCTUATORS.iter().find(|p| rest.starts_with(**p)) {
            for _ in 0..punct.len() {
                self.advance_byte();
            }
            return Token {
                kind: TokenKind::Punct(punct),
                span: Span::new(start, self.position()),
            };
        }

        let ch = rest.chars().next().unwrap_or('\u{fffd}');
        for _ in 0..ch.len_utf8() {
            self.advance_byte();
        }
        Token {
            kind: TokenKind::Unknown(ch),
            span: Span::new(start, self.position()),
        }
    }

    fn lex_string(&mut self, start: Position, quote: u8) -> Token<'a> {
        self.advance_byte();
        let mut content = String::new();
        let mut run_start = self.idx;
        while let Some(&b) = self.bytes.get(self.idx) {
            if b == quote {
                content.push_str(&self.input[run_start..self.idx]);
                self.advance_byte();
                return Token {
                    kind: TokenKind::String(content),
                    span: Span::new(start, self.position()),
                };
            }
            if b == b'\\' {
                content.push_str(&self.input[run_start..self.idx]);
                self.advance_byte();
                let Some(&escaped) = self.bytes.get(self.idx) else {
                    break;
                };
                match escaped {
                    b'n' => content.push('\n'),
                    b't' => content.push('\t'),
                    b'r' => content.push('\r'),
                    b'0' => content.push('\0'),
                    _ => {
                        // Non-ASCII escapes keep the whole character.
                        let ch = self.input[self.idx..].chars().next().unwrap_or('\\');
                        content.push(ch);
                        for _ in 1..ch.len_utf8() {
                            self.advance_byte();
                        }
                    }
                }
                self.advance_byte();
                run_start = self.idx;
                continue;
            }
            if b == b'\n' {
                break;
            }
            self.advance_byte();
        }
        Token {
            kind: TokenKind::Unterminated,
            span: Span::new(start, self.position()),
        }
    }

    fn lex_number(&mut self, start: Position) -> Token<'a> {
        let start_idx = self.idx;
        let mut seen_dot = false;
        while let Some(&b) = self.bytes.get(self.idx) {
            if b == b'.' && !seen_dot {
                seen_dot = true;
            } else if !b.is_ascii_digit() && b != b'_' {
                break;
            }
            self.advance_byte();
        }
        if matches!(self.bytes.get(self.idx), Some(b'e' | b'E')) {
            let save = (self.idx, self.line, self.col);
            self.advance_byte();
            if matches!(self.bytes.get(self.idx), Some(b'+' | b'-')) {
                self.advance_byte();
            }
            if self.bytes.get(self.idx).is_some_and(u8::is_ascii_digit) {
                while self.bytes.get(self.idx).is_some_and(u8::is_ascii_digit) {
                    self.advance_byte();
                }
            } else {
                (self.idx, self.line, self.col) = save;
            }
        }
        let text: String = self.input[start_idx..self.idx]
            .chars()
            .filter(|c| *c != '_')
            .collect();
        Token {
            kind: TokenKind::Number(text.parse().unwrap_or(f64::NAN)),
            span: Span::new(start, self.position()),
        }
    }

    fn lex_identifier(&mut self, start: Position) -> Token<'a> {
        let start_idx = self.idx;
        self.advance_byte();
        while self.bytes.get(self.idx).is_some_and(|b| is_ident_continue(*b)) {
            self.advance_byte();
        }
        let text = &self.input[start_idx..self.idx];
        let kind = match keyword_from(text) {
            Some(keyword) => TokenKind::Keyword(keyword),
            None => TokenKind::Identifier(text),
        };
        Token {
            kind,
            span: Span::new(start, self.position()),
        }
    }

    fn skip_trivia(&mut self) {
        while let Some(&b) = self.bytes.get(self.idx) {
            if b.is_ascii_whitespace() {
                self.advance_byte();
            } else if b == b'/' && self.peek_byte() == Some(b'/') {
                while self.bytes.get(self.idx).is_some_and(|b| *b != b'\n') {
                    self.advance_byte();
                }
            } else if b == b'/' && self.peek_byte() == Some(b'*') {
                self.advance_byte();
                self.advance_byte();
                while self.idx < self.bytes.len()
                    && !(self.bytes[self.idx] == b'*' && self.peek_byte() == Some(b'/'))
                {
                    self.advance_byte();
                }
                self.advance_byte();
                self.advance_byte();
            } else {
                break;
            }
        }
    }

    fn advance_byte(&mut self) {
        if self.idx >= self.bytes.len() {
            return;
        }
        let b = self.bytes[self.idx];
        self.idx += 1;
        if b == b'\n' {
            self.line += 1;
            self.col = 1;
        } else if b & 0xC0 != 0x80 {
            // Count columns in characters, not continuation bytes.
            self.col += 1;
        }
    }

    fn position(&self) -> Position {
        Position {
            line: self.line,
            col: self.col,
            byte: self.idx,
        }
    }

    fn peek_byte(&self) -> Option<u8> {
        self.bytes.get(self.idx + 1).copied()
    }
}

pub fn tokenize(input: &str) -> Vec<Token<'_>> {
    Lexer::new(input).tokenize()
}

fn keyword_from(text: &str) -> Option<Keyword> {
    Some(match text {
        "function" => Keyword::Function,
        "return" => Keyword::Return,
        "true" => Keyword::True,
        "false" => Keyword::False,
        "null" => Keyword::Null,
        "undefined" => Keyword::Undefined,
        "typeof" => Keyword::Typeof,
        _ => return None,
    })
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b == b'$'
}

fn is_ident_continue(b: u8) -> bool {
    is_ident_start(b) || b.is_ascii_digit()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind<'_>> {
        tokenize(input).into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn tokenize_member_arithmetic() {
        assert_eq!(
            kinds("obj.a + obj.b"),
            vec![
                TokenKind::Identifier("obj"),
                TokenKind::Punct("."),
                TokenKind::Identifier("a"),
                TokenKind::Punct("+"),
                TokenKind::Identifier("obj"),
                TokenKind::Punct("."),
                TokenKind::Identifier("b"),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn longest_punctuator_wins() {
        assert_eq!(
            kinds("a === b => c"),
            vec![
                TokenKind::Identifier("a"),
                TokenKind::Punct("==="),
                TokenKind::Identifier("b"),
                TokenKind::Punct("=>"),
                TokenKind::Identifier("c"),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn strings_numbers_keywords() {
        assert_eq!(
            kinds(r#"'it\'s' "x\ny" 1.5e2 .5 typeof"#),
            vec![
                TokenKind::String("it's".into()),
                TokenKind::String("x\ny".into()),
                TokenKind::Number(150.0),
                TokenKind::Number(0.5),
                TokenKind::Keyword(Keyword::Typeof),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn comments_are_skipped_and_lines_tracked() {
        let tokens = tokenize("// header\n  /* block */ a");
        assert_eq!(tokens[0].kind, TokenKind::Identifier("a"));
        assert_eq!(tokens[0].span.start.line, 2);
        assert_eq!(tokens[0].span.start.col, 15);
    }

    #[test]
    fn unterminated_string() {
        assert_eq!(kinds("'abc"), vec![TokenKind::Unterminated, TokenKind::Eof]);
    }
}
