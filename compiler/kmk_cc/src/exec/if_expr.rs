//! Expressions of the `if` directive.
//!
//! The operand is expanded before it gets here. Supported: `defined(NAME)`,
//! `!`, `&&`, `||`, the comparisons `== != < <= > >=`, parentheses, quoted
//! strings and bare words. Comparisons are numeric when both sides are
//! integers. A string is true when non-empty, a number when non-zero.

use std::cmp::Ordering;

use crate::errors::{bad_if_expression, EvalError};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    fn holds(self, ord: Ordering) -> bool {
        match self {
            CmpOp::Eq => ord == Ordering::Equal,
            CmpOp::Ne => ord != Ordering::Equal,
            CmpOp::Lt => ord == Ordering::Less,
            CmpOp::Le => ord != Ordering::Greater,
            CmpOp::Gt => ord == Ordering::Greater,
            CmpOp::Ge => ord != Ordering::Less,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Token<'t> {
    Word(&'t str),
    Str(&'t str),
    LParen,
    RParen,
    Not,
    And,
    Or,
    Cmp(CmpOp),
}

impl Token<'_> {
    fn describe(&self) -> String {
        match self {
            Token::Word(w) | Token::Str(w) => format!("'{w}'"),
            Token::LParen => "'('".to_owned(),
            Token::RParen => "')'".to_owned(),
            Token::Not => "'!'".to_owned(),
            Token::And => "'&&'".to_owned(),
            Token::Or => "'||'".to_owned(),
            Token::Cmp(_) => "comparison operator".to_owned(),
        }
    }
}

fn tokenize(text: &str) -> Result<Vec<Token<'_>>, EvalError> {
    let bytes = text.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        let two = bytes.get(i + 1).copied();
        let (token, len) = match (b, two) {
            (b' ' | b'\t' | b'\n' | b'\r', _) => {
                i += 1;
                continue;
            }
            (b'(', _) => (Token::LParen, 1),
            (b')', _) => (Token::RParen, 1),
            (b'&', Some(b'&')) => (Token::And, 2),
            (b'|', Some(b'|')) => (Token::Or, 2),
            (b'=', Some(b'=')) => (Token::Cmp(CmpOp::Eq), 2),
            (b'!', Some(b'=')) => (Token::Cmp(CmpOp::Ne), 2),
            (b'<', Some(b'=')) => (Token::Cmp(CmpOp::Le), 2),
            (b'>', Some(b'=')) => (Token::Cmp(CmpOp::Ge), 2),
            (b'!', _) => (Token::Not, 1),
            (b'<', _) => (Token::Cmp(CmpOp::Lt), 1),
            (b'>', _) => (Token::Cmp(CmpOp::Gt), 1),
            (b'"' | b'\'', _) => {
                let close = text[i + 1..]
                    .find(char::from(b))
                    .ok_or_else(|| bad_if_expression("unterminated string"))?;
                (Token::Str(&text[i + 1..i + 1 + close]), close + 2)
            }
            _ => {
                let len = bytes[i..]
                    .iter()
                    .take_while(|&&c| !c.is_ascii_whitespace() && !b"()!&|=<>\"'".contains(&c))
                    .count();
                if len == 0 {
                    return Err(bad_if_expression(format!("unexpected '{}'", char::from(b))));
                }
                (Token::Word(&text[i..i + len]), len)
            }
        };
        tokens.push(token);
        i += len;
    }
    Ok(tokens)
}

#[derive(Clone, Debug, Eq, PartialEq)]
enum Value {
    Text(String),
    Bool(bool),
}

impl Value {
    fn truthy(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Text(s) => match s.trim().parse::<i64>() {
                Ok(n) => n != 0,
                Err(_) => !s.is_empty(),
            },
        }
    }

    fn into_text(self) -> String {
        match self {
            Value::Text(s) => s,
            Value::Bool(b) => String::from(if b { "1" } else { "0" }),
        }
    }
}

fn compare(left: &str, right: &str) -> Ordering {
    match (left.trim().parse::<i64>(), right.trim().parse::<i64>()) {
        (Ok(l), Ok(r)) => l.cmp(&r),
        _ => left.cmp(right),
    }
}

struct Parser<'t, 'd> {
    tokens: Vec<Token<'t>>,
    pos: usize,
    defined: &'d dyn Fn(&str) -> bool,
}

impl<'t> Parser<'t, '_> {
    fn peek(&self) -> Option<Token<'t>> {
        self.tokens.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<Token<'t>> {
        let token = self.peek();
        self.pos += 1;
        token
    }

    fn expect(&mut self, want: Token<'_>) -> Result<(), EvalError> {
        match self.bump() {
            Some(t) if t == want => Ok(()),
            Some(t) => Err(bad_if_expression(format!("expected {}, found {}", want.describe(), t.describe()))),
            None => Err(bad_if_expression(format!("expected {}", want.describe()))),
        }
    }

    fn or(&mut self) -> Result<Value, EvalError> {
        let mut left = self.and()?;
        while self.peek() == Some(Token::Or) {
            self.pos += 1;
            let right = self.and()?;
            left = Value::Bool(left.truthy() || right.truthy());
        }
        Ok(left)
    }

    fn and(&mut self) -> Result<Value, EvalError> {
        let mut left = self.not()?;
        while self.peek() == Some(Token::And) {
            self.pos += 1;
            let right = self.not()?;
            left = Value::Bool(left.truthy() && right.truthy());
        }
        Ok(left)
    }

    fn not(&mut self) -> Result<Value, EvalError> {
        if self.peek() == Some(Token::Not) {
            self.pos += 1;
            return Ok(Value::Bool(!self.not()?.truthy()));
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Value, EvalError> {
        let left = self.primary()?;
        let Some(Token::Cmp(op)) = self.peek() else {
            return Ok(left);
        };
        self.pos += 1;
        let right = self.primary()?;
        let ord = compare(&left.into_text(), &right.into_text());
        Ok(Value::Bool(op.holds(ord)))
    }

    fn primary(&mut self) -> Result<Value, EvalError> {
        match self.bump() {
            Some(Token::LParen) => {
                let value = self.or()?;
                self.expect(Token::RParen)?;
                Ok(value)
            }
            Some(Token::Word("defined")) if self.peek() == Some(Token::LParen) => {
                self.pos += 1;
                let name = match self.bump() {
                    Some(Token::Word(name) | Token::Str(name)) => name,
                    _ => return Err(bad_if_expression("defined() needs a variable name")),
                };
                self.expect(Token::RParen)?;
                Ok(Value::Bool((self.defined)(name)))
            }
            Some(Token::Word(w) | Token::Str(w)) => Ok(Value::Text(w.to_owned())),
            Some(t) => Err(bad_if_expression(format!("unexpected {}", t.describe()))),
            None => Err(bad_if_expression("unexpected end of expression")),
        }
    }
}

/// Evaluate an expanded `if` expression. `defined` answers `defined(NAME)`.
pub fn evaluate(text: &str, defined: &dyn Fn(&str) -> bool) -> Result<bool, EvalError> {
    let tokens = tokenize(text)?;
    if tokens.is_empty() {
        return Err(bad_if_expression("empty expression"));
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        defined,
    };
    let value = parser.or()?;
    if let Some(extra) = parser.peek() {
        return Err(bad_if_expression(format!("unexpected {}", extra.describe())));
    }
    Ok(value.truthy())
}
