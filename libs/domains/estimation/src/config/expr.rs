//! Arithmetic evaluation for interpolated expressions.
//!
//! Supports decimal literals, `+ - * / %`, right-associative `^`, unary signs
//! and parentheses. Anything else (identifiers, strings, function calls) is an
//! error, which callers treat as "keep the text as written".

use std::iter::Peekable;
use std::str::CharIndices;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum EvalError {
    #[error("unexpected character '{0}' at offset {1}")]
    UnexpectedChar(char, usize),

    #[error("unexpected end of expression")]
    UnexpectedEnd,

    #[error("unexpected input after offset {0}")]
    TrailingInput(usize),

    #[error("invalid number '{0}'")]
    InvalidNumber(String),

    #[error("expression does not evaluate to a finite number")]
    NonFinite,

    #[error("expression nested deeper than {0} levels")]
    TooDeep(usize),
}

/// Nesting allowed through parentheses, unary signs and exponents
pub const MAX_DEPTH: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Number(f64),
    Op(char),
    Open,
    Close,
}

/// Evaluate an arithmetic expression to a number
pub fn evaluate(expression: &str) -> Result<f64, EvalError> {
    let tokens = tokenize(expression)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let value = parser.expr()?;
    if parser.pos < parser.tokens.len() {
        return Err(EvalError::TrailingInput(parser.pos));
    }
    if value.is_finite() {
        Ok(value)
    } else {
        Err(EvalError::NonFinite)
    }
}

fn tokenize(input: &str) -> Result<Vec<(Token, usize)>, EvalError> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(offset, c)) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '0'..='9' | '.' => {
                let number = read_number(&mut chars);
                let value = number
                    .parse::<f64>()
                    .map_err(|_| EvalError::InvalidNumber(number.clone()))?;
                tokens.push((Token::Number(value), offset));
            }
            '+' | '-' | '*' | '/' | '%' | '^' => {
                chars.next();
                tokens.push((Token::Op(c), offset));
            }
            '(' => {
                chars.next();
                tokens.push((Token::Open, offset));
            }
            ')' => {
                chars.next();
                tokens.push((Token::Close, offset));
            }
            other => return Err(EvalError::UnexpectedChar(other, offset)),
        }
    }

    Ok(tokens)
}

fn read_number(chars: &mut Peekable<CharIndices<'_>>) -> String {
    let mut number = String::new();
    while let Some(&(_, c)) = chars.peek() {
        if c.is_ascii_digit() || c == '.' {
            number.push(c);
            chars.next();
        } else if (c == 'e' || c == 'E') && !number.contains(['e', 'E']) {
            number.push(c);
            chars.next();
            if let Some(&(_, sign)) = chars.peek() {
                if sign == '+' || sign == '-' {
                    number.push(sign);
                    chars.next();
                }
            }
        } else {
            break;
        }
    }
    number
}

struct Parser {
    tokens: Vec<(Token, usize)>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).map(|(t, _)| *t)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.peek();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expr(&mut self) -> Result<f64, EvalError> {
        let mut value = self.term()?;
        while let Some(Token::Op(op @ ('+' | '-'))) = self.peek() {
            self.next();
            let rhs = self.term()?;
            value = if op == '+' { value + rhs } else { value - rhs };
        }
        Ok(value)
    }

    fn term(&mut self) -> Result<f64, EvalError> {
        let mut value = self.unary()?;
        while let Some(Token::Op(op @ ('*' | '/' | '%'))) = self.peek() {
            self.next();
            let rhs = self.unary()?;
            value = match op {
                '*' => value * rhs,
                '/' => value / rhs,
                _ => value % rhs,
            };
        }
        Ok(value)
    }

    /// All recursion passes through here
    fn unary(&mut self) -> Result<f64, EvalError> {
        if self.depth >= MAX_DEPTH {
            return Err(EvalError::TooDeep(MAX_DEPTH));
        }
        self.depth += 1;
        let value = self.signed();
        self.depth -= 1;
        value
    }

    fn signed(&mut self) -> Result<f64, EvalError> {
        match self.peek() {
            Some(Token::Op('-')) => {
                self.next();
                Ok(-self.unary()?)
            }
            Some(Token::Op('+')) => {
                self.next();
                self.unary()
            }
            _ => self.power(),
        }
    }

    fn power(&mut self) -> Result<f64, EvalError> {
        let base = self.primary()?;
        if let Some(Token::Op('^')) = self.peek() {
            self.next();
            let exponent = self.unary()?;
            return Ok(base.powf(exponent));
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<f64, EvalError> {
        let offset = self.tokens.get(self.pos).map(|(_, o)| *o);
        match self.next() {
            Some(Token::Number(n)) => Ok(n),
            Some(Token::Open) => {
                let value = self.expr()?;
                match self.next() {
                    Some(Token::Close) => Ok(value),
                    Some(_) => Err(EvalError::TrailingInput(self.pos - 1)),
                    None => Err(EvalError::UnexpectedEnd),
                }
            }
            Some(Token::Op(c)) => Err(EvalError::UnexpectedChar(c, offset.unwrap_or_default())),
            Some(Token::Close) => Err(EvalError::UnexpectedChar(')', offset.unwrap_or_default())),
            None => Err(EvalError::UnexpectedEnd),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precedence_and_grouping() {
        assert_eq!(evaluate("1 + 2 * 3"), Ok(7.0));
        assert_eq!(evaluate("(1 + 2) * 3"), Ok(9.0));
        assert_eq!(evaluate("10 / 4"), Ok(2.5));
        assert_eq!(evaluate("10 % 4"), Ok(2.0));
        assert_eq!(evaluate("2 ^ 3 ^ 2"), Ok(512.0));
        assert_eq!(evaluate("-2 ^ 2"), Ok(-4.0));
        assert_eq!(evaluate("2 * -3"), Ok(-6.0));
    }

    #[test]
    fn test_literals() {
        assert_eq!(evaluate("100"), Ok(100.0));
        assert_eq!(evaluate(" 0.5 "), Ok(0.5));
        assert_eq!(evaluate("1e3"), Ok(1000.0));
        assert_eq!(evaluate("1024 * 1024 * 1024"), Ok(1073741824.0));
    }

    #[test]
    fn test_non_arithmetic_text_fails() {
        assert!(matches!(
            evaluate("us-central1"),
            Err(EvalError::UnexpectedChar('u', 0))
        ));
        assert!(evaluate("google_compute_image.base.self_link").is_err());
        assert!(evaluate("10GB").is_err());
        assert_eq!(evaluate(""), Err(EvalError::UnexpectedEnd));
        assert_eq!(evaluate("(1 + 2"), Err(EvalError::UnexpectedEnd));
        assert!(matches!(evaluate("1 2"), Err(EvalError::TrailingInput(_))));
        assert!(matches!(evaluate("1.2.3"), Err(EvalError::InvalidNumber(_))));
    }

    #[test]
    fn test_deep_nesting_fails_instead_of_overflowing() {
        let parens = format!("{}1{}", "(".repeat(10_000), ")".repeat(10_000));
        assert_eq!(evaluate(&parens), Err(EvalError::TooDeep(MAX_DEPTH)));

        let signs = format!("{}1", "-".repeat(10_000));
        assert_eq!(evaluate(&signs), Err(EvalError::TooDeep(MAX_DEPTH)));

        let exponents = vec!["2"; 10_000].join("^");
        assert_eq!(evaluate(&exponents), Err(EvalError::TooDeep(MAX_DEPTH)));
    }

    #[test]
    fn test_moderate_nesting_still_evaluates() {
        let parens = format!("{}7{}", "(".repeat(100), ")".repeat(100));
        assert_eq!(evaluate(&parens), Ok(7.0));
        assert_eq!(evaluate("--3"), Ok(3.0));
    }

    #[test]
    fn test_division_by_zero_is_not_finite() {
        assert_eq!(evaluate("1 / 0"), Err(EvalError::NonFinite));
    }
}
