//! Arithmetic calculator.
//!
//! Evaluates `+ - * /` expressions with parentheses, unary signs, and
//! decimal literals. No variables or function calls.

use async_trait::async_trait;
use parley_core::{ToolDescriptor, ToolParameters};
use serde_json::{json, Value};

use crate::error::ToolError;
use crate::tool::{required_str, Tool};

const MAX_DEPTH: usize = 64;

/// Largest integer an f64 holds exactly.
const MAX_EXACT_INT: f64 = 9_007_199_254_740_992.0;

pub struct CalculatorTool;

#[async_trait]
impl Tool for CalculatorTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new(
            "calculator",
            "Evaluate an arithmetic expression with + - * / and parentheses",
        )
    }

    async fn execute(&self, params: &ToolParameters) -> Result<Value, ToolError> {
        let expression = required_str(params, "expression")?;
        let value = evaluate(expression)?;
        tracing::debug!(expression = %expression, value, "Evaluated expression");
        Ok(number_json(value))
    }
}

/// Evaluate an arithmetic expression.
pub fn evaluate(expression: &str) -> Result<f64, ToolError> {
    let tokens = tokenize(expression)?;
    if tokens.is_empty() {
        return Err(ToolError::Evaluation("empty expression".to_string()));
    }
    let mut parser = Parser { tokens, pos: 0 };
    let value = parser.expr(0)?;
    if let Some(tok) = parser.peek() {
        return Err(ToolError::Evaluation(format!("unexpected token {:?}", tok)));
    }
    if !value.is_finite() {
        return Err(ToolError::Evaluation("result is not finite".to_string()));
    }
    Ok(value)
}

/// Integral values become JSON integers, everything else stays a float.
fn number_json(value: f64) -> Value {
    if value.fract() == 0.0 && value.abs() <= MAX_EXACT_INT {
        json!(value as i64)
    } else {
        json!(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Num(f64),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
}

fn tokenize(input: &str) -> Result<Vec<Token>, ToolError> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(start, c)) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '0'..='9' | '.' => {
                let mut end = start;
                while let Some(&(i, d)) = chars.peek() {
                    if d.is_ascii_digit() || d == '.' {
                        end = i + d.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                let literal = &input[start..end];
                let n = literal.parse::<f64>().map_err(|_| {
                    ToolError::Evaluation(format!("invalid number {:?}", literal))
                })?;
                tokens.push(Token::Num(n));
            }
            _ => {
                let tok = match c {
                    '+' => Token::Plus,
                    '-' => Token::Minus,
                    '*' | '×' => Token::Star,
                    '/' | '÷' => Token::Slash,
                    '(' | '（' => Token::LParen,
                    ')' | '）' => Token::RParen,
                    other => {
                        return Err(ToolError::Evaluation(format!(
                            "unexpected character {:?}",
                            other
                        )))
                    }
                };
                tokens.push(tok);
                chars.next();
            }
        }
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<Token> {
        let tok = self.peek();
        self.pos += 1;
        tok
    }

    fn expr(&mut self, depth: usize) -> Result<f64, ToolError> {
        let mut acc = self.term(depth)?;
        while let Some(tok @ (Token::Plus | Token::Minus)) = self.peek() {
            self.next();
            let rhs = self.term(depth)?;
            acc = if tok == Token::Plus { acc + rhs } else { acc - rhs };
        }
        Ok(acc)
    }

    fn term(&mut self, depth: usize) -> Result<f64, ToolError> {
        let mut acc = self.factor(depth)?;
        while let Some(tok @ (Token::Star | Token::Slash)) = self.peek() {
            self.next();
            let rhs = self.factor(depth)?;
            if tok == Token::Star {
                acc *= rhs;
            } else {
                if rhs == 0.0 {
                    return Err(ToolError::Evaluation("division by zero".to_string()));
                }
                acc /= rhs;
            }
        }
        Ok(acc)
    }

    fn factor(&mut self, depth: usize) -> Result<f64, ToolError> {
        if depth > MAX_DEPTH {
            return Err(ToolError::Evaluation("expression nested too deeply".to_string()));
        }
        match self.next() {
            Some(Token::Num(n)) => Ok(n),
            Some(Token::Minus) => Ok(-self.factor(depth + 1)?),
            Some(Token::Plus) => self.factor(depth + 1),
            Some(Token::LParen) => {
                let value = self.expr(depth + 1)?;
                match self.next() {
                    Some(Token::RParen) => Ok(value),
                    _ => Err(ToolError::Evaluation("unbalanced parentheses".to_string())),
                }
            }
            Some(tok) => Err(ToolError::Evaluation(format!("unexpected token {:?}", tok))),
            None => Err(ToolError::Evaluation("unexpected end of expression".to_string())),
        }
    }
}
