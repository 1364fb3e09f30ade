//! Constrained expression evaluator backing the default [`ScriptEngine`].
//!
//! The grammar is deliberately small: literals, arithmetic, parentheses and
//! calls into the named helper table. Scripts cannot reach anything else.

use async_trait::async_trait;
use serde_json::{Number, Value, json};

use crate::script::{Helpers, ScriptEngine, ScriptError};

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Int(i64),
    Float(f64),
    Str(String),
    Ident(String),
    True,
    False,
    Null,
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
    Comma,
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Literal(Value),
    Call { name: String, args: Vec<Expr> },
    Neg(Box<Expr>),
    Binary { op: BinOp, lhs: Box<Expr>, rhs: Box<Expr> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
}

fn lex(input: &str) -> Result<Vec<Token>, ScriptError> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            ' ' | '\t' | '\n' | '\r' => {
                chars.next();
            }
            '+' => {
                chars.next();
                tokens.push(Token::Plus);
            }
            '-' => {
                chars.next();
                tokens.push(Token::Minus);
            }
            '*' => {
                chars.next();
                tokens.push(Token::Star);
            }
            '/' => {
                chars.next();
                tokens.push(Token::Slash);
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            ',' => {
                chars.next();
                tokens.push(Token::Comma);
            }
            '\'' | '"' => {
                let quote = c;
                chars.next();
                let mut text = String::new();
                loop {
                    match chars.next() {
                        None => return Err(ScriptError::UnexpectedEnd),
                        Some('\\') => match chars.next() {
                            None => return Err(ScriptError::UnexpectedEnd),
                            Some('n') => text.push('\n'),
                            Some('t') => text.push('\t'),
                            Some(escaped) => text.push(escaped),
                        },
                        Some(end) if end == quote => break,
                        Some(other) => text.push(other),
                    }
                }
                tokens.push(Token::Str(text));
            }
            '0'..='9' => {
                let mut digits = String::new();
                let mut is_float = false;
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_digit() {
                        digits.push(d);
                        chars.next();
                    }
                    else if d == '.' && !is_float {
                        is_float = true;
                        digits.push(d);
                        chars.next();
                    }
                    else {
                        break;
                    }
                }
                if is_float {
                    let value = digits
                        .parse::<f64>()
                        .map_err(|_| ScriptError::UnexpectedToken(digits.clone()))?;
                    tokens.push(Token::Float(value));
                }
                else {
                    let value = digits
                        .parse::<i64>()
                        .map_err(|_| ScriptError::UnexpectedToken(digits.clone()))?;
                    tokens.push(Token::Int(value));
                }
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut ident = String::new();
                while let Some(&i) = chars.peek() {
                    if i.is_ascii_alphanumeric() || i == '_' {
                        ident.push(i);
                        chars.next();
                    }
                    else {
                        break;
                    }
                }
                tokens.push(match ident.as_str() {
                    "true" => Token::True,
                    "false" => Token::False,
                    "null" => Token::Null,
                    _ => Token::Ident(ident),
                });
            }
            other => return Err(ScriptError::UnexpectedChar(other)),
        }
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self { Self { tokens, pos: 0 } }

    fn peek(&self) -> Option<&Token> { self.tokens.get(self.pos) }

    fn next(&mut self) -> Result<Token, ScriptError> {
        let token = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or(ScriptError::UnexpectedEnd)?;
        self.pos += 1;
        Ok(token)
    }

    fn expect(&mut self, expected: Token) -> Result<(), ScriptError> {
        let token = self.next()?;
        if token == expected {
            Ok(())
        }
        else {
            Err(ScriptError::UnexpectedToken(format!("{token:?}")))
        }
    }

    fn parse(mut self) -> Result<Expr, ScriptError> {
        let expr = self.expression()?;
        match self.peek() {
            None => Ok(expr),
            Some(trailing) => {
                Err(ScriptError::UnexpectedToken(format!("{trailing:?}")))
            }
        }
    }

    fn expression(&mut self) -> Result<Expr, ScriptError> {
        let mut lhs = self.term()?;
        while let Some(op) = match self.peek() {
            Some(Token::Plus) => Some(BinOp::Add),
            Some(Token::Minus) => Some(BinOp::Sub),
            _ => None,
        } {
            self.pos += 1;
            let rhs = self.term()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn term(&mut self) -> Result<Expr, ScriptError> {
        let mut lhs = self.unary()?;
        while let Some(op) = match self.peek() {
            Some(Token::Star) => Some(BinOp::Mul),
            Some(Token::Slash) => Some(BinOp::Div),
            _ => None,
        } {
            self.pos += 1;
            let rhs = self.unary()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr, ScriptError> {
        if matches!(self.peek(), Some(Token::Minus)) {
            self.pos += 1;
            return Ok(Expr::Neg(Box::new(self.unary()?)));
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Expr, ScriptError> {
        match self.next()? {
            Token::Int(value) => Ok(Expr::Literal(json!(value))),
            Token::Float(value) => Ok(Expr::Literal(json!(value))),
            Token::Str(value) => Ok(Expr::Literal(json!(value))),
            Token::True => Ok(Expr::Literal(json!(true))),
            Token::False => Ok(Expr::Literal(json!(false))),
            Token::Null => Ok(Expr::Literal(Value::Null)),
            Token::LParen => {
                let expr = self.expression()?;
                self.expect(Token::RParen)?;
                Ok(expr)
            }
            Token::Ident(name) => {
                // A bare identifier is a nullary helper lookup.
                if !matches!(self.peek(), Some(Token::LParen)) {
                    return Ok(Expr::Call { name, args: Vec::new() });
                }
                self.pos += 1;
                let mut args = Vec::new();
                if matches!(self.peek(), Some(Token::RParen)) {
                    self.pos += 1;
                    return Ok(Expr::Call { name, args });
                }
                loop {
                    args.push(self.expression()?);
                    match self.next()? {
                        Token::Comma => {}
                        Token::RParen => break,
                        other => {
                            return Err(ScriptError::UnexpectedToken(
                                format!("{other:?}"),
                            ));
                        }
                    }
                }
                Ok(Expr::Call { name, args })
            }
            other => Err(ScriptError::UnexpectedToken(format!("{other:?}"))),
        }
    }
}

/// Default script engine: evaluates the constrained grammar against a
/// helper table.
#[derive(Clone)]
pub struct ExprEngine {
    helpers: Helpers,
}

impl ExprEngine {
    pub fn new(helpers: Helpers) -> Self { Self { helpers } }

    /// Engine with the stock helper set.
    pub fn standard() -> Self { Self::new(Helpers::standard()) }

    pub fn eval_sync(&self, script: &str) -> Result<Value, ScriptError> {
        let tokens = lex(script)?;
        let expr = Parser::new(tokens).parse()?;
        self.eval_expr(&expr)
    }

    fn eval_expr(&self, expr: &Expr) -> Result<Value, ScriptError> {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Call { name, args } => {
                let helper = self
                    .helpers
                    .get(name)
                    .ok_or_else(|| ScriptError::UnknownHelper(name.clone()))?;
                let args = args
                    .iter()
                    .map(|arg| self.eval_expr(arg))
                    .collect::<Result<Vec<_>, _>>()?;
                helper(&args)
            }
            Expr::Neg(operand) => match self.eval_expr(operand)? {
                Value::Number(number) => negate(&number),
                other => Err(ScriptError::Type(format!(
                    "cannot negate {other}"
                ))),
            },
            Expr::Binary { op, lhs, rhs } => {
                let lhs = self.eval_expr(lhs)?;
                let rhs = self.eval_expr(rhs)?;
                apply(*op, &lhs, &rhs)
            }
        }
    }
}

#[async_trait]
impl ScriptEngine for ExprEngine {
    async fn eval(&self, script: &str) -> Result<Value, ScriptError> {
        self.eval_sync(script)
    }
}

fn negate(number: &Number) -> Result<Value, ScriptError> {
    if let Some(int) = number.as_i64() {
        int.checked_neg()
            .map(|negated| json!(negated))
            .ok_or_else(|| ScriptError::Type("integer overflow".to_string()))
    }
    else {
        Ok(json!(-number.as_f64().unwrap_or(0.0)))
    }
}

fn apply(op: BinOp, lhs: &Value, rhs: &Value) -> Result<Value, ScriptError> {
    // `+` doubles as string concatenation when either side is a string.
    if op == BinOp::Add
        && (matches!(lhs, Value::String(_)) || matches!(rhs, Value::String(_)))
    {
        return Ok(json!(format!("{}{}", stringify(lhs), stringify(rhs))));
    }

    let (Value::Number(lhs), Value::Number(rhs)) = (lhs, rhs) else {
        return Err(ScriptError::Type(format!(
            "cannot apply arithmetic to {lhs} and {rhs}"
        )));
    };

    // Division always yields a float; the other operators stay integral
    // when both operands are integers.
    match (op, lhs.as_i64(), rhs.as_i64()) {
        (BinOp::Add, Some(a), Some(b)) => a
            .checked_add(b)
            .map(|result| json!(result))
            .ok_or_else(|| ScriptError::Type("integer overflow".to_string())),
        (BinOp::Sub, Some(a), Some(b)) => a
            .checked_sub(b)
            .map(|result| json!(result))
            .ok_or_else(|| ScriptError::Type("integer overflow".to_string())),
        (BinOp::Mul, Some(a), Some(b)) => a
            .checked_mul(b)
            .map(|result| json!(result))
            .ok_or_else(|| ScriptError::Type("integer overflow".to_string())),
        _ => {
            let a = lhs.as_f64().unwrap_or(0.0);
            let b = rhs.as_f64().unwrap_or(0.0);
            let result = match op {
                BinOp::Add => a + b,
                BinOp::Sub => a - b,
                BinOp::Mul => a * b,
                BinOp::Div => {
                    if b == 0.0 {
                        return Err(ScriptError::Type(
                            "division by zero".to_string(),
                        ));
                    }
                    a / b
                }
            };
            Ok(json!(result))
        }
    }
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> ExprEngine {
        ExprEngine::new(Helpers::new().with_helper("seven", |_| Ok(json!(7))))
    }

    #[test]
    fn literals() {
        let engine = engine();
        assert_eq!(engine.eval_sync("42").unwrap(), json!(42));
        assert_eq!(engine.eval_sync("2.5").unwrap(), json!(2.5));
        assert_eq!(engine.eval_sync("'hi'").unwrap(), json!("hi"));
        assert_eq!(engine.eval_sync("\"hi\"").unwrap(), json!("hi"));
        assert_eq!(engine.eval_sync("true").unwrap(), json!(true));
        assert_eq!(engine.eval_sync("null").unwrap(), Value::Null);
    }

    #[test]
    fn arithmetic_precedence() {
        let engine = engine();
        assert_eq!(engine.eval_sync("2 + 3 * 4").unwrap(), json!(14));
        assert_eq!(engine.eval_sync("(2 + 3) * 4").unwrap(), json!(20));
        assert_eq!(engine.eval_sync("-3 + 10").unwrap(), json!(7));
        assert_eq!(engine.eval_sync("10 / 4").unwrap(), json!(2.5));
    }

    #[test]
    fn integer_arithmetic_stays_integral() {
        let engine = engine();
        assert_eq!(engine.eval_sync("2 + 3").unwrap(), json!(5));
        assert!(engine.eval_sync("2 + 3").unwrap().is_i64());
    }

    #[test]
    fn string_concatenation() {
        let engine = engine();
        assert_eq!(
            engine.eval_sync("'user-' + 42").unwrap(),
            json!("user-42")
        );
        assert_eq!(
            engine.eval_sync("seven() + '!'").unwrap(),
            json!("7!")
        );
    }

    #[test]
    fn helper_calls_and_bare_lookups() {
        let engine = engine();
        assert_eq!(engine.eval_sync("seven()").unwrap(), json!(7));
        assert_eq!(engine.eval_sync("seven").unwrap(), json!(7));
        assert_eq!(engine.eval_sync("seven() * 2 + 1").unwrap(), json!(15));
    }

    #[test]
    fn helper_call_with_arguments() {
        let engine = ExprEngine::new(Helpers::new().with_helper(
            "add",
            |args| {
                Ok(json!(
                    args.iter().filter_map(|a| a.as_i64()).sum::<i64>()
                ))
            },
        ));
        assert_eq!(engine.eval_sync("add(1, 2, 3)").unwrap(), json!(6));
        assert_eq!(engine.eval_sync("add(1 + 1, 2)").unwrap(), json!(4));
    }

    #[test]
    fn unknown_helper_is_an_error() {
        let engine = engine();
        assert!(matches!(
            engine.eval_sync("missing()").unwrap_err(),
            ScriptError::UnknownHelper(name) if name == "missing"
        ));
    }

    #[test]
    fn division_by_zero_is_an_error() {
        let engine = engine();
        assert!(matches!(
            engine.eval_sync("1 / 0").unwrap_err(),
            ScriptError::Type(_)
        ));
    }

    #[test]
    fn malformed_expressions_are_rejected() {
        let engine = engine();
        assert!(engine.eval_sync("").is_err());
        assert!(engine.eval_sync("1 +").is_err());
        assert!(engine.eval_sync("seven(").is_err());
        assert!(engine.eval_sync("'open").is_err());
        assert!(engine.eval_sync("1 2").is_err());
        assert!(engine.eval_sync("@").is_err());
    }

    #[test]
    fn strings_do_not_multiply() {
        let engine = engine();
        assert!(matches!(
            engine.eval_sync("'a' * 2").unwrap_err(),
            ScriptError::Type(_)
        ));
    }

    #[tokio::test]
    async fn engine_trait_eval_matches_sync() {
        let engine = engine();
        assert_eq!(engine.eval("seven() + 1").await.unwrap(), json!(8));
    }
}
