//! # Path-Query Expression Evaluation
//!
//! Parser and evaluator for the expression language embedded in workflow
//! documents. Action arguments wrap expressions in `${ … }` templates;
//! switch conditions use the bare expression form. The language is a
//! JQ-compatible subset:
//!
//! - identity `.` and field paths `.a.b` with array indices `.items[0]`
//! - literals: numbers, double-quoted strings, `true`, `false`, `null`
//! - comparisons `==`, `!=`, `<`, `<=`, `>`, `>=` over the JQ total
//!   order (null < false < true < numbers < strings < arrays < objects)
//! - boolean `and` / `or`, grouping parentheses
//! - top-level `,` sequences producing multiple results
//!
//! Evaluating an expression yields a result sequence; callers that need a
//! single value take the first element via [`Expression::evaluate_first`].

use serde_json::{Number, Value};
use std::cmp::Ordering;
use thiserror::Error;

const NULL: Value = Value::Null;

/// Failure while parsing or evaluating an expression.
#[derive(Debug, Clone, Error)]
pub enum ExpressionError {
    #[error("invalid expression '{expression}': {reason}")]
    Parse { expression: String, reason: String },

    #[error("failed to evaluate expression '{expression}': {reason}")]
    Eval { expression: String, reason: String },
}

/// Returns true when a string leaf uses the `${ … }` template syntax.
pub fn is_template(candidate: &str) -> bool {
    candidate.len() >= 3 && candidate.starts_with("${") && candidate.ends_with('}')
}

/// Extracts the trimmed expression body from a `${ … }` template.
pub fn extract_template(candidate: &str) -> Option<&str> {
    let body = candidate.strip_prefix("${")?.strip_suffix('}')?;
    Some(body.trim())
}

/// JQ truthiness: everything except `null` and `false` is true.
pub fn is_truthy(value: &Value) -> bool {
    !matches!(value, Value::Null | Value::Bool(false))
}

/// A parsed path-query expression, ready for repeated evaluation.
#[derive(Debug, Clone)]
pub struct Expression {
    source: String,
    terms: Vec<Expr>,
}

#[derive(Debug, Clone)]
enum Expr {
    Literal(Value),
    Path(Vec<PathSegment>),
    Compare {
        op: CompareOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
}

#[derive(Debug, Clone)]
enum PathSegment {
    Field(String),
    Index(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Expression {
    /// Parse an expression from its source text.
    pub fn parse(source: &str) -> Result<Self, ExpressionError> {
        let mut parser = Parser::new(source);
        parser.skip_whitespace();
        if parser.at_end() {
            return Err(parser.parse_error("expression cannot be empty"));
        }

        let mut terms = vec![parser.parse_expr()?];
        parser.skip_whitespace();
        while parser.eat(',') {
            terms.push(parser.parse_expr()?);
            parser.skip_whitespace();
        }

        if !parser.at_end() {
            return Err(parser.parse_error("unexpected trailing characters"));
        }

        Ok(Self {
            source: source.to_string(),
            terms,
        })
    }

    /// The expression text as authored (trimmed template body).
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluate against a data tree, producing the full result sequence.
    pub fn evaluate(&self, data: &Value) -> Result<Vec<Value>, ExpressionError> {
        self.terms
            .iter()
            .map(|term| {
                eval_expr(term, data).map_err(|reason| ExpressionError::Eval {
                    expression: self.source.clone(),
                    reason,
                })
            })
            .collect()
    }

    /// Evaluate and take the first result of the sequence.
    pub fn evaluate_first(&self, data: &Value) -> Result<Value, ExpressionError> {
        self.evaluate(data)?
            .into_iter()
            .next()
            .ok_or_else(|| ExpressionError::Eval {
                expression: self.source.clone(),
                reason: "produced no results".to_string(),
            })
    }
}

fn eval_expr(expr: &Expr, data: &Value) -> Result<Value, String> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Path(segments) => eval_path(segments, data),
        Expr::Compare { op, left, right } => {
            let left_value = eval_expr(left, data)?;
            let right_value = eval_expr(right, data)?;
            let outcome = match op {
                CompareOp::Eq => compare_values(&left_value, &right_value) == Ordering::Equal,
                CompareOp::Ne => compare_values(&left_value, &right_value) != Ordering::Equal,
                CompareOp::Lt => compare_values(&left_value, &right_value) == Ordering::Less,
                CompareOp::Le => compare_values(&left_value, &right_value) != Ordering::Greater,
                CompareOp::Gt => compare_values(&left_value, &right_value) == Ordering::Greater,
                CompareOp::Ge => compare_values(&left_value, &right_value) != Ordering::Less,
            };
            Ok(Value::Bool(outcome))
        }
        Expr::And(left, right) => {
            let left_value = eval_expr(left, data)?;
            if !is_truthy(&left_value) {
                return Ok(Value::Bool(false));
            }
            let right_value = eval_expr(right, data)?;
            Ok(Value::Bool(is_truthy(&right_value)))
        }
        Expr::Or(left, right) => {
            let left_value = eval_expr(left, data)?;
            if is_truthy(&left_value) {
                return Ok(Value::Bool(true));
            }
            let right_value = eval_expr(right, data)?;
            Ok(Value::Bool(is_truthy(&right_value)))
        }
    }
}

fn eval_path(segments: &[PathSegment], data: &Value) -> Result<Value, String> {
    let mut current = data;
    for segment in segments {
        current = match (segment, current) {
            (PathSegment::Field(name), Value::Object(map)) => map.get(name).unwrap_or(&NULL),
            (PathSegment::Field(_), Value::Null) => &NULL,
            (PathSegment::Field(name), other) => {
                return Err(format!("cannot index {} with '{}'", json_type_name(other), name));
            }
            (PathSegment::Index(index), Value::Array(items)) => items.get(*index).unwrap_or(&NULL),
            (PathSegment::Index(_), Value::Null) => &NULL,
            (PathSegment::Index(index), other) => {
                return Err(format!("cannot index {} with number {}", json_type_name(other), index));
            }
        };
    }
    Ok(current.clone())
}

/// Total order over JSON values, matching JQ's sort semantics.
fn compare_values(left: &Value, right: &Value) -> Ordering {
    let rank = type_rank(left).cmp(&type_rank(right));
    if rank != Ordering::Equal {
        return rank;
    }

    match (left, right) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        (Value::Number(a), Value::Number(b)) => number_as_f64(a)
            .partial_cmp(&number_as_f64(b))
            .unwrap_or(Ordering::Equal),
        (Value::String(a), Value::String(b)) => a.cmp(b),
        (Value::Array(a), Value::Array(b)) => {
            for (item_a, item_b) in a.iter().zip(b.iter()) {
                let ordering = compare_values(item_a, item_b);
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            a.len().cmp(&b.len())
        }
        (Value::Object(a), Value::Object(b)) => {
            let mut keys_a: Vec<&String> = a.keys().collect();
            let mut keys_b: Vec<&String> = b.keys().collect();
            keys_a.sort();
            keys_b.sort();
            let key_ordering = keys_a.cmp(&keys_b);
            if key_ordering != Ordering::Equal {
                return key_ordering;
            }
            for key in keys_a {
                let ordering = compare_values(&a[key.as_str()], &b[key.as_str()]);
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            Ordering::Equal
        }
        _ => Ordering::Equal,
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

fn number_as_f64(number: &Number) -> f64 {
    number.as_f64().unwrap_or(f64::NAN)
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

struct Parser<'a> {
    source: &'a str,
    chars: Vec<char>,
    position: usize,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.chars().collect(),
            position: 0,
        }
    }

    fn parse_expr(&mut self) -> Result<Expr, ExpressionError> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expr, ExpressionError> {
        let mut left = self.parse_and()?;
        while self.try_keyword("or") {
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, ExpressionError> {
        let mut left = self.parse_compare()?;
        while self.try_keyword("and") {
            let right = self.parse_compare()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_compare(&mut self) -> Result<Expr, ExpressionError> {
        let left = self.parse_term()?;
        self.skip_whitespace();

        let op = if self.eat_str("==") {
            CompareOp::Eq
        } else if self.eat_str("!=") {
            CompareOp::Ne
        } else if self.eat_str("<=") {
            CompareOp::Le
        } else if self.eat_str(">=") {
            CompareOp::Ge
        } else if self.peek() == Some('<') {
            self.bump();
            CompareOp::Lt
        } else if self.peek() == Some('>') {
            self.bump();
            CompareOp::Gt
        } else {
            return Ok(left);
        };

        let right = self.parse_term()?;
        Ok(Expr::Compare {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    fn parse_term(&mut self) -> Result<Expr, ExpressionError> {
        self.skip_whitespace();
        match self.peek() {
            Some('(') => {
                self.bump();
                let inner = self.parse_expr()?;
                self.skip_whitespace();
                if !self.eat(')') {
                    return Err(self.parse_error("expected closing ')'"));
                }
                Ok(inner)
            }
            Some('.') => self.parse_path(),
            Some('"') => {
                let text = self.parse_string_literal()?;
                Ok(Expr::Literal(Value::String(text)))
            }
            Some(character) if character.is_ascii_digit() || character == '-' => self.parse_number_literal(),
            Some(character) if is_identifier_start(character) => {
                let identifier = self.read_identifier();
                match identifier.as_str() {
                    "true" => Ok(Expr::Literal(Value::Bool(true))),
                    "false" => Ok(Expr::Literal(Value::Bool(false))),
                    "null" => Ok(Expr::Literal(Value::Null)),
                    other => Err(self.parse_error(&format!("unsupported identifier '{other}'"))),
                }
            }
            Some(character) => Err(self.parse_error(&format!("unexpected character '{character}'"))),
            None => Err(self.parse_error("unexpected end of expression")),
        }
    }

    fn parse_path(&mut self) -> Result<Expr, ExpressionError> {
        self.bump(); // consume the leading '.'
        let mut segments = Vec::new();

        loop {
            match self.peek() {
                Some('[') => {
                    segments.push(self.parse_index()?);
                    while self.peek() == Some('[') {
                        segments.push(self.parse_index()?);
                    }
                }
                Some(character) if is_identifier_start(character) => {
                    segments.push(PathSegment::Field(self.read_identifier()));
                    while self.peek() == Some('[') {
                        segments.push(self.parse_index()?);
                    }
                }
                _ => {
                    // a bare '.' is the identity path
                    break;
                }
            }

            if self.peek() == Some('.') {
                self.bump();
                match self.peek() {
                    Some('[') => {}
                    Some(character) if is_identifier_start(character) => {}
                    _ => return Err(self.parse_error("expected a field name after '.'")),
                }
            } else {
                break;
            }
        }

        Ok(Expr::Path(segments))
    }

    fn parse_index(&mut self) -> Result<PathSegment, ExpressionError> {
        self.bump(); // consume '['
        let mut digits = String::new();
        while let Some(character) = self.peek() {
            if character.is_ascii_digit() {
                digits.push(character);
                self.bump();
            } else {
                break;
            }
        }
        if !self.eat(']') {
            return Err(self.parse_error("expected closing ']' in array index"));
        }
        digits
            .parse::<usize>()
            .map(PathSegment::Index)
            .map_err(|_| self.parse_error("array index must be a non-negative integer"))
    }

    fn parse_string_literal(&mut self) -> Result<String, ExpressionError> {
        self.bump(); // consume the opening quote
        let mut text = String::new();
        loop {
            match self.bump() {
                Some('"') => return Ok(text),
                Some('\\') => match self.bump() {
                    Some('"') => text.push('"'),
                    Some('\\') => text.push('\\'),
                    Some('/') => text.push('/'),
                    Some('n') => text.push('\n'),
                    Some('t') => text.push('\t'),
                    Some('r') => text.push('\r'),
                    Some(other) => {
                        return Err(self.parse_error(&format!("unsupported escape '\\{other}' in string literal")));
                    }
                    None => return Err(self.parse_error("unterminated string literal")),
                },
                Some(character) => text.push(character),
                None => return Err(self.parse_error("unterminated string literal")),
            }
        }
    }

    fn parse_number_literal(&mut self) -> Result<Expr, ExpressionError> {
        let mut text = String::new();
        if self.peek() == Some('-') {
            text.push('-');
            self.bump();
        }
        let mut saw_dot = false;
        let mut saw_exponent = false;
        while let Some(character) = self.peek() {
            match character {
                '0'..='9' => text.push(character),
                '.' if !saw_dot && !saw_exponent => {
                    saw_dot = true;
                    text.push(character);
                }
                'e' | 'E' if !saw_exponent => {
                    saw_exponent = true;
                    text.push(character);
                    self.bump();
                    if let Some(sign) = self.peek()
                        && (sign == '+' || sign == '-')
                    {
                        text.push(sign);
                        self.bump();
                    }
                    continue;
                }
                _ => break,
            }
            self.bump();
        }

        if !saw_dot && !saw_exponent {
            if let Ok(integer) = text.parse::<i64>() {
                return Ok(Expr::Literal(Value::Number(Number::from(integer))));
            }
        }
        let parsed: f64 = text
            .parse()
            .map_err(|_| self.parse_error(&format!("invalid number literal '{text}'")))?;
        Number::from_f64(parsed)
            .map(|number| Expr::Literal(Value::Number(number)))
            .ok_or_else(|| self.parse_error(&format!("number literal '{text}' is not representable")))
    }

    fn try_keyword(&mut self, keyword: &str) -> bool {
        let saved = self.position;
        self.skip_whitespace();
        let identifier = self.read_identifier();
        if identifier == keyword {
            true
        } else {
            self.position = saved;
            false
        }
    }

    fn read_identifier(&mut self) -> String {
        let mut identifier = String::new();
        while let Some(character) = self.peek() {
            if is_identifier_continue(character) {
                identifier.push(character);
                self.bump();
            } else {
                break;
            }
        }
        identifier
    }

    fn skip_whitespace(&mut self) {
        while let Some(character) = self.peek() {
            if character.is_whitespace() {
                self.bump();
            } else {
                break;
            }
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.position).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let character = self.peek();
        if character.is_some() {
            self.position += 1;
        }
        character
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn eat_str(&mut self, expected: &str) -> bool {
        let candidate: String = self
            .chars
            .iter()
            .skip(self.position)
            .take(expected.chars().count())
            .collect();
        if candidate == expected {
            self.position += expected.chars().count();
            true
        } else {
            false
        }
    }

    fn at_end(&self) -> bool {
        self.position >= self.chars.len()
    }

    fn parse_error(&self, reason: &str) -> ExpressionError {
        ExpressionError::Parse {
            expression: self.source.to_string(),
            reason: reason.to_string(),
        }
    }
}

fn is_identifier_start(character: char) -> bool {
    character.is_ascii_alphabetic() || character == '_'
}

fn is_identifier_continue(character: char) -> bool {
    character.is_ascii_alphanumeric() || character == '_'
}
