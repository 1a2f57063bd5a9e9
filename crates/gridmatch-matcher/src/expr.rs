//! Descriptor and `Requirements` expression model: tokenizer, recursive-descent
//! parser, AST, and evaluator.
//!
//! Descriptor text looks like:
//!
//! ```text
//! [ CPUs = 4; Site = "CERN"; Requirements = (other.CPUs <= self.CPUs && other.Site == "CERN"); ]
//! ```
//!
//! `Requirements`, if present, must evaluate to a boolean expression over
//! `self.*` (this descriptor's attributes) and `other.*` (the counterparty's).

use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// A parse failure in descriptor or expression text.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("{0}")]
pub struct ParseError(pub String);

/// An evaluation failure inside the `Requirements` evaluator. Never escapes
/// to callers of `evaluate_requirements` — folded to `false` at that boundary.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EvalError {
    #[error("unknown attribute: {0}")]
    UnknownAttribute(String),
    #[error("type mismatch comparing {0} and {1}")]
    TypeMismatch(String, String),
}

/// Scalar or expression-valued attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Expr(Expr),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => write!(f, "\"{s}\""),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Expr(e) => write!(f, "({e})"),
        }
    }
}

/// Which side of a match an `Attr` reference binds to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    SelfScope,
    Other,
}

/// Comparison operators supported by the `Requirements` sublanguage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// Boolean expression AST for `Requirements`.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Attr(Scope, String),
    Cmp(Box<Expr>, CmpOp, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Str(s) => write!(f, "\"{s}\""),
            Self::Attr(Scope::SelfScope, name) => write!(f, "self.{name}"),
            Self::Attr(Scope::Other, name) => write!(f, "other.{name}"),
            Self::Cmp(l, op, r) => write!(f, "{l} {} {r}", op.as_str()),
            Self::And(l, r) => write!(f, "{l} && {r}"),
            Self::Or(l, r) => write!(f, "{l} || {r}"),
            Self::Not(e) => write!(f, "!{e}"),
        }
    }
}

impl CmpOp {
    fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }
}

/// Unordered attribute -> value mapping, plus parse/render helpers.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Descriptor {
    attrs: BTreeMap<String, Value>,
}

impl Descriptor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attrs.get(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.attrs.insert(name.into(), value);
    }

    /// Iterates attributes in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.attrs.iter()
    }

    /// The parsed `Requirements` expression, defaulting to `true` if absent.
    #[must_use]
    pub fn requirements(&self) -> Expr {
        match self.attrs.get("Requirements") {
            Some(Value::Expr(e)) => e.clone(),
            Some(Value::Bool(b)) => Expr::Bool(*b),
            _ => Expr::Bool(true),
        }
    }

    /// Renders the descriptor back to its classified-attribute text form.
    #[must_use]
    pub fn to_text(&self) -> String {
        let mut out = String::from("[ ");
        for (name, value) in &self.attrs {
            out.push_str(name);
            out.push_str(" = ");
            out.push_str(&value.to_string());
            out.push_str("; ");
        }
        out.push(']');
        out
    }
}

/// Parses descriptor text of the form `[ Name = Value; ... ]`.
pub fn parse(text: &str) -> Result<Descriptor, ParseError> {
    let mut lexer = Lexer::new(text);
    let tokens = lexer.tokenize()?;
    let mut parser = Parser::new(&tokens);
    let descriptor = parser.parse_descriptor()?;
    parser.expect_end()?;
    Ok(descriptor)
}

/// Parses a standalone `Requirements`-style boolean expression (no surrounding
/// attribute list), used for queue `Requirements` text stored separately from
/// a full job descriptor.
pub fn parse_expr(text: &str) -> Result<Expr, ParseError> {
    let mut lexer = Lexer::new(text);
    let tokens = lexer.tokenize()?;
    let mut parser = Parser::new(&tokens);
    let expr = parser.parse_expr_full()?;
    parser.expect_end()?;
    Ok(expr)
}

/// Evaluates `self_desc`'s `Requirements` expression with `self.* <-
/// self_desc` and `other.* <- other_desc` bindings. Unknown attributes and
/// type mismatches fold to `false` rather than propagating an error.
#[must_use]
pub fn evaluate_requirements(self_desc: &Descriptor, other_desc: &Descriptor) -> bool {
    let expr = self_desc.requirements();
    eval(&expr, self_desc, other_desc).unwrap_or(false)
}

/// Same as [`evaluate_requirements`] but surfaces the `EvalError` instead of
/// folding it — used where callers (tests, the site-mask walker) need to
/// distinguish "evaluated false" from "could not evaluate".
pub fn try_evaluate(expr: &Expr, self_desc: &Descriptor, other_desc: &Descriptor) -> Result<bool, EvalError> {
    eval(expr, self_desc, other_desc)
}

#[derive(Debug, Clone, PartialEq)]
enum EvalValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl EvalValue {
    fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "string",
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(x) => Some(*x),
            _ => None,
        }
    }
}

fn eval(expr: &Expr, self_desc: &Descriptor, other_desc: &Descriptor) -> Result<bool, EvalError> {
    match expr {
        Expr::Bool(b) => Ok(*b),
        Expr::And(l, r) => Ok(eval(l, self_desc, other_desc)? && eval(r, self_desc, other_desc)?),
        Expr::Or(l, r) => Ok(eval(l, self_desc, other_desc)? || eval(r, self_desc, other_desc)?),
        Expr::Not(e) => Ok(!eval(e, self_desc, other_desc)?),
        Expr::Cmp(l, op, r) => {
            let lv = resolve(l, self_desc, other_desc)?;
            let rv = resolve(r, self_desc, other_desc)?;
            compare(&lv, *op, &rv)
        }
        Expr::Int(_) | Expr::Float(_) | Expr::Str(_) | Expr::Attr(..) => {
            // A bare scalar/attribute used where a boolean is expected is a
            // type mismatch, not a crash.
            let v = resolve(expr, self_desc, other_desc)?;
            match v {
                EvalValue::Bool(b) => Ok(b),
                other => Err(EvalError::TypeMismatch(other.type_name().to_string(), "bool".to_string())),
            }
        }
    }
}

fn resolve(expr: &Expr, self_desc: &Descriptor, other_desc: &Descriptor) -> Result<EvalValue, EvalError> {
    match expr {
        Expr::Bool(b) => Ok(EvalValue::Bool(*b)),
        Expr::Int(i) => Ok(EvalValue::Int(*i)),
        Expr::Float(x) => Ok(EvalValue::Float(*x)),
        Expr::Str(s) => Ok(EvalValue::Str(s.clone())),
        Expr::Attr(scope, name) => {
            let desc = match scope {
                Scope::SelfScope => self_desc,
                Scope::Other => other_desc,
            };
            let qualified = match scope {
                Scope::SelfScope => format!("self.{name}"),
                Scope::Other => format!("other.{name}"),
            };
            match desc.get(name) {
                Some(Value::Str(s)) => Ok(EvalValue::Str(s.clone())),
                Some(Value::Int(i)) => Ok(EvalValue::Int(*i)),
                Some(Value::Float(x)) => Ok(EvalValue::Float(*x)),
                Some(Value::Bool(b)) => Ok(EvalValue::Bool(*b)),
                Some(Value::Expr(_)) | None => Err(EvalError::UnknownAttribute(qualified)),
            }
        }
        Expr::Cmp(..) | Expr::And(..) | Expr::Or(..) | Expr::Not(..) => {
            Ok(EvalValue::Bool(eval(expr, self_desc, other_desc)?))
        }
    }
}

fn compare(l: &EvalValue, op: CmpOp, r: &EvalValue) -> Result<bool, EvalError> {
    if let (Some(lf), Some(rf)) = (l.as_f64(), r.as_f64()) {
        return Ok(numeric_cmp(lf, op, rf));
    }

    match (l, r) {
        (EvalValue::Str(a), EvalValue::Str(b)) => Ok(string_cmp(a, op, b)),
        (EvalValue::Bool(a), EvalValue::Bool(b)) => match op {
            CmpOp::Eq => Ok(a == b),
            CmpOp::Ne => Ok(a != b),
            _ => Err(EvalError::TypeMismatch("bool".to_string(), "bool".to_string())),
        },
        _ => Err(EvalError::TypeMismatch(l.type_name().to_string(), r.type_name().to_string())),
    }
}

fn numeric_cmp(l: f64, op: CmpOp, r: f64) -> bool {
    match op {
        CmpOp::Eq => (l - r).abs() < f64::EPSILON,
        CmpOp::Ne => (l - r).abs() >= f64::EPSILON,
        CmpOp::Lt => l < r,
        CmpOp::Le => l <= r,
        CmpOp::Gt => l > r,
        CmpOp::Ge => l >= r,
    }
}

fn string_cmp(l: &str, op: CmpOp, r: &str) -> bool {
    match op {
        CmpOp::Eq => l == r,
        CmpOp::Ne => l != r,
        CmpOp::Lt => l < r,
        CmpOp::Le => l <= r,
        CmpOp::Gt => l > r,
        CmpOp::Ge => l >= r,
    }
}

// ---------------------------------------------------------------------------
// Tokenizer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Int(i64),
    Float(f64),
    Str(String),
    Eq,
    Assign,
    Ne,
    Le,
    Ge,
    Lt,
    Gt,
    AndAnd,
    OrOr,
    Not,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Dot,
    Semi,
    True,
    False,
}

struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
}

impl<'a> Lexer<'a> {
    fn new(text: &'a str) -> Self {
        Self { chars: text.chars().peekable() }
    }

    fn tokenize(&mut self) -> Result<Vec<Token>, ParseError> {
        let mut tokens = Vec::new();
        while let Some(&c) = self.chars.peek() {
            match c {
                c if c.is_whitespace() => {
                    self.chars.next();
                }
                '(' => {
                    self.chars.next();
                    tokens.push(Token::LParen);
                }
                ')' => {
                    self.chars.next();
                    tokens.push(Token::RParen);
                }
                '[' => {
                    self.chars.next();
                    tokens.push(Token::LBracket);
                }
                ']' => {
                    self.chars.next();
                    tokens.push(Token::RBracket);
                }
                '.' => {
                    self.chars.next();
                    tokens.push(Token::Dot);
                }
                ';' => {
                    self.chars.next();
                    tokens.push(Token::Semi);
                }
                '!' => {
                    self.chars.next();
                    if self.chars.peek() == Some(&'=') {
                        self.chars.next();
                        tokens.push(Token::Ne);
                    } else {
                        tokens.push(Token::Not);
                    }
                }
                '=' => {
                    self.chars.next();
                    if self.chars.peek() == Some(&'=') {
                        self.chars.next();
                        tokens.push(Token::Eq);
                    } else {
                        tokens.push(Token::Assign);
                    }
                }
                '<' => {
                    self.chars.next();
                    if self.chars.peek() == Some(&'=') {
                        self.chars.next();
                        tokens.push(Token::Le);
                    } else {
                        tokens.push(Token::Lt);
                    }
                }
                '>' => {
                    self.chars.next();
                    if self.chars.peek() == Some(&'=') {
                        self.chars.next();
                        tokens.push(Token::Ge);
                    } else {
                        tokens.push(Token::Gt);
                    }
                }
                '&' => {
                    self.chars.next();
                    if self.chars.next() != Some('&') {
                        return Err(ParseError("expected '&&'".to_string()));
                    }
                    tokens.push(Token::AndAnd);
                }
                '|' => {
                    self.chars.next();
                    if self.chars.next() != Some('|') {
                        return Err(ParseError("expected '||'".to_string()));
                    }
                    tokens.push(Token::OrOr);
                }
                '"' => {
                    tokens.push(self.read_string()?);
                }
                c if c.is_ascii_digit() => {
                    tokens.push(self.read_number()?);
                }
                c if c.is_alphabetic() || c == '_' => {
                    tokens.push(self.read_ident());
                }
                other => {
                    return Err(ParseError(format!("unexpected character '{other}'")));
                }
            }
        }
        Ok(tokens)
    }

    fn read_string(&mut self) -> Result<Token, ParseError> {
        self.chars.next(); // opening quote
        let mut s = String::new();
        loop {
            match self.chars.next() {
                Some('"') => return Ok(Token::Str(s)),
                Some('\\') => {
                    if let Some(escaped) = self.chars.next() {
                        s.push(escaped);
                    }
                }
                Some(c) => s.push(c),
                None => return Err(ParseError("unterminated string literal".to_string())),
            }
        }
    }

    fn read_number(&mut self) -> Result<Token, ParseError> {
        let mut s = String::new();
        let mut is_float = false;
        while let Some(&c) = self.chars.peek() {
            if c.is_ascii_digit() {
                s.push(c);
                self.chars.next();
            } else if c == '.' && !is_float {
                is_float = true;
                s.push(c);
                self.chars.next();
            } else {
                break;
            }
        }
        if is_float {
            s.parse::<f64>()
                .map(Token::Float)
                .map_err(|e| ParseError(format!("invalid float literal: {e}")))
        } else {
            s.parse::<i64>()
                .map(Token::Int)
                .map_err(|e| ParseError(format!("invalid integer literal: {e}")))
        }
    }

    fn read_ident(&mut self) -> Token {
        let mut s = String::new();
        while let Some(&c) = self.chars.peek() {
            if c.is_alphanumeric() || c == '_' {
                s.push(c);
                self.chars.next();
            } else {
                break;
            }
        }
        match s.as_str() {
            "true" => Token::True,
            "false" => Token::False,
            _ => Token::Ident(s),
        }
    }
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token]) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&Token> {
        let tok = self.tokens.get(self.pos);
        self.pos += 1;
        tok
    }

    fn expect(&mut self, expected: &Token) -> Result<(), ParseError> {
        match self.advance() {
            Some(tok) if tok == expected => Ok(()),
            Some(tok) => Err(ParseError(format!("expected {expected:?}, found {tok:?}"))),
            None => Err(ParseError(format!("expected {expected:?}, found end of input"))),
        }
    }

    fn expect_end(&self) -> Result<(), ParseError> {
        if self.pos == self.tokens.len() {
            Ok(())
        } else {
            Err(ParseError(format!("unexpected trailing tokens at position {}", self.pos)))
        }
    }

    fn parse_descriptor(&mut self) -> Result<Descriptor, ParseError> {
        self.expect(&Token::LBracket)?;
        let mut descriptor = Descriptor::new();
        while self.peek() != Some(&Token::RBracket) {
            let name = match self.advance() {
                Some(Token::Ident(s)) => s.clone(),
                other => return Err(ParseError(format!("expected attribute name, found {other:?}"))),
            };
            self.expect(&Token::Assign)?;
            let value = self.parse_value()?;
            self.expect(&Token::Semi)?;
            descriptor.insert(name, value);
        }
        self.expect(&Token::RBracket)?;
        Ok(descriptor)
    }

    fn parse_value(&mut self) -> Result<Value, ParseError> {
        match self.peek() {
            Some(Token::LParen) => Ok(Value::Expr(self.parse_expr_full()?)),
            Some(Token::Str(_)) => {
                if let Some(Token::Str(s)) = self.advance() {
                    Ok(Value::Str(s.clone()))
                } else {
                    unreachable!()
                }
            }
            Some(Token::Int(_)) => {
                if let Some(Token::Int(i)) = self.advance() {
                    Ok(Value::Int(*i))
                } else {
                    unreachable!()
                }
            }
            Some(Token::Float(_)) => {
                if let Some(Token::Float(x)) = self.advance() {
                    Ok(Value::Float(*x))
                } else {
                    unreachable!()
                }
            }
            Some(Token::True) => {
                self.advance();
                Ok(Value::Bool(true))
            }
            Some(Token::False) => {
                self.advance();
                Ok(Value::Bool(false))
            }
            other => Err(ParseError(format!("expected attribute value, found {other:?}"))),
        }
    }

    fn parse_expr_full(&mut self) -> Result<Expr, ParseError> {
        let had_paren = self.peek() == Some(&Token::LParen);
        if had_paren {
            self.advance();
        }
        let expr = self.parse_or()?;
        if had_paren {
            self.expect(&Token::RParen)?;
        }
        Ok(expr)
    }

    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_and()?;
        while self.peek() == Some(&Token::OrOr) {
            self.advance();
            let rhs = self.parse_and()?;
            lhs = Expr::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_unary()?;
        while self.peek() == Some(&Token::AndAnd) {
            self.advance();
            let rhs = self.parse_unary()?;
            lhs = Expr::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        if self.peek() == Some(&Token::Not) {
            self.advance();
            let inner = self.parse_unary()?;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.parse_cmp()
    }

    fn parse_cmp(&mut self) -> Result<Expr, ParseError> {
        let lhs = self.parse_primary()?;
        let op = match self.peek() {
            Some(Token::Eq) => Some(CmpOp::Eq),
            Some(Token::Ne) => Some(CmpOp::Ne),
            Some(Token::Lt) => Some(CmpOp::Lt),
            Some(Token::Le) => Some(CmpOp::Le),
            Some(Token::Gt) => Some(CmpOp::Gt),
            Some(Token::Ge) => Some(CmpOp::Ge),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let rhs = self.parse_primary()?;
            Ok(Expr::Cmp(Box::new(lhs), op, Box::new(rhs)))
        } else {
            Ok(lhs)
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        match self.advance() {
            Some(Token::LParen) => {
                let inner = self.parse_or()?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            Some(Token::Not) => {
                let inner = self.parse_unary()?;
                Ok(Expr::Not(Box::new(inner)))
            }
            Some(Token::True) => Ok(Expr::Bool(true)),
            Some(Token::False) => Ok(Expr::Bool(false)),
            Some(Token::Int(i)) => Ok(Expr::Int(*i)),
            Some(Token::Float(x)) => Ok(Expr::Float(*x)),
            Some(Token::Str(s)) => Ok(Expr::Str(s.clone())),
            Some(Token::Ident(scope)) if scope == "self" || scope == "other" => {
                self.expect(&Token::Dot)?;
                let name = match self.advance() {
                    Some(Token::Ident(s)) => s.clone(),
                    other => return Err(ParseError(format!("expected attribute name after '.', found {other:?}"))),
                };
                let scope = if scope == "self" { Scope::SelfScope } else { Scope::Other };
                Ok(Expr::Attr(scope, name))
            }
            other => Err(ParseError(format!("unexpected token in expression: {other:?}"))),
        }
    }
}

/// Walks `requirements` looking for a top-level (conjunction-only) hint of the
/// form `other.JobID == <N>`, used to detect an agent-directed match request.
#[must_use]
pub fn find_job_id_hint(requirements: &Expr) -> Option<u64> {
    match requirements {
        Expr::Cmp(l, CmpOp::Eq, r) => match (l.as_ref(), r.as_ref()) {
            (Expr::Attr(Scope::Other, name), Expr::Int(n)) if name == "JobID" && *n >= 0 => Some(*n as u64),
            (Expr::Int(n), Expr::Attr(Scope::Other, name)) if name == "JobID" && *n >= 0 => Some(*n as u64),
            _ => None,
        },
        Expr::And(l, r) => find_job_id_hint(l).or_else(|| find_job_id_hint(r)),
        _ => None,
    }
}

/// Counts top-level (any-depth, conjunction-only) `other.Site == "<literal>"`
/// clauses in `requirements`, returning the pinned site name iff there is
/// exactly one such clause.
#[must_use]
pub fn single_pinned_site(requirements: &Expr) -> Option<String> {
    let mut sites = Vec::new();
    collect_site_pins(requirements, &mut sites);
    if sites.len() == 1 {
        sites.into_iter().next()
    } else {
        None
    }
}

fn collect_site_pins(expr: &Expr, sites: &mut Vec<String>) {
    match expr {
        Expr::Cmp(l, CmpOp::Eq, r) => match (l.as_ref(), r.as_ref()) {
            (Expr::Attr(Scope::Other, name), Expr::Str(s)) if name == "Site" => sites.push(s.clone()),
            (Expr::Str(s), Expr::Attr(Scope::Other, name)) if name == "Site" => sites.push(s.clone()),
            _ => {}
        },
        Expr::And(l, r) => {
            collect_site_pins(l, sites);
            collect_site_pins(r, sites);
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_descriptor() {
        let d = parse(r#"[ CPUs = 4; Site = "CERN"; ]"#).unwrap();
        assert_eq!(d.get("CPUs"), Some(&Value::Int(4)));
        assert_eq!(d.get("Site"), Some(&Value::Str("CERN".to_string())));
    }

    #[test]
    fn test_parse_requirements_expression() {
        let d = parse(r#"[ CPUs = 4; Requirements = (other.CPUs <= self.CPUs && other.Site == "CERN"); ]"#).unwrap();
        match d.get("Requirements") {
            Some(Value::Expr(Expr::And(..))) => {}
            other => panic!("expected And expr, got {other:?}"),
        }
    }

    #[test]
    fn test_default_requirements_is_true() {
        let d = parse("[ CPUs = 4; ]").unwrap();
        assert_eq!(d.requirements(), Expr::Bool(true));
    }

    #[test]
    fn test_descriptor_round_trip() {
        let text = r#"[ CPUs = 4; Requirements = (other.Site == "CERN"); Site = "CERN"; ]"#;
        let d = parse(text).unwrap();
        let reparsed = parse(&d.to_text()).unwrap();
        assert_eq!(d, reparsed);
    }

    #[test]
    fn test_evaluate_requirements_numeric() {
        let a = parse(r#"[ CPUs = 4; Requirements = (other.CPUs <= self.CPUs); ]"#).unwrap();
        let b = parse("[ CPUs = 2; ]").unwrap();
        assert!(evaluate_requirements(&a, &b));

        let c = parse("[ CPUs = 8; ]").unwrap();
        assert!(!evaluate_requirements(&a, &c));
    }

    #[test]
    fn test_evaluate_requirements_unknown_attribute_is_false() {
        let a = parse("[ Requirements = (other.Missing == 1); ]").unwrap();
        let b = parse("[ CPUs = 2; ]").unwrap();
        assert!(!evaluate_requirements(&a, &b));
    }

    #[test]
    fn test_evaluate_requirements_type_mismatch_is_false() {
        let a = parse(r#"[ Requirements = (other.Site == 4); ]"#).unwrap();
        let b = parse(r#"[ Site = "CERN"; ]"#).unwrap();
        assert!(!evaluate_requirements(&a, &b));
    }

    #[test]
    fn test_find_job_id_hint() {
        let expr = parse_expr("(other.JobID == 42)").unwrap();
        assert_eq!(find_job_id_hint(&expr), Some(42));

        let expr = parse_expr("(other.CPUs == 4)").unwrap();
        assert_eq!(find_job_id_hint(&expr), None);
    }

    #[test]
    fn test_find_job_id_hint_in_conjunction() {
        let expr = parse_expr(r#"(other.JobID == 7 && other.Site == "CERN")"#).unwrap();
        assert_eq!(find_job_id_hint(&expr), Some(7));
    }

    #[test]
    fn test_single_pinned_site() {
        let expr = parse_expr(r#"(other.Site == "CERN")"#).unwrap();
        assert_eq!(single_pinned_site(&expr), Some("CERN".to_string()));
    }

    #[test]
    fn test_single_pinned_site_multiple_is_none() {
        let expr = parse_expr(r#"(other.Site == "CERN" && other.Site == "RAL")"#).unwrap();
        assert_eq!(single_pinned_site(&expr), None);
    }

    #[test]
    fn test_single_pinned_site_absent_is_none() {
        let expr = parse_expr("(other.CPUs == 4)").unwrap();
        assert_eq!(single_pinned_site(&expr), None);
    }

    #[test]
    fn test_boolean_connectives_short_circuit_unknown() {
        // false && <unknown> must still be false, not propagate an error.
        let expr = Expr::And(Box::new(Expr::Bool(false)), Box::new(Expr::Attr(Scope::Other, "Nope".to_string())));
        let empty = Descriptor::new();
        assert!(!eval(&expr, &empty, &empty).unwrap());
    }

    #[test]
    fn test_not_and_parens() {
        let expr = parse_expr("!(other.CPUs == 4)").unwrap();
        let mut other = Descriptor::new();
        other.insert("CPUs", Value::Int(8));
        let empty = Descriptor::new();
        assert!(try_evaluate(&expr, &empty, &other).unwrap());
    }
}
