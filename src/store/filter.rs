//! Filter-query language
//!
//! A small SQL-like predicate language used by listings:
//!
//! ```text
//! name = 'a' AND (properties.step.int_value IN (1, 2) OR NOT uri LIKE 's3://%')
//! parent_contexts_a.id = 4
//! custom_properties.`my.key`.string_value != "x"
//! ```
//!
//! Relationship accessors (`parent_contexts_<alias>`, `child_contexts_<alias>`,
//! `contexts_<alias>`) match when any related context satisfies the
//! comparison.

use crate::store::{PropertyKind, StoreError};
use std::cmp::Ordering;

/// Literal value appearing in a query, also used for resolved field values
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// Integer
    Int(i64),
    /// Float
    Double(f64),
    /// Text
    String(String),
    /// Boolean
    Bool(bool),
}

impl Literal {
    fn compare(&self, other: &Literal) -> Option<Ordering> {
        match (self, other) {
            (Literal::Int(a), Literal::Int(b)) => Some(a.cmp(b)),
            (Literal::Int(a), Literal::Double(b)) => (*a as f64).partial_cmp(b),
            (Literal::Double(a), Literal::Int(b)) => a.partial_cmp(&(*b as f64)),
            (Literal::Double(a), Literal::Double(b)) => a.partial_cmp(b),
            (Literal::String(a), Literal::String(b)) => Some(a.cmp(b)),
            (Literal::Bool(a), Literal::Bool(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

/// Relationship a field is reached through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    /// Parent contexts of a context
    ParentContexts,
    /// Child contexts of a context
    ChildContexts,
    /// Contexts an artifact or execution is attached to
    Contexts,
}

/// Attribute of a node addressed by a query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attribute {
    /// Node id
    Id,
    /// Stored name
    Name,
    /// External id
    ExternalId,
    /// Type name
    Type,
    /// Creation time
    CreateTime,
    /// Last update time
    LastUpdateTime,
    /// Kind-specific column (`uri`, `state`, `last_known_state`)
    Column(&'static str),
    /// Fixed or custom property with the expected value kind
    Property {
        /// True for `custom_properties`
        custom: bool,
        /// Property name
        name: String,
        /// Value kind
        kind: PropertyKind,
    },
}

/// Fully resolved field reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    /// Relationship hop, if any
    pub relation: Option<Relation>,
    /// Attribute on the (related) node
    pub attribute: Attribute,
}

/// Comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// `=`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
}

/// Parsed filter expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Both hold
    And(Box<Expr>, Box<Expr>),
    /// Either holds
    Or(Box<Expr>, Box<Expr>),
    /// Negation
    Not(Box<Expr>),
    /// `field <op> literal`
    Compare {
        /// Field compared
        field: FieldPath,
        /// Comparison
        op: CompareOp,
        /// Right-hand side
        value: Literal,
    },
    /// `field LIKE 'pattern'`
    Like {
        /// Field compared
        field: FieldPath,
        /// Pattern with `%` and `_` wildcards
        pattern: String,
    },
    /// `field IN (literal, ...)`
    In {
        /// Field compared
        field: FieldPath,
        /// Accepted values
        values: Vec<Literal>,
    },
}

/// Source of field values for one candidate node
pub trait Subject {
    /// Every value the field takes for this node; empty when absent
    fn values(&self, field: &FieldPath) -> Vec<Literal>;
}

impl Expr {
    /// Evaluate against a candidate node
    pub fn matches(&self, subject: &dyn Subject) -> bool {
        match self {
            Expr::And(a, b) => a.matches(subject) && b.matches(subject),
            Expr::Or(a, b) => a.matches(subject) || b.matches(subject),
            Expr::Not(e) => !e.matches(subject),
            Expr::Compare { field, op, value } => subject.values(field).iter().any(|v| {
                match v.compare(value) {
                    Some(ord) => match op {
                        CompareOp::Eq => ord == Ordering::Equal,
                        CompareOp::Ne => ord != Ordering::Equal,
                        CompareOp::Lt => ord == Ordering::Less,
                        CompareOp::Le => ord != Ordering::Greater,
                        CompareOp::Gt => ord == Ordering::Greater,
                        CompareOp::Ge => ord != Ordering::Less,
                    },
                    None => false,
                }
            }),
            Expr::Like { field, pattern } => subject.values(field).iter().any(|v| match v {
                Literal::String(s) => like(s, pattern),
                _ => false,
            }),
            Expr::In { field, values } => subject
                .values(field)
                .iter()
                .any(|v| values.iter().any(|c| v.compare(c) == Some(Ordering::Equal))),
        }
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Pattern {
    Any,
    One,
    Char(char),
}

/// SQL `LIKE` matching with `%` (any run) and `_` (one character)
///
/// A backslash makes the next pattern character literal.
pub fn like(text: &str, pattern: &str) -> bool {
    let t: Vec<char> = text.chars().collect();
    let mut p = Vec::new();
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        p.push(match c {
            '%' => Pattern::Any,
            '_' => Pattern::One,
            '\\' => Pattern::Char(chars.next().unwrap_or('\\')),
            c => Pattern::Char(c),
        });
    }

    let (mut ti, mut pi) = (0usize, 0usize);
    let mut backtrack: Option<(usize, usize)> = None;

    while ti < t.len() {
        if pi < p.len() && p[pi] == Pattern::Any {
            backtrack = Some((pi, ti));
            pi += 1;
        } else if pi < p.len() && (p[pi] == Pattern::One || p[pi] == Pattern::Char(t[ti])) {
            ti += 1;
            pi += 1;
        } else if let Some((bp, bt)) = backtrack {
            pi = bp + 1;
            ti = bt + 1;
            backtrack = Some((bp, bt + 1));
        } else {
            return false;
        }
    }
    p[pi..].iter().all(|c| *c == Pattern::Any)
}

/// Escape `LIKE` wildcards so the text matches literally
pub fn like_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Parse a filter query into an expression tree
pub fn parse(query: &str) -> Result<Expr, StoreError> {
    let tokens = tokenize(query)?;
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.parse_or()?;
    if parser.pos != parser.tokens.len() {
        return Err(invalid(format!("unexpected token {:?}", parser.tokens[parser.pos])));
    }
    Ok(expr)
}

fn invalid(msg: impl Into<String>) -> StoreError {
    StoreError::invalid_argument(format!("invalid filter query: {}", msg.into()))
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Str(String),
    Int(i64),
    Double(f64),
    Op(&'static str),
    LParen,
    RParen,
    Comma,
}

fn tokenize(input: &str) -> Result<Vec<Token>, StoreError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            '=' => {
                tokens.push(Token::Op("="));
                i += 1;
            }
            '!' => {
                if chars.get(i + 1) != Some(&'=') {
                    return Err(invalid("expected '=' after '!'"));
                }
                tokens.push(Token::Op("!="));
                i += 2;
            }
            '<' => match chars.get(i + 1) {
                Some('=') => {
                    tokens.push(Token::Op("<="));
                    i += 2;
                }
                Some('>') => {
                    tokens.push(Token::Op("!="));
                    i += 2;
                }
                _ => {
                    tokens.push(Token::Op("<"));
                    i += 1;
                }
            },
            '>' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::Op(">="));
                    i += 2;
                } else {
                    tokens.push(Token::Op(">"));
                    i += 1;
                }
            }
            '\'' | '"' => {
                let quote = c;
                let mut value = String::new();
                i += 1;
                loop {
                    match chars.get(i) {
                        None => return Err(invalid("unterminated string literal")),
                        Some('\\') if chars.get(i + 1).is_some() => {
                            value.push(chars[i + 1]);
                            i += 2;
                        }
                        Some(&ch) if ch == quote => {
                            // doubled quote is an escaped quote
                            if chars.get(i + 1) == Some(&quote) {
                                value.push(quote);
                                i += 2;
                            } else {
                                i += 1;
                                break;
                            }
                        }
                        Some(&ch) => {
                            value.push(ch);
                            i += 1;
                        }
                    }
                }
                tokens.push(Token::Str(value));
            }
            c if c.is_ascii_digit() || (c == '-' && chars.get(i + 1).map_or(false, |d| d.is_ascii_digit())) => {
                let start = i;
                i += 1;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                if text.contains('.') {
                    let v = text.parse::<f64>().map_err(|_| invalid(format!("bad number {}", text)))?;
                    tokens.push(Token::Double(v));
                } else {
                    let v = text.parse::<i64>().map_err(|_| invalid(format!("bad number {}", text)))?;
                    tokens.push(Token::Int(v));
                }
            }
            c if c.is_alphabetic() || c == '_' || c == '`' => {
                let mut ident = String::new();
                while i < chars.len() {
                    let ch = chars[i];
                    if ch == '`' {
                        // backtick segments may hold any character
                        ident.push(ch);
                        i += 1;
                        while i < chars.len() && chars[i] != '`' {
                            ident.push(chars[i]);
                            i += 1;
                        }
                        if i == chars.len() {
                            return Err(invalid("unterminated backtick identifier"));
                        }
                        ident.push('`');
                        i += 1;
                    } else if ch.is_alphanumeric() || ch == '_' || ch == '.' {
                        ident.push(ch);
                        i += 1;
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(ident));
            }
            other => return Err(invalid(format!("unexpected character '{}'", other))),
        }
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        t
    }

    fn peek_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Some(Token::Ident(s)) if s.eq_ignore_ascii_case(keyword))
    }

    fn parse_or(&mut self) -> Result<Expr, StoreError> {
        let mut left = self.parse_and()?;
        while self.peek_keyword("OR") {
            self.pos += 1;
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, StoreError> {
        let mut left = self.parse_unary()?;
        while self.peek_keyword("AND") {
            self.pos += 1;
            let right = self.parse_unary()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, StoreError> {
        if self.peek_keyword("NOT") {
            self.pos += 1;
            return Ok(Expr::Not(Box::new(self.parse_unary()?)));
        }
        if self.peek() == Some(&Token::LParen) {
            self.pos += 1;
            let inner = self.parse_or()?;
            if self.next() != Some(Token::RParen) {
                return Err(invalid("missing ')'"));
            }
            return Ok(inner);
        }
        self.parse_predicate()
    }

    fn parse_predicate(&mut self) -> Result<Expr, StoreError> {
        let field = match self.next() {
            Some(Token::Ident(name)) => parse_field(&name)?,
            other => return Err(invalid(format!("expected field, found {:?}", other))),
        };

        let negated = if self.peek_keyword("NOT") {
            self.pos += 1;
            true
        } else {
            false
        };

        let expr = if self.peek_keyword("LIKE") {
            self.pos += 1;
            match self.next() {
                Some(Token::Str(pattern)) => Expr::Like { field, pattern },
                other => return Err(invalid(format!("LIKE expects a string, found {:?}", other))),
            }
        } else if self.peek_keyword("IN") {
            self.pos += 1;
            if self.next() != Some(Token::LParen) {
                return Err(invalid("IN expects '('"));
            }
            let mut values = vec![self.parse_literal()?];
            loop {
                match self.next() {
                    Some(Token::Comma) => values.push(self.parse_literal()?),
                    Some(Token::RParen) => break,
                    other => return Err(invalid(format!("expected ',' or ')', found {:?}", other))),
                }
            }
            Expr::In { field, values }
        } else if negated {
            return Err(invalid("NOT must be followed by LIKE or IN"));
        } else {
            let op = match self.next() {
                Some(Token::Op("=")) => CompareOp::Eq,
                Some(Token::Op("!=")) => CompareOp::Ne,
                Some(Token::Op("<")) => CompareOp::Lt,
                Some(Token::Op("<=")) => CompareOp::Le,
                Some(Token::Op(">")) => CompareOp::Gt,
                Some(Token::Op(">=")) => CompareOp::Ge,
                other => return Err(invalid(format!("expected operator, found {:?}", other))),
            };
            let value = self.parse_literal()?;
            Expr::Compare { field, op, value }
        };

        Ok(if negated { Expr::Not(Box::new(expr)) } else { expr })
    }

    fn parse_literal(&mut self) -> Result<Literal, StoreError> {
        match self.next() {
            Some(Token::Str(s)) => Ok(Literal::String(s)),
            Some(Token::Int(i)) => Ok(Literal::Int(i)),
            Some(Token::Double(d)) => Ok(Literal::Double(d)),
            Some(Token::Ident(s)) if s.eq_ignore_ascii_case("true") => Ok(Literal::Bool(true)),
            Some(Token::Ident(s)) if s.eq_ignore_ascii_case("false") => Ok(Literal::Bool(false)),
            other => Err(invalid(format!("expected literal, found {:?}", other))),
        }
    }
}

/// Split a dotted accessor, keeping backtick-quoted segments whole
fn split_segments(raw: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    for ch in raw.chars() {
        match ch {
            '`' => quoted = !quoted,
            '.' if !quoted => segments.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }
    segments.push(current);
    segments
}

fn parse_field(raw: &str) -> Result<FieldPath, StoreError> {
    let segments = split_segments(raw);
    let (relation, rest) = match segments.first().map(String::as_str) {
        Some(s) if s.starts_with("parent_contexts_") => (Some(Relation::ParentContexts), &segments[1..]),
        Some(s) if s.starts_with("child_contexts_") => (Some(Relation::ChildContexts), &segments[1..]),
        Some(s) if s.starts_with("contexts_") => (Some(Relation::Contexts), &segments[1..]),
        _ => (None, &segments[..]),
    };

    let attribute = match rest {
        [single] => match single.as_str() {
            "id" => Attribute::Id,
            "name" => Attribute::Name,
            "external_id" => Attribute::ExternalId,
            "type" => Attribute::Type,
            "create_time_since_epoch" => Attribute::CreateTime,
            "last_update_time_since_epoch" => Attribute::LastUpdateTime,
            "uri" => Attribute::Column("uri"),
            "state" => Attribute::Column("state"),
            "last_known_state" => Attribute::Column("last_known_state"),
            other => return Err(invalid(format!("unknown field '{}'", other))),
        },
        [scope, name, accessor] if scope == "properties" || scope == "custom_properties" => {
            let kind = PropertyKind::from_accessor(accessor)
                .ok_or_else(|| invalid(format!("unknown value accessor '{}'", accessor)))?;
            Attribute::Property {
                custom: scope == "custom_properties",
                name: name.clone(),
                kind,
            }
        }
        _ => return Err(invalid(format!("unknown field '{}'", raw))),
    };

    Ok(FieldPath { relation, attribute })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct MapSubject(HashMap<String, Vec<Literal>>);

    impl Subject for MapSubject {
        fn values(&self, field: &FieldPath) -> Vec<Literal> {
            let key = match (&field.relation, &field.attribute) {
                (None, Attribute::Name) => "name".to_string(),
                (None, Attribute::Id) => "id".to_string(),
                (Some(Relation::ParentContexts), Attribute::Id) => "parent.id".to_string(),
                (None, Attribute::Property { name, .. }) => format!("p.{}", name),
                _ => return Vec::new(),
            };
            self.0.get(&key).cloned().unwrap_or_default()
        }
    }

    fn subject() -> MapSubject {
        let mut m = HashMap::new();
        m.insert("name".to_string(), vec![Literal::String("3:accuracy__17".to_string())]);
        m.insert("id".to_string(), vec![Literal::Int(9)]);
        m.insert("parent.id".to_string(), vec![Literal::Int(3), Literal::Int(4)]);
        m.insert("p.step".to_string(), vec![Literal::Int(2)]);
        MapSubject(m)
    }

    #[test]
    fn test_like_patterns() {
        assert!(like("3:accuracy__17", "3:accuracy__%"));
        assert!(like("abc", "a_c"));
        assert!(like("abc", "%"));
        assert!(!like("abc", "ab"));
        assert!(like("a%c", "a%c"));
        assert!(!like("3:loss__1", "3:accuracy__%"));
        assert!(like("3:loss__1", &format!("{}%", like_escape("3:loss__"))));
        assert!(!like("3:lossab1", &format!("{}%", like_escape("3:loss__"))));
    }

    #[test]
    fn test_precedence_and_binds_tighter_than_or() {
        let expr = parse("id = 1 OR id = 9 AND name = 'nope'").unwrap();
        // id = 1 OR (id = 9 AND name = 'nope')
        assert!(!expr.matches(&subject()));

        let expr = parse("(id = 1 OR id = 9) AND name LIKE '3:%'").unwrap();
        assert!(expr.matches(&subject()));
    }

    #[test]
    fn test_relation_matches_any_related_node() {
        assert!(parse("parent_contexts_a.id = 4").unwrap().matches(&subject()));
        assert!(!parse("parent_contexts_a.id = 5").unwrap().matches(&subject()));
    }

    #[test]
    fn test_in_and_not_in() {
        assert!(parse("properties.step.int_value IN (1, 2)").unwrap().matches(&subject()));
        assert!(!parse("properties.step.int_value NOT IN (1, 2)").unwrap().matches(&subject()));
    }

    #[test]
    fn test_quoted_literal_escapes() {
        let expr = parse("name = 'it''s'").unwrap();
        match expr {
            Expr::Compare { value, .. } => assert_eq!(value, Literal::String("it's".to_string())),
            other => panic!("unexpected expression {:?}", other),
        }
    }

    #[test]
    fn test_backtick_property_names() {
        let expr = parse("custom_properties.`my.key`.string_value = 'x'").unwrap();
        match expr {
            Expr::Compare { field, .. } => assert_eq!(
                field.attribute,
                Attribute::Property { custom: true, name: "my.key".to_string(), kind: PropertyKind::String }
            ),
            other => panic!("unexpected expression {:?}", other),
        }
    }

    #[test]
    fn test_syntax_errors_are_invalid_argument() {
        for bad in ["name =", "name = 'x' AND", "(name = 'x'", "bogus = 1", "name ~ 1", "name = 'open"] {
            match parse(bad) {
                Err(StoreError::InvalidArgument(_)) => {}
                other => panic!("expected invalid argument for {:?}, got {:?}", bad, other),
            }
        }
    }
}
