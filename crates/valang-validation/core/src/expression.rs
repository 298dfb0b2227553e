//! Expression trees for validation rules.
//!
//! An [`Expression`] produces a value (field reference, literal, unary or
//! arithmetic node). A [`Predicate`] is the boolean root of a rule. Both are
//! stateless and are evaluated fresh on every validation pass.
//!
//! The declaration format is externally tagged camelCase JSON:
//!
//! ```
//! use valang_core::Predicate;
//!
//! let json = r#"{"moreThanOrEquals": [{"field": "age"}, {"number": 18}]}"#;
//! let predicate: Predicate = serde_json::from_str(json).unwrap();
//! assert_eq!(predicate.fields(), vec!["age"]);
//! ```

use chrono::NaiveDateTime;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::coercion::parse_date;
use crate::error::ValangError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Expression {
    /// Current value of a form field
    Field(String),
    Null,
    Number(f64),
    String(String),
    Date(#[serde(with = "date_literal")] NaiveDateTime),
    List(Vec<Expression>),

    LengthOf(Box<Expression>),
    LowerCase(Box<Expression>),
    UpperCase(Box<Expression>),

    Add(Box<Expression>, Box<Expression>),
    Subtract(Box<Expression>, Box<Expression>),
    Multiply(Box<Expression>, Box<Expression>),
    Divide(Box<Expression>, Box<Expression>),
    Modulo(Box<Expression>, Box<Expression>),
}

impl Expression {
    pub fn field(name: impl Into<String>) -> Self {
        Expression::Field(name.into())
    }

    pub fn number(n: impl Into<f64>) -> Self {
        Expression::Number(n.into())
    }

    pub fn text(s: impl Into<String>) -> Self {
        Expression::String(s.into())
    }

    pub fn list(items: impl IntoIterator<Item = Expression>) -> Self {
        Expression::List(items.into_iter().collect())
    }

    /// Date literal from any notation accepted in form fields
    pub fn date(raw: &str) -> Option<Self> {
        parse_date(raw).map(Expression::Date)
    }

    fn collect_fields<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Expression::Field(name) => {
                if !out.contains(&name.as_str()) {
                    out.push(name);
                }
            }
            Expression::Null
            | Expression::Number(_)
            | Expression::String(_)
            | Expression::Date(_) => {}
            Expression::List(items) => items.iter().for_each(|e| e.collect_fields(out)),
            Expression::LengthOf(e) | Expression::LowerCase(e) | Expression::UpperCase(e) => {
                e.collect_fields(out)
            }
            Expression::Add(l, r)
            | Expression::Subtract(l, r)
            | Expression::Multiply(l, r)
            | Expression::Divide(l, r)
            | Expression::Modulo(l, r) => {
                l.collect_fields(out);
                r.collect_fields(out);
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Predicate {
    Equals(Expression, Expression),
    LessThan(Expression, Expression),
    LessThanOrEquals(Expression, Expression),
    MoreThan(Expression, Expression),
    MoreThanOrEquals(Expression, Expression),
    /// `between(value, [low, high])`, inclusive on both ends
    Between(Expression, Expression),
    In(Expression, Expression),

    IsNull(Expression),
    HasText(Expression),
    HasLength(Expression),
    IsBlank(Expression),
    IsWord(Expression),
    IsUpper(Expression),
    IsLower(Expression),

    Matches { pattern: Pattern, value: Expression },
    IsValidEmail(Expression),

    Not(Box<Predicate>),
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
}

impl Predicate {
    pub fn not(inner: Predicate) -> Self {
        Predicate::Not(Box::new(inner))
    }

    /// Names of the fields this predicate reads, in first-use order
    pub fn fields(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_fields(&mut out);
        out
    }

    fn collect_fields<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Predicate::Equals(l, r)
            | Predicate::LessThan(l, r)
            | Predicate::LessThanOrEquals(l, r)
            | Predicate::MoreThan(l, r)
            | Predicate::MoreThanOrEquals(l, r)
            | Predicate::Between(l, r)
            | Predicate::In(l, r) => {
                l.collect_fields(out);
                r.collect_fields(out);
            }
            Predicate::IsNull(e)
            | Predicate::HasText(e)
            | Predicate::HasLength(e)
            | Predicate::IsBlank(e)
            | Predicate::IsWord(e)
            | Predicate::IsUpper(e)
            | Predicate::IsLower(e)
            | Predicate::IsValidEmail(e)
            | Predicate::Matches { value: e, .. } => e.collect_fields(out),
            Predicate::Not(inner) => inner.collect_fields(out),
            Predicate::And(items) | Predicate::Or(items) => {
                items.iter().for_each(|p| p.collect_fields(out))
            }
        }
    }
}

/// A compiled regular expression that serializes as its source text
#[derive(Debug, Clone)]
pub struct Pattern(Regex);

impl Pattern {
    pub fn new(source: &str) -> Result<Self, ValangError> {
        Regex::new(source)
            .map(Pattern)
            .map_err(|e| ValangError::InvalidPattern {
                pattern: source.to_string(),
                reason: e.to_string(),
            })
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn regex(&self) -> &Regex {
        &self.0
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Serialize for Pattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Pattern {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let source = String::deserialize(deserializer)?;
        Pattern::new(&source).map_err(serde::de::Error::custom)
    }
}

mod date_literal {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

    pub fn serialize<S: Serializer>(date: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&date.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        crate::coercion::parse_date(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid date literal '{}'", raw)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_declaration_json() {
        let json = r#"{"between": [{"field": "age"}, {"list": [{"number": 18}, {"number": 65}]}]}"#;
        let predicate: Predicate = serde_json::from_str(json).unwrap();
        assert_eq!(
            predicate,
            Predicate::Between(
                Expression::field("age"),
                Expression::list([Expression::number(18), Expression::number(65)]),
            )
        );
    }

    #[test]
    fn test_date_literal_accepts_plain_dates() {
        let expr: Expression = serde_json::from_str(r#"{"date": "2020-05-01"}"#).unwrap();
        assert_eq!(Some(expr.clone()), Expression::date("2020-05-01"));
        let out = serde_json::to_string(&expr).unwrap();
        assert_eq!(out, r#"{"date":"2020-05-01T00:00:00"}"#);
    }

    #[test]
    fn test_invalid_pattern_is_rejected_at_parse_time() {
        let json = r#"{"matches": {"pattern": "([a-z", "value": {"field": "code"}}}"#;
        assert!(serde_json::from_str::<Predicate>(json).is_err());
    }

    #[test]
    fn test_fields_are_deduplicated() {
        let predicate = Predicate::And(vec![
            Predicate::HasText(Expression::field("a")),
            Predicate::Equals(
                Expression::Add(Box::new(Expression::field("b")), Box::new(Expression::field("a"))),
                Expression::number(3),
            ),
            Predicate::not(Predicate::IsNull(Expression::field("c"))),
        ]);
        assert_eq!(predicate.fields(), vec!["a", "b", "c"]);
    }
}
