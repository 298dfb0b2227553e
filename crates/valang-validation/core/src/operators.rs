//! Operator semantics over resolved values.
//!
//! Every relational operator coerces its operands first (see
//! [`crate::coercion`]). Predicates over text mirror the page's
//! truthiness rules: a falsy value fails them without an error, a truthy
//! value that is not text cannot be inspected and raises
//! `UnsupportedValue`.

use std::cmp::Ordering;

use crate::coercion::{coerce, coerce_pair, compare, force_number, prefer_number};
use crate::email;
use crate::error::{Result, ValangError};
use crate::expression::Pattern;
use crate::value::ResolvedValue;

/// Which relational test to apply after coercion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    LessThan,
    LessThanOrEquals,
    MoreThan,
    MoreThanOrEquals,
}

impl Relation {
    fn holds(self, ordering: Option<Ordering>) -> bool {
        match (self, ordering) {
            (_, None) => false,
            (Relation::LessThan, Some(o)) => o == Ordering::Less,
            (Relation::LessThanOrEquals, Some(o)) => o != Ordering::Greater,
            (Relation::MoreThan, Some(o)) => o == Ordering::Greater,
            (Relation::MoreThanOrEquals, Some(o)) => o != Ordering::Less,
        }
    }
}

// ---------------------------------------------------------------------------
// Binary comparisons
// ---------------------------------------------------------------------------

pub fn equals(lhs: &ResolvedValue, rhs: &ResolvedValue) -> Result<bool> {
    match (lhs.is_null(), rhs.is_null()) {
        (true, true) => return Ok(true),
        (true, false) | (false, true) => return Ok(false),
        (false, false) => {}
    }
    if lhs.loosely_equals(rhs) {
        return Ok(true);
    }
    let (lhs, rhs) = coerce_pair(lhs, rhs)?;
    Ok(lhs.category() == rhs.category() && lhs == rhs)
}

pub fn relate(relation: Relation, lhs: ResolvedValue, rhs: &ResolvedValue) -> Result<bool> {
    let lhs = prefer_number(lhs);
    let (lhs, rhs) = coerce_pair(&lhs, rhs)?;
    Ok(relation.holds(compare(&lhs, &rhs)?))
}

/// Inclusive range test. `bounds` must be a list of exactly two values;
/// reversed bounds are not swapped, so they never match.
pub fn between(value: ResolvedValue, bounds: &ResolvedValue) -> Result<bool> {
    let (low, high) = match bounds {
        ResolvedValue::List(items) if items.len() == 2 => (&items[0], &items[1]),
        ResolvedValue::List(items) => {
            return Err(ValangError::Arity {
                operator: "between",
                expected: 2,
                actual: items.len(),
            })
        }
        other => {
            return Err(ValangError::Arity {
                operator: "between",
                expected: 2,
                actual: usize::from(!other.is_null()),
            })
        }
    };

    let value = coerce(&prefer_number(value), low)?;
    let low = coerce(low, &value)?;
    let high = coerce(high, &value)?;

    Ok(Relation::MoreThanOrEquals.holds(compare(&value, &low)?)
        && Relation::LessThanOrEquals.holds(compare(&value, &high)?))
}

/// True iff any element of `list` loosely equals `value`.
/// A scalar right-hand side is treated as a one element list.
pub fn in_list(value: &ResolvedValue, list: &ResolvedValue) -> bool {
    match list {
        ResolvedValue::List(items) => items.iter().any(|item| value.loosely_equals(item)),
        ResolvedValue::Null => false,
        scalar => value.loosely_equals(scalar),
    }
}

// ---------------------------------------------------------------------------
// Unary predicates
// ---------------------------------------------------------------------------

pub fn is_null(value: &ResolvedValue) -> bool {
    value.is_null()
}

fn truthy_text<'a>(operation: &'static str, value: &'a ResolvedValue) -> Result<Option<&'a str>> {
    if !value.is_truthy() {
        return Ok(None);
    }
    value
        .as_str()
        .map(Some)
        .ok_or_else(|| ValangError::unsupported(operation, value))
}

fn strip_whitespace(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

pub fn has_text(value: &ResolvedValue) -> Result<bool> {
    Ok(truthy_text("hasText", value)?.is_some_and(|s| !strip_whitespace(s).is_empty()))
}

pub fn has_length(value: &ResolvedValue) -> bool {
    value.is_truthy() && value.length().is_some_and(|len| len > 0)
}

pub fn is_blank(value: &ResolvedValue) -> bool {
    !value.is_truthy() || value.length() == Some(0)
}

pub fn is_word(value: &ResolvedValue) -> Result<bool> {
    Ok(truthy_text("isWord", value)?.is_some_and(|s| strip_whitespace(s) == s))
}

pub fn is_upper(value: &ResolvedValue) -> Result<bool> {
    Ok(truthy_text("isUpper", value)?.is_some_and(|s| s.to_uppercase() == s))
}

pub fn is_lower(value: &ResolvedValue) -> Result<bool> {
    Ok(truthy_text("isLower", value)?.is_some_and(|s| s.to_lowercase() == s))
}

// ---------------------------------------------------------------------------
// Unary value operators
// ---------------------------------------------------------------------------

/// Length with `\r\n` counted as a single character; null has length 0
pub fn length_of(value: &ResolvedValue) -> Result<ResolvedValue> {
    let len = match value {
        ResolvedValue::Null => 0,
        ResolvedValue::String(s) => s.replace("\r\n", "\n").chars().count(),
        ResolvedValue::List(items) => items.len(),
        other => return Err(ValangError::unsupported("lengthOf", other)),
    };
    Ok(ResolvedValue::Number(len as f64))
}

pub fn lower_case(value: &ResolvedValue) -> Result<ResolvedValue> {
    match value {
        ResolvedValue::Null => Ok(ResolvedValue::Null),
        ResolvedValue::String(s) => Ok(ResolvedValue::String(s.to_lowercase())),
        other => Err(ValangError::unsupported("lowerCase", other)),
    }
}

pub fn upper_case(value: &ResolvedValue) -> Result<ResolvedValue> {
    match value {
        ResolvedValue::Null => Ok(ResolvedValue::Null),
        ResolvedValue::String(s) => Ok(ResolvedValue::String(s.to_uppercase())),
        other => Err(ValangError::unsupported("upperCase", other)),
    }
}

// ---------------------------------------------------------------------------
// Arithmetic
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arithmetic {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
}

pub fn arithmetic(op: Arithmetic, lhs: &ResolvedValue, rhs: &ResolvedValue) -> Result<ResolvedValue> {
    let operand = |v: &ResolvedValue| {
        force_number(v).map_err(|_| ValangError::NumericConversion {
            value: v.to_display_string(),
        })
    };
    let (a, b) = (operand(lhs)?, operand(rhs)?);
    let result = match op {
        Arithmetic::Add => a + b,
        Arithmetic::Subtract => a - b,
        Arithmetic::Multiply => a * b,
        Arithmetic::Divide => a / b,
        Arithmetic::Modulo => a % b,
    };
    Ok(ResolvedValue::Number(result))
}

// ---------------------------------------------------------------------------
// Fixed predicates
// ---------------------------------------------------------------------------

/// True iff the first match of `pattern` spans the whole value
pub fn matches_regex(pattern: &Pattern, value: &ResolvedValue) -> Result<bool> {
    let text = value
        .as_str()
        .ok_or_else(|| ValangError::unsupported("regexp", value))?;
    Ok(pattern
        .regex()
        .find(text)
        .is_some_and(|m| m.as_str() == text))
}

pub fn is_valid_email(value: &ResolvedValue) -> bool {
    !value.is_null() && email::is_valid_email(&value.to_display_string())
}
