//! Value coercion.
//!
//! Relational and equality operators never see two raw values of different
//! categories: the left operand is first brought to the category of the
//! right one. A number is preferred over a string whenever the other side
//! is numeric, and a date only ever compares with another date.

use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::error::{CoercionFailure, Result, ValangError};
use crate::value::{ResolvedValue, ValueCategory};

/// True iff both values are null, or both are non-null with the same category.
pub fn same_type(a: &ResolvedValue, b: &ResolvedValue) -> bool {
    let same = a.category() == b.category();
    tracing::trace!(lhs = ?a.category(), rhs = ?b.category(), same, "same_type");
    same
}

/// Coerce `lhs` into something comparable with `rhs`.
///
/// - same category: `lhs` is returned unchanged
/// - a date against a non-date fails with `date-incompatible`
/// - `rhs` numeric: `lhs` is forced to a number (or fails with `not-a-number`)
/// - otherwise `lhs` becomes its string representation
pub fn coerce(lhs: &ResolvedValue, rhs: &ResolvedValue) -> Result<ResolvedValue> {
    if same_type(lhs, rhs) {
        return Ok(lhs.clone());
    }

    if matches!(lhs, ResolvedValue::Date(_)) || matches!(rhs, ResolvedValue::Date(_)) {
        return Err(ValangError::TypeCoercion(CoercionFailure::DateIncompatible));
    }

    if parse_number(rhs).is_some() {
        return force_number(lhs).map(ResolvedValue::Number);
    }

    Ok(ResolvedValue::String(lhs.to_display_string()))
}

/// Parse a value as a base-10 number.
///
/// Thousands separators (`,`) are stripped before parsing. Only plain
/// decimals are accepted: an optional sign, digits and an optional
/// fractional part. Exponents, `Infinity` and `NaN` are rejected.
pub fn parse_number(value: &ResolvedValue) -> Option<f64> {
    match value {
        ResolvedValue::Number(n) if !n.is_nan() => Some(*n),
        ResolvedValue::String(s) => parse_decimal(s),
        _ => None,
    }
}

fn parse_decimal(raw: &str) -> Option<f64> {
    let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();
    let unsigned = cleaned
        .strip_prefix('-')
        .or_else(|| cleaned.strip_prefix('+'))
        .unwrap_or(&cleaned);

    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (unsigned, None),
    };

    let all_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    let valid = all_digits(int_part)
        && frac_part.map_or(true, all_digits)
        && (!int_part.is_empty() || frac_part.is_some_and(|f| !f.is_empty()));

    if !valid {
        return None;
    }

    cleaned.parse::<f64>().ok().filter(|n| !n.is_nan())
}

/// Force a value to a number, failing with `not-a-number`
pub fn force_number(value: &ResolvedValue) -> Result<f64> {
    parse_number(value).ok_or_else(|| ValangError::not_a_number(value))
}

/// Left operands of relational operators are tried as numbers first.
pub fn prefer_number(value: ResolvedValue) -> ResolvedValue {
    match &value {
        ResolvedValue::String(_) => match parse_number(&value) {
            Some(n) => ResolvedValue::Number(n),
            None => value,
        },
        _ => value,
    }
}

/// Coerce both operands to a common type: left against right, then right
/// against the coerced left.
pub fn coerce_pair(
    lhs: &ResolvedValue,
    rhs: &ResolvedValue,
) -> Result<(ResolvedValue, ResolvedValue)> {
    let lhs = coerce(lhs, rhs)?;
    let rhs = coerce(rhs, &lhs)?;
    Ok((lhs, rhs))
}

/// Order two already coerced values.
///
/// Returns `Ok(None)` when the values are unordered (NaN).
pub fn compare(lhs: &ResolvedValue, rhs: &ResolvedValue) -> Result<Option<Ordering>> {
    match (lhs, rhs) {
        (ResolvedValue::Null, ResolvedValue::Null) => Ok(Some(Ordering::Equal)),
        (ResolvedValue::Number(a), ResolvedValue::Number(b)) => Ok(a.partial_cmp(b)),
        (ResolvedValue::String(a), ResolvedValue::String(b)) => Ok(Some(a.cmp(b))),
        (ResolvedValue::Date(a), ResolvedValue::Date(b)) => Ok(Some(a.cmp(b))),
        (ResolvedValue::List(_), ResolvedValue::List(_)) => {
            Ok(Some(lhs.to_display_string().cmp(&rhs.to_display_string())))
        }
        _ if lhs.category() == ValueCategory::Date || rhs.category() == ValueCategory::Date => {
            Err(ValangError::TypeCoercion(CoercionFailure::DateIncompatible))
        }
        _ => Err(ValangError::not_a_number(lhs)),
    }
}

/// Converts raw form values into typed values before they take part in a
/// comparison. Implement this to plug in a locale specific date parser.
pub trait ValueBinder: Send + Sync {
    fn bind(&self, field: &str, raw: ResolvedValue) -> ResolvedValue;
}

/// Tries a date first, then a number, and keeps the raw string otherwise.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultBinder;

const DATE_TIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"];
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y"];

/// Parse the date notations accepted in form fields and date literals
pub fn parse_date(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }

    DATE_TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
                .map(|d| d.and_time(chrono::NaiveTime::MIN))
        })
}

impl ValueBinder for DefaultBinder {
    fn bind(&self, field: &str, raw: ResolvedValue) -> ResolvedValue {
        match raw {
            ResolvedValue::String(s) => {
                if let Some(date) = parse_date(&s) {
                    tracing::debug!(field, raw = %s, date = %date, "Using internal date parser");
                    ResolvedValue::Date(date)
                } else if let Some(n) = parse_decimal(&s) {
                    ResolvedValue::Number(n)
                } else {
                    ResolvedValue::String(s)
                }
            }
            ResolvedValue::List(items) => ResolvedValue::List(
                items.into_iter().map(|item| self.bind(field, item)).collect(),
            ),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn date(y: i32, m: u32, d: u32) -> ResolvedValue {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().into()
    }

    #[rstest]
    #[case("42", Some(42.0))]
    #[case("-3.5", Some(-3.5))]
    #[case("+7", Some(7.0))]
    #[case(".5", Some(0.5))]
    #[case("1,234,567.25", Some(1234567.25))]
    #[case(" 12 ", Some(12.0))]
    #[case("", None)]
    #[case("-", None)]
    #[case("1e3", None)]
    #[case("NaN", None)]
    #[case("12abc", None)]
    fn test_parse_number(#[case] raw: &str, #[case] expected: Option<f64>) {
        assert_eq!(parse_number(&raw.into()), expected);
    }

    #[test]
    fn test_same_type() {
        assert!(same_type(&ResolvedValue::Null, &ResolvedValue::Null));
        assert!(same_type(&1.into(), &2.5.into()));
        assert!(!same_type(&1.into(), &"1".into()));
        assert!(!same_type(&ResolvedValue::Null, &"".into()));
    }

    #[test]
    fn test_coerce_same_type_is_identity() {
        let lhs = ResolvedValue::from("abc");
        assert_eq!(coerce(&lhs, &"zzz".into()).unwrap(), lhs);
        let lhs = date(2020, 1, 1);
        assert_eq!(coerce(&lhs, &date(1999, 1, 1)).unwrap(), lhs);
    }

    #[test]
    fn test_coerce_prefers_numbers() {
        assert_eq!(coerce(&"1,000".into(), &5.into()).unwrap(), 1000.into());
        assert_eq!(coerce(&"17".into(), &"18".into()).unwrap(), "17".into());
        assert_eq!(
            coerce(&"abc".into(), &5.into()),
            Err(ValangError::not_a_number("abc"))
        );
    }

    #[test]
    fn test_coerce_falls_back_to_strings() {
        assert_eq!(coerce(&5.into(), &"abc".into()).unwrap(), "5".into());
    }

    #[test]
    fn test_coerce_rejects_dates_against_other_types() {
        let err = coerce(&date(2020, 1, 1), &"2020".into()).unwrap_err();
        assert_eq!(err, ValangError::TypeCoercion(CoercionFailure::DateIncompatible));
        assert!(coerce(&"x".into(), &date(2020, 1, 1)).is_err());
    }

    #[test]
    fn test_compare() {
        assert_eq!(compare(&"abc".into(), &"b".into()).unwrap(), Some(Ordering::Less));
        assert_eq!(compare(&10.into(), &9.into()).unwrap(), Some(Ordering::Greater));
        assert_eq!(
            compare(&date(2020, 1, 2), &date(2020, 1, 1)).unwrap(),
            Some(Ordering::Greater)
        );
        assert_eq!(compare(&f64::NAN.into(), &1.into()).unwrap(), None);
        assert!(compare(&1.into(), &"1".into()).is_err());
    }

    #[test]
    fn test_default_binder() {
        let binder = DefaultBinder;
        assert_eq!(binder.bind("d", "2021-03-04".into()), date(2021, 3, 4));
        assert_eq!(binder.bind("d", "03/04/2021".into()), date(2021, 3, 4));
        assert_eq!(binder.bind("n", "17".into()), 17.into());
        assert_eq!(binder.bind("s", "hello".into()), "hello".into());
        assert_eq!(binder.bind("s", ResolvedValue::Null), ResolvedValue::Null);
        assert_eq!(
            binder.bind("l", ResolvedValue::List(vec!["1".into(), "x".into()])),
            ResolvedValue::List(vec![1.into(), "x".into()])
        );
    }

    #[test]
    fn test_parse_date_with_time() {
        let parsed = parse_date("2021-03-04T10:30:00").unwrap();
        assert_eq!(parsed.format("%H:%M").to_string(), "10:30");
        assert!(parse_date("2021-03-04T10:30:00Z").is_some());
        assert!(parse_date("17").is_none());
    }
}
