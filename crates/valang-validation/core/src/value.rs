// File: valang-core/src/value.rs
// Purpose: Runtime values produced by resolving field references and literals

use chrono::{NaiveDate, NaiveDateTime};

use crate::coercion::{parse_date, parse_number};

/// Display format used when a date has to be compared as text
pub const DATE_DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A value resolved from a form field or a literal.
///
/// The category of a value is decided per evaluation, never per field:
/// the same field can resolve to a `String` in one pass and to a `List`
/// in the next (e.g. a checkbox group gaining a second checked box).
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedValue {
    /// Absent value (covers both `null` and `undefined` on the page)
    Null,
    Number(f64),
    String(String),
    Date(NaiveDateTime),
    List(Vec<ResolvedValue>),
}

/// Runtime category of a [`ResolvedValue`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueCategory {
    Null,
    Number,
    String,
    Date,
    List,
}

impl ResolvedValue {
    pub fn category(&self) -> ValueCategory {
        match self {
            ResolvedValue::Null => ValueCategory::Null,
            ResolvedValue::Number(_) => ValueCategory::Number,
            ResolvedValue::String(_) => ValueCategory::String,
            ResolvedValue::Date(_) => ValueCategory::Date,
            ResolvedValue::List(_) => ValueCategory::List,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ResolvedValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ResolvedValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Truthiness as the page scripts see it: null, zero, NaN and the empty
    /// string are falsy; dates and lists (even empty ones) are truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            ResolvedValue::Null => false,
            ResolvedValue::Number(n) => *n != 0.0 && !n.is_nan(),
            ResolvedValue::String(s) => !s.is_empty(),
            ResolvedValue::Date(_) => true,
            ResolvedValue::List(_) => true,
        }
    }

    /// Length in characters for strings, element count for lists.
    /// Other categories have no length.
    pub fn length(&self) -> Option<usize> {
        match self {
            ResolvedValue::String(s) => Some(s.chars().count()),
            ResolvedValue::List(items) => Some(items.len()),
            _ => None,
        }
    }

    /// Convert value to string for display and string comparison
    pub fn to_display_string(&self) -> String {
        match self {
            ResolvedValue::Null => "null".to_string(),
            ResolvedValue::Number(n) => {
                // Format number nicely (remove .0 for integers)
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    n.to_string()
                }
            }
            ResolvedValue::String(s) => s.clone(),
            ResolvedValue::Date(d) => d.format(DATE_DISPLAY_FORMAT).to_string(),
            ResolvedValue::List(items) => items
                .iter()
                .map(|v| v.to_display_string())
                .collect::<Vec<_>>()
                .join(","),
        }
    }

    /// Loose equality used by `in` and the equality fast path.
    ///
    /// Values of the same category compare by value. A number and a string
    /// are equal when the string parses to that number, a date and a
    /// string when the string parses to that date.
    pub fn loosely_equals(&self, other: &ResolvedValue) -> bool {
        match (self, other) {
            (ResolvedValue::Null, ResolvedValue::Null) => true,
            (ResolvedValue::Number(a), ResolvedValue::Number(b)) => a == b,
            (ResolvedValue::String(a), ResolvedValue::String(b)) => a == b,
            (ResolvedValue::Date(a), ResolvedValue::Date(b)) => a == b,
            (ResolvedValue::List(a), ResolvedValue::List(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.loosely_equals(y))
            }
            (ResolvedValue::Number(n), s @ ResolvedValue::String(_))
            | (s @ ResolvedValue::String(_), ResolvedValue::Number(n)) => {
                parse_number(s).is_some_and(|parsed| parsed == *n)
            }
            (ResolvedValue::Date(d), ResolvedValue::String(s))
            | (ResolvedValue::String(s), ResolvedValue::Date(d)) => {
                parse_date(s).is_some_and(|parsed| parsed == *d)
            }
            _ => false,
        }
    }
}

impl std::fmt::Display for ResolvedValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_display_string())
    }
}

impl From<f64> for ResolvedValue {
    fn from(n: f64) -> Self {
        ResolvedValue::Number(n)
    }
}

impl From<i32> for ResolvedValue {
    fn from(n: i32) -> Self {
        ResolvedValue::Number(n as f64)
    }
}

impl From<i64> for ResolvedValue {
    fn from(n: i64) -> Self {
        ResolvedValue::Number(n as f64)
    }
}

impl From<String> for ResolvedValue {
    fn from(s: String) -> Self {
        ResolvedValue::String(s)
    }
}

impl From<&str> for ResolvedValue {
    fn from(s: &str) -> Self {
        ResolvedValue::String(s.to_string())
    }
}

impl From<NaiveDateTime> for ResolvedValue {
    fn from(d: NaiveDateTime) -> Self {
        ResolvedValue::Date(d)
    }
}

impl From<NaiveDate> for ResolvedValue {
    fn from(d: NaiveDate) -> Self {
        ResolvedValue::Date(d.and_time(chrono::NaiveTime::MIN))
    }
}

impl From<Vec<ResolvedValue>> for ResolvedValue {
    fn from(items: Vec<ResolvedValue>) -> Self {
        ResolvedValue::List(items)
    }
}

impl<T: Into<ResolvedValue>> From<Option<T>> for ResolvedValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(ResolvedValue::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truthiness() {
        assert!(!ResolvedValue::Null.is_truthy());
        assert!(!ResolvedValue::from(0).is_truthy());
        assert!(!ResolvedValue::Number(f64::NAN).is_truthy());
        assert!(!ResolvedValue::from("").is_truthy());
        assert!(ResolvedValue::from(" ").is_truthy());
        assert!(ResolvedValue::List(vec![]).is_truthy());
    }

    #[test]
    fn test_display_string() {
        assert_eq!(ResolvedValue::from(18).to_display_string(), "18");
        assert_eq!(ResolvedValue::from(2.5).to_display_string(), "2.5");
        assert_eq!(ResolvedValue::Null.to_display_string(), "null");
        let list = ResolvedValue::List(vec!["a".into(), 1.into()]);
        assert_eq!(list.to_display_string(), "a,1");
        let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(ResolvedValue::from(date).to_display_string(), "2024-02-29 00:00:00");
    }

    #[test]
    fn test_loose_equality() {
        assert!(ResolvedValue::from("17").loosely_equals(&17.into()));
        assert!(ResolvedValue::from(1000).loosely_equals(&"1,000".into()));
        assert!(!ResolvedValue::from("abc").loosely_equals(&0.into()));
        assert!(ResolvedValue::Null.loosely_equals(&ResolvedValue::Null));
        assert!(!ResolvedValue::Null.loosely_equals(&"".into()));
    }

    #[test]
    fn test_loose_equality_between_date_and_text() {
        let day = ResolvedValue::from(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert!(day.loosely_equals(&"2024-01-01".into()));
        assert!(ResolvedValue::from("01/01/2024").loosely_equals(&day));
        assert!(!day.loosely_equals(&"2024-02-01".into()));
        assert!(!day.loosely_equals(&"soon".into()));
    }

    #[test]
    fn test_option_conversion() {
        assert_eq!(ResolvedValue::from(None::<&str>), ResolvedValue::Null);
        assert_eq!(ResolvedValue::from(Some("x")), ResolvedValue::from("x"));
    }
}
