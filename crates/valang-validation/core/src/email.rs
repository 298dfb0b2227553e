//! Email validation

use once_cell::sync::Lazy;
use regex::Regex;

/// Local part: alphanumeric runs joined by `_`, `-`, `.` or `+`.
/// Domain: alphanumeric/hyphen labels and a 2-6 letter TLD.
static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(([A-Za-z0-9]+_+)|([A-Za-z0-9]+-+)|([A-Za-z0-9]+\.+)|([A-Za-z0-9]+\++))*[A-Za-z0-9]+@(([A-Za-z0-9_]+-+)|([A-Za-z0-9_]+\.))*[A-Za-z0-9_]{1,63}\.[a-zA-Z]{2,6}$",
    )
    .expect("email pattern compiles")
});

/// Validates email syntax
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_REGEX.is_match(email)
}
