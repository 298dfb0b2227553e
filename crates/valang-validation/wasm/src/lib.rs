//! Valang Validation WASM
//!
//! WebAssembly bindings for the Valang validator.
//! Pages pass their rule declaration and a snapshot of the form fields;
//! failures come back in form order, or are written straight into the DOM.

use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use valang::{
    DisplayConfig, DomFeedback, ErrorSurface, FailedRule, FeedbackReporter, FieldSnapshot,
    HtmlForm, ValangConfig, ValangValidator, ValidatorError,
};
use wasm_bindgen::prelude::*;
use web_sys::{Document, Element};

/// Set panic hook for better error messages in the browser
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Validation error returned to JavaScript
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl From<&FailedRule> for ValidationError {
    fn from(failure: &FailedRule) -> Self {
        Self {
            field: failure.field.clone(),
            message: failure.message.clone(),
        }
    }
}

/// Keeps whatever the engine displays
#[derive(Debug, Default, Clone)]
struct Collector(Arc<Mutex<Vec<ValidationError>>>);

impl Collector {
    fn take(&self) -> Vec<ValidationError> {
        std::mem::take(&mut *self.0.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl FeedbackReporter for Collector {
    fn clear_field(&mut self, _field: &str) {}

    fn clear_global(&mut self) {}

    fn show(&mut self, failures: &[FailedRule]) {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(failures.iter().map(ValidationError::from));
    }
}

const FORM_NAME: &str = "valang";

fn build_validator(
    rules: &str,
    fields: Vec<FieldSnapshot>,
) -> Result<ValangValidator<HtmlForm>, ValidatorError> {
    let form = HtmlForm::from_snapshots(FORM_NAME, fields)?;
    ValangValidator::from_declaration(FORM_NAME, form, rules)
}

/// Every failed rule of the form, in form field order
pub fn form_failures(
    rules: &str,
    fields: Vec<FieldSnapshot>,
) -> Result<Vec<ValidationError>, ValidatorError> {
    let mut validator = build_validator(rules, fields)?;
    let run = validator.validate();
    Ok(run.failures.iter().map(ValidationError::from).collect())
}

/// The failure displayed for one field (at most one)
pub fn field_failures(
    rules: &str,
    fields: Vec<FieldSnapshot>,
    field: &str,
) -> Result<Vec<ValidationError>, ValidatorError> {
    let collector = Collector::default();
    let mut validator = build_validator(rules, fields)?.with_reporter(collector.clone());
    validator.validate_field(field);
    Ok(collector.take())
}

fn parse_fields(fields: JsValue) -> Result<Vec<FieldSnapshot>, JsValue> {
    serde_wasm_bindgen::from_value(fields)
        .map_err(|e| JsValue::from_str(&format!("Failed to parse fields: {}", e)))
}

fn to_js(err: ValidatorError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

/// Validate a whole form
///
/// # Arguments
/// * `rules` - JSON rule declaration
/// * `fields` - Array of field snapshots `{name, type, tagName, value, checked, options, selected}`
///
/// # Returns
/// Array of `{field, message}` (empty if valid)
///
/// # Example (JavaScript)
/// ```javascript
/// const errors = validateForm(rulesJson, [
///     { name: 'age', type: 'text', tagName: 'INPUT', value: '17' }
/// ]);
/// ```
#[wasm_bindgen(js_name = validateForm)]
pub fn validate_form(rules: &str, fields: JsValue) -> Result<JsValue, JsValue> {
    let errors = form_failures(rules, parse_fields(fields)?).map_err(to_js)?;
    Ok(serde_wasm_bindgen::to_value(&errors)?)
}

/// Validate one field; returns its first failure, if any
#[wasm_bindgen(js_name = validateField)]
pub fn validate_field(rules: &str, fields: JsValue, name: &str) -> Result<JsValue, JsValue> {
    let errors = field_failures(rules, parse_fields(fields)?, name).map_err(to_js)?;
    Ok(serde_wasm_bindgen::to_value(&errors)?)
}

/// Validate a form and write the failures into the page: `<field><suffix>`
/// boxes first, then the global errors element, then an alert.
/// Returns true when the form is valid.
#[wasm_bindgen(js_name = validateAndShowFeedback)]
pub fn validate_and_show_feedback(
    rules: &str,
    fields: JsValue,
    field_error_suffix: Option<String>,
    global_errors_id: Option<String>,
) -> Result<bool, JsValue> {
    let defaults = DisplayConfig::default();
    let display = DisplayConfig {
        global_errors_id: global_errors_id.unwrap_or(defaults.global_errors_id),
        field_error_suffix: field_error_suffix.unwrap_or(defaults.field_error_suffix),
    };
    let config = ValangConfig {
        display,
        ..Default::default()
    };
    let mut validator = build_validator(rules, parse_fields(fields)?)
        .map_err(to_js)?
        .with_config(config)
        .with_reporter(DomFeedback::new(DomSurface));
    Ok(validator.validate_and_show_feedback())
}

/// Quick email validation
#[wasm_bindgen(js_name = isValidEmail)]
pub fn is_valid_email_js(email: &str) -> bool {
    valang_core::email::is_valid_email(email)
}

/// The live page document
#[derive(Debug, Default, Clone, Copy)]
pub struct DomSurface;

impl DomSurface {
    fn document() -> Option<Document> {
        web_sys::window()?.document()
    }

    fn element(id: &str) -> Option<Element> {
        Self::document()?.get_element_by_id(id)
    }
}

fn append_list(document: &Document, parent: &Element, items: &[String]) -> Result<(), JsValue> {
    let ul = document.create_element("ul")?;
    for item in items {
        let li = document.create_element("li")?;
        li.set_text_content(Some(item));
        ul.append_child(&li)?;
    }
    parent.append_child(&ul)?;
    Ok(())
}

impl ErrorSurface for DomSurface {
    fn exists(&self, id: &str) -> bool {
        Self::element(id).is_some()
    }

    fn set_text(&mut self, id: &str, text: &str) {
        if let Some(element) = Self::element(id) {
            element.set_text_content(Some(text));
        }
    }

    fn append_list(&mut self, id: &str, items: &[String]) {
        let (Some(document), Some(parent)) = (Self::document(), Self::element(id)) else {
            return;
        };
        if let Err(err) = append_list(&document, &parent, items) {
            web_sys::console::warn_1(&err);
        }
    }

    fn alert(&mut self, message: &str) {
        if let Some(window) = web_sys::window() {
            if let Err(err) = window.alert_with_message(message) {
                web_sys::console::warn_1(&err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wasm_bindgen_test::*;

    const RULES: &str = r#"[
        {"field": "email", "expression": {"isValidEmail": {"field": "email"}}, "errorMessage": "Invalid email"},
        {"field": "age", "expression": {"moreThanOrEquals": [{"field": "age"}, {"number": 18}]}, "errorMessage": "Adults only"},
        {"field": "age", "expression": {"hasLength": {"field": "age"}}, "errorMessage": "Age required"}
    ]"#;

    fn snapshot(name: &str, value: &str) -> FieldSnapshot {
        FieldSnapshot {
            name: name.to_string(),
            kind: "text".to_string(),
            tag_name: "INPUT".to_string(),
            value: value.to_string(),
            ..Default::default()
        }
    }

    #[wasm_bindgen_test]
    fn test_email_validation() {
        assert!(is_valid_email_js("user@example.com"));
        assert!(!is_valid_email_js("invalid-email"));
    }

    #[test]
    fn test_form_failures_in_form_order() {
        let fields = vec![snapshot("age", ""), snapshot("email", "nope")];
        let errors = form_failures(RULES, fields).unwrap();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["age", "age", "email"]);
    }

    #[test]
    fn test_field_failures_report_first_only() {
        let fields = vec![snapshot("age", ""), snapshot("email", "a@b.com")];
        let errors = field_failures(RULES, fields.clone(), "age").unwrap();
        assert_eq!(
            errors,
            vec![ValidationError {
                field: "age".to_string(),
                message: "Adults only".to_string(),
            }]
        );
        assert!(field_failures(RULES, fields, "email").unwrap().is_empty());
    }

    #[test]
    fn test_bad_declaration_is_reported() {
        assert!(matches!(
            form_failures("{", vec![]),
            Err(ValidatorError::Rules(_))
        ));
    }
}
