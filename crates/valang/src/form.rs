// File: src/form.rs
// Purpose: In-memory HTML form adapter implementing FormView

use serde::{Deserialize, Serialize};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use valang_core::{FieldInfo, FormView, ResolvedValue};

use crate::error::{Result, ValidatorError};

/// Input types whose value is read like a text box
const TEXT_INPUT_TYPES: &[&str] = &[
    "text",
    "password",
    "hidden",
    "submit",
    "email",
    "number",
    "tel",
    "url",
    "search",
    "date",
    "datetime-local",
    "time",
    "month",
    "week",
    "color",
    "range",
];

/// How a field instance holds its value
#[derive(Debug, Clone, PartialEq)]
pub enum FieldControl {
    Text { value: String },
    Checkable { value: String, checked: bool },
    SelectOne { options: Vec<String>, selected: Option<usize> },
    SelectMultiple { options: Vec<String>, selected: Vec<usize> },
}

/// A single form control, as found in the form's element list
#[derive(Debug, Clone, PartialEq)]
pub struct FormField {
    pub id: Option<String>,
    pub name: String,
    /// Lowercased type attribute
    pub kind: String,
    /// Lowercased tag name
    pub tag: String,
    pub control: FieldControl,
}

/// Serializable description of a field, as sent from a page
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSnapshot {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    pub tag_name: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub checked: bool,
    #[serde(default)]
    pub options: Vec<String>,
    /// Indices of selected options
    #[serde(default)]
    pub selected: Vec<usize>,
}

impl FormField {
    fn input(name: &str, kind: &str, control: FieldControl) -> Self {
        Self {
            id: None,
            name: name.to_string(),
            kind: kind.to_string(),
            tag: "input".to_string(),
            control,
        }
    }

    pub fn text(name: &str, value: &str) -> Self {
        Self::input(name, "text", FieldControl::Text { value: value.to_string() })
    }

    pub fn password(name: &str, value: &str) -> Self {
        Self::input(name, "password", FieldControl::Text { value: value.to_string() })
    }

    pub fn hidden(name: &str, value: &str) -> Self {
        Self::input(name, "hidden", FieldControl::Text { value: value.to_string() })
    }

    pub fn submit(name: &str, value: &str) -> Self {
        Self::input(name, "submit", FieldControl::Text { value: value.to_string() })
    }

    pub fn checkbox(name: &str, value: &str, checked: bool) -> Self {
        Self::input(
            name,
            "checkbox",
            FieldControl::Checkable { value: value.to_string(), checked },
        )
    }

    pub fn radio(name: &str, value: &str, checked: bool) -> Self {
        Self::input(
            name,
            "radio",
            FieldControl::Checkable { value: value.to_string(), checked },
        )
    }

    pub fn textarea(name: &str, value: &str) -> Self {
        Self {
            id: None,
            name: name.to_string(),
            kind: "textarea".to_string(),
            tag: "textarea".to_string(),
            control: FieldControl::Text { value: value.to_string() },
        }
    }

    pub fn select(name: &str, options: &[&str], selected: Option<usize>) -> Self {
        Self {
            id: None,
            name: name.to_string(),
            kind: "select-one".to_string(),
            tag: "select".to_string(),
            control: FieldControl::SelectOne {
                options: options.iter().map(|o| o.to_string()).collect(),
                selected,
            },
        }
    }

    pub fn select_multiple(name: &str, options: &[&str], selected: &[usize]) -> Self {
        Self {
            id: None,
            name: name.to_string(),
            kind: "select-multiple".to_string(),
            tag: "select".to_string(),
            control: FieldControl::SelectMultiple {
                options: options.iter().map(|o| o.to_string()).collect(),
                selected: selected.to_vec(),
            },
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    /// Build a text-like or checkable field from its element attributes
    pub fn from_element(tag: &str, kind: &str, name: &str, value: &str) -> Result<Self> {
        Self::from_snapshot(FieldSnapshot {
            name: name.to_string(),
            kind: kind.to_string(),
            tag_name: tag.to_string(),
            value: value.to_string(),
            ..Default::default()
        })
    }

    /// Build a field from a page snapshot, rejecting controls whose value
    /// cannot be read (file pickers, image and plain buttons, ...)
    pub fn from_snapshot(snapshot: FieldSnapshot) -> Result<Self> {
        let tag = snapshot.tag_name.to_lowercase();
        let kind = snapshot.kind.to_lowercase();

        let control = match (tag.as_str(), kind.as_str()) {
            ("textarea", _) => FieldControl::Text { value: snapshot.value },
            ("select", "select-multiple") => FieldControl::SelectMultiple {
                options: snapshot.options,
                selected: snapshot.selected,
            },
            ("select", _) => FieldControl::SelectOne {
                options: snapshot.options,
                selected: snapshot.selected.first().copied(),
            },
            ("input", "checkbox" | "radio") => FieldControl::Checkable {
                value: snapshot.value,
                checked: snapshot.checked,
            },
            ("input", k) if k.is_empty() || TEXT_INPUT_TYPES.contains(&k) => {
                FieldControl::Text { value: snapshot.value }
            }
            _ => return Err(ValidatorError::UnsupportedField { tag, kind }),
        };

        let kind = match (&control, kind.is_empty()) {
            (FieldControl::Text { .. }, true) if tag == "textarea" => "textarea".to_string(),
            (FieldControl::Text { .. }, true) => "text".to_string(),
            (FieldControl::SelectOne { .. }, true) => "select-one".to_string(),
            _ => kind,
        };

        Ok(Self {
            id: snapshot.id,
            name: snapshot.name,
            kind,
            tag,
            control,
        })
    }

    /// Value of this single instance; `None` for an unchecked box
    pub fn value(&self) -> Option<ResolvedValue> {
        match &self.control {
            FieldControl::Text { value } => Some(value.as_str().into()),
            FieldControl::Checkable { value, checked } => checked.then(|| value.as_str().into()),
            FieldControl::SelectOne { options, selected } => Some(
                selected
                    .and_then(|i| options.get(i))
                    .map_or_else(String::new, Clone::clone)
                    .into(),
            ),
            FieldControl::SelectMultiple { options, selected } => Some(ResolvedValue::List(
                selected
                    .iter()
                    .filter_map(|&i| options.get(i))
                    .map(|o| o.as_str().into())
                    .collect(),
            )),
        }
    }

    pub fn info(&self) -> FieldInfo {
        FieldInfo::new(self.name.clone(), self.kind.clone(), self.tag.clone())
    }
}

#[derive(Debug, Default)]
struct FormState {
    id: String,
    fields: Vec<FormField>,
}

/// Shared handle to a form. Clones see the same fields, so the page (or a
/// test) can keep typing into a form the validator is bound to.
#[derive(Debug, Clone, Default)]
pub struct HtmlForm {
    inner: Arc<RwLock<FormState>>,
}

impl HtmlForm {
    pub fn new(id: &str) -> Self {
        Self {
            inner: Arc::new(RwLock::new(FormState {
                id: id.to_string(),
                fields: Vec::new(),
            })),
        }
    }

    /// Build a form from page snapshots, in document order
    pub fn from_snapshots(id: &str, snapshots: Vec<FieldSnapshot>) -> Result<Self> {
        let form = Self::new(id);
        for snapshot in snapshots {
            form.push(FormField::from_snapshot(snapshot)?);
        }
        Ok(form)
    }

    pub fn with_field(self, field: FormField) -> Self {
        self.push(field);
        self
    }

    pub fn push(&self, field: FormField) {
        self.write().fields.push(field);
    }

    pub fn id(&self) -> String {
        self.read().id.clone()
    }

    /// Type into the first text-like field with this name
    pub fn set_value(&self, name: &str, value: &str) -> bool {
        let mut state = self.write();
        let target = state.fields.iter_mut().find_map(|f| match &mut f.control {
            FieldControl::Text { value: text } if f.name == name => Some(text),
            _ => None,
        });
        match target {
            Some(slot) => {
                *slot = value.to_string();
                true
            }
            None => false,
        }
    }

    /// Check or uncheck the box/radio with this name and value.
    /// Checking a radio unchecks the rest of its group.
    pub fn set_checked(&self, name: &str, value: &str, checked: bool) -> bool {
        let mut state = self.write();
        let mut found = false;
        for field in state.fields.iter_mut().filter(|f| f.name == name) {
            let is_radio = field.kind == "radio";
            if let FieldControl::Checkable { value: v, checked: c } = &mut field.control {
                if v == value {
                    *c = checked;
                    found = true;
                } else if is_radio && checked {
                    *c = false;
                }
            }
        }
        found
    }

    /// Select options (by value) on the first select with this name
    pub fn select(&self, name: &str, values: &[&str]) -> bool {
        let mut state = self.write();
        let Some(field) = state.fields.iter_mut().find(|f| f.name == name) else {
            return false;
        };
        match &mut field.control {
            FieldControl::SelectOne { options, selected } => {
                *selected = values.first().and_then(|v| option_index(options, v));
                true
            }
            FieldControl::SelectMultiple { options, selected } => {
                *selected = values.iter().filter_map(|v| option_index(options, v)).collect();
                true
            }
            _ => false,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, FormState> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, FormState> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn option_index(options: &[String], value: &str) -> Option<usize> {
    options.iter().position(|o| o == value)
}

impl FormView for HtmlForm {
    fn value(&self, field: &str) -> ResolvedValue {
        let mut values: Vec<ResolvedValue> = self
            .read()
            .fields
            .iter()
            .filter(|f| f.name == field)
            .filter_map(FormField::value)
            .filter(ResolvedValue::is_truthy)
            .collect();

        match values.len() {
            0 => ResolvedValue::Null,
            1 => values.remove(0),
            _ => ResolvedValue::List(values),
        }
    }

    fn fields(&self) -> Vec<FieldInfo> {
        self.read().fields.iter().map(FormField::info).collect()
    }
}

/// Finds the form a named validator binds to
pub trait FormLocator {
    type Form: FormView;

    fn locate_form(&self, name: &str) -> Option<Self::Form>;
}

/// The forms of a page, plus script elements placed inside them
#[derive(Debug, Clone, Default)]
pub struct HtmlDocument {
    forms: Vec<HtmlForm>,
    /// (script element id, index of the enclosing form)
    scripts: Vec<(String, usize)>,
}

impl HtmlDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_form(mut self, form: HtmlForm) -> Self {
        self.forms.push(form);
        self
    }

    /// Place a script element with `script_id` inside the form `form_id`
    pub fn with_script_in(mut self, script_id: &str, form_id: &str) -> Self {
        if let Some(index) = self.forms.iter().position(|f| f.id() == form_id) {
            self.scripts.push((script_id.to_string(), index));
        }
        self
    }
}

impl FormLocator for HtmlDocument {
    type Form = HtmlForm;

    /// The form with id `name`, else the form enclosing the script element
    /// `<name>ValangValidator`
    fn locate_form(&self, name: &str) -> Option<HtmlForm> {
        if let Some(form) = self.forms.iter().find(|f| f.id() == name) {
            return Some(form.clone());
        }
        let script_id = format!("{}ValangValidator", name);
        self.scripts
            .iter()
            .find(|(id, _)| *id == script_id)
            .and_then(|(_, index)| self.forms.get(*index))
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn signup() -> HtmlForm {
        HtmlForm::new("signup")
            .with_field(FormField::text("name", "Ada"))
            .with_field(FormField::text("nickname", ""))
            .with_field(FormField::checkbox("topics", "rust", true))
            .with_field(FormField::checkbox("topics", "go", false))
            .with_field(FormField::checkbox("topics", "zig", true))
            .with_field(FormField::radio("plan", "free", false))
            .with_field(FormField::radio("plan", "pro", true))
            .with_field(FormField::select("country", &["", "NZ", "FR"], Some(2)))
            .with_field(FormField::select_multiple("langs", &["en", "fr"], &[]))
            .with_field(FormField::submit("save", "Save"))
    }

    #[test]
    fn test_scalar_and_missing_values() {
        let form = signup();
        assert_eq!(form.value("name"), "Ada".into());
        assert_eq!(form.value("nickname"), ResolvedValue::Null);
        assert_eq!(form.value("absent"), ResolvedValue::Null);
        assert_eq!(form.value("country"), "FR".into());
        assert_eq!(form.value("plan"), "pro".into());
    }

    #[test]
    fn test_checkbox_group_aggregates_checked_values() {
        let form = signup();
        assert_eq!(
            form.value("topics"),
            ResolvedValue::List(vec!["rust".into(), "zig".into()])
        );
        form.set_checked("topics", "rust", false);
        form.set_checked("topics", "zig", false);
        assert_eq!(form.value("topics"), ResolvedValue::Null);
    }

    #[test]
    fn test_empty_multi_select_is_an_empty_list() {
        let form = signup();
        assert_eq!(form.value("langs"), ResolvedValue::List(vec![]));
        form.select("langs", &["fr"]);
        assert_eq!(form.value("langs"), ResolvedValue::List(vec!["fr".into()]));
    }

    #[test]
    fn test_radio_group_is_exclusive() {
        let form = signup();
        assert!(form.set_checked("plan", "free", true));
        assert_eq!(form.value("plan"), "free".into());
    }

    #[test]
    fn test_shared_handle_sees_user_input() {
        let form = signup();
        let bound = form.clone();
        form.set_value("nickname", "countess");
        assert_eq!(bound.value("nickname"), "countess".into());
    }

    #[test]
    fn test_field_order_and_kinds() {
        let form = signup();
        let names = form.field_names();
        assert_eq!(names.first().map(String::as_str), Some("name"));
        assert_eq!(form.instances_of("topics"), 3);
        assert!(form.fields().last().unwrap().is_submit());
    }

    #[test]
    fn test_snapshot_conversion() {
        let json = r#"[
            {"name": "email", "type": "email", "tagName": "INPUT", "value": "a@b.com"},
            {"name": "bio", "tagName": "TEXTAREA", "value": "hi"},
            {"name": "size", "type": "select-one", "tagName": "SELECT", "options": ["S", "M"], "selected": [1]},
            {"name": "ok", "type": "checkbox", "tagName": "INPUT", "value": "yes", "checked": true}
        ]"#;
        let snapshots: Vec<FieldSnapshot> = serde_json::from_str(json).unwrap();
        let form = HtmlForm::from_snapshots("f", snapshots).unwrap();
        assert_eq!(form.value("email"), "a@b.com".into());
        assert_eq!(form.value("bio"), "hi".into());
        assert_eq!(form.value("size"), "M".into());
        assert_eq!(form.value("ok"), "yes".into());
        assert_eq!(form.fields()[1].kind, "textarea");
    }

    #[test]
    fn test_unsupported_snapshot_is_rejected() {
        let snapshot = FieldSnapshot {
            name: "upload".into(),
            kind: "file".into(),
            tag_name: "input".into(),
            ..Default::default()
        };
        assert!(matches!(
            FormField::from_snapshot(snapshot),
            Err(ValidatorError::UnsupportedField { .. })
        ));
    }

    #[test]
    fn test_locate_form_by_id_or_enclosed_script() {
        let doc = HtmlDocument::new()
            .with_form(HtmlForm::new("signup"))
            .with_form(HtmlForm::new("other"))
            .with_script_in("commandValangValidator", "other");
        assert_eq!(doc.locate_form("signup").map(|f| f.id()), Some("signup".into()));
        assert_eq!(doc.locate_form("command").map(|f| f.id()), Some("other".into()));
        assert!(doc.locate_form("missing").is_none());
    }
}
