//! Read-only view over a live form.
//!
//! Rule evaluation only ever reads through this trait, so the same rules
//! run against a DOM form in the browser, a JSON snapshot, or a test stub.

use crate::value::ResolvedValue;

/// One field instance of a form, in document order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldInfo {
    pub name: String,
    /// Lowercased `type` attribute (`text`, `checkbox`, `select-one`, ...)
    pub kind: String,
    /// Lowercased tag name (`input`, `select`, `textarea`)
    pub tag: String,
}

impl FieldInfo {
    pub fn new(name: impl Into<String>, kind: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            tag: tag.into(),
        }
    }

    pub fn is_submit(&self) -> bool {
        self.kind == "submit"
    }
}

pub trait FormView {
    /// Current value of the named field.
    ///
    /// Several same-named instances with a value give a `List`, a single
    /// one gives a scalar, none gives `Null`.
    fn value(&self, field: &str) -> ResolvedValue;

    /// All field instances in document (tab) order
    fn fields(&self) -> Vec<FieldInfo>;

    /// Field names in document order; a name repeats once per instance
    fn field_names(&self) -> Vec<String> {
        self.fields().into_iter().map(|f| f.name).collect()
    }

    /// Number of live instances carrying this name
    fn instances_of(&self, field: &str) -> usize {
        self.fields().iter().filter(|f| f.name == field).count()
    }
}

impl<T: FormView + ?Sized> FormView for &T {
    fn value(&self, field: &str) -> ResolvedValue {
        (**self).value(field)
    }

    fn fields(&self) -> Vec<FieldInfo> {
        (**self).fields()
    }
}
