// File: src/feedback.rs
// Purpose: Error display (per-field boxes, global list, alert fallback)

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use valang_core::Rule;

use crate::config::DisplayConfig;

/// A rule that failed, with its resolved message
#[derive(Debug, Clone, PartialEq)]
pub struct FailedRule {
    pub rule: Arc<Rule>,
    pub field: String,
    pub message: String,
}

impl FailedRule {
    pub fn new(rule: Arc<Rule>, message: impl Into<String>) -> Self {
        Self {
            field: rule.field.clone(),
            rule,
            message: message.into(),
        }
    }
}

/// Receives validation outcomes from the engine
pub trait FeedbackReporter {
    /// Remove any message previously shown for `field`
    fn clear_field(&mut self, field: &str);

    /// Empty the global error collector
    fn clear_global(&mut self);

    fn show(&mut self, failures: &[FailedRule]);

    /// Adopt the validator's element naming. Reporters that write into a
    /// page must follow it; the rest can ignore it.
    fn set_display(&mut self, _display: &DisplayConfig) {}
}

/// Reporter that discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoFeedback;

impl FeedbackReporter for NoFeedback {
    fn clear_field(&mut self, _field: &str) {}

    fn clear_global(&mut self) {}

    fn show(&mut self, _failures: &[FailedRule]) {}
}

/// The parts of a page the feedback writes to
pub trait ErrorSurface {
    fn exists(&self, id: &str) -> bool;

    /// Replace the element's content with plain text
    fn set_text(&mut self, id: &str, text: &str);

    /// Append one list (`<ul>`) with an item per message
    fn append_list(&mut self, id: &str, items: &[String]);

    /// Blocking dialog
    fn alert(&mut self, message: &str);
}

/// Displays failures the way a page expects: each message in its field's
/// error box, the rest gathered in the global errors element or, if the
/// page has none, in a single alert.
#[derive(Debug, Clone)]
pub struct DomFeedback<S> {
    surface: S,
    display: DisplayConfig,
}

impl<S: ErrorSurface> DomFeedback<S> {
    pub fn new(surface: S) -> Self {
        Self::with_display(surface, DisplayConfig::default())
    }

    /// Standalone use only: a validator replaces `display` with its own
    /// `[display]` section when the reporter is attached.
    pub fn with_display(surface: S, display: DisplayConfig) -> Self {
        Self { surface, display }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }
}

impl<S: ErrorSurface> FeedbackReporter for DomFeedback<S> {
    fn clear_field(&mut self, field: &str) {
        let id = self.display.field_error_id(field);
        if self.surface.exists(&id) {
            self.surface.set_text(&id, "");
        }
    }

    fn clear_global(&mut self) {
        if self.surface.exists(&self.display.global_errors_id) {
            self.surface.set_text(&self.display.global_errors_id, "");
        }
    }

    fn show(&mut self, failures: &[FailedRule]) {
        let mut unplaced = Vec::new();
        for failure in failures {
            let id = self.display.field_error_id(&failure.field);
            if self.surface.exists(&id) {
                self.surface.set_text(&id, &failure.message);
            } else {
                unplaced.push(failure.message.clone());
            }
        }

        if unplaced.is_empty() {
            return;
        }

        let global = &self.display.global_errors_id;
        if self.surface.exists(global) {
            self.surface.append_list(global, &unplaced);
        } else {
            tracing::debug!(count = unplaced.len(), "no global errors element, alerting");
            self.surface.alert(&unplaced.join("\n"));
        }
    }

    fn set_display(&mut self, display: &DisplayConfig) {
        self.display = display.clone();
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct SurfaceElement {
    pub text: String,
    pub lists: Vec<Vec<String>>,
}

#[derive(Debug, Default)]
struct SurfaceState {
    elements: HashMap<String, SurfaceElement>,
    alerts: Vec<String>,
}

/// In-memory page surface. Clones share state, so a handle kept outside
/// the validator observes what it displayed.
#[derive(Debug, Default, Clone)]
pub struct MemorySurface {
    state: Arc<Mutex<SurfaceState>>,
}

impl MemorySurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an (empty) element with this id
    pub fn with_element(self, id: &str) -> Self {
        self.lock()
            .elements
            .insert(id.to_string(), SurfaceElement::default());
        self
    }

    pub fn text(&self, id: &str) -> Option<String> {
        self.lock().elements.get(id).map(|e| e.text.clone())
    }

    pub fn lists(&self, id: &str) -> Vec<Vec<String>> {
        self.lock()
            .elements
            .get(id)
            .map(|e| e.lists.clone())
            .unwrap_or_default()
    }

    pub fn alerts(&self) -> Vec<String> {
        self.lock().alerts.clone()
    }

    fn lock(&self) -> MutexGuard<'_, SurfaceState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ErrorSurface for MemorySurface {
    fn exists(&self, id: &str) -> bool {
        self.lock().elements.contains_key(id)
    }

    fn set_text(&mut self, id: &str, text: &str) {
        if let Some(element) = self.lock().elements.get_mut(id) {
            element.text = text.to_string();
            element.lists.clear();
        }
    }

    fn append_list(&mut self, id: &str, items: &[String]) {
        if let Some(element) = self.lock().elements.get_mut(id) {
            element.lists.push(items.to_vec());
        }
    }

    fn alert(&mut self, message: &str) {
        self.lock().alerts.push(message.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use valang_core::{Expression, Predicate};

    fn failure(field: &str, message: &str) -> FailedRule {
        let rule = Rule::new(field, Predicate::HasText(Expression::field(field)), message);
        FailedRule::new(Arc::new(rule), message)
    }

    #[test]
    fn test_message_goes_to_field_box() {
        let surface = MemorySurface::new().with_element("age_error");
        let mut feedback = DomFeedback::new(surface.clone());
        feedback.show(&[failure("age", "too young")]);
        assert_eq!(surface.text("age_error").as_deref(), Some("too young"));
        assert!(surface.alerts().is_empty());
    }

    #[test]
    fn test_unplaced_messages_form_one_global_list() {
        let surface = MemorySurface::new()
            .with_element("age_error")
            .with_element("global_errors");
        let mut feedback = DomFeedback::new(surface.clone());
        feedback.show(&[
            failure("name", "name required"),
            failure("age", "too young"),
            failure("email", "bad email"),
        ]);
        assert_eq!(
            surface.lists("global_errors"),
            vec![vec!["name required".to_string(), "bad email".to_string()]]
        );
    }

    #[test]
    fn test_alert_fallback_joins_messages() {
        let surface = MemorySurface::new();
        let mut feedback = DomFeedback::new(surface.clone());
        feedback.show(&[failure("a", "first"), failure("b", "second")]);
        assert_eq!(surface.alerts(), vec!["first\nsecond".to_string()]);
    }

    #[test]
    fn test_nothing_escalated_when_all_placed() {
        let surface = MemorySurface::new().with_element("a_error");
        let mut feedback = DomFeedback::new(surface.clone());
        feedback.show(&[failure("a", "first")]);
        feedback.show(&[]);
        assert!(surface.alerts().is_empty());
    }

    #[test]
    fn test_clearing() {
        let surface = MemorySurface::new()
            .with_element("a_error")
            .with_element("global_errors");
        let mut feedback = DomFeedback::new(surface.clone());
        feedback.show(&[failure("a", "first"), failure("b", "second")]);
        feedback.clear_field("a");
        feedback.clear_global();
        assert_eq!(surface.text("a_error").as_deref(), Some(""));
        assert!(surface.lists("global_errors").is_empty());
    }

    #[test]
    fn test_custom_ids() {
        let display = DisplayConfig {
            global_errors_id: "errors".into(),
            field_error_suffix: "-msg".into(),
        };
        let surface = MemorySurface::new()
            .with_element("a-msg")
            .with_element("errors");
        let mut feedback = DomFeedback::with_display(surface.clone(), display);
        feedback.show(&[failure("a", "first"), failure("b", "second")]);
        assert_eq!(surface.text("a-msg").as_deref(), Some("first"));
        assert_eq!(surface.lists("errors"), vec![vec!["second".to_string()]]);
    }

    #[test]
    fn test_set_display_replaces_ids() {
        let surface = MemorySurface::new()
            .with_element("a_error")
            .with_element("a-msg")
            .with_element("errors");
        let mut feedback = DomFeedback::new(surface.clone());
        feedback.set_display(&DisplayConfig {
            global_errors_id: "errors".into(),
            field_error_suffix: "-msg".into(),
        });
        feedback.show(&[failure("a", "first"), failure("b", "second")]);
        assert_eq!(surface.text("a-msg").as_deref(), Some("first"));
        assert_eq!(surface.text("a_error").as_deref(), Some(""));
        assert_eq!(surface.lists("errors"), vec![vec!["second".to_string()]]);
    }
}
