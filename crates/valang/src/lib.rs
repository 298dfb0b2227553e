// Valang - Client-side form validation
// Binds declared rules to a form, validates on events and on submit,
// and shows the failures on the page

pub mod config;
pub mod engine;
pub mod error;
pub mod feedback;
pub mod form;
#[cfg(feature = "events")]
pub mod trigger;

pub use config::{DisplayConfig, EventConfig, ValangConfig};
pub use engine::{FieldCallback, FieldGroups, FormCallback, ValangValidator, ValidationRun};
pub use error::{Result, ValidatorError};
pub use feedback::{
    DomFeedback, ErrorSurface, FailedRule, FeedbackReporter, MemorySurface, NoFeedback,
};
pub use form::{FieldControl, FieldSnapshot, FormField, FormLocator, HtmlDocument, HtmlForm};
#[cfg(feature = "events")]
pub use trigger::{EventTrigger, FieldEvent};

// Re-export the evaluation core
pub use valang_core::{
    parse_rules, Expression, FieldInfo, FormView, Pattern, Predicate, ResolvedValue, Rule,
    RuleEvaluator, ValangError, ValueBinder,
};
