// File: src/engine.rs
// Purpose: Validation engine binding rules to a form and reporting failures

use std::collections::HashMap;
use std::sync::Arc;

use tracing::Dispatch;
use valang_core::{parse_rules, FormView, Rule, RuleEvaluator, ValueBinder};

use crate::config::ValangConfig;
use crate::error::{Result, ValidatorError};
use crate::feedback::{FailedRule, FeedbackReporter, NoFeedback};
use crate::form::FormLocator;

/// Called after every field validation with (field, is_valid, rule_count)
pub type FieldCallback = Box<dyn Fn(&str, bool, usize) + Send + Sync>;

/// Called after whole-form validation with (validator name, is_valid);
/// the return value can veto submission
pub type FormCallback = Box<dyn Fn(&str, bool) -> bool + Send + Sync>;

/// Rules grouped by field name, fields kept in first-registration order
#[derive(Debug, Default, Clone)]
pub struct FieldGroups {
    order: Vec<String>,
    rules: HashMap<String, Vec<Arc<Rule>>>,
}

impl FieldGroups {
    /// Add a batch of rules, appended to (or placed ahead of) each field's
    /// existing rules. Returns fields seen for the first time.
    pub fn register(&mut self, rules: &[Arc<Rule>], prepend: bool) -> Vec<String> {
        let mut new_fields = Vec::new();
        let mut batches: Vec<(String, Vec<Arc<Rule>>)> = Vec::new();

        for rule in rules {
            match batches.iter_mut().find(|(field, _)| *field == rule.field) {
                Some((_, batch)) => batch.push(rule.clone()),
                None => batches.push((rule.field.clone(), vec![rule.clone()])),
            }
        }

        for (field, batch) in batches {
            if !self.rules.contains_key(&field) {
                self.order.push(field.clone());
                new_fields.push(field.clone());
            }
            let group = self.rules.entry(field).or_default();
            if prepend {
                let tail = std::mem::replace(group, batch);
                group.extend(tail);
            } else {
                group.extend(batch);
            }
        }

        new_fields
    }

    pub fn rules_for(&self, field: &str) -> &[Arc<Rule>] {
        self.rules.get(field).map(Vec::as_slice).unwrap_or_default()
    }

    /// Field names in registration order
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.rules.contains_key(field)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Outcome of a whole-form pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationRun {
    /// Failed rules in form field order; rules on fields the form lacks last
    pub failures: Vec<FailedRule>,
}

impl ValidationRun {
    pub fn is_valid(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failed_fields(&self) -> Vec<&str> {
        self.failures.iter().map(|f| f.field.as_str()).collect()
    }
}

/// Client-side validator bound to one form
pub struct ValangValidator<F> {
    name: String,
    form: F,
    groups: FieldGroups,
    /// Every registered rule, in registration order
    rules: Vec<Arc<Rule>>,
    bound: Vec<String>,
    config: ValangConfig,
    evaluator: RuleEvaluator,
    reporter: Box<dyn FeedbackReporter + Send>,
    field_callback: Option<FieldCallback>,
    form_callback: Option<FormCallback>,
    dispatch: Option<Dispatch>,
}

impl<F> std::fmt::Debug for ValangValidator<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValangValidator")
            .field("name", &self.name)
            .field("fields", &self.groups.order)
            .field("rules", &self.rules.len())
            .field("bound", &self.bound)
            .finish_non_exhaustive()
    }
}

impl<F: FormView> ValangValidator<F> {
    pub fn new(name: impl Into<String>, form: F, rules: Vec<Rule>) -> Self {
        let mut validator = Self {
            name: name.into(),
            form,
            groups: FieldGroups::default(),
            rules: Vec::new(),
            bound: Vec::new(),
            config: ValangConfig::default(),
            evaluator: RuleEvaluator::new(),
            reporter: Box::new(NoFeedback),
            field_callback: None,
            form_callback: None,
            dispatch: None,
        };
        validator.register_rules(rules, false);
        validator
    }

    /// Bind to the form named `name` on the page
    pub fn locate<L>(name: &str, locator: &L, rules: Vec<Rule>) -> Result<Self>
    where
        L: FormLocator<Form = F>,
    {
        let form = locator
            .locate_form(name)
            .ok_or_else(|| ValidatorError::MissingForm { name: name.to_string() })?;
        Ok(Self::new(name, form, rules))
    }

    /// Bind to a form using a JSON rule declaration
    pub fn from_declaration(name: impl Into<String>, form: F, json: &str) -> Result<Self> {
        let rules = parse_rules(json)?;
        Ok(Self::new(name, form, rules))
    }

    /// Replace the configuration. Its `[display]` section is handed to the
    /// reporter, whichever of the two was set first.
    pub fn with_config(mut self, config: ValangConfig) -> Self {
        self.config = config;
        self.reporter.set_display(&self.config.display);
        self
    }

    pub fn with_reporter(mut self, reporter: impl FeedbackReporter + Send + 'static) -> Self {
        self.reporter = Box::new(reporter);
        self.reporter.set_display(&self.config.display);
        self
    }

    pub fn with_binder(mut self, binder: Arc<dyn ValueBinder>) -> Self {
        self.evaluator = self.evaluator.with_binder(binder);
        self
    }

    /// Send this validator's log output to `dispatch` instead of the
    /// process-wide subscriber
    pub fn with_dispatch(mut self, dispatch: Dispatch) -> Self {
        self.dispatch = Some(dispatch);
        self
    }

    pub fn on_field_validated<C>(mut self, callback: C) -> Self
    where
        C: Fn(&str, bool, usize) + Send + Sync + 'static,
    {
        self.field_callback = Some(Box::new(callback));
        self
    }

    pub fn on_form_validated<C>(mut self, callback: C) -> Self
    where
        C: Fn(&str, bool) -> bool + Send + Sync + 'static,
    {
        self.form_callback = Some(Box::new(callback));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn form(&self) -> &F {
        &self.form
    }

    pub fn config(&self) -> &ValangConfig {
        &self.config
    }

    pub fn groups(&self) -> &FieldGroups {
        &self.groups
    }

    /// Fields whose events trigger re-validation
    pub fn bound_fields(&self) -> &[String] {
        &self.bound
    }

    pub fn is_bound(&self, field: &str) -> bool {
        self.bound.iter().any(|f| f == field)
    }

    pub fn rule_count(&self, field: &str) -> usize {
        self.groups.rules_for(field).len()
    }

    /// Add rules. Registering a rule twice makes it run twice.
    /// Returns the fields newly bound for event-driven validation.
    pub fn register_rules(&mut self, rules: Vec<Rule>, prepend: bool) -> Vec<String> {
        let rules: Vec<Arc<Rule>> = rules.into_iter().map(Arc::new).collect();
        let new_fields = self.groups.register(&rules, prepend);

        if prepend {
            let tail = std::mem::replace(&mut self.rules, rules);
            self.rules.extend(tail);
        } else {
            self.rules.extend(rules);
        }

        let instances = self.form.fields();
        let mut newly_bound = Vec::new();
        for field in new_fields {
            let mut named = instances.iter().filter(|i| i.name == field).peekable();
            let submit_only = named.peek().is_some() && named.all(|i| i.is_submit());
            if submit_only || self.is_bound(&field) {
                continue;
            }
            self.bound.push(field.clone());
            newly_bound.push(field);
        }

        self.in_scope(|this| {
            tracing::debug!(
                validator = %this.name,
                rules = this.rules.len(),
                bound = ?newly_bound,
                "registered rules"
            );
        });
        newly_bound
    }

    /// Parse and register a JSON rule declaration
    pub fn register_declaration(&mut self, json: &str, prepend: bool) -> Result<Vec<String>> {
        let rules = parse_rules(json)?;
        Ok(self.register_rules(rules, prepend))
    }

    /// Run every rule of `field`. Only the first failure is displayed; the
    /// result is false if any rule failed.
    pub fn validate_field(&mut self, field: &str) -> bool {
        self.in_scope(|this| this.run_field(field))
    }

    /// Validate each registered field once per live instance on the form
    pub fn validate_all(&mut self) -> bool {
        self.in_scope(|this| {
            let span = tracing::debug_span!("validate_form", validator = %this.name);
            let _enter = span.enter();

            let fields: Vec<String> = this.groups.order.clone();
            let mut valid = true;
            for field in fields {
                for _ in 0..this.form.instances_of(&field) {
                    valid = this.run_field(&field) && valid;
                }
            }
            tracing::debug!(valid, "form validated");
            valid
        })
    }

    /// Whole-form pass over every rule in registration order, failures
    /// reordered to follow the form's fields. Clears shown errors but does
    /// not display new ones.
    pub fn validate(&mut self) -> ValidationRun {
        self.in_scope(|this| this.run_form())
    }

    /// Whole-form pass that displays every failure; true when nothing failed
    pub fn validate_and_show_feedback(&mut self) -> bool {
        self.in_scope(|this| {
            let run = this.run_form();
            if !run.is_valid() {
                this.reporter.show(&run.failures);
            }
            run.is_valid()
        })
    }

    /// Submit handler: the form is accepted only when validation passes and
    /// the form callback agrees
    pub fn handle_submit(&mut self) -> bool {
        let valid = self.validate_and_show_feedback();
        self.in_scope(|this| {
            let verdict = match &this.form_callback {
                Some(callback) => callback(&this.name, valid),
                None => {
                    tracing::debug!(form = %this.name, valid, "form validation callback");
                    valid
                }
            };
            let accepted = verdict && valid;
            tracing::info!(form = %this.name, accepted, "submit");
            accepted
        })
    }

    fn run_field(&mut self, field: &str) -> bool {
        let span = tracing::debug_span!("validate_field", field);
        let _enter = span.enter();

        let rules = self.groups.rules_for(field).to_vec();
        let mut failures = Vec::new();
        if !rules.is_empty() {
            self.reporter.clear_field(field);
            for rule in &rules {
                if !self.evaluate(rule) {
                    failures.push(self.failure(rule));
                }
            }
        }

        let valid = failures.is_empty();
        if let Some(first) = failures.first() {
            self.reporter.show(std::slice::from_ref(first));
        }

        match &self.field_callback {
            Some(callback) => callback(field, valid, rules.len()),
            None => tracing::debug!(field, valid, rules = rules.len(), "field validation callback"),
        }
        valid
    }

    fn run_form(&mut self) -> ValidationRun {
        let span = tracing::debug_span!("validate_form", validator = %self.name);
        let _enter = span.enter();

        self.reporter.clear_global();
        let rules = self.rules.clone();
        let mut failures = Vec::new();
        for rule in &rules {
            self.reporter.clear_field(&rule.field);
            if !self.evaluate(rule) {
                failures.push(self.failure(rule));
            }
        }

        let failures = self.in_form_order(failures);
        tracing::debug!(failed = failures.len(), "finished rules evaluation");
        ValidationRun { failures }
    }

    fn evaluate(&self, rule: &Rule) -> bool {
        let span = tracing::trace_span!("rule", field = %rule.field);
        let _enter = span.enter();

        let passed = self.evaluator.evaluate(rule, &self.form);
        if passed {
            tracing::trace!("passed");
        } else {
            tracing::debug!(field = %rule.field, "rule failed");
        }
        passed
    }

    fn failure(&self, rule: &Arc<Rule>) -> FailedRule {
        let message = rule.message_with(&self.config.messages).to_string();
        FailedRule::new(rule.clone(), message)
    }

    /// Stable reorder: failures grouped by the form's field order, failures
    /// on fields the form lacks appended in their original order
    fn in_form_order(&self, failures: Vec<FailedRule>) -> Vec<FailedRule> {
        let mut pending: Vec<Option<FailedRule>> = failures.into_iter().map(Some).collect();
        let mut sorted = Vec::with_capacity(pending.len());

        for name in self.form.field_names() {
            for slot in pending.iter_mut() {
                if slot.as_ref().is_some_and(|f| f.field == name) {
                    sorted.extend(slot.take());
                }
            }
        }
        sorted.extend(pending.into_iter().flatten());
        sorted
    }

    fn in_scope<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        match self.dispatch.clone() {
            Some(dispatch) => tracing::dispatcher::with_default(&dispatch, || f(self)),
            None => f(self),
        }
    }
}
