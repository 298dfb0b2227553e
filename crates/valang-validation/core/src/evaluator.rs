//! Rule evaluation against a form view.

use std::collections::HashMap;
use std::sync::Arc;

use crate::coercion::{DefaultBinder, ValueBinder};
use crate::error::{Result, ValangError};
use crate::expression::{Expression, Predicate};
use crate::form::FormView;
use crate::operators::{self, Arithmetic, Relation};
use crate::rule::Rule;
use crate::value::ResolvedValue;

/// How a field reference is read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Read {
    /// Raw form value
    Raw,
    /// Bound through the [`ValueBinder`] (operand of a comparison)
    Bound,
}

/// Evaluates rules; never lets an evaluation error escape [`RuleEvaluator::evaluate`].
#[derive(Clone)]
pub struct RuleEvaluator {
    binder: Arc<dyn ValueBinder>,
}

impl Default for RuleEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RuleEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleEvaluator").finish_non_exhaustive()
    }
}

impl RuleEvaluator {
    pub fn new() -> Self {
        Self {
            binder: Arc::new(DefaultBinder),
        }
    }

    /// Replace the date/number binding routine
    pub fn with_binder(mut self, binder: Arc<dyn ValueBinder>) -> Self {
        self.binder = binder;
        self
    }

    /// Evaluate a rule. Any error counts as a failure and is logged.
    pub fn evaluate(&self, rule: &Rule, form: &dyn FormView) -> bool {
        match self.try_evaluate(rule, form) {
            Ok(valid) => valid,
            Err(err) => {
                tracing::warn!(field = %rule.field, error = %err, "rule evaluation failed");
                false
            }
        }
    }

    pub fn try_evaluate(&self, rule: &Rule, form: &dyn FormView) -> Result<bool> {
        self.try_evaluate_predicate(&rule.predicate, form)
    }

    pub fn try_evaluate_predicate(&self, predicate: &Predicate, form: &dyn FormView) -> Result<bool> {
        let mut pass = Pass {
            form,
            binder: self.binder.as_ref(),
            bound: HashMap::new(),
        };
        pass.predicate(predicate)
    }
}

/// State of one rule evaluation. Bound field values are cached so the
/// binder runs at most once per field and pass.
struct Pass<'a> {
    form: &'a dyn FormView,
    binder: &'a dyn ValueBinder,
    bound: HashMap<String, ResolvedValue>,
}

impl Pass<'_> {
    fn predicate(&mut self, predicate: &Predicate) -> Result<bool> {
        match predicate {
            Predicate::Equals(l, r) => {
                let (l, r) = self.operands(l, r)?;
                operators::equals(&l, &r)
            }
            Predicate::LessThan(l, r) => self.relate(Relation::LessThan, l, r),
            Predicate::LessThanOrEquals(l, r) => self.relate(Relation::LessThanOrEquals, l, r),
            Predicate::MoreThan(l, r) => self.relate(Relation::MoreThan, l, r),
            Predicate::MoreThanOrEquals(l, r) => self.relate(Relation::MoreThanOrEquals, l, r),
            Predicate::Between(l, r) => {
                let (l, r) = self.operands(l, r)?;
                operators::between(l, &r)
            }
            Predicate::In(l, r) => {
                let (l, r) = self.operands(l, r)?;
                Ok(operators::in_list(&l, &r))
            }

            Predicate::IsNull(e) => Ok(operators::is_null(&self.raw(e)?)),
            Predicate::HasText(e) => operators::has_text(&self.raw(e)?),
            Predicate::HasLength(e) => Ok(operators::has_length(&self.raw(e)?)),
            Predicate::IsBlank(e) => Ok(operators::is_blank(&self.raw(e)?)),
            Predicate::IsWord(e) => operators::is_word(&self.raw(e)?),
            Predicate::IsUpper(e) => operators::is_upper(&self.raw(e)?),
            Predicate::IsLower(e) => operators::is_lower(&self.raw(e)?),

            Predicate::Matches { pattern, value } => {
                operators::matches_regex(pattern, &self.raw(value)?)
            }
            Predicate::IsValidEmail(e) => Ok(operators::is_valid_email(&self.raw(e)?)),

            Predicate::Not(inner) => Ok(!self.predicate(inner)?),
            Predicate::And(items) => {
                for item in items {
                    if !self.predicate(item)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Predicate::Or(items) => {
                for item in items {
                    if self.predicate(item)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
        }
    }

    fn relate(&mut self, relation: Relation, l: &Expression, r: &Expression) -> Result<bool> {
        let (l, r) = self.operands(l, r)?;
        operators::relate(relation, l, &r)
    }

    fn operands(&mut self, l: &Expression, r: &Expression) -> Result<(ResolvedValue, ResolvedValue)> {
        Ok((self.resolve(l, Read::Bound)?, self.resolve(r, Read::Bound)?))
    }

    fn raw(&mut self, expr: &Expression) -> Result<ResolvedValue> {
        self.resolve(expr, Read::Raw)
    }

    fn resolve(&mut self, expr: &Expression, read: Read) -> Result<ResolvedValue> {
        match expr {
            Expression::Field(name) => Ok(self.field(name, read)),
            Expression::Null => Ok(ResolvedValue::Null),
            Expression::Number(n) => Ok(ResolvedValue::Number(*n)),
            Expression::String(s) => Ok(ResolvedValue::String(s.clone())),
            Expression::Date(d) => Ok(ResolvedValue::Date(*d)),
            Expression::List(items) => items
                .iter()
                .map(|item| self.resolve(item, read))
                .collect::<Result<Vec<_>>>()
                .map(ResolvedValue::List),

            Expression::LengthOf(e) => operators::length_of(&self.raw(e)?),
            Expression::LowerCase(e) => operators::lower_case(&self.raw(e)?),
            Expression::UpperCase(e) => operators::upper_case(&self.raw(e)?),

            Expression::Add(l, r) => self.arithmetic(Arithmetic::Add, l, r),
            Expression::Subtract(l, r) => self.arithmetic(Arithmetic::Subtract, l, r),
            Expression::Multiply(l, r) => self.arithmetic(Arithmetic::Multiply, l, r),
            Expression::Divide(l, r) => self.arithmetic(Arithmetic::Divide, l, r),
            Expression::Modulo(l, r) => self.arithmetic(Arithmetic::Modulo, l, r),
        }
    }

    fn arithmetic(&mut self, op: Arithmetic, l: &Expression, r: &Expression) -> Result<ResolvedValue> {
        let l = self.raw(l)?;
        let r = self.raw(r)?;
        operators::arithmetic(op, &l, &r)
    }

    fn field(&mut self, name: &str, read: Read) -> ResolvedValue {
        match read {
            Read::Raw => self.form.value(name),
            Read::Bound => {
                if let Some(value) = self.bound.get(name) {
                    return value.clone();
                }
                let value = self.binder.bind(name, self.form.value(name));
                self.bound.insert(name.to_string(), value.clone());
                value
            }
        }
    }
}

/// Convenience for one-off checks: evaluate `predicate` with the default binder
pub fn check(predicate: &Predicate, form: &dyn FormView) -> std::result::Result<bool, ValangError> {
    RuleEvaluator::new().try_evaluate_predicate(predicate, form)
}
