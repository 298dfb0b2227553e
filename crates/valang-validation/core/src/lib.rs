//! Valang validation core
//!
//! Pure rule evaluation shared by the browser bindings and the validation
//! engine: loosely typed values, coercion, expression trees, operators and
//! the rule declaration format. Nothing in this crate touches a page.

pub mod coercion;
pub mod email;
pub mod error;
pub mod evaluator;
pub mod expression;
pub mod form;
pub mod operators;
pub mod rule;
pub mod value;

pub use coercion::{coerce, parse_number, same_type, DefaultBinder, ValueBinder};
pub use error::{CoercionFailure, ValangError};
pub use evaluator::{check, RuleEvaluator};
pub use expression::{Expression, Pattern, Predicate};
pub use form::{FieldInfo, FormView};
pub use rule::{parse_rules, Rule};
pub use value::{ResolvedValue, ValueCategory};
