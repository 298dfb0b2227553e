//! Validation rules and their declaration format

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::expression::Predicate;

/// A single per-field check with the message shown when it fails.
///
/// Rules are immutable once declared; the engine only reads them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    pub field: String,
    #[serde(rename = "expression")]
    pub predicate: Predicate,
    #[serde(rename = "errorMessage")]
    pub message: String,
    /// Message bundle key; resolved against the configured messages
    #[serde(default, rename = "errorKey", skip_serializing_if = "Option::is_none")]
    pub message_key: Option<String>,
    /// Rule source text as written by the rule author, kept for diagnostics
    #[serde(default, rename = "valang", skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl Rule {
    pub fn new(field: impl Into<String>, predicate: Predicate, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            predicate,
            message: message.into(),
            message_key: None,
            source: None,
        }
    }

    pub fn with_message_key(mut self, key: impl Into<String>) -> Self {
        self.message_key = Some(key.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// The message to display: the bundle entry for `message_key` if there
    /// is one, the declared default otherwise.
    pub fn message_with<'a>(&'a self, bundle: &'a HashMap<String, String>) -> &'a str {
        self.message_key
            .as_ref()
            .and_then(|key| bundle.get(key))
            .map_or(self.message.as_str(), String::as_str)
    }
}

/// Parse a rule declaration: a JSON array of
/// `{"field", "expression", "errorMessage", "errorKey"?, "valang"?}` objects
pub fn parse_rules(json: &str) -> Result<Vec<Rule>, serde_json::Error> {
    serde_json::from_str(json)
}
