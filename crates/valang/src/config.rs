// File: src/config.rs
// Purpose: Validator configuration parsing from valang.toml

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Validator configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ValangConfig {
    #[serde(default)]
    pub display: DisplayConfig,

    #[serde(default)]
    pub events: EventConfig,

    /// Message bundle: rule message key -> text
    #[serde(default)]
    pub messages: HashMap<String, String>,
}

/// Where error messages are written on the page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Id of the element collecting errors that have no field box
    #[serde(default = "default_global_errors_id")]
    pub global_errors_id: String,

    /// Suffix appended to a field name to find its error box
    #[serde(default = "default_field_error_suffix")]
    pub field_error_suffix: String,
}

/// Which field events trigger re-validation, and how long to wait
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventConfig {
    /// Delay for blur and change events (milliseconds)
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Delay for keyboard events (milliseconds)
    #[serde(default = "default_keystroke_debounce_ms")]
    pub keystroke_debounce_ms: u64,

    #[serde(default = "default_true")]
    pub validate_on_blur: bool,

    #[serde(default = "default_true")]
    pub validate_on_change: bool,

    #[serde(default = "default_true")]
    pub validate_on_key: bool,
}

// Default values
fn default_global_errors_id() -> String {
    "global_errors".to_string()
}

fn default_field_error_suffix() -> String {
    "_error".to_string()
}

fn default_debounce_ms() -> u64 {
    5
}

fn default_keystroke_debounce_ms() -> u64 {
    250
}

fn default_true() -> bool {
    true
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            global_errors_id: default_global_errors_id(),
            field_error_suffix: default_field_error_suffix(),
        }
    }
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            keystroke_debounce_ms: default_keystroke_debounce_ms(),
            validate_on_blur: true,
            validate_on_change: true,
            validate_on_key: true,
        }
    }
}

impl EventConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn keystroke_debounce(&self) -> Duration {
        Duration::from_millis(self.keystroke_debounce_ms)
    }
}

impl DisplayConfig {
    /// Id of the error box for a field
    pub fn field_error_id(&self, field: &str) -> String {
        format!("{}{}", field, self.field_error_suffix)
    }
}

impl ValangConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        // If file doesn't exist, return default config
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    /// Load configuration from default path (./valang.toml)
    pub fn load_default() -> Result<Self> {
        Self::load("valang.toml")
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        // If file is empty, return default config
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        Ok(toml::from_str(content)?)
    }
}
