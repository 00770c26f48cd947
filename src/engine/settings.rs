//! Per-engine option maps.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Option name to value, scoped to one engine (`catalog`, `server`, `clingo`, ...).
///
/// Values are kept as JSON so settings read from a program annotation or a
/// config file pass through unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EngineSettings(BTreeMap<String, serde_json::Value>);

impl EngineSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// Adds a setting, builder style.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns the setting as text, or `default` when it is absent.
    ///
    /// Non-string values are rendered as JSON text.
    pub fn str_or(&self, key: &str, default: &str) -> String {
        match self.0.get(key) {
            None | Some(serde_json::Value::Null) => default.to_string(),
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }

    /// True only when the setting is present and truthy.
    pub fn flag(&self, key: &str) -> bool {
        match self.0.get(key) {
            Some(serde_json::Value::Bool(b)) => *b,
            Some(serde_json::Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
            Some(serde_json::Value::String(s)) => !s.is_empty(),
            Some(serde_json::Value::Array(a)) => !a.is_empty(),
            Some(serde_json::Value::Object(o)) => !o.is_empty(),
            Some(serde_json::Value::Null) | None => false,
        }
    }

    /// Overlays `other` on top of these settings.
    pub fn merge(&mut self, other: &EngineSettings) {
        for (key, value) in &other.0 {
            self.0.insert(key.clone(), value.clone());
        }
    }
}

impl FromIterator<(String, serde_json::Value)> for EngineSettings {
    fn from_iter<I: IntoIterator<Item = (String, serde_json::Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
