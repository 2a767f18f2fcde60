//! Secret redaction for logs leaving the process.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

/// Replacement for every redacted fragment.
pub const REDACTED: &str = "***";

static API_KEY_PARAM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\bkey=[^&\s"'<>]+"#).expect("valid key pattern"));

static HEX_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b0x[0-9a-fA-F]+\b").expect("valid hex pattern"));

/// Redacts configured secrets, `key=` query fragments and `0x…` hex runs.
#[derive(Debug, Clone, Default)]
pub struct Redactor {
    secrets: Vec<String>,
}

impl Redactor {
    /// Creates a redactor for the given secrets. Empty secrets are ignored.
    pub fn new<I, S>(secrets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut secrets: Vec<String> = secrets
            .into_iter()
            .map(Into::into)
            .filter(|secret: &String| !secret.is_empty())
            .collect();
        // Longer secrets first so a secret containing another is fully hidden.
        secrets.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        secrets.dedup();
        Self { secrets }
    }

    /// Redacts one string.
    pub fn redact_str(&self, text: &str) -> String {
        let mut out = text.to_string();
        for secret in &self.secrets {
            if out.contains(secret.as_str()) {
                out = out.replace(secret.as_str(), REDACTED);
            }
        }
        let out = API_KEY_PARAM.replace_all(&out, "key=***");
        HEX_RUN.replace_all(&out, REDACTED).into_owned()
    }

    /// Redacts every string inside a JSON value, recursively.
    pub fn redact_value(&self, value: &mut Value) {
        match value {
            Value::String(text) => *text = self.redact_str(text),
            Value::Array(items) => items.iter_mut().for_each(|item| self.redact_value(item)),
            Value::Object(map) => map.values_mut().for_each(|item| self.redact_value(item)),
            Value::Null | Value::Bool(_) | Value::Number(_) => {}
        }
    }
}
