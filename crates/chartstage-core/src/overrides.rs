//! Deploy-time value overrides
//!
//! Some values are only known when a release is deployed (for example a
//! domain produced by an earlier pipeline stage). They are declared as
//! template strings with `{name}` placeholders, filled from stage outputs,
//! and passed to the package manager as `--set-json` arguments on top of
//! the staged values document.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;

use crate::error::{CoreError, Result};

/// Values produced by other pipeline stages, keyed by name
pub type StageOutputs = HashMap<String, JsonValue>;

/// Declaration of the deploy-time overrides of a bundle
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployTemplate {
    /// Names that must be present in the stage outputs
    #[serde(default)]
    pub required: Vec<String>,

    /// Dotted value key -> template string with `{name}` placeholders
    #[serde(default)]
    pub set_json: IndexMap<String, String>,

    /// Static entries applied after the templates
    #[serde(default)]
    pub set: IndexMap<String, JsonValue>,
}

impl DeployTemplate {
    /// Fill every template from `outputs`
    ///
    /// Fails before producing anything if a required value is missing or a
    /// template names a placeholder that is not declared as required.
    pub fn render(&self, outputs: &StageOutputs) -> Result<DeployOverrides> {
        let mut requirements = HashMap::with_capacity(self.required.len());
        for name in &self.required {
            let value = outputs
                .get(name)
                .filter(|v| !v.is_null())
                .ok_or_else(|| CoreError::MissingRequiredValue { name: name.clone() })?;
            requirements.insert(name.as_str(), display_value(value));
        }

        let mut overrides = DeployOverrides::default();
        for (key, template) in &self.set_json {
            let rendered = format_template(template, &requirements)?;
            overrides.insert(key.clone(), JsonValue::String(rendered));
        }
        for (key, value) in &self.set {
            overrides.insert(key.clone(), value.clone());
        }

        Ok(overrides)
    }
}

/// Flattened `key=value` overrides applied at install/upgrade time
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeployOverrides {
    entries: IndexMap<String, JsonValue>,
}

impl DeployOverrides {
    /// Create an empty set of overrides
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an entry
    pub fn insert(&mut self, key: impl Into<String>, value: JsonValue) {
        self.entries.insert(key.into(), value);
    }

    /// Get an entry
    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.entries.get(key)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if there are no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Render as `key="value" key2="value2"`
    ///
    /// Values are JSON-encoded, so strings are quoted and escaped.
    pub fn to_flat_string(&self) -> String {
        self.entries
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// One `key=<json>` argument per entry, for repeated `--set-json` flags
    pub fn to_set_json_args(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect()
    }
}

fn display_value(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Substitute `{name}` placeholders; `{{` and `}}` produce literal braces
pub fn format_template(template: &str, values: &HashMap<&str, String>) -> Result<String> {
    let invalid = |message: &str| CoreError::InvalidTemplate {
        template: template.to_string(),
        message: message.to_string(),
    };

    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some('{') | None => return Err(invalid("unterminated placeholder")),
                        Some(ch) => name.push(ch),
                    }
                }
                let name = name.trim();
                if name.is_empty() {
                    return Err(invalid("empty placeholder"));
                }
                let value = values.get(name).ok_or_else(|| CoreError::UnknownPlaceholder {
                    placeholder: name.to_string(),
                    template: template.to_string(),
                })?;
                out.push_str(value);
            }
            '}' => return Err(invalid("single '}' encountered")),
            other => out.push(other),
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn greeting_template() -> DeployTemplate {
        serde_yaml::from_str(
            r#"
required: [domain]
setJson:
  startup_greeting: "Hello World from {domain}!"
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_render_fills_required_value() {
        let outputs = StageOutputs::from([("domain".to_string(), json!("example.com"))]);

        let overrides = greeting_template().render(&outputs).unwrap();

        assert_eq!(
            overrides.get("startup_greeting"),
            Some(&json!("Hello World from example.com!"))
        );
        assert_eq!(
            overrides.to_flat_string(),
            r#"startup_greeting="Hello World from example.com!""#
        );
    }

    #[test]
    fn test_missing_required_value_fails_fast() {
        let err = greeting_template().render(&StageOutputs::new()).unwrap_err();
        assert!(matches!(err, CoreError::MissingRequiredValue { ref name } if name == "domain"));
    }

    #[test]
    fn test_null_required_value_counts_as_missing() {
        let outputs = StageOutputs::from([("domain".to_string(), JsonValue::Null)]);
        let err = greeting_template().render(&outputs).unwrap_err();
        assert!(matches!(err, CoreError::MissingRequiredValue { .. }));
    }

    #[test]
    fn test_undeclared_placeholder_rejected() {
        let template = DeployTemplate {
            required: vec![],
            set_json: IndexMap::from([("host".to_string(), "{domain}".to_string())]),
            set: IndexMap::new(),
        };
        let outputs = StageOutputs::from([("domain".to_string(), json!("example.com"))]);

        let err = template.render(&outputs).unwrap_err();
        assert!(matches!(err, CoreError::UnknownPlaceholder { .. }));
    }

    #[test]
    fn test_static_set_applied_last() {
        let mut template = greeting_template();
        template
            .set
            .insert("startup_greeting".to_string(), json!("static wins"));
        template.set.insert("replicas".to_string(), json!(2));
        let outputs = StageOutputs::from([("domain".to_string(), json!("example.com"))]);

        let overrides = template.render(&outputs).unwrap();

        assert_eq!(overrides.len(), 2);
        assert_eq!(overrides.get("startup_greeting"), Some(&json!("static wins")));
        assert_eq!(
            overrides.to_set_json_args(),
            vec![
                r#"startup_greeting="static wins""#.to_string(),
                "replicas=2".to_string()
            ]
        );
    }

    #[test]
    fn test_non_string_outputs_are_displayed() {
        let template = DeployTemplate {
            required: vec!["port".into()],
            set_json: IndexMap::from([("url".to_string(), "http://svc:{port}".to_string())]),
            set: IndexMap::new(),
        };
        let outputs = StageOutputs::from([("port".to_string(), json!(8080))]);

        let overrides = template.render(&outputs).unwrap();
        assert_eq!(overrides.get("url"), Some(&json!("http://svc:8080")));
    }

    #[test]
    fn test_flat_string_escapes_quotes() {
        let mut overrides = DeployOverrides::new();
        overrides.insert("motd", json!(r#"say "hi""#));
        assert_eq!(overrides.to_flat_string(), r#"motd="say \"hi\"""#);
    }

    #[test]
    fn test_format_template_escapes() {
        let values = HashMap::from([("name", "x".to_string())]);
        assert_eq!(format_template("{{literal}} {name}", &values).unwrap(), "{literal} x");
    }

    #[test]
    fn test_format_template_unterminated() {
        let values = HashMap::new();
        assert!(matches!(
            format_template("{oops", &values),
            Err(CoreError::InvalidTemplate { .. })
        ));
        assert!(matches!(
            format_template("oops}", &values),
            Err(CoreError::InvalidTemplate { .. })
        ));
    }
}
