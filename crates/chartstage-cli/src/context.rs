//! Shared helpers for commands: configuration, clients and stage outputs

use std::path::Path;

use chartstage_core::{HelmSettings, StageConfig, StageOutputs};
use chartstage_exec::HelmClient;
use serde_json::Value as JsonValue;

use crate::error::{CliError, Result};

/// Load and validate the stage configuration
pub fn load_config(path: &Path) -> Result<StageConfig> {
    if !path.is_file() {
        return Err(CliError::config_with_help(
            format!("{} not found", path.display()),
            "Run from the directory holding chartstage.yaml or pass --config <FILE>",
        ));
    }
    StageConfig::load_from(path).map_err(CliError::config)
}

/// Package manager settings, from the configuration when there is one
pub fn load_helm_settings(path: &Path) -> Result<HelmSettings> {
    if path.is_file() {
        Ok(load_config(path)?.helm)
    } else {
        Ok(HelmSettings::default())
    }
}

/// Client for the configured binary with prefixed output
pub fn helm_client(settings: &HelmSettings) -> HelmClient {
    HelmClient::from_settings(settings).with_prefix("helm")
}

/// Stage outputs from an optional JSON/YAML file plus `--value` pairs
///
/// Command-line pairs win over the file.
pub fn stage_outputs(file: Option<&Path>, pairs: &[String]) -> Result<StageOutputs> {
    let mut outputs = match file {
        Some(path) => {
            let content = std::fs::read_to_string(path)?;
            if content.trim().is_empty() {
                StageOutputs::new()
            } else {
                serde_yaml::from_str(&content).map_err(|e| {
                    CliError::input_with_help(
                        format!("{} is not a mapping of stage outputs: {}", path.display(), e),
                        "Use a JSON or YAML object, e.g. {\"domain\": \"example.com\"}",
                    )
                })?
            }
        }
        None => StageOutputs::new(),
    };

    for pair in pairs {
        let (key, value) = parse_key_value(pair)?;
        outputs.insert(key.to_string(), JsonValue::String(value.to_string()));
    }

    Ok(outputs)
}

/// Split `key=value`; the value may itself contain `=`
pub fn parse_key_value(pair: &str) -> Result<(&str, &str)> {
    match pair.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => Ok((key.trim(), value)),
        _ => Err(CliError::usage(format!(
            "invalid value '{}', expected NAME=VALUE",
            pair
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_parse_key_value() {
        assert_eq!(parse_key_value("domain=example.com").unwrap(), ("domain", "example.com"));
        assert_eq!(parse_key_value("token=a=b").unwrap(), ("token", "a=b"));
        assert_eq!(parse_key_value("empty=").unwrap(), ("empty", ""));
        assert!(parse_key_value("novalue").is_err());
        assert!(parse_key_value("=value").is_err());
    }

    #[test]
    fn test_stage_outputs_merge_file_and_pairs() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("outputs.json");
        std::fs::write(&file, r#"{"domain": "from-file.com", "port": 8080}"#).unwrap();

        let outputs =
            stage_outputs(Some(&file), &["domain=example.com".to_string()]).unwrap();

        assert_eq!(outputs.get("domain"), Some(&json!("example.com")));
        assert_eq!(outputs.get("port"), Some(&json!(8080)));
    }

    #[test]
    fn test_stage_outputs_rejects_non_mapping() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("outputs.yaml");
        std::fs::write(&file, "- a\n- b\n").unwrap();

        let err = stage_outputs(Some(&file), &[]).unwrap_err();
        assert!(matches!(err, CliError::Input { .. }));
    }

    #[test]
    fn test_missing_config_has_help() {
        let dir = TempDir::new().unwrap();
        let err = load_config(&dir.path().join("chartstage.yaml")).unwrap_err();
        assert!(matches!(err, CliError::Config { help: Some(_), .. }));
    }

    #[test]
    fn test_helm_settings_default_without_config() {
        let dir = TempDir::new().unwrap();
        let settings = load_helm_settings(&dir.path().join("chartstage.yaml")).unwrap();
        assert_eq!(settings.binary, std::path::PathBuf::from("helm"));
    }
}
