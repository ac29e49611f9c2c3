//! Values documents with non-destructive deep merge

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value as YamlValue};
use std::path::Path;

use crate::error::{CoreError, Result};

/// Values document backed by an insertion-ordered YAML tree
///
/// The tree is a tagged variant: scalars, sequences (opaque on merge) and
/// mappings. Key order is kept so rewritten files diff cleanly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Values(pub YamlValue);

impl Default for Values {
    fn default() -> Self {
        Self::new()
    }
}

impl Values {
    /// Create empty values
    pub fn new() -> Self {
        Self(YamlValue::Mapping(Mapping::new()))
    }

    /// Load values from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse values from a YAML string
    ///
    /// An empty document parses to an empty mapping.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let value: YamlValue = serde_yaml::from_str(yaml)?;
        Ok(Self::from_value(value))
    }

    /// Wrap a raw YAML value, normalizing `null` to an empty mapping
    pub fn from_value(value: YamlValue) -> Self {
        match value {
            YamlValue::Null => Self::new(),
            other => Self(other),
        }
    }

    /// Build values from any serializable type
    pub fn from_serializable<T: Serialize>(value: &T) -> Result<Self> {
        Ok(Self::from_value(serde_yaml::to_value(value)?))
    }

    /// Serialize to a YAML string
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(&self.0)?)
    }

    /// Deep merge an override document into this one
    ///
    /// Rules:
    /// - Mappings: recursive merge, missing keys are created
    /// - Scalars, sequences, null: override replaces base
    /// - Keys absent from the override are left untouched
    ///
    /// A `null` override document is treated as empty.
    pub fn merge(&mut self, overrides: &Values) {
        if overrides.0.is_null() {
            return;
        }
        deep_merge(&mut self.0, &overrides.0);
    }

    /// Return a merged copy without touching either input
    pub fn merged(&self, overrides: &Values) -> Values {
        let mut result = self.clone();
        result.merge(overrides);
        result
    }

    /// Get a value by dotted path (e.g., "image.tag")
    pub fn get(&self, path: &str) -> Option<&YamlValue> {
        let parts: Vec<&str> = path.split('.').collect();
        get_nested(&self.0, &parts)
    }

    /// Get the inner YAML value
    pub fn inner(&self) -> &YamlValue {
        &self.0
    }

    /// Convert to the inner YAML value
    pub fn into_inner(self) -> YamlValue {
        self.0
    }

    /// Check if values are empty
    pub fn is_empty(&self) -> bool {
        match &self.0 {
            YamlValue::Mapping(map) => map.is_empty(),
            YamlValue::Null => true,
            _ => false,
        }
    }

    /// Merge overrides into a YAML file on disk
    ///
    /// A missing or empty file is treated as an empty mapping. Content
    /// not named by the overrides is written back unchanged.
    pub fn update_file<P: AsRef<Path>>(path: P, overrides: &Values) -> Result<Values> {
        let path = path.as_ref();
        let mut current = if path.is_file() {
            Self::from_file(path).map_err(|e| CoreError::InvalidDocument {
                path: path.display().to_string(),
                message: e.to_string(),
            })?
        } else {
            Self::new()
        };

        current.merge(overrides);

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, current.to_yaml()?)?;
        Ok(current)
    }
}

/// Pure deep merge of two documents
pub fn merge(base: &Values, overrides: &Values) -> Values {
    base.merged(overrides)
}

fn deep_merge(base: &mut YamlValue, overlay: &YamlValue) {
    let YamlValue::Mapping(overlay_map) = overlay else {
        *base = overlay.clone();
        return;
    };

    if !base.is_mapping() {
        *base = YamlValue::Mapping(Mapping::new());
    }

    if let YamlValue::Mapping(base_map) = base {
        for (key, overlay_value) in overlay_map {
            match base_map.get_mut(key) {
                Some(base_value) => deep_merge(base_value, overlay_value),
                None => {
                    let mut fresh = YamlValue::Mapping(Mapping::new());
                    deep_merge(&mut fresh, overlay_value);
                    base_map.insert(key.clone(), fresh);
                }
            }
        }
    }
}

fn get_nested<'a>(value: &'a YamlValue, path: &[&str]) -> Option<&'a YamlValue> {
    let Some((key, remaining)) = path.split_first() else {
        return Some(value);
    };

    match value {
        YamlValue::Mapping(map) => map.get(*key).and_then(|v| get_nested(v, remaining)),
        _ => None,
    }
}
