//! Chart.yaml manifest model
//!
//! The staged manifest is rewritten through [`Values::update_file`] so
//! fields this crate does not model (description, keywords, ...) survive.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;
use crate::values::Values;

/// File name of the chart manifest inside a chart tree
pub const MANIFEST_FILE: &str = "Chart.yaml";

/// File name of the values document inside a chart tree
pub const VALUES_FILE: &str = "values.yaml";

/// Directory holding dependency charts inside a chart tree
pub const CHARTS_DIR: &str = "charts";

/// Chart API version written when the template carries none
pub const DEFAULT_API_VERSION: &str = "v2";

/// Chart manifest (Chart.yaml)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartManifest {
    /// API version (v1 or v2)
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Chart name
    pub name: String,

    /// Chart version (SemVer)
    pub version: String,

    /// App version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_version: Option<String>,

    /// Chart dependencies
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<DependencyRecord>,
}

fn default_api_version() -> String {
    DEFAULT_API_VERSION.to_string()
}

impl ChartManifest {
    /// Load a manifest from a Chart.yaml file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Ok(serde_yaml::from_str(&content)?)
    }
}

/// Identity fields of a staged chart, written before dependency resolution
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartIdentity {
    pub name: String,
    pub version: String,
    pub app_version: String,
}

impl ChartIdentity {
    /// Identity where the app version tracks the chart version
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        let version = version.into();
        Self {
            name: name.into(),
            app_version: version.clone(),
            version,
        }
    }

    /// Override document carrying only the identity fields
    pub fn to_overrides(&self) -> Result<Values> {
        Values::from_serializable(self)
    }
}

/// One entry of a manifest's `dependencies` list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyRecord {
    /// Dependency name
    pub name: String,

    /// Version constraint
    pub version: String,

    /// Repository locator (`file://` once staged)
    pub repository: String,
}

impl DependencyRecord {
    /// Check whether the record points at a local chart directory
    pub fn is_local(&self) -> bool {
        self.repository.starts_with("file://")
    }
}

/// Override document replacing the manifest's dependency list wholesale
pub fn dependency_overrides(records: &[DependencyRecord]) -> Result<Values> {
    #[derive(Serialize)]
    struct Dependencies<'a> {
        dependencies: &'a [DependencyRecord],
    }

    Values::from_serializable(&Dependencies {
        dependencies: records,
    })
}

/// Build a `file://` locator for a chart directory
pub fn file_locator(path: &Path) -> String {
    format!("file://{}", path.display())
}
