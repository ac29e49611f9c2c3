//! Stage configuration file (`chartstage.yaml`)
//!
//! Relative paths inside the file resolve against the file's directory.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::bundle::{BundleDescriptor, RepositoryLocator, check_name};
use crate::error::{CoreError, Result};
use crate::overrides::DeployTemplate;
use crate::values::Values;

/// Default configuration file name
pub const CONFIG_FILE: &str = "chartstage.yaml";

/// Top-level stage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageConfig {
    /// Project identifier, part of the staging key
    pub project: String,

    /// Target namespace, part of the staging key
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Root under which rendered bundles are published
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Root of the reusable staging area (default: `<tmp>/chartstage`)
    #[serde(default)]
    pub staging_dir: Option<PathBuf>,

    /// Package manager settings
    #[serde(default)]
    pub helm: HelmSettings,

    /// Repositories registered before any remote pull
    #[serde(default)]
    pub repositories: Vec<Repository>,

    /// The bundle staged by this configuration
    pub bundle: BundleConfig,

    /// Deploy-time overrides
    #[serde(default)]
    pub deploy: DeployTemplate,
}

fn default_namespace() -> String {
    "default".to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

/// Package manager invocation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HelmSettings {
    /// Binary name or path
    #[serde(default = "default_binary")]
    pub binary: PathBuf,

    /// Per-command timeout; unset means unbounded
    #[serde(default, with = "humantime_serde")]
    pub timeout: Option<Duration>,

    /// Pass `--wait` to install, upgrade and uninstall
    #[serde(default)]
    pub wait: bool,
}

fn default_binary() -> PathBuf {
    PathBuf::from("helm")
}

impl Default for HelmSettings {
    fn default() -> Self {
        Self {
            binary: default_binary(),
            timeout: None,
            wait: false,
        }
    }
}

/// Named chart repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub name: String,
    pub url: String,
}

/// The bundle this stage renders and deploys
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleConfig {
    /// Bundle (and release) name
    pub name: String,

    /// Bundle version (SemVer)
    pub version: String,

    /// Template chart directory copied into staging
    pub template: PathBuf,

    /// Path of the published bundle relative to `outputDir` (default: the name)
    #[serde(default)]
    pub output_prefix: Option<PathBuf>,

    /// Overrides merged into the staged values.yaml
    #[serde(default)]
    pub overrides: Values,

    /// Dependency bundles, pulled into `charts/`
    #[serde(default)]
    pub dependencies: Vec<BundleDescriptor>,
}

impl StageConfig {
    /// Load and validate a configuration file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = serde_yaml::from_str(&content)?;

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        config.resolve_paths(base);
        config.validate()?;
        Ok(config)
    }

    /// Make every relative path absolute against `base`
    pub fn resolve_paths(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };

        resolve(&mut self.output_dir);
        if let Some(staging) = self.staging_dir.as_mut() {
            resolve(staging);
        }
        resolve(&mut self.bundle.template);
        for dep in &mut self.bundle.dependencies {
            if let RepositoryLocator::Local { path } = &mut dep.locator {
                resolve(path);
            }
        }
        if self.helm.binary.components().count() > 1 {
            resolve(&mut self.helm.binary);
        }
    }

    /// Check invariants serde cannot express
    pub fn validate(&self) -> Result<()> {
        if self.project.trim().is_empty() {
            return Err(invalid("`project` must not be empty"));
        }
        if self.namespace.trim().is_empty() {
            return Err(invalid("`namespace` must not be empty"));
        }
        check_name(&self.bundle.name)?;
        semver::Version::parse(&self.bundle.version)?;

        let mut seen = std::collections::HashSet::new();
        for dep in &self.bundle.dependencies {
            check_name(&dep.name)?;
            if !seen.insert(dep.name.as_str()) {
                return Err(invalid(&format!("dependency '{}' is declared twice", dep.name)));
            }
        }

        for repo in &self.repositories {
            if repo.name.trim().is_empty() || repo.url.trim().is_empty() {
                return Err(invalid("repositories need both `name` and `url`"));
            }
        }

        Ok(())
    }

    /// Staging root, defaulting to a directory under the system temp dir
    pub fn staging_root(&self) -> PathBuf {
        self.staging_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("chartstage"))
    }
}

fn invalid(message: &str) -> CoreError {
    CoreError::InvalidConfig {
        message: message.to_string(),
    }
}
