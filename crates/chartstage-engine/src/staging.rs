//! Staging directory layout
//!
//! A bundle is staged under `<staging_root>/<project>-<namespace>/<name>`.
//! The directory is reused across renders so pulled dependencies survive;
//! it is never cleaned up here.

use std::path::{Path, PathBuf};

use chartstage_core::StageConfig;
use chartstage_core::bundle::path_component_problem;
use chartstage_core::manifest::{CHARTS_DIR, MANIFEST_FILE, VALUES_FILE};

use crate::error::{EngineError, Result};

/// Where staging happens and where rendered bundles are published
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageContext {
    pub project: String,
    pub namespace: String,
    pub staging_root: PathBuf,
    pub output_dir: PathBuf,
}

impl StageContext {
    pub fn from_config(config: &StageConfig) -> Self {
        Self {
            project: config.project.clone(),
            namespace: config.namespace.clone(),
            staging_root: config.staging_root(),
            output_dir: config.output_dir.clone(),
        }
    }

    /// Lay out the directories of one bundle
    ///
    /// The published directory is `output_dir/<prefix>`, defaulting to the
    /// bundle name.
    pub fn layout(&self, bundle_name: &str, output_prefix: Option<&Path>) -> Result<StageLayout> {
        check_component(&self.project)?;
        check_component(&self.namespace)?;
        check_component(bundle_name)?;

        let staging_dir = self
            .staging_root
            .join(format!("{}-{}", self.project, self.namespace))
            .join(bundle_name);
        let published = self
            .output_dir
            .join(output_prefix.unwrap_or_else(|| Path::new(bundle_name)));

        Ok(StageLayout {
            staging_dir,
            published_dir: std::path::absolute(published)?,
        })
    }
}

/// Directories of one staged bundle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageLayout {
    /// Reusable working tree
    pub staging_dir: PathBuf,
    /// Absolute final location of the rendered tree
    pub published_dir: PathBuf,
}

impl StageLayout {
    pub fn values_file(&self) -> PathBuf {
        self.staging_dir.join(VALUES_FILE)
    }

    pub fn manifest_file(&self) -> PathBuf {
        self.staging_dir.join(MANIFEST_FILE)
    }

    pub fn charts_dir(&self) -> PathBuf {
        self.staging_dir.join(CHARTS_DIR)
    }

    pub fn published_charts_dir(&self) -> PathBuf {
        self.published_dir.join(CHARTS_DIR)
    }
}

fn check_component(value: &str) -> Result<()> {
    match path_component_problem(value) {
        Some(reason) => Err(EngineError::InvalidStageKey {
            value: value.to_string(),
            reason: reason.to_string(),
        }),
        None => Ok(()),
    }
}
