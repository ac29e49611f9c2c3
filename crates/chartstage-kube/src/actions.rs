//! Options for deploy and destroy operations

use std::path::PathBuf;

use chartstage_core::DeployOverrides;

/// Options for deploy (install or upgrade)
#[derive(Debug, Clone, Default)]
pub struct DeployOptions {
    /// Release name
    pub name: String,

    /// Target namespace
    pub namespace: String,

    /// Staged chart directory
    pub chart_path: PathBuf,

    /// Wait until the release converges
    pub wait: bool,

    /// Deploy-time overrides applied over the staged values
    pub overrides: DeployOverrides,
}

impl DeployOptions {
    pub fn new(
        name: impl Into<String>,
        namespace: impl Into<String>,
        chart_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            chart_path: chart_path.into(),
            ..Default::default()
        }
    }

    pub fn with_wait(mut self, wait: bool) -> Self {
        self.wait = wait;
        self
    }

    pub fn with_overrides(mut self, overrides: DeployOverrides) -> Self {
        self.overrides = overrides;
        self
    }
}

/// Options for destroy (uninstall)
#[derive(Debug, Clone, Default)]
pub struct DestroyOptions {
    /// Release name
    pub name: String,

    /// Namespace of the release
    pub namespace: String,

    /// Wait until resources are deleted
    pub wait: bool,
}

impl DestroyOptions {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            wait: false,
        }
    }

    pub fn with_wait(mut self, wait: bool) -> Self {
        self.wait = wait;
        self
    }
}
