//! Release reconciliation
//!
//! The cluster is the source of truth: release state is queried right
//! before every decision and never kept between calls.

use std::fmt;

use chartstage_core::manifest::MANIFEST_FILE;
use chartstage_exec::{
    CommandOutput, CommandRunner, HelmClient, ProcessRunner, ReleaseRequest, ReleaseStatus,
    ReleaseSummary,
};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::actions::{DeployOptions, DestroyOptions};
use crate::error::{KubeError, Result};

/// Observed state of a release
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum ReleaseState {
    Absent,
    Deployed(ReleaseStatus),
}

impl ReleaseState {
    pub fn is_deployed(&self) -> bool {
        matches!(self, Self::Deployed(_))
    }
}

/// What a reconcile call did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReleaseAction {
    Install,
    Upgrade,
    Uninstall,
    /// Uninstall of a release that did not exist
    AlreadyAbsent,
}

impl fmt::Display for ReleaseAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Install => write!(f, "install"),
            Self::Upgrade => write!(f, "upgrade"),
            Self::Uninstall => write!(f, "uninstall"),
            Self::AlreadyAbsent => write!(f, "uninstall (already absent)"),
        }
    }
}

/// Discrete result of deploy or destroy
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReleaseOutcome {
    pub action: ReleaseAction,
    pub name: String,
    pub namespace: String,
    pub exit_code: i32,
    pub timed_out: bool,
    /// Captured package manager output
    pub output: String,
}

impl ReleaseOutcome {
    fn from_output(
        action: ReleaseAction,
        name: &str,
        namespace: &str,
        output: CommandOutput,
    ) -> Self {
        Self {
            action,
            name: name.to_string(),
            namespace: namespace.to_string(),
            exit_code: output.exit_code,
            timed_out: output.timed_out,
            output: output.output,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.action == ReleaseAction::AlreadyAbsent || (self.exit_code == 0 && !self.timed_out)
    }

    /// Turn a failed outcome into an error
    pub fn into_result(self) -> Result<Self> {
        if self.succeeded() {
            return Ok(self);
        }
        Err(KubeError::OperationFailed {
            action: self.action.to_string(),
            name: self.name,
            namespace: self.namespace,
            exit_code: self.exit_code,
            output: self.output,
        })
    }
}

/// Drives install, upgrade and uninstall for staged bundles
#[derive(Debug, Clone)]
pub struct ReleaseReconciler<R = ProcessRunner> {
    helm: HelmClient<R>,
}

impl<R: CommandRunner> ReleaseReconciler<R> {
    pub fn new(helm: HelmClient<R>) -> Self {
        Self { helm }
    }

    pub fn helm(&self) -> &HelmClient<R> {
        &self.helm
    }

    /// Query the live state of a release
    pub fn status(&self, name: &str, namespace: &str) -> Result<ReleaseState> {
        let state = match self.helm.status(name, namespace)? {
            Some(status) => ReleaseState::Deployed(status),
            None => ReleaseState::Absent,
        };
        debug!("release {}/{} is {:?}", namespace, name, state);
        Ok(state)
    }

    /// Releases in a namespace
    pub fn list(&self, namespace: &str) -> Result<Vec<ReleaseSummary>> {
        Ok(self.helm.list(namespace)?)
    }

    /// Install the staged chart, or upgrade it if the release exists
    pub fn deploy(&self, options: &DeployOptions) -> Result<ReleaseOutcome> {
        if !options.chart_path.join(MANIFEST_FILE).is_file() {
            return Err(KubeError::ChartNotStaged {
                path: options.chart_path.clone(),
            });
        }

        let request = ReleaseRequest {
            release: options.name.clone(),
            chart_path: options.chart_path.clone(),
            namespace: options.namespace.clone(),
            wait: options.wait,
            overrides: options.overrides.clone(),
        };
        if !options.overrides.is_empty() {
            info!("Deploy-time overrides: {}", options.overrides.to_flat_string());
        }

        let (action, output) = match self.status(&options.name, &options.namespace)? {
            ReleaseState::Deployed(_) => {
                info!("Upgrading release {} in {}", options.name, options.namespace);
                (ReleaseAction::Upgrade, self.helm.upgrade(&request)?)
            }
            ReleaseState::Absent => {
                info!("Installing release {} in {}", options.name, options.namespace);
                (ReleaseAction::Install, self.helm.install(&request)?)
            }
        };

        let outcome =
            ReleaseOutcome::from_output(action, &options.name, &options.namespace, output);
        if !outcome.succeeded() {
            warn!(
                "{} of {} failed with exit code {}",
                outcome.action, outcome.name, outcome.exit_code
            );
        }
        Ok(outcome)
    }

    /// Uninstall a release; an absent release is a successful no-op
    pub fn destroy(&self, options: &DestroyOptions) -> Result<ReleaseOutcome> {
        info!("Uninstalling release {} in {}", options.name, options.namespace);
        let output = self
            .helm
            .uninstall(&options.name, &options.namespace, options.wait)?;

        let action = if !output.success() && is_not_found(&output.output) {
            info!("release {} was not installed", options.name);
            ReleaseAction::AlreadyAbsent
        } else {
            ReleaseAction::Uninstall
        };

        let outcome =
            ReleaseOutcome::from_output(action, &options.name, &options.namespace, output);
        if !outcome.succeeded() {
            warn!(
                "uninstall of {} failed with exit code {}",
                outcome.name, outcome.exit_code
            );
        }
        Ok(outcome)
    }
}

fn is_not_found(output: &str) -> bool {
    output.to_ascii_lowercase().contains("not found")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_detection() {
        assert!(is_not_found("Error: uninstall: Release not loaded: web: release: not found\n"));
        assert!(is_not_found("Error: release: Not Found"));
        assert!(!is_not_found("Error: Kubernetes cluster unreachable\n"));
    }

    #[test]
    fn test_outcome_into_result() {
        let ok = ReleaseOutcome::from_output(
            ReleaseAction::Install,
            "web",
            "dev",
            CommandOutput::new(0, "STATUS: deployed\n"),
        );
        assert!(ok.into_result().is_ok());

        let failed = ReleaseOutcome::from_output(
            ReleaseAction::Upgrade,
            "web",
            "dev",
            CommandOutput::new(1, "Error: UPGRADE FAILED\n"),
        );
        let err = failed.into_result().unwrap_err();
        assert!(err.to_string().contains("upgrade of release 'web'"));
        assert!(err.to_string().contains("UPGRADE FAILED"));
    }

    #[test]
    fn test_timed_out_outcome_fails() {
        let mut output = CommandOutput::new(143, "");
        output.timed_out = true;
        let outcome = ReleaseOutcome::from_output(ReleaseAction::Install, "web", "dev", output);
        assert!(!outcome.succeeded());
    }
}
