//! The package manager command surface
//!
//! [`HelmCommand`] knows how each operation is spelled on the command line;
//! [`HelmClient`] runs them through a [`CommandRunner`] and interprets the
//! few outputs that carry data (`status`, `list`).

use std::path::{Path, PathBuf};
use std::time::Duration;

use chartstage_core::{DeployOverrides, RepositoryLocator, config::HelmSettings};
use tracing::info;

use crate::error::Result;
use crate::process::{CommandOutput, CommandRunner, ProcessRunner, RunOptions};
use crate::release::{ReleaseStatus, ReleaseSummary};

/// Install or upgrade request
#[derive(Debug, Clone, PartialEq)]
pub struct ReleaseRequest {
    pub release: String,
    pub chart_path: PathBuf,
    pub namespace: String,
    pub wait: bool,
    pub overrides: DeployOverrides,
}

/// A single package manager invocation
#[derive(Debug, Clone, PartialEq)]
pub enum HelmCommand {
    RepoAdd {
        name: String,
        url: String,
    },
    RepoUpdate,
    Pull {
        reference: String,
        repo_url: Option<String>,
        version: String,
        untar_dir: PathBuf,
    },
    Install(ReleaseRequest),
    Upgrade(ReleaseRequest),
    Uninstall {
        release: String,
        namespace: String,
        wait: bool,
    },
    Status {
        release: String,
        namespace: String,
    },
    List {
        namespace: String,
    },
}

impl HelmCommand {
    /// Pull `chart` from `locator` and unpack it under `untar_dir`
    ///
    /// Returns `None` for local locators, which never go through the
    /// package manager.
    pub fn pull(
        chart: &str,
        version: &str,
        locator: &RepositoryLocator,
        untar_dir: &Path,
    ) -> Option<Self> {
        let (reference, repo_url) = match locator {
            RepositoryLocator::Local { .. } => return None,
            RepositoryLocator::Named { repo } => (format!("{}/{}", repo, chart), None),
            RepositoryLocator::Url { url } if locator.is_oci() => {
                (format!("{}/{}", url, chart), None)
            }
            RepositoryLocator::Url { url } => (chart.to_string(), Some(url.clone())),
        };

        Some(Self::Pull {
            reference,
            repo_url,
            version: version.to_string(),
            untar_dir: untar_dir.to_path_buf(),
        })
    }

    /// Short name for log lines
    pub fn name(&self) -> &'static str {
        match self {
            Self::RepoAdd { .. } => "repo add",
            Self::RepoUpdate => "repo update",
            Self::Pull { .. } => "pull",
            Self::Install(_) => "install",
            Self::Upgrade(_) => "upgrade",
            Self::Uninstall { .. } => "uninstall",
            Self::Status { .. } => "status",
            Self::List { .. } => "list",
        }
    }

    /// Command-line arguments, without the binary
    pub fn args(&self) -> Vec<String> {
        let mut args = Vec::new();

        match self {
            Self::RepoAdd { name, url } => {
                extend(&mut args, &["repo", "add", name.as_str(), url.as_str()])
            }
            Self::RepoUpdate => extend(&mut args, &["repo", "update"]),
            Self::Pull {
                reference,
                repo_url,
                version,
                untar_dir,
            } => {
                extend(&mut args, &["pull", reference.as_str()]);
                if let Some(url) = repo_url {
                    extend(&mut args, &["--repo", url.as_str()]);
                }
                extend(&mut args, &["--version", version.as_str(), "--untar", "--untardir"]);
                args.push(untar_dir.display().to_string());
            }
            Self::Install(request) => release_args(&mut args, "install", request),
            Self::Upgrade(request) => release_args(&mut args, "upgrade", request),
            Self::Uninstall {
                release,
                namespace,
                wait,
            } => {
                extend(
                    &mut args,
                    &["uninstall", release.as_str(), "--namespace", namespace.as_str()],
                );
                if *wait {
                    args.push("--wait".to_string());
                }
            }
            Self::Status { release, namespace } => extend(
                &mut args,
                &["status", release.as_str(), "-o", "json", "--namespace", namespace.as_str()],
            ),
            Self::List { namespace } => {
                extend(&mut args, &["list", "-o", "json", "--namespace", namespace.as_str()])
            }
        }

        args
    }

    /// Whether the output is data to parse rather than progress to show
    fn is_query(&self) -> bool {
        matches!(self, Self::Status { .. } | Self::List { .. })
    }
}

fn extend(args: &mut Vec<String>, parts: &[&str]) {
    args.extend(parts.iter().map(|s| s.to_string()));
}

fn release_args(args: &mut Vec<String>, verb: &str, request: &ReleaseRequest) {
    args.push(verb.to_string());
    args.push(request.release.clone());
    args.push(request.chart_path.display().to_string());
    args.push("--namespace".to_string());
    args.push(request.namespace.clone());
    if request.wait {
        args.push("--wait".to_string());
    }
    for entry in request.overrides.to_set_json_args() {
        args.push("--set-json".to_string());
        args.push(entry);
    }
}

/// Runs package manager commands
#[derive(Debug, Clone)]
pub struct HelmClient<R = ProcessRunner> {
    runner: R,
    binary: String,
    timeout: Option<Duration>,
    prefix: Option<String>,
}

impl HelmClient<ProcessRunner> {
    /// Client for the real binary described by `settings`
    pub fn from_settings(settings: &HelmSettings) -> Self {
        Self::with_runner(ProcessRunner::new(), settings.binary.display().to_string())
            .with_timeout(settings.timeout)
    }
}

impl<R: CommandRunner> HelmClient<R> {
    pub fn with_runner(runner: R, binary: impl Into<String>) -> Self {
        Self {
            runner,
            binary: binary.into(),
            timeout: None,
            prefix: None,
        }
    }

    /// Terminate commands that run longer than `timeout`
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Prefix echoed output lines with `[label]: `
    pub fn with_prefix(mut self, label: impl Into<String>) -> Self {
        self.prefix = Some(label.into());
        self
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    /// Run a command and return its raw result
    pub fn execute(&self, command: &HelmCommand) -> Result<CommandOutput> {
        let mut argv = Vec::with_capacity(8);
        argv.push(self.binary.clone());
        argv.extend(command.args());

        let query = command.is_query();
        let mut options = RunOptions::new()
            .with_suppress_echo(query)
            .with_strip_ansi_red(true)
            .with_timeout(self.timeout);
        // Query output is parsed, so it stays undecorated
        if let Some(label) = self.prefix.as_deref().filter(|_| !query) {
            options = options.with_prefix(label);
        }

        info!("helm {}", command.name());
        self.runner.run(&argv, &options)
    }

    pub fn repo_add(&self, name: &str, url: &str) -> Result<CommandOutput> {
        self.execute(&HelmCommand::RepoAdd {
            name: name.to_string(),
            url: url.to_string(),
        })
    }

    pub fn repo_update(&self) -> Result<CommandOutput> {
        self.execute(&HelmCommand::RepoUpdate)
    }

    pub fn install(&self, request: &ReleaseRequest) -> Result<CommandOutput> {
        self.execute(&HelmCommand::Install(request.clone()))
    }

    pub fn upgrade(&self, request: &ReleaseRequest) -> Result<CommandOutput> {
        self.execute(&HelmCommand::Upgrade(request.clone()))
    }

    pub fn uninstall(&self, release: &str, namespace: &str, wait: bool) -> Result<CommandOutput> {
        self.execute(&HelmCommand::Uninstall {
            release: release.to_string(),
            namespace: namespace.to_string(),
            wait,
        })
    }

    /// Query a release; `None` when it is not deployed
    ///
    /// A failed query counts as absent: the package manager exits non-zero
    /// both for unknown releases and for releases it cannot read.
    pub fn status(&self, release: &str, namespace: &str) -> Result<Option<ReleaseStatus>> {
        let output = self.execute(&HelmCommand::Status {
            release: release.to_string(),
            namespace: namespace.to_string(),
        })?;

        if !output.success() {
            return Ok(None);
        }
        Ok(ReleaseStatus::parse(&output.output))
    }

    /// Releases in `namespace`; empty when the query fails
    pub fn list(&self, namespace: &str) -> Result<Vec<ReleaseSummary>> {
        let output = self.execute(&HelmCommand::List {
            namespace: namespace.to_string(),
        })?;

        if !output.success() {
            return Ok(Vec::new());
        }
        Ok(ReleaseSummary::parse_list(&output.output))
    }
}
