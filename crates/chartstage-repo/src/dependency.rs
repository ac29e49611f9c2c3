//! Cache-aware dependency resolution
//!
//! Dependencies are resolved strictly in declaration order. Concurrent
//! resolution into the same `charts/` directory is not supported; callers
//! own one staging directory at a time.

use std::fmt;
use std::path::{Path, PathBuf};

use chartstage_core::manifest::{VALUES_FILE, file_locator};
use chartstage_core::bundle::check_name;
use chartstage_core::{
    BundleDescriptor, DependencyRecord, Repository, RepositoryLocator, Values, copy_tree,
};
use chartstage_exec::{CommandOutput, CommandRunner, HelmClient, HelmCommand};
use tracing::{debug, info};

use crate::error::{RepoError, Result};

/// How a dependency's content got into `charts/`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveAction {
    /// Pulled through the package manager on this call
    Pulled,
    /// Copied from a local chart directory
    Copied,
    /// Already staged by an earlier call
    Reused,
}

impl fmt::Display for ResolveAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pulled => write!(f, "pulled"),
            Self::Copied => write!(f, "copied"),
            Self::Reused => write!(f, "reused"),
        }
    }
}

/// One resolved dependency
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedDependency {
    /// Manifest record, repository rewritten to the published location
    pub record: DependencyRecord,
    pub action: ResolveAction,
    /// Staged chart directory
    pub location: PathBuf,
    /// Values document after overrides were applied
    pub values: Values,
}

/// Outcome of resolving a dependency list, in declaration order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    pub dependencies: Vec<ResolvedDependency>,
}

impl Resolution {
    /// Rewritten manifest records
    pub fn records(&self) -> Vec<DependencyRecord> {
        self.dependencies.iter().map(|d| d.record.clone()).collect()
    }

    /// Number of dependencies pulled on this call
    pub fn pulled(&self) -> usize {
        self.dependencies
            .iter()
            .filter(|d| d.action == ResolveAction::Pulled)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty()
    }
}

/// Resolves dependency bundles into a staging `charts/` directory
pub struct DependencyResolver<'a, R: CommandRunner> {
    helm: &'a HelmClient<R>,
    repositories: &'a [Repository],
    repositories_ready: bool,
}

impl<'a, R: CommandRunner> DependencyResolver<'a, R> {
    /// `repositories` are registered before the first remote pull
    pub fn new(helm: &'a HelmClient<R>, repositories: &'a [Repository]) -> Self {
        Self {
            helm,
            repositories,
            repositories_ready: false,
        }
    }

    /// Ensure every dependency is staged under `charts_dir`
    ///
    /// Records point at `published_charts_dir/<name>`, the location the
    /// dependency will have once the staged tree is published.
    pub fn resolve(
        &mut self,
        dependencies: &[BundleDescriptor],
        charts_dir: &Path,
        published_charts_dir: &Path,
    ) -> Result<Resolution> {
        std::fs::create_dir_all(charts_dir)?;

        let mut resolution = Resolution::default();
        for dependency in dependencies {
            let resolved = self.resolve_one(dependency, charts_dir, published_charts_dir)?;
            info!(
                "Dependency {} {} {}",
                dependency.name, dependency.version, resolved.action
            );
            resolution.dependencies.push(resolved);
        }

        Ok(resolution)
    }

    fn resolve_one(
        &mut self,
        dependency: &BundleDescriptor,
        charts_dir: &Path,
        published_charts_dir: &Path,
    ) -> Result<ResolvedDependency> {
        // The name becomes a directory that may be removed before a pull
        check_name(&dependency.name)?;
        let location = charts_dir.join(&dependency.name);
        let marker = location.join(VALUES_FILE);

        let action = match &dependency.locator {
            RepositoryLocator::Local { path } => {
                if !path.is_dir() {
                    return Err(RepoError::LocalChartNotFound {
                        name: dependency.name.clone(),
                        path: path.clone(),
                    });
                }
                copy_tree(path, &location)?;
                ResolveAction::Copied
            }
            _ if marker.is_file() => {
                debug!("{} is already staged, skipping pull", marker.display());
                ResolveAction::Reused
            }
            locator => {
                self.pull(dependency, locator, charts_dir, &location)?;
                if !marker.is_file() {
                    return Err(RepoError::PullIncomplete {
                        name: dependency.name.clone(),
                        marker,
                    });
                }
                ResolveAction::Pulled
            }
        };

        // Applied on every call; only the pull is cached
        let values = Values::update_file(&marker, &dependency.overrides)?;

        Ok(ResolvedDependency {
            record: DependencyRecord {
                name: dependency.name.clone(),
                version: dependency.version.clone(),
                repository: file_locator(&published_charts_dir.join(&dependency.name)),
            },
            action,
            location,
            values,
        })
    }

    fn pull(
        &mut self,
        dependency: &BundleDescriptor,
        locator: &RepositoryLocator,
        charts_dir: &Path,
        location: &Path,
    ) -> Result<()> {
        self.prepare_repositories()?;

        // A directory without the marker is a partial earlier pull, and
        // untarring over it fails
        if location.exists() {
            debug!("removing incomplete {}", location.display());
            std::fs::remove_dir_all(location)?;
        }

        let Some(command) =
            HelmCommand::pull(&dependency.name, &dependency.version, locator, charts_dir)
        else {
            return Ok(());
        };

        info!("Pulling {} {} from {}", dependency.name, dependency.version, locator);
        let output = self.helm.execute(&command)?;
        if !output.success() {
            return Err(RepoError::PullFailed {
                name: dependency.name.clone(),
                exit_code: output.exit_code,
                output: output.output,
            });
        }

        Ok(())
    }

    /// Register configured repositories and refresh indexes, once
    fn prepare_repositories(&mut self) -> Result<()> {
        if self.repositories_ready {
            return Ok(());
        }
        self.repositories_ready = true;

        if self.repositories.is_empty() {
            return Ok(());
        }

        for repo in self.repositories {
            let output = self.helm.repo_add(&repo.name, &repo.url)?;
            check_setup("repo add", output)?;
        }
        let output = self.helm.repo_update()?;
        check_setup("repo update", output)
    }
}

fn check_setup(command: &str, output: CommandOutput) -> Result<()> {
    if output.success() {
        return Ok(());
    }
    Err(RepoError::RepositorySetupFailed {
        command: command.to_string(),
        exit_code: output.exit_code,
        output: output.output,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chartstage_exec::{CommandOutput, MockRunner};
    use std::fs;
    use tempfile::TempDir;

    /// Runner that materializes `<untardir>/<chart>/values.yaml` on pull
    fn pulling_runner() -> MockRunner {
        MockRunner::with_handler(|argv| {
            if argv.get(1).map(String::as_str) == Some("pull") {
                let reference = &argv[2];
                let chart = reference.rsplit('/').next().unwrap_or(reference);
                let untar_dir = argv
                    .iter()
                    .position(|a| a == "--untardir")
                    .map(|i| PathBuf::from(&argv[i + 1]))
                    .unwrap();
                let chart_dir = untar_dir.join(chart);
                fs::create_dir_all(chart_dir.join("templates")).unwrap();
                fs::write(chart_dir.join("values.yaml"), "replicas: 1\nci: false\n").unwrap();
                fs::write(
                    chart_dir.join("Chart.yaml"),
                    format!("name: {}\nversion: 1.1.4\n", chart),
                )
                .unwrap();
            }
            Ok(CommandOutput::new(0, ""))
        })
    }

    fn named(name: &str, repo: &str) -> BundleDescriptor {
        BundleDescriptor::new(name, "1.1.4", RepositoryLocator::Named { repo: repo.into() })
    }

    fn heartex() -> Vec<Repository> {
        vec![Repository {
            name: "heartex".into(),
            url: "https://charts.heartex.com/".into(),
        }]
    }

    #[test]
    fn test_pull_once_then_reuse() {
        let stage = TempDir::new().unwrap();
        let charts = stage.path().join("charts");
        let runner = pulling_runner();
        let helm = HelmClient::with_runner(runner.clone(), "helm");
        let repos = heartex();
        let deps = vec![named("label-studio", "heartex")
            .with_overrides(Values::from_yaml("ci: true").unwrap())];

        let first = DependencyResolver::new(&helm, &repos)
            .resolve(&deps, &charts, Path::new("/out/stage/charts"))
            .unwrap();
        let second = DependencyResolver::new(&helm, &repos)
            .resolve(&deps, &charts, Path::new("/out/stage/charts"))
            .unwrap();

        assert_eq!(first.dependencies[0].action, ResolveAction::Pulled);
        assert_eq!(second.dependencies[0].action, ResolveAction::Reused);
        assert_eq!(first.pulled(), 1);
        assert_eq!(second.pulled(), 0);
        assert_eq!(runner.count(&["pull"]), 1);
        assert_eq!(
            second.dependencies[0].values.get("ci").and_then(|v| v.as_bool()),
            Some(true)
        );
    }

    #[test]
    fn test_override_change_applied_without_pull() {
        let stage = TempDir::new().unwrap();
        let charts = stage.path().join("charts");
        let runner = pulling_runner();
        let helm = HelmClient::with_runner(runner.clone(), "helm");

        let deps = vec![
            named("redis", "bitnami").with_overrides(Values::from_yaml("replicas: 2").unwrap()),
        ];
        DependencyResolver::new(&helm, &[])
            .resolve(&deps, &charts, Path::new("/out/charts"))
            .unwrap();

        let deps = vec![
            named("redis", "bitnami").with_overrides(Values::from_yaml("replicas: 5").unwrap()),
        ];
        DependencyResolver::new(&helm, &[])
            .resolve(&deps, &charts, Path::new("/out/charts"))
            .unwrap();

        let staged = Values::from_file(charts.join("redis/values.yaml")).unwrap();
        assert_eq!(staged.get("replicas").and_then(|v| v.as_i64()), Some(5));
        assert_eq!(staged.get("ci").and_then(|v| v.as_bool()), Some(false));
        assert_eq!(runner.count(&["pull"]), 1);
    }

    #[test]
    fn test_records_point_at_published_location() {
        let stage = TempDir::new().unwrap();
        let helm = HelmClient::with_runner(pulling_runner(), "helm");
        let deps = vec![named("label-studio", "heartex"), named("redis", "bitnami")];

        let resolution = DependencyResolver::new(&helm, &[])
            .resolve(&deps, &stage.path().join("charts"), Path::new("/srv/out/app/charts"))
            .unwrap();

        let records = resolution.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "label-studio");
        assert_eq!(records[0].repository, "file:///srv/out/app/charts/label-studio");
        assert_eq!(records[1].repository, "file:///srv/out/app/charts/redis");
        assert!(records.iter().all(DependencyRecord::is_local));
    }

    #[test]
    fn test_repositories_prepared_once_on_first_miss() {
        let stage = TempDir::new().unwrap();
        let charts = stage.path().join("charts");
        let runner = pulling_runner();
        let helm = HelmClient::with_runner(runner.clone(), "helm");
        let repos = heartex();
        let deps = vec![named("label-studio", "heartex"), named("postgresql", "heartex")];

        DependencyResolver::new(&helm, &repos)
            .resolve(&deps, &charts, Path::new("/out/charts"))
            .unwrap();

        assert_eq!(runner.count(&["repo", "add", "heartex"]), 1);
        assert_eq!(runner.count(&["repo", "update"]), 1);
        assert_eq!(runner.count(&["pull"]), 2);

        // Everything cached: no repository traffic at all
        runner.reset();
        DependencyResolver::new(&helm, &repos)
            .resolve(&deps, &charts, Path::new("/out/charts"))
            .unwrap();
        assert!(runner.invocations().is_empty());
    }

    #[test]
    fn test_no_repositories_no_update() {
        let stage = TempDir::new().unwrap();
        let runner = pulling_runner();
        let helm = HelmClient::with_runner(runner.clone(), "helm");

        DependencyResolver::new(&helm, &[])
            .resolve(
                &[named("redis", "bitnami")],
                &stage.path().join("charts"),
                Path::new("/out/charts"),
            )
            .unwrap();

        assert_eq!(runner.count(&["repo"]), 0);
        assert_eq!(runner.count(&["pull", "bitnami/redis"]), 1);
    }

    #[test]
    fn test_pull_failure_carries_output() {
        let stage = TempDir::new().unwrap();
        let runner = MockRunner::with_handler(|_| {
            Ok(CommandOutput::new(1, "Error: chart \"nope\" version \"1.1.4\" not found\n"))
        });
        let helm = HelmClient::with_runner(runner, "helm");

        let err = DependencyResolver::new(&helm, &[])
            .resolve(
                &[named("nope", "heartex")],
                &stage.path().join("charts"),
                Path::new("/out/charts"),
            )
            .unwrap_err();

        match err {
            RepoError::PullFailed { name, exit_code, output } => {
                assert_eq!(name, "nope");
                assert_eq!(exit_code, 1);
                assert!(output.contains("not found"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_pull_without_marker_is_incomplete() {
        let stage = TempDir::new().unwrap();
        let helm = HelmClient::with_runner(MockRunner::new(), "helm");

        let err = DependencyResolver::new(&helm, &[])
            .resolve(
                &[named("ghost", "heartex")],
                &stage.path().join("charts"),
                Path::new("/out/charts"),
            )
            .unwrap_err();

        assert!(matches!(err, RepoError::PullIncomplete { ref name, .. } if name == "ghost"));
    }

    #[test]
    fn test_repo_setup_failure() {
        let stage = TempDir::new().unwrap();
        let runner = MockRunner::with_handler(|argv| {
            if argv.get(1).map(String::as_str) == Some("repo") {
                Ok(CommandOutput::new(
                    1,
                    "Error: looks like the URL is not a valid chart repository\n",
                ))
            } else {
                Ok(CommandOutput::new(0, ""))
            }
        });
        let helm = HelmClient::with_runner(runner.clone(), "helm");
        let repos = heartex();

        let err = DependencyResolver::new(&helm, &repos)
            .resolve(
                &[named("label-studio", "heartex")],
                &stage.path().join("charts"),
                Path::new("/out/charts"),
            )
            .unwrap_err();

        assert!(matches!(
            err,
            RepoError::RepositorySetupFailed { ref command, .. } if command == "repo add"
        ));
        assert_eq!(runner.count(&["pull"]), 0);
    }

    #[test]
    fn test_partial_directory_removed_before_pull() {
        let stage = TempDir::new().unwrap();
        let charts = stage.path().join("charts");
        fs::create_dir_all(charts.join("redis/templates")).unwrap();
        fs::write(charts.join("redis/leftover.txt"), "partial").unwrap();
        let helm = HelmClient::with_runner(pulling_runner(), "helm");

        DependencyResolver::new(&helm, &[])
            .resolve(&[named("redis", "bitnami")], &charts, Path::new("/out/charts"))
            .unwrap();

        assert!(!charts.join("redis/leftover.txt").exists());
        assert!(charts.join("redis/values.yaml").is_file());
    }

    #[test]
    fn test_local_dependency_is_copied() {
        let source = TempDir::new().unwrap();
        fs::write(source.path().join("Chart.yaml"), "name: common\nversion: 0.1.0\n").unwrap();
        fs::write(source.path().join("values.yaml"), "labels:\n  team: data\n").unwrap();
        let stage = TempDir::new().unwrap();
        let charts = stage.path().join("charts");
        let runner = MockRunner::new();
        let helm = HelmClient::with_runner(runner.clone(), "helm");

        let dep = BundleDescriptor::new(
            "common",
            "0.1.0",
            RepositoryLocator::Local {
                path: source.path().to_path_buf(),
            },
        )
        .with_overrides(Values::from_yaml("labels:\n  tier: backend\n").unwrap());

        let resolution = DependencyResolver::new(&helm, &heartex())
            .resolve(&[dep], &charts, Path::new("/out/charts"))
            .unwrap();

        assert_eq!(resolution.dependencies[0].action, ResolveAction::Copied);
        assert!(runner.invocations().is_empty());
        let staged = Values::from_file(charts.join("common/values.yaml")).unwrap();
        assert_eq!(staged.get("labels.team").and_then(|v| v.as_str()), Some("data"));
        assert_eq!(staged.get("labels.tier").and_then(|v| v.as_str()), Some("backend"));
        // The source tree is never modified
        assert_eq!(
            fs::read_to_string(source.path().join("values.yaml")).unwrap(),
            "labels:\n  team: data\n"
        );
    }

    #[test]
    fn test_missing_local_dependency() {
        let stage = TempDir::new().unwrap();
        let helm = HelmClient::with_runner(MockRunner::new(), "helm");
        let dep = BundleDescriptor::new(
            "common",
            "0.1.0",
            RepositoryLocator::Local {
                path: stage.path().join("does-not-exist"),
            },
        );

        let err = DependencyResolver::new(&helm, &[])
            .resolve(&[dep], &stage.path().join("charts"), Path::new("/out/charts"))
            .unwrap_err();

        assert!(matches!(err, RepoError::LocalChartNotFound { .. }));
    }

    #[test]
    fn test_name_escaping_charts_dir_is_rejected() {
        let stage = TempDir::new().unwrap();
        let charts = stage.path().join("charts");
        let templates = stage.path().join("templates");
        fs::create_dir_all(&templates).unwrap();
        fs::write(templates.join("deployment.yaml"), "kind: Deployment\n").unwrap();
        let runner = pulling_runner();
        let helm = HelmClient::with_runner(runner.clone(), "helm");

        let err = DependencyResolver::new(&helm, &[])
            .resolve(&[named("../templates", "bitnami")], &charts, Path::new("/out/charts"))
            .unwrap_err();

        assert!(matches!(
            err,
            RepoError::Core(chartstage_core::CoreError::InvalidName { .. })
        ));
        assert!(templates.join("deployment.yaml").is_file());
        assert_eq!(runner.count(&["pull"]), 0);
    }
}
