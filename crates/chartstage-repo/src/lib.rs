//! chartstage Repo - dependency resolution into a staged `charts/` directory
//!
//! Remote dependencies are pulled through the package manager at most once
//! per staging directory; presence of `charts/<name>/values.yaml` marks a
//! dependency as already staged. Value overrides are re-applied on every
//! call, and every dependency record is rewritten to a `file://` locator
//! pointing into the published output tree.

pub mod dependency;
pub mod error;

pub use dependency::{DependencyResolver, Resolution, ResolveAction, ResolvedDependency};
pub use error::{RepoError, Result};
