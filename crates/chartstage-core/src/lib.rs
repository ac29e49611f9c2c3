//! chartstage Core - shared types for staging and reconciling chart bundles
//!
//! This crate provides the foundational types used throughout chartstage:
//! - `Values`: Values documents with non-destructive deep merge
//! - `ChartManifest`/`DependencyRecord`: The chart manifest model
//! - `BundleDescriptor`/`RepositoryLocator`: What to stage and where it comes from
//! - `VirtualFileManifest`: Rendered output as path -> content
//! - `DeployTemplate`: Deploy-time override formatting
//! - `StageConfig`: The `chartstage.yaml` configuration file

pub mod bundle;
pub mod config;
pub mod error;
pub mod files;
pub mod manifest;
pub mod overrides;
pub mod values;

pub use bundle::{BundleDescriptor, RepositoryLocator};
pub use config::{BundleConfig, HelmSettings, Repository, StageConfig};
pub use error::{CoreError, Result};
pub use files::{VirtualFileManifest, copy_tree};
pub use manifest::{ChartIdentity, ChartManifest, DependencyRecord};
pub use overrides::{DeployOverrides, DeployTemplate, StageOutputs};
pub use values::Values;
