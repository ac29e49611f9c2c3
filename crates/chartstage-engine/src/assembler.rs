//! Bundle assembly
//!
//! Rendering stages a bundle in a reusable directory and returns the
//! staged tree as a [`VirtualFileManifest`] addressed at its published
//! location. Nothing under the published location is written here.

use std::path::Path;

use chartstage_core::manifest::{DEFAULT_API_VERSION, dependency_overrides};
use chartstage_core::{
    BundleConfig, ChartIdentity, ChartManifest, Repository, Values, VirtualFileManifest, copy_tree,
};
use chartstage_exec::{CommandRunner, HelmClient};
use chartstage_repo::{DependencyResolver, Resolution};
use tracing::{debug, info};

use crate::error::{EngineError, Result};
use crate::staging::{StageContext, StageLayout};

/// Result of a render
#[derive(Debug, Clone)]
pub struct RenderOutput {
    pub layout: StageLayout,
    /// Final manifest as staged
    pub chart: ChartManifest,
    pub resolution: Resolution,
    /// Every text file of the staged tree, keyed by published path
    pub manifest: VirtualFileManifest,
}

/// Assembles bundles into self-contained chart trees
pub struct BundleAssembler<'a, R: CommandRunner> {
    helm: &'a HelmClient<R>,
    repositories: &'a [Repository],
    context: StageContext,
}

impl<'a, R: CommandRunner> BundleAssembler<'a, R> {
    pub fn new(
        helm: &'a HelmClient<R>,
        repositories: &'a [Repository],
        context: StageContext,
    ) -> Self {
        Self {
            helm,
            repositories,
            context,
        }
    }

    pub fn context(&self) -> &StageContext {
        &self.context
    }

    /// Stage `bundle` and collect the result
    pub fn render(&self, bundle: &BundleConfig) -> Result<RenderOutput> {
        let layout = self
            .context
            .layout(&bundle.name, bundle.output_prefix.as_deref())?;
        info!(
            "Rendering {} {} in {}",
            bundle.name,
            bundle.version,
            layout.staging_dir.display()
        );

        if !bundle.template.is_dir() {
            return Err(EngineError::TemplateNotFound {
                path: bundle.template.clone(),
            });
        }
        std::fs::create_dir_all(&layout.staging_dir)?;
        let copied = copy_tree(&bundle.template, &layout.staging_dir)?;
        debug!("staged {} template file(s)", copied);

        Values::update_file(layout.values_file(), &bundle.overrides)?;

        let identity = ChartIdentity::new(&bundle.name, &bundle.version);
        write_identity(&layout.manifest_file(), &identity)?;

        let resolution = DependencyResolver::new(self.helm, self.repositories).resolve(
            &bundle.dependencies,
            &layout.charts_dir(),
            &layout.published_charts_dir(),
        )?;

        Values::update_file(
            layout.manifest_file(),
            &dependency_overrides(&resolution.records())?,
        )?;
        let chart = ChartManifest::from_file(layout.manifest_file())?;

        let manifest = VirtualFileManifest::collect(&layout.staging_dir, &layout.published_dir)?;
        info!(
            "Rendered {} file(s) for {} ({} dependency pull(s))",
            manifest.len(),
            bundle.name,
            resolution.pulled()
        );

        Ok(RenderOutput {
            layout,
            chart,
            resolution,
            manifest,
        })
    }
}

/// Write name, version and appVersion into the staged manifest
///
/// An `apiVersion` is added when the template carries none.
fn write_identity(path: &Path, identity: &ChartIdentity) -> Result<()> {
    let mut manifest = Values::from_yaml(&format!("apiVersion: {}", DEFAULT_API_VERSION))?;
    if path.is_file() {
        manifest.merge(&Values::from_file(path)?);
    }
    manifest.merge(&identity.to_overrides()?);

    std::fs::write(path, manifest.to_yaml()?)?;
    Ok(())
}
