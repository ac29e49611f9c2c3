//! Render command - stage the bundle and publish the rendered tree

use std::path::Path;

use chartstage_core::StageConfig;
use chartstage_engine::{BundleAssembler, RenderOutput, StageContext};
use chartstage_exec::{CommandRunner, HelmClient};
use console::style;

use crate::context::{helm_client, load_config};
use crate::error::{CliError, Result};

/// Run the render command
pub fn run(config_path: &Path, dry_run: bool) -> Result<()> {
    let config = load_config(config_path)?;
    let helm = helm_client(&config.helm);

    let output = stage(&config, &helm)?;

    if dry_run {
        for path in output.manifest.paths() {
            println!("{}", path.display());
        }
        println!(
            "{} Dry run - {} file(s) not written",
            style("✓").green().bold(),
            output.manifest.len()
        );
        return Ok(());
    }

    publish(&output)
}

/// Render the configured bundle, reporting progress
pub fn stage<R: CommandRunner>(config: &StageConfig, helm: &HelmClient<R>) -> Result<RenderOutput> {
    println!(
        "{} Rendering {} {}",
        style("→").blue().bold(),
        style(&config.bundle.name).cyan(),
        style(&config.bundle.version).yellow()
    );

    let assembler =
        BundleAssembler::new(helm, &config.repositories, StageContext::from_config(config));
    let output = assembler.render(&config.bundle).map_err(CliError::render)?;

    for dependency in &output.resolution.dependencies {
        println!(
            "  {} {} {} ({})",
            style("•").dim(),
            dependency.record.name,
            dependency.record.version,
            dependency.action
        );
    }
    for skipped in output.manifest.skipped() {
        println!(
            "  {} Skipped non-text file {}",
            style("⚠").yellow(),
            skipped.display()
        );
    }

    Ok(output)
}

/// Write a rendered tree to its published location
pub fn publish(output: &RenderOutput) -> Result<()> {
    let written = output.manifest.write_all().map_err(CliError::render)?;
    println!(
        "{} Wrote {} file(s) to {}",
        style("✓").green().bold(),
        written,
        output.layout.published_dir.display()
    );
    Ok(())
}
