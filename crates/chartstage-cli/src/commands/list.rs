//! List command - releases in the configured namespace

use std::path::Path;

use chartstage_kube::ReleaseReconciler;
use console::style;

use crate::context::{helm_client, load_config};
use crate::error::{CliError, Result};

/// Run the list command
pub fn run(config_path: &Path, namespace: Option<&str>, output_json: bool) -> Result<()> {
    let config = load_config(config_path)?;
    let namespace = namespace.unwrap_or(&config.namespace);
    let reconciler = ReleaseReconciler::new(helm_client(&config.helm));

    let releases = reconciler.list(namespace).map_err(CliError::release)?;

    if output_json {
        let json =
            serde_json::to_string_pretty(&releases).map_err(|e| CliError::other(e.to_string()))?;
        println!("{}", json);
        return Ok(());
    }

    if releases.is_empty() {
        println!("No releases found in namespace {}", style(namespace).yellow());
        return Ok(());
    }

    println!(
        "{:<24} {:<16} {:<9} {:<16} {:<32} {}",
        style("NAME").bold(),
        style("NAMESPACE").bold(),
        style("REVISION").bold(),
        style("STATUS").bold(),
        style("CHART").bold(),
        style("APP VERSION").bold()
    );
    for release in &releases {
        println!(
            "{:<24} {:<16} {:<9} {:<16} {:<32} {}",
            release.name,
            release.namespace,
            release.revision,
            release.status,
            release.chart,
            release.app_version
        );
    }

    Ok(())
}
