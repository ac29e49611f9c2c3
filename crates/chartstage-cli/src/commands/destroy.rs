//! Destroy command - uninstall the release

use std::path::Path;

use chartstage_kube::{DestroyOptions, ReleaseAction, ReleaseReconciler};
use console::style;

use crate::context::{helm_client, load_config};
use crate::error::{CliError, Result};

/// Run the destroy command
pub fn run(config_path: &Path, wait: bool) -> Result<()> {
    let config = load_config(config_path)?;
    let name = &config.bundle.name;

    println!(
        "{} Uninstalling release {} from namespace {}",
        style("→").blue().bold(),
        style(name).cyan(),
        style(&config.namespace).yellow()
    );

    let reconciler = ReleaseReconciler::new(helm_client(&config.helm));
    let options = DestroyOptions::new(name, &config.namespace).with_wait(wait || config.helm.wait);
    let outcome = reconciler
        .destroy(&options)
        .and_then(|outcome| outcome.into_result())
        .map_err(CliError::release)?;

    if outcome.action == ReleaseAction::AlreadyAbsent {
        println!(
            "{} Release {} is not installed, nothing to do",
            style("✓").green().bold(),
            style(name).cyan()
        );
    } else {
        println!(
            "{} Successfully uninstalled {}",
            style("✓").green().bold(),
            style(name).cyan()
        );
    }

    Ok(())
}
