//! Status command - show the live state of the release

use std::path::Path;

use chartstage_kube::{ReleaseReconciler, ReleaseState};
use console::style;

use crate::context::{helm_client, load_config};
use crate::error::{CliError, Result};

/// Run the status command
pub fn run(config_path: &Path, output_json: bool) -> Result<()> {
    let config = load_config(config_path)?;
    let reconciler = ReleaseReconciler::new(helm_client(&config.helm));

    let state = reconciler
        .status(&config.bundle.name, &config.namespace)
        .map_err(CliError::release)?;

    if output_json {
        let json =
            serde_json::to_string_pretty(&state).map_err(|e| CliError::other(e.to_string()))?;
        println!("{}", json);
        return Ok(());
    }

    let status = match state {
        ReleaseState::Absent => {
            println!(
                "Release {} is not deployed in namespace {}",
                style(&config.bundle.name).cyan(),
                style(&config.namespace).yellow()
            );
            return Ok(());
        }
        ReleaseState::Deployed(status) => status,
    };

    let unknown = || "-".to_string();
    let state_text = status.status.clone().unwrap_or_else(unknown);
    let state_style = match state_text.as_str() {
        "deployed" => style(state_text.clone()).green(),
        "failed" => style(state_text.clone()).red(),
        s if s.starts_with("pending") => style(state_text.clone()).yellow(),
        _ => style(state_text.clone()).dim(),
    };

    println!("{}", style("RELEASE INFO").bold().underlined());
    println!("  Name:        {}", style(&status.name).cyan());
    println!("  Namespace:   {}", style(&status.namespace).yellow());
    println!(
        "  Revision:    {}",
        status.revision.map(|r| r.to_string()).unwrap_or_else(unknown)
    );
    println!("  Status:      {}", state_style);
    println!(
        "  Chart:       {}-{}",
        status.chart.clone().unwrap_or_else(unknown),
        status.chart_version.clone().unwrap_or_else(unknown)
    );
    println!(
        "  App version: {}",
        status.app_version.clone().unwrap_or_else(unknown)
    );

    Ok(())
}
