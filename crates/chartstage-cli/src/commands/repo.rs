//! Repository commands - register chart repositories with helm

use std::path::Path;

use chartstage_exec::CommandOutput;
use console::style;

use crate::context::{helm_client, load_config, load_helm_settings};
use crate::error::{CliError, Result};

/// Add a repository; without arguments, add every configured repository
pub fn add(config_path: &Path, name: Option<&str>, url: Option<&str>) -> Result<()> {
    let repositories = match (name, url) {
        (Some(name), Some(url)) => vec![(name.to_string(), url.to_string())],
        (None, None) => load_config(config_path)?
            .repositories
            .into_iter()
            .map(|repo| (repo.name, repo.url))
            .collect(),
        _ => return Err(CliError::usage("pass both NAME and URL, or neither")),
    };

    let helm = helm_client(&load_helm_settings(config_path)?);
    for (name, url) in &repositories {
        let output = helm.repo_add(name, url).map_err(CliError::release)?;
        check(&format!("repo add {}", name), &output)?;
        println!(
            "{} \"{}\" has been added to your repositories",
            style("✓").green().bold(),
            style(name).cyan()
        );
    }

    if repositories.is_empty() {
        println!("No repositories configured");
    }
    Ok(())
}

/// Refresh the local repository indexes
pub fn update(config_path: &Path) -> Result<()> {
    let helm = helm_client(&load_helm_settings(config_path)?);
    let output = helm.repo_update().map_err(CliError::release)?;
    check("repo update", &output)?;
    println!("{} Repository indexes updated", style("✓").green().bold());
    Ok(())
}

fn check(command: &str, output: &CommandOutput) -> Result<()> {
    if output.success() {
        return Ok(());
    }
    Err(CliError::Release {
        message: format!(
            "`helm {}` failed with exit code {}",
            command, output.exit_code
        ),
    })
}
