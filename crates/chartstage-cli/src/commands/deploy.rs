//! Deploy command - install or upgrade the staged bundle

use std::path::Path;

use chartstage_engine::StageContext;
use chartstage_kube::{DeployOptions, ReleaseAction, ReleaseReconciler};
use console::style;

use crate::commands::render;
use crate::context::{helm_client, load_config, stage_outputs};
use crate::error::{CliError, Result};

/// Run the deploy command
pub fn run(
    config_path: &Path,
    values: &[String],
    outputs_file: Option<&Path>,
    wait: bool,
    render_first: bool,
) -> Result<()> {
    let config = load_config(config_path)?;

    // Resolve deploy-time values before anything runs
    let outputs = stage_outputs(outputs_file, values)?;
    let overrides = config.deploy.render(&outputs).map_err(|e| {
        CliError::input_with_help(
            e.to_string(),
            "Provide stage outputs with --value NAME=VALUE or --outputs <FILE>",
        )
    })?;

    let reconciler = ReleaseReconciler::new(helm_client(&config.helm));

    let chart_path = if render_first {
        let output = render::stage(&config, reconciler.helm())?;
        render::publish(&output)?;
        output.layout.published_dir
    } else {
        StageContext::from_config(&config)
            .layout(&config.bundle.name, config.bundle.output_prefix.as_deref())
            .map_err(CliError::render)?
            .published_dir
    };

    println!(
        "{} Deploying {} to namespace {}",
        style("→").blue().bold(),
        style(&config.bundle.name).cyan(),
        style(&config.namespace).yellow()
    );

    let options = DeployOptions::new(&config.bundle.name, &config.namespace, chart_path)
        .with_wait(wait || config.helm.wait)
        .with_overrides(overrides);
    let outcome = reconciler
        .deploy(&options)
        .and_then(|outcome| outcome.into_result())
        .map_err(CliError::release)?;

    let verb = match outcome.action {
        ReleaseAction::Upgrade => "Upgraded",
        _ => "Installed",
    };
    println!(
        "{} {} {} in namespace {}",
        style("✓").green().bold(),
        verb,
        style(&outcome.name).cyan(),
        style(&outcome.namespace).yellow()
    );

    Ok(())
}
