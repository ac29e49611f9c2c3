//! chartstage CLI - stage chart bundles and reconcile them with helm

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod context;
mod error;
mod exit_codes;

use chartstage_core::config::CONFIG_FILE;
use error::Result;

#[derive(Parser)]
#[command(name = "chartstage")]
#[command(version)]
#[command(about = "Stage chart bundles with local dependencies and reconcile them with helm", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Stage configuration file
    #[arg(short, long, global = true, default_value = CONFIG_FILE)]
    config: PathBuf,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Stage the bundle and write the rendered tree to the output directory
    Render {
        /// List the files that would be written without writing them
        #[arg(long)]
        dry_run: bool,
    },

    /// Install the rendered bundle, or upgrade it if already deployed
    Deploy {
        /// Stage output used by deploy-time overrides (NAME=VALUE)
        #[arg(long = "value", value_name = "NAME=VALUE")]
        values: Vec<String>,

        /// JSON or YAML file of stage outputs
        #[arg(long)]
        outputs: Option<PathBuf>,

        /// Wait until the release converges
        #[arg(long)]
        wait: bool,

        /// Render and write the bundle before deploying
        #[arg(long)]
        render: bool,
    },

    /// Uninstall the release
    Destroy {
        /// Wait until resources are deleted
        #[arg(long)]
        wait: bool,
    },

    /// Show the live state of the release
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List releases
    #[command(alias = "ls")]
    List {
        /// Namespace (default: the configured namespace)
        #[arg(short, long)]
        namespace: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage chart repositories
    Repo {
        #[command(subcommand)]
        command: RepoCommands,
    },
}

#[derive(Subcommand)]
enum RepoCommands {
    /// Add a repository (without arguments: every configured repository)
    Add {
        /// Repository name
        #[arg(requires = "url")]
        name: Option<String>,

        /// Repository URL
        url: Option<String>,
    },

    /// Update repository indexes
    Update,
}

fn main() {
    miette::set_panic_hook();

    let cli = Cli::parse();
    init_tracing(cli.debug);

    if let Err(err) = run(cli) {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

/// Log to stderr so it never interleaves with echoed command output
fn init_tracing(debug: bool) {
    let default = if debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let config = cli.config.as_path();

    match cli.command {
        Commands::Render { dry_run } => commands::render::run(config, dry_run),

        Commands::Deploy {
            values,
            outputs,
            wait,
            render,
        } => commands::deploy::run(config, &values, outputs.as_deref(), wait, render),

        Commands::Destroy { wait } => commands::destroy::run(config, wait),

        Commands::Status { json } => commands::status::run(config, json),

        Commands::List { namespace, json } => {
            commands::list::run(config, namespace.as_deref(), json)
        }

        Commands::Repo { command } => match command {
            RepoCommands::Add { name, url } => {
                commands::repo::add(config, name.as_deref(), url.as_deref())
            }
            RepoCommands::Update => commands::repo::update(config),
        },
    }
}
