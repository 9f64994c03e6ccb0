mod commands;
mod manifest;

use clap::{ArgAction, Parser, Subcommand};
use myzel_cloud::{Environment, Reconciler, StateStore, registry};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "myzel", version)]
#[command(about = "Declare resources in YAML, reconcile them against what is deployed", long_about = None)]
struct Cli {
    /// Directory holding the state files (default: ./config)
    #[arg(long, global = true, env = "MYZEL_CONFIG_DIR")]
    config_dir: Option<PathBuf>,

    /// Manifest to load (default: myzel.local.yaml, myzel.yaml, .myzel.yaml)
    #[arg(short, long, global = true, env = "MYZEL_MANIFEST")]
    manifest: Option<PathBuf>,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show what a deploy would change
    Diff {
        /// Print the YAML diff report instead of the plan
        #[arg(long)]
        yaml: bool,
    },
    /// Apply the manifest
    Deploy {
        /// Apply everything, then write the state once (not resumable)
        #[arg(long)]
        batch: bool,
        /// Apply without asking; otherwise only the plan is printed
        #[arg(short, long)]
        yes: bool,
    },
    /// Delete every deployed resource of the application
    Destroy {
        /// Delete without asking; otherwise only the list is printed
        #[arg(short, long)]
        yes: bool,
    },
    /// Show the recorded state
    Status {
        /// Application name (default: name from the manifest)
        app: Option<String>,
    },
    /// Show version information
    Version,
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if matches!(cli.command, Commands::Version) {
        println!("myzel {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    registry::install(myzel_cloud_local::registry()?)?;
    let config_dir = match cli.config_dir {
        Some(dir) => dir,
        None => myzel_config::config_dir()?,
    };
    tracing::debug!("Using state directory {}", config_dir.display());

    let reconciler = Reconciler::new(registry::global()?, StateStore::new(config_dir));
    let ctx = commands::Context::new(reconciler, Environment::from_env(), cli.manifest);

    match cli.command {
        Commands::Diff { yaml } => commands::diff::handle(&ctx, yaml).await,
        Commands::Deploy { batch, yes } => commands::deploy::handle(&ctx, batch, yes).await,
        Commands::Destroy { yes } => commands::destroy::handle(&ctx, yes).await,
        Commands::Status { app } => commands::status::handle(&ctx, app).await,
        Commands::Version => Ok(()),
    }
}
