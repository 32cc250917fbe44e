mod backends;
mod deploy;
mod report;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use log::{debug, info};
use plinth_core::{BootstrapConfig, PolicyDocument, ResourceKind, bootstrap};

use crate::backends::{BackendKind, create_backends};
use crate::deploy::{StepError, run_steps};

const DEFAULT_CONFIG_FILE: &str = "plinth.json";

#[derive(Parser)]
#[command(name = "plinth")]
#[command(about = "Bootstrap the remote state backend for Terraform", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(flatten)]
    settings: Settings,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Settings {
    /// Path to a JSON config file (defaults to ./plinth.json when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Region for the bucket and table
    #[arg(long, global = true)]
    region: Option<String>,

    /// Name of the state bucket
    #[arg(long, global = true)]
    bucket: Option<String>,

    /// Name of the lock table
    #[arg(long, global = true)]
    table: Option<String>,

    /// Account ID or IAM ARN granted access to the state bucket
    #[arg(long, global = true)]
    principal: Option<String>,

    /// Custom service endpoint, e.g. a local emulator
    #[arg(long, global = true)]
    endpoint_url: Option<String>,

    /// Where resources are reconciled
    #[arg(long, global = true, value_enum, default_value_t = BackendKind::Aws)]
    backend: BackendKind,
}

#[derive(Subcommand)]
enum Commands {
    /// Ensure the state bucket and lock table exist and are configured
    Bootstrap,
    /// Bootstrap, then run deployment steps in order
    Deploy {
        /// Shell command to run after bootstrap (repeatable)
        #[arg(long = "step", required = true)]
        steps: Vec<String>,

        /// Working directory for the steps
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Print the access policy applied to the state bucket
    Policy,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Bootstrap => run_bootstrap(&cli.settings).await,
        Commands::Deploy { steps, dir } => run_deploy(&cli.settings, &steps, dir.as_deref()).await,
        Commands::Policy => run_policy(&cli.settings),
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), error_message(&e));
        let code = e.downcast_ref::<StepError>().map_or(1, StepError::exit_code);
        std::process::exit(code);
    }
}

/// The error and every cause beneath it, outermost first
fn error_message(err: &anyhow::Error) -> String {
    format!("{:#}", err)
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();
}

fn load_config(settings: &Settings) -> Result<BootstrapConfig> {
    let mut config = match &settings.config {
        Some(path) => BootstrapConfig::from_file(path)?,
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
            debug!("Loading {}", DEFAULT_CONFIG_FILE);
            BootstrapConfig::from_file(DEFAULT_CONFIG_FILE)?
        }
        None => BootstrapConfig::default(),
    };
    apply_overrides(&mut config, settings);
    Ok(config)
}

fn apply_overrides(config: &mut BootstrapConfig, settings: &Settings) {
    if let Some(region) = &settings.region {
        config.region = region.clone();
    }
    if let Some(bucket) = &settings.bucket {
        config.state_bucket = Some(bucket.clone());
    }
    if let Some(table) = &settings.table {
        config.lock_table = table.clone();
    }
    if let Some(principal) = &settings.principal {
        config.principal = Some(principal.clone());
    }
    if let Some(url) = &settings.endpoint_url {
        config.endpoint_url = Some(url.clone());
    }
}

async fn run_bootstrap(settings: &Settings) -> Result<()> {
    let config = load_config(settings)?;
    let plan = config.plan()?;
    info!(
        "Bootstrapping state bucket {} and lock table {}",
        plan.object_store.name, plan.lock_table.name
    );

    let backends = create_backends(settings.backend, &config).await;
    let report = bootstrap(&backends, &plan).await;
    report::print_report(&report);

    report.ensure_ready()?;
    Ok(())
}

async fn run_deploy(settings: &Settings, steps: &[String], dir: Option<&Path>) -> Result<()> {
    run_bootstrap(settings)
        .await
        .context("Deployment aborted before any step ran")?;
    run_steps(steps, dir).await?;
    Ok(())
}

fn run_policy(settings: &Settings) -> Result<()> {
    let config = load_config(settings)?;
    let plan = config.plan()?;
    let ResourceKind::ObjectStore(params) = &plan.object_store.kind else {
        bail!("{} is not an object store", plan.object_store.name);
    };

    let policy = PolicyDocument::for_state_bucket(&plan.object_store.name, &params.principal);
    let json = policy
        .to_json_pretty()
        .context("Failed to serialize bucket policy")?;
    println!("{}", json);
    Ok(())
}
