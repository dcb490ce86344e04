//! Anthill - delivery tools for the Anthill platform
//!
//! Usage:
//!   anthill sync -e ENV -n APP -v VER -g GS -c functions.json
//!   anthill dlc -e ENV -n APP -v VER -g GS -c bundles.json [-f]
//!   anthill game-deploy -e ENV -n APP -v VER -g GS -f server.zip

mod interactive;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use console::style;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use anthill_core::app::{ApplicationInfo, Credentials, PASSWORD_ENV, USERNAME_ENV};
use anthill_core::context::DeliveryContext;
use anthill_core::deliver::{GameBuild, deploy_bundles, deploy_game, sync_functions};
use anthill_core::http::{ReqwestTransport, TransportConfig};
use anthill_core::manifest::parse_manifest;
use anthill_core::reconcile::{ReconcileOptions, RunReport, RunStatus};
use anthill_core::services::ids;

use crate::interactive::TerminalOperator;

#[derive(Parser)]
#[command(name = "anthill")]
#[command(about = "Delivery tools for the Anthill platform", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Synchronize server-side functions with the exec service
    Sync(ManifestArgs),

    /// Deploy downloadable content bundles as a new data version
    Dlc(ManifestArgs),

    /// Upload a game server build
    GameDeploy(GameDeployArgs),
}

/// Where to deliver and as whom.
#[derive(Args, Debug, Clone)]
struct TargetArgs {
    /// Environment service location
    #[arg(short = 'e', long = "environment")]
    environment: String,

    /// Application name
    #[arg(short = 'n', long = "name")]
    name: String,

    /// Application version
    #[arg(short = 'v', long = "version")]
    version: String,

    /// Gamespace
    #[arg(short = 'g', long = "gamespace")]
    gamespace: String,

    /// Anthill username
    #[arg(short = 'u', long, env = USERNAME_ENV)]
    username: Option<String>,

    /// Anthill password
    #[arg(short = 'p', long, env = PASSWORD_ENV, hide_env_values = true)]
    password: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,
}

#[derive(Args, Debug, Clone)]
struct ManifestArgs {
    #[command(flatten)]
    target: TargetArgs,

    /// Manifest file (.json or .toml)
    #[arg(short = 'c', long = "config")]
    config: PathBuf,

    /// Answer yes to every question
    #[arg(short = 'f', long)]
    force: bool,

    /// Show the plan and exit without writing
    #[arg(long)]
    dry_run: bool,

    /// Also list artifacts that are up to date
    #[arg(long)]
    verbose: bool,
}

impl ManifestArgs {
    fn options(&self) -> ReconcileOptions {
        ReconcileOptions {
            force: self.force,
            dry_run: self.dry_run,
        }
    }
}

#[derive(Args, Debug, Clone)]
struct GameDeployArgs {
    #[command(flatten)]
    target: TargetArgs,

    /// A filename to deploy
    #[arg(short = 'f', long = "filename")]
    filename: PathBuf,

    /// Switch the application to the deployed version automatically
    #[arg(short = 's', long = "switch", default_value_t = true, action = ArgAction::Set)]
    switch: bool,
}

fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "anthill=info,warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run_cli(cli.command) {
        eprintln!("{} {e:#}", style("ERROR:").red().bold());
        std::process::exit(1);
    }
}

fn run_cli(command: Commands) -> Result<()> {
    match command {
        Commands::Sync(args) => run_sync(args),
        Commands::Dlc(args) => run_dlc(args),
        Commands::GameDeploy(args) => run_game_deploy(args),
    }
}

fn run_sync(args: ManifestArgs) -> Result<()> {
    let manifest = parse_manifest(&args.config)?;
    let (context, credentials) = connect(&args.target, &[])?;

    let mut operator = TerminalOperator::new(args.verbose);
    let report = sync_functions(
        &context,
        &credentials,
        &manifest.functions,
        args.options(),
        &mut operator,
    )?;

    print_summary(&report);
    Ok(())
}

fn run_dlc(args: ManifestArgs) -> Result<()> {
    let manifest = parse_manifest(&args.config)?;
    let (context, credentials) = connect(&args.target, &[ids::DLC])?;

    let mut operator = TerminalOperator::new(args.verbose);
    let report = deploy_bundles(
        &context,
        &credentials,
        &manifest.bundles,
        args.options(),
        &mut operator,
    )?;

    print_summary(&report);
    Ok(())
}

fn run_game_deploy(args: GameDeployArgs) -> Result<()> {
    let (context, credentials) = connect(&args.target, &[ids::GAME])?;

    let build = GameBuild {
        path: args.filename,
        switch_to_new: args.switch,
    };
    deploy_game(&context, &credentials, &build)?;

    println!("{}", style("Deployed!").green());
    Ok(())
}

/// Resolve credentials, build the transport and bootstrap the platform.
fn connect(target: &TargetArgs, extra: &[&str]) -> Result<(DeliveryContext, Credentials)> {
    let credentials = Credentials::resolve(target.username.clone(), target.password.clone())?;

    let config = TransportConfig {
        timeout: target.timeout.map(Duration::from_secs),
        ..TransportConfig::default()
    };
    let transport = ReqwestTransport::new(config).context("Failed to set up HTTP transport")?;

    let app = ApplicationInfo::new(&target.name, &target.version, &target.gamespace);
    let context = DeliveryContext::connect(Arc::new(transport), &target.environment, app, extra)
        .with_context(|| format!("Failed to initialize against {}", target.environment))?;

    Ok((context, credentials))
}

fn summary(report: &RunReport) -> Option<String> {
    match report.status {
        RunStatus::Delivered => Some(match &report.transaction {
            Some(id) => format!("Done! Data version {id} published."),
            None => "Done!".to_string(),
        }),
        RunStatus::DryRun => Some("Dry run: nothing was written.".to_string()),
        RunStatus::NothingToDo | RunStatus::Declined => None,
    }
}

fn print_summary(report: &RunReport) {
    if let Some(line) = summary(report) {
        println!("{}", style(line).green());
    }
}
