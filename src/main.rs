//! kubectl-iam4sa - Diagnose IAM roles for Kubernetes service accounts

use anyhow::Result;
use clap::Parser;
use iam4sa::cli::{Cli, Command, LogLevel};
use iam4sa::commands;
use iam4sa::config::QueryConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup tracing
    setup_tracing(cli.log_level);

    // Handle color settings
    if cli.no_color {
        owo_colors::set_override(false);
    }

    let output = cli.output;

    // Execute command
    let result = match &cli.command {
        Command::Version => commands::run_version(output),
        Command::Get(args) => match QueryConfig::from_cli(&cli, &args.names) {
            Ok(config) => commands::run_get(&config, output).await,
            Err(e) => Err(e),
        },
        Command::List => match QueryConfig::from_cli(&cli, &[]) {
            Ok(config) => commands::run_list(&config, output).await,
            Err(e) => Err(e),
        },
        Command::Cluster => match QueryConfig::from_cli(&cli, &[]) {
            Ok(config) => commands::run_cluster(&config, output).await,
            Err(e) => Err(e),
        },
    };

    if let Err(e) = result {
        tracing::debug!(error = ?e, "command failed");
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    Ok(())
}

fn setup_tracing(level: LogLevel) {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| level.as_filter().into()))
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}
