pub mod args;
pub mod commands;

use anyhow::{Context, Result};
use args::{Cli, Commands};
use clap::Parser;
use std::path::Path;

use crate::config::{self, Config};

/// Execute the CLI with parsed arguments
pub async fn run() -> Result<()> {
    // A missing .env is fine
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // The player owns the terminal, so its logs go to a file
    let log_file = match cli.command {
        Commands::Play(_) => Some(config::log_file_path()),
        _ => None,
    };
    setup_logging(cli.verbose, cli.quiet, log_file.as_deref());

    let config_path = cli.config.clone().unwrap_or_else(config::default_config_path);
    if let Commands::Config(args) = &cli.command {
        return commands::config::execute(args, &config_path, &cli.remote);
    }

    let mut config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
    cli.remote.apply(&mut config.remote);

    match cli.command {
        Commands::Play(args) => commands::play::execute(args, config).await,
        Commands::Lines(args) => commands::lines::execute(args, &config),
        Commands::Resolve(args) => commands::lines::resolve(args, &config),
        Commands::Vocab(command) => commands::vocab::execute(command, config).await,
        Commands::Record(args) => commands::record::execute(args, config).await,
        Commands::Config(_) => Ok(()),
    }
}

fn setup_logging(verbose: u8, quiet: bool, log_file: Option<&Path>) {
    use tracing_subscriber::{fmt, EnvFilter};

    if quiet {
        // Suppress all output except errors
        return;
    }

    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match log_file.and_then(open_log_file) {
        Some(file) => {
            fmt()
                .with_env_filter(filter)
                .with_target(false)
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file))
                .init();
        }
        None if log_file.is_some() => {
            // No usable log file: stay silent rather than draw over the TUI
        }
        None => {
            fmt()
                .with_env_filter(filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

fn open_log_file(path: &Path) -> Option<std::fs::File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).ok()?;
    }
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .ok()
}
