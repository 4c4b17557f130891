// SPDX-FileCopyrightText: © 2025 logrep Contributors
//
// SPDX-License-Identifier: MPL-2.0

use clap::{Parser, Subcommand};
use tracing::{error, warn};

use crate::config::{self, DaemonConfig};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the daemon configuration file (address, logging, settings path)
    #[arg(short, long, default_value = "logrepd.toml")]
    pub config: String,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Starts the logrep server
    Serve,
    /// Manage the daemon configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print a default daemon config file to stdout
    Default,
}

// Allow eprintln before logging is initialized (CLI output).
#[allow(clippy::disallowed_macros)]
async fn handle_serve_command(config_path: &str) {
    let daemon_config = match config::load_daemon_config(config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("failed to load configuration: {e}");
            std::process::exit(1);
        },
    };

    let _log_guard = match crate::logging::init_logging(&daemon_config.log) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("failed to initialize logging: {e}");
            std::process::exit(1);
        },
    };

    if !std::path::Path::new(config_path).exists() {
        warn!(config_path, "daemon config file not found, using defaults");
    }

    tracing::info!(
        address = %daemon_config.address,
        settings_path = %daemon_config.settings_path,
        "starting logrepd"
    );

    if let Err(e) = crate::server::start_server(&daemon_config).await {
        error!(error = %e, "failed to start server");
        std::process::exit(1);
    }
}

#[allow(clippy::disallowed_macros)]
fn handle_config_default_command() {
    match toml::to_string_pretty(&DaemonConfig::default()) {
        Ok(toml_string) => {
            println!("# Default logrepd configuration file");
            println!("{toml_string}");
        },
        Err(e) => {
            eprintln!("failed to generate default config: {e}");
            std::process::exit(1);
        },
    }
}

pub async fn handle_command(cli: &Cli) {
    match cli.command.as_ref().unwrap_or(&Commands::Serve) {
        Commands::Serve => handle_serve_command(&cli.config).await,
        Commands::Config(ConfigCommands::Default) => handle_config_default_command(),
    }
}
