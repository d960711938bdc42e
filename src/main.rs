// src/main.rs

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands, MigrateCommands};
use podshift::EntityKind;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing subscriber for logging
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();

    let result = match cli.command {
        Commands::Migrate(MigrateCommands::Container { name, remote }) => {
            commands::cmd_migrate(EntityKind::Container, &name, &remote)
        }
        Commands::Migrate(MigrateCommands::Pod { name, remote }) => {
            commands::cmd_migrate(EntityKind::Pod, &name, &remote)
        }
        Commands::Completions { shell } => commands::cmd_completions(shell),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(1)
        }
    }
}
