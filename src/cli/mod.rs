// src/cli/mod.rs
//! CLI definitions for podshift
//!
//! The actual command implementations are in the `commands` module.
//!
//! - `migrate container <name>` - Migrate a single container
//! - `migrate pod <name>` - Migrate a pod and all of its containers
//! - `completions <shell>` - Generate shell completions

use clap::{Parser, Subcommand};
use clap_complete::Shell;

mod migrate;

pub use migrate::{MigrateCommands, RemoteArgs};

#[derive(Parser)]
#[command(name = "podshift")]
#[command(author = "Podshift Contributors")]
#[command(version)]
#[command(about = "Migrate podman containers and pods to another host over SSH", long_about = None)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Migrate a container or pod
    #[command(subcommand)]
    Migrate(MigrateCommands),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}
