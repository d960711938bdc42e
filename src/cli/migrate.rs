// src/cli/migrate.rs
//! Migration subcommands

use clap::{Args, Subcommand};
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum MigrateCommands {
    /// Migrate a container that is not part of a pod
    Container {
        /// Container name
        name: String,

        #[command(flatten)]
        remote: RemoteArgs,
    },

    /// Migrate a pod with all of its containers
    Pod {
        /// Pod name
        name: String,

        #[command(flatten)]
        remote: RemoteArgs,
    },
}

/// Destination and run options shared by both targets
#[derive(Args, Debug, Clone)]
pub struct RemoteArgs {
    /// Destination host (name or address)
    #[arg(long)]
    pub dst: String,

    /// SSH port on the destination
    #[arg(long, default_value_t = 22)]
    pub port: u16,

    /// SSH key file, resolved against `ssh.key_dir`
    #[arg(long)]
    pub keyfile: Option<String>,

    /// Remote user (overrides `ssh.user`)
    #[arg(long)]
    pub user: Option<String>,

    /// Config file (default: ~/.config/podshift/config.toml, then /etc/podshift/config.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Migration directory (overrides `migrate_dir`)
    #[arg(long)]
    pub migrate_dir: Option<PathBuf>,

    /// Never prompt; answer decisions from the `[batch]` config section
    #[arg(long)]
    pub batch: bool,
}
