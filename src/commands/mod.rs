// src/commands/mod.rs
//! Command handlers for the podshift CLI

mod migrate;

pub use migrate::cmd_migrate;

use crate::cli::Cli;
use anyhow::Result;
use clap::CommandFactory;
use clap_complete::Shell;
use std::io;

/// Print shell completions to stdout
pub fn cmd_completions(shell: Shell) -> Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "podshift", &mut io::stdout());
    Ok(())
}
