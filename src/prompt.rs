// src/prompt.rs

//! Operator decisions for recoverable conflicts.
//!
//! Steps that can continue after a conflict (reusing an existing network,
//! reusing a secret, continuing without secret files) never read stdin
//! themselves. They ask a [`Prompter`], which either forwards the question to
//! an injected [`Confirm`] capability (interactive mode) or answers from the
//! configured [`BatchPolicy`] (batch mode).

use crate::config::BatchPolicy;
use std::io::{self, BufRead, Write};
use strum_macros::{Display, EnumString};
use tracing::{info, warn};

/// How soft failures are resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Mode {
    /// Ask the operator
    Interactive,
    /// Never prompt, use the batch policy
    Batch,
}

/// Yes/no question capability
pub trait Confirm {
    /// Ask `prompt`, returning true for yes
    fn confirm(&mut self, prompt: &str) -> bool;
}

impl<F> Confirm for F
where
    F: FnMut(&str) -> bool,
{
    fn confirm(&mut self, prompt: &str) -> bool {
        self(prompt)
    }
}

/// Reads y/n answers from the terminal
#[derive(Debug, Default)]
pub struct TerminalConfirm;

impl TerminalConfirm {
    pub fn new() -> Self {
        Self
    }

    fn ask(&self, prompt: &str) -> io::Result<bool> {
        let mut stdout = io::stdout();
        let stdin = io::stdin();
        write!(stdout, "{} (y/n): ", prompt)?;

        loop {
            stdout.flush()?;
            let mut input = String::new();
            if stdin.lock().read_line(&mut input)? == 0 {
                // EOF counts as no
                return Ok(false);
            }

            match input.trim().to_lowercase().chars().next() {
                Some('y') => return Ok(true),
                Some('n') => return Ok(false),
                _ => write!(stdout, "Please enter only [y] or [n]: ")?,
            }
        }
    }
}

impl Confirm for TerminalConfirm {
    fn confirm(&mut self, prompt: &str) -> bool {
        match self.ask(prompt) {
            Ok(answer) => answer,
            Err(e) => {
                warn!("Could not read answer from terminal: {}", e);
                false
            }
        }
    }
}

/// Decision points where a run may continue after a conflict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Decision {
    /// The container's network already exists on the destination
    #[strum(serialize = "reuse existing network")]
    ReuseNetwork,
    /// The container's network is missing on the destination
    #[strum(serialize = "create missing network")]
    CreateNetwork,
    /// A secret with the same name already exists on the destination
    #[strum(serialize = "reuse existing secret")]
    ReuseSecret,
    /// Secret files are missing or no secret directory is configured
    #[strum(serialize = "continue without secret sync")]
    ContinueWithoutSecrets,
    /// The migration directory already holds files
    #[strum(serialize = "continue with non-empty migration folder")]
    ContinueWithNonEmptyMigrateDir,
}

/// Outcome of a decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    Yes,
    No,
    /// Batch mode had no preset answer; the caller must treat this as fatal
    Unresolved,
}

impl Answer {
    pub fn is_yes(self) -> bool {
        self == Answer::Yes
    }
}

/// Routes decisions to the operator or the batch policy
pub struct Prompter {
    mode: Mode,
    confirm: Box<dyn Confirm>,
    policy: BatchPolicy,
}

impl Prompter {
    pub fn new(mode: Mode, confirm: Box<dyn Confirm>, policy: BatchPolicy) -> Self {
        Self {
            mode,
            confirm,
            policy,
        }
    }

    /// Interactive prompter reading from the terminal
    pub fn interactive(policy: BatchPolicy) -> Self {
        Self::new(Mode::Interactive, Box::new(TerminalConfirm::new()), policy)
    }

    /// Batch prompter that never asks anyone
    pub fn batch(policy: BatchPolicy) -> Self {
        Self::new(Mode::Batch, Box::new(|_: &str| false), policy)
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Resolve a decision, logging the choice
    pub fn decide(&mut self, decision: Decision, prompt: &str) -> Answer {
        let answer = match self.mode {
            Mode::Interactive => {
                if self.confirm.confirm(prompt) {
                    Answer::Yes
                } else {
                    Answer::No
                }
            }
            Mode::Batch => {
                if self.policy_allows(decision) {
                    Answer::Yes
                } else {
                    Answer::Unresolved
                }
            }
        };

        info!("Decision '{}' ({} mode): {:?}", decision, self.mode, answer);
        answer
    }

    /// Plain yes/no question outside the decision table (disclaimer)
    pub fn ask(&mut self, prompt: &str) -> bool {
        match self.mode {
            Mode::Interactive => self.confirm.confirm(prompt),
            Mode::Batch => false,
        }
    }

    fn policy_allows(&self, decision: Decision) -> bool {
        match decision {
            Decision::ReuseNetwork => self.policy.reuse_existing_networks,
            Decision::CreateNetwork => self.policy.create_missing_networks,
            Decision::ReuseSecret => self.policy.reuse_existing_secrets,
            Decision::ContinueWithoutSecrets => self.policy.continue_without_secrets,
            Decision::ContinueWithNonEmptyMigrateDir => {
                self.policy.continue_with_nonempty_migrate_dir
            }
        }
    }
}
