// src/remote/mod.rs

//! Remote session abstraction
//!
//! All destination-side work goes through one [`RemoteSession`]: it runs a
//! shell command on the destination host and copies local files to the same
//! path there. The session is not re-entrant and is owned by exactly one job.

mod ssh;

pub use ssh::{SshSession, SshTarget};

use crate::error::Result;
use std::path::Path;

/// Output of a remote command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ExecOutput {
    pub fn new(exit_code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Trimmed stdout
    pub fn text(&self) -> &str {
        self.stdout.trim()
    }

    /// Best description of a failure: stderr, falling back to stdout
    pub fn message(&self) -> String {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            format!("exit code {}: {}", self.exit_code, self.stdout.trim())
        } else {
            stderr.to_string()
        }
    }
}

/// Channel to the destination host
pub trait RemoteSession {
    /// Run `command` through the remote shell.
    ///
    /// A non-zero exit status is not an error here; only a broken session is.
    fn exec(&mut self, command: &str) -> Result<ExecOutput>;

    /// Run a command that reads a whole archive on the destination (image
    /// load, volume import). It is bounded by the transfer limit rather
    /// than the command limit.
    fn exec_bulk(&mut self, command: &str) -> Result<ExecOutput> {
        self.exec(command)
    }

    /// Copy `local_path` to the identical path on the destination
    fn transfer(&mut self, local_path: &Path) -> Result<()>;

    /// Release the session; further calls fail
    fn close(&mut self) -> Result<()>;
}

/// Quote one argument for a POSIX shell
pub fn shell_quote(arg: &str) -> String {
    let safe = !arg.is_empty()
        && arg.chars().all(|c| {
            c.is_ascii_alphanumeric()
                || matches!(c, '_' | '-' | '.' | '/' | ':' | '=' | ',' | '@' | '%' | '+')
        });

    if safe {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

/// Join arguments into a single shell command line
pub fn shell_join<I, S>(args: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    args.into_iter()
        .map(|a| shell_quote(a.as_ref()))
        .collect::<Vec<_>>()
        .join(" ")
}
