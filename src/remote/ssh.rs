// src/remote/ssh.rs

//! SSH-backed remote session
//!
//! Uses the system `ssh`/`scp` clients over a single control master
//! connection, so the operator authenticates once per job and every command
//! and transfer reuses that connection. The control socket lives in a private
//! temporary directory that disappears with the session.

use super::{ExecOutput, RemoteSession};
use crate::error::{Error, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::Duration;
use tempfile::TempDir;
use tracing::{debug, info, warn};
use wait_timeout::ChildExt;

/// ssh exits with 255 when the connection itself failed
const SSH_CONNECTION_FAILURE: i32 = 255;

/// Where to connect
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshTarget {
    pub host: String,
    pub port: u16,
    pub user: Option<String>,
    pub key_file: Option<PathBuf>,
}

impl SshTarget {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            user: None,
            key_file: None,
        }
    }

    pub fn with_user(mut self, user: Option<String>) -> Self {
        self.user = user;
        self
    }

    pub fn with_key_file(mut self, key_file: Option<PathBuf>) -> Self {
        self.key_file = key_file;
        self
    }

    /// `user@host` or plain `host`
    pub fn destination(&self) -> String {
        match &self.user {
            Some(user) => format!("{}@{}", user, self.host),
            None => self.host.clone(),
        }
    }
}

/// Session multiplexed over an ssh control master
pub struct SshSession {
    target: SshTarget,
    control_dir: TempDir,
    command_timeout: Option<Duration>,
    transfer_timeout: Option<Duration>,
    open: bool,
}

impl SshSession {
    /// Authenticate and start the control master
    pub fn connect(
        target: SshTarget,
        command_timeout: Option<Duration>,
        transfer_timeout: Option<Duration>,
    ) -> Result<Self> {
        for tool in ["ssh", "scp"] {
            which::which(tool).map_err(|_| {
                Error::ConnectivityError(format!("'{}' not found in PATH", tool))
            })?;
        }

        if let Some(key) = &target.key_file
            && !key.is_file()
        {
            return Err(Error::ConnectivityError(format!(
                "Key file {} does not exist",
                key.display()
            )));
        }

        let control_dir = tempfile::Builder::new().prefix("podshift-ssh-").tempdir()?;
        let mut session = Self {
            target,
            control_dir,
            command_timeout,
            transfer_timeout,
            open: false,
        };

        info!(
            "Connecting to {} on port {}",
            session.target.destination(),
            session.target.port
        );

        // -f backgrounds the master after authentication, so password
        // prompts still reach the terminal
        let status = Command::new("ssh")
            .arg("-M")
            .arg("-S")
            .arg(session.control_path())
            .args(["-f", "-N", "-o", "ServerAliveInterval=30"])
            .args(session.auth_args("-p"))
            .arg(session.target.destination())
            .stdin(Stdio::inherit())
            .status()
            .map_err(|e| Error::ConnectivityError(format!("Failed to run ssh: {}", e)))?;

        if !status.success() {
            return Err(Error::ConnectivityError(format!(
                "Could not connect to {} on port {}",
                session.target.destination(),
                session.target.port
            )));
        }

        session.open = true;
        info!("Connected to {}", session.target.host);
        Ok(session)
    }

    fn control_path(&self) -> PathBuf {
        self.control_dir.path().join("control")
    }

    /// Port and identity arguments; ssh spells the port flag `-p`, scp `-P`
    fn auth_args(&self, port_flag: &str) -> Vec<String> {
        let mut args = vec![port_flag.to_string(), self.target.port.to_string()];
        if let Some(key) = &self.target.key_file {
            args.push("-i".to_string());
            args.push(key.display().to_string());
        }
        args
    }

    fn ensure_open(&self) -> Result<()> {
        if self.open {
            Ok(())
        } else {
            Err(Error::ConnectivityError("Session is closed".to_string()))
        }
    }

    /// Run `command` over the control connection with the given limit
    fn run_remote(&mut self, command: &str, timeout: Option<Duration>) -> Result<ExecOutput> {
        self.ensure_open()?;
        debug!("remote: {}", command);

        let mut cmd = Command::new("ssh");
        cmd.arg("-S")
            .arg(self.control_path())
            .args(self.auth_args("-p"))
            .arg(self.target.destination())
            .arg("--")
            .arg(command)
            .stdin(Stdio::null());

        let output = run_with_timeout(cmd, timeout).map_err(|e| match e {
            Error::IoError(msg) => Error::ConnectivityError(msg),
            other => other,
        })?;

        let Some(output) = output else {
            return Err(Error::command(
                command,
                format!(
                    "timed out after {} seconds",
                    timeout.map(|t| t.as_secs()).unwrap_or_default()
                ),
            ));
        };

        if output.exit_code == SSH_CONNECTION_FAILURE {
            return Err(Error::ConnectivityError(format!(
                "Lost connection to {}: {}",
                self.target.host,
                output.message()
            )));
        }

        if !output.stderr.trim().is_empty() {
            debug!("remote stderr: {}", output.stderr.trim());
        }
        Ok(output)
    }
}

impl RemoteSession for SshSession {
    fn exec(&mut self, command: &str) -> Result<ExecOutput> {
        self.run_remote(command, self.command_timeout)
    }

    fn exec_bulk(&mut self, command: &str) -> Result<ExecOutput> {
        self.run_remote(command, self.transfer_timeout)
    }

    fn transfer(&mut self, local_path: &Path) -> Result<()> {
        self.ensure_open()?;
        let path = local_path.display().to_string();

        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg} [{elapsed_precise}]")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.set_message(format!("Copying {}", path));
        spinner.enable_steady_tick(Duration::from_millis(120));

        let mut cmd = Command::new("scp");
        cmd.arg("-q")
            .arg("-o")
            .arg(format!("ControlPath={}", self.control_path().display()))
            .args(self.auth_args("-P"))
            .arg(local_path)
            .arg(format!("{}:{}", self.target.destination(), path))
            .stdin(Stdio::null());

        let result = run_with_timeout(cmd, self.transfer_timeout);
        spinner.finish_and_clear();

        match result {
            Ok(Some(output)) if output.success() => {
                info!("Copied {} to {}", path, self.target.host);
                Ok(())
            }
            Ok(Some(output)) => Err(Error::TransferError {
                path,
                message: output.message(),
            }),
            Ok(None) => Err(Error::TransferError {
                path,
                message: "timed out".to_string(),
            }),
            Err(e) => Err(Error::TransferError {
                path,
                message: e.to_string(),
            }),
        }
    }

    fn close(&mut self) -> Result<()> {
        if !self.open {
            return Ok(());
        }
        self.open = false;

        let output = Command::new("ssh")
            .arg("-S")
            .arg(self.control_path())
            .args(["-O", "exit"])
            .arg(self.target.destination())
            .stdin(Stdio::null())
            .output()?;

        if output.status.success() {
            info!("Closed connection to {}", self.target.host);
            Ok(())
        } else {
            Err(Error::ConnectivityError(format!(
                "Failed to close connection: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )))
        }
    }
}

impl Drop for SshSession {
    fn drop(&mut self) {
        if self.open
            && let Err(e) = self.close()
        {
            warn!("{}", e);
        }
    }
}

/// Run a command, killing it after `timeout`. `Ok(None)` means it timed out.
fn run_with_timeout(mut cmd: Command, timeout: Option<Duration>) -> Result<Option<ExecOutput>> {
    let mut child = cmd.stdout(Stdio::piped()).stderr(Stdio::piped()).spawn()?;

    // Drain both pipes while waiting so large output cannot block the child
    let stdout = drain(&mut child, true);
    let stderr = drain(&mut child, false);

    let status = match timeout {
        Some(limit) => match child.wait_timeout(limit)? {
            Some(status) => status,
            None => {
                let _ = child.kill();
                let _ = child.wait();
                return Ok(None);
            }
        },
        None => child.wait()?,
    };

    let stdout = stdout.join().unwrap_or_default();
    let stderr = stderr.join().unwrap_or_default();
    Ok(Some(ExecOutput::new(status.code().unwrap_or(-1), stdout, stderr)))
}

fn drain(child: &mut Child, stdout: bool) -> thread::JoinHandle<String> {
    let mut pipe: Option<Box<dyn Read + Send>> = if stdout {
        child.stdout.take().map(|p| Box::new(p) as Box<dyn Read + Send>)
    } else {
        child.stderr.take().map(|p| Box::new(p) as Box<dyn Read + Send>)
    };

    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(pipe) = pipe.as_mut() {
            let _ = pipe.read_to_end(&mut buf);
        }
        String::from_utf8_lossy(&buf).into_owned()
    })
}
