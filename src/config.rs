// src/config.rs

//! Migration configuration
//!
//! Settings that must match on both hosts (the migration, env and secret
//! directories) plus SSH, timing and batch-mode decisions.
//!
//! # Example config.toml
//!
//! ```toml
//! migrate_dir = "/srv/migrate"
//! env_dir = "/srv/container-env"
//! secret_dir = "/srv/secrets"
//! file_prefix = "migrate"
//!
//! [ssh]
//! use_key_file = true
//! key_dir = "/home/core/.ssh"
//!
//! [batch]
//! create_missing_networks = true
//! reuse_existing_secrets = true
//! ```

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// System-wide config location, checked after the per-user one
pub const SYSTEM_CONFIG_PATH: &str = "/etc/podshift/config.toml";

/// Default archive prefix
pub const DEFAULT_FILE_PREFIX: &str = "migrate";

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrateConfig {
    /// Staging directory for archives; must be the same path on both hosts
    #[serde(default)]
    pub migrate_dir: PathBuf,

    /// Directory holding container env files on both hosts
    #[serde(default)]
    pub env_dir: Option<PathBuf>,

    /// Directory holding secret files during migration
    #[serde(default)]
    pub secret_dir: Option<PathBuf>,

    /// Prefix for archive names (without trailing underscore)
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,

    /// Skip the disclaimer
    #[serde(default)]
    pub accept_disclaimer: bool,

    #[serde(default)]
    pub ssh: SshConfig,

    #[serde(default)]
    pub wait: WaitConfig,

    #[serde(default)]
    pub batch: BatchPolicy,
}

fn default_file_prefix() -> String {
    DEFAULT_FILE_PREFIX.to_string()
}

/// SSH connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SshConfig {
    /// Remote user; falls back to the ssh client's own configuration
    #[serde(default)]
    pub user: Option<String>,

    /// Require `--keyfile` and authenticate with it
    #[serde(default)]
    pub use_key_file: bool,

    /// Directory the `--keyfile` name is resolved against
    #[serde(default)]
    pub key_dir: Option<PathBuf>,

    /// Limit for a single remote command, 0 disables the limit.
    /// Image loads and volume imports fall under `transfer_timeout_secs`.
    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: u64,

    /// Limit for a single file transfer, or for loading/importing an
    /// archive on the destination; 0 disables the limit
    #[serde(default)]
    pub transfer_timeout_secs: u64,
}

fn default_command_timeout() -> u64 {
    1800
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            user: None,
            use_key_file: false,
            key_dir: None,
            command_timeout_secs: default_command_timeout(),
            transfer_timeout_secs: 0,
        }
    }
}

impl SshConfig {
    pub fn command_timeout(&self) -> Option<Duration> {
        (self.command_timeout_secs > 0).then(|| Duration::from_secs(self.command_timeout_secs))
    }

    pub fn transfer_timeout(&self) -> Option<Duration> {
        (self.transfer_timeout_secs > 0).then(|| Duration::from_secs(self.transfer_timeout_secs))
    }

    /// Resolve a `--keyfile` argument against `key_dir`
    pub fn key_path(&self, keyfile: &str) -> PathBuf {
        match &self.key_dir {
            Some(dir) => dir.join(keyfile),
            None => PathBuf::from(keyfile),
        }
    }
}

/// Seconds to wait after start before checking status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaitConfig {
    #[serde(default = "default_container_wait")]
    pub container_start_secs: u64,

    #[serde(default = "default_pod_wait")]
    pub pod_start_secs: u64,
}

fn default_container_wait() -> u64 {
    10
}

fn default_pod_wait() -> u64 {
    20
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            container_start_secs: default_container_wait(),
            pod_start_secs: default_pod_wait(),
        }
    }
}

/// Answers used in batch mode where nobody can be asked.
///
/// A decision left `false` turns the corresponding soft failure into a hard
/// failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchPolicy {
    #[serde(default)]
    pub reuse_existing_networks: bool,

    #[serde(default = "default_true")]
    pub create_missing_networks: bool,

    #[serde(default)]
    pub reuse_existing_secrets: bool,

    #[serde(default)]
    pub continue_without_secrets: bool,

    #[serde(default)]
    pub continue_with_nonempty_migrate_dir: bool,
}

fn default_true() -> bool {
    true
}

impl Default for BatchPolicy {
    fn default() -> Self {
        Self {
            reuse_existing_networks: false,
            create_missing_networks: true,
            reuse_existing_secrets: false,
            continue_without_secrets: false,
            continue_with_nonempty_migrate_dir: false,
        }
    }
}

impl MigrateConfig {
    /// Config with defaults around the given migration directory
    pub fn new(migrate_dir: impl Into<PathBuf>) -> Self {
        Self {
            migrate_dir: migrate_dir.into(),
            env_dir: None,
            secret_dir: None,
            file_prefix: default_file_prefix(),
            accept_disclaimer: false,
            ssh: SshConfig::default(),
            wait: WaitConfig::default(),
            batch: BatchPolicy::default(),
        }
    }

    /// Parse a config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::ConfigError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::parse(&content)
    }

    /// Parse config from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load the config from `explicit`, or the first file found in the
    /// default locations. Without any file, defaults are returned and
    /// `migrate_dir` must come from the command line.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        for candidate in default_locations() {
            if candidate.is_file() {
                debug!("Using config file {}", candidate.display());
                return Self::from_file(&candidate);
            }
        }

        debug!("No config file found, using defaults");
        Ok(Self::new(PathBuf::new()))
    }

    /// Check the settings a run depends on
    pub fn validate(&self) -> Result<()> {
        if self.migrate_dir.as_os_str().is_empty() {
            return Err(Error::ConfigError(
                "migrate_dir is not set (config file or --migrate-dir)".to_string(),
            ));
        }
        if !self.migrate_dir.is_dir() {
            return Err(Error::ConfigError(format!(
                "migrate_dir {} does not exist",
                self.migrate_dir.display()
            )));
        }
        if self.file_prefix.is_empty() {
            return Err(Error::ConfigError("file_prefix must not be empty".to_string()));
        }
        if self.file_prefix.ends_with('_') {
            return Err(Error::ConfigError(format!(
                "file_prefix '{}' must not end with '_'",
                self.file_prefix
            )));
        }
        Ok(())
    }

    /// Directories the operator has to clean up by hand after a run
    pub fn cleanup_dirs(&self) -> Vec<&Path> {
        let mut dirs = vec![self.migrate_dir.as_path()];
        if let Some(secret_dir) = &self.secret_dir {
            dirs.push(secret_dir.as_path());
        }
        dirs
    }
}

fn default_locations() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("podshift").join("config.toml"));
    }
    paths.push(PathBuf::from(SYSTEM_CONFIG_PATH));
    paths
}
