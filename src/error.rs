// src/error.rs

//! Error types for podshift
//!
//! Every failure a migration can hit maps onto one variant here. Whether a
//! variant ends the run is decided by the step that produced it, not by the
//! variant itself: an `UnmetDependencyError` during pod scheduling is retried,
//! while the same remote failure in a single-container job is fatal.

use thiserror::Error;

/// Errors produced by the migration engine
#[derive(Error, Debug)]
pub enum Error {
    /// The remote session could not be established or was lost
    #[error("Connection error: {0}")]
    ConnectivityError(String),

    /// An expected entity or field was missing from an engine response
    #[error("Engine query error: {0}")]
    EngineQueryError(String),

    /// An engine command exited non-zero
    #[error("Engine command failed ({command}): {message}")]
    EngineCommandError { command: String, message: String },

    /// The entity already exists on the destination
    #[error("Conflict: {0}")]
    ConflictError(String),

    /// The destination refused to create a container because a container it
    /// requires does not exist there yet
    #[error("Unmet dependency for container '{container}': {message}")]
    UnmetDependencyError { container: String, message: String },

    /// A scheduler pass finished without migrating anything
    #[error("No progress resolving container dependencies: {0}")]
    NoProgressError(String),

    /// The operator (or the batch policy) chose not to continue
    #[error("Migration halted: {0}")]
    Declined(String),

    /// A file could not be copied to the destination
    #[error("Transfer failed for {path}: {message}")]
    TransferError { path: String, message: String },

    /// Invalid or missing configuration
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Local filesystem or process error
    #[error("I/O error: {0}")]
    IoError(String),
}

impl Error {
    /// Shorthand for a failed engine command
    pub fn command(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::EngineCommandError {
            command: command.into(),
            message: message.into(),
        }
    }

    /// True when the failure only means "try again once dependencies exist"
    pub fn is_unmet_dependency(&self) -> bool {
        matches!(self, Self::UnmetDependencyError { .. })
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::IoError(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Self::ConfigError(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::EngineQueryError(format!("Unexpected engine output: {}", err))
    }
}

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, Error>;
