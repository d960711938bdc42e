// src/lib.rs

//! Podshift: move podman containers and pods to another host
//!
//! A job migrates one container, or a pod with all of its members, over a
//! single SSH session. Images, volumes, secrets, networks and env files are
//! synced idempotently; pod members are created in `--requires` order.
//!
//! # Architecture
//!
//! - `remote`: the SSH session every destination-side call goes through
//! - `engine`: typed podman queries and commands on both hosts
//! - `migrate`: pipeline, dependency scheduler, artifact sync and jobs
//! - `prompt`: operator decisions, interactive or from a batch policy
//! - `config`: TOML configuration shared by both hosts

pub mod config;
pub mod engine;
mod error;
pub mod migrate;
pub mod progress;
pub mod prompt;
pub mod remote;

pub use config::{BatchPolicy, MigrateConfig};
pub use engine::{ContainerRecord, CreateCommand, EngineAdapter, PodRecord, PodmanAdapter};
pub use error::{Error, Result};
pub use migrate::{
    ContainerDescriptor, ContainerJob, DependencyScheduler, EntityKind, JobReport,
    MigrationPipeline, MigrationSession, NetworkDecision, Outcome, PodJob, Status,
};
pub use progress::{LogProgress, SilentProgress, StepProgress};
pub use prompt::{Answer, Confirm, Decision, Mode, Prompter};
pub use remote::{ExecOutput, RemoteSession, SshSession, SshTarget};
