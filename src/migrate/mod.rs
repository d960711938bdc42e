// src/migrate/mod.rs

//! Migration core
//!
//! Moves a container, or a pod with all of its member containers, from the
//! local host to a destination host:
//!
//! - `sync`: idempotent image, volume, secret, network and env-file sync
//! - `pipeline`: the ordered per-container steps
//! - `scheduler`: orders pod members by their `--requires` dependencies
//! - `session`: state shared by all steps of one job
//! - `job`: the container and pod jobs built from the above

pub mod archive;
mod job;
mod pipeline;
mod scheduler;
mod session;
mod sync;

pub use job::{
    ContainerJob, EntityKind, JobReport, PodJob, check_migrate_dir, end_message, failure_notice,
};
pub use pipeline::{Invocation, MigrationPipeline};
pub use scheduler::{DependencyScheduler, ScheduleReport};
pub use session::{MigrationSession, RequirementQueue};
pub use sync::{ArtifactSynchronizer, EnvSync, ImageSync, VolumeArchive};

use crate::engine::{ContainerRecord, CreateCommand, PodRecord};
use crate::error::{Error, Result};
use std::collections::BTreeSet;
use strum_macros::Display;

/// Migration status of one container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Status {
    Pending,
    InProgress,
    Migrated,
    /// Waiting for a required container to exist on the destination
    Blocked,
}

/// A container selected for migration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerDescriptor {
    pub name: String,
    pub image: String,
    pub create_command: CreateCommand,
    /// Containers that must exist on the destination before this one can be
    /// created; shrinks as they are found there
    pub requires: BTreeSet<String>,
    pub volumes: Vec<String>,
    pub status: Status,
}

impl ContainerDescriptor {
    pub fn new(
        name: impl Into<String>,
        image: impl Into<String>,
        create_command: CreateCommand,
        volumes: Vec<String>,
    ) -> Self {
        let requires = create_command.requires();
        Self {
            name: name.into(),
            image: image.into(),
            create_command,
            requires,
            volumes,
            status: Status::Pending,
        }
    }

    /// Start an attempt. A migrated container is never migrated again.
    pub fn begin(&mut self) -> Result<()> {
        match self.status {
            Status::Pending | Status::Blocked => {
                self.status = Status::InProgress;
                Ok(())
            }
            Status::InProgress => Err(Error::ConflictError(format!(
                "container '{}' is already being migrated",
                self.name
            ))),
            Status::Migrated => Err(Error::ConflictError(format!(
                "container '{}' was already migrated",
                self.name
            ))),
        }
    }

    pub fn complete(&mut self) {
        self.status = Status::Migrated;
    }

    pub fn block(&mut self) {
        self.status = Status::Blocked;
    }
}

impl From<ContainerRecord> for ContainerDescriptor {
    fn from(record: ContainerRecord) -> Self {
        Self::new(record.name, record.image, record.create_command, record.volumes)
    }
}

/// A pod selected for migration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodDescriptor {
    pub name: String,
    pub create_command: CreateCommand,
    /// Member containers, infra container excluded
    pub containers: Vec<ContainerDescriptor>,
    /// Pod-level volumes
    pub volumes: Vec<String>,
}

impl PodDescriptor {
    pub fn new(record: PodRecord, containers: Vec<ContainerDescriptor>) -> Self {
        Self {
            name: record.name,
            create_command: record.create_command,
            containers,
            volumes: record.volumes,
        }
    }
}

/// A named volume and the container or pod it belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeRef {
    pub name: String,
    pub owner: String,
}

/// A secret a container consumes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretRef {
    pub name: String,
}

/// How a network was made available on the destination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum NetworkDecision {
    #[strum(serialize = "use existing")]
    UseExisting,
    #[strum(serialize = "created")]
    Created,
    /// The operator declined creation and will create it by hand
    #[strum(serialize = "skipped, manual")]
    SkippedManual,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkRef {
    pub name: String,
    pub decision: NetworkDecision,
}

/// Result of one pipeline run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Migrated,
    /// Creation was refused because a required container is missing; the
    /// container stays queued
    UnmetDependency(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor() -> ContainerDescriptor {
        ContainerDescriptor::new(
            "web",
            "nginx",
            CreateCommand::from_args(&[
                "podman",
                "run",
                "--name",
                "web",
                "--requires",
                "db,cache",
                "nginx",
            ]),
            vec![],
        )
    }

    #[test]
    fn test_requires_from_create_command() {
        let d = descriptor();
        assert_eq!(d.requires.len(), 2);
        assert_eq!(d.status, Status::Pending);
    }

    #[test]
    fn test_status_transitions() {
        let mut d = descriptor();
        d.begin().unwrap();
        assert_eq!(d.status, Status::InProgress);
        assert!(d.begin().is_err());

        d.block();
        d.begin().unwrap();
        d.complete();
        assert_eq!(d.status, Status::Migrated);
        assert!(d.begin().is_err());
    }
}
