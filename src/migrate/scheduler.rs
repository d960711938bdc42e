// src/migrate/scheduler.rs

//! Dependency-ordered migration of pod members
//!
//! Podman refuses to create a container whose `--requires` targets do not
//! exist yet, so pod members have to reach the destination in dependency
//! order. The scheduler works in passes over the [`RequirementQueue`]:
//!
//! 1. requirements already present on the destination are dropped
//! 2. a requirement that is itself queued is migrated first, directly
//! 3. a container with no requirements left is migrated
//!
//! A pass that migrates nothing ends the run with `NoProgressError`, which
//! is what a dependency cycle or a requirement outside the pod produces.
//!
//! [`RequirementQueue`]: super::RequirementQueue

use super::{ContainerDescriptor, Invocation, MigrationPipeline, MigrationSession, Outcome};
use crate::error::{Error, Result};
use tracing::{debug, info, warn};

/// What the scheduler did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScheduleReport {
    /// Containers in the order they were migrated
    pub order: Vec<String>,
    pub passes: usize,
}

#[derive(Debug, Default)]
pub struct DependencyScheduler;

impl DependencyScheduler {
    pub fn new() -> Self {
        Self
    }

    /// Migrate every container, honoring `requires`
    pub fn run(
        &self,
        pipeline: &mut MigrationPipeline<'_>,
        session: &mut MigrationSession,
        containers: Vec<ContainerDescriptor>,
    ) -> Result<ScheduleReport> {
        for container in containers {
            session.queue_mut().push(container);
        }

        let mut report = ScheduleReport::default();
        while !session.queue().is_empty() {
            report.passes += 1;
            let before = session.queue().len();
            debug!("Scheduler pass {} with {} containers queued", report.passes, before);

            for name in session.queue().names() {
                // migrated earlier in this pass as someone's requirement
                if !session.queue().contains(&name) {
                    continue;
                }

                self.resolve_requirements(pipeline, session, &name, &mut report)?;

                let ready = session
                    .queue()
                    .get(&name)
                    .is_some_and(|c| c.requires.is_empty());
                if ready {
                    self.attempt(pipeline, session, &name, &mut report)?;
                }
            }

            if session.queue().len() >= before {
                return Err(Error::NoProgressError(describe_stuck(session)));
            }
        }

        info!(
            "All {} containers migrated in {} passes",
            report.order.len(),
            report.passes
        );
        Ok(report)
    }

    /// Drop requirements that are satisfied, migrating queued ones first
    fn resolve_requirements(
        &self,
        pipeline: &mut MigrationPipeline<'_>,
        session: &mut MigrationSession,
        name: &str,
        report: &mut ScheduleReport,
    ) -> Result<()> {
        let requires: Vec<String> = match session.queue().get(name) {
            Some(c) => c.requires.iter().cloned().collect(),
            None => return Ok(()),
        };

        for required in requires {
            let satisfied = if pipeline.engine().remote_container_exists(&required)? {
                debug!("{}: requirement {} exists on destination", name, required);
                true
            } else if required != name && session.queue().contains(&required) {
                info!("{} requires {}, migrating it first", name, required);
                self.attempt(pipeline, session, &required, report)? == Outcome::Migrated
            } else {
                warn!(
                    "{} requires {}, which is neither on the destination nor waiting in this pod",
                    name, required
                );
                false
            };

            if satisfied && let Some(container) = session.queue_mut().get_mut(name) {
                container.requires.remove(&required);
            }
        }
        Ok(())
    }

    /// Run the pipeline for one queued container. On success it leaves the
    /// queue; on an unmet dependency it goes back to its old position.
    fn attempt(
        &self,
        pipeline: &mut MigrationPipeline<'_>,
        session: &mut MigrationSession,
        name: &str,
        report: &mut ScheduleReport,
    ) -> Result<Outcome> {
        let Some((index, mut descriptor)) = session.queue_mut().take(name) else {
            return Err(Error::EngineQueryError(format!(
                "container '{}' is not queued",
                name
            )));
        };

        let outcome = pipeline.migrate(session, &mut descriptor, Invocation::Scheduled)?;
        match &outcome {
            Outcome::Migrated => report.order.push(descriptor.name),
            Outcome::UnmetDependency(_) => session.queue_mut().restore(index, descriptor),
        }
        Ok(outcome)
    }
}

fn describe_stuck(session: &MigrationSession) -> String {
    session
        .queue()
        .iter()
        .map(|c| {
            if c.requires.is_empty() {
                format!("{} (blocked on destination)", c.name)
            } else {
                let requires: Vec<&str> = c.requires.iter().map(String::as_str).collect();
                format!("{} (requires {})", c.name, requires.join(", "))
            }
        })
        .collect::<Vec<_>>()
        .join("; ")
}
