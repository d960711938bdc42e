// src/migrate/pipeline.rs

//! Per-container migration pipeline
//!
//! Steps, in order, with what a failure means:
//!
//! 1. verify the container is absent on the destination (fatal)
//! 2. sync its network (operator decision)
//! 3. sync its env files (fatal)
//! 4. sync its image (fatal)
//! 5. sync its secrets (operator decision)
//! 6. create it on the destination (fatal, unless scheduled and the only
//!    problem is a missing required container)
//! 7. initialize it on the destination (logged)
//! 8. stop it on the source (logged)
//! 9. sync its volumes (fatal on export/transfer, logged on import)
//! 10. start it on the destination and check it is running (logged)
//!
//! Steps 1-5 run once per container per session; a container retried after
//! an unmet dependency, or prepared up front by a pod job, resumes at
//! step 6.

use super::archive;
use super::{ArtifactSynchronizer, ContainerDescriptor, MigrationSession, Outcome};
use crate::config::MigrateConfig;
use crate::engine::EngineAdapter;
use crate::error::{Error, Result};
use crate::prompt::Prompter;
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Who is running the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Invocation {
    /// A single-container job; every create failure is fatal
    Standalone,
    /// The dependency scheduler; an unmet dependency is reported back
    Scheduled,
}

/// Runs the migration steps for one container at a time
pub struct MigrationPipeline<'a> {
    engine: &'a mut dyn EngineAdapter,
    prompter: &'a mut Prompter,
    config: &'a MigrateConfig,
    date: String,
    start_wait: Duration,
}

impl<'a> MigrationPipeline<'a> {
    pub fn new(
        engine: &'a mut dyn EngineAdapter,
        prompter: &'a mut Prompter,
        config: &'a MigrateConfig,
    ) -> Self {
        Self {
            engine,
            prompter,
            config,
            date: archive::date_stamp(),
            start_wait: Duration::from_secs(config.wait.container_start_secs),
        }
    }

    /// Override the archive date stamp
    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = date.into();
        self
    }

    pub fn engine(&mut self) -> &mut dyn EngineAdapter {
        &mut *self.engine
    }

    pub fn prompter(&mut self) -> &mut Prompter {
        &mut *self.prompter
    }

    pub fn config(&self) -> &MigrateConfig {
        self.config
    }

    /// Synchronizer sharing this pipeline's engine and prompter
    pub fn synchronizer(&mut self) -> ArtifactSynchronizer<'_> {
        ArtifactSynchronizer::new(&mut *self.engine, &mut *self.prompter, self.config, &self.date)
    }

    /// Migrate one container
    pub fn migrate(
        &mut self,
        session: &mut MigrationSession,
        descriptor: &mut ContainerDescriptor,
        invocation: Invocation,
    ) -> Result<Outcome> {
        descriptor.begin()?;
        let name = descriptor.name.clone();
        info!("Migrating container {}", name);
        self.prepare(session, descriptor)?;

        match self
            .engine
            .remote_create_container(&name, &descriptor.create_command)
        {
            Ok(()) => {}
            Err(e) if e.is_unmet_dependency() && invocation == Invocation::Scheduled => {
                info!("{} is waiting for a required container: {}", name, e);
                descriptor.block();
                return Ok(Outcome::UnmetDependency(e.to_string()));
            }
            Err(e) => return Err(e),
        }

        if let Err(e) = self.engine.remote_init_container(&name) {
            warn!("Could not initialize {} on destination: {}", name, e);
        }

        match self.engine.stop_container(&name) {
            Ok(()) => info!("Stopped {} on source", name),
            Err(e) => info!("{} was not stopped on source: {}", name, e),
        }

        let volumes = descriptor.volumes.clone();
        self.synchronizer().sync_volumes(session, &name, &volumes)?;

        self.start(&name);

        descriptor.complete();
        info!("Container {} migrated", name);
        Ok(Outcome::Migrated)
    }

    /// Steps 1-5, run at most once per container per session.
    ///
    /// Pod jobs call this for every member before the source pod is
    /// stopped; `migrate` then resumes at create.
    pub fn prepare(
        &mut self,
        session: &mut MigrationSession,
        descriptor: &ContainerDescriptor,
    ) -> Result<()> {
        let name = descriptor.name.as_str();
        if session.is_prepared(name) {
            debug!("{} is already prepared", name);
            return Ok(());
        }
        session.set_current(name, &descriptor.create_command);

        if self.engine.remote_container_exists(name)? {
            return Err(Error::ConflictError(format!(
                "container '{}' already exists on destination",
                name
            )));
        }

        let mut sync = self.synchronizer();
        if let Some(network) = sync.sync_network(session, name)? {
            info!("Network {}: {}", network.name, network.decision);
        }
        sync.sync_env_files(name, &descriptor.create_command)?;
        sync.sync_image(&descriptor.image)?;
        sync.sync_secrets(name, &descriptor.create_command)?;
        session.mark_prepared(name);
        Ok(())
    }

    fn start(&mut self, name: &str) {
        if let Err(e) = self.engine.remote_start_container(name) {
            warn!("Could not start {} on destination: {}", name, e);
            return;
        }

        if !self.start_wait.is_zero() {
            info!("Waiting {}s for {} to start", self.start_wait.as_secs(), name);
            thread::sleep(self.start_wait);
        }

        match self.engine.remote_container_running(name) {
            Ok(true) => info!("{} is running on destination", name),
            Ok(false) => warn!("{} is not running on destination", name),
            Err(e) => warn!("Could not check status of {}: {}", name, e),
        }
    }
}
