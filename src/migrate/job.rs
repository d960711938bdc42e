// src/migrate/job.rs

//! Container and pod jobs
//!
//! A job is one CLI invocation's worth of work against an already connected
//! engine. Connecting and disconnecting belong to the caller; the job only
//! reports its own steps through [`StepProgress`].

use super::{
    ContainerDescriptor, DependencyScheduler, Invocation, MigrationPipeline, MigrationSession,
    NetworkRef, Outcome, PodDescriptor,
};
use crate::config::MigrateConfig;
use crate::engine::EngineAdapter;
use crate::error::{Error, Result};
use crate::progress::StepProgress;
use crate::prompt::{Decision, Prompter};
use std::fs;
use std::thread;
use std::time::Duration;
use strum_macros::Display;
use tracing::{info, warn};

/// What a job migrates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum EntityKind {
    Container,
    Pod,
}

/// Summary of a finished job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobReport {
    pub kind: EntityKind,
    pub name: String,
    /// Containers in the order they were migrated
    pub migrated: Vec<String>,
    pub networks: Vec<NetworkRef>,
    /// Pod state after start, pod jobs only
    pub pod_state: Option<String>,
}

impl JobReport {
    fn new(kind: EntityKind, name: &str) -> Self {
        Self {
            kind,
            name: name.to_string(),
            migrated: Vec::new(),
            networks: Vec::new(),
            pod_state: None,
        }
    }
}

/// Ask before reusing a migration directory that already holds files
pub fn check_migrate_dir(config: &MigrateConfig, prompter: &mut Prompter) -> Result<()> {
    let entries = fs::read_dir(&config.migrate_dir)
        .map_err(|e| {
            Error::ConfigError(format!(
                "Cannot read migrate_dir {}: {}",
                config.migrate_dir.display(),
                e
            ))
        })?
        .count();

    if entries == 0 {
        return Ok(());
    }

    let prompt = format!(
        "The migration folder {} contains {} entries. Files with the same name will be reused. Continue?",
        config.migrate_dir.display(),
        entries
    );
    if prompter
        .decide(Decision::ContinueWithNonEmptyMigrateDir, &prompt)
        .is_yes()
    {
        warn!("Continuing with non-empty migration folder");
        Ok(())
    } else {
        Err(Error::Declined(format!(
            "migration folder {} is not empty",
            config.migrate_dir.display()
        )))
    }
}

/// Text shown after a successful job
pub fn end_message(config: &MigrateConfig, report: &JobReport) -> String {
    let mut msg = format!("\nMigration of {} '{}' is done.\n", report.kind, report.name);
    if report.kind == EntityKind::Pod && report.migrated.len() > 1 {
        msg.push_str(&format!("Containers migrated: {}\n", report.migrated.join(", ")));
    }
    if let Some(state) = &report.pod_state {
        msg.push_str(&format!("Pod state on destination: {}\n", state));
    }
    msg.push_str(&format!(
        "The {} still exists on this host (stopped). Remove it when the destination is verified.\n",
        report.kind
    ));
    msg.push_str("Clean up these folders on both hosts:\n");
    for dir in config.cleanup_dirs() {
        msg.push_str(&format!("  {}\n", dir.display()));
    }
    msg
}

/// Text shown after a fatal error
pub fn failure_notice(config: &MigrateConfig, kind: EntityKind, name: &str) -> String {
    let mut msg = format!(
        "\nMigration of {} '{}' failed. The {} on this host was left in place.\n",
        kind, name, kind
    );
    msg.push_str("Check these folders on both hosts and clean up what was copied:\n");
    for dir in config.cleanup_dirs() {
        msg.push_str(&format!("  {}\n", dir.display()));
    }
    msg
}

/// Migrates a single container that is not part of a pod
pub struct ContainerJob<'a> {
    name: String,
    config: &'a MigrateConfig,
    progress: &'a dyn StepProgress,
}

impl<'a> ContainerJob<'a> {
    pub const STEPS: usize = 2;

    pub fn new(
        name: impl Into<String>,
        config: &'a MigrateConfig,
        progress: &'a dyn StepProgress,
    ) -> Self {
        Self {
            name: name.into(),
            config,
            progress,
        }
    }

    pub fn run(
        &self,
        engine: &mut dyn EngineAdapter,
        prompter: &mut Prompter,
    ) -> Result<JobReport> {
        let mut report = JobReport::new(EntityKind::Container, &self.name);

        self.progress.step("Inspect container on source");
        let record = engine.local_container(&self.name)?.ok_or_else(|| {
            Error::EngineQueryError(format!(
                "container '{}' does not exist on this host",
                self.name
            ))
        })?;
        if let Some(pod_id) = &record.pod_id {
            let pod = engine
                .local_pod(pod_id)?
                .map(|p| p.name)
                .unwrap_or_else(|| pod_id.clone());
            return Err(Error::EngineQueryError(format!(
                "container '{}' belongs to pod '{}'; migrate the pod instead",
                self.name, pod
            )));
        }
        let mut descriptor = ContainerDescriptor::from(record);

        self.progress.step("Migrate container");
        let mut session = MigrationSession::new();
        let mut pipeline = MigrationPipeline::new(engine, prompter, self.config);
        match pipeline.migrate(&mut session, &mut descriptor, Invocation::Standalone)? {
            Outcome::Migrated => report.migrated.push(descriptor.name.clone()),
            Outcome::UnmetDependency(msg) => {
                return Err(Error::UnmetDependencyError {
                    container: descriptor.name.clone(),
                    message: msg,
                });
            }
        }

        report.networks = collect_networks(&session);
        self.progress.finish(&format!("container {} migrated", self.name));
        Ok(report)
    }
}

/// Migrates a pod and all of its member containers
pub struct PodJob<'a> {
    name: String,
    config: &'a MigrateConfig,
    progress: &'a dyn StepProgress,
}

impl<'a> PodJob<'a> {
    pub const STEPS: usize = 9;

    pub fn new(
        name: impl Into<String>,
        config: &'a MigrateConfig,
        progress: &'a dyn StepProgress,
    ) -> Self {
        Self {
            name: name.into(),
            config,
            progress,
        }
    }

    pub fn run(
        &self,
        engine: &mut dyn EngineAdapter,
        prompter: &mut Prompter,
    ) -> Result<JobReport> {
        let mut report = JobReport::new(EntityKind::Pod, &self.name);

        self.progress.step("Inspect pod on source");
        let pod = self.describe(engine)?;
        info!(
            "Pod {} has {} containers: {}",
            pod.name,
            pod.containers.len(),
            pod.containers
                .iter()
                .map(|c| c.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );

        let mut session = MigrationSession::new();
        let mut pipeline = MigrationPipeline::new(engine, prompter, self.config);

        self.progress.step("Verify pod is absent on destination");
        if pipeline.engine().remote_pod_exists(&pod.name)? {
            return Err(Error::ConflictError(format!(
                "pod '{}' already exists on destination",
                pod.name
            )));
        }

        self.progress.step("Sync pod network");
        session.set_current(&pod.name, &pod.create_command);
        if let Some(network) = pipeline.synchronizer().sync_network(&mut session, &pod.name)? {
            info!("Network {}: {}", network.name, network.decision);
        }

        self.progress.step("Prepare pod containers");
        for container in &pod.containers {
            pipeline.prepare(&mut session, container)?;
        }

        self.progress.step("Create pod on destination");
        pipeline
            .engine()
            .remote_create_pod(&pod.name, &pod.create_command)?;

        self.progress.step("Stop pod on source");
        match pipeline.engine().stop_pod(&pod.name) {
            Ok(()) => info!("Stopped pod {} on source", pod.name),
            Err(e) => info!("Pod {} was not stopped on source: {}", pod.name, e),
        }

        self.progress.step("Sync pod volumes");
        pipeline
            .synchronizer()
            .sync_volumes(&mut session, &pod.name, &pod.volumes)?;

        self.progress.step("Migrate pod containers");
        let schedule = DependencyScheduler::new().run(&mut pipeline, &mut session, pod.containers)?;
        report.migrated = schedule.order;

        self.progress.step("Start pod on destination");
        report.pod_state = self.start_pod(pipeline.engine(), &pod.name);

        report.networks = collect_networks(&session);
        self.progress.finish(&format!("pod {} migrated", self.name));
        Ok(report)
    }

    fn describe(&self, engine: &mut dyn EngineAdapter) -> Result<PodDescriptor> {
        let record = engine.local_pod(&self.name)?.ok_or_else(|| {
            Error::EngineQueryError(format!("pod '{}' does not exist on this host", self.name))
        })?;

        let mut containers = Vec::with_capacity(record.members.len());
        for member in &record.members {
            let container = engine.local_container(member)?.ok_or_else(|| {
                Error::EngineQueryError(format!(
                    "container '{}' of pod '{}' disappeared",
                    member, self.name
                ))
            })?;
            containers.push(ContainerDescriptor::from(container));
        }
        Ok(PodDescriptor::new(record, containers))
    }

    fn start_pod(&self, engine: &mut dyn EngineAdapter, name: &str) -> Option<String> {
        if let Err(e) = engine.remote_start_pod(name) {
            warn!("Could not start pod {} on destination: {}", name, e);
            return None;
        }

        let wait = Duration::from_secs(self.config.wait.pod_start_secs);
        if !wait.is_zero() {
            info!("Waiting {}s for pod {} to start", wait.as_secs(), name);
            thread::sleep(wait);
        }

        match engine.remote_pod_state(name) {
            Ok(state) => {
                match state.as_str() {
                    "Running" => info!("Pod {} is running on destination", name),
                    "Degraded" => {
                        warn!("Pod {} is degraded: some containers are not running", name)
                    }
                    other => warn!("Pod {} is {} on destination", name, other),
                }
                Some(state)
            }
            Err(e) => {
                warn!("Could not check state of pod {}: {}", name, e);
                None
            }
        }
    }
}

fn collect_networks(session: &MigrationSession) -> Vec<NetworkRef> {
    let mut networks: Vec<NetworkRef> = session
        .networks()
        .iter()
        .map(|(name, decision)| NetworkRef {
            name: name.clone(),
            decision: *decision,
        })
        .collect();
    networks.sort_by(|a, b| a.name.cmp(&b.name));
    networks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BatchPolicy;

    #[test]
    fn test_check_migrate_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = MigrateConfig::new(dir.path());
        let mut prompter = Prompter::batch(BatchPolicy::default());

        assert!(check_migrate_dir(&config, &mut prompter).is_ok());

        fs::write(dir.path().join("leftover.tar"), b"x").unwrap();
        let err = check_migrate_dir(&config, &mut prompter).unwrap_err();
        assert!(matches!(err, Error::Declined(_)));

        let mut prompter = Prompter::batch(BatchPolicy {
            continue_with_nonempty_migrate_dir: true,
            ..BatchPolicy::default()
        });
        assert!(check_migrate_dir(&config, &mut prompter).is_ok());
    }

    #[test]
    fn test_messages_list_cleanup_dirs() {
        let mut config = MigrateConfig::new("/srv/migrate");
        config.secret_dir = Some("/srv/secrets".into());

        let notice = failure_notice(&config, EntityKind::Pod, "app");
        assert!(notice.contains("pod 'app' failed"));
        assert!(notice.contains("/srv/migrate"));
        assert!(notice.contains("/srv/secrets"));

        let mut report = JobReport::new(EntityKind::Container, "web");
        report.migrated.push("web".to_string());
        let msg = end_message(&config, &report);
        assert!(msg.contains("container 'web' is done"));
        assert!(msg.contains("still exists on this host"));
    }
}
