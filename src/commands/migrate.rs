// src/commands/migrate.rs

//! Migrate command - move a container or pod to the destination host
//!
//! Loads and validates the config, shows the disclaimer, connects once and
//! runs the job. The session is closed on every exit path. A fatal error
//! prints the failure notice and is returned so the process exits with 1.

use crate::cli::RemoteArgs;
use anyhow::{Result, bail};
use podshift::migrate::{check_migrate_dir, end_message, failure_notice};
use podshift::{
    ContainerJob, EntityKind, JobReport, LogProgress, MigrateConfig, PodJob, PodmanAdapter,
    Prompter, SshSession, SshTarget, StepProgress,
};
use std::path::PathBuf;
use tracing::{info, warn};

/// Steps the command adds around the job itself
const COMMAND_STEPS: usize = 3;

const DISCLAIMER: &str = "\
This tool copies a container or pod to another host. Before continuing:
  - the container or pod is STOPPED on this host while its volumes are exported
  - the same migration folder (and env/secret folders) must exist on both hosts
  - archives in the migration folder are left in place for you to remove
  - nothing is deleted on this host; remove the source yourself once the
    destination is verified
Use at your own risk and keep backups of your volumes.";

/// Migrate a container or pod
pub fn cmd_migrate(kind: EntityKind, name: &str, args: &RemoteArgs) -> Result<()> {
    info!("Migrating {} {} to {}:{}", kind, name, args.dst, args.port);

    let mut config = MigrateConfig::load(args.config.as_deref())?;
    if let Some(dir) = &args.migrate_dir {
        config.migrate_dir = dir.clone();
    }
    if args.user.is_some() {
        config.ssh.user = args.user.clone();
    }
    config.validate()?;

    let podman = match which::which("podman") {
        Ok(path) => path,
        Err(_) => bail!("podman not found in PATH"),
    };

    let key_file = match (&args.keyfile, config.ssh.use_key_file) {
        (Some(keyfile), _) => Some(config.ssh.key_path(keyfile)),
        (None, true) => bail!("ssh.use_key_file is set, pass --keyfile"),
        (None, false) => None,
    };

    let mut prompter = if args.batch {
        Prompter::batch(config.batch.clone())
    } else {
        Prompter::interactive(config.batch.clone())
    };

    if !config.accept_disclaimer {
        if args.batch {
            bail!("--batch requires accept_disclaimer = true in the config file");
        }
        println!("{}\n", DISCLAIMER);
        if !prompter.ask("Do you want to continue?") {
            println!("Nothing was changed.");
            return Ok(());
        }
    }

    let job_steps = match kind {
        EntityKind::Container => ContainerJob::STEPS,
        EntityKind::Pod => PodJob::STEPS,
    };
    let progress = LogProgress::new(format!("{} {}", kind, name), job_steps + COMMAND_STEPS);

    let job = JobSetup {
        kind,
        name,
        podman,
        key_file,
    };
    match run_job(&job, args, &config, &mut prompter, &progress) {
        Ok(report) => {
            println!("{}", end_message(&config, &report));
            Ok(())
        }
        Err(e) => {
            progress.fail(&e.to_string());
            println!("{}", failure_notice(&config, kind, name));
            Err(e.into())
        }
    }
}

/// What `run_job` needs beyond the config
struct JobSetup<'a> {
    kind: EntityKind,
    name: &'a str,
    podman: PathBuf,
    key_file: Option<PathBuf>,
}

fn run_job(
    job: &JobSetup<'_>,
    args: &RemoteArgs,
    config: &MigrateConfig,
    prompter: &mut Prompter,
    progress: &dyn StepProgress,
) -> podshift::Result<JobReport> {
    progress.step("Check migration folder");
    check_migrate_dir(config, prompter)?;

    progress.step("Connect to destination");
    let target = SshTarget::new(&args.dst, args.port)
        .with_user(config.ssh.user.clone())
        .with_key_file(job.key_file.clone());
    let session = SshSession::connect(
        target,
        config.ssh.command_timeout(),
        config.ssh.transfer_timeout(),
    )?;
    let mut engine = PodmanAdapter::new(session).with_binary(job.podman.display().to_string());

    let result = match job.kind {
        EntityKind::Container => {
            ContainerJob::new(job.name, config, progress).run(&mut engine, prompter)
        }
        EntityKind::Pod => PodJob::new(job.name, config, progress).run(&mut engine, prompter),
    };

    progress.step("Close connection");
    if let Err(e) = engine.close() {
        warn!("{}", e);
    }
    result
}
