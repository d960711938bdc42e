// src/migrate/sync.rs

//! Artifact synchronization
//!
//! Each method makes one kind of artifact (image, volume, secret, network,
//! env file) present on the destination. All of them are safe to call more
//! than once: images are compared by ID before anything is copied, existing
//! archives are reused, and network decisions are memoized in the
//! [`MigrationSession`].

use super::archive;
use super::{MigrationSession, NetworkDecision, NetworkRef, SecretRef, VolumeRef};
use crate::config::MigrateConfig;
use crate::engine::{CreateCommand, EngineAdapter};
use crate::error::{Error, Result};
use crate::prompt::{Answer, Decision, Prompter};
use std::path::PathBuf;
use tracing::{info, warn};

/// Result of an image sync
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSync {
    /// Destination already has the same image ID
    Unchanged,
    Transferred {
        archive: PathBuf,
        /// False when an archive from an earlier run was reused
        exported: bool,
    },
}

/// Result of an env file sync
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvSync {
    /// No env directory configured
    Disabled,
    /// The create command has no `--env-file`
    NotUsed,
    Synced { transferred: usize, already_present: usize },
}

/// A volume archive written to the migration directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeArchive {
    pub volume: VolumeRef,
    pub path: PathBuf,
}

/// Makes images, volumes, secrets, networks and env files available on the
/// destination
pub struct ArtifactSynchronizer<'a> {
    engine: &'a mut dyn EngineAdapter,
    prompter: &'a mut Prompter,
    config: &'a MigrateConfig,
    date: &'a str,
}

impl<'a> ArtifactSynchronizer<'a> {
    pub fn new(
        engine: &'a mut dyn EngineAdapter,
        prompter: &'a mut Prompter,
        config: &'a MigrateConfig,
        date: &'a str,
    ) -> Self {
        Self {
            engine,
            prompter,
            config,
            date,
        }
    }

    /// Copy an image unless the destination already has the same ID
    pub fn sync_image(&mut self, image: &str) -> Result<ImageSync> {
        let local_id = self.engine.local_image_id(image)?.ok_or_else(|| {
            Error::EngineQueryError(format!("image '{}' not found on the source host", image))
        })?;

        if self.engine.remote_image_id(image)?.as_deref() == Some(local_id.as_str()) {
            info!("Image {} is up to date on destination", image);
            return Ok(ImageSync::Unchanged);
        }

        let archive = archive::image_archive_path(
            &self.config.migrate_dir,
            &self.config.file_prefix,
            image,
            self.date,
        );

        let exported = if archive.is_file() {
            info!("Reusing image archive {}", archive.display());
            false
        } else {
            self.engine.save_image(image, &archive)?;
            true
        };

        self.engine.transfer(&archive)?;
        self.engine.remote_load_image(&archive)?;
        Ok(ImageSync::Transferred { archive, exported })
    }

    /// Export, transfer and import the volumes of `owner`.
    ///
    /// Volumes already synced in this session are skipped. Export and
    /// transfer failures are fatal; a failed import is logged.
    pub fn sync_volumes(
        &mut self,
        session: &mut MigrationSession,
        owner: &str,
        volumes: &[String],
    ) -> Result<Vec<VolumeArchive>> {
        let mut archives = Vec::new();
        for name in volumes {
            if session.is_volume_synced(name) {
                info!("Volume {} already synced in this run", name);
                continue;
            }
            let path = archive::volume_archive_path(
                &self.config.migrate_dir,
                &self.config.file_prefix,
                name,
                self.date,
            );
            self.engine.export_volume(name, &path)?;
            archives.push(VolumeArchive {
                volume: VolumeRef {
                    name: name.clone(),
                    owner: owner.to_string(),
                },
                path,
            });
        }

        for archive in &archives {
            self.engine.transfer(&archive.path)?;
        }

        for archive in &archives {
            if let Err(e) = self
                .engine
                .remote_import_volume(&archive.volume.name, &archive.path)
            {
                warn!(
                    "Could not import volume {} for {}: {}",
                    archive.volume.name, owner, e
                );
            }
            session.mark_volume_synced(&archive.volume.name);
        }

        Ok(archives)
    }

    /// Create the secrets `command` references on the destination
    pub fn sync_secrets(&mut self, owner: &str, command: &CreateCommand) -> Result<Vec<SecretRef>> {
        let names = command.secrets();
        if names.is_empty() {
            return Ok(Vec::new());
        }

        let Some(secret_dir) = self.config.secret_dir.clone() else {
            let prompt = format!(
                "'{}' uses secrets but no secret directory is configured. Continue without migrating secrets?",
                owner
            );
            self.require(Decision::ContinueWithoutSecrets, &prompt)?;
            warn!("Secrets of {} were not migrated", owner);
            return Ok(Vec::new());
        };

        let (present, missing): (Vec<_>, Vec<_>) = names
            .into_iter()
            .partition(|name| secret_dir.join(name).is_file());

        if !missing.is_empty() {
            let prompt = format!(
                "Secret files missing in {}: {}. Continue without them?",
                secret_dir.display(),
                missing.join(", ")
            );
            self.require(Decision::ContinueWithoutSecrets, &prompt)?;
            warn!("Skipping secrets without files: {}", missing.join(", "));
        }

        if present.is_empty() {
            return Ok(Vec::new());
        }

        if !self.engine.remote_dir_exists(&secret_dir)? {
            return Err(Error::ConfigError(format!(
                "secret directory {} does not exist on destination",
                secret_dir.display()
            )));
        }

        let mut synced = Vec::new();
        for name in present {
            let file = secret_dir.join(&name);
            self.engine.transfer(&file)?;

            match self.engine.remote_create_secret(&name, &file) {
                Ok(()) => {}
                Err(Error::ConflictError(_)) => {
                    let prompt = format!(
                        "Secret '{}' already exists on the destination. Use the existing secret?",
                        name
                    );
                    self.require(Decision::ReuseSecret, &prompt)?;
                    info!("Using existing secret {}", name);
                }
                Err(e) => return Err(e),
            }
            synced.push(SecretRef { name });
        }
        Ok(synced)
    }

    /// Make the network of the session's current entity available.
    ///
    /// Returns `None` when the entity uses no named network.
    pub fn sync_network(
        &mut self,
        session: &mut MigrationSession,
        owner: &str,
    ) -> Result<Option<NetworkRef>> {
        let command = session.current_create_command(owner).ok_or_else(|| {
            Error::EngineQueryError(format!("no create command loaded for '{}'", owner))
        })?;
        let Some(network) = command.network().map(str::to_string) else {
            info!("{} uses no named network", owner);
            return Ok(None);
        };

        if let Some(decision) = session.network_decision(&network) {
            info!("Network {} already handled in this run ({})", network, decision);
            return Ok(Some(NetworkRef {
                name: network,
                decision,
            }));
        }

        let decision = if self.engine.remote_network_exists(&network)? {
            let prompt = format!(
                "Network '{}' already exists on the destination. Use it for '{}'?",
                network, owner
            );
            self.require(Decision::ReuseNetwork, &prompt)?;
            NetworkDecision::UseExisting
        } else {
            let prompt = format!(
                "Network '{}' does not exist on the destination. Create it with default settings? \
                 (no: create it yourself before continuing)",
                network
            );
            match self.prompter.decide(Decision::CreateNetwork, &prompt) {
                Answer::Yes => {
                    self.engine.remote_create_network(&network)?;
                    NetworkDecision::Created
                }
                Answer::No => {
                    warn!("Network {} must be created manually on the destination", network);
                    NetworkDecision::SkippedManual
                }
                Answer::Unresolved => {
                    return Err(Error::Declined(format!(
                        "network '{}' is missing on the destination",
                        network
                    )));
                }
            }
        };

        session.remember_network(&network, decision);
        Ok(Some(NetworkRef {
            name: network,
            decision,
        }))
    }

    /// Copy the env files `command` references
    pub fn sync_env_files(&mut self, owner: &str, command: &CreateCommand) -> Result<EnvSync> {
        let files = command.env_files();
        if files.is_empty() {
            return Ok(EnvSync::NotUsed);
        }

        let Some(env_dir) = self.config.env_dir.as_deref() else {
            warn!(
                "{} uses env files but no env directory is configured, not syncing them",
                owner
            );
            return Ok(EnvSync::Disabled);
        };

        let mut transferred = 0;
        let mut already_present = 0;
        for file in files {
            if file.parent() != Some(env_dir) {
                return Err(Error::ConfigError(format!(
                    "env file {} is outside the env directory {}",
                    file.display(),
                    env_dir.display()
                )));
            }
            if !file.is_file() {
                return Err(Error::IoError(format!(
                    "env file {} does not exist",
                    file.display()
                )));
            }

            if self.engine.remote_file_exists(&file)? {
                warn!(
                    "Env file {} already exists on destination, leaving it unchanged",
                    file.display()
                );
                already_present += 1;
            } else {
                self.engine.transfer(&file)?;
                transferred += 1;
            }
        }

        Ok(EnvSync::Synced {
            transferred,
            already_present,
        })
    }

    /// Ask for a decision that must be "yes" to continue
    fn require(&mut self, decision: Decision, prompt: &str) -> Result<()> {
        if self.prompter.decide(decision, prompt).is_yes() {
            Ok(())
        } else {
            Err(Error::Declined(format!("{} was declined", decision)))
        }
    }
}
