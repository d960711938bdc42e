// src/engine/mod.rs

//! Container engine adapter
//!
//! The migration core never builds engine command lines. It asks an
//! [`EngineAdapter`] typed questions about the source host ("what volumes
//! does this container use?") and the destination host ("does this network
//! exist?"), and tells it what to do. [`PodmanAdapter`] answers them with the
//! local `podman` binary and remote `podman` over a [`RemoteSession`].
//!
//! [`RemoteSession`]: crate::remote::RemoteSession

mod create_command;
mod podman;

pub use create_command::CreateCommand;
pub use podman::PodmanAdapter;

use crate::error::Result;
use std::path::Path;

/// Source-side view of a container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerRecord {
    pub id: String,
    pub name: String,
    /// Image reference the container was created from
    pub image: String,
    /// ID of the owning pod, if any
    pub pod_id: Option<String>,
    pub create_command: CreateCommand,
    /// Named volumes mounted into the container
    pub volumes: Vec<String>,
}

/// Source-side view of a pod
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodRecord {
    pub id: String,
    pub name: String,
    pub create_command: CreateCommand,
    /// Member container names, infra container excluded
    pub members: Vec<String>,
    /// Named volumes mounted at pod level
    pub volumes: Vec<String>,
}

/// Operations the migration needs from a container engine.
///
/// `local_*` methods act on the source host, `remote_*` methods on the
/// destination. Existence checks return `Ok(false)`/`Ok(None)` for absent
/// entities and reserve `Err` for failures to ask.
pub trait EngineAdapter {
    // Source host

    fn local_container(&mut self, name: &str) -> Result<Option<ContainerRecord>>;

    /// Look up a pod by name or ID
    fn local_pod(&mut self, name_or_id: &str) -> Result<Option<PodRecord>>;

    fn local_image_id(&mut self, image: &str) -> Result<Option<String>>;

    fn export_volume(&mut self, volume: &str, archive: &Path) -> Result<()>;

    fn save_image(&mut self, image: &str, archive: &Path) -> Result<()>;

    fn stop_container(&mut self, name: &str) -> Result<()>;

    fn stop_pod(&mut self, name: &str) -> Result<()>;

    // Destination host

    fn remote_container_exists(&mut self, name: &str) -> Result<bool>;

    fn remote_pod_exists(&mut self, name: &str) -> Result<bool>;

    fn remote_network_exists(&mut self, name: &str) -> Result<bool>;

    fn remote_image_id(&mut self, image: &str) -> Result<Option<String>>;

    fn remote_file_exists(&mut self, path: &Path) -> Result<bool>;

    fn remote_dir_exists(&mut self, path: &Path) -> Result<bool>;

    fn remote_create_network(&mut self, name: &str) -> Result<()>;

    /// Create (not start) a container from its original create command.
    ///
    /// Fails with `UnmetDependencyError` when a `--requires` target is
    /// missing on the destination.
    fn remote_create_container(&mut self, name: &str, command: &CreateCommand) -> Result<()>;

    fn remote_create_pod(&mut self, name: &str, command: &CreateCommand) -> Result<()>;

    /// Create a secret from a file already on the destination.
    ///
    /// Fails with `ConflictError` when the secret name is taken.
    fn remote_create_secret(&mut self, name: &str, file: &Path) -> Result<()>;

    fn remote_init_container(&mut self, name: &str) -> Result<()>;

    fn remote_start_container(&mut self, name: &str) -> Result<()>;

    fn remote_container_running(&mut self, name: &str) -> Result<bool>;

    fn remote_start_pod(&mut self, name: &str) -> Result<()>;

    /// Engine-reported pod state ("Running", "Degraded", ...)
    fn remote_pod_state(&mut self, name: &str) -> Result<String>;

    fn remote_import_volume(&mut self, volume: &str, archive: &Path) -> Result<()>;

    fn remote_load_image(&mut self, archive: &Path) -> Result<()>;

    /// Copy a local file to the same path on the destination
    fn transfer(&mut self, path: &Path) -> Result<()>;
}
