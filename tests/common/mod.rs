// tests/common/mod.rs

//! Shared test utilities: an in-memory engine for both hosts, scripted
//! operator answers, and throwaway migration directories.
//!
//! `FakeEngine::fail_on("<method>")` makes that adapter method return an
//! engine command error, for exercising the per-step failure policies.

#![allow(dead_code)]

use podshift::engine::{ContainerRecord, CreateCommand, EngineAdapter, PodRecord};
use podshift::{BatchPolicy, Error, MigrateConfig, Mode, Prompter, Result};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tempfile::TempDir;

/// Source and destination hosts held in memory.
///
/// Remote container creation enforces `--requires` the way podman does, so
/// creating a container before its requirements fails with an unmet
/// dependency.
#[derive(Debug, Default)]
pub struct FakeEngine {
    // source host
    pub local_containers: HashMap<String, ContainerRecord>,
    pub local_pods: HashMap<String, PodRecord>,
    pub local_images: HashMap<String, String>,

    // destination host
    pub remote_containers: Vec<String>,
    pub remote_pods: Vec<String>,
    pub remote_networks: HashSet<String>,
    pub remote_images: HashMap<String, String>,
    pub remote_files: HashSet<PathBuf>,
    pub remote_secrets: HashSet<String>,
    pub missing_remote_dirs: bool,
    pub started_pods: Vec<String>,
    /// Containers exit right after start
    pub start_exits: bool,
    pub failing: HashSet<String>,

    // call log
    pub create_attempts: Vec<String>,
    pub created: Vec<String>,
    pub transfers: Vec<PathBuf>,
    pub saved_images: HashMap<PathBuf, String>,
    pub exports: Vec<String>,
    pub imports: Vec<(String, PathBuf)>,
    pub image_queries: Vec<String>,
    pub network_checks: usize,
    pub networks_created: Vec<String>,
    pub stopped: Vec<String>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the adapter method `op` fail from now on
    pub fn fail_on(&mut self, op: &str) {
        self.failing.insert(op.to_string());
    }

    fn check(&self, op: &str) -> Result<()> {
        if self.failing.contains(op) {
            return Err(Error::command(op, "simulated failure"));
        }
        Ok(())
    }

    /// Register a source container and its image
    pub fn add_container(&mut self, record: ContainerRecord) {
        self.local_images
            .entry(record.image.clone())
            .or_insert_with(|| format!("sha256:{}", record.image));
        self.local_containers.insert(record.name.clone(), record);
    }

    /// Register a source pod and its member containers
    pub fn add_pod(&mut self, name: &str, pod_args: &[&str], members: Vec<ContainerRecord>) {
        let mut args = vec!["podman", "pod", "create", "--name", name];
        args.extend_from_slice(pod_args);

        let pod = PodRecord {
            id: format!("{}-id", name),
            name: name.to_string(),
            create_command: CreateCommand::from_args(&args),
            members: members.iter().map(|m| m.name.clone()).collect(),
            volumes: Vec::new(),
        };
        for mut member in members {
            member.pod_id = Some(pod.id.clone());
            self.add_container(member);
        }
        self.local_pods.insert(name.to_string(), pod);
    }
}

impl EngineAdapter for FakeEngine {
    fn local_container(&mut self, name: &str) -> Result<Option<ContainerRecord>> {
        Ok(self.local_containers.get(name).cloned())
    }

    fn local_pod(&mut self, name_or_id: &str) -> Result<Option<PodRecord>> {
        Ok(self
            .local_pods
            .values()
            .find(|p| p.name == name_or_id || p.id == name_or_id)
            .cloned())
    }

    fn local_image_id(&mut self, image: &str) -> Result<Option<String>> {
        Ok(self.local_images.get(image).cloned())
    }

    fn export_volume(&mut self, volume: &str, archive: &Path) -> Result<()> {
        self.check("export_volume")?;
        fs::write(archive, volume.as_bytes())?;
        self.exports.push(volume.to_string());
        Ok(())
    }

    fn save_image(&mut self, image: &str, archive: &Path) -> Result<()> {
        fs::write(archive, image.as_bytes())?;
        self.saved_images.insert(archive.to_path_buf(), image.to_string());
        Ok(())
    }

    fn stop_container(&mut self, name: &str) -> Result<()> {
        self.check("stop_container")?;
        self.stopped.push(name.to_string());
        Ok(())
    }

    fn stop_pod(&mut self, name: &str) -> Result<()> {
        self.check("stop_pod")?;
        self.stopped.push(name.to_string());
        Ok(())
    }

    fn remote_container_exists(&mut self, name: &str) -> Result<bool> {
        Ok(self.remote_containers.iter().any(|c| c == name))
    }

    fn remote_pod_exists(&mut self, name: &str) -> Result<bool> {
        Ok(self.remote_pods.iter().any(|p| p == name))
    }

    fn remote_network_exists(&mut self, name: &str) -> Result<bool> {
        self.network_checks += 1;
        Ok(self.remote_networks.contains(name))
    }

    fn remote_image_id(&mut self, image: &str) -> Result<Option<String>> {
        self.image_queries.push(image.to_string());
        Ok(self.remote_images.get(image).cloned())
    }

    fn remote_file_exists(&mut self, path: &Path) -> Result<bool> {
        Ok(self.remote_files.contains(path))
    }

    fn remote_dir_exists(&mut self, _path: &Path) -> Result<bool> {
        Ok(!self.missing_remote_dirs)
    }

    fn remote_create_network(&mut self, name: &str) -> Result<()> {
        self.remote_networks.insert(name.to_string());
        self.networks_created.push(name.to_string());
        Ok(())
    }

    fn remote_create_container(&mut self, name: &str, command: &CreateCommand) -> Result<()> {
        self.create_attempts.push(name.to_string());
        if self.remote_containers.iter().any(|c| c == name) {
            return Err(Error::command("podman create", "name is already in use"));
        }

        let missing: Vec<String> = command
            .requires()
            .into_iter()
            .filter(|r| !self.remote_containers.contains(r))
            .collect();
        if let Some(first) = missing.first() {
            return Err(Error::UnmetDependencyError {
                container: name.to_string(),
                message: format!(
                    "\"{}\" is not a valid container, cannot be used as a dependency",
                    first
                ),
            });
        }

        self.remote_containers.push(name.to_string());
        self.created.push(name.to_string());
        Ok(())
    }

    fn remote_create_pod(&mut self, name: &str, _command: &CreateCommand) -> Result<()> {
        self.remote_pods.push(name.to_string());
        Ok(())
    }

    fn remote_create_secret(&mut self, name: &str, _file: &Path) -> Result<()> {
        self.check("remote_create_secret")?;
        if !self.remote_secrets.insert(name.to_string()) {
            return Err(Error::ConflictError(format!("secret '{}' already exists", name)));
        }
        Ok(())
    }

    fn remote_init_container(&mut self, _name: &str) -> Result<()> {
        self.check("remote_init_container")
    }

    fn remote_start_container(&mut self, _name: &str) -> Result<()> {
        self.check("remote_start_container")
    }

    fn remote_container_running(&mut self, name: &str) -> Result<bool> {
        self.check("remote_container_running")?;
        Ok(!self.start_exits && self.remote_containers.iter().any(|c| c == name))
    }

    fn remote_start_pod(&mut self, name: &str) -> Result<()> {
        self.check("remote_start_pod")?;
        self.started_pods.push(name.to_string());
        Ok(())
    }

    fn remote_pod_state(&mut self, name: &str) -> Result<String> {
        if self.started_pods.iter().any(|p| p == name) {
            Ok("Running".to_string())
        } else {
            Ok("Created".to_string())
        }
    }

    fn remote_import_volume(&mut self, volume: &str, archive: &Path) -> Result<()> {
        self.check("remote_import_volume")?;
        self.imports.push((volume.to_string(), archive.to_path_buf()));
        Ok(())
    }

    fn remote_load_image(&mut self, archive: &Path) -> Result<()> {
        self.check("remote_load_image")?;
        let image = self
            .saved_images
            .get(archive)
            .cloned()
            .ok_or_else(|| Error::command("podman image load", "no such archive"))?;
        let id = self.local_images.get(&image).cloned().unwrap_or_default();
        self.remote_images.insert(image, id);
        Ok(())
    }

    fn transfer(&mut self, path: &Path) -> Result<()> {
        self.check("transfer")?;
        self.transfers.push(path.to_path_buf());
        Ok(())
    }
}

/// Source container created with `podman run -d --name <name> <extra> <image>`
pub fn container(name: &str, image: &str, extra: &[&str]) -> ContainerRecord {
    let mut args = vec!["podman", "run", "-d", "--name", name];
    args.extend_from_slice(extra);
    args.push(image);

    ContainerRecord {
        id: format!("{}-id", name),
        name: name.to_string(),
        image: image.to_string(),
        pod_id: None,
        create_command: CreateCommand::from_args(&args),
        volumes: Vec::new(),
    }
}

/// Config around a fresh migration directory, without start waits.
///
/// Keep the TempDir alive for the duration of the test.
pub fn test_config() -> (TempDir, MigrateConfig) {
    let dir = tempfile::tempdir().unwrap();
    let mut config = MigrateConfig::new(dir.path());
    config.wait.container_start_secs = 0;
    config.wait.pod_start_secs = 0;
    (dir, config)
}

/// Interactive prompter that answers from `answers` in order (then "no")
/// and records every prompt it was shown
pub fn scripted_prompter(answers: Vec<bool>) -> (Prompter, Rc<RefCell<Vec<String>>>) {
    let prompts = Rc::new(RefCell::new(Vec::new()));
    let seen = Rc::clone(&prompts);
    let mut answers = answers.into_iter();

    let confirm = move |prompt: &str| {
        seen.borrow_mut().push(prompt.to_string());
        answers.next().unwrap_or(false)
    };
    (
        Prompter::new(Mode::Interactive, Box::new(confirm), BatchPolicy::default()),
        prompts,
    )
}

/// Batch prompter with the default policy
pub fn batch_prompter() -> Prompter {
    Prompter::batch(BatchPolicy::default())
}
