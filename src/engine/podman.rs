// src/engine/podman.rs

//! Podman implementation of [`EngineAdapter`]
//!
//! Source-host queries run the local `podman` binary and parse its JSON
//! inspect output. Destination-host operations are sent as shell command
//! lines through the job's [`RemoteSession`].

use super::{ContainerRecord, CreateCommand, EngineAdapter, PodRecord};
use crate::error::{Error, Result};
use crate::remote::{ExecOutput, RemoteSession, shell_join};
use serde::Deserialize;
use std::path::Path;
use std::process::Command;
use tracing::{debug, info, warn};

/// Marker podman prints when a `--requires` target is missing
const UNMET_DEPENDENCY_MARKER: &str = "cannot be used as a dependency";
const SECRET_IN_USE_MARKER: &str = "secret name in use";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ContainerInspect {
    id: String,
    name: String,
    #[serde(default)]
    image_name: String,
    #[serde(default)]
    pod: String,
    #[serde(default)]
    config: ContainerConfig,
    #[serde(default)]
    mounts: Vec<Mount>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ContainerConfig {
    #[serde(default)]
    create_command: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Mount {
    #[serde(rename = "Type", default)]
    kind: String,
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PodInspect {
    id: String,
    name: String,
    #[serde(default)]
    create_command: Vec<String>,
    #[serde(rename = "InfraContainerID", default)]
    infra_container_id: String,
    #[serde(default)]
    containers: Vec<PodMember>,
    #[serde(default, alias = "mounts")]
    mounts: Vec<Mount>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PodMember {
    id: String,
    name: String,
}

fn volume_names(mounts: &[Mount]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for mount in mounts {
        if mount.kind == "volume" && !mount.name.is_empty() && !names.contains(&mount.name) {
            names.push(mount.name.clone());
        }
    }
    names
}

/// Parse `podman container inspect` output (a one-element array)
pub(crate) fn parse_container_inspect(json: &str) -> Result<Option<ContainerRecord>> {
    let mut items: Vec<ContainerInspect> = serde_json::from_str(json)?;
    if items.is_empty() {
        return Ok(None);
    }
    let item = items.remove(0);

    Ok(Some(ContainerRecord {
        id: item.id,
        name: item.name,
        image: item.image_name,
        pod_id: (!item.pod.is_empty()).then_some(item.pod),
        volumes: volume_names(&item.mounts),
        create_command: CreateCommand::new(item.config.create_command),
    }))
}

/// Parse `podman pod inspect` output; podman 4 prints an object, podman 5
/// an array
pub(crate) fn parse_pod_inspect(json: &str) -> Result<Option<PodRecord>> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    let item: PodInspect = match value {
        serde_json::Value::Array(mut items) => {
            if items.is_empty() {
                return Ok(None);
            }
            serde_json::from_value(items.remove(0))?
        }
        other => serde_json::from_value(other)?,
    };

    let members = item
        .containers
        .into_iter()
        .filter(|c| c.id != item.infra_container_id)
        .map(|c| c.name)
        .collect();

    Ok(Some(PodRecord {
        id: item.id,
        name: item.name,
        create_command: CreateCommand::new(item.create_command),
        members,
        volumes: volume_names(&item.mounts),
    }))
}

fn is_not_found(output: &ExecOutput) -> bool {
    let stderr = output.stderr.to_lowercase();
    stderr.contains("no such") || stderr.contains("not found")
}

/// Podman engine over a remote session
pub struct PodmanAdapter<S: RemoteSession> {
    session: S,
    binary: String,
}

impl<S: RemoteSession> PodmanAdapter<S> {
    pub fn new(session: S) -> Self {
        Self {
            session,
            binary: "podman".to_string(),
        }
    }

    /// Use a different local podman binary
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    #[cfg(test)]
    fn session_mut(&mut self) -> &mut S {
        &mut self.session
    }

    /// Close the remote session
    pub fn close(&mut self) -> Result<()> {
        self.session.close()
    }

    fn local(&self, args: &[&str]) -> Result<ExecOutput> {
        debug!("local: {} {}", self.binary, args.join(" "));
        let output = Command::new(&self.binary).args(args).output().map_err(|e| {
            Error::EngineQueryError(format!(
                "Failed to run {}: {}. Is podman installed?",
                self.binary, e
            ))
        })?;

        Ok(ExecOutput::new(
            output.status.code().unwrap_or(-1),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr),
        ))
    }

    fn local_run(&self, args: &[&str]) -> Result<ExecOutput> {
        let output = self.local(args)?;
        if output.success() {
            Ok(output)
        } else {
            Err(Error::command(
                format!("{} {}", self.binary, args.join(" ")),
                output.message(),
            ))
        }
    }

    fn remote(&mut self, args: &[&str]) -> Result<ExecOutput> {
        self.session.exec(&shell_join(args))
    }

    fn remote_run(&mut self, args: &[&str]) -> Result<ExecOutput> {
        let command = shell_join(args);
        let output = self.session.exec(&command)?;
        if output.success() {
            Ok(output)
        } else {
            Err(Error::command(command, output.message()))
        }
    }

    /// Like `remote_run`, for commands that read a whole archive
    fn remote_run_bulk(&mut self, args: &[&str]) -> Result<ExecOutput> {
        let command = shell_join(args);
        let output = self.session.exec_bulk(&command)?;
        if output.success() {
            Ok(output)
        } else {
            Err(Error::command(command, output.message()))
        }
    }

    /// Exit 0 means present, 1 means absent, anything else is a failure
    fn remote_check(&mut self, args: &[&str]) -> Result<bool> {
        let command = shell_join(args);
        let output = self.session.exec(&command)?;
        match output.exit_code {
            0 => Ok(true),
            1 => Ok(false),
            _ => Err(Error::EngineQueryError(format!(
                "{}: {}",
                command,
                output.message()
            ))),
        }
    }
}

impl<S: RemoteSession> EngineAdapter for PodmanAdapter<S> {
    fn local_container(&mut self, name: &str) -> Result<Option<ContainerRecord>> {
        let output = self.local(&["container", "inspect", name])?;
        if !output.success() {
            if is_not_found(&output) {
                return Ok(None);
            }
            return Err(Error::EngineQueryError(format!(
                "Failed to inspect container '{}': {}",
                name,
                output.message()
            )));
        }
        parse_container_inspect(&output.stdout)
    }

    fn local_pod(&mut self, name_or_id: &str) -> Result<Option<PodRecord>> {
        let output = self.local(&["pod", "inspect", name_or_id])?;
        if !output.success() {
            if is_not_found(&output) {
                return Ok(None);
            }
            return Err(Error::EngineQueryError(format!(
                "Failed to inspect pod '{}': {}",
                name_or_id,
                output.message()
            )));
        }
        parse_pod_inspect(&output.stdout)
    }

    fn local_image_id(&mut self, image: &str) -> Result<Option<String>> {
        let output = self.local(&["image", "inspect", "--format", "{{.Id}}", image])?;
        Ok(output
            .success()
            .then(|| output.text().to_string())
            .filter(|id| !id.is_empty()))
    }

    fn export_volume(&mut self, volume: &str, archive: &Path) -> Result<()> {
        let archive = archive.display().to_string();
        self.local_run(&["volume", "export", volume, "--output", &archive])?;
        info!("Exported volume {} to {}", volume, archive);
        Ok(())
    }

    fn save_image(&mut self, image: &str, archive: &Path) -> Result<()> {
        let archive = archive.display().to_string();
        self.local_run(&["image", "save", "--output", &archive, image])?;
        info!("Saved image {} to {}", image, archive);
        Ok(())
    }

    fn stop_container(&mut self, name: &str) -> Result<()> {
        self.local_run(&["container", "stop", name])?;
        Ok(())
    }

    fn stop_pod(&mut self, name: &str) -> Result<()> {
        self.local_run(&["pod", "stop", name])?;
        Ok(())
    }

    fn remote_container_exists(&mut self, name: &str) -> Result<bool> {
        self.remote_check(&["podman", "container", "exists", name])
    }

    fn remote_pod_exists(&mut self, name: &str) -> Result<bool> {
        self.remote_check(&["podman", "pod", "exists", name])
    }

    fn remote_network_exists(&mut self, name: &str) -> Result<bool> {
        self.remote_check(&["podman", "network", "exists", name])
    }

    fn remote_image_id(&mut self, image: &str) -> Result<Option<String>> {
        let output = self.remote(&["podman", "image", "inspect", "--format", "{{.Id}}", image])?;
        Ok(output
            .success()
            .then(|| output.text().to_string())
            .filter(|id| !id.is_empty()))
    }

    fn remote_file_exists(&mut self, path: &Path) -> Result<bool> {
        let path = path.display().to_string();
        self.remote_check(&["test", "-f", &path])
    }

    fn remote_dir_exists(&mut self, path: &Path) -> Result<bool> {
        let path = path.display().to_string();
        self.remote_check(&["test", "-d", &path])
    }

    fn remote_create_network(&mut self, name: &str) -> Result<()> {
        self.remote_run(&["podman", "network", "create", name])?;
        info!("Created network {} on destination", name);
        Ok(())
    }

    fn remote_create_container(&mut self, name: &str, command: &CreateCommand) -> Result<()> {
        let line = command.to_remote();
        let output = self.session.exec(&line)?;
        if output.success() {
            info!("Created container {} on destination", name);
            return Ok(());
        }

        let message = output.message();
        if message.contains(UNMET_DEPENDENCY_MARKER) {
            return Err(Error::UnmetDependencyError {
                container: name.to_string(),
                message,
            });
        }
        Err(Error::command(line, message))
    }

    fn remote_create_pod(&mut self, name: &str, command: &CreateCommand) -> Result<()> {
        let line = command.to_remote();
        let output = self.session.exec(&line)?;
        if !output.success() {
            return Err(Error::command(line, output.message()));
        }
        info!("Created pod {} on destination", name);
        Ok(())
    }

    fn remote_create_secret(&mut self, name: &str, file: &Path) -> Result<()> {
        let file = file.display().to_string();
        let command = shell_join(["podman", "secret", "create", name, &file]);
        let output = self.session.exec(&command)?;
        if output.success() {
            info!("Created secret {} on destination", name);
            return Ok(());
        }

        let message = output.message();
        if message.to_lowercase().contains(SECRET_IN_USE_MARKER) {
            return Err(Error::ConflictError(format!(
                "secret '{}' already exists on destination",
                name
            )));
        }
        Err(Error::command(command, message))
    }

    fn remote_init_container(&mut self, name: &str) -> Result<()> {
        self.remote_run(&["podman", "container", "init", name])?;
        Ok(())
    }

    fn remote_start_container(&mut self, name: &str) -> Result<()> {
        self.remote_run(&["podman", "container", "start", name])?;
        Ok(())
    }

    fn remote_container_running(&mut self, name: &str) -> Result<bool> {
        let output = self.remote_run(&[
            "podman",
            "container",
            "inspect",
            "--format",
            "{{.State.Running}}",
            name,
        ])?;
        Ok(output.text() == "true")
    }

    fn remote_start_pod(&mut self, name: &str) -> Result<()> {
        let output = self.remote(&["podman", "pod", "start", name])?;
        if !output.success() {
            // podman reports partial starts as errors; the pod state is
            // checked afterwards
            warn!("podman pod start {}: {}", name, output.message());
        }
        Ok(())
    }

    fn remote_pod_state(&mut self, name: &str) -> Result<String> {
        let output =
            self.remote_run(&["podman", "pod", "inspect", "--format", "{{.State}}", name])?;
        Ok(output.text().to_string())
    }

    fn remote_import_volume(&mut self, volume: &str, archive: &Path) -> Result<()> {
        let archive = archive.display().to_string();
        // import needs an existing volume; create fails harmlessly if it is there
        let created = self.remote(&["podman", "volume", "create", "--ignore", volume])?;
        if !created.success() {
            debug!("volume create {}: {}", volume, created.message());
        }
        self.remote_run_bulk(&["podman", "volume", "import", volume, &archive])?;
        info!("Imported volume {} on destination", volume);
        Ok(())
    }

    fn remote_load_image(&mut self, archive: &Path) -> Result<()> {
        let archive = archive.display().to_string();
        self.remote_run_bulk(&["podman", "image", "load", "--input", &archive])?;
        info!("Loaded image archive {} on destination", archive);
        Ok(())
    }

    fn transfer(&mut self, path: &Path) -> Result<()> {
        self.session.transfer(path)
    }
}
