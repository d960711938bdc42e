// src/migrate/session.rs

//! State shared by every step of one migration job

use super::{ContainerDescriptor, NetworkDecision};
use crate::engine::CreateCommand;
use std::collections::{HashMap, HashSet};

/// Containers still waiting to be migrated, in discovery order
#[derive(Debug, Default)]
pub struct RequirementQueue {
    items: Vec<ContainerDescriptor>,
}

impl RequirementQueue {
    pub fn new(items: Vec<ContainerDescriptor>) -> Self {
        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.items.iter().any(|c| c.name == name)
    }

    pub fn names(&self) -> Vec<String> {
        self.items.iter().map(|c| c.name.clone()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&ContainerDescriptor> {
        self.items.iter().find(|c| c.name == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut ContainerDescriptor> {
        self.items.iter_mut().find(|c| c.name == name)
    }

    /// Remove the container with exactly this name, returning its position
    pub fn take(&mut self, name: &str) -> Option<(usize, ContainerDescriptor)> {
        let index = self.items.iter().position(|c| c.name == name)?;
        Some((index, self.items.remove(index)))
    }

    /// Queue a container behind the others
    pub fn push(&mut self, descriptor: ContainerDescriptor) {
        self.items.push(descriptor);
    }

    /// Put a container back where `take` found it
    pub fn restore(&mut self, index: usize, descriptor: ContainerDescriptor) {
        let index = index.min(self.items.len());
        self.items.insert(index, descriptor);
    }

    pub fn iter(&self) -> impl Iterator<Item = &ContainerDescriptor> {
        self.items.iter()
    }
}

/// Job-wide state: the container being worked on, network decisions already
/// made, and the queue of containers still to migrate
#[derive(Debug, Default)]
pub struct MigrationSession {
    current: Option<(String, CreateCommand)>,
    networks: HashMap<String, NetworkDecision>,
    queue: RequirementQueue,
    prepared: HashSet<String>,
    synced_volumes: HashSet<String>,
}

impl MigrationSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `name` the entity whose create command steps read
    pub fn set_current(&mut self, name: &str, command: &CreateCommand) {
        self.current = Some((name.to_string(), command.clone()));
    }

    /// Create command of the current entity; `None` if `name` is not it
    pub fn current_create_command(&self, name: &str) -> Option<&CreateCommand> {
        match &self.current {
            Some((current, command)) if current == name => Some(command),
            _ => None,
        }
    }

    pub fn network_decision(&self, network: &str) -> Option<NetworkDecision> {
        self.networks.get(network).copied()
    }

    /// Record a network decision. The first decision for a network stands.
    pub fn remember_network(&mut self, network: &str, decision: NetworkDecision) {
        self.networks.entry(network.to_string()).or_insert(decision);
    }

    pub fn networks(&self) -> &HashMap<String, NetworkDecision> {
        &self.networks
    }

    pub fn queue(&self) -> &RequirementQueue {
        &self.queue
    }

    pub fn queue_mut(&mut self) -> &mut RequirementQueue {
        &mut self.queue
    }

    /// True once a container's pre-create steps have succeeded
    pub fn is_prepared(&self, name: &str) -> bool {
        self.prepared.contains(name)
    }

    pub fn mark_prepared(&mut self, name: &str) {
        self.prepared.insert(name.to_string());
    }

    pub fn is_volume_synced(&self, volume: &str) -> bool {
        self.synced_volumes.contains(volume)
    }

    pub fn mark_volume_synced(&mut self, volume: &str) {
        self.synced_volumes.insert(volume.to_string());
    }
}
