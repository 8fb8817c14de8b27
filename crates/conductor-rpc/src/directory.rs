//! Table of agent descriptors shared by the supervisor and the registry.

use std::collections::HashMap;

use tokio::sync::RwLock;

use conductor_models::{AgentDescriptor, AgentStatus};

/// In-memory descriptor table keyed by agent id.
#[derive(Debug, Default)]
pub struct AgentDirectory {
    agents: RwLock<HashMap<String, AgentDescriptor>>,
}

impl AgentDirectory {
    /// Creates an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets a descriptor by id.
    pub async fn get(&self, id: &str) -> Option<AgentDescriptor> {
        self.agents.read().await.get(id).cloned()
    }

    /// Returns true if a descriptor exists for `id`.
    pub async fn contains(&self, id: &str) -> bool {
        self.agents.read().await.contains_key(id)
    }

    /// Lists all descriptors ordered by id.
    pub async fn list(&self) -> Vec<AgentDescriptor> {
        let agents = self.agents.read().await;
        let mut list: Vec<AgentDescriptor> = agents.values().cloned().collect();
        list.sort_by(|a, b| a.id.cmp(&b.id));
        list
    }

    /// Inserts or replaces a descriptor, returning the previous one.
    pub async fn insert(&self, descriptor: AgentDescriptor) -> Option<AgentDescriptor> {
        let mut agents = self.agents.write().await;
        agents.insert(descriptor.id.clone(), descriptor)
    }

    /// Applies `f` to an existing descriptor and returns the updated copy.
    pub async fn update<F>(&self, id: &str, f: F) -> Option<AgentDescriptor>
    where
        F: FnOnce(&mut AgentDescriptor),
    {
        let mut agents = self.agents.write().await;
        agents.get_mut(id).map(|descriptor| {
            f(descriptor);
            descriptor.clone()
        })
    }

    /// Updates the descriptor for `id`, creating it with `create` first if
    /// it does not exist.
    pub async fn upsert<C, F>(&self, id: &str, create: C, f: F) -> AgentDescriptor
    where
        C: FnOnce() -> AgentDescriptor,
        F: FnOnce(&mut AgentDescriptor),
    {
        let mut agents = self.agents.write().await;
        let descriptor = agents.entry(id.to_string()).or_insert_with(create);
        f(descriptor);
        descriptor.clone()
    }

    /// Sets the status of an existing descriptor.
    pub async fn set_status(&self, id: &str, status: AgentStatus) -> bool {
        self.update(id, |d| d.status = status).await.is_some()
    }

    /// Removes a descriptor.
    pub async fn remove(&self, id: &str) -> Option<AgentDescriptor> {
        self.agents.write().await.remove(id)
    }

    /// Number of descriptors.
    pub async fn len(&self) -> usize {
        self.agents.read().await.len()
    }

    /// Returns true if the directory is empty.
    pub async fn is_empty(&self) -> bool {
        self.agents.read().await.is_empty()
    }

    /// Number of descriptors per status. Every status is present.
    pub async fn count_by_status(&self) -> Vec<(AgentStatus, usize)> {
        let agents = self.agents.read().await;
        AgentStatus::ALL
            .iter()
            .map(|status| {
                let count = agents.values().filter(|d| d.status == *status).count();
                (*status, count)
            })
            .collect()
    }
}
