//! The name-keyed agent catalog.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, RwLock};

use crate::descriptor::{AgentDescriptor, AgentProfile, AgentSummary};
use crate::error::{Error, Result};

/// Immutable catalog of agent descriptors.
///
/// Built once from a list of descriptors; there is no way to add or remove
/// an agent afterwards. Reloading means building a new registry and swapping
/// it into a [`SharedRegistry`].
///
/// # Example
///
/// ```
/// use relay_registry::{AgentDescriptor, AgentRegistry};
///
/// let registry = AgentRegistry::from_descriptors(vec![
///     AgentDescriptor::new("argent", "node"),
///     AgentDescriptor::new("swap", "node"),
/// ])
/// .unwrap();
/// assert!(registry.contains("argent"));
/// assert!(registry.lookup("braavos").is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct AgentRegistry {
    agents: BTreeMap<String, AgentDescriptor>,
}

impl AgentRegistry {
    /// Build a registry, failing on the first duplicate or invalid descriptor.
    pub fn from_descriptors<I>(descriptors: I) -> Result<Self>
    where
        I: IntoIterator<Item = AgentDescriptor>,
    {
        let mut agents = BTreeMap::new();
        for descriptor in descriptors {
            descriptor.validate()?;
            if agents.contains_key(&descriptor.name) {
                return Err(Error::DuplicateAgent {
                    name: descriptor.name,
                });
            }
            agents.insert(descriptor.name.clone(), descriptor);
        }
        tracing::debug!(count = agents.len(), "Agent registry loaded");
        Ok(Self { agents })
    }

    /// Look up a descriptor by name.
    pub fn lookup(&self, name: &str) -> Option<&AgentDescriptor> {
        self.agents.get(name)
    }

    /// Like [`AgentRegistry::lookup`] but with an error for unknown names.
    pub fn get(&self, name: &str) -> Result<&AgentDescriptor> {
        self.lookup(name)
            .ok_or_else(|| Error::UnknownAgent(name.to_string()))
    }

    /// All agent names, sorted.
    pub fn names(&self) -> BTreeSet<String> {
        self.agents.keys().cloned().collect()
    }

    /// Whether an agent with this exact name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.agents.contains_key(name)
    }

    /// Description and prompt metadata for one agent.
    pub fn describe(&self, name: &str) -> Option<AgentProfile> {
        self.lookup(name).map(AgentDescriptor::profile)
    }

    /// Summaries of every agent, in name order.
    pub fn catalog(&self) -> Vec<AgentSummary> {
        self.agents.values().map(AgentDescriptor::summary).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AgentDescriptor> {
        self.agents.values()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

/// Process-wide handle to the current registry.
///
/// Readers take an `Arc` snapshot that stays valid for as long as they hold
/// it; [`SharedRegistry::replace`] installs a new catalog without touching
/// snapshots already handed out.
#[derive(Debug, Clone, Default)]
pub struct SharedRegistry {
    current: Arc<RwLock<Arc<AgentRegistry>>>,
}

impl SharedRegistry {
    pub fn new(registry: AgentRegistry) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(registry))),
        }
    }

    /// The registry as of now.
    pub fn snapshot(&self) -> Arc<AgentRegistry> {
        let guard = self
            .current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(&guard)
    }

    /// Swap in a new registry, returning the previous one.
    pub fn replace(&self, registry: AgentRegistry) -> Arc<AgentRegistry> {
        let mut guard = self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        tracing::info!(count = registry.len(), "Agent registry replaced");
        std::mem::replace(&mut *guard, Arc::new(registry))
    }
}
