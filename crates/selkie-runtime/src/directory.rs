//! Agent instance directory
//!
//! Owns the factories registered per agent type and the live instances
//! created from them. Instances come into being on first reference and
//! stay resident until shutdown. TigerStyle: one critical section covers
//! lookup, construction, and insert, so at most one instance ever exists
//! per id.

use selkie_core::agent::{Agent, AgentId};
use selkie_core::error::{Error, Result};
use selkie_core::metrics;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Factory constructing an agent instance for an id
///
/// Factories run inside the directory's critical section and must not call
/// back into the runtime.
pub type AgentFactory = Box<dyn Fn(AgentId) -> Result<Arc<dyn Agent>> + Send + Sync>;

/// A live instance plus its optional delivery gate
#[derive(Clone)]
pub(crate) struct AgentEntry {
    pub(crate) agent: Arc<dyn Agent>,
    /// Present when the runtime serializes deliveries per instance
    pub(crate) delivery_gate: Option<Arc<tokio::sync::Mutex<()>>>,
}

impl std::fmt::Debug for AgentEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentEntry")
            .field("agent", &self.agent.id())
            .field("delivery_gate", &self.delivery_gate.is_some())
            .finish()
    }
}

/// Factories and live instances for one runtime
pub struct AgentDirectory {
    factories: Mutex<HashMap<String, AgentFactory>>,
    instances: Mutex<HashMap<AgentId, AgentEntry>>,
    max_instances_count: usize,
    serialize_delivery: bool,
}

impl AgentDirectory {
    /// Create an empty directory
    pub fn new(max_instances_count: usize, serialize_delivery: bool) -> Self {
        Self {
            factories: Mutex::new(HashMap::new()),
            instances: Mutex::new(HashMap::new()),
            max_instances_count,
            serialize_delivery,
        }
    }

    /// Register the factory for an agent type
    ///
    /// # Errors
    /// Returns `Error::InvalidAgentId` for a malformed type name and
    /// `Error::AgentTypeExists` if the type already has a factory.
    pub fn register_factory(
        &self,
        agent_type: impl Into<String>,
        factory: AgentFactory,
    ) -> Result<()> {
        let agent_type = agent_type.into();
        AgentId::validate_agent_type(&agent_type)?;

        let mut factories = self.factories.lock().unwrap();
        if factories.contains_key(&agent_type) {
            return Err(Error::AgentTypeExists { agent_type });
        }

        debug!(agent_type = %agent_type, "Agent type registered");
        factories.insert(agent_type, factory);
        Ok(())
    }

    /// True if a factory exists for the type
    pub fn has_factory(&self, agent_type: &str) -> bool {
        self.factories.lock().unwrap().contains_key(agent_type)
    }

    /// Locate the instance for `id`, constructing it on first reference
    ///
    /// # Errors
    /// Returns `Error::UnknownAgentType` if no factory covers the id's
    /// type, `Error::AgentLimitExceeded` at the instance cap, and any
    /// error the factory itself reports.
    pub(crate) fn get_or_create(&self, id: &AgentId) -> Result<AgentEntry> {
        let mut instances = self.instances.lock().unwrap();

        if let Some(entry) = instances.get(id) {
            return Ok(entry.clone());
        }

        if instances.len() >= self.max_instances_count {
            return Err(Error::AgentLimitExceeded {
                count: instances.len(),
                limit: self.max_instances_count,
            });
        }

        let agent = {
            let factories = self.factories.lock().unwrap();
            let factory = factories
                .get(id.agent_type())
                .ok_or_else(|| Error::unknown_agent_type(id.agent_type()))?;
            factory(id.clone())?
        };

        if agent.id() != id {
            return Err(Error::internal(format!(
                "factory for type {} produced agent {}, expected {}",
                id.agent_type(),
                agent.id(),
                id
            )));
        }

        let entry = AgentEntry {
            agent,
            delivery_gate: self
                .serialize_delivery
                .then(|| Arc::new(tokio::sync::Mutex::new(()))),
        };
        instances.insert(id.clone(), entry.clone());

        debug!(agent_id = %id, "Agent instance created");
        metrics::record_agent_created();
        Ok(entry)
    }

    /// Look up an existing instance without creating it
    pub(crate) fn try_get(&self, id: &AgentId) -> Option<AgentEntry> {
        self.instances.lock().unwrap().get(id).cloned()
    }

    /// True if an instance exists for `id`
    pub fn contains(&self, id: &AgentId) -> bool {
        self.instances.lock().unwrap().contains_key(id)
    }

    /// Number of live instances
    pub fn instance_count(&self) -> usize {
        self.instances.lock().unwrap().len()
    }

    /// Drop every live instance, returning how many there were
    pub fn clear(&self) -> usize {
        let mut instances = self.instances.lock().unwrap();
        let count = instances.len();
        instances.clear();
        count
    }
}
