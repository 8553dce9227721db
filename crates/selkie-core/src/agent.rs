//! Agent identity and the dispatch surface
//!
//! TigerStyle: validated identifiers, explicit limits, single dispatch
//! entry point per instance.

use crate::constants::{AGENT_KEY_LENGTH_BYTES_MAX, AGENT_TYPE_LENGTH_BYTES_MAX, DEFAULT_AGENT_KEY};
use crate::error::{Error, Result};
use crate::message::{AnyMessage, AnyReply, MessageContext};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

// =============================================================================
// AgentId
// =============================================================================

/// Unique identifier for an agent instance
///
/// An id is a (type, key) pair. The type names an agent class registered
/// with the runtime; the key distinguishes instances of that class. Equal
/// ids address the same instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentId {
    agent_type: String,
    key: String,
}

impl AgentId {
    /// Create a new validated agent id
    ///
    /// # Arguments
    /// * `agent_type` - Agent class name (alphanumeric plus `-`, `_`, `.`)
    /// * `key` - Instance key within the class (any non-empty string)
    ///
    /// # Errors
    /// Returns `Error::InvalidAgentId` if either part is empty, too long,
    /// or the type contains characters outside the allowed set.
    pub fn new(agent_type: impl Into<String>, key: impl Into<String>) -> Result<Self> {
        let agent_type = agent_type.into();
        let key = key.into();

        Self::validate_agent_type(&agent_type)?;

        if key.is_empty() {
            return Err(Error::InvalidAgentId {
                id: agent_type,
                reason: "agent key must not be empty".to_string(),
            });
        }

        if key.len() > AGENT_KEY_LENGTH_BYTES_MAX {
            return Err(Error::InvalidAgentId {
                id: format!("{}/...", agent_type),
                reason: format!(
                    "agent key exceeds {} bytes: {}",
                    AGENT_KEY_LENGTH_BYTES_MAX,
                    key.len()
                ),
            });
        }

        Ok(Self { agent_type, key })
    }

    /// Create an id addressing the well-known default key of a class
    pub fn with_default_key(agent_type: impl Into<String>) -> Result<Self> {
        Self::new(agent_type, DEFAULT_AGENT_KEY)
    }

    /// Create an agent id without validation
    ///
    /// Only for internal use where the parts are known valid.
    #[doc(hidden)]
    pub fn new_unchecked(agent_type: impl Into<String>, key: impl Into<String>) -> Self {
        let agent_type = agent_type.into();
        let key = key.into();
        debug_assert!(!agent_type.is_empty());
        debug_assert!(!key.is_empty());
        Self { agent_type, key }
    }

    /// Validate an agent type name on its own
    ///
    /// Used at registration time, before any id carrying the type exists.
    pub fn validate_agent_type(agent_type: &str) -> Result<()> {
        if agent_type.is_empty() {
            return Err(Error::InvalidAgentId {
                id: agent_type.to_string(),
                reason: "agent type must not be empty".to_string(),
            });
        }

        if agent_type.len() > AGENT_TYPE_LENGTH_BYTES_MAX {
            // Truncate by chars so the diagnostic never splits a code point
            return Err(Error::InvalidAgentId {
                id: agent_type.chars().take(32).collect(),
                reason: format!(
                    "agent type exceeds {} bytes: {}",
                    AGENT_TYPE_LENGTH_BYTES_MAX,
                    agent_type.len()
                ),
            });
        }

        let valid = agent_type
            .chars()
            .all(|c| c.is_alphanumeric() || c == '-' || c == '_' || c == '.');
        if !valid {
            return Err(Error::InvalidAgentId {
                id: agent_type.to_string(),
                reason: "agent type must contain only alphanumerics, '-', '_', or '.'".to_string(),
            });
        }

        Ok(())
    }

    /// Get the agent type
    pub fn agent_type(&self) -> &str {
        &self.agent_type
    }

    /// Get the instance key
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Get the qualified name in `type/key` form
    pub fn qualified_name(&self) -> String {
        format!("{}/{}", self.agent_type, self.key)
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.agent_type, self.key)
    }
}

// =============================================================================
// Agent Trait
// =============================================================================

/// The runtime-facing surface of a live agent instance
///
/// Implementations receive every message addressed to their id through
/// `on_message` and decide how to act on it. Most agents do not implement
/// this directly; they describe handlers in a
/// [`HandlerRegistry`](crate::handler::HandlerRegistry) and are wrapped in a
/// [`RoutedAgent`](crate::routed::RoutedAgent).
#[async_trait]
pub trait Agent: Send + Sync + 'static {
    /// The id this instance answers to
    fn id(&self) -> &AgentId;

    /// Human-readable description for logs and introspection
    fn description(&self) -> &str {
        ""
    }

    /// Deliver a single message to this instance
    ///
    /// Notifications resolve to `Ok(None)`; RPC messages resolve to the
    /// handler's reply. Errors flow back to the caller unmodified.
    async fn on_message(
        &self,
        message: &AnyMessage,
        ctx: &MessageContext,
    ) -> Result<Option<AnyReply>>;

    /// Type-erased self access, used for instance introspection
    fn as_arc_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_id_valid() {
        let id = AgentId::new("writer", "session-42").unwrap();
        assert_eq!(id.agent_type(), "writer");
        assert_eq!(id.key(), "session-42");
        assert_eq!(id.qualified_name(), "writer/session-42");
        assert_eq!(id.to_string(), "writer/session-42");
    }

    #[test]
    fn test_agent_id_default_key() {
        let id = AgentId::with_default_key("writer").unwrap();
        assert_eq!(id.key(), DEFAULT_AGENT_KEY);
    }

    #[test]
    fn test_agent_id_equality_is_structural() {
        let a = AgentId::new("writer", "k1").unwrap();
        let b = AgentId::new("writer", "k1").unwrap();
        let c = AgentId::new("writer", "k2").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_agent_id_rejects_empty_parts() {
        assert!(matches!(
            AgentId::new("", "key"),
            Err(Error::InvalidAgentId { .. })
        ));
        assert!(matches!(
            AgentId::new("writer", ""),
            Err(Error::InvalidAgentId { .. })
        ));
    }

    #[test]
    fn test_agent_id_rejects_bad_type_charset() {
        assert!(AgentId::new("wri ter", "key").is_err());
        assert!(AgentId::new("writer/extra", "key").is_err());
        // The key is opaque and may carry anything non-empty
        assert!(AgentId::new("writer", "user@example.com").is_ok());
    }

    #[test]
    fn test_agent_id_rejects_oversized_parts() {
        let long_type = "t".repeat(AGENT_TYPE_LENGTH_BYTES_MAX + 1);
        assert!(AgentId::new(long_type, "key").is_err());

        let long_key = "k".repeat(AGENT_KEY_LENGTH_BYTES_MAX + 1);
        assert!(AgentId::new("writer", long_key).is_err());

        let max_key = "k".repeat(AGENT_KEY_LENGTH_BYTES_MAX);
        assert!(AgentId::new("writer", max_key).is_ok());
    }

    #[test]
    fn test_validate_agent_type_standalone() {
        assert!(AgentId::validate_agent_type("my.agent_v2").is_ok());
        assert!(AgentId::validate_agent_type("").is_err());
        assert!(AgentId::validate_agent_type("no spaces").is_err());
    }
}
