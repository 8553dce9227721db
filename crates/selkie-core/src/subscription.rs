//! Topic subscriptions and recipient key selection
//!
//! A subscription binds a topic to an agent type and a key-selection
//! policy. Publishing to a topic fans out to one instance per matching
//! subscription, with the policy deriving the instance key from the topic.
//! TigerStyle: the registry is append-only and each (topic, type) pair
//! binds at most once.

use crate::agent::AgentId;
use crate::constants::{DEFAULT_AGENT_KEY, SUBSCRIPTIONS_COUNT_MAX, TOPIC_LENGTH_BYTES_MAX};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

// =============================================================================
// TopicId
// =============================================================================

/// Identifier of a broadcast topic
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TopicId(String);

impl TopicId {
    /// Create a validated topic id
    ///
    /// # Errors
    /// Returns `Error::InvalidTopic` if the id is empty or too long.
    pub fn new(topic: impl Into<String>) -> Result<Self> {
        let topic = topic.into();

        if topic.is_empty() {
            return Err(Error::InvalidTopic {
                topic,
                reason: "topic must not be empty".to_string(),
            });
        }

        if topic.len() > TOPIC_LENGTH_BYTES_MAX {
            return Err(Error::InvalidTopic {
                topic: topic.chars().take(32).collect(),
                reason: format!(
                    "topic exceeds {} bytes: {}",
                    TOPIC_LENGTH_BYTES_MAX,
                    topic.len()
                ),
            });
        }

        Ok(Self(topic))
    }

    /// The topic as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TopicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// KeySelector
// =============================================================================

/// Policy deriving the recipient instance key from a topic
///
/// Which instance of a subscribed type receives a publish is decided here,
/// not by the runtime.
#[derive(Clone)]
pub enum KeySelector {
    /// Always address the well-known default key
    Default,
    /// Always address one fixed key
    Fixed(String),
    /// Derive the key from the topic
    Custom(Arc<dyn Fn(&TopicId) -> String + Send + Sync>),
}

impl KeySelector {
    /// Apply the policy to a topic
    pub fn select(&self, topic: &TopicId) -> String {
        match self {
            KeySelector::Default => DEFAULT_AGENT_KEY.to_string(),
            KeySelector::Fixed(key) => key.clone(),
            KeySelector::Custom(select) => select(topic),
        }
    }
}

impl fmt::Debug for KeySelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeySelector::Default => write!(f, "Default"),
            KeySelector::Fixed(key) => f.debug_tuple("Fixed").field(key).finish(),
            KeySelector::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

// =============================================================================
// TopicSubscription
// =============================================================================

/// One topic bound to one agent type
#[derive(Debug, Clone)]
pub struct TopicSubscription {
    topic: TopicId,
    agent_type: String,
    selector: KeySelector,
}

impl TopicSubscription {
    /// Subscribe `agent_type` to `topic`, addressing the default key
    pub fn new(topic: TopicId, agent_type: impl Into<String>) -> Self {
        Self {
            topic,
            agent_type: agent_type.into(),
            selector: KeySelector::Default,
        }
    }

    /// Address one fixed instance key instead of the default
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.selector = KeySelector::Fixed(key.into());
        self
    }

    /// Derive the instance key from the topic
    pub fn with_key_selector<F>(mut self, select: F) -> Self
    where
        F: Fn(&TopicId) -> String + Send + Sync + 'static,
    {
        self.selector = KeySelector::Custom(Arc::new(select));
        self
    }

    /// The subscribed topic
    pub fn topic(&self) -> &TopicId {
        &self.topic
    }

    /// The subscribed agent type
    pub fn agent_type(&self) -> &str {
        &self.agent_type
    }

    /// The key-selection policy
    pub fn selector(&self) -> &KeySelector {
        &self.selector
    }

    /// Derive the recipient id this subscription addresses
    ///
    /// # Errors
    /// Returns `Error::InvalidAgentId` if the selected key does not form a
    /// valid id with the subscribed type.
    pub fn derive_agent_id(&self) -> Result<AgentId> {
        let key = self.selector.select(&self.topic);
        AgentId::new(self.agent_type.clone(), key)
    }
}

// =============================================================================
// SubscriptionRegistry
// =============================================================================

/// Append-only map from topic to its subscriptions
///
/// Publishing to a topic with no entries is valid and reaches nobody.
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    by_topic: HashMap<TopicId, Vec<TopicSubscription>>,
    count: usize,
}

impl SubscriptionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a subscription
    ///
    /// The subscription's derived id is checked here so a bad selector
    /// surfaces at registration, not at first publish.
    ///
    /// # Errors
    /// Returns `Error::SubscriptionExists` if the (topic, agent type) pair
    /// is already bound, `Error::InvalidAgentId` if the derived id is
    /// invalid, and `Error::SubscriptionLimitExceeded` at the cap.
    pub fn add(&mut self, subscription: TopicSubscription) -> Result<()> {
        if self.count >= SUBSCRIPTIONS_COUNT_MAX {
            return Err(Error::SubscriptionLimitExceeded {
                count: self.count,
                limit: SUBSCRIPTIONS_COUNT_MAX,
            });
        }

        AgentId::validate_agent_type(subscription.agent_type())?;
        subscription.derive_agent_id()?;

        let entries = self.by_topic.entry(subscription.topic.clone()).or_default();
        if entries
            .iter()
            .any(|existing| existing.agent_type == subscription.agent_type)
        {
            return Err(Error::SubscriptionExists {
                topic: subscription.topic.to_string(),
                agent_type: subscription.agent_type,
            });
        }

        entries.push(subscription);
        self.count += 1;
        Ok(())
    }

    /// All subscriptions bound to `topic`
    pub fn resolve(&self, topic: &TopicId) -> &[TopicSubscription] {
        self.by_topic
            .get(topic)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Total number of subscriptions across all topics
    pub fn len(&self) -> usize {
        self.count
    }

    /// True if no subscriptions exist
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}
