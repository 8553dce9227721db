//! Error types for Selkie
//!
//! TigerStyle: explicit error types with context, no silent failures.

use thiserror::Error;

/// Error type for all Selkie operations
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Dispatch Errors
    // =========================================================================
    /// An agent class bound the same message type twice
    #[error("Duplicate handler: agent class {agent_type} already binds message type {message_type}")]
    DuplicateHandler {
        agent_type: String,
        message_type: String,
    },

    /// A message reached an agent with no binding for its type
    #[error("Unhandled message: agent {agent_id} has no handler for message type {message_type}")]
    UnhandledMessage {
        agent_id: String,
        message_type: String,
    },

    /// An RPC reply could not be downcast to the requested type
    #[error("Result mismatch: expected reply of type {expected}, got {actual}")]
    ResultMismatch { expected: String, actual: String },

    /// Delivery was cancelled before the handler completed
    #[error("Delivery cancelled")]
    Cancelled,

    /// An intervention handler dropped the message
    #[error("Message dropped by intervention during {stage}")]
    MessageDropped { stage: String },

    // =========================================================================
    // Registration Errors
    // =========================================================================
    /// No factory is registered for the agent type
    #[error("Unknown agent type: {agent_type}")]
    UnknownAgentType { agent_type: String },

    /// A factory is already registered for the agent type
    #[error("Agent type already registered: {agent_type}")]
    AgentTypeExists { agent_type: String },

    /// The (topic, agent type) pair is already subscribed
    #[error("Subscription already exists: topic {topic} -> agent type {agent_type}")]
    SubscriptionExists { topic: String, agent_type: String },

    // =========================================================================
    // Validation Errors
    // =========================================================================
    /// An agent id failed validation
    #[error("Invalid agent id '{id}': {reason}")]
    InvalidAgentId { id: String, reason: String },

    /// A topic identifier failed validation
    #[error("Invalid topic '{topic}': {reason}")]
    InvalidTopic { topic: String, reason: String },

    /// A configuration value failed validation
    #[error("Invalid configuration: {field} - {reason}")]
    InvalidConfiguration { field: String, reason: String },

    // =========================================================================
    // Capacity Errors
    // =========================================================================
    /// The runtime reached its live instance cap
    #[error("Agent instance limit exceeded: {count} >= {limit}")]
    AgentLimitExceeded { count: usize, limit: usize },

    /// An agent class declared more bindings than allowed
    #[error("Handler binding limit exceeded: {count} > {limit}")]
    HandlerLimitExceeded { count: usize, limit: usize },

    /// The runtime reached its subscription cap
    #[error("Subscription limit exceeded: {count} >= {limit}")]
    SubscriptionLimitExceeded { count: usize, limit: usize },

    // =========================================================================
    // Runtime Errors
    // =========================================================================
    /// The runtime has been shut down
    #[error("Runtime is closed")]
    RuntimeClosed,

    /// Internal errors (bugs, invariant violations)
    #[error("Internal error: {reason}")]
    Internal { reason: String },

    /// Catch-all for other errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Create an UnhandledMessage error
    pub fn unhandled_message(agent_id: impl Into<String>, message_type: impl Into<String>) -> Self {
        Error::UnhandledMessage {
            agent_id: agent_id.into(),
            message_type: message_type.into(),
        }
    }

    /// Create an UnknownAgentType error
    pub fn unknown_agent_type(agent_type: impl Into<String>) -> Self {
        Error::UnknownAgentType {
            agent_type: agent_type.into(),
        }
    }

    /// Create a MessageDropped error for the given pipeline stage
    pub fn message_dropped(stage: impl Into<String>) -> Self {
        Error::MessageDropped {
            stage: stage.into(),
        }
    }

    /// Create an InvalidConfiguration error
    pub fn invalid_configuration(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidConfiguration {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create an Internal error
    pub fn internal(reason: impl Into<String>) -> Self {
        Error::Internal {
            reason: reason.into(),
        }
    }

    /// True when the error reports a dropped message
    pub fn is_dropped(&self) -> bool {
        matches!(self, Error::MessageDropped { .. })
    }

    /// True when the error reports cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }
}

/// Result type alias for Selkie operations
pub type Result<T> = std::result::Result<T, Error>;
