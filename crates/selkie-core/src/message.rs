//! Message envelopes and delivery context
//!
//! Messages travel through the runtime type-erased and are downcast back to
//! their concrete type at the receiving binding. TigerStyle: the concrete
//! type id and name are captured once at the edge, never inferred later.

use crate::agent::AgentId;
use crate::error::{Error, Result};
use crate::subscription::TopicId;
use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

pub use tokio_util::sync::CancellationToken;

// =============================================================================
// AnyMessage
// =============================================================================

/// A type-erased message payload
///
/// Cheaply cloneable; a publish shares one payload across every recipient.
/// The concrete [`TypeId`] recorded at construction drives handler
/// resolution, with no subtype or interface widening.
#[derive(Clone)]
pub struct AnyMessage {
    value: Arc<dyn Any + Send + Sync>,
    type_id: TypeId,
    type_name: &'static str,
}

impl AnyMessage {
    /// Wrap a concrete message value
    pub fn new<M>(message: M) -> Self
    where
        M: Send + Sync + 'static,
    {
        Self {
            value: Arc::new(message),
            type_id: TypeId::of::<M>(),
            type_name: std::any::type_name::<M>(),
        }
    }

    /// The concrete type id captured at construction
    pub fn message_type(&self) -> TypeId {
        self.type_id
    }

    /// The concrete type name, for diagnostics
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// True if the payload is of type `M`
    pub fn is<M: 'static>(&self) -> bool {
        self.type_id == TypeId::of::<M>()
    }

    /// Borrow the payload as `M`, if that is its concrete type
    pub fn downcast_ref<M: 'static>(&self) -> Option<&M> {
        self.value.downcast_ref::<M>()
    }
}

impl fmt::Debug for AnyMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnyMessage")
            .field("type_name", &self.type_name)
            .finish()
    }
}

// =============================================================================
// AnyReply
// =============================================================================

/// A type-erased RPC reply
///
/// Produced by RPC bindings and downcast by the caller that awaited the
/// request. Unlike [`AnyMessage`] a reply has a single consumer, so it is
/// owned rather than shared.
pub struct AnyReply {
    value: Box<dyn Any + Send>,
    type_name: &'static str,
}

impl AnyReply {
    /// Wrap a concrete reply value
    pub fn new<R>(reply: R) -> Self
    where
        R: Send + 'static,
    {
        Self {
            value: Box::new(reply),
            type_name: std::any::type_name::<R>(),
        }
    }

    /// The concrete type name, for diagnostics
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Take the reply as `R`, returning the envelope on a type mismatch
    pub fn downcast<R: 'static>(self) -> std::result::Result<R, AnyReply> {
        let type_name = self.type_name;
        match self.value.downcast::<R>() {
            Ok(boxed) => Ok(*boxed),
            Err(value) => Err(AnyReply { value, type_name }),
        }
    }

    /// Borrow the reply as `R`, if that is its concrete type
    pub fn downcast_ref<R: 'static>(&self) -> Option<&R> {
        self.value.downcast_ref::<R>()
    }
}

impl fmt::Debug for AnyReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnyReply")
            .field("type_name", &self.type_name)
            .finish()
    }
}

// =============================================================================
// MessageContext
// =============================================================================

/// Per-delivery metadata handed to every handler
///
/// A fresh context accompanies each delivery. Clones share the same
/// cancellation token, so cancelling one clone cancels them all.
#[derive(Debug, Clone)]
pub struct MessageContext {
    sender: Option<AgentId>,
    topic: Option<TopicId>,
    cancellation: CancellationToken,
}

impl MessageContext {
    /// Create an empty context with a fresh cancellation token
    pub fn new() -> Self {
        Self {
            sender: None,
            topic: None,
            cancellation: CancellationToken::new(),
        }
    }

    /// Attach the sending agent's id
    pub fn with_sender(mut self, sender: AgentId) -> Self {
        self.sender = Some(sender);
        self
    }

    /// Attach the topic the message was published to
    pub fn with_topic(mut self, topic: TopicId) -> Self {
        self.topic = Some(topic);
        self
    }

    /// Attach a caller-controlled cancellation token
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// The sending agent, if the message came from inside the runtime
    pub fn sender(&self) -> Option<&AgentId> {
        self.sender.as_ref()
    }

    /// The topic this delivery was fanned out from, if any
    pub fn topic(&self) -> Option<&TopicId> {
        self.topic.as_ref()
    }

    /// The cancellation token for this delivery
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// True once the delivery has been cancelled
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Fail with `Error::Cancelled` if the delivery has been cancelled
    ///
    /// Long-running handlers call this between work items to observe
    /// cooperative cancellation.
    pub fn ensure_active(&self) -> Result<()> {
        if self.cancellation.is_cancelled() {
            return Err(Error::Cancelled);
        }
        Ok(())
    }
}

impl Default for MessageContext {
    fn default() -> Self {
        Self::new()
    }
}
