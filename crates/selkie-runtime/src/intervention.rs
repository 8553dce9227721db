//! Intervention hooks on the delivery path
//!
//! Hooks observe messages before they reach their target and RPC replies
//! before they reach their caller. A hook may pass a value through,
//! replace it, or drop it; a drop surfaces to the caller as
//! `Error::MessageDropped`. Hooks run in registration order, each seeing
//! the previous hook's output.

use async_trait::async_trait;
use selkie_core::agent::AgentId;
use selkie_core::error::Result;
use selkie_core::message::{AnyMessage, AnyReply};
use selkie_core::subscription::TopicId;

/// Verdict returned by an intervention hook
#[derive(Debug)]
pub enum Intervention<T> {
    /// Continue with the (possibly replaced) value
    Deliver(T),
    /// Stop; the caller observes `Error::MessageDropped`
    Drop,
}

/// Hooks observing message flow through the runtime
///
/// All methods default to pass-through, so implementations override only
/// the stages they care about.
#[async_trait]
pub trait InterventionHandler: Send + Sync {
    /// Runs before a point-to-point delivery reaches its target
    async fn on_send(
        &self,
        message: AnyMessage,
        _sender: Option<&AgentId>,
        _recipient: &AgentId,
    ) -> Result<Intervention<AnyMessage>> {
        Ok(Intervention::Deliver(message))
    }

    /// Runs once per publish, before fan-out
    ///
    /// Dropping here drops the publish as a whole; no recipient sees the
    /// message.
    async fn on_publish(
        &self,
        message: AnyMessage,
        _sender: Option<&AgentId>,
        _topic: &TopicId,
    ) -> Result<Intervention<AnyMessage>> {
        Ok(Intervention::Deliver(message))
    }

    /// Runs after an RPC handler returns, before the caller sees the reply
    ///
    /// `producer` is the agent that handled the request.
    async fn on_response(
        &self,
        reply: Option<AnyReply>,
        _producer: &AgentId,
        _caller: Option<&AgentId>,
    ) -> Result<Intervention<Option<AnyReply>>> {
        Ok(Intervention::Deliver(reply))
    }
}

/// Pass-through intervention handler
///
/// Useful as a base in tests and as the identity element of a pipeline.
pub struct NoopIntervention;

#[async_trait]
impl InterventionHandler for NoopIntervention {}
