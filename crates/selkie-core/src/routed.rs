//! Dispatch shim wrapping an agent class behind [`Agent`]
//!
//! A [`RoutedAgent`] pairs one instance of a class with the class's shared
//! handler registry. Every delivery resolves the payload's exact type in
//! the registry and runs the bound handler; a missing binding is the
//! instance's problem to report, not the runtime's.

use crate::agent::{Agent, AgentId};
use crate::error::{Error, Result};
use crate::handler::HandlerRegistry;
use crate::message::{AnyMessage, AnyReply, MessageContext};
use async_trait::async_trait;
use std::any::Any;
use std::sync::Arc;
use tracing::{debug, trace};

/// One live instance of an agent class, plus its dispatch table
pub struct RoutedAgent<A> {
    id: AgentId,
    description: String,
    registry: Arc<HandlerRegistry<A>>,
    inner: A,
}

impl<A> RoutedAgent<A>
where
    A: Send + Sync + 'static,
{
    /// Wrap `inner` as the instance answering to `id`
    ///
    /// The registry is shared across all instances of the class.
    pub fn new(id: AgentId, inner: A, registry: Arc<HandlerRegistry<A>>) -> Self {
        Self {
            id,
            description: String::new(),
            registry,
            inner,
        }
    }

    /// Attach a human-readable description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Borrow the wrapped class instance
    pub fn inner(&self) -> &A {
        &self.inner
    }

    /// Number of message types this instance accepts
    pub fn handler_count(&self) -> usize {
        self.registry.len()
    }
}

#[async_trait]
impl<A> Agent for RoutedAgent<A>
where
    A: Send + Sync + 'static,
{
    fn id(&self) -> &AgentId {
        &self.id
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn on_message(
        &self,
        message: &AnyMessage,
        ctx: &MessageContext,
    ) -> Result<Option<AnyReply>> {
        // Cancelled deliveries never reach a handler
        ctx.ensure_active()?;

        let binding = match self.registry.resolve(message.message_type()) {
            Some(binding) => binding,
            None => {
                debug!(
                    agent_id = %self.id,
                    message_type = message.type_name(),
                    "No handler binding for message type"
                );
                return Err(Error::unhandled_message(
                    self.id.qualified_name(),
                    message.type_name(),
                ));
            }
        };

        trace!(
            agent_id = %self.id,
            message_type = message.type_name(),
            kind = ?binding.kind(),
            "Dispatching message"
        );

        // Handler outcomes, including domain errors, flow back unmodified
        binding.invoke(&self.inner, message, ctx).await
    }

    fn as_arc_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}
