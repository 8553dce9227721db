//! Handler traits and the per-class binding registry
//!
//! An agent class declares which message types it accepts by implementing
//! [`Handler`] (notifications) and [`RpcHandler`] (request/response), then
//! collecting one binding per type in a [`HandlerRegistry`]. Resolution is
//! by exact [`TypeId`] only. TigerStyle: binding conflicts fail at
//! construction, never at dispatch.

use crate::constants::HANDLER_BINDINGS_COUNT_MAX;
use crate::error::{Error, Result};
use crate::message::{AnyMessage, AnyReply, MessageContext};
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::any::TypeId;
use std::collections::HashMap;

// =============================================================================
// Handler Traits
// =============================================================================

/// Notification handler for messages of type `M`
///
/// The handler observes the message and produces no reply; senders of a
/// notification only learn whether handling succeeded.
#[async_trait]
pub trait Handler<M>: Send + Sync
where
    M: Send + Sync + 'static,
{
    /// Handle one message
    async fn handle(&self, message: &M, ctx: &MessageContext) -> Result<()>;
}

/// RPC handler for messages of type `M`
///
/// The handler produces a reply that flows back to the caller that awaited
/// the request.
#[async_trait]
pub trait RpcHandler<M>: Send + Sync
where
    M: Send + Sync + 'static,
{
    /// The reply type returned to the caller
    type Reply: Send + 'static;

    /// Handle one request and produce its reply
    async fn handle_rpc(&self, message: &M, ctx: &MessageContext) -> Result<Self::Reply>;
}

// =============================================================================
// Handler Bindings
// =============================================================================

/// The shape of a binding, for diagnostics and introspection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerKind {
    /// Notification binding; resolves to no reply
    Event,
    /// Request/response binding; resolves to a reply
    Rpc,
}

type ErasedHandlerFn<A> = Box<
    dyn for<'a> Fn(
            &'a A,
            &'a AnyMessage,
            &'a MessageContext,
        ) -> BoxFuture<'a, Result<Option<AnyReply>>>
        + Send
        + Sync,
>;

/// One message type bound to one handler of an agent class
pub struct HandlerBinding<A> {
    message_type: &'static str,
    kind: HandlerKind,
    invoke_fn: ErasedHandlerFn<A>,
}

impl<A> HandlerBinding<A> {
    fn event<M>() -> Self
    where
        A: Handler<M> + 'static,
        M: Send + Sync + 'static,
    {
        Self {
            message_type: std::any::type_name::<M>(),
            kind: HandlerKind::Event,
            invoke_fn: Box::new(invoke_event::<A, M>),
        }
    }

    fn rpc<M>() -> Self
    where
        A: RpcHandler<M> + 'static,
        M: Send + Sync + 'static,
    {
        Self {
            message_type: std::any::type_name::<M>(),
            kind: HandlerKind::Rpc,
            invoke_fn: Box::new(invoke_rpc::<A, M>),
        }
    }

    /// The bound message type name, for diagnostics
    pub fn message_type(&self) -> &'static str {
        self.message_type
    }

    /// Whether the binding is a notification or an RPC
    pub fn kind(&self) -> HandlerKind {
        self.kind
    }

    /// Run the bound handler against an erased payload
    pub(crate) fn invoke<'a>(
        &'a self,
        agent: &'a A,
        message: &'a AnyMessage,
        ctx: &'a MessageContext,
    ) -> BoxFuture<'a, Result<Option<AnyReply>>> {
        (self.invoke_fn)(agent, message, ctx)
    }
}

fn invoke_event<'a, A, M>(
    agent: &'a A,
    message: &'a AnyMessage,
    ctx: &'a MessageContext,
) -> BoxFuture<'a, Result<Option<AnyReply>>>
where
    A: Handler<M>,
    M: Send + Sync + 'static,
{
    Box::pin(async move {
        let typed = message.downcast_ref::<M>().ok_or_else(|| {
            Error::internal(format!(
                "binding for {} invoked with payload of type {}",
                std::any::type_name::<M>(),
                message.type_name()
            ))
        })?;
        agent.handle(typed, ctx).await?;
        Ok(None)
    })
}

fn invoke_rpc<'a, A, M>(
    agent: &'a A,
    message: &'a AnyMessage,
    ctx: &'a MessageContext,
) -> BoxFuture<'a, Result<Option<AnyReply>>>
where
    A: RpcHandler<M>,
    M: Send + Sync + 'static,
{
    Box::pin(async move {
        let typed = message.downcast_ref::<M>().ok_or_else(|| {
            Error::internal(format!(
                "binding for {} invoked with payload of type {}",
                std::any::type_name::<M>(),
                message.type_name()
            ))
        })?;
        let reply = agent.handle_rpc(typed, ctx).await?;
        Ok(Some(AnyReply::new(reply)))
    })
}

// =============================================================================
// HandlerRegistry
// =============================================================================

/// Immutable map from message type to handler binding for one agent class
///
/// Built once per class through [`HandlerRegistry::builder`] and shared by
/// every instance of the class.
pub struct HandlerRegistry<A> {
    bindings: HashMap<TypeId, HandlerBinding<A>>,
}

impl<A> HandlerRegistry<A> {
    /// Start declaring bindings for an agent class
    pub fn builder() -> HandlerRegistryBuilder<A> {
        HandlerRegistryBuilder::new()
    }

    /// Look up the binding for a message type, exact match only
    pub fn resolve(&self, message_type: TypeId) -> Option<&HandlerBinding<A>> {
        self.bindings.get(&message_type)
    }

    /// Number of bindings
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// True if the class binds no message types
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Names of the bound message types, for diagnostics
    pub fn message_types(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.bindings.values().map(|binding| binding.message_type)
    }
}

impl<A> std::fmt::Debug for HandlerRegistry<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field(
                "message_types",
                &self.bindings.values().map(|b| b.message_type).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Builder accumulating bindings for one agent class
///
/// Declaration order is preserved for error reporting; the finished
/// registry resolves by type id alone.
pub struct HandlerRegistryBuilder<A> {
    entries: Vec<(TypeId, HandlerBinding<A>)>,
}

impl<A> HandlerRegistryBuilder<A> {
    /// Create an empty builder
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Bind message type `M` to the class's notification handler
    pub fn with_event<M>(mut self) -> Self
    where
        A: Handler<M> + 'static,
        M: Send + Sync + 'static,
    {
        self.entries
            .push((TypeId::of::<M>(), HandlerBinding::event::<M>()));
        self
    }

    /// Bind message type `M` to the class's RPC handler
    pub fn with_rpc<M>(mut self) -> Self
    where
        A: RpcHandler<M> + 'static,
        M: Send + Sync + 'static,
    {
        self.entries
            .push((TypeId::of::<M>(), HandlerBinding::rpc::<M>()));
        self
    }

    /// Finish the registry
    ///
    /// # Errors
    /// Returns `Error::DuplicateHandler` if any message type was bound more
    /// than once, and `Error::HandlerLimitExceeded` past the binding cap.
    /// A class that fails to build has no registry and cannot be registered.
    pub fn build(self) -> Result<HandlerRegistry<A>> {
        if self.entries.len() > HANDLER_BINDINGS_COUNT_MAX {
            return Err(Error::HandlerLimitExceeded {
                count: self.entries.len(),
                limit: HANDLER_BINDINGS_COUNT_MAX,
            });
        }

        let mut bindings = HashMap::with_capacity(self.entries.len());
        for (type_id, binding) in self.entries {
            let message_type = binding.message_type;
            if bindings.insert(type_id, binding).is_some() {
                return Err(Error::DuplicateHandler {
                    agent_type: std::any::type_name::<A>().to_string(),
                    message_type: message_type.to_string(),
                });
            }
        }

        Ok(HandlerRegistry { bindings })
    }
}

impl<A> Default for HandlerRegistryBuilder<A> {
    fn default() -> Self {
        Self::new()
    }
}
