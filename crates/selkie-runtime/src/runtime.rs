//! The Selkie agent runtime
//!
//! One [`AgentRuntime`] owns a directory of lazily created agent
//! instances, a subscription registry for topic fan-out, and an
//! intervention pipeline wrapped around every delivery. Point-to-point
//! sends return the handler's result to the caller; publishes discard
//! results and isolate per-recipient failures.

use crate::directory::{AgentDirectory, AgentEntry};
use crate::intervention::{Intervention, InterventionHandler};
use crate::report::{DeliveryFailure, PublishReport};
use futures::future::join_all;
use selkie_core::agent::{Agent, AgentId};
use selkie_core::config::RuntimeConfig;
use selkie_core::error::{Error, Result};
use selkie_core::handler::HandlerRegistry;
use selkie_core::message::{AnyMessage, AnyReply, MessageContext};
use selkie_core::metrics;
use selkie_core::routed::RoutedAgent;
use selkie_core::subscription::{SubscriptionRegistry, TopicId, TopicSubscription};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

struct RuntimeInner {
    config: RuntimeConfig,
    directory: AgentDirectory,
    subscriptions: RwLock<SubscriptionRegistry>,
    interventions: RwLock<Vec<Arc<dyn InterventionHandler>>>,
    closed: AtomicBool,
}

/// The agent directory and message router
///
/// Cheaply cloneable; clones share the same directory, subscriptions, and
/// intervention pipeline, so every part of a host can hold its own handle.
#[derive(Clone)]
pub struct AgentRuntime {
    inner: Arc<RuntimeInner>,
}

impl AgentRuntime {
    /// Create a runtime with default configuration
    pub fn new() -> Self {
        // The default configuration is valid by construction
        Self::from_config(RuntimeConfig::default())
    }

    /// Create a runtime with the given configuration
    ///
    /// # Errors
    /// Returns `Error::InvalidConfiguration` if validation fails.
    pub fn with_config(config: RuntimeConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_config(config))
    }

    fn from_config(config: RuntimeConfig) -> Self {
        let directory = AgentDirectory::new(
            config.max_instances_count,
            config.serialize_instance_delivery,
        );
        Self {
            inner: Arc::new(RuntimeInner {
                config,
                directory,
                subscriptions: RwLock::new(SubscriptionRegistry::new()),
                interventions: RwLock::new(Vec::new()),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// The configuration this runtime was built with
    pub fn config(&self) -> &RuntimeConfig {
        &self.inner.config
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Register a factory for an agent type
    ///
    /// The factory runs on first reference to each id of the type and must
    /// produce an agent answering to exactly that id.
    ///
    /// # Errors
    /// Returns `Error::AgentTypeExists` if the type already has a factory
    /// and `Error::RuntimeClosed` after shutdown.
    pub fn register_agent_type<F>(&self, agent_type: impl Into<String>, factory: F) -> Result<()>
    where
        F: Fn(AgentId) -> Result<Arc<dyn Agent>> + Send + Sync + 'static,
    {
        self.ensure_open()?;
        self.inner.directory.register_factory(agent_type, Box::new(factory))
    }

    /// Register an agent class from its handler registry and a constructor
    ///
    /// Convenience over [`register_agent_type`](Self::register_agent_type):
    /// each instance is the class value wrapped in a [`RoutedAgent`]
    /// sharing `registry`.
    pub fn register_agent<A, F>(
        &self,
        agent_type: impl Into<String>,
        registry: HandlerRegistry<A>,
        build: F,
    ) -> Result<()>
    where
        A: Send + Sync + 'static,
        F: Fn(&AgentId) -> Result<A> + Send + Sync + 'static,
    {
        let registry = Arc::new(registry);
        self.register_agent_type(agent_type, move |id| {
            let inner = build(&id)?;
            Ok(Arc::new(RoutedAgent::new(id, inner, registry.clone())) as Arc<dyn Agent>)
        })
    }

    /// Append a topic subscription
    ///
    /// # Errors
    /// Returns `Error::SubscriptionExists` for a repeated (topic, type)
    /// pair and `Error::RuntimeClosed` after shutdown.
    pub fn add_subscription(&self, subscription: TopicSubscription) -> Result<()> {
        self.ensure_open()?;
        self.inner.subscriptions.write().unwrap().add(subscription)
    }

    /// Append an intervention handler to the pipeline
    ///
    /// Hooks run in the order they were added.
    pub fn add_intervention(&self, handler: Arc<dyn InterventionHandler>) -> Result<()> {
        self.ensure_open()?;
        self.inner.interventions.write().unwrap().push(handler);
        Ok(())
    }

    // =========================================================================
    // Delivery
    // =========================================================================

    /// Point-to-point delivery returning the handler's result
    ///
    /// Creates the target instance on first reference. Notifications
    /// resolve to `Ok(None)`; RPC messages to the handler's reply. Any
    /// failure along the way fails the whole call.
    #[instrument(
        skip(self, message, ctx),
        fields(recipient = %target, message_type = message.type_name()),
        level = "debug"
    )]
    pub async fn send_message(
        &self,
        target: AgentId,
        message: AnyMessage,
        ctx: MessageContext,
    ) -> Result<Option<AnyReply>> {
        self.ensure_open()?;

        let message = match self.run_send_hooks(message, ctx.sender(), &target).await? {
            Intervention::Deliver(message) => message,
            Intervention::Drop => {
                debug!(recipient = %target, "Send dropped by intervention");
                return Err(Error::message_dropped("send"));
            }
        };

        let reply = self.dispatch("send", &target, &message, &ctx).await?;

        match self.run_response_hooks(reply, &target, ctx.sender()).await? {
            Intervention::Deliver(reply) => Ok(reply),
            Intervention::Drop => {
                debug!(recipient = %target, "Reply dropped by intervention");
                Err(Error::message_dropped("response"))
            }
        }
    }

    /// Topic broadcast
    ///
    /// Delivers to one instance per subscription on the topic, concurrently.
    /// Handler results are discarded and recipient failures collected; one
    /// failing recipient never hides the message from the others.
    #[instrument(
        skip(self, message, ctx),
        fields(topic = %topic, message_type = message.type_name()),
        level = "debug"
    )]
    pub async fn publish_message(
        &self,
        topic: TopicId,
        message: AnyMessage,
        ctx: MessageContext,
    ) -> Result<PublishReport> {
        self.ensure_open()?;

        let message = match self.run_publish_hooks(message, ctx.sender(), &topic).await? {
            Intervention::Deliver(message) => message,
            Intervention::Drop => {
                debug!(topic = %topic, "Publish dropped by intervention");
                return Err(Error::message_dropped("publish"));
            }
        };

        let subscriptions: Vec<TopicSubscription> = {
            let registry = self.inner.subscriptions.read().unwrap();
            registry.resolve(&topic).to_vec()
        };

        let mut report = PublishReport::default();
        let mut targets: Vec<AgentId> = Vec::new();

        for subscription in &subscriptions {
            match subscription.derive_agent_id() {
                Ok(id) => {
                    // (topic, type) uniqueness makes derived ids distinct
                    debug_assert!(!targets.contains(&id));
                    targets.push(id);
                }
                Err(error) => {
                    warn!(
                        topic = %topic,
                        agent_type = subscription.agent_type(),
                        error = %error,
                        "Failed to derive recipient id"
                    );
                    report.failures.push(DeliveryFailure {
                        recipient: subscription.agent_type().to_string(),
                        error,
                    });
                }
            }
        }

        let deliveries = targets.into_iter().map(|id| {
            let message = message.clone();
            let ctx = ctx.clone().with_topic(topic.clone());
            async move {
                let outcome = self.dispatch("publish", &id, &message, &ctx).await;
                (id, outcome)
            }
        });

        for (id, outcome) in join_all(deliveries).await {
            match outcome {
                Ok(_reply) => report.delivered.push(id),
                Err(error) => {
                    warn!(
                        recipient = %id,
                        topic = %topic,
                        error = %error,
                        "Publish delivery failed"
                    );
                    report.failures.push(DeliveryFailure {
                        recipient: id.qualified_name(),
                        error,
                    });
                }
            }
        }

        metrics::record_publish(if report.is_complete() {
            "complete"
        } else {
            "partial"
        });
        debug!(
            topic = %topic,
            delivered = report.delivered_count(),
            failed = report.failures.len(),
            "Publish fan-out finished"
        );
        Ok(report)
    }

    /// Typed notification send; an RPC reply, if any, is discarded
    pub async fn send<M>(&self, target: AgentId, message: M, ctx: MessageContext) -> Result<()>
    where
        M: Send + Sync + 'static,
    {
        self.send_message(target, AnyMessage::new(message), ctx)
            .await?;
        Ok(())
    }

    /// Typed RPC returning the reply as `R`
    ///
    /// # Errors
    /// Returns `Error::ResultMismatch` if the target's binding produced no
    /// reply or a reply of another type.
    pub async fn request<M, R>(&self, target: AgentId, message: M, ctx: MessageContext) -> Result<R>
    where
        M: Send + Sync + 'static,
        R: Send + 'static,
    {
        let reply = self
            .send_message(target, AnyMessage::new(message), ctx)
            .await?;
        match reply {
            Some(reply) => reply.downcast::<R>().map_err(|reply| Error::ResultMismatch {
                expected: std::any::type_name::<R>().to_string(),
                actual: reply.type_name().to_string(),
            }),
            None => Err(Error::ResultMismatch {
                expected: std::any::type_name::<R>().to_string(),
                actual: "no result".to_string(),
            }),
        }
    }

    /// Typed topic broadcast
    pub async fn publish<M>(
        &self,
        topic: TopicId,
        message: M,
        ctx: MessageContext,
    ) -> Result<PublishReport>
    where
        M: Send + Sync + 'static,
    {
        self.publish_message(topic, AnyMessage::new(message), ctx)
            .await
    }

    /// Run one delivery against the target instance
    async fn dispatch(
        &self,
        kind: &'static str,
        id: &AgentId,
        message: &AnyMessage,
        ctx: &MessageContext,
    ) -> Result<Option<AnyReply>> {
        let entry = self.inner.directory.get_or_create(id)?;
        let started = Instant::now();
        let result = Self::deliver(&entry, message, ctx).await;
        let status = if result.is_ok() { "success" } else { "error" };
        metrics::record_delivery(kind, status, started.elapsed().as_secs_f64());
        result
    }

    async fn deliver(
        entry: &AgentEntry,
        message: &AnyMessage,
        ctx: &MessageContext,
    ) -> Result<Option<AnyReply>> {
        match &entry.delivery_gate {
            Some(gate) => {
                let _permit = gate.lock().await;
                entry.agent.on_message(message, ctx).await
            }
            None => entry.agent.on_message(message, ctx).await,
        }
    }

    // =========================================================================
    // Intervention Pipeline
    // =========================================================================

    fn hooks(&self) -> Vec<Arc<dyn InterventionHandler>> {
        self.inner.interventions.read().unwrap().clone()
    }

    async fn run_send_hooks(
        &self,
        mut message: AnyMessage,
        sender: Option<&AgentId>,
        recipient: &AgentId,
    ) -> Result<Intervention<AnyMessage>> {
        for hook in self.hooks() {
            match hook.on_send(message, sender, recipient).await? {
                Intervention::Deliver(next) => message = next,
                Intervention::Drop => return Ok(Intervention::Drop),
            }
        }
        Ok(Intervention::Deliver(message))
    }

    async fn run_publish_hooks(
        &self,
        mut message: AnyMessage,
        sender: Option<&AgentId>,
        topic: &TopicId,
    ) -> Result<Intervention<AnyMessage>> {
        for hook in self.hooks() {
            match hook.on_publish(message, sender, topic).await? {
                Intervention::Deliver(next) => message = next,
                Intervention::Drop => return Ok(Intervention::Drop),
            }
        }
        Ok(Intervention::Deliver(message))
    }

    async fn run_response_hooks(
        &self,
        mut reply: Option<AnyReply>,
        producer: &AgentId,
        caller: Option<&AgentId>,
    ) -> Result<Intervention<Option<AnyReply>>> {
        for hook in self.hooks() {
            match hook.on_response(reply, producer, caller).await? {
                Intervention::Deliver(next) => reply = next,
                Intervention::Drop => return Ok(Intervention::Drop),
            }
        }
        Ok(Intervention::Deliver(reply))
    }

    // =========================================================================
    // Introspection and Lifecycle
    // =========================================================================

    /// Fetch the live instance behind `id` as its concrete class
    ///
    /// Never creates the instance. `None` when the id has no instance or
    /// the instance is not a `RoutedAgent<A>`.
    pub fn try_agent_instance<A>(&self, id: &AgentId) -> Option<Arc<RoutedAgent<A>>>
    where
        A: Send + Sync + 'static,
    {
        let entry = self.inner.directory.try_get(id)?;
        entry.agent.as_arc_any().downcast::<RoutedAgent<A>>().ok()
    }

    /// Number of live agent instances
    pub fn instance_count(&self) -> usize {
        self.inner.directory.instance_count()
    }

    /// True once [`shutdown`](Self::shutdown) has run
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Close the runtime and drop every live instance
    ///
    /// Subsequent operations fail with `Error::RuntimeClosed`. Deliveries
    /// already in flight run to completion on instances they hold.
    /// Idempotent.
    pub fn shutdown(&self) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let dropped = self.inner.directory.clear();
        info!(instances_dropped = dropped, "Runtime shut down");
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(Error::RuntimeClosed);
        }
        Ok(())
    }
}

impl Default for AgentRuntime {
    fn default() -> Self {
        Self::new()
    }
}
