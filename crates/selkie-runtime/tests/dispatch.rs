//! End-to-end dispatch behavior through the public API
//!
//! Exercises the full path a host sees: register agent classes, bind
//! topics, then move messages with send/request/publish and observe
//! instance state through introspection.

use async_trait::async_trait;
use selkie_core::{
    AgentId, CancellationToken, Error, Handler, HandlerRegistry, MessageContext, Result,
    RpcHandler, TopicId, TopicSubscription,
};
use selkie_runtime::AgentRuntime;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("info")
        .with_test_writer()
        .try_init();
}

// =============================================================================
// Test Agents
// =============================================================================

#[derive(Debug, Clone)]
struct TextMessage {
    source: String,
    content: String,
}

#[derive(Debug, Clone)]
struct TextRequest {
    source: String,
    content: String,
}

/// Collects who said what, keyed by source
#[derive(Default)]
struct TextCollector {
    received: Mutex<HashMap<String, String>>,
}

impl TextCollector {
    fn received_from(&self, source: &str) -> Option<String> {
        self.received.lock().unwrap().get(source).cloned()
    }
}

#[async_trait]
impl Handler<TextMessage> for TextCollector {
    async fn handle(&self, message: &TextMessage, _ctx: &MessageContext) -> Result<()> {
        self.received
            .lock()
            .unwrap()
            .insert(message.source.clone(), message.content.clone());
        Ok(())
    }
}

#[async_trait]
impl RpcHandler<TextRequest> for TextCollector {
    type Reply = String;

    async fn handle_rpc(&self, message: &TextRequest, _ctx: &MessageContext) -> Result<String> {
        self.received
            .lock()
            .unwrap()
            .insert(message.source.clone(), message.content.clone());
        Ok(message.content.clone())
    }
}

fn collector_registry() -> HandlerRegistry<TextCollector> {
    HandlerRegistry::builder()
        .with_event::<TextMessage>()
        .with_rpc::<TextRequest>()
        .build()
        .unwrap()
}

fn collector_runtime() -> AgentRuntime {
    let runtime = AgentRuntime::new();
    runtime
        .register_agent("collector", collector_registry(), |_id| {
            Ok(TextCollector::default())
        })
        .unwrap();
    runtime
}

fn received_from(runtime: &AgentRuntime, id: &AgentId, source: &str) -> Option<String> {
    runtime
        .try_agent_instance::<TextCollector>(id)
        .and_then(|agent| agent.inner().received_from(source))
}

/// Rejects everything, for failure-isolation scenarios
struct Refuser;

#[async_trait]
impl Handler<TextMessage> for Refuser {
    async fn handle(&self, _message: &TextMessage, _ctx: &MessageContext) -> Result<()> {
        Err(anyhow::anyhow!("refused on principle").into())
    }
}

fn refuser_registry() -> HandlerRegistry<Refuser> {
    HandlerRegistry::builder()
        .with_event::<TextMessage>()
        .build()
        .unwrap()
}

/// Works in small steps and observes cancellation between them
struct PatientAgent;

#[async_trait]
impl Handler<TextMessage> for PatientAgent {
    async fn handle(&self, _message: &TextMessage, ctx: &MessageContext) -> Result<()> {
        for _ in 0..100 {
            tokio::time::sleep(Duration::from_millis(5)).await;
            ctx.ensure_active()?;
        }
        Ok(())
    }
}

fn patient_registry() -> HandlerRegistry<PatientAgent> {
    HandlerRegistry::builder()
        .with_event::<TextMessage>()
        .build()
        .unwrap()
}

// =============================================================================
// Point-to-Point
// =============================================================================

#[tokio::test]
async fn notification_is_recorded_and_yields_no_result() {
    init_tracing();
    let runtime = collector_runtime();
    let id = AgentId::new("collector", "default").unwrap();

    runtime
        .send(
            id.clone(),
            TextMessage {
                source: "alice".to_string(),
                content: "hi".to_string(),
            },
            MessageContext::new(),
        )
        .await
        .unwrap();

    assert_eq!(received_from(&runtime, &id, "alice").as_deref(), Some("hi"));
}

#[tokio::test]
async fn rpc_returns_the_content_it_was_sent() {
    init_tracing();
    let runtime = collector_runtime();
    let id = AgentId::new("collector", "default").unwrap();

    let reply: String = runtime
        .request(
            id.clone(),
            TextRequest {
                source: "alice".to_string(),
                content: "hi".to_string(),
            },
            MessageContext::new(),
        )
        .await
        .unwrap();

    assert_eq!(reply, "hi");
    assert_eq!(received_from(&runtime, &id, "alice").as_deref(), Some("hi"));
}

#[tokio::test]
async fn rpc_round_trips_arbitrary_content() {
    init_tracing();
    let runtime = collector_runtime();
    let id = AgentId::new("collector", "default").unwrap();

    for content in ["", "short", "with spaces and\nnewlines", "ünïcödé"] {
        let reply: String = runtime
            .request(
                id.clone(),
                TextRequest {
                    source: "fuzz".to_string(),
                    content: content.to_string(),
                },
                MessageContext::new(),
            )
            .await
            .unwrap();
        assert_eq!(reply, content);
    }
}

#[tokio::test]
async fn unhandled_message_type_is_an_error() {
    init_tracing();
    let runtime = collector_runtime();
    let id = AgentId::new("collector", "default").unwrap();

    let err = runtime
        .send(id, 42i32, MessageContext::new())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::UnhandledMessage { ref agent_id, .. } if agent_id == "collector/default"
    ));
}

#[tokio::test]
async fn state_is_instance_local() {
    init_tracing();
    let runtime = collector_runtime();
    let here = AgentId::new("collector", "here").unwrap();
    let there = AgentId::new("collector", "there").unwrap();

    runtime
        .send(
            here.clone(),
            TextMessage {
                source: "alice".to_string(),
                content: "for here".to_string(),
            },
            MessageContext::new(),
        )
        .await
        .unwrap();
    runtime
        .send(
            there.clone(),
            TextMessage {
                source: "alice".to_string(),
                content: "for there".to_string(),
            },
            MessageContext::new(),
        )
        .await
        .unwrap();

    assert_eq!(
        received_from(&runtime, &here, "alice").as_deref(),
        Some("for here")
    );
    assert_eq!(
        received_from(&runtime, &there, "alice").as_deref(),
        Some("for there")
    );
    assert_eq!(runtime.instance_count(), 2);
}

#[tokio::test]
async fn concurrent_requests_share_one_instance() {
    init_tracing();
    let constructed = Arc::new(AtomicUsize::new(0));
    let runtime = AgentRuntime::new();
    let counter = constructed.clone();
    runtime
        .register_agent("collector", collector_registry(), move |_id| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(TextCollector::default())
        })
        .unwrap();

    let id = AgentId::new("collector", "contested").unwrap();
    let mut tasks = Vec::new();
    for n in 0..8 {
        let runtime = runtime.clone();
        let id = id.clone();
        tasks.push(tokio::spawn(async move {
            runtime
                .request::<TextRequest, String>(
                    id,
                    TextRequest {
                        source: format!("caller-{}", n),
                        content: format!("message-{}", n),
                    },
                    MessageContext::new(),
                )
                .await
        }));
    }

    for (n, task) in tasks.into_iter().enumerate() {
        let reply = task.await.unwrap().unwrap();
        assert_eq!(reply, format!("message-{}", n));
    }

    assert_eq!(constructed.load(Ordering::SeqCst), 1);
    assert_eq!(runtime.instance_count(), 1);
}

#[tokio::test]
async fn cancellation_interrupts_a_long_handler() {
    init_tracing();
    let runtime = AgentRuntime::new();
    runtime
        .register_agent("patient", patient_registry(), |_id| Ok(PatientAgent))
        .unwrap();

    let token = CancellationToken::new();
    let ctx = MessageContext::new().with_cancellation(token.clone());
    let id = AgentId::new("patient", "default").unwrap();

    let delivery = {
        let runtime = runtime.clone();
        tokio::spawn(async move {
            runtime
                .send(
                    id,
                    TextMessage {
                        source: "alice".to_string(),
                        content: "take your time".to_string(),
                    },
                    ctx,
                )
                .await
        })
    };

    tokio::time::sleep(Duration::from_millis(20)).await;
    token.cancel();

    let err = delivery.await.unwrap().unwrap_err();
    assert!(matches!(err, Error::Cancelled));
}

#[tokio::test]
async fn pre_cancelled_delivery_never_runs_the_handler() {
    init_tracing();
    let runtime = collector_runtime();
    let id = AgentId::new("collector", "default").unwrap();

    let token = CancellationToken::new();
    token.cancel();

    let err = runtime
        .send(
            id.clone(),
            TextMessage {
                source: "alice".to_string(),
                content: "too late".to_string(),
            },
            MessageContext::new().with_cancellation(token),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Cancelled));
    assert!(received_from(&runtime, &id, "alice").is_none());
}

// =============================================================================
// Broadcast
// =============================================================================

#[tokio::test]
async fn subscribed_topic_delivers_to_the_bound_instance() {
    init_tracing();
    let runtime = collector_runtime();
    let topic = TopicId::new("room-17").unwrap();
    runtime
        .add_subscription(TopicSubscription::new(topic.clone(), "collector"))
        .unwrap();

    let report = runtime
        .publish(
            topic,
            TextMessage {
                source: "alice".to_string(),
                content: "hello room".to_string(),
            },
            MessageContext::new(),
        )
        .await
        .unwrap();

    assert!(report.is_complete());
    let id = AgentId::new("collector", "default").unwrap();
    assert_eq!(report.delivered, vec![id.clone()]);
    assert_eq!(
        received_from(&runtime, &id, "alice").as_deref(),
        Some("hello room")
    );
}

#[tokio::test]
async fn unrelated_topic_delivers_to_nobody() {
    init_tracing();
    let runtime = collector_runtime();
    runtime
        .add_subscription(TopicSubscription::new(
            TopicId::new("room-17").unwrap(),
            "collector",
        ))
        .unwrap();

    let report = runtime
        .publish(
            TopicId::new("room-99").unwrap(),
            TextMessage {
                source: "alice".to_string(),
                content: "wrong room".to_string(),
            },
            MessageContext::new(),
        )
        .await
        .unwrap();

    assert!(report.is_complete());
    assert!(report.delivered.is_empty());
    assert_eq!(runtime.instance_count(), 0);
}

#[tokio::test]
async fn one_failing_subscriber_does_not_block_the_rest() {
    init_tracing();
    let runtime = collector_runtime();
    runtime
        .register_agent("refuser", refuser_registry(), |_id| Ok(Refuser))
        .unwrap();

    let topic = TopicId::new("room-17").unwrap();
    runtime
        .add_subscription(TopicSubscription::new(topic.clone(), "refuser"))
        .unwrap();
    runtime
        .add_subscription(TopicSubscription::new(topic.clone(), "collector"))
        .unwrap();

    let report = runtime
        .publish(
            topic,
            TextMessage {
                source: "alice".to_string(),
                content: "still delivered".to_string(),
            },
            MessageContext::new(),
        )
        .await
        .unwrap();

    assert!(!report.is_complete());
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].recipient, "refuser/default");
    assert_eq!(report.delivered.len(), 1);

    let id = AgentId::new("collector", "default").unwrap();
    assert_eq!(
        received_from(&runtime, &id, "alice").as_deref(),
        Some("still delivered")
    );
}

#[tokio::test]
async fn publish_carries_sender_and_topic_to_handlers() {
    init_tracing();

    #[derive(Default)]
    struct EnvelopeProbe {
        seen: Mutex<Vec<(Option<String>, Option<String>)>>,
    }

    #[async_trait]
    impl Handler<TextMessage> for EnvelopeProbe {
        async fn handle(&self, _message: &TextMessage, ctx: &MessageContext) -> Result<()> {
            self.seen.lock().unwrap().push((
                ctx.sender().map(|s| s.qualified_name()),
                ctx.topic().map(|t| t.as_str().to_string()),
            ));
            Ok(())
        }
    }

    let runtime = AgentRuntime::new();
    runtime
        .register_agent(
            "envelope",
            HandlerRegistry::builder()
                .with_event::<TextMessage>()
                .build()
                .unwrap(),
            |_id| Ok(EnvelopeProbe::default()),
        )
        .unwrap();

    let topic = TopicId::new("room-17").unwrap();
    runtime
        .add_subscription(TopicSubscription::new(topic.clone(), "envelope"))
        .unwrap();

    let sender = AgentId::new("collector", "default").unwrap();
    runtime
        .publish(
            topic,
            TextMessage {
                source: "alice".to_string(),
                content: "with envelope".to_string(),
            },
            MessageContext::new().with_sender(sender),
        )
        .await
        .unwrap();

    let id = AgentId::new("envelope", "default").unwrap();
    let seen = runtime
        .try_agent_instance::<EnvelopeProbe>(&id)
        .map(|agent| agent.inner().seen.lock().unwrap().clone())
        .unwrap();
    assert_eq!(
        seen,
        vec![(
            Some("collector/default".to_string()),
            Some("room-17".to_string())
        )]
    );
}

// =============================================================================
// Lifecycle
// =============================================================================

#[tokio::test]
async fn shutdown_is_terminal() {
    init_tracing();
    let runtime = collector_runtime();
    let id = AgentId::new("collector", "default").unwrap();

    runtime
        .send(
            id.clone(),
            TextMessage {
                source: "alice".to_string(),
                content: "before".to_string(),
            },
            MessageContext::new(),
        )
        .await
        .unwrap();

    runtime.shutdown();
    assert!(runtime.is_closed());
    assert_eq!(runtime.instance_count(), 0);

    let err = runtime
        .send(
            id,
            TextMessage {
                source: "alice".to_string(),
                content: "after".to_string(),
            },
            MessageContext::new(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::RuntimeClosed));
}
