//! Selkie Core
//!
//! Core types for the Selkie agent runtime: typed message dispatch,
//! agent identity, and topic subscriptions.
//!
//! # Overview
//!
//! Agents are addressed by [`AgentId`] (a type/key pair) and receive
//! messages through handler bindings declared per class in a
//! [`HandlerRegistry`]. A binding matches one concrete message type
//! exactly; notifications implement [`Handler`], request/response
//! implements [`RpcHandler`]. [`RoutedAgent`] wraps a class instance and
//! its registry behind the [`Agent`] trait the runtime drives.
//!
//! Broadcast routing is declared through [`TopicSubscription`]s collected
//! in a [`SubscriptionRegistry`]; which instance of a subscribed type
//! receives a publish is decided by the subscription's [`KeySelector`].
//!
//! # TigerStyle
//!
//! This crate follows TigerStyle principles:
//! - Explicit limits on everything (see [`constants`])
//! - Conflicts fail at construction, not at dispatch
//! - Assertions for invariants, errors for inputs
//! - No unbounded anything

pub mod agent;
pub mod config;
pub mod constants;
pub mod error;
pub mod handler;
pub mod message;
pub mod metrics;
pub mod routed;
pub mod subscription;
pub mod telemetry;

pub use agent::{Agent, AgentId};
pub use config::RuntimeConfig;
pub use constants::*;
pub use error::{Error, Result};
pub use handler::{Handler, HandlerKind, HandlerRegistry, HandlerRegistryBuilder, RpcHandler};
pub use message::{AnyMessage, AnyReply, CancellationToken, MessageContext};
pub use routed::RoutedAgent;
pub use subscription::{KeySelector, SubscriptionRegistry, TopicId, TopicSubscription};
pub use telemetry::{init_telemetry, TelemetryConfig, TelemetryGuard};
