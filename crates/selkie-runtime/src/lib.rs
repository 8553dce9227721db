//! Selkie Runtime
//!
//! The in-process agent runtime for Selkie: a lazily populated directory
//! of agent instances, point-to-point RPC, and topic fan-out.
//!
//! # Overview
//!
//! Hosts register agent types with [`AgentRuntime::register_agent`] (or a
//! raw factory with [`AgentRuntime::register_agent_type`]), bind topics
//! with [`AgentRuntime::add_subscription`], then move messages with
//! `send`/`request`/`publish`. Instances come into being on first
//! reference, one per [`AgentId`](selkie_core::AgentId), and live until
//! [`AgentRuntime::shutdown`].
//!
//! Deliveries pass through an [`InterventionHandler`] pipeline that can
//! observe, replace, or drop messages and RPC replies.
//!
//! # TigerStyle
//!
//! - One critical section per instance creation, never two instances
//! - Publish failures are isolated and reported, never amplified
//! - Closed means closed: every operation after shutdown says so

pub mod directory;
pub mod intervention;
pub mod report;
pub mod runtime;

pub use directory::{AgentDirectory, AgentFactory};
pub use intervention::{Intervention, InterventionHandler, NoopIntervention};
pub use report::{DeliveryFailure, PublishReport};
pub use runtime::AgentRuntime;
