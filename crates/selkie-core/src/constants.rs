//! TigerStyle constants for Selkie
//!
//! All limits are explicit, use big-endian naming (most significant first),
//! and include units in the name.

// =============================================================================
// Agent Identity Limits
// =============================================================================

/// Maximum length of an agent type name in bytes
pub const AGENT_TYPE_LENGTH_BYTES_MAX: usize = 128;

/// Maximum length of an agent key in bytes
pub const AGENT_KEY_LENGTH_BYTES_MAX: usize = 256;

/// Well-known key addressed by subscriptions that do not select one
pub const DEFAULT_AGENT_KEY: &str = "default";

// =============================================================================
// Dispatch Limits
// =============================================================================

/// Maximum number of handler bindings per agent class
pub const HANDLER_BINDINGS_COUNT_MAX: usize = 1_024;

/// Maximum number of live agent instances per runtime
pub const AGENT_INSTANCES_COUNT_MAX: usize = 1_000_000;

/// Default cap on live agent instances per runtime
pub const AGENT_INSTANCES_COUNT_DEFAULT: usize = 100_000;

// =============================================================================
// Topic Limits
// =============================================================================

/// Maximum length of a topic identifier in bytes
pub const TOPIC_LENGTH_BYTES_MAX: usize = 256;

/// Maximum number of topic subscriptions per runtime
pub const SUBSCRIPTIONS_COUNT_MAX: usize = 16_384;

// =============================================================================
// Observability - Metric Names (TigerStyle: explicit, with units)
// =============================================================================

/// Metric: Total number of agent instances created (counter)
pub const METRIC_NAME_AGENTS_CREATED_TOTAL: &str = "selkie_agents_created_total";

/// Metric: Total number of message deliveries (counter, labels: kind, status)
pub const METRIC_NAME_DELIVERIES_TOTAL: &str = "selkie_deliveries_total";

/// Metric: Delivery duration in seconds (histogram, labels: kind)
pub const METRIC_NAME_DELIVERY_DURATION_SECONDS: &str = "selkie_delivery_duration_seconds";

/// Metric: Total number of topic publishes (counter, labels: status)
pub const METRIC_NAME_PUBLISHES_TOTAL: &str = "selkie_publishes_total";

// Compile-time assertions for constant validity
const _: () = {
    assert!(AGENT_TYPE_LENGTH_BYTES_MAX >= 64);
    assert!(AGENT_KEY_LENGTH_BYTES_MAX >= AGENT_TYPE_LENGTH_BYTES_MAX);
    assert!(!DEFAULT_AGENT_KEY.is_empty());
    assert!(DEFAULT_AGENT_KEY.len() <= AGENT_KEY_LENGTH_BYTES_MAX);
    assert!(AGENT_INSTANCES_COUNT_DEFAULT <= AGENT_INSTANCES_COUNT_MAX);
    assert!(HANDLER_BINDINGS_COUNT_MAX >= 16);
};
