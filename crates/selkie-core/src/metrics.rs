//! Metrics for Selkie
//!
//! Counters and histograms for dispatch observability. All recording goes
//! through the functions in this module; with the `otel` feature disabled
//! they compile to no-ops so call sites never need their own gating.

#[cfg(feature = "otel")]
mod otel_metrics {
    use crate::constants::{
        METRIC_NAME_AGENTS_CREATED_TOTAL, METRIC_NAME_DELIVERIES_TOTAL,
        METRIC_NAME_DELIVERY_DURATION_SECONDS, METRIC_NAME_PUBLISHES_TOTAL,
    };
    use once_cell::sync::Lazy;
    use opentelemetry::global;
    use opentelemetry::metrics::{Counter, Histogram};
    use opentelemetry::KeyValue;

    static AGENTS_CREATED: Lazy<Counter<u64>> = Lazy::new(|| {
        global::meter("selkie")
            .u64_counter(METRIC_NAME_AGENTS_CREATED_TOTAL)
            .with_description("Total number of agent instances created")
            .init()
    });

    static DELIVERIES: Lazy<Counter<u64>> = Lazy::new(|| {
        global::meter("selkie")
            .u64_counter(METRIC_NAME_DELIVERIES_TOTAL)
            .with_description("Total number of message deliveries")
            .init()
    });

    static DELIVERY_DURATION: Lazy<Histogram<f64>> = Lazy::new(|| {
        global::meter("selkie")
            .f64_histogram(METRIC_NAME_DELIVERY_DURATION_SECONDS)
            .with_description("Message delivery duration in seconds")
            .init()
    });

    static PUBLISHES: Lazy<Counter<u64>> = Lazy::new(|| {
        global::meter("selkie")
            .u64_counter(METRIC_NAME_PUBLISHES_TOTAL)
            .with_description("Total number of topic publishes")
            .init()
    });

    /// Record an agent instance creation
    pub fn record_agent_created() {
        AGENTS_CREATED.add(1, &[]);
    }

    /// Record one delivery with its kind ("send" or "publish") and outcome
    pub fn record_delivery(kind: &str, status: &str, duration_seconds: f64) {
        let labels = [
            KeyValue::new("kind", kind.to_string()),
            KeyValue::new("status", status.to_string()),
        ];
        DELIVERIES.add(1, &labels);
        DELIVERY_DURATION.record(
            duration_seconds,
            &[KeyValue::new("kind", kind.to_string())],
        );
    }

    /// Record one publish fan-out outcome ("complete" or "partial")
    pub fn record_publish(status: &str) {
        PUBLISHES.add(1, &[KeyValue::new("status", status.to_string())]);
    }
}

#[cfg(feature = "otel")]
pub use otel_metrics::*;

#[cfg(not(feature = "otel"))]
mod noop_metrics {
    /// Record an agent instance creation (no-op without `otel`)
    pub fn record_agent_created() {}

    /// Record one delivery (no-op without `otel`)
    pub fn record_delivery(_kind: &str, _status: &str, _duration_seconds: f64) {}

    /// Record one publish fan-out outcome (no-op without `otel`)
    pub fn record_publish(_status: &str) {}
}

#[cfg(not(feature = "otel"))]
pub use noop_metrics::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_functions_dont_panic() {
        // Without a configured meter provider these either no-op or record
        // into the default provider; both must be safe
        record_agent_created();
        record_delivery("send", "success", 0.002);
        record_delivery("publish", "error", 0.1);
        record_publish("complete");
        record_publish("partial");
    }
}
