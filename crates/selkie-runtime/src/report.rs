//! Publish fan-out reporting

use selkie_core::agent::AgentId;
use selkie_core::error::Error;

/// One recipient's failure during a publish fan-out
#[derive(Debug)]
pub struct DeliveryFailure {
    /// Qualified name of the recipient, or the subscribed agent type when
    /// no valid id could be derived for it
    pub recipient: String,
    /// The error that recipient produced
    pub error: Error,
}

/// Summary of one publish fan-out
///
/// A publish never aborts on a failing recipient: every resolved recipient
/// is attempted and failures land here, leaving the sender to decide what
/// partial delivery means.
#[derive(Debug, Default)]
pub struct PublishReport {
    /// Recipients that accepted the message
    pub delivered: Vec<AgentId>,
    /// Recipients that failed
    pub failures: Vec<DeliveryFailure>,
}

impl PublishReport {
    /// True when every resolved recipient accepted the message
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Number of successful deliveries
    pub fn delivered_count(&self) -> usize {
        self.delivered.len()
    }

    /// Number of recipients attempted, successful or not
    pub fn attempted_count(&self) -> usize {
        self.delivered.len() + self.failures.len()
    }
}
