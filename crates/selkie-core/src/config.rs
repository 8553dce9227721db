//! Configuration types for Selkie
//!
//! TigerStyle: explicit defaults, validated before use.

use crate::constants::{AGENT_INSTANCES_COUNT_DEFAULT, AGENT_INSTANCES_COUNT_MAX};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Runtime configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Cap on live agent instances
    #[serde(default = "default_max_instances_count")]
    pub max_instances_count: usize,

    /// Serialize deliveries to each instance through a single-flight gate
    ///
    /// Off by default; handlers of one instance may then run concurrently
    /// and must guard their own state.
    #[serde(default)]
    pub serialize_instance_delivery: bool,
}

fn default_max_instances_count() -> usize {
    AGENT_INSTANCES_COUNT_DEFAULT
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_instances_count: default_max_instances_count(),
            serialize_instance_delivery: false,
        }
    }
}

impl RuntimeConfig {
    /// Validate the configuration
    ///
    /// # Errors
    /// Returns `Error::InvalidConfiguration` describing the first invalid
    /// field.
    pub fn validate(&self) -> Result<()> {
        if self.max_instances_count == 0 {
            return Err(Error::invalid_configuration(
                "max_instances_count",
                "must be at least 1",
            ));
        }

        if self.max_instances_count > AGENT_INSTANCES_COUNT_MAX {
            return Err(Error::invalid_configuration(
                "max_instances_count",
                format!("must not exceed {}", AGENT_INSTANCES_COUNT_MAX),
            ));
        }

        Ok(())
    }
}
