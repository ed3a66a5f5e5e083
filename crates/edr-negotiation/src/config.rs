//! Orchestrator tuning

use serde::{Deserialize, Serialize};

/// Queue and concurrency limits for the negotiation worker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NegotiationConfig {
    /// Negotiations accepted but not yet started before dispatch reports `ErrorRetry`
    pub queue_capacity: usize,
    /// Negotiations driven against the pipeline at the same time
    pub max_concurrent: usize,
}

impl Default for NegotiationConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 256,
            max_concurrent: 16,
        }
    }
}

impl NegotiationConfig {
    /// Check that both limits are non-zero
    pub fn validate(&self) -> Result<(), String> {
        if self.queue_capacity == 0 {
            return Err("negotiation.queue_capacity must be greater than zero".to_string());
        }
        if self.max_concurrent == 0 {
            return Err("negotiation.max_concurrent must be greater than zero".to_string());
        }
        Ok(())
    }
}
