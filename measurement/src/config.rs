//! Channel configuration supplied by the embedding profiler

use serde::{Deserialize, Serialize};

/// Pool behavior once every buffer up to the ceiling is checked out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GrowthPolicy {
    /// `alloc` waits until a producer returns a buffer
    Block,

    /// `alloc` keeps allocating past the ceiling
    Grow,
}

/// Buffer channel configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Record capacity of each transport buffer
    pub records_per_buffer: usize,

    /// Number of buffers the pool creates before the growth policy
    /// applies
    pub pool_ceiling: usize,

    /// Behavior when the pool is exhausted
    pub growth: GrowthPolicy,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            records_per_buffer: 16 * 1024,
            pool_ceiling: 4,
            growth: GrowthPolicy::Block,
        }
    }
}

impl ChannelConfig {
    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.records_per_buffer == 0 {
            anyhow::bail!("records_per_buffer must be greater than 0");
        }
        if self.pool_ceiling == 0 {
            anyhow::bail!("pool_ceiling must be greater than 0");
        }
        Ok(())
    }
}
