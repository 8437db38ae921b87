//! Correlation tracking for asynchronously issued device operations
//!
//! The issuing thread inserts an entry when an operation is launched;
//! the completion callback fills in device and timing data later,
//! usually from a different thread. Lookups return value copies, never
//! references into the map, so no caller can hold a stale pointer across
//! a concurrent `delete`.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Runtime-assigned id linking an operation's issue and completion
/// events
pub type CorrelationId = u32;

/// Host-side logical operation id
pub type ExternalId = u64;

/// Per-operation tracking record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrelationEntry {
    /// Host-side logical operation id (may be replaced after insertion
    /// if the host renumbers the operation)
    pub external_id: ExternalId,

    /// Device the operation ran on, absent until completion
    pub device_id: Option<u32>,

    /// Device-reported start timestamp, absent until completion
    pub start: Option<u64>,

    /// Device-reported end timestamp, absent until completion
    pub end: Option<u64>,
}

/// Concurrent map from correlation id to tracking entry.
///
/// Sharded internally so the issuing thread and the completion callback
/// do not contend on unrelated ids; operations on a single key are
/// short critical sections safe to run from runtime callback context.
/// Entries live until an explicit `delete`; there is no automatic
/// collection.
#[derive(Debug, Default)]
pub struct CorrelationMap {
    entries: DashMap<CorrelationId, CorrelationEntry>,
}

impl CorrelationMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an operation at issue time. Timestamps stay absent until
    /// `kernel_update` reports completion.
    pub fn insert(&self, correlation_id: CorrelationId, external_id: ExternalId) {
        self.entries.insert(
            correlation_id,
            CorrelationEntry {
                external_id,
                device_id: None,
                start: None,
                end: None,
            },
        );
    }

    /// Value copy of the entry, or `None` for an unknown id.
    pub fn lookup(&self, correlation_id: CorrelationId) -> Option<CorrelationEntry> {
        self.entries.get(&correlation_id).map(|entry| *entry)
    }

    /// Drop an entry once the host has consumed its timing.
    pub fn delete(&self, correlation_id: CorrelationId) {
        self.entries.remove(&correlation_id);
    }

    /// Overwrite the host-side id of an existing entry. Unknown ids are
    /// a defined no-op.
    pub fn external_id_replace(&self, correlation_id: CorrelationId, external_id: ExternalId) {
        match self.entries.get_mut(&correlation_id) {
            Some(mut entry) => entry.external_id = external_id,
            None => debug!("external_id_replace: unknown correlation id {correlation_id}"),
        }
    }

    /// Fill in completion data reported by the device.
    ///
    /// Timestamps are write-once: a second update for the same id is
    /// logged and ignored rather than overwriting recorded timing.
    /// Unknown ids are a defined no-op.
    pub fn kernel_update(
        &self,
        correlation_id: CorrelationId,
        device_id: u32,
        start: u64,
        end: u64,
    ) {
        match self.entries.get_mut(&correlation_id) {
            Some(mut entry) => {
                if entry.start.is_some() || entry.end.is_some() {
                    warn!("duplicate completion for correlation id {correlation_id}, keeping first");
                    return;
                }
                entry.device_id = Some(device_id);
                entry.start = Some(start);
                entry.end = Some(end);
            }
            None => debug!("kernel_update: unknown correlation id {correlation_id}"),
        }
    }

    /// Entries still awaiting consumption.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop all entries at session teardown.
    pub fn clear(&self) {
        self.entries.clear();
    }
}
