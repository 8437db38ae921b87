//! Metric name interning and per-run aggregation

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::stat::InstructionStat;

/// Dense metric identifier, assigned in discovery order
pub type MetricId = u32;

/// Interning table from metric name to dense id.
///
/// Ids grow monotonically in first-seen order and are never reused or
/// renumbered within a run. Iteration yields entries in insertion order,
/// which fixes the on-disk order of the `<metric names>` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricCatalog {
    index: HashMap<String, MetricId>,
    entries: Vec<(String, MetricId)>,
}

impl MetricCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id for `name`, allocating the next id when unseen.
    pub fn intern(&mut self, name: &str) -> MetricId {
        if let Some(&id) = self.index.get(name) {
            return id;
        }
        let id = self.entries.len() as MetricId;
        self.index.insert(name.to_string(), id);
        self.entries.push((name.to_string(), id));
        id
    }

    /// Insert `name` with a caller-chosen id.
    ///
    /// Used when reloading a metrics file: ids recorded on disk are kept
    /// verbatim. Callers merging reloaded and freshly computed metrics
    /// into one aggregate must keep the two id spaces disjoint
    /// themselves; the catalog does not check for collisions.
    pub fn bind(&mut self, name: String, id: MetricId) {
        match self.index.insert(name.clone(), id) {
            Some(_) => {
                // Rebinding an existing name replaces its id in place
                if let Some(entry) = self.entries.iter_mut().find(|(n, _)| *n == name) {
                    entry.1 = id;
                }
            }
            None => self.entries.push((name, id)),
        }
    }

    /// Id for `name`, if seen.
    pub fn get(&self, name: &str) -> Option<MetricId> {
        self.index.get(name).copied()
    }

    /// Number of distinct metric names.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, MetricId)> {
        self.entries.iter().map(|(name, id)| (name.as_str(), *id))
    }
}

/// Aggregated result of one analysis run.
///
/// Owned by exactly one run; not shared across threads. `inst_stats` is
/// append-only and duplicate pcs are expected (one record per
/// occurrence, never merged by pc).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstructionMetrics {
    /// Metric name table, discovery order
    pub metric_names: MetricCatalog,

    /// Per-instruction records, append-only
    pub inst_stats: Vec<InstructionStat>,
}

impl InstructionMetrics {
    pub fn new() -> Self {
        Self::default()
    }
}
