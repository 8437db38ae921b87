//! Control-flow walk and metric aggregation

use std::path::Path;

use tracing::{debug, info};

use warpscope_shared::types::instruction::Function;

use crate::classify::classify;
use crate::file::{self, MetricsFileError};
use crate::metrics::InstructionMetrics;
use crate::stat::InstructionStat;

/// Walks functions, blocks, and instructions, classifying each one and
/// accumulating per-instruction statistics into an aggregate.
pub struct InstructionAnalyzer;

impl InstructionAnalyzer {
    /// Classify every instruction and append its stat record.
    ///
    /// Instructions are visited in the order given by the caller;
    /// nothing is skipped or deduplicated, so a pc that appears several
    /// times produces several records. Pure computation over
    /// already-decoded input; cannot fail.
    pub fn analyze(functions: &[Function], metrics: &mut InstructionMetrics) {
        for function in functions {
            for block in &function.blocks {
                for inst in &block.insts {
                    let metric_name = classify(inst);
                    debug!("{inst}  ----  {metric_name}");

                    let metric_id = metrics.metric_names.intern(&metric_name);
                    let mut inst_stat = InstructionStat::new(inst);
                    *inst_stat.stat.entry(metric_id).or_insert(0) += 1;
                    metrics.inst_stats.push(inst_stat);
                }
            }
        }
        info!(
            "analyzed {} instructions across {} functions, {} distinct metrics",
            metrics.inst_stats.len(),
            functions.len(),
            metrics.metric_names.len()
        );
    }

    /// Serialize an aggregate to `path`.
    ///
    /// Refuses an aggregate with no metric names; an I/O failure is
    /// reported to the caller, who decides whether to continue without
    /// persisted metrics.
    pub fn dump(
        path: impl AsRef<Path>,
        metrics: &InstructionMetrics,
        sparse: bool,
    ) -> Result<(), MetricsFileError> {
        file::dump(path.as_ref(), metrics, sparse)
    }

    /// Deserialize a previously dumped file, merging into `metrics`.
    ///
    /// Every loaded metric name is prefixed with `MIX:` so it cannot
    /// collide with names computed in the current run; loaded ids are
    /// kept verbatim, so callers also computing fresh metrics into the
    /// same aggregate must keep the id spaces disjoint. `sparse` must
    /// match the flag used at dump time.
    pub fn read(
        path: impl AsRef<Path>,
        metrics: &mut InstructionMetrics,
        sparse: bool,
    ) -> Result<(), MetricsFileError> {
        file::read(path.as_ref(), metrics, sparse)
    }
}
