//! Static instruction analysis for warpscope
//!
//! Walks a recovered control-flow graph, classifies each decoded
//! instruction into a semantic metric, and accumulates per-PC register
//! and occurrence statistics that can be persisted to and reloaded from
//! a metrics file.

pub mod analyzer;
pub mod classify;
pub mod file;
pub mod metrics;
pub mod stat;

// Re-export the analysis surface
pub use analyzer::InstructionAnalyzer;
pub use file::MetricsFileError;
pub use metrics::{InstructionMetrics, MetricCatalog, MetricId};
pub use stat::{register_index, InstructionStat, RegIndex};
