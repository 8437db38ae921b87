//! Device-generated instrumentation record layout

use serde::{Deserialize, Serialize};

/// Raw instrumentation record written by the device
/// (must match the record layout of the GPU instrumentation patch)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchRecord {
    /// Program counter of the instrumented instruction
    pub pc: u64,

    /// Effective address touched (zero for non-memory records)
    pub address: u64,

    /// Access size in bytes
    pub size: u32,

    /// Stream-type specific flags
    pub flags: u32,
}
