//! Per-instruction register usage and metric counts

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use warpscope_shared::types::instruction::Instruction;

use crate::metrics::MetricId;

/// Architectural register index
pub type RegIndex = u32;

/// Decode a register index from an operand string.
///
/// Finds the first occurrence of `marker` (`'P'` for predicate
/// registers, `'R'` for general registers) and consumes the run of
/// decimal digits immediately following it. Returns `None` when the
/// marker is absent, no digit follows it (e.g. `RZ`), or the index does
/// not fit a `u32`. Register 0 is a valid index and is never confused
/// with absence.
pub fn register_index(text: &str, marker: char) -> Option<RegIndex> {
    let pos = text.find(marker)?;
    let rest = &text[pos + marker.len_utf8()..];
    let digits = match rest.find(|c: char| !c.is_ascii_digit()) {
        Some(end) => &rest[..end],
        None => rest,
    };
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

/// Register usage and metric counts derived from one decoded instruction.
///
/// One record is appended per instruction occurrence; records for the
/// same pc are never merged, so duplicate pcs are expected in an
/// aggregate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstructionStat {
    /// Instruction offset within its function (not globally unique)
    pub pc: u64,

    /// Guard predicate register, if any
    pub predicate: Option<RegIndex>,

    /// Destination register, if any
    pub dst: Option<RegIndex>,

    /// Source registers in operand order; `None` marks an operand that
    /// names the register file without an index (e.g. `RZ`), dropped on
    /// output
    pub srcs: Vec<Option<RegIndex>>,

    /// Occurrence count per metric id. `analyze` writes exactly one
    /// entry; merged records loaded from disk may carry several.
    pub stat: BTreeMap<MetricId, u64>,
}

impl InstructionStat {
    /// Decode the register operands of an instruction.
    pub fn new(inst: &Instruction) -> Self {
        let predicate = register_index(&inst.predicate, 'P');

        let mut dst = None;
        let mut srcs = Vec::new();
        if let Some((first, rest)) = inst.operands.split_first() {
            dst = register_index(first, 'R');
            for operand in rest {
                if operand.contains('R') {
                    srcs.push(register_index(operand, 'R'));
                }
            }
        }

        Self {
            pc: inst.offset,
            predicate,
            dst,
            srcs,
            stat: BTreeMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warpscope_shared::types::instruction::InstructionType;

    fn inst(predicate: &str, operands: &[&str]) -> Instruction {
        Instruction {
            offset: 0x20,
            opcode: "IADD3".to_string(),
            predicate: predicate.to_string(),
            operands: operands.iter().map(|o| o.to_string()).collect(),
            modifiers: vec![],
            kind: InstructionType::Integer,
        }
    }

    #[test]
    fn test_register_index_decoding() {
        assert_eq!(register_index("R12", 'R'), Some(12));
        assert_eq!(register_index("R0", 'R'), Some(0));
        assert_eq!(register_index("-R7", 'R'), Some(7));
        assert_eq!(register_index("P3", 'P'), Some(3));
        assert_eq!(register_index("!P0", 'P'), Some(0));
        // Digit run stops at the first non-digit
        assert_eq!(register_index("R12.reuse", 'R'), Some(12));
    }

    #[test]
    fn test_register_index_none_sentinel() {
        // No digits after the marker
        assert_eq!(register_index("RZ", 'R'), None);
        assert_eq!(register_index("PT", 'P'), None);
        // No marker at all
        assert_eq!(register_index("0x10", 'R'), None);
        assert_eq!(register_index("", 'R'), None);
        // Index too large for a register
        assert_eq!(register_index("R99999999999", 'R'), None);
    }

    #[test]
    fn test_stat_from_instruction() {
        let stat = InstructionStat::new(&inst("P1", &["R4", "R5", "R6"]));
        assert_eq!(stat.pc, 0x20);
        assert_eq!(stat.predicate, Some(1));
        assert_eq!(stat.dst, Some(4));
        assert_eq!(stat.srcs, vec![Some(5), Some(6)]);
        assert!(stat.stat.is_empty());
    }

    #[test]
    fn test_stat_unpredicated() {
        let stat = InstructionStat::new(&inst("", &["R4", "R5"]));
        assert_eq!(stat.predicate, None);
    }

    #[test]
    fn test_stat_zero_register_is_not_none() {
        let stat = InstructionStat::new(&inst("P0", &["R0", "R1"]));
        assert_eq!(stat.predicate, Some(0));
        assert_eq!(stat.dst, Some(0));
    }

    #[test]
    fn test_stat_rz_source_kept_as_none() {
        // RZ names the register file but carries no index: it stays in
        // the source list as a none entry
        let stat = InstructionStat::new(&inst("", &["R4", "RZ", "R6"]));
        assert_eq!(stat.srcs, vec![None, Some(6)]);
    }

    #[test]
    fn test_stat_non_register_operands_skipped() {
        // An immediate contributes nothing to the source list
        let stat = InstructionStat::new(&inst("", &["R4", "0x18", "R6"]));
        assert_eq!(stat.srcs, vec![Some(6)]);
    }

    #[test]
    fn test_stat_no_operands() {
        let stat = InstructionStat::new(&inst("", &[]));
        assert_eq!(stat.dst, None);
        assert!(stat.srcs.is_empty());
    }
}
