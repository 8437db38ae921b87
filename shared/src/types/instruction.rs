//! Decoded instruction and control-flow input types
//!
//! These types are delivered by the binary loader/CFG builder with
//! opcode, operand, and modifier strings already decoded; warpscope
//! never parses raw machine code.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse instruction category assigned by the decoder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InstructionType {
    Memory,
    Float,
    Integer,
    Texture,
    Control,
    Misc,
}

/// A single decoded machine instruction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    /// Byte offset of the instruction within its function
    pub offset: u64,

    /// Opcode mnemonic, e.g. `LDG` or `FADD`
    pub opcode: String,

    /// Guard predicate string (empty when unpredicated)
    pub predicate: String,

    /// Operand strings in encoding order, destination first
    pub operands: Vec<String>,

    /// Modifier tokens, e.g. `64` or `E`
    pub modifiers: Vec<String>,

    /// Coarse category used for classifier dispatch
    pub kind: InstructionType,
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}: {}", self.offset, self.opcode)?;
        if !self.predicate.is_empty() {
            write!(f, " @{}", self.predicate)?;
        }
        if !self.operands.is_empty() {
            write!(f, " {}", self.operands.join(", "))?;
        }
        Ok(())
    }
}

/// A straight-line block of instructions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Block label from the recovered control-flow graph
    pub label: String,

    /// Instructions in program order
    pub insts: Vec<Instruction>,
}

/// A function recovered from the program's control-flow graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Function {
    /// Mangled function name
    pub name: String,

    /// Blocks in the order the CFG builder emitted them
    pub blocks: Vec<Block>,
}

impl Function {
    /// Total instruction count across all blocks
    pub fn inst_count(&self) -> usize {
        self.blocks.iter().map(|b| b.insts.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_instruction() -> Instruction {
        Instruction {
            offset: 0x10,
            opcode: "LDG".to_string(),
            predicate: "P0".to_string(),
            operands: vec!["R2".to_string(), "R4".to_string()],
            modifiers: vec!["E".to_string()],
            kind: InstructionType::Memory,
        }
    }

    #[test]
    fn test_instruction_serialization() {
        let inst = sample_instruction();
        let json = serde_json::to_string(&inst).unwrap();
        let deserialized: Instruction = serde_json::from_str(&json).unwrap();
        assert_eq!(inst, deserialized);
    }

    #[test]
    fn test_instruction_display() {
        let inst = sample_instruction();
        assert_eq!(inst.to_string(), "0x10: LDG @P0 R2, R4");

        let bare = Instruction {
            offset: 0,
            opcode: "EXIT".to_string(),
            predicate: String::new(),
            operands: vec![],
            modifiers: vec![],
            kind: InstructionType::Control,
        };
        assert_eq!(bare.to_string(), "0x0: EXIT");
    }

    #[test]
    fn test_function_inst_count() {
        let function = Function {
            name: "kernel".to_string(),
            blocks: vec![
                Block {
                    label: "B0".to_string(),
                    insts: vec![sample_instruction(), sample_instruction()],
                },
                Block {
                    label: "B1".to_string(),
                    insts: vec![sample_instruction()],
                },
            ],
        };
        assert_eq!(function.inst_count(), 3);
    }
}
