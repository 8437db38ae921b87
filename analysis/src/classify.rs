//! Opcode-to-metric classification
//!
//! Each coarse instruction category has one pure classification
//! function; dispatch is a match on the decoder-assigned category tag.
//! Every opcode resolves to some metric name: unrecognized opcodes fall
//! through to an `OTHER` qualifier within their category, so
//! classification has no failure mode.
//!
//! Opcode matching is case-sensitive and precedence within a category is
//! ordered: in the control category the `MEMBAR`/`DEPBAR` barrier check
//! runs before the `SYNC`/`BAR` check so that `BAR.SYNC.WARP` resolves
//! to a sync, not a barrier.

use warpscope_shared::types::instruction::{Instruction, InstructionType};

/// Derive the semantic metric name for a decoded instruction.
pub fn classify(inst: &Instruction) -> String {
    match inst.kind {
        InstructionType::Memory => classify_memory(inst),
        InstructionType::Float => classify_float(inst),
        InstructionType::Integer => classify_integer(inst),
        InstructionType::Texture => classify_texture(inst),
        InstructionType::Control => classify_control(inst),
        InstructionType::Misc => classify_misc(inst),
    }
}

fn classify_memory(inst: &Instruction) -> String {
    let opcode = inst.opcode.as_str();

    let (ldst, scope) = if opcode.contains("LD") {
        let scope = match opcode {
            "LDS" => ".SHARED",
            "LDL" => ".LOCAL",
            "LDG" => ".GLOBAL",
            _ => "",
        };
        (".LOAD", scope)
    } else if opcode.contains("ST") {
        let scope = match opcode {
            "STS" => ".SHARED",
            "STL" => ".LOCAL",
            "STG" => ".GLOBAL",
            _ => "",
        };
        (".STORE", scope)
    } else if opcode == "RED" || opcode.contains("ATOM") {
        let scope = match opcode {
            "ATOMS" => ".SHARED",
            "ATOMG" => ".GLOBAL",
            _ => "",
        };
        (".ATOMIC", scope)
    } else {
        (".OTHER", "")
    };

    // 32-bit unless a width modifier says otherwise; the last matching
    // modifier wins
    let mut width = ".32".to_string();
    for modifier in &inst.modifiers {
        if modifier == "64" || modifier == "128" {
            width = format!(".{modifier}");
        }
    }

    format!("MEMORY{ldst}{scope}{width}")
}

fn classify_float(inst: &Instruction) -> String {
    let opcode = inst.opcode.as_str();

    let width = match opcode.chars().next() {
        Some('D') => ".64",
        Some('H') => ".16",
        _ => ".32",
    };

    let ty = if opcode == "MUFU" {
        ".MUFU"
    } else if opcode.contains("ADD") {
        ".ADD"
    } else if opcode.contains("MUL") {
        ".MUL"
    } else if opcode.contains("FMA") {
        ".MAD"
    } else if opcode.contains("MMA") {
        ".TENSOR"
    } else {
        ".OTHER"
    };

    format!("FLOAT{ty}{width}")
}

fn classify_integer(inst: &Instruction) -> String {
    let opcode = inst.opcode.as_str();

    let ty = if opcode.contains("MAD") {
        ".MAD"
    } else if opcode.contains("DP") {
        ".DOT"
    } else if opcode.contains("MMA") {
        ".TENSOR"
    } else if opcode.contains("MUL") {
        ".MUL"
    } else if opcode.contains("ADD") {
        if opcode == "IADD3" {
            ".ADD3"
        } else {
            ".ADD"
        }
    } else {
        ".OTHER"
    };

    format!("INTEGER{ty}")
}

fn classify_texture(_inst: &Instruction) -> String {
    "TEXTURE".to_string()
}

fn classify_control(inst: &Instruction) -> String {
    let opcode = inst.opcode.as_str();

    let ty = if opcode.contains("MEMBAR") || opcode.contains("DEPBAR") {
        ".BAR"
    } else if opcode.contains("SYNC") || opcode.contains("BAR") {
        if opcode.contains("WARP") {
            ".SYNC.WARP"
        } else {
            ".SYNC.BLOCK"
        }
    } else if opcode.contains("SHFL") {
        ".SHFL"
    } else if opcode.contains("CAL") {
        ".CALL"
    } else if opcode.contains("EXIT") {
        ".EXIT"
    } else if opcode.contains("RET") {
        ".RET"
    } else if opcode.contains("JM") {
        ".JMP"
    } else if opcode.contains("BR") {
        ".BRANCH"
    } else {
        ".OTHER"
    };

    format!("CONTROL{ty}")
}

fn classify_misc(inst: &Instruction) -> String {
    let opcode = inst.opcode.as_str();

    let ty = if opcode.contains("I2") || opcode.contains("F2") || opcode == "FRND" {
        ".CONVERT"
    } else {
        ".OTHER"
    };

    format!("MISC{ty}")
}
