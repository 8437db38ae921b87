//! Analysis pipeline round trips: analyze a small CFG, persist the
//! aggregate, and reload it into a fresh run.

use anyhow::Result;
use tempfile::tempdir;
use warpscope_analysis::{InstructionAnalyzer, InstructionMetrics};
use warpscope_shared::types::instruction::{Block, Function, Instruction, InstructionType};

fn inst(
    offset: u64,
    opcode: &str,
    kind: InstructionType,
    predicate: &str,
    operands: &[&str],
    modifiers: &[&str],
) -> Instruction {
    Instruction {
        offset,
        opcode: opcode.to_string(),
        predicate: predicate.to_string(),
        operands: operands.iter().map(|o| o.to_string()).collect(),
        modifiers: modifiers.iter().map(|m| m.to_string()).collect(),
        kind,
    }
}

fn sample_functions() -> Vec<Function> {
    vec![Function {
        name: "saxpy".to_string(),
        blocks: vec![
            Block {
                label: "B0".to_string(),
                insts: vec![
                    inst(0x00, "LDG", InstructionType::Memory, "", &["R2", "R4"], &["E"]),
                    inst(
                        0x10,
                        "FFMA",
                        InstructionType::Float,
                        "",
                        &["R6", "R2", "R8", "R6"],
                        &[],
                    ),
                    inst(
                        0x20,
                        "IADD3",
                        InstructionType::Integer,
                        "P0",
                        &["R4", "R4", "RZ", "R10"],
                        &[],
                    ),
                ],
            },
            Block {
                label: "B1".to_string(),
                insts: vec![
                    inst(0x30, "STG", InstructionType::Memory, "", &["R4", "R6"], &["E", "64"]),
                    inst(0x38, "EXIT", InstructionType::Control, "", &[], &[]),
                ],
            },
        ],
    }]
}

fn analyzed_metrics() -> InstructionMetrics {
    let mut metrics = InstructionMetrics::new();
    InstructionAnalyzer::analyze(&sample_functions(), &mut metrics);
    metrics
}

#[test]
fn test_analysis_pass_names_and_records() {
    let metrics = analyzed_metrics();

    assert_eq!(metrics.metric_names.get("MEMORY.LOAD.GLOBAL.32"), Some(0));
    assert_eq!(metrics.metric_names.get("FLOAT.MAD.32"), Some(1));
    assert_eq!(metrics.metric_names.get("INTEGER.ADD3"), Some(2));
    assert_eq!(metrics.metric_names.get("MEMORY.STORE.GLOBAL.64"), Some(3));
    assert_eq!(metrics.metric_names.get("CONTROL.EXIT"), Some(4));
    assert_eq!(metrics.inst_stats.len(), 5);

    // IADD3: predicate P0, dst R4, sources R4, RZ (kept as none), R10
    let add3 = &metrics.inst_stats[2];
    assert_eq!(add3.pc, 0x20);
    assert_eq!(add3.predicate, Some(0));
    assert_eq!(add3.dst, Some(4));
    assert_eq!(add3.srcs, vec![Some(4), None, Some(10)]);
}

fn roundtrip(sparse: bool) -> Result<()> {
    let metrics = analyzed_metrics();

    let dir = tempdir()?;
    let path = dir.path().join("kernel.inst");
    InstructionAnalyzer::dump(&path, &metrics, sparse)?;

    let mut reloaded = InstructionMetrics::new();
    InstructionAnalyzer::read(&path, &mut reloaded, sparse)?;

    // Every original name comes back under the MIX: prefix with its id
    // kept verbatim
    for (name, id) in metrics.metric_names.iter() {
        assert_eq!(reloaded.metric_names.get(&format!("MIX:{name}")), Some(id));
    }
    assert_eq!(reloaded.metric_names.len(), metrics.metric_names.len());

    // Every record comes back equivalent, with none sources dropped at
    // dump time
    assert_eq!(reloaded.inst_stats.len(), metrics.inst_stats.len());
    for (original, loaded) in metrics.inst_stats.iter().zip(&reloaded.inst_stats) {
        assert_eq!(loaded.pc, original.pc);
        assert_eq!(loaded.predicate, original.predicate);
        assert_eq!(loaded.dst, original.dst);
        let kept: Vec<_> = original.srcs.iter().filter(|s| s.is_some()).copied().collect();
        assert_eq!(loaded.srcs, kept);
        assert_eq!(loaded.stat, original.stat);
    }
    Ok(())
}

#[test]
fn test_roundtrip_sparse() -> Result<()> {
    roundtrip(true)
}

#[test]
fn test_roundtrip_dense() -> Result<()> {
    roundtrip(false)
}

#[test]
fn test_sparse_and_dense_differ_only_in_separators() -> Result<()> {
    let metrics = analyzed_metrics();
    let dir = tempdir()?;

    let sparse_path = dir.path().join("sparse.inst");
    let dense_path = dir.path().join("dense.inst");
    InstructionAnalyzer::dump(&sparse_path, &metrics, true)?;
    InstructionAnalyzer::dump(&dense_path, &metrics, false)?;

    let sparse = std::fs::read_to_string(&sparse_path)?;
    let dense = std::fs::read_to_string(&dense_path)?;
    assert_ne!(sparse, dense);
    assert_eq!(sparse.replace('\n', "#"), dense.replace('\n', "#"));
    Ok(())
}

#[test]
fn test_dump_with_no_metrics_fails_without_a_file() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("empty.inst");
    let metrics = InstructionMetrics::new();

    assert!(InstructionAnalyzer::dump(&path, &metrics, false).is_err());
    assert!(!path.exists());
    Ok(())
}

#[test]
fn test_read_from_missing_file_fails() {
    let mut metrics = InstructionMetrics::new();
    let result = InstructionAnalyzer::read("/nonexistent/kernel.inst", &mut metrics, false);
    assert!(result.is_err());
}
