//! On-disk metrics file format
//!
//! Two sections in fixed order, `<metric names>` then `<inst stats>`.
//! Records are separated by a newline in sparse mode or by `#`
//! otherwise; the flag is not recorded in the file, so a reader must use
//! the same mode the writer used.
//!
//! ```text
//! <metric names>
//! (MEMORY.LOAD.GLOBAL.32,0)#(INTEGER.ADD3,1)#
//! <inst stats>
//! (16,1,4,5:7:,0:1,)#(24,,,,1:1,)#
//! ```
//!
//! Stat record fields: pc, predicate, dst, colon-terminated source
//! registers, then one or more `metric_id:count` pairs. An empty
//! predicate, dst, or source field denotes absence.

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::num::ParseIntError;
use std::path::Path;

use thiserror::Error;
use tracing::warn;

use crate::metrics::InstructionMetrics;
use crate::stat::InstructionStat;

const METRIC_NAMES_HEADER: &str = "<metric names>";
const INST_STATS_HEADER: &str = "<inst stats>";

/// Prefix applied to every metric name loaded from disk, so reloaded
/// names cannot collide with names computed in the current run.
const MIX_PREFIX: &str = "MIX:";

/// Failures while writing or reading a metrics file.
///
/// A read failure leaves records parsed before the failure in the
/// aggregate; the caller decides whether to keep or discard the partial
/// state.
#[derive(Debug, Error)]
pub enum MetricsFileError {
    #[error("metrics file I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("refusing to write a metrics file with no metric names")]
    NoMetrics,

    #[error("expected section header {0:?}")]
    MissingSection(&'static str),

    #[error("unparseable {field} in record {record:?}: {source}")]
    ParseInt {
        field: &'static str,
        record: String,
        source: ParseIntError,
    },
}

fn parse_int<T: std::str::FromStr<Err = ParseIntError>>(
    text: &str,
    field: &'static str,
    record: &str,
) -> Result<T, MetricsFileError> {
    text.parse().map_err(|source| MetricsFileError::ParseInt {
        field,
        record: record.to_string(),
        source,
    })
}

pub(crate) fn dump(
    path: &Path,
    metrics: &InstructionMetrics,
    sparse: bool,
) -> Result<(), MetricsFileError> {
    // Nothing to write is an error, not a silent success; checked before
    // the file is created so a failed dump leaves no file behind.
    if metrics.metric_names.is_empty() {
        return Err(MetricsFileError::NoMetrics);
    }

    let sep = if sparse { '\n' } else { '#' };
    let mut out = BufWriter::new(File::create(path)?);

    writeln!(out, "{METRIC_NAMES_HEADER}")?;
    for (name, id) in metrics.metric_names.iter() {
        write!(out, "({name},{id}){sep}")?;
    }
    writeln!(out)?;

    writeln!(out, "{INST_STATS_HEADER}")?;
    for inst_stat in &metrics.inst_stats {
        write_stat(&mut out, inst_stat)?;
        write!(out, "{sep}")?;
    }
    writeln!(out)?;

    out.flush()?;
    Ok(())
}

fn write_stat(out: &mut impl Write, inst_stat: &InstructionStat) -> io::Result<()> {
    write!(out, "({},", inst_stat.pc)?;
    if let Some(predicate) = inst_stat.predicate {
        write!(out, "{predicate}")?;
    }
    write!(out, ",")?;
    if let Some(dst) = inst_stat.dst {
        write!(out, "{dst}")?;
    }
    write!(out, ",")?;
    // None sources are dropped on output
    for src in inst_stat.srcs.iter().flatten() {
        write!(out, "{src}:")?;
    }
    write!(out, ",")?;
    for (metric_id, count) in &inst_stat.stat {
        write!(out, "{metric_id}:{count},")?;
    }
    write!(out, ")")
}

pub(crate) fn read(
    path: &Path,
    metrics: &mut InstructionMetrics,
    sparse: bool,
) -> Result<(), MetricsFileError> {
    let mut lines = BufReader::new(File::open(path)?).lines();

    let first = lines.next().transpose()?;
    if first.as_deref() != Some(METRIC_NAMES_HEADER) {
        return Err(MetricsFileError::MissingSection(METRIC_NAMES_HEADER));
    }

    let mut found_stats = false;
    while let Some(line) = lines.next().transpose()? {
        if line.is_empty() {
            continue;
        }
        if line == INST_STATS_HEADER {
            found_stats = true;
            break;
        }
        if sparse {
            parse_metric_entry(&line, metrics)?;
        } else {
            for record in line.split('#').filter(|r| !r.is_empty()) {
                parse_metric_entry(record, metrics)?;
            }
        }
    }
    if !found_stats {
        return Err(MetricsFileError::MissingSection(INST_STATS_HEADER));
    }

    while let Some(line) = lines.next().transpose()? {
        if line.is_empty() {
            continue;
        }
        if sparse {
            metrics.inst_stats.push(parse_stat_record(&line)?);
        } else {
            for record in line.split('#').filter(|r| !r.is_empty()) {
                metrics.inst_stats.push(parse_stat_record(record)?);
            }
        }
    }

    Ok(())
}

/// Parse one `(name,id)` entry, binding the name under the `MIX:` prefix
/// with its id taken verbatim from the file.
fn parse_metric_entry(
    record: &str,
    metrics: &mut InstructionMetrics,
) -> Result<(), MetricsFileError> {
    let body = record
        .strip_prefix('(')
        .and_then(|r| r.strip_suffix(')'))
        .unwrap_or(record);
    let Some((name, id)) = body.split_once(',') else {
        warn!("skipping malformed metric entry {record:?}");
        return Ok(());
    };
    let id = parse_int(id, "metric_id", record)?;
    metrics
        .metric_names
        .bind(format!("{MIX_PREFIX}{name}"), id);
    Ok(())
}

/// Parse one `(pc,predicate,dst,srcs,id:count,...)` record.
fn parse_stat_record(record: &str) -> Result<InstructionStat, MetricsFileError> {
    let body = record
        .strip_prefix('(')
        .and_then(|r| r.strip_suffix(')'))
        .unwrap_or(record);

    let mut inst_stat = InstructionStat::default();
    for (position, field) in body.split(',').enumerate() {
        match position {
            0 => inst_stat.pc = parse_int(field, "pc", record)?,
            1 => {
                if !field.is_empty() {
                    inst_stat.predicate = Some(parse_int(field, "predicate", record)?);
                }
            }
            2 => {
                if !field.is_empty() {
                    inst_stat.dst = Some(parse_int(field, "dst", record)?);
                }
            }
            3 => {
                for src in field.split(':').filter(|s| !s.is_empty()) {
                    inst_stat.srcs.push(Some(parse_int(src, "src", record)?));
                }
            }
            _ => {
                // Trailing comma before the closing paren leaves an
                // empty final field
                if field.is_empty() {
                    continue;
                }
                let Some((metric_id, count)) = field.split_once(':') else {
                    warn!("skipping malformed stat pair {field:?} in {record:?}");
                    continue;
                };
                let metric_id = parse_int(metric_id, "metric_id", record)?;
                let count = parse_int(count, "count", record)?;
                inst_stat.stat.insert(metric_id, count);
            }
        }
    }

    Ok(inst_stat)
}
