use std::{fmt::Display, fs::File, io::Write, path::Path};

use anyhow::{Context, Result};

use crate::{aggregate::RecordTable, compare::TraceComparison, metrics::CacheLevel};

pub const RECORD_COLUMNS: [&str; 11] = [
    "file",
    "trace_folder",
    "variant",
    "ipc",
    "l1d_mpki",
    "l2_mpki",
    "llc_mpki",
    "l2_misses",
    "instructions",
    "prefetch_issued",
    "prefetch_useful",
];

pub const COMPARISON_COLUMNS: [&str; 8] = [
    "trace_folder",
    "question",
    "variant",
    "baseline",
    "speedup",
    "l1d_mpki_delta",
    "l2_mpki_delta",
    "llc_mpki_delta",
];

/// Writes one row per record, in table order. Absent values become
/// `null_marker`.
pub fn write_records<W: Write>(writer: W, table: &RecordTable, null_marker: &str) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(RECORD_COLUMNS)?;
    for record in table.records() {
        let m = &record.metrics;
        csv.write_record([
            m.source_file.clone(),
            record.trace_folder.clone(),
            record.variant.to_string(),
            cell(m.ipc, null_marker),
            cell(m.l1d_mpki, null_marker),
            cell(m.l2_mpki, null_marker),
            cell(m.llc_mpki, null_marker),
            cell(m.l2_misses, null_marker),
            cell(m.instructions, null_marker),
            cell(m.prefetch_issued, null_marker),
            cell(m.prefetch_useful, null_marker),
        ])?;
    }
    csv.flush()?;
    Ok(())
}

/// Writes one row per (trace, variant, baseline) pairing.
pub fn write_comparisons<W: Write>(
    writer: W,
    comparisons: &[TraceComparison<'_>],
    null_marker: &str,
) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(COMPARISON_COLUMNS)?;
    for cmp in comparisons {
        for result in cmp.results.values() {
            for delta in &result.deltas {
                let mut row = vec![
                    cmp.trace_folder.to_string(),
                    cmp.question.label().to_string(),
                    result.variant.to_string(),
                    delta.baseline.to_string(),
                    cell(delta.speedup, null_marker),
                ];
                row.extend(
                    CacheLevel::ALL
                        .into_iter()
                        .map(|level| cell(delta.mpki_delta.get(level), null_marker)),
                );
                csv.write_record(&row)?;
            }
        }
    }
    csv.flush()?;
    Ok(())
}

pub fn save_records(path: &Path, table: &RecordTable, null_marker: &str) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Unable to create {}", path.display()))?;
    write_records(file, table, null_marker)
        .with_context(|| format!("Unable to write records to {}", path.display()))
}

pub fn save_comparisons(
    path: &Path,
    comparisons: &[TraceComparison<'_>],
    null_marker: &str,
) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Unable to create {}", path.display()))?;
    write_comparisons(file, comparisons, null_marker)
        .with_context(|| format!("Unable to write comparisons to {}", path.display()))
}

fn cell<T: Display>(value: Option<T>, null_marker: &str) -> String {
    match value {
        Some(v) => v.to_string(),
        None => null_marker.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        aggregate::TraceRecord,
        compare::{Question, resolve_and_compare},
        metrics::MetricRecord,
        variant::Variant,
    };

    fn table() -> RecordTable {
        RecordTable::from_records(vec![
            TraceRecord {
                trace_folder: "1st_trace_x".into(),
                variant: Variant::BaselineNonInclusive,
                metrics: MetricRecord {
                    source_file: "baseline.txt".into(),
                    ipc: Some(2.0),
                    l2_mpki: Some(0.0),
                    instructions: Some(1000),
                    ..MetricRecord::default()
                },
            },
            TraceRecord {
                trace_folder: "1st_trace_x".into(),
                variant: Variant::Table(32),
                metrics: MetricRecord {
                    source_file: "table32.txt".into(),
                    ipc: Some(2.13),
                    ..MetricRecord::default()
                },
            },
        ])
    }

    fn render(f: impl FnOnce(&mut Vec<u8>) -> Result<()>) -> String {
        let mut out = Vec::new();
        f(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn records_csv_marks_absent_values() {
        let table = table();
        let text = render(|out| write_records(out, &table, "NA"));
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], RECORD_COLUMNS.join(","));
        assert_eq!(lines[1], "baseline.txt,1st_trace_x,baseline_noninclusive,2,NA,0,NA,NA,1000,NA,NA");
        assert_eq!(lines[2], "table32.txt,1st_trace_x,table32,2.13,NA,NA,NA,NA,NA,NA,NA");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn comparisons_csv() {
        let table = table();
        let cmp = resolve_and_compare(&table, "1st_trace_x", Question::TableSize).unwrap();
        let text = render(|out| write_comparisons(out, &[cmp], "null"));
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], COMPARISON_COLUMNS.join(","));
        let fields: Vec<_> = lines[1].split(',').collect();
        assert_eq!(fields[..4], ["1st_trace_x", "q1", "table32", "baseline_noninclusive"]);
        assert!((fields[4].parse::<f64>().unwrap() - 1.065).abs() < 1e-9);
        assert_eq!(fields[5..], ["null", "null", "null"]);
    }
}
