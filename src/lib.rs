pub mod aggregate;
pub mod charts;
pub mod compare;
pub mod config;
pub mod metrics;
pub mod report;
pub mod scan;
pub mod variant;

use anyhow::Result;
use log::info;

pub use aggregate::{RecordTable, TraceRecord, aggregate};
pub use compare::{ComparisonResult, Question, SkipReason, TraceComparison, resolve_and_compare};
pub use config::ReportConfig;
pub use metrics::{MetricExtractor, MetricRecord};
pub use scan::LogEntry;
pub use variant::{Variant, classify};

/// Runs the whole pipeline for `cfg` and writes every configured output.
pub fn run(cfg: &ReportConfig) -> Result<()> {
    let entries = scan::scan_output_dir(&cfg.output_dir, &cfg.extensions)?;
    info!(
        "Loaded {} log files from {}",
        entries.len(),
        cfg.output_dir.display()
    );

    let extractor = MetricExtractor::new()?;
    let table = aggregate(&extractor, entries);
    info!("Parsed {} trace folders", table.traces().len());

    report::save_records(&cfg.save_csv, &table, &cfg.null_marker)?;
    info!("Saved parsed data to {}", cfg.save_csv.display());

    let comparisons = compare::compare_all(&table, &cfg.prefixes);
    for comparison in &comparisons {
        println!("\n{comparison}");
    }

    if let Some(path) = &cfg.comparisons_csv {
        report::save_comparisons(path, &comparisons, &cfg.null_marker)?;
        info!("Saved comparisons to {}", path.display());
    }

    if let Some(path) = &cfg.charts {
        let charts: Vec<_> = comparisons.iter().flat_map(charts::charts_for).collect();
        charts::write_charts(path, &charts)?;
        info!("Saved {} chart specs to {}", charts.len(), path.display());
    }
    Ok(())
}
