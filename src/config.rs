use std::path::PathBuf;

use clap::Parser;

/// Trace-folder prefixes that select which study a trace belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionPrefixes {
    pub table_size: String,
    pub exclusive_vs_noninclusive: String,
    pub exclusive_prefetcher: String,
}

impl Default for QuestionPrefixes {
    fn default() -> Self {
        Self {
            table_size: "1st_trace".to_string(),
            exclusive_vs_noninclusive: "2nd_trace".to_string(),
            exclusive_prefetcher: "3rd_trace".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReportConfig {
    pub output_dir: PathBuf, // one sub-folder per trace
    pub save_csv: PathBuf,
    pub comparisons_csv: Option<PathBuf>,
    pub charts: Option<PathBuf>, // chart specs as JSON
    pub extensions: Vec<String>,
    pub null_marker: String,
    pub prefixes: QuestionPrefixes,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./output"),
            save_csv: PathBuf::from("outputs_parsed_all.csv"),
            comparisons_csv: None,
            charts: None,
            extensions: vec!["txt".to_string(), "out".to_string(), "log".to_string()],
            null_marker: "NA".to_string(),
            prefixes: QuestionPrefixes::default(),
        }
    }
}

/// Parse simulator run logs into a table and compare variants against baselines.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Directory holding one sub-folder of run logs per trace
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Where to write the parsed record table
    #[arg(long)]
    pub save_csv: Option<PathBuf>,

    /// Also write per-trace comparisons to this CSV file
    #[arg(long)]
    pub comparisons_csv: Option<PathBuf>,

    /// Also write chart specifications to this JSON file
    #[arg(long)]
    pub charts: Option<PathBuf>,

    /// Marker written for absent values
    #[arg(long)]
    pub null_marker: Option<String>,

    /// Log file extension to accept (repeatable)
    #[arg(long = "ext")]
    pub extensions: Vec<String>,

    #[arg(long)]
    pub q1_prefix: Option<String>,

    #[arg(long)]
    pub q2_prefix: Option<String>,

    #[arg(long)]
    pub q3_prefix: Option<String>,
}

impl Cli {
    /// Applies the given flags on top of [`ReportConfig::default`].
    pub fn into_config(self) -> ReportConfig {
        let mut cfg = ReportConfig::default();
        if let Some(dir) = self.output_dir {
            cfg.output_dir = dir;
        }
        if let Some(path) = self.save_csv {
            cfg.save_csv = path;
        }
        cfg.comparisons_csv = self.comparisons_csv;
        cfg.charts = self.charts;
        if let Some(marker) = self.null_marker {
            cfg.null_marker = marker;
        }
        if !self.extensions.is_empty() {
            cfg.extensions = self
                .extensions
                .into_iter()
                .map(|ext| ext.trim_start_matches('.').to_string())
                .collect();
        }
        if let Some(prefix) = self.q1_prefix {
            cfg.prefixes.table_size = prefix;
        }
        if let Some(prefix) = self.q2_prefix {
            cfg.prefixes.exclusive_vs_noninclusive = prefix;
        }
        if let Some(prefix) = self.q3_prefix {
            cfg.prefixes.exclusive_prefetcher = prefix;
        }
        cfg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_flags_gives_defaults() {
        let cfg = Cli::try_parse_from(["champsim-report"]).unwrap().into_config();
        assert_eq!(cfg.output_dir, PathBuf::from("./output"));
        assert_eq!(cfg.save_csv, PathBuf::from("outputs_parsed_all.csv"));
        assert_eq!(cfg.extensions, ["txt", "out", "log"]);
        assert_eq!(cfg.null_marker, "NA");
        assert_eq!(cfg.prefixes, QuestionPrefixes::default());
        assert!(cfg.charts.is_none());
    }

    #[test]
    fn flags_override_defaults() {
        let cfg = Cli::try_parse_from([
            "champsim-report",
            "--output-dir",
            "runs",
            "--ext",
            ".stdout",
            "--ext",
            "txt",
            "--null-marker",
            "null",
            "--q3-prefix",
            "q3_",
            "--charts",
            "charts.json",
        ])
        .unwrap()
        .into_config();
        assert_eq!(cfg.output_dir, PathBuf::from("runs"));
        assert_eq!(cfg.extensions, ["stdout", "txt"]);
        assert_eq!(cfg.null_marker, "null");
        assert_eq!(cfg.prefixes.exclusive_prefetcher, "q3_");
        assert_eq!(cfg.prefixes.table_size, "1st_trace");
        assert_eq!(cfg.charts, Some(PathBuf::from("charts.json")));
    }
}
