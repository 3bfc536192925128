use std::str::FromStr;

use anyhow::{Context, Result};
use regex::{Captures, Regex, RegexBuilder};

/// Decimal literal as printed by the simulator (`2.13`, `.5`, `17`).
const DECIMAL: &str = r"([0-9]*\.?[0-9]+)";

/// Measurements recovered from one run's log.
///
/// Every numeric field is `None` unless a pattern matched and its capture
/// parsed. Absent is never reported as zero.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricRecord {
    pub source_file: String,
    pub ipc: Option<f64>,
    pub l1d_mpki: Option<f64>,
    pub l2_mpki: Option<f64>,
    pub llc_mpki: Option<f64>,
    pub l2_misses: Option<u64>,
    pub instructions: Option<u64>,
    pub prefetch_issued: Option<u64>,
    pub prefetch_useful: Option<u64>,
}

impl MetricRecord {
    /// MPKI for one cache level.
    pub fn mpki(&self, level: CacheLevel) -> Option<f64> {
        match level {
            CacheLevel::L1d => self.l1d_mpki,
            CacheLevel::L2 => self.l2_mpki,
            CacheLevel::Llc => self.llc_mpki,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CacheLevel {
    L1d,
    L2,
    Llc,
}

impl CacheLevel {
    pub const ALL: [CacheLevel; 3] = [CacheLevel::L1d, CacheLevel::L2, CacheLevel::Llc];

    pub fn label(self) -> &'static str {
        match self {
            CacheLevel::L1d => "L1D",
            CacheLevel::L2 => "L2",
            CacheLevel::Llc => "LLC",
        }
    }
}

/// Alternative patterns for one field, one per log dialect. The first pattern
/// that matches decides.
struct FieldRule {
    patterns: Vec<Regex>,
}

impl FieldRule {
    fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let patterns = patterns
            .iter()
            .map(|pattern| compile(pattern.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    /// Value of the first matching pattern, if it parses.
    fn first<T: FromStr>(&self, text: &str) -> Option<T> {
        self.patterns
            .iter()
            .find_map(|re| re.captures(text))
            .and_then(|caps| parse_capture(&caps, 1))
    }

    /// Value of the last occurrence of the first pattern that matches at all.
    fn last<T: FromStr>(&self, text: &str) -> Option<T> {
        self.patterns
            .iter()
            .find_map(|re| re.captures_iter(text).last())
            .and_then(|caps| parse_capture(&caps, 1))
    }
}

/// Compiled pattern set for every supported log dialect.
pub struct MetricExtractor {
    // [<phase>] finished CPU 0 instructions: <i> cycles: <c> cumulative IPC: <x>
    finished: Regex,
    // CPU 0 cumulative IPC: <x> instructions: <i> cycles: <c>
    roi_summary: Regex,
    heartbeat: FieldRule,
    instructions: FieldRule,
    l1d_mpki: FieldRule,
    l2_mpki: FieldRule,
    llc_mpki: FieldRule,
    l2_misses: FieldRule,
    prefetch_issued: FieldRule,
    prefetch_useful: FieldRule,
}

impl MetricExtractor {
    pub fn new() -> Result<Self> {
        Ok(Self {
            finished: compile(&format!(
                r"(?:(\w+)[ \t]+)?Finished\s+CPU\s+\d+\s+instructions:\s*([0-9]+)\s+cycles:\s*([0-9]+)\s+cumulative\s+IPC:\s*{DECIMAL}"
            ))?,
            roi_summary: compile(&format!(
                r"CPU\s+\d+\s+cumulative\s+IPC:\s*{DECIMAL}(?:\s+instructions:\s*([0-9]+))?"
            ))?,
            heartbeat: FieldRule::new(&[format!(r"cumulative\s+IPC:\s*{DECIMAL}")])?,
            instructions: FieldRule::new(&[r"CPU\s+\d+\s+instructions:\s*([0-9]+)"])?,
            l1d_mpki: FieldRule::new(&[format!(r"L1D\s+TOTAL.*MPKI:\s*{DECIMAL}")])?,
            l2_mpki: FieldRule::new(&[
                format!(r"L2C\s+TOTAL.*MPKI:\s*{DECIMAL}"),
                format!(r"L2\s*MPKI[:\s]+{DECIMAL}"),
            ])?,
            llc_mpki: FieldRule::new(&[format!(r"LLC\s+TOTAL.*MPKI:\s*{DECIMAL}")])?,
            l2_misses: FieldRule::new(&[
                r"L2\s+TOTAL\s+MISS(?:ES)?:\s*([0-9]+)",
                r"L2C\s+TOTAL\s+ACCESS:.*?MISS:\s*([0-9]+)",
            ])?,
            prefetch_issued: FieldRule::new(&[
                r"Prefetches\s+issued[:\s]+([0-9]+)",
                r"L2C\s+PREFETCH\s+.*?ISSUED:\s*([0-9]+)",
            ])?,
            prefetch_useful: FieldRule::new(&[
                r"Prefetches\s+useful[:\s]+(?:\(approx\):\s*)?([0-9]+)",
                r"L2C\s+PREFETCH\s+.*?USEFUL:\s*([0-9]+)",
            ])?,
        })
    }

    /// Extracts every recognised metric from `text`. Never fails; unmatched or
    /// malformed fields are left absent.
    pub fn extract(&self, text: &str) -> MetricRecord {
        // The warm-up phase prints its own finished line; it never counts.
        let finished = self
            .finished
            .captures_iter(text)
            .filter(|caps| {
                !caps
                    .get(1)
                    .is_some_and(|phase| phase.as_str().eq_ignore_ascii_case("warmup"))
            })
            .last();
        let roi = self.roi_summary.captures_iter(text).last();

        // Run-finished IPC first, the final heartbeat only as a fallback.
        let ipc = match (&finished, &roi) {
            (Some(caps), _) => parse_capture(caps, 4),
            (None, Some(caps)) => parse_capture(caps, 1),
            (None, None) => self.heartbeat.last(text),
        };

        let instructions = finished
            .as_ref()
            .and_then(|caps| parse_capture(caps, 2))
            .or_else(|| roi.as_ref().and_then(|caps| parse_capture(caps, 2)))
            .or_else(|| self.instructions.last(text));

        let l2_misses: Option<u64> = self.l2_misses.first(text);
        let l2_mpki = self
            .l2_mpki
            .first(text)
            .or_else(|| derive_l2_mpki(l2_misses, instructions));

        MetricRecord {
            source_file: String::new(),
            ipc,
            l1d_mpki: self.l1d_mpki.first(text),
            l2_mpki,
            llc_mpki: self.llc_mpki.first(text),
            l2_misses,
            instructions,
            prefetch_issued: self.prefetch_issued.first(text),
            prefetch_useful: self.prefetch_useful.first(text),
        }
    }

    /// Like [`MetricExtractor::extract`], tagging the record with its origin.
    pub fn extract_file(&self, source_file: &str, text: &str) -> MetricRecord {
        MetricRecord {
            source_file: source_file.to_string(),
            ..self.extract(text)
        }
    }
}

fn derive_l2_mpki(l2_misses: Option<u64>, instructions: Option<u64>) -> Option<f64> {
    match (l2_misses, instructions) {
        (Some(misses), Some(instructions)) if instructions > 0 => {
            Some(misses as f64 / instructions as f64 * 1000.0)
        }
        _ => None,
    }
}

fn parse_capture<T: FromStr>(caps: &Captures<'_>, group: usize) -> Option<T> {
    caps.get(group)?.as_str().parse().ok()
}

fn compile(pattern: &str) -> Result<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .with_context(|| format!("Invalid metric pattern '{pattern}'"))
}
