use std::{collections::BTreeMap, fmt};

use log::{debug, warn};

use crate::{
    aggregate::{RecordTable, TraceGroup, TraceRecord},
    config::QuestionPrefixes,
    metrics::{CacheLevel, MetricRecord},
    variant::Variant,
};

const TABLE_SIZES: [u32; 3] = [32, 64, 128];

/// The study a trace folder belongs to, picked from its name prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Question {
    /// Q1: prefetcher table size on the non-inclusive cache.
    TableSize,
    /// Q2: exclusive vs non-inclusive cache, no prefetcher.
    ExclusiveVsNonInclusive,
    /// Q3: prefetcher on the exclusive cache, against both baselines.
    ExclusivePrefetcher,
}

impl Question {
    pub fn for_trace_folder(trace_folder: &str, prefixes: &QuestionPrefixes) -> Option<Self> {
        [
            (&prefixes.table_size, Question::TableSize),
            (&prefixes.exclusive_vs_noninclusive, Question::ExclusiveVsNonInclusive),
            (&prefixes.exclusive_prefetcher, Question::ExclusivePrefetcher),
        ]
        .into_iter()
        .find(|(prefix, _)| trace_folder.starts_with(prefix.as_str()))
        .map(|(_, question)| question)
    }

    pub fn label(self) -> &'static str {
        match self {
            Question::TableSize => "q1",
            Question::ExclusiveVsNonInclusive => "q2",
            Question::ExclusivePrefetcher => "q3",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Question::TableSize => "table-size study",
            Question::ExclusiveVsNonInclusive => "exclusive vs non-inclusive",
            Question::ExclusivePrefetcher => "exclusive-prefetcher study",
        }
    }

    /// Baselines that must be present for the trace to be compared.
    pub fn baselines(self) -> &'static [Variant] {
        match self {
            Question::TableSize => &[Variant::BaselineNonInclusive],
            Question::ExclusiveVsNonInclusive | Question::ExclusivePrefetcher => {
                &[Variant::BaselineNonInclusive, Variant::BaselineExclusive]
            }
        }
    }

    /// Variants compared against the baselines, in report order.
    pub fn compared_variants(self) -> Vec<Variant> {
        match self {
            Question::TableSize => TABLE_SIZES.into_iter().map(Variant::Table).collect(),
            Question::ExclusiveVsNonInclusive => vec![Variant::BaselineExclusive],
            Question::ExclusivePrefetcher => {
                TABLE_SIZES.into_iter().map(Variant::ExclusiveTable).collect()
            }
        }
    }

    /// Baselines each compared variant is measured against.
    fn references(self) -> &'static [Variant] {
        match self {
            Question::TableSize | Question::ExclusiveVsNonInclusive => {
                &[Variant::BaselineNonInclusive]
            }
            Question::ExclusivePrefetcher => {
                &[Variant::BaselineNonInclusive, Variant::BaselineExclusive]
            }
        }
    }
}

impl fmt::Display for Question {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.label().to_uppercase(), self.title())
    }
}

/// Why a trace produced no comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    MissingBaseline(Variant),
    /// The baseline exists but its IPC is absent or not positive.
    UnusableBaselineIpc(Variant),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingBaseline(variant) => write!(f, "no {variant} run"),
            SkipReason::UnusableBaselineIpc(variant) => {
                write!(f, "{variant} run has no usable IPC")
            }
        }
    }
}

/// Per-level MPKI difference, variant minus baseline.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MpkiDelta {
    pub l1d: Option<f64>,
    pub l2: Option<f64>,
    pub llc: Option<f64>,
}

impl MpkiDelta {
    pub fn between(variant: &MetricRecord, baseline: &MetricRecord) -> Self {
        let delta = |level| Some(variant.mpki(level)? - baseline.mpki(level)?);
        Self {
            l1d: delta(CacheLevel::L1d),
            l2: delta(CacheLevel::L2),
            llc: delta(CacheLevel::Llc),
        }
    }

    pub fn get(&self, level: CacheLevel) -> Option<f64> {
        match level {
            CacheLevel::L1d => self.l1d,
            CacheLevel::L2 => self.l2,
            CacheLevel::Llc => self.llc,
        }
    }
}

/// A variant measured against one baseline.
#[derive(Debug, Clone, PartialEq)]
pub struct BaselineDelta {
    pub baseline: Variant,
    pub speedup: Option<f64>,
    pub mpki_delta: MpkiDelta,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonResult {
    pub variant: Variant,
    pub deltas: Vec<BaselineDelta>,
}

impl ComparisonResult {
    pub fn against(&self, baseline: Variant) -> Option<&BaselineDelta> {
        self.deltas.iter().find(|delta| delta.baseline == baseline)
    }

    pub fn speedup_vs(&self, baseline: Variant) -> Option<f64> {
        self.against(baseline)?.speedup
    }
}

/// Everything compared for one trace. Borrows the records it was built from.
#[derive(Debug, Clone)]
pub struct TraceComparison<'a> {
    pub trace_folder: &'a str,
    pub question: Question,
    pub baselines: BTreeMap<Variant, &'a TraceRecord>,
    /// The compared records that were present, by variant.
    pub records: BTreeMap<Variant, &'a TraceRecord>,
    pub results: BTreeMap<Variant, ComparisonResult>,
}

impl<'a> TraceComparison<'a> {
    pub fn baseline(&self, variant: Variant) -> Option<&'a TraceRecord> {
        self.baselines.get(&variant).copied()
    }
}

/// `ipc / baseline_ipc`, absent unless both exist and the baseline is positive.
pub fn speedup(ipc: Option<f64>, baseline_ipc: Option<f64>) -> Option<f64> {
    match (ipc, baseline_ipc) {
        (Some(ipc), Some(base)) if base > 0.0 => Some(ipc / base),
        _ => None,
    }
}

/// Locates the baselines of `trace_folder` for `question` and compares every
/// present variant of that study against them.
pub fn resolve_and_compare<'a>(
    table: &'a RecordTable,
    trace_folder: &'a str,
    question: Question,
) -> Result<TraceComparison<'a>, SkipReason> {
    let group = table.group(trace_folder);

    let mut baselines = BTreeMap::new();
    for &variant in question.baselines() {
        let record = pick(&group, variant).ok_or(SkipReason::MissingBaseline(variant))?;
        baselines.insert(variant, record);
    }

    // A table-size speedup without a baseline IPC means nothing.
    if question == Question::TableSize {
        let base = baselines[&Variant::BaselineNonInclusive];
        if !base.metrics.ipc.is_some_and(|ipc| ipc > 0.0) {
            return Err(SkipReason::UnusableBaselineIpc(Variant::BaselineNonInclusive));
        }
    }

    let mut records = BTreeMap::new();
    let mut results = BTreeMap::new();
    for variant in question.compared_variants() {
        // Q2 compares a baseline itself; reuse the record already resolved.
        let Some(record) = baselines
            .get(&variant)
            .copied()
            .or_else(|| pick(&group, variant))
        else {
            continue;
        };
        let deltas = question
            .references()
            .iter()
            .map(|baseline| {
                let base = &baselines[baseline].metrics;
                BaselineDelta {
                    baseline: *baseline,
                    speedup: speedup(record.metrics.ipc, base.ipc),
                    mpki_delta: MpkiDelta::between(&record.metrics, base),
                }
            })
            .collect();
        records.insert(variant, record);
        results.insert(variant, ComparisonResult { variant, deltas });
    }

    Ok(TraceComparison {
        trace_folder,
        question,
        baselines,
        records,
        results,
    })
}

/// Compares every trace whose folder selects a study. Skipped traces are
/// reported through the log.
pub fn compare_all<'a>(
    table: &'a RecordTable,
    prefixes: &QuestionPrefixes,
) -> Vec<TraceComparison<'a>> {
    let mut comparisons = Vec::new();
    for trace in table.traces() {
        let Some(question) = Question::for_trace_folder(trace, prefixes) else {
            debug!("{trace}: folder name selects no study");
            continue;
        };
        match resolve_and_compare(table, trace, question) {
            Ok(comparison) => comparisons.push(comparison),
            Err(reason) => warn!("{trace}: skipping {question}: {reason}"),
        }
    }
    comparisons
}

/// First record of `variant` in table order. Later duplicates are ignored, and
/// reported.
fn pick<'a>(group: &TraceGroup<'a>, variant: Variant) -> Option<&'a TraceRecord> {
    let candidates = group.all(variant);
    let (first, rest) = candidates.split_first()?;
    if !rest.is_empty() {
        let ignored: Vec<&str> = rest
            .iter()
            .map(|record| record.metrics.source_file.as_str())
            .collect();
        warn!(
            "{}: {} runs classified as {variant}; using {}, ignoring {}",
            group.trace_folder,
            candidates.len(),
            first.metrics.source_file,
            ignored.join(", ")
        );
    }
    Some(*first)
}

fn fmt_opt(value: Option<f64>, precision: usize) -> String {
    match value {
        Some(v) => format!("{v:.precision$}"),
        None => "n/a".to_string(),
    }
}

impl fmt::Display for TraceComparison<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "== {} | {} ==", self.trace_folder, self.question)?;
        for (variant, record) in &self.baselines {
            writeln!(
                f,
                "  {:<22} ipc {:>9} l2-mpki {:>8}  ({})",
                variant.to_string(),
                fmt_opt(record.metrics.ipc, 6),
                fmt_opt(record.metrics.l2_mpki, 3),
                record.metrics.source_file
            )?;
        }
        for result in self.results.values() {
            for delta in &result.deltas {
                writeln!(
                    f,
                    "    {:<20} vs {:<22} speedup {:>7} dL1D {:>8} dL2 {:>8} dLLC {:>8}",
                    result.variant.to_string(),
                    delta.baseline.to_string(),
                    fmt_opt(delta.speedup, 4),
                    fmt_opt(delta.mpki_delta.l1d, 3),
                    fmt_opt(delta.mpki_delta.l2, 3),
                    fmt_opt(delta.mpki_delta.llc, 3)
                )?;
            }
        }
        if self.results.is_empty() {
            writeln!(f, "    (no variants to compare)")?;
        }
        Ok(())
    }
}
