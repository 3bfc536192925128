use std::collections::BTreeMap;

use log::{debug, warn};
use rayon::prelude::*;

use crate::{
    metrics::{MetricExtractor, MetricRecord},
    scan::LogEntry,
    variant::{self, Variant},
};

/// One row of the normalized table.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceRecord {
    pub trace_folder: String,
    pub variant: Variant,
    pub metrics: MetricRecord,
}

/// Every parsed run, ordered by trace folder then file name.
#[derive(Debug, Clone, Default)]
pub struct RecordTable {
    records: Vec<TraceRecord>,
}

/// The records of one trace, keyed by variant. A variant may map to several
/// records; they stay in table order.
pub struct TraceGroup<'a> {
    pub trace_folder: &'a str,
    by_variant: BTreeMap<Variant, Vec<&'a TraceRecord>>,
}

/// Extracts and classifies every entry. Entries are sorted first, so the
/// result does not depend on the order the caller listed them in. Extraction
/// runs in parallel, but results are collected by position.
pub fn aggregate(extractor: &MetricExtractor, mut entries: Vec<LogEntry>) -> RecordTable {
    entries.sort_by(|a, b| {
        (&a.trace_folder, &a.file_name).cmp(&(&b.trace_folder, &b.file_name))
    });

    let records = entries
        .par_iter()
        .map(|entry| {
            let variant = variant::classify(&entry.file_name);
            if variant::is_ambiguous(&entry.file_name) {
                warn!(
                    "{}/{}: classified as {variant} by rule precedence only",
                    entry.trace_folder, entry.file_name
                );
            }
            let metrics = extractor.extract_file(&entry.file_name, &entry.text);
            debug!("{}/{} -> {variant} {metrics:?}", entry.trace_folder, entry.file_name);
            TraceRecord {
                trace_folder: entry.trace_folder.clone(),
                variant,
                metrics,
            }
        })
        .collect();

    RecordTable::from_records(records)
}

impl RecordTable {
    /// Builds a table, ordering the records by trace folder then file name.
    /// The sort is stable, so records sharing both keep the caller's order.
    pub fn from_records(mut records: Vec<TraceRecord>) -> Self {
        records.sort_by(|a, b| {
            (&a.trace_folder, &a.metrics.source_file)
                .cmp(&(&b.trace_folder, &b.metrics.source_file))
        });
        Self { records }
    }

    pub fn records(&self) -> &[TraceRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct trace folders, in table order.
    pub fn traces(&self) -> Vec<&str> {
        let mut traces: Vec<&str> = self
            .records
            .iter()
            .map(|record| record.trace_folder.as_str())
            .collect();
        traces.dedup();
        traces
    }

    /// The contiguous run of records belonging to `trace_folder`.
    fn trace_records(&self, trace_folder: &str) -> &[TraceRecord] {
        let start = self
            .records
            .partition_point(|record| record.trace_folder.as_str() < trace_folder);
        let len = self.records[start..]
            .partition_point(|record| record.trace_folder == trace_folder);
        &self.records[start..start + len]
    }

    pub fn group<'a>(&'a self, trace_folder: &'a str) -> TraceGroup<'a> {
        let mut by_variant: BTreeMap<Variant, Vec<&TraceRecord>> = BTreeMap::new();
        for record in self.trace_records(trace_folder) {
            by_variant.entry(record.variant).or_default().push(record);
        }
        TraceGroup {
            trace_folder,
            by_variant,
        }
    }
}

impl<'a> TraceGroup<'a> {
    /// All records classified as `variant`, in table order.
    pub fn all(&self, variant: Variant) -> &[&'a TraceRecord] {
        self.by_variant
            .get(&variant)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn variants(&self) -> impl Iterator<Item = Variant> + '_ {
        self.by_variant.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.by_variant.is_empty()
    }
}
