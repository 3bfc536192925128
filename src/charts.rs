use std::{fs::File, io::BufWriter, path::Path};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::{
    aggregate::TraceRecord,
    compare::{Question, TraceComparison},
    metrics::{CacheLevel, MetricRecord},
    variant::Variant,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "values", rename_all = "snake_case")]
pub enum XAxis {
    Categorical(Vec<String>),
    Sequential(Vec<u32>),
}

impl XAxis {
    pub fn len(&self) -> usize {
        match self {
            XAxis::Categorical(labels) => labels.len(),
            XAxis::Sequential(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReferenceLine {
    pub value: f64,
    pub label: String,
}

/// One chart for an external renderer, written out as JSON.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    /// Output stem, e.g. `q1_speedup_<trace>`.
    pub name: String,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub x: XAxis,
    pub y: Vec<Option<f64>>,
    pub reference: Option<ReferenceLine>,
    pub annotate: bool,
}

impl ChartSpec {
    fn new(name: String, title: String, x_label: &str, y_label: &str, x: XAxis, y: Vec<Option<f64>>) -> Self {
        let annotate = matches!(x, XAxis::Categorical(_));
        Self {
            name,
            title,
            x_label: x_label.to_string(),
            y_label: y_label.to_string(),
            x,
            y,
            reference: None,
            annotate,
        }
    }

    fn with_reference(mut self, value: Option<f64>, label: &str) -> Self {
        self.reference = value.map(|value| ReferenceLine {
            value,
            label: label.to_string(),
        });
        self
    }

    /// A chart is worth rendering if it has points and at least one value.
    pub fn has_data(&self) -> bool {
        !self.x.is_empty() && self.y.iter().any(Option::is_some)
    }
}

/// Every chart one trace comparison supports.
pub fn charts_for(cmp: &TraceComparison<'_>) -> Vec<ChartSpec> {
    let charts = match cmp.question {
        Question::TableSize => table_size_charts(cmp),
        Question::ExclusiveVsNonInclusive => exclusive_vs_noninclusive_charts(cmp),
        Question::ExclusivePrefetcher => exclusive_prefetcher_charts(cmp),
    };
    charts.into_iter().filter(ChartSpec::has_data).collect()
}

fn table_size_charts(cmp: &TraceComparison<'_>) -> Vec<ChartSpec> {
    let trace = cmp.trace_folder;
    let base = cmp.baseline(Variant::BaselineNonInclusive).map(|r| &r.metrics);
    let mut bars: Vec<&TraceRecord> = base_record(cmp, Variant::BaselineNonInclusive);
    bars.extend(cmp.records.values().copied());

    vec![
        speedup_curve(cmp, Variant::BaselineNonInclusive, "q1_speedup", "Q1 Speedup", "Non-Inclusive"),
        ChartSpec::new(
            format!("q1_mpki_{trace}"),
            format!("Q1 L2 MPKI - {trace}"),
            "Variant",
            "L2 MPKI",
            labels(&bars),
            bars.iter().map(|r| r.metrics.l2_mpki).collect(),
        )
        .with_reference(base.and_then(|m| m.l2_mpki), "Baseline MPKI"),
        ChartSpec::new(
            format!("q1_ipc_{trace}"),
            format!("Q1 IPC - {trace}"),
            "Variant",
            "IPC",
            labels(&bars),
            bars.iter().map(|r| r.metrics.ipc).collect(),
        )
        .with_reference(base.and_then(|m| m.ipc), "Baseline IPC"),
    ]
}

fn exclusive_vs_noninclusive_charts(cmp: &TraceComparison<'_>) -> Vec<ChartSpec> {
    let trace = cmp.trace_folder;
    let (Some(non), Some(excl)) = (
        cmp.baseline(Variant::BaselineNonInclusive),
        cmp.baseline(Variant::BaselineExclusive),
    ) else {
        return Vec::new();
    };
    let (non, excl): (&MetricRecord, &MetricRecord) = (&non.metrics, &excl.metrics);

    let mut mpki_labels = Vec::new();
    let mut mpki_values = Vec::new();
    for level in CacheLevel::ALL {
        for (name, metrics) in [("non-inclusive", non), ("exclusive", excl)] {
            mpki_labels.push(format!("{} {name}", level.label()));
            mpki_values.push(metrics.mpki(level));
        }
    }

    let speedup = cmp
        .results
        .get(&Variant::BaselineExclusive)
        .and_then(|result| result.speedup_vs(Variant::BaselineNonInclusive));

    vec![
        ChartSpec::new(
            format!("q2_ipc_cmp_{trace}"),
            format!("Q2 IPC Comparison - {trace}"),
            "Cache",
            "IPC",
            XAxis::Categorical(vec!["non-inclusive".into(), "exclusive".into()]),
            vec![non.ipc, excl.ipc],
        )
        .with_reference(non.ipc, "Non-Inclusive IPC"),
        ChartSpec::new(
            format!("q2_mpki_cmp_{trace}"),
            format!("Q2 MPKI Comparison - {trace}"),
            "Cache level",
            "MPKI",
            XAxis::Categorical(mpki_labels),
            mpki_values,
        ),
        ChartSpec::new(
            format!("q2_speedup_{trace}"),
            format!("Q2 Speedup - {trace}"),
            "Comparison",
            "Speedup",
            XAxis::Categorical(vec!["Exclusive vs Non-Inclusive".into()]),
            vec![speedup],
        )
        .with_reference(Some(1.0), "Non-Inclusive"),
    ]
}

fn exclusive_prefetcher_charts(cmp: &TraceComparison<'_>) -> Vec<ChartSpec> {
    let trace = cmp.trace_folder;
    let excl = cmp.baseline(Variant::BaselineExclusive).map(|r| &r.metrics);
    let bars: Vec<&TraceRecord> = cmp.records.values().copied().collect();

    vec![
        speedup_curve(
            cmp,
            Variant::BaselineNonInclusive,
            "q3_speedup_noninc",
            "Q3 Speedup vs Non-Inclusive Baseline",
            "Non-Inclusive",
        ),
        speedup_curve(
            cmp,
            Variant::BaselineExclusive,
            "q3_speedup_excl",
            "Q3 Speedup vs Exclusive Baseline",
            "Exclusive",
        ),
        ChartSpec::new(
            format!("q3_mpki_{trace}"),
            format!("Q3 L2 MPKI - {trace}"),
            "Variant",
            "L2 MPKI",
            labels(&bars),
            bars.iter().map(|r| r.metrics.l2_mpki).collect(),
        )
        .with_reference(excl.and_then(|m| m.l2_mpki), "Exclusive MPKI"),
        ChartSpec::new(
            format!("q3_ipc_{trace}"),
            format!("Q3 IPC - {trace}"),
            "Variant",
            "IPC",
            labels(&bars),
            bars.iter().map(|r| r.metrics.ipc).collect(),
        )
        .with_reference(excl.and_then(|m| m.ipc), "Exclusive IPC"),
    ]
}

/// Speedup against `baseline` over table size.
fn speedup_curve(
    cmp: &TraceComparison<'_>,
    baseline: Variant,
    stem: &str,
    title: &str,
    reference_label: &str,
) -> ChartSpec {
    let (sizes, speedups): (Vec<u32>, Vec<Option<f64>>) = cmp
        .results
        .values()
        .filter_map(|result| Some((result.variant.table_size()?, result.speedup_vs(baseline))))
        .unzip();
    ChartSpec::new(
        format!("{stem}_{}", cmp.trace_folder),
        format!("{title} - {}", cmp.trace_folder),
        "Table size (entries)",
        &format!("Speedup (IPC / {baseline} IPC)"),
        XAxis::Sequential(sizes),
        speedups,
    )
    .with_reference(Some(1.0), reference_label)
}

fn base_record<'a>(cmp: &TraceComparison<'a>, variant: Variant) -> Vec<&'a TraceRecord> {
    cmp.baseline(variant).into_iter().collect()
}

fn labels(records: &[&TraceRecord]) -> XAxis {
    XAxis::Categorical(records.iter().map(|r| r.variant.to_string()).collect())
}

pub fn write_charts(path: &Path, charts: &[ChartSpec]) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Unable to create chart file {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), charts)
        .with_context(|| format!("Unable to write chart file {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        aggregate::RecordTable,
        compare::resolve_and_compare,
    };

    fn record(variant: Variant, ipc: Option<f64>, l2_mpki: Option<f64>) -> TraceRecord {
        TraceRecord {
            trace_folder: "t".to_string(),
            variant,
            metrics: MetricRecord {
                source_file: format!("{variant}.txt"),
                ipc,
                l2_mpki,
                ..MetricRecord::default()
            },
        }
    }

    fn find<'a>(charts: &'a [ChartSpec], name: &str) -> &'a ChartSpec {
        charts
            .iter()
            .find(|c| c.name == name)
            .unwrap_or_else(|| panic!("missing chart {name}"))
    }

    #[test]
    fn table_size_charts_follow_the_contract() {
        let table = RecordTable::from_records(vec![
            record(Variant::BaselineNonInclusive, Some(2.0), Some(6.0)),
            record(Variant::Table(64), Some(2.5), Some(4.0)),
            record(Variant::Table(32), Some(2.2), None),
        ]);
        let cmp = resolve_and_compare(&table, "t", Question::TableSize).unwrap();
        let charts = charts_for(&cmp);
        assert_eq!(charts.len(), 3);

        let speedup = find(&charts, "q1_speedup_t");
        assert_eq!(speedup.x, XAxis::Sequential(vec![32, 64]));
        assert_eq!(speedup.y.len(), 2);
        assert!((speedup.y[1].unwrap() - 1.25).abs() < 1e-9);
        assert_eq!(speedup.reference.as_ref().unwrap().value, 1.0);
        assert!(!speedup.annotate);

        let mpki = find(&charts, "q1_mpki_t");
        assert_eq!(
            mpki.x,
            XAxis::Categorical(vec!["baseline_noninclusive".into(), "table32".into(), "table64".into()])
        );
        assert_eq!(mpki.y, vec![Some(6.0), None, Some(4.0)]);
        assert_eq!(mpki.reference.as_ref().unwrap().value, 6.0);
        assert!(mpki.annotate);
    }

    #[test]
    fn charts_without_values_are_dropped() {
        let table = RecordTable::from_records(vec![
            record(Variant::BaselineNonInclusive, Some(2.0), None),
            record(Variant::BaselineExclusive, Some(2.2), None),
        ]);
        let cmp = resolve_and_compare(&table, "t", Question::ExclusivePrefetcher).unwrap();
        assert!(charts_for(&cmp).is_empty());

        let cmp = resolve_and_compare(&table, "t", Question::ExclusiveVsNonInclusive).unwrap();
        let names: Vec<_> = charts_for(&cmp).into_iter().map(|c| c.name).collect();
        assert_eq!(names, ["q2_ipc_cmp_t", "q2_speedup_t"]);
    }

    #[test]
    fn exclusive_prefetcher_has_two_speedup_curves() {
        let table = RecordTable::from_records(vec![
            record(Variant::BaselineNonInclusive, Some(2.0), Some(6.0)),
            record(Variant::BaselineExclusive, Some(2.2), Some(5.0)),
            record(Variant::ExclusiveTable(64), Some(2.31), Some(4.0)),
        ]);
        let cmp = resolve_and_compare(&table, "t", Question::ExclusivePrefetcher).unwrap();
        let charts = charts_for(&cmp);
        let non = find(&charts, "q3_speedup_noninc_t");
        let excl = find(&charts, "q3_speedup_excl_t");
        assert!((non.y[0].unwrap() - 1.155).abs() < 1e-6);
        assert!((excl.y[0].unwrap() - 1.05).abs() < 1e-6);
        assert_eq!(find(&charts, "q3_ipc_t").reference.as_ref().unwrap().value, 2.2);
    }

    #[test]
    fn serializes_absent_values_as_null() {
        let chart = ChartSpec::new(
            "c".into(),
            "C".into(),
            "x",
            "y",
            XAxis::Sequential(vec![32]),
            vec![None],
        );
        let json = serde_json::to_value(&chart).unwrap();
        assert_eq!(json["x"]["kind"], "sequential");
        assert_eq!(json["y"][0], serde_json::Value::Null);
        assert_eq!(json["reference"], serde_json::Value::Null);
    }
}
