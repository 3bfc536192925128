use std::fmt;

/// Experiment configuration named by a run's filename.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Variant {
    /// Non-inclusive cache, no prefetcher.
    BaselineNonInclusive,
    /// Exclusive cache, no prefetcher.
    BaselineExclusive,
    /// Prefetcher with a table of the given size on the non-inclusive cache.
    Table(u32),
    /// Prefetcher with a table of the given size on the exclusive cache.
    ExclusiveTable(u32),
    /// Exclusive-cache prefetcher run whose table size could not be read.
    ExclusivePrefetcher,
    /// Prefetcher run with no size information at all.
    PrefetcherUnknown,
    Unknown,
}

impl Variant {
    /// Prefetcher table size, for the variants that carry one.
    pub fn table_size(self) -> Option<u32> {
        match self {
            Variant::Table(size) | Variant::ExclusiveTable(size) => Some(size),
            _ => None,
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variant::BaselineNonInclusive => write!(f, "baseline_noninclusive"),
            Variant::BaselineExclusive => write!(f, "baseline_exclusive"),
            Variant::Table(size) => write!(f, "table{size}"),
            Variant::ExclusiveTable(size) => write!(f, "exclusive_table{size}"),
            Variant::ExclusivePrefetcher => write!(f, "exclusive_prefetcher"),
            Variant::PrefetcherUnknown => write!(f, "prefetcher_unknown"),
            Variant::Unknown => write!(f, "unknown"),
        }
    }
}

/// One entry of the decision list.
struct Rule {
    name: &'static str,
    applies: fn(&str) -> bool,
    label: fn(&str) -> Variant,
}

/// Table sizes in the order they are checked: larger first, so `128` is never
/// read as a smaller size.
const TABLE_SIZES: [u32; 3] = [128, 64, 32];

/// Evaluated top to bottom on the lower-cased filename; the first rule that
/// applies decides. Predicates overlap, so the order is part of the behaviour.
const RULES: &[Rule] = &[
    Rule {
        name: "noninclusive-baseline",
        applies: |s| s.contains("baseline") && !s.contains("exclusive"),
        label: |_| Variant::BaselineNonInclusive,
    },
    Rule {
        name: "exclusive-baseline",
        applies: |s| s.contains("baseline") && s.contains("exclusive"),
        label: |_| Variant::BaselineExclusive,
    },
    Rule {
        name: "exclusive-without-prefetcher",
        applies: |s| s.contains("exclusive") && !has_prefetcher_token(s) && !s.contains("table"),
        label: |_| Variant::BaselineExclusive,
    },
    Rule {
        name: "exclusive-prefetcher",
        applies: |s| s.contains("exclusive") && (has_size_token(s) || has_prefetcher_token(s)),
        label: |s| match size_token(s) {
            Some(size) => Variant::ExclusiveTable(size),
            None => Variant::ExclusivePrefetcher,
        },
    },
    Rule {
        name: "table128",
        applies: |s| table_size_applies(s, 128),
        label: |_| Variant::Table(128),
    },
    Rule {
        name: "table64",
        applies: |s| table_size_applies(s, 64),
        label: |_| Variant::Table(64),
    },
    Rule {
        name: "table32",
        applies: |s| table_size_applies(s, 32),
        label: |_| Variant::Table(32),
    },
    Rule {
        name: "prefetcher-digits",
        applies: has_prefetcher_token,
        label: |s| match first_digit_run(s) {
            Some(size) => Variant::Table(size),
            None => Variant::PrefetcherUnknown,
        },
    },
];

/// Maps a filename to its variant. Total and deterministic.
pub fn classify(filename: &str) -> Variant {
    classify_with_rule(filename).0
}

/// Like [`classify`], also naming the rule that decided (`"fallback"` if none).
pub fn classify_with_rule(filename: &str) -> (Variant, &'static str) {
    let s = filename.to_lowercase();
    RULES
        .iter()
        .find(|rule| (rule.applies)(&s))
        .map(|rule| ((rule.label)(&s), rule.name))
        .unwrap_or((Variant::Unknown, "fallback"))
}

/// Whether the decision list settled a filename by precedence alone.
///
/// A name such as `exclusive_128.txt` mentions a table size but none of the
/// prefetcher tokens, so it lands on the exclusive baseline. It could just as
/// well be an exclusive-prefetcher run with a terse name.
pub fn is_ambiguous(filename: &str) -> bool {
    let (_, rule) = classify_with_rule(filename);
    rule == "exclusive-without-prefetcher" && has_size_token(&filename.to_lowercase())
}

fn has_prefetcher_token(s: &str) -> bool {
    s.contains("pref") || s.contains("offset")
}

fn has_size_token(s: &str) -> bool {
    size_token(s).is_some()
}

fn size_token(s: &str) -> Option<u32> {
    TABLE_SIZES
        .into_iter()
        .find(|size| s.contains(&size.to_string()))
}

fn table_size_applies(s: &str, size: u32) -> bool {
    s.contains(&format!("table{size}")) || (s.contains(&size.to_string()) && !s.contains("exclusive"))
}

/// First run of ASCII digits, if it fits a `u32`.
fn first_digit_run(s: &str) -> Option<u32> {
    let start = s.find(|c: char| c.is_ascii_digit())?;
    let rest = &s[start..];
    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    rest[..end].parse().ok()
}
