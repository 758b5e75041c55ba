//! Filter-schema inference over an accumulated row set.
//!
//! Every data change triggers a full re-inference: the engine enumerates the
//! union of non-provenance columns, samples each column's non-null values,
//! and decides a filter kind per column:
//!
//! - `Range` when the column is predominantly numeric (>= 80 % of observed
//!   values) or carries a financial-sounding name, and its observed min and
//!   max differ. A single-point numeric column is demoted and falls through
//!   to the select/text decision.
//! - `Select` when the distinct string representations stay under
//!   `min(20, observed / 2)`.
//! - `Text` otherwise.
//!
//! Independently, a fixed set of name patterns binds "priority" columns
//! (growth per year, margin, growth per quarter) for promoted treatment.
//! Each pattern binds at most one column; the first match in enumeration
//! order wins. Enumeration order is lexicographic over the column union,
//! which keeps inference deterministic regardless of row-map iteration.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use regex::Regex;

use crate::{
    data::{Cell, Row, is_provenance_column},
    normalize,
};

/// Share of numeric values required before a column is treated as numeric.
const NUMERIC_SHARE_THRESHOLD: f64 = 0.8;

/// Hard ceiling on select options regardless of row count.
const MAX_SELECT_OPTIONS: usize = 20;

/// Floor for the select threshold so minimal row sets still get dropdowns.
const MIN_SELECT_THRESHOLD: usize = 2;

/// Name fragments that force the range classification for financial columns
/// even when numeric parsing falls under the share threshold.
const FINANCIAL_NAME_TOKENS: &[&str] = &[
    "sales", "growth", "margin", "debt", "revenue", "profit", "assets", "ratio", "year", "per",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PriorityMetric {
    SalesGrowthPerYear,
    Margin,
    SalesGrowthPerQuarter,
}

impl PriorityMetric {
    pub fn label(&self) -> &'static str {
        match self {
            PriorityMetric::SalesGrowthPerYear => "sales growth per year",
            PriorityMetric::Margin => "margin",
            PriorityMetric::SalesGrowthPerQuarter => "sales growth per quarter",
        }
    }
}

static PRIORITY_PATTERNS: LazyLock<Vec<(PriorityMetric, Regex)>> = LazyLock::new(|| {
    vec![
        (
            PriorityMetric::SalesGrowthPerYear,
            Regex::new(r"(?i)sales.*grow.*year").expect("valid pattern"),
        ),
        (
            PriorityMetric::Margin,
            Regex::new(r"(?i)margin").expect("valid pattern"),
        ),
        (
            PriorityMetric::SalesGrowthPerQuarter,
            Regex::new(r"(?i)sales.*grow.*quarter").expect("valid pattern"),
        ),
    ]
});

#[derive(Debug, Clone, PartialEq)]
pub enum FilterKind {
    Text,
    Range { min: f64, max: f64 },
    Select { options: Vec<String> },
}

impl FilterKind {
    pub fn label(&self) -> &'static str {
        match self {
            FilterKind::Text => "text",
            FilterKind::Range { .. } => "range",
            FilterKind::Select { .. } => "select",
        }
    }
}

/// Derived per-column filter configuration. Recomputed from scratch whenever
/// the row set changes; never persisted and never partially updated.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnFilter {
    pub name: String,
    pub kind: FilterKind,
    pub priority: bool,
    /// Range columns holding large financial magnitudes display their bounds
    /// on the 0..100 percentage scale instead of native units.
    pub percent_display: bool,
}

impl ColumnFilter {
    /// Bounds as shown to the user: percentage domain when normalized,
    /// native units otherwise. `None` for non-range filters.
    pub fn display_bounds(&self) -> Option<(f64, f64)> {
        match &self.kind {
            FilterKind::Range { min, max } if self.percent_display => {
                Some(normalize::value_range_to_percentages((*min, *max)))
            }
            FilterKind::Range { min, max } => Some((*min, *max)),
            _ => None,
        }
    }
}

/// Inference output: filters in enumeration order plus priority bindings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSchema {
    pub filters: Vec<ColumnFilter>,
    pub priority: Vec<(PriorityMetric, String)>,
}

impl FilterSchema {
    pub fn filter(&self, column: &str) -> Option<&ColumnFilter> {
        self.filters.iter().find(|f| f.name == column)
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

/// Runs schema inference over the full accumulated row set.
pub fn infer_filters(rows: &[Row]) -> FilterSchema {
    let mut columns: BTreeSet<&str> = BTreeSet::new();
    for row in rows {
        for key in row.keys() {
            if !is_provenance_column(key) {
                columns.insert(key.as_str());
            }
        }
    }

    let mut filters = Vec::new();
    for column in &columns {
        let values: Vec<&Cell> = rows
            .iter()
            .filter_map(|row| row.get(*column))
            .filter(|cell| !cell.is_null())
            .collect();
        if values.is_empty() {
            continue;
        }
        let kind = classify(column, &values);
        let percent_display = match &kind {
            FilterKind::Range { max, .. } => normalize::should_normalize(column, *max),
            _ => false,
        };
        filters.push(ColumnFilter {
            name: (*column).to_string(),
            kind,
            priority: false,
            percent_display,
        });
    }

    let priority = bind_priority_columns(&columns);
    let bound: BTreeSet<&str> = priority.iter().map(|(_, name)| name.as_str()).collect();
    for filter in &mut filters {
        if bound.contains(filter.name.as_str()) {
            filter.priority = true;
        }
    }

    FilterSchema { filters, priority }
}

fn classify(column: &str, values: &[&Cell]) -> FilterKind {
    let numeric: Vec<f64> = values.iter().filter_map(|cell| cell.as_number()).collect();
    let numeric_share = numeric.len() as f64 / values.len() as f64;
    let financial_name = has_financial_name(column);

    if (numeric_share >= NUMERIC_SHARE_THRESHOLD || financial_name) && !numeric.is_empty() {
        let min = numeric.iter().copied().fold(f64::INFINITY, f64::min);
        let max = numeric.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        // A range over a single point is meaningless; demote to the
        // select/text decision below.
        if min != max {
            return FilterKind::Range { min, max };
        }
    }

    let distinct: BTreeSet<String> = values.iter().map(|cell| cell.display()).collect();
    let threshold = MAX_SELECT_OPTIONS.min((values.len() / 2).max(MIN_SELECT_THRESHOLD));
    if distinct.len() <= threshold {
        FilterKind::Select {
            options: distinct.into_iter().collect(),
        }
    } else {
        FilterKind::Text
    }
}

fn has_financial_name(column: &str) -> bool {
    let lowered = column.to_ascii_lowercase();
    FINANCIAL_NAME_TOKENS
        .iter()
        .any(|token| lowered.contains(token))
}

/// Binds each priority pattern to its first matching column, if any.
fn bind_priority_columns(columns: &BTreeSet<&str>) -> Vec<(PriorityMetric, String)> {
    let mut bindings = Vec::new();
    for (metric, pattern) in PRIORITY_PATTERNS.iter() {
        if let Some(column) = columns.iter().find(|name| pattern.is_match(name)) {
            bindings.push((*metric, (*column).to_string()));
        }
    }
    bindings
}

/// Columns in enumeration order, including ones that produced no filter.
pub fn visible_columns(rows: &[Row]) -> Vec<String> {
    let mut columns: BTreeMap<&str, ()> = BTreeMap::new();
    for row in rows {
        for key in row.keys() {
            if !is_provenance_column(key) {
                columns.entry(key.as_str()).or_insert(());
            }
        }
    }
    columns.into_keys().map(str::to_string).collect()
}
