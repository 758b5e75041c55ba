//! In-memory query/view engine over an accumulated row set.
//!
//! The view holds the full row vector (immutable per load), the inferred
//! filter schema, the active per-column filter values, a single optional
//! sort, and a pagination window. Every state change recomputes the visible
//! subset from scratch over the complete row set; there is no incremental
//! update path and none is needed at the expected row counts.
//!
//! Filter evaluation is conjunctive: a row is visible iff every currently
//! active filter passes. An absent filter, an empty text needle, an empty
//! select set, or a range covering the column's full observed domain all
//! mean "no constraint".

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;

use crate::{
    data::{Cell, Row, cell},
    normalize,
    schema::{ColumnFilter, FilterKind, FilterSchema, infer_filters},
};

/// Selectable page sizes; anything else is ignored.
pub const PAGE_SIZES: &[usize] = &[10, 25, 50, 100];

pub const DEFAULT_PAGE_SIZE: usize = 25;

#[derive(Debug, Error, PartialEq)]
pub enum ViewError {
    #[error("no filter is defined for column '{0}'")]
    UnknownColumn(String),
    #[error("column '{column}' holds a {actual} filter, not {expected}")]
    KindMismatch {
        column: String,
        expected: &'static str,
        actual: &'static str,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// Active per-column predicate in the column's native units.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Text(String),
    Range { low: f64, high: f64 },
    Select(BTreeSet<String>),
}

#[derive(Debug)]
pub struct DatasetView {
    rows: Vec<Row>,
    schema: FilterSchema,
    active: BTreeMap<String, FilterValue>,
    sort: Option<(String, SortDirection)>,
    page_size: usize,
    page: usize,
}

impl DatasetView {
    /// Builds a view over the row set, running schema inference once.
    pub fn new(rows: Vec<Row>) -> Self {
        let schema = infer_filters(&rows);
        Self {
            rows,
            schema,
            active: BTreeMap::new(),
            sort: None,
            page_size: DEFAULT_PAGE_SIZE,
            page: 0,
        }
    }

    pub fn schema(&self) -> &FilterSchema {
        &self.schema
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn sort_state(&self) -> Option<(&str, SortDirection)> {
        self.sort
            .as_ref()
            .map(|(column, direction)| (column.as_str(), *direction))
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    fn filter_config(&self, column: &str) -> Result<&ColumnFilter, ViewError> {
        self.schema
            .filter(column)
            .ok_or_else(|| ViewError::UnknownColumn(column.to_string()))
    }

    /// Sets the substring filter for a text column. An empty needle clears
    /// the constraint.
    pub fn set_text_filter(&mut self, column: &str, needle: &str) -> Result<(), ViewError> {
        let config = self.filter_config(column)?;
        if !matches!(config.kind, FilterKind::Text) {
            return Err(ViewError::KindMismatch {
                column: column.to_string(),
                expected: "text",
                actual: config.kind.label(),
            });
        }
        if needle.is_empty() {
            self.active.remove(column);
        } else {
            self.active
                .insert(column.to_string(), FilterValue::Text(needle.to_string()));
        }
        self.page = 0;
        Ok(())
    }

    /// Sets the bounds filter for a range column. Bounds arrive in the
    /// column's display domain: percentages for normalized columns, native
    /// units otherwise. A window covering the full observed domain clears
    /// the constraint.
    pub fn set_range_filter(&mut self, column: &str, low: f64, high: f64) -> Result<(), ViewError> {
        let config = self.filter_config(column)?;
        let (min, max) = match &config.kind {
            FilterKind::Range { min, max } => (*min, *max),
            other => {
                return Err(ViewError::KindMismatch {
                    column: column.to_string(),
                    expected: "range",
                    actual: other.label(),
                });
            }
        };
        let (low, high) = if config.percent_display {
            normalize::percentage_range_to_values((low, high))
        } else {
            (low, high)
        };
        let (low, high) = if low <= high { (low, high) } else { (high, low) };
        if low <= min && high >= max {
            self.active.remove(column);
        } else {
            self.active
                .insert(column.to_string(), FilterValue::Range { low, high });
        }
        self.page = 0;
        Ok(())
    }

    /// Sets the membership filter for a select column. An empty selection
    /// clears the constraint entirely; a populated selection excludes every
    /// row whose value is not a member, even when no row matches at all.
    pub fn set_select_filter<I>(&mut self, column: &str, values: I) -> Result<(), ViewError>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let config = self.filter_config(column)?;
        if !matches!(config.kind, FilterKind::Select { .. }) {
            return Err(ViewError::KindMismatch {
                column: column.to_string(),
                expected: "select",
                actual: config.kind.label(),
            });
        }
        let set: BTreeSet<String> = values.into_iter().map(Into::into).collect();
        if set.is_empty() {
            self.active.remove(column);
        } else {
            self.active
                .insert(column.to_string(), FilterValue::Select(set));
        }
        self.page = 0;
        Ok(())
    }

    /// Cycles the sort on a column: ascending, then descending, then none.
    /// Sorting a different column starts over at ascending.
    pub fn toggle_sort(&mut self, column: &str) {
        self.sort = match self.sort.take() {
            Some((current, SortDirection::Ascending)) if current == column => {
                Some((current, SortDirection::Descending))
            }
            Some((current, SortDirection::Descending)) if current == column => None,
            _ => Some((column.to_string(), SortDirection::Ascending)),
        };
        self.page = 0;
    }

    pub fn set_sort(&mut self, column: &str, direction: SortDirection) {
        self.sort = Some((column.to_string(), direction));
        self.page = 0;
    }

    /// Accepts one of [`PAGE_SIZES`]; other values are a no-op.
    pub fn set_page_size(&mut self, size: usize) {
        if PAGE_SIZES.contains(&size) {
            self.page_size = size;
            self.page = 0;
        }
    }

    pub fn next_page(&mut self) {
        let last = self.page_count().saturating_sub(1);
        self.page = (self.page + 1).min(last);
    }

    pub fn previous_page(&mut self) {
        self.page = self.page.saturating_sub(1);
    }

    /// Jumps to a zero-based page index, clamped to the valid window.
    pub fn set_page(&mut self, page: usize) {
        let last = self.page_count().saturating_sub(1);
        self.page = page.min(last);
    }

    /// Clears every active filter and returns to the first page. The sort
    /// is left as-is.
    pub fn reset_filters(&mut self) {
        self.active.clear();
        self.page = 0;
    }

    /// Full filtered and sorted row set, before pagination.
    pub fn visible_rows(&self) -> Vec<&Row> {
        let mut rows: Vec<&Row> = self
            .rows
            .iter()
            .filter(|row| self.row_passes(row))
            .collect();
        if let Some((column, direction)) = &self.sort {
            rows.sort_by(|a, b| {
                let ordering = compare_cells(cell(a, column), cell(b, column));
                match direction {
                    SortDirection::Ascending => ordering,
                    SortDirection::Descending => ordering.reverse(),
                }
            });
        }
        rows
    }

    pub fn visible_count(&self) -> usize {
        self.rows.iter().filter(|row| self.row_passes(row)).count()
    }

    pub fn page_count(&self) -> usize {
        self.visible_count().div_ceil(self.page_size).max(1)
    }

    /// The current pagination window of the visible set.
    pub fn page_rows(&self) -> Vec<&Row> {
        self.visible_rows()
            .into_iter()
            .skip(self.page * self.page_size)
            .take(self.page_size)
            .collect()
    }

    fn row_passes(&self, row: &Row) -> bool {
        self.active.iter().all(|(column, value)| match value {
            FilterValue::Text(needle) => {
                let haystack = cell(row, column).display().to_lowercase();
                haystack.contains(&needle.to_lowercase())
            }
            FilterValue::Range { low, high } => match cell(row, column).as_number() {
                Some(number) => number >= *low && number <= *high,
                // Unparseable values pass unconditionally; mixed numeric and
                // blank cells must not vanish under a numeric filter.
                None => true,
            },
            FilterValue::Select(set) => {
                set.is_empty() || set.contains(&cell(row, column).display())
            }
        })
    }
}

/// Numeric comparison when both sides parse as numbers, lexicographic
/// otherwise. Nulls stringify empty and therefore order first.
fn compare_cells(a: &Cell, b: &Cell) -> Ordering {
    match (a.as_number(), b.as_number()) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        _ => a.display().cmp(&b.display()),
    }
}

/// Handles the `view` command: build the engine over the accumulated rows,
/// apply the requested filters, sort, and window, and render the page.
pub fn execute(args: &crate::cli::ViewArgs) -> anyhow::Result<()> {
    use anyhow::{Context, anyhow};
    use itertools::Itertools;

    use crate::{catalog, schema::visible_columns, store::JsonStore, table};

    let store = JsonStore::open(&args.store)
        .with_context(|| format!("Opening dataset store {:?}", args.store))?;
    let rows = catalog::load_accumulated_rows(&store, args.id)?;
    if rows.is_empty() {
        println!("No rows to display; ingest a dataset first.");
        return Ok(());
    }

    let columns: Vec<String> = if args.show_provenance {
        rows.iter()
            .flat_map(|row| row.keys().cloned())
            .collect::<std::collections::BTreeSet<_>>()
            .into_iter()
            .collect()
    } else {
        visible_columns(&rows)
    };

    let mut view = DatasetView::new(rows);
    view.set_page_size(args.page_size);

    for spec in &args.text {
        let (column, needle) = split_filter_spec(spec)?;
        view.set_text_filter(column, needle)?;
    }
    for spec in &args.range {
        let (column, bounds) = split_filter_spec(spec)?;
        let (low, high) = bounds
            .split_once(',')
            .ok_or_else(|| anyhow!("Range filter '{spec}' must look like column=low,high"))?;
        let low: f64 = low
            .trim()
            .parse()
            .with_context(|| format!("Parsing lower bound of '{spec}'"))?;
        let high: f64 = high
            .trim()
            .parse()
            .with_context(|| format!("Parsing upper bound of '{spec}'"))?;
        view.set_range_filter(column, low, high)?;
    }
    for spec in &args.select {
        let (column, members) = split_filter_spec(spec)?;
        let values: Vec<String> = members
            .split('|')
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
            .collect();
        view.set_select_filter(column, values)?;
    }
    if let Some(directive) = &args.sort {
        let (column, direction) = parse_sort_directive(directive)?;
        view.set_sort(column, direction);
    }
    view.set_page(args.page.saturating_sub(1));

    let rendered = view
        .page_rows()
        .iter()
        .map(|row| {
            columns
                .iter()
                .map(|column| cell(row, column).display())
                .collect_vec()
        })
        .collect_vec();
    table::print_table(&columns, &rendered);
    println!(
        "Page {} of {}: {} of {} row(s) visible",
        view.page() + 1,
        view.page_count(),
        view.visible_count(),
        view.row_count()
    );
    Ok(())
}

fn split_filter_spec(spec: &str) -> anyhow::Result<(&str, &str)> {
    spec.split_once('=')
        .map(|(column, value)| (column.trim(), value.trim()))
        .filter(|(column, _)| !column.is_empty())
        .ok_or_else(|| anyhow::anyhow!("Filter '{spec}' must look like column=value"))
}

fn parse_sort_directive(directive: &str) -> anyhow::Result<(&str, SortDirection)> {
    match directive.rsplit_once(':') {
        Some((column, "asc")) => Ok((column.trim(), SortDirection::Ascending)),
        Some((column, "desc")) => Ok((column.trim(), SortDirection::Descending)),
        Some((_, other)) => Err(anyhow::anyhow!(
            "Unknown sort direction '{other}'; expected asc or desc"
        )),
        None => Ok((directive.trim(), SortDirection::Ascending)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, Cell)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    /// Six rows, three companies. `Company` infers as select, `Revenue` as a
    /// percent-displayed range, `Margin` as a native-units range, `Note` as
    /// free text.
    fn company_rows() -> Vec<Row> {
        vec![
            row(&[
                ("Company", Cell::from("Alpha")),
                ("Revenue", Cell::from(5_000_000.0)),
                ("Margin", Cell::from(5.5)),
                ("Note", Cell::from("strong quarter")),
            ]),
            row(&[
                ("Company", Cell::from("Alpha")),
                ("Revenue", Cell::from(6_000_000.0)),
                ("Margin", Cell::from(6.1)),
                ("Note", Cell::from("soft quarter")),
            ]),
            row(&[
                ("Company", Cell::from("Beta")),
                ("Revenue", Cell::from(12_000_000.0)),
                ("Margin", Cell::from(10.0)),
                ("Note", Cell::from("flat quarter")),
            ]),
            row(&[
                ("Company", Cell::from("Beta")),
                ("Revenue", Cell::from(13_000_000.0)),
                ("Margin", Cell::from(11.2)),
                ("Note", Cell::from("steady year")),
            ]),
            row(&[
                ("Company", Cell::from("Gamma")),
                ("Revenue", Cell::from(22_000_000_000_000.0)),
                ("Margin", Cell::from(16.8)),
                ("Note", Cell::from("breakout year")),
            ]),
            row(&[
                ("Company", Cell::from("Gamma")),
                ("Revenue", Cell::from("not reported")),
                ("Note", Cell::from("missing filings")),
            ]),
        ]
    }

    #[test]
    fn fixture_infers_expected_kinds() {
        let view = DatasetView::new(company_rows());
        let schema = view.schema();
        assert!(matches!(
            schema.filter("Company").unwrap().kind,
            FilterKind::Select { .. }
        ));
        assert!(matches!(
            schema.filter("Revenue").unwrap().kind,
            FilterKind::Range { .. }
        ));
        assert!(schema.filter("Revenue").unwrap().percent_display);
        assert!(!schema.filter("Margin").unwrap().percent_display);
        assert!(matches!(schema.filter("Note").unwrap().kind, FilterKind::Text));
    }

    #[test]
    fn select_filter_narrows_and_clears() {
        let mut view = DatasetView::new(company_rows());
        view.set_select_filter("Company", ["Alpha"]).expect("set");
        assert_eq!(view.visible_count(), 2);

        // Clearing the selection removes the constraint entirely.
        view.set_select_filter("Company", Vec::<String>::new())
            .expect("clear");
        assert_eq!(view.visible_count(), 6);

        // A populated selection matching nothing shows zero rows; that is a
        // different state from the cleared filter above.
        view.set_select_filter("Company", ["Omega"]).expect("set");
        assert_eq!(view.visible_count(), 0);
    }

    #[test]
    fn percent_range_filter_converts_to_raw_bounds() {
        let mut view = DatasetView::new(company_rows());
        // The 22 trillion row sits at ~49.98 %: inside an upper bound of 50,
        // outside an upper bound of 49. The unparseable row passes both.
        view.set_range_filter("Revenue", 0.0, 50.0).expect("set");
        assert_eq!(view.visible_count(), 6);

        view.set_range_filter("Revenue", 0.0, 49.0).expect("set");
        let notes: Vec<String> = view
            .visible_rows()
            .iter()
            .map(|r| cell(r, "Note").display())
            .collect();
        assert_eq!(view.visible_count(), 5);
        assert!(!notes.contains(&"breakout year".to_string()));
        assert!(notes.contains(&"missing filings".to_string()));
    }

    #[test]
    fn native_range_filter_passes_missing_cells() {
        let mut view = DatasetView::new(company_rows());
        view.set_range_filter("Margin", 5.0, 10.5).expect("set");
        // 5.5, 6.1, 10.0 qualify; 11.2 and 16.8 do not; the row with no
        // margin cell passes unconditionally.
        assert_eq!(view.visible_count(), 4);
    }

    #[test]
    fn full_domain_range_means_no_constraint() {
        let mut view = DatasetView::new(company_rows());
        view.set_range_filter("Revenue", 0.0, 100.0).expect("set");
        assert_eq!(view.visible_count(), 6);
        assert!(view.active.is_empty());
    }

    #[test]
    fn filters_compose_conjunctively_and_only_shrink() {
        let mut view = DatasetView::new(company_rows());
        let full = view.visible_count();

        view.set_text_filter("Note", "quarter").expect("text");
        let after_text = view.visible_count();
        assert!(after_text <= full);
        assert_eq!(after_text, 3);

        view.set_select_filter("Company", ["Alpha", "Gamma"])
            .expect("select");
        let after_both = view.visible_count();
        assert!(after_both <= after_text);
        assert_eq!(after_both, 2);
    }

    #[test]
    fn text_filter_is_case_insensitive_substring() {
        let mut view = DatasetView::new(company_rows());
        view.set_text_filter("Note", "QUARTER").expect("set");
        assert_eq!(view.visible_count(), 3);
        view.set_text_filter("Note", "").expect("clear");
        assert_eq!(view.visible_count(), 6);
    }

    #[test]
    fn sort_cycles_ascending_descending_none() {
        let mut view = DatasetView::new(company_rows());
        view.toggle_sort("Company");
        assert_eq!(
            view.sort_state(),
            Some(("Company", SortDirection::Ascending))
        );
        let first = cell(view.visible_rows()[0], "Company").display();
        assert_eq!(first, "Alpha");

        view.toggle_sort("Company");
        assert_eq!(
            view.sort_state(),
            Some(("Company", SortDirection::Descending))
        );
        let first = cell(view.visible_rows()[0], "Company").display();
        assert_eq!(first, "Gamma");

        view.toggle_sort("Company");
        assert_eq!(view.sort_state(), None);

        // Switching columns resets to ascending.
        view.toggle_sort("Company");
        view.toggle_sort("Note");
        assert_eq!(view.sort_state(), Some(("Note", SortDirection::Ascending)));
    }

    #[test]
    fn sort_compares_numbers_numerically() {
        let rows = vec![
            row(&[("v", Cell::from("9"))]),
            row(&[("v", Cell::from("100"))]),
            row(&[("v", Cell::from(25.0))]),
        ];
        let mut view = DatasetView::new(rows);
        view.toggle_sort("v");
        let order: Vec<String> = view
            .visible_rows()
            .iter()
            .map(|r| cell(r, "v").display())
            .collect();
        assert_eq!(order, vec!["9", "25", "100"]);
    }

    #[test]
    fn pagination_clamps_at_both_ends() {
        let rows: Vec<Row> = (0..35)
            .map(|i| row(&[("v", Cell::Number(i as f64))]))
            .collect();
        let mut view = DatasetView::new(rows);
        view.set_page_size(10);
        assert_eq!(view.page_count(), 4);

        view.previous_page();
        assert_eq!(view.page(), 0);

        for _ in 0..10 {
            view.next_page();
        }
        assert_eq!(view.page(), 3);
        assert_eq!(view.page_rows().len(), 5);
    }

    #[test]
    fn out_of_set_page_size_is_ignored() {
        let mut view = DatasetView::new(company_rows());
        view.set_page_size(33);
        assert_eq!(view.page_size(), DEFAULT_PAGE_SIZE);
        view.set_page_size(50);
        assert_eq!(view.page_size(), 50);
    }

    #[test]
    fn filter_change_resets_to_first_page() {
        let rows: Vec<Row> = (0..60)
            .map(|i| {
                row(&[
                    ("v", Cell::Number(i as f64)),
                    ("name", Cell::Text(format!("item {i}"))),
                ])
            })
            .collect();
        let mut view = DatasetView::new(rows);
        view.set_page_size(10);
        view.next_page();
        view.next_page();
        assert_eq!(view.page(), 2);

        view.set_text_filter("name", "item").expect("set");
        assert_eq!(view.page(), 0);

        view.next_page();
        view.toggle_sort("v");
        assert_eq!(view.page(), 0);
    }

    #[test]
    fn reset_filters_keeps_sort() {
        let mut view = DatasetView::new(company_rows());
        view.toggle_sort("Company");
        view.set_select_filter("Company", ["Alpha"]).expect("set");
        view.next_page();

        view.reset_filters();
        assert_eq!(view.visible_count(), 6);
        assert_eq!(view.page(), 0);
        assert_eq!(
            view.sort_state(),
            Some(("Company", SortDirection::Ascending))
        );
    }

    #[test]
    fn unknown_columns_and_kind_mismatches_are_rejected() {
        let mut view = DatasetView::new(company_rows());
        assert_eq!(
            view.set_text_filter("Nope", "x"),
            Err(ViewError::UnknownColumn("Nope".to_string()))
        );
        assert!(matches!(
            view.set_text_filter("Revenue", "x"),
            Err(ViewError::KindMismatch { .. })
        ));
    }
}
