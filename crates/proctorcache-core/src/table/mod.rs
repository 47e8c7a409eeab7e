//! Generic tabular data engine.
//!
//! A [`DataTable`] owns the declarative configuration of one table (columns,
//! filters, sort, page) and turns any slice of [`Record`]s into the rows
//! visible on the current page:
//!
//! records → [`filter`] → [`sort`] → [`paginate`] → [`TableView`]
//!
//! Row actions are resolved per visible row by [`actions`].

pub mod actions;
pub mod filter;
pub mod paginate;
pub mod sort;

use std::sync::Arc;

use serde_json::Value;
use tracing::warn;

use crate::models::{value_to_string, FieldPath, Record};

pub use actions::{dispatch, resolve, ActionHandler, ActionOption, RowAction};
pub use filter::{ActiveFilters, FilterSpec, ALL_OPTION};
pub use paginate::{
    page_count, page_labels, Page, PageLabel, PageState, DEFAULT_PAGE_SIZE, PAGE_SIZE_OPTIONS,
};
pub use sort::{SortOrder, SortState};

/// Placeholder for cells without a value
const EMPTY_CELL: &str = "-";

/// Custom cell renderer: receives the resolved value (if any) and the row.
pub type RenderFn<R> = Arc<dyn Fn(Option<&Value>, &R) -> String + Send + Sync>;

/// Per-row action resolver.
pub type ActionsFn<R> = Arc<dyn Fn(&R) -> Vec<ActionOption> + Send + Sync>;

/// How one field is displayed and whether it can be sorted on.
pub struct ColumnSpec<R> {
    pub key: FieldPath,
    pub title: String,
    pub sortable: bool,
    render: Option<RenderFn<R>>,
}

impl<R> Clone for ColumnSpec<R> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            title: self.title.clone(),
            sortable: self.sortable,
            render: self.render.clone(),
        }
    }
}

impl<R: Record> ColumnSpec<R> {
    pub fn new(key: &str, title: &str) -> Self {
        Self {
            key: FieldPath::parse(key),
            title: title.to_string(),
            sortable: false,
            render: None,
        }
    }

    pub fn sortable(mut self) -> Self {
        self.sortable = true;
        self
    }

    pub fn with_render<F>(mut self, render: F) -> Self
    where
        F: Fn(Option<&Value>, &R) -> String + Send + Sync + 'static,
    {
        self.render = Some(Arc::new(render));
        self
    }

    /// Display text for this column of `record`. Without a renderer,
    /// missing, null and empty values show as "-".
    pub fn cell(&self, record: &R) -> String {
        let value = record.get(&self.key);
        match &self.render {
            Some(render) => render(value.as_ref(), record),
            None => value_to_string(value.as_ref())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| EMPTY_CELL.to_string()),
        }
    }

    /// Column title, with an arrow when it is the active sort column.
    pub fn header(&self, sort: &SortState) -> String {
        match &sort.key {
            Some(key) if self.sortable && *key == self.key => {
                format!("{} {}", self.title, sort.order.arrow())
            }
            _ => self.title.clone(),
        }
    }
}

/// One visible row.
#[derive(Debug, Clone, PartialEq)]
pub struct TableRow<'a, R> {
    pub record: &'a R,
    pub cells: Vec<String>,
    pub actions: Vec<ActionOption>,
}

/// Everything needed to present the current page of a table.
#[derive(Debug, Clone, PartialEq)]
pub struct TableView<'a, R> {
    pub headers: Vec<String>,
    pub rows: Vec<TableRow<'a, R>>,
    pub show_actions: bool,
    pub active_filters: ActiveFilters,
    pub sort_state: SortState,
    pub page_state: PageState,
    pub page_labels: Vec<PageLabel>,
    pub page_count: usize,
    /// Records left after filtering
    pub filtered_count: usize,
    pub summary: String,
}

impl<R> TableView<'_, R> {
    pub fn visible_records(&self) -> Vec<&R> {
        self.rows.iter().map(|row| row.record).collect()
    }
}

/// Filter, sort and pagination state of a single table instance.
pub struct DataTable<R> {
    columns: Vec<ColumnSpec<R>>,
    filters: Vec<FilterSpec>,
    active_filters: ActiveFilters,
    sort: SortState,
    page: PageState,
    row_actions: Option<ActionsFn<R>>,
}

impl<R: Record> DataTable<R> {
    pub fn new(columns: Vec<ColumnSpec<R>>) -> Self {
        Self {
            columns,
            filters: Vec::new(),
            active_filters: ActiveFilters::new(),
            sort: SortState::default(),
            page: PageState::default(),
            row_actions: None,
        }
    }

    pub fn with_filters(mut self, filters: Vec<FilterSpec>) -> Self {
        self.filters = filters;
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page.set_page_size(page_size);
        self
    }

    pub fn with_row_actions<F>(mut self, actions: F) -> Self
    where
        F: Fn(&R) -> Vec<ActionOption> + Send + Sync + 'static,
    {
        self.row_actions = Some(Arc::new(actions));
        self
    }

    pub fn columns(&self) -> &[ColumnSpec<R>] {
        &self.columns
    }

    pub fn filters(&self) -> &[FilterSpec] {
        &self.filters
    }

    /// Replace filter definitions, e.g. after the options were re-derived
    /// from fresh data. Selected values are kept.
    pub fn set_filter_specs(&mut self, filters: Vec<FilterSpec>) {
        self.filters = filters;
    }

    pub fn active_filters(&self) -> &ActiveFilters {
        &self.active_filters
    }

    pub fn sort_state(&self) -> &SortState {
        &self.sort
    }

    pub fn page_state(&self) -> PageState {
        self.page
    }

    pub fn set_filter(&mut self, key: &str, value: &str) {
        if !self.filters.iter().any(|f| f.key.as_str() == key) {
            warn!(key, "Filter value set for a field with no filter definition");
        }
        self.active_filters.set(key, value);
    }

    pub fn remove_filter(&mut self, key: &str) {
        self.active_filters.remove(key);
    }

    /// "Clear All": drop every selected filter value.
    pub fn clear_filters(&mut self) {
        self.active_filters.clear();
    }

    /// Toggle sorting on a column. Columns not marked sortable are ignored.
    pub fn toggle_sort(&mut self, key: &str) {
        match self.columns.iter().find(|c| c.key.as_str() == key) {
            Some(column) if column.sortable => {
                let path = column.key.clone();
                self.sort.toggle(&path);
            }
            Some(_) => warn!(key, "Ignoring sort on a non-sortable column"),
            None => warn!(key, "Ignoring sort on an unknown column"),
        }
    }

    pub fn set_sort(&mut self, sort: SortState) {
        self.sort = sort;
    }

    /// Request a page. The index is clamped on the next render.
    pub fn set_page(&mut self, page_index: usize) {
        self.page.page_index = page_index;
    }

    pub fn set_page_size(&mut self, page_size: usize) {
        self.page.set_page_size(page_size);
    }

    /// Run the pipeline over `records` and build the current page.
    ///
    /// The stored page index is clamped to the filtered record count.
    pub fn render<'a>(&mut self, records: &'a [R]) -> TableView<'a, R> {
        let filtered = filter::apply(records, &self.filters, &self.active_filters);
        let filtered_count = filtered.len();
        self.page.clamp_to(filtered_count);

        let sorted = sort::apply(filtered, &self.sort);
        let page = paginate::apply(sorted, &self.page);

        let rows: Vec<TableRow<'a, R>> = page
            .items
            .iter()
            .map(|record| TableRow {
                record: *record,
                cells: self.columns.iter().map(|c| c.cell(record)).collect(),
                actions: self.actions_for(record),
            })
            .collect();

        let show_actions = records.iter().any(|r| !self.actions_for(r).is_empty());
        let mut headers: Vec<String> = self.columns.iter().map(|c| c.header(&self.sort)).collect();
        if show_actions {
            headers.push("Action".to_string());
        }

        TableView {
            headers,
            rows,
            show_actions,
            active_filters: self.active_filters.clone(),
            sort_state: self.sort.clone(),
            page_state: self.page,
            page_labels: page_labels(page.page_index, page.page_count),
            page_count: page.page_count,
            filtered_count,
            summary: page.summary(),
        }
    }

    fn actions_for(&self, record: &R) -> Vec<ActionOption> {
        self.row_actions
            .as_ref()
            .map(|resolve| resolve(record))
            .unwrap_or_default()
    }
}
