//! Plain-text rendering of table views.

use std::fmt::Write;

use proctorcache_core::table::{FilterSpec, PageLabel, TableView};
use proctorcache_core::utils::truncate_string;

/// Widest a single cell may print
const MAX_CELL_WIDTH: usize = 28;

/// Column gap
const GAP: &str = "  ";

pub fn render_table<R>(view: &TableView<'_, R>) -> String {
    let mut out = String::new();

    let rows: Vec<Vec<String>> = view
        .rows
        .iter()
        .map(|row| {
            let mut cells: Vec<String> = row
                .cells
                .iter()
                .map(|c| truncate_string(c, MAX_CELL_WIDTH))
                .collect();
            if view.show_actions {
                let actions: Vec<&str> = row.actions.iter().map(|a| a.value.as_str()).collect();
                cells.push(actions.join("|"));
            }
            cells
        })
        .collect();
    let headers: Vec<String> = view
        .headers
        .iter()
        .map(|h| truncate_string(h, MAX_CELL_WIDTH))
        .collect();

    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(width) = widths.get_mut(i) {
                *width = (*width).max(cell.chars().count());
            }
        }
    }

    write_row(&mut out, &headers, &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    write_row(&mut out, &rule, &widths);
    if rows.is_empty() {
        out.push_str("No results.\n");
    }
    for row in &rows {
        write_row(&mut out, row, &widths);
    }

    out.push('\n');
    out.push_str(&view.summary);
    out.push('\n');
    let _ = writeln!(out, "Pages: {}", render_page_labels(&view.page_labels, view.page_state.page_index));
    if !view.active_filters.is_empty() {
        let _ = writeln!(out, "Filters: {}", view.active_filters.chips().join(", "));
    }
    out
}

fn write_row(out: &mut String, cells: &[String], widths: &[usize]) {
    let line: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
        .collect();
    out.push_str(line.join(GAP).trim_end());
    out.push('\n');
}

/// "1 ... 4 [5] 6 ... 10"
pub fn render_page_labels(labels: &[PageLabel], current: usize) -> String {
    labels
        .iter()
        .map(|label| match label {
            PageLabel::Page(n) if *n == current => format!("[{}]", n),
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn render_filter_options(specs: &[FilterSpec]) -> String {
    let mut out = String::new();
    for spec in specs {
        let _ = writeln!(
            out,
            "{} ({}): {}",
            spec.label,
            spec.key,
            spec.options.join(", ")
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proctorcache_core::table::{ColumnSpec, DataTable};
    use serde_json::{json, Value};

    #[test]
    fn test_page_labels_mark_current() {
        let labels = vec![
            PageLabel::Page(1),
            PageLabel::Ellipsis,
            PageLabel::Page(4),
            PageLabel::Page(5),
            PageLabel::Page(6),
            PageLabel::Ellipsis,
            PageLabel::Page(10),
        ];
        assert_eq!(render_page_labels(&labels, 5), "1 ... 4 [5] 6 ... 10");
    }

    #[test]
    fn test_render_table_layout() {
        let data: Vec<Value> = vec![
            json!({ "id": "s1", "user": "Ada", "status": "Manual Locked" }),
            json!({ "id": "s2", "user": "Grace Hopper", "status": "Completed" }),
        ];
        let mut table = DataTable::new(vec![
            ColumnSpec::new("user", "Name"),
            ColumnSpec::new("status", "Status"),
        ])
        .with_filters(vec![FilterSpec::new("status", "Status", vec![])]);
        table.set_filter("status", "Completed");

        let text = render_table(&table.render(&data));
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], format!("{:<12}  {}", "Name", "Status"));
        assert_eq!(lines[1], format!("{}  {}", "-".repeat(12), "-".repeat(9)));
        assert_eq!(lines[2], "Grace Hopper  Completed");
        assert!(text.contains("Showing 1–1 of 1"));
        assert!(text.contains("Pages: [1]"));
        assert!(text.contains("Filters: status: Completed"));
    }

    #[test]
    fn test_filter_options_listing() {
        let spec = FilterSpec::new("status", "Status", vec!["Absent".into(), "Completed".into()]);
        assert_eq!(render_filter_options(&[spec]), "Status (status): Absent, Completed\n");
    }
}
