//! Column-aligned text tables with sanitized cells.

use unicode_width::UnicodeWidthStr;

use crate::sanitize;

const CELL_MAX: usize = 2000;

fn pad(cell: &str, width: usize) -> String {
    let padding = width.saturating_sub(cell.width());
    format!("{cell}{}", " ".repeat(padding))
}

fn format_row(cells: &[String], widths: &[usize]) -> String {
    cells
        .iter()
        .zip(widths)
        .map(|(cell, &width)| format!(" {} ", pad(cell, width)))
        .collect::<Vec<_>>()
        .join("|")
}

/// Renders headers and rows as an aligned table with a separator rule.
/// Every cell is stripped and truncated before widths are computed, so
/// hostile cell content cannot break the layout.
pub fn format_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let header_row: Vec<String> = headers
        .iter()
        .map(|h| sanitize::clean(h, CELL_MAX))
        .collect();
    let body: Vec<Vec<String>> = rows
        .iter()
        .map(|row| row.iter().map(|cell| sanitize::clean(cell, CELL_MAX)).collect())
        .collect();

    let columns = header_row.len();
    let mut widths = vec![0usize; columns];
    for row in std::iter::once(&header_row).chain(body.iter()) {
        for (index, cell) in row.iter().enumerate().take(columns) {
            widths[index] = widths[index].max(cell.width());
        }
    }

    let separator = widths
        .iter()
        .map(|w| "─".repeat(w + 2))
        .collect::<Vec<_>>()
        .join("─");

    let mut lines = Vec::with_capacity(body.len() + 2);
    lines.push(format_row(&header_row, &widths));
    lines.push(separator);
    for row in &body {
        lines.push(format_row(row, &widths));
    }
    lines.join("\n")
}
