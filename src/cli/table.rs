use terminal_size::{terminal_size, Height, Width};

use crate::dataset::Row;

/// Columns shown at once; wider datasets are browsed page by page.
pub const COLUMNS_PER_PAGE: usize = 8;

const MAX_CELL_WIDTH: usize = 40;

pub fn column_pages(columns: usize) -> usize {
    columns.div_ceil(COLUMNS_PER_PAGE).max(1)
}

/// The slice of `columns` on column page `page` (0-based, clamped to the last page).
pub fn page_columns(columns: &[String], page: usize) -> &[String] {
    let page = page.min(column_pages(columns.len()) - 1);
    let start = (page * COLUMNS_PER_PAGE).min(columns.len());
    let end = (start + COLUMNS_PER_PAGE).min(columns.len());
    &columns[start..end]
}

/// Render `rows` as an ASCII table restricted to one column page, each line fitted to
/// `termw`. Rows for which `marked` is true get a `!` gutter.
pub fn render_table<F: Fn(&Row) -> bool>(columns: &[String], rows: &[Row], page: usize, termw: usize, marked: F) -> Vec<String> {
    let cols = page_columns(columns, page);
    let cells: Vec<Vec<String>> = rows.iter()
        .map(|r| cols.iter().map(|c| r.get(c).map(|v| v.to_string()).unwrap_or_default()).collect())
        .collect();

    let mut widths: Vec<usize> = cols.iter().map(|c| display_len(c).min(MAX_CELL_WIDTH)).collect();
    for r in &cells {
        for (i, cell) in r.iter().enumerate() {
            widths[i] = widths[i].max(display_len(cell).min(MAX_CELL_WIDTH));
        }
    }

    let mut out = Vec::with_capacity(rows.len() + 5);
    let sep = build_separator(&widths);
    out.push(fit_line_to_width(&format!("  {}", sep), termw));
    out.push(fit_line_to_width(&format!("  {}", build_row(cols, &widths)), termw));
    out.push(fit_line_to_width(&format!("  {}", sep), termw));
    for (row, r) in rows.iter().zip(&cells) {
        let gutter = if marked(row) { "! " } else { "  " };
        out.push(fit_line_to_width(&format!("{}{}", gutter, build_row(r, &widths)), termw));
    }
    out.push(fit_line_to_width(&format!("  {}", sep), termw));

    let pages = column_pages(columns.len());
    let page = page.min(pages - 1);
    let first = page * COLUMNS_PER_PAGE + 1;
    out.push(format!(
        "rows: {}, columns {}-{} of {} (column page {}/{})",
        rows.len(),
        first.min(columns.len()),
        first + cols.len() - 1,
        columns.len(),
        page + 1,
        pages
    ));
    out
}

pub fn print_table<F: Fn(&Row) -> bool>(columns: &[String], rows: &[Row], page: usize, marked: F) {
    for line in render_table(columns, rows, page, get_terminal_width(), marked) {
        println!("{}", line);
    }
}

fn display_len(s: &str) -> usize { s.chars().count() }

fn build_separator(widths: &[usize]) -> String {
    let mut s = String::from("+");
    for w in widths {
        s.push_str(&"-".repeat(*w + 2));
        s.push('+');
    }
    s
}

fn build_row(cells: &[String], widths: &[usize]) -> String {
    let mut s = String::from("|");
    for (i, w) in widths.iter().enumerate() {
        let cell = cells.get(i).map(String::as_str).unwrap_or("");
        let text = truncate(cell, *w);
        let pad = " ".repeat(w.saturating_sub(display_len(&text)));
        s.push(' ');
        if is_numeric_like(cell) {
            s.push_str(&pad);
            s.push_str(&text);
        } else {
            s.push_str(&text);
            s.push_str(&pad);
        }
        s.push_str(" |");
    }
    s
}

fn truncate(s: &str, max: usize) -> String {
    if display_len(s) <= max { return s.to_string(); }
    if max <= 1 { return "…".to_string(); }
    s.chars().take(max - 1).collect::<String>() + "…"
}

fn is_numeric_like(s: &str) -> bool {
    let st = s.trim();
    st.chars().any(|c| c.is_ascii_digit()) && st.chars().all(|c| c.is_ascii_digit() || ".-+eE,_".contains(c))
}

pub fn get_terminal_width() -> usize {
    match terminal_size() {
        Some((Width(w), Height(_))) if w > 20 => (w - 4) as usize,
        _ => 120,
    }
}

fn fit_line_to_width(s: &str, maxw: usize) -> String {
    if display_len(s) <= maxw { return s.to_string(); }
    truncate(s, maxw)
}
