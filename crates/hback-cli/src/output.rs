//! Table output for hback list
//!
//! Columns are left-aligned to the widest cell and separated by six
//! spaces. The format is part of the command surface: scripts parse
//! it, so no styling.

/// Column separator
const PADDING: &str = "      ";

/// Render a table with a header row.
pub fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (c, cell) in row.iter().enumerate() {
            if cell.len() > widths[c] {
                widths[c] = cell.len();
            }
        }
    }

    let mut out = String::new();
    render_row(&mut out, headers.iter().copied(), &widths);
    for row in rows {
        render_row(&mut out, row.iter().map(String::as_str), &widths);
    }
    out
}

fn render_row<'a>(out: &mut String, cells: impl Iterator<Item = &'a str>, widths: &[usize]) {
    for (c, cell) in cells.enumerate() {
        if c > 0 {
            out.push_str(PADDING);
        }
        out.push_str(cell);
        for _ in cell.len()..widths[c] {
            out.push(' ');
        }
    }
    out.push('\n');
}

/// Render and print a table to stdout.
pub fn print_table(headers: &[&str], rows: &[Vec<String>]) {
    print!("{}", render_table(headers, rows));
}
