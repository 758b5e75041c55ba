//! Plain-text elastic table rendering for dataset and filter listings.

use std::fmt::Write as _;

/// Renders rows under a header with per-column elastic widths. Numeric
/// cells are right-aligned so financial magnitudes line up.
pub fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let column_count = headers.len();
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (idx, value) in row.iter().enumerate().take(column_count) {
            widths[idx] = widths[idx].max(value.chars().count());
        }
    }

    let numeric_column: Vec<bool> = (0..column_count)
        .map(|idx| {
            let mut any = false;
            for row in rows {
                match row.get(idx).map(String::as_str) {
                    Some("") | None => {}
                    Some(value) => {
                        if value.parse::<f64>().is_err() {
                            return false;
                        }
                        any = true;
                    }
                }
            }
            any
        })
        .collect();

    let mut output = String::new();
    let _ = writeln!(output, "{}", format_row(headers, &widths, &numeric_column));
    let separator: Vec<String> = widths.iter().map(|w| "-".repeat((*w).max(3))).collect();
    let separator_widths: Vec<usize> = widths.iter().map(|w| (*w).max(3)).collect();
    let _ = writeln!(
        output,
        "{}",
        format_row(&separator, &separator_widths, &numeric_column)
    );
    for row in rows {
        let _ = writeln!(output, "{}", format_row(row, &widths, &numeric_column));
    }
    output
}

pub fn print_table(headers: &[String], rows: &[Vec<String>]) {
    print!("{}", render_table(headers, rows));
}

fn format_row(values: &[String], widths: &[usize], numeric: &[bool]) -> String {
    let mut cells = Vec::with_capacity(values.len());
    for (idx, value) in values.iter().enumerate() {
        let Some(width) = widths.get(idx).copied() else {
            break;
        };
        let sanitized: String = value
            .chars()
            .map(|ch| if ch.is_control() { ' ' } else { ch })
            .collect();
        let padding = width.saturating_sub(sanitized.chars().count());
        let cell = if numeric.get(idx).copied().unwrap_or(false) {
            format!("{}{}", " ".repeat(padding), sanitized)
        } else {
            format!("{}{}", sanitized, " ".repeat(padding))
        };
        cells.push(cell);
    }
    let mut line = cells.join("  ");
    while line.ends_with(' ') {
        line.pop();
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owned(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn columns_expand_to_widest_cell() {
        let rendered = render_table(
            &owned(&["name", "records"]),
            &[owned(&["TechCorp Q1", "1"]), owned(&["Retail", "248"])],
        );
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "name         records");
        assert!(lines[1].starts_with("---"));
        assert_eq!(lines[2], "TechCorp Q1        1");
    }

    #[test]
    fn numeric_columns_right_align() {
        let rendered = render_table(
            &owned(&["v"]),
            &[owned(&["5"]), owned(&["12000"])],
        );
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[2], "    5");
        assert_eq!(lines[3], "12000");
    }

    #[test]
    fn control_characters_are_flattened() {
        let rendered = render_table(&owned(&["note"]), &[owned(&["line\nbreak"])]);
        assert!(rendered.contains("line break"));
    }
}
