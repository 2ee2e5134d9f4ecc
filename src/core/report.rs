use super::types::ReportRow;

/// Formats a whole amount with `.` as thousands separator, e.g. `1.234.567`.
pub fn format_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(ch);
    }
    out
}

pub fn markdown_row(row: &ReportRow) -> String {
    let mut cells = vec![
        row.date.to_string(),
        format_thousands(row.cash),
        format_thousands(row.etfs),
        format_thousands(row.single_stocks),
    ];
    if let Some(real_estate) = row.real_estate {
        cells.push(format_thousands(real_estate));
    }
    cells.push(format_thousands(row.bonds));
    cells.push(format!("**{}**", format_thousands(row.total)));
    format!("| {} |", cells.join(" | "))
}

pub fn markdown_table(rows: &[ReportRow]) -> String {
    let with_real_estate = rows.iter().any(|row| row.real_estate.is_some());
    let mut headers = vec!["Date", "Cash", "ETFs", "Single stocks"];
    if with_real_estate {
        headers.push("Real estate");
    }
    headers.extend(["Bonds", "Total"]);

    let mut out = format!("| {} |\n", headers.join(" | "));
    out.push_str(&format!("|{}\n", " --- |".repeat(headers.len())));
    for row in rows {
        out.push_str(&markdown_row(row));
        out.push('\n');
    }
    out
}
