use crate::model::attendance::AttendanceRecord;

const BOM: char = '\u{FEFF}';
const HEADER: [&str; 5] = ["date", "clockIn", "clockOut", "breakMinutes", "workHours"];

/// Renders records as spreadsheet-friendly CSV: BOM first, every value
/// quoted, missing values as `""`.
pub fn render_csv(records: &[AttendanceRecord]) -> String {
    let mut rows = Vec::with_capacity(records.len() + 1);
    rows.push(HEADER.join(","));

    for record in records {
        let cells = [
            Some(record.date.format("%Y-%m-%d").to_string()),
            record.clock_in.map(|t| t.format("%H:%M:%S").to_string()),
            record.clock_out.map(|t| t.format("%H:%M:%S").to_string()),
            record.break_minutes.map(|m| m.to_string()),
            record.work_hours.map(|h| format!("{:.2}", h)),
        ];

        let row = cells
            .iter()
            .map(|cell| quote(cell.as_deref().unwrap_or("")))
            .collect::<Vec<_>>()
            .join(",");
        rows.push(row);
    }

    let mut csv = String::new();
    csv.push(BOM);
    csv.push_str(&rows.join("\n"));
    csv
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

/// `attendance_{year}_{month}.csv`, with `all` for an absent part.
pub fn export_filename(month: Option<&str>, year: Option<&str>) -> String {
    let part = |v: Option<&str>| {
        v.map(str::trim)
            .filter(|v| !v.is_empty() && v.chars().all(|c| c.is_ascii_digit()))
            .unwrap_or("all")
            .to_string()
    };
    format!("attendance_{}_{}.csv", part(year), part(month))
}
