//! Spreadsheet reading and cell-to-text coercion.

use std::io::Cursor;

use calamine::{CellErrorType, Data, Reader, Xlsx};
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

/// One worksheet, rows anchored at A1.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetData {
    pub name: String,
    pub rows: Vec<Vec<Data>>,
}

impl SheetData {
    pub fn new(name: impl Into<String>, rows: Vec<Vec<Data>>) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }
}

/// Read every worksheet of an `.xlsx` document in workbook order.
pub fn read_workbook(bytes: &[u8]) -> Result<Vec<SheetData>, String> {
    let mut workbook: Xlsx<_> =
        Xlsx::new(Cursor::new(bytes)).map_err(|e| format!("Unreadable workbook: {e}"))?;

    let mut sheets = Vec::new();
    for name in workbook.sheet_names() {
        let range = workbook
            .worksheet_range(&name)
            .map_err(|e| format!("Unreadable sheet '{name}': {e}"))?;

        // calamine trims leading empty rows/columns; put them back so row 1
        // is always the header row.
        let (row_offset, col_offset) = range
            .start()
            .map(|(r, c)| (r as usize, c as usize))
            .unwrap_or((0, 0));
        let mut rows = vec![Vec::new(); row_offset];
        for row in range.rows() {
            let mut padded = vec![Data::Empty; col_offset];
            padded.extend(row.iter().cloned());
            rows.push(padded);
        }
        sheets.push(SheetData { name, rows });
    }
    Ok(sheets)
}

/// A cell holding a spreadsheet error value such as `#DIV/0!`.
#[derive(Debug, Clone, PartialEq)]
pub struct CellError(pub CellErrorType);

impl std::fmt::Display for CellError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "cell contains error value {}", self.0)
    }
}

impl std::error::Error for CellError {}

/// Trimmed textual form of a cell. Empty result means "absent".
pub fn cell_text(cell: &Data) -> Result<String, CellError> {
    let text = match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => float_text(*f),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) if dt.is_duration() => duration_text(dt.as_f64()),
        Data::DateTime(dt) => serial_text(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.trim().to_string(),
        Data::Error(e) => return Err(CellError(e.clone())),
    };
    Ok(text)
}

fn float_text(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{}", f as i64)
    } else {
        f.to_string()
    }
}

/// Excel serial date (1900 system) as `YYYY-MM-DD[ HH:MM:SS]`. A serial
/// below 1 carries no date and prints as a time of day.
fn serial_text(serial: f64) -> String {
    match serial_to_datetime(serial) {
        Some(dt) if serial < 1.0 => dt.format("%H:%M:%S").to_string(),
        Some(dt) if dt.time() == NaiveTime::MIN => dt.format("%Y-%m-%d").to_string(),
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => float_text(serial),
    }
}

fn serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    // 2958466 is 9999-12-31
    if !serial.is_finite() || !(0.0..2_958_466.0).contains(&serial) {
        return None;
    }
    // Excel counts a 1900-02-29 (serial 60) that never existed, so serials
    // before it are one day later than the 1899-12-30 epoch gives.
    let epoch_day = if serial < 60.0 { 31 } else { 30 };
    let epoch = NaiveDate::from_ymd_opt(1899, 12, epoch_day)?.and_hms_opt(0, 0, 0)?;
    let millis = (serial * 86_400_000.0).round() as i64;
    // round to whole seconds
    let secs = (millis + 500).div_euclid(1000);
    epoch.checked_add_signed(Duration::seconds(secs))
}

/// Elapsed time (`[h]:mm:ss` cells) with hours not wrapped at a day.
fn duration_text(days: f64) -> String {
    if !days.is_finite() {
        return float_text(days);
    }
    let secs = (days * 86_400.0).round() as i64;
    let sign = if secs < 0 { "-" } else { "" };
    let secs = secs.unsigned_abs();
    format!(
        "{sign}{}:{:02}:{:02}",
        secs / 3600,
        secs / 60 % 60,
        secs % 60
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::{ExcelDateTime, ExcelDateTimeType};
    use rust_xlsxwriter::Workbook;

    #[test]
    fn coerces_scalars_to_trimmed_text() {
        assert_eq!(cell_text(&Data::Empty).unwrap(), "");
        assert_eq!(cell_text(&Data::String("  J-12 ".into())).unwrap(), "J-12");
        assert_eq!(cell_text(&Data::String("   ".into())).unwrap(), "");
        assert_eq!(cell_text(&Data::Int(42)).unwrap(), "42");
        assert_eq!(cell_text(&Data::Float(12.0)).unwrap(), "12");
        assert_eq!(cell_text(&Data::Float(12.5)).unwrap(), "12.5");
        assert_eq!(cell_text(&Data::Float(-0.25)).unwrap(), "-0.25");
        assert_eq!(cell_text(&Data::Bool(true)).unwrap(), "true");
    }

    #[test]
    fn coerces_dates() {
        // 2024-01-15
        let date = ExcelDateTime::new(45306.0, ExcelDateTimeType::DateTime, false);
        assert_eq!(cell_text(&Data::DateTime(date)).unwrap(), "2024-01-15");

        let with_time = ExcelDateTime::new(45306.5, ExcelDateTimeType::DateTime, false);
        assert_eq!(
            cell_text(&Data::DateTime(with_time)).unwrap(),
            "2024-01-15 12:00:00"
        );
        assert_eq!(
            cell_text(&Data::DateTimeIso("2024-01-15T10:00:00".into())).unwrap(),
            "2024-01-15T10:00:00"
        );
    }

    #[test]
    fn coerces_early_serials_and_times_of_day() {
        let date = |serial| {
            cell_text(&Data::DateTime(ExcelDateTime::new(
                serial,
                ExcelDateTimeType::DateTime,
                false,
            )))
            .unwrap()
        };
        assert_eq!(date(1.0), "1900-01-01");
        assert_eq!(date(59.0), "1900-02-28");
        assert_eq!(date(61.0), "1900-03-01");
        assert_eq!(date(0.75), "18:00:00");
    }

    #[test]
    fn coerces_durations_without_wrapping() {
        let elapsed = |days| {
            cell_text(&Data::DateTime(ExcelDateTime::new(
                days,
                ExcelDateTimeType::TimeDelta,
                false,
            )))
            .unwrap()
        };
        assert_eq!(elapsed(1.5), "36:00:00");
        assert_eq!(elapsed(30.0 / 1440.0), "0:30:00");
        assert_eq!(elapsed(-0.25), "-6:00:00");
    }

    #[test]
    fn error_cells_are_reported() {
        let err = cell_text(&Data::Error(CellErrorType::Div0)).unwrap_err();
        assert_eq!(err, CellError(CellErrorType::Div0));
        assert!(err.to_string().contains("#DIV/0!"));
    }

    #[test]
    fn reads_sheets_in_order_anchored_at_a1() {
        let mut workbook = Workbook::new();
        let first = workbook.add_worksheet();
        first.set_name("Circuit").unwrap();
        first.write_string(0, 0, "circuit_id").unwrap();
        first.write_string(1, 0, "C1").unwrap();
        let second = workbook.add_worksheet();
        second.set_name("Offset").unwrap();
        second.write_string(1, 1, "late").unwrap();
        let bytes = workbook.save_to_buffer().unwrap();

        let sheets = read_workbook(&bytes).unwrap();
        assert_eq!(sheets.len(), 2);
        assert_eq!(sheets[0].name, "Circuit");
        assert_eq!(sheets[0].rows[0][0], Data::String("circuit_id".into()));
        assert_eq!(sheets[0].rows[1][0], Data::String("C1".into()));

        assert_eq!(sheets[1].rows.len(), 2);
        assert!(sheets[1].rows[0].is_empty());
        assert_eq!(sheets[1].rows[1][0], Data::Empty);
        assert_eq!(sheets[1].rows[1][1], Data::String("late".into()));
    }

    #[test]
    fn rejects_garbage_bytes() {
        assert!(read_workbook(b"not a spreadsheet").is_err());
    }
}
