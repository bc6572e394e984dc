//! Spreadsheet round trip for manual workout logging.
//!
//! Workbooks are handled as plain grids of cells: calamine reads them and
//! rust_xlsxwriter writes them back. Each sheet holds one block, each
//! workout a five-row header followed by its set table.

pub mod export;
pub mod import;

pub use export::{ExportReport, export_program};
pub use import::{ImportOptions, ImportReport, import_workbook};

use std::path::Path;

use calamine::{Data, Reader, Xlsx, open_workbook};
use chrono::{Days, NaiveDate};
use log::debug;
use rust_xlsxwriter::Workbook;

use crate::errors::{GymError, Result};

pub const HEADER_DATE: &str = "Date";
pub const HEADER_DESCRIPTION: &str = "Description";
pub const HEADER_DURATION: &str = "Duration (min)";
pub const HEADER_RPE: &str = "Overall RPE";
pub const HEADER_COMMENT: &str = "Overall comment";

pub const HEADER_LABELS: [&str; 5] = [
    HEADER_DATE,
    HEADER_DESCRIPTION,
    HEADER_DURATION,
    HEADER_RPE,
    HEADER_COMMENT,
];

pub const COL_ID: &str = "ID";
pub const COL_REPS: &str = "Reps";
pub const COL_WEIGHT: &str = "Weight";
pub const COL_DONE: &str = "Done?";
pub const COL_RPE: &str = "RPE";
pub const COL_COMMENTS: &str = "Comments";

pub const BODY_COLUMNS: [&str; 12] = [
    COL_ID,
    "Exercise",
    "Set",
    COL_REPS,
    COL_WEIGHT,
    "%Max",
    "MinRPE",
    "MaxRPE",
    "RestMin",
    COL_DONE,
    COL_RPE,
    COL_COMMENTS,
];

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Cell {
    #[default]
    Empty,
    Text(String),
    Number(f64),
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    pub fn opt_number<N: Into<f64>>(value: Option<N>) -> Self {
        value.map_or(Cell::Empty, |n| Cell::Number(n.into()))
    }

    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            Cell::Number(_) => false,
        }
    }

    /// Trimmed text content; numbers are rendered without a trailing `.0`.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Cell::Empty => None,
            Cell::Text(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
            Cell::Number(n) if n.fract() == 0.0 => Some(format!("{}", *n as i64)),
            Cell::Number(n) => Some(n.to_string()),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Empty => None,
            Cell::Number(n) => Some(*n),
            Cell::Text(s) => s.trim().replace(',', ".").parse().ok(),
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.as_f64().map(|n| n.round() as i64)
    }

    /// ISO `YYYY-MM-DD` text or an Excel date serial.
    pub fn as_date(&self) -> Result<Option<NaiveDate>> {
        match self {
            Cell::Empty => Ok(None),
            Cell::Number(serial) => excel_serial_to_date(*serial)
                .map(Some)
                .ok_or_else(|| GymError::workbook(format!("{serial} is not a date serial"))),
            Cell::Text(s) if s.trim().is_empty() => Ok(None),
            Cell::Text(s) => {
                let s = s.trim();
                // datetimes come back as "2024-01-08T00:00:00"
                let date_part = s.split(['T', ' ']).next().unwrap_or(s);
                NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
                    .map(Some)
                    .map_err(|e| GymError::workbook(format!("'{s}' is not a date: {e}")))
            }
        }
    }
}

fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 {
        return None;
    }
    NaiveDate::from_ymd_opt(1899, 12, 30)?.checked_add_days(Days::new(serial.floor() as u64))
}

impl From<&Data> for Cell {
    fn from(data: &Data) -> Self {
        match data {
            Data::Int(i) => Cell::Number(*i as f64),
            Data::Float(f) => Cell::Number(*f),
            Data::String(s) if s.trim().is_empty() => Cell::Empty,
            Data::String(s) => Cell::Text(s.clone()),
            Data::Bool(b) => Cell::Text(b.to_string()),
            Data::DateTime(dt) => Cell::Number(dt.as_f64()),
            Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
            Data::Error(_) | Data::Empty => Cell::Empty,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Sheet {
    pub name: String,
    pub rows: Vec<Vec<Cell>>,
}

impl Sheet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rows: Vec::new(),
        }
    }

    pub fn set(&mut self, row: usize, col: usize, cell: Cell) {
        if self.rows.len() <= row {
            self.rows.resize_with(row + 1, Vec::new);
        }
        let cells = &mut self.rows[row];
        if cells.len() <= col {
            cells.resize_with(col + 1, Cell::default);
        }
        cells[col] = cell;
    }

    pub fn write_row<I>(&mut self, row: usize, cells: I)
    where
        I: IntoIterator<Item = Cell>,
    {
        for (col, cell) in cells.into_iter().enumerate() {
            if cell != Cell::Empty {
                self.set(row, col, cell);
            }
        }
    }

    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        static EMPTY: Cell = Cell::Empty;
        self.rows
            .get(row)
            .and_then(|cells| cells.get(col))
            .unwrap_or(&EMPTY)
    }
}

/// Longest sheet name a workbook accepts.
pub const MAX_SHEET_NAME: usize = 31;

const FORBIDDEN_SHEET_CHARS: [char; 7] = ['[', ']', ':', '*', '?', '/', '\\'];

/// Why `name` cannot title a worksheet, if it cannot.
pub fn sheet_name_problem(name: &str) -> Option<String> {
    if name.trim().is_empty() {
        Some("is empty".to_string())
    } else if name.chars().count() > MAX_SHEET_NAME {
        Some(format!("is longer than {MAX_SHEET_NAME} characters"))
    } else if name.contains(FORBIDDEN_SHEET_CHARS) {
        Some("contains one of [ ] : * ? / \\".to_string())
    } else if name.starts_with('\'') || name.ends_with('\'') {
        Some("starts or ends with an apostrophe".to_string())
    } else if name.eq_ignore_ascii_case("history") {
        Some("is reserved".to_string())
    } else {
        None
    }
}

/// Block names become sheet names on export.
pub fn check_sheet_name(name: &str) -> Result<()> {
    match sheet_name_problem(name) {
        Some(problem) => Err(GymError::parse(format!(
            "block name '{name}' {problem} and cannot be used as a sheet name"
        ))),
        None => Ok(()),
    }
}

pub fn row_is_blank(cells: &[Cell]) -> bool {
    cells.iter().all(Cell::is_blank)
}

pub fn read_workbook(path: &Path) -> Result<Vec<Sheet>> {
    let mut workbook: Xlsx<_> = open_workbook(path)?;
    let names = workbook.sheet_names().to_owned();

    let mut sheets = Vec::with_capacity(names.len());
    for name in names {
        let range = workbook.worksheet_range(&name)?;
        let (row0, col0) = range.start().unwrap_or((0, 0));
        let mut sheet = Sheet::new(name);
        for (r, cells) in range.rows().enumerate() {
            for (c, data) in cells.iter().enumerate() {
                let cell = Cell::from(data);
                if cell != Cell::Empty {
                    sheet.set(row0 as usize + r, col0 as usize + c, cell);
                }
            }
        }
        debug!("Read sheet '{}' ({} rows)", sheet.name, sheet.rows.len());
        sheets.push(sheet);
    }
    Ok(sheets)
}

pub fn write_workbook(path: &Path, sheets: &[Sheet]) -> Result<()> {
    let mut workbook = Workbook::new();
    for sheet in sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(sheet.name.as_str())?;
        for (r, cells) in sheet.rows.iter().enumerate() {
            let row = u32::try_from(r)
                .map_err(|_| GymError::workbook(format!("sheet '{}' has too many rows", sheet.name)))?;
            for (c, cell) in cells.iter().enumerate() {
                let col = u16::try_from(c).map_err(|_| {
                    GymError::workbook(format!("sheet '{}' has too many columns", sheet.name))
                })?;
                match cell {
                    Cell::Empty => {}
                    Cell::Text(s) => {
                        worksheet.write_string(row, col, s.as_str())?;
                    }
                    Cell::Number(n) => {
                        worksheet.write_number(row, col, *n)?;
                    }
                }
            }
        }
    }
    workbook.save(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sheet_names_follow_workbook_rules() {
        assert!(check_sheet_name("week 1").is_ok());
        assert!(check_sheet_name(&"x".repeat(MAX_SHEET_NAME)).is_ok());
        assert!(check_sheet_name("semana 1 - força").is_ok());

        for bad in [
            "",
            "mesocycle 1 - microcycle 3 - strength",
            "week 1 [deload]",
            "a/b",
            "'quoted'",
            "History",
        ] {
            assert!(
                matches!(check_sheet_name(bad), Err(GymError::Parse(_))),
                "{bad:?} accepted"
            );
        }
    }

    #[test]
    fn dates_from_text_and_serials() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 8);
        assert_eq!(Cell::text("2024-01-08").as_date().unwrap(), expected);
        assert_eq!(Cell::text("2024-01-08T00:00:00").as_date().unwrap(), expected);
        assert_eq!(Cell::Number(45299.0).as_date().unwrap(), expected);
        assert_eq!(Cell::Empty.as_date().unwrap(), None);
        assert!(Cell::text("next monday").as_date().is_err());
    }

    #[test]
    fn numbers_render_as_text_without_fraction() {
        assert_eq!(Cell::Number(8.0).as_text().as_deref(), Some("8"));
        assert_eq!(Cell::Number(7.5).as_text().as_deref(), Some("7.5"));
        assert_eq!(Cell::text("  ").as_text(), None);
        assert_eq!(Cell::text("8,5").as_f64(), Some(8.5));
    }

    #[test]
    fn grids_survive_a_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grid.xlsx");

        let mut sheet = Sheet::new("week 1");
        sheet.write_row(0, [Cell::text(HEADER_DATE), Cell::text("2024-01-08")]);
        sheet.write_row(2, [Cell::Number(1.0), Cell::text("squat"), Cell::Number(2.5)]);
        write_workbook(&path, &[sheet.clone(), Sheet::new("empty")]).unwrap();

        let sheets = read_workbook(&path).unwrap();
        assert_eq!(sheets.len(), 2);
        assert_eq!(sheets[0], sheet);
        assert_eq!(sheets[1].name, "empty");
        assert!(sheets[1].rows.is_empty());
        assert_eq!(sheets[0].cell(5, 5), &Cell::Empty);
    }
}
