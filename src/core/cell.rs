//! Closed cell model and the in-memory worksheet grid.
//!
//! Workbook decoders convert their native cell types into [`CellValue`]
//! once, at the boundary. Everything downstream works on the plain text
//! returned by [`cell_text`].

use chrono::NaiveDate;

/// A decoded spreadsheet cell. Formula cells arrive as their cached result.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    Date(NaiveDate),
    /// Rich text runs, concatenated for extraction.
    RichText(Vec<String>),
    /// Spreadsheet error value such as `#DIV/0!`.
    Error(String),
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        if s.is_empty() {
            Self::Empty
        } else {
            Self::Text(s.to_string())
        }
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        if s.is_empty() {
            Self::Empty
        } else {
            Self::Text(s)
        }
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<NaiveDate> for CellValue {
    fn from(d: NaiveDate) -> Self {
        Self::Date(d)
    }
}

/// Extract the plain text of a cell, or `None` when it carries nothing.
///
/// Numbers use the shortest round-trip form (`10`, `10.5`), dates the ISO
/// calendar form (`2024-06-15`). Error cells yield `None`.
pub fn cell_text(value: &CellValue) -> Option<String> {
    let text = match value {
        CellValue::Empty | CellValue::Error(_) => return None,
        CellValue::Text(s) => s.clone(),
        CellValue::Number(n) => format_number(*n),
        CellValue::Bool(b) => b.to_string(),
        CellValue::Date(d) => d.format("%Y-%m-%d").to_string(),
        CellValue::RichText(runs) => runs.concat(),
    };
    if text.is_empty() { None } else { Some(text) }
}

fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

/// A rectangular worksheet with 1-based addressing.
///
/// Rows may be ragged; missing cells read as [`CellValue::Empty`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sheet {
    name: String,
    rows: Vec<Vec<CellValue>>,
}

static EMPTY: CellValue = CellValue::Empty;

impl Sheet {
    /// Create an empty sheet.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rows: Vec::new(),
        }
    }

    /// Create a sheet from row-major cell values (first row is row 1).
    pub fn from_rows<R, C>(name: impl Into<String>, rows: R) -> Self
    where
        R: IntoIterator,
        R::Item: IntoIterator<Item = C>,
        C: Into<CellValue>,
    {
        Self {
            name: name.into(),
            rows: rows
                .into_iter()
                .map(|row| row.into_iter().map(Into::into).collect())
                .collect(),
        }
    }

    /// Sheet name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of rows (the last row index).
    pub fn height(&self) -> usize {
        self.rows.len()
    }

    /// Widest row length (the last column index).
    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Cell at 1-based `(row, col)`; out-of-range reads are empty.
    pub fn cell(&self, row: usize, col: usize) -> &CellValue {
        if row == 0 || col == 0 {
            return &EMPTY;
        }
        self.rows
            .get(row - 1)
            .and_then(|r| r.get(col - 1))
            .unwrap_or(&EMPTY)
    }

    /// Text of the cell at 1-based `(row, col)`.
    pub fn text(&self, row: usize, col: usize) -> Option<String> {
        cell_text(self.cell(row, col))
    }

    /// All cells of 1-based row `row` (empty slice when out of range).
    pub fn row(&self, row: usize) -> &[CellValue] {
        if row == 0 {
            return &[];
        }
        self.rows.get(row - 1).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Set the cell at 1-based `(row, col)`, growing the grid as needed.
    pub fn set(&mut self, row: usize, col: usize, value: impl Into<CellValue>) {
        if row == 0 || col == 0 {
            return;
        }
        if self.rows.len() < row {
            self.rows.resize_with(row, Vec::new);
        }
        let cells = &mut self.rows[row - 1];
        if cells.len() < col {
            cells.resize(col, CellValue::Empty);
        }
        cells[col - 1] = value.into();
    }

    /// Append a row after the current last row.
    pub fn push_row<C: Into<CellValue>>(&mut self, cells: impl IntoIterator<Item = C>) {
        self.rows.push(cells.into_iter().map(Into::into).collect());
    }
}
