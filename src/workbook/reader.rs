use std::io::Cursor;

use calamine::{Data, Reader, Xlsx};
use chrono::NaiveDate;

use crate::core::{CellValue, CodecError, Sheet};

fn open(bytes: &[u8]) -> Result<Xlsx<Cursor<Vec<u8>>>, CodecError> {
    Xlsx::new(Cursor::new(bytes.to_vec()))
        .map_err(|e| CodecError::Workbook(format!("cannot open workbook: {e}")))
}

/// Names of all worksheets, in workbook order.
pub fn sheet_names(bytes: &[u8]) -> Result<Vec<String>, CodecError> {
    Ok(open(bytes)?.sheet_names())
}

/// Decode one worksheet into a [`Sheet`].
///
/// `name` selects a sheet by name; `None` takes the first sheet.
pub fn read_sheet(bytes: &[u8], name: Option<&str>) -> Result<Sheet, CodecError> {
    let mut workbook = open(bytes)?;
    let names = workbook.sheet_names();
    let target = match name {
        Some(wanted) => names
            .iter()
            .find(|n| n.as_str() == wanted)
            .cloned()
            .ok_or_else(|| {
                CodecError::Workbook(format!(
                    "sheet '{wanted}' not found (available: {})",
                    names.join(", ")
                ))
            })?,
        None => names
            .first()
            .cloned()
            .ok_or_else(|| CodecError::Workbook("workbook has no sheets".into()))?,
    };
    read_named(&mut workbook, &target)
}

/// Decode every worksheet, in workbook order.
pub fn read_all_sheets(bytes: &[u8]) -> Result<Vec<Sheet>, CodecError> {
    let mut workbook = open(bytes)?;
    workbook
        .sheet_names()
        .iter()
        .map(|name| read_named(&mut workbook, name))
        .collect()
}

fn read_named(workbook: &mut Xlsx<Cursor<Vec<u8>>>, name: &str) -> Result<Sheet, CodecError> {
    let range = workbook
        .worksheet_range(name)
        .map_err(|e| CodecError::Workbook(format!("cannot read sheet '{name}': {e}")))?;

    let mut sheet = Sheet::new(name);
    let (row0, col0) = range.start().unwrap_or((0, 0));
    for (r, c, data) in range.used_cells() {
        let value = cell_value(data);
        if value != CellValue::Empty {
            sheet.set(row0 as usize + r + 1, col0 as usize + c + 1, value);
        }
    }
    tracing::debug!(
        sheet = name,
        rows = sheet.height(),
        columns = sheet.width(),
        "worksheet decoded"
    );
    Ok(sheet)
}

/// Convert a calamine cell into the closed cell model.
pub(crate) fn cell_value(data: &Data) -> CellValue {
    match data {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::from(s.as_str()),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(datetime) => CellValue::Date(datetime.date()),
            None => CellValue::Number(dt.as_f64()),
        },
        Data::DateTimeIso(s) => s
            .get(..10)
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
            .map_or_else(|| CellValue::from(s.as_str()), CellValue::Date),
        Data::DurationIso(s) => CellValue::from(s.as_str()),
        Data::Error(e) => CellValue::Error(e.to_string()),
    }
}
