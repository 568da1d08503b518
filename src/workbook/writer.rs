use rust_xlsxwriter::{Workbook, Worksheet, XlsxError};

use crate::core::{CellValue, CodecError, Sheet};

fn xlsx_err(e: XlsxError) -> CodecError {
    CodecError::Workbook(format!("XLSX write error: {e}"))
}

/// Encode sheets into an `.xlsx` buffer, in the given order.
pub fn write_sheets(sheets: &[Sheet]) -> Result<Vec<u8>, CodecError> {
    let mut workbook = Workbook::new();
    for sheet in sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(sheet.name()).map_err(xlsx_err)?;
        write_cells(worksheet, sheet)?;
    }
    workbook.save_to_buffer().map_err(xlsx_err)
}

fn write_cells(worksheet: &mut Worksheet, sheet: &Sheet) -> Result<(), CodecError> {
    for r in 1..=sheet.height() {
        let row = u32::try_from(r - 1)
            .map_err(|_| CodecError::Workbook(format!("row {r} out of range")))?;
        for (index, value) in sheet.row(r).iter().enumerate() {
            let col = u16::try_from(index)
                .map_err(|_| CodecError::Workbook(format!("column {} out of range", index + 1)))?;
            match value {
                CellValue::Empty => {}
                CellValue::Number(n) => {
                    worksheet.write_number(row, col, *n).map_err(xlsx_err)?;
                }
                CellValue::Bool(b) => {
                    worksheet.write_boolean(row, col, *b).map_err(xlsx_err)?;
                }
                other => {
                    if let Some(text) = crate::core::cell_text(other) {
                        worksheet.write_string(row, col, text).map_err(xlsx_err)?;
                    }
                }
            }
        }
    }
    Ok(())
}
