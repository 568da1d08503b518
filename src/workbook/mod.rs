//! `.xlsx` entry points.
//!
//! Workbooks are decoded with calamine into [`Sheet`] grids at the boundary
//! and written back with rust_xlsxwriter; the codec itself never sees a
//! workbook type.
//!
//! # Example
//!
//! ```ignore
//! use fattura::core::CodecOptions;
//! use fattura::workbook::*;
//!
//! let report = rows_to_documents(&std::fs::read("fatture.xlsx")?, &CodecOptions::default())?;
//! for doc in &report.documents {
//!     std::fs::write(&doc.filename, &doc.xml)?;
//! }
//! ```

mod reader;
mod writer;

pub use reader::{read_all_sheets, read_sheet, sheet_names};
pub use writer::write_sheets;

use crate::core::{
    Codec, CodecError, CodecOptions, ConversionReport, FailedDocument, SchemaTables, Sheet,
};

/// Default name of a freshly created output sheet.
pub const DEFAULT_OUTPUT_SHEET: &str = "Sheet1";

/// Result of [`documents_to_rows`].
#[derive(Debug)]
pub struct WorkbookOutput {
    /// The encoded output workbook.
    pub bytes: Vec<u8>,
    /// Sheet the rows were appended to.
    pub sheet_name: String,
    /// Number of document rows appended, error rows included.
    pub appended: usize,
    /// 1-based row of the first document row.
    pub first_row: usize,
    pub failures: Vec<FailedDocument>,
}

/// Convert every data row of a single annotated workbook.
///
/// The legend is read from `representation_sheet` and the leaf-ID row and
/// data from `mapping_sheet` (both default to the first sheet).
pub fn rows_to_documents(
    bytes: &[u8],
    options: &CodecOptions,
) -> Result<ConversionReport, CodecError> {
    let (codec, mapping) = single_workbook_codec(bytes, options)?;
    Ok(codec.rows_to_documents(&mapping))
}

/// Convert the rows of `data` using a separate mapping and legend workbook.
///
/// Data rows come from the first sheet of `data`.
pub fn rows_to_documents_from(
    data: &[u8],
    mapping: &[u8],
    representation: &[u8],
    options: &CodecOptions,
) -> Result<ConversionReport, CodecError> {
    let codec = codec_from(mapping, representation, options)?;
    let rows = read_sheet(data, None)?;
    Ok(codec.rows_to_documents(&rows))
}

/// Flatten XML documents and append one row each to an output workbook.
///
/// `mapping` carries both the legend and the leaf-ID row. When `output` is
/// given its sheets are kept and rows are appended after the last row of
/// the target sheet; otherwise a new workbook with one sheet is created.
/// A document that fails to flatten still takes its row, holding
/// `ERROR: <message>`. With `id_header_row` an empty target sheet first
/// receives the `ID: <schema id>` label row.
pub fn documents_to_rows<S: AsRef<str>>(
    documents: &[S],
    mapping: &[u8],
    output: Option<&[u8]>,
    options: &CodecOptions,
) -> Result<WorkbookOutput, CodecError> {
    let (codec, _) = single_workbook_codec(mapping, options)?;
    append_rows(&codec, documents, output, options)
}

/// [`documents_to_rows`] with the legend in its own workbook.
pub fn documents_to_rows_from<S: AsRef<str>>(
    documents: &[S],
    mapping: &[u8],
    representation: &[u8],
    output: Option<&[u8]>,
    options: &CodecOptions,
) -> Result<WorkbookOutput, CodecError> {
    let codec = codec_from(mapping, representation, options)?;
    append_rows(&codec, documents, output, options)
}

/// Codec whose legend and mapping sheets come from one workbook, plus the
/// decoded mapping sheet.
fn single_workbook_codec(bytes: &[u8], options: &CodecOptions) -> Result<(Codec, Sheet), CodecError> {
    let mapping = read_sheet(bytes, options.mapping_sheet.as_deref())?;
    let representation = if options.representation_sheet == options.mapping_sheet {
        mapping.clone()
    } else {
        read_sheet(bytes, options.representation_sheet.as_deref())?
    };
    let tables = SchemaTables::from_sheets(&representation, &mapping, options)?;
    Ok((Codec::new(tables, options.clone())?, mapping))
}

fn codec_from(
    mapping: &[u8],
    representation: &[u8],
    options: &CodecOptions,
) -> Result<Codec, CodecError> {
    let mapping = read_sheet(mapping, options.mapping_sheet.as_deref())?;
    let representation = read_sheet(representation, options.representation_sheet.as_deref())?;
    let tables = SchemaTables::from_sheets(&representation, &mapping, options)?;
    Codec::new(tables, options.clone())
}

fn append_rows<S: AsRef<str>>(
    codec: &Codec,
    documents: &[S],
    output: Option<&[u8]>,
    options: &CodecOptions,
) -> Result<WorkbookOutput, CodecError> {
    let mut sheets = match output {
        Some(bytes) => read_all_sheets(bytes)?,
        None => Vec::new(),
    };

    let target = match &options.output_sheet {
        Some(name) => match sheets.iter().position(|s| s.name() == name.as_str()) {
            Some(index) => index,
            None if output.is_some() => {
                return Err(CodecError::Workbook(format!(
                    "output sheet '{name}' not found"
                )));
            }
            None => {
                sheets.push(Sheet::new(name.as_str()));
                sheets.len() - 1
            }
        },
        None => {
            if sheets.is_empty() {
                sheets.push(Sheet::new(DEFAULT_OUTPUT_SHEET));
            }
            0
        }
    };

    let report = codec.documents_to_rows(documents);
    let sheet = &mut sheets[target];
    if options.id_header_row && sheet.height() == 0 {
        sheet.push_row(codec.id_header_row());
    }
    let first_row = sheet.height() + 1;
    let appended = report.rows.len();
    for row in report.rows {
        sheet.push_row(row);
    }
    let sheet_name = sheet.name().to_string();

    tracing::debug!(
        sheet = %sheet_name,
        appended,
        failures = report.failures.len(),
        "rows appended"
    );

    Ok(WorkbookOutput {
        bytes: write_sheets(&sheets)?,
        sheet_name,
        appended,
        first_row,
        failures: report.failures,
    })
}
