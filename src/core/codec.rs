//! Batch conversion between worksheet rows and XML documents.

use super::cell::{CellValue, Sheet, cell_text};
use super::error::{CodecError, Diagnostic, ValidationError};
use super::flatten::flatten;
use super::materialize::{MaterializePolicy, materialize};
use super::options::CodecOptions;
use super::serialize::{SerializeOptions, serialize};
use super::tables::{ColumnIdMap, IdPathTable, IdTagTable, discover_with, is_legend_marker, locate, resolve};
use super::tree::{Tree, parse_xml};
use super::values::collect;

/// The three lookup tables for a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaTables {
    pub tags: IdTagTable,
    pub paths: IdPathTable,
    pub columns: ColumnIdMap,
}

impl SchemaTables {
    /// Tables from one sheet carrying both the legend and the leaf-ID row.
    pub fn from_sheet(sheet: &Sheet, options: &CodecOptions) -> Result<Self, CodecError> {
        Self::from_sheets(sheet, sheet, options)
    }

    /// Tables from a legend sheet and a separate mapping sheet.
    pub fn from_sheets(
        representation: &Sheet,
        mapping: &Sheet,
        options: &CodecOptions,
    ) -> Result<Self, CodecError> {
        let tags = discover_with(representation, options.fallback_scan_rows)?;
        let paths = resolve(&tags);
        let columns = locate(mapping);
        tracing::debug!(
            ids = tags.len(),
            columns = columns.len(),
            width = columns.width(),
            "schema tables built"
        );
        Ok(Self {
            tags,
            paths,
            columns,
        })
    }
}

/// Optional check run on every materialized tree before serialization.
pub trait DocumentValidator: Send + Sync {
    /// Every failing field; empty when the document is acceptable.
    fn validate(&self, tree: &Tree) -> Vec<ValidationError>;
}

/// One generated XML document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedDocument {
    /// 1-based sheet row the document came from.
    pub row: usize,
    pub filename: String,
    pub xml: String,
    pub diagnostics: Vec<Diagnostic>,
}

/// A data row that did not produce a document.
#[derive(Debug)]
pub struct RejectedRow {
    pub row: usize,
    pub filename: String,
    pub error: CodecError,
}

/// Result of [`Codec::rows_to_documents`].
#[derive(Debug, Default)]
pub struct ConversionReport {
    pub documents: Vec<GeneratedDocument>,
    pub rejected: Vec<RejectedRow>,
}

impl ConversionReport {
    /// Number of data rows seen (generated plus rejected).
    pub fn data_rows(&self) -> usize {
        self.documents.len() + self.rejected.len()
    }
}

/// An input document that could not be flattened.
#[derive(Debug)]
pub struct FailedDocument {
    /// 0-based position in the input list.
    pub index: usize,
    pub error: CodecError,
}

/// Result of [`Codec::documents_to_rows`].
///
/// `rows` holds one row per input document, in input order; a failed
/// document gets an error row at its position and an entry in `failures`.
#[derive(Debug, Default)]
pub struct FlattenReport {
    pub rows: Vec<Vec<String>>,
    pub failures: Vec<FailedDocument>,
}

/// Converter bound to one set of [`SchemaTables`] and [`CodecOptions`].
///
/// Immutable after construction and `Send + Sync`, so rows can be
/// converted from several threads at once.
pub struct Codec {
    tables: SchemaTables,
    options: CodecOptions,
    validator: Option<Box<dyn DocumentValidator>>,
}

impl std::fmt::Debug for Codec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Codec")
            .field("tables", &self.tables)
            .field("options", &self.options)
            .field("validator", &self.validator.is_some())
            .finish()
    }
}

impl Codec {
    pub fn new(tables: SchemaTables, options: CodecOptions) -> Result<Self, CodecError> {
        options.validate()?;
        Ok(Self {
            tables,
            options,
            validator: None,
        })
    }

    /// Build the tables from a single annotated sheet.
    pub fn from_sheet(sheet: &Sheet, options: CodecOptions) -> Result<Self, CodecError> {
        let tables = SchemaTables::from_sheet(sheet, &options)?;
        Self::new(tables, options)
    }

    /// Run `validator` on every tree before it is serialized.
    pub fn with_validator(mut self, validator: impl DocumentValidator + 'static) -> Self {
        self.validator = Some(Box::new(validator));
        self
    }

    pub fn tables(&self) -> &SchemaTables {
        &self.tables
    }

    pub fn options(&self) -> &CodecOptions {
        &self.options
    }

    /// Collect and materialize one row without serializing it.
    pub fn row_to_tree(&self, row: &[CellValue]) -> (Tree, Vec<Diagnostic>) {
        let (values, mut diagnostics) = collect(row, &self.tables.columns);
        let policy = MaterializePolicy::from_options(&self.options);
        let (tree, more) = materialize(&values, &self.tables.paths, &policy);
        diagnostics.extend(more);
        (tree, diagnostics)
    }

    /// Convert one data row into an XML document.
    pub fn convert_row(&self, row: &[CellValue]) -> Result<(String, Vec<Diagnostic>), CodecError> {
        let (tree, diagnostics) = self.row_to_tree(row);

        if self.options.strict {
            let lossy: Vec<Diagnostic> = diagnostics.iter().filter(|d| d.is_lossy()).cloned().collect();
            if !lossy.is_empty() {
                return Err(CodecError::Diagnostics(lossy));
            }
        }

        if let Some(validator) = &self.validator {
            let errors = validator.validate(&tree);
            if !errors.is_empty() {
                return Err(CodecError::Validation(errors));
            }
        }

        let xml = serialize(&tree, &SerializeOptions::from_options(&self.options))?;
        Ok((xml, diagnostics))
    }

    /// Whether a sheet row holds invoice data rather than annotations.
    ///
    /// Blank rows, rows whose every non-empty cell contains `<` and the
    /// `ID e Nome` legend header are not data.
    pub fn is_data_row(row: &[CellValue]) -> bool {
        let texts: Vec<String> = row
            .iter()
            .filter_map(cell_text)
            .filter(|t| !t.trim().is_empty())
            .collect();
        if texts.is_empty() {
            return false;
        }
        if texts.iter().all(|t| t.contains('<')) {
            return false;
        }
        !row.first()
            .and_then(cell_text)
            .is_some_and(|t| is_legend_marker(&t))
    }

    /// Convert every data row of `sheet`, starting at `first_data_row`.
    ///
    /// Failures are isolated per row. Files are named
    /// `{filename_prefix}{n}.xml` with `n` counting data rows from 1.
    pub fn rows_to_documents(&self, sheet: &Sheet) -> ConversionReport {
        let mut report = ConversionReport::default();
        let mut n = 0usize;

        for r in self.options.first_data_row..=sheet.height() {
            let row = sheet.row(r);
            if !Self::is_data_row(row) {
                continue;
            }
            n += 1;
            let filename = format!("{}{n}.xml", self.options.filename_prefix);
            match self.convert_row(row) {
                Ok((xml, diagnostics)) => {
                    tracing::debug!(row = r, %filename, diagnostics = diagnostics.len(), "row converted");
                    report.documents.push(GeneratedDocument {
                        row: r,
                        filename,
                        xml,
                        diagnostics,
                    });
                }
                Err(error) => {
                    tracing::warn!(row = r, %filename, %error, "row rejected");
                    report.rejected.push(RejectedRow {
                        row: r,
                        filename,
                        error,
                    });
                }
            }
        }

        tracing::debug!(
            sheet = sheet.name(),
            documents = report.documents.len(),
            rejected = report.rejected.len(),
            "batch converted"
        );
        report
    }

    /// Flatten one XML document into a row as wide as the mapping sheet.
    pub fn document_to_row(&self, xml: &str) -> Result<Vec<String>, CodecError> {
        let tree = parse_xml(xml)?;
        Ok(flatten(
            &tree,
            &self.tables.paths,
            &self.tables.columns,
            self.tables.columns.width(),
        ))
    }

    /// Flatten every document, keeping going past failures.
    pub fn documents_to_rows<S: AsRef<str>>(&self, documents: &[S]) -> FlattenReport {
        let mut report = FlattenReport::default();
        for (index, xml) in documents.iter().enumerate() {
            match self.document_to_row(xml.as_ref()) {
                Ok(row) => report.rows.push(row),
                Err(error) => {
                    tracing::warn!(index, %error, "document not flattened");
                    report.rows.push(self.error_row(&error));
                    report.failures.push(FailedDocument { index, error });
                }
            }
        }
        report
    }

    /// Placeholder row for a document that could not be flattened:
    /// `ERROR: <message>` in the first column, blanks after it.
    pub fn error_row(&self, error: &CodecError) -> Vec<String> {
        let mut row = vec![String::new(); self.tables.columns.width().max(1)];
        row[0] = format!("ERROR: {error}");
        row
    }

    /// Column labels `ID: <schema id>` for every mapped column; unmapped
    /// columns stay blank.
    pub fn id_header_row(&self) -> Vec<String> {
        (1..=self.tables.columns.width())
            .map(|col| {
                self.tables
                    .columns
                    .get(col)
                    .map(|id| format!("ID: {id}"))
                    .unwrap_or_default()
            })
            .collect()
    }
}
