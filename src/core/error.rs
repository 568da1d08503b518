use thiserror::Error;

/// Errors that can occur while building schema tables or converting documents.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CodecError {
    /// No legend marker and no `<id> <Tag>` annotation anywhere in the scan window.
    #[error("schema not found: {0}")]
    SchemaNotFound(String),

    /// A dotted schema identifier could not be parsed.
    #[error("invalid schema id: {0}")]
    InvalidSchemaId(String),

    /// XML generation or parsing error.
    #[error("XML error: {0}")]
    Xml(String),

    /// Workbook decoding or encoding error.
    #[error("workbook error: {0}")]
    Workbook(String),

    /// Invalid codec configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// The validation collaborator rejected the document.
    #[error("validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),

    /// Strict mode: lenient drops were reported for this row.
    #[error("strict mode rejected {} diagnostic(s): {}", .0.len(), join_diagnostics(.0))]
    Diagnostics(Vec<Diagnostic>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

fn join_diagnostics(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// A single validation error with field path and message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dot-separated tag path to the invalid field
    /// (e.g. "FatturaElettronicaBody.DatiGenerali.DatiGeneraliDocumento.Divisa").
    pub field: String,
    /// Human-readable error description.
    pub message: String,
    /// Schema ID of the field, when it is known (e.g. "2.1.1.2").
    pub schema_id: Option<String>,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(id) = &self.schema_id {
            write!(f, "[{}] {}: {}", id, self.field, self.message)
        } else {
            write!(f, "{}: {}", self.field, self.message)
        }
    }
}

impl ValidationError {
    /// Create a validation error without a schema ID.
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            schema_id: None,
        }
    }

    /// Create a validation error tagged with the field's schema ID.
    pub fn with_id(
        field: impl Into<String>,
        message: impl Into<String>,
        schema_id: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            schema_id: Some(schema_id.into()),
        }
    }
}

/// Something the codec dropped or patched instead of failing.
///
/// The default behaviour is lenient: diagnostics are collected per row and
/// returned alongside the result. With [`CodecOptions::strict`](super::CodecOptions)
/// they turn into a [`CodecError::Diagnostics`] rejection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// Column of the data row has no leaf ID in the mapping sheet.
    UnmappableColumn { column: usize },
    /// Cell started with `[` but was not a valid JSON array; kept as a literal.
    MalformedValueList { id: String, text: String },
    /// ID has no resolvable tag path; its values were dropped.
    EmptyPath { id: String },
    /// Repeated group whose element tag is unknown; placed as singletons.
    UnplaceableGroup { prefix: String },
    /// Mandatory field was absent and a default value was inserted.
    DefaultApplied { id: String, value: String },
}

impl Diagnostic {
    /// Whether input data was dropped or altered. Strict mode only rejects
    /// rows with lossy diagnostics; applied defaults are informational.
    pub fn is_lossy(&self) -> bool {
        !matches!(self, Self::DefaultApplied { .. })
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnmappableColumn { column } => {
                write!(f, "column {column} has a value but no leaf ID")
            }
            Self::MalformedValueList { id, text } => {
                write!(f, "{id}: '{text}' is not a JSON array, kept as text")
            }
            Self::EmptyPath { id } => write!(f, "{id}: no tag path, values dropped"),
            Self::UnplaceableGroup { prefix } => {
                write!(f, "{prefix}: unknown group tag, placed as single elements")
            }
            Self::DefaultApplied { id, value } => {
                write!(f, "{id}: missing, default '{value}' applied")
            }
        }
    }
}
