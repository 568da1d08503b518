//! Codec configuration.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::error::CodecError;
use super::schema_id::SchemaId;
use super::tables::DEFAULT_FALLBACK_SCAN_ROWS;

/// Fattura Elettronica 1.2 namespace.
pub const FATTURA_NAMESPACE: &str = "http://ivaservizi.agenziaentrate.gov.it/docs/xsd/fatture/v1.2";

/// Version attribute for invoices between private parties.
pub const FATTURA_VERSION: &str = "FPR12";

/// How namespaces are declared on the serialized document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamespaceMode {
    /// Namespace declared on the root only; header and body inherit it.
    #[default]
    Inherit,
    /// Header and body sections carry `xmlns=""`, for validators that
    /// expect unqualified sub-structures.
    ResetSections,
}

/// Correlated repeated group: a list of references zipped against a list
/// of document IDs, e.g. `RiferimentoNumeroLinea` / `IdDocumento` inside
/// `DatiOrdineAcquisto`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderReferenceRule {
    /// Group ID whose descendants form the family (`2.1.2`).
    pub family: SchemaId,
    /// One-to-many reference list (`2.1.2.1`).
    pub reference: SchemaId,
    /// Document key list (`2.1.2.2`).
    pub document: SchemaId,
}

/// Target-schema knowledge the codec cannot infer from the legend sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaProfile {
    /// Root element name.
    pub root_tag: String,
    /// Default namespace declared on the root.
    pub namespace: String,
    /// Value of the root `versione` attribute.
    pub version: String,
    pub header_tag: String,
    pub body_tag: String,
    /// Optional third top-level child (XML digital signature).
    pub signature_tag: String,
    /// Body group whose document header is moved to the front.
    pub general_data_tag: String,
    pub document_header_tag: String,
    /// Container paths used when an ID's ancestors are not annotated.
    /// Looked up by longest matching prefix.
    pub section_fallbacks: BTreeMap<SchemaId, Vec<String>>,
    /// Group element tags for repeated groups whose prefix is not annotated.
    pub group_fallbacks: BTreeMap<SchemaId, String>,
    pub order_reference: Option<OrderReferenceRule>,
    /// Values inserted for absent IDs when mandatory fields are enforced.
    pub mandatory_defaults: BTreeMap<SchemaId, String>,
}

impl SchemaProfile {
    /// Profile for Fattura Elettronica (FPR12).
    pub fn fattura() -> Self {
        let section = |id: &[u32], tags: &[&str]| {
            (
                sid(id),
                tags.iter().map(|t| t.to_string()).collect::<Vec<_>>(),
            )
        };
        let header = "FatturaElettronicaHeader";
        let body = "FatturaElettronicaBody";
        Self {
            root_tag: "FatturaElettronica".into(),
            namespace: FATTURA_NAMESPACE.into(),
            version: FATTURA_VERSION.into(),
            header_tag: header.into(),
            body_tag: body.into(),
            signature_tag: "Signature".into(),
            general_data_tag: "DatiGenerali".into(),
            document_header_tag: "DatiGeneraliDocumento".into(),
            section_fallbacks: [
                section(&[1], &[header]),
                section(&[2], &[body]),
                section(&[2, 1], &[body, "DatiGenerali"]),
                section(&[2, 2], &[body, "DatiBeniServizi"]),
                section(&[2, 3], &[body, "DatiVeicoli"]),
                section(&[2, 4], &[body, "DatiPagamento"]),
                section(&[2, 5], &[body, "Allegati"]),
            ]
            .into_iter()
            .collect(),
            group_fallbacks: [
                (sid(&[2, 1, 2]), "DatiOrdineAcquisto".to_string()),
                (sid(&[2, 2, 1]), "DatiRiepilogo".to_string()),
                (sid(&[2, 2, 2]), "DettaglioLinee".to_string()),
                (sid(&[2, 4, 2]), "DettaglioPagamento".to_string()),
            ]
            .into_iter()
            .collect(),
            order_reference: Some(OrderReferenceRule {
                family: sid(&[2, 1, 2]),
                reference: sid(&[2, 1, 2, 1]),
                document: sid(&[2, 1, 2, 2]),
            }),
            mandatory_defaults: [
                (sid(&[1, 1, 3]), FATTURA_VERSION.to_string()),
                (sid(&[1, 1, 4]), "0000000".to_string()),
            ]
            .into_iter()
            .collect(),
        }
    }

    /// Container path for `id` from the longest annotated fallback prefix.
    pub fn section_fallback(&self, id: &SchemaId) -> Option<&[String]> {
        let prefixes: Vec<SchemaId> = id.prefixes().collect();
        prefixes
            .iter()
            .rev()
            .find_map(|p| self.section_fallbacks.get(p))
            .map(Vec::as_slice)
    }

    /// Group tag registered for exactly `prefix`.
    pub fn group_fallback(&self, prefix: &SchemaId) -> Option<&str> {
        self.group_fallbacks.get(prefix).map(String::as_str)
    }
}

impl Default for SchemaProfile {
    fn default() -> Self {
        Self::fattura()
    }
}

fn sid(segments: &[u32]) -> SchemaId {
    SchemaId::from_segments(segments).unwrap_or_else(|| unreachable!("profile ids are non-empty"))
}

/// Options for a conversion batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecOptions {
    pub namespace_mode: NamespaceMode,
    /// Emit `<?xml version="1.0" encoding="UTF-8"?>`.
    pub include_xml_declaration: bool,
    /// Insert mandatory defaults and guarantee header/body sections.
    /// Also switches the validator's mandatory-field checks on.
    pub enforce_mandatory_fields: bool,
    /// Reject a row when any diagnostic was recorded for it.
    pub strict: bool,
    /// First row (1-based) considered for data.
    pub first_data_row: usize,
    /// Rows scanned when the legend has no `ID e Nome` header.
    pub fallback_scan_rows: usize,
    /// Generated documents are named `{prefix}{n}.xml`.
    pub filename_prefix: String,
    /// Sheet holding the ID legend (first sheet when `None`).
    pub representation_sheet: Option<String>,
    /// Sheet holding the leaf-ID annotations (first sheet when `None`).
    pub mapping_sheet: Option<String>,
    /// Sheet receiving flattened rows (first sheet or `Sheet1` when `None`).
    pub output_sheet: Option<String>,
    /// Start an empty output sheet with an `ID: <schema id>` label row.
    pub id_header_row: bool,
    pub profile: SchemaProfile,
}

impl Default for CodecOptions {
    fn default() -> Self {
        Self {
            namespace_mode: NamespaceMode::Inherit,
            include_xml_declaration: true,
            enforce_mandatory_fields: false,
            strict: false,
            first_data_row: 2,
            fallback_scan_rows: DEFAULT_FALLBACK_SCAN_ROWS,
            filename_prefix: "invoice_".into(),
            representation_sheet: None,
            mapping_sheet: None,
            output_sheet: None,
            id_header_row: false,
            profile: SchemaProfile::fattura(),
        }
    }
}

impl CodecOptions {
    /// Check option values that would make a batch meaningless.
    pub fn validate(&self) -> Result<(), CodecError> {
        if self.first_data_row == 0 {
            return Err(CodecError::Config("first_data_row is 1-based".into()));
        }
        if self.profile.root_tag.trim().is_empty() {
            return Err(CodecError::Config("root tag must not be empty".into()));
        }
        if let Some(rule) = &self.profile.order_reference {
            if !rule.reference.is_descendant_of(&rule.family)
                || !rule.document.is_descendant_of(&rule.family)
            {
                return Err(CodecError::Config(format!(
                    "order reference ids {} / {} must belong to family {}",
                    rule.reference, rule.document, rule.family
                )));
            }
        }
        Ok(())
    }
}

/// Builder for [`CodecOptions`].
///
/// # Example
///
/// ```
/// use fattura::core::{CodecOptionsBuilder, NamespaceMode};
///
/// let options = CodecOptionsBuilder::new()
///     .namespace_mode(NamespaceMode::ResetSections)
///     .enforce_mandatory_fields(true)
///     .build();
/// assert!(options.enforce_mandatory_fields);
/// ```
#[derive(Debug, Clone, Default)]
pub struct CodecOptionsBuilder {
    options: CodecOptions,
}

impl CodecOptionsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn namespace_mode(mut self, mode: NamespaceMode) -> Self {
        self.options.namespace_mode = mode;
        self
    }

    pub fn include_xml_declaration(mut self, include: bool) -> Self {
        self.options.include_xml_declaration = include;
        self
    }

    pub fn enforce_mandatory_fields(mut self, enforce: bool) -> Self {
        self.options.enforce_mandatory_fields = enforce;
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.options.strict = strict;
        self
    }

    pub fn first_data_row(mut self, row: usize) -> Self {
        self.options.first_data_row = row;
        self
    }

    pub fn fallback_scan_rows(mut self, rows: usize) -> Self {
        self.options.fallback_scan_rows = rows;
        self
    }

    pub fn filename_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.options.filename_prefix = prefix.into();
        self
    }

    pub fn representation_sheet(mut self, name: impl Into<String>) -> Self {
        self.options.representation_sheet = Some(name.into());
        self
    }

    pub fn mapping_sheet(mut self, name: impl Into<String>) -> Self {
        self.options.mapping_sheet = Some(name.into());
        self
    }

    pub fn output_sheet(mut self, name: impl Into<String>) -> Self {
        self.options.output_sheet = Some(name.into());
        self
    }

    pub fn id_header_row(mut self, header: bool) -> Self {
        self.options.id_header_row = header;
        self
    }

    pub fn profile(mut self, profile: SchemaProfile) -> Self {
        self.options.profile = profile;
        self
    }

    pub fn build(self) -> CodecOptions {
        self.options
    }
}
