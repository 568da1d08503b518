use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::reference::ReferenceData;
use crate::core::{CodecOptions, DocumentValidator, NodeId, Tree, ValidationError};

const HEADER: &str = "FatturaElettronicaHeader";
const BODY: &str = "FatturaElettronicaBody";

/// A field that must be present with non-blank text.
struct Required {
    id: &'static str,
    path: &'static [&'static str],
}

macro_rules! required {
    ($id:literal => $($tag:expr),+) => {
        Required { id: $id, path: &[$($tag),+] }
    };
}

static MANDATORY: &[Required] = &[
    required!("1.1.1.1" => HEADER, "DatiTrasmissione", "IdTrasmittente", "IdPaese"),
    required!("1.1.1.2" => HEADER, "DatiTrasmissione", "IdTrasmittente", "IdCodice"),
    required!("1.1.2" => HEADER, "DatiTrasmissione", "ProgressivoInvio"),
    required!("1.1.3" => HEADER, "DatiTrasmissione", "FormatoTrasmissione"),
    required!("1.1.4" => HEADER, "DatiTrasmissione", "CodiceDestinatario"),
    required!("1.2.1.1.1" => HEADER, "CedentePrestatore", "DatiAnagrafici", "IdFiscaleIVA", "IdPaese"),
    required!("1.2.1.1.2" => HEADER, "CedentePrestatore", "DatiAnagrafici", "IdFiscaleIVA", "IdCodice"),
    required!("1.2.1.6" => HEADER, "CedentePrestatore", "DatiAnagrafici", "RegimeFiscale"),
    required!("1.2.2.4" => HEADER, "CedentePrestatore", "Sede", "Indirizzo"),
    required!("1.2.2.6" => HEADER, "CedentePrestatore", "Sede", "CAP"),
    required!("1.2.2.7" => HEADER, "CedentePrestatore", "Sede", "Comune"),
    required!("1.2.2.10" => HEADER, "CedentePrestatore", "Sede", "Nazione"),
    required!("1.4.2.4" => HEADER, "CessionarioCommittente", "Sede", "Indirizzo"),
    required!("1.4.2.6" => HEADER, "CessionarioCommittente", "Sede", "CAP"),
    required!("1.4.2.7" => HEADER, "CessionarioCommittente", "Sede", "Comune"),
    required!("1.4.2.9" => HEADER, "CessionarioCommittente", "Sede", "Nazione"),
    required!("2.1.1.1" => BODY, "DatiGenerali", "DatiGeneraliDocumento", "TipoDocumento"),
    required!("2.1.1.2" => BODY, "DatiGenerali", "DatiGeneraliDocumento", "Divisa"),
    required!("2.1.1.3" => BODY, "DatiGenerali", "DatiGeneraliDocumento", "Data"),
    required!("2.1.1.4" => BODY, "DatiGenerali", "DatiGeneraliDocumento", "Numero"),
];

/// Leaf tags holding decimal amounts, quantities or rates.
const DECIMAL_TAGS: &[&str] = &[
    "AliquotaIVA",
    "Arrotondamento",
    "ImponibileImporto",
    "ImportoPagamento",
    "ImportoTotaleDocumento",
    "Imposta",
    "PrezzoTotale",
    "PrezzoUnitario",
    "Quantita",
];

const DATE_TAGS: &[&str] = &["Data", "DataScadenzaPagamento"];

/// Field checks for Fattura Elettronica documents.
///
/// Code values are always checked wherever their element appears.
/// Presence of the mandatory header and document fields is checked only
/// when mandatory fields are enabled.
#[derive(Debug, Clone)]
pub struct FatturaValidator {
    reference: ReferenceData,
    mandatory_fields: bool,
}

impl Default for FatturaValidator {
    fn default() -> Self {
        Self::new(ReferenceData::standard())
    }
}

impl FatturaValidator {
    pub fn new(reference: ReferenceData) -> Self {
        Self {
            reference,
            mandatory_fields: false,
        }
    }

    /// Standard tables, mandatory checks following
    /// [`CodecOptions::enforce_mandatory_fields`].
    pub fn from_options(options: &CodecOptions) -> Self {
        Self::default().with_mandatory_fields(options.enforce_mandatory_fields)
    }

    pub fn with_mandatory_fields(mut self, enabled: bool) -> Self {
        self.mandatory_fields = enabled;
        self
    }

    pub fn reference(&self) -> &ReferenceData {
        &self.reference
    }

    /// Validate `tree` and return every problem found.
    pub fn validate_tree(&self, tree: &Tree) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        if self.mandatory_fields {
            check_mandatory(tree, &mut errors);
        }

        let format = first_text(tree, &[HEADER, "DatiTrasmissione", "FormatoTrasmissione"]);
        let mut path = Vec::new();
        for &child in tree.children(tree.root()) {
            self.walk(tree, child, &mut path, format.as_deref(), &mut errors);
        }
        errors
    }

    fn walk(
        &self,
        tree: &Tree,
        id: NodeId,
        path: &mut Vec<String>,
        format: Option<&str>,
        errors: &mut Vec<ValidationError>,
    ) {
        let node = tree.node(id);
        path.push(node.local_name().to_string());
        if let Some(text) = node.text.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            if let Some(message) = self.check_value(node.local_name(), text, format) {
                errors.push(error_at(path, message));
            }
        }
        for &child in &node.children {
            self.walk(tree, child, path, format, errors);
        }
        path.pop();
    }

    fn check_value(&self, tag: &str, value: &str, format: Option<&str>) -> Option<String> {
        let r = &self.reference;
        match tag {
            "IdPaese" | "Nazione" if !r.countries.contains(value) => Some(format!(
                "'{value}' is not a known ISO 3166-1 alpha-2 country code"
            )),
            "Divisa" if !r.currencies.contains(value) => {
                Some(format!("'{value}' is not a known ISO 4217 currency code"))
            }
            "RegimeFiscale" if !r.fiscal_regimes.contains(value) => {
                Some(format!("'{value}' is not a valid fiscal regime (RF01-RF19)"))
            }
            "TipoDocumento" if !r.document_types.contains(value) => {
                Some(format!("'{value}' is not a valid document type"))
            }
            "FormatoTrasmissione" if !r.transmission_formats.contains(value) => {
                Some(format!("'{value}' is not a valid transmission format"))
            }
            "CodiceDestinatario" => check_recipient_code(value, format),
            "CAP" if !(value.len() == 5 && value.bytes().all(|b| b.is_ascii_digit())) => {
                Some(format!("'{value}' must be 5 digits"))
            }
            t if DATE_TAGS.contains(&t) && NaiveDate::parse_from_str(value, "%Y-%m-%d").is_err() => {
                Some(format!("'{value}' is not a date in YYYY-MM-DD format"))
            }
            t if DECIMAL_TAGS.contains(&t) && Decimal::from_str(value).is_err() => {
                Some(format!("'{value}' is not a decimal number"))
            }
            _ => None,
        }
    }
}

impl DocumentValidator for FatturaValidator {
    fn validate(&self, tree: &Tree) -> Vec<ValidationError> {
        self.validate_tree(tree)
    }
}

/// Six characters for public administration, seven between private parties.
fn check_recipient_code(value: &str, format: Option<&str>) -> Option<String> {
    if !value.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return Some(format!("'{value}' must be alphanumeric"));
    }
    let expected = match format {
        Some("FPA12") => 6,
        _ => 7,
    };
    if value.len() != expected {
        return Some(format!("'{value}' must be {expected} characters"));
    }
    None
}

fn check_mandatory(tree: &Tree, errors: &mut Vec<ValidationError>) {
    for req in MANDATORY {
        if first_text(tree, req.path).is_none() {
            errors.push(ValidationError::with_id(
                req.path.join("."),
                "mandatory field is missing",
                req.id,
            ));
        }
    }

    for party in ["CedentePrestatore", "CessionarioCommittente"] {
        let anagrafica = [HEADER, party, "DatiAnagrafici", "Anagrafica"];
        let has = |tag: &'static str| {
            let mut path = anagrafica.to_vec();
            path.push(tag);
            first_text(tree, &path).is_some()
        };
        if !has("Denominazione") && !(has("Nome") && has("Cognome")) {
            errors.push(ValidationError::new(
                anagrafica.join("."),
                "either Denominazione or both Nome and Cognome are required",
            ));
        }
    }

    let buyer = [HEADER, "CessionarioCommittente", "DatiAnagrafici"];
    let has_vat = first_text(tree, &[buyer[0], buyer[1], buyer[2], "IdFiscaleIVA", "IdCodice"]).is_some();
    let has_tax_code = first_text(tree, &[buyer[0], buyer[1], buyer[2], "CodiceFiscale"]).is_some();
    if !has_vat && !has_tax_code {
        errors.push(ValidationError::new(
            buyer.join("."),
            "either IdFiscaleIVA or CodiceFiscale is required",
        ));
    }
}

fn first_text(tree: &Tree, path: &[&str]) -> Option<String> {
    tree.select(path)
        .into_iter()
        .filter_map(|n| tree.node(n).text.as_deref())
        .map(str::trim)
        .find(|t| !t.is_empty())
        .map(str::to_string)
}

fn error_at(path: &[String], message: String) -> ValidationError {
    let field = path.join(".");
    match MANDATORY.iter().find(|r| r.path.iter().eq(path.iter())) {
        Some(req) => ValidationError::with_id(field, message, req.id),
        None => ValidationError::new(field, message),
    }
}
