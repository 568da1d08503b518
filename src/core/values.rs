//! Per-row value collection.

use std::collections::BTreeMap;

use super::cell::{CellValue, cell_text};
use super::error::Diagnostic;
use super::schema_id::SchemaId;
use super::tables::ColumnIdMap;

/// Values of one data row, keyed by leaf schema ID.
///
/// Iteration is in schema-ID order. IDs without any value are absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValueList {
    values: BTreeMap<SchemaId, Vec<String>>,
}

impl ValueList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `value` to the list of `id`.
    pub fn push(&mut self, id: SchemaId, value: impl Into<String>) {
        self.values.entry(id).or_default().push(value.into());
    }

    /// Replace the whole list of `id`. An empty list removes the ID.
    pub fn set(&mut self, id: SchemaId, values: Vec<String>) {
        if values.is_empty() {
            self.values.remove(&id);
        } else {
            self.values.insert(id, values);
        }
    }

    pub fn get(&self, id: &SchemaId) -> Option<&[String]> {
        self.values.get(id).map(Vec::as_slice)
    }

    /// First value of `id`.
    pub fn first(&self, id: &SchemaId) -> Option<&str> {
        self.get(id).and_then(|v| v.first()).map(String::as_str)
    }

    pub fn contains(&self, id: &SchemaId) -> bool {
        self.values.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &SchemaId> {
        self.values.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SchemaId, &[String])> {
        self.values.iter().map(|(id, v)| (id, v.as_slice()))
    }
}

impl<S: Into<String>> FromIterator<(SchemaId, Vec<S>)> for ValueList {
    fn from_iter<I: IntoIterator<Item = (SchemaId, Vec<S>)>>(iter: I) -> Self {
        let mut list = Self::new();
        for (id, values) in iter {
            list.set(id, values.into_iter().map(Into::into).collect());
        }
        list
    }
}

/// Decode one data row (column 1 first) into a [`ValueList`].
///
/// A cell whose trimmed text starts with `[` is parsed as a JSON array, one
/// entry per element; when that fails the text is kept as a single entry
/// and a [`Diagnostic::MalformedValueList`] is recorded. Non-empty cells in
/// unmapped columns yield [`Diagnostic::UnmappableColumn`].
pub fn collect(row: &[CellValue], columns: &ColumnIdMap) -> (ValueList, Vec<Diagnostic>) {
    let mut list = ValueList::new();
    let mut diagnostics = Vec::new();

    for (index, cell) in row.iter().enumerate() {
        let column = index + 1;
        let Some(text) = cell_text(cell) else {
            continue;
        };
        let trimmed = text.trim();
        if trimmed.is_empty() {
            continue;
        }
        let Some(id) = columns.get(column) else {
            diagnostics.push(Diagnostic::UnmappableColumn { column });
            continue;
        };
        match decode_cell(trimmed) {
            Decoded::Many(items) => {
                for item in items {
                    list.push(id.clone(), item);
                }
            }
            Decoded::One(item) => list.push(id.clone(), item),
            Decoded::Malformed(item) => {
                diagnostics.push(Diagnostic::MalformedValueList {
                    id: id.to_string(),
                    text: item.clone(),
                });
                list.push(id.clone(), item);
            }
        }
    }

    for d in &diagnostics {
        tracing::trace!(diagnostic = %d, "collect");
    }
    (list, diagnostics)
}

enum Decoded {
    One(String),
    Many(Vec<String>),
    Malformed(String),
}

fn decode_cell(trimmed: &str) -> Decoded {
    if !trimmed.starts_with('[') {
        return Decoded::One(trimmed.to_string());
    }
    match serde_json::from_str::<serde_json::Value>(trimmed) {
        Ok(serde_json::Value::Array(items)) => {
            Decoded::Many(items.into_iter().map(stringify).collect())
        }
        _ => Decoded::Malformed(trimmed.to_string()),
    }
}

fn stringify(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    }
}

/// Replace every line break with a space and trim.
///
/// XML text nodes produced by the codec never contain raw newlines from
/// multi-line spreadsheet cells.
pub fn normalize_text(text: &str) -> String {
    text.replace("\r\n", " ")
        .replace(['\r', '\n'], " ")
        .trim()
        .to_string()
}
