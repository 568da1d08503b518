//! Schema tables discovered from annotated worksheets.
//!
//! - [`discover`] harvests `"<id> <Tag>"` legend annotations into an [`IdTagTable`].
//! - [`resolve`] expands that table into tag paths ([`IdPathTable`]).
//! - [`locate`] recovers the leaf ID of every column ([`ColumnIdMap`]).
//!
//! All three tables are immutable once built and safe to share across threads.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use super::cell::Sheet;
use super::error::CodecError;
use super::schema_id::SchemaId;

/// Rows scanned by the headerless fallback in [`discover`].
pub const DEFAULT_FALLBACK_SCAN_ROWS: usize = 10;

static LEGEND_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)ID\s*e\s*Nome").expect("legend marker regex"));

static ID_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\s*(\d+(?:\.\d+)*)\s*<([^>]+)>").expect("id/tag annotation regex")
});

static LEAF_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+(?:\.\d+)*)\s*<").expect("leaf id regex"));

/// Whether `text` is the legend header label (`ID e Nome`, any case).
pub fn is_legend_marker(text: &str) -> bool {
    LEGEND_MARKER.is_match(text)
}

/// Mapping from schema ID to element tag name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdTagTable {
    entries: BTreeMap<SchemaId, String>,
}

impl IdTagTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `tag` for `id` unless the ID is already present.
    /// Returns `false` when an earlier entry was kept.
    pub fn insert(&mut self, id: SchemaId, tag: impl Into<String>) -> bool {
        use std::collections::btree_map::Entry;
        match self.entries.entry(id) {
            Entry::Vacant(slot) => {
                slot.insert(tag.into());
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    pub fn get(&self, id: &SchemaId) -> Option<&str> {
        self.entries.get(id).map(String::as_str)
    }

    pub fn contains(&self, id: &SchemaId) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in schema-ID order.
    pub fn iter(&self) -> impl Iterator<Item = (&SchemaId, &str)> {
        self.entries.iter().map(|(id, tag)| (id, tag.as_str()))
    }
}

impl<T: Into<String>> FromIterator<(SchemaId, T)> for IdTagTable {
    fn from_iter<I: IntoIterator<Item = (SchemaId, T)>>(iter: I) -> Self {
        let mut table = Self::new();
        for (id, tag) in iter {
            table.insert(id, tag);
        }
        table
    }
}

/// Mapping from schema ID to the tag names along its path from the root.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdPathTable {
    paths: BTreeMap<SchemaId, Vec<String>>,
}

impl IdPathTable {
    /// Tag path of `id`, if the ID was in the source table.
    pub fn path(&self, id: &SchemaId) -> Option<&[String]> {
        self.paths.get(id).map(Vec::as_slice)
    }

    /// Last tag of the path of `id`.
    pub fn leaf_tag(&self, id: &SchemaId) -> Option<&str> {
        self.path(id).and_then(|p| p.last()).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SchemaId, &[String])> {
        self.paths.iter().map(|(id, p)| (id, p.as_slice()))
    }
}

/// Mapping from 1-based column index to the column's leaf schema ID.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnIdMap {
    columns: BTreeMap<usize, SchemaId>,
    width: usize,
}

impl ColumnIdMap {
    /// Empty map for a sheet `width` columns wide.
    pub fn with_width(width: usize) -> Self {
        Self {
            columns: BTreeMap::new(),
            width,
        }
    }

    /// Map 1-based `column` to `id`, widening the map if needed.
    pub fn insert(&mut self, column: usize, id: SchemaId) {
        self.width = self.width.max(column);
        self.columns.insert(column, id);
    }

    pub fn get(&self, column: usize) -> Option<&SchemaId> {
        self.columns.get(&column)
    }

    /// Width of the scanned sheet; output rows have this many cells.
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// `(column, id)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &SchemaId)> {
        self.columns.iter().map(|(c, id)| (*c, id))
    }
}

/// Build the ID→tag table from a legend sheet.
///
/// Looks for the `ID e Nome` marker in column 1; every later row
/// contributes its first `<id> <Tag>` annotation. Without a marker (or
/// when the legend below it is empty) the first
/// [`DEFAULT_FALLBACK_SCAN_ROWS`] rows are scanned cell by cell instead.
pub fn discover(sheet: &Sheet) -> Result<IdTagTable, CodecError> {
    discover_with(sheet, DEFAULT_FALLBACK_SCAN_ROWS)
}

/// [`discover`] with a custom fallback scan window.
pub fn discover_with(sheet: &Sheet, fallback_rows: usize) -> Result<IdTagTable, CodecError> {
    let height = sheet.height();
    let width = sheet.width();
    let mut table = IdTagTable::new();

    let marker_row = (1..=height).find(|&r| {
        sheet
            .text(r, 1)
            .is_some_and(|text| is_legend_marker(&text))
    });

    if let Some(header) = marker_row {
        for r in header + 1..=height {
            for c in 1..=width {
                let Some(text) = sheet.text(r, c) else {
                    continue;
                };
                if let Some((id, tag)) = match_id_tag(&text) {
                    record(&mut table, id, tag, r);
                    break;
                }
            }
        }
        if !table.is_empty() {
            tracing::debug!(
                sheet = sheet.name(),
                marker_row = header,
                entries = table.len(),
                "legend discovered"
            );
            return Ok(table);
        }
    }

    for r in 1..=height.min(fallback_rows) {
        for c in 1..=width {
            let Some(text) = sheet.text(r, c) else {
                continue;
            };
            if let Some((id, tag)) = match_id_tag(&text) {
                record(&mut table, id, tag, r);
            }
        }
    }

    if table.is_empty() {
        return Err(CodecError::SchemaNotFound(format!(
            "sheet '{}' has no 'ID e Nome' legend and no '<id> <Tag>' cell in its first {} rows",
            sheet.name(),
            fallback_rows
        )));
    }
    tracing::debug!(
        sheet = sheet.name(),
        entries = table.len(),
        "legend discovered by fallback scan"
    );
    Ok(table)
}

fn record(table: &mut IdTagTable, id: SchemaId, tag: String, row: usize) {
    let shown = id.to_string();
    if !table.insert(id, tag) {
        tracing::debug!(id = %shown, row, "duplicate legend id ignored");
    }
}

fn match_id_tag(text: &str) -> Option<(SchemaId, String)> {
    let caps = ID_TAG.captures(text)?;
    let id = caps.get(1)?.as_str().parse().ok()?;
    let tag = caps.get(2)?.as_str().trim();
    if tag.is_empty() {
        return None;
    }
    Some((id, tag.to_string()))
}

/// Expand every ID of `tags` into the tags of its annotated prefixes.
///
/// Missing intermediate prefixes are skipped, so paths can be shorter
/// than the ID depth.
pub fn resolve(tags: &IdTagTable) -> IdPathTable {
    let paths = tags
        .iter()
        .map(|(id, _)| {
            let path = id
                .prefixes()
                .filter_map(|prefix| tags.get(&prefix).map(str::to_string))
                .collect();
            (id.clone(), path)
        })
        .collect();
    IdPathTable { paths }
}

/// Find the leaf ID of every column by scanning each column bottom-up.
///
/// The first cell (from the last row upwards) that starts with a dotted ID
/// followed by `<` wins. Columns without one are left out.
pub fn locate(sheet: &Sheet) -> ColumnIdMap {
    let height = sheet.height();
    let width = sheet.width();
    let mut map = ColumnIdMap::with_width(width);

    for c in 1..=width {
        for r in (1..=height).rev() {
            let Some(text) = sheet.text(r, c) else {
                continue;
            };
            if let Some(id) = match_leaf_id(&text) {
                map.insert(c, id);
                break;
            }
        }
    }
    tracing::debug!(
        sheet = sheet.name(),
        width,
        mapped = map.len(),
        "leaf columns located"
    );
    map
}

/// Leaf ID of an annotation cell such as `2.2.1.4 <Descrizione>`.
pub fn match_leaf_id(text: &str) -> Option<SchemaId> {
    if !text.contains('<') {
        return None;
    }
    let caps = LEAF_ID.captures(text.trim_start())?;
    caps.get(1)?.as_str().parse().ok()
}
