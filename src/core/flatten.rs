//! Tree-to-row flattening, the inverse of materialization.
//!
//! Lossy by construction: every column holds the text of all nodes found
//! along its path, so sibling groups collapse into JSON-array cells and
//! per-group alignment is lost.

use super::tables::{ColumnIdMap, IdPathTable};
use super::tree::Tree;

/// Produce exactly `width` cells for `tree`, one per column of `columns`.
///
/// A column's path is followed from the root over every matching child
/// (local names, prefixes ignored). No match leaves the cell empty, one
/// match gives its text, several give a compact JSON array in document
/// order.
pub fn flatten(tree: &Tree, paths: &IdPathTable, columns: &ColumnIdMap, width: usize) -> Vec<String> {
    let mut row = vec![String::new(); width];

    for (column, id) in columns.iter() {
        if column == 0 || column > width {
            continue;
        }
        let Some(path) = paths.path(id).filter(|p| !p.is_empty()) else {
            continue;
        };

        let texts: Vec<&str> = tree
            .select(path)
            .into_iter()
            .filter_map(|n| tree.node(n).text.as_deref())
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect();

        row[column - 1] = match texts.as_slice() {
            [] => String::new(),
            [single] => (*single).to_string(),
            many => encode_list(many),
        };
    }
    row
}

/// JSON array of strings, non-ASCII kept as-is.
pub(crate) fn encode_list(items: &[&str]) -> String {
    serde_json::Value::Array(
        items
            .iter()
            .map(|s| serde_json::Value::String((*s).to_string()))
            .collect(),
    )
    .to_string()
}
