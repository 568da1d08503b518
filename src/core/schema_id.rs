//! Dotted numeric schema identifiers (`2.2.2.1`).

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::CodecError;

/// A position in the target hierarchy, e.g. `2.2.2.1`.
///
/// Ordering compares the integer segments, padding the shorter ID with
/// zeros; IDs that compare equal after padding are ordered by length.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SchemaId(Vec<u32>);

impl SchemaId {
    /// Build an ID from raw segments. Returns `None` for an empty slice.
    pub fn from_segments(segments: &[u32]) -> Option<Self> {
        if segments.is_empty() {
            None
        } else {
            Some(Self(segments.to_vec()))
        }
    }

    /// The integer segments.
    pub fn segments(&self) -> &[u32] {
        &self.0
    }

    /// Number of segments.
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// The ID with its last segment removed, or `None` for a top-level ID.
    pub fn parent(&self) -> Option<Self> {
        if self.0.len() > 1 {
            Some(Self(self.0[..self.0.len() - 1].to_vec()))
        } else {
            None
        }
    }

    /// All integer prefixes from shortest to the ID itself.
    pub fn prefixes(&self) -> impl Iterator<Item = SchemaId> + '_ {
        (1..=self.0.len()).map(|i| Self(self.0[..i].to_vec()))
    }

    /// Whether `self` is a strict descendant of `ancestor`.
    pub fn is_descendant_of(&self, ancestor: &SchemaId) -> bool {
        self.0.len() > ancestor.0.len() && self.0.starts_with(&ancestor.0)
    }
}

impl Ord for SchemaId {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.0.len().max(other.0.len());
        for i in 0..len {
            let a = self.0.get(i).copied().unwrap_or(0);
            let b = other.0.get(i).copied().unwrap_or(0);
            match a.cmp(&b) {
                Ordering::Equal => continue,
                ord => return ord,
            }
        }
        self.0.len().cmp(&other.0.len())
    }
}

impl PartialOrd for SchemaId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl FromStr for SchemaId {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(CodecError::InvalidSchemaId("empty id".into()));
        }
        let segments = trimmed
            .split('.')
            .map(|part| {
                if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(CodecError::InvalidSchemaId(format!(
                        "'{trimmed}' has a non-numeric segment"
                    )));
                }
                part.parse::<u32>().map_err(|e| {
                    CodecError::InvalidSchemaId(format!("'{trimmed}': {e}"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self(segments))
    }
}

impl TryFrom<String> for SchemaId {
    type Error = CodecError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SchemaId> for String {
    fn from(id: SchemaId) -> Self {
        id.to_string()
    }
}

impl fmt::Display for SchemaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, seg) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{seg}")?;
        }
        Ok(())
    }
}
