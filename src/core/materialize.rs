//! Row-to-tree materialization.
//!
//! A [`ValueList`] becomes a [`Tree`] in three stages, each ID consumed by
//! at most one of them:
//!
//! 1. order-reference grouping (references zipped against document IDs),
//! 2. repeated-group fan-out (a bucket with any multi-valued ID),
//! 3. singleton placement.
//!
//! The result is then normalized: root attributes, top-level section order
//! and the document header first inside the general-data group.

use std::collections::BTreeMap;

use super::error::Diagnostic;
use super::options::{CodecOptions, OrderReferenceRule, SchemaProfile};
use super::schema_id::SchemaId;
use super::tables::IdPathTable;
use super::tree::Tree;
use super::values::{ValueList, normalize_text};

/// Settings for [`materialize`].
#[derive(Debug, Clone, Copy)]
pub struct MaterializePolicy<'a> {
    pub profile: &'a SchemaProfile,
    /// Inject mandatory defaults and guarantee the header/body sections.
    pub enforce_mandatory_fields: bool,
}

impl<'a> MaterializePolicy<'a> {
    pub fn new(profile: &'a SchemaProfile) -> Self {
        Self {
            profile,
            enforce_mandatory_fields: false,
        }
    }

    pub fn from_options(options: &'a CodecOptions) -> Self {
        Self {
            profile: &options.profile,
            enforce_mandatory_fields: options.enforce_mandatory_fields,
        }
    }

    pub fn enforce_mandatory_fields(mut self, enforce: bool) -> Self {
        self.enforce_mandatory_fields = enforce;
        self
    }
}

/// Normalized values still waiting to be placed. Blank entries are kept
/// as `""` so that positions stay aligned across a repeated group.
type Pending = BTreeMap<SchemaId, Vec<String>>;

/// Build the element tree for one data row.
///
/// Never fails: IDs that cannot be placed are dropped and reported.
pub fn materialize(
    values: &ValueList,
    paths: &IdPathTable,
    policy: &MaterializePolicy<'_>,
) -> (Tree, Vec<Diagnostic>) {
    let mut m = Materializer {
        tree: Tree::new(policy.profile.root_tag.clone()),
        paths,
        profile: policy.profile,
        diagnostics: Vec::new(),
    };

    let mut pending = m.prepare(values, policy.enforce_mandatory_fields);
    if let Some(rule) = &policy.profile.order_reference {
        m.place_order_references(rule, &mut pending);
    }
    m.place_repeated_groups(&mut pending);
    m.place_singletons(pending);
    if policy.enforce_mandatory_fields {
        m.ensure_sections();
    }
    m.finish()
}

struct Materializer<'a> {
    tree: Tree,
    paths: &'a IdPathTable,
    profile: &'a SchemaProfile,
    diagnostics: Vec<Diagnostic>,
}

impl Materializer<'_> {
    fn path(&self, id: &SchemaId) -> Option<&[String]> {
        self.paths.path(id).filter(|p| !p.is_empty())
    }

    fn prepare(&mut self, values: &ValueList, enforce: bool) -> Pending {
        let mut pending = Pending::new();
        for (id, entries) in values.iter() {
            if self.path(id).is_none() {
                self.diagnostics.push(Diagnostic::EmptyPath { id: id.to_string() });
                continue;
            }
            let normalized: Vec<String> = entries.iter().map(|e| normalize_text(e)).collect();
            if normalized.iter().any(|e| !e.is_empty()) {
                pending.insert(id.clone(), normalized);
            }
        }

        if enforce {
            for (id, value) in &self.profile.mandatory_defaults {
                if pending.contains_key(id) || self.path(id).is_none() {
                    continue;
                }
                self.diagnostics.push(Diagnostic::DefaultApplied {
                    id: id.to_string(),
                    value: value.clone(),
                });
                pending.insert(id.clone(), vec![value.clone()]);
            }
        }
        pending
    }

    /// Container path for an element at `id` whose own ancestors are not
    /// annotated.
    fn section_for(&self, id: &SchemaId) -> Vec<String> {
        id.parent()
            .and_then(|parent| self.profile.section_fallback(&parent))
            .map(<[String]>::to_vec)
            .unwrap_or_default()
    }

    fn place_order_references(&mut self, rule: &OrderReferenceRule, pending: &mut Pending) {
        let references = pending.get(&rule.reference).cloned().unwrap_or_default();
        let documents = pending.get(&rule.document).cloned().unwrap_or_default();
        if !has_value(&references) || !has_value(&documents) {
            return;
        }
        let (Some(reference_tag), Some(document_tag)) = (
            self.paths.leaf_tag(&rule.reference).map(str::to_string),
            self.paths.leaf_tag(&rule.document).map(str::to_string),
        ) else {
            return;
        };
        let Some(group_tag) = self
            .path(&rule.family)
            .and_then(|p| p.last().cloned())
            .or_else(|| self.profile.group_fallback(&rule.family).map(str::to_string))
        else {
            self.diagnostics.push(Diagnostic::UnplaceableGroup {
                prefix: rule.family.to_string(),
            });
            return;
        };

        let parent_path = rule
            .family
            .parent()
            .and_then(|p| self.path(&p).map(<[String]>::to_vec))
            .unwrap_or_else(|| self.section_for(&rule.family));

        let family: Vec<SchemaId> = pending
            .keys()
            .filter(|id| id.is_descendant_of(&rule.family))
            .cloned()
            .collect();
        let broadcast: Vec<(String, String)> = family
            .iter()
            .filter(|id| **id != rule.reference && **id != rule.document)
            .filter_map(|id| {
                let tag = self.paths.leaf_tag(id)?;
                let first = pending.get(id)?.first().filter(|v| !v.is_empty())?;
                Some((tag.to_string(), first.clone()))
            })
            .collect();

        let groups = zip_references(&references, &documents);
        tracing::trace!(
            family = %rule.family,
            groups = groups.len(),
            "order references grouped"
        );

        let root = self.tree.root();
        for (document, refs) in groups {
            let parent = self.tree.find_or_create_path(root, &parent_path);
            let group = self.tree.append_child(parent, group_tag.as_str());
            for r in refs {
                self.tree.append_leaf(group, reference_tag.as_str(), r);
            }
            self.tree.append_leaf(group, document_tag.as_str(), document);
            for (tag, value) in &broadcast {
                self.tree.append_leaf(group, tag.as_str(), value.as_str());
            }
        }

        for id in family {
            pending.remove(&id);
        }
    }

    fn place_repeated_groups(&mut self, pending: &mut Pending) {
        let mut buckets: BTreeMap<SchemaId, Vec<SchemaId>> = BTreeMap::new();
        for id in pending.keys() {
            // Top-level IDs are their own bucket and are always singletons.
            if let Some(prefix) = id.parent() {
                buckets.entry(prefix).or_default().push(id.clone());
            }
        }

        for (prefix, ids) in buckets {
            let max_len = ids
                .iter()
                .filter_map(|id| pending.get(id))
                .map(Vec::len)
                .max()
                .unwrap_or(0);
            if max_len <= 1 {
                continue;
            }
            let Some((parent_path, group_tag)) = self.group_placement(&prefix, &ids) else {
                self.diagnostics.push(Diagnostic::UnplaceableGroup {
                    prefix: prefix.to_string(),
                });
                continue;
            };

            let members: Vec<(String, Vec<String>)> = ids
                .iter()
                .filter_map(|id| {
                    let tag = self.paths.leaf_tag(id)?.to_string();
                    Some((tag, pending.remove(id)?))
                })
                .collect();

            let root = self.tree.root();
            for i in 0..max_len {
                let parent = self.tree.find_or_create_path(root, &parent_path);
                let group = self.tree.append_child(parent, group_tag.as_str());
                for (tag, entries) in &members {
                    if let Some(value) = entries.get(i).filter(|v| !v.is_empty()) {
                        self.tree.append_leaf(group, tag.as_str(), value.as_str());
                    }
                }
            }
            tracing::trace!(prefix = %prefix, occurrences = max_len, "repeated group");
        }
    }

    /// Parent path and element tag of the repeated group at `prefix`.
    fn group_placement(&self, prefix: &SchemaId, ids: &[SchemaId]) -> Option<(Vec<String>, String)> {
        if let Some(path) = self.path(prefix) {
            let (tag, parent) = path.split_last()?;
            let parent = if parent.is_empty() {
                self.section_for(prefix)
            } else {
                parent.to_vec()
            };
            return Some((parent, tag.clone()));
        }

        let sample = ids.first().and_then(|id| self.path(id)).unwrap_or_default();
        let sample_parent = &sample[..sample.len().saturating_sub(1)];

        if let Some(tag) = self.profile.group_fallback(prefix) {
            let parent = if sample_parent.is_empty() {
                self.section_for(prefix)
            } else {
                sample_parent.to_vec()
            };
            return Some((parent, tag.to_string()));
        }

        let (tag, parent) = sample_parent.split_last()?;
        Some((parent.to_vec(), tag.clone()))
    }

    fn place_singletons(&mut self, pending: Pending) {
        let root = self.tree.root();
        for (id, entries) in pending {
            let Some(path) = self.path(&id) else {
                continue;
            };
            let Some((leaf, parent)) = path.split_last() else {
                continue;
            };
            let leaf = leaf.clone();
            let parent_path = if parent.is_empty() && id.depth() > 1 {
                self.section_for(&id)
            } else {
                parent.to_vec()
            };

            let parent = self.tree.find_or_create_path(root, &parent_path);
            for value in entries.into_iter().filter(|v| !v.is_empty()) {
                self.tree.append_leaf(parent, leaf.as_str(), value);
            }
        }
    }

    fn ensure_sections(&mut self) {
        let root = self.tree.root();
        self.tree
            .find_or_create_path(root, &[self.profile.header_tag.as_str()]);
        self.tree
            .find_or_create_path(root, &[self.profile.body_tag.as_str()]);
    }

    fn finish(mut self) -> (Tree, Vec<Diagnostic>) {
        let profile = self.profile;
        let root = self.tree.root();

        if !profile.namespace.is_empty() {
            self.tree.set_attribute(root, "xmlns", profile.namespace.as_str());
        }
        if !profile.version.is_empty() {
            self.tree.set_attribute(root, "versione", profile.version.as_str());
        }

        self.tree.reorder_children(
            root,
            &[
                profile.header_tag.as_str(),
                profile.body_tag.as_str(),
                profile.signature_tag.as_str(),
            ],
        );

        for general in self
            .tree
            .select(&[profile.body_tag.as_str(), profile.general_data_tag.as_str()])
        {
            if let Some(header) = self
                .tree
                .find_child(general, profile.document_header_tag.as_str())
            {
                self.tree.move_to_front(general, header);
            }
        }

        for d in &self.diagnostics {
            tracing::trace!(diagnostic = %d, "materialize");
        }
        (self.tree, self.diagnostics)
    }
}

fn has_value(values: &[String]) -> bool {
    values.iter().any(|v| !v.is_empty())
}

/// Assign references to documents.
///
/// Both lists are positional, blanks included. Equal lengths zip pairwise.
/// With more references than documents, two documents take the first
/// reference and the rest respectively, a single document takes them all.
/// Anything else truncates to the shorter list. Pairs with a blank document
/// are dropped and a blank reference leaves its document without one. The
/// result is keyed by document value in first-seen order.
pub(crate) fn zip_references(references: &[String], documents: &[String]) -> Vec<(String, Vec<String>)> {
    let pairs: Vec<(&String, &String)> = match (references.len(), documents.len()) {
        (r, d) if r == d => references.iter().zip(documents).collect(),
        (r, 2) if r > 2 => {
            let mut pairs = vec![(&references[0], &documents[0])];
            pairs.extend(references[1..].iter().map(|reference| (reference, &documents[1])));
            pairs
        }
        (r, 1) if r > 1 => references.iter().map(|reference| (reference, &documents[0])).collect(),
        _ => references.iter().zip(documents).collect(),
    };

    let mut groups: Vec<(String, Vec<String>)> = Vec::new();
    for (reference, document) in pairs.into_iter().filter(|(_, d)| !d.is_empty()) {
        let index = match groups.iter().position(|(d, _)| d == document) {
            Some(index) => index,
            None => {
                groups.push((document.clone(), Vec::new()));
                groups.len() - 1
            }
        };
        if !reference.is_empty() {
            groups[index].1.push(reference.clone());
        }
    }
    groups
}
