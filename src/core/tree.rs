//! Arena-backed element tree.
//!
//! Nodes live in a flat `Vec` and refer to their children by [`NodeId`].
//! Reordering only permutes child lists; nodes are never freed while the
//! tree is alive.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use super::error::CodecError;

/// Index of a node inside its [`Tree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// One element: qualified name, attributes, children and direct text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<NodeId>,
    pub text: Option<String>,
}

impl Node {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
            text: None,
        }
    }

    /// Name without namespace prefix.
    pub fn local_name(&self) -> &str {
        local_name(&self.name)
    }
}

/// Strip a `prefix:` or `{uri}` qualifier from an element name.
pub fn local_name(name: &str) -> &str {
    let name = name.rsplit_once('}').map_or(name, |(_, local)| local);
    name.rsplit_once(':').map_or(name, |(_, local)| local)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    /// New tree containing only a root element.
    pub fn new(root_name: impl Into<String>) -> Self {
        Self {
            nodes: vec![Node::new(root_name)],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    /// Number of nodes, root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    /// Append a new element under `parent`.
    pub fn append_child(&mut self, parent: NodeId, name: impl Into<String>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::new(name));
        self.node_mut(parent).children.push(id);
        id
    }

    /// Append a text-only element under `parent`.
    pub fn append_leaf(
        &mut self,
        parent: NodeId,
        name: impl Into<String>,
        text: impl Into<String>,
    ) -> NodeId {
        let id = self.append_child(parent, name);
        self.node_mut(id).text = Some(text.into());
        id
    }

    pub fn set_text(&mut self, id: NodeId, text: impl Into<String>) {
        self.node_mut(id).text = Some(text.into());
    }

    /// Set or replace an attribute, keeping first-insertion order.
    pub fn set_attribute(&mut self, id: NodeId, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        let attrs = &mut self.node_mut(id).attributes;
        if let Some(slot) = attrs.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
        } else {
            attrs.push((key, value));
        }
    }

    /// First child of `parent` whose local name is `name`.
    pub fn find_child(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        self.children(parent)
            .iter()
            .copied()
            .find(|&c| self.node(c).local_name() == local_name(name))
    }

    /// Walk `path` from `start`, reusing the first matching child at each
    /// step and creating it when absent. Returns the last node.
    pub fn find_or_create_path<S: AsRef<str>>(&mut self, start: NodeId, path: &[S]) -> NodeId {
        let mut current = start;
        for tag in path {
            let tag = tag.as_ref();
            current = match self.find_child(current, tag) {
                Some(existing) => existing,
                None => self.append_child(current, tag),
            };
        }
        current
    }

    /// All nodes reached by following `path` from the root, matching every
    /// child with the segment's local name at each step.
    pub fn select<S: AsRef<str>>(&self, path: &[S]) -> Vec<NodeId> {
        let mut nodes = vec![self.root()];
        for tag in path {
            let tag = local_name(tag.as_ref());
            nodes = nodes
                .iter()
                .flat_map(|&n| self.children(n).iter().copied())
                .filter(|&c| self.node(c).local_name() == tag)
                .collect();
            if nodes.is_empty() {
                break;
            }
        }
        nodes
    }

    /// Move `child` to the front of `parent`'s children.
    /// Returns `false` when `child` is not a child of `parent`.
    pub fn move_to_front(&mut self, parent: NodeId, child: NodeId) -> bool {
        let children = &mut self.node_mut(parent).children;
        match children.iter().position(|&c| c == child) {
            Some(0) => true,
            Some(pos) => {
                let node = children.remove(pos);
                children.insert(0, node);
                true
            }
            None => false,
        }
    }

    /// Stable reorder: children named in `order` come first, in that order,
    /// followed by all others in their current order.
    pub fn reorder_children(&mut self, parent: NodeId, order: &[&str]) {
        let current = self.children(parent).to_vec();
        let rank = |id: NodeId| {
            let name = self.node(id).local_name();
            order.iter().position(|o| local_name(o) == name).unwrap_or(order.len())
        };
        let mut ranked: Vec<(usize, NodeId)> = current.iter().map(|&c| (rank(c), c)).collect();
        ranked.sort_by_key(|(r, _)| *r);
        self.node_mut(parent).children = ranked.into_iter().map(|(_, c)| c).collect();
    }
}

/// Parse an XML document into a [`Tree`].
///
/// Whitespace-only text is dropped; text and CDATA inside one element are
/// concatenated and trimmed. Comments and processing instructions are
/// ignored.
pub fn parse_xml(xml: &str) -> Result<Tree, CodecError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut tree: Option<Tree> = None;
    let mut stack: Vec<NodeId> = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                let id = open_element(&mut tree, &stack, e)?;
                stack.push(id);
            }
            Ok(Event::Empty(ref e)) => {
                open_element(&mut tree, &stack, e)?;
            }
            Ok(Event::End(_)) => {
                stack.pop();
            }
            Ok(Event::Text(ref e)) => {
                let text = e
                    .unescape()
                    .map_err(|e| CodecError::Xml(format!("XML text error: {e}")))?;
                append_text(&mut tree, &stack, &text);
            }
            Ok(Event::CData(ref e)) => {
                let text = String::from_utf8_lossy(e).into_owned();
                append_text(&mut tree, &stack, &text);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(CodecError::Xml(format!(
                    "XML parse error at position {}: {e}",
                    reader.error_position()
                )));
            }
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(CodecError::Xml("unexpected end of document".into()));
    }
    tree.ok_or_else(|| CodecError::Xml("document has no root element".into()))
}

fn open_element(
    tree: &mut Option<Tree>,
    stack: &[NodeId],
    e: &BytesStart<'_>,
) -> Result<NodeId, CodecError> {
    let name = std::str::from_utf8(e.name().as_ref())
        .map_err(|e| CodecError::Xml(format!("element name is not UTF-8: {e}")))?
        .to_string();

    let id = match (tree.as_mut(), stack.last()) {
        (None, _) => {
            *tree = Some(Tree::new(name));
            NodeId(0)
        }
        (Some(t), Some(&parent)) => t.append_child(parent, name),
        (Some(_), None) => {
            return Err(CodecError::Xml(format!(
                "second root element <{name}>"
            )));
        }
    };

    if let Some(t) = tree.as_mut() {
        for attr in e.attributes() {
            let attr = attr.map_err(|e| CodecError::Xml(format!("attribute error: {e}")))?;
            let key = std::str::from_utf8(attr.key.as_ref())
                .map_err(|e| CodecError::Xml(format!("attribute name is not UTF-8: {e}")))?
                .to_string();
            let value = attr
                .unescape_value()
                .map_err(|e| CodecError::Xml(format!("attribute value error: {e}")))?;
            t.set_attribute(id, key, value.into_owned());
        }
    }
    Ok(id)
}

fn append_text(tree: &mut Option<Tree>, stack: &[NodeId], text: &str) {
    let (Some(t), Some(&current)) = (tree.as_mut(), stack.last()) else {
        return;
    };
    let text = text.trim();
    if text.is_empty() {
        return;
    }
    let merged = match t.node(current).text.as_deref() {
        Some(existing) => format!("{existing}{text}"),
        None => text.to_string(),
    };
    t.set_text(current, merged);
}
