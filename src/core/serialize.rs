//! Tree-to-XML rendering.

use std::io::Cursor;

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use super::error::CodecError;
use super::options::{CodecOptions, NamespaceMode};
use super::tree::{NodeId, Tree, local_name};

/// Settings for [`serialize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializeOptions {
    pub namespace_mode: NamespaceMode,
    pub include_xml_declaration: bool,
    /// Top-level sections that receive `xmlns=""` in
    /// [`NamespaceMode::ResetSections`].
    pub section_tags: Vec<String>,
}

impl Default for SerializeOptions {
    fn default() -> Self {
        Self::from_options(&CodecOptions::default())
    }
}

impl SerializeOptions {
    pub fn from_options(options: &CodecOptions) -> Self {
        Self {
            namespace_mode: options.namespace_mode,
            include_xml_declaration: options.include_xml_declaration,
            section_tags: vec![
                options.profile.header_tag.clone(),
                options.profile.body_tag.clone(),
            ],
        }
    }
}

fn xml_io(e: impl std::fmt::Display) -> CodecError {
    CodecError::Xml(format!("XML write error: {e}"))
}

/// Indenting writer over an in-memory buffer.
struct XmlWriter {
    writer: Writer<Cursor<Vec<u8>>>,
}

impl XmlWriter {
    fn new(declaration: bool) -> Result<Self, CodecError> {
        let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
        if declaration {
            writer
                .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
                .map_err(xml_io)?;
        }
        Ok(Self { writer })
    }

    fn into_string(self) -> Result<String, CodecError> {
        let buf = self.writer.into_inner().into_inner();
        String::from_utf8(buf).map_err(|e| CodecError::Xml(format!("XML UTF-8 error: {e}")))
    }

    fn start(&mut self, name: &str, attrs: &[(&str, &str)], empty: bool) -> Result<(), CodecError> {
        let mut elem = BytesStart::new(name);
        for (k, v) in attrs {
            elem.push_attribute((*k, *v));
        }
        let event = if empty { Event::Empty(elem) } else { Event::Start(elem) };
        self.writer.write_event(event).map_err(xml_io)?;
        Ok(())
    }

    fn text(&mut self, text: &str) -> Result<(), CodecError> {
        self.writer
            .write_event(Event::Text(BytesText::new(text)))
            .map_err(xml_io)?;
        Ok(())
    }

    fn end(&mut self, name: &str) -> Result<(), CodecError> {
        self.writer
            .write_event(Event::End(BytesEnd::new(name)))
            .map_err(xml_io)?;
        Ok(())
    }
}

/// Render `tree` as pretty-printed XML (2-space indent).
///
/// Leaves stay on one line, elements with neither children nor text are
/// self-closed. Output is byte-identical for identical trees.
pub fn serialize(tree: &Tree, options: &SerializeOptions) -> Result<String, CodecError> {
    let mut w = XmlWriter::new(options.include_xml_declaration)?;
    write_node(&mut w, tree, tree.root(), options, 0)?;
    w.into_string()
}

fn write_node(
    w: &mut XmlWriter,
    tree: &Tree,
    id: NodeId,
    options: &SerializeOptions,
    depth: usize,
) -> Result<(), CodecError> {
    let node = tree.node(id);
    let mut attrs: Vec<(&str, &str)> = node
        .attributes
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();

    let resets_namespace = depth == 1
        && options.namespace_mode == NamespaceMode::ResetSections
        && options
            .section_tags
            .iter()
            .any(|t| local_name(t) == node.local_name())
        && !attrs.iter().any(|(k, _)| *k == "xmlns");
    if resets_namespace {
        attrs.push(("xmlns", ""));
    }

    let text = node.text.as_deref().filter(|t| !t.is_empty());
    if node.children.is_empty() && text.is_none() {
        return w.start(&node.name, &attrs, true);
    }

    w.start(&node.name, &attrs, false)?;
    if let Some(text) = text {
        w.text(text)?;
    }
    for &child in &node.children {
        write_node(w, tree, child, options, depth + 1)?;
    }
    w.end(&node.name)
}
