//! Arena-backed XML document tree.
//!
//! Documents are parsed with `quick-xml` into a flat arena of nodes with
//! parent links, which makes ancestor walks (needed by the extractor) and
//! cross-document subtree copies cheap. Serialization follows libxml2's
//! "format" output: two-space indentation for element-only content, inline
//! output for anything that contains text, and `<tag/>` for empty elements.

use crate::error::{XmlError, XmlResult};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::BTreeSet;

/// Identifier of a node inside one [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl NodeId {
    /// Returns the arena index of this node.
    pub fn index(self) -> usize {
        self.0
    }
}

/// An element's tag and attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Qualified tag name as written in the source.
    pub name: String,
    /// Attributes in source order.
    pub attributes: Vec<(String, String)>,
}

impl Element {
    /// Creates an element without attributes.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
        }
    }

    /// Adds an attribute.
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    /// Looks up an attribute value by name.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Returns true if both elements have the same tag and the same
    /// attribute set, ignoring attribute order.
    pub fn same_identity(&self, other: &Element) -> bool {
        if self.name != other.name || self.attributes.len() != other.attributes.len() {
            return false;
        }
        let ours: BTreeSet<_> = self.attributes.iter().collect();
        let theirs: BTreeSet<_> = other.attributes.iter().collect();
        ours == theirs
    }
}

/// The payload of a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// An element.
    Element(Element),
    /// Character data (CDATA sections are folded into text).
    Text(String),
    /// A comment.
    Comment(String),
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// An XML document with exactly one root element.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Document {
    /// Creates a document containing only the given root element.
    pub fn with_root(root: Element) -> Self {
        Self {
            nodes: vec![Node {
                kind: NodeKind::Element(root),
                parent: None,
                children: Vec::new(),
            }],
            root: NodeId(0),
        }
    }

    /// Parses a document.
    ///
    /// Whitespace-only text between elements is discarded. Whitespace-only
    /// text that is the only content of an element is kept. The XML
    /// declaration, processing instructions, the doctype and comments
    /// outside the root element are dropped.
    pub fn parse(input: &str) -> XmlResult<Self> {
        let mut reader = Reader::from_str(input);
        reader.trim_text(false);
        reader.check_end_names(true);

        let mut nodes: Vec<Node> = Vec::new();
        let mut root: Option<NodeId> = None;
        let mut stack: Vec<NodeId> = Vec::new();

        loop {
            let position = reader.buffer_position();
            let event = reader
                .read_event()
                .map_err(|e| XmlError::parse(position, e.to_string()))?;

            match event {
                Event::Start(start) => {
                    let element = element_from_start(&start, position)?;
                    let id = open_element(&mut nodes, &mut root, &stack, element, position)?;
                    stack.push(id);
                }
                Event::Empty(start) => {
                    let element = element_from_start(&start, position)?;
                    open_element(&mut nodes, &mut root, &stack, element, position)?;
                }
                Event::End(_) => {
                    let Some(id) = stack.pop() else {
                        return Err(XmlError::parse(position, "unexpected closing tag"));
                    };
                    drop_ignorable_whitespace(&mut nodes, id);
                }
                Event::Text(text) => {
                    let text = text
                        .unescape()
                        .map_err(|e| XmlError::parse(position, e.to_string()))?;
                    append_text(&mut nodes, &stack, &text, position)?;
                }
                Event::CData(data) => {
                    let text = std::str::from_utf8(&data)
                        .map_err(|e| XmlError::parse(position, e.to_string()))?;
                    append_text(&mut nodes, &stack, text, position)?;
                }
                Event::Comment(comment) => {
                    if let Some(&parent) = stack.last() {
                        let text = std::str::from_utf8(&comment)
                            .map_err(|e| XmlError::parse(position, e.to_string()))?;
                        push_node(&mut nodes, Some(parent), NodeKind::Comment(text.to_string()));
                    }
                }
                Event::Decl(_) | Event::PI(_) | Event::DocType(_) => {}
                Event::Eof => break,
            }
        }

        if let Some(&open) = stack.last() {
            let name = match &nodes[open.0].kind {
                NodeKind::Element(element) => element.name.clone(),
                _ => String::new(),
            };
            return Err(XmlError::parse(
                input.len(),
                format!("unclosed element <{}>", name),
            ));
        }

        let root = root.ok_or(XmlError::NoRootElement)?;
        Ok(Self { nodes, root })
    }

    /// Returns the root element.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Returns the root element's data.
    pub fn root_element(&self) -> &Element {
        match &self.nodes[self.root.0].kind {
            NodeKind::Element(element) => element,
            _ => unreachable!("document root is always an element"),
        }
    }

    /// Returns the payload of a node.
    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    /// Returns the element data if the node is an element.
    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match &self.nodes[id.0].kind {
            NodeKind::Element(element) => Some(element),
            _ => None,
        }
    }

    /// Returns the parent of a node, `None` for the root.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    /// Returns the children of a node in document order.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Returns the element children of a node.
    pub fn child_elements(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id)
            .iter()
            .copied()
            .filter(move |&child| self.element(child).is_some())
    }

    /// Returns the ancestors of a node, nearest first.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut current = self.parent(id);
        while let Some(node) = current {
            result.push(node);
            current = self.parent(node);
        }
        result
    }

    /// Returns all descendants of a node in document order, excluding it.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut pending: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(node) = pending.pop() {
            result.push(node);
            pending.extend(self.children(node).iter().rev().copied());
        }
        result
    }

    /// Returns every node reachable from the root in document order.
    pub fn preorder(&self) -> Vec<NodeId> {
        let mut result = vec![self.root];
        result.extend(self.descendants(self.root));
        result
    }

    /// Concatenated text of all descendant text nodes.
    pub fn string_value(&self, id: NodeId) -> String {
        match self.kind(id) {
            NodeKind::Text(text) | NodeKind::Comment(text) => text.clone(),
            NodeKind::Element(_) => self
                .descendants(id)
                .into_iter()
                .filter_map(|node| match self.kind(node) {
                    NodeKind::Text(text) => Some(text.as_str()),
                    _ => None,
                })
                .collect(),
        }
    }

    /// Concatenated text of the direct text children of a node.
    pub fn direct_text(&self, id: NodeId) -> String {
        self.children(id)
            .iter()
            .filter_map(|&child| match self.kind(child) {
                NodeKind::Text(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Appends a childless element under `parent`.
    pub fn append_element(&mut self, parent: NodeId, element: Element) -> NodeId {
        push_node(&mut self.nodes, Some(parent), NodeKind::Element(element))
    }

    /// Deep-copies `source_id` from `source` under `parent`.
    pub fn import_subtree(&mut self, parent: NodeId, source: &Document, source_id: NodeId) -> NodeId {
        let copy = push_node(
            &mut self.nodes,
            Some(parent),
            source.kind(source_id).clone(),
        );
        for &child in source.children(source_id) {
            self.import_subtree(copy, source, child);
        }
        copy
    }

    /// Removes the children of `id` for which `keep` returns false.
    ///
    /// Removed nodes stay in the arena but become unreachable.
    pub fn retain_children(&mut self, id: NodeId, mut keep: impl FnMut(&NodeKind) -> bool) {
        let children = std::mem::take(&mut self.nodes[id.0].children);
        let kept = children
            .into_iter()
            .filter(|child| keep(&self.nodes[child.0].kind))
            .collect();
        self.nodes[id.0].children = kept;
    }

    /// Serializes the whole document, pretty-printed, with a trailing newline.
    pub fn to_pretty_string(&self) -> String {
        let mut out = String::new();
        self.write_node(self.root, 0, true, &mut out);
        out
    }

    fn write_node(&self, id: NodeId, depth: usize, format: bool, out: &mut String) {
        match self.kind(id) {
            NodeKind::Element(element) => {
                if format {
                    indent(out, depth);
                }
                out.push('<');
                out.push_str(&element.name);
                for (key, value) in &element.attributes {
                    out.push(' ');
                    out.push_str(key);
                    out.push_str("=\"");
                    escape_attribute(value, out);
                    out.push('"');
                }

                let children = self.children(id);
                if children.is_empty() {
                    out.push_str("/>");
                } else {
                    out.push('>');
                    let child_format = format
                        && children
                            .iter()
                            .all(|&child| !matches!(self.kind(child), NodeKind::Text(_)));
                    if child_format {
                        out.push('\n');
                    }
                    for &child in children {
                        self.write_node(child, depth + 1, child_format, out);
                    }
                    if child_format {
                        indent(out, depth);
                    }
                    out.push_str("</");
                    out.push_str(&element.name);
                    out.push('>');
                }

                if format {
                    out.push('\n');
                }
            }
            NodeKind::Text(text) => escape_text(text, out),
            NodeKind::Comment(text) => {
                if format {
                    indent(out, depth);
                }
                out.push_str("<!--");
                out.push_str(text);
                out.push_str("-->");
                if format {
                    out.push('\n');
                }
            }
        }
    }
}

fn push_node(nodes: &mut Vec<Node>, parent: Option<NodeId>, kind: NodeKind) -> NodeId {
    let id = NodeId(nodes.len());
    nodes.push(Node {
        kind,
        parent,
        children: Vec::new(),
    });
    if let Some(parent) = parent {
        nodes[parent.0].children.push(id);
    }
    id
}

fn open_element(
    nodes: &mut Vec<Node>,
    root: &mut Option<NodeId>,
    stack: &[NodeId],
    element: Element,
    position: usize,
) -> XmlResult<NodeId> {
    match stack.last() {
        Some(&parent) => Ok(push_node(nodes, Some(parent), NodeKind::Element(element))),
        None if root.is_some() => Err(XmlError::parse(
            position,
            format!("extra content at the end of the document: <{}>", element.name),
        )),
        None => {
            let id = push_node(nodes, None, NodeKind::Element(element));
            *root = Some(id);
            Ok(id)
        }
    }
}

fn append_text(nodes: &mut Vec<Node>, stack: &[NodeId], text: &str, position: usize) -> XmlResult<()> {
    let Some(&parent) = stack.last() else {
        if text.trim().is_empty() {
            return Ok(());
        }
        return Err(XmlError::parse(position, "text outside of the root element"));
    };

    if let Some(&last) = nodes[parent.0].children.last() {
        if let NodeKind::Text(existing) = &mut nodes[last.0].kind {
            existing.push_str(text);
            return Ok(());
        }
    }
    push_node(nodes, Some(parent), NodeKind::Text(text.to_string()));
    Ok(())
}

/// Drops whitespace-only text children of an element that also has
/// element or comment children.
fn drop_ignorable_whitespace(nodes: &mut [Node], id: NodeId) {
    let has_structure = nodes[id.0]
        .children
        .iter()
        .any(|child| !matches!(nodes[child.0].kind, NodeKind::Text(_)));
    if !has_structure {
        return;
    }
    let children = std::mem::take(&mut nodes[id.0].children);
    nodes[id.0].children = children
        .into_iter()
        .filter(|child| match &nodes[child.0].kind {
            NodeKind::Text(text) => !text.trim().is_empty(),
            _ => true,
        })
        .collect();
}

fn element_from_start(start: &BytesStart<'_>, position: usize) -> XmlResult<Element> {
    let name = std::str::from_utf8(start.name().as_ref())
        .map_err(|e| XmlError::parse(position, e.to_string()))?
        .to_string();

    let mut attributes = Vec::new();
    for attribute in start.attributes() {
        let attribute = attribute.map_err(|e| XmlError::parse(position, e.to_string()))?;
        let key = std::str::from_utf8(attribute.key.as_ref())
            .map_err(|e| XmlError::parse(position, e.to_string()))?
            .to_string();
        let value = attribute
            .unescape_value()
            .map_err(|e| XmlError::parse(position, e.to_string()))?
            .into_owned();
        attributes.push((key, value));
    }

    Ok(Element { name, attributes })
}

fn indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str("  ");
    }
}

fn escape_text(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\r' => out.push_str("&#13;"),
            _ => out.push(c),
        }
    }
}

fn escape_attribute(value: &str, out: &mut String) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\n' => out.push_str("&#10;"),
            '\r' => out.push_str("&#13;"),
            '\t' => out.push_str("&#9;"),
            _ => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_pretty_print() {
        let doc = Document::parse("<a><b x=\"1\">text</b><c/></a>").unwrap();
        assert_eq!(
            doc.to_pretty_string(),
            "<a>\n  <b x=\"1\">text</b>\n  <c/>\n</a>\n"
        );
    }

    #[test]
    fn blank_text_between_elements_is_dropped() {
        let doc = Document::parse("<a>\n   <b/>\n   <c> </c>\n</a>").unwrap();
        let root = doc.root();
        assert_eq!(doc.children(root).len(), 2);

        // Whitespace that is the sole content of a leaf survives parsing.
        let c = doc.children(root)[1];
        assert_eq!(doc.direct_text(c), " ");
    }

    #[test]
    fn mixed_content_is_written_inline() {
        let doc = Document::parse("<a>hello <b>world</b></a>").unwrap();
        assert_eq!(doc.to_pretty_string(), "<a>hello <b>world</b></a>\n");
    }

    #[test]
    fn declaration_and_outer_comments_are_dropped() {
        let doc = Document::parse("<?xml version='1.0'?><!-- top --><a><!-- in --></a>").unwrap();
        assert_eq!(doc.to_pretty_string(), "<a>\n  <!-- in -->\n</a>\n");
    }

    #[test]
    fn entities_are_unescaped_and_escaped_again() {
        let doc = Document::parse("<a q=\"&quot;x&quot;\">1 &lt; 2 &amp; 3</a>").unwrap();
        let root = doc.root();
        assert_eq!(doc.root_element().attribute("q"), Some("\"x\""));
        assert_eq!(doc.direct_text(root), "1 < 2 & 3");
        assert_eq!(
            doc.to_pretty_string(),
            "<a q=\"&quot;x&quot;\">1 &lt; 2 &amp; 3</a>\n"
        );
    }

    #[test]
    fn cdata_becomes_text() {
        let doc = Document::parse("<a><![CDATA[<raw>]]></a>").unwrap();
        assert_eq!(doc.to_pretty_string(), "<a>&lt;raw&gt;</a>\n");
    }

    #[test]
    fn malformed_documents_are_rejected() {
        assert!(Document::parse("<a><b></a>").is_err());
        assert!(Document::parse("<a>").is_err());
        assert!(Document::parse("<a/><b/>").is_err());
        assert!(Document::parse("just text").is_err());
        assert!(matches!(Document::parse(""), Err(XmlError::NoRootElement)));
    }

    #[test]
    fn same_identity_ignores_attribute_order() {
        let a = Element::new("entry")
            .with_attribute("name", "x")
            .with_attribute("id", "1");
        let b = Element::new("entry")
            .with_attribute("id", "1")
            .with_attribute("name", "x");
        let c = Element::new("entry").with_attribute("name", "x");
        assert!(a.same_identity(&b));
        assert!(!a.same_identity(&c));
    }

    #[test]
    fn import_subtree_copies_deeply() {
        let source = Document::parse("<r><x a=\"1\"><y>t</y></x></r>").unwrap();
        let x = source.child_elements(source.root()).next().unwrap();

        let mut target = Document::with_root(Element::new("r"));
        let root = target.root();
        target.import_subtree(root, &source, x);
        assert_eq!(
            target.to_pretty_string(),
            "<r>\n  <x a=\"1\">\n    <y>t</y>\n  </x>\n</r>\n"
        );
    }

    #[test]
    fn ancestors_and_string_value() {
        let doc = Document::parse("<r><a><b>one</b><c>two</c></a></r>").unwrap();
        let a = doc.child_elements(doc.root()).next().unwrap();
        let b = doc.child_elements(a).next().unwrap();
        assert_eq!(doc.ancestors(b), vec![a, doc.root()]);
        assert_eq!(doc.string_value(a), "onetwo");
    }
}
