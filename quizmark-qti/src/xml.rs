//! Typed XML element tree
//!
//!     Items, manifests and assessments are assembled as [Element] trees and rendered in one
//!     place, so escaping happens exactly once: text nodes and attribute values are escaped by
//!     the renderer, never by the code that builds the tree. Rendered output is then checked
//!     with [check_well_formed] before it leaves the crate.
//!
//!     Rendering goes through `quick_xml::Writer`. Output is indented, except inside elements
//!     with text children, where whitespace would change the content.

use quick_xml::escape::{escape, partial_escape};
use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::name::QName;
use quick_xml::{Reader, Writer};
use std::borrow::Cow;
use thiserror::Error;

pub const DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>";

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
    Comment(String),
}

impl From<Element> for Node {
    fn from(element: Element) -> Self {
        Node::Element(element)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<Node>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Set an attribute, replacing an earlier value of the same name.
    pub fn attr(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.set_attr(name, value);
        self
    }

    pub fn opt_attr<V: ToString>(self, name: impl Into<String>, value: Option<V>) -> Self {
        match value {
            Some(value) => self.attr(name, value),
            None => self,
        }
    }

    pub fn set_attr(&mut self, name: impl Into<String>, value: impl ToString) {
        let name = name.into();
        let value = value.to_string();
        match self.attributes.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((name, value)),
        }
    }

    pub fn child(mut self, child: Element) -> Self {
        self.children.push(Node::Element(child));
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = Element>) -> Self {
        self.children
            .extend(children.into_iter().map(Node::Element));
        self
    }

    pub fn nodes(mut self, nodes: impl IntoIterator<Item = Node>) -> Self {
        self.children.extend(nodes);
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.children.push(Node::Text(text.into()));
        self
    }

    pub fn comment(mut self, text: impl Into<String>) -> Self {
        self.children.push(Node::Comment(text.into()));
        self
    }

    pub fn push(&mut self, node: impl Into<Node>) {
        self.children.push(node.into());
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn child_nodes(&self) -> &[Node] {
        &self.children
    }

    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(e) => Some(e),
            _ => None,
        })
    }

    /// First descendant (or self) named `name`, depth first.
    pub fn find(&self, name: &str) -> Option<&Element> {
        if self.name == name {
            return Some(self);
        }
        self.elements().find_map(|e| e.find(name))
    }

    /// Every descendant (and self) named `name`, in document order.
    pub fn find_all<'a>(&'a self, name: &str) -> Vec<&'a Element> {
        let mut found = Vec::new();
        self.collect(name, &mut found);
        found
    }

    fn collect<'a>(&'a self, name: &str, found: &mut Vec<&'a Element>) {
        if self.name == name {
            found.push(self);
        }
        for child in self.elements() {
            child.collect(name, found);
        }
    }

    /// Concatenated text of all descendants.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        for node in &self.children {
            match node {
                Node::Text(text) => out.push_str(text),
                Node::Element(e) => out.push_str(&e.text_content()),
                Node::Comment(_) => {}
            }
        }
        out
    }

    fn has_text(&self) -> bool {
        self.children.iter().any(|n| matches!(n, Node::Text(_)))
    }
}

/// Render a document: declaration plus the indented tree.
pub fn render(root: &Element) -> Result<String, XmlError> {
    let mut writer = Writer::new(Vec::new());
    write_document(&mut writer, root).map_err(|e| XmlError::Write(e.to_string()))?;
    String::from_utf8(writer.into_inner()).map_err(|e| XmlError::Write(e.to_string()))
}

fn write_document(writer: &mut Writer<Vec<u8>>, root: &Element) -> quick_xml::Result<()> {
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    writer.get_mut().push(b'\n');
    write_element(writer, root, Some(0))
}

/// `depth` is `None` inside mixed content, where no whitespace may be added.
fn write_element(
    writer: &mut Writer<Vec<u8>>,
    element: &Element,
    depth: Option<usize>,
) -> quick_xml::Result<()> {
    if let Some(depth) = depth {
        indent(writer, depth);
    }
    let start = start_tag(element);
    if element.children.is_empty() {
        writer.write_event(Event::Empty(start))?;
    } else {
        writer.write_event(Event::Start(start))?;
        match depth {
            Some(depth) if !element.has_text() => {
                writer.get_mut().push(b'\n');
                for child in &element.children {
                    write_node(writer, child, Some(depth + 1))?;
                }
                indent(writer, depth);
            }
            _ => {
                for child in &element.children {
                    write_node(writer, child, None)?;
                }
            }
        }
        writer.write_event(Event::End(BytesEnd::new(element.name.as_str())))?;
    }
    if depth.is_some() {
        writer.get_mut().push(b'\n');
    }
    Ok(())
}

fn write_node(writer: &mut Writer<Vec<u8>>, node: &Node, depth: Option<usize>) -> quick_xml::Result<()> {
    match node {
        Node::Element(e) => write_element(writer, e, depth),
        Node::Text(text) => {
            let text = printable(text);
            writer.write_event(Event::Text(BytesText::from_escaped(partial_escape(&text))))
        }
        Node::Comment(text) => {
            if let Some(depth) = depth {
                indent(writer, depth);
            }
            let body = format!(" {} ", comment_body(text));
            writer.write_event(Event::Comment(BytesText::from_escaped(body)))?;
            if depth.is_some() {
                writer.get_mut().push(b'\n');
            }
            Ok(())
        }
    }
}

fn indent(writer: &mut Writer<Vec<u8>>, depth: usize) {
    writer.get_mut().extend(std::iter::repeat(b' ').take(depth * 2));
}

fn start_tag(element: &Element) -> BytesStart<'_> {
    let mut start = BytesStart::new(element.name.as_str());
    for (name, value) in &element.attributes {
        start.push_attribute(Attribute {
            key: QName(name.as_bytes()),
            value: Cow::Owned(attribute_value(value).into_bytes()),
        });
    }
    start
}

/// Drop the control characters XML 1.0 cannot carry.
fn printable(text: &str) -> Cow<'_, str> {
    let allowed = |c: char| !(c < '\u{20}' && !matches!(c, '\t' | '\n' | '\r'));
    if text.chars().all(allowed) {
        Cow::Borrowed(text)
    } else {
        Cow::Owned(text.chars().filter(|c| allowed(*c)).collect())
    }
}

/// Escaped attribute value. Whitespace other than spaces is written as character references
/// so attribute-value normalization keeps it.
fn attribute_value(value: &str) -> String {
    let printable = printable(value);
    let escaped = escape(&printable);
    let mut out = String::with_capacity(escaped.len());
    for ch in escaped.chars() {
        match ch {
            '\t' => out.push_str("&#9;"),
            '\n' => out.push_str("&#10;"),
            '\r' => out.push_str("&#13;"),
            c => out.push(c),
        }
    }
    out
}

/// Comment text with no `--` run and no trailing `-`.
fn comment_body(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in printable(text).chars() {
        if ch == '-' && out.ends_with('-') {
            out.push(' ');
        }
        out.push(ch);
    }
    if out.ends_with('-') {
        out.push(' ');
    }
    out
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum XmlError {
    #[error("malformed XML at byte {position}: {message}")]
    Malformed { position: u64, message: String },
    #[error("{0} element(s) left open at end of document")]
    Unclosed(usize),
    #[error("expected exactly one root element, found {0}")]
    RootCount(usize),
    #[error("failed to write XML: {0}")]
    Write(String),
}

/// Check that `xml` is a well-formed document with a single root.
pub fn check_well_formed(xml: &str) -> Result<(), XmlError> {
    let mut reader = Reader::from_str(xml);
    let mut depth = 0usize;
    let mut roots = 0usize;
    loop {
        let position = reader.buffer_position() as u64;
        let malformed = |message: String| XmlError::Malformed { position, message };
        match reader.read_event() {
            Ok(Event::Start(start)) => {
                if depth == 0 {
                    roots += 1;
                }
                depth += 1;
                check_attributes(&start).map_err(malformed)?;
            }
            Ok(Event::Empty(start)) => {
                if depth == 0 {
                    roots += 1;
                }
                check_attributes(&start).map_err(malformed)?;
            }
            Ok(Event::End(_)) => depth = depth.saturating_sub(1),
            Ok(Event::Text(text)) => {
                text.unescape().map_err(|e| malformed(e.to_string()))?;
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(malformed(e.to_string())),
        }
    }
    if depth > 0 {
        return Err(XmlError::Unclosed(depth));
    }
    if roots != 1 {
        return Err(XmlError::RootCount(roots));
    }
    Ok(())
}

fn check_attributes(start: &BytesStart<'_>) -> Result<(), String> {
    for attribute in start.attributes() {
        let attribute = attribute.map_err(|e| e.to_string())?;
        attribute.unescape_value().map_err(|e| e.to_string())?;
    }
    Ok(())
}
