//! A small owned XML tree for editing document parts.
//!
//! Parsing keeps whitespace text, comments and processing instructions so
//! that a part written back without edits keeps its content. Element and
//! attribute names are stored with their namespace prefix; lookups go by
//! local name.

use std::str::{self, Utf8Error};

use quick_xml::escape::{escape, partial_escape};
use quick_xml::events::attributes::AttrError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;

const DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

/// Reasons a part cannot be parsed.
#[derive(Debug, Error)]
pub enum XmlError {
    #[error(transparent)]
    Syntax(#[from] quick_xml::Error),

    #[error("invalid attribute: {0}")]
    Attribute(#[from] AttrError),

    #[error("invalid UTF-8: {0}")]
    Utf8(#[from] Utf8Error),

    #[error("unexpected closing tag")]
    Unbalanced,

    #[error("no root element")]
    NoRoot,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
    CData(String),
    Comment(String),
    ProcessingInstruction(String),
    DocType(String),
}

impl XmlNode {
    pub fn as_element(&self) -> Option<&XmlElement> {
        match self {
            Self::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut XmlElement> {
        match self {
            Self::Element(element) => Some(element),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlElement {
    /// Qualified name, e.g. `w:p`.
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(key, value);
        self
    }

    pub fn with_child(mut self, child: XmlElement) -> Self {
        self.children.push(XmlNode::Element(child));
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.children.push(XmlNode::Text(text.into()));
        self
    }

    pub fn local_name(&self) -> &str {
        local_name(&self.name)
    }

    /// Namespace prefix including the colon, or `""`.
    pub fn prefix(&self) -> &str {
        &self.name[..self.name.len() - self.local_name().len()]
    }

    pub fn is(&self, local: &str) -> bool {
        self.local_name() == local
    }

    /// Name for a new element in the same namespace as `self`.
    pub fn sibling_name(&self, local: &str) -> String {
        format!("{}{}", self.prefix(), local)
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn set_attr(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((key, value)),
        }
    }

    pub fn remove_attr(&mut self, key: &str) {
        self.attributes.retain(|(k, _)| k != key);
    }

    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(XmlNode::as_element)
    }

    pub fn elements_mut(&mut self) -> impl Iterator<Item = &mut XmlElement> {
        self.children.iter_mut().filter_map(XmlNode::as_element_mut)
    }

    pub fn children_named<'a>(&'a self, local: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.elements().filter(move |e| e.is(local))
    }

    pub fn child(&self, local: &str) -> Option<&XmlElement> {
        self.elements().find(|e| e.is(local))
    }

    pub fn child_mut(&mut self, local: &str) -> Option<&mut XmlElement> {
        self.elements_mut().find(|e| e.is(local))
    }

    /// Concatenated text of all descendants.
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for child in &self.children {
            match child {
                XmlNode::Text(text) | XmlNode::CData(text) => out.push_str(text),
                XmlNode::Element(element) => element.collect_text(out),
                _ => {}
            }
        }
    }

    /// Inserts `child` respecting the schema sequence `order` (local names).
    ///
    /// The child goes before the first existing element that must follow it.
    /// Names missing from `order` are appended.
    pub fn insert_ordered(&mut self, child: XmlElement, order: &[&str]) -> &mut XmlElement {
        let rank = |name: &str| order.iter().position(|o| *o == name);
        let position = rank(child.local_name()).and_then(|own| {
            self.children.iter().position(|node| match node {
                XmlNode::Element(e) => rank(e.local_name()).is_some_and(|r| r > own),
                _ => false,
            })
        });

        let index = match position {
            Some(index) => {
                self.children.insert(index, XmlNode::Element(child));
                index
            }
            None => {
                self.children.push(XmlNode::Element(child));
                self.children.len() - 1
            }
        };

        match &mut self.children[index] {
            XmlNode::Element(element) => element,
            _ => unreachable!("just inserted an element"),
        }
    }

    /// Returns the child named `local`, creating it in schema order if needed.
    pub fn ensure_child(&mut self, local: &str, order: &[&str]) -> &mut XmlElement {
        let index = self
            .children
            .iter()
            .position(|node| matches!(node, XmlNode::Element(e) if e.is(local)));

        match index {
            Some(index) => match &mut self.children[index] {
                XmlNode::Element(element) => element,
                _ => unreachable!("position matched an element"),
            },
            None => {
                let child = XmlElement::new(self.sibling_name(local));
                self.insert_ordered(child, order)
            }
        }
    }

    fn write(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.name);
        for (key, value) in &self.attributes {
            out.push(' ');
            out.push_str(key);
            out.push_str("=\"");
            out.push_str(&escape(value.as_str()));
            out.push('"');
        }

        if self.children.is_empty() {
            out.push_str("/>");
            return;
        }

        out.push('>');
        for child in &self.children {
            write_node(child, out);
        }
        out.push_str("</");
        out.push_str(&self.name);
        out.push('>');
    }
}

fn write_node(node: &XmlNode, out: &mut String) {
    match node {
        XmlNode::Element(element) => element.write(out),
        XmlNode::Text(text) => out.push_str(&partial_escape(text.as_str())),
        XmlNode::CData(text) => {
            out.push_str("<![CDATA[");
            out.push_str(text);
            out.push_str("]]>");
        }
        XmlNode::Comment(text) => {
            out.push_str("<!--");
            out.push_str(text);
            out.push_str("-->");
        }
        XmlNode::ProcessingInstruction(text) => {
            out.push_str("<?");
            out.push_str(text);
            out.push_str("?>");
        }
        XmlNode::DocType(text) => {
            out.push_str("<!DOCTYPE ");
            out.push_str(text);
            out.push('>');
        }
    }
}

/// Local part of a qualified name.
pub fn local_name(name: &str) -> &str {
    name.rsplit_once(':').map_or(name, |(_, local)| local)
}

/// A parsed XML part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlDocument {
    pub declaration: bool,
    /// Comments and processing instructions before the root.
    pub prolog: Vec<XmlNode>,
    pub root: XmlElement,
}

impl XmlDocument {
    pub fn new(root: XmlElement) -> Self {
        Self {
            declaration: true,
            prolog: Vec::new(),
            root,
        }
    }

    pub fn parse(bytes: &[u8]) -> Result<Self, XmlError> {
        let mut reader = Reader::from_reader(bytes);
        reader.trim_text(false);

        let mut declaration = false;
        let mut prolog = Vec::new();
        let mut root = None;
        let mut stack: Vec<XmlElement> = Vec::new();
        let mut buf = Vec::new();

        loop {
            let node = match reader.read_event_into(&mut buf)? {
                Event::Decl(_) => {
                    declaration = true;
                    None
                }
                Event::Start(start) => {
                    stack.push(element_from(&start)?);
                    None
                }
                Event::Empty(start) => Some(XmlNode::Element(element_from(&start)?)),
                Event::End(_) => Some(XmlNode::Element(stack.pop().ok_or(XmlError::Unbalanced)?)),
                Event::Text(text) => Some(XmlNode::Text(text.unescape()?.into_owned())),
                Event::CData(data) => Some(XmlNode::CData(
                    str::from_utf8(&data.into_inner())?.to_string(),
                )),
                Event::Comment(text) => Some(XmlNode::Comment(str::from_utf8(&text)?.to_string())),
                Event::PI(text) => Some(XmlNode::ProcessingInstruction(
                    str::from_utf8(&text)?.to_string(),
                )),
                Event::DocType(text) => Some(XmlNode::DocType(str::from_utf8(&text)?.to_string())),
                Event::Eof => break,
            };
            buf.clear();

            let Some(node) = node else { continue };
            match stack.last_mut() {
                Some(parent) => append(parent, node),
                None => match node {
                    XmlNode::Element(element) if root.is_none() => root = Some(element),
                    // Whitespace between prolog items.
                    XmlNode::Text(_) => {}
                    other if root.is_none() => prolog.push(other),
                    _ => {}
                },
            }
        }

        if !stack.is_empty() {
            return Err(XmlError::Unbalanced);
        }

        Ok(Self {
            declaration,
            prolog,
            root: root.ok_or(XmlError::NoRoot)?,
        })
    }

    pub fn to_xml(&self) -> String {
        let mut out = String::new();
        if self.declaration {
            out.push_str(DECLARATION);
            out.push_str("\r\n");
        }
        for node in &self.prolog {
            write_node(node, &mut out);
        }
        self.root.write(&mut out);
        out
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_xml().into_bytes()
    }
}

fn append(parent: &mut XmlElement, node: XmlNode) {
    if let XmlNode::Text(text) = &node {
        if let Some(XmlNode::Text(previous)) = parent.children.last_mut() {
            previous.push_str(text);
            return;
        }
    }
    parent.children.push(node);
}

fn element_from(start: &BytesStart<'_>) -> Result<XmlElement, XmlError> {
    let mut element = XmlElement::new(str::from_utf8(start.name().as_ref())?);
    for attr in start.attributes() {
        let attr = attr?;
        let key = str::from_utf8(attr.key.as_ref())?.to_string();
        let value = attr.unescape_value()?.into_owned();
        element.attributes.push((key, value));
    }
    Ok(element)
}
