//! Minimal XML tree: parsed from part bytes with quick-xml, or built in memory
//! and serialized byte-exactly with the crate's escaping rules.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use super::escape::{escape_attr, escape_text};
use crate::error::{Result, XlsxError};

pub const XML_DECLARATION: &str =
    "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\r\n";

#[derive(Debug, Clone, PartialEq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
}

/// An element with ordered attributes and children
#[derive(Debug, Clone, PartialEq, Default)]
pub struct XmlElement {
    /// Qualified name as written in the document (e.g. `x:row`)
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

fn local_part(name: &str) -> &str {
    name.rsplit_once(':').map_or(name, |(_, local)| local)
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    // --- construction -----------------------------------------------------

    pub fn with_attr(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.set_attr(key, value);
        self
    }

    /// Add the attribute only when `condition` holds
    pub fn with_attr_if(self, condition: bool, key: impl Into<String>, value: impl ToString) -> Self {
        if condition {
            self.with_attr(key, value)
        } else {
            self
        }
    }

    pub fn with_attr_opt<V: ToString>(self, key: impl Into<String>, value: Option<V>) -> Self {
        match value {
            Some(v) => self.with_attr(key, v),
            None => self,
        }
    }

    pub fn with_child(mut self, child: XmlElement) -> Self {
        self.children.push(XmlNode::Element(child));
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = XmlElement>) -> Self {
        self.children
            .extend(children.into_iter().map(XmlNode::Element));
        self
    }

    /// Append a text node; an empty string still forces an explicit end tag
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.children.push(XmlNode::Text(text.into()));
        self
    }

    pub fn push(&mut self, child: XmlElement) {
        self.children.push(XmlNode::Element(child));
    }

    pub fn set_attr(&mut self, key: impl Into<String>, value: impl ToString) {
        let key = key.into();
        let value = value.to_string();
        if let Some(slot) = self.attrs.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
        } else {
            self.attrs.push((key, value));
        }
    }

    // --- queries ------------------------------------------------------------

    pub fn local_name(&self) -> &str {
        local_part(&self.name)
    }

    /// Attribute by qualified name, falling back to a prefix-insensitive match
    pub fn attr(&self, name: &str) -> Option<&str> {
        if let Some((_, v)) = self.attrs.iter().find(|(k, _)| k == name) {
            return Some(v.as_str());
        }
        if !name.contains(':') {
            return None;
        }
        let wanted = local_part(name);
        self.attrs
            .iter()
            .find(|(k, _)| k.contains(':') && local_part(k) == wanted)
            .map(|(_, v)| v.as_str())
    }

    pub fn attr_or<'a>(&'a self, name: &str, fallback: &'a str) -> &'a str {
        self.attr(name).unwrap_or(fallback)
    }

    /// Child elements in document order
    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|node| match node {
            XmlNode::Element(el) => Some(el),
            XmlNode::Text(_) => None,
        })
    }

    pub fn children_named<'a>(&'a self, local: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.elements().filter(move |el| el.local_name() == local)
    }

    pub fn child(&self, local: &str) -> Option<&XmlElement> {
        self.elements().find(|el| el.local_name() == local)
    }

    /// All descendants with the given local name, in document order
    pub fn descendants(&self, local: &str) -> Vec<&XmlElement> {
        let mut found = Vec::new();
        collect_descendants(self, local, &mut found);
        found
    }

    /// Concatenated text of this element and every descendant
    pub fn text(&self) -> String {
        let mut out = String::new();
        collect_text(self, &mut out);
        out
    }

    // --- parsing ------------------------------------------------------------

    /// Parse a whole part and return its root element
    pub fn parse(part: &str, bytes: &[u8]) -> Result<XmlElement> {
        let text = std::str::from_utf8(bytes).map_err(|e| XlsxError::xml(part, e))?;
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        let mut reader = Reader::from_str(text);

        let mut stack: Vec<XmlElement> = Vec::new();
        let mut root = None;

        loop {
            match reader.read_event().map_err(|e| {
                XlsxError::xml(part, format!("{} at byte {}", e, reader.error_position()))
            })? {
                Event::Start(e) => stack.push(element_from_start(part, &e)?),
                Event::Empty(e) => {
                    let el = element_from_start(part, &e)?;
                    attach(&mut stack, &mut root, el);
                }
                Event::End(_) => {
                    let el = stack
                        .pop()
                        .ok_or_else(|| XlsxError::xml(part, "unbalanced end tag"))?;
                    attach(&mut stack, &mut root, el);
                }
                Event::Text(e) => {
                    if let Some(parent) = stack.last_mut() {
                        let raw = e.unescape().map_err(|err| XlsxError::xml(part, err))?;
                        parent.children.push(XmlNode::Text(normalize_newlines(&raw)));
                    }
                }
                Event::CData(e) => {
                    if let Some(parent) = stack.last_mut() {
                        let raw = String::from_utf8_lossy(e.as_ref()).into_owned();
                        parent.children.push(XmlNode::Text(normalize_newlines(&raw)));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !stack.is_empty() {
            return Err(XlsxError::xml(part, "unexpected end of document"));
        }
        root.ok_or_else(|| XlsxError::xml(part, "document has no root element"))
    }

    // --- serialization --------------------------------------------------------

    pub fn write_to(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.name);
        for (key, value) in &self.attrs {
            out.push(' ');
            out.push_str(key);
            out.push_str("=\"");
            out.push_str(&escape_attr(value));
            out.push('"');
        }
        if self.children.is_empty() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        for child in &self.children {
            match child {
                XmlNode::Element(el) => el.write_to(out),
                XmlNode::Text(text) => out.push_str(&escape_text(text)),
            }
        }
        out.push_str("</");
        out.push_str(&self.name);
        out.push('>');
    }

    pub fn to_xml_string(&self) -> String {
        let mut out = String::new();
        self.write_to(&mut out);
        out
    }

    /// Serialize as a standalone document, declaration included
    pub fn to_document(&self) -> Vec<u8> {
        let mut out = String::from(XML_DECLARATION);
        self.write_to(&mut out);
        out.into_bytes()
    }
}

fn element_from_start(part: &str, start: &BytesStart<'_>) -> Result<XmlElement> {
    let mut el = XmlElement::new(String::from_utf8_lossy(start.name().as_ref()).into_owned());
    for attr in start.attributes() {
        let attr = attr.map_err(|e| XlsxError::xml(part, e))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| XlsxError::xml(part, e))?
            .into_owned();
        el.attrs.push((key, value));
    }
    Ok(el)
}

fn attach(stack: &mut [XmlElement], root: &mut Option<XmlElement>, el: XmlElement) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(XmlNode::Element(el));
    } else if root.is_none() {
        *root = Some(el);
    }
}

fn normalize_newlines(text: &str) -> String {
    if text.contains('\r') {
        text.replace("\r\n", "\n").replace('\r', "\n")
    } else {
        text.to_string()
    }
}

fn collect_descendants<'a>(el: &'a XmlElement, local: &str, found: &mut Vec<&'a XmlElement>) {
    for child in el.elements() {
        if child.local_name() == local {
            found.push(child);
        }
        collect_descendants(child, local, found);
    }
}

fn collect_text(el: &XmlElement, out: &mut String) {
    for child in &el.children {
        match child {
            XmlNode::Element(inner) => collect_text(inner, out),
            XmlNode::Text(text) => out.push_str(text),
        }
    }
}
