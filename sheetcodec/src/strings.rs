//! Shared-string table: order-preserving, deduplicating interning

use std::collections::HashMap;

use crate::xml::{XmlElement, needs_space_preserve};

pub const SHARED_STRINGS_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";

/// Strings referenced by index from `t="s"` cells.
///
/// `intern` hands out the index a string received the first time it was
/// seen; later calls with equal content return that same index.
#[derive(Debug, Clone, Default)]
pub struct SharedStrings {
    strings: Vec<String>,
    positions: HashMap<String, usize>,
    /// Every `intern` call, duplicates included
    total: usize,
}

impl SharedStrings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, value: &str) -> usize {
        self.total += 1;
        if let Some(&idx) = self.positions.get(value) {
            return idx;
        }
        let idx = self.strings.len();
        self.strings.push(value.to_string());
        self.positions.insert(value.to_string(), idx);
        idx
    }

    /// Append a string read from a package, keeping its position even when
    /// the document repeats it.
    fn push_positional(&mut self, value: String) {
        let idx = self.strings.len();
        self.positions.entry(value.clone()).or_insert(idx);
        self.strings.push(value);
        self.total += 1;
    }

    pub fn get(&self, idx: usize) -> Option<&str> {
        self.strings.get(idx).map(String::as_str)
    }

    pub fn position(&self, value: &str) -> Option<usize> {
        self.positions.get(value).copied()
    }

    /// Number of entries in the table
    pub fn unique_count(&self) -> usize {
        self.strings.len()
    }

    /// Number of insert attempts, written as the `count` attribute
    pub fn total_count(&self) -> usize {
        self.total
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.strings.iter().map(String::as_str)
    }

    /// Build the table from a parsed `sharedStrings.xml` root
    pub fn from_xml(root: &XmlElement) -> Self {
        let mut table = Self::new();
        for si in root.children_named("si") {
            table.push_positional(string_item_text(si));
        }
        table
    }

    pub fn to_xml(&self) -> XmlElement {
        let mut sst = XmlElement::new("sst")
            .with_attr("xmlns", SHARED_STRINGS_NS)
            .with_attr("count", self.total)
            .with_attr("uniqueCount", self.strings.len());
        for s in &self.strings {
            sst.push(XmlElement::new("si").with_child(text_run(s)));
        }
        sst
    }
}

/// A `<t>` element, marked `xml:space="preserve"` when edge whitespace matters
pub fn text_run(text: &str) -> XmlElement {
    XmlElement::new("t")
        .with_attr_if(needs_space_preserve(text), "xml:space", "preserve")
        .with_text(text)
}

/// Plain text of an `<si>` or `<is>` item: direct `<t>` plus rich-text runs,
/// ignoring phonetic hints.
pub fn string_item_text(item: &XmlElement) -> String {
    let mut text = String::new();
    for child in item.elements() {
        match child.local_name() {
            "t" => text.push_str(&child.text()),
            "r" => {
                for t in child.children_named("t") {
                    text.push_str(&t.text());
                }
            }
            _ => {}
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_is_idempotent() {
        let mut table = SharedStrings::new();
        assert_eq!(table.intern("a"), 0);
        assert_eq!(table.intern("b"), 1);
        assert_eq!(table.intern("b"), 1);
        assert_eq!(table.intern("a"), 0);
        assert_eq!(table.unique_count(), 2);
        assert_eq!(table.total_count(), 4);
    }

    #[test]
    fn test_unique_count_bounded_by_distinct_inputs() {
        let inputs = ["x", "y", "x", "z", "y", "", ""];
        let mut table = SharedStrings::new();
        for s in inputs {
            let first = table.intern(s);
            let size = table.len();
            assert_eq!(table.intern(s), first);
            assert_eq!(table.len(), size);
        }
        assert_eq!(table.len(), 4);
    }

    #[test]
    fn test_parse_rich_and_phonetic_runs() {
        let xml = br#"<sst xmlns="urn:x" count="3" uniqueCount="3">
<si><t>plain</t></si>
<si><r><t>ri</t></r><r><rPr><b/></rPr><t>ch</t></r></si>
<si><t>kanji</t><rPh><t>kana</t></rPh></si>
<si><t>plain</t></si>
</sst>"#;
        let root = XmlElement::parse("xl/sharedStrings.xml", xml).unwrap();
        let table = SharedStrings::from_xml(&root);
        assert_eq!(table.get(0), Some("plain"));
        assert_eq!(table.get(1), Some("rich"));
        assert_eq!(table.get(2), Some("kanji"));
        assert_eq!(table.get(3), Some("plain"));
        assert_eq!(table.position("plain"), Some(0));
        assert_eq!(table.get(9), None);
    }

    #[test]
    fn test_to_xml_counts_and_preserve() {
        let mut table = SharedStrings::new();
        table.intern(" padded");
        table.intern("x");
        table.intern("x");
        let xml = table.to_xml().to_xml_string();
        assert!(xml.contains(r#"count="3" uniqueCount="2""#));
        assert!(xml.contains(r#"<t xml:space="preserve"> padded</t>"#));
        assert!(xml.contains("<si><t>x</t></si>"));
    }
}
