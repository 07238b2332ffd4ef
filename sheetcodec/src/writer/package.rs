//! OPC container plumbing: relationships, content types and the zip itself

use std::io::{Cursor, Seek, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::Result;
use crate::xml::XmlElement;

pub const CONTENT_TYPES_PART: &str = "[Content_Types].xml";
pub const ROOT_RELS_PART: &str = "_rels/.rels";

const CONTENT_TYPES_NS: &str = "http://schemas.openxmlformats.org/package/2006/content-types";
const RELATIONSHIPS_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";

/// Relationship type URIs
pub mod rel_type {
    pub const OFFICE_DOCUMENT: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
    pub const CORE_PROPERTIES: &str =
        "http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties";
    pub const EXTENDED_PROPERTIES: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/extended-properties";
    pub const WORKSHEET: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet";
    pub const STYLES: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles";
    pub const SHARED_STRINGS: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/sharedStrings";
}

/// Content types declared in `[Content_Types].xml`
pub mod content_type {
    pub const RELATIONSHIPS: &str = "application/vnd.openxmlformats-package.relationships+xml";
    pub const WORKBOOK: &str =
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml";
    pub const WORKSHEET: &str =
        "application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml";
    pub const STYLES: &str =
        "application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml";
    pub const SHARED_STRINGS: &str =
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml";
    pub const CORE_PROPERTIES: &str = "application/vnd.openxmlformats-package.core-properties+xml";
    pub const EXTENDED_PROPERTIES: &str =
        "application/vnd.openxmlformats-officedocument.extended-properties+xml";
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub id: String,
    pub rel_type: String,
    pub target: String,
}

/// Relationships owned by one part, stored in that part's `.rels` file.
///
/// Ids are handed out as `rId1`, `rId2`, ... in insertion order and never
/// change once assigned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationshipGroup {
    /// Path of the owning part; empty for the package root
    owner: String,
    relationships: Vec<Relationship>,
}

impl RelationshipGroup {
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            relationships: Vec::new(),
        }
    }

    /// Add a relationship and return its id
    pub fn add(&mut self, rel_type: &str, target: impl Into<String>) -> String {
        let id = format!("rId{}", self.relationships.len() + 1);
        self.relationships.push(Relationship {
            id: id.clone(),
            rel_type: rel_type.to_string(),
            target: target.into(),
        });
        id
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn len(&self) -> usize {
        self.relationships.len()
    }

    pub fn is_empty(&self) -> bool {
        self.relationships.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Relationship> {
        self.relationships.iter()
    }

    pub fn get(&self, id: &str) -> Option<&Relationship> {
        self.relationships.iter().find(|r| r.id == id)
    }

    /// First relationship of the given type
    pub fn find_by_type(&self, rel_type: &str) -> Option<&Relationship> {
        self.relationships.iter().find(|r| r.rel_type == rel_type)
    }

    /// Location of the `.rels` part for this group
    pub fn rels_path(&self) -> String {
        rels_path_for(&self.owner)
    }

    /// Package path a target points at, resolved against the owner's folder
    pub fn resolve_target(&self, target: &str) -> String {
        if let Some(absolute) = target.strip_prefix('/') {
            return normalize_path(absolute);
        }
        let base = self.owner.rsplit_once('/').map_or("", |(dir, _)| dir);
        if base.is_empty() {
            normalize_path(target)
        } else {
            normalize_path(&format!("{base}/{target}"))
        }
    }

    pub fn to_xml(&self) -> XmlElement {
        XmlElement::new("Relationships")
            .with_attr("xmlns", RELATIONSHIPS_NS)
            .with_children(self.relationships.iter().map(|r| {
                XmlElement::new("Relationship")
                    .with_attr("Id", &r.id)
                    .with_attr("Type", &r.rel_type)
                    .with_attr("Target", &r.target)
            }))
    }

    /// Read a parsed `.rels` document; entries without an id or target are skipped
    pub fn from_xml(owner: impl Into<String>, root: &XmlElement) -> Self {
        let mut group = Self::new(owner);
        for el in root.children_named("Relationship") {
            let (Some(id), Some(target)) = (el.attr("Id"), el.attr("Target")) else {
                log::warn!("{}: relationship without Id or Target skipped", group.rels_path());
                continue;
            };
            if el.attr("TargetMode") == Some("External") {
                continue;
            }
            group.relationships.push(Relationship {
                id: id.to_string(),
                rel_type: el.attr_or("Type", "").to_string(),
                target: target.to_string(),
            });
        }
        group
    }
}

/// `xl/workbook.xml` -> `xl/_rels/workbook.xml.rels`; the root owner maps to `_rels/.rels`
pub fn rels_path_for(owner: &str) -> String {
    match owner.rsplit_once('/') {
        Some((dir, file)) => format!("{dir}/_rels/{file}.rels"),
        None if owner.is_empty() => ROOT_RELS_PART.to_string(),
        None => format!("_rels/{owner}.rels"),
    }
}

fn normalize_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

#[derive(Debug, Clone)]
struct PackagePart {
    path: String,
    content_type: String,
    /// Whether the part gets an `<Override>` in the content types
    declare: bool,
    data: Vec<u8>,
}

/// Collects generated parts and relationship groups, then writes the zip
#[derive(Debug, Default)]
pub struct PackageAssembler {
    parts: Vec<PackagePart>,
    relationships: Vec<RelationshipGroup>,
    compression_level: Option<i64>,
}

impl PackageAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_compression_level(mut self, level: Option<i64>) -> Self {
        self.compression_level = level;
        self
    }

    /// Queue a part. `declare` adds an override entry for its content type.
    pub fn add_part(&mut self, path: &str, content_type: &str, declare: bool, data: Vec<u8>) {
        self.parts.push(PackagePart {
            path: path.to_string(),
            content_type: content_type.to_string(),
            declare,
            data,
        });
    }

    /// The relationship group owned by `owner`, created on first use
    pub fn relationships(&mut self, owner: &str) -> &mut RelationshipGroup {
        let pos = match self.relationships.iter().position(|g| g.owner() == owner) {
            Some(pos) => pos,
            None => {
                self.relationships.push(RelationshipGroup::new(owner));
                self.relationships.len() - 1
            }
        };
        &mut self.relationships[pos]
    }

    pub fn part_paths(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().map(|p| p.path.as_str())
    }

    pub fn content_types_xml(&self) -> XmlElement {
        let mut types = XmlElement::new("Types")
            .with_attr("xmlns", CONTENT_TYPES_NS)
            .with_child(
                XmlElement::new("Default")
                    .with_attr("Extension", "xml")
                    .with_attr("ContentType", content_type::WORKBOOK),
            )
            .with_child(
                XmlElement::new("Default")
                    .with_attr("Extension", "rels")
                    .with_attr("ContentType", content_type::RELATIONSHIPS),
            );
        for part in self.parts.iter().filter(|p| p.declare) {
            types.push(
                XmlElement::new("Override")
                    .with_attr("PartName", format!("/{}", part.path))
                    .with_attr("ContentType", &part.content_type),
            );
        }
        types
    }

    /// Write content types, every relationship document, then the parts
    pub fn pack<W: Write + Seek>(self, writer: W) -> Result<W> {
        let mut zip = ZipWriter::new(writer);
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .compression_level(self.compression_level);

        zip.start_file(CONTENT_TYPES_PART, options)?;
        zip.write_all(&self.content_types_xml().to_document())?;

        for group in self.relationships.iter().filter(|g| !g.is_empty()) {
            zip.start_file(group.rels_path(), options)?;
            zip.write_all(&group.to_xml().to_document())?;
        }

        for part in &self.parts {
            zip.start_file(part.path.as_str(), options)?;
            zip.write_all(&part.data)?;
        }
        log::debug!(
            "packed {} parts and {} relationship documents",
            self.parts.len(),
            self.relationships.len()
        );
        Ok(zip.finish()?)
    }

    pub fn pack_to_vec(self) -> Result<Vec<u8>> {
        Ok(self.pack(Cursor::new(Vec::new()))?.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use zip::ZipArchive;

    #[test]
    fn test_relationship_ids_are_sequential_and_stable() {
        let mut group = RelationshipGroup::new("xl/workbook.xml");
        assert_eq!(group.add(rel_type::WORKSHEET, "worksheets/sheet1.xml"), "rId1");
        assert_eq!(group.add(rel_type::WORKSHEET, "worksheets/sheet2.xml"), "rId2");
        assert_eq!(group.add(rel_type::STYLES, "styles.xml"), "rId3");
        assert_eq!(group.get("rId2").unwrap().target, "worksheets/sheet2.xml");
        assert_eq!(group.find_by_type(rel_type::STYLES).unwrap().id, "rId3");
    }

    #[test]
    fn test_rels_paths() {
        assert_eq!(rels_path_for(""), "_rels/.rels");
        assert_eq!(rels_path_for("xl/workbook.xml"), "xl/_rels/workbook.xml.rels");
        assert_eq!(
            rels_path_for("xl/worksheets/sheet1.xml"),
            "xl/worksheets/_rels/sheet1.xml.rels"
        );
    }

    #[test]
    fn test_resolve_targets() {
        let group = RelationshipGroup::new("xl/workbook.xml");
        assert_eq!(group.resolve_target("worksheets/sheet1.xml"), "xl/worksheets/sheet1.xml");
        assert_eq!(group.resolve_target("/xl/styles.xml"), "xl/styles.xml");
        assert_eq!(group.resolve_target("../docProps/app.xml"), "docProps/app.xml");
        let root = RelationshipGroup::new("");
        assert_eq!(root.resolve_target("xl/workbook.xml"), "xl/workbook.xml");
        assert_eq!(root.resolve_target("./xl/workbook.xml"), "xl/workbook.xml");
    }

    #[test]
    fn test_rels_document_reparses() {
        let mut group = RelationshipGroup::new("");
        group.add(rel_type::OFFICE_DOCUMENT, "xl/workbook.xml");
        group.add(rel_type::CORE_PROPERTIES, "docProps/core.xml");
        let doc = group.to_xml().to_document();
        let parsed = RelationshipGroup::from_xml("", &XmlElement::parse("_rels/.rels", &doc).unwrap());
        assert_eq!(parsed, group);
    }

    #[test]
    fn test_pack_order_and_content_types() {
        let mut assembler = PackageAssembler::new();
        assembler.add_part("xl/workbook.xml", content_type::WORKBOOK, false, b"<workbook/>".to_vec());
        assembler.add_part("xl/styles.xml", content_type::STYLES, true, b"<styleSheet/>".to_vec());
        assembler
            .relationships("")
            .add(rel_type::OFFICE_DOCUMENT, "xl/workbook.xml");
        assembler
            .relationships("xl/workbook.xml")
            .add(rel_type::STYLES, "styles.xml");

        let types = assembler.content_types_xml().to_xml_string();
        assert!(types.contains(r#"<Default Extension="xml""#));
        assert!(types.contains(r#"<Override PartName="/xl/styles.xml""#));
        assert!(!types.contains("/xl/workbook.xml"));

        let bytes = assembler.pack_to_vec().unwrap();
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let names: Vec<&str> = archive.file_names().collect();
        assert_eq!(names.len(), 5);
        assert_eq!(archive.by_index(0).unwrap().name(), "[Content_Types].xml");
        assert_eq!(archive.by_index(1).unwrap().name(), "_rels/.rels");
        assert_eq!(archive.by_index(2).unwrap().name(), "xl/_rels/workbook.xml.rels");
        assert_eq!(archive.by_index(3).unwrap().name(), "xl/workbook.xml");

        let mut styles = String::new();
        archive
            .by_name("xl/styles.xml")
            .unwrap()
            .read_to_string(&mut styles)
            .unwrap();
        assert_eq!(styles, "<styleSheet/>");
        assert_eq!(
            archive.by_name("xl/styles.xml").unwrap().compression(),
            CompressionMethod::Deflated
        );
    }
}
