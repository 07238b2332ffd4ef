//! Package reader: zip to OOXML parts to model

use std::io::{Read, Seek};

use zip::ZipArchive;
use zip::result::ZipError;

pub mod coerce;
pub mod resolve;
pub mod worksheet;

use crate::config::ImportOptions;
use crate::error::{Result, XlsxError};
use crate::metadata;
use crate::model::{DefinedName, DocProperties, FILTER_DATABASE, SheetState, Workbook, Worksheet};
use crate::strings::SharedStrings;
use crate::style::ParsedStyles;
use crate::writer::package::{ROOT_RELS_PART, RelationshipGroup, rel_type, rels_path_for};
use crate::xml::XmlElement;

use self::coerce::apply_import_options;
use self::worksheet::WorksheetReader;

const DEFAULT_WORKBOOK_PART: &str = "xl/workbook.xml";
/// Cap on the buffer reserved up front for one part
const MAX_PREALLOC: u64 = 8 * 1024 * 1024;

/// Initial buffer size for an entry; the declared size is not trusted
fn capacity_hint(declared: u64) -> usize {
    declared.min(MAX_PREALLOC) as usize
}

/// Random-access view of the parts in a package
struct PartSource<R> {
    archive: ZipArchive<R>,
}

impl<R: Read + Seek> PartSource<R> {
    /// Bytes of a part, `None` when the archive has no such entry
    fn read(&mut self, path: &str) -> Result<Option<Vec<u8>>> {
        let mut file = match self.archive.by_name(path) {
            Ok(file) => file,
            Err(ZipError::FileNotFound) => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let mut data = Vec::with_capacity(capacity_hint(file.size()));
        file.read_to_end(&mut data)?;
        Ok(Some(data))
    }

    fn xml(&mut self, path: &str) -> Result<Option<XmlElement>> {
        match self.read(path)? {
            Some(data) => Ok(Some(XmlElement::parse(path, &data)?)),
            None => Ok(None),
        }
    }

    fn required_xml(&mut self, path: &str) -> Result<XmlElement> {
        self.xml(path)?
            .ok_or_else(|| XlsxError::MissingPart(path.to_string()))
    }

    /// Relationships owned by `owner`; a missing `.rels` part is an empty group
    fn relationships(&mut self, owner: &str) -> Result<RelationshipGroup> {
        Ok(match self.xml(&rels_path_for(owner))? {
            Some(root) => RelationshipGroup::from_xml(owner, &root),
            None => RelationshipGroup::new(owner),
        })
    }
}

/// Read a whole package and apply `options` to the resolved cells
pub fn read_package<R: Read + Seek>(reader: R, options: &ImportOptions) -> Result<Workbook> {
    let mut source = PartSource {
        archive: ZipArchive::new(reader)?,
    };

    let root_rels = source.relationships("")?;
    let workbook_part = match root_rels.find_by_type(rel_type::OFFICE_DOCUMENT) {
        Some(rel) => root_rels.resolve_target(&rel.target),
        None => {
            log::warn!("{ROOT_RELS_PART}: no officeDocument relationship, using {DEFAULT_WORKBOOK_PART}");
            DEFAULT_WORKBOOK_PART.to_string()
        }
    };
    let workbook_root = source.required_xml(&workbook_part)?;
    let workbook_rels = source.relationships(&workbook_part)?;

    let styles = match workbook_rels.find_by_type(rel_type::STYLES) {
        Some(rel) => {
            let path = workbook_rels.resolve_target(&rel.target);
            match source.xml(&path)? {
                Some(root) => ParsedStyles::parse(&path, &root)?,
                None => {
                    log::warn!("{path}: style sheet is referenced but absent");
                    ParsedStyles::default()
                }
            }
        }
        None => ParsedStyles::default(),
    };
    let strings = match workbook_rels.find_by_type(rel_type::SHARED_STRINGS) {
        Some(rel) => {
            let path = workbook_rels.resolve_target(&rel.target);
            source
                .xml(&path)?
                .map(|root| SharedStrings::from_xml(&root))
                .unwrap_or_default()
        }
        None => SharedStrings::default(),
    };
    log::debug!(
        "{workbook_part}: {} shared strings, {} styles",
        strings.len(),
        styles.styles().len()
    );

    let mut workbook = Workbook::new();
    workbook.mru_colors = styles.mru_colors().to_vec();

    let sheets = workbook_root
        .child("sheets")
        .map(|s| s.children_named("sheet").collect::<Vec<_>>())
        .unwrap_or_default();
    for sheet_el in sheets {
        let sheet = read_sheet(&mut source, sheet_el, &workbook_part, &workbook_rels, &strings, &styles)?;
        workbook.push_sheet(sheet)?;
    }

    if let Some(active) = workbook_root
        .child("bookViews")
        .and_then(|views| views.child("workbookView"))
        .and_then(|view| view.attr("activeTab"))
        .and_then(|tab| tab.trim().parse::<usize>().ok())
        .filter(|tab| *tab < workbook.sheets().len())
    {
        workbook.active_sheet = active;
    }

    if let Some(names) = workbook_root.child("definedNames") {
        workbook.defined_names = names
            .children_named("definedName")
            .filter_map(read_defined_name)
            .collect();
    }

    let property_parts: [(&str, fn(&XmlElement, &mut DocProperties)); 2] = [
        (rel_type::CORE_PROPERTIES, metadata::read_core),
        (rel_type::EXTENDED_PROPERTIES, metadata::read_app),
    ];
    for (rel, read) in property_parts {
        if let Some(rel) = root_rels.find_by_type(rel) {
            let path = root_rels.resolve_target(&rel.target);
            if let Some(root) = source.xml(&path)? {
                read(&root, &mut workbook.properties);
            }
        }
    }

    if !options.is_passthrough() {
        for sheet in workbook.sheets_mut() {
            apply_import_options(sheet, options);
        }
    }
    Ok(workbook)
}

fn read_sheet<R: Read + Seek>(
    source: &mut PartSource<R>,
    sheet_el: &XmlElement,
    workbook_part: &str,
    workbook_rels: &RelationshipGroup,
    strings: &SharedStrings,
    styles: &ParsedStyles,
) -> Result<Worksheet> {
    let name = sheet_el
        .attr("name")
        .ok_or_else(|| XlsxError::format(workbook_part, "<sheet> without a name"))?;
    let sheet_id = sheet_el
        .attr("sheetId")
        .and_then(|id| id.trim().parse::<u32>().ok())
        .ok_or_else(|| XlsxError::format(workbook_part, format!("sheet '{name}' has no usable sheetId")))?;
    let rid = sheet_el
        .attr("r:id")
        .ok_or_else(|| XlsxError::format(workbook_part, format!("sheet '{name}' has no r:id")))?;
    let rel = workbook_rels.get(rid).ok_or_else(|| {
        XlsxError::format(workbook_part, format!("sheet '{name}' points at unknown relationship {rid}"))
    })?;
    let part = workbook_rels.resolve_target(&rel.target);

    let mut sheet = Worksheet::unchecked(name.to_string());
    sheet.sheet_id = sheet_id;
    sheet.state = SheetState::parse(sheet_el.attr("state"));
    let root = source.required_xml(&part)?;
    WorksheetReader {
        part: &part,
        strings,
        styles,
    }
    .read(&root, &mut sheet)?;
    Ok(sheet)
}

/// The generated filter name is dropped; it is rebuilt from the auto-filter on write
fn read_defined_name(el: &XmlElement) -> Option<DefinedName> {
    let name = el.attr("name")?;
    if name == FILTER_DATABASE {
        return None;
    }
    Some(DefinedName {
        name: name.to_string(),
        refers_to: el.text(),
        local_sheet: el.attr("localSheetId").and_then(|id| id.trim().parse().ok()),
        hidden: matches!(el.attr("hidden"), Some("1" | "true")),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CellValue, Number};
    use crate::writer::package::{PackageAssembler, content_type};
    use std::io::Cursor;

    const MAIN: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";

    /// A package laid out the way other producers write it: relative and
    /// absolute targets, no styles, no shared strings.
    fn foreign_package(sheet_target: &str) -> Vec<u8> {
        let mut assembler = PackageAssembler::new();
        assembler
            .relationships("")
            .add(rel_type::OFFICE_DOCUMENT, "/book/main.xml");
        assembler
            .relationships("book/main.xml")
            .add(rel_type::WORKSHEET, sheet_target);
        let workbook = format!(
            r#"<workbook xmlns="{MAIN}" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<bookViews><workbookView activeTab="1"/></bookViews>
<sheets><sheet name="Data" sheetId="4" r:id="rId1"/><sheet name="Hidden" sheetId="7" state="hidden" r:id="rId1"/></sheets>
<definedNames><definedName name="_xlnm._FilterDatabase" localSheetId="0" hidden="1">Data!$A$1:$A$2</definedName><definedName name="Total">Data!$A$2</definedName></definedNames>
</workbook>"#
        );
        let sheet = format!(
            r#"<worksheet xmlns="{MAIN}"><sheetData><row r="1"><c r="A1" t="inlineStr"><is><t>x</t></is></c></row><row r="2"><c r="A2"><v>3</v></c></row></sheetData></worksheet>"#
        );
        assembler.add_part("book/main.xml", content_type::WORKBOOK, true, workbook.into_bytes());
        assembler.add_part("book/sheets/one.xml", content_type::WORKSHEET, true, sheet.into_bytes());
        assembler.pack_to_vec().unwrap()
    }

    #[test]
    fn test_reads_relationship_driven_layout() {
        let data = foreign_package("sheets/one.xml");
        let workbook = read_package(Cursor::new(data), &ImportOptions::default()).unwrap();
        assert_eq!(workbook.sheet_names(), vec!["Data", "Hidden"]);
        assert_eq!(workbook.active_sheet, 1);
        let data = workbook.sheet("Data").unwrap();
        assert_eq!(data.sheet_id, 4);
        assert_eq!(data.value("A1"), &CellValue::String("x".into()));
        assert_eq!(data.value("A2"), &CellValue::Number(Number::Int(3)));
        assert_eq!(workbook.sheet("Hidden").unwrap().state, SheetState::Hidden);
        assert_eq!(workbook.defined_names.len(), 1);
        assert_eq!(workbook.defined_names[0].refers_to, "Data!$A$2");
    }

    #[test]
    fn test_missing_worksheet_part_is_reported() {
        let data = foreign_package("sheets/absent.xml");
        let err = read_package(Cursor::new(data), &ImportOptions::default()).unwrap_err();
        assert!(matches!(err, XlsxError::MissingPart(part) if part == "book/sheets/absent.xml"));
    }

    #[test]
    fn test_declared_entry_size_is_capped() {
        assert_eq!(capacity_hint(0), 0);
        assert_eq!(capacity_hint(4096), 4096);
        assert_eq!(capacity_hint(u64::MAX), MAX_PREALLOC as usize);
    }

    #[test]
    fn test_not_a_zip() {
        let err = read_package(Cursor::new(b"plain text".to_vec()), &ImportOptions::default()).unwrap_err();
        assert!(matches!(err, XlsxError::Zip(_)));
    }
}
