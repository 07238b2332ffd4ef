//! Package writer: model to OOXML parts to zip

pub mod package;
pub mod parts;

use std::collections::BTreeMap;
use std::io::{Seek, Write};

use chrono::{NaiveTime, Utc};

use crate::config::ExportOptions;
use crate::error::{Result, XlsxError};
use crate::metadata;
use crate::model::{Cell, CellRef, CellValue, Workbook, Worksheet};
use crate::strings::SharedStrings;
use crate::style::{FormatKind, NumberFormat, Style, StyleCollector, StyleKey};

use self::package::{PackageAssembler, content_type, rel_type};
use self::parts::WorksheetWriter;

pub const WORKBOOK_PART: &str = "xl/workbook.xml";
pub const STYLES_PART: &str = "xl/styles.xml";
pub const SHARED_STRINGS_PART: &str = "xl/sharedStrings.xml";

/// Built-in `m/d/yy h:mm`
const DATE_TIME_FORMAT_ID: u32 = 22;
/// Built-in `mm-dd-yy`
const DATE_FORMAT_ID: u32 = 14;
/// Built-in `h:mm:ss`
const TIME_FORMAT_ID: u32 = 21;

fn worksheet_part(n: usize) -> String {
    format!("xl/worksheets/sheet{n}.xml")
}

/// The style a cell is written with. Temporal values whose format would
/// display them as plain numbers get a built-in date or time format.
fn effective_style(cell: &Cell) -> Option<Style> {
    let kind = cell.style.as_ref().map_or(FormatKind::General, Style::format_kind);
    let format_id = match &cell.value {
        CellValue::Date(value) if kind != FormatKind::Date => {
            if value.time() == NaiveTime::MIN {
                DATE_FORMAT_ID
            } else {
                DATE_TIME_FORMAT_ID
            }
        }
        CellValue::Time(_) if kind != FormatKind::Time => TIME_FORMAT_ID,
        _ => return cell.style.clone(),
    };
    let mut style = cell.style.clone().unwrap_or_default();
    style.number_format = NumberFormat::builtin(format_id).unwrap_or_default();
    Some(style)
}

/// Per-sheet style keys, and the collector they were registered with
fn collect_styles(
    sheets: &[Worksheet],
    workbook: &Workbook,
) -> (StyleCollector, Vec<BTreeMap<CellRef, StyleKey>>) {
    let mut collector = StyleCollector::new();
    let keys = sheets
        .iter()
        .map(|sheet| {
            sheet
                .cells()
                .filter_map(|(at, cell)| {
                    effective_style(cell).map(|style| (*at, collector.add(&style)))
                })
                .collect()
        })
        .collect();
    for color in &workbook.mru_colors {
        collector.add_mru_color(color.clone());
    }
    (collector, keys)
}

/// Write `workbook` as an OOXML package into `writer`
pub fn write_package<W: Write + Seek>(
    workbook: &Workbook,
    options: &ExportOptions,
    writer: W,
) -> Result<W> {
    if workbook.sheets().is_empty() {
        return Err(XlsxError::Validation(
            "a workbook needs at least one sheet".to_string(),
        ));
    }

    // merged areas are normalized on copies; the caller's model is untouched
    let sheets: Vec<Worksheet> = workbook
        .sheets()
        .iter()
        .map(|sheet| {
            let mut sheet = sheet.clone();
            sheet.resolve_merged_cells();
            sheet
        })
        .collect();

    let (collector, style_keys) = collect_styles(&sheets, workbook);
    let styles = collector.finish();
    let mut strings = SharedStrings::new();
    let mut assembler = PackageAssembler::new().with_compression_level(options.compression_level);

    let root_rels = assembler.relationships("");
    root_rels.add(rel_type::OFFICE_DOCUMENT, WORKBOOK_PART);
    root_rels.add(rel_type::CORE_PROPERTIES, metadata::CORE_PART);
    root_rels.add(rel_type::EXTENDED_PROPERTIES, metadata::APP_PART);

    let mut sheet_rel_ids = Vec::with_capacity(sheets.len());
    let mut sheet_documents = Vec::with_capacity(sheets.len());
    for (pos, (sheet, keys)) in sheets.iter().zip(&style_keys).enumerate() {
        let selected = pos == workbook.active_sheet;
        let xml = WorksheetWriter {
            styles: &styles,
            strings: &mut strings,
        }
        .write(sheet, keys, selected)?;
        let target = format!("worksheets/sheet{}.xml", pos + 1);
        sheet_rel_ids.push(
            assembler
                .relationships(WORKBOOK_PART)
                .add(rel_type::WORKSHEET, target),
        );
        sheet_documents.push(xml.to_document());
    }
    let workbook_rels = assembler.relationships(WORKBOOK_PART);
    workbook_rels.add(rel_type::STYLES, "styles.xml");
    workbook_rels.add(rel_type::SHARED_STRINGS, "sharedStrings.xml");

    assembler.add_part(
        WORKBOOK_PART,
        content_type::WORKBOOK,
        false,
        parts::workbook_xml(workbook, &sheet_rel_ids).to_document(),
    );
    for (pos, document) in sheet_documents.into_iter().enumerate() {
        assembler.add_part(&worksheet_part(pos + 1), content_type::WORKSHEET, true, document);
    }
    assembler.add_part(
        STYLES_PART,
        content_type::STYLES,
        true,
        parts::styles_xml(&styles)?.to_document(),
    );
    assembler.add_part(
        SHARED_STRINGS_PART,
        content_type::SHARED_STRINGS,
        true,
        strings.to_xml().to_document(),
    );

    let now = Utc::now().naive_utc();
    assembler.add_part(
        metadata::CORE_PART,
        content_type::CORE_PROPERTIES,
        true,
        metadata::core_xml(&workbook.properties, now).to_document(),
    );
    assembler.add_part(
        metadata::APP_PART,
        content_type::EXTENDED_PROPERTIES,
        true,
        metadata::app_xml(
            &workbook.properties,
            &options.application,
            &workbook.sheet_names(),
        )
        .to_document(),
    );

    log::debug!(
        "writing {} sheets, {} styles, {} shared strings ({} references)",
        sheets.len(),
        styles.styles().len(),
        strings.unique_count(),
        strings.total_count()
    );
    assembler.pack(writer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::Font;
    use chrono::{NaiveDate, TimeDelta};

    #[test]
    fn test_temporal_values_get_a_display_format() {
        let day = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let midnight = Cell::new(day);
        assert_eq!(
            effective_style(&midnight).unwrap().number_format.builtin_id(),
            Some(DATE_FORMAT_ID)
        );

        let stamped = Cell::styled(day.and_hms_opt(9, 0, 0).unwrap(), Style::default().appended(Font::bold()));
        let style = effective_style(&stamped).unwrap();
        assert_eq!(style.number_format.builtin_id(), Some(DATE_TIME_FORMAT_ID));
        assert!(style.font.bold);

        let time = Cell::new(TimeDelta::minutes(90));
        assert_eq!(
            effective_style(&time).unwrap().number_format.builtin_id(),
            Some(TIME_FORMAT_ID)
        );
    }

    #[test]
    fn test_explicit_formats_are_kept() {
        let day = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let cell = Cell::styled(day, Style::with_number_format("yyyy-mm-dd"));
        assert_eq!(effective_style(&cell).unwrap().number_format.code, "yyyy-mm-dd");
        assert!(effective_style(&Cell::new(1i32)).is_none());
    }

    #[test]
    fn test_empty_workbook_is_rejected() {
        let err = write_package(
            &Workbook::new(),
            &ExportOptions::default(),
            std::io::Cursor::new(Vec::new()),
        )
        .unwrap_err();
        assert!(matches!(err, XlsxError::Validation(_)));
    }
}
