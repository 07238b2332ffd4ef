//! XML generators for the workbook, worksheet and style-sheet parts

use std::collections::BTreeMap;

use crate::error::Result;
use crate::model::{
    CellRange, CellRef, CellValue, ColumnInfo, FILTER_DATABASE, Number, Pane, SheetProtection,
    SheetState, Workbook, Worksheet, quote_sheet_name,
};
use crate::strings::{SHARED_STRINGS_NS, SharedStrings};
use crate::style::{ManagedStyles, StyleKey};
use crate::xml::XmlElement;

pub const MAIN_NS: &str = SHARED_STRINGS_NS;
pub const RELATIONSHIPS_NS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

/// Literal written for a non-finite number
const NUM_ERROR: &str = "#NUM!";

/// `xl/workbook.xml`; `sheet_rel_ids` holds the relationship id of each
/// sheet, in sheet order.
pub fn workbook_xml(workbook: &Workbook, sheet_rel_ids: &[String]) -> XmlElement {
    let mut root = XmlElement::new("workbook")
        .with_attr("xmlns", MAIN_NS)
        .with_attr("xmlns:r", RELATIONSHIPS_NS)
        .with_child(XmlElement::new("workbookPr"));

    let view = XmlElement::new("workbookView").with_attr_if(
        workbook.active_sheet != 0,
        "activeTab",
        workbook.active_sheet,
    );
    root.push(XmlElement::new("bookViews").with_child(view));

    let sheets = workbook.sheets().iter().zip(sheet_rel_ids).map(|(sheet, rid)| {
        XmlElement::new("sheet")
            .with_attr("name", sheet.name())
            .with_attr("sheetId", sheet.sheet_id)
            .with_attr_if(sheet.state != SheetState::Visible, "state", sheet.state.as_str())
            .with_attr("r:id", rid)
    });
    root.push(XmlElement::new("sheets").with_children(sheets));

    let mut names: Vec<XmlElement> = workbook
        .defined_names
        .iter()
        .filter(|d| d.name != FILTER_DATABASE)
        .map(|d| {
            XmlElement::new("definedName")
                .with_attr("name", &d.name)
                .with_attr_opt("localSheetId", d.local_sheet)
                .with_attr_if(d.hidden, "hidden", 1)
                .with_text(d.refers_to.as_str())
        })
        .collect();
    for (pos, sheet) in workbook.sheets().iter().enumerate() {
        if let Some(range) = &sheet.auto_filter {
            names.push(
                XmlElement::new("definedName")
                    .with_attr("name", FILTER_DATABASE)
                    .with_attr("localSheetId", pos)
                    .with_attr("hidden", 1)
                    .with_text(format!("{}!{}", quote_sheet_name(sheet.name()), range.to_absolute())),
            );
        }
    }
    if !names.is_empty() {
        root.push(XmlElement::new("definedNames").with_children(names));
    }
    root.push(XmlElement::new("calcPr").with_attr("calcId", 191029));
    root
}

/// Serial rendered with ten fixed decimals, trailing zeros dropped
pub fn serial_literal(serial: f64) -> String {
    let fixed = format!("{serial:.10}");
    fixed.trim_end_matches('0').trim_end_matches('.').to_string()
}

/// Generates one worksheet part. Strings are interned into the shared table
/// as cells are visited, in row-then-column order.
pub struct WorksheetWriter<'a> {
    pub styles: &'a ManagedStyles,
    pub strings: &'a mut SharedStrings,
}

impl WorksheetWriter<'_> {
    pub fn write(
        &mut self,
        sheet: &Worksheet,
        style_keys: &BTreeMap<CellRef, StyleKey>,
        selected: bool,
    ) -> Result<XmlElement> {
        let mut root = XmlElement::new("worksheet")
            .with_attr("xmlns", MAIN_NS)
            .with_attr("xmlns:r", RELATIONSHIPS_NS);

        let dimension = sheet
            .dimension()
            .unwrap_or_else(|| CellRange::single(CellRef::new(0, 0)));
        root.push(XmlElement::new("dimension").with_attr("ref", dimension));
        root.push(sheet_views(sheet.pane, selected));

        let custom_height = sheet.default_row_height != crate::model::DEFAULT_ROW_HEIGHT;
        root.push(
            XmlElement::new("sheetFormatPr")
                .with_attr("defaultRowHeight", sheet.default_row_height)
                .with_attr_if(custom_height, "customHeight", 1),
        );

        let cols = column_elements(sheet);
        if !cols.is_empty() {
            root.push(XmlElement::new("cols").with_children(cols));
        }

        root.push(self.sheet_data(sheet, style_keys)?);

        if let Some(protection) = &sheet.protection {
            root.push(protection_element(protection));
        }
        if let Some(range) = &sheet.auto_filter {
            root.push(XmlElement::new("autoFilter").with_attr("ref", range));
        }
        let merged = sheet.merged_ranges();
        if !merged.is_empty() {
            root.push(
                XmlElement::new("mergeCells")
                    .with_attr("count", merged.len())
                    .with_children(
                        merged
                            .iter()
                            .map(|range| XmlElement::new("mergeCell").with_attr("ref", range)),
                    ),
            );
        }
        root.push(
            XmlElement::new("pageMargins")
                .with_attr("left", 0.7)
                .with_attr("right", 0.7)
                .with_attr("top", 0.75)
                .with_attr("bottom", 0.75)
                .with_attr("header", 0.3)
                .with_attr("footer", 0.3),
        );
        Ok(root)
    }

    fn sheet_data(
        &mut self,
        sheet: &Worksheet,
        style_keys: &BTreeMap<CellRef, StyleKey>,
    ) -> Result<XmlElement> {
        let mut rows: BTreeMap<u32, Vec<XmlElement>> = BTreeMap::new();
        for (row, _) in sheet.rows() {
            rows.entry(*row).or_default();
        }
        for (at, cell) in sheet.cells() {
            let style = match style_keys.get(at) {
                Some(key) => self.styles.index_of(*key)?,
                None => 0,
            };
            let el = self.cell_element(*at, &cell.value, style);
            rows.entry(at.row).or_default().push(el);
        }

        let mut data = XmlElement::new("sheetData");
        for (row, cells) in rows {
            let info = sheet.row(row);
            let height = info
                .and_then(|i| i.height)
                .filter(|h| *h != sheet.default_row_height);
            let hidden = info.is_some_and(|i| i.hidden);
            if cells.is_empty() && height.is_none() && !hidden {
                continue;
            }
            data.push(
                XmlElement::new("row")
                    .with_attr("r", row + 1)
                    .with_attr_opt("ht", height)
                    .with_attr_if(height.is_some(), "customHeight", 1)
                    .with_attr_if(hidden, "hidden", 1)
                    .with_children(cells),
            );
        }
        Ok(data)
    }

    fn cell_element(&mut self, at: CellRef, value: &CellValue, style: u32) -> XmlElement {
        let el = XmlElement::new("c")
            .with_attr("r", at)
            .with_attr_if(style != 0, "s", style);
        let value_tag = |text: String| XmlElement::new("v").with_text(text);
        match value {
            CellValue::Empty => el,
            CellValue::Bool(flag) => el
                .with_attr("t", "b")
                .with_child(value_tag(if *flag { "1" } else { "0" }.to_string())),
            CellValue::Number(number) => number_element(el, number),
            CellValue::Date(_) | CellValue::Time(_) => {
                let serial = value.as_serial().unwrap_or_default();
                el.with_child(value_tag(serial_literal(serial)))
            }
            CellValue::Formula(formula) => {
                el.with_child(XmlElement::new("f").with_text(formula.as_str()))
            }
            CellValue::String(text) => {
                let idx = self.strings.intern(text);
                el.with_attr("t", "s").with_child(value_tag(idx.to_string()))
            }
        }
    }
}

fn number_element(el: XmlElement, number: &Number) -> XmlElement {
    if number.is_finite() {
        el.with_child(XmlElement::new("v").with_text(number.to_literal()))
    } else {
        el.with_attr("t", "e")
            .with_child(XmlElement::new("v").with_text(NUM_ERROR))
    }
}

fn sheet_views(pane: Option<Pane>, selected: bool) -> XmlElement {
    let mut view = XmlElement::new("sheetView")
        .with_attr_if(selected, "tabSelected", 1)
        .with_attr("workbookViewId", 0);
    if let Some(pane) = pane {
        let active = match (pane.rows > 0, pane.cols > 0) {
            (true, true) => "bottomRight",
            (true, false) => "bottomLeft",
            _ => "topRight",
        };
        view.push(
            XmlElement::new("pane")
                .with_attr_if(pane.cols > 0, "xSplit", pane.cols)
                .with_attr_if(pane.rows > 0, "ySplit", pane.rows)
                .with_attr("topLeftCell", pane.top_left_cell())
                .with_attr("activePane", active)
                .with_attr("state", "frozen"),
        );
        view.push(XmlElement::new("selection").with_attr("pane", active));
    }
    XmlElement::new("sheetViews").with_child(view)
}

/// One `<col>` per run of adjacent columns with identical settings
fn column_elements(sheet: &Worksheet) -> Vec<XmlElement> {
    let mut runs: Vec<(u32, u32, &ColumnInfo)> = Vec::new();
    for (&col, info) in sheet.columns() {
        if let Some((_, last, prev)) = runs.last_mut()
            && *last + 1 == col
            && *prev == info
        {
            *last = col;
            continue;
        }
        runs.push((col, col, info));
    }
    runs.into_iter()
        .filter(|(_, _, info)| info.width.is_some() || info.hidden)
        .map(|(first, last, info)| {
            XmlElement::new("col")
                .with_attr("min", first + 1)
                .with_attr("max", last + 1)
                .with_attr_opt("width", info.width)
                .with_attr_if(info.width.is_some(), "customWidth", 1)
                .with_attr_if(info.hidden, "hidden", 1)
        })
        .collect()
}

fn protection_element(protection: &SheetProtection) -> XmlElement {
    let mut el = XmlElement::new("sheetProtection")
        .with_attr_opt("password", protection.password_hash.as_deref())
        .with_attr("sheet", 1)
        .with_attr("objects", 1)
        .with_attr("scenarios", 1);
    for option in &protection.allowed {
        el.set_attr(option.attribute(), 0);
    }
    el
}

/// `xl/styles.xml` from the finalized pools
pub fn styles_xml(styles: &ManagedStyles) -> Result<XmlElement> {
    let mut root = XmlElement::new("styleSheet").with_attr("xmlns", MAIN_NS);

    let custom: Vec<XmlElement> = styles
        .custom_number_formats()
        .map(|(id, fmt)| {
            XmlElement::new("numFmt")
                .with_attr("numFmtId", id)
                .with_attr("formatCode", &fmt.code)
        })
        .collect();
    if !custom.is_empty() {
        root.push(
            XmlElement::new("numFmts")
                .with_attr("count", custom.len())
                .with_children(custom),
        );
    }

    root.push(counted("fonts", styles.fonts().iter().map(|f| f.to_element())));
    root.push(counted("fills", styles.fills().iter().map(|f| f.to_element())));
    root.push(counted("borders", styles.borders().iter().map(|b| b.to_element())));
    root.push(counted(
        "cellStyleXfs",
        [XmlElement::new("xf")
            .with_attr("numFmtId", 0)
            .with_attr("fontId", 0)
            .with_attr("fillId", 0)
            .with_attr("borderId", 0)],
    ));

    let mut xfs = Vec::with_capacity(styles.styles().len());
    for style in styles.styles() {
        let format_id = styles.number_format_id(style.number_format.index.unwrap_or(0))?;
        let font_id = style.font.index.unwrap_or(0);
        let fill_id = style.fill.index.unwrap_or(0);
        let border_id = style.border.index.unwrap_or(0);
        let alignment = style.cell_format.has_alignment();
        let protection = style.cell_format.has_protection();
        let mut xf = XmlElement::new("xf")
            .with_attr("numFmtId", format_id)
            .with_attr("fontId", font_id)
            .with_attr("fillId", fill_id)
            .with_attr("borderId", border_id)
            .with_attr("xfId", 0)
            .with_attr_if(format_id != 0, "applyNumberFormat", 1)
            .with_attr_if(font_id != 0, "applyFont", 1)
            .with_attr_if(fill_id != 0, "applyFill", 1)
            .with_attr_if(border_id != 0, "applyBorder", 1)
            .with_attr_if(alignment, "applyAlignment", 1)
            .with_attr_if(protection, "applyProtection", 1);
        if alignment {
            xf.push(style.cell_format.alignment_element());
        }
        if protection {
            xf.push(style.cell_format.protection_element());
        }
        xfs.push(xf);
    }
    root.push(counted("cellXfs", xfs));
    root.push(counted(
        "cellStyles",
        [XmlElement::new("cellStyle")
            .with_attr("name", crate::style::DEFAULT_STYLE_NAME)
            .with_attr("xfId", 0)
            .with_attr("builtinId", 0)],
    ));

    if !styles.mru_colors().is_empty() {
        let colors = styles.mru_colors().iter().map(|c| c.to_element("color"));
        root.push(
            XmlElement::new("colors").with_child(XmlElement::new("mruColors").with_children(colors)),
        );
    }
    Ok(root)
}

fn counted(name: &str, children: impl IntoIterator<Item = XmlElement>) -> XmlElement {
    let el = XmlElement::new(name).with_children(children);
    let count = el.children.len();
    el.with_attr("count", count)
}
