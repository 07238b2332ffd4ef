//! Worksheet part: cells, rows, columns and sheet-level settings

use std::collections::HashMap;

use crate::error::Result;
use crate::model::{
    CellRange, CellRef, CellValue, MAX_COLUMNS, MAX_ROWS, ProtectionOption,
    SheetProtection, Worksheet, column_index, column_letters, parse_cell_ref,
};
use crate::strings::{SharedStrings, string_item_text};
use crate::style::ParsedStyles;
use crate::xml::XmlElement;

use super::resolve::resolve_cell;

fn flag(el: &XmlElement, name: &str) -> bool {
    matches!(el.attr(name), Some("1" | "true"))
}

fn number_attr(el: &XmlElement, part: &str, name: &str) -> Option<f64> {
    let raw = el.attr(name)?;
    match raw.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => Some(value),
        _ => {
            log::warn!("{part}: ignoring unreadable {name}='{raw}' on <{}>", el.local_name());
            None
        }
    }
}

/// Master of a shared formula group
struct SharedFormula {
    anchor: CellRef,
    text: String,
}

/// Reads one worksheet document into a [`Worksheet`]
pub struct WorksheetReader<'a> {
    pub part: &'a str,
    pub strings: &'a SharedStrings,
    pub styles: &'a ParsedStyles,
}

impl WorksheetReader<'_> {
    pub fn read(&self, root: &XmlElement, sheet: &mut Worksheet) -> Result<()> {
        if let Some(format) = root.child("sheetFormatPr")
            && let Some(height) = number_attr(format, self.part, "defaultRowHeight")
        {
            sheet.default_row_height = height;
        }
        if let Some(pane) = root
            .child("sheetViews")
            .and_then(|views| views.child("sheetView"))
            .and_then(|view| view.child("pane"))
        {
            self.read_pane(pane, sheet);
        }
        if let Some(cols) = root.child("cols") {
            self.read_columns(cols, sheet);
        }
        if let Some(data) = root.child("sheetData") {
            self.read_sheet_data(data, sheet)?;
        }
        if let Some(protection) = root.child("sheetProtection") {
            sheet.protect(read_protection(protection));
        }
        if let Some(filter) = root.child("autoFilter").and_then(|f| f.attr("ref")) {
            match filter.parse::<CellRange>() {
                Ok(range) => sheet.set_auto_filter(range),
                Err(_) => log::warn!("{}: ignoring autoFilter ref '{filter}'", self.part),
            }
        }
        if let Some(merges) = root.child("mergeCells") {
            for merge in merges.children_named("mergeCell") {
                let Some(raw) = merge.attr("ref") else {
                    continue;
                };
                let merged = raw.parse::<CellRange>().and_then(|range| sheet.merge(range));
                if let Err(err) = merged {
                    log::warn!("{}: skipping merged range '{raw}': {err}", self.part);
                }
            }
        }
        log::debug!("{}: {} cells", self.part, sheet.cell_count());
        Ok(())
    }

    fn read_pane(&self, pane: &XmlElement, sheet: &mut Worksheet) {
        if !matches!(pane.attr("state"), Some("frozen" | "frozenSplit")) {
            return;
        }
        let split =
            |name: &str| number_attr(pane, self.part, name).map_or(0, |v| v.max(0.0) as u32);
        sheet.freeze_panes(split("ySplit"), split("xSplit"));
    }

    fn read_columns(&self, cols: &XmlElement, sheet: &mut Worksheet) {
        for col in cols.children_named("col") {
            let bound = |name: &str| {
                number_attr(col, self.part, name)
                    .filter(|v| *v >= 1.0 && *v <= MAX_COLUMNS as f64)
                    .map(|v| v as u32 - 1)
            };
            let (Some(min), Some(max)) = (bound("min"), bound("max")) else {
                log::warn!("{}: <col> without a usable min/max", self.part);
                continue;
            };
            let width = number_attr(col, self.part, "width");
            let hidden = flag(col, "hidden");
            if width.is_none() && !hidden {
                continue;
            }
            for idx in min..=max {
                let info = sheet.column_mut(idx);
                info.width = width;
                info.hidden = hidden;
            }
        }
    }

    fn read_sheet_data(&self, data: &XmlElement, sheet: &mut Worksheet) -> Result<()> {
        let mut shared: HashMap<String, SharedFormula> = HashMap::new();
        let mut next_row = 0u32;
        for row_el in data.children_named("row") {
            let row = number_attr(row_el, self.part, "r")
                .filter(|r| *r >= 1.0 && *r <= MAX_ROWS as f64)
                .map_or(next_row, |r| r as u32 - 1);
            next_row = row + 1;

            let height = number_attr(row_el, self.part, "ht");
            let hidden = flag(row_el, "hidden");
            if height.is_some() || hidden {
                let info = sheet.row_mut(row);
                info.height = height;
                info.hidden = hidden;
            }

            let mut next_col = 0u32;
            for cell in row_el.children_named("c") {
                let at = match cell.attr("r").and_then(parse_cell_ref) {
                    Some((r, c)) => CellRef::new(r, c),
                    None => CellRef::new(row, next_col),
                };
                next_col = at.col + 1;
                self.read_cell(cell, at, sheet, &mut shared)?;
            }
        }
        Ok(())
    }

    fn read_cell(
        &self,
        cell: &XmlElement,
        at: CellRef,
        sheet: &mut Worksheet,
        shared: &mut HashMap<String, SharedFormula>,
    ) -> Result<()> {
        let raw_type = cell.attr("t");
        let style_index = cell.attr("s").and_then(|s| s.trim().parse::<i64>().ok());

        let value = match cell.child("f").and_then(|f| self.formula(f, at, shared)) {
            Some(formula) => formula,
            None if raw_type == Some("inlineStr") => match cell.child("is") {
                Some(item) => CellValue::String(string_item_text(item)),
                None => CellValue::Empty,
            },
            None => {
                let text = cell.child("v").map(|v| v.text()).unwrap_or_default();
                resolve_cell(raw_type, &text, style_index, self.strings, self.styles)
            }
        };

        let style = match style_index {
            Some(idx) if idx != 0 => match self.styles.style(idx) {
                Ok(style) => Some(style.clone()),
                Err(err) => {
                    log::warn!("{}: cell {at}: {err}", self.part);
                    None
                }
            },
            _ => None,
        };

        if value.is_empty() && style.is_none() {
            return Ok(());
        }
        let target = sheet.set_value(at, value);
        target.style = style;
        Ok(())
    }

    /// Formula text of `<f>`, expanding references to a shared master
    fn formula(
        &self,
        f: &XmlElement,
        at: CellRef,
        shared: &mut HashMap<String, SharedFormula>,
    ) -> Option<CellValue> {
        let text = f.text();
        if f.attr("t") != Some("shared") {
            return (!text.is_empty()).then(|| CellValue::formula(text));
        }
        let si = f.attr("si")?.to_string();
        if !text.is_empty() {
            if f.attr("ref").is_some() {
                shared.insert(
                    si,
                    SharedFormula {
                        anchor: at,
                        text: text.clone(),
                    },
                );
            }
            return Some(CellValue::formula(text));
        }
        match shared.get(&si) {
            Some(master) => {
                let rows = i64::from(at.row) - i64::from(master.anchor.row);
                let cols = i64::from(at.col) - i64::from(master.anchor.col);
                Some(CellValue::formula(translate_shared_formula(&master.text, rows, cols)))
            }
            None => {
                log::warn!("{}: cell {at} uses unknown shared formula {si}", self.part);
                None
            }
        }
    }
}

fn read_protection(el: &XmlElement) -> SheetProtection {
    let allowed = ProtectionOption::ALL
        .into_iter()
        .filter(|option| el.attr(option.attribute()) == Some("0"))
        .collect();
    SheetProtection {
        password_hash: el.attr("password").map(str::to_string),
        allowed,
    }
}

/// Shift the relative references of a shared formula by `rows`/`cols`.
/// Absolute parts (`$A`, `$1`), quoted strings and function names stay put.
pub fn translate_shared_formula(formula: &str, rows: i64, cols: i64) -> String {
    thread_local! {
        static REF: regex::Regex = regex::Regex::new(
            r"(?P<sheet>(?:'[^']+'|[A-Za-z0-9_.]+)!)?(?P<col_abs>\$?)(?P<col>[A-Za-z]{1,3})(?P<row_abs>\$?)(?P<row>[0-9]+)"
        ).unwrap();
    }
    // even segments lie outside string literals
    formula
        .split('"')
        .enumerate()
        .map(|(n, segment)| {
            if n % 2 == 1 {
                segment.to_string()
            } else {
                REF.with(|re| shift_segment(re, segment, rows, cols))
            }
        })
        .collect::<Vec<_>>()
        .join("\"")
}

fn shift_segment(re: &regex::Regex, segment: &str, rows: i64, cols: i64) -> String {
    let mut out = String::with_capacity(segment.len());
    let mut last = 0;
    for caps in re.captures_iter(segment) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        let before = segment[..whole.start()].chars().next_back();
        let after = segment[whole.end()..].chars().next();
        let is_name = before.is_some_and(|c| c.is_alphanumeric() || c == '_')
            || after.is_some_and(|c| c == '(' || c.is_alphanumeric() || c == '_');
        let col = caps.name("col").and_then(|m| column_index(m.as_str()));
        let row = caps.name("row").and_then(|m| m.as_str().parse::<u32>().ok());
        let (Some(col), Some(row)) = (col, row) else {
            continue;
        };
        if is_name || row == 0 {
            continue;
        }

        let col_abs = caps.name("col_abs").is_some_and(|m| !m.as_str().is_empty());
        let row_abs = caps.name("row_abs").is_some_and(|m| !m.as_str().is_empty());
        let new_col = if col_abs {
            col
        } else {
            (i64::from(col) + cols).clamp(0, i64::from(MAX_COLUMNS) - 1) as u32
        };
        let new_row = if row_abs {
            row
        } else {
            (i64::from(row) + rows).clamp(1, i64::from(MAX_ROWS)) as u32
        };

        out.push_str(&segment[last..whole.start()]);
        if let Some(sheet) = caps.name("sheet") {
            out.push_str(sheet.as_str());
        }
        if col_abs {
            out.push('$');
        }
        out.push_str(&column_letters(new_col));
        if row_abs {
            out.push('$');
        }
        out.push_str(&new_row.to_string());
        last = whole.end();
    }
    out.push_str(&segment[last..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Number, Pane};

    fn read(body: &str) -> Worksheet {
        let xml = format!(
            r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">{body}</worksheet>"#
        );
        let root = XmlElement::parse("xl/worksheets/sheet1.xml", xml.as_bytes()).unwrap();
        let mut strings = SharedStrings::new();
        strings.intern("first");
        let styles = ParsedStyles::default();
        let mut sheet = Worksheet::new("Sheet1").unwrap();
        WorksheetReader {
            part: "xl/worksheets/sheet1.xml",
            strings: &strings,
            styles: &styles,
        }
        .read(&root, &mut sheet)
        .unwrap();
        sheet
    }

    #[test]
    fn test_translate_shared_formula() {
        assert_eq!(translate_shared_formula("A1+B1", 1, 0), "A2+B2");
        assert_eq!(translate_shared_formula("$A1+B$1", 2, 1), "$A3+C$1");
        assert_eq!(translate_shared_formula("SUM(A1:A3)", 0, 2), "SUM(C1:C3)");
        assert_eq!(translate_shared_formula("'My Sheet'!B2*2", 1, 0), "'My Sheet'!B3*2");
        assert_eq!(translate_shared_formula("LOG10(A1)", 1, 0), "LOG10(A2)");
        assert_eq!(translate_shared_formula("A1&\"B1\"", 1, 0), "A2&\"B1\"");
        assert_eq!(translate_shared_formula("A1", -5, -5), "A1");
    }

    #[test]
    fn test_cells_with_and_without_references() {
        let sheet = read(
            r#"<sheetData>
<row r="2"><c r="B2" t="s"><v>0</v></c><c><v>5</v></c></row>
<row><c t="inlineStr"><is><t>inline</t></is></c><c t="b"><v>1</v></c></row>
<row r="5"><c r="A5"/><c r="B5" t="e"><v>#REF!</v></c></row>
</sheetData>"#,
        );
        assert_eq!(sheet.value("B2"), &CellValue::String("first".into()));
        assert_eq!(sheet.value("C2"), &CellValue::Number(Number::Int(5)));
        assert_eq!(sheet.value("A3"), &CellValue::String("inline".into()));
        assert_eq!(sheet.value("B3"), &CellValue::Bool(true));
        assert_eq!(sheet.value("B5"), &CellValue::String("#REF!".into()));
        // empty unstyled cells are not kept
        assert!(sheet.cell(CellRef::new(4, 0)).is_none());
        assert_eq!(sheet.cell_count(), 5);
    }

    #[test]
    fn test_unreadable_address_takes_next_column() {
        let sheet = read(
            r#"<sheetData><row r="1"><c r="A1"><v>1</v></c><c r="MWLQKWZ1"><v>2</v></c><c r="D1"><v>4</v></c></row></sheetData>"#,
        );
        assert_eq!(sheet.value("B1"), &CellValue::Number(Number::Int(2)));
        assert_eq!(sheet.value("D1"), &CellValue::Number(Number::Int(4)));
        assert_eq!(sheet.cell_count(), 3);
    }

    #[test]
    fn test_shared_formula_group() {
        let sheet = read(
            r#"<sheetData>
<row r="1"><c r="C1"><f t="shared" ref="C1:C3" si="0">A1*B1</f><v>2</v></c></row>
<row r="2"><c r="C2"><f t="shared" si="0"/><v>6</v></c></row>
<row r="3"><c r="C3"><f t="shared" si="0"/><v>12</v></c><c r="D3"><f>SUM(C1:C3)</f></c></row>
</sheetData>"#,
        );
        assert_eq!(sheet.value("C1"), &CellValue::Formula("A1*B1".into()));
        assert_eq!(sheet.value("C2"), &CellValue::Formula("A2*B2".into()));
        assert_eq!(sheet.value("C3"), &CellValue::Formula("A3*B3".into()));
        assert_eq!(sheet.value("D3"), &CellValue::Formula("SUM(C1:C3)".into()));
    }

    #[test]
    fn test_sheet_settings() {
        let sheet = read(
            r#"<sheetViews><sheetView workbookViewId="0"><pane ySplit="1" topLeftCell="A2" state="frozen"/></sheetView></sheetViews>
<sheetFormatPr defaultRowHeight="18"/>
<cols><col min="2" max="3" width="25" customWidth="1"/><col min="5" max="5" hidden="1"/><col min="6" max="6" style="1"/></cols>
<sheetData><row r="4" ht="30" customHeight="1"/><row r="7" hidden="1"/></sheetData>
<sheetProtection password="CBEB" sheet="1" sort="0" autoFilter="0"/>
<autoFilter ref="A1:C9"/>
<mergeCells count="2"><mergeCell ref="A1:B1"/><mergeCell ref="oops"/></mergeCells>"#,
        );
        assert_eq!(sheet.pane, Some(Pane { rows: 1, cols: 0 }));
        assert_eq!(sheet.default_row_height, 18.0);
        assert_eq!(sheet.column(1).and_then(|c| c.width), Some(25.0));
        assert_eq!(sheet.column(2).and_then(|c| c.width), Some(25.0));
        assert!(sheet.column(4).is_some_and(|c| c.hidden));
        assert!(sheet.column(5).is_none());
        assert_eq!(sheet.row(3).and_then(|r| r.height), Some(30.0));
        assert!(sheet.row(6).is_some_and(|r| r.hidden));
        let protection = sheet.protection.as_ref().unwrap();
        assert_eq!(protection.password_hash.as_deref(), Some("CBEB"));
        assert_eq!(protection.allowed.len(), 2);
        assert!(protection.allowed.contains(&ProtectionOption::Sort));
        assert_eq!(sheet.auto_filter, Some("A1:C9".parse::<CellRange>().unwrap()));
        assert_eq!(sheet.merged_ranges(), &["A1:B1".parse::<CellRange>().unwrap()]);
    }
}
