//! Read-side mirror of `styles.xml`

use std::collections::{BTreeSet, HashMap};

use super::number_format::{FIRST_CUSTOM_ID, FormatKind, builtin_code};
use super::{
    Border, CellFormat, Color, Fill, Font, NumberFormat, Style, StyleComponent, ValidationMode,
};
use crate::error::{Result, XlsxError};
use crate::xml::XmlElement;

/// Components of a parsed style sheet, addressed the way cells and
/// `<xf>` records address them: by position, or by `numFmtId`.
#[derive(Debug, Clone, Default)]
pub struct ParsedStyles {
    custom_formats: HashMap<u32, NumberFormat>,
    undefined_formats: BTreeSet<i64>,
    borders: Vec<Border>,
    fills: Vec<Fill>,
    fonts: Vec<Font>,
    cell_formats: Vec<CellFormat>,
    mru_colors: Vec<Color>,
    styles: Vec<Style>,
}

fn list<'a>(root: &'a XmlElement, container: &str, item: &'a str) -> Vec<&'a XmlElement> {
    root.child(container)
        .map(|c| c.children_named(item).collect())
        .unwrap_or_default()
}

fn numeric_attr(el: &XmlElement, name: &str) -> Option<i64> {
    el.attr(name).and_then(|v| v.trim().parse().ok())
}

impl ParsedStyles {
    /// Parse the root of a `styles.xml` part
    pub fn parse(part: &str, root: &XmlElement) -> Result<ParsedStyles> {
        if root.local_name() != "styleSheet" {
            return Err(XlsxError::format(
                part,
                format!("expected styleSheet root, found {}", root.local_name()),
            ));
        }
        let mode = ValidationMode::Import;
        let mut parsed = ParsedStyles::default();

        for fmt in list(root, "numFmts", "numFmt") {
            let (Some(id), Some(code)) = (numeric_attr(fmt, "numFmtId"), fmt.attr("formatCode"))
            else {
                log::warn!("{part}: numFmt without id or code skipped");
                continue;
            };
            match u32::try_from(id) {
                Ok(id) => {
                    let mut format = NumberFormat::new(code);
                    format.index = Some(id);
                    parsed.custom_formats.insert(id, format);
                }
                Err(_) => {
                    parsed.undefined_formats.insert(id);
                }
            }
        }
        for (pos, el) in list(root, "borders", "border").into_iter().enumerate() {
            let mut border = Border::from_element(el, mode)?;
            border.index = Some(pos as u32);
            parsed.borders.push(border);
        }
        for (pos, el) in list(root, "fills", "fill").into_iter().enumerate() {
            let mut fill = Fill::from_element(el, mode)?;
            fill.index = Some(pos as u32);
            parsed.fills.push(fill);
        }
        for (pos, el) in list(root, "fonts", "font").into_iter().enumerate() {
            let mut font = Font::from_element(el, mode)?;
            font.index = Some(pos as u32);
            parsed.fonts.push(font);
        }
        if let Some(mru) = root.child("colors").and_then(|c| c.child("mruColors")) {
            for el in mru.children_named("color") {
                if let Some(color) = Color::from_element(el, mode)? {
                    parsed.mru_colors.push(color);
                }
            }
        }
        let names = cell_style_names(root);
        for (pos, xf) in list(root, "cellXfs", "xf").into_iter().enumerate() {
            let mut cell_format = CellFormat::from_xf(xf, mode)?;
            cell_format.index = Some(pos as u32);
            let style = parsed.resolve_xf(part, pos, xf, cell_format, &names);
            parsed.cell_formats.push(style.cell_format.clone());
            parsed.styles.push(style);
        }

        log::debug!(
            "{part}: {} cell formats, {} fonts, {} fills, {} borders, {} custom number formats",
            parsed.styles.len(),
            parsed.fonts.len(),
            parsed.fills.len(),
            parsed.borders.len(),
            parsed.custom_formats.len()
        );
        Ok(parsed)
    }

    /// Build the composite for one `<xf>`, substituting defaults for any
    /// reference that does not resolve
    fn resolve_xf(
        &mut self,
        part: &str,
        pos: usize,
        xf: &XmlElement,
        cell_format: CellFormat,
        names: &HashMap<i64, String>,
    ) -> Style {
        let border_id = numeric_attr(xf, "borderId").unwrap_or(0);
        let fill_id = numeric_attr(xf, "fillId").unwrap_or(0);
        let font_id = numeric_attr(xf, "fontId").unwrap_or(0);
        let format_id = numeric_attr(xf, "numFmtId").unwrap_or(0);

        let border = component_or_default(part, pos, self.border(border_id));
        let fill = component_or_default(part, pos, self.fill(fill_id));
        let font = component_or_default(part, pos, self.font(font_id));
        let number_format = match self.number_format(format_id) {
            Ok(fmt) => fmt,
            Err(_) => {
                log::warn!("{part}: xf {pos} uses undefined number format {format_id}");
                self.undefined_formats.insert(format_id);
                NumberFormat::default()
            }
        };
        let name = numeric_attr(xf, "xfId")
            .and_then(|id| names.get(&id).cloned())
            .unwrap_or_default();

        Style {
            name,
            system: false,
            border,
            fill,
            font,
            number_format,
            cell_format,
            index: Some(pos as u32),
        }
    }

    fn positional<'a, T: StyleComponent>(items: &'a [T], index: i64) -> Result<&'a T> {
        usize::try_from(index)
            .ok()
            .and_then(|i| items.get(i))
            .ok_or_else(|| XlsxError::lookup(T::KIND, index))
    }

    pub fn border(&self, index: i64) -> Result<&Border> {
        Self::positional(&self.borders, index)
    }

    pub fn fill(&self, index: i64) -> Result<&Fill> {
        Self::positional(&self.fills, index)
    }

    pub fn font(&self, index: i64) -> Result<&Font> {
        Self::positional(&self.fonts, index)
    }

    pub fn cell_format(&self, index: i64) -> Result<&CellFormat> {
        Self::positional(&self.cell_formats, index)
    }

    /// Composite style of the `cellXfs` row a cell's `s` attribute points at
    pub fn style(&self, index: i64) -> Result<&Style> {
        Self::positional(&self.styles, index)
    }

    /// Number format by declared id: built-ins come from the fixed table,
    /// everything else must have been declared in `numFmts`.
    pub fn number_format(&self, id: i64) -> Result<NumberFormat> {
        let Ok(id) = u32::try_from(id) else {
            return Err(XlsxError::lookup("number format", id));
        };
        if let Some(custom) = self.custom_formats.get(&id) {
            return Ok(custom.clone());
        }
        if id < FIRST_CUSTOM_ID
            && let Some(code) = builtin_code(id)
        {
            let mut format = NumberFormat::new(code);
            format.index = Some(id);
            return Ok(format);
        }
        Err(XlsxError::lookup("number format", id))
    }

    /// Ids referenced or declared without a usable definition
    pub fn undefined_formats(&self) -> impl Iterator<Item = i64> + '_ {
        self.undefined_formats.iter().copied()
    }

    /// Kind of the number format applied by a cell's style; `General` for
    /// unknown or missing styles.
    pub fn format_kind(&self, style_index: Option<i64>) -> FormatKind {
        style_index
            .and_then(|idx| self.style(idx).ok())
            .map_or(FormatKind::General, |s| s.number_format.kind())
    }

    pub fn styles(&self) -> &[Style] {
        &self.styles
    }

    pub fn borders(&self) -> &[Border] {
        &self.borders
    }

    pub fn fills(&self) -> &[Fill] {
        &self.fills
    }

    pub fn fonts(&self) -> &[Font] {
        &self.fonts
    }

    pub fn mru_colors(&self) -> &[Color] {
        &self.mru_colors
    }
}

fn component_or_default<T: StyleComponent + Default>(part: &str, xf: usize, found: Result<&T>) -> T {
    match found {
        Ok(component) => component.clone(),
        Err(err) => {
            log::warn!("{part}: xf {xf}: {err}, using a default {}", T::KIND);
            T::default()
        }
    }
}

/// Names of the `cellStyles` entries keyed by the `cellStyleXfs` position
fn cell_style_names(root: &XmlElement) -> HashMap<i64, String> {
    list(root, "cellStyles", "cellStyle")
        .into_iter()
        .filter_map(|cs| Some((numeric_attr(cs, "xfId")?, cs.attr("name")?.to_string())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::{BorderStyle, PatternType};

    const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <numFmts count="2">
    <numFmt numFmtId="164" formatCode="yyyy\-mm\-dd"/>
    <numFmt numFmtId="165" formatCode="0.000"/>
  </numFmts>
  <fonts count="2">
    <font><sz val="11"/><name val="Calibri"/><family val="2"/></font>
    <font><b/><sz val="11"/><name val="Calibri"/><family val="2"/></font>
  </fonts>
  <fills count="2">
    <fill><patternFill patternType="none"/></fill>
    <fill><patternFill patternType="gray125"/></fill>
  </fills>
  <borders count="2">
    <border><left/><right/><top/><bottom/><diagonal/></border>
    <border><left style="thin"/><right style="thin"/><top/><bottom/><diagonal/></border>
  </borders>
  <cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs>
  <cellXfs count="6">
    <xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/>
    <xf numFmtId="164" fontId="1" fillId="0" borderId="1" xfId="0" applyNumberFormat="1"/>
    <xf numFmtId="21" fontId="0" fillId="0" borderId="0"/>
    <xf numFmtId="7" fontId="9" fillId="4" borderId="0"/>
    <xf numFmtId="165" fontId="0" fillId="1" borderId="0"><alignment wrapText="1"/></xf>
    <xf numFmtId="-3" fontId="0" fillId="0" borderId="0"/>
  </cellXfs>
  <cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles>
  <colors><mruColors><color rgb="FF00B050"/></mruColors></colors>
</styleSheet>"#;

    fn parsed() -> ParsedStyles {
        let root = XmlElement::parse("xl/styles.xml", STYLES.as_bytes()).unwrap();
        ParsedStyles::parse("xl/styles.xml", &root).unwrap()
    }

    #[test]
    fn test_positional_components() {
        let styles = parsed();
        assert_eq!(styles.fonts().len(), 2);
        assert!(styles.font(1).unwrap().bold);
        assert_eq!(styles.fill(1).unwrap().pattern, PatternType::Gray125);
        assert_eq!(styles.border(1).unwrap().left.style, BorderStyle::Thin);
        assert_eq!(styles.mru_colors(), &[Color::Rgb("FF00B050".into())]);
        assert!(matches!(
            styles.border(5),
            Err(XlsxError::Lookup { kind: "border", index: 5 })
        ));
        assert!(styles.font(-1).is_err());
    }

    #[test]
    fn test_cell_xfs_resolve_to_styles() {
        let styles = parsed();
        let date = styles.style(1).unwrap();
        assert_eq!(date.number_format.code, "yyyy\\-mm\\-dd");
        assert_eq!(date.format_kind(), FormatKind::Date);
        assert!(date.font.bold);
        assert_eq!(date.name, "Normal");
        assert_eq!(styles.format_kind(Some(2)), FormatKind::Time);
        assert_eq!(styles.format_kind(Some(4)), FormatKind::Number);
        assert!(styles.style(4).unwrap().cell_format.wrap_text);
        assert_eq!(styles.format_kind(None), FormatKind::General);
        assert_eq!(styles.format_kind(Some(42)), FormatKind::General);
    }

    #[test]
    fn test_missing_references_fall_back_to_defaults() {
        let styles = parsed();
        let broken = styles.style(3).unwrap();
        assert_eq!(broken.font, Font::default());
        assert_eq!(broken.fill, Fill::default());
        assert!(broken.number_format.is_general());
        let undefined: Vec<i64> = styles.undefined_formats().collect();
        assert_eq!(undefined, vec![-3, 7]);
    }

    #[test]
    fn test_number_format_lookup_by_id() {
        let styles = parsed();
        assert_eq!(styles.number_format(165).unwrap().code, "0.000");
        assert_eq!(styles.number_format(14).unwrap().code, "mm-dd-yy");
        assert!(styles.number_format(7).is_err());
        assert!(styles.number_format(300).is_err());
        assert!(styles.number_format(-1).is_err());
    }

    #[test]
    fn test_wrong_root_is_a_format_error() {
        let root = XmlElement::parse("xl/styles.xml", b"<workbook/>").unwrap();
        assert!(matches!(
            ParsedStyles::parse("xl/styles.xml", &root),
            Err(XlsxError::Format { .. })
        ));
    }
}
