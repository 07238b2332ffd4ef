//! Style records, their canonicalization into shared pools, and the parsed
//! style-sheet container used while reading.
//!
//! A [`Style`] bundles one of each component kind. On write every style a
//! cell uses goes through a [`StyleCollector`], which deduplicates each
//! component and each composite by structural hash and hands out dense,
//! stable indices. On read, [`ParsedStyles`] mirrors the style sheet by
//! position so that cell `s` attributes can be resolved.

mod border;
mod cell_format;
mod color;
mod fill;
mod font;
mod hash;
mod number_format;
mod parse;
mod pool;

pub use border::{Border, BorderEdge, BorderStyle};
pub use cell_format::{CellFormat, HorizontalAlignment, VERTICAL_TEXT, VerticalAlignment};
pub use color::Color;
pub use fill::{Fill, PatternType};
pub use font::{DEFAULT_FONT_NAME, DEFAULT_FONT_SIZE, Font, Underline};
pub use hash::{StableHasher, StyleComponent};
pub use number_format::{FIRST_CUSTOM_ID, FormatKind, NumberFormat, builtin_code, classify_code};
pub use parse::ParsedStyles;
pub use pool::{CanonicalPool, ManagedStyles, StyleCollector, StyleKey, canonicalize};

use std::hash::Hasher;

/// How validation failures are handled.
///
/// Values built by a caller are checked strictly. While reading a package the
/// same checks only log and fall back, so a slightly off file still loads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationMode {
    #[default]
    Strict,
    Import,
}

/// The name given to the style at index 0
pub const DEFAULT_STYLE_NAME: &str = "Normal";

/// A complete cell style
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Style {
    pub name: String,
    /// Reserved entries seeded by the collector
    pub system: bool,
    pub border: Border,
    pub fill: Fill,
    pub font: Font,
    pub number_format: NumberFormat,
    pub cell_format: CellFormat,
    pub index: Option<u32>,
}

/// Anything that can be layered onto a style with [`Style::append`]
#[derive(Debug, Clone, PartialEq)]
pub enum StyleFragment {
    Border(Border),
    Fill(Fill),
    Font(Font),
    NumberFormat(NumberFormat),
    CellFormat(CellFormat),
    Style(Box<Style>),
}

impl From<Border> for StyleFragment {
    fn from(value: Border) -> Self {
        StyleFragment::Border(value)
    }
}

impl From<Fill> for StyleFragment {
    fn from(value: Fill) -> Self {
        StyleFragment::Fill(value)
    }
}

impl From<Font> for StyleFragment {
    fn from(value: Font) -> Self {
        StyleFragment::Font(value)
    }
}

impl From<NumberFormat> for StyleFragment {
    fn from(value: NumberFormat) -> Self {
        StyleFragment::NumberFormat(value)
    }
}

impl From<CellFormat> for StyleFragment {
    fn from(value: CellFormat) -> Self {
        StyleFragment::CellFormat(value)
    }
}

impl From<Style> for StyleFragment {
    fn from(value: Style) -> Self {
        StyleFragment::Style(Box::new(value))
    }
}

impl Style {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// A style whose number format is the given code
    pub fn with_number_format(code: impl Into<String>) -> Self {
        Self {
            number_format: NumberFormat::new(code),
            ..Self::default()
        }
    }

    /// Layer `fragment` over this style, copying only the fields in which it
    /// differs from a freshly defaulted instance of the same kind.
    pub fn append(&mut self, fragment: impl Into<StyleFragment>) -> &mut Self {
        match fragment.into() {
            StyleFragment::Border(border) => self.border.append_altered(&border),
            StyleFragment::Fill(fill) => self.fill.append_altered(&fill),
            StyleFragment::Font(font) => self.font.append_altered(&font),
            StyleFragment::NumberFormat(fmt) => self.number_format.append_altered(&fmt),
            StyleFragment::CellFormat(fmt) => self.cell_format.append_altered(&fmt),
            StyleFragment::Style(style) => {
                self.border.append_altered(&style.border);
                self.fill.append_altered(&style.fill);
                self.font.append_altered(&style.font);
                self.number_format.append_altered(&style.number_format);
                self.cell_format.append_altered(&style.cell_format);
            }
        }
        self
    }

    /// Builder form of [`Style::append`]
    pub fn appended(mut self, fragment: impl Into<StyleFragment>) -> Self {
        self.append(fragment);
        self
    }

    pub fn format_kind(&self) -> FormatKind {
        self.number_format.kind()
    }

    /// True when every component is its default
    pub fn is_default(&self) -> bool {
        self.structural_hash() == Style::default().structural_hash()
    }
}

impl StyleComponent for Style {
    const KIND: &'static str = "style";

    /// The five component hashes in a fixed order; name and system flag
    /// do not take part.
    fn hash_fields(&self, hasher: &mut StableHasher) {
        hasher.write_u64(self.border.structural_hash());
        hasher.write_u64(self.fill.structural_hash());
        hasher.write_u64(self.font.structural_hash());
        hasher.write_u64(self.number_format.structural_hash());
        hasher.write_u64(self.cell_format.structural_hash());
    }

    fn index(&self) -> Option<u32> {
        self.index
    }

    fn set_index(&mut self, index: Option<u32>) {
        self.index = index;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_style_is_built_from_component_defaults() {
        let style = Style::default();
        assert!(style.name.is_empty());
        assert!(!style.system);
        assert_eq!(style.index, None);
        assert_eq!(style.font, Font::default());
        assert_eq!(style.number_format, NumberFormat::default());
        assert_eq!(style.cell_format, CellFormat::default());
        assert!(style.is_default());
        assert_eq!(style.format_kind(), FormatKind::General);
    }

    #[test]
    fn test_append_bold_keeps_number_format() {
        let mut style = Style::with_number_format("0.00");
        style.append(Font::bold());
        assert!(style.font.bold);
        assert_eq!(style.number_format.code, "0.00");
    }

    #[test]
    fn test_append_default_fragment_is_noop() {
        let mut style = Style::with_number_format("yyyy-mm-dd").appended(Fill::solid(Color::Auto));
        let before = style.clone();
        style.append(Style::default());
        style.append(Border::default());
        style.append(CellFormat::default());
        assert_eq!(style, before);
    }

    #[test]
    fn test_append_full_style_layers_each_component() {
        let modifier = Style::default()
            .appended(Font::bold())
            .appended(Border::outline(BorderStyle::Thin));
        let mut style = Style::with_number_format("0%");
        style.append(modifier);
        assert!(style.font.bold);
        assert_eq!(style.border.top.style, BorderStyle::Thin);
        assert_eq!(style.number_format.code, "0%");
    }

    #[test]
    fn test_style_hash_ignores_name_and_index() {
        let a = Style::named("Heading").appended(Font::bold());
        let mut b = Style::named("Other").appended(Font::bold());
        b.index = Some(4);
        b.system = true;
        assert_eq!(a.structural_hash(), b.structural_hash());
        assert!(Style::named("x").is_default());
        assert!(!a.is_default());
    }
}
