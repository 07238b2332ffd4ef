use std::hash::Hasher;

use super::ValidationMode;
use super::hash::{StableHasher, StyleComponent};
use crate::error::{Result, XlsxError};
use crate::xml::XmlElement;

/// Rotation value meaning "letters stacked vertically"
pub const VERTICAL_TEXT: u16 = 255;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HorizontalAlignment {
    #[default]
    General,
    Left,
    Center,
    Right,
    Fill,
    Justify,
    CenterContinuous,
    Distributed,
}

impl HorizontalAlignment {
    pub fn as_str(&self) -> &'static str {
        match self {
            HorizontalAlignment::General => "general",
            HorizontalAlignment::Left => "left",
            HorizontalAlignment::Center => "center",
            HorizontalAlignment::Right => "right",
            HorizontalAlignment::Fill => "fill",
            HorizontalAlignment::Justify => "justify",
            HorizontalAlignment::CenterContinuous => "centerContinuous",
            HorizontalAlignment::Distributed => "distributed",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        Some(match raw {
            "general" => HorizontalAlignment::General,
            "left" => HorizontalAlignment::Left,
            "center" => HorizontalAlignment::Center,
            "right" => HorizontalAlignment::Right,
            "fill" => HorizontalAlignment::Fill,
            "justify" => HorizontalAlignment::Justify,
            "centerContinuous" => HorizontalAlignment::CenterContinuous,
            "distributed" => HorizontalAlignment::Distributed,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VerticalAlignment {
    Top,
    Center,
    #[default]
    Bottom,
    Justify,
    Distributed,
}

impl VerticalAlignment {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerticalAlignment::Top => "top",
            VerticalAlignment::Center => "center",
            VerticalAlignment::Bottom => "bottom",
            VerticalAlignment::Justify => "justify",
            VerticalAlignment::Distributed => "distributed",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        Some(match raw {
            "top" => VerticalAlignment::Top,
            "center" => VerticalAlignment::Center,
            "bottom" => VerticalAlignment::Bottom,
            "justify" => VerticalAlignment::Justify,
            "distributed" => VerticalAlignment::Distributed,
            _ => return None,
        })
    }
}

/// Alignment and protection flags of a cell-format record
#[derive(Debug, Clone, PartialEq)]
pub struct CellFormat {
    pub horizontal: HorizontalAlignment,
    pub vertical: VerticalAlignment,
    pub wrap_text: bool,
    pub shrink_to_fit: bool,
    pub indent: u32,
    rotation: u16,
    pub locked: bool,
    pub hidden: bool,
    pub index: Option<u32>,
}

impl Default for CellFormat {
    fn default() -> Self {
        Self {
            horizontal: HorizontalAlignment::General,
            vertical: VerticalAlignment::Bottom,
            wrap_text: false,
            shrink_to_fit: false,
            indent: 0,
            rotation: 0,
            locked: true,
            hidden: false,
            index: None,
        }
    }
}

impl CellFormat {
    pub fn rotation(&self) -> u16 {
        self.rotation
    }

    /// 0..=90 rotates counter-clockwise, 91..=180 clockwise by `value - 90`,
    /// and 255 stacks the text vertically.
    pub fn set_rotation(&mut self, degrees: u16, mode: ValidationMode) -> Result<()> {
        if degrees <= 180 || degrees == VERTICAL_TEXT {
            self.rotation = degrees;
            return Ok(());
        }
        let err = XlsxError::Validation(format!("text rotation {degrees} outside 0..=180 or 255"));
        match mode {
            ValidationMode::Strict => Err(err),
            ValidationMode::Import => {
                log::warn!("{err}, keeping {}", self.rotation);
                Ok(())
            }
        }
    }

    pub fn with_rotation(mut self, degrees: u16) -> Result<Self> {
        self.set_rotation(degrees, ValidationMode::Strict)?;
        Ok(self)
    }

    pub fn has_alignment(&self) -> bool {
        let fresh = CellFormat::default();
        self.horizontal != fresh.horizontal
            || self.vertical != fresh.vertical
            || self.wrap_text
            || self.shrink_to_fit
            || self.indent != 0
            || self.rotation != 0
    }

    pub fn has_protection(&self) -> bool {
        !self.locked || self.hidden
    }

    pub fn append_altered(&mut self, other: &CellFormat) {
        let fresh = CellFormat::default();
        if other.horizontal != fresh.horizontal {
            self.horizontal = other.horizontal;
        }
        if other.vertical != fresh.vertical {
            self.vertical = other.vertical;
        }
        if other.wrap_text != fresh.wrap_text {
            self.wrap_text = other.wrap_text;
        }
        if other.shrink_to_fit != fresh.shrink_to_fit {
            self.shrink_to_fit = other.shrink_to_fit;
        }
        if other.indent != fresh.indent {
            self.indent = other.indent;
        }
        if other.rotation != fresh.rotation {
            self.rotation = other.rotation;
        }
        if other.locked != fresh.locked {
            self.locked = other.locked;
        }
        if other.hidden != fresh.hidden {
            self.hidden = other.hidden;
        }
    }

    /// Read the `<alignment>` and `<protection>` children of an `<xf>`
    pub fn from_xf(xf: &XmlElement, mode: ValidationMode) -> Result<CellFormat> {
        let mut format = CellFormat::default();
        let on = |el: &XmlElement, name: &str| el.attr(name).is_some_and(|v| v == "1" || v == "true");

        if let Some(align) = xf.child("alignment") {
            if let Some(raw) = align.attr("horizontal") {
                format.horizontal = HorizontalAlignment::parse(raw).unwrap_or_else(|| {
                    log::warn!("unknown horizontal alignment '{raw}'");
                    HorizontalAlignment::General
                });
            }
            if let Some(raw) = align.attr("vertical") {
                format.vertical = VerticalAlignment::parse(raw).unwrap_or_else(|| {
                    log::warn!("unknown vertical alignment '{raw}'");
                    VerticalAlignment::Bottom
                });
            }
            format.wrap_text = on(align, "wrapText");
            format.shrink_to_fit = on(align, "shrinkToFit");
            format.indent = align.attr("indent").and_then(|v| v.parse().ok()).unwrap_or(0);
            if let Some(rotation) = align.attr("textRotation").and_then(|v| v.parse().ok()) {
                format.set_rotation(rotation, mode)?;
            }
        }
        if let Some(protection) = xf.child("protection") {
            format.locked = protection
                .attr("locked")
                .is_none_or(|v| v == "1" || v == "true");
            format.hidden = on(protection, "hidden");
        }
        Ok(format)
    }

    pub fn alignment_element(&self) -> XmlElement {
        let fresh = CellFormat::default();
        XmlElement::new("alignment")
            .with_attr_if(self.horizontal != fresh.horizontal, "horizontal", self.horizontal.as_str())
            .with_attr_if(self.vertical != fresh.vertical, "vertical", self.vertical.as_str())
            .with_attr_if(self.rotation != 0, "textRotation", self.rotation)
            .with_attr_if(self.wrap_text, "wrapText", 1)
            .with_attr_if(self.indent != 0, "indent", self.indent)
            .with_attr_if(self.shrink_to_fit, "shrinkToFit", 1)
    }

    pub fn protection_element(&self) -> XmlElement {
        XmlElement::new("protection")
            .with_attr_if(!self.locked, "locked", 0)
            .with_attr_if(self.hidden, "hidden", 1)
    }
}

impl StyleComponent for CellFormat {
    const KIND: &'static str = "cell format";

    fn hash_fields(&self, hasher: &mut StableHasher) {
        hasher.write_str(self.horizontal.as_str());
        hasher.write_str(self.vertical.as_str());
        hasher.write_bool(self.wrap_text);
        hasher.write_bool(self.shrink_to_fit);
        hasher.write_u32(self.indent);
        hasher.write_u32(u32::from(self.rotation));
        hasher.write_bool(self.locked);
        hasher.write_bool(self.hidden);
    }

    fn index(&self) -> Option<u32> {
        self.index
    }

    fn set_index(&mut self, index: Option<u32>) {
        self.index = index;
    }
}
