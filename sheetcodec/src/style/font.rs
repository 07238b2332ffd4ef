use std::hash::Hasher;

use super::ValidationMode;
use super::color::{Color, hash_opt_color};
use super::hash::{StableHasher, StyleComponent};
use crate::error::{Result, XlsxError};
use crate::xml::XmlElement;

pub const DEFAULT_FONT_NAME: &str = "Calibri";
pub const DEFAULT_FONT_SIZE: f64 = 11.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Underline {
    #[default]
    None,
    Single,
    Double,
    SingleAccounting,
    DoubleAccounting,
}

impl Underline {
    pub fn as_str(&self) -> &'static str {
        match self {
            Underline::None => "none",
            Underline::Single => "single",
            Underline::Double => "double",
            Underline::SingleAccounting => "singleAccounting",
            Underline::DoubleAccounting => "doubleAccounting",
        }
    }

    /// `<u/>` without a value means single
    fn parse(raw: Option<&str>) -> Underline {
        match raw {
            None | Some("single") => Underline::Single,
            Some("double") => Underline::Double,
            Some("singleAccounting") => Underline::SingleAccounting,
            Some("doubleAccounting") => Underline::DoubleAccounting,
            Some(_) => Underline::None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Font {
    pub name: String,
    pub size: f64,
    pub bold: bool,
    pub italic: bool,
    pub underline: Underline,
    pub strike: bool,
    pub color: Option<Color>,
    pub family: Option<u32>,
    pub index: Option<u32>,
}

impl Default for Font {
    fn default() -> Self {
        Self {
            name: DEFAULT_FONT_NAME.to_string(),
            size: DEFAULT_FONT_SIZE,
            bold: false,
            italic: false,
            underline: Underline::None,
            strike: false,
            color: None,
            family: Some(2),
            index: None,
        }
    }
}

impl Font {
    pub fn bold() -> Self {
        Self {
            bold: true,
            ..Self::default()
        }
    }

    pub fn set_size(&mut self, size: f64, mode: ValidationMode) -> Result<()> {
        if size.is_finite() && size > 0.0 && size <= 409.0 {
            self.size = size;
            return Ok(());
        }
        let err = XlsxError::Validation(format!("font size {size} outside 0..=409"));
        match mode {
            ValidationMode::Strict => Err(err),
            ValidationMode::Import => {
                log::warn!("{err}, keeping {}", self.size);
                Ok(())
            }
        }
    }

    pub fn append_altered(&mut self, other: &Font) {
        let fresh = Font::default();
        if other.name != fresh.name {
            self.name.clone_from(&other.name);
        }
        if other.size != fresh.size {
            self.size = other.size;
        }
        if other.bold != fresh.bold {
            self.bold = other.bold;
        }
        if other.italic != fresh.italic {
            self.italic = other.italic;
        }
        if other.underline != fresh.underline {
            self.underline = other.underline;
        }
        if other.strike != fresh.strike {
            self.strike = other.strike;
        }
        if other.color != fresh.color {
            self.color.clone_from(&other.color);
        }
        if other.family != fresh.family {
            self.family = other.family;
        }
    }

    pub fn from_element(el: &XmlElement, mode: ValidationMode) -> Result<Font> {
        // boolean elements are on unless val says otherwise
        let flag = |name: &str| {
            el.child(name)
                .is_some_and(|e| !matches!(e.attr("val"), Some("0" | "false")))
        };
        let mut font = Font {
            name: el
                .child("name")
                .and_then(|n| n.attr("val"))
                .unwrap_or(DEFAULT_FONT_NAME)
                .to_string(),
            bold: flag("b"),
            italic: flag("i"),
            strike: flag("strike"),
            underline: el
                .child("u")
                .map_or(Underline::None, |u| Underline::parse(u.attr("val"))),
            color: match el.child("color") {
                Some(c) => Color::from_element(c, mode)?,
                None => None,
            },
            family: el
                .child("family")
                .and_then(|f| f.attr("val"))
                .and_then(|v| v.parse().ok()),
            ..Font::default()
        };
        if let Some(raw) = el.child("sz").and_then(|s| s.attr("val")) {
            match raw.parse::<f64>() {
                Ok(size) => font.set_size(size, mode)?,
                Err(_) => log::warn!("unparsable font size '{raw}'"),
            }
        }
        Ok(font)
    }

    pub fn to_element(&self) -> XmlElement {
        let mut el = XmlElement::new("font");
        if self.bold {
            el.push(XmlElement::new("b"));
        }
        if self.italic {
            el.push(XmlElement::new("i"));
        }
        if self.strike {
            el.push(XmlElement::new("strike"));
        }
        match self.underline {
            Underline::None => {}
            Underline::Single => el.push(XmlElement::new("u")),
            other => el.push(XmlElement::new("u").with_attr("val", other.as_str())),
        }
        el.push(XmlElement::new("sz").with_attr("val", self.size));
        if let Some(color) = &self.color {
            el.push(color.to_element("color"));
        }
        el.push(XmlElement::new("name").with_attr("val", &self.name));
        if let Some(family) = self.family {
            el.push(XmlElement::new("family").with_attr("val", family));
        }
        el
    }
}

impl StyleComponent for Font {
    const KIND: &'static str = "font";

    fn hash_fields(&self, hasher: &mut StableHasher) {
        hasher.write_str(&self.name);
        hasher.write_f64(self.size);
        hasher.write_bool(self.bold);
        hasher.write_bool(self.italic);
        hasher.write_str(self.underline.as_str());
        hasher.write_bool(self.strike);
        hash_opt_color(hasher, self.color.as_ref());
        hasher.write_opt(self.family.as_ref(), |h, f| h.write_u32(*f));
    }

    fn index(&self) -> Option<u32> {
        self.index
    }

    fn set_index(&mut self, index: Option<u32>) {
        self.index = index;
    }
}
