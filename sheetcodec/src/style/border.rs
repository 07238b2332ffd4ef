use std::str::FromStr;

use super::ValidationMode;
use super::color::{Color, hash_opt_color};
use super::hash::{StableHasher, StyleComponent};
use crate::error::{Result, XlsxError};
use crate::xml::XmlElement;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BorderStyle {
    #[default]
    None,
    Thin,
    Medium,
    Dashed,
    Dotted,
    Thick,
    Double,
    Hair,
    MediumDashed,
    DashDot,
    MediumDashDot,
    DashDotDot,
    MediumDashDotDot,
    SlantDashDot,
}

impl BorderStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            BorderStyle::None => "none",
            BorderStyle::Thin => "thin",
            BorderStyle::Medium => "medium",
            BorderStyle::Dashed => "dashed",
            BorderStyle::Dotted => "dotted",
            BorderStyle::Thick => "thick",
            BorderStyle::Double => "double",
            BorderStyle::Hair => "hair",
            BorderStyle::MediumDashed => "mediumDashed",
            BorderStyle::DashDot => "dashDot",
            BorderStyle::MediumDashDot => "mediumDashDot",
            BorderStyle::DashDotDot => "dashDotDot",
            BorderStyle::MediumDashDotDot => "mediumDashDotDot",
            BorderStyle::SlantDashDot => "slantDashDot",
        }
    }
}

impl FromStr for BorderStyle {
    type Err = XlsxError;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s {
            "none" => BorderStyle::None,
            "thin" => BorderStyle::Thin,
            "medium" => BorderStyle::Medium,
            "dashed" => BorderStyle::Dashed,
            "dotted" => BorderStyle::Dotted,
            "thick" => BorderStyle::Thick,
            "double" => BorderStyle::Double,
            "hair" => BorderStyle::Hair,
            "mediumDashed" => BorderStyle::MediumDashed,
            "dashDot" => BorderStyle::DashDot,
            "mediumDashDot" => BorderStyle::MediumDashDot,
            "dashDotDot" => BorderStyle::DashDotDot,
            "mediumDashDotDot" => BorderStyle::MediumDashDotDot,
            "slantDashDot" => BorderStyle::SlantDashDot,
            other => {
                return Err(XlsxError::Validation(format!("unknown border style '{other}'")));
            }
        })
    }
}

/// One side of a border
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BorderEdge {
    pub style: BorderStyle,
    pub color: Option<Color>,
}

impl BorderEdge {
    pub fn new(style: BorderStyle) -> Self {
        Self { style, color: None }
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.style == BorderStyle::None
    }

    fn hash_into(&self, hasher: &mut StableHasher) {
        hasher.write_str(self.style.as_str());
        hash_opt_color(hasher, self.color.as_ref());
    }

    /// Copy the fields of `other` that differ from a bare edge
    fn append_altered(&mut self, other: &BorderEdge) {
        if other.style != BorderStyle::None {
            self.style = other.style;
        }
        if other.color.is_some() {
            self.color.clone_from(&other.color);
        }
    }

    fn from_element(el: Option<&XmlElement>, mode: ValidationMode) -> Result<BorderEdge> {
        let Some(el) = el else {
            return Ok(BorderEdge::default());
        };
        let style = match el.attr("style") {
            Some(raw) => match (raw.parse(), mode) {
                (Ok(style), _) => style,
                (Err(err), ValidationMode::Strict) => return Err(err),
                (Err(err), ValidationMode::Import) => {
                    log::warn!("{err}, using no border");
                    BorderStyle::None
                }
            },
            None => BorderStyle::None,
        };
        let color = match el.child("color") {
            Some(c) => Color::from_element(c, mode)?,
            None => None,
        };
        Ok(BorderEdge { style, color })
    }

    fn to_element(&self, name: &str) -> XmlElement {
        let el = XmlElement::new(name).with_attr_if(!self.is_empty(), "style", self.style.as_str());
        match &self.color {
            Some(color) if !self.is_empty() => el.with_child(color.to_element("color")),
            _ => el,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Border {
    pub left: BorderEdge,
    pub right: BorderEdge,
    pub top: BorderEdge,
    pub bottom: BorderEdge,
    pub diagonal: BorderEdge,
    pub diagonal_up: bool,
    pub diagonal_down: bool,
    pub index: Option<u32>,
}

impl Border {
    /// The same edge on all four sides
    pub fn outline(style: BorderStyle) -> Self {
        let edge = BorderEdge::new(style);
        Self {
            left: edge.clone(),
            right: edge.clone(),
            top: edge.clone(),
            bottom: edge,
            ..Self::default()
        }
    }

    /// True when the border paints nothing
    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
            && self.right.is_empty()
            && self.top.is_empty()
            && self.bottom.is_empty()
            && (self.diagonal.is_empty() || !(self.diagonal_up || self.diagonal_down))
    }

    pub fn append_altered(&mut self, other: &Border) {
        self.left.append_altered(&other.left);
        self.right.append_altered(&other.right);
        self.top.append_altered(&other.top);
        self.bottom.append_altered(&other.bottom);
        self.diagonal.append_altered(&other.diagonal);
        self.diagonal_up |= other.diagonal_up;
        self.diagonal_down |= other.diagonal_down;
    }

    pub fn from_element(el: &XmlElement, mode: ValidationMode) -> Result<Border> {
        let flag = |name: &str| el.attr(name).is_some_and(|v| v == "1" || v == "true");
        Ok(Border {
            // `start`/`end` are the strict-schema spellings
            left: BorderEdge::from_element(el.child("left").or_else(|| el.child("start")), mode)?,
            right: BorderEdge::from_element(el.child("right").or_else(|| el.child("end")), mode)?,
            top: BorderEdge::from_element(el.child("top"), mode)?,
            bottom: BorderEdge::from_element(el.child("bottom"), mode)?,
            diagonal: BorderEdge::from_element(el.child("diagonal"), mode)?,
            diagonal_up: flag("diagonalUp"),
            diagonal_down: flag("diagonalDown"),
            index: None,
        })
    }

    pub fn to_element(&self) -> XmlElement {
        XmlElement::new("border")
            .with_attr_if(self.diagonal_up, "diagonalUp", 1)
            .with_attr_if(self.diagonal_down, "diagonalDown", 1)
            .with_child(self.left.to_element("left"))
            .with_child(self.right.to_element("right"))
            .with_child(self.top.to_element("top"))
            .with_child(self.bottom.to_element("bottom"))
            .with_child(self.diagonal.to_element("diagonal"))
    }
}

impl StyleComponent for Border {
    const KIND: &'static str = "border";

    fn hash_fields(&self, hasher: &mut StableHasher) {
        self.left.hash_into(hasher);
        self.right.hash_into(hasher);
        self.top.hash_into(hasher);
        self.bottom.hash_into(hasher);
        self.diagonal.hash_into(hasher);
        hasher.write_bool(self.diagonal_up);
        hasher.write_bool(self.diagonal_down);
    }

    fn index(&self) -> Option<u32> {
        self.index
    }

    fn set_index(&mut self, index: Option<u32>) {
        self.index = index;
    }
}
