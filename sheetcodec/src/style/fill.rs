use std::str::FromStr;

use super::ValidationMode;
use super::color::{Color, hash_opt_color};
use super::hash::{StableHasher, StyleComponent};
use crate::error::{Result, XlsxError};
use crate::xml::XmlElement;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PatternType {
    #[default]
    None,
    Solid,
    MediumGray,
    DarkGray,
    LightGray,
    DarkHorizontal,
    DarkVertical,
    DarkDown,
    DarkUp,
    DarkGrid,
    DarkTrellis,
    LightHorizontal,
    LightVertical,
    LightDown,
    LightUp,
    LightGrid,
    LightTrellis,
    Gray125,
    Gray0625,
}

const PATTERN_NAMES: [(PatternType, &str); 19] = [
    (PatternType::None, "none"),
    (PatternType::Solid, "solid"),
    (PatternType::MediumGray, "mediumGray"),
    (PatternType::DarkGray, "darkGray"),
    (PatternType::LightGray, "lightGray"),
    (PatternType::DarkHorizontal, "darkHorizontal"),
    (PatternType::DarkVertical, "darkVertical"),
    (PatternType::DarkDown, "darkDown"),
    (PatternType::DarkUp, "darkUp"),
    (PatternType::DarkGrid, "darkGrid"),
    (PatternType::DarkTrellis, "darkTrellis"),
    (PatternType::LightHorizontal, "lightHorizontal"),
    (PatternType::LightVertical, "lightVertical"),
    (PatternType::LightDown, "lightDown"),
    (PatternType::LightUp, "lightUp"),
    (PatternType::LightGrid, "lightGrid"),
    (PatternType::LightTrellis, "lightTrellis"),
    (PatternType::Gray125, "gray125"),
    (PatternType::Gray0625, "gray0625"),
];

impl PatternType {
    pub fn as_str(&self) -> &'static str {
        PATTERN_NAMES
            .iter()
            .find(|(p, _)| p == self)
            .map_or("none", |(_, name)| name)
    }
}

impl FromStr for PatternType {
    type Err = XlsxError;

    fn from_str(s: &str) -> Result<Self> {
        PATTERN_NAMES
            .iter()
            .find(|(_, name)| *name == s)
            .map(|(p, _)| *p)
            .ok_or_else(|| XlsxError::Validation(format!("unknown fill pattern '{s}'")))
    }
}

/// Pattern fill. Gradient fills are read as their first stop's solid color.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Fill {
    pub pattern: PatternType,
    pub foreground: Option<Color>,
    pub background: Option<Color>,
    pub index: Option<u32>,
}

impl Fill {
    pub fn solid(color: Color) -> Self {
        Self {
            pattern: PatternType::Solid,
            foreground: Some(color),
            ..Self::default()
        }
    }

    /// The fill every style sheet carries at position 1
    pub fn gray125() -> Self {
        Self {
            pattern: PatternType::Gray125,
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pattern == PatternType::None
    }

    pub fn append_altered(&mut self, other: &Fill) {
        if other.pattern != PatternType::None {
            self.pattern = other.pattern;
        }
        if other.foreground.is_some() {
            self.foreground.clone_from(&other.foreground);
        }
        if other.background.is_some() {
            self.background.clone_from(&other.background);
        }
    }

    pub fn from_element(el: &XmlElement, mode: ValidationMode) -> Result<Fill> {
        if let Some(pattern_fill) = el.child("patternFill") {
            let pattern = match pattern_fill.attr("patternType") {
                Some(raw) => match (raw.parse(), mode) {
                    (Ok(p), _) => p,
                    (Err(err), ValidationMode::Strict) => return Err(err),
                    (Err(err), ValidationMode::Import) => {
                        log::warn!("{err}, using no fill");
                        PatternType::None
                    }
                },
                // a patternFill with colors but no type paints solid
                None if pattern_fill.child("fgColor").is_some() => PatternType::Solid,
                None => PatternType::None,
            };
            let color = |name: &str| -> Result<Option<Color>> {
                match pattern_fill.child(name) {
                    Some(c) => Color::from_element(c, mode),
                    None => Ok(None),
                }
            };
            return Ok(Fill {
                pattern,
                foreground: color("fgColor")?,
                background: color("bgColor")?,
                index: None,
            });
        }
        if let Some(gradient) = el.child("gradientFill") {
            let first_stop = gradient
                .children_named("stop")
                .next()
                .and_then(|stop| stop.child("color"));
            if let Some(c) = first_stop {
                log::debug!("gradient fill flattened to its first stop");
                return Ok(Fill {
                    pattern: PatternType::Solid,
                    foreground: Color::from_element(c, mode)?,
                    ..Fill::default()
                });
            }
        }
        Ok(Fill::default())
    }

    pub fn to_element(&self) -> XmlElement {
        let mut pattern = XmlElement::new("patternFill").with_attr("patternType", self.pattern.as_str());
        if let Some(fg) = &self.foreground {
            pattern.push(fg.to_element("fgColor"));
        }
        if let Some(bg) = &self.background {
            pattern.push(bg.to_element("bgColor"));
        }
        XmlElement::new("fill").with_child(pattern)
    }
}

impl StyleComponent for Fill {
    const KIND: &'static str = "fill";

    fn hash_fields(&self, hasher: &mut StableHasher) {
        hasher.write_str(self.pattern.as_str());
        hash_opt_color(hasher, self.foreground.as_ref());
        hash_opt_color(hasher, self.background.as_ref());
    }

    fn index(&self) -> Option<u32> {
        self.index
    }

    fn set_index(&mut self, index: Option<u32>) {
        self.index = index;
    }
}
