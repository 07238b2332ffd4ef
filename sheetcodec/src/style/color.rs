
use std::fmt;
use std::hash::Hasher;

use super::ValidationMode;
use super::hash::StableHasher;
use crate::error::{Result, XlsxError};
use crate::xml::XmlElement;

/// A color reference as it appears on fonts, fills and borders
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Color {
    /// Upper-case `AARRGGBB`
    Rgb(String),
    Theme(u32),
    Indexed(u32),
    Auto,
}

impl Color {
    /// Parse `RRGGBB` or `AARRGGBB`, with or without a leading `#`.
    /// Six-digit values get an opaque alpha channel.
    pub fn from_hex(hex: &str) -> Result<Color> {
        let digits = hex.trim().trim_start_matches('#');
        if !matches!(digits.len(), 6 | 8) || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(XlsxError::Validation(format!("invalid color value '{hex}'")));
        }
        let argb = if digits.len() == 6 {
            format!("FF{}", digits.to_ascii_uppercase())
        } else {
            digits.to_ascii_uppercase()
        };
        Ok(Color::Rgb(argb))
    }

    /// Like [`Color::from_hex`], but an import tolerates the bad value
    pub fn from_hex_in(hex: &str, mode: ValidationMode) -> Result<Option<Color>> {
        match (Color::from_hex(hex), mode) {
            (Ok(color), _) => Ok(Some(color)),
            (Err(err), ValidationMode::Strict) => Err(err),
            (Err(err), ValidationMode::Import) => {
                log::warn!("{err}, dropping color");
                Ok(None)
            }
        }
    }

    pub(crate) fn hash_into(&self, hasher: &mut StableHasher) {
        match self {
            Color::Rgb(argb) => {
                hasher.write_str("rgb");
                hasher.write_str(argb);
            }
            Color::Theme(theme) => {
                hasher.write_str("theme");
                hasher.write_u32(*theme);
            }
            Color::Indexed(idx) => {
                hasher.write_str("indexed");
                hasher.write_u32(*idx);
            }
            Color::Auto => hasher.write_str("auto"),
        }
    }

    /// Read the color attributes of a `<color>`-like element
    pub(crate) fn from_element(el: &XmlElement, mode: ValidationMode) -> Result<Option<Color>> {
        if let Some(rgb) = el.attr("rgb") {
            return Color::from_hex_in(rgb, mode);
        }
        if let Some(theme) = el.attr("theme").and_then(|v| v.parse().ok()) {
            return Ok(Some(Color::Theme(theme)));
        }
        if let Some(idx) = el.attr("indexed").and_then(|v| v.parse().ok()) {
            return Ok(Some(Color::Indexed(idx)));
        }
        if el.attr("auto").is_some_and(|v| v == "1" || v == "true") {
            return Ok(Some(Color::Auto));
        }
        Ok(None)
    }

    pub(crate) fn to_element(&self, name: &str) -> XmlElement {
        let el = XmlElement::new(name);
        match self {
            Color::Rgb(argb) => el.with_attr("rgb", argb),
            Color::Theme(theme) => el.with_attr("theme", theme),
            Color::Indexed(idx) => el.with_attr("indexed", idx),
            Color::Auto => el.with_attr("auto", 1),
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::Rgb(argb) => write!(f, "#{argb}"),
            Color::Theme(theme) => write!(f, "theme:{theme}"),
            Color::Indexed(idx) => write!(f, "indexed:{idx}"),
            Color::Auto => f.write_str("auto"),
        }
    }
}

pub(crate) fn hash_opt_color(hasher: &mut StableHasher, color: Option<&Color>) {
    hasher.write_opt(color, |h, c| c.hash_into(h));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_normalization() {
        assert_eq!(Color::from_hex("ff0000").unwrap(), Color::Rgb("FFFF0000".into()));
        assert_eq!(Color::from_hex("#80a0B0C0").unwrap(), Color::Rgb("80A0B0C0".into()));
    }

    #[test]
    fn test_malformed_hex_rejected_at_construction() {
        assert!(matches!(Color::from_hex("12345"), Err(XlsxError::Validation(_))));
        assert!(Color::from_hex("GG0000").is_err());
        assert!(Color::from_hex_in("nope", ValidationMode::Strict).is_err());
        assert_eq!(Color::from_hex_in("nope", ValidationMode::Import).unwrap(), None);
    }

    #[test]
    fn test_element_roundtrip() {
        let el = Color::Theme(4).to_element("fgColor");
        assert_eq!(el.to_xml_string(), r#"<fgColor theme="4"/>"#);
        let back = Color::from_element(&el, ValidationMode::Strict).unwrap();
        assert_eq!(back, Some(Color::Theme(4)));
    }
}
