//! Raw `<c>` content to typed values

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::date;
use crate::model::{CellValue, Number};
use crate::strings::SharedStrings;
use crate::style::{FormatKind, ParsedStyles};

/// Fractional digits beyond which a literal is kept as a double
const FLOAT_FRACTION_DIGITS: usize = 6;

/// Resolve the text of a cell's `<v>` (or inline string) into a value.
///
/// `raw_type` is the `t` attribute and `style` the `s` attribute of the
/// cell. Every ambiguity degrades to a plainer value; nothing here fails.
pub fn resolve_cell(
    raw_type: Option<&str>,
    raw_text: &str,
    style: Option<i64>,
    strings: &SharedStrings,
    styles: &ParsedStyles,
) -> CellValue {
    match raw_type {
        Some("b") => {
            if let Some(flag) = parse_bool(raw_text) {
                return CellValue::Bool(flag);
            }
        }
        Some("s") => return shared_string(raw_text, strings),
        Some("str") => return CellValue::formula(raw_text),
        Some("inlineStr") | Some("e") => return CellValue::String(raw_text.to_string()),
        Some("d") => {
            if let Some(value) = parse_iso_datetime(raw_text) {
                return CellValue::Date(value);
            }
        }
        _ => match styles.format_kind(style) {
            FormatKind::Date => {
                if let Some(value) = parse_serial(raw_text).and_then(date::serial_to_datetime) {
                    return CellValue::Date(value);
                }
            }
            FormatKind::Time => {
                if let Some(value) = parse_serial(raw_text).and_then(date::serial_to_time) {
                    return CellValue::Time(value);
                }
            }
            _ => {}
        },
    }

    match parse_number(raw_text) {
        Some(number) => CellValue::Number(number),
        None if raw_text.is_empty() => CellValue::Empty,
        None => CellValue::String(raw_text.to_string()),
    }
}

fn shared_string(raw_text: &str, strings: &SharedStrings) -> CellValue {
    let resolved = raw_text
        .trim()
        .parse::<usize>()
        .ok()
        .and_then(|idx| strings.get(idx));
    match resolved {
        Some(text) => CellValue::String(text.to_string()),
        None => {
            log::warn!("shared string index '{raw_text}' not found, keeping the literal");
            CellValue::String(raw_text.to_string())
        }
    }
}

/// ISO 8601 content of a `t="d"` cell
fn parse_iso_datetime(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim().trim_end_matches('Z');
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .map(|day| day.and_time(NaiveTime::MIN))
        })
}

fn parse_serial(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Boolean cell content: `1`/`true` family, else any number >= 1
pub fn parse_bool(text: &str) -> Option<bool> {
    let text = text.trim();
    if text == "1" || text.eq_ignore_ascii_case("true") {
        return Some(true);
    }
    if text == "0" || text.eq_ignore_ascii_case("false") {
        return Some(false);
    }
    parse_serial(text).map(|n| n >= 1.0)
}

/// Parse a numeric literal into the narrowest fitting variant: `Int`, then
/// `Long`, then `Float` or `Double`.
///
/// A literal whose fixed ten-digit rendering has at most six fractional
/// digits, and whose single and double precision parses agree on being
/// non-zero, becomes a `Float`. This mirrors how existing files have been
/// read so far; it is not a precision guarantee.
pub fn parse_number(text: &str) -> Option<Number> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if let Ok(v) = text.parse::<i32>() {
        return Some(Number::Int(v));
    }
    if let Ok(v) = text.parse::<i64>() {
        return Some(Number::Long(v));
    }
    let double = parse_serial(text)?;
    let single = text.parse::<f32>().ok().filter(|v| v.is_finite());

    let fixed = format!("{double:.10}");
    let fixed = fixed.trim_end_matches('0').trim_end_matches('.');
    let fraction_digits = fixed.split_once('.').map_or(0, |(_, frac)| frac.len());

    match single {
        Some(single)
            if fraction_digits <= FLOAT_FRACTION_DIGITS && (single != 0.0) == (double != 0.0) =>
        {
            Some(Number::Float(single))
        }
        _ => Some(Number::Double(double)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::XmlElement;
    use chrono::TimeDelta;

    fn styles() -> ParsedStyles {
        let xml = br#"<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <numFmts count="1"><numFmt numFmtId="164" formatCode="yyyy-mm-dd hh:mm"/></numFmts>
  <fonts count="1"><font/></fonts>
  <fills count="1"><fill><patternFill patternType="none"/></fill></fills>
  <borders count="1"><border/></borders>
  <cellXfs count="4">
    <xf numFmtId="0" fontId="0" fillId="0" borderId="0"/>
    <xf numFmtId="164" fontId="0" fillId="0" borderId="0"/>
    <xf numFmtId="21" fontId="0" fillId="0" borderId="0"/>
    <xf numFmtId="49" fontId="0" fillId="0" borderId="0"/>
  </cellXfs>
</styleSheet>"#;
        let root = XmlElement::parse("xl/styles.xml", xml).unwrap();
        ParsedStyles::parse("xl/styles.xml", &root).unwrap()
    }

    fn strings() -> SharedStrings {
        let mut table = SharedStrings::new();
        table.intern("Hello");
        table.intern("World");
        table
    }

    fn resolve(t: Option<&str>, text: &str, s: Option<i64>) -> CellValue {
        resolve_cell(t, text, s, &strings(), &styles())
    }

    #[test]
    fn test_booleans() {
        assert_eq!(resolve(Some("b"), "1", None), CellValue::Bool(true));
        assert_eq!(resolve(Some("b"), "0", None), CellValue::Bool(false));
        assert_eq!(resolve(Some("b"), "TRUE", None), CellValue::Bool(true));
        assert_eq!(resolve(Some("b"), "2.5", None), CellValue::Bool(true));
        assert_eq!(resolve(Some("b"), "0.5", None), CellValue::Bool(false));
        assert_eq!(resolve(Some("b"), "yes", None), CellValue::String("yes".into()));
    }

    #[test]
    fn test_shared_strings_with_literal_fallback() {
        assert_eq!(resolve(Some("s"), "1", None), CellValue::String("World".into()));
        assert_eq!(resolve(Some("s"), "9", None), CellValue::String("9".into()));
        assert_eq!(resolve(Some("s"), "abc", None), CellValue::String("abc".into()));
    }

    #[test]
    fn test_formula_and_inline_types() {
        assert_eq!(resolve(Some("str"), "SUM(A1:A2)", None), CellValue::Formula("SUM(A1:A2)".into()));
        assert_eq!(resolve(Some("inlineStr"), "42", None), CellValue::String("42".into()));
        assert_eq!(resolve(Some("e"), "#DIV/0!", None), CellValue::String("#DIV/0!".into()));
        let day = NaiveDate::from_ymd_opt(2022, 2, 3).unwrap();
        assert_eq!(
            resolve(Some("d"), "2022-02-03T04:05:06Z", None),
            CellValue::Date(day.and_hms_opt(4, 5, 6).unwrap())
        );
        assert_eq!(resolve(Some("d"), "2022-02-03", None), CellValue::Date(day.and_time(NaiveTime::MIN)));
    }

    #[test]
    fn test_date_styled_cells() {
        let expected = NaiveDate::from_ymd_opt(2021, 4, 11)
            .unwrap()
            .and_hms_opt(15, 7, 2)
            .unwrap();
        let serial = date::datetime_to_serial(&expected);
        assert_eq!(resolve(None, &serial.to_string(), Some(1)), CellValue::Date(expected));
        // out of range falls back to a plain number
        assert_eq!(resolve(None, "-1", Some(1)), CellValue::Number(Number::Int(-1)));
        assert_eq!(resolve(Some("n"), "3000000", Some(1)), CellValue::Number(Number::Int(3_000_000)));
    }

    #[test]
    fn test_time_styled_cells() {
        assert_eq!(resolve(None, "0.5", Some(2)), CellValue::Time(TimeDelta::hours(12)));
        assert_eq!(resolve(None, "1.25", Some(2)), CellValue::Time(TimeDelta::hours(6)));
    }

    #[test]
    fn test_text_format_does_not_change_numbers() {
        assert_eq!(resolve(None, "7", Some(3)), CellValue::Number(Number::Int(7)));
        assert_eq!(resolve(None, "7", Some(99)), CellValue::Number(Number::Int(7)));
    }

    #[test]
    fn test_number_variants() {
        assert_eq!(parse_number("42"), Some(Number::Int(42)));
        assert_eq!(parse_number("-9000000000"), Some(Number::Long(-9_000_000_000)));
        assert_eq!(parse_number("0.5"), Some(Number::Float(0.5)));
        assert_eq!(parse_number("0.123456789"), Some(Number::Double(0.123456789)));
        assert_eq!(parse_number("1e-300"), Some(Number::Double(1e-300)));
        assert_eq!(parse_number("NaN"), None);
        assert_eq!(parse_number("inf"), None);
        assert_eq!(parse_number(""), None);
    }

    #[test]
    fn test_fallbacks() {
        assert_eq!(resolve(None, "", None), CellValue::Empty);
        assert_eq!(resolve(None, "n/a", None), CellValue::String("n/a".into()));
    }
}
