//! Typed cell values

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::date;

/// Numeric payload; the variant records the native type a value was read
/// or stored as.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Decimal(Decimal),
}

impl Number {
    pub fn as_f64(&self) -> f64 {
        match *self {
            Number::Int(v) => f64::from(v),
            Number::Long(v) => v as f64,
            Number::Float(v) => f64::from(v),
            Number::Double(v) => v,
            Number::Decimal(v) => v.to_f64().unwrap_or(f64::NAN),
        }
    }

    pub fn is_finite(&self) -> bool {
        match self {
            Number::Float(v) => v.is_finite(),
            Number::Double(v) => v.is_finite(),
            _ => true,
        }
    }

    /// Canonical literal written into a `<v>` element
    pub fn to_literal(&self) -> String {
        match *self {
            Number::Int(v) => itoa::Buffer::new().format(v).to_string(),
            Number::Long(v) => itoa::Buffer::new().format(v).to_string(),
            Number::Float(v) => trim_point_zero(ryu::Buffer::new().format(v)),
            Number::Double(v) => trim_point_zero(ryu::Buffer::new().format(v)),
            Number::Decimal(v) => v.normalize().to_string(),
        }
    }

    /// Numerically equal, whatever the variants
    pub fn approx_eq(&self, other: &Number) -> bool {
        let (a, b) = (self.as_f64(), other.as_f64());
        if a == b {
            return true;
        }
        let scale = a.abs().max(b.abs()).max(1.0);
        (a - b).abs() <= scale * f64::from(f32::EPSILON)
    }
}

fn trim_point_zero(literal: &str) -> String {
    literal.strip_suffix(".0").unwrap_or(literal).to_string()
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_literal())
    }
}

impl From<i32> for Number {
    fn from(v: i32) -> Self {
        Number::Int(v)
    }
}

impl From<i64> for Number {
    fn from(v: i64) -> Self {
        Number::Long(v)
    }
}

impl From<f32> for Number {
    fn from(v: f32) -> Self {
        Number::Float(v)
    }
}

impl From<f64> for Number {
    fn from(v: f64) -> Self {
        Number::Double(v)
    }
}

impl From<Decimal> for Number {
    fn from(v: Decimal) -> Self {
        Number::Decimal(v)
    }
}

/// Semantic type of a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellType {
    Empty,
    Bool,
    Number,
    Date,
    Time,
    String,
    Formula,
}

impl fmt::Display for CellType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CellType::Empty => "empty",
            CellType::Bool => "bool",
            CellType::Number => "number",
            CellType::Date => "date",
            CellType::Time => "time",
            CellType::String => "string",
            CellType::Formula => "formula",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Bool(bool),
    Number(Number),
    Date(NaiveDateTime),
    /// Time of day, or a duration shorter than a day
    Time(TimeDelta),
    String(String),
    /// Formula text without the leading `=`
    Formula(String),
}

impl CellValue {
    pub fn cell_type(&self) -> CellType {
        match self {
            CellValue::Empty => CellType::Empty,
            CellValue::Bool(_) => CellType::Bool,
            CellValue::Number(_) => CellType::Number,
            CellValue::Date(_) => CellType::Date,
            CellValue::Time(_) => CellType::Time,
            CellValue::String(_) => CellType::String,
            CellValue::Formula(_) => CellType::Formula,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    pub fn formula(text: impl Into<String>) -> Self {
        let text = text.into();
        match text.strip_prefix('=') {
            Some(stripped) => CellValue::Formula(stripped.to_string()),
            None => CellValue::Formula(text),
        }
    }

    pub fn as_number(&self) -> Option<Number> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::String(s) | CellValue::Formula(s) => Some(s),
            _ => None,
        }
    }

    /// Serial-day representation of a date or time
    pub fn as_serial(&self) -> Option<f64> {
        match self {
            CellValue::Date(dt) => Some(date::datetime_to_serial(dt)),
            CellValue::Time(t) => Some(date::time_to_serial(t)),
            _ => None,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Bool(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            CellValue::Number(n) => write!(f, "{n}"),
            CellValue::Date(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
            CellValue::Time(t) => {
                let secs = t.num_seconds();
                write!(f, "{:02}:{:02}:{:02}", secs / 3600, secs / 60 % 60, secs % 60)
            }
            CellValue::String(s) => f.write_str(s),
            CellValue::Formula(s) => write!(f, "={s}"),
        }
    }
}

impl From<bool> for CellValue {
    fn from(v: bool) -> Self {
        CellValue::Bool(v)
    }
}

impl From<i32> for CellValue {
    fn from(v: i32) -> Self {
        CellValue::Number(Number::Int(v))
    }
}

impl From<i64> for CellValue {
    fn from(v: i64) -> Self {
        CellValue::Number(Number::Long(v))
    }
}

impl From<f32> for CellValue {
    fn from(v: f32) -> Self {
        CellValue::Number(Number::Float(v))
    }
}

impl From<f64> for CellValue {
    fn from(v: f64) -> Self {
        CellValue::Number(Number::Double(v))
    }
}

impl From<Decimal> for CellValue {
    fn from(v: Decimal) -> Self {
        CellValue::Number(Number::Decimal(v))
    }
}

impl From<Number> for CellValue {
    fn from(v: Number) -> Self {
        CellValue::Number(v)
    }
}

impl From<NaiveDateTime> for CellValue {
    fn from(v: NaiveDateTime) -> Self {
        CellValue::Date(v)
    }
}

impl From<NaiveDate> for CellValue {
    fn from(v: NaiveDate) -> Self {
        CellValue::Date(v.and_time(chrono::NaiveTime::MIN))
    }
}

impl From<TimeDelta> for CellValue {
    fn from(v: TimeDelta) -> Self {
        CellValue::Time(v)
    }
}

impl From<&str> for CellValue {
    fn from(v: &str) -> Self {
        CellValue::String(v.to_string())
    }
}

impl From<String> for CellValue {
    fn from(v: String) -> Self {
        CellValue::String(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_number_literals() {
        assert_eq!(Number::Int(42).to_literal(), "42");
        assert_eq!(Number::Long(-9_000_000_000).to_literal(), "-9000000000");
        assert_eq!(Number::Double(3.0).to_literal(), "3");
        assert_eq!(Number::Double(0.1).to_literal(), "0.1");
        assert_eq!(Number::Float(1.5).to_literal(), "1.5");
        let dec = Decimal::from_str("12.3400").unwrap();
        assert_eq!(Number::Decimal(dec).to_literal(), "12.34");
    }

    #[test]
    fn test_approx_eq_across_variants() {
        assert!(Number::Int(2).approx_eq(&Number::Double(2.0)));
        assert!(Number::Float(0.1).approx_eq(&Number::Double(0.1)));
        assert!(!Number::Int(2).approx_eq(&Number::Double(2.1)));
    }

    #[test]
    fn test_formula_strips_equals() {
        assert_eq!(CellValue::formula("=SUM(A1:A3)"), CellValue::Formula("SUM(A1:A3)".into()));
        assert_eq!(CellValue::formula("A1*2").to_string(), "=A1*2");
    }

    #[test]
    fn test_display() {
        assert_eq!(CellValue::from(true).to_string(), "TRUE");
        assert_eq!(CellValue::Time(TimeDelta::seconds(3723)).to_string(), "01:02:03");
        let date = NaiveDate::from_ymd_opt(2021, 4, 11).unwrap();
        assert_eq!(CellValue::from(date).to_string(), "2021-04-11 00:00:00");
        assert_eq!(CellValue::from("x").cell_type(), CellType::String);
    }
}
