//! Import-time coercion of resolved values

use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Timelike};
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};

use super::resolve::{parse_bool, parse_number};
use crate::config::{Enforcement, ImportOptions, TargetType};
use crate::date;
use crate::model::{CellValue, Number, Worksheet};

const DATE_TIME_FORMATS: [&str; 3] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Convert `value` to `target`. When the conversion means nothing for the
/// source type the value comes back unchanged.
pub fn coerce(value: CellValue, target: TargetType) -> CellValue {
    match target {
        TargetType::Number => to_number(value),
        TargetType::BigDecimal => to_decimal(value),
        TargetType::Double => to_double(value),
        TargetType::Date => to_date(value),
        TargetType::Time => to_time(value),
        TargetType::Bool => to_bool(value),
        TargetType::String => to_text(value),
    }
}

fn bool_number(flag: bool) -> Number {
    Number::Int(i32::from(flag))
}

fn to_number(value: CellValue) -> CellValue {
    if matches!(value, CellValue::Date(_) | CellValue::Time(_)) {
        return serial_number(value);
    }
    let number = match &value {
        CellValue::Bool(flag) => Some(bool_number(*flag)),
        CellValue::String(text) => parse_number(text),
        _ => None,
    };
    number.map_or(value, CellValue::Number)
}

fn to_decimal(value: CellValue) -> CellValue {
    let decimal = match &value {
        CellValue::Number(number) => number_to_decimal(number),
        CellValue::Bool(flag) => Some(Decimal::from(i32::from(*flag))),
        CellValue::Date(_) | CellValue::Time(_) => value.as_serial().and_then(Decimal::from_f64),
        CellValue::String(text) => Decimal::from_str(text.trim())
            .or_else(|_| Decimal::from_scientific(text.trim()))
            .ok(),
        _ => None,
    };
    decimal.map_or(value, |d| CellValue::Number(Number::Decimal(d)))
}

fn number_to_decimal(number: &Number) -> Option<Decimal> {
    match *number {
        Number::Int(v) => Some(Decimal::from(v)),
        Number::Long(v) => Some(Decimal::from(v)),
        Number::Float(v) => Decimal::from_f32(v),
        Number::Double(v) => Decimal::from_f64(v),
        Number::Decimal(v) => Some(v),
    }
}

fn to_double(value: CellValue) -> CellValue {
    let double = match &value {
        CellValue::Number(number) => Some(number.as_f64()),
        CellValue::Bool(flag) => Some(if *flag { 1.0 } else { 0.0 }),
        CellValue::Date(_) | CellValue::Time(_) => value.as_serial(),
        CellValue::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    };
    match double.filter(|v| v.is_finite()) {
        Some(v) => CellValue::Number(Number::Double(v)),
        None => value,
    }
}

/// Whole-number form, `Int` when it fits and `Long` otherwise.
/// Fractions are truncated toward zero.
fn to_integer(value: CellValue) -> CellValue {
    let CellValue::Number(number) = &value else {
        return value;
    };
    let number = *number;
    let truncated = match number {
        Number::Int(_) | Number::Long(_) => return value,
        Number::Decimal(d) => d.trunc().to_i64(),
        other => {
            let v = other.as_f64().trunc();
            (v.is_finite() && v >= i64::MIN as f64 && v <= i64::MAX as f64).then_some(v as i64)
        }
    };
    match truncated {
        Some(v) => match i32::try_from(v) {
            Ok(small) => CellValue::Number(Number::Int(small)),
            Err(_) => CellValue::Number(Number::Long(v)),
        },
        None => value,
    }
}

fn to_date(value: CellValue) -> CellValue {
    let converted = match &value {
        CellValue::Number(number) => date::serial_to_datetime(number.as_f64()),
        CellValue::Time(t) => date::serial_to_datetime(date::time_to_serial(t)),
        CellValue::String(text) => parse_date_text(text.trim()),
        _ => None,
    };
    converted.map_or(value, CellValue::Date)
}

fn parse_date_text(text: &str) -> Option<NaiveDateTime> {
    for format in DATE_TIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt);
        }
    }
    if let Ok(day) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(day.and_time(NaiveTime::MIN));
    }
    text.parse::<f64>().ok().and_then(date::serial_to_datetime)
}

fn to_time(value: CellValue) -> CellValue {
    let converted = match &value {
        CellValue::Number(number) => date::serial_to_time(number.as_f64()),
        CellValue::Date(dt) => {
            let time = dt.time();
            Some(
                TimeDelta::seconds(i64::from(time.num_seconds_from_midnight()))
                    + TimeDelta::milliseconds(i64::from(time.nanosecond() / 1_000_000)),
            )
        }
        CellValue::String(text) => {
            let text = text.trim();
            NaiveTime::parse_from_str(text, "%H:%M:%S%.f")
                .or_else(|_| NaiveTime::parse_from_str(text, "%H:%M"))
                .ok()
                .map(|time| time - NaiveTime::MIN)
        }
        _ => None,
    };
    converted.map_or(value, CellValue::Time)
}

fn to_bool(value: CellValue) -> CellValue {
    let converted = match &value {
        CellValue::Number(number) => Some(number.as_f64() != 0.0),
        CellValue::String(text) => parse_bool(text),
        _ => None,
    };
    converted.map_or(value, CellValue::Bool)
}

fn to_text(value: CellValue) -> CellValue {
    match value {
        CellValue::Empty | CellValue::String(_) | CellValue::Formula(_) => value,
        other => CellValue::String(other.to_string()),
    }
}

fn serial_number(value: CellValue) -> CellValue {
    match value.as_serial() {
        Some(serial) => CellValue::Number(Number::Double(serial)),
        None => value,
    }
}

fn enforce(value: CellValue, policy: Enforcement) -> CellValue {
    let is_number = matches!(value, CellValue::Number(_));
    match policy {
        Enforcement::AllAsString => to_text(value),
        _ if !is_number => value,
        Enforcement::NumbersAsDouble => to_double(value),
        Enforcement::NumbersAsDecimal => to_decimal(value),
        Enforcement::NumbersAsInteger => to_integer(value),
    }
}

/// Run the import options over every stored cell of a sheet.
///
/// Order per cell: the column's declared type, then the workbook-wide
/// enforcement, then the date and empty flags. Rows above `start_row` and
/// formula cells are left alone.
pub fn apply_import_options(sheet: &mut Worksheet, options: &ImportOptions) {
    if options.is_passthrough() {
        return;
    }
    let first_row = options.start_row.saturating_sub(1);
    let mut changed = 0usize;
    for (at, cell) in sheet.cells_mut() {
        if at.row < first_row || matches!(cell.value, CellValue::Formula(_)) {
            continue;
        }
        let before = cell.value.cell_type();
        let mut value = std::mem::take(&mut cell.value);
        if let Some(target) = options.column_type(at.col) {
            value = coerce(value, target);
        }
        if let Some(policy) = options.enforce {
            value = enforce(value, policy);
        }
        if options.dates_as_numbers {
            value = match value {
                CellValue::Date(_) | CellValue::Time(_) => serial_number(value),
                other => other,
            };
        }
        if options.empty_as_string && value.is_empty() {
            value = CellValue::String(String::new());
        }
        if value.cell_type() != before {
            changed += 1;
        }
        cell.value = value;
    }
    log::debug!("{}: import options changed the type of {changed} cells", sheet.name());
}
