//! Excel serial date/time codec (1900 date system).
//!
//! A serial is a floating point day count. The integral part counts days,
//! the fractional part is the time of day. Serial 1 is 1900-01-01 and serial
//! 60 is the phantom 1900-02-29 that 1900-era spreadsheets believed in, so
//! every serial below 61 is decoded against 1899-12-31 while the rest use
//! 1899-12-30. For serials below 1.0 this means the decoded date is moved
//! forward one day relative to the 1899-12-30 epoch.

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Timelike, Weekday};

/// Smallest serial accepted as a date or time
pub const MIN_SERIAL: f64 = 0.0;
/// 9999-12-31 23:59:59
pub const MAX_SERIAL: f64 = 2_958_465.999_988_426;

const MS_PER_DAY: i64 = 86_400_000;
/// `num_days_from_ce` of 1899-12-30
const EPOCH_CE_DAYS: i32 = 693_594;
/// First serial that no longer needs the leap-day compensation (1900-03-01)
const FIRST_ACCURATE_SERIAL: i64 = 61;

pub fn is_valid_serial(serial: f64) -> bool {
    serial.is_finite() && (MIN_SERIAL..=MAX_SERIAL).contains(&serial)
}

fn split_serial(serial: f64) -> (i64, i64) {
    let total_ms = (serial * MS_PER_DAY as f64).round() as i64;
    (total_ms.div_euclid(MS_PER_DAY), total_ms.rem_euclid(MS_PER_DAY))
}

fn date_for_day(day: i64) -> Option<NaiveDate> {
    let adjust = if day < FIRST_ACCURATE_SERIAL { 1 } else { 0 };
    let ce_days = i32::try_from(day + adjust).ok()?.checked_add(EPOCH_CE_DAYS)?;
    NaiveDate::from_num_days_from_ce_opt(ce_days)
}

/// Decode a serial into a calendar timestamp, or `None` outside the valid range
pub fn serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !is_valid_serial(serial) {
        return None;
    }
    let (day, ms) = split_serial(serial);
    let date = date_for_day(day)?;
    NaiveDateTime::new(date, NaiveTime::MIN).checked_add_signed(TimeDelta::milliseconds(ms))
}

/// Encode a calendar timestamp as a serial
pub fn datetime_to_serial(value: &NaiveDateTime) -> f64 {
    let mut day = i64::from(value.date().num_days_from_ce() - EPOCH_CE_DAYS);
    if day < FIRST_ACCURATE_SERIAL {
        day -= 1;
    }
    let time = value.time();
    let ms = i64::from(time.num_seconds_from_midnight()) * 1000
        + i64::from(time.nanosecond() / 1_000_000);
    day as f64 + ms as f64 / MS_PER_DAY as f64
}

/// Decode the time-of-day part of a serial as a duration
pub fn serial_to_time(serial: f64) -> Option<TimeDelta> {
    if !is_valid_serial(serial) {
        return None;
    }
    let (_, ms) = split_serial(serial);
    Some(TimeDelta::milliseconds(ms))
}

/// Encode a duration as a fraction of a day; whole days are dropped
pub fn time_to_serial(value: &TimeDelta) -> f64 {
    value.num_milliseconds().rem_euclid(MS_PER_DAY) as f64 / MS_PER_DAY as f64
}

/// Day of week for a serial, using its integral part only
pub fn serial_weekday(serial: f64) -> Option<Weekday> {
    serial_to_datetime(serial.trunc()).map(|dt| dt.weekday())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dt(y: i32, m: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    #[test]
    fn test_known_serials() {
        assert_eq!(serial_to_datetime(1.0), Some(dt(1900, 1, 1, 0, 0, 0)));
        assert_eq!(serial_to_datetime(59.0), Some(dt(1900, 2, 28, 0, 0, 0)));
        assert_eq!(serial_to_datetime(61.0), Some(dt(1900, 3, 1, 0, 0, 0)));
        assert_eq!(serial_to_datetime(45139.0), Some(dt(2023, 8, 1, 0, 0, 0)));
        assert_eq!(serial_to_datetime(36526.5), Some(dt(2000, 1, 1, 12, 0, 0)));
    }

    #[test]
    fn test_sub_one_serial_moves_forward_a_day() {
        assert_eq!(serial_to_datetime(0.0), Some(dt(1899, 12, 31, 0, 0, 0)));
        assert_eq!(serial_to_datetime(0.25), Some(dt(1899, 12, 31, 6, 0, 0)));
    }

    #[test]
    fn test_phantom_leap_day() {
        // serial 60 is the phantom 1900-02-29; it lands on March 1st
        assert_eq!(serial_to_datetime(60.0), Some(dt(1900, 3, 1, 0, 0, 0)));
        assert_eq!(datetime_to_serial(&dt(1900, 3, 1, 0, 0, 0)), 61.0);
        assert_eq!(datetime_to_serial(&dt(1900, 2, 28, 0, 0, 0)), 59.0);
    }

    #[test]
    fn test_bounds() {
        assert_eq!(
            serial_to_datetime(MAX_SERIAL),
            Some(dt(9999, 12, 31, 23, 59, 59))
        );
        assert_eq!(serial_to_datetime(-0.5), None);
        assert_eq!(serial_to_datetime(MAX_SERIAL + 1.0), None);
        assert_eq!(serial_to_datetime(f64::NAN), None);
        assert_eq!(serial_to_time(-1.0), None);
    }

    #[test]
    fn test_datetime_roundtrip() {
        let original = dt(2021, 4, 11, 15, 7, 2);
        let serial = datetime_to_serial(&original);
        assert!((serial - 44297.629884).abs() < 1e-6);
        assert_eq!(serial_to_datetime(serial), Some(original));
        assert_eq!(datetime_to_serial(&dt(1899, 12, 31, 0, 0, 0)), 0.0);
    }

    #[test]
    fn test_time_uses_fraction_only() {
        let t = serial_to_time(44297.5).unwrap();
        assert_eq!(t, TimeDelta::hours(12));
        let t = serial_to_time(0.75).unwrap();
        assert_eq!(t, TimeDelta::hours(18));
        assert_eq!(time_to_serial(&TimeDelta::hours(6)), 0.25);
        assert_eq!(time_to_serial(&TimeDelta::hours(30)), 0.25);
    }

    #[test]
    fn test_weekday() {
        // 2021-04-11 was a Sunday
        assert_eq!(serial_weekday(44297.63), Some(Weekday::Sun));
    }
}
