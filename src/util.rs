// Utility helpers for parsing and formatting.
//
// This module centralizes the "dirty" cell handling (numbers and dates as
// they come out of spreadsheet exports) so the rest of the code can assume
// typed values.
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use num_format::{Locale, ToFormattedString};

/// Date layouts seen in dealership exports. Day-first wins over month-first
/// for slash dates. `%Y` also takes two digits, so results before
/// `MIN_YEAR` are skipped and the `%y` layouts get their turn.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d/%m/%Y",
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%d-%b-%Y",
    "%d %b %Y",
    "%d-%b-%y",
    "%d/%m/%y",
];

const MIN_YEAR: i32 = 1900;

/// Largest quantity a single cell may carry; anything above is a typo or an
/// ID pasted into the wrong column.
pub const MAX_QUANTITY: u64 = 1_000_000;

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%d/%m/%Y %H:%M"];

/// Spreadsheet serial day numbers count from 1899-12-30.
const SERIAL_MIN: f64 = 1.0;
const SERIAL_MAX: f64 = 2_958_465.0;

/// Parse a string-like value into `f64` while being forgiving about
/// formatting issues that are common in CSV exports (commas, spaces, text).
///
/// - Accepts `Option<&str>` so callers can pass through optional fields.
/// - Trims whitespace.
/// - Rejects values that contain alphabetic characters.
/// - Strips thousands separators like `","` before parsing.
/// - Returns `None` for anything that cannot be safely parsed.
pub fn parse_f64_safe(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    if s.chars().any(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let s = s.replace(",", "");
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Whole, non-negative quantity. `"2.0"` is fine, `"2.5"` and `"-1"` are not.
pub fn parse_quantity_safe(s: Option<&str>) -> Option<u64> {
    let v = parse_f64_safe(s)?;
    if v < 0.0 || v.fract() != 0.0 || v > MAX_QUANTITY as f64 {
        return None;
    }
    Some(v as u64)
}

pub fn parse_i32_safe(s: Option<&str>) -> Option<i32> {
    // `?` propagates `None` early if the option is missing.
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    s.parse::<i32>().ok()
}

/// Parse a date cell in any of the known layouts, or as a spreadsheet serial
/// number. Returns `None` for anything else.
pub fn parse_date_safe(s: Option<&str>) -> Option<NaiveDate> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    for fmt in DATE_FORMATS {
        match NaiveDate::parse_from_str(s, fmt) {
            Ok(d) if d.year() >= MIN_YEAR => return Some(d),
            _ => {}
        }
    }
    for fmt in DATETIME_FORMATS {
        match NaiveDateTime::parse_from_str(s, fmt) {
            Ok(dt) if dt.year() >= MIN_YEAR => return Some(dt.date()),
            _ => {}
        }
    }
    let serial = parse_f64_safe(Some(s))?;
    if !(SERIAL_MIN..=SERIAL_MAX).contains(&serial) {
        return None;
    }
    NaiveDate::from_ymd_opt(1899, 12, 30)?.checked_add_signed(Duration::days(serial.trunc() as i64))
}

/// Round to one decimal place.
pub fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Format a floating-point value with:
    // - a fixed number of decimal places, and
    // - locale-aware thousands separators (e.g., `1,234,567.89`).
    let neg = n.is_sign_negative() && n != 0.0;
    let abs_n = n.abs();
    let s = format!("{:.*}", decimals, abs_n);
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    let int_val: i64 = int_part.parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::en);
    if let Some(frac) = frac_part {
        if decimals > 0 {
            res.push('.');
            res.push_str(frac);
        }
    }
    if neg {
        format!("-{}", res)
    } else {
        res
    }
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    // Counts in console messages (e.g., `1,204 rows loaded`).
    n.to_formatted_string(&Locale::en)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn dates_in_common_layouts() {
        assert_eq!(parse_date_safe(Some("2025-11-03")), Some(ymd(2025, 11, 3)));
        assert_eq!(parse_date_safe(Some(" 03/11/2025 ")), Some(ymd(2025, 11, 3)));
        assert_eq!(parse_date_safe(Some("03-Nov-2025")), Some(ymd(2025, 11, 3)));
        assert_eq!(parse_date_safe(Some("2025-11-03 14:20:00")), Some(ymd(2025, 11, 3)));
        assert_eq!(parse_date_safe(Some("2025-11-03T09:00:00")), Some(ymd(2025, 11, 3)));
    }

    #[test]
    fn two_digit_years() {
        assert_eq!(parse_date_safe(Some("03-Nov-25")), Some(ymd(2025, 11, 3)));
        assert_eq!(parse_date_safe(Some("03/11/25")), Some(ymd(2025, 11, 3)));
        assert_eq!(parse_date_safe(Some("03-Nov-2025")), Some(ymd(2025, 11, 3)));
    }

    #[test]
    fn spreadsheet_serial_dates() {
        assert_eq!(parse_date_safe(Some("45964")), Some(ymd(2025, 11, 3)));
        assert_eq!(parse_date_safe(Some("45964.5")), Some(ymd(2025, 11, 3)));
        assert_eq!(parse_date_safe(Some("0")), None);
    }

    #[test]
    fn garbage_dates_are_none() {
        assert_eq!(parse_date_safe(Some("soon")), None);
        assert_eq!(parse_date_safe(Some("31/02/2025")), None);
        assert_eq!(parse_date_safe(Some("")), None);
        assert_eq!(parse_date_safe(None), None);
    }

    #[test]
    fn quantities() {
        assert_eq!(parse_quantity_safe(Some("3")), Some(3));
        assert_eq!(parse_quantity_safe(Some("1,200")), Some(1200));
        assert_eq!(parse_quantity_safe(Some("2.0")), Some(2));
        assert_eq!(parse_quantity_safe(Some("2.5")), None);
        assert_eq!(parse_quantity_safe(Some("-1")), None);
        assert_eq!(parse_quantity_safe(Some("two")), None);
        assert_eq!(parse_quantity_safe(Some(" ")), None);
        assert_eq!(parse_quantity_safe(Some("1000000")), Some(MAX_QUANTITY));
        assert_eq!(parse_quantity_safe(Some("1000001")), None);
        assert_eq!(parse_quantity_safe(Some("18446744073709551615")), None);
    }

    #[test]
    fn rounding_and_formatting() {
        assert_eq!(round1(66.666), 66.7);
        assert_eq!(round1(150.0), 150.0);
        assert_eq!(format_number(66.7, 1), "66.7");
        assert_eq!(format_number(1234.5, 1), "1,234.5");
        assert_eq!(format_number(-2.0, 0), "-2");
        assert_eq!(format_int(9855usize), "9,855");
    }
}
