//! Day/month/year date normalization
//!
//! Source dates look like `05/03/2024`. Stored dates are `2024-03-05`.
//! Anything that is not a real `D/M/YYYY` calendar date becomes `None`.

use chrono::NaiveDate;

const SEPARATOR: char = '/';

/// Convert `DD/MM/YYYY` into `YYYY-MM-DD`; blank or malformed input yields `None`
pub fn normalize_date(raw: &str) -> Option<String> {
    parse_date(raw).map(|date| date.format("%Y-%m-%d").to_string())
}

/// Parse `D/M/YYYY` (one or two digit day and month, four digit year)
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let mut parts = raw.split(SEPARATOR);
    let day = numeric_part(parts.next()?, 2)?;
    let month = numeric_part(parts.next()?, 2)?;
    let year = parts.next()?;
    if parts.next().is_some() || year.len() != 4 {
        return None;
    }
    let year = numeric_part(year, 4)?;

    NaiveDate::from_ymd_opt(year as i32, month, day)
}

fn numeric_part(part: &str, max_len: usize) -> Option<u32> {
    let part = part.trim();
    if part.is_empty() || part.len() > max_len || !part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    part.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_date_basic() {
        assert_eq!(normalize_date("05/03/2024").as_deref(), Some("2024-03-05"));
    }

    #[test]
    fn test_normalize_date_pads_day_and_month() {
        assert_eq!(normalize_date("5/3/2024").as_deref(), Some("2024-03-05"));
        assert_eq!(normalize_date("1/12/1999").as_deref(), Some("1999-12-01"));
    }

    #[test]
    fn test_normalize_date_surrounding_whitespace() {
        assert_eq!(normalize_date("  31/12/2023 ").as_deref(), Some("2023-12-31"));
    }

    #[test]
    fn test_normalize_date_blank_is_none() {
        assert_eq!(normalize_date(""), None);
        assert_eq!(normalize_date("   "), None);
        assert_eq!(normalize_date("\t"), None);
    }

    #[test]
    fn test_normalize_date_garbage_is_none() {
        assert_eq!(normalize_date("abc"), None);
        assert_eq!(normalize_date("05-03-2024"), None);
        assert_eq!(normalize_date("05/03"), None);
        assert_eq!(normalize_date("05/03/2024/1"), None);
        assert_eq!(normalize_date("aa/bb/cccc"), None);
        assert_eq!(normalize_date("//"), None);
    }

    #[test]
    fn test_normalize_date_rejects_short_year() {
        assert_eq!(normalize_date("05/03/24"), None);
    }

    #[test]
    fn test_normalize_date_rejects_impossible_dates() {
        assert_eq!(normalize_date("31/02/2024"), None);
        assert_eq!(normalize_date("00/01/2024"), None);
        assert_eq!(normalize_date("01/13/2024"), None);
    }

    #[test]
    fn test_normalize_date_leap_day() {
        assert_eq!(normalize_date("29/02/2024").as_deref(), Some("2024-02-29"));
        assert_eq!(normalize_date("29/02/2023"), None);
    }

    #[test]
    fn test_parse_date_returns_calendar_date() {
        assert_eq!(
            parse_date("05/03/2024"),
            NaiveDate::from_ymd_opt(2024, 3, 5)
        );
    }
}
