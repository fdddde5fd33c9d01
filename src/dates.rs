//! Tolerant timestamp parsing for job-tracking exports.
//!
//! Exports mix `DD/MM/YYYY HH:mm[:ss]` with ISO-8601-like strings, so parsing
//! tries the strict day-first pattern before falling back to a list of
//! generic formats. Nothing here fails loudly: an unusable value is `None`.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;

static DAY_FIRST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{2})/(\d{2})/(\d{4})\s(\d{2}):(\d{2})(?::(\d{2}))?").expect("valid day-first pattern")
});

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%d %b %Y %H:%M:%S",
    "%d %b %Y %H:%M",
    "%b %d %Y %H:%M:%S",
    "%b %d, %Y %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d %b %Y", "%b %d %Y", "%b %d, %Y", "%d %B %Y", "%B %d, %Y",
];

/// Label format for monthly buckets and the month filter, e.g. `Dec'24`.
pub const MONTH_LABEL_FORMAT: &str = "%b'%y";

/// Parse an export timestamp.
///
/// A `DD/MM/YYYY HH:mm[:ss]` match anywhere in the string wins; if the matched
/// fields do not form a calendar instant the value is rejected rather than
/// handed to the generic formats.
pub fn parse_date(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim();
    if s.is_empty() { return None; }
    if let Some(caps) = DAY_FIRST.captures(s) {
        let num = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u32>().ok());
        let day = num(1)?;
        let month = num(2)?;
        let year = caps.get(3)?.as_str().parse::<i32>().ok()?;
        let hour = num(4)?;
        let minute = num(5)?;
        let second = num(6).unwrap_or(0);
        let date = NaiveDate::from_ymd_opt(year, month, day)?;
        let time = NaiveTime::from_hms_opt(hour, minute, second)?;
        return Some(NaiveDateTime::new(date, time));
    }
    parse_generic(s)
}

fn parse_generic(s: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) { return Some(dt.naive_local()); }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) { return Some(dt.naive_local()); }
    for f in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, f) { return Some(dt); }
    }
    for f in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, f) { return d.and_hms_opt(0, 0, 0); }
    }
    None
}

pub fn month_label(dt: &NaiveDateTime) -> String { dt.format(MONTH_LABEL_FORMAT).to_string() }

/// First day of the month a label names, used to order labels chronologically.
pub fn month_start(label: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(&format!("01 {}", label.trim()), &format!("%d {MONTH_LABEL_FORMAT}")).ok()
}

/// Sort month labels chronologically; labels that do not parse go last in
/// their original relative order.
pub fn sort_month_labels<T, F>(items: &mut [T], label: F)
where
    F: Fn(&T) -> &str,
{
    items.sort_by_key(|it| month_start(label(it)).map_or((1, NaiveDate::MIN), |d| (0, d)));
}

/// Elapsed hours from `start` to `end`; negative when `end` precedes `start`.
pub fn hours_between(start: &NaiveDateTime, end: &NaiveDateTime) -> f64 {
    (*end - *start).num_milliseconds() as f64 / 3_600_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn dt(y: i32, m: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(h, mi, s).unwrap()
    }

    #[test]
    fn day_first_with_and_without_seconds() {
        assert_eq!(parse_date("05/03/2024 14:30"), Some(dt(2024, 3, 5, 14, 30, 0)));
        assert_eq!(parse_date(" 05/03/2024 14:30:59 "), Some(dt(2024, 3, 5, 14, 30, 59)));
    }

    #[test]
    fn day_first_out_of_range_is_rejected() {
        assert_eq!(parse_date("31/02/2024 10:00"), None);
        assert_eq!(parse_date("01/13/2024 10:00"), None);
    }

    #[test]
    fn iso_fallback() {
        assert_eq!(parse_date("2024-03-05T14:30:00"), Some(dt(2024, 3, 5, 14, 30, 0)));
        assert_eq!(parse_date("2024-03-05 08:15:00"), Some(dt(2024, 3, 5, 8, 15, 0)));
        assert_eq!(parse_date("2024-03-05T14:30:00Z"), Some(dt(2024, 3, 5, 14, 30, 0)));
        assert_eq!(parse_date("2024-03-05"), Some(dt(2024, 3, 5, 0, 0, 0)));
    }

    #[test]
    fn garbage_and_blank_are_none() {
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("   "), None);
        assert_eq!(parse_date("not a date"), None);
        assert_eq!(parse_date("N/A"), None);
    }

    #[test]
    fn month_labels_sort_across_year_boundary() {
        let mut labels = vec!["Jan'25".to_string(), "Dec'24".to_string(), "Feb'24".to_string()];
        sort_month_labels(&mut labels, |s| s.as_str());
        assert_eq!(labels, vec!["Feb'24", "Dec'24", "Jan'25"]);
        assert_eq!(month_label(&dt(2024, 12, 9, 0, 0, 0)), "Dec'24");
    }

    #[test]
    fn hours_can_be_negative() {
        let a = dt(2024, 1, 1, 10, 0, 0);
        let b = dt(2024, 1, 1, 11, 30, 0);
        assert_abs_diff_eq!(hours_between(&a, &b), 1.5, epsilon = 1e-12);
        assert_abs_diff_eq!(hours_between(&b, &a), -1.5, epsilon = 1e-12);
    }
}
