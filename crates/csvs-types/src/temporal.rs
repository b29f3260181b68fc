//! Parsing of XML-Schema and UK date/time literals.
//!
//! Values carrying a timezone are normalized to UTC so that bounds and
//! values compare as instants.

use chrono::{FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};

const MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Split a trailing `Z` or `±hh:mm` timezone off an xsd lexical value.
fn split_timezone(s: &str) -> (&str, Option<FixedOffset>) {
    if let Some(body) = s.strip_suffix('Z') {
        return (body, FixedOffset::east_opt(0));
    }
    let bytes = s.as_bytes();
    let n = bytes.len();
    if n >= 6 && matches!(bytes[n - 6], b'+' | b'-') && bytes[n - 3] == b':' {
        let (body, tz) = s.split_at(n - 6);
        let hours: i32 = match tz[1..3].parse() {
            Ok(h) => h,
            Err(_) => return (s, None),
        };
        let minutes: i32 = match tz[4..6].parse() {
            Ok(m) => m,
            Err(_) => return (s, None),
        };
        if hours > 14 || minutes > 59 {
            return (s, None);
        }
        let secs = hours * 3600 + minutes * 60;
        let offset = if tz.starts_with('-') {
            FixedOffset::west_opt(secs)
        } else {
            FixedOffset::east_opt(secs)
        };
        return match offset {
            Some(o) => (body, Some(o)),
            None => (s, None),
        };
    }
    (s, None)
}

fn is_digits(s: &str) -> bool {
    all_digits(s.as_bytes())
}

fn all_digits(b: &[u8]) -> bool {
    !b.is_empty() && b.iter().all(u8::is_ascii_digit)
}

/// `YYYY-MM-DD` shape check ahead of calendar validation.
///
/// Shapes are checked on bytes so multibyte input never splits a character.
fn has_date_shape(s: &str) -> bool {
    let b = s.as_bytes();
    b.len() == 10
        && b[4] == b'-'
        && b[7] == b'-'
        && all_digits(&b[0..4])
        && all_digits(&b[5..7])
        && all_digits(&b[8..10])
}

fn has_time_shape(s: &str) -> bool {
    let b = s.as_bytes();
    b.len() >= 8
        && b[2] == b':'
        && b[5] == b':'
        && all_digits(&b[0..2])
        && all_digits(&b[3..5])
        && all_digits(&b[6..8])
        && (b.len() == 8 || (b[8] == b'.' && all_digits(&b[9..])))
}

fn parse_naive_datetime(body: &str) -> Option<NaiveDateTime> {
    let (date, time) = body.split_once('T')?;
    if !has_date_shape(date) || !has_time_shape(time) {
        return None;
    }
    NaiveDateTime::parse_from_str(body, "%Y-%m-%dT%H:%M:%S%.f").ok()
}

fn to_utc(naive: NaiveDateTime, offset: Option<FixedOffset>) -> Option<NaiveDateTime> {
    match offset {
        Some(o) => o.from_local_datetime(&naive).single().map(|dt| dt.naive_utc()),
        None => Some(naive),
    }
}

/// `xs:dateTime`, timezone optional.
pub fn parse_xsd_datetime(s: &str) -> Option<NaiveDateTime> {
    let (body, offset) = split_timezone(s);
    to_utc(parse_naive_datetime(body)?, offset)
}

/// `xs:dateTime` with a mandatory timezone.
pub fn parse_xsd_datetime_tz(s: &str) -> Option<NaiveDateTime> {
    let (body, offset) = split_timezone(s);
    let offset = offset?;
    to_utc(parse_naive_datetime(body)?, Some(offset))
}

/// `xs:date`, timezone optional and ignored.
pub fn parse_xsd_date(s: &str) -> Option<NaiveDate> {
    let (body, _) = split_timezone(s);
    if !has_date_shape(body) {
        return None;
    }
    NaiveDate::parse_from_str(body, "%Y-%m-%d").ok()
}

/// `xs:time`, timezone optional and ignored.
pub fn parse_xsd_time(s: &str) -> Option<NaiveTime> {
    let (body, _) = split_timezone(s);
    if !has_time_shape(body) {
        return None;
    }
    NaiveTime::parse_from_str(body, "%H:%M:%S%.f").ok()
}

/// `dd/mm/yyyy`.
pub fn parse_uk_date(s: &str) -> Option<NaiveDate> {
    let parts: Vec<&str> = s.split('/').collect();
    match parts.as_slice() {
        [d, m, y] if d.len() == 2 && m.len() == 2 && y.len() == 4 => {
            if !(is_digits(d) && is_digits(m) && is_digits(y)) {
                return None;
            }
            NaiveDate::from_ymd_opt(y.parse().ok()?, m.parse().ok()?, d.parse().ok()?)
        }
        _ => None,
    }
}

/// Build a calendar date from separately supplied year, month and day text.
pub fn compose_date(year: &str, month: &str, day: &str) -> Option<NaiveDate> {
    if year.len() != 4 || !is_digits(year) {
        return None;
    }
    if !(1..=2).contains(&month.len()) || !is_digits(month) {
        return None;
    }
    if !(1..=2).contains(&day.len()) || !is_digits(day) {
        return None;
    }
    NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, day.parse().ok()?)
}

fn is_wildcard(part: &str) -> bool {
    part == "*" || (!part.is_empty() && part.bytes().all(|b| b == b'?'))
}

/// Digits and `?` only, with the given width.
fn is_partial_digits(part: &str, width: usize) -> bool {
    part.len() == width && part.bytes().all(|b| b.is_ascii_digit() || b == b'?')
}

/// `dd/Month/yyyy` where any component may be unknown (`*` or `?` filled).
pub fn is_partial_uk_date(s: &str) -> bool {
    let parts: Vec<&str> = s.split('/').collect();
    let [day, month, year] = parts.as_slice() else {
        return false;
    };
    let day_ok = *day == "*"
        || (is_partial_digits(day, 2)
            && (day.contains('?') || matches!(day.parse::<u32>(), Ok(1..=31))));
    let month_ok = is_wildcard(month) || MONTHS.contains(month);
    let year_ok = *year == "*" || is_partial_digits(year, 4);
    day_ok && month_ok && year_ok
}

/// Year, month and day components where any may be a wildcard; the known
/// components must be in range, and a fully known date must exist.
pub fn is_partial_date(year: &str, month: &str, day: &str) -> bool {
    let year_known = !is_wildcard(year);
    let month_known = !is_wildcard(month);
    let day_known = !is_wildcard(day);

    if year_known && (year.len() != 4 || !is_digits(year)) {
        return false;
    }
    let month_num = if month_known {
        match month.parse::<u32>() {
            Ok(m @ 1..=12) if month.len() <= 2 => Some(m),
            _ => return false,
        }
    } else {
        None
    };
    let day_num = if day_known {
        match day.parse::<u32>() {
            Ok(d @ 1..=31) if day.len() <= 2 => Some(d),
            _ => return false,
        }
    } else {
        None
    };

    match (month_num, day_num) {
        (Some(m), Some(d)) if year_known => compose_date(year, &m.to_string(), &d.to_string()).is_some(),
        // leap year unknown: allow 29 February
        (Some(m), Some(d)) => NaiveDate::from_ymd_opt(2000, m, d).is_some(),
        _ => true,
    }
}
