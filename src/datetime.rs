//! Date/time utilities for Gator.
//!
//! Covers three concerns: resolving the free-form `pubDate` of feed items,
//! the fixed-width text encoding used for timestamps in the database, and
//! formatting timestamps for display.

use chrono::{DateTime, FixedOffset, NaiveDateTime, SecondsFormat, Utc};
use chrono_tz::Tz;

/// RFC 1123 with a numeric zone, e.g. `Mon, 02 Jan 2006 15:04:05 -0700`.
const RFC1123Z_BODY: &str = "%d %b %Y %H:%M:%S %z";

/// RFC 1123 without the zone, e.g. `02 Jan 2006 15:04:05`.
const RFC1123_BODY: &str = "%d %b %Y %H:%M:%S";

/// Resolve the publish date of a feed item.
///
/// Tries, in order, the RFC 1123 layout with a numeric zone and the RFC 1123
/// layout with a named zone. An empty or unparsable string resolves to `now`.
/// This never fails: a bad date must not abort ingestion.
pub fn resolve_published_at(raw: &str, now: DateTime<Utc>) -> DateTime<Utc> {
    let raw = raw.trim();
    if raw.is_empty() {
        return now;
    }

    parse_rfc1123z(raw)
        .or_else(|| parse_rfc1123(raw))
        .unwrap_or(now)
}

/// Parse `Mon, 02 Jan 2006 15:04:05 -0700`.
pub fn parse_rfc1123z(raw: &str) -> Option<DateTime<Utc>> {
    let body = strip_weekday(raw)?;
    DateTime::parse_from_str(body, RFC1123Z_BODY)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Parse `Mon, 02 Jan 2006 15:04:05 MST`.
///
/// RFC 822 zone names map to their offsets; any other alphabetic
/// abbreviation is taken as UTC.
pub fn parse_rfc1123(raw: &str) -> Option<DateTime<Utc>> {
    let body = strip_weekday(raw)?;
    let (datetime, zone) = body.rsplit_once(' ')?;
    if zone.is_empty() || !zone.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }

    let naive = NaiveDateTime::parse_from_str(datetime, RFC1123_BODY).ok()?;
    let offset = named_zone_offset(zone)?;
    naive
        .and_local_timezone(offset)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Strip the leading `Mon, ` day name.
///
/// The name must be a valid English abbreviation but, as with most feed
/// readers, it is not checked against the date itself.
fn strip_weekday(raw: &str) -> Option<&str> {
    let (day, rest) = raw.split_once(", ")?;
    const DAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];
    if DAYS.contains(&day) {
        Some(rest.trim_start())
    } else {
        None
    }
}

fn named_zone_offset(zone: &str) -> Option<FixedOffset> {
    let hours = match zone.to_ascii_uppercase().as_str() {
        "UT" | "UTC" | "GMT" | "Z" => 0,
        "EST" => -5,
        "EDT" => -4,
        "CST" => -6,
        "CDT" => -5,
        "MST" => -7,
        "MDT" => -6,
        "PST" => -8,
        "PDT" => -7,
        _ => 0,
    };
    FixedOffset::east_opt(hours * 3600)
}

/// Encode a timestamp for storage.
///
/// Fixed width, always UTC, microsecond precision, so that text ordering in
/// SQL matches time ordering.
pub fn to_db_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Decode a stored timestamp.
pub fn from_db_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Format a DateTime<Utc> to the specified timezone.
///
/// # Arguments
///
/// * `dt` - DateTime in UTC
/// * `timezone` - Timezone name (e.g., "Asia/Tokyo", "UTC")
/// * `format` - Output format string (e.g., "%Y/%m/%d %H:%M")
///
/// Falls back to UTC when the timezone is unknown.
pub fn format_utc_datetime(dt: &DateTime<Utc>, timezone: &str, format: &str) -> String {
    let tz: Tz = match timezone.parse() {
        Ok(tz) => tz,
        Err(_) => return dt.format(format).to_string(),
    };
    dt.with_timezone(&tz).format(format).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_resolve_numeric_zone() {
        let dt = resolve_published_at("Mon, 02 Jan 2006 15:04:05 -0700", fixed_now());
        assert_eq!(dt, Utc.with_ymd_and_hms(2006, 1, 2, 22, 4, 5).unwrap());
    }

    #[test]
    fn test_resolve_named_zone() {
        let dt = resolve_published_at("Mon, 02 Jan 2006 15:04:05 MST", fixed_now());
        assert_eq!(dt, Utc.with_ymd_and_hms(2006, 1, 2, 22, 4, 5).unwrap());
    }

    #[test]
    fn test_resolve_gmt() {
        let dt = resolve_published_at("Mon, 21 Oct 2024 07:28:00 GMT", fixed_now());
        assert_eq!(dt, Utc.with_ymd_and_hms(2024, 10, 21, 7, 28, 0).unwrap());
    }

    #[test]
    fn test_resolve_unknown_abbreviation_is_utc() {
        let dt = resolve_published_at("Tue, 03 Jan 2006 10:00:00 XYZ", fixed_now());
        assert_eq!(dt, Utc.with_ymd_and_hms(2006, 1, 3, 10, 0, 0).unwrap());
    }

    #[test]
    fn test_resolve_ignores_weekday_mismatch() {
        // 2 Jan 2006 was a Monday
        let dt = resolve_published_at("Fri, 02 Jan 2006 15:04:05 +0000", fixed_now());
        assert_eq!(dt, Utc.with_ymd_and_hms(2006, 1, 2, 15, 4, 5).unwrap());
    }

    #[test]
    fn test_resolve_empty_falls_back_to_now() {
        assert_eq!(resolve_published_at("", fixed_now()), fixed_now());
        assert_eq!(resolve_published_at("   ", fixed_now()), fixed_now());
    }

    #[test]
    fn test_resolve_garbage_falls_back_to_now() {
        assert_eq!(resolve_published_at("yesterday-ish", fixed_now()), fixed_now());
        assert_eq!(
            resolve_published_at("2006-01-02T15:04:05Z", fixed_now()),
            fixed_now()
        );
        assert_eq!(
            resolve_published_at("Xyz, 02 Jan 2006 15:04:05 GMT", fixed_now()),
            fixed_now()
        );
    }

    #[test]
    fn test_resolve_garbage_is_close_to_real_now() {
        let before = Utc::now();
        let dt = resolve_published_at("not a date", Utc::now());
        let after = Utc::now();
        assert!(dt >= before && dt <= after);
    }

    #[test]
    fn test_numeric_layout_does_not_accept_named_zone() {
        assert!(parse_rfc1123z("Mon, 02 Jan 2006 15:04:05 MST").is_none());
        assert!(parse_rfc1123("Mon, 02 Jan 2006 15:04:05 -0700").is_none());
    }

    #[test]
    fn test_db_timestamp_is_fixed_width() {
        let a = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
        let b = a + chrono::Duration::milliseconds(500);
        let sa = to_db_timestamp(&a);
        let sb = to_db_timestamp(&b);
        assert_eq!(sa, "2024-01-15T10:30:00.000000Z");
        assert_eq!(sa.len(), sb.len());
        assert!(sa < sb);
        assert_eq!(from_db_timestamp(&sb), Some(b));
    }

    #[test]
    fn test_from_db_timestamp_invalid() {
        assert!(from_db_timestamp("not a date").is_none());
    }

    #[test]
    fn test_format_utc_datetime() {
        let dt = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
        let result = format_utc_datetime(&dt, "Asia/Tokyo", "%Y/%m/%d %H:%M");
        assert_eq!(result, "2024/01/15 19:30"); // UTC+9
    }

    #[test]
    fn test_format_utc_datetime_invalid_timezone() {
        let dt = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
        let result = format_utc_datetime(&dt, "Invalid/Zone", "%Y/%m/%d %H:%M");
        assert_eq!(result, "2024/01/15 10:30");
    }
}
