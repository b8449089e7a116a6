//! Divider label formatting

use chrono::{DateTime, Datelike, Local, TimeZone, Utc};
use std::fmt::Display;

const DAY_MS: f64 = 24.0 * 60.0 * 60.0 * 1000.0;

/// Format a divider label for `date` as seen at `now`
///
/// Recent dates (the last day, or the last week on a different weekday)
/// show the time and weekday; older dates show the calendar day, with the
/// year only when it differs from the current one.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use chatline::history::timestamp::format_timestamp;
///
/// let now = Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap();
/// let date = Utc.with_ymd_and_hms(2024, 3, 15, 10, 30, 0).unwrap();
/// assert_eq!(format_timestamp(&date, &now), "Sent at 10:30 on Friday");
/// ```
pub fn format_timestamp<Tz>(date: &DateTime<Tz>, now: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let days_ago = (now.clone() - date.clone()).num_milliseconds() as f64 / DAY_MS;

    let format = if days_ago < 1.0 || (days_ago < 7.0 && now.weekday() != date.weekday()) {
        "Sent at %H:%M on %A"
    } else if date.year() == now.year() {
        "%A, %B %d"
    } else {
        "%A, %B %d, %Y"
    };

    date.format(format).to_string()
}

/// Format an epoch timestamp in the local time zone
pub fn format_local(timestamp: i64, now: &DateTime<Utc>) -> String {
    let date = DateTime::from_timestamp(timestamp, 0)
        .unwrap_or_default()
        .with_timezone(&Local);
    format_timestamp(&date, &now.with_timezone(&Local))
}
