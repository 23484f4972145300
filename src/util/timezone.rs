//! Conversions between stored `time` timestamps and the site's display timezone.

use chrono::{DateTime, Datelike, TimeZone, Utc};
use chrono_tz::Tz;
use time::{OffsetDateTime, UtcOffset};

pub fn localized_datetime(time: OffsetDateTime, tz: Tz) -> DateTime<Tz> {
    let utc = time.to_offset(UtcOffset::UTC);
    let seconds = utc.unix_timestamp();
    let datetime_utc = DateTime::<Utc>::from_timestamp(seconds, utc.nanosecond())
        .or_else(|| DateTime::<Utc>::from_timestamp(seconds, 0))
        .unwrap_or_default();
    tz.from_utc_datetime(&datetime_utc.naive_utc())
}

/// ISO-8601 timestamp with second precision and the zone offset, e.g. `2023-04-05T10:30:00-04:00`.
pub fn iso_seconds(time: OffsetDateTime, tz: Tz) -> String {
    localized_datetime(time, tz)
        .format("%Y-%m-%dT%H:%M:%S%:z")
        .to_string()
}

/// Short human date shown on post cards, e.g. `Apr 05, 2023`.
pub fn date_label(time: OffsetDateTime, tz: Tz) -> String {
    localized_datetime(time, tz).format("%b %d, %Y").to_string()
}

/// RFC 2822 timestamp in the site timezone, as used by RSS.
pub fn rfc2822(time: OffsetDateTime, tz: Tz) -> String {
    localized_datetime(time, tz).to_rfc2822()
}

pub fn current_year(now: OffsetDateTime, tz: Tz) -> i32 {
    localized_datetime(now, tz).year()
}
