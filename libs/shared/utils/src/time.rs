//! Conversions between the salon's local business clock and UTC.
//!
//! The salon operates on a fixed UTC-5 offset with no daylight saving, so
//! every conversion here is total. Timestamps persist as UTC; schedules and
//! slot templates are expressed as minutes from local midnight.
//!
//! All ranges are half-open: `[start, end)`. Two ranges that merely touch at
//! an endpoint do not overlap.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, TimeZone, Utc};

pub const BUSINESS_UTC_OFFSET_HOURS: i32 = -5;
pub const MINUTES_PER_DAY: i32 = 24 * 60;

pub fn business_offset() -> FixedOffset {
    FixedOffset::east_opt(BUSINESS_UTC_OFFSET_HOURS * 3600).unwrap()
}

/// Parse `HH:MM` or `HH:MM:SS` (Postgres `time` output) to minutes from
/// midnight. Seconds are validated but dropped.
pub fn minutes_from_midnight(value: &str) -> Option<i32> {
    let parts: Vec<&str> = value.split(':').collect();
    if parts.len() < 2 || parts.len() > 3 {
        return None;
    }

    let hours: i32 = parts[0].parse().ok()?;
    let minutes: i32 = parts[1].parse().ok()?;
    if parts.len() == 3 {
        let seconds: i32 = parts[2].parse().ok()?;
        if !(0..60).contains(&seconds) {
            return None;
        }
    }

    if !(0..24).contains(&hours) || !(0..60).contains(&minutes) {
        return None;
    }

    Some(hours * 60 + minutes)
}

pub fn format_minutes(minutes: i32) -> String {
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

/// Half-open interval overlap. Works for minutes, timestamps, anything
/// ordered.
pub fn overlaps<T: PartialOrd>(a_start: T, a_end: T, b_start: T, b_end: T) -> bool {
    a_start < b_end && b_start < a_end
}

/// Instant for `minutes` past local midnight of `fecha`, in UTC.
/// `minutes` may be `MINUTES_PER_DAY` to address the exclusive end of day.
pub fn local_to_utc(fecha: NaiveDate, minutes: i32) -> DateTime<Utc> {
    let naive = fecha.and_hms_opt(0, 0, 0).unwrap() + Duration::minutes(minutes as i64);
    business_offset()
        .from_local_datetime(&naive)
        .unwrap()
        .with_timezone(&Utc)
}

/// UTC bounds of the local calendar day `fecha`, as `[start, end)`.
pub fn local_day_bounds(fecha: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    (local_to_utc(fecha, 0), local_to_utc(fecha, MINUTES_PER_DAY))
}

pub fn utc_to_local(instant: DateTime<Utc>) -> DateTime<FixedOffset> {
    instant.with_timezone(&business_offset())
}

/// Project a UTC range onto local minutes within the day `fecha`, clamping
/// to `[0, MINUTES_PER_DAY]`. Returns `None` when the range does not reach
/// into that day. A range spanning several days yields a partial band on its
/// first and last day and the full day in between.
pub fn clamp_to_local_day(
    fecha: NaiveDate,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Option<(i32, i32)> {
    let (day_start, day_end) = local_day_bounds(fecha);
    if start >= day_end || end <= day_start {
        return None;
    }

    let clamped_start = start.max(day_start);
    let clamped_end = end.min(day_end);
    if clamped_start >= clamped_end {
        return None;
    }

    let start_min = (clamped_start - day_start).num_minutes() as i32;
    let end_min = (clamped_end - day_start).num_minutes() as i32;
    Some((start_min, end_min))
}
