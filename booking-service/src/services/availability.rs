//! Slot derivation from the operating-hours setting.
//!
//! A slot is identified by its exact instant. Bookings are only ever created
//! at slot-aligned instants, and the bookings collection carries a unique
//! index on that instant, so equality is enough to detect a taken slot.

use chrono::{
    DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, SecondsFormat, SubsecRound,
    TimeZone, Utc,
};
use std::collections::HashSet;

use crate::models::OperatingHours;

/// Open/close instants for one business day. `None` when the hours are
/// misconfigured (close at or before open).
pub fn day_window(
    date: NaiveDate,
    hours: &OperatingHours,
    offset: FixedOffset,
) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let start = local_to_utc(date.and_time(hours.start), offset)?;
    let end = local_to_utc(date.and_time(hours.end), offset)?;
    if end <= start {
        return None;
    }
    Some((start, end))
}

/// Bookable instants for `date`, ascending.
///
/// Only slots that finish by closing time are offered. Excludes instants
/// present in `booked` and any instant at or before `now`.
pub fn compute_slots(
    date: NaiveDate,
    hours: &OperatingHours,
    offset: FixedOffset,
    booked: &HashSet<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Vec<DateTime<Utc>> {
    let Some((start, end)) = day_window(date, hours, offset) else {
        return Vec::new();
    };
    if hours.slot_minutes == 0 {
        return Vec::new();
    }

    let step = Duration::minutes(i64::from(hours.slot_minutes));
    let mut slots = Vec::new();
    let mut cursor = start;
    while cursor + step <= end {
        if !booked.contains(&cursor) && cursor > now {
            slots.push(cursor);
        }
        cursor += step;
    }
    slots
}

/// ISO-8601 UTC with milliseconds, e.g. `2026-01-05T09:00:00.000Z`.
pub fn format_slot(slot: &DateTime<Utc>) -> String {
    slot.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Strict `YYYY-MM-DD`.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.len() != 10 {
        return None;
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}

/// Parse a requested appointment time.
///
/// Accepts an RFC 3339 instant, or a local date-time without offset which is
/// read in the business timezone. Sub-millisecond precision is dropped to
/// match stored instants.
pub fn parse_scheduled_at(value: &str, offset: FixedOffset) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(instant) = DateTime::parse_from_rfc3339(value) {
        return Some(instant.with_timezone(&Utc).trunc_subsecs(3));
    }

    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .and_then(|naive| local_to_utc(naive, offset))
        .map(|instant| instant.trunc_subsecs(3))
}

/// Calendar date of `instant` in the business timezone.
pub fn local_date(instant: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    instant.with_timezone(&offset).date_naive()
}

fn local_to_utc(naive: NaiveDateTime, offset: FixedOffset) -> Option<DateTime<Utc>> {
    offset
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}
