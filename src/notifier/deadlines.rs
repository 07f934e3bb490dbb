//! Deadline resolution and time-of-day parsing.
//!
//! Deadlines are stored as plain times of day; this module turns them into
//! concrete UTC instants for the current calendar day and decides whether a
//! scheduler tick lands on them. Matching is minute-granular equality, never
//! a range.

use chrono::{DateTime, Datelike, NaiveTime, Timelike, Utc, Weekday};

use crate::error::{BotError, Result};
use crate::standup::{Channel, TimeTable, day_start};

/// A deadline resolved onto a concrete day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedDeadline {
    /// Instant the reports are due.
    pub deadline: DateTime<Utc>,
    /// Instant the advance warning goes out.
    pub warning: DateTime<Utc>,
}

/// Resolve a channel's collective deadline for `now`'s day.
///
/// `None` when the channel has no deadline configured.
pub fn resolve_channel_deadline(
    channel: &Channel,
    now: DateTime<Utc>,
    warning_lead_minutes: u32,
) -> Option<ResolvedDeadline> {
    channel
        .deadline
        .map(|time| resolve(time, now, warning_lead_minutes))
}

/// Resolve a member's individual deadline for `now`'s weekday.
///
/// `None` when the timetable has no entry for that weekday.
pub fn resolve_member_deadline(
    timetable: &TimeTable,
    now: DateTime<Utc>,
    warning_lead_minutes: u32,
) -> Option<ResolvedDeadline> {
    timetable
        .for_weekday(now.weekday())
        .map(|time| resolve(time, now, warning_lead_minutes))
}

fn resolve(time: NaiveTime, now: DateTime<Utc>, warning_lead_minutes: u32) -> ResolvedDeadline {
    let deadline = day_start(now)
        + chrono::Duration::seconds(i64::from(time.num_seconds_from_midnight()));
    ResolvedDeadline {
        deadline,
        warning: deadline - chrono::Duration::minutes(i64::from(warning_lead_minutes)),
    }
}

/// Does `now` land on `instant`'s calendar minute?
#[must_use]
pub fn fires_at(instant: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    instant.date_naive() == now.date_naive()
        && instant.hour() == now.hour()
        && instant.minute() == now.minute()
}

/// Channel-wide notification never runs on weekends.
#[must_use]
pub fn is_weekend(now: DateTime<Utc>) -> bool {
    matches!(now.weekday(), Weekday::Sat | Weekday::Sun)
}

// ── Time-of-day parsing for admin callers ───────────────────────────────

/// Parse a deadline argument in 24-hour `HH:MM` form.
///
/// # Errors
///
/// Distinguishes three failure shapes: short forms like `10am`, text that is
/// not `HH:MM` at all, and numeric values out of range (`25:20`, `00:62`).
pub fn parse_time_of_day(text: &str) -> Result<NaiveTime> {
    let trimmed = text.trim();
    let lowered = trimmed.to_lowercase();
    if lowered.ends_with("am") || lowered.ends_with("pm") {
        return Err(BotError::Time(
            "looks like a short time format; use the 24-hour HH:MM format instead".to_owned(),
        ));
    }

    let mut parts = trimmed.split(':');
    let (hour_part, minute_part) = match (parts.next(), parts.next(), parts.next()) {
        (Some(h), Some(m), None) => (h, m),
        _ => {
            return Err(BotError::Time(
                "could not understand the time; use the 24-hour HH:MM format".to_owned(),
            ));
        }
    };

    let hour: u32 = hour_part.parse().map_err(|_| {
        BotError::Time("could not understand the time; use the 24-hour HH:MM format".to_owned())
    })?;
    let minute: u32 = minute_part.parse().map_err(|_| {
        BotError::Time("could not understand the time; use the 24-hour HH:MM format".to_owned())
    })?;

    NaiveTime::from_hms_opt(hour, minute, 0)
        .ok_or_else(|| BotError::Time("time out of range; check the hour and minutes".to_owned()))
}

/// Render a time of day as `H:MM` (no leading zero on the hour).
#[must_use]
pub fn format_time_of_day(time: NaiveTime) -> String {
    format!("{}:{:02}", time.hour(), time.minute())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
