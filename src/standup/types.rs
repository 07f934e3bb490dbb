//! Core entities tracked by the bot.
//!
//! Deadlines and timetable slots are plain times of day (UTC); only hour and
//! minute ever take part in scheduling comparisons.

use chrono::{DateTime, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};

/// A chat channel the bot tracks standups in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    /// Storage row id.
    pub id: i64,
    /// Platform channel identifier.
    pub channel_id: String,
    /// Human-readable channel name.
    pub name: String,
    /// Channel-wide standup deadline. `None` means no collective deadline:
    /// only individually scheduled members are reminded.
    pub deadline: Option<NaiveTime>,
}

/// A person obliged to report in a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelMember {
    /// Storage row id.
    pub id: i64,
    /// Platform user identifier.
    pub user_id: String,
    /// Platform channel identifier.
    pub channel_id: String,
    /// Display name, refreshed by the membership sync.
    pub real_name: String,
    /// When the obligation was created.
    pub created_at: DateTime<Utc>,
}

/// Per-weekday deadline override for one channel member.
///
/// A set weekday replaces the channel-wide deadline for that member on that
/// day; an unset weekday means no individual obligation that day.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeTable {
    /// Storage row id.
    pub id: i64,
    /// The member this timetable belongs to (one-to-one).
    pub channel_member_id: i64,
    pub monday: Option<NaiveTime>,
    pub tuesday: Option<NaiveTime>,
    pub wednesday: Option<NaiveTime>,
    pub thursday: Option<NaiveTime>,
    pub friday: Option<NaiveTime>,
    pub saturday: Option<NaiveTime>,
    pub sunday: Option<NaiveTime>,
}

impl TimeTable {
    /// Deadline configured for the given weekday, if any.
    pub fn for_weekday(&self, weekday: Weekday) -> Option<NaiveTime> {
        match weekday {
            Weekday::Mon => self.monday,
            Weekday::Tue => self.tuesday,
            Weekday::Wed => self.wednesday,
            Weekday::Thu => self.thursday,
            Weekday::Fri => self.friday,
            Weekday::Sat => self.saturday,
            Weekday::Sun => self.sunday,
        }
    }

    /// Set or clear the deadline for one weekday.
    pub fn set_weekday(&mut self, weekday: Weekday, time: Option<NaiveTime>) {
        let slot = match weekday {
            Weekday::Mon => &mut self.monday,
            Weekday::Tue => &mut self.tuesday,
            Weekday::Wed => &mut self.wednesday,
            Weekday::Thu => &mut self.thursday,
            Weekday::Fri => &mut self.friday,
            Weekday::Sat => &mut self.saturday,
            Weekday::Sun => &mut self.sunday,
        };
        *slot = time;
    }

    /// True when no weekday has a time. An all-empty timetable does not count
    /// as an individual schedule.
    pub fn is_empty(&self) -> bool {
        self.monday.is_none()
            && self.tuesday.is_none()
            && self.wednesday.is_none()
            && self.thursday.is_none()
            && self.friday.is_none()
            && self.saturday.is_none()
            && self.sunday.is_none()
    }
}

/// One validated daily report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Standup {
    /// Storage row id.
    pub id: i64,
    /// Platform channel identifier.
    pub channel_id: String,
    /// Platform user identifier of the author.
    pub user_id: String,
    /// Report text. Empty for placeholder rows inserted by housekeeping.
    pub comment: String,
    /// Originating chat message identifier, used to find the row again when
    /// the message is edited or deleted.
    pub message_ts: String,
    /// Submission instant; day-window queries compare against this.
    pub created_at: DateTime<Utc>,
}

/// Midnight UTC of the calendar day containing `at`. Day windows for
/// non-reporter queries run `[day_start(now), now)`.
pub fn day_start(at: DateTime<Utc>) -> DateTime<Utc> {
    at.date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|naive| naive.and_utc())
        .unwrap_or(at)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use chrono::TimeZone;

    #[test]
    fn timetable_weekday_accessors_round_trip() {
        let mut tt = TimeTable::default();
        assert!(tt.is_empty());

        let ten = NaiveTime::from_hms_opt(10, 0, 0).unwrap();
        tt.set_weekday(Weekday::Wed, Some(ten));
        assert_eq!(tt.for_weekday(Weekday::Wed), Some(ten));
        assert_eq!(tt.for_weekday(Weekday::Thu), None);
        assert!(!tt.is_empty());

        tt.set_weekday(Weekday::Wed, None);
        assert!(tt.is_empty());
    }

    #[test]
    fn day_start_is_midnight_utc() {
        let at = Utc.with_ymd_and_hms(2019, 3, 4, 17, 50, 12).unwrap();
        let start = day_start(at);
        assert_eq!(start, Utc.with_ymd_and_hms(2019, 3, 4, 0, 0, 0).unwrap());
    }

    #[test]
    fn day_start_of_midnight_is_identity() {
        let at = Utc.with_ymd_and_hms(2019, 3, 4, 0, 0, 0).unwrap();
        assert_eq!(day_start(at), at);
    }
}
