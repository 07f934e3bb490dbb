//! SQLite-backed standup repository.
//!
//! One database file holds channels, members, timetables and standups.
//! Thread-safe via an internal `Mutex<Connection>`; all access serializes on
//! the mutex, which is plenty for a scheduler that touches the store a few
//! times per minute.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, NaiveTime, Timelike, Utc, Weekday};
use rusqlite::{Connection, OptionalExtension, params};

use super::schema::apply_schema;
use crate::standup::{Channel, ChannelMember, Standup, TimeTable};

/// Fields for inserting a new standup row.
pub struct NewStandup<'a> {
    pub channel_id: &'a str,
    pub user_id: &'a str,
    pub comment: &'a str,
    pub message_ts: &'a str,
    pub created_at: DateTime<Utc>,
}

/// SQLite-backed standup repository.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database at `path`, creating parent directories
    /// and applying the schema as needed.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::Io(e.to_string()))?;
        }
        let conn = Connection::open(path)?;
        apply_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory database, used by tests and throwaway runs.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        apply_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    // ── Channels ────────────────────────────────────────────────────────

    /// Insert the channel if unknown, otherwise refresh its name. Returns
    /// the stored row either way.
    pub fn ensure_channel(&self, channel_id: &str, name: &str) -> Result<Channel, StoreError> {
        {
            let conn = self.lock()?;
            conn.execute(
                "INSERT INTO channels (channel_id, name) VALUES (?1, ?2) \
                 ON CONFLICT(channel_id) DO UPDATE SET name = excluded.name",
                params![channel_id, name],
            )?;
        }
        self.select_channel(channel_id)
    }

    /// Look up a channel by its platform identifier.
    pub fn select_channel(&self, channel_id: &str) -> Result<Channel, StoreError> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT id, channel_id, name, deadline FROM channels WHERE channel_id = ?1",
            params![channel_id],
            row_to_channel,
        )
        .optional()?
        .ok_or_else(|| StoreError::NotFound(format!("channel {channel_id}")))
    }

    /// Set or clear the channel-wide deadline.
    pub fn set_channel_deadline(
        &self,
        channel_id: &str,
        deadline: Option<NaiveTime>,
    ) -> Result<(), StoreError> {
        let conn = self.lock()?;
        let rows = conn.execute(
            "UPDATE channels SET deadline = ?1 WHERE channel_id = ?2",
            params![deadline.map(time_to_secs), channel_id],
        )?;
        if rows == 0 {
            return Err(StoreError::NotFound(format!("channel {channel_id}")));
        }
        Ok(())
    }

    /// Channels that have a collective deadline configured.
    pub fn channels_with_deadline(&self) -> Result<Vec<Channel>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, channel_id, name, deadline FROM channels \
             WHERE deadline IS NOT NULL ORDER BY id",
        )?;
        let rows = stmt.query_map([], row_to_channel)?;
        collect(rows)
    }

    // ── Members ─────────────────────────────────────────────────────────

    /// Register a standup obligation for a person in a channel.
    ///
    /// Re-registering an existing (user, channel) pair refreshes the display
    /// name and returns the original row.
    pub fn create_member(
        &self,
        user_id: &str,
        channel_id: &str,
        real_name: &str,
        created_at: DateTime<Utc>,
    ) -> Result<ChannelMember, StoreError> {
        {
            let conn = self.lock()?;
            conn.execute(
                "INSERT INTO channel_members (user_id, channel_id, real_name, created_at) \
                 VALUES (?1, ?2, ?3, ?4) \
                 ON CONFLICT(user_id, channel_id) DO UPDATE SET real_name = excluded.real_name",
                params![user_id, channel_id, real_name, created_at.timestamp()],
            )?;
        }
        self.find_member(user_id, channel_id)?
            .ok_or_else(|| StoreError::NotFound(format!("member {user_id} in {channel_id}")))
    }

    /// Look up a member by row id.
    pub fn select_member(&self, member_id: i64) -> Result<ChannelMember, StoreError> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT id, user_id, channel_id, real_name, created_at \
             FROM channel_members WHERE id = ?1",
            params![member_id],
            row_to_member,
        )
        .optional()?
        .ok_or_else(|| StoreError::NotFound(format!("member #{member_id}")))
    }

    /// Look up a member by (user, channel).
    pub fn find_member(
        &self,
        user_id: &str,
        channel_id: &str,
    ) -> Result<Option<ChannelMember>, StoreError> {
        let conn = self.lock()?;
        Ok(conn
            .query_row(
                "SELECT id, user_id, channel_id, real_name, created_at \
                 FROM channel_members WHERE user_id = ?1 AND channel_id = ?2",
                params![user_id, channel_id],
                row_to_member,
            )
            .optional()?)
    }

    /// All members obliged to report in one channel.
    pub fn list_channel_members(&self, channel_id: &str) -> Result<Vec<ChannelMember>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, user_id, channel_id, real_name, created_at \
             FROM channel_members WHERE channel_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![channel_id], row_to_member)?;
        collect(rows)
    }

    /// Every obligation across all channels (housekeeping fill).
    pub fn list_all_members(&self) -> Result<Vec<ChannelMember>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, user_id, channel_id, real_name, created_at \
             FROM channel_members ORDER BY id",
        )?;
        let rows = stmt.query_map([], row_to_member)?;
        collect(rows)
    }

    /// Remove one obligation. The member's timetable row cascades away.
    pub fn delete_member(&self, member_id: i64) -> Result<(), StoreError> {
        let conn = self.lock()?;
        let rows = conn.execute(
            "DELETE FROM channel_members WHERE id = ?1",
            params![member_id],
        )?;
        if rows == 0 {
            return Err(StoreError::NotFound(format!("member #{member_id}")));
        }
        Ok(())
    }

    /// Remove every obligation of a person who left the workspace. Returns
    /// the number of removed rows; timetables cascade.
    pub fn delete_members_of_user(&self, user_id: &str) -> Result<usize, StoreError> {
        let conn = self.lock()?;
        let rows = conn.execute(
            "DELETE FROM channel_members WHERE user_id = ?1",
            params![user_id],
        )?;
        Ok(rows)
    }

    /// Refresh the display name on every obligation of a user.
    pub fn update_member_names(&self, user_id: &str, real_name: &str) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "UPDATE channel_members SET real_name = ?1 WHERE user_id = ?2",
            params![real_name, user_id],
        )?;
        Ok(())
    }

    // ── Timetables ──────────────────────────────────────────────────────

    /// The member's timetable, if one exists.
    pub fn timetable_for_member(&self, member_id: i64) -> Result<Option<TimeTable>, StoreError> {
        let conn = self.lock()?;
        Ok(conn
            .query_row(
                "SELECT id, channel_member_id, monday, tuesday, wednesday, thursday, \
                 friday, saturday, sunday FROM timetables WHERE channel_member_id = ?1",
                params![member_id],
                row_to_timetable,
            )
            .optional()?)
    }

    /// Set or clear one weekday slot, creating the timetable row on first
    /// use. Returns the stored timetable.
    pub fn set_timetable_slot(
        &self,
        member_id: i64,
        weekday: Weekday,
        time: Option<NaiveTime>,
    ) -> Result<TimeTable, StoreError> {
        let column = weekday_column(weekday);
        {
            let conn = self.lock()?;
            conn.execute(
                "INSERT OR IGNORE INTO timetables (channel_member_id) VALUES (?1)",
                params![member_id],
            )?;
            // Column name comes from the fixed weekday match above.
            let sql =
                format!("UPDATE timetables SET {column} = ?1 WHERE channel_member_id = ?2");
            conn.execute(&sql, params![time.map(time_to_secs), member_id])?;
        }
        self.timetable_for_member(member_id)?
            .ok_or_else(|| StoreError::NotFound(format!("timetable for member #{member_id}")))
    }

    /// True when the member has an individual schedule: a timetable row with
    /// at least one weekday set. Such members are excluded from channel-wide
    /// reminders.
    pub fn member_has_timetable(&self, member_id: i64) -> Result<bool, StoreError> {
        let conn = self.lock()?;
        let exists: i64 = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM timetables WHERE channel_member_id = ?1 AND ( \
             monday IS NOT NULL OR tuesday IS NOT NULL OR wednesday IS NOT NULL OR \
             thursday IS NOT NULL OR friday IS NOT NULL OR saturday IS NOT NULL OR \
             sunday IS NOT NULL))",
            params![member_id],
            |row| row.get(0),
        )?;
        Ok(exists != 0)
    }

    /// Timetables with a slot for the given weekday, joined with their
    /// members. Drives the individual scheduler pass.
    pub fn timetables_for_weekday(
        &self,
        weekday: Weekday,
    ) -> Result<Vec<(TimeTable, ChannelMember)>, StoreError> {
        let column = weekday_column(weekday);
        let conn = self.lock()?;
        // Column name comes from the fixed weekday match above.
        let sql = format!(
            "SELECT t.id, t.channel_member_id, t.monday, t.tuesday, t.wednesday, \
             t.thursday, t.friday, t.saturday, t.sunday, \
             m.id, m.user_id, m.channel_id, m.real_name, m.created_at \
             FROM timetables t \
             JOIN channel_members m ON m.id = t.channel_member_id \
             WHERE t.{column} IS NOT NULL ORDER BY t.id"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], |row| {
            let timetable = row_to_timetable(row)?;
            let member = ChannelMember {
                id: row.get(9)?,
                user_id: row.get(10)?,
                channel_id: row.get(11)?,
                real_name: row.get(12)?,
                created_at: ts_to_datetime(row.get(13)?),
            };
            Ok((timetable, member))
        })?;
        collect(rows)
    }

    // ── Standups ────────────────────────────────────────────────────────

    /// Insert a validated report (or a housekeeping placeholder).
    pub fn create_standup(&self, new: NewStandup<'_>) -> Result<Standup, StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO standups (channel_id, user_id, comment, message_ts, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                new.channel_id,
                new.user_id,
                new.comment,
                new.message_ts,
                new.created_at.timestamp()
            ],
        )?;
        let id = conn.last_insert_rowid();
        conn.query_row(
            "SELECT id, channel_id, user_id, comment, message_ts, created_at \
             FROM standups WHERE id = ?1",
            params![id],
            row_to_standup,
        )
        .map_err(StoreError::from)
    }

    /// Find a standup by its originating message identifier.
    pub fn standup_by_ts(&self, message_ts: &str) -> Result<Standup, StoreError> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT id, channel_id, user_id, comment, message_ts, created_at \
             FROM standups WHERE message_ts = ?1 LIMIT 1",
            params![message_ts],
            row_to_standup,
        )
        .optional()?
        .ok_or_else(|| StoreError::NotFound(format!("standup for message {message_ts}")))
    }

    /// Replace the text (and message identity) of a stored report.
    pub fn update_standup(
        &self,
        id: i64,
        comment: &str,
        message_ts: &str,
    ) -> Result<(), StoreError> {
        let conn = self.lock()?;
        let rows = conn.execute(
            "UPDATE standups SET comment = ?1, message_ts = ?2 WHERE id = ?3",
            params![comment, message_ts, id],
        )?;
        if rows == 0 {
            return Err(StoreError::NotFound(format!("standup #{id}")));
        }
        Ok(())
    }

    /// Remove a report whose originating message was deleted.
    pub fn delete_standup(&self, id: i64) -> Result<(), StoreError> {
        let conn = self.lock()?;
        let rows = conn.execute("DELETE FROM standups WHERE id = ?1", params![id])?;
        if rows == 0 {
            return Err(StoreError::NotFound(format!("standup #{id}")));
        }
        Ok(())
    }

    /// The user's most recent standup in the channel within `[from, to)`,
    /// if any.
    pub fn latest_standup_in_window(
        &self,
        user_id: &str,
        channel_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Option<Standup>, StoreError> {
        let conn = self.lock()?;
        Ok(conn
            .query_row(
                "SELECT id, channel_id, user_id, comment, message_ts, created_at \
                 FROM standups WHERE user_id = ?1 AND channel_id = ?2 \
                 AND created_at >= ?3 AND created_at < ?4 \
                 ORDER BY created_at DESC, id DESC LIMIT 1",
                params![user_id, channel_id, from.timestamp(), to.timestamp()],
                row_to_standup,
            )
            .optional()?)
    }

    /// Has the user submitted in the channel within `[from, to)`?
    pub fn submitted_in_window(
        &self,
        user_id: &str,
        channel_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let conn = self.lock()?;
        let exists: i64 = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM standups \
             WHERE user_id = ?1 AND channel_id = ?2 \
             AND created_at >= ?3 AND created_at < ?4)",
            params![user_id, channel_id, from.timestamp(), to.timestamp()],
            |row| row.get(0),
        )?;
        Ok(exists != 0)
    }

    /// Members of the channel with no standup in `[from, to)`.
    ///
    /// Does not know about timetables; the caller decides whether
    /// individually scheduled members belong in the result.
    pub fn non_reporters(
        &self,
        channel_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<ChannelMember>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT m.id, m.user_id, m.channel_id, m.real_name, m.created_at \
             FROM channel_members m \
             WHERE m.channel_id = ?1 AND NOT EXISTS ( \
                 SELECT 1 FROM standups s \
                 WHERE s.user_id = m.user_id AND s.channel_id = m.channel_id \
                 AND s.created_at >= ?2 AND s.created_at < ?3) \
             ORDER BY m.id",
        )?;
        let rows = stmt.query_map(
            params![channel_id, from.timestamp(), to.timestamp()],
            row_to_member,
        )?;
        collect(rows)
    }

    /// Reports submitted in a channel within `[from, to)`.
    pub fn standups_in_window(
        &self,
        channel_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Standup>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, channel_id, user_id, comment, message_ts, created_at \
             FROM standups WHERE channel_id = ?1 \
             AND created_at >= ?2 AND created_at < ?3 ORDER BY created_at",
        )?;
        let rows = stmt.query_map(
            params![channel_id, from.timestamp(), to.timestamp()],
            row_to_standup,
        )?;
        collect(rows)
    }

    /// Reports by one user across all channels within `[from, to)`.
    pub fn standups_for_user_in_window(
        &self,
        user_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Standup>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, channel_id, user_id, comment, message_ts, created_at \
             FROM standups WHERE user_id = ?1 \
             AND created_at >= ?2 AND created_at < ?3 ORDER BY created_at",
        )?;
        let rows = stmt.query_map(
            params![user_id, from.timestamp(), to.timestamp()],
            row_to_standup,
        )?;
        collect(rows)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|e| StoreError::Lock(e.to_string()))
    }
}

/// Errors from the standup store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("lock poisoned: {0}")]
    Lock(String),
}

impl StoreError {
    /// True for the absent-row case, which callers often treat as "nothing
    /// to do" rather than a failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

// ── Row mappers and conversions ─────────────────────────────────────────

fn row_to_channel(row: &rusqlite::Row<'_>) -> rusqlite::Result<Channel> {
    let deadline: Option<i64> = row.get(3)?;
    Ok(Channel {
        id: row.get(0)?,
        channel_id: row.get(1)?,
        name: row.get(2)?,
        deadline: deadline.and_then(secs_to_time),
    })
}

fn row_to_member(row: &rusqlite::Row<'_>) -> rusqlite::Result<ChannelMember> {
    Ok(ChannelMember {
        id: row.get(0)?,
        user_id: row.get(1)?,
        channel_id: row.get(2)?,
        real_name: row.get(3)?,
        created_at: ts_to_datetime(row.get(4)?),
    })
}

fn row_to_timetable(row: &rusqlite::Row<'_>) -> rusqlite::Result<TimeTable> {
    let slot = |idx: usize| -> rusqlite::Result<Option<NaiveTime>> {
        let secs: Option<i64> = row.get(idx)?;
        Ok(secs.and_then(secs_to_time))
    };
    Ok(TimeTable {
        id: row.get(0)?,
        channel_member_id: row.get(1)?,
        monday: slot(2)?,
        tuesday: slot(3)?,
        wednesday: slot(4)?,
        thursday: slot(5)?,
        friday: slot(6)?,
        saturday: slot(7)?,
        sunday: slot(8)?,
    })
}

fn row_to_standup(row: &rusqlite::Row<'_>) -> rusqlite::Result<Standup> {
    Ok(Standup {
        id: row.get(0)?,
        channel_id: row.get(1)?,
        user_id: row.get(2)?,
        comment: row.get(3)?,
        message_ts: row.get(4)?,
        created_at: ts_to_datetime(row.get(5)?),
    })
}

fn collect<T>(
    rows: impl Iterator<Item = rusqlite::Result<T>>,
) -> Result<Vec<T>, StoreError> {
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

fn weekday_column(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "monday",
        Weekday::Tue => "tuesday",
        Weekday::Wed => "wednesday",
        Weekday::Thu => "thursday",
        Weekday::Fri => "friday",
        Weekday::Sat => "saturday",
        Weekday::Sun => "sunday",
    }
}

fn time_to_secs(time: NaiveTime) -> i64 {
    i64::from(time.num_seconds_from_midnight())
}

fn secs_to_time(secs: i64) -> Option<NaiveTime> {
    u32::try_from(secs)
        .ok()
        .and_then(|s| NaiveTime::from_num_seconds_from_midnight_opt(s, 0))
}

fn ts_to_datetime(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or(DateTime::UNIX_EPOCH)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use chrono::TimeZone;

    fn store() -> SqliteStore {
        SqliteStore::open_in_memory().expect("open in-memory store")
    }

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2019, 3, 4, h, m, 0).unwrap()
    }

    fn ten_am() -> NaiveTime {
        NaiveTime::from_hms_opt(10, 0, 0).expect("valid time")
    }

    #[test]
    fn open_creates_parent_dirs_and_persists_across_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("rollcall.db");

        {
            let store = SqliteStore::open(&path).expect("open");
            store.ensure_channel("C1", "general").expect("create");
        }

        let reopened = SqliteStore::open(&path).expect("reopen");
        assert_eq!(
            reopened.select_channel("C1").expect("select").name,
            "general"
        );
    }

    #[test]
    fn ensure_channel_inserts_then_refreshes_name() {
        let store = store();
        let created = store.ensure_channel("C1", "general").expect("create");
        assert_eq!(created.name, "general");
        assert_eq!(created.deadline, None);

        let renamed = store.ensure_channel("C1", "standups").expect("refresh");
        assert_eq!(renamed.id, created.id);
        assert_eq!(renamed.name, "standups");
    }

    #[test]
    fn select_channel_unknown_is_not_found() {
        let err = store().select_channel("C404").expect_err("missing channel");
        assert!(err.is_not_found());
    }

    #[test]
    fn channel_deadline_round_trips() {
        let store = store();
        store.ensure_channel("C1", "general").expect("create");
        store
            .set_channel_deadline("C1", Some(ten_am()))
            .expect("set deadline");

        let channel = store.select_channel("C1").expect("select");
        assert_eq!(channel.deadline, Some(ten_am()));

        store.set_channel_deadline("C1", None).expect("clear");
        assert_eq!(store.select_channel("C1").expect("select").deadline, None);
    }

    #[test]
    fn channels_with_deadline_filters_unconfigured() {
        let store = store();
        store.ensure_channel("C1", "a").expect("create");
        store.ensure_channel("C2", "b").expect("create");
        store
            .set_channel_deadline("C2", Some(ten_am()))
            .expect("set");

        let with_deadline = store.channels_with_deadline().expect("list");
        assert_eq!(with_deadline.len(), 1);
        assert_eq!(with_deadline[0].channel_id, "C2");
    }

    #[test]
    fn create_member_is_idempotent_per_user_channel() {
        let store = store();
        let a = store
            .create_member("U1", "C1", "Ann", at(9, 0))
            .expect("create");
        let b = store
            .create_member("U1", "C1", "Ann Smith", at(10, 0))
            .expect("re-create");
        assert_eq!(a.id, b.id);
        assert_eq!(b.real_name, "Ann Smith");
        // created_at keeps the original registration instant.
        assert_eq!(b.created_at, at(9, 0));
    }

    #[test]
    fn non_reporters_excludes_members_who_submitted_in_window() {
        let store = store();
        store.create_member("U1", "C1", "Ann", at(0, 1)).expect("m1");
        store.create_member("U2", "C1", "Bob", at(0, 1)).expect("m2");
        store
            .create_standup(NewStandup {
                channel_id: "C1",
                user_id: "U1",
                comment: "yesterday x, today y, no problems",
                message_ts: "1551692400.000100",
                created_at: at(9, 30),
            })
            .expect("standup");

        let missing = store
            .non_reporters("C1", at(0, 0), at(18, 0))
            .expect("query");
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].user_id, "U2");
    }

    #[test]
    fn window_end_is_exclusive() {
        let store = store();
        store.create_member("U1", "C1", "Ann", at(0, 1)).expect("m1");
        store
            .create_standup(NewStandup {
                channel_id: "C1",
                user_id: "U1",
                comment: "",
                message_ts: "ts",
                created_at: at(18, 0),
            })
            .expect("standup");

        // Submission lands exactly at the window end: still a non-reporter.
        let missing = store
            .non_reporters("C1", at(0, 0), at(18, 0))
            .expect("query");
        assert_eq!(missing.len(), 1);

        assert!(!store
            .submitted_in_window("U1", "C1", at(0, 0), at(18, 0))
            .expect("query"));
        assert!(store
            .submitted_in_window("U1", "C1", at(0, 0), at(18, 1))
            .expect("query"));
    }

    #[test]
    fn submissions_in_other_channels_do_not_count() {
        let store = store();
        store.create_member("U1", "C1", "Ann", at(0, 1)).expect("m1");
        store
            .create_standup(NewStandup {
                channel_id: "C2",
                user_id: "U1",
                comment: "",
                message_ts: "ts",
                created_at: at(9, 0),
            })
            .expect("standup");

        let missing = store
            .non_reporters("C1", at(0, 0), at(18, 0))
            .expect("query");
        assert_eq!(missing.len(), 1);
    }

    #[test]
    fn standup_lookup_update_delete_by_message_ts() {
        let store = store();
        let standup = store
            .create_standup(NewStandup {
                channel_id: "C1",
                user_id: "U1",
                comment: "v1",
                message_ts: "1551692400.000100",
                created_at: at(9, 0),
            })
            .expect("create");

        let found = store.standup_by_ts("1551692400.000100").expect("find");
        assert_eq!(found.id, standup.id);
        assert_eq!(found.comment, "v1");

        store
            .update_standup(standup.id, "v2", "1551692400.000100")
            .expect("update");
        assert_eq!(
            store.standup_by_ts("1551692400.000100").expect("find").comment,
            "v2"
        );

        store.delete_standup(standup.id).expect("delete");
        assert!(store
            .standup_by_ts("1551692400.000100")
            .expect_err("gone")
            .is_not_found());
    }

    #[test]
    fn latest_standup_in_window_prefers_newest() {
        let store = store();
        for (ts, when) in [("first", at(9, 0)), ("second", at(11, 0))] {
            store
                .create_standup(NewStandup {
                    channel_id: "C1",
                    user_id: "U1",
                    comment: ts,
                    message_ts: ts,
                    created_at: when,
                })
                .expect("create");
        }

        let latest = store
            .latest_standup_in_window("U1", "C1", at(0, 0), at(23, 59))
            .expect("query")
            .expect("present");
        assert_eq!(latest.comment, "second");

        assert!(store
            .latest_standup_in_window("U2", "C1", at(0, 0), at(23, 59))
            .expect("query")
            .is_none());
    }

    #[test]
    fn member_has_timetable_requires_a_set_slot() {
        let store = store();
        let member = store
            .create_member("U1", "C1", "Ann", at(0, 1))
            .expect("member");

        assert!(!store.member_has_timetable(member.id).expect("fresh"));

        store
            .set_timetable_slot(member.id, Weekday::Mon, Some(ten_am()))
            .expect("set slot");
        assert!(store.member_has_timetable(member.id).expect("set"));

        store
            .set_timetable_slot(member.id, Weekday::Mon, None)
            .expect("clear slot");
        // Row exists but every slot is empty: no individual schedule.
        assert!(!store.member_has_timetable(member.id).expect("cleared"));
    }

    #[test]
    fn timetables_for_weekday_joins_members() {
        let store = store();
        let ann = store
            .create_member("U1", "C1", "Ann", at(0, 1))
            .expect("m1");
        let bob = store
            .create_member("U2", "C1", "Bob", at(0, 1))
            .expect("m2");
        store
            .set_timetable_slot(ann.id, Weekday::Mon, Some(ten_am()))
            .expect("ann monday");
        store
            .set_timetable_slot(bob.id, Weekday::Tue, Some(ten_am()))
            .expect("bob tuesday");

        let monday = store.timetables_for_weekday(Weekday::Mon).expect("monday");
        assert_eq!(monday.len(), 1);
        assert_eq!(monday[0].1.user_id, "U1");
        assert_eq!(monday[0].0.for_weekday(Weekday::Mon), Some(ten_am()));

        let wednesday = store
            .timetables_for_weekday(Weekday::Wed)
            .expect("wednesday");
        assert!(wednesday.is_empty());
    }

    #[test]
    fn deleting_user_members_cascades_timetables() {
        let store = store();
        let ann = store
            .create_member("U1", "C1", "Ann", at(0, 1))
            .expect("m1");
        store
            .create_member("U1", "C2", "Ann", at(0, 1))
            .expect("m2");
        store
            .set_timetable_slot(ann.id, Weekday::Fri, Some(ten_am()))
            .expect("slot");

        let removed = store.delete_members_of_user("U1").expect("delete");
        assert_eq!(removed, 2);
        assert!(store.timetable_for_member(ann.id).expect("query").is_none());
        assert!(store.find_member("U1", "C1").expect("query").is_none());
    }

    #[test]
    fn standup_windows_by_channel_and_user() {
        let store = store();
        for (channel, user, ts, when) in [
            ("C1", "U1", "a", at(9, 0)),
            ("C1", "U2", "b", at(10, 0)),
            ("C2", "U1", "c", at(11, 0)),
        ] {
            store
                .create_standup(NewStandup {
                    channel_id: channel,
                    user_id: user,
                    comment: "text",
                    message_ts: ts,
                    created_at: when,
                })
                .expect("create");
        }

        let c1 = store
            .standups_in_window("C1", at(0, 0), at(23, 59))
            .expect("channel window");
        assert_eq!(c1.len(), 2);

        let u1 = store
            .standups_for_user_in_window("U1", at(0, 0), at(23, 59))
            .expect("user window");
        assert_eq!(u1.len(), 2);
        assert!(u1.iter().all(|s| s.user_id == "U1"));
    }
}
