//! Day-by-day standup reports for channels and members.
//!
//! A report walks the requested date range one day at a time, pairing the
//! submitted standups with explicit missed lines. Placeholder rows written by
//! housekeeping render as missed, same as having no row at all.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};

use crate::chat::{channel_link, mention};
use crate::error::{BotError, Result};
use crate::i18n::{MessageCatalog, MessageKey};
use crate::standup::Standup;
use crate::store::SqliteStore;

/// Renders report text from stored standups.
pub struct Reporter {
    store: Arc<SqliteStore>,
    catalog: Arc<MessageCatalog>,
}

/// One [midnight, next midnight) day window.
fn day_window(date: NaiveDate) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let from = date.and_hms_opt(0, 0, 0)?.and_utc();
    Some((from, from + chrono::Duration::days(1)))
}

/// Validate a range and clamp a future `to` back to today. Lists every date
/// from `from` through `to`, inclusive; empty when `from` is past the clamped
/// end.
fn range_dates(from: NaiveDate, to: NaiveDate) -> Result<(Vec<NaiveDate>, NaiveDate)> {
    if to < from {
        return Err(BotError::Report(format!(
            "range end {to} precedes range start {from}"
        )));
    }
    let today = Utc::now().date_naive();
    let clamped = to.min(today);
    let mut dates = Vec::new();
    let mut date = from;
    while date <= clamped {
        dates.push(date);
        match date.succ_opt() {
            Some(next) => date = next,
            None => break,
        }
    }
    Ok((dates, clamped))
}

fn date_arg(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

impl Reporter {
    pub fn new(store: Arc<SqliteStore>, catalog: Arc<MessageCatalog>) -> Self {
        Self { store, catalog }
    }

    /// Report on everyone in a channel, one block per day.
    ///
    /// # Errors
    ///
    /// Fails on an unknown channel, an inverted date range, or storage
    /// failures.
    pub fn by_channel(&self, channel_id: &str, from: NaiveDate, to: NaiveDate) -> Result<String> {
        let channel = self
            .store
            .select_channel(channel_id)
            .map_err(|e| BotError::Report(e.to_string()))?;
        let (dates, clamped_to) = range_dates(from, to)?;

        let head = self.catalog.render(
            MessageKey::ReportChannelHead,
            &[
                ("channel", &channel_link(&channel.channel_id, &channel.name)),
                ("from", &date_arg(from)),
                ("to", &date_arg(clamped_to)),
            ],
            0,
        );

        let mut days = Vec::new();
        for date in dates {
            let Some((window_from, window_to)) = day_window(date) else {
                continue;
            };
            let standups = self
                .store
                .standups_in_window(channel_id, window_from, window_to)
                .map_err(|e| BotError::Store(e.to_string()))?;
            let silent = self
                .store
                .non_reporters(channel_id, window_from, window_to)
                .map_err(|e| BotError::Store(e.to_string()))?;

            let mut lines = self.standup_lines(&standups);
            for member in silent {
                lines.push(self.missed_line(&member.user_id));
            }
            if !lines.is_empty() {
                days.push(self.day_block(date, &lines));
            }
        }
        Ok(assemble(head, days, &self.no_data()))
    }

    /// Report on one person across all their channels.
    ///
    /// # Errors
    ///
    /// Fails on an inverted date range or storage failures.
    pub fn by_member(&self, user_id: &str, from: NaiveDate, to: NaiveDate) -> Result<String> {
        let (dates, clamped_to) = range_dates(from, to)?;
        let head = self.catalog.render(
            MessageKey::ReportMemberHead,
            &[
                ("user", &mention(user_id)),
                ("from", &date_arg(from)),
                ("to", &date_arg(clamped_to)),
            ],
            0,
        );

        let mut days = Vec::new();
        for date in dates {
            let Some((window_from, window_to)) = day_window(date) else {
                continue;
            };
            let standups = self
                .store
                .standups_for_user_in_window(user_id, window_from, window_to)
                .map_err(|e| BotError::Store(e.to_string()))?;
            let mut lines = self.standup_lines(&standups);
            if lines.is_empty() {
                lines.push(self.missed_line(user_id));
            }
            days.push(self.day_block(date, &lines));
        }
        Ok(assemble(head, days, &self.no_data()))
    }

    /// Report on one person inside one channel.
    ///
    /// # Errors
    ///
    /// Fails on an unknown channel, an inverted date range, or storage
    /// failures.
    pub fn by_channel_and_member(
        &self,
        channel_id: &str,
        user_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<String> {
        let channel = self
            .store
            .select_channel(channel_id)
            .map_err(|e| BotError::Report(e.to_string()))?;
        let (dates, clamped_to) = range_dates(from, to)?;

        let head = self.catalog.render(
            MessageKey::ReportChannelMemberHead,
            &[
                ("user", &mention(user_id)),
                ("channel", &channel_link(&channel.channel_id, &channel.name)),
                ("from", &date_arg(from)),
                ("to", &date_arg(clamped_to)),
            ],
            0,
        );

        let mut days = Vec::new();
        for date in dates {
            let Some((window_from, window_to)) = day_window(date) else {
                continue;
            };
            let mut standups = self
                .store
                .standups_in_window(channel_id, window_from, window_to)
                .map_err(|e| BotError::Store(e.to_string()))?;
            standups.retain(|s| s.user_id == user_id);

            let mut lines = self.standup_lines(&standups);
            if lines.is_empty() {
                lines.push(self.missed_line(user_id));
            }
            days.push(self.day_block(date, &lines));
        }
        Ok(assemble(head, days, &self.no_data()))
    }

    /// Submitted standups as report lines. Placeholder rows render as missed
    /// unless the same user also has a real report that day.
    fn standup_lines(&self, standups: &[Standup]) -> Vec<String> {
        let reported: HashSet<&str> = standups
            .iter()
            .filter(|s| !s.comment.is_empty())
            .map(|s| s.user_id.as_str())
            .collect();

        let mut lines = Vec::new();
        for standup in standups {
            if standup.comment.is_empty() {
                if !reported.contains(standup.user_id.as_str()) {
                    lines.push(self.missed_line(&standup.user_id));
                }
            } else {
                lines.push(self.catalog.render(
                    MessageKey::ReportStandupLine,
                    &[
                        ("user", &mention(&standup.user_id)),
                        ("comment", &standup.comment),
                    ],
                    0,
                ));
            }
        }
        lines
    }

    fn missed_line(&self, user_id: &str) -> String {
        self.catalog.render(
            MessageKey::ReportMissedLine,
            &[("user", &mention(user_id))],
            0,
        )
    }

    fn day_block(&self, date: NaiveDate, lines: &[String]) -> String {
        let mut block = self.catalog.render(
            MessageKey::ReportDayHead,
            &[("date", &date_arg(date))],
            0,
        );
        for line in lines {
            block.push('\n');
            block.push_str(line);
        }
        block
    }

    fn no_data(&self) -> String {
        self.catalog.render(MessageKey::ReportNoData, &[], 0)
    }
}

fn assemble(head: String, days: Vec<String>, no_data: &str) -> String {
    let mut out = head;
    if days.is_empty() {
        out.push('\n');
        out.push_str(no_data);
        return out;
    }
    for day in days {
        out.push('\n');
        out.push_str(&day);
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
