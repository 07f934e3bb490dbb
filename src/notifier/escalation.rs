//! Warnings, deadline notices and escalation nag loops.
//!
//! A deadline run re-checks the store before every attempt, so members who
//! report mid-loop stop being tagged and a fully caught-up scope ends the
//! run early. Attempts are capped; hitting the cap ends the run silently.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::chat::{ChatTransport, channel_link, mention, mention_list};
use crate::config::NotifierConfig;
use crate::error::{BotError, Result};
use crate::i18n::{MessageCatalog, MessageKey};
use crate::standup::{Channel, ChannelMember, day_start};
use crate::store::SqliteStore;

/// Sends the warning and deadline messages for channels and individually
/// scheduled members. Cloned freely; deadline runs are spawned as tasks.
#[derive(Clone)]
pub struct EscalationEngine {
    store: Arc<SqliteStore>,
    transport: Arc<dyn ChatTransport>,
    catalog: Arc<MessageCatalog>,
    config: NotifierConfig,
}

impl EscalationEngine {
    pub fn new(
        store: Arc<SqliteStore>,
        transport: Arc<dyn ChatTransport>,
        catalog: Arc<MessageCatalog>,
        config: NotifierConfig,
    ) -> Self {
        Self {
            store,
            transport,
            catalog,
            config,
        }
    }

    /// Members of the channel still owing a report today. Individually
    /// scheduled members are excluded; their own deadlines cover them.
    fn channel_non_reporters(&self, channel_id: &str) -> Result<Vec<ChannelMember>> {
        let now = Utc::now();
        let missing = self
            .store
            .non_reporters(channel_id, day_start(now), now)
            .map_err(|e| BotError::Store(e.to_string()))?;
        let mut due = Vec::with_capacity(missing.len());
        for member in missing {
            let scheduled = self
                .store
                .member_has_timetable(member.id)
                .map_err(|e| BotError::Store(e.to_string()))?;
            if !scheduled {
                due.push(member);
            }
        }
        Ok(due)
    }

    fn submitted_today(&self, member: &ChannelMember) -> Result<bool> {
        let now = Utc::now();
        self.store
            .submitted_in_window(&member.user_id, &member.channel_id, day_start(now), now)
            .map_err(|e| BotError::Store(e.to_string()))
    }

    fn minutes_phrase(&self) -> String {
        let lead = self.config.warning_lead_minutes;
        self.catalog.render(
            MessageKey::Minutes,
            &[("time", &lead.to_string())],
            lead as usize,
        )
    }

    fn backoff(&self) -> Duration {
        Duration::from_secs(u64::from(self.config.backoff_minutes) * 60)
    }

    /// Pre-deadline warning for a channel, tagging everyone who still owes a
    /// report. Quiet when nobody does.
    pub async fn warn_channel(&self, channel: &Channel) -> Result<()> {
        let due = self.channel_non_reporters(&channel.channel_id)?;
        if due.is_empty() {
            tracing::debug!("warning pass: everyone in {} already reported", channel.name);
            return Ok(());
        }
        let ids: Vec<String> = due.iter().map(|m| m.user_id.clone()).collect();
        let minutes = self.minutes_phrase();
        let text = self.catalog.render(
            MessageKey::WarnNonReporters,
            &[
                ("user", &mention(&ids[0])),
                ("users", &mention_list(&ids)),
                ("minutes", &minutes),
            ],
            ids.len(),
        );
        self.transport
            .send_to_channel(&channel.channel_id, &text)
            .await
            .map_err(|e| BotError::Transport(e.to_string()))
    }

    /// Pre-deadline warning for one individually scheduled member, posted
    /// into their channel.
    pub async fn warn_member(&self, member: &ChannelMember) -> Result<()> {
        if self.submitted_today(member)? {
            tracing::debug!("warning pass: {} already reported", member.real_name);
            return Ok(());
        }
        let minutes = self.minutes_phrase();
        let text = self.catalog.render(
            MessageKey::WarnIndividualNonReporter,
            &[("user", &mention(&member.user_id)), ("minutes", &minutes)],
            0,
        );
        self.transport
            .send_to_channel(&member.channel_id, &text)
            .await
            .map_err(|e| BotError::Transport(e.to_string()))
    }

    /// Deadline run for a channel: congratulate when everyone reported,
    /// otherwise direct-message every non-reporter once and then nag the
    /// channel up to `repeats_max` times.
    pub async fn run_channel_deadline(&self, channel: Channel) -> Result<()> {
        let members = self
            .store
            .list_channel_members(&channel.channel_id)
            .map_err(|e| BotError::Store(e.to_string()))?;
        if members.is_empty() {
            tracing::debug!("deadline run: no members tracked in {}", channel.name);
            return Ok(());
        }

        let due = self.channel_non_reporters(&channel.channel_id)?;
        if due.is_empty() {
            let text = self.catalog.render(MessageKey::AllDone, &[], 0);
            return self
                .transport
                .send_to_channel(&channel.channel_id, &text)
                .await
                .map_err(|e| BotError::Transport(e.to_string()));
        }

        let link = channel_link(&channel.channel_id, &channel.name);
        for member in &due {
            let text = self.catalog.render(
                MessageKey::DeadlineDirectMessage,
                &[("user", &mention(&member.user_id)), ("channel", &link)],
                0,
            );
            if let Err(err) = self.transport.send_direct(&member.user_id, &text).await {
                tracing::warn!("deadline notice to {} failed: {err}", member.user_id);
            }
        }

        let mut attempt = 0;
        loop {
            let remaining = self.channel_non_reporters(&channel.channel_id)?;
            if remaining.is_empty() {
                tracing::debug!("deadline run: {} caught up", channel.name);
                break;
            }
            if attempt >= self.config.repeats_max {
                tracing::debug!(
                    "deadline run: nag cap reached in {}, {} still missing",
                    channel.name,
                    remaining.len()
                );
                break;
            }
            let ids: Vec<String> = remaining.iter().map(|m| m.user_id.clone()).collect();
            let text = self.catalog.render(
                MessageKey::TagNonReporters,
                &[("user", &mention(&ids[0])), ("users", &mention_list(&ids))],
                ids.len(),
            );
            if let Err(err) = self
                .transport
                .send_to_channel(&channel.channel_id, &text)
                .await
            {
                tracing::warn!("escalation nag in {} failed: {err}", channel.name);
            }
            attempt += 1;
            tokio::time::sleep(self.backoff()).await;
        }
        Ok(())
    }

    /// Deadline run for one individually scheduled member: direct message
    /// first, then channel nags up to `repeats_max` times.
    pub async fn run_member_deadline(&self, member: ChannelMember) -> Result<()> {
        if self.submitted_today(&member)? {
            tracing::debug!("deadline run: {} already reported", member.real_name);
            return Ok(());
        }

        let link = match self.store.select_channel(&member.channel_id) {
            Ok(ch) => channel_link(&ch.channel_id, &ch.name),
            Err(err) if err.is_not_found() => {
                channel_link(&member.channel_id, &member.channel_id)
            }
            Err(err) => return Err(BotError::Store(err.to_string())),
        };
        let text = self.catalog.render(
            MessageKey::DeadlineDirectMessage,
            &[("user", &mention(&member.user_id)), ("channel", &link)],
            0,
        );
        if let Err(err) = self.transport.send_direct(&member.user_id, &text).await {
            tracing::warn!("deadline notice to {} failed: {err}", member.user_id);
        }

        let mut attempt = 0;
        loop {
            if self.submitted_today(&member)? {
                tracing::debug!("deadline run: {} caught up", member.real_name);
                break;
            }
            if attempt >= self.config.repeats_max {
                break;
            }
            let text = self.catalog.render(
                MessageKey::TagIndividualNonReporter,
                &[("user", &mention(&member.user_id))],
                0,
            );
            if let Err(err) = self
                .transport
                .send_to_channel(&member.channel_id, &text)
                .await
            {
                tracing::warn!("escalation nag for {} failed: {err}", member.real_name);
            }
            attempt += 1;
            tokio::time::sleep(self.backoff()).await;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
