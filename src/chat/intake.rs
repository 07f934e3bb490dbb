//! Turns workspace events into stored standups.
//!
//! A message counts as a standup attempt when it mentions the bot or carries
//! the trigger hashtag. Attempts are validated before they are stored;
//! rejected attempts get an ephemeral explanation instead of a row.

use std::sync::Arc;

use chrono::Utc;

use crate::chat::traits::{ChatTransport, InboundEvent, InboundMessage, mention};
use crate::config::{BotConfig, ResubmitPolicy};
use crate::error::{BotError, Result};
use crate::i18n::{MessageCatalog, MessageKey};
use crate::standup::{StandupValidator, day_start};
use crate::store::{NewStandup, SqliteStore};

/// Reaction attached to a message once its standup is stored.
const CONFIRM_REACTION: &str = "heavy_check_mark";

/// Handles inbound workspace events: standup submissions, edits, deletions
/// and channel invitations.
pub struct MessageIntake {
    store: Arc<SqliteStore>,
    transport: Arc<dyn ChatTransport>,
    catalog: Arc<MessageCatalog>,
    validator: StandupValidator,
    bot_user_id: String,
    trigger_tag: String,
    resubmit_policy: ResubmitPolicy,
    manager_user_id: Option<String>,
}

impl MessageIntake {
    pub fn new(
        store: Arc<SqliteStore>,
        transport: Arc<dyn ChatTransport>,
        catalog: Arc<MessageCatalog>,
        validator: StandupValidator,
        config: &BotConfig,
        bot_user_id: String,
    ) -> Self {
        Self {
            store,
            transport,
            catalog,
            validator,
            bot_user_id,
            trigger_tag: config.intake.trigger_tag.clone(),
            resubmit_policy: config.intake.resubmit_policy,
            manager_user_id: config.slack.manager_user_id.clone(),
        }
    }

    /// Dispatch one workspace event.
    ///
    /// # Errors
    ///
    /// Returns an error only on storage failures during lookups; user-facing
    /// problems (invalid text, duplicates) are answered in-channel and do not
    /// error.
    pub async fn handle_event(&self, event: InboundEvent) -> Result<()> {
        match event {
            InboundEvent::NewMessage(msg) => self.handle_new_message(msg).await,
            InboundEvent::EditedMessage(msg) => self.handle_edited_message(msg).await,
            InboundEvent::DeletedMessage {
                channel_id,
                message_ts,
            } => self.handle_deleted_message(&channel_id, &message_ts),
            InboundEvent::ChannelJoined {
                channel_id,
                channel_name,
            } => self.handle_channel_joined(&channel_id, &channel_name),
        }
    }

    /// Messages qualify as standup attempts when they mention the bot or
    /// carry the trigger hashtag. Everything else is normal chatter.
    fn is_standup_candidate(&self, text: &str) -> bool {
        (!self.bot_user_id.is_empty() && text.contains(&self.bot_user_id))
            || text.contains(&self.trigger_tag)
    }

    async fn handle_new_message(&self, msg: InboundMessage) -> Result<()> {
        if !self.is_standup_candidate(&msg.text) {
            return Ok(());
        }
        if let Err(missing) = self.validator.validate(&msg.text) {
            let reason = self.catalog.render(missing.message_key(), &[], 0);
            self.ephemeral(&msg.channel_id, &msg.user_id, &reason).await;
            return Ok(());
        }
        self.save_standup(&msg).await
    }

    async fn handle_edited_message(&self, msg: InboundMessage) -> Result<()> {
        if !self.is_standup_candidate(&msg.text) {
            return Ok(());
        }
        match self.store.standup_by_ts(&msg.message_ts) {
            Ok(standup) => {
                if let Err(missing) = self.validator.validate(&msg.text) {
                    let reason = self.catalog.render(missing.message_key(), &[], 0);
                    self.ephemeral(&msg.channel_id, &msg.user_id, &reason).await;
                    return Ok(());
                }
                self.store
                    .update_standup(standup.id, &msg.text, &standup.message_ts)
                    .map_err(|e| BotError::Store(e.to_string()))?;
                tracing::info!("standup #{} updated by edit", standup.id);
                let text = self.catalog.render(
                    MessageKey::StandupUpdated,
                    &[("user", &mention(&msg.user_id))],
                    0,
                );
                self.ephemeral(&msg.channel_id, &msg.user_id, &text).await;
                Ok(())
            }
            // The edited message was never stored; treat the edit as a
            // first submission.
            Err(err) if err.is_not_found() => {
                if let Err(missing) = self.validator.validate(&msg.text) {
                    let reason = self.catalog.render(missing.message_key(), &[], 0);
                    self.ephemeral(&msg.channel_id, &msg.user_id, &reason).await;
                    return Ok(());
                }
                self.save_standup(&msg).await
            }
            Err(err) => Err(BotError::Store(err.to_string())),
        }
    }

    fn handle_deleted_message(&self, channel_id: &str, message_ts: &str) -> Result<()> {
        match self.store.standup_by_ts(message_ts) {
            Ok(standup) => {
                self.store
                    .delete_standup(standup.id)
                    .map_err(|e| BotError::Store(e.to_string()))?;
                tracing::info!(
                    "standup #{} deleted after its message was removed from {channel_id}",
                    standup.id
                );
                Ok(())
            }
            Err(err) if err.is_not_found() => {
                tracing::debug!("deleted message {message_ts} in {channel_id} was not a standup");
                Ok(())
            }
            Err(err) => Err(BotError::Store(err.to_string())),
        }
    }

    fn handle_channel_joined(&self, channel_id: &str, channel_name: &str) -> Result<()> {
        let channel = self
            .store
            .ensure_channel(channel_id, channel_name)
            .map_err(|e| BotError::Store(e.to_string()))?;
        tracing::info!("tracking channel {} ({})", channel.name, channel.channel_id);
        Ok(())
    }

    /// Store a validated submission, honoring the same-day resubmit policy.
    async fn save_standup(&self, msg: &InboundMessage) -> Result<()> {
        let now = Utc::now();
        let from = day_start(now);
        let to = from + chrono::Duration::days(1);

        let existing = self
            .store
            .latest_standup_in_window(&msg.user_id, &msg.channel_id, from, to)
            .map_err(|e| BotError::Store(e.to_string()))?;

        if let Some(existing) = existing {
            match self.resubmit_policy {
                ResubmitPolicy::RejectDuplicate => {
                    let text = self.catalog.render(
                        MessageKey::OneStandupPerDay,
                        &[("user", &mention(&msg.user_id))],
                        0,
                    );
                    self.ephemeral(&msg.channel_id, &msg.user_id, &text).await;
                }
                ResubmitPolicy::AllowEditReplace => {
                    self.store
                        .update_standup(existing.id, &msg.text, &msg.message_ts)
                        .map_err(|e| BotError::Store(e.to_string()))?;
                    tracing::info!(
                        "standup #{} replaced by a newer message from {}",
                        existing.id,
                        msg.user_id
                    );
                    self.confirm(msg, MessageKey::StandupUpdated).await;
                }
            }
            return Ok(());
        }

        match self.store.create_standup(NewStandup {
            channel_id: &msg.channel_id,
            user_id: &msg.user_id,
            comment: &msg.text,
            message_ts: &msg.message_ts,
            created_at: now,
        }) {
            Ok(standup) => {
                tracing::info!(
                    "standup #{} created for {} in {}",
                    standup.id,
                    msg.user_id,
                    msg.channel_id
                );
                self.confirm(msg, MessageKey::StandupCreated).await;
            }
            Err(err) => {
                tracing::error!(
                    "failed to save standup from {} in {}: {err}",
                    msg.user_id,
                    msg.channel_id
                );
                self.report_to_manager(&format!(
                    "I could not save a standup from {} in {}: {err}",
                    mention(&msg.user_id),
                    msg.channel_id
                ))
                .await;
                let text = self.catalog.render(
                    MessageKey::CouldNotSaveStandup,
                    &[("user", &mention(&msg.user_id))],
                    0,
                );
                self.ephemeral(&msg.channel_id, &msg.user_id, &text).await;
            }
        }
        Ok(())
    }

    /// React to the message and confirm to its author.
    async fn confirm(&self, msg: &InboundMessage, key: MessageKey) {
        if let Err(err) = self
            .transport
            .add_reaction(&msg.channel_id, &msg.message_ts, CONFIRM_REACTION)
            .await
        {
            tracing::warn!("failed to add confirmation reaction: {err}");
        }
        let text = self
            .catalog
            .render(key, &[("user", &mention(&msg.user_id))], 0);
        self.ephemeral(&msg.channel_id, &msg.user_id, &text).await;
    }

    /// Best-effort ephemeral send; delivery failures are logged, not returned.
    async fn ephemeral(&self, channel_id: &str, user_id: &str, text: &str) {
        if let Err(err) = self.transport.send_ephemeral(channel_id, user_id, text).await {
            tracing::warn!("failed to send ephemeral message to {user_id}: {err}");
        }
    }

    async fn report_to_manager(&self, text: &str) {
        if let Some(manager) = &self.manager_user_id {
            if let Err(err) = self.transport.send_direct(manager, text).await {
                tracing::warn!("failed to reach the manager: {err}");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::test_utils::{RecordingTransport, SentMessage};

    const VALID_TEXT: &str =
        "#standup yesterday I shipped the importer, today I review PRs, no problems";
    const BOT_ID: &str = "UBOT";

    fn intake_with(policy: ResubmitPolicy) -> (MessageIntake, Arc<SqliteStore>, Arc<RecordingTransport>) {
        let store = Arc::new(SqliteStore::open_in_memory().expect("store"));
        let transport = Arc::new(RecordingTransport::new());
        let mut config = BotConfig::default();
        config.intake.resubmit_policy = policy;
        config.slack.manager_user_id = Some("UMANAGER".to_owned());
        let intake = MessageIntake::new(
            Arc::clone(&store),
            Arc::clone(&transport) as Arc<dyn ChatTransport>,
            Arc::new(MessageCatalog::english()),
            StandupValidator::default(),
            &config,
            BOT_ID.to_owned(),
        );
        (intake, store, transport)
    }

    fn message(text: &str, ts: &str) -> InboundMessage {
        InboundMessage {
            channel_id: "C1".to_owned(),
            user_id: "U1".to_owned(),
            text: text.to_owned(),
            message_ts: ts.to_owned(),
        }
    }

    #[tokio::test]
    async fn untagged_chatter_is_ignored() {
        let (intake, store, transport) = intake_with(ResubmitPolicy::RejectDuplicate);
        intake
            .handle_event(InboundEvent::NewMessage(message(
                "yesterday x today y no problems",
                "1.0",
            )))
            .await
            .expect("handle");

        assert!(store.standup_by_ts("1.0").is_err());
        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn mentioning_the_bot_also_triggers_intake() {
        let (intake, store, _transport) = intake_with(ResubmitPolicy::RejectDuplicate);
        let text = format!("<@{BOT_ID}> yesterday a, today b, no problems");
        intake
            .handle_event(InboundEvent::NewMessage(message(&text, "1.0")))
            .await
            .expect("handle");

        assert!(store.standup_by_ts("1.0").is_ok());
    }

    #[tokio::test]
    async fn invalid_standup_gets_reason_and_no_row() {
        let (intake, store, transport) = intake_with(ResubmitPolicy::RejectDuplicate);
        intake
            .handle_event(InboundEvent::NewMessage(message(
                "#standup today I will fix the build, no problems",
                "1.0",
            )))
            .await
            .expect("handle");

        assert!(store.standup_by_ts("1.0").is_err());
        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        match &sent[0] {
            SentMessage::Ephemeral { user_id, text, .. } => {
                assert_eq!(user_id, "U1");
                assert!(text.contains("'yesterday'"));
            }
            other => panic!("unexpected send: {other:?}"),
        }
    }

    #[tokio::test]
    async fn valid_standup_is_stored_and_confirmed() {
        let (intake, store, transport) = intake_with(ResubmitPolicy::RejectDuplicate);
        intake
            .handle_event(InboundEvent::NewMessage(message(VALID_TEXT, "1.0")))
            .await
            .expect("handle");

        let stored = store.standup_by_ts("1.0").expect("stored");
        assert_eq!(stored.comment, VALID_TEXT);

        let sent = transport.sent();
        assert!(sent.iter().any(|m| matches!(
            m,
            SentMessage::Reaction { emoji, .. } if emoji == "heavy_check_mark"
        )));
        assert!(sent.iter().any(|m| matches!(
            m,
            SentMessage::Ephemeral { text, .. } if text.contains("saved")
        )));
    }

    #[tokio::test]
    async fn second_submission_same_day_is_rejected_by_default() {
        let (intake, store, transport) = intake_with(ResubmitPolicy::RejectDuplicate);
        intake
            .handle_event(InboundEvent::NewMessage(message(VALID_TEXT, "1.0")))
            .await
            .expect("first");
        intake
            .handle_event(InboundEvent::NewMessage(message(VALID_TEXT, "2.0")))
            .await
            .expect("second");

        assert!(store.standup_by_ts("1.0").is_ok());
        assert!(store.standup_by_ts("2.0").is_err());
        assert!(transport.sent().iter().any(|m| matches!(
            m,
            SentMessage::Ephemeral { text, .. } if text.contains("only one standup per day")
        )));
    }

    #[tokio::test]
    async fn second_submission_replaces_under_edit_replace_policy() {
        let (intake, store, transport) = intake_with(ResubmitPolicy::AllowEditReplace);
        intake
            .handle_event(InboundEvent::NewMessage(message(VALID_TEXT, "1.0")))
            .await
            .expect("first");
        let replacement =
            "#standup yesterday I fixed the importer, today I write docs, no problems";
        intake
            .handle_event(InboundEvent::NewMessage(message(replacement, "2.0")))
            .await
            .expect("second");

        // The row moved to the new message; the old ts no longer resolves.
        assert!(store.standup_by_ts("1.0").is_err());
        assert_eq!(store.standup_by_ts("2.0").expect("replaced").comment, replacement);
        assert!(transport.sent().iter().any(|m| matches!(
            m,
            SentMessage::Ephemeral { text, .. } if text.contains("updated")
        )));
    }

    #[tokio::test]
    async fn editing_a_stored_standup_updates_it_in_place() {
        let (intake, store, transport) = intake_with(ResubmitPolicy::RejectDuplicate);
        intake
            .handle_event(InboundEvent::NewMessage(message(VALID_TEXT, "1.0")))
            .await
            .expect("create");

        let edited = "#standup yesterday importer, today docs and reviews, no problems";
        intake
            .handle_event(InboundEvent::EditedMessage(message(edited, "1.0")))
            .await
            .expect("edit");

        assert_eq!(store.standup_by_ts("1.0").expect("row").comment, edited);
        assert!(transport.sent().iter().any(|m| matches!(
            m,
            SentMessage::Ephemeral { text, .. } if text.contains("updated")
        )));
    }

    #[tokio::test]
    async fn editing_an_untracked_message_counts_as_submission() {
        let (intake, store, _transport) = intake_with(ResubmitPolicy::RejectDuplicate);
        intake
            .handle_event(InboundEvent::EditedMessage(message(VALID_TEXT, "7.0")))
            .await
            .expect("edit");

        assert!(store.standup_by_ts("7.0").is_ok());
    }

    #[tokio::test]
    async fn invalid_edit_leaves_stored_text_alone() {
        let (intake, store, transport) = intake_with(ResubmitPolicy::RejectDuplicate);
        intake
            .handle_event(InboundEvent::NewMessage(message(VALID_TEXT, "1.0")))
            .await
            .expect("create");

        intake
            .handle_event(InboundEvent::EditedMessage(message(
                "#standup today only plans here",
                "1.0",
            )))
            .await
            .expect("edit");

        assert_eq!(store.standup_by_ts("1.0").expect("row").comment, VALID_TEXT);
        assert!(transport.sent().iter().any(|m| matches!(
            m,
            SentMessage::Ephemeral { text, .. } if text.contains("'problems'")
        )));
    }

    #[tokio::test]
    async fn deleting_the_message_deletes_the_standup() {
        let (intake, store, _transport) = intake_with(ResubmitPolicy::RejectDuplicate);
        intake
            .handle_event(InboundEvent::NewMessage(message(VALID_TEXT, "1.0")))
            .await
            .expect("create");

        intake
            .handle_event(InboundEvent::DeletedMessage {
                channel_id: "C1".to_owned(),
                message_ts: "1.0".to_owned(),
            })
            .await
            .expect("delete");

        assert!(store.standup_by_ts("1.0").is_err());
    }

    #[tokio::test]
    async fn deleting_an_untracked_message_is_a_no_op() {
        let (intake, _store, transport) = intake_with(ResubmitPolicy::RejectDuplicate);
        intake
            .handle_event(InboundEvent::DeletedMessage {
                channel_id: "C1".to_owned(),
                message_ts: "9.9".to_owned(),
            })
            .await
            .expect("delete");
        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn joining_a_channel_registers_it_silently() {
        let (intake, store, transport) = intake_with(ResubmitPolicy::RejectDuplicate);
        intake
            .handle_event(InboundEvent::ChannelJoined {
                channel_id: "C9".to_owned(),
                channel_name: "backend".to_owned(),
            })
            .await
            .expect("join");

        let channel = store.select_channel("C9").expect("registered");
        assert_eq!(channel.name, "backend");
        assert!(transport.sent().is_empty());
    }
}
