//! End-of-day maintenance: placeholder fills, directory sync, startup hello.
//!
//! The fill pass writes empty standups for members who never reported, so
//! that day reads as "missed" in reports instead of staying ambiguous. The
//! sync pass mirrors the workspace user directory into the member table.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::chat::{ChatTransport, mention};
use crate::config::BotConfig;
use crate::error::{BotError, Result};
use crate::i18n::{MessageCatalog, MessageKey};
use crate::standup::day_start;
use crate::store::{NewStandup, SqliteStore};

/// Scheduled maintenance tasks. Cloned into the notifier loop.
#[derive(Clone)]
pub struct Housekeeping {
    store: Arc<SqliteStore>,
    transport: Arc<dyn ChatTransport>,
    catalog: Arc<MessageCatalog>,
    manager_user_id: Option<String>,
}

impl Housekeeping {
    pub fn new(
        store: Arc<SqliteStore>,
        transport: Arc<dyn ChatTransport>,
        catalog: Arc<MessageCatalog>,
        config: &BotConfig,
    ) -> Self {
        Self {
            store,
            transport,
            catalog,
            manager_user_id: config.slack.manager_user_id.clone(),
        }
    }

    /// Write an empty placeholder standup for every member who has not
    /// reported today. Members registered today are left alone; their
    /// obligation starts tomorrow. Returns how many placeholders were
    /// written.
    ///
    /// # Errors
    ///
    /// Returns an error on any storage failure; no partial placeholder is
    /// rolled back.
    pub fn fill_missing_standups(&self, now: DateTime<Utc>) -> Result<usize> {
        let from = day_start(now);
        let members = self
            .store
            .list_all_members()
            .map_err(|e| BotError::Store(e.to_string()))?;

        let placeholder_ts = now.timestamp().to_string();
        let mut filled = 0;
        for member in members {
            if member.created_at >= from {
                continue;
            }
            let submitted = self
                .store
                .submitted_in_window(&member.user_id, &member.channel_id, from, now)
                .map_err(|e| BotError::Store(e.to_string()))?;
            if submitted {
                continue;
            }
            self.store
                .create_standup(NewStandup {
                    channel_id: &member.channel_id,
                    user_id: &member.user_id,
                    comment: "",
                    message_ts: &placeholder_ts,
                    created_at: now,
                })
                .map_err(|e| BotError::Store(e.to_string()))?;
            filled += 1;
        }
        if filled > 0 {
            tracing::info!("filled {filled} missing standups with placeholders");
        }
        Ok(filled)
    }

    /// Mirror the workspace user directory into the member table: refresh
    /// display names and drop obligations of deactivated accounts.
    ///
    /// # Errors
    ///
    /// Returns an error when the directory cannot be listed at all; the
    /// manager is direct-messaged about it. Per-user storage failures are
    /// logged and skipped.
    pub async fn sync_members(&self) -> Result<()> {
        let users = match self.transport.list_users().await {
            Ok(users) => users,
            Err(err) => {
                tracing::error!("user directory sync failed: {err}");
                self.report_to_manager(&format!(
                    "I could not sync the user directory: {err}"
                ))
                .await;
                return Err(BotError::Transport(err.to_string()));
            }
        };

        for user in users {
            if user.is_bot {
                continue;
            }
            if user.deleted {
                match self.store.delete_members_of_user(&user.id) {
                    Ok(0) => {}
                    Ok(removed) => {
                        tracing::info!(
                            "removed {removed} standup obligations of deactivated user {}",
                            user.id
                        );
                    }
                    Err(err) => {
                        tracing::error!("could not remove member rows of {}: {err}", user.id);
                    }
                }
            } else if let Err(err) = self.store.update_member_names(&user.id, &user.real_name) {
                tracing::error!("could not refresh name of {}: {err}", user.id);
            }
        }
        Ok(())
    }

    /// Greet the manager once at startup so a silent bot is distinguishable
    /// from a dead one. Best effort.
    pub async fn startup_greeting(&self) {
        let Some(manager) = &self.manager_user_id else {
            return;
        };
        let text = self
            .catalog
            .render(MessageKey::HelloManager, &[("user", &mention(manager))], 0);
        if let Err(err) = self.transport.send_direct(manager, &text).await {
            tracing::warn!("startup greeting failed: {err}");
        }
    }

    async fn report_to_manager(&self, text: &str) {
        let Some(manager) = &self.manager_user_id else {
            return;
        };
        if let Err(err) = self.transport.send_direct(manager, text).await {
            tracing::warn!("could not reach the manager: {err}");
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
    use crate::test_utils::{RecordingTransport, workspace_user};

    fn housekeeping() -> (Arc<SqliteStore>, Arc<RecordingTransport>, Housekeeping) {
        let store = Arc::new(SqliteStore::open_in_memory().expect("store"));
        let transport = Arc::new(RecordingTransport::new());
        let mut config = BotConfig::default();
        config.slack.manager_user_id = Some("UMANAGER".to_owned());
        let housekeeping = Housekeeping::new(
            Arc::clone(&store),
            Arc::clone(&transport) as Arc<dyn ChatTransport>,
            Arc::new(MessageCatalog::english()),
            &config,
        );
        (store, transport, housekeeping)
    }

    fn member(store: &SqliteStore, user_id: &str, created_at: DateTime<Utc>) {
        store
            .create_member(user_id, "C1", user_id, created_at)
            .expect("member");
    }

    #[test]
    fn fill_targets_only_members_who_owed_a_report() {
        let (store, _, housekeeping) = housekeeping();
        let now = Utc::now();
        let earlier = now - chrono::Duration::days(3);
        member(&store, "U1", earlier);
        member(&store, "U2", earlier);
        member(&store, "U3", now); // registered today

        store
            .create_standup(NewStandup {
                channel_id: "C1",
                user_id: "U1",
                comment: "yesterday a, today b, no problems",
                message_ts: "1.1",
                created_at: now - chrono::Duration::minutes(10),
            })
            .expect("standup");

        let filled = housekeeping.fill_missing_standups(now).expect("fill");
        assert_eq!(filled, 1);

        let to = now + chrono::Duration::seconds(1);
        assert!(
            store
                .submitted_in_window("U2", "C1", day_start(now), to)
                .expect("check")
        );
        assert!(
            !store
                .submitted_in_window("U3", "C1", day_start(now), to)
                .expect("check")
        );

        // The placeholder reads as an empty report.
        let rows = store
            .standups_for_user_in_window("U2", day_start(now), to)
            .expect("rows");
        assert_eq!(rows.len(), 1);
        assert!(rows[0].comment.is_empty());
    }

    #[test]
    fn fill_is_a_no_op_when_everyone_reported() {
        let (store, _, housekeeping) = housekeeping();
        let now = Utc::now();
        member(&store, "U1", now - chrono::Duration::days(1));
        store
            .create_standup(NewStandup {
                channel_id: "C1",
                user_id: "U1",
                comment: "yesterday a, today b, no problems",
                message_ts: "1.1",
                created_at: now - chrono::Duration::minutes(10),
            })
            .expect("standup");

        assert_eq!(housekeeping.fill_missing_standups(now).expect("fill"), 0);
    }

    #[tokio::test]
    async fn sync_renames_and_removes_deactivated_users() {
        let (store, transport, housekeeping) = housekeeping();
        let earlier = Utc::now() - chrono::Duration::days(3);
        member(&store, "U1", earlier);
        member(&store, "U2", earlier);
        store
            .create_member("U1", "C2", "U1", earlier)
            .expect("second obligation");

        let mut gone = workspace_user("U2", "Gone Person");
        gone.deleted = true;
        let mut bot = workspace_user("UBOT", "The Bot");
        bot.is_bot = true;
        transport.set_users(vec![workspace_user("U1", "Renamed Person"), gone, bot]);

        housekeeping.sync_members().await.expect("sync");

        let members = store.list_all_members().expect("members");
        assert_eq!(members.len(), 2);
        assert!(members.iter().all(|m| m.user_id == "U1"));
        assert!(members.iter().all(|m| m.real_name == "Renamed Person"));
    }

    #[tokio::test]
    async fn sync_failure_is_reported_to_the_manager() {
        let (_, transport, housekeeping) = housekeeping();
        transport.fail_user_listing();

        let err = housekeeping.sync_members().await.expect_err("must fail");
        assert!(matches!(err, BotError::Transport(_)));

        let dms = transport.direct_posts("UMANAGER");
        assert_eq!(dms.len(), 1);
        assert!(dms[0].contains("could not sync"));
    }

    #[tokio::test]
    async fn startup_greeting_reaches_the_manager() {
        let (_, transport, housekeeping) = housekeeping();
        housekeeping.startup_greeting().await;

        let dms = transport.direct_posts("UMANAGER");
        assert_eq!(dms.len(), 1);
        assert!(dms[0].contains("<@UMANAGER>"));
        assert!(dms[0].contains("up and running"));
    }

    #[tokio::test]
    async fn startup_greeting_without_manager_is_silent() {
        let store = Arc::new(SqliteStore::open_in_memory().expect("store"));
        let transport = Arc::new(RecordingTransport::new());
        let housekeeping = Housekeeping::new(
            store,
            Arc::clone(&transport) as Arc<dyn ChatTransport>,
            Arc::new(MessageCatalog::english()),
            &BotConfig::default(),
        );

        housekeeping.startup_greeting().await;
        assert!(transport.sent().is_empty());
    }
}
