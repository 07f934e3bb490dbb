//! Notifier background loop.
//!
//! Ticks every `cadence_secs`, resolves every configured deadline onto the
//! current day and fires the warning or deadline action whose minute has
//! arrived. A fired-key ledger makes each (scope, phase, minute) fire at
//! most once, so a sub-minute cadence never double-sends.

use std::collections::HashMap;

use chrono::{DateTime, Datelike, Timelike, Utc};
use tokio_util::sync::CancellationToken;

use crate::config::NotifierConfig;
use crate::error::{BotError, Result};
use crate::housekeeping::Housekeeping;
use crate::notifier::deadlines::{
    fires_at, is_weekend, resolve_channel_deadline, resolve_member_deadline,
};
use crate::notifier::escalation::EscalationEngine;
use crate::store::SqliteStore;
use std::sync::Arc;

/// When the placeholder fill runs (weekdays only).
const FILL_HOUR: u32 = 23;
const FILL_MINUTE: u32 = 50;

/// When the user directory sync runs (daily).
const SYNC_HOUR: u32 = 23;
const SYNC_MINUTE: u32 = 55;

/// Remembers which (scope, phase, minute) keys already fired. Entries expire
/// after a day; the minute stamp in the key keeps distinct days distinct
/// before that.
#[derive(Debug, Default)]
pub struct FiredLedger {
    seen: HashMap<String, DateTime<Utc>>,
}

impl FiredLedger {
    /// Record a key. Returns `true` when it was newly inserted, `false` when
    /// it already fired.
    pub fn record_once(&mut self, key: String, now: DateTime<Utc>) -> bool {
        if self.seen.contains_key(&key) {
            return false;
        }
        self.seen.insert(key, now);
        true
    }

    /// Drop entries recorded more than a day ago.
    pub fn prune(&mut self, now: DateTime<Utc>) {
        self.seen
            .retain(|_, at| now.signed_duration_since(*at) < chrono::Duration::days(1));
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.seen.len()
    }
}

fn fire_key(kind: &str, scope: &str, phase: &str, now: DateTime<Utc>) -> String {
    format!("{kind}:{scope}:{phase}:{}", now.format("%Y-%m-%dT%H:%M"))
}

/// The scheduling loop: owns the tick cadence and decides what fires when.
/// All messaging goes through the escalation engine.
pub struct Notifier {
    store: Arc<SqliteStore>,
    engine: EscalationEngine,
    housekeeping: Housekeeping,
    config: NotifierConfig,
    cancel: CancellationToken,
}

impl Notifier {
    pub fn new(
        store: Arc<SqliteStore>,
        engine: EscalationEngine,
        housekeeping: Housekeeping,
        config: NotifierConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            store,
            engine,
            housekeeping,
            config,
            cancel,
        }
    }

    /// Run the loop until the cancellation token fires. Intended to be
    /// spawned as a background task.
    pub async fn run(self) {
        let cadence = self.config.cadence_secs.clamp(1, 60);
        tracing::info!("notifier started, ticking every {cadence}s");
        let mut ticker = tokio::time::interval(std::time::Duration::from_secs(cadence));
        let mut ledger = FiredLedger::default();

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    tracing::info!("notifier stopped");
                    return;
                }
                _ = ticker.tick() => {}
            }
            let now = Utc::now();
            ledger.prune(now);
            self.tick(now, &mut ledger).await;
        }
    }

    /// One evaluation pass. Failures are logged; the next tick starts fresh.
    pub async fn tick(&self, now: DateTime<Utc>, ledger: &mut FiredLedger) {
        if let Err(err) = self.channel_pass(now, ledger).await {
            tracing::error!("channel notification pass failed: {err}");
        }
        if let Err(err) = self.member_pass(now, ledger).await {
            tracing::error!("member notification pass failed: {err}");
        }
        self.housekeeping_pass(now, ledger).await;
    }

    async fn channel_pass(&self, now: DateTime<Utc>, ledger: &mut FiredLedger) -> Result<()> {
        if is_weekend(now) {
            return Ok(());
        }
        let channels = self
            .store
            .channels_with_deadline()
            .map_err(|e| BotError::Store(e.to_string()))?;
        for channel in channels {
            let Some(resolved) =
                resolve_channel_deadline(&channel, now, self.config.warning_lead_minutes)
            else {
                continue;
            };
            if fires_at(resolved.warning, now)
                && ledger.record_once(fire_key("channel", &channel.channel_id, "warn", now), now)
            {
                if let Err(err) = self.engine.warn_channel(&channel).await {
                    tracing::error!("warning in {} failed: {err}", channel.name);
                }
            }
            if fires_at(resolved.deadline, now)
                && ledger.record_once(
                    fire_key("channel", &channel.channel_id, "deadline", now),
                    now,
                )
            {
                let engine = self.engine.clone();
                let name = channel.name.clone();
                tokio::spawn(async move {
                    if let Err(err) = engine.run_channel_deadline(channel).await {
                        tracing::error!("deadline run in {name} failed: {err}");
                    }
                });
            }
        }
        Ok(())
    }

    async fn member_pass(&self, now: DateTime<Utc>, ledger: &mut FiredLedger) -> Result<()> {
        let entries = self
            .store
            .timetables_for_weekday(now.weekday())
            .map_err(|e| BotError::Store(e.to_string()))?;
        for (timetable, member) in entries {
            let Some(resolved) =
                resolve_member_deadline(&timetable, now, self.config.warning_lead_minutes)
            else {
                continue;
            };
            let scope = member.id.to_string();
            if fires_at(resolved.warning, now)
                && ledger.record_once(fire_key("member", &scope, "warn", now), now)
            {
                if let Err(err) = self.engine.warn_member(&member).await {
                    tracing::error!("warning for {} failed: {err}", member.real_name);
                }
            }
            if fires_at(resolved.deadline, now)
                && ledger.record_once(fire_key("member", &scope, "deadline", now), now)
            {
                let engine = self.engine.clone();
                let name = member.real_name.clone();
                tokio::spawn(async move {
                    if let Err(err) = engine.run_member_deadline(member).await {
                        tracing::error!("deadline run for {name} failed: {err}");
                    }
                });
            }
        }
        Ok(())
    }

    async fn housekeeping_pass(&self, now: DateTime<Utc>, ledger: &mut FiredLedger) {
        if now.hour() == FILL_HOUR
            && now.minute() == FILL_MINUTE
            && !is_weekend(now)
            && ledger.record_once(fire_key("housekeeping", "fill", "daily", now), now)
        {
            if let Err(err) = self.housekeeping.fill_missing_standups(now) {
                tracing::error!("placeholder fill failed: {err}");
            }
        }
        if now.hour() == SYNC_HOUR
            && now.minute() == SYNC_MINUTE
            && ledger.record_once(fire_key("housekeeping", "sync", "daily", now), now)
        {
            if let Err(err) = self.housekeeping.sync_members().await {
                tracing::error!("user directory sync failed: {err}");
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
    use crate::chat::ChatTransport;
    use crate::config::BotConfig;
    use crate::i18n::MessageCatalog;
    use crate::test_utils::RecordingTransport;
    use chrono::{NaiveTime, TimeZone, Weekday};

    fn notifier() -> (Arc<SqliteStore>, Arc<RecordingTransport>, Notifier) {
        let store = Arc::new(SqliteStore::open_in_memory().expect("store"));
        let transport = Arc::new(RecordingTransport::new());
        let catalog = Arc::new(MessageCatalog::english());
        let config = NotifierConfig::default();
        let engine = EscalationEngine::new(
            Arc::clone(&store),
            Arc::clone(&transport) as Arc<dyn ChatTransport>,
            Arc::clone(&catalog),
            config,
        );
        let housekeeping = Housekeeping::new(
            Arc::clone(&store),
            Arc::clone(&transport) as Arc<dyn ChatTransport>,
            catalog,
            &BotConfig::default(),
        );
        let notifier = Notifier::new(
            Arc::clone(&store),
            engine,
            housekeeping,
            config,
            CancellationToken::new(),
        );
        (store, transport, notifier)
    }

    fn seed_channel_with_member(store: &SqliteStore, deadline: NaiveTime) {
        store.ensure_channel("C1", "standups").expect("channel");
        store
            .set_channel_deadline("C1", Some(deadline))
            .expect("deadline");
        store
            .create_member("U1", "C1", "U1", Utc::now() - chrono::Duration::days(2))
            .expect("member");
    }

    // 2019-03-04 is a Monday.
    fn monday_at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2019, 3, 4, h, m, 0).unwrap()
    }

    #[test]
    fn ledger_records_each_key_once() {
        let mut ledger = FiredLedger::default();
        let now = monday_at(17, 50);
        let key = fire_key("channel", "C1", "warn", now);
        assert!(ledger.record_once(key.clone(), now));
        assert!(!ledger.record_once(key, now));
    }

    #[test]
    fn ledger_keys_differ_per_minute_and_phase() {
        let warn = fire_key("channel", "C1", "warn", monday_at(17, 50));
        let deadline = fire_key("channel", "C1", "deadline", monday_at(18, 0));
        let next_day_warn = fire_key(
            "channel",
            "C1",
            "warn",
            Utc.with_ymd_and_hms(2019, 3, 5, 17, 50, 0).unwrap(),
        );
        assert_ne!(warn, deadline);
        assert_ne!(warn, next_day_warn);
    }

    #[test]
    fn ledger_prunes_entries_older_than_a_day() {
        let mut ledger = FiredLedger::default();
        let monday = monday_at(18, 0);
        assert!(ledger.record_once(fire_key("channel", "C1", "warn", monday), monday));
        assert_eq!(ledger.len(), 1);

        let tuesday = monday + chrono::Duration::days(1);
        ledger.prune(tuesday);
        assert_eq!(ledger.len(), 0);
    }

    #[tokio::test]
    async fn tick_fires_the_warning_exactly_once_per_minute() {
        let (store, transport, notifier) = notifier();
        seed_channel_with_member(&store, NaiveTime::from_hms_opt(18, 0, 0).expect("time"));

        let warning_minute = monday_at(17, 50);
        let mut ledger = FiredLedger::default();
        notifier.tick(warning_minute, &mut ledger).await;
        // A faster-than-minute cadence revisits the same minute.
        notifier
            .tick(warning_minute + chrono::Duration::seconds(30), &mut ledger)
            .await;

        let posts = transport.channel_posts("C1");
        assert_eq!(posts.len(), 1);
        assert!(posts[0].contains("<@U1>"));
        assert!(posts[0].contains("10 minutes"));
    }

    #[tokio::test]
    async fn tick_outside_the_deadline_minute_is_quiet() {
        let (store, transport, notifier) = notifier();
        seed_channel_with_member(&store, NaiveTime::from_hms_opt(18, 0, 0).expect("time"));

        let mut ledger = FiredLedger::default();
        notifier.tick(monday_at(9, 15), &mut ledger).await;
        notifier.tick(monday_at(17, 49), &mut ledger).await;
        notifier.tick(monday_at(18, 1), &mut ledger).await;

        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn weekend_skips_the_channel_pass() {
        let (store, transport, notifier) = notifier();
        seed_channel_with_member(&store, NaiveTime::from_hms_opt(18, 0, 0).expect("time"));

        // 2019-03-09 is a Saturday.
        let saturday = Utc.with_ymd_and_hms(2019, 3, 9, 17, 50, 0).unwrap();
        let mut ledger = FiredLedger::default();
        notifier.tick(saturday, &mut ledger).await;

        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn member_timetable_fires_on_its_weekday() {
        let (store, transport, notifier) = notifier();
        store.ensure_channel("C1", "standups").expect("channel");
        let member = store
            .create_member("U1", "C1", "U1", Utc::now() - chrono::Duration::days(2))
            .expect("member");
        store
            .set_timetable_slot(
                member.id,
                Weekday::Mon,
                NaiveTime::from_hms_opt(11, 30, 0),
            )
            .expect("slot");

        let mut ledger = FiredLedger::default();
        notifier.tick(monday_at(11, 20), &mut ledger).await;

        let posts = transport.channel_posts("C1");
        assert_eq!(posts.len(), 1);
        assert!(posts[0].contains("your deadline"));

        // Tuesday has no slot, so the same wall-clock minute stays quiet.
        let tuesday = Utc.with_ymd_and_hms(2019, 3, 5, 11, 20, 0).unwrap();
        notifier.tick(tuesday, &mut ledger).await;
        assert_eq!(transport.channel_posts("C1").len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_minute_spawns_the_escalation_run() {
        let (store, transport, notifier) = notifier();
        seed_channel_with_member(&store, NaiveTime::from_hms_opt(18, 0, 0).expect("time"));

        let mut ledger = FiredLedger::default();
        notifier.tick(monday_at(18, 0), &mut ledger).await;

        // Let the spawned run proceed past its first nag.
        tokio::time::sleep(std::time::Duration::from_secs(1)).await;
        assert_eq!(transport.direct_posts("U1").len(), 1);
        assert!(!transport.channel_posts("C1").is_empty());
    }

    #[tokio::test]
    async fn housekeeping_minutes_trigger_fill_and_sync() {
        let (store, transport, notifier) = notifier();
        let fill_minute = monday_at(FILL_HOUR, FILL_MINUTE);
        store.ensure_channel("C1", "standups").expect("channel");
        // Registered before the fill day, so the obligation is active.
        store
            .create_member("U1", "C1", "U1", fill_minute - chrono::Duration::days(2))
            .expect("member");
        transport.set_users(Vec::new());

        let mut ledger = FiredLedger::default();
        notifier.tick(fill_minute, &mut ledger).await;

        // The fill pass wrote a placeholder for the silent member.
        let from = crate::standup::day_start(fill_minute);
        assert!(
            store
                .submitted_in_window("U1", "C1", from, fill_minute + chrono::Duration::seconds(1))
                .expect("check")
        );

        // The sync minute lists the directory without sending anything.
        notifier
            .tick(monday_at(SYNC_HOUR, SYNC_MINUTE), &mut ledger)
            .await;
        assert!(transport.sent().is_empty());
    }
}
