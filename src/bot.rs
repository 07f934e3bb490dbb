//! Bot runtime: wires storage, transport, catalog and the loops together.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::chat::{ChatTransport, InboundEvent, MessageIntake};
use crate::config::BotConfig;
use crate::error::{BotError, Result};
use crate::housekeeping::Housekeeping;
use crate::i18n::MessageCatalog;
use crate::notifier::{EscalationEngine, Notifier};
use crate::standup::{KeywordProfile, StandupValidator};
use crate::store::SqliteStore;

/// Inbound events buffered between the transport and intake.
const INBOUND_QUEUE_SIZE: usize = 64;

/// The assembled bot. Construction is cheap; everything happens in
/// [`run`](Self::run).
pub struct Bot {
    config: BotConfig,
    store: Arc<SqliteStore>,
    transport: Arc<dyn ChatTransport>,
    catalog: Arc<MessageCatalog>,
}

impl Bot {
    pub fn new(
        config: BotConfig,
        store: Arc<SqliteStore>,
        transport: Arc<dyn ChatTransport>,
        catalog: Arc<MessageCatalog>,
    ) -> Self {
        Self {
            config,
            store,
            transport,
            catalog,
        }
    }

    /// Run until the token is cancelled.
    ///
    /// Startup order: identify the bot user, sync the member directory, greet
    /// the manager, then start the notifier loop and the transport supervisor
    /// and consume inbound events. In-flight escalation runs are abandoned at
    /// shutdown.
    ///
    /// # Errors
    ///
    /// Returns an error when the transport cannot identify the bot user;
    /// everything after that point is retried or logged instead.
    pub async fn run(self, cancel: CancellationToken) -> Result<()> {
        let bot_user_id = self
            .transport
            .self_user_id()
            .await
            .map_err(|e| BotError::Transport(e.to_string()))?;
        tracing::info!("authenticated on {} as {bot_user_id}", self.transport.id());

        let validator = StandupValidator::new(KeywordProfile::from_config(&self.config.validation));
        let intake = MessageIntake::new(
            Arc::clone(&self.store),
            Arc::clone(&self.transport),
            Arc::clone(&self.catalog),
            validator,
            &self.config,
            bot_user_id,
        );

        let housekeeping = Housekeeping::new(
            Arc::clone(&self.store),
            Arc::clone(&self.transport),
            Arc::clone(&self.catalog),
            &self.config,
        );
        if let Err(err) = housekeeping.sync_members().await {
            tracing::warn!("startup membership sync failed: {err}");
        }
        housekeeping.startup_greeting().await;

        let engine = EscalationEngine::new(
            Arc::clone(&self.store),
            Arc::clone(&self.transport),
            Arc::clone(&self.catalog),
            self.config.notifier,
        );
        let notifier = Notifier::new(
            Arc::clone(&self.store),
            engine,
            housekeeping,
            self.config.notifier,
            cancel.child_token(),
        );

        let (inbound_tx, mut inbound_rx) = mpsc::channel::<InboundEvent>(INBOUND_QUEUE_SIZE);

        let mut workers = JoinSet::new();
        workers.spawn(notifier.run());
        {
            let transport = Arc::clone(&self.transport);
            let supervisor_cancel = cancel.child_token();
            workers.spawn(async move {
                let mut backoff_secs = 2u64;
                loop {
                    tokio::select! {
                        _ = supervisor_cancel.cancelled() => return,
                        result = transport.run(inbound_tx.clone()) => match result {
                            Ok(()) => {
                                tracing::warn!("transport {} stopped; restarting", transport.id());
                            }
                            Err(err) => {
                                tracing::warn!(
                                    "transport {} failed: {err}; retrying in {backoff_secs}s",
                                    transport.id()
                                );
                            }
                        }
                    }
                    tokio::select! {
                        _ = supervisor_cancel.cancelled() => return,
                        _ = tokio::time::sleep(std::time::Duration::from_secs(backoff_secs)) => {}
                    }
                    backoff_secs = (backoff_secs.saturating_mul(2)).min(60);
                }
            });
        }

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                event = inbound_rx.recv() => match event {
                    Some(event) => {
                        if let Err(err) = intake.handle_event(event).await {
                            tracing::error!("inbound event handling failed: {err}");
                        }
                    }
                    None => break,
                },
            }
        }

        tracing::info!("shutting down");
        cancel.cancel();
        workers.abort_all();
        while workers.join_next().await.is_some() {}
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
