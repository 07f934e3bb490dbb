//! Standup bot daemon.
//!
//! Loads the TOML configuration, opens the SQLite store, connects the Slack
//! transport and runs the reminder scheduler plus the inbound message loop
//! until Ctrl+C.
//!
//! An optional path argument points at an alternate config file. When
//! `ROLLCALL_LOG_DIR` is set, logs roll to a daily file in that directory
//! instead of standard output.

use std::path::Path;
use std::sync::Arc;

use rollcall::bot::Bot;
use rollcall::chat::{ChatTransport, SlackTransport};
use rollcall::config::BotConfig;
use rollcall::i18n::MessageCatalog;
use rollcall::store::SqliteStore;
use tokio_util::sync::CancellationToken;

fn log_filter() -> tracing_subscriber::EnvFilter {
    tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
}

/// Initialise tracing; the returned guard must stay alive so the background
/// log writer flushes on shutdown.
fn init_logging() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    match std::env::var_os("ROLLCALL_LOG_DIR") {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "rollcall.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(log_filter())
                .with_writer(writer)
                .with_ansi(false)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(log_filter()).init();
            None
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _log_guard = init_logging();

    let config = match std::env::args().nth(1) {
        Some(path) => {
            let mut config = BotConfig::from_file(Path::new(&path))?;
            config
                .slack
                .apply_env(std::env::var("ROLLCALL_SLACK_TOKEN").ok());
            config
        }
        None => BotConfig::load()?,
    };
    if config.slack.bot_token.trim().is_empty() {
        anyhow::bail!(
            "no Slack bot token configured; set slack.bot_token in {} or export ROLLCALL_SLACK_TOKEN",
            BotConfig::default_config_path().display()
        );
    }

    let store = Arc::new(SqliteStore::open(&config.storage.db_path)?);
    let catalog = Arc::new(MessageCatalog::from_config(&config.i18n)?);
    let transport = Arc::new(SlackTransport::new(&config.slack)) as Arc<dyn ChatTransport>;

    // Handle Ctrl+C
    let cancel = CancellationToken::new();
    let cancel_clone = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("received Ctrl+C, shutting down...");
            cancel_clone.cancel();
        }
    });

    tracing::info!("rollcall starting");

    Bot::new(config, store, transport, catalog)
        .run(cancel)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "rollcall exited with error");
            anyhow::anyhow!("rollcall failed: {e}")
        })?;

    tracing::info!("rollcall shut down cleanly");
    Ok(())
}
