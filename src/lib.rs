//! Rollcall: team standup bot for chat workspaces.
//!
//! This crate runs a daily reporting loop over a chat transport:
//! Inbound message → validation → SQLite store → scheduled reminders
//!
//! # Architecture
//!
//! The bot is built from independent pieces connected by async channels:
//! - **Chat transport**: Slack RTM websocket + Web API via
//!   `tokio-tungstenite` and `reqwest`
//! - **Intake**: Parses tagged standup messages and checks the
//!   yesterday/today/problems structure
//! - **Store**: Channels, members, timetables and standups persisted with
//!   `rusqlite`
//! - **Notifier**: Minute-granular deadline matching with a warning phase
//!   and an escalation phase
//! - **Reporting**: Per-channel and per-member standup history

pub mod bot;
pub mod chat;
pub mod config;
pub mod error;
pub mod housekeeping;
pub mod i18n;
pub mod notifier;
pub mod paths;
pub mod reporting;
pub mod standup;
pub mod store;
pub mod test_utils;

pub use bot::Bot;
pub use chat::{ChatTransport, InboundEvent, InboundMessage, SlackTransport};
pub use config::BotConfig;
pub use error::{BotError, Result};
pub use i18n::MessageCatalog;
pub use reporting::Reporter;
pub use standup::{StandupValidator, day_start};
pub use store::SqliteStore;
