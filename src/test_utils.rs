//! Shared test utilities used across unit and integration tests.
//!
//! The main piece is [`RecordingTransport`], a chat transport double that
//! records outbound traffic instead of talking to a workspace.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::chat::traits::{ChatTransport, InboundEvent, WorkspaceUser};

/// One outbound action captured by [`RecordingTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SentMessage {
    Channel {
        channel_id: String,
        text: String,
    },
    Direct {
        user_id: String,
        text: String,
    },
    Ephemeral {
        channel_id: String,
        user_id: String,
        text: String,
    },
    Reaction {
        channel_id: String,
        message_ts: String,
        emoji: String,
    },
}

/// Chat transport double: every send is recorded, nothing leaves the process.
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<SentMessage>>,
    users: Mutex<Vec<WorkspaceUser>>,
    fail_user_listing: AtomicBool,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the workspace directory returned by `list_users`.
    pub fn with_users(users: Vec<WorkspaceUser>) -> Self {
        let transport = Self::new();
        transport.set_users(users);
        transport
    }

    pub fn set_users(&self, users: Vec<WorkspaceUser>) {
        *self.users.lock().expect("users lock") = users;
    }

    /// Make subsequent `list_users` calls fail.
    pub fn fail_user_listing(&self) {
        self.fail_user_listing.store(true, Ordering::SeqCst);
    }

    /// Everything sent so far, oldest first.
    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().expect("sent lock").clone()
    }

    /// Drain the recording, returning what was sent since the last drain.
    pub fn take_sent(&self) -> Vec<SentMessage> {
        std::mem::take(&mut *self.sent.lock().expect("sent lock"))
    }

    /// Texts posted to one channel, oldest first.
    pub fn channel_posts(&self, channel_id: &str) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|m| match m {
                SentMessage::Channel { channel_id: c, text } if c == channel_id => Some(text),
                _ => None,
            })
            .collect()
    }

    /// Texts direct-messaged to one user, oldest first.
    pub fn direct_posts(&self, user_id: &str) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|m| match m {
                SentMessage::Direct { user_id: u, text } if u == user_id => Some(text),
                _ => None,
            })
            .collect()
    }

    fn record(&self, message: SentMessage) {
        self.sent.lock().expect("sent lock").push(message);
    }
}

#[async_trait]
impl ChatTransport for RecordingTransport {
    fn id(&self) -> &'static str {
        "recording"
    }

    async fn send_to_channel(&self, channel_id: &str, text: &str) -> anyhow::Result<()> {
        self.record(SentMessage::Channel {
            channel_id: channel_id.to_owned(),
            text: text.to_owned(),
        });
        Ok(())
    }

    async fn send_direct(&self, user_id: &str, text: &str) -> anyhow::Result<()> {
        self.record(SentMessage::Direct {
            user_id: user_id.to_owned(),
            text: text.to_owned(),
        });
        Ok(())
    }

    async fn send_ephemeral(
        &self,
        channel_id: &str,
        user_id: &str,
        text: &str,
    ) -> anyhow::Result<()> {
        self.record(SentMessage::Ephemeral {
            channel_id: channel_id.to_owned(),
            user_id: user_id.to_owned(),
            text: text.to_owned(),
        });
        Ok(())
    }

    async fn add_reaction(
        &self,
        channel_id: &str,
        message_ts: &str,
        emoji: &str,
    ) -> anyhow::Result<()> {
        self.record(SentMessage::Reaction {
            channel_id: channel_id.to_owned(),
            message_ts: message_ts.to_owned(),
            emoji: emoji.to_owned(),
        });
        Ok(())
    }

    async fn list_users(&self) -> anyhow::Result<Vec<WorkspaceUser>> {
        if self.fail_user_listing.load(Ordering::SeqCst) {
            anyhow::bail!("user directory unavailable");
        }
        Ok(self.users.lock().expect("users lock").clone())
    }

    async fn self_user_id(&self) -> anyhow::Result<String> {
        Ok("UBOT".to_owned())
    }

    async fn run(&self, _inbound_tx: mpsc::Sender<InboundEvent>) -> anyhow::Result<()> {
        // No inbound source; park forever so the supervisor never restarts us.
        std::future::pending().await
    }
}

/// A workspace user entry for directory-driven tests.
pub fn workspace_user(id: &str, real_name: &str) -> WorkspaceUser {
    WorkspaceUser {
        id: id.to_owned(),
        real_name: real_name.to_owned(),
        is_bot: false,
        deleted: false,
    }
}
