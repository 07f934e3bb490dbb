use async_trait::async_trait;
use tokio::sync::mpsc;

/// A chat message the bot cares about: somebody posted in a tracked channel.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub channel_id: String,
    pub user_id: String,
    pub text: String,
    pub message_ts: String,
}

/// Workspace event delivered by a chat transport.
#[derive(Debug, Clone)]
pub enum InboundEvent {
    /// A fresh message was posted.
    NewMessage(InboundMessage),
    /// An existing message was edited; `message_ts` identifies the original.
    EditedMessage(InboundMessage),
    /// A message was deleted.
    DeletedMessage {
        channel_id: String,
        message_ts: String,
    },
    /// The bot was invited into a channel.
    ChannelJoined {
        channel_id: String,
        channel_name: String,
    },
}

/// Workspace member as reported by the chat platform's user directory.
#[derive(Debug, Clone)]
pub struct WorkspaceUser {
    pub id: String,
    pub real_name: String,
    pub is_bot: bool,
    pub deleted: bool,
}

/// Chat platform contract. New platforms only need to implement this trait.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Stable transport identifier (e.g. `slack`).
    fn id(&self) -> &'static str;

    /// Post a message everyone in the channel can see.
    async fn send_to_channel(&self, channel_id: &str, text: &str) -> anyhow::Result<()>;

    /// Open (or reuse) a direct-message conversation and post into it.
    async fn send_direct(&self, user_id: &str, text: &str) -> anyhow::Result<()>;

    /// Post a message only `user_id` can see, inside the channel.
    async fn send_ephemeral(
        &self,
        channel_id: &str,
        user_id: &str,
        text: &str,
    ) -> anyhow::Result<()>;

    /// Attach an emoji reaction to a message.
    async fn add_reaction(
        &self,
        channel_id: &str,
        message_ts: &str,
        emoji: &str,
    ) -> anyhow::Result<()>;

    /// Fetch the workspace user directory.
    async fn list_users(&self) -> anyhow::Result<Vec<WorkspaceUser>>;

    /// The bot's own user id in the workspace.
    async fn self_user_id(&self) -> anyhow::Result<String>;

    /// Start receiving workspace events and forwarding them to the bot.
    async fn run(&self, inbound_tx: mpsc::Sender<InboundEvent>) -> anyhow::Result<()>;
}

/// Format a user id so the platform renders it as a highlighted mention.
#[must_use]
pub fn mention(user_id: &str) -> String {
    format!("<@{user_id}>")
}

/// Render a list of user ids as comma-separated mentions.
#[must_use]
pub fn mention_list(user_ids: &[String]) -> String {
    user_ids
        .iter()
        .map(|id| mention(id))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Format a channel reference the platform renders as a clickable link.
#[must_use]
pub fn channel_link(channel_id: &str, name: &str) -> String {
    format!("<#{channel_id}|{name}>")
}
