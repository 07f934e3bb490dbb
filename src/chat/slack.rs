use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

use crate::chat::traits::{ChatTransport, InboundEvent, InboundMessage, WorkspaceUser};
use crate::config::SlackConfig;

const SLACK_API_BASE: &str = "https://slack.com/api";

/// Slack transport using the RTM websocket for events + Web API for sends.
pub struct SlackTransport {
    bot_token: String,
    api_base: String,
    client: reqwest::Client,
}

impl SlackTransport {
    pub fn new(config: &SlackConfig) -> Self {
        Self {
            bot_token: config.bot_token.clone(),
            api_base: SLACK_API_BASE.to_owned(),
            client: reqwest::Client::new(),
        }
    }

    /// Point the transport at a different API host (tests).
    #[must_use]
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into();
        self
    }

    fn api_url(&self, method: &str) -> String {
        format!("{}/{}", self.api_base.trim_end_matches('/'), method)
    }

    /// POST a Web API method and check Slack's `ok` envelope.
    async fn call_api(
        &self,
        method: &str,
        body: serde_json::Value,
    ) -> anyhow::Result<serde_json::Value> {
        let response = self
            .client
            .post(self.api_url(method))
            .bearer_auth(&self.bot_token)
            .json(&body)
            .send()
            .await?;
        check_envelope(method, response).await
    }

    async fn call_api_get(
        &self,
        method: &str,
        query: &[(&str, &str)],
    ) -> anyhow::Result<serde_json::Value> {
        let response = self
            .client
            .get(self.api_url(method))
            .bearer_auth(&self.bot_token)
            .query(query)
            .send()
            .await?;
        check_envelope(method, response).await
    }

    /// Resolve a channel id to its display name, falling back to the id.
    async fn conversation_name(&self, channel_id: &str) -> String {
        match self
            .call_api_get("conversations.info", &[("channel", channel_id)])
            .await
        {
            Ok(payload) => payload
                .get("channel")
                .and_then(|c| c.get("name"))
                .and_then(serde_json::Value::as_str)
                .unwrap_or(channel_id)
                .to_owned(),
            Err(err) => {
                tracing::warn!("conversations.info failed for {channel_id}: {err}");
                channel_id.to_owned()
            }
        }
    }
}

#[async_trait]
impl ChatTransport for SlackTransport {
    fn id(&self) -> &'static str {
        "slack"
    }

    async fn send_to_channel(&self, channel_id: &str, text: &str) -> anyhow::Result<()> {
        self.call_api(
            "chat.postMessage",
            json!({ "channel": channel_id, "text": text }),
        )
        .await?;
        Ok(())
    }

    async fn send_direct(&self, user_id: &str, text: &str) -> anyhow::Result<()> {
        let opened = self
            .call_api("conversations.open", json!({ "users": user_id }))
            .await?;
        let dm_channel = opened
            .get("channel")
            .and_then(|c| c.get("id"))
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| anyhow::anyhow!("conversations.open returned no channel id"))?;
        self.call_api(
            "chat.postMessage",
            json!({ "channel": dm_channel, "text": text }),
        )
        .await?;
        Ok(())
    }

    async fn send_ephemeral(
        &self,
        channel_id: &str,
        user_id: &str,
        text: &str,
    ) -> anyhow::Result<()> {
        self.call_api(
            "chat.postEphemeral",
            json!({ "channel": channel_id, "user": user_id, "text": text }),
        )
        .await?;
        Ok(())
    }

    async fn add_reaction(
        &self,
        channel_id: &str,
        message_ts: &str,
        emoji: &str,
    ) -> anyhow::Result<()> {
        self.call_api(
            "reactions.add",
            json!({ "channel": channel_id, "timestamp": message_ts, "name": emoji }),
        )
        .await?;
        Ok(())
    }

    async fn list_users(&self) -> anyhow::Result<Vec<WorkspaceUser>> {
        let payload = self.call_api_get("users.list", &[]).await?;
        let members = payload
            .get("members")
            .and_then(serde_json::Value::as_array)
            .ok_or_else(|| anyhow::anyhow!("users.list returned no members array"))?;

        let mut users = Vec::with_capacity(members.len());
        for member in members {
            let id = member
                .get("id")
                .and_then(serde_json::Value::as_str)
                .unwrap_or_default();
            if id.is_empty() {
                continue;
            }
            let real_name = member
                .get("profile")
                .and_then(|p| p.get("real_name"))
                .and_then(serde_json::Value::as_str)
                .filter(|name| !name.is_empty())
                .or_else(|| member.get("name").and_then(serde_json::Value::as_str))
                .unwrap_or_default()
                .to_owned();
            // Slackbot reports is_bot=false; treat it as a bot anyway.
            let is_bot = member
                .get("is_bot")
                .and_then(serde_json::Value::as_bool)
                .unwrap_or(false)
                || id == "USLACKBOT";
            let deleted = member
                .get("deleted")
                .and_then(serde_json::Value::as_bool)
                .unwrap_or(false);
            users.push(WorkspaceUser {
                id: id.to_owned(),
                real_name,
                is_bot,
                deleted,
            });
        }
        Ok(users)
    }

    async fn self_user_id(&self) -> anyhow::Result<String> {
        let payload = self.call_api_get("auth.test", &[]).await?;
        payload
            .get("user_id")
            .and_then(serde_json::Value::as_str)
            .map(ToOwned::to_owned)
            .ok_or_else(|| anyhow::anyhow!("auth.test returned no user_id"))
    }

    async fn run(&self, inbound_tx: mpsc::Sender<InboundEvent>) -> anyhow::Result<()> {
        if self.bot_token.trim().is_empty() {
            anyhow::bail!("slack bot token is empty");
        }

        let connect = self.call_api_get("rtm.connect", &[]).await?;
        let ws_url = connect
            .get("url")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| anyhow::anyhow!("rtm.connect returned no websocket url"))?
            .to_owned();
        let self_id = connect
            .get("self")
            .and_then(|s| s.get("id"))
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default()
            .to_owned();

        let (stream, _) = tokio_tungstenite::connect_async(&ws_url).await?;
        let (mut write, mut read) = stream.split();

        // RTM drops idle connections; ping on an interval to stay alive.
        let (ping_tx, mut ping_rx) = mpsc::channel::<()>(1);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(std::time::Duration::from_secs(20));
            loop {
                interval.tick().await;
                if ping_tx.send(()).await.is_err() {
                    break;
                }
            }
        });

        let mut ping_id = 0u64;
        loop {
            tokio::select! {
                _ = ping_rx.recv() => {
                    ping_id += 1;
                    let ping = json!({"id": ping_id, "type": "ping"});
                    if write.send(Message::Text(ping.to_string())).await.is_err() {
                        anyhow::bail!("slack rtm ping failed");
                    }
                }
                maybe_msg = read.next() => {
                    let raw = match maybe_msg {
                        Some(Ok(Message::Text(text))) => text.to_string(),
                        Some(Ok(Message::Close(_))) | None => {
                            anyhow::bail!("slack rtm websocket closed");
                        }
                        Some(Ok(_)) => continue,
                        Some(Err(err)) => anyhow::bail!("slack rtm websocket error: {err}"),
                    };

                    let Some(event) = decode_event(&raw, &self_id) else {
                        continue;
                    };

                    // The join event only carries the channel id.
                    let event = match event {
                        InboundEvent::ChannelJoined { channel_id, .. } => {
                            let channel_name = self.conversation_name(&channel_id).await;
                            InboundEvent::ChannelJoined { channel_id, channel_name }
                        }
                        other => other,
                    };

                    if inbound_tx.send(event).await.is_err() {
                        anyhow::bail!("slack inbound channel closed");
                    }
                }
            }
        }
    }
}

async fn check_envelope(
    method: &str,
    response: reqwest::Response,
) -> anyhow::Result<serde_json::Value> {
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        anyhow::bail!("slack {method} failed ({status}): {body}");
    }
    let payload: serde_json::Value = response.json().await?;
    let ok = payload
        .get("ok")
        .and_then(serde_json::Value::as_bool)
        .unwrap_or(false);
    if !ok {
        let error = payload
            .get("error")
            .and_then(serde_json::Value::as_str)
            .unwrap_or("unknown error");
        anyhow::bail!("slack {method} failed: {error}");
    }
    Ok(payload)
}

/// Decode one RTM frame into an event the bot handles, or `None` for frames
/// it ignores (acks, typing, the bot's own messages, other event types).
fn decode_event(raw: &str, self_id: &str) -> Option<InboundEvent> {
    let payload: serde_json::Value = serde_json::from_str(raw).ok()?;
    let event_type = payload.get("type").and_then(serde_json::Value::as_str)?;

    match event_type {
        "message" => {
            let channel_id = payload
                .get("channel")
                .and_then(serde_json::Value::as_str)?
                .to_owned();
            let subtype = payload
                .get("subtype")
                .and_then(serde_json::Value::as_str)
                .unwrap_or_default();

            match subtype {
                "" => {
                    let user_id = payload.get("user").and_then(serde_json::Value::as_str)?;
                    if user_id.is_empty() || user_id == self_id {
                        return None;
                    }
                    Some(InboundEvent::NewMessage(InboundMessage {
                        channel_id,
                        user_id: user_id.to_owned(),
                        text: payload
                            .get("text")
                            .and_then(serde_json::Value::as_str)
                            .unwrap_or_default()
                            .to_owned(),
                        message_ts: payload
                            .get("ts")
                            .and_then(serde_json::Value::as_str)?
                            .to_owned(),
                    }))
                }
                "message_changed" => {
                    let message = payload.get("message")?;
                    let user_id = message.get("user").and_then(serde_json::Value::as_str)?;
                    if user_id.is_empty() || user_id == self_id {
                        return None;
                    }
                    Some(InboundEvent::EditedMessage(InboundMessage {
                        channel_id,
                        user_id: user_id.to_owned(),
                        text: message
                            .get("text")
                            .and_then(serde_json::Value::as_str)
                            .unwrap_or_default()
                            .to_owned(),
                        message_ts: message
                            .get("ts")
                            .and_then(serde_json::Value::as_str)?
                            .to_owned(),
                    }))
                }
                "message_deleted" => Some(InboundEvent::DeletedMessage {
                    channel_id,
                    message_ts: payload
                        .get("deleted_ts")
                        .and_then(serde_json::Value::as_str)?
                        .to_owned(),
                }),
                _ => None,
            }
        }
        "member_joined_channel" => {
            let user_id = payload.get("user").and_then(serde_json::Value::as_str)?;
            if user_id != self_id {
                return None;
            }
            Some(InboundEvent::ChannelJoined {
                channel_id: payload
                    .get("channel")
                    .and_then(serde_json::Value::as_str)?
                    .to_owned(),
                channel_name: String::new(),
            })
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    const SELF_ID: &str = "UBOT";

    #[test]
    fn decodes_plain_message() {
        let raw = r#"{"type":"message","channel":"C1","user":"U1","text":"standup text","ts":"1551692400.000100"}"#;
        let event = decode_event(raw, SELF_ID).expect("decoded");
        match event {
            InboundEvent::NewMessage(msg) => {
                assert_eq!(msg.channel_id, "C1");
                assert_eq!(msg.user_id, "U1");
                assert_eq!(msg.text, "standup text");
                assert_eq!(msg.message_ts, "1551692400.000100");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn decodes_edited_message_with_original_ts() {
        let raw = r#"{"type":"message","subtype":"message_changed","channel":"C1",
            "message":{"user":"U1","text":"edited","ts":"1551692400.000100"},
            "ts":"1551692500.000200"}"#;
        let event = decode_event(raw, SELF_ID).expect("decoded");
        match event {
            InboundEvent::EditedMessage(msg) => {
                assert_eq!(msg.text, "edited");
                // Lookup key is the original message's ts, not the edit's.
                assert_eq!(msg.message_ts, "1551692400.000100");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn decodes_deleted_message() {
        let raw = r#"{"type":"message","subtype":"message_deleted","channel":"C1","deleted_ts":"1551692400.000100"}"#;
        let event = decode_event(raw, SELF_ID).expect("decoded");
        match event {
            InboundEvent::DeletedMessage {
                channel_id,
                message_ts,
            } => {
                assert_eq!(channel_id, "C1");
                assert_eq!(message_ts, "1551692400.000100");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn ignores_own_messages() {
        let raw = format!(
            r#"{{"type":"message","channel":"C1","user":"{SELF_ID}","text":"hi","ts":"1.0"}}"#
        );
        assert!(decode_event(&raw, SELF_ID).is_none());
    }

    #[test]
    fn ignores_bot_message_subtype() {
        let raw = r#"{"type":"message","subtype":"bot_message","channel":"C1","text":"hi","ts":"1.0"}"#;
        assert!(decode_event(raw, SELF_ID).is_none());
    }

    #[test]
    fn join_event_only_fires_for_the_bot_itself() {
        let own = format!(
            r#"{{"type":"member_joined_channel","user":"{SELF_ID}","channel":"C9"}}"#
        );
        match decode_event(&own, SELF_ID).expect("decoded") {
            InboundEvent::ChannelJoined { channel_id, .. } => assert_eq!(channel_id, "C9"),
            other => panic!("unexpected event: {other:?}"),
        }

        let somebody_else =
            r#"{"type":"member_joined_channel","user":"U7","channel":"C9"}"#;
        assert!(decode_event(somebody_else, SELF_ID).is_none());
    }

    #[test]
    fn ignores_acks_and_unrelated_events() {
        assert!(decode_event(r#"{"ok":true,"reply_to":1}"#, SELF_ID).is_none());
        assert!(decode_event(r#"{"type":"user_typing","channel":"C1","user":"U1"}"#, SELF_ID).is_none());
        assert!(decode_event("not json", SELF_ID).is_none());
    }
}
