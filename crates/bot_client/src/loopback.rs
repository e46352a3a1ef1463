//! In-process development gateway.
//!
//! Speaks no wire protocol: the directory is seeded in memory and sent
//! messages are echoed straight back through the event stream. This is what
//! the desktop binary runs against by default, and what the bridge worker
//! tests drive.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use shared::{
    domain::{ChannelId, GuildId, GuildSummary, MessagePayload},
    error::ClientError,
};
use tokio::sync::broadcast;

use crate::gateway::{ChannelRecord, ChatGateway, GatewayEvent};

struct LoopbackChannel {
    record: ChannelRecord,
    history_allowed: bool,
    /// Oldest first; served newest first.
    backlog: Vec<MessagePayload>,
}

pub struct LoopbackGateway {
    guilds: Vec<GuildSummary>,
    channels: Mutex<Vec<LoopbackChannel>>,
    events: broadcast::Sender<GatewayEvent>,
}

impl LoopbackGateway {
    /// Demo directory: two guilds, one hidden channel, one channel with
    /// history access revoked so the permission notice path is reachable
    /// without a real service.
    pub fn seeded() -> Self {
        let guilds = vec![
            GuildSummary {
                guild_id: GuildId(1),
                name: "workshop".into(),
            },
            GuildSummary {
                guild_id: GuildId(2),
                name: "lounge".into(),
            },
        ];
        let seed_line = |channel_id: ChannelId, author: &str, text: &str| MessagePayload {
            channel_id,
            author: author.into(),
            text: text.into(),
            timestamp: Utc::now(),
        };
        let channels = vec![
            LoopbackChannel {
                record: ChannelRecord {
                    channel_id: ChannelId(101),
                    guild_id: GuildId(1),
                    name: "general".into(),
                    readable: true,
                },
                history_allowed: true,
                backlog: vec![
                    seed_line(ChannelId(101), "ada", "welcome to the loopback backend"),
                    seed_line(ChannelId(101), "ada", "anything you send here is echoed back"),
                ],
            },
            LoopbackChannel {
                record: ChannelRecord {
                    channel_id: ChannelId(102),
                    guild_id: GuildId(1),
                    name: "mod-only".into(),
                    readable: false,
                },
                history_allowed: false,
                backlog: Vec::new(),
            },
            LoopbackChannel {
                record: ChannelRecord {
                    channel_id: ChannelId(103),
                    guild_id: GuildId(1),
                    name: "archive".into(),
                    readable: true,
                },
                history_allowed: false,
                backlog: Vec::new(),
            },
            LoopbackChannel {
                record: ChannelRecord {
                    channel_id: ChannelId(201),
                    guild_id: GuildId(2),
                    name: "random".into(),
                    readable: true,
                },
                history_allowed: true,
                backlog: vec![seed_line(ChannelId(201), "grace", "second guild, second channel")],
            },
        ];
        let (events, _) = broadcast::channel(256);
        Self {
            guilds,
            channels: Mutex::new(channels),
            events,
        }
    }
}

#[async_trait]
impl ChatGateway for LoopbackGateway {
    async fn connect(&self, _token: &str) -> Result<(), ClientError> {
        Ok(())
    }

    async fn disconnect(&self) {}

    async fn set_presence(&self, _text: &str) -> Result<(), ClientError> {
        Ok(())
    }

    async fn list_guilds(&self) -> Result<Vec<GuildSummary>, ClientError> {
        Ok(self.guilds.clone())
    }

    async fn list_channels(&self, guild_id: GuildId) -> Result<Vec<ChannelRecord>, ClientError> {
        let channels = self.channels.lock().expect("loopback state poisoned");
        Ok(channels
            .iter()
            .map(|channel| &channel.record)
            .filter(|record| record.guild_id == guild_id)
            .cloned()
            .collect())
    }

    async fn fetch_history(
        &self,
        channel_id: ChannelId,
        limit: usize,
    ) -> Result<Vec<MessagePayload>, ClientError> {
        let channels = self.channels.lock().expect("loopback state poisoned");
        let channel = channels
            .iter()
            .find(|channel| channel.record.channel_id == channel_id)
            .ok_or_else(|| ClientError::Network(format!("unknown channel {}", channel_id.0)))?;
        if !channel.history_allowed {
            return Err(ClientError::Permission(channel_id));
        }
        Ok(channel.backlog.iter().rev().take(limit).cloned().collect())
    }

    async fn send_message(&self, channel_id: ChannelId, text: &str) -> Result<(), ClientError> {
        let echo = {
            let mut channels = self.channels.lock().expect("loopback state poisoned");
            let channel = channels
                .iter_mut()
                .find(|channel| channel.record.channel_id == channel_id)
                .ok_or_else(|| ClientError::Send {
                    channel_id,
                    text: text.to_string(),
                    reason: "unknown channel".into(),
                })?;
            let message = MessagePayload {
                channel_id,
                author: "botdeck".into(),
                text: text.to_string(),
                timestamp: Utc::now(),
            };
            channel.backlog.push(message.clone());
            message
        };
        let _ = self.events.send(GatewayEvent::MessageCreate(echo));
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<GatewayEvent> {
        self.events.subscribe()
    }
}
