//! Chat client adapter: a thin capability surface over the black-box
//! protocol client, driven entirely from the worker thread's runtime.

use std::{fmt, sync::Arc};

use shared::{
    domain::{ChannelId, ChannelSummary, GuildEntry, MessagePayload},
    error::ClientError,
};
use tokio::sync::broadcast;
use tracing::{info, warn};
use zeroize::Zeroize;

pub mod gateway;
pub mod loopback;

pub use gateway::{ChannelRecord, ChatGateway, GatewayEvent};
pub use loopback::LoopbackGateway;

/// History page size used for every channel switch, matching the service's
/// default page.
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Connection token plus optional presence string, validated at construction
/// and immutable for the session. The token is wiped from memory on drop and
/// never printed.
pub struct Credentials {
    token: String,
    presence: Option<String>,
}

impl Credentials {
    pub fn new(token: impl Into<String>, presence: Option<String>) -> Result<Self, ClientError> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(ClientError::Authentication("bot token is empty".into()));
        }
        let presence = presence.filter(|text| !text.trim().is_empty());
        Ok(Self { token, presence })
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn presence(&self) -> Option<&str> {
        self.presence.as_deref()
    }
}

impl Drop for Credentials {
    fn drop(&mut self) {
        self.token.zeroize();
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &"<redacted>")
            .field("presence", &self.presence)
            .finish()
    }
}

/// Adapter-level traffic handed to subscribers (the bridge worker).
#[derive(Debug, Clone)]
pub enum ClientEvent {
    MessageReceived(MessagePayload),
    ConnectionClosed(String),
}

/// Cheaply cloneable handle over the injected gateway. Clones share the
/// gateway and the event fan-out, so spawned tasks (history fetches) can
/// carry their own handle.
#[derive(Clone)]
pub struct BotClient {
    gateway: Arc<dyn ChatGateway>,
    events: broadcast::Sender<ClientEvent>,
}

impl BotClient {
    pub fn new(gateway: Arc<dyn ChatGateway>) -> Self {
        let (events, _) = broadcast::channel(256);
        Self { gateway, events }
    }

    /// Authenticate, apply presence, and build the read-only directory
    /// projection the UI is seeded with. Must run inside the worker
    /// runtime; the live-traffic forwarder task is spawned here.
    ///
    /// Channels the account cannot read are filtered out; a guild where
    /// nothing is readable contributes an empty channel list, not an error.
    pub async fn connect(&self, credentials: &Credentials) -> Result<Vec<GuildEntry>, ClientError> {
        self.gateway.connect(credentials.token()).await?;
        info!("gateway session established");

        // Presence is set exactly once, immediately after a successful
        // connect. A presence failure is not worth tearing the session down.
        if let Some(text) = credentials.presence() {
            if let Err(err) = self.gateway.set_presence(text).await {
                warn!("failed to set presence: {err}");
            }
        }

        let mut raw = self.gateway.subscribe();
        let events = self.events.clone();
        tokio::spawn(async move {
            loop {
                match raw.recv().await {
                    Ok(GatewayEvent::MessageCreate(message)) => {
                        let _ = events.send(ClientEvent::MessageReceived(message));
                    }
                    Ok(GatewayEvent::Closed(reason)) => {
                        let _ = events.send(ClientEvent::ConnectionClosed(reason));
                        break;
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "gateway event stream lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        let mut entries = Vec::new();
        for guild in self.gateway.list_guilds().await? {
            let channels = self.list_channels(&guild).await?;
            entries.push(GuildEntry { guild, channels });
        }
        Ok(entries)
    }

    async fn list_channels(
        &self,
        guild: &shared::domain::GuildSummary,
    ) -> Result<Vec<ChannelSummary>, ClientError> {
        let records = self.gateway.list_channels(guild.guild_id).await?;
        Ok(records
            .into_iter()
            .filter(|record| record.readable)
            .map(|record| ChannelSummary {
                channel_id: record.channel_id,
                guild_id: record.guild_id,
                name: record.name,
            })
            .collect())
    }

    /// Live traffic for this session. Receivers only observe events emitted
    /// after subscription.
    pub fn subscribe_events(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    /// Newest-first history slice for a channel.
    pub async fn fetch_history(
        &self,
        channel_id: ChannelId,
        limit: usize,
    ) -> Result<Vec<MessagePayload>, ClientError> {
        self.gateway.fetch_history(channel_id, limit).await
    }

    /// Fire-and-forget send; delivery failures come back as
    /// [`ClientError::Send`] carrying the original text so the UI can
    /// reference it.
    pub async fn send(&self, channel_id: ChannelId, text: &str) -> Result<(), ClientError> {
        self.gateway
            .send_message(channel_id, text)
            .await
            .map_err(|err| match err {
                err @ ClientError::Send { .. } => err,
                other => ClientError::Send {
                    channel_id,
                    text: text.to_string(),
                    reason: other.to_string(),
                },
            })
    }

    pub async fn disconnect(&self) {
        self.gateway.disconnect().await;
    }
}

#[cfg(test)]
mod tests;
