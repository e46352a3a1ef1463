//! Capability boundary to the underlying chat-protocol client.
//!
//! The concrete gateway (the thing that actually speaks the service's wire
//! protocol) is supplied from outside; everything in this workspace consumes
//! it through [`ChatGateway`] only. The trait is object safe so the GUI can
//! inject it as `Arc<dyn ChatGateway>`.

use async_trait::async_trait;
use shared::{
    domain::{ChannelId, GuildId, GuildSummary, MessagePayload},
    error::ClientError,
};
use tokio::sync::broadcast;

/// Raw directory row as the protocol client reports it, before the adapter
/// applies permission filtering.
#[derive(Debug, Clone)]
pub struct ChannelRecord {
    pub channel_id: ChannelId,
    pub guild_id: GuildId,
    pub name: String,
    /// Whether the bot account may read this channel.
    pub readable: bool,
}

/// Traffic pushed by the protocol client while the connection is live.
#[derive(Debug, Clone)]
pub enum GatewayEvent {
    MessageCreate(MessagePayload),
    /// The connection died underneath us; carries a human-readable reason.
    Closed(String),
}

#[async_trait]
pub trait ChatGateway: Send + Sync {
    /// Authenticate with the service. Rejected tokens must fail promptly
    /// with [`ClientError::Authentication`]; transport problems with
    /// [`ClientError::Network`].
    async fn connect(&self, token: &str) -> Result<(), ClientError>;

    async fn disconnect(&self);

    /// Broadcast a presence/status string alongside the online state.
    async fn set_presence(&self, text: &str) -> Result<(), ClientError>;

    async fn list_guilds(&self) -> Result<Vec<GuildSummary>, ClientError>;

    /// All channels of the guild, including ones the account cannot read.
    async fn list_channels(&self, guild_id: GuildId) -> Result<Vec<ChannelRecord>, ClientError>;

    /// Finite history slice, newest message first (the service's documented
    /// order). Forbidden channels fail with [`ClientError::Permission`].
    async fn fetch_history(
        &self,
        channel_id: ChannelId,
        limit: usize,
    ) -> Result<Vec<MessagePayload>, ClientError>;

    async fn send_message(&self, channel_id: ChannelId, text: &str) -> Result<(), ClientError>;

    /// Subscribe to live traffic. Valid to call before `connect`; the
    /// receiver only sees events emitted after subscription.
    fn subscribe(&self) -> broadcast::Receiver<GatewayEvent>;
}
