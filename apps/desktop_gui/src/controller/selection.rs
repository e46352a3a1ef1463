//! Guild/channel selection state machine.
//!
//! Single mutable instance, owned by the UI thread, mutated only by user
//! picks and session lifecycle events. The bridge's inbound message filter
//! reads it at delivery time: that is what makes superseded history fetches
//! harmless without any cancellation machinery.

use shared::domain::{ChannelId, ChannelSummary};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selection {
    #[default]
    Disconnected,
    Connected,
    GuildSelected {
        guild_index: usize,
    },
    ChannelSelected {
        guild_index: usize,
        channel: ChannelSummary,
    },
}

impl Selection {
    /// A fresh ready event always restarts from no selection.
    pub fn connected(&mut self) {
        *self = Selection::Connected;
    }

    /// Disconnect or fatal error, from any state.
    pub fn disconnected(&mut self) {
        *self = Selection::Disconnected;
    }

    /// User guild pick. Clears any channel selection; returns true when the
    /// pick took effect and the transcript must be cleared.
    pub fn pick_guild(&mut self, guild_index: usize) -> bool {
        if matches!(self, Selection::Disconnected) {
            return false;
        }
        *self = Selection::GuildSelected { guild_index };
        true
    }

    /// User channel pick. Only meaningful once a guild is selected; returns
    /// the channel whose history must now be fetched (exactly one fetch per
    /// pick). Re-picking while a channel is already selected re-enters the
    /// same state.
    pub fn pick_channel(&mut self, channel: ChannelSummary) -> Option<ChannelSummary> {
        let guild_index = match self {
            Selection::GuildSelected { guild_index }
            | Selection::ChannelSelected { guild_index, .. } => *guild_index,
            Selection::Disconnected | Selection::Connected => return None,
        };
        *self = Selection::ChannelSelected {
            guild_index,
            channel: channel.clone(),
        };
        Some(channel)
    }

    pub fn guild_index(&self) -> Option<usize> {
        match self {
            Selection::GuildSelected { guild_index }
            | Selection::ChannelSelected { guild_index, .. } => Some(*guild_index),
            _ => None,
        }
    }

    pub fn current_channel(&self) -> Option<ChannelId> {
        match self {
            Selection::ChannelSelected { channel, .. } => Some(channel.channel_id),
            _ => None,
        }
    }

    /// Delivery-time filter: does a message for `channel_id` belong in the
    /// visible transcript right now? Checked when the event is processed,
    /// not when the fetch was requested.
    pub fn accepts(&self, channel_id: ChannelId) -> bool {
        self.current_channel() == Some(channel_id)
    }
}
