//! Commands queued from the UI thread to the chat worker.
//!
//! Payloads are treated as immutable once enqueued; that, plus the queue
//! itself, is the entire cross-thread contract on the outbound side.

use shared::domain::{ChannelId, ChannelSummary};

pub enum BackendCommand {
    FetchHistory { channel: ChannelSummary },
    SendMessage { channel_id: ChannelId, text: String },
}
