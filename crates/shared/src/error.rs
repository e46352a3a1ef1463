use thiserror::Error;

use crate::domain::ChannelId;

/// Failure taxonomy shared by the chat client adapter and the GUI.
///
/// Every worker-thread failure crossing to the UI is one of these variants;
/// none propagate as panics across the thread boundary.
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    /// Token rejected by the service. User-correctable, no retry.
    #[error("authentication rejected: {0}")]
    Authentication(String),

    /// Transport-level failure. The connection is considered dead.
    #[error("network failure: {0}")]
    Network(String),

    /// History/read access forbidden for a specific channel. Does not
    /// affect connection state.
    #[error("history access forbidden for channel {}", .0 .0)]
    Permission(ChannelId),

    /// A message failed to deliver.
    #[error("failed to send to channel {}: {reason}", channel_id.0)]
    Send {
        channel_id: ChannelId,
        text: String,
        reason: String,
    },

    /// Catch-all worker-loop crash. Terminates the session.
    #[error("connection failure: {0}")]
    Connection(String),
}
