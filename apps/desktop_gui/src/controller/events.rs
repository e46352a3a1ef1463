//! Inbound events crossing from the chat worker to the UI thread.

use shared::{
    domain::{ChannelId, GuildEntry, MessagePayload},
    error::ClientError,
};

/// Produced on the worker thread, consumed exactly once on the UI thread,
/// then discarded. Payloads are never mutated after enqueue.
#[derive(Debug)]
pub enum UiEvent {
    /// Session established; carries the permission-filtered directory
    /// snapshot the guild and channel lists are seeded from.
    Ready(Vec<GuildEntry>),
    /// A transcript line, either live traffic or a history fetch result.
    /// Filtered against the current selection at delivery time.
    Message(MessagePayload),
    /// History access denied for one channel. Connection state is unaffected.
    HistoryForbidden(ChannelId),
    SendFailed {
        channel_id: ChannelId,
        text: String,
        reason: String,
    },
    Notice(String),
    /// The session is dead. The UI tears the bridge down and returns to the
    /// login view.
    Fatal(ClientError),
}

/// Status-line wording for session-terminating failures.
pub fn describe_fatal(err: &ClientError) -> String {
    match err {
        ClientError::Authentication(reason) => {
            format!("Login failed: {reason}. Check the bot token and connect again.")
        }
        ClientError::Network(reason) => {
            format!("Server unreachable: {reason}. Check the network and connect again.")
        }
        ClientError::Connection(reason) => format!("Connection lost: {reason}."),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_descriptions_tell_the_user_what_to_do() {
        let auth = describe_fatal(&ClientError::Authentication("401".into()));
        assert!(auth.contains("bot token"));

        let net = describe_fatal(&ClientError::Network("connection refused".into()));
        assert!(net.contains("connection refused"));
        assert!(net.contains("connect again"));

        let lost = describe_fatal(&ClientError::Connection("socket closed".into()));
        assert!(lost.contains("socket closed"));
    }
}
