//! Command orchestration from UI intents to the worker's command queue.

use crossbeam_channel::{Sender, TrySendError};

use crate::backend_bridge::commands::BackendCommand;

/// Enqueue a command without ever blocking the UI thread. A full or
/// disconnected queue is reported through the status line; the command is
/// dropped, never retried implicitly.
pub fn dispatch_backend_command(
    cmd_tx: &Sender<BackendCommand>,
    cmd: BackendCommand,
    status: &mut String,
) {
    let cmd_name = match &cmd {
        BackendCommand::FetchHistory { .. } => "fetch_history",
        BackendCommand::SendMessage { .. } => "send_message",
    };

    match cmd_tx.try_send(cmd) {
        Ok(()) => tracing::debug!(command = cmd_name, "queued ui->backend command"),
        Err(TrySendError::Full(_)) => {
            *status = "Command queue is full; please retry".to_string();
        }
        Err(TrySendError::Disconnected(_)) => {
            *status = "Chat worker is gone; reconnect to continue".to_string();
        }
    }
}
