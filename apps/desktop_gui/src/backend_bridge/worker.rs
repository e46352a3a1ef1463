//! Worker thread hosting the chat client's cooperative loop.
//!
//! One OS thread per session: spawned on connect, gone on disconnect. The
//! only way in is the bounded command queue, the only way out is the bounded
//! event queue. Both sides enqueue with `try_send` and never block on the
//! other loop. Queues are created per session, so anything a dead worker
//! left behind is dropped unobserved and the next session starts from a
//! fresh ready event.

use std::{panic::AssertUnwindSafe, sync::Arc, thread};

use bot_client::{BotClient, ChatGateway, ClientEvent, Credentials, DEFAULT_HISTORY_LIMIT};
use crossbeam_channel::{bounded, Receiver, Sender};
use shared::error::ClientError;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::events::UiEvent;

const CMD_QUEUE_DEPTH: usize = 256;
const EVENT_QUEUE_DEPTH: usize = 2048;

/// The UI thread's end of a session bridge. Dropping it closes the command
/// queue, which is the shutdown signal for the worker; the UI never joins
/// the thread.
pub struct BridgeHandle {
    pub cmd_tx: Sender<BackendCommand>,
    pub ui_rx: Receiver<UiEvent>,
}

pub fn spawn(gateway: Arc<dyn ChatGateway>, credentials: Credentials) -> BridgeHandle {
    let (cmd_tx, cmd_rx) = bounded::<BackendCommand>(CMD_QUEUE_DEPTH);
    let (ui_tx, ui_rx) = bounded::<UiEvent>(EVENT_QUEUE_DEPTH);

    let panic_tx = ui_tx.clone();
    let spawned = thread::Builder::new().name("chat-worker".into()).spawn(move || {
        // Whatever happens on this thread, the UI hears about it as an
        // event; panics must not vanish with the thread.
        let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| {
            run_session(gateway, credentials, cmd_rx, ui_tx.clone());
        }));
        if outcome.is_err() {
            error!("chat worker panicked");
            let _ = ui_tx.try_send(UiEvent::Fatal(ClientError::Connection(
                "chat worker crashed".into(),
            )));
        }
    });
    if let Err(err) = spawned {
        let _ = panic_tx.try_send(UiEvent::Fatal(ClientError::Connection(format!(
            "failed to start chat worker: {err}"
        ))));
    }

    BridgeHandle { cmd_tx, ui_rx }
}

fn run_session(
    gateway: Arc<dyn ChatGateway>,
    credentials: Credentials,
    cmd_rx: Receiver<BackendCommand>,
    ui_tx: Sender<UiEvent>,
) {
    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            error!("failed to build worker runtime: {err}");
            let _ = ui_tx.try_send(UiEvent::Fatal(ClientError::Connection(format!(
                "failed to build worker runtime: {err}"
            ))));
            return;
        }
    };

    runtime.block_on(async move {
        let client = BotClient::new(gateway);
        // Subscribe before connecting so nothing emitted during the
        // handshake is missed.
        let mut events = client.subscribe_events();

        let entries = match client.connect(&credentials).await {
            Ok(entries) => entries,
            Err(err) => {
                error!("connect failed: {err}");
                let _ = ui_tx.try_send(UiEvent::Fatal(err));
                return;
            }
        };
        drop(credentials);
        info!(guilds = entries.len(), "session ready");
        let _ = ui_tx.try_send(UiEvent::Ready(entries));

        let forwarder = {
            let ui_tx = ui_tx.clone();
            tokio::spawn(async move {
                loop {
                    match events.recv().await {
                        Ok(ClientEvent::MessageReceived(message)) => {
                            let _ = ui_tx.try_send(UiEvent::Message(message));
                        }
                        Ok(ClientEvent::ConnectionClosed(reason)) => {
                            let _ = ui_tx
                                .try_send(UiEvent::Fatal(ClientError::Connection(reason)));
                            break;
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!(skipped, "inbound event stream lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
            })
        };

        while let Ok(cmd) = cmd_rx.recv() {
            match cmd {
                BackendCommand::FetchHistory { channel } => {
                    info!(channel_id = channel.channel_id.0, "backend: fetch_history");
                    // Fetches run as their own task so a slow page never
                    // stalls live traffic or later commands. There is no
                    // cancellation: results superseded by a channel switch
                    // are filtered on the UI side at delivery time.
                    let client = client.clone();
                    let ui_tx = ui_tx.clone();
                    tokio::spawn(async move {
                        match client
                            .fetch_history(channel.channel_id, DEFAULT_HISTORY_LIMIT)
                            .await
                        {
                            Ok(lines) => {
                                for line in lines {
                                    let _ = ui_tx.try_send(UiEvent::Message(line));
                                }
                            }
                            Err(ClientError::Permission(channel_id)) => {
                                let _ = ui_tx.try_send(UiEvent::HistoryForbidden(channel_id));
                            }
                            Err(err) => {
                                error!(channel_id = channel.channel_id.0, "backend: fetch_history failed: {err}");
                                let _ = ui_tx.try_send(UiEvent::Notice(format!(
                                    "History unavailable for #{}: {err}",
                                    channel.name
                                )));
                            }
                        }
                    });
                }
                BackendCommand::SendMessage { channel_id, text } => {
                    info!(channel_id = channel_id.0, text_len = text.len(), "backend: send_message");
                    if let Err(err) = client.send(channel_id, &text).await {
                        error!("backend: send_message failed: {err}");
                        match err {
                            ClientError::Send {
                                channel_id,
                                text,
                                reason,
                            } => {
                                let _ = ui_tx.try_send(UiEvent::SendFailed {
                                    channel_id,
                                    text,
                                    reason,
                                });
                            }
                            other => {
                                let _ = ui_tx.try_send(UiEvent::Notice(other.to_string()));
                            }
                        }
                    }
                }
            }
        }

        // The UI dropped its handle; tear the session down best-effort.
        info!("command queue closed, stopping chat worker");
        forwarder.abort();
        client.disconnect().await;
    });
}
