use std::{sync::Arc, time::Duration};

use bot_client::{ChatGateway, Credentials};
use chrono::{DateTime, Local, Utc};
use eframe::egui;
use serde::{Deserialize, Serialize};

use crate::backend_bridge::commands::BackendCommand;
use crate::backend_bridge::{worker, BridgeHandle};
use crate::controller::events::{describe_fatal, UiEvent};
use crate::controller::orchestration::dispatch_backend_command;
use crate::controller::selection::Selection;
use shared::domain::{ChannelSummary, GuildEntry};

const SETTINGS_STORAGE_KEY: &str = "desktop_gui.settings";

/// Produces the protocol client a new session connects through. The real
/// gateway comes from an external library; the binary decides which one to
/// plug in.
pub type GatewayFactory = Arc<dyn Fn() -> Arc<dyn ChatGateway> + Send + Sync>;

#[derive(Debug, Clone, Default)]
pub struct StartupConfig {
    pub presence: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct PersistedDeckSettings {
    presence: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AppViewState {
    Login,
    Main,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum TranscriptLine {
    Message {
        author: String,
        text: String,
        timestamp: DateTime<Utc>,
    },
    Notice(String),
}

pub struct DeckApp {
    gateway_factory: GatewayFactory,
    bridge: Option<BridgeHandle>,

    view_state: AppViewState,
    token_input: String,
    presence_input: String,

    guilds: Vec<GuildEntry>,
    channels: Vec<ChannelSummary>,
    selection: Selection,
    transcript: Vec<TranscriptLine>,
    composer: String,

    status: String,
    error_banner: Option<String>,
}

impl DeckApp {
    pub fn bootstrap(
        gateway_factory: GatewayFactory,
        startup: StartupConfig,
        cc: &eframe::CreationContext<'_>,
    ) -> Self {
        let persisted = cc.storage.and_then(|storage| {
            storage
                .get_string(SETTINGS_STORAGE_KEY)
                .and_then(|text| serde_json::from_str::<PersistedDeckSettings>(&text).ok())
        });
        Self::new(gateway_factory, startup, persisted)
    }

    fn new(
        gateway_factory: GatewayFactory,
        startup: StartupConfig,
        persisted: Option<PersistedDeckSettings>,
    ) -> Self {
        let presence_input = startup
            .presence
            .or_else(|| persisted.map(|settings| settings.presence))
            .unwrap_or_default();
        Self {
            gateway_factory,
            bridge: None,
            view_state: AppViewState::Login,
            token_input: String::new(),
            presence_input,
            guilds: Vec::new(),
            channels: Vec::new(),
            selection: Selection::default(),
            transcript: Vec::new(),
            composer: String::new(),
            status: "Not connected".to_string(),
            error_banner: None,
        }
    }

    fn dispatch(&mut self, cmd: BackendCommand) {
        if let Some(bridge) = &self.bridge {
            dispatch_backend_command(&bridge.cmd_tx, cmd, &mut self.status);
        }
    }

    /// Drain everything the worker queued since the previous frame. Events
    /// are handled one at a time on this thread only.
    fn process_ui_events(&mut self) {
        loop {
            let event = match &self.bridge {
                Some(bridge) => match bridge.ui_rx.try_recv() {
                    Ok(event) => event,
                    Err(_) => break,
                },
                None => break,
            };
            self.handle_event(event);
        }
    }

    fn handle_event(&mut self, event: UiEvent) {
        match event {
            UiEvent::Ready(entries) => {
                self.selection.connected();
                self.status = format!("Connected: {} guilds", entries.len());
                self.error_banner = None;
                self.guilds = entries;
                self.channels.clear();
                self.transcript.clear();
                self.view_state = AppViewState::Main;
            }
            UiEvent::Message(payload) => {
                if self.selection.accepts(payload.channel_id) {
                    self.transcript.push(TranscriptLine::Message {
                        author: payload.author,
                        text: payload.text,
                        timestamp: payload.timestamp,
                    });
                }
            }
            UiEvent::HistoryForbidden(channel_id) => {
                if self.selection.accepts(channel_id) {
                    self.transcript.push(TranscriptLine::Notice(
                        "Cannot read message history in this channel.".to_string(),
                    ));
                }
            }
            UiEvent::SendFailed { text, reason, .. } => {
                self.status = format!("Send failed ({reason}): \"{text}\"");
            }
            UiEvent::Notice(message) => {
                self.status = message;
            }
            UiEvent::Fatal(err) => {
                tracing::error!("session terminated: {err}");
                self.error_banner = Some(describe_fatal(&err));
                self.teardown_session("Disconnected");
            }
        }
    }

    /// Drop the bridge and return to the login view. Never waits on the
    /// worker thread; closing the command queue is the stop signal.
    fn teardown_session(&mut self, status: &str) {
        self.bridge = None;
        self.selection.disconnected();
        self.guilds.clear();
        self.channels.clear();
        self.transcript.clear();
        self.view_state = AppViewState::Login;
        self.status = status.to_string();
    }

    fn on_connect_clicked(&mut self) {
        let presence = {
            let text = self.presence_input.trim();
            (!text.is_empty()).then(|| text.to_string())
        };
        match Credentials::new(self.token_input.trim(), presence) {
            Ok(credentials) => {
                self.error_banner = None;
                self.status = "Connecting...".to_string();
                self.bridge = Some(worker::spawn((self.gateway_factory)(), credentials));
            }
            Err(err) => {
                tracing::warn!("connect rejected before spawn: {err}");
                self.error_banner = Some("Bot token missing. Enter a token to connect.".into());
            }
        }
    }

    fn on_guild_selected(&mut self, index: usize) {
        let Some(entry) = self.guilds.get(index) else {
            return;
        };
        let channels = entry.channels.clone();
        if self.selection.pick_guild(index) {
            self.channels = channels;
            self.transcript.clear();
        }
    }

    fn on_channel_selected(&mut self, index: usize) {
        let Some(channel) = self.channels.get(index).cloned() else {
            return;
        };
        if let Some(target) = self.selection.pick_channel(channel) {
            // Clear before the new history arrives so stale and fresh
            // content never mix; late lines for the old channel are dropped
            // by the delivery-time filter.
            self.transcript.clear();
            self.dispatch(BackendCommand::FetchHistory { channel: target });
        }
    }

    fn on_send_clicked(&mut self) {
        let text = self.composer.trim().to_string();
        if text.is_empty() {
            return;
        }
        let Some(channel_id) = self.selection.current_channel() else {
            self.status = "Select a channel first".to_string();
            return;
        };
        self.dispatch(BackendCommand::SendMessage { channel_id, text });
        self.composer.clear();
    }

    fn login_view(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                ui.add_space(80.0);
                ui.heading("Botdeck");
                ui.label("Operate a bot account through a desktop shell");
                ui.add_space(20.0);

                ui.add(
                    egui::TextEdit::singleline(&mut self.token_input)
                        .password(true)
                        .hint_text("Bot token")
                        .desired_width(320.0),
                );
                ui.add_space(6.0);
                ui.add(
                    egui::TextEdit::singleline(&mut self.presence_input)
                        .hint_text("Presence (optional)")
                        .desired_width(320.0),
                );
                ui.add_space(12.0);
                if ui.button("Connect").clicked() {
                    self.on_connect_clicked();
                }

                if let Some(banner) = &self.error_banner {
                    ui.add_space(12.0);
                    ui.colored_label(egui::Color32::LIGHT_RED, banner);
                }
                ui.add_space(8.0);
                ui.weak(&self.status);
            });
        });
    }

    fn main_view(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("status_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(&self.status);
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.button("Disconnect").clicked() {
                        self.teardown_session("Not connected");
                    }
                });
            });
        });

        egui::SidePanel::left("guild_rail")
            .resizable(false)
            .default_width(140.0)
            .show(ctx, |ui| {
                ui.heading("Guilds");
                let mut picked = None;
                for (index, entry) in self.guilds.iter().enumerate() {
                    let selected = self.selection.guild_index() == Some(index);
                    if ui.selectable_label(selected, &entry.guild.name).clicked() {
                        picked = Some(index);
                    }
                }
                if let Some(index) = picked {
                    self.on_guild_selected(index);
                }
            });

        egui::SidePanel::left("channel_list")
            .resizable(true)
            .default_width(180.0)
            .show(ctx, |ui| {
                ui.heading("Channels");
                let mut picked = None;
                for (index, channel) in self.channels.iter().enumerate() {
                    let selected = self.selection.current_channel() == Some(channel.channel_id);
                    if ui
                        .selectable_label(selected, format!("#{}", channel.name))
                        .clicked()
                    {
                        picked = Some(index);
                    }
                }
                if let Some(index) = picked {
                    self.on_channel_selected(index);
                }
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            let composer_height = 32.0;
            egui::ScrollArea::vertical()
                .stick_to_bottom(true)
                .max_height(ui.available_height() - composer_height)
                .show(ui, |ui| {
                    for line in &self.transcript {
                        match line {
                            TranscriptLine::Message {
                                author,
                                text,
                                timestamp,
                            } => {
                                ui.horizontal_wrapped(|ui| {
                                    ui.weak(
                                        timestamp
                                            .with_timezone(&Local)
                                            .format("%H:%M")
                                            .to_string(),
                                    );
                                    ui.strong(author);
                                    ui.label(text);
                                });
                            }
                            TranscriptLine::Notice(text) => {
                                ui.weak(format!("[system] {text}"));
                            }
                        }
                    }
                });

            let response = ui.add(
                egui::TextEdit::singleline(&mut self.composer)
                    .hint_text("Message")
                    .desired_width(f32::INFINITY),
            );
            if response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                self.on_send_clicked();
                response.request_focus();
            }
        });
    }
}

impl eframe::App for DeckApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.process_ui_events();
        match self.view_state {
            AppViewState::Login => self.login_view(ctx),
            AppViewState::Main => self.main_view(ctx),
        }
        // Keep draining queued events even when no input arrives.
        ctx.request_repaint_after(Duration::from_millis(100));
    }

    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        let settings = PersistedDeckSettings {
            presence: self.presence_input.clone(),
        };
        if let Ok(serialized) = serde_json::to_string(&settings) {
            storage.set_string(SETTINGS_STORAGE_KEY, serialized);
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use crossbeam_channel::{bounded, Receiver, Sender};
    use shared::{
        domain::{ChannelId, GuildId, GuildSummary, MessagePayload},
        error::ClientError,
    };

    use super::*;

    fn entry(guild_id: u64, name: &str, channels: &[(u64, &str)]) -> GuildEntry {
        GuildEntry {
            guild: GuildSummary {
                guild_id: GuildId(guild_id),
                name: name.into(),
            },
            channels: channels
                .iter()
                .map(|(id, name)| ChannelSummary {
                    channel_id: ChannelId(*id),
                    guild_id: GuildId(guild_id),
                    name: (*name).to_string(),
                })
                .collect(),
        }
    }

    fn message(channel_id: u64, text: &str) -> MessagePayload {
        MessagePayload {
            channel_id: ChannelId(channel_id),
            author: "tester".into(),
            text: text.into(),
            timestamp: Utc::now(),
        }
    }

    fn app_without_session() -> DeckApp {
        let factory: GatewayFactory = Arc::new(|| panic!("no session may be spawned"));
        DeckApp::new(factory, StartupConfig::default(), None)
    }

    /// App with an injected bridge so tests stand in for the worker thread.
    fn app_with_session() -> (DeckApp, Sender<UiEvent>, Receiver<BackendCommand>) {
        let mut app = app_without_session();
        let (cmd_tx, cmd_rx) = bounded(256);
        let (ui_tx, ui_rx) = bounded(2048);
        app.bridge = Some(BridgeHandle { cmd_tx, ui_rx });
        (app, ui_tx, cmd_rx)
    }

    fn connected_app() -> (DeckApp, Sender<UiEvent>, Receiver<BackendCommand>) {
        let (mut app, ui_tx, cmd_rx) = app_with_session();
        ui_tx
            .send(UiEvent::Ready(vec![
                entry(1, "g1", &[(11, "general"), (12, "random")]),
                entry(2, "g2", &[(21, "ops")]),
            ]))
            .unwrap();
        app.process_ui_events();
        (app, ui_tx, cmd_rx)
    }

    #[test]
    fn empty_token_shows_a_notice_and_spawns_nothing() {
        let mut app = app_without_session();
        app.token_input = "   ".into();

        app.on_connect_clicked();

        assert!(app.bridge.is_none());
        let banner = app.error_banner.expect("missing banner");
        assert!(banner.contains("token"));
    }

    #[test]
    fn ready_populates_the_guild_list_in_order() {
        let (app, _ui_tx, _cmd_rx) = connected_app();

        assert_eq!(app.view_state, AppViewState::Main);
        let names: Vec<&str> = app.guilds.iter().map(|e| e.guild.name.as_str()).collect();
        assert_eq!(names, ["g1", "g2"]);
    }

    #[test]
    fn guild_selection_alone_issues_no_history_fetch() {
        let (mut app, _ui_tx, cmd_rx) = connected_app();

        app.on_guild_selected(1);

        assert_eq!(app.selection.guild_index(), Some(1));
        let names: Vec<&str> = app.channels.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["ops"]);
        assert!(cmd_rx.try_recv().is_err(), "no command may be queued yet");
    }

    #[test]
    fn channel_pick_clears_the_transcript_and_fetches_exactly_once() {
        let (mut app, _ui_tx, cmd_rx) = connected_app();
        app.on_guild_selected(0);
        app.transcript.push(TranscriptLine::Notice("stale".into()));

        app.on_channel_selected(0);

        assert!(app.transcript.is_empty());
        match cmd_rx.try_recv().unwrap() {
            BackendCommand::FetchHistory { channel } => {
                assert_eq!(channel.channel_id, ChannelId(11));
            }
            BackendCommand::SendMessage { .. } => panic!("unexpected send"),
        }
        assert!(cmd_rx.try_recv().is_err(), "exactly one fetch per pick");
    }

    #[test]
    fn one_send_click_enqueues_exactly_one_send_command() {
        let (mut app, _ui_tx, cmd_rx) = connected_app();
        app.on_guild_selected(0);
        app.on_channel_selected(0);
        let _ = cmd_rx.try_recv(); // the history fetch

        app.composer = "  hello world  ".into();
        app.on_send_clicked();

        match cmd_rx.try_recv().unwrap() {
            BackendCommand::SendMessage { channel_id, text } => {
                assert_eq!(channel_id, ChannelId(11));
                assert_eq!(text, "hello world");
            }
            BackendCommand::FetchHistory { .. } => panic!("unexpected fetch"),
        }
        assert!(cmd_rx.try_recv().is_err());
        assert!(app.composer.is_empty());

        // An empty composer never produces a command.
        app.on_send_clicked();
        assert!(cmd_rx.try_recv().is_err());
    }

    #[test]
    fn late_history_for_a_superseded_channel_is_discarded() {
        let (mut app, ui_tx, cmd_rx) = connected_app();
        app.on_guild_selected(0);
        app.on_channel_selected(0); // channel 11
        app.on_channel_selected(1); // switch to channel 12 while 11 is in flight
        while cmd_rx.try_recv().is_ok() {}

        ui_tx.send(UiEvent::Message(message(11, "stale line"))).unwrap();
        ui_tx.send(UiEvent::Message(message(12, "fresh line"))).unwrap();
        app.process_ui_events();

        assert_eq!(app.transcript.len(), 1);
        match &app.transcript[0] {
            TranscriptLine::Message { text, .. } => assert_eq!(text, "fresh line"),
            TranscriptLine::Notice(notice) => panic!("unexpected notice {notice:?}"),
        }
    }

    #[test]
    fn history_forbidden_adds_one_notice_and_keeps_the_selection() {
        let (mut app, ui_tx, _cmd_rx) = connected_app();
        app.on_guild_selected(0);
        app.on_channel_selected(0);

        ui_tx.send(UiEvent::HistoryForbidden(ChannelId(11))).unwrap();
        app.process_ui_events();

        assert_eq!(
            app.transcript,
            vec![TranscriptLine::Notice(
                "Cannot read message history in this channel.".into()
            )]
        );
        assert_eq!(app.selection.current_channel(), Some(ChannelId(11)));
        assert_eq!(app.view_state, AppViewState::Main);
    }

    #[test]
    fn forbidden_notice_for_a_superseded_channel_is_dropped_too() {
        let (mut app, ui_tx, _cmd_rx) = connected_app();
        app.on_guild_selected(0);
        app.on_channel_selected(0);
        app.on_channel_selected(1);

        ui_tx.send(UiEvent::HistoryForbidden(ChannelId(11))).unwrap();
        app.process_ui_events();

        assert!(app.transcript.is_empty());
    }

    #[test]
    fn send_failure_names_the_failed_text() {
        let (mut app, ui_tx, _cmd_rx) = connected_app();

        ui_tx
            .send(UiEvent::SendFailed {
                channel_id: ChannelId(11),
                text: "lost message".into(),
                reason: "socket closed".into(),
            })
            .unwrap();
        app.process_ui_events();

        assert!(app.status.contains("lost message"));
        assert!(app.status.contains("socket closed"));
    }

    #[test]
    fn fatal_tears_the_session_down_and_returns_to_login() {
        let (mut app, ui_tx, _cmd_rx) = connected_app();
        app.on_guild_selected(0);
        app.on_channel_selected(0);

        ui_tx
            .send(UiEvent::Fatal(ClientError::Connection("gateway died".into())))
            .unwrap();
        app.process_ui_events();

        assert!(app.bridge.is_none());
        assert_eq!(app.view_state, AppViewState::Login);
        assert_eq!(app.selection, Selection::Disconnected);
        assert!(app.transcript.is_empty());
        assert!(app.error_banner.unwrap().contains("gateway died"));
    }

    #[test]
    fn a_fresh_ready_resets_directory_state() {
        let (mut app, ui_tx, _cmd_rx) = connected_app();
        app.on_guild_selected(0);
        app.on_channel_selected(0);
        app.transcript.push(TranscriptLine::Notice("old".into()));

        ui_tx
            .send(UiEvent::Ready(vec![entry(3, "fresh", &[(31, "start")])]))
            .unwrap();
        app.process_ui_events();

        assert_eq!(app.guilds.len(), 1);
        assert!(app.channels.is_empty());
        assert!(app.transcript.is_empty());
        assert_eq!(app.selection, Selection::Connected);
    }
}
