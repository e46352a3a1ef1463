use std::sync::Arc;

mod backend_bridge;
mod controller;
mod ui;

use bot_client::{ChatGateway, LoopbackGateway};
use clap::Parser;
use eframe::egui;

use crate::ui::{DeckApp, GatewayFactory, StartupConfig};

/// Desktop shell for operating a bot account on a guild/channel chat
/// service.
#[derive(Debug, Parser)]
#[command(name = "botdeck", version)]
struct Args {
    /// Presence string pre-filled in the login view.
    #[arg(long)]
    presence: Option<String>,

    /// Log filter, e.g. "info" or "desktop_gui=debug". RUST_LOG wins when
    /// set.
    #[arg(long, default_value = "info")]
    log_filter: String,
}

fn main() -> eframe::Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(args.log_filter.clone())),
        )
        .init();

    // The protocol client is external; this binary wires in the in-process
    // loopback backend. Swapping in a real gateway happens at this seam.
    let gateway_factory: GatewayFactory =
        Arc::new(|| Arc::new(LoopbackGateway::seeded()) as Arc<dyn ChatGateway>);
    let startup = StartupConfig {
        presence: args.presence,
    };

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Botdeck")
            .with_inner_size([1000.0, 600.0])
            .with_min_inner_size([760.0, 480.0]),
        ..Default::default()
    };
    eframe::run_native(
        "Botdeck",
        options,
        Box::new(move |cc| Ok(Box::new(DeckApp::bootstrap(gateway_factory, startup, cc)))),
    )
}
