//! UI layer: the app shell that owns all widget state on the UI thread.

pub mod app;

pub use app::{DeckApp, GatewayFactory, StartupConfig};
