//! Cross-thread bridge between the egui loop and the chat worker thread.

pub mod commands;
pub mod worker;


pub use worker::BridgeHandle;
