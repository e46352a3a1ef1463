//! Controller layer: inbound UI events, selection state machine, and
//! outbound command orchestration.

pub mod events;
pub mod orchestration;
pub mod selection;
