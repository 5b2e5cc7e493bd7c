//! Terminal input module.
//!
//! Maps `crossterm` key events into [`crate::types::GameAction`]. Key repeat
//! is treated as a fresh press, so holding a key keeps the piece moving at the
//! terminal's repeat rate.

pub mod map;

pub use blockfall_types as types;

pub use map::{handle_key_event, should_quit};
