//! Terminal "game renderer" module.
//!
//! A small rendering layer for terminal play. It renders into a plain
//! framebuffer that is diffed and flushed through crossterm, with two
//! terminal columns per board cell.
//!
//! [`TerminalFrontend`] plugs the whole pipeline into the core driver as its
//! renderer and score display.

pub mod fb;
pub mod frontend;
pub mod game_view;
pub mod renderer;

pub use blockfall_core as core;
pub use blockfall_types as types;

pub use fb::{Cell, CellStyle, FrameBuffer, Rgb};
pub use frontend::TerminalFrontend;
pub use game_view::{AnchorY, GameView, Viewport};
pub use renderer::{encode_frame_into, TerminalRenderer};
