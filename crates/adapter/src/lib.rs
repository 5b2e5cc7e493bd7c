//! Adapter module - remote control over TCP with a JSON protocol
//!
//! Lets an external program play the game: it sends commands and receives
//! observations of the session.
//!
//! # Protocol Overview
//!
//! The adapter speaks a **line-delimited JSON protocol** over TCP:
//!
//! 1. **Connection**: Client connects (default: 127.0.0.1:7777)
//! 2. **Handshake**: Client sends `hello`, server responds with `welcome`
//! 3. **Controller Assignment**: First client to say hello becomes the controller;
//!    the role is released when it disconnects
//! 4. **Observation Streaming**: Clients receive an `observation` whenever
//!    the visible state changes
//! 5. **Commanding**: The controller sends `command` messages; each is
//!    acknowledged after the game loop has applied it
//!
//! Errors carry one of the codes `handshake_required`, `protocol_mismatch`,
//! `not_controller`, `invalid_command`, `backpressure`.
//!
//! # Environment Variables
//!
//! - `BLOCKFALL_REMOTE_HOST`: Bind address (default: "127.0.0.1")
//! - `BLOCKFALL_REMOTE_PORT`: Port number (default: 7777)
//! - `BLOCKFALL_REMOTE_MAX_PENDING`: Inbound command queue size (default: 10)
//! - `BLOCKFALL_REMOTE_LOG_PATH`: Append every wire line to this JSONL file
//! - `BLOCKFALL_REMOTE_DISABLED`: Set to "1" or "true" to disable the adapter
//!
//! # Example Protocol Flow
//!
//! ```text
//! Client -> Server: {"type":"hello","seq":1,"ts":1,"client":{"name":"bot"},"protocol_version":"1.0.0"}
//! Server -> Client: {"type":"welcome","seq":1,"ts":2,"protocol_version":"1.0.0","game_id":"blockfall","client_id":1,"role":"controller","controller_id":1,"board":{"width":12,"height":20}}
//! Server -> Client: {"type":"observation","seq":1,"ts":3,"phase":"not_started",...}
//! Client -> Server: {"type":"command","seq":2,"ts":4,"actions":["start","moveLeft","rotateCw"]}
//! Server -> Client: {"type":"ack","seq":2,"ts":5,"status":"ok"}
//! ```

pub mod protocol;
pub mod runtime;
pub mod server;

pub use blockfall_core as core;
pub use blockfall_types as types;

pub use protocol::*;
pub use runtime::{Adapter, InboundCommand, InboundPayload, OutboundMessage};
pub use server::{build_observation, run_server, state_hash, ServerConfig};
