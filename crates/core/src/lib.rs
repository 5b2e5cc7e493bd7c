//! Core game logic module - pure, deterministic, and testable
//!
//! This crate contains the game rules, the session state machine and the
//! tick loop driver. It has no dependencies on terminals, networking, or
//! other I/O, making it:
//!
//! - **Deterministic**: Same seed produces identical piece sequences
//! - **Testable**: The loop runs against a virtual clock
//! - **Portable**: Can run in any environment (terminal, headless, remote)
//!
//! # Module Structure
//!
//! - [`board`]: Playfield grid, row clearing and piece merging
//! - [`collision`]: Shape-vs-playfield overlap test
//! - [`config`]: Tunables and their validation
//! - [`driver`]: Scheduler abstraction and the game loop driver
//! - [`game_state`]: Session state, player controller and lifecycle
//! - [`pieces`]: The seven shapes and grid rotation
//! - [`rng`]: Seeded piece selection
//! - [`scoring`]: Sweep engine with the doubling row multiplier
//! - [`snapshot`]: Read-only view handed to renderers
//!
//! # Game Rules
//!
//! - **Spawn**: Pieces appear centered in the top row; a spawn that overlaps
//!   the stack ends the game
//! - **Rotation**: Plain grid rotation followed by a horizontal kick search
//! - **Gravity**: One row per interval (1000ms by default)
//! - **Scoring**: Each row cleared in a sweep is worth twice the previous one
//!
//! # Example
//!
//! ```
//! use blockfall_core::{GameConfig, GameState};
//! use blockfall_types::GameAction;
//!
//! let mut game = GameState::new(GameConfig::default()).unwrap();
//! game.start();
//!
//! game.apply_action(GameAction::MoveRight);
//! game.apply_action(GameAction::RotateCw);
//! game.apply_action(GameAction::SoftDrop);
//!
//! assert_eq!(game.score(), 0);
//! ```
//!
//! # Timing
//!
//! Call [`GameState::tick`](game_state::GameState::tick) with elapsed time,
//! or let a [`GameDriver`](driver::GameDriver) do it from a [`Scheduler`].

pub mod board;
pub mod collision;
pub mod config;
pub mod driver;
pub mod game_state;
pub mod pieces;
pub mod rng;
pub mod scoring;
pub mod snapshot;

pub use blockfall_types as types;

// Re-export commonly used types for convenience
pub use board::Board;
pub use collision::{collides, Position};
pub use config::{parse_piece_set, ConfigError, GameConfig};
pub use driver::{FrameScheduler, GameDriver, GameObserver, NullObserver, Scheduler};
pub use game_state::{ActivePiece, DropOutcome, GameState};
pub use pieces::{create_piece, Shape};
pub use rng::{PieceRng, SimpleRng};
pub use scoring::{sweep, sweep_score, SweepResult};
pub use snapshot::{ActiveSnapshot, GameSnapshot};
