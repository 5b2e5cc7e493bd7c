//! Game state module - the session state machine
//!
//! `GameState` owns the board, the active piece, the score and the phase.
//! It implements the player controller (spawn, move, rotate, drop, lock) and
//! the lifecycle transitions. Nothing here returns an error: a blocked move
//! is simply rejected and a blocked spawn ends the game.

use crate::collision::{collides, Position};
use crate::config::{ConfigError, GameConfig};
use crate::pieces::{create_piece, Shape};
use crate::rng::PieceRng;
use crate::scoring::sweep;
use crate::snapshot::{ActiveSnapshot, GameSnapshot};
use crate::types::*;
use crate::Board;

/// The falling piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActivePiece {
    pub kind: PieceKind,
    pub shape: Shape,
    pub pos: Position,
}

impl ActivePiece {
    /// A fresh piece of `kind`, horizontally centred in the top row.
    pub fn spawn(kind: PieceKind, board_width: u8) -> Self {
        let shape = create_piece(kind);
        let x = (board_width / 2) as i16 - (shape.size() / 2) as i16;
        Self {
            kind,
            shape,
            pos: Position::new(x, 0),
        }
    }

    pub fn collides(&self, board: &Board) -> bool {
        collides(board, &self.shape, self.pos)
    }
}

/// Result of a one-row drop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropOutcome {
    /// Not running or no active piece
    Ignored,
    /// The piece moved down one row
    Moved,
    /// The piece could not descend and was locked
    Locked(LockEvent),
}

/// Complete session state
#[derive(Debug, Clone)]
pub struct GameState {
    config: GameConfig,
    board: Board,
    active: Option<ActivePiece>,
    rng: PieceRng,
    forced_next: Option<PieceKind>,
    phase: GamePhase,
    score: u32,
    /// Time accumulated toward the next gravity drop.
    drop_counter_ms: u32,
    /// Last lock event (consumed by observers).
    last_event: Option<LockEvent>,
    /// Monotonic episode id (increments on restart).
    episode_id: u32,
    /// Monotonic id of spawned pieces.
    piece_id: u32,
}

impl GameState {
    /// Create a session in the `NotStarted` phase.
    pub fn new(config: GameConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let board = Board::new(config.width, config.height)?;
        let rng = PieceRng::new(config.seed);

        Ok(Self {
            config,
            board,
            active: None,
            rng,
            forced_next: None,
            phase: GamePhase::NotStarted,
            score: 0,
            drop_counter_ms: 0,
            last_event: None,
            episode_id: 0,
            piece_id: 0,
        })
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn palette(&self) -> &Palette {
        &self.config.palette
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Mutable board access for fixtures and puzzle setups.
    pub fn board_mut(&mut self) -> &mut Board {
        &mut self.board
    }

    pub fn active(&self) -> Option<ActivePiece> {
        self.active
    }

    pub fn drop_counter_ms(&self) -> u32 {
        self.drop_counter_ms
    }

    pub fn episode_id(&self) -> u32 {
        self.episode_id
    }

    pub fn piece_id(&self) -> u32 {
        self.piece_id
    }

    /// Make the next spawn use `kind` instead of a random pick.
    pub fn force_next(&mut self, kind: PieceKind) {
        self.forced_next = Some(kind);
    }

    /// Take and clear the last lock event.
    pub fn take_last_event(&mut self) -> Option<LockEvent> {
        self.last_event.take()
    }

    pub fn snapshot_into(&self, out: &mut GameSnapshot) {
        out.width = self.board.width();
        out.height = self.board.height();
        out.board.clear();
        out.board.extend_from_slice(self.board.cells());
        out.active = self.active.map(ActiveSnapshot::from);
        out.score = self.score;
        out.phase = self.phase;
        out.episode_id = self.episode_id;
        out.piece_id = self.piece_id;
    }

    pub fn snapshot(&self) -> GameSnapshot {
        let mut s = GameSnapshot::default();
        self.snapshot_into(&mut s);
        s
    }

    // ----- lifecycle -----

    /// `NotStarted -> Running`, spawning the first piece.
    pub fn start(&mut self) -> bool {
        if self.phase != GamePhase::NotStarted {
            return false;
        }
        self.phase = GamePhase::Running;
        self.drop_counter_ms = 0;
        if self.active.is_none() {
            self.spawn();
        }
        true
    }

    /// `Running <-> Paused`. No effect in other phases.
    pub fn toggle_pause(&mut self) -> bool {
        match self.phase {
            GamePhase::Running => {
                self.phase = GamePhase::Paused;
                true
            }
            GamePhase::Paused => {
                self.phase = GamePhase::Running;
                true
            }
            GamePhase::NotStarted | GamePhase::GameOver => false,
        }
    }

    /// Clear the board and score, spawn a new piece and enter `Running`.
    pub fn restart(&mut self) -> bool {
        self.board.clear();
        self.active = None;
        self.score = 0;
        self.drop_counter_ms = 0;
        self.last_event = None;
        if self.phase != GamePhase::NotStarted {
            self.episode_id = self.episode_id.wrapping_add(1);
        }
        self.phase = GamePhase::Running;
        self.spawn();
        true
    }

    // ----- player controller -----

    /// Install a new active piece at the top centre.
    ///
    /// If it overlaps the board the game is over; the piece stays installed
    /// so the final frame can show it. Returns whether the spawn was clean.
    pub fn spawn(&mut self) -> bool {
        let kind = match self.forced_next.take() {
            Some(kind) => kind,
            None => self.rng.next_kind(&self.config.pieces),
        };
        let piece = ActivePiece::spawn(kind, self.board.width());
        self.active = Some(piece);
        self.piece_id = self.piece_id.wrapping_add(1);

        if piece.collides(&self.board) {
            self.phase = GamePhase::GameOver;
            return false;
        }
        true
    }

    fn running_piece(&self) -> Option<ActivePiece> {
        if !self.phase.is_running() {
            return None;
        }
        self.active
    }

    /// Shift the active piece horizontally; rejected moves leave it in place.
    pub fn move_horizontal(&mut self, delta: i16) -> bool {
        let Some(mut piece) = self.running_piece() else {
            return false;
        };

        let Some(x) = piece.pos.x.checked_add(delta) else {
            return false;
        };
        piece.pos.x = x;
        if piece.collides(&self.board) {
            return false;
        }
        self.active = Some(piece);
        true
    }

    /// Rotate the active piece, then search for a horizontal kick.
    ///
    /// The step starts at +1 and alternates sign while growing by one, so a
    /// 3 or 4 wide shape tries net offsets 0, +1, -1, +2 and a 2 wide shape
    /// tries 0, +1. The search gives up once the next step would exceed the
    /// shape width, restoring the original orientation and column.
    pub fn rotate(&mut self, dir: RotateDir) -> bool {
        let Some(mut piece) = self.running_piece() else {
            return false;
        };

        let width = piece.shape.size() as i16;
        piece.shape.rotate(dir);

        let mut step: i16 = 1;
        while piece.collides(&self.board) {
            let Some(x) = piece.pos.x.checked_add(step) else {
                return false;
            };
            piece.pos.x = x;
            step = -(step + step.signum());
            if step > width {
                return false;
            }
        }

        self.active = Some(piece);
        true
    }

    /// Move the active piece down one row, locking it if it cannot descend.
    ///
    /// Gravity and manual drops share this path; either way the gravity
    /// accumulator restarts.
    pub fn drop_one_row(&mut self) -> DropOutcome {
        let Some(mut piece) = self.running_piece() else {
            return DropOutcome::Ignored;
        };

        self.drop_counter_ms = 0;
        piece.pos.y += 1;
        if !piece.collides(&self.board) {
            self.active = Some(piece);
            return DropOutcome::Moved;
        }

        DropOutcome::Locked(self.lock_piece())
    }

    /// Merge the active piece into the board, sweep, and spawn the next piece.
    fn lock_piece(&mut self) -> LockEvent {
        let Some(piece) = self.active.take() else {
            return LockEvent::default();
        };

        self.board.merge(&piece.shape, piece.pos.x, piece.pos.y);
        let swept = sweep(&mut self.board, self.config.score_base);
        self.score = self.score.saturating_add(swept.score);

        let event = LockEvent {
            rows_cleared: swept.rows_cleared,
            score_delta: swept.score,
        };
        self.last_event = Some(event);

        self.spawn();
        self.drop_counter_ms = 0;
        event
    }

    // ----- timing & dispatch -----

    /// Advance the gravity accumulator. Drops at most one row per call, once
    /// the accumulated time exceeds the gravity interval.
    ///
    /// Returns true if a gravity drop happened.
    pub fn tick(&mut self, elapsed_ms: u32) -> bool {
        if !self.phase.is_running() {
            return false;
        }

        self.drop_counter_ms = self.drop_counter_ms.saturating_add(elapsed_ms);
        if self.drop_counter_ms > self.config.gravity_ms {
            self.drop_one_row();
            return true;
        }
        false
    }

    /// Apply a command. Returns whether anything changed.
    pub fn apply_action(&mut self, action: GameAction) -> bool {
        match action {
            GameAction::MoveLeft => self.move_horizontal(-1),
            GameAction::MoveRight => self.move_horizontal(1),
            GameAction::SoftDrop => self.drop_one_row() != DropOutcome::Ignored,
            GameAction::RotateCw => self.rotate(RotateDir::Clockwise),
            GameAction::RotateCcw => self.rotate(RotateDir::CounterClockwise),
            GameAction::Start => self.start(),
            GameAction::Pause => self.toggle_pause(),
            GameAction::Restart => self.restart(),
        }
    }

    /// Pure form of [`GameState::apply_action`]: `(state, command) -> new state`.
    pub fn transition(&self, action: GameAction) -> GameState {
        let mut next = self.clone();
        next.apply_action(action);
        next
    }

    #[cfg(test)]
    pub(crate) fn set_active(&mut self, piece: ActivePiece) {
        self.active = Some(piece);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn running(seed: u32) -> GameState {
        let mut state = GameState::new(GameConfig::default().with_seed(seed)).unwrap();
        state.start();
        state
    }

    fn placed(kind: PieceKind, x: i16, y: i16) -> GameState {
        let mut state = running(1);
        state.set_active(ActivePiece {
            kind,
            shape: create_piece(kind),
            pos: Position::new(x, y),
        });
        state
    }

    fn dot(value: CellValue, x: i16, y: i16) -> ActivePiece {
        ActivePiece {
            kind: PieceKind::T,
            shape: Shape::from_rows(&[&[value]]).unwrap(),
            pos: Position::new(x, y),
        }
    }

    #[test]
    fn test_new_game_state() {
        let state = GameState::new(GameConfig::default()).unwrap();
        assert_eq!(state.phase, GamePhase::NotStarted);
        assert_eq!(state.score, 0);
        assert!(state.active.is_none());
        assert_eq!(state.board.width(), 12);
        assert_eq!(state.board.height(), 20);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = GameConfig::default().with_size(12, 0);
        assert!(GameState::new(config).is_err());
    }

    #[test]
    fn test_start_spawns_once() {
        let mut state = GameState::new(GameConfig::default()).unwrap();
        assert!(state.start());
        assert_eq!(state.phase, GamePhase::Running);
        assert!(state.active.is_some());
        assert_eq!(state.piece_id, 1);

        // Start is only valid from NotStarted.
        assert!(!state.start());
        assert_eq!(state.piece_id, 1);
    }

    #[test]
    fn test_spawn_is_centered() {
        let mut state = running(1);
        for kind in PieceKind::ALL {
            state.force_next(kind);
            assert!(state.spawn());
            let piece = state.active.unwrap();
            let expected = 6 - (create_piece(kind).size() / 2) as i16;
            assert_eq!(piece.pos, Position::new(expected, 0), "{kind:?}");
        }
    }

    #[test]
    fn test_input_ignored_unless_running() {
        let mut state = GameState::new(GameConfig::default()).unwrap();
        assert!(!state.move_horizontal(1));
        assert_eq!(state.drop_one_row(), DropOutcome::Ignored);

        state.start();
        state.toggle_pause();
        let before = state.active;
        assert!(!state.move_horizontal(1));
        assert!(!state.rotate(RotateDir::Clockwise));
        assert_eq!(state.drop_one_row(), DropOutcome::Ignored);
        assert_eq!(state.active, before);
    }

    #[test]
    fn test_tick_requires_strictly_exceeding_interval() {
        let mut state = running(3);
        let y0 = state.active.unwrap().pos.y;

        assert!(!state.tick(1000));
        assert_eq!(state.active.unwrap().pos.y, y0);
        assert!(state.tick(1));
        assert_eq!(state.active.unwrap().pos.y, y0 + 1);
        assert_eq!(state.drop_counter_ms, 0);
    }

    #[test]
    fn test_tick_drops_one_row_per_call() {
        let mut state = running(3);
        let y0 = state.active.unwrap().pos.y;
        assert!(state.tick(10_000));
        assert_eq!(state.active.unwrap().pos.y, y0 + 1);
    }

    #[test]
    fn test_manual_drop_resets_gravity() {
        let mut state = running(3);
        state.tick(900);
        assert_eq!(state.drop_counter_ms, 900);
        assert_eq!(state.drop_one_row(), DropOutcome::Moved);
        assert_eq!(state.drop_counter_ms, 0);
    }

    #[test]
    fn test_tick_ignored_while_paused() {
        let mut state = running(3);
        state.toggle_pause();
        assert!(!state.tick(5000));
        assert_eq!(state.drop_counter_ms, 0);
    }

    #[test]
    fn test_single_cell_lock_clears_row() {
        let mut state = running(5);
        for x in 0..11 {
            state.board.set(x, 19, 2);
        }
        state.board.set(3, 18, 6);
        state.set_active(dot(7, 11, 18));

        // Moves into the gap, then locks on the floor.
        assert_eq!(state.drop_one_row(), DropOutcome::Moved);
        let outcome = state.drop_one_row();
        assert_eq!(
            outcome,
            DropOutcome::Locked(LockEvent {
                rows_cleared: 1,
                score_delta: 10
            })
        );
        assert_eq!(state.score, 10);
        // The marker above dropped by one row, everything else in row 19 is gone.
        assert_eq!(state.board.row(19).iter().filter(|&&c| c != 0).count(), 1);
        assert_eq!(state.board.get(3, 19), Some(6));
        assert_eq!(state.take_last_event().map(|e| e.rows_cleared), Some(1));
        assert_eq!(state.take_last_event(), None);
    }

    #[test]
    fn test_rotation_aborts_when_no_kick_fits() {
        let mut state = running(7);
        state.force_next(PieceKind::I);
        state.spawn();
        // Wall off everything except the I's own column.
        let col = state.active.unwrap().pos.x + 1;
        for y in 0..20 {
            for x in 0..12 {
                if x != col {
                    state.board.set(x, y, 3);
                }
            }
        }
        let before = state.active.unwrap();
        assert!(!state.rotate(RotateDir::Clockwise));
        assert_eq!(state.active.unwrap(), before);
    }

    #[test]
    fn test_rotation_kicks_off_the_wall() {
        let mut state = running(7);
        state.force_next(PieceKind::I);
        state.spawn();
        // Slide the vertical I against the left wall: grid column 1 at board column 0.
        while state.move_horizontal(-1) {}
        assert_eq!(state.active.unwrap().pos.x, -1);

        // Horizontal I at x=-1 would poke out of the board; a +1 kick fits.
        assert!(state.rotate(RotateDir::Clockwise));
        assert_eq!(state.active.unwrap().pos.x, 0);
    }

    // A T at (4, 5) rotated clockwise covers (5+o, 5), (5+o, 6), (6+o, 6)
    // and (5+o, 7) for a kick offset o.

    #[test]
    fn test_kick_prefers_left_when_right_is_blocked() {
        let mut state = placed(PieceKind::T, 4, 5);
        state.board.set(5, 7, 1);
        state.board.set(6, 7, 1);

        assert!(state.rotate(RotateDir::Clockwise));
        assert_eq!(state.active.unwrap().pos, Position::new(3, 5));
    }

    #[test]
    fn test_kick_reaches_two_to_the_right() {
        let mut state = placed(PieceKind::T, 4, 5);
        for x in 4..=6 {
            state.board.set(x, 7, 1);
        }

        assert!(state.rotate(RotateDir::Clockwise));
        assert_eq!(state.active.unwrap().pos, Position::new(6, 5));
    }

    #[test]
    fn test_kick_never_tries_two_to_the_left() {
        let mut state = placed(PieceKind::T, 4, 5);
        for x in 4..=7 {
            state.board.set(x, 7, 1);
        }
        let rotated = create_piece(PieceKind::T).rotated(RotateDir::Clockwise);
        assert!(!collides(&state.board, &rotated, Position::new(2, 5)));

        let before = state.active.unwrap();
        assert!(!state.rotate(RotateDir::Clockwise));
        assert_eq!(state.active.unwrap(), before);
    }

    #[test]
    fn test_two_wide_kick_stops_after_one_to_the_right() {
        // O at (4, 5) covers columns 4 and 5 of rows 5 and 6. A cell under
        // it blocks offsets 0 and +1 while -1 would fit.
        let mut state = placed(PieceKind::O, 4, 5);
        state.board.set(5, 5, 1);
        assert!(!collides(&state.board, &create_piece(PieceKind::O), Position::new(3, 5)));

        let before = state.active.unwrap();
        assert!(!state.rotate(RotateDir::Clockwise));
        assert_eq!(state.active.unwrap(), before);
    }

    #[test]
    fn test_move_by_extreme_delta_is_rejected() {
        let mut state = placed(PieceKind::T, 4, 5);
        let before = state.active.unwrap();

        assert!(!state.move_horizontal(i16::MAX));
        assert!(!state.move_horizontal(i16::MIN));
        assert_eq!(state.active.unwrap(), before);
    }

    #[test]
    fn test_restart_from_game_over() {
        let mut state = running(11);
        for x in 0..12 {
            state.board.set(x, 0, 1);
        }
        assert!(!state.spawn());
        assert_eq!(state.phase, GamePhase::GameOver);

        assert!(state.restart());
        assert_eq!(state.phase, GamePhase::Running);
        assert_eq!(state.score, 0);
        assert_eq!(state.board.filled_count(), 0);
        assert_eq!(state.episode_id, 1);
        assert!(state.active.is_some());
    }

    #[test]
    fn test_transition_leaves_original_untouched() {
        let state = running(13);
        let next = state.transition(GameAction::MoveLeft);
        assert_eq!(
            next.active.unwrap().pos.x,
            state.active.unwrap().pos.x - 1
        );
        let paused = state.transition(GameAction::Pause);
        assert_eq!(paused.phase, GamePhase::Paused);
        assert_eq!(state.phase, GamePhase::Running);
    }
}
