//! Game loop driver
//!
//! The driver turns wall-clock (or virtual) time into gravity ticks. It owns
//! the [`GameState`] and a [`Scheduler`] with a single pending slot, so at
//! most one tick is ever outstanding. Inputs and ticks both go through
//! `&mut self`, which serializes every state mutation.
//!
//! ```
//! use blockfall_core::{FrameScheduler, GameConfig, GameDriver, GameState, NullObserver};
//!
//! let state = GameState::new(GameConfig::default()).unwrap();
//! let mut driver = GameDriver::new(state, FrameScheduler::new());
//! driver.start(0);
//!
//! // Virtual clock: one frame every 16ms.
//! let mut now = 0;
//! while now <= 2000 {
//!     driver.pump(now, &mut NullObserver);
//!     now += 16;
//! }
//! assert!(driver.state().active().unwrap().pos.y > 0);
//! ```

use crate::game_state::GameState;
use crate::snapshot::GameSnapshot;
use crate::types::{GameAction, GamePhase, Palette, FRAME_MS};

/// Timer abstraction for the tick loop.
///
/// Time is supplied by the caller in milliseconds so the same driver runs on
/// a monotonic clock or a test's virtual clock.
pub trait Scheduler {
    /// Arm the single tick slot `after_ms` from the last observed time,
    /// replacing any pending tick.
    fn schedule_tick(&mut self, after_ms: u32);

    /// Drop the pending tick, if any.
    fn cancel(&mut self);

    fn is_scheduled(&self) -> bool;

    /// Consume the pending tick if it is due at `now_ms`.
    fn take_due(&mut self, now_ms: u64) -> bool;

    /// Milliseconds until the pending tick is due, `None` when idle.
    fn due_in(&self, now_ms: u64) -> Option<u64>;
}

/// Deadline-based scheduler for frame loops.
#[derive(Debug, Clone, Default)]
pub struct FrameScheduler {
    due_at: Option<u64>,
    now_ms: u64,
}

impl FrameScheduler {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Scheduler for FrameScheduler {
    fn schedule_tick(&mut self, after_ms: u32) {
        self.due_at = Some(self.now_ms.saturating_add(after_ms as u64));
    }

    fn cancel(&mut self) {
        self.due_at = None;
    }

    fn is_scheduled(&self) -> bool {
        self.due_at.is_some()
    }

    fn take_due(&mut self, now_ms: u64) -> bool {
        self.now_ms = self.now_ms.max(now_ms);
        match self.due_at {
            Some(due) if due <= self.now_ms => {
                self.due_at = None;
                true
            }
            _ => false,
        }
    }

    fn due_in(&self, now_ms: u64) -> Option<u64> {
        self.due_at.map(|due| due.saturating_sub(now_ms))
    }
}

/// Renderer and score display contract.
pub trait GameObserver {
    /// Draw one frame.
    fn render(&mut self, snapshot: &GameSnapshot, palette: &Palette);

    /// Called only when the score differs from the last reported value.
    fn score_changed(&mut self, _score: u32) {}
}

/// Observer that ignores everything (headless runs, benches).
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl GameObserver for NullObserver {
    fn render(&mut self, _snapshot: &GameSnapshot, _palette: &Palette) {}
}

pub struct GameDriver<S: Scheduler> {
    state: GameState,
    scheduler: S,
    frame_ms: u32,
    /// Time of the last tick; elapsed time is measured from here.
    last_tick_ms: u64,
    last_score: u32,
    snapshot: GameSnapshot,
}

impl<S: Scheduler> GameDriver<S> {
    pub fn new(state: GameState, scheduler: S) -> Self {
        let last_score = state.score();
        Self {
            state,
            scheduler,
            frame_ms: FRAME_MS,
            last_tick_ms: 0,
            last_score,
            snapshot: GameSnapshot::default(),
        }
    }

    pub fn with_frame_ms(mut self, frame_ms: u32) -> Self {
        self.frame_ms = frame_ms;
        self
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut GameState {
        &mut self.state
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    /// Milliseconds the caller may wait before the next `pump`.
    pub fn due_in(&self, now_ms: u64) -> Option<u64> {
        self.scheduler.due_in(now_ms)
    }

    /// Begin ticking from `now_ms`.
    fn resume_at(&mut self, now_ms: u64) {
        self.last_tick_ms = now_ms;
        self.scheduler.take_due(now_ms);
        if self.state.phase().is_running() {
            self.scheduler.schedule_tick(0);
        } else {
            self.scheduler.cancel();
        }
    }

    pub fn start(&mut self, now_ms: u64) -> bool {
        if !self.state.start() {
            return false;
        }
        self.resume_at(now_ms);
        true
    }

    pub fn toggle_pause(&mut self, now_ms: u64) -> bool {
        if !self.state.toggle_pause() {
            return false;
        }
        match self.state.phase() {
            GamePhase::Paused => self.scheduler.cancel(),
            // Paused time is not counted: measure from the resume instant.
            _ => self.resume_at(now_ms),
        }
        true
    }

    pub fn restart(&mut self, now_ms: u64) -> bool {
        if !self.state.restart() {
            return false;
        }
        self.resume_at(now_ms);
        true
    }

    /// Apply one command and redraw if it changed anything.
    pub fn handle_action(
        &mut self,
        action: GameAction,
        now_ms: u64,
        observer: &mut impl GameObserver,
    ) -> bool {
        let changed = match action {
            GameAction::Start => self.start(now_ms),
            GameAction::Pause => self.toggle_pause(now_ms),
            GameAction::Restart => self.restart(now_ms),
            _ => self.state.apply_action(action),
        };
        if changed {
            self.publish(observer);
        }
        changed
    }

    /// Run the pending tick if it is due. Returns true if a tick ran.
    pub fn pump(&mut self, now_ms: u64, observer: &mut impl GameObserver) -> bool {
        if !self.scheduler.take_due(now_ms) {
            return false;
        }

        let elapsed = now_ms.saturating_sub(self.last_tick_ms);
        self.last_tick_ms = now_ms;
        self.state.tick(u32::try_from(elapsed).unwrap_or(u32::MAX));

        self.publish(observer);
        if self.state.phase().is_running() {
            self.scheduler.schedule_tick(self.frame_ms);
        }
        true
    }

    /// Render the current state without advancing it (first frame, resize).
    pub fn redraw(&mut self, observer: &mut impl GameObserver) {
        self.publish(observer);
    }

    fn publish(&mut self, observer: &mut impl GameObserver) {
        self.state.snapshot_into(&mut self.snapshot);
        observer.render(&self.snapshot, self.state.palette());

        let score = self.state.score();
        if score != self.last_score {
            self.last_score = score;
            observer.score_changed(score);
        }

        if self.state.phase() == GamePhase::GameOver {
            self.scheduler.cancel();
        }
    }
}
