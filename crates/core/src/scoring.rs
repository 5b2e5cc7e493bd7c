//! Scoring module - the sweep engine and its doubling row multiplier
//!
//! After every lock the board is swept bottom to top. Each complete row is
//! removed (rows above shift down, an empty row appears on top) and the same
//! row index is checked again before moving up.
//!
//! # Score Calculation
//!
//! Rows cleared within one sweep score `base * 2^n`, where `n` counts the rows
//! already cleared in that sweep:
//!
//! | Rows in one sweep | Base 10 total |
//! |-------------------|---------------|
//! | 1 | 10 |
//! | 2 | 30 |
//! | 3 | 70 |
//! | 4 | 150 |
//!
//! The multiplier starts over at 1 for every sweep.

use crate::board::Board;

/// Outcome of a sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SweepResult {
    pub rows_cleared: u32,
    pub score: u32,
}

/// Points for the `nth` row (0-based) cleared within one sweep.
pub fn row_award(base: u32, nth: u32) -> u32 {
    base.saturating_mul(2u32.saturating_pow(nth))
}

/// Total points for clearing `rows` rows in a single sweep.
pub fn sweep_score(rows: u32, base: u32) -> u32 {
    (0..rows).fold(0u32, |acc, nth| acc.saturating_add(row_award(base, nth)))
}

/// Clear every complete row, bottom to top, and score the clears.
///
/// Every row is checked, the top row included. A full top row can only come
/// from a piece locked into it, and it is cleared like any other.
pub fn sweep(board: &mut Board, base: u32) -> SweepResult {
    let mut result = SweepResult::default();
    let mut y = board.height() as usize;

    while y > 0 {
        let row = y - 1;
        if board.is_row_full(row) {
            board.clear_row(row);
            result.score = result
                .score
                .saturating_add(row_award(base, result.rows_cleared));
            result.rows_cleared += 1;
            // Re-check the same index: the row above now lives here.
            continue;
        }
        y -= 1;
    }

    result
}
