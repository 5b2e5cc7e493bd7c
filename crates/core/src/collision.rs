//! Collision checking between a shape and the playfield.

use crate::board::Board;
use crate::pieces::Shape;

/// Offset of a shape's top-left cell in playfield coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Position {
    pub x: i16,
    pub y: i16,
}

impl Position {
    pub const fn new(x: i16, y: i16) -> Self {
        Self { x, y }
    }
}

/// True if any non-empty cell of `shape` placed at `pos` lands outside the
/// board (left, right, above or below) or on an occupied cell.
///
/// Stops at the first offending cell. A cell whose coordinate overflows
/// `i16` counts as out of bounds.
pub fn collides(board: &Board, shape: &Shape, pos: Position) -> bool {
    shape.filled().any(|(dx, dy, _)| {
        match (pos.x.checked_add(dx), pos.y.checked_add(dy)) {
            (Some(x), Some(y)) => !board.is_free(x, y),
            _ => true,
        }
    })
}
