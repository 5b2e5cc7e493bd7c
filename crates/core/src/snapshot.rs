use crate::game_state::ActivePiece;
use crate::pieces::Shape;
use crate::types::{CellValue, GamePhase, PieceKind, EMPTY_CELL};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActiveSnapshot {
    pub kind: PieceKind,
    pub shape: Shape,
    pub x: i16,
    pub y: i16,
}

impl From<ActivePiece> for ActiveSnapshot {
    fn from(value: ActivePiece) -> Self {
        Self {
            kind: value.kind,
            shape: value.shape,
            x: value.pos.x,
            y: value.pos.y,
        }
    }
}

/// Read-only view of a session handed to renderers and remote observers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct GameSnapshot {
    pub width: u8,
    pub height: u8,
    /// Row-major locked cells.
    pub board: Vec<CellValue>,
    pub active: Option<ActiveSnapshot>,
    pub score: u32,
    pub phase: GamePhase,
    pub episode_id: u32,
    pub piece_id: u32,
}

impl GameSnapshot {
    /// Locked cell at (x, y), ignoring the active piece.
    pub fn cell(&self, x: usize, y: usize) -> CellValue {
        if x >= self.width as usize || y >= self.height as usize {
            return EMPTY_CELL;
        }
        self.board[y * self.width as usize + x]
    }

    /// Cell at (x, y) with the active piece drawn over the locked cells.
    pub fn composed_cell(&self, x: usize, y: usize) -> CellValue {
        if let Some(active) = self.active {
            let lx = x as i16 - active.x;
            let ly = y as i16 - active.y;
            if lx >= 0 && ly >= 0 {
                let v = active.shape.get(lx as usize, ly as usize);
                if v != EMPTY_CELL {
                    return v;
                }
            }
        }
        self.cell(x, y)
    }
}
