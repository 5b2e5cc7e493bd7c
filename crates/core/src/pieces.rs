//! Pieces module - the piece catalog and square-grid rotation
//!
//! Every piece is a small square grid of cell values. `create_piece` hands out
//! a fresh `Shape` by value, so rotating one instance can never touch the
//! catalog or another spawned piece.

use crate::types::{CellValue, PieceKind, RotateDir, EMPTY_CELL, MAX_SHAPE_SIZE};

type Grid = [[CellValue; MAX_SHAPE_SIZE]; MAX_SHAPE_SIZE];

const I_GRID: Grid = [[0, 1, 0, 0], [0, 1, 0, 0], [0, 1, 0, 0], [0, 1, 0, 0]];
const L_GRID: Grid = [[0, 2, 0, 0], [0, 2, 0, 0], [0, 2, 2, 0], [0; 4]];
const J_GRID: Grid = [[0, 3, 0, 0], [0, 3, 0, 0], [3, 3, 0, 0], [0; 4]];
const O_GRID: Grid = [[4, 4, 0, 0], [4, 4, 0, 0], [0; 4], [0; 4]];
const Z_GRID: Grid = [[5, 5, 0, 0], [0, 5, 5, 0], [0; 4], [0; 4]];
const S_GRID: Grid = [[0, 6, 6, 0], [6, 6, 0, 0], [0; 4], [0; 4]];
const T_GRID: Grid = [[0, 7, 0, 0], [7, 7, 7, 0], [0; 4], [0; 4]];

/// A square grid of cell values, `size` x `size`, stored in a fixed 4x4 array.
///
/// Cells outside the `size` square are always empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Shape {
    size: u8,
    cells: Grid,
}

impl Shape {
    /// Build a shape from explicit rows.
    ///
    /// Returns `None` unless the rows form a non-empty square no larger than 4x4.
    pub fn from_rows(rows: &[&[CellValue]]) -> Option<Self> {
        let size = rows.len();
        if size == 0 || size > MAX_SHAPE_SIZE || rows.iter().any(|row| row.len() != size) {
            return None;
        }

        let mut cells = [[EMPTY_CELL; MAX_SHAPE_SIZE]; MAX_SHAPE_SIZE];
        for (y, row) in rows.iter().enumerate() {
            cells[y][..size].copy_from_slice(row);
        }
        Some(Self {
            size: size as u8,
            cells,
        })
    }

    /// Side length of the grid (also its width).
    pub fn size(&self) -> u8 {
        self.size
    }

    /// Value at local `(x, y)`; empty outside the grid.
    pub fn get(&self, x: usize, y: usize) -> CellValue {
        if x >= self.size as usize || y >= self.size as usize {
            return EMPTY_CELL;
        }
        self.cells[y][x]
    }

    /// Iterate the rows of the grid.
    pub fn rows(&self) -> impl Iterator<Item = &[CellValue]> + '_ {
        let n = self.size as usize;
        self.cells[..n].iter().map(move |row| &row[..n])
    }

    /// Iterate non-empty cells as `(x, y, value)` in local coordinates.
    pub fn filled(&self) -> impl Iterator<Item = (i16, i16, CellValue)> + '_ {
        self.rows().enumerate().flat_map(|(y, row)| {
            row.iter()
                .enumerate()
                .filter(|(_, &v)| v != EMPTY_CELL)
                .map(move |(x, &v)| (x as i16, y as i16, v))
        })
    }

    /// Rotate 90° in place.
    ///
    /// Transposes the grid, then reverses each row (clockwise) or the row
    /// order (counter-clockwise).
    pub fn rotate(&mut self, dir: RotateDir) {
        let n = self.size as usize;
        for y in 0..n {
            for x in 0..y {
                let tmp = self.cells[y][x];
                self.cells[y][x] = self.cells[x][y];
                self.cells[x][y] = tmp;
            }
        }

        match dir {
            RotateDir::Clockwise => {
                for row in &mut self.cells[..n] {
                    row[..n].reverse();
                }
            }
            RotateDir::CounterClockwise => self.cells[..n].reverse(),
        }
    }

    /// Rotated copy.
    pub fn rotated(mut self, dir: RotateDir) -> Self {
        self.rotate(dir);
        self
    }
}

/// Create a fresh, independent shape for a piece kind.
pub fn create_piece(kind: PieceKind) -> Shape {
    let (size, cells) = match kind {
        PieceKind::I => (4, I_GRID),
        PieceKind::L => (3, L_GRID),
        PieceKind::J => (3, J_GRID),
        PieceKind::O => (2, O_GRID),
        PieceKind::Z => (3, Z_GRID),
        PieceKind::S => (3, S_GRID),
        PieceKind::T => (3, T_GRID),
    };
    Shape { size, cells }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_values_match_kind() {
        for kind in PieceKind::ALL {
            let shape = create_piece(kind);
            let values: Vec<_> = shape.filled().map(|(_, _, v)| v).collect();
            assert_eq!(values.len(), 4, "{kind:?} should have 4 cells");
            assert!(values.iter().all(|&v| v == kind.cell_value()));
        }
    }

    #[test]
    fn rotating_a_copy_leaves_catalog_untouched() {
        let mut a = create_piece(PieceKind::T);
        a.rotate(RotateDir::Clockwise);
        assert_ne!(a, create_piece(PieceKind::T));
        assert_eq!(create_piece(PieceKind::T).get(1, 0), 7);
    }

    #[test]
    fn clockwise_rotation_of_t() {
        let t = create_piece(PieceKind::T).rotated(RotateDir::Clockwise);
        let rows: Vec<Vec<u8>> = t.rows().map(|r| r.to_vec()).collect();
        assert_eq!(rows, vec![vec![0, 7, 0], vec![0, 7, 7], vec![0, 7, 0]]);
    }

    #[test]
    fn counter_clockwise_rotation_of_t() {
        let t = create_piece(PieceKind::T).rotated(RotateDir::CounterClockwise);
        let rows: Vec<Vec<u8>> = t.rows().map(|r| r.to_vec()).collect();
        assert_eq!(rows, vec![vec![0, 7, 0], vec![7, 7, 0], vec![0, 7, 0]]);
    }

    #[test]
    fn from_rows_rejects_non_square() {
        assert!(Shape::from_rows(&[&[1, 1], &[1]]).is_none());
        assert!(Shape::from_rows(&[]).is_none());
        assert!(Shape::from_rows(&[&[1; 5], &[1; 5], &[1; 5], &[1; 5], &[1; 5]]).is_none());
        let dot = Shape::from_rows(&[&[3]]).unwrap();
        assert_eq!(dot.size(), 1);
        assert_eq!(dot.get(0, 0), 3);
        assert_eq!(dot.get(1, 0), 0);
    }
}
