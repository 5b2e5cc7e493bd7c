//! Board module - the playfield grid
//!
//! The board is a `width` x `height` grid of cell values stored as a flat,
//! row-major `Vec` for cache locality. Dimensions are fixed at creation.
//! Coordinates: (x, y) where x grows to the right and y grows downward;
//! row 0 is the top of the playfield.

use crate::config::ConfigError;
use crate::pieces::Shape;
use crate::types::{CellValue, DEFAULT_BOARD_HEIGHT, DEFAULT_BOARD_WIDTH, EMPTY_CELL, MAX_CELL_VALUE};

/// The playfield.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Board {
    width: u8,
    height: u8,
    /// Flat array of cells, row-major order (y * width + x)
    cells: Vec<CellValue>,
}

impl Board {
    /// Create an empty board. Zero-sized boards are rejected.
    pub fn new(width: u8, height: u8) -> Result<Self, ConfigError> {
        if width == 0 || height == 0 {
            return Err(ConfigError::ZeroDimension { width, height });
        }
        Ok(Self::empty(width, height))
    }

    fn empty(width: u8, height: u8) -> Self {
        Self {
            width,
            height,
            cells: vec![EMPTY_CELL; width as usize * height as usize],
        }
    }

    /// Calculate flat index from (x, y) coordinates
    #[inline(always)]
    fn index(&self, x: i16, y: i16) -> Option<usize> {
        if x < 0 || x >= self.width as i16 || y < 0 || y >= self.height as i16 {
            return None;
        }
        Some((y as usize) * (self.width as usize) + (x as usize))
    }

    pub fn width(&self) -> u8 {
        self.width
    }

    pub fn height(&self) -> u8 {
        self.height
    }

    /// Get cell at position (x, y)
    /// Returns None if out of bounds
    pub fn get(&self, x: i16, y: i16) -> Option<CellValue> {
        self.index(x, y).map(|idx| self.cells[idx])
    }

    /// Set cell at position (x, y)
    /// Returns false if out of bounds or the value is not a valid cell value
    pub fn set(&mut self, x: i16, y: i16, value: CellValue) -> bool {
        if value > MAX_CELL_VALUE {
            return false;
        }
        match self.index(x, y) {
            Some(idx) => {
                self.cells[idx] = value;
                true
            }
            None => false,
        }
    }

    /// Check if position is occupied (within bounds and filled)
    pub fn is_occupied(&self, x: i16, y: i16) -> bool {
        matches!(self.get(x, y), Some(v) if v != EMPTY_CELL)
    }

    /// Check if position is within bounds and empty
    pub fn is_free(&self, x: i16, y: i16) -> bool {
        self.get(x, y) == Some(EMPTY_CELL)
    }

    /// Borrow one row. Panics if `y` is out of range.
    pub fn row(&self, y: usize) -> &[CellValue] {
        let w = self.width as usize;
        &self.cells[y * w..(y + 1) * w]
    }

    /// Iterate rows from top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[CellValue]> + '_ {
        self.cells.chunks(self.width as usize)
    }

    /// Check if a row is completely filled
    pub fn is_row_full(&self, y: usize) -> bool {
        if y >= self.height as usize {
            return false;
        }
        self.row(y).iter().all(|&cell| cell != EMPTY_CELL)
    }

    /// Remove row `y`, shift every row above it down by one and insert an
    /// empty row at the top.
    pub fn clear_row(&mut self, y: usize) -> bool {
        if y >= self.height as usize {
            return false;
        }

        let width = self.width as usize;
        // copy_within handles overlapping ranges
        self.cells.copy_within(0..y * width, width);
        self.cells[..width].fill(EMPTY_CELL);
        true
    }

    /// Write the shape's non-empty cells at offset (x, y), overwriting
    /// whatever is there. Cells that fall outside the board are skipped.
    pub fn merge(&mut self, shape: &Shape, x: i16, y: i16) {
        for (dx, dy, value) in shape.filled() {
            self.set(x + dx, y + dy, value);
        }
    }

    /// Reset every cell to empty, keeping the dimensions.
    pub fn clear(&mut self) {
        self.cells.fill(EMPTY_CELL);
    }

    /// Get a reference to the internal cells array
    pub fn cells(&self) -> &[CellValue] {
        &self.cells
    }

    /// Number of occupied cells.
    pub fn filled_count(&self) -> usize {
        self.cells.iter().filter(|&&c| c != EMPTY_CELL).count()
    }

    /// Build a board from text rows, one character per cell: `.` is empty and
    /// `1`-`7` are cell values. Intended for fixtures.
    ///
    /// ```
    /// use blockfall_core::Board;
    ///
    /// let board = Board::from_rows(&["..", "14"]).unwrap();
    /// assert_eq!(board.get(1, 1), Some(4));
    /// ```
    pub fn from_rows(rows: &[&str]) -> Option<Self> {
        let height = u8::try_from(rows.len()).ok()?;
        let width = u8::try_from(rows.first()?.chars().count()).ok()?;
        let mut board = Self::new(width, height).ok()?;
        for (y, row) in rows.iter().enumerate() {
            if row.chars().count() != width as usize {
                return None;
            }
            for (x, c) in row.chars().enumerate() {
                let value = match c {
                    '.' => EMPTY_CELL,
                    '1'..='7' => c as u8 - b'0',
                    _ => return None,
                };
                board.set(x as i16, y as i16, value);
            }
        }
        Some(board)
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::empty(DEFAULT_BOARD_WIDTH, DEFAULT_BOARD_HEIGHT)
    }
}
