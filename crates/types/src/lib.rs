//! Shared types - data structures and constants used by every blockfall crate
//!
//! Everything here is plain data with no external dependencies, so it can be
//! used from the core rules, the terminal frontend and the remote protocol alike.
//!
//! # Cell Values
//!
//! The playfield and every piece shape are grids of small integers:
//!
//! | Value | Meaning |
//! |-------|---------|
//! | 0 | Empty |
//! | 1 | I |
//! | 2 | L |
//! | 3 | J |
//! | 4 | O |
//! | 5 | Z |
//! | 6 | S |
//! | 7 | T |
//!
//! The value doubles as a colour identity; [`Palette`] maps it to an [`Rgb`].
//!
//! # Defaults
//!
//! | Constant | Value | Description |
//! |----------|-------|-------------|
//! | `DEFAULT_BOARD_WIDTH` | 12 | Playfield columns |
//! | `DEFAULT_BOARD_HEIGHT` | 20 | Playfield rows |
//! | `DEFAULT_GRAVITY_MS` | 1000 | Time between automatic drops |
//! | `DEFAULT_SCORE_BASE` | 10 | Points for the first row of a sweep |
//! | `FRAME_MS` | 16 | Frame callback interval (~60 FPS) |
//!
//! # Examples
//!
//! ```
//! use blockfall_types::{GameAction, PieceKind};
//!
//! assert_eq!(PieceKind::O.cell_value(), 4);
//! assert_eq!(PieceKind::from_char('z'), Some(PieceKind::Z));
//!
//! assert_eq!(GameAction::from_str("softDrop"), Some(GameAction::SoftDrop));
//! ```

/// A single playfield or shape cell. `0` is empty, `1..=7` are piece colours.
pub type CellValue = u8;

/// Value of an empty cell.
pub const EMPTY_CELL: CellValue = 0;

/// Highest valid cell value.
pub const MAX_CELL_VALUE: CellValue = 7;

/// Default playfield width in cells.
pub const DEFAULT_BOARD_WIDTH: u8 = 12;

/// Default playfield height in cells.
pub const DEFAULT_BOARD_HEIGHT: u8 = 20;

/// Default gravity interval (one automatic drop per second).
pub const DEFAULT_GRAVITY_MS: u32 = 1000;

/// Default score awarded for the first row cleared in a sweep.
pub const DEFAULT_SCORE_BASE: u32 = 10;

/// Frame callback interval in milliseconds (16ms ≈ 60 FPS).
pub const FRAME_MS: u32 = 16;

/// Largest side length of any catalog shape.
pub const MAX_SHAPE_SIZE: usize = 4;

/// The seven piece kinds.
///
/// Discriminant order follows the catalog, so `kind as u8 + 1` is the cell value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PieceKind {
    I,
    L,
    J,
    O,
    Z,
    S,
    T,
}

impl PieceKind {
    /// Every kind, in cell value order.
    pub const ALL: [PieceKind; 7] = [
        PieceKind::I,
        PieceKind::L,
        PieceKind::J,
        PieceKind::O,
        PieceKind::Z,
        PieceKind::S,
        PieceKind::T,
    ];

    /// Cell value written into the playfield by this kind (1..=7).
    pub fn cell_value(self) -> CellValue {
        self as CellValue + 1
    }

    /// Parse a single piece letter (case-insensitive).
    pub fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'I' => Some(PieceKind::I),
            'L' => Some(PieceKind::L),
            'J' => Some(PieceKind::J),
            'O' => Some(PieceKind::O),
            'Z' => Some(PieceKind::Z),
            'S' => Some(PieceKind::S),
            'T' => Some(PieceKind::T),
            _ => None,
        }
    }
}

/// Rotation direction for the active piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RotateDir {
    Clockwise,
    CounterClockwise,
}

/// Session lifecycle.
///
/// ```text
/// NotStarted --start--> Running <--pause--> Paused
///                       Running --spawn collision--> GameOver --restart--> Running
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GamePhase {
    #[default]
    NotStarted,
    Running,
    Paused,
    GameOver,
}

impl GamePhase {
    pub fn is_running(self) -> bool {
        self == GamePhase::Running
    }
}

/// Discrete commands delivered to a session.
///
/// Movement commands are only honoured while the phase is [`GamePhase::Running`];
/// lifecycle commands drive the phase machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameAction {
    /// Move the active piece one column left
    MoveLeft,
    /// Move the active piece one column right
    MoveRight,
    /// Drop the active piece one row (locks it if it cannot descend)
    SoftDrop,
    /// Rotate 90° clockwise
    RotateCw,
    /// Rotate 90° counter-clockwise
    RotateCcw,
    /// Leave the not-started phase
    Start,
    /// Toggle between running and paused
    Pause,
    /// Clear the board and score and play again
    Restart,
}

impl GameAction {
    /// Parse action from its camelCase wire name (case-insensitive).
    ///
    /// ```
    /// use blockfall_types::GameAction;
    ///
    /// assert_eq!(GameAction::from_str("moveLeft"), Some(GameAction::MoveLeft));
    /// assert_eq!(GameAction::from_str("ROTATECW"), Some(GameAction::RotateCw));
    /// assert_eq!(GameAction::from_str("hold"), None);
    /// ```
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "moveleft" => Some(GameAction::MoveLeft),
            "moveright" => Some(GameAction::MoveRight),
            "softdrop" => Some(GameAction::SoftDrop),
            "rotatecw" | "rotate" => Some(GameAction::RotateCw),
            "rotateccw" => Some(GameAction::RotateCcw),
            "start" => Some(GameAction::Start),
            "pause" => Some(GameAction::Pause),
            "restart" => Some(GameAction::Restart),
            _ => None,
        }
    }

    /// camelCase wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            GameAction::MoveLeft => "moveLeft",
            GameAction::MoveRight => "moveRight",
            GameAction::SoftDrop => "softDrop",
            GameAction::RotateCw => "rotateCw",
            GameAction::RotateCcw => "rotateCcw",
            GameAction::Start => "start",
            GameAction::Pause => "pause",
            GameAction::Restart => "restart",
        }
    }

}

/// Emitted each time a piece locks into the playfield.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LockEvent {
    pub rows_cleared: u32,
    pub score_delta: u32,
}

/// 24-bit RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Build from a packed `0xRRGGBB` value.
    ///
    /// ```
    /// use blockfall_types::Rgb;
    ///
    /// assert_eq!(Rgb::from_hex(0xFF0D72), Rgb::new(0xFF, 0x0D, 0x72));
    /// ```
    pub const fn from_hex(rgb: u32) -> Self {
        Self {
            r: ((rgb >> 16) & 0xFF) as u8,
            g: ((rgb >> 8) & 0xFF) as u8,
            b: (rgb & 0xFF) as u8,
        }
    }
}

/// Colour lookup from cell value to colour. Index 0 (empty) has no colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    colors: [Rgb; MAX_CELL_VALUE as usize],
}

impl Palette {
    pub const fn new(colors: [Rgb; MAX_CELL_VALUE as usize]) -> Self {
        Self { colors }
    }

    /// Colour for a cell value, or `None` for empty/unknown values.
    pub fn color(&self, value: CellValue) -> Option<Rgb> {
        match value {
            1..=MAX_CELL_VALUE => Some(self.colors[(value - 1) as usize]),
            _ => None,
        }
    }

    pub fn set(&mut self, value: CellValue, color: Rgb) -> bool {
        match value {
            1..=MAX_CELL_VALUE => {
                self.colors[(value - 1) as usize] = color;
                true
            }
            _ => false,
        }
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::new([
            Rgb::from_hex(0xFF0D72),
            Rgb::from_hex(0x0DC2FF),
            Rgb::from_hex(0x0DFF72),
            Rgb::from_hex(0xF538FF),
            Rgb::from_hex(0xFF8E0D),
            Rgb::from_hex(0xFFE138),
            Rgb::from_hex(0x3877FF),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_values_are_distinct() {
        for (i, kind) in PieceKind::ALL.iter().enumerate() {
            assert_eq!(kind.cell_value() as usize, i + 1);
        }
    }

    #[test]
    fn piece_kind_parses_letters() {
        assert_eq!(PieceKind::from_char('I'), Some(PieceKind::I));
        assert_eq!(PieceKind::from_char('s'), Some(PieceKind::S));
        assert_eq!(PieceKind::from_char('x'), None);
    }

    #[test]
    fn action_names_round_trip() {
        let all = [
            GameAction::MoveLeft,
            GameAction::MoveRight,
            GameAction::SoftDrop,
            GameAction::RotateCw,
            GameAction::RotateCcw,
            GameAction::Start,
            GameAction::Pause,
            GameAction::Restart,
        ];
        for action in all {
            assert_eq!(GameAction::from_str(action.as_str()), Some(action));
        }
    }

    #[test]
    fn palette_has_no_color_for_empty() {
        let palette = Palette::default();
        assert_eq!(palette.color(EMPTY_CELL), None);
        assert_eq!(palette.color(1), Some(Rgb::new(0xFF, 0x0D, 0x72)));
        assert_eq!(palette.color(7), Some(Rgb::new(0x38, 0x77, 0xFF)));
        assert_eq!(palette.color(8), None);
    }

    #[test]
    fn palette_set_rejects_empty_value() {
        let mut palette = Palette::default();
        assert!(!palette.set(0, Rgb::new(1, 2, 3)));
        assert!(palette.set(4, Rgb::new(1, 2, 3)));
        assert_eq!(palette.color(4), Some(Rgb::new(1, 2, 3)));
    }
}
