//! Game configuration - every tunable the session recognises
//!
//! Defaults reproduce the reference game: a 12x20 board, one drop per second,
//! all seven pieces, 10 points for the first row of a sweep.

use arrayvec::ArrayVec;
use thiserror::Error;

use crate::types::{
    Palette, PieceKind, DEFAULT_BOARD_HEIGHT, DEFAULT_BOARD_WIDTH, DEFAULT_GRAVITY_MS,
    DEFAULT_SCORE_BASE,
};

/// Rejected configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("board dimensions must be non-zero (got {width}x{height})")]
    ZeroDimension { width: u8, height: u8 },
    #[error("gravity interval must be at least 1ms")]
    ZeroGravityInterval,
    #[error("piece set must contain at least one piece kind")]
    EmptyPieceSet,
    #[error("unknown piece kind {0:?}")]
    UnknownPiece(char),
}

/// Session configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct GameConfig {
    pub width: u8,
    pub height: u8,
    /// Milliseconds between automatic one-row drops.
    pub gravity_ms: u32,
    /// Kinds the spawner picks from (uniformly).
    pub pieces: ArrayVec<PieceKind, 7>,
    pub palette: Palette,
    /// Points for the first row of a sweep; each further row in the same sweep doubles.
    pub score_base: u32,
    pub seed: u32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_BOARD_WIDTH,
            height: DEFAULT_BOARD_HEIGHT,
            gravity_ms: DEFAULT_GRAVITY_MS,
            pieces: PieceKind::ALL.into_iter().collect(),
            palette: Palette::default(),
            score_base: DEFAULT_SCORE_BASE,
            seed: 1,
        }
    }
}

impl GameConfig {
    /// Defaults overlaid with `BLOCKFALL_*` environment variables.
    ///
    /// - `BLOCKFALL_WIDTH`, `BLOCKFALL_HEIGHT`: board size
    /// - `BLOCKFALL_GRAVITY_MS`: gravity interval
    /// - `BLOCKFALL_SCORE_BASE`: points for the first cleared row
    /// - `BLOCKFALL_SEED`: piece RNG seed
    /// - `BLOCKFALL_PIECES`: piece letters to draw from, e.g. `IOT`
    ///
    /// Unparsable numbers keep their default.
    pub fn from_env() -> Result<Self, ConfigError> {
        use std::env;

        fn parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
            env::var(key).ok().and_then(|s| s.trim().parse().ok())
        }

        let mut config = Self::default();
        if let Some(width) = parsed("BLOCKFALL_WIDTH") {
            config.width = width;
        }
        if let Some(height) = parsed("BLOCKFALL_HEIGHT") {
            config.height = height;
        }
        if let Some(ms) = parsed("BLOCKFALL_GRAVITY_MS") {
            config.gravity_ms = ms;
        }
        if let Some(base) = parsed("BLOCKFALL_SCORE_BASE") {
            config.score_base = base;
        }
        if let Some(seed) = parsed("BLOCKFALL_SEED") {
            config.seed = seed;
        }
        if let Ok(letters) = env::var("BLOCKFALL_PIECES") {
            config.pieces = parse_piece_set(&letters)?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::ZeroDimension {
                width: self.width,
                height: self.height,
            });
        }
        if self.gravity_ms == 0 {
            return Err(ConfigError::ZeroGravityInterval);
        }
        if self.pieces.is_empty() {
            return Err(ConfigError::EmptyPieceSet);
        }
        Ok(())
    }

    pub fn with_size(mut self, width: u8, height: u8) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_seed(mut self, seed: u32) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_gravity_ms(mut self, gravity_ms: u32) -> Self {
        self.gravity_ms = gravity_ms;
        self
    }
}

/// Parse a string of piece letters into a de-duplicated set.
///
/// Whitespace and commas are ignored, so `"I,O,T"` and `"iot"` are equivalent.
pub fn parse_piece_set(letters: &str) -> Result<ArrayVec<PieceKind, 7>, ConfigError> {
    let mut set = ArrayVec::new();
    for c in letters.chars().filter(|c| !c.is_whitespace() && *c != ',') {
        let kind = PieceKind::from_char(c).ok_or(ConfigError::UnknownPiece(c))?;
        if !set.contains(&kind) {
            set.push(kind);
        }
    }
    if set.is_empty() {
        return Err(ConfigError::EmptyPieceSet);
    }
    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = GameConfig::default();
        assert_eq!(config.width, 12);
        assert_eq!(config.height, 20);
        assert_eq!(config.pieces.len(), 7);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_dimensions_are_rejected() {
        let config = GameConfig::default().with_size(0, 20);
        assert_eq!(
            config.validate(),
            Err(ConfigError::ZeroDimension {
                width: 0,
                height: 20
            })
        );
    }

    #[test]
    fn zero_gravity_is_rejected() {
        let config = GameConfig::default().with_gravity_ms(0);
        assert_eq!(config.validate(), Err(ConfigError::ZeroGravityInterval));
    }

    #[test]
    fn piece_set_parsing() {
        let set = parse_piece_set("i, o,T,t").unwrap();
        assert_eq!(set.as_slice(), &[PieceKind::I, PieceKind::O, PieceKind::T]);
        assert_eq!(parse_piece_set("IX"), Err(ConfigError::UnknownPiece('X')));
        assert_eq!(parse_piece_set(" , "), Err(ConfigError::EmptyPieceSet));
    }
}
