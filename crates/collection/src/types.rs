//! Core domain types for a game collection.
//!
//! A collection is an indexed, fixed-order sequence of game headers. Games
//! are addressed by a zero-based `GameId`; the filter layer only ever talks
//! about games through that index.

use serde::{Deserialize, Serialize};

/// Zero-based index of a game inside its collection.
pub type GameId = u32;

/// Outcome of a game, as recorded in its header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameResult {
    WhiteWin,
    Draw,
    BlackWin,
    /// Unfinished, unrecorded, or otherwise unknown ("*").
    Unknown,
}

impl GameResult {
    /// Conventional notation for this result ("1-0", "1/2-1/2", ...).
    pub fn as_str(&self) -> &'static str {
        match self {
            GameResult::WhiteWin => "1-0",
            GameResult::Draw => "1/2-1/2",
            GameResult::BlackWin => "0-1",
            GameResult::Unknown => "*",
        }
    }
}

/// Header metadata for a single stored game.
///
/// Optional fields are simply absent in many real exports; `None` here means
/// the header did not carry the tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameHeader {
    pub white: String,
    pub black: String,
    pub white_elo: Option<u16>,
    pub black_elo: Option<u16>,
    pub result: GameResult,
    pub year: Option<u16>,
    /// ECO opening code, e.g. "B92".
    pub eco: Option<String>,
    /// Length of the game in plies (half-moves).
    pub ply_count: u16,
}

impl GameHeader {
    /// Average of both players' ratings, if both are known.
    pub fn average_elo(&self) -> Option<u16> {
        match (self.white_elo, self.black_elo) {
            (Some(w), Some(b)) => Some(((w as u32 + b as u32) / 2) as u16),
            _ => None,
        }
    }
}
