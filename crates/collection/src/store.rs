//! In-memory game store and the collection interface the filter layer sees.
//!
//! The filter engine is deliberately ignorant of how games are stored; the
//! whole contract is `GameCollection::count()`. `GameStore` is the concrete
//! in-memory collection used by the CLI, tests, and benchmarks.

use crate::error::Result;
use crate::parser;
use crate::types::{GameHeader, GameId, GameResult};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// The filter layer's entire view of a collection: an ordered set of games
/// addressed by index in `[0, count)`.
pub trait GameCollection: Send + Sync {
    /// Number of games currently stored.
    fn count(&self) -> usize;
}

/// An in-memory, append-only sequence of game headers.
///
/// Indices are stable: once a game is pushed it keeps its `GameId` for the
/// lifetime of the store.
#[derive(Debug, Default)]
pub struct GameStore {
    games: Vec<GameHeader>,
}

impl GameStore {
    /// Creates a new, empty store.
    pub fn new() -> Self {
        Self { games: Vec::new() }
    }

    /// Builds a store from an already-assembled list of games.
    pub fn from_games(games: Vec<GameHeader>) -> Self {
        Self { games }
    }

    /// Loads a store from a tab-separated game file.
    ///
    /// See [`crate::parser`] for the line format.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let games = parser::load_game_file(path)?;
        Ok(Self { games })
    }

    /// Appends a game and returns its index.
    pub fn push(&mut self, game: GameHeader) -> GameId {
        self.games.push(game);
        (self.games.len() - 1) as GameId
    }

    /// Get a game header by index.
    pub fn get(&self, id: GameId) -> Option<&GameHeader> {
        self.games.get(id as usize)
    }

    pub fn len(&self) -> usize {
        self.games.len()
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }

    /// Aggregate statistics over the whole store, computed in parallel.
    pub fn stats(&self) -> StoreStats {
        // Per-game contribution: (white, draw, black, unknown, rated, elo_sum, ply_sum)
        let (white_wins, draws, black_wins, unknown_results, rated_games, elo_sum, ply_sum) = self
            .games
            .par_iter()
            .map(|game| {
                let (w, d, b, u) = match game.result {
                    GameResult::WhiteWin => (1usize, 0usize, 0usize, 0usize),
                    GameResult::Draw => (0, 1, 0, 0),
                    GameResult::BlackWin => (0, 0, 1, 0),
                    GameResult::Unknown => (0, 0, 0, 1),
                };
                let (rated, elo) = match game.average_elo() {
                    Some(avg) => (1usize, avg as u64),
                    None => (0, 0),
                };
                (w, d, b, u, rated, elo, game.ply_count as u64)
            })
            .reduce(
                || (0, 0, 0, 0, 0, 0u64, 0u64),
                |a, b| {
                    (
                        a.0 + b.0,
                        a.1 + b.1,
                        a.2 + b.2,
                        a.3 + b.3,
                        a.4 + b.4,
                        a.5 + b.5,
                        a.6 + b.6,
                    )
                },
            );

        let games = self.games.len();
        StoreStats {
            games,
            white_wins,
            draws,
            black_wins,
            unknown_results,
            rated_games,
            avg_elo: if rated_games > 0 {
                elo_sum as f32 / rated_games as f32
            } else {
                0.0
            },
            avg_ply_count: if games > 0 {
                ply_sum as f32 / games as f32
            } else {
                0.0
            },
        }
    }
}

impl GameCollection for GameStore {
    fn count(&self) -> usize {
        self.games.len()
    }
}

/// Aggregate statistics for a store.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StoreStats {
    pub games: usize,
    pub white_wins: usize,
    pub draws: usize,
    pub black_wins: usize,
    pub unknown_results: usize,
    /// Games where both players carry a rating.
    pub rated_games: usize,
    /// Mean of the per-game average Elo, over rated games only.
    pub avg_elo: f32,
    pub avg_ply_count: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(result: GameResult, elo: Option<u16>, plies: u16) -> GameHeader {
        GameHeader {
            white: "White".to_string(),
            black: "Black".to_string(),
            white_elo: elo,
            black_elo: elo,
            result,
            year: Some(2020),
            eco: None,
            ply_count: plies,
        }
    }

    #[test]
    fn test_push_assigns_sequential_ids() {
        let mut store = GameStore::new();
        assert_eq!(store.push(header(GameResult::Draw, None, 40)), 0);
        assert_eq!(store.push(header(GameResult::WhiteWin, None, 60)), 1);
        assert_eq!(store.count(), 2);
        assert_eq!(store.get(1).unwrap().result, GameResult::WhiteWin);
        assert!(store.get(2).is_none());
    }

    #[test]
    fn test_stats_aggregation() {
        let store = GameStore::from_games(vec![
            header(GameResult::WhiteWin, Some(2400), 80),
            header(GameResult::Draw, Some(2600), 40),
            header(GameResult::BlackWin, None, 60),
            header(GameResult::Unknown, None, 20),
        ]);

        let stats = store.stats();
        assert_eq!(stats.games, 4);
        assert_eq!(stats.white_wins, 1);
        assert_eq!(stats.draws, 1);
        assert_eq!(stats.black_wins, 1);
        assert_eq!(stats.unknown_results, 1);
        assert_eq!(stats.rated_games, 2);
        assert_eq!(stats.avg_elo, 2500.0);
        assert_eq!(stats.avg_ply_count, 50.0);
    }

    #[test]
    fn test_stats_on_empty_store() {
        let stats = GameStore::new().stats();
        assert_eq!(stats.games, 0);
        assert_eq!(stats.avg_elo, 0.0);
        assert_eq!(stats.avg_ply_count, 0.0);
    }
}
