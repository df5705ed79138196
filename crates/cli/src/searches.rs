//! Header-based searches for the demo CLI.
//!
//! These are collaborators of the binary, not engine features: each one
//! reads a shared [`GameStore`] and reports a match value per game. The
//! engine neither knows nor cares what the predicates look at.

use collection::{GameId, GameResult, GameStore};
use filter::{MatchValue, Search};
use std::sync::Arc;

/// Matches games where the average rating reaches a floor.
///
/// Reports quality: 2 when *both* players clear the floor, 1 when only the
/// average does.
pub struct EloSearch {
    store: Arc<GameStore>,
    min_elo: u16,
}

impl EloSearch {
    pub fn new(store: Arc<GameStore>, min_elo: u16) -> Self {
        Self { store, min_elo }
    }
}

impl Search for EloSearch {
    fn matches(&self, game: GameId) -> MatchValue {
        let Some(header) = self.store.get(game) else {
            return 0;
        };
        match (header.white_elo, header.black_elo, header.average_elo()) {
            (Some(w), Some(b), _) if w >= self.min_elo && b >= self.min_elo => 2,
            (_, _, Some(avg)) if avg >= self.min_elo => 1,
            _ => 0,
        }
    }
}

/// Matches games with a specific result.
pub struct ResultSearch {
    store: Arc<GameStore>,
    result: GameResult,
}

impl ResultSearch {
    pub fn new(store: Arc<GameStore>, result: GameResult) -> Self {
        Self { store, result }
    }
}

impl Search for ResultSearch {
    fn matches(&self, game: GameId) -> MatchValue {
        match self.store.get(game) {
            Some(header) if header.result == self.result => 1,
            _ => 0,
        }
    }
}

/// Matches games whose ECO code starts with a prefix ("B9", "C", ...).
pub struct EcoSearch {
    store: Arc<GameStore>,
    prefix: String,
}

impl EcoSearch {
    pub fn new(store: Arc<GameStore>, prefix: impl Into<String>) -> Self {
        Self {
            store,
            prefix: prefix.into(),
        }
    }
}

impl Search for EcoSearch {
    fn matches(&self, game: GameId) -> MatchValue {
        match self.store.get(game).and_then(|h| h.eco.as_deref()) {
            Some(eco) if eco.starts_with(&self.prefix) => 1,
            _ => 0,
        }
    }
}

/// Matches games at least `min_plies` half-moves long.
pub struct PlyCountSearch {
    store: Arc<GameStore>,
    min_plies: u16,
}

impl PlyCountSearch {
    pub fn new(store: Arc<GameStore>, min_plies: u16) -> Self {
        Self { store, min_plies }
    }
}

impl Search for PlyCountSearch {
    fn matches(&self, game: GameId) -> MatchValue {
        match self.store.get(game) {
            Some(header) if header.ply_count >= self.min_plies => 1,
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use collection::GameHeader;

    fn store() -> Arc<GameStore> {
        Arc::new(GameStore::from_games(vec![
            GameHeader {
                white: "A".to_string(),
                black: "B".to_string(),
                white_elo: Some(2700),
                black_elo: Some(2650),
                result: GameResult::WhiteWin,
                year: Some(2021),
                eco: Some("B92".to_string()),
                ply_count: 85,
            },
            GameHeader {
                white: "C".to_string(),
                black: "D".to_string(),
                white_elo: Some(2700),
                black_elo: Some(2100),
                result: GameResult::Draw,
                year: None,
                eco: Some("C42".to_string()),
                ply_count: 30,
            },
            GameHeader {
                white: "E".to_string(),
                black: "F".to_string(),
                white_elo: None,
                black_elo: None,
                result: GameResult::Unknown,
                year: None,
                eco: None,
                ply_count: 12,
            },
        ]))
    }

    #[test]
    fn test_elo_search_reports_quality() {
        let search = EloSearch::new(store(), 2300);
        assert_eq!(search.matches(0), 2); // both above the floor
        assert_eq!(search.matches(1), 1); // only the average clears it
        assert_eq!(search.matches(2), 0); // unrated
        assert_eq!(search.matches(99), 0); // out of range
    }

    #[test]
    fn test_result_search() {
        let search = ResultSearch::new(store(), GameResult::Draw);
        assert_eq!(search.matches(0), 0);
        assert_eq!(search.matches(1), 1);
    }

    #[test]
    fn test_eco_prefix_search() {
        let search = EcoSearch::new(store(), "B9");
        assert_eq!(search.matches(0), 1);
        assert_eq!(search.matches(1), 0);
        assert_eq!(search.matches(2), 0); // no ECO tag
    }

    #[test]
    fn test_ply_count_search() {
        let search = PlyCountSearch::new(store(), 40);
        assert_eq!(search.matches(0), 1);
        assert_eq!(search.matches(1), 0);
    }
}
