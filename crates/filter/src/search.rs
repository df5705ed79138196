//! The search interface: predicates the engine evaluates per game, chained
//! with a composition operator per stage.

use crate::membership::MatchValue;
use collection::GameId;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// How one search stage combines with the membership state left by the
/// stages before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOperator {
    /// Start a fresh filter: every game is re-evaluated from scratch.
    Replace,
    /// Keep a game only if it was already included and still matches.
    And,
    /// Add games that were excluded but match this stage.
    Or,
    /// Strict subtraction: drop included games that match this stage.
    Remove,
}

/// Shared view of a run's cancel flag.
///
/// Cloning is cheap; every clone observes the same flag. The engine hands a
/// token to each search's [`Search::prepare`] so that expensive
/// precomputation can bail out early, and polls it itself once per game
/// inside the scan loop.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the run to stop at the next per-game check.
    pub fn request(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// Re-arm the token for a new run.
    pub fn clear(&self) {
        self.flag.store(false, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// A per-game predicate, optionally chained to a follow-up search.
///
/// Implementations are trusted to be pure functions of the game index; all
/// membership mutation belongs to the engine's scan loop. A chain is walked
/// strictly in order: after a node's scan completes, the engine detaches the
/// next node with [`next_search`](Search::next_search) and applies it under
/// the operator this node reports from
/// [`chain_operator`](Search::chain_operator).
pub trait Search: Send {
    /// One-time setup before the scan starts, e.g. opening an index or
    /// precomputing tables. Poll `cancel` during anything expensive.
    fn prepare(&mut self, cancel: &CancelToken) {
        let _ = cancel;
    }

    /// Match strength for one game: 0 = no match, 1 = plain match, higher
    /// values encode match quality.
    fn matches(&self, game: GameId) -> MatchValue;

    /// Operator joining the *following* chain node to the membership state
    /// this node leaves behind.
    fn chain_operator(&self) -> FilterOperator {
        FilterOperator::And
    }

    /// Detach and return the next node in the chain, if any.
    fn next_search(&mut self) -> Option<Box<dyn Search>> {
        None
    }
}

impl Search for Box<dyn Search> {
    fn prepare(&mut self, cancel: &CancelToken) {
        (**self).prepare(cancel)
    }

    fn matches(&self, game: GameId) -> MatchValue {
        (**self).matches(game)
    }

    fn chain_operator(&self) -> FilterOperator {
        (**self).chain_operator()
    }

    fn next_search(&mut self) -> Option<Box<dyn Search>> {
        (**self).next_search()
    }
}

/// Glues a follow-up node onto any search, forming a chain link.
///
/// The head's own successor (if it had one) is shadowed: this adapter decides
/// both the follow-up node and the operator that joins it. Build chains back
/// to front:
///
/// ```ignore
/// let chain = ChainedSearch::new(
///     EloSearch::new(store.clone(), 2600),
///     FilterOperator::And,
///     EcoSearch::new(store.clone(), "B9"),
/// );
/// engine.execute_search(Some(Box::new(chain)), FilterOperator::Replace);
/// ```
pub struct ChainedSearch<S: Search> {
    head: S,
    operator: FilterOperator,
    next: Option<Box<dyn Search>>,
}

impl<S: Search> ChainedSearch<S> {
    pub fn new(head: S, operator: FilterOperator, next: impl Search + 'static) -> Self {
        Self {
            head,
            operator,
            next: Some(Box::new(next)),
        }
    }
}

impl<S: Search> Search for ChainedSearch<S> {
    fn prepare(&mut self, cancel: &CancelToken) {
        self.head.prepare(cancel);
    }

    fn matches(&self, game: GameId) -> MatchValue {
        self.head.matches(game)
    }

    fn chain_operator(&self) -> FilterOperator {
        self.operator
    }

    fn next_search(&mut self) -> Option<Box<dyn Search>> {
        self.next.take()
    }
}
