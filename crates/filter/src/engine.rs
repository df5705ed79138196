//! The filter engine: runs search chains against a membership vector on a
//! background thread.
//!
//! ## Concurrency model
//!
//! Exactly one scan thread per engine. [`FilterEngine::execute_search`]
//! spawns it; [`FilterEngine::cancel`] (or natural completion followed by
//! [`FilterEngine::wait`]) joins it. The membership vector sits behind an
//! `RwLock` shared between the engine handle and the scan thread; the scan
//! takes the write lock in strides of [`PROGRESS_STRIDE`] games so point
//! reads from other threads interleave between chunks rather than starve.
//!
//! Bulk mutations (`set_all`, `invert`, `resize`) force-stop a running scan
//! before touching the vector: they invalidate whatever the scan is reading
//! and writing, so the two must never overlap.
//!
//! One engine can be locked behind another: cancelling the first also
//! cancels and waits on the second, so destructive operations never race a
//! dependent filter that is still reading stale membership state.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock, Weak, mpsc};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use collection::{GameCollection, GameId};

use crate::membership::{MatchValue, MembershipVector};
use crate::observer::{EventSender, SearchEvent, SearchObserver};
use crate::search::{CancelToken, FilterOperator, Search};

/// Games scanned between progress reports.
const PROGRESS_STRIDE: usize = 1024;

/// State shared between the engine handle and its scan thread. Lock
/// cascades hold a `Weak` to this, never an `Arc`: the relation orders
/// shutdown, it does not extend lifetimes.
struct EngineShared {
    membership: RwLock<MembershipVector>,
    cancel: CancelToken,
    worker: Mutex<Option<JoinHandle<()>>>,
    /// Engine whose cancellation cascades from ours.
    dependent: Mutex<Option<Weak<EngineShared>>>,
    observers: RwLock<Vec<Arc<dyn SearchObserver>>>,
    games_searched: AtomicU64,
    search_millis: AtomicU64,
}

impl EngineShared {
    fn with_membership(membership: MembershipVector) -> Self {
        Self {
            membership: RwLock::new(membership),
            cancel: CancelToken::new(),
            worker: Mutex::new(None),
            dependent: Mutex::new(None),
            observers: RwLock::new(Vec::new()),
            games_searched: AtomicU64::new(0),
            search_millis: AtomicU64::new(0),
        }
    }

    fn is_running(&self) -> bool {
        self.worker
            .lock()
            .unwrap()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Stop a running scan and wait for it, then cascade into the dependent
    /// engine if one is registered and running. No-op when idle.
    fn halt(&self) {
        let handle = self.worker.lock().unwrap().take();
        if let Some(handle) = handle {
            self.cancel.request();
            let _ = handle.join();
        }
        let dependent = self
            .dependent
            .lock()
            .unwrap()
            .as_ref()
            .and_then(Weak::upgrade);
        if let Some(dependent) = dependent {
            if dependent.is_running() {
                dependent.halt();
            }
        }
    }

    fn notify_progress(&self, percent: u8) {
        for observer in self.observers.read().unwrap().iter() {
            observer.on_progress(percent);
        }
    }

    fn notify_finished(&self) {
        for observer in self.observers.read().unwrap().iter() {
            observer.on_finished();
        }
    }
}

/// A filter over one game collection.
///
/// Freshly constructed engines include every game. All methods take `&self`;
/// the engine is internally synchronized against its own scan thread, and
/// blocking calls (`cancel`, `wait`) say so explicitly.
pub struct FilterEngine {
    collection: Option<Arc<dyn GameCollection>>,
    shared: Arc<EngineShared>,
}

impl FilterEngine {
    /// Creates a filter over `collection` with every game included.
    pub fn new(collection: Arc<dyn GameCollection>) -> Self {
        let count = collection.count();
        Self {
            collection: Some(collection),
            shared: Arc::new(EngineShared::with_membership(MembershipVector::new(
                count, 1,
            ))),
        }
    }

    /// Creates a filter bound to no collection: zero games, every run
    /// trivially instantaneous. Useful as a placeholder before a collection
    /// is opened.
    pub fn detached() -> Self {
        Self {
            collection: None,
            shared: Arc::new(EngineShared::with_membership(MembershipVector::new(0, 1))),
        }
    }

    /// The collection this filter was created over, if any.
    pub fn collection(&self) -> Option<&Arc<dyn GameCollection>> {
        self.collection.as_ref()
    }

    // =========================================================================
    // Membership access
    // =========================================================================

    /// Number of games the filter tracks.
    pub fn size(&self) -> usize {
        self.shared.membership.read().unwrap().len()
    }

    /// Number of games currently included.
    pub fn count(&self) -> usize {
        self.shared.membership.read().unwrap().included()
    }

    /// Whether `game` is currently included.
    pub fn contains(&self, game: GameId) -> bool {
        self.shared.membership.read().unwrap().contains(game as usize)
    }

    /// Raw match value for `game`; 0 when excluded or out of range.
    pub fn value(&self, game: GameId) -> MatchValue {
        self.shared.membership.read().unwrap().get(game as usize)
    }

    /// Sets the match value for a single game.
    pub fn set(&self, game: GameId, value: MatchValue) {
        self.shared
            .membership
            .write()
            .unwrap()
            .set(game as usize, value);
    }

    /// Indices of all included games, in ascending order.
    pub fn included_games(&self) -> Vec<GameId> {
        let membership = self.shared.membership.read().unwrap();
        (0..membership.len())
            .filter(|&index| membership.contains(index))
            .map(|index| index as GameId)
            .collect()
    }

    /// Sets every game to `value`, stopping any running scan first.
    pub fn set_all(&self, value: MatchValue) {
        self.shared.halt();
        self.shared.membership.write().unwrap().fill(value);
    }

    /// Flips included<->excluded for every game, stopping any running scan
    /// first.
    pub fn invert(&self) {
        self.shared.halt();
        self.shared.membership.write().unwrap().invert();
    }

    /// Resynchronizes the filter with a collection that grew or shrank to
    /// `new_size`, including or excluding appended games per `include_new`.
    /// Stops any running scan first.
    pub fn resize(&self, new_size: usize, include_new: bool) {
        self.shared.halt();
        self.shared
            .membership
            .write()
            .unwrap()
            .resize(new_size, include_new);
    }

    // =========================================================================
    // Search execution
    // =========================================================================

    /// Starts a search chain on the background thread and returns
    /// immediately.
    ///
    /// `operator` applies to the first node; each node then names the
    /// operator for its successor, so one chain can mix And/Or/Remove
    /// stages. A `Replace` start bulk-clears the vector first (stopping any
    /// running scan in the process). An empty chain is legal: the run
    /// reports 100% and finishes normally.
    ///
    /// If a previous scan is still running by the time we get here, the new
    /// chain is dropped unevaluated; callers that want to restart must
    /// cancel first.
    pub fn execute_search(&self, chain: Option<Box<dyn Search>>, operator: FilterOperator) {
        if operator == FilterOperator::Replace {
            // A fresh filter grows from nothing; matches get set back in
            // one by one during the scan.
            self.set_all(0);
        }

        let mut slot = self.shared.worker.lock().unwrap();
        if let Some(handle) = slot.take() {
            if handle.is_finished() {
                let _ = handle.join();
            } else {
                *slot = Some(handle);
                warn!("search requested while a scan is running; dropping the new chain");
                return;
            }
        }

        debug!(?operator, "starting search chain");
        self.shared.cancel.clear();
        self.shared.games_searched.store(0, Ordering::Relaxed);
        self.shared.search_millis.store(0, Ordering::Relaxed);

        let shared = Arc::clone(&self.shared);
        *slot = Some(thread::spawn(move || run_chain(shared, chain, operator)));
    }

    /// Whether a scan is currently running.
    pub fn is_running(&self) -> bool {
        self.shared.is_running()
    }

    /// Stops a running scan and blocks until the scan thread has exited,
    /// then cancels and waits on the locked engine, if any, the same way.
    /// No-op when idle.
    pub fn cancel(&self) {
        self.shared.halt();
    }

    /// Blocks until the current run ends, without cancelling it. No-op when
    /// idle.
    pub fn wait(&self) {
        let handle = self.shared.worker.lock().unwrap().take();
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }

    // =========================================================================
    // Observers and the lock relation
    // =========================================================================

    /// Registers an observer for progress and completion events.
    pub fn add_observer(&self, observer: Arc<dyn SearchObserver>) {
        self.shared.observers.write().unwrap().push(observer);
    }

    /// Convenience wrapper around [`add_observer`](Self::add_observer):
    /// subscribes a channel and returns its receiving end.
    pub fn subscribe(&self) -> mpsc::Receiver<SearchEvent> {
        let (tx, rx) = mpsc::channel();
        self.add_observer(Arc::new(EventSender::new(tx)));
        rx
    }

    /// Locks `dependent` behind this engine: cancelling this engine will
    /// also cancel and wait on `dependent`. The relation is non-owning (the
    /// dependent may be dropped freely) and one level deep; `dependent`
    /// handles its own further cascades.
    pub fn lock(&self, dependent: &FilterEngine) {
        *self.shared.dependent.lock().unwrap() = Some(Arc::downgrade(&dependent.shared));
    }

    /// Clears the lock relation.
    pub fn unlock(&self) {
        *self.shared.dependent.lock().unwrap() = None;
    }

    // =========================================================================
    // Run statistics
    // =========================================================================

    /// Games evaluated by the most recent run.
    pub fn games_searched(&self) -> u64 {
        self.shared.games_searched.load(Ordering::Relaxed)
    }

    /// Wall-clock duration of the most recent run.
    pub fn search_time(&self) -> Duration {
        Duration::from_millis(self.shared.search_millis.load(Ordering::Relaxed))
    }
}

impl Clone for FilterEngine {
    /// An independent filter with the same membership contents. Transient
    /// state (running scan, observers, lock relation, counters) is not
    /// carried over.
    fn clone(&self) -> Self {
        let membership = self.shared.membership.read().unwrap().clone();
        Self {
            collection: self.collection.clone(),
            shared: Arc::new(EngineShared::with_membership(membership)),
        }
    }
}

impl Drop for FilterEngine {
    fn drop(&mut self) {
        self.cancel();
    }
}

// =============================================================================
// The scan loop
// =============================================================================

/// Walks a search chain node by node. Runs on the scan thread.
fn run_chain(shared: Arc<EngineShared>, chain: Option<Box<dyn Search>>, first_op: FilterOperator) {
    let started = Instant::now();
    let mut next = chain;
    let mut operator = first_op;

    while let Some(mut search) = next {
        if shared.cancel.is_cancelled() {
            break;
        }
        run_node(&shared, search.as_mut(), operator);
        operator = search.chain_operator();
        next = search.next_search();
        // `search` drops here: each node is released as soon as its scan is
        // over, and whatever remains of the chain drops with `next` on every
        // exit path.
    }

    shared
        .search_millis
        .store(started.elapsed().as_millis() as u64, Ordering::Relaxed);

    shared.notify_progress(100);
    if !shared.cancel.is_cancelled() {
        let (included, size) = {
            let membership = shared.membership.read().unwrap();
            (membership.included(), membership.len())
        };
        debug!(included, size, "search chain finished");
        shared.notify_finished();
    } else {
        debug!("search chain cancelled");
    }
}

/// Scans every game once for a single chain node.
fn run_node(shared: &EngineShared, search: &mut dyn Search, operator: FilterOperator) {
    search.prepare(&shared.cancel);

    let size = shared.membership.read().unwrap().len();
    let mut index = 0;

    while index < size {
        if shared.cancel.is_cancelled() {
            break;
        }
        let stride_end = (index + PROGRESS_STRIDE).min(size);
        let scanned = {
            let mut membership = shared.membership.write().unwrap();
            let from = index;
            while index < stride_end && !shared.cancel.is_cancelled() {
                evaluate(&mut membership, search, operator, index);
                index += 1;
            }
            index - from
        };
        shared
            .games_searched
            .fetch_add(scanned as u64, Ordering::Relaxed);
        shared.notify_progress((index * 100 / size) as u8);
    }
}

/// Applies one search result to one membership entry.
fn evaluate(
    membership: &mut MembershipVector,
    search: &dyn Search,
    operator: FilterOperator,
    index: usize,
) {
    let game = index as GameId;
    match operator {
        FilterOperator::Replace => {
            membership.set(index, search.matches(game));
        }
        FilterOperator::And => {
            if membership.contains(index) {
                let value = search.matches(game);
                // An exact confirmation (1) leaves the stored strength
                // alone; any other value, better quality or no match,
                // replaces it.
                if value != 1 {
                    membership.set(index, value);
                }
            }
        }
        FilterOperator::Or => {
            if !membership.contains(index) {
                let value = search.matches(game);
                if value != 0 {
                    membership.set(index, value);
                }
            }
        }
        FilterOperator::Remove => {
            if membership.contains(index) && search.matches(game) != 0 {
                membership.set(index, 0);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedCollection(usize);

    impl GameCollection for FixedCollection {
        fn count(&self) -> usize {
            self.0
        }
    }

    /// Search driven by a fixed per-game match table; 0 past the table end.
    struct TableSearch {
        table: Vec<MatchValue>,
    }

    impl TableSearch {
        fn new(table: &[MatchValue]) -> Self {
            Self {
                table: table.to_vec(),
            }
        }
    }

    impl Search for TableSearch {
        fn matches(&self, game: GameId) -> MatchValue {
            self.table.get(game as usize).copied().unwrap_or(0)
        }
    }

    fn engine_with_membership(values: &[MatchValue]) -> FilterEngine {
        let engine = FilterEngine::new(Arc::new(FixedCollection(values.len())));
        for (index, &value) in values.iter().enumerate() {
            engine.set(index as GameId, value);
        }
        engine
    }

    fn run(engine: &FilterEngine, table: &[MatchValue], operator: FilterOperator) {
        engine.execute_search(Some(Box::new(TableSearch::new(table))), operator);
        engine.wait();
    }

    fn values(engine: &FilterEngine) -> Vec<MatchValue> {
        (0..engine.size() as GameId).map(|g| engine.value(g)).collect()
    }

    #[test]
    fn test_new_engine_includes_everything() {
        let engine = FilterEngine::new(Arc::new(FixedCollection(10)));
        assert_eq!(engine.size(), 10);
        assert_eq!(engine.count(), 10);
        assert!(engine.contains(9));
        assert!(!engine.contains(10));
    }

    #[test]
    fn test_detached_engine_is_empty() {
        let engine = FilterEngine::detached();
        assert_eq!(engine.size(), 0);
        assert_eq!(engine.count(), 0);
        assert!(engine.collection().is_none());
    }

    #[test]
    fn test_replace_semantics() {
        let engine = engine_with_membership(&[1, 1, 0]);
        run(&engine, &[0, 2, 1], FilterOperator::Replace);
        assert_eq!(values(&engine), vec![0, 2, 1]);
        assert_eq!(engine.count(), 2);
    }

    #[test]
    fn test_and_semantics() {
        let engine = engine_with_membership(&[1, 1, 0]);
        run(&engine, &[0, 1, 1], FilterOperator::And);
        // 0 cleared (predicate disagreed), 1 confirmed, 2 untouched because
        // it was excluded going in.
        assert_eq!(values(&engine), vec![0, 1, 0]);
    }

    #[test]
    fn test_and_upgrades_match_quality() {
        let engine = engine_with_membership(&[1, 1]);
        run(&engine, &[3, 1], FilterOperator::And);
        assert_eq!(values(&engine), vec![3, 1]);
        assert_eq!(engine.count(), 2);
    }

    #[test]
    fn test_or_semantics() {
        let engine = engine_with_membership(&[1, 1, 0]);
        run(&engine, &[0, 1, 1], FilterOperator::Or);
        // Included games keep their state regardless of this predicate.
        assert_eq!(values(&engine), vec![1, 1, 1]);
    }

    #[test]
    fn test_remove_semantics() {
        let engine = engine_with_membership(&[1, 1, 0]);
        run(&engine, &[1, 0, 1], FilterOperator::Remove);
        assert_eq!(values(&engine), vec![0, 1, 0]);
    }

    #[test]
    fn test_empty_chain_finishes_normally() {
        let engine = FilterEngine::new(Arc::new(FixedCollection(3)));
        let events = engine.subscribe();
        engine.execute_search(None, FilterOperator::And);
        engine.wait();

        let received: Vec<_> = events.try_iter().collect();
        assert!(received.contains(&SearchEvent::Progress(100)));
        assert!(received.contains(&SearchEvent::Finished));
        assert_eq!(engine.count(), 3);
    }

    #[test]
    fn test_replace_with_empty_chain_clears_filter() {
        let engine = FilterEngine::new(Arc::new(FixedCollection(3)));
        engine.execute_search(None, FilterOperator::Replace);
        engine.wait();
        assert_eq!(engine.count(), 0);
    }

    #[test]
    fn test_zero_game_collection_runs_instantly() {
        let engine = FilterEngine::new(Arc::new(FixedCollection(0)));
        let events = engine.subscribe();
        engine.execute_search(
            Some(Box::new(TableSearch::new(&[]))),
            FilterOperator::Replace,
        );
        engine.wait();
        let received: Vec<_> = events.try_iter().collect();
        assert_eq!(
            received,
            vec![SearchEvent::Progress(100), SearchEvent::Finished]
        );
    }

    #[test]
    fn test_double_cancel_is_noop() {
        let engine = FilterEngine::new(Arc::new(FixedCollection(5)));
        engine.cancel();
        engine.cancel();
        assert!(!engine.is_running());
    }

    #[test]
    fn test_clone_resets_transient_state() {
        let engine = engine_with_membership(&[1, 0, 2]);
        let copy = engine.clone();
        assert_eq!(values(&copy), vec![1, 0, 2]);
        assert_eq!(copy.count(), 2);
        assert!(!copy.is_running());

        // Independent vectors: mutating one leaves the other alone.
        copy.set(1, 1);
        assert!(!engine.contains(1));
    }

    #[test]
    fn test_counters_describe_last_run() {
        let engine = FilterEngine::new(Arc::new(FixedCollection(100)));
        run(&engine, &[1; 100], FilterOperator::And);
        assert_eq!(engine.games_searched(), 100);
    }
}
