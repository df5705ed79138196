//! # Filter Crate
//!
//! A filter over an indexed game collection: a per-game membership vector
//! plus an engine that computes it by running predicate chains on a
//! background thread.
//!
//! ## Components
//!
//! - **membership**: [`MembershipVector`]: match value per game and a
//!   maintained included-count
//! - **search**: the [`Search`] trait, [`FilterOperator`] composition
//!   operators, and chain building
//! - **engine**: [`FilterEngine`]: asynchronous execution, cooperative
//!   cancellation, and the engine-to-engine lock relation
//! - **observer**: progress/completion notifications
//!
//! ## Example Usage
//!
//! ```ignore
//! use filter::{FilterEngine, FilterOperator, SearchEvent};
//! use std::sync::Arc;
//!
//! let engine = FilterEngine::new(store.clone());
//! let events = engine.subscribe();
//!
//! engine.execute_search(Some(Box::new(my_search)), FilterOperator::Replace);
//! for event in events.iter() {
//!     match event {
//!         SearchEvent::Progress(pct) => println!("{pct}%"),
//!         SearchEvent::Finished => break,
//!     }
//! }
//! println!("{} of {} games match", engine.count(), engine.size());
//! ```
//!
//! A run ends either naturally (the `Finished` event fires) or through
//! [`FilterEngine::cancel`], which blocks until the scan thread has stopped
//! and emits no completion event. Whatever the scan wrote before the cancel
//! sticks: cancellation stops soon, it does not undo.

// Public modules
pub mod engine;
pub mod membership;
pub mod observer;
pub mod search;

// Re-export main types
pub use engine::FilterEngine;
pub use membership::{MatchValue, MembershipVector};
pub use observer::{EventSender, SearchEvent, SearchObserver};
pub use search::{CancelToken, ChainedSearch, FilterOperator, Search};
