//! Session module - per-browser quiz state and its store.
//!
//! - `SessionState`: the question lock state machine, answers and cached results
//! - `SessionStore`: concurrent id → state map with idle eviction

mod state;
mod store;

pub use state::*;
pub use store::*;
