//! Deduplication engine: reconcile fetched entries with the cache and decide
//! what gets written.

mod gate;
mod reconcile;

pub use gate::gate;
pub use reconcile::{reconcile, Reconciliation};
