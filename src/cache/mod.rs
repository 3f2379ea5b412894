//! Expiring URL cache used to suppress already delivered entries.
//!
//! The cache maps each delivered entry URL to the epoch time at which its
//! record lapses. A run loads it, scrubs stale records, lets the engine
//! refresh or add records, and writes it back in one piece.

mod scrub;
mod snapshot;
mod storage;

pub use scrub::{scrub, ScrubReport};
pub use snapshot::CacheSnapshot;
#[cfg(test)]
pub use storage::FileStorage;
pub use storage::{open, CacheStorage};
