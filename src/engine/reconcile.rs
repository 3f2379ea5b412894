//! Splitting fetched entries into new and already delivered ones.

use tracing::{debug, warn};

use crate::cache::CacheSnapshot;
use crate::feed::FeedEntries;

/// Outcome of reconciling a run's entries against the cache.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
  /// Entries not present in the cache
  pub to_emit: FeedEntries,
  /// Input cache with an expiration of `now + ttl` for every URL seen
  pub cache: CacheSnapshot,
  /// Number of entries that were already cached
  pub refreshed: usize,
}

/// Reconcile `parsed` against a scrubbed `cache`.
///
/// Known URLs get their expiration refreshed and are left out of `to_emit`.
/// Unknown URLs go to `to_emit` and get a fresh record. Every entry is handled
/// independently, so the result does not depend on iteration order.
pub fn reconcile(
  parsed: FeedEntries,
  mut cache: CacheSnapshot,
  now: i64,
  ttl: i64,
) -> Reconciliation {
  let expiration = now.saturating_add(ttl);
  let mut to_emit = FeedEntries::new();
  let mut refreshed = 0;

  for entry in parsed {
    if entry.url.is_empty() {
      warn!(title = %entry.title, "Ignoring entry without URL");
      continue;
    }

    if cache.contains(&entry.url) {
      debug!("Key {} found in cache", entry.url);
      refreshed += 1;
    } else {
      to_emit.insert(entry.clone());
    }
    cache.insert(entry.url, expiration);
  }

  Reconciliation {
    to_emit,
    cache,
    refreshed,
  }
}
