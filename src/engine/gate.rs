//! Bootstrap gate in front of the output writer.

use crate::feed::FeedEntries;

/// Entries that should reach the output sink.
///
/// In bootstrap mode nothing is written; the cache has already recorded the
/// entries, so a new feed can be added without flooding the channel with its
/// backlog.
pub fn gate(to_emit: FeedEntries, bootstrap: bool) -> FeedEntries {
  if bootstrap {
    FeedEntries::new()
  } else {
    to_emit
  }
}
