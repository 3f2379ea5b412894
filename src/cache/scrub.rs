//! Removal of expired and malformed cache records.

use tracing::{debug, error};

use super::snapshot::CacheSnapshot;

/// Counts of records removed by a scrub pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScrubReport {
  pub expired: usize,
  pub malformed: usize,
}

/// Drop every record that expired before `now` or whose expiration is not an
/// integer. Records expiring exactly at `now` are kept.
pub fn scrub(snapshot: &mut CacheSnapshot, now: i64) -> ScrubReport {
  let mut report = ScrubReport::default();
  let mut doomed = Vec::new();

  for (url, stored) in snapshot.iter() {
    match stored.epoch() {
      None => {
        error!(url = %url, value = ?stored, "Invalid cache entry will be removed");
        report.malformed += 1;
        doomed.push(url.clone());
      }
      Some(expiration) if expiration < now => {
        debug!("URL {} has expired.", url);
        report.expired += 1;
        doomed.push(url.clone());
      }
      Some(_) => {}
    }
  }

  for url in &doomed {
    snapshot.remove(url);
  }

  report
}
