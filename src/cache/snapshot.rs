//! In-memory view of the persisted expiration cache.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::hash_map::{self, HashMap};

/// Expiration value of a cache record as it was stored.
///
/// Well-formed records hold an integer epoch time. Anything else read from
/// disk is kept as-is so the scrubber can drop it record by record instead of
/// failing the whole load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoredExpiration {
  Epoch(i64),
  Raw(Value),
}

impl StoredExpiration {
  /// Interpret the stored value as epoch seconds.
  ///
  /// Floats are truncated toward zero and numeric strings are accepted.
  pub fn epoch(&self) -> Option<i64> {
    match self {
      Self::Epoch(epoch) => Some(*epoch),
      Self::Raw(Value::Number(n)) => n.as_i64().or_else(|| {
        n.as_f64()
          .filter(|f| f.is_finite())
          .map(|f| f.trunc() as i64)
      }),
      Self::Raw(Value::String(s)) => s.trim().parse().ok(),
      Self::Raw(_) => None,
    }
  }
}

/// Mapping from entry URL to the time its record expires.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheSnapshot {
  records: HashMap<String, StoredExpiration>,
}

impl CacheSnapshot {
  pub fn new() -> Self {
    Self::default()
  }

  /// Set the expiration of `url`, creating the record if needed.
  pub fn insert(&mut self, url: impl Into<String>, expiration: i64) {
    self.records
      .insert(url.into(), StoredExpiration::Epoch(expiration));
  }

  pub fn remove(&mut self, url: &str) -> Option<StoredExpiration> {
    self.records.remove(url)
  }

  pub fn contains(&self, url: &str) -> bool {
    self.records.contains_key(url)
  }

  #[cfg(test)]
  pub fn get(&self, url: &str) -> Option<&StoredExpiration> {
    self.records.get(url)
  }

  #[cfg(test)]
  /// Expiration of `url` if the record exists and is well-formed.
  pub fn expiration(&self, url: &str) -> Option<i64> {
    self.get(url).and_then(StoredExpiration::epoch)
  }

  pub fn len(&self) -> usize {
    self.records.len()
  }

  pub fn is_empty(&self) -> bool {
    self.records.is_empty()
  }

  pub fn iter(&self) -> hash_map::Iter<'_, String, StoredExpiration> {
    self.records.iter()
  }
}

impl<K: Into<String>> FromIterator<(K, i64)> for CacheSnapshot {
  fn from_iter<I: IntoIterator<Item = (K, i64)>>(iter: I) -> Self {
    let mut snapshot = Self::new();
    for (url, expiration) in iter {
      snapshot.insert(url, expiration);
    }
    snapshot
  }
}
