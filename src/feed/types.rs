//! Feed entry model.

use std::collections::btree_map::{self, BTreeMap};

/// A single feed item, identified by its URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEntry {
  pub url: String,
  pub title: String,
  pub category: Option<String>,
}

impl FeedEntry {
  /// Build an entry, collapsing whitespace and control characters in the title
  /// so that the entry always formats to a single output line.
  pub fn new(url: impl Into<String>, title: &str, category: Option<&str>) -> Self {
    Self {
      url: url.into().trim().to_string(),
      title: collapse_whitespace(title),
      category: category
        .map(collapse_whitespace)
        .filter(|c| !c.is_empty()),
    }
  }
}

fn collapse_whitespace(s: &str) -> String {
  s.split(|c: char| c.is_whitespace() || c.is_control())
    .filter(|part| !part.is_empty())
    .collect::<Vec<_>>()
    .join(" ")
}

/// Candidate entries of one run, keyed by URL.
///
/// Several feeds contributing the same URL collapse into one entry; the last
/// insert wins. Iteration is in ascending URL order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedEntries {
  entries: BTreeMap<String, FeedEntry>,
}

impl FeedEntries {
  pub fn new() -> Self {
    Self::default()
  }

  /// Insert an entry, replacing any previous entry with the same URL.
  pub fn insert(&mut self, entry: FeedEntry) -> Option<FeedEntry> {
    self.entries.insert(entry.url.clone(), entry)
  }

  #[cfg(test)]
  pub fn contains(&self, url: &str) -> bool {
    self.entries.contains_key(url)
  }

  #[cfg(test)]
  pub fn get(&self, url: &str) -> Option<&FeedEntry> {
    self.entries.get(url)
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn iter(&self) -> btree_map::Values<'_, String, FeedEntry> {
    self.entries.values()
  }
}

impl FromIterator<FeedEntry> for FeedEntries {
  fn from_iter<I: IntoIterator<Item = FeedEntry>>(iter: I) -> Self {
    let mut entries = Self::new();
    for entry in iter {
      entries.insert(entry);
    }
    entries
  }
}

impl IntoIterator for FeedEntries {
  type Item = FeedEntry;
  type IntoIter = btree_map::IntoValues<String, FeedEntry>;

  fn into_iter(self) -> Self::IntoIter {
    self.entries.into_values()
  }
}

impl<'a> IntoIterator for &'a FeedEntries {
  type Item = &'a FeedEntry;
  type IntoIter = btree_map::Values<'a, String, FeedEntry>;

  fn into_iter(self) -> Self::IntoIter {
    self.entries.values()
  }
}
