//! RSS/Atom document parsing into feed entries.

use color_eyre::{eyre::eyre, Result};
use feed_rs::model::Entry;
use feed_rs::parser;
use tracing::debug;

use super::types::{FeedEntries, FeedEntry};

/// Parse a feed document and merge its entries into `entries`.
///
/// Entries without a usable link cannot be deduplicated and are skipped.
/// Returns the number of entries taken from this document.
pub fn parse_feed(data: &str, entries: &mut FeedEntries) -> Result<usize> {
  let feed = parser::parse(data.as_bytes()).map_err(|e| eyre!("Failed to parse feed: {}", e))?;

  let mut accepted = 0;
  for entry in &feed.entries {
    let url = select_entry_link(entry);
    let title = entry
      .title
      .as_ref()
      .map(|t| t.content.as_str())
      .unwrap_or_default();

    if url.is_empty() {
      debug!(id = %entry.id, title, "Skipping entry without link");
      continue;
    }

    let category = entry.categories.first().map(|c| c.term.as_str());
    entries.insert(FeedEntry::new(url, title, category));
    accepted += 1;
  }

  Ok(accepted)
}

/// URL identifying an entry.
///
/// Atom entries may carry several links; `enclosure`, `related` and friends
/// point at attachments rather than the article, so only a link without a
/// `rel` or with `rel="alternate"` is taken as the entry itself. Anything
/// else is a fallback, and an http(s) id is the last resort.
fn select_entry_link(entry: &Entry) -> String {
  let is_article = |rel: Option<&str>| {
    rel.map_or(true, |r| r.is_empty() || r.eq_ignore_ascii_case("alternate"))
  };

  let mut hrefs = entry
    .links
    .iter()
    .map(|link| (link.href.trim(), link.rel.as_deref()))
    .filter(|(href, _)| !href.is_empty());

  let fallback = hrefs.clone().next().map(|(href, _)| href);
  if let Some((href, _)) = hrefs.find(|(_, rel)| is_article(*rel)) {
    return href.to_string();
  }
  if let Some(href) = fallback {
    return href.to_string();
  }

  let id = entry.id.trim();
  if id.starts_with("http://") || id.starts_with("https://") {
    id.to_string()
  } else {
    String::new()
  }
}
