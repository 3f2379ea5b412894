//! One run: fetch feeds, deduplicate against the cache, write what is new.

use color_eyre::{eyre::eyre, Result};
use tracing::{debug, info};

use crate::cache::{self, scrub, CacheStorage, ScrubReport};
use crate::config::Config;
use crate::engine::{gate, reconcile, Reconciliation};
use crate::feed::{parse_feed, FeedEntries, FeedSource};
use crate::output::{OutputWriter, WriteReport};

/// Counters describing a completed run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
  /// Distinct entries across all feeds
  pub fetched: usize,
  /// Entries not seen before
  pub new: usize,
  /// Entries whose cache record was refreshed
  pub refreshed: usize,
  pub scrubbed: ScrubReport,
  pub output: WriteReport,
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
  /// The feeds had no entries at all; the cache was left alone.
  NoNews,
  Completed(RunStats),
}

/// Current time in epoch seconds.
pub fn unix_now() -> i64 {
  chrono::Utc::now().timestamp()
}

/// Drives a single fetch-deduplicate-write cycle.
pub struct Pipeline<F: FeedSource> {
  config: Config,
  source: F,
  storage: Box<dyn CacheStorage>,
  writer: OutputWriter,
  clock: fn() -> i64,
}

impl<F: FeedSource> Pipeline<F> {
  /// Build a pipeline from validated settings.
  pub fn new(config: Config, source: F) -> Result<Self> {
    let storage = cache::open(config.cache.as_deref());
    let writer = OutputWriter::new(
      config.output_path()?,
      config.handle.clone(),
      config.sleep_duration(),
    );

    Ok(Self {
      config,
      source,
      storage,
      writer,
      clock: unix_now,
    })
  }

  /// Use a different time source.
  #[cfg(test)]
  pub fn with_clock(mut self, clock: fn() -> i64) -> Self {
    self.clock = clock;
    self
  }

  /// Run once.
  ///
  /// Any feed that cannot be fetched or parsed aborts the run before the
  /// cache is touched.
  pub async fn run(&self) -> Result<RunOutcome> {
    let mut candidates = FeedEntries::new();
    for rss_url in &self.config.rss_urls {
      let data = self.source.fetch(rss_url).await?;
      let accepted = parse_feed(&data, &mut candidates)
        .map_err(|e| eyre!("Failed to parse RSS from {}: {}", rss_url, e))?;
      debug!(url = %rss_url, entries = accepted, "Parsed feed");
    }

    if candidates.is_empty() {
      info!("No news?");
      return Ok(RunOutcome::NoNews);
    }

    let now = (self.clock)();
    let fetched = candidates.len();

    let mut snapshot = self.storage.load()?;
    if snapshot.is_empty() {
      debug!("Starting from an empty cache");
    }
    let scrubbed = scrub(&mut snapshot, now);

    let Reconciliation {
      to_emit,
      cache,
      refreshed,
    } = reconcile(candidates, snapshot, now, self.config.cache_expiration);
    let new = to_emit.len();

    let to_write = gate(to_emit, self.config.cache_init);
    let output = if to_write.is_empty() {
      if self.config.cache_init && new > 0 {
        info!(new, "Cache init mode, not writing news");
      }
      WriteReport::default()
    } else {
      self.writer.write_all(&to_write).await?
    };

    self.storage.save(&cache)?;

    Ok(RunOutcome::Completed(RunStats {
      fetched,
      new,
      refreshed,
      scrubbed,
      output,
    }))
  }
}
