mod cache;
mod config;
mod engine;
mod feed;
mod logging;
mod output;
mod pipeline;

use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;
use tracing::info;

use crate::config::{Config, FileConfig};
use crate::feed::HttpFeedSource;
use crate::pipeline::{Pipeline, RunOutcome};

#[derive(Parser, Debug, Default)]
#[command(name = "rss2irc")]
#[command(about = "Fetch RSS feeds and append new entries to a file read by an IRC bot")]
#[command(version)]
struct Args {
  /// Path to config file (default: ./rss2irc.yaml or $XDG_CONFIG_HOME/rss2irc/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Increase logging verbosity
  #[arg(short, long)]
  verbose: bool,

  /// URL of RSS feed (repeatable)
  #[arg(long = "rss-url", value_name = "URL")]
  rss_urls: Vec<String>,

  /// HTTP timeout in seconds [default: 30]
  #[arg(long, value_name = "SECS")]
  rss_http_timeout: Option<u64>,

  /// IRC handle of this feed
  #[arg(long)]
  handle: Option<String>,

  /// Where to output formatted news; must already exist
  #[arg(long)]
  output: Option<PathBuf>,

  /// Path to cache file; caching is disabled without it
  #[arg(long)]
  cache: Option<PathBuf>,

  /// Time, in seconds, for how long to keep items in cache [default: 86400]
  #[arg(long, value_name = "SECS", allow_negative_numbers = true)]
  cache_expiration: Option<i64>,

  /// Prevents posting news to IRC. This is useful when bootstrapping new RSS feed
  #[arg(long)]
  cache_init: bool,

  /// Sleep between messages in order to avoid Excess Flood at IRC [default: 2]
  #[arg(long, value_name = "SECS")]
  sleep: Option<u64>,

  /// Also write logs to this file
  #[arg(long)]
  log_file: Option<PathBuf>,
}

impl Args {
  /// Overlay command line arguments on top of the config file.
  fn into_config(self, file: FileConfig) -> Config {
    let base = Config::from(file);
    Config {
      rss_urls: if self.rss_urls.is_empty() {
        base.rss_urls
      } else {
        self.rss_urls
      },
      rss_http_timeout: self.rss_http_timeout.unwrap_or(base.rss_http_timeout),
      handle: self.handle.or(base.handle),
      output: self.output.or(base.output),
      cache: self.cache.or(base.cache),
      cache_expiration: self.cache_expiration.unwrap_or(base.cache_expiration),
      cache_init: self.cache_init || base.cache_init,
      sleep: self.sleep.unwrap_or(base.sleep),
      log_file: self.log_file.or(base.log_file),
      verbose: self.verbose || base.verbose,
    }
  }
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let file = FileConfig::load(args.config.as_deref())?;
  let config = args.into_config(file);

  let _guard = logging::init(config.verbose, config.log_file.as_deref())?;

  config.validate()?;

  let source = HttpFeedSource::new(config.http_timeout())?;
  let pipeline = Pipeline::new(config, source)?;

  if let RunOutcome::Completed(stats) = pipeline.run().await? {
    info!(
      fetched = stats.fetched,
      new = stats.new,
      refreshed = stats.refreshed,
      expired = stats.scrubbed.expired,
      malformed = stats.scrubbed.malformed,
      written = stats.output.written.len(),
      dropped = stats.output.dropped.len(),
      unconfirmed = stats.output.unconfirmed.len(),
      "Run complete"
    );
  }

  Ok(())
}
