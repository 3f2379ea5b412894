use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Default HTTP timeout for a feed fetch, in seconds.
pub const DEFAULT_HTTP_TIMEOUT: u64 = 30;
/// Default lifetime of a cache record, in seconds.
pub const DEFAULT_CACHE_EXPIRATION: i64 = 86400;
/// Default pause between output lines, in seconds.
pub const DEFAULT_SLEEP: u64 = 2;

/// Settings read from a YAML config file. Every field is optional and is
/// overridden by the matching command line argument.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
  pub rss_urls: Vec<String>,
  pub rss_http_timeout: Option<u64>,
  pub handle: Option<String>,
  pub output: Option<PathBuf>,
  pub cache: Option<PathBuf>,
  pub cache_expiration: Option<i64>,
  pub cache_init: bool,
  pub sleep: Option<u64>,
  pub log_file: Option<PathBuf>,
  pub verbose: bool,
}

impl FileConfig {
  /// Load the config file, if any.
  ///
  /// Search order:
  /// 1. Explicit path if provided (must exist)
  /// 2. ./rss2irc.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/rss2irc/config.yaml
  ///
  /// Without a config file every setting comes from the command line.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Ok(Self::default()),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("rss2irc.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("rss2irc").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    let config: FileConfig = serde_yaml::from_str(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?;

    Ok(config)
  }
}

/// Resolved settings of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
  pub rss_urls: Vec<String>,
  /// Per-fetch HTTP timeout in seconds
  pub rss_http_timeout: u64,
  /// Tag prefix for output lines
  pub handle: Option<String>,
  pub output: Option<PathBuf>,
  /// Cache file; `None` disables caching
  pub cache: Option<PathBuf>,
  /// Lifetime of a cache record in seconds
  pub cache_expiration: i64,
  /// Seed the cache without writing any output
  pub cache_init: bool,
  /// Pause between output lines in seconds
  pub sleep: u64,
  pub log_file: Option<PathBuf>,
  pub verbose: bool,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      rss_urls: Vec::new(),
      rss_http_timeout: DEFAULT_HTTP_TIMEOUT,
      handle: None,
      output: None,
      cache: None,
      cache_expiration: DEFAULT_CACHE_EXPIRATION,
      cache_init: false,
      sleep: DEFAULT_SLEEP,
      log_file: None,
      verbose: false,
    }
  }
}

impl From<FileConfig> for Config {
  fn from(file: FileConfig) -> Self {
    let defaults = Config::default();
    Self {
      rss_urls: file.rss_urls,
      rss_http_timeout: file.rss_http_timeout.unwrap_or(defaults.rss_http_timeout),
      handle: file.handle,
      output: file.output,
      cache: file.cache,
      cache_expiration: file.cache_expiration.unwrap_or(defaults.cache_expiration),
      cache_init: file.cache_init,
      sleep: file.sleep.unwrap_or(defaults.sleep),
      log_file: file.log_file,
      verbose: file.verbose,
    }
  }
}

impl Config {
  /// Check the settings before any network or cache activity.
  pub fn validate(&self) -> Result<()> {
    if self.cache_expiration < 0 {
      return Err(eyre!("Cache expiration can't be less than 0."));
    }

    if self.rss_urls.is_empty() {
      return Err(eyre!("At least one RSS URL is required (--rss-url)."));
    }

    for rss_url in &self.rss_urls {
      let parsed = Url::parse(rss_url).map_err(|e| eyre!("Invalid RSS URL '{}': {}", rss_url, e))?;
      if !matches!(parsed.scheme(), "http" | "https") {
        return Err(eyre!("Unsupported RSS URL scheme '{}': {}", parsed.scheme(), rss_url));
      }
    }

    let output = self.output_path()?;
    if !output.exists() {
      return Err(eyre!("Output '{}' doesn't exist.", output.display()));
    }

    Ok(())
  }

  /// Output file path.
  pub fn output_path(&self) -> Result<&Path> {
    self
      .output
      .as_deref()
      .ok_or_else(|| eyre!("An output path is required (--output)."))
  }

  pub fn http_timeout(&self) -> Duration {
    Duration::from_secs(self.rss_http_timeout)
  }

  pub fn sleep_duration(&self) -> Duration {
    Duration::from_secs(self.sleep)
  }
}
