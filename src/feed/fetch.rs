//! Network retrieval of raw feed documents.

use color_eyre::{eyre::eyre, Result};
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// A source of raw feed documents.
pub trait FeedSource {
  /// Fetch the document at `url` as text.
  fn fetch(&self, url: &str) -> impl Future<Output = Result<String>> + Send;
}

/// Feed source backed by an HTTP client.
#[derive(Clone)]
pub struct HttpFeedSource {
  client: reqwest::Client,
}

impl HttpFeedSource {
  /// Create a source whose requests give up after `timeout`.
  pub fn new(timeout: Duration) -> Result<Self> {
    Self::from_builder(reqwest::Client::builder(), timeout)
  }

  fn from_builder(builder: reqwest::ClientBuilder, timeout: Duration) -> Result<Self> {
    let client = builder
      .timeout(timeout)
      .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self { client })
  }
}

impl FeedSource for HttpFeedSource {
  async fn fetch(&self, url: &str) -> Result<String> {
    let response = self
      .client
      .get(url)
      .send()
      .await
      .and_then(|rsp| rsp.error_for_status())
      .map_err(|e| {
        debug!(url, error = ?e, "Failed to get RSS data");
        eyre!("Failed to get RSS from {}: {}", url, e)
      })?;

    let data = response
      .text()
      .await
      .map_err(|e| eyre!("Failed to read RSS from {}: {}", url, e))?;

    debug!(url, bytes = data.len(), "Got RSS data");
    Ok(data)
  }
}
