//! Appending formatted entries to the file read by the IRC bot.

use color_eyre::{eyre::eyre, Result};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
#[cfg(unix)]
use tokio::net::unix::pipe;
use tracing::{debug, warn};

use crate::feed::{FeedEntries, FeedEntry};

/// Longest time a single line may take to be written before it is dropped.
pub const WRITE_TIMEOUT: Duration = Duration::from_secs(5);

/// Format one entry as an output line.
///
/// With a handle: `[<handle>-<category>] <title> | <url>` (or `[<handle>]`
/// without a category). Without a handle only the URL is written.
pub fn format_message(entry: &FeedEntry, handle: Option<&str>) -> String {
  match handle.filter(|h| !h.is_empty()) {
    Some(handle) => {
      let tag = match entry.category.as_deref() {
        Some(category) if !category.is_empty() => format!("{}-{}", handle, category),
        _ => handle.to_string(),
      };
      format!("[{}] {} | {}\n", tag, entry.title, entry.url)
    }
    None => format!("{}\n", entry.url),
  }
}

/// Outcome of writing a batch of lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteReport {
  /// Lines fully written
  pub written: Vec<String>,
  /// Lines that failed or were abandoned without reaching the output
  pub dropped: Vec<String>,
  /// Lines whose write timed out on a regular file; the write may still land
  pub unconfirmed: Vec<String>,
}

/// Open handle on the output.
///
/// A FIFO is opened non-blocking, so a write that cannot proceed is simply
/// not performed and dropping it abandons the line. Lines up to `PIPE_BUF`
/// bytes are written atomically. Regular file writes run on the blocking pool
/// and cannot be taken back once started.
enum Sink {
  File(tokio::fs::File),
  #[cfg(unix)]
  Pipe(pipe::Sender),
}

impl Sink {
  async fn open(path: &Path) -> io::Result<Self> {
    #[cfg(unix)]
    {
      use std::os::unix::fs::FileTypeExt;

      if tokio::fs::metadata(path).await?.file_type().is_fifo() {
        // Fails with ENXIO instead of blocking when nobody reads the pipe
        return pipe::OpenOptions::new().open_sender(path).map(Self::Pipe);
      }
    }

    let file = OpenOptions::new().append(true).open(path).await?;
    Ok(Self::File(file))
  }

  /// Whether cancelling an in-flight write guarantees nothing was written.
  fn is_cancellable(&self) -> bool {
    match self {
      Self::File(_) => false,
      #[cfg(unix)]
      Self::Pipe(_) => true,
    }
  }

  async fn write_line(&mut self, line: &[u8]) -> io::Result<()> {
    match self {
      Self::File(file) => {
        file.write_all(line).await?;
        file.flush().await
      }
      #[cfg(unix)]
      Self::Pipe(sender) => sender.write_all(line).await,
    }
  }
}

/// Appends entries to the output file, pacing lines to avoid flooding IRC.
#[derive(Debug, Clone)]
pub struct OutputWriter {
  path: PathBuf,
  handle: Option<String>,
  delay: Duration,
  write_timeout: Duration,
}

impl OutputWriter {
  pub fn new(path: impl Into<PathBuf>, handle: Option<String>, delay: Duration) -> Self {
    Self {
      path: path.into(),
      handle,
      delay,
      write_timeout: WRITE_TIMEOUT,
    }
  }

  #[cfg(test)]
  pub fn with_write_timeout(mut self, write_timeout: Duration) -> Self {
    self.write_timeout = write_timeout;
    self
  }

  /// Append every entry as one line.
  ///
  /// Failing to open the output within the write deadline is an error. A line
  /// that fails or stalls past the deadline is reported and the remaining
  /// lines are still written.
  pub async fn write_all(&self, entries: &FeedEntries) -> Result<WriteReport> {
    let mut sink = tokio::time::timeout(self.write_timeout, Sink::open(&self.path))
      .await
      .map_err(|_| eyre!("Timed out opening output {}", self.path.display()))?
      .map_err(|e| eyre!("Failed to open output {}: {}", self.path.display(), e))?;

    let mut report = WriteReport::default();
    for (i, entry) in entries.iter().enumerate() {
      if i > 0 && !self.delay.is_zero() {
        tokio::time::sleep(self.delay).await;
      }

      let msg = format_message(entry, self.handle.as_deref());
      debug!("Will write {:?}", msg);

      let result = tokio::time::timeout(self.write_timeout, sink.write_line(msg.as_bytes())).await;
      match result {
        Ok(Ok(())) => report.written.push(entry.url.clone()),
        Ok(Err(e)) => {
          warn!(url = %entry.url, error = %e, "Failed to write entry");
          report.dropped.push(entry.url.clone());
        }
        Err(_) if sink.is_cancellable() => {
          warn!(
            url = %entry.url,
            timeout = ?self.write_timeout,
            "Timed out writing entry, dropped"
          );
          report.dropped.push(entry.url.clone());
        }
        Err(_) => {
          warn!(
            url = %entry.url,
            timeout = ?self.write_timeout,
            "Timed out writing entry, it may still be delivered"
          );
          report.unconfirmed.push(entry.url.clone());
        }
      }
    }

    Ok(report)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::NamedTempFile;

  fn entry(category: Option<&str>) -> FeedEntry {
    FeedEntry::new("http://a", "Title A", category)
  }

  #[test]
  fn test_format_with_handle_and_category() {
    assert_eq!(
      format_message(&entry(Some("cat")), Some("bot")),
      "[bot-cat] Title A | http://a\n"
    );
  }

  #[test]
  fn test_format_with_handle_only() {
    assert_eq!(
      format_message(&entry(None), Some("bot")),
      "[bot] Title A | http://a\n"
    );
  }

  #[test]
  fn test_format_without_handle() {
    assert_eq!(format_message(&entry(Some("cat")), None), "http://a\n");
    assert_eq!(format_message(&entry(Some("cat")), Some("")), "http://a\n");
  }

  #[tokio::test]
  async fn test_write_all_appends_lines() {
    let output = NamedTempFile::new().unwrap();
    std::fs::write(output.path(), "existing\n").unwrap();

    let entries: FeedEntries = vec![
      FeedEntry::new("http://b", "B", None),
      FeedEntry::new("http://a", "A", Some("x")),
    ]
    .into_iter()
    .collect();

    let writer = OutputWriter::new(output.path(), Some("bot".to_string()), Duration::ZERO);
    let report = writer.write_all(&entries).await.unwrap();

    assert_eq!(report.written, vec!["http://a", "http://b"]);
    assert!(report.dropped.is_empty());
    assert_eq!(
      std::fs::read_to_string(output.path()).unwrap(),
      "existing\n[bot-x] A | http://a\n[bot] B | http://b\n"
    );
  }

  #[tokio::test]
  async fn test_write_all_missing_output_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let writer = OutputWriter::new(dir.path().join("nope"), None, Duration::ZERO);

    let entries: FeedEntries = vec![entry(None)].into_iter().collect();
    assert!(writer.write_all(&entries).await.is_err());
  }

  #[cfg(target_os = "linux")]
  #[tokio::test]
  async fn test_failed_line_is_dropped_and_run_continues() {
    let entries: FeedEntries = vec![
      FeedEntry::new("http://a", "A", None),
      FeedEntry::new("http://b", "B", None),
    ]
    .into_iter()
    .collect();

    // Every write to /dev/full fails with ENOSPC
    let writer = OutputWriter::new("/dev/full", None, Duration::ZERO);
    let report = writer.write_all(&entries).await.unwrap();

    assert!(report.written.is_empty());
    assert_eq!(report.dropped, vec!["http://a", "http://b"]);
  }

  #[tokio::test]
  async fn test_delay_between_lines() {
    let output = NamedTempFile::new().unwrap();
    let entries: FeedEntries = vec![
      FeedEntry::new("http://a", "A", None),
      FeedEntry::new("http://b", "B", None),
      FeedEntry::new("http://c", "C", None),
    ]
    .into_iter()
    .collect();

    let writer = OutputWriter::new(output.path(), None, Duration::from_millis(50));
    let started = std::time::Instant::now();
    writer.write_all(&entries).await.unwrap();

    // Two pauses between three lines, none after the last one
    assert!(started.elapsed() >= Duration::from_millis(100));
    assert_eq!(
      std::fs::read_to_string(output.path()).unwrap(),
      "http://a\nhttp://b\nhttp://c\n"
    );
  }

  #[cfg(unix)]
  fn make_fifo(dir: &Path) -> PathBuf {
    let path = dir.join("output.fifo");
    let status = std::process::Command::new("mkfifo")
      .arg(&path)
      .status()
      .unwrap();
    assert!(status.success());
    path
  }

  #[cfg(unix)]
  #[tokio::test]
  async fn test_stalled_pipe_line_is_abandoned() {
    let dir = tempfile::tempdir().unwrap();
    let fifo = make_fifo(dir.path());
    let reader = pipe::OpenOptions::new().open_receiver(&fifo).unwrap();
    let filler = pipe::OpenOptions::new().open_sender(&fifo).unwrap();

    // Fill the pipe buffer so the next write cannot proceed
    let chunk = [b'x'; 4096];
    let mut filled = 0;
    loop {
      match filler.try_write(&chunk) {
        Ok(n) => filled += n,
        Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
        Err(e) => panic!("unexpected write error: {}", e),
      }
    }

    let entries: FeedEntries = vec![entry(None)].into_iter().collect();
    let writer = OutputWriter::new(&fifo, None, Duration::ZERO)
      .with_write_timeout(Duration::from_millis(200));
    let report = writer.write_all(&entries).await.unwrap();

    assert!(report.written.is_empty());
    assert!(report.unconfirmed.is_empty());
    assert_eq!(report.dropped, vec!["http://a"]);

    // Only the filler ever reaches the reader
    let mut drained = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
      match reader.try_read(&mut buf) {
        Ok(0) => break,
        Ok(n) => drained.extend_from_slice(&buf[..n]),
        Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
        Err(e) => panic!("unexpected read error: {}", e),
      }
    }
    assert_eq!(drained.len(), filled);
    assert!(drained.iter().all(|b| *b == b'x'));
  }

  #[cfg(unix)]
  #[tokio::test]
  async fn test_pipe_without_reader_fails_fast() {
    let dir = tempfile::tempdir().unwrap();
    let fifo = make_fifo(dir.path());

    let entries: FeedEntries = vec![entry(None)].into_iter().collect();
    let writer = OutputWriter::new(&fifo, None, Duration::ZERO);

    let started = std::time::Instant::now();
    assert!(writer.write_all(&entries).await.is_err());
    assert!(started.elapsed() < WRITE_TIMEOUT);
  }

  #[cfg(unix)]
  #[tokio::test]
  async fn test_pipe_with_reader_receives_lines() {
    let dir = tempfile::tempdir().unwrap();
    let fifo = make_fifo(dir.path());
    let reader = pipe::OpenOptions::new().open_receiver(&fifo).unwrap();

    let entries: FeedEntries = vec![entry(Some("cat"))].into_iter().collect();
    let writer = OutputWriter::new(&fifo, Some("bot".to_string()), Duration::ZERO);
    let report = writer.write_all(&entries).await.unwrap();
    assert_eq!(report.written, vec!["http://a"]);

    let mut buf = [0u8; 256];
    let n = reader.try_read(&mut buf).unwrap();
    assert_eq!(&buf[..n], b"[bot-cat] Title A | http://a\n");
  }
}
