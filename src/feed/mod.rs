//! Feed retrieval and parsing.

mod fetch;
mod parse;
mod types;

pub use fetch::{FeedSource, HttpFeedSource};
pub use parse::parse_feed;
pub use types::{FeedEntries, FeedEntry};
