//! Availability ingestion from the carpark availability feed.
//!
//! A [`FeedSource`] supplies the payload, [`AvailabilityUpdater`] applies
//! the newest snapshot to a store in one transaction and reports counters.

mod feed;
mod retry;
mod source;
mod updater;

pub use feed::{AvailabilityFeed, CarparkEntry, FeedItem, INVALID_LOTS, LotReading, parse_lots};
pub use retry::{DEFAULT_INITIAL_DELAY, DEFAULT_MAX_RETRIES, RetryPolicy, is_transient};
pub use source::{
    DEFAULT_FEED_URL, DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT, FeedError, FeedSource,
    HttpFeedSource, HttpFeedSourceConfig, SourceBuildError,
};
pub use updater::{AvailabilityUpdater, UpdateError, UpdateResult, UpdateStatus};
