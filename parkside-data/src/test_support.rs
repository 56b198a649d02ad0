//! Test doubles for feed-driven scenarios.

use crate::availability::{AvailabilityFeed, FeedError, FeedSource};

/// A [`FeedSource`] that returns a canned outcome on every fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StubFeedSource {
    outcome: Result<Option<AvailabilityFeed>, FeedError>,
}

impl StubFeedSource {
    /// Serve `feed`.
    #[must_use]
    pub const fn with_feed(feed: AvailabilityFeed) -> Self {
        Self {
            outcome: Ok(Some(feed)),
        }
    }

    /// Serve the payload decoded from `json`. A body that does not decode
    /// is served as a [`FeedError::ParseError`].
    #[must_use]
    pub fn with_json(json: &str) -> Self {
        let outcome = serde_json::from_str::<Option<AvailabilityFeed>>(json).map_err(|err| {
            FeedError::ParseError {
                message: err.to_string(),
            }
        });
        Self { outcome }
    }

    /// Serve no payload at all.
    #[must_use]
    pub const fn empty() -> Self {
        Self { outcome: Ok(None) }
    }

    /// Fail every fetch with `error`.
    #[must_use]
    pub const fn with_error(error: FeedError) -> Self {
        Self {
            outcome: Err(error),
        }
    }
}

impl FeedSource for StubFeedSource {
    fn fetch(&self) -> Result<Option<AvailabilityFeed>, FeedError> {
        self.outcome.clone()
    }
}
