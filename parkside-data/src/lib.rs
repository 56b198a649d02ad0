//! Data ingestion for the Parkside engine.
//!
//! Responsibilities:
//! - Import facilities from the survey-grid CSV feed.
//! - Fetch and apply availability snapshots from the JSON feed.
//!
//! Boundaries:
//! - Domain types, projection and ranking live in `parkside-core`.
//! - Pipelines write only through the `parkside-core` store traits.
//!
//! Invariants:
//! - Each pipeline run is one store transaction.
//! - No global mutable state.

#![forbid(unsafe_code)]

pub mod availability;
pub mod import;

#[doc(hidden)]
pub mod test_support;

pub use availability::{
    AvailabilityUpdater, FeedError, FeedSource, HttpFeedSource, HttpFeedSourceConfig, RetryPolicy,
    UpdateError, UpdateResult, UpdateStatus,
};
pub use import::{FacilityImporter, ImportError, ImportResult};
