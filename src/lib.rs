//! Facade crate for the Parkside engine.
//!
//! This crate re-exports the core domain types and exposes the SQLite store
//! and the ingestion pipelines behind feature flags.

#![forbid(unsafe_code)]

pub use parkside_core::{
    AvailabilitySnapshot, AvailabilityStore, Facility, FacilityError, FacilityStore, NearestQuery,
    NearestQueryError, Page, PageError, RankedResult, StoreError, Svy21Projector,
    TransactionScope, find_nearest, haversine_km, svy21_to_wgs84,
};

#[cfg(feature = "store-sqlite")]
pub use parkside_core::{SqliteParkingStore, SqliteStoreError};

#[cfg(feature = "ingest")]
pub use parkside_data::{
    AvailabilityUpdater, FacilityImporter, FeedError, FeedSource, HttpFeedSource,
    HttpFeedSourceConfig, ImportError, ImportResult, RetryPolicy, UpdateError, UpdateResult,
    UpdateStatus,
};
