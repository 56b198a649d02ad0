//! Availability ingestion: fetch, validate and upsert one feed snapshot.

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use parkside_core::{AvailabilityStore, FacilityStore, StoreError, TransactionScope};
use serde::Serialize;
use thiserror::Error;

use super::feed::{AvailabilityFeed, FeedItem};
use super::source::FeedSource;

/// Whether a run found anything to ingest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum UpdateStatus {
    /// The feed carried a snapshot and every entry was examined.
    Ok,
    /// The feed was unreachable, absent or empty. Nothing was written.
    EmptyPayload,
}

/// Counters reported by [`AvailabilityUpdater::update_once`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UpdateResult {
    /// Outcome of the run.
    pub status: UpdateStatus,
    /// Snapshots written.
    pub processed: usize,
    /// Entries naming a facility that is not on file.
    pub skipped_unknown_facility: usize,
    /// Entries with an invalid count or a rejected write.
    pub errors: usize,
}

impl UpdateResult {
    const fn empty() -> Self {
        Self {
            status: UpdateStatus::EmptyPayload,
            processed: 0,
            skipped_unknown_facility: 0,
            errors: 0,
        }
    }
}

/// Errors that abort an ingestion run.
#[derive(Debug, Error)]
pub enum UpdateError {
    /// The run's transaction failed and was rolled back.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Pulls availability from a [`FeedSource`] into a store.
///
/// # Examples
///
/// ```
/// use chrono::Utc;
/// use geo::Coord;
/// use parkside_core::{Facility, FacilityStore, SqliteParkingStore};
/// use parkside_data::availability::{AvailabilityUpdater, UpdateStatus};
/// use parkside_data::test_support::StubFeedSource;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut store = SqliteParkingStore::open_in_memory()?;
/// store.upsert_batch(&[Facility::new(
///     "F1",
///     "1 Example Road",
///     Coord { x: 103.8, y: 1.3 },
///     Coord { x: 0.0, y: 0.0 },
///     100,
/// )?])?;
/// let source = StubFeedSource::with_json(
///     r#"{"items":[{"carpark_data":[
///         {"carpark_number":"F1","carpark_info":[{"lots_available":"10"}]},
///         {"carpark_number":"ZZ","carpark_info":[{"lots_available":"4"}]}
///     ]}]}"#,
/// );
///
/// let result = AvailabilityUpdater::new(source).update_once(&mut store)?;
/// assert_eq!(result.status, UpdateStatus::Ok);
/// assert_eq!((result.processed, result.skipped_unknown_facility), (1, 1));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct AvailabilityUpdater<F> {
    source: F,
}

impl<F: FeedSource> AvailabilityUpdater<F> {
    /// Create an updater reading from `source`.
    pub const fn new(source: F) -> Self {
        Self { source }
    }

    /// The wrapped feed source.
    pub const fn source(&self) -> &F {
        &self.source
    }

    /// Run one ingestion pass.
    ///
    /// A feed that cannot be fetched, or carries no snapshot, yields
    /// [`UpdateStatus::EmptyPayload`] without touching the store. Otherwise
    /// the first snapshot is applied in a single transaction.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::Store`] when the transaction cannot begin, a
    /// facility lookup fails or the commit fails. No counters are reported
    /// in that case because every write was rolled back.
    pub fn update_once<S>(&self, store: &mut S) -> Result<UpdateResult, UpdateError>
    where
        S: FacilityStore + AvailabilityStore + TransactionScope,
    {
        let feed = match self.source.fetch() {
            Ok(feed) => feed,
            Err(err) => {
                warn!("availability feed unavailable: {err}");
                None
            }
        };
        let Some(item) = feed.and_then(first_item) else {
            info!("availability feed carried no snapshot");
            return Ok(UpdateResult::empty());
        };

        let timestamp = parse_timestamp(item.timestamp.as_deref());
        let result = store.in_transaction(|store| apply(store, &item, timestamp))?;
        info!(
            "availability updated: {} processed, {} unknown, {} errors",
            result.processed, result.skipped_unknown_facility, result.errors
        );
        Ok(result)
    }
}

fn first_item(feed: AvailabilityFeed) -> Option<FeedItem> {
    feed.items.into_iter().next()
}

fn parse_timestamp(raw: Option<&str>) -> Option<DateTime<Utc>> {
    let raw = raw?;
    match DateTime::parse_from_rfc3339(raw.trim()) {
        Ok(parsed) => Some(parsed.with_timezone(&Utc)),
        Err(err) => {
            warn!("unparseable feed timestamp {raw:?} ({err}); using ingestion time");
            None
        }
    }
}

fn apply<S>(
    store: &mut S,
    item: &FeedItem,
    timestamp: Option<DateTime<Utc>>,
) -> Result<UpdateResult, StoreError>
where
    S: FacilityStore + AvailabilityStore,
{
    let mut result = UpdateResult {
        status: UpdateStatus::Ok,
        processed: 0,
        skipped_unknown_facility: 0,
        errors: 0,
    };
    for entry in &item.carpark_data {
        let Some(id) = entry.facility_id() else {
            continue;
        };
        if !store.exists(id)? {
            debug!("skipping availability for unknown facility {id}");
            result.skipped_unknown_facility += 1;
            continue;
        }
        let lots = entry.available_lots();
        if lots < 0 {
            debug!("invalid availability count for facility {id}");
            result.errors += 1;
            continue;
        }
        match store.upsert(id, lots, timestamp.unwrap_or_else(Utc::now)) {
            Ok(_) => result.processed += 1,
            Err(err) => {
                warn!("availability write for facility {id} failed: {err}");
                result.errors += 1;
            }
        }
    }
    Ok(result)
}
