//! Persistence traits for facilities and availability snapshots.
//!
//! The ingestion pipelines and the query path only talk to these traits.
//! [`SqliteParkingStore`] is the production backend; tests use the in-memory
//! double from `test_support`.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::{AvailabilitySnapshot, Facility};

#[cfg(feature = "store-sqlite")]
mod sqlite;

#[cfg(feature = "store-sqlite")]
pub use sqlite::{SqliteParkingStore, SqliteStoreError};

/// Errors surfaced by store implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend refused a single write, for example a constraint
    /// violation. Other writes in the same transaction are unaffected.
    #[error("store rejected write for facility {facility_id}: {reason}")]
    Rejected {
        /// Facility the write targeted.
        facility_id: String,
        /// Backend explanation.
        reason: String,
    },
    /// A transaction was begun twice, or finished without being begun.
    #[error("invalid transaction state: {message}")]
    Transaction {
        /// Description of the misuse.
        message: String,
    },
    /// The backend failed in a way that affects the whole unit of work.
    #[error("store backend failure: {source}")]
    Backend {
        /// Underlying backend error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl StoreError {
    /// Wrap an arbitrary backend error.
    pub fn backend<E>(source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Backend {
            source: Box::new(source),
        }
    }
}

/// Keyed access to facility records.
pub trait FacilityStore {
    /// Fetch a facility by id.
    fn get(&self, id: &str) -> Result<Option<Facility>, StoreError>;

    /// Whether a facility with `id` is on file.
    fn exists(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.get(id)?.is_some())
    }

    /// Insert or overwrite every facility in `facilities`, keyed by id.
    fn upsert_batch(&mut self, facilities: &[Facility]) -> Result<(), StoreError>;
}

/// Keyed access to the latest availability snapshot per facility.
///
/// # Examples
///
/// ```rust
/// use chrono::Utc;
/// use geo::Coord;
/// use parkside_core::{AvailabilityStore, Facility, FacilityStore, SqliteParkingStore};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut store = SqliteParkingStore::open_in_memory()?;
/// let facility = Facility::new(
///     "F1",
///     "1 Example Road",
///     Coord { x: 103.8, y: 1.3 },
///     Coord { x: 0.0, y: 0.0 },
///     100,
/// )?;
/// store.upsert_batch(&[facility])?;
/// store.upsert("F1", 12, Utc::now())?;
/// store.upsert("F1", 9, Utc::now())?;
///
/// let open = store.list_where_available_lots_greater_than(0)?;
/// assert_eq!(open.len(), 1);
/// assert_eq!(open[0].1.available_lots, 9);
/// # Ok(())
/// # }
/// ```
pub trait AvailabilityStore {
    /// Insert or overwrite the snapshot for `facility_id`.
    ///
    /// Returns the number of affected rows. The facility must already exist.
    fn upsert(
        &mut self,
        facility_id: &str,
        available_lots: i64,
        timestamp: DateTime<Utc>,
    ) -> Result<usize, StoreError>;

    /// Return each facility paired with its snapshot where the snapshot
    /// reports strictly more than `threshold` available lots.
    fn list_where_available_lots_greater_than(
        &self,
        threshold: i64,
    ) -> Result<Vec<(Facility, AvailabilitySnapshot)>, StoreError>;
}

/// Atomic units of work over a store.
///
/// Implementers provide the three primitives; callers use
/// [`TransactionScope::in_transaction`], which commits when the closure
/// succeeds and rolls back otherwise.
pub trait TransactionScope {
    /// Start a transaction.
    fn begin(&mut self) -> Result<(), StoreError>;

    /// Make every write since [`TransactionScope::begin`] durable.
    fn commit(&mut self) -> Result<(), StoreError>;

    /// Discard every write since [`TransactionScope::begin`].
    fn rollback(&mut self) -> Result<(), StoreError>;

    /// Run `work` inside a transaction.
    ///
    /// A failed commit is followed by a rollback and reported as the error.
    fn in_transaction<T, E, F>(&mut self, work: F) -> Result<T, E>
    where
        Self: Sized,
        E: From<StoreError>,
        F: FnOnce(&mut Self) -> Result<T, E>,
    {
        self.begin()?;
        match work(self) {
            Ok(value) => match self.commit() {
                Ok(()) => Ok(value),
                Err(err) => {
                    rollback_quietly(self);
                    Err(err.into())
                }
            },
            Err(err) => {
                rollback_quietly(self);
                Err(err)
            }
        }
    }
}

fn rollback_quietly<S: TransactionScope + ?Sized>(store: &mut S) {
    if let Err(err) = store.rollback() {
        log::warn!("rollback failed: {err}");
    }
}
