//! Test-only, in-memory store used by unit and behaviour tests.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};

use crate::{
    AvailabilitySnapshot, AvailabilityStore, Facility, FacilityStore, StoreError,
    TransactionScope,
};

#[derive(Debug, Clone, Default)]
struct Tables {
    facilities: BTreeMap<String, Facility>,
    availability: BTreeMap<String, AvailabilitySnapshot>,
}

/// In-memory facility and availability store.
///
/// Mirrors the SQLite backend's rules: snapshots must reference a known
/// facility and negative counts are refused. Transactions snapshot the tables
/// on `begin` and restore them on `rollback`. Failures can be injected per
/// facility id or at commit time.
#[derive(Debug, Clone, Default)]
pub struct MemoryParkingStore {
    tables: Tables,
    checkpoint: Option<Tables>,
    rejected_ids: BTreeSet<String>,
    fail_commit: bool,
    commits: usize,
}

impl MemoryParkingStore {
    /// Create a store containing the given facilities.
    pub fn with_facilities<I>(facilities: I) -> Self
    where
        I: IntoIterator<Item = Facility>,
    {
        let facilities = facilities
            .into_iter()
            .map(|facility| (facility.id.clone(), facility))
            .collect();
        Self {
            tables: Tables {
                facilities,
                availability: BTreeMap::new(),
            },
            ..Self::default()
        }
    }

    /// Refuse every write that targets `facility_id`.
    #[must_use]
    pub fn rejecting_writes_for(mut self, facility_id: impl Into<String>) -> Self {
        self.rejected_ids.insert(facility_id.into());
        self
    }

    /// Make every subsequent commit fail.
    #[must_use]
    pub fn failing_commits(mut self) -> Self {
        self.fail_commit = true;
        self
    }

    /// Stored facilities ordered by id.
    pub fn facilities(&self) -> impl Iterator<Item = &Facility> {
        self.tables.facilities.values()
    }

    /// Stored snapshot for `facility_id`.
    #[must_use]
    pub fn snapshot(&self, facility_id: &str) -> Option<&AvailabilitySnapshot> {
        self.tables.availability.get(facility_id)
    }

    /// Number of stored snapshots.
    #[must_use]
    pub fn snapshot_count(&self) -> usize {
        self.tables.availability.len()
    }

    /// Number of successful commits.
    #[must_use]
    pub const fn commits(&self) -> usize {
        self.commits
    }

    fn check_writable(&self, facility_id: &str) -> Result<(), StoreError> {
        if self.rejected_ids.contains(facility_id) {
            return Err(StoreError::Rejected {
                facility_id: facility_id.to_owned(),
                reason: "write rejected by test store".to_owned(),
            });
        }
        Ok(())
    }
}

impl FacilityStore for MemoryParkingStore {
    fn get(&self, id: &str) -> Result<Option<Facility>, StoreError> {
        Ok(self.tables.facilities.get(id).cloned())
    }

    fn upsert_batch(&mut self, facilities: &[Facility]) -> Result<(), StoreError> {
        for facility in facilities {
            self.check_writable(&facility.id)?;
            self.tables
                .facilities
                .insert(facility.id.clone(), facility.clone());
        }
        Ok(())
    }
}

impl AvailabilityStore for MemoryParkingStore {
    fn upsert(
        &mut self,
        facility_id: &str,
        available_lots: i64,
        timestamp: DateTime<Utc>,
    ) -> Result<usize, StoreError> {
        self.check_writable(facility_id)?;
        if !self.tables.facilities.contains_key(facility_id) {
            return Err(StoreError::Rejected {
                facility_id: facility_id.to_owned(),
                reason: "unknown facility".to_owned(),
            });
        }
        if available_lots < 0 {
            return Err(StoreError::Rejected {
                facility_id: facility_id.to_owned(),
                reason: format!("negative available lots {available_lots}"),
            });
        }
        self.tables.availability.insert(
            facility_id.to_owned(),
            AvailabilitySnapshot {
                facility_id: facility_id.to_owned(),
                available_lots,
                last_updated: timestamp,
            },
        );
        Ok(1)
    }

    fn list_where_available_lots_greater_than(
        &self,
        threshold: i64,
    ) -> Result<Vec<(Facility, AvailabilitySnapshot)>, StoreError> {
        Ok(self
            .tables
            .availability
            .values()
            .filter(|snapshot| snapshot.available_lots > threshold)
            .filter_map(|snapshot| {
                self.tables
                    .facilities
                    .get(&snapshot.facility_id)
                    .map(|facility| (facility.clone(), snapshot.clone()))
            })
            .collect())
    }
}

impl TransactionScope for MemoryParkingStore {
    fn begin(&mut self) -> Result<(), StoreError> {
        if self.checkpoint.is_some() {
            return Err(StoreError::Transaction {
                message: "a transaction is already in progress".to_owned(),
            });
        }
        self.checkpoint = Some(self.tables.clone());
        Ok(())
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        if self.checkpoint.is_none() {
            return Err(StoreError::Transaction {
                message: "commit without an open transaction".to_owned(),
            });
        }
        if self.fail_commit {
            return Err(StoreError::Transaction {
                message: "commit failed".to_owned(),
            });
        }
        self.checkpoint = None;
        self.commits += 1;
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), StoreError> {
        if let Some(tables) = self.checkpoint.take() {
            self.tables = tables;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Coord;
    use rstest::rstest;

    fn facility(id: &str) -> Facility {
        Facility::new(
            id,
            "address",
            Coord { x: 103.8, y: 1.3 },
            Coord { x: 0.0, y: 0.0 },
            100,
        )
        .expect("valid facility")
    }

    #[rstest]
    fn rollback_restores_previous_tables() {
        let mut store = MemoryParkingStore::with_facilities([facility("F1")]);
        store.begin().expect("begin");
        store.upsert("F1", 3, Utc::now()).expect("upsert");
        store.rollback().expect("rollback");
        assert_eq!(store.snapshot_count(), 0);
    }

    #[rstest]
    fn failing_commit_keeps_transaction_open_until_rollback() {
        let mut store = MemoryParkingStore::with_facilities([facility("F1")]).failing_commits();
        let outcome: Result<(), StoreError> = store.in_transaction(|tx| {
            tx.upsert("F1", 3, Utc::now())?;
            Ok(())
        });
        assert!(outcome.is_err());
        assert_eq!(store.snapshot_count(), 0);
        assert_eq!(store.commits(), 0);
    }

    #[rstest]
    fn rejected_ids_fail_individually() {
        let mut store =
            MemoryParkingStore::with_facilities([facility("F1"), facility("F2")])
                .rejecting_writes_for("F2");
        assert!(store.upsert("F2", 1, Utc::now()).is_err());
        assert_eq!(store.upsert("F1", 1, Utc::now()).expect("upsert"), 1);
    }
}
