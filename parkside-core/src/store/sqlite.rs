//! SQLite-backed store for facilities and availability snapshots.

use std::{
    fmt,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use geo::Coord;
use rusqlite::{Connection, ErrorCode, OptionalExtension, Row, params};
use thiserror::Error;

use crate::{AvailabilitySnapshot, Facility};

use super::{AvailabilityStore, FacilityStore, StoreError, TransactionScope};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS facilities (
        id TEXT PRIMARY KEY,
        address TEXT NOT NULL,
        latitude REAL NOT NULL,
        longitude REAL NOT NULL,
        total_lots INTEGER NOT NULL CHECK (total_lots >= 0),
        svy21_x REAL NOT NULL,
        svy21_y REAL NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_facilities_coordinates
        ON facilities (latitude, longitude);
    CREATE INDEX IF NOT EXISTS idx_facilities_address ON facilities (address);
    CREATE TABLE IF NOT EXISTS availability (
        facility_id TEXT PRIMARY KEY REFERENCES facilities (id),
        available_lots INTEGER NOT NULL CHECK (available_lots >= 0),
        last_updated TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_availability_lots ON availability (available_lots);
";

// `ON CONFLICT DO UPDATE` keeps the row in place; `INSERT OR REPLACE` would
// delete it first and trip the availability foreign key.
const UPSERT_FACILITY: &str = "
    INSERT INTO facilities (id, address, latitude, longitude, total_lots, svy21_x, svy21_y)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
    ON CONFLICT (id) DO UPDATE SET
        address = excluded.address,
        latitude = excluded.latitude,
        longitude = excluded.longitude,
        total_lots = excluded.total_lots,
        svy21_x = excluded.svy21_x,
        svy21_y = excluded.svy21_y";

const UPSERT_AVAILABILITY: &str = "
    INSERT INTO availability (facility_id, available_lots, last_updated)
    VALUES (?1, ?2, ?3)
    ON CONFLICT (facility_id) DO UPDATE SET
        available_lots = excluded.available_lots,
        last_updated = excluded.last_updated";

const SELECT_FACILITY: &str = "
    SELECT id, address, latitude, longitude, total_lots, svy21_x, svy21_y
    FROM facilities WHERE id = ?1";

const SELECT_OPEN_FACILITIES: &str = "
    SELECT f.id, f.address, f.latitude, f.longitude, f.total_lots, f.svy21_x, f.svy21_y,
           a.available_lots, a.last_updated
    FROM availability a
    JOIN facilities f ON f.id = a.facility_id
    WHERE a.available_lots > ?1";

/// Errors raised while opening or preparing the SQLite database.
#[derive(Debug, Error)]
pub enum SqliteStoreError {
    /// Opening the SQLite database failed.
    #[error("failed to open SQLite database at {path}: {source}")]
    OpenDatabase {
        /// Location of the SQLite database on disk.
        path: PathBuf,
        /// Source error returned by `rusqlite`.
        #[source]
        source: rusqlite::Error,
    },
    /// Applying a connection pragma failed.
    #[error("failed to set SQLite pragma {pragma}: {source}")]
    Pragma {
        /// Name of the pragma.
        pragma: &'static str,
        /// Source error returned by `rusqlite`.
        #[source]
        source: rusqlite::Error,
    },
    /// Creating tables or indexes failed.
    #[error("failed to create parking schema: {source}")]
    CreateSchema {
        /// Source error returned by `rusqlite`.
        #[source]
        source: rusqlite::Error,
    },
    /// Generic SQLite error when reading or writing rows.
    #[error(transparent)]
    Database(#[from] rusqlite::Error),
}

impl From<SqliteStoreError> for StoreError {
    fn from(err: SqliteStoreError) -> Self {
        Self::backend(err)
    }
}

/// Facility and availability store backed by a single SQLite connection.
///
/// Foreign keys are enforced, so a snapshot can only reference a facility
/// that is already on file. File-backed databases run in WAL mode so query
/// readers are not blocked by an ingestion run.
pub struct SqliteParkingStore {
    connection: Connection,
    path: Option<PathBuf>,
}

impl fmt::Debug for SqliteParkingStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteParkingStore")
            .field("path", &self.path)
            .field("in_transaction", &!self.connection.is_autocommit())
            .finish_non_exhaustive()
    }
}

impl SqliteParkingStore {
    /// Open (or create) the database at `path` and ensure the schema exists.
    pub fn open<P>(path: P) -> Result<Self, SqliteStoreError>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let connection =
            Connection::open(path).map_err(|source| SqliteStoreError::OpenDatabase {
                path: path.to_path_buf(),
                source,
            })?;
        Self::initialise(connection, Some(path.to_path_buf()))
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self, SqliteStoreError> {
        let connection =
            Connection::open_in_memory().map_err(|source| SqliteStoreError::OpenDatabase {
                path: PathBuf::from(":memory:"),
                source,
            })?;
        Self::initialise(connection, None)
    }

    fn initialise(connection: Connection, path: Option<PathBuf>) -> Result<Self, SqliteStoreError> {
        connection
            .pragma_update(None, "foreign_keys", true)
            .map_err(|source| SqliteStoreError::Pragma {
                pragma: "foreign_keys",
                source,
            })?;
        // In-memory databases answer "memory" and stay that way.
        let mode: String = connection
            .pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))
            .map_err(|source| SqliteStoreError::Pragma {
                pragma: "journal_mode",
                source,
            })?;
        log::debug!("SQLite journal mode: {mode}");
        connection
            .execute_batch(SCHEMA)
            .map_err(|source| SqliteStoreError::CreateSchema { source })?;
        Ok(Self { connection, path })
    }

    /// Location of the database file, if it is file-backed.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Fetch the stored snapshot for a facility.
    pub fn snapshot(&self, facility_id: &str) -> Result<Option<AvailabilitySnapshot>, StoreError> {
        self.connection
            .query_row(
                "SELECT facility_id, available_lots, last_updated
                 FROM availability WHERE facility_id = ?1",
                params![facility_id],
                |row| {
                    Ok(AvailabilitySnapshot {
                        facility_id: row.get(0)?,
                        available_lots: row.get(1)?,
                        last_updated: row.get(2)?,
                    })
                },
            )
            .optional()
            .map_err(|err| SqliteStoreError::from(err).into())
    }

    /// Number of stored snapshots.
    pub fn snapshot_count(&self) -> Result<usize, StoreError> {
        self.count("SELECT COUNT(*) FROM availability")
    }

    /// Number of stored facilities.
    pub fn facility_count(&self) -> Result<usize, StoreError> {
        self.count("SELECT COUNT(*) FROM facilities")
    }

    fn count(&self, sql: &str) -> Result<usize, StoreError> {
        let count: i64 = self
            .connection
            .query_row(sql, [], |row| row.get(0))
            .map_err(SqliteStoreError::from)?;
        usize::try_from(count).map_err(StoreError::backend)
    }

    fn execute_control(&self, sql: &str) -> Result<(), StoreError> {
        self.connection
            .execute_batch(sql)
            .map_err(|err| SqliteStoreError::from(err).into())
    }
}

/// Classify a failed write: constraint violations only reject the row.
fn write_error(facility_id: &str, err: rusqlite::Error) -> StoreError {
    if err.sqlite_error_code() == Some(ErrorCode::ConstraintViolation) {
        StoreError::Rejected {
            facility_id: facility_id.to_owned(),
            reason: err.to_string(),
        }
    } else {
        SqliteStoreError::from(err).into()
    }
}

fn facility_from_row(row: &Row<'_>) -> rusqlite::Result<Facility> {
    Ok(Facility {
        id: row.get(0)?,
        address: row.get(1)?,
        location: Coord {
            x: row.get(3)?,
            y: row.get(2)?,
        },
        total_lots: row.get(4)?,
        grid: Coord {
            x: row.get(5)?,
            y: row.get(6)?,
        },
    })
}

impl FacilityStore for SqliteParkingStore {
    fn get(&self, id: &str) -> Result<Option<Facility>, StoreError> {
        let mut statement = self
            .connection
            .prepare_cached(SELECT_FACILITY)
            .map_err(SqliteStoreError::from)?;
        statement
            .query_row(params![id], facility_from_row)
            .optional()
            .map_err(|err| SqliteStoreError::from(err).into())
    }

    fn upsert_batch(&mut self, facilities: &[Facility]) -> Result<(), StoreError> {
        let mut statement = self
            .connection
            .prepare_cached(UPSERT_FACILITY)
            .map_err(SqliteStoreError::from)?;
        for facility in facilities {
            statement
                .execute(params![
                    facility.id,
                    facility.address,
                    facility.latitude(),
                    facility.longitude(),
                    facility.total_lots,
                    facility.grid.x,
                    facility.grid.y,
                ])
                .map_err(|err| write_error(&facility.id, err))?;
        }
        Ok(())
    }
}

impl AvailabilityStore for SqliteParkingStore {
    fn upsert(
        &mut self,
        facility_id: &str,
        available_lots: i64,
        timestamp: DateTime<Utc>,
    ) -> Result<usize, StoreError> {
        let mut statement = self
            .connection
            .prepare_cached(UPSERT_AVAILABILITY)
            .map_err(SqliteStoreError::from)?;
        statement
            .execute(params![facility_id, available_lots, timestamp])
            .map_err(|err| write_error(facility_id, err))
    }

    fn list_where_available_lots_greater_than(
        &self,
        threshold: i64,
    ) -> Result<Vec<(Facility, AvailabilitySnapshot)>, StoreError> {
        let mut statement = self
            .connection
            .prepare_cached(SELECT_OPEN_FACILITIES)
            .map_err(SqliteStoreError::from)?;
        let rows = statement
            .query_map(params![threshold], |row| {
                let facility = facility_from_row(row)?;
                let snapshot = AvailabilitySnapshot {
                    facility_id: facility.id.clone(),
                    available_lots: row.get(7)?,
                    last_updated: row.get(8)?,
                };
                Ok((facility, snapshot))
            })
            .map_err(SqliteStoreError::from)?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|err| SqliteStoreError::from(err).into())
    }
}

impl TransactionScope for SqliteParkingStore {
    fn begin(&mut self) -> Result<(), StoreError> {
        if !self.connection.is_autocommit() {
            return Err(StoreError::Transaction {
                message: "a transaction is already in progress".to_owned(),
            });
        }
        self.execute_control("BEGIN IMMEDIATE")
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        if self.connection.is_autocommit() {
            return Err(StoreError::Transaction {
                message: "commit without an open transaction".to_owned(),
            });
        }
        self.execute_control("COMMIT")
    }

    fn rollback(&mut self) -> Result<(), StoreError> {
        // SQLite may already have rolled back after a failed COMMIT.
        if self.connection.is_autocommit() {
            return Ok(());
        }
        self.execute_control("ROLLBACK")
    }
}
