//! Facility import from the survey-grid CSV feed.
//!
//! Each data row is validated, projected from SVY21 to WGS84, given a
//! capacity estimate and written through [`FacilityStore::upsert_batch`] in
//! batches. The whole import runs in one transaction: rows that fail
//! validation are counted and skipped, while a store failure aborts the lot.

use std::io::{self, Read};

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8};
use csv::{ReaderBuilder, StringRecord, Trim};
use log::{debug, info};
use parkside_core::{Facility, FacilityStore, StoreError, Svy21Projector, TransactionScope};
use serde::Serialize;
use thiserror::Error;

mod capacity;
mod row;

pub use capacity::{
    DEFAULT_CAPACITY, FacilityKind, LOTS_PER_DECK, UnknownFacilityKind, estimate_capacity,
};
use row::Columns;

/// Facilities buffered before each store write.
pub const DEFAULT_BATCH_SIZE: usize = 500;

/// Outcome of a completed import.
///
/// `total_rows == converted_rows + skipped_rows` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ImportResult {
    /// Data rows read, excluding the header.
    pub total_rows: usize,
    /// Rows written to the store.
    pub converted_rows: usize,
    /// Rows dropped by validation.
    pub skipped_rows: usize,
}

/// Errors that abort an import.
#[derive(Debug, Error)]
pub enum ImportError {
    /// The source path does not exist.
    #[error("CSV file not found: {path}")]
    SourceNotFound {
        /// Path that was requested.
        path: Utf8PathBuf,
    },
    /// The source path exists but is not a regular file.
    #[error("CSV source is not a file: {path}")]
    SourceNotFile {
        /// Path that was requested.
        path: Utf8PathBuf,
    },
    /// Opening the source failed for another reason.
    #[error("failed to open CSV file {path}")]
    OpenSource {
        /// Path that was requested.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// The header row could not be read.
    #[error("failed to read CSV headers")]
    ReadHeaders {
        /// Source error produced by `csv`.
        #[source]
        source: csv::Error,
    },
    /// Required columns are absent from the header row.
    #[error("CSV is missing required columns: {}", missing.join(", "))]
    MissingHeaders {
        /// Required columns that were not found.
        missing: Vec<String>,
        /// Header names as received.
        received: Vec<String>,
    },
    /// Reading from the source failed part-way through.
    #[error("failed to read CSV data at line {line}")]
    ReadRecord {
        /// Line the reader had reached.
        line: u64,
        /// Source error produced by `csv`.
        #[source]
        source: csv::Error,
    },
    /// The store failed; nothing from this import was kept.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Imports facility CSV data into a store.
///
/// # Examples
///
/// ```
/// use parkside_core::{FacilityStore, SqliteParkingStore};
/// use parkside_data::import::FacilityImporter;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let csv = "car_park_no,address,x_coord,y_coord,car_park_type,car_park_decks\n\
///            HE12,BLK 78/81 REDHILL LANE,28947.5,29208.5,MULTI-STOREY CAR PARK,8\n\
///            BAD1,NOWHERE,abc,29208.5,SURFACE CAR PARK,0\n";
/// let mut store = SqliteParkingStore::open_in_memory()?;
/// let result = FacilityImporter::default().import_from_reader(&mut store, csv.as_bytes())?;
///
/// assert_eq!((result.total_rows, result.converted_rows, result.skipped_rows), (2, 1, 1));
/// assert_eq!(store.get("HE12")?.map(|f| f.total_lots), Some(600));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FacilityImporter {
    batch_size: usize,
}

impl Default for FacilityImporter {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl FacilityImporter {
    /// Set how many facilities are buffered per store write. Zero is
    /// treated as one.
    #[must_use]
    pub const fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = if batch_size == 0 { 1 } else { batch_size };
        self
    }

    /// Facilities buffered per store write.
    #[must_use]
    pub const fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Import the CSV file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::SourceNotFound`] or
    /// [`ImportError::SourceNotFile`] before touching the store, and any
    /// error from [`FacilityImporter::import_from_reader`].
    pub fn import_from_file<S>(
        &self,
        store: &mut S,
        path: &Utf8Path,
    ) -> Result<ImportResult, ImportError>
    where
        S: FacilityStore + TransactionScope,
    {
        let file = open_source(path)?;
        info!("importing facilities from {path}");
        self.import_from_reader(store, file)
    }

    /// Import CSV data from any reader.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::MissingHeaders`] when a required column is
    /// absent, [`ImportError::ReadRecord`] when the reader itself fails, and
    /// [`ImportError::Store`] when the store fails. The store is left
    /// unchanged on every error.
    pub fn import_from_reader<S, R>(
        &self,
        store: &mut S,
        reader: R,
    ) -> Result<ImportResult, ImportError>
    where
        S: FacilityStore + TransactionScope,
        R: Read,
    {
        let mut csv = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .from_reader(reader);
        let headers = csv
            .headers()
            .map_err(|source| ImportError::ReadHeaders { source })?
            .clone();
        let columns = Columns::resolve(&headers).map_err(|missing| ImportError::MissingHeaders {
            missing,
            received: headers.iter().map(str::to_owned).collect(),
        })?;

        let result = store.in_transaction(|store| {
            let mut batch = Batch::new(store, self.batch_size);
            let projector = Svy21Projector::shared();
            let mut result = ImportResult::default();
            let mut record = StringRecord::new();
            loop {
                let line = csv.position().line();
                match csv.read_record(&mut record) {
                    Ok(false) => break,
                    Ok(true) => {}
                    Err(source) if matches!(source.kind(), csv::ErrorKind::Io(_)) => {
                        return Err(ImportError::ReadRecord { line, source });
                    }
                    Err(err) => {
                        result.total_rows += 1;
                        result.skipped_rows += 1;
                        debug!("skipping unreadable row at line {line}: {err}");
                        continue;
                    }
                }
                result.total_rows += 1;
                match row::convert(&record, &columns, projector) {
                    Ok(facility) => {
                        batch.push(facility)?;
                        result.converted_rows += 1;
                    }
                    Err(reason) => {
                        result.skipped_rows += 1;
                        debug!("skipping row at line {line}: {reason}");
                    }
                }
            }
            batch.flush()?;
            Ok::<_, ImportError>(result)
        })?;

        info!(
            "imported {} of {} facility rows ({} skipped)",
            result.converted_rows, result.total_rows, result.skipped_rows
        );
        Ok(result)
    }
}

/// Buffers facilities and writes them in fixed-size chunks.
struct Batch<'s, S> {
    store: &'s mut S,
    pending: Vec<Facility>,
    capacity: usize,
}

impl<'s, S: FacilityStore> Batch<'s, S> {
    fn new(store: &'s mut S, capacity: usize) -> Self {
        Self {
            store,
            pending: Vec::with_capacity(capacity),
            capacity,
        }
    }

    fn push(&mut self, facility: Facility) -> Result<(), StoreError> {
        self.pending.push(facility);
        if self.pending.len() >= self.capacity {
            self.flush()?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), StoreError> {
        if self.pending.is_empty() {
            return Ok(());
        }
        debug!("writing batch of {} facilities", self.pending.len());
        self.store.upsert_batch(&self.pending)?;
        self.pending.clear();
        Ok(())
    }
}

fn open_source(path: &Utf8Path) -> Result<fs_utf8::File, ImportError> {
    let file = fs_utf8::File::open_ambient(path, ambient_authority()).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            ImportError::SourceNotFound {
                path: path.to_path_buf(),
            }
        } else {
            ImportError::OpenSource {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;
    let metadata = file.metadata().map_err(|source| ImportError::OpenSource {
        path: path.to_path_buf(),
        source,
    })?;
    if !metadata.is_file() {
        return Err(ImportError::SourceNotFile {
            path: path.to_path_buf(),
        });
    }
    Ok(file)
}
