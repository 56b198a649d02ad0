//! Core domain types for the Parkside engine.
//!
//! The crate owns the parking facility model, the survey-grid projector, the
//! great-circle ranker and the store traits the ingestion pipelines write
//! through. Constructors return `Result` to surface invalid input early.

#![forbid(unsafe_code)]

use chrono::{DateTime, Utc};
use geo::Coord;
use thiserror::Error;

pub mod distance;
pub mod projection;
pub mod query;
pub mod store;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use distance::{EARTH_RADIUS_KM, Page, PageError, haversine_km, rank};
pub use projection::{MAX_GRID_OFFSET, Svy21Projector, svy21_to_wgs84};
pub use query::{
    DEFAULT_PAGE, DEFAULT_PER_PAGE, MAX_PER_PAGE, NearestQuery, NearestQueryError, find_nearest,
};
pub use store::{AvailabilityStore, FacilityStore, StoreError, TransactionScope};

#[cfg(feature = "store-sqlite")]
pub use store::{SqliteParkingStore, SqliteStoreError};

/// A parking facility imported from the survey-grid CSV feed.
///
/// `location` holds WGS84 coordinates (`x = longitude`, `y = latitude`)
/// derived once at import time; `grid` keeps the original SVY21 pair
/// (`x = easting`, `y = northing`).
///
/// # Examples
///
/// ```
/// use geo::Coord;
/// use parkside_core::Facility;
///
/// # fn main() -> Result<(), parkside_core::FacilityError> {
/// let facility = Facility::new(
///     "ACB",
///     "Blk 270/271 Albert Centre",
///     Coord { x: 103.8545, y: 1.3011 },
///     Coord { x: 30314.79, y: 31490.49 },
///     200,
/// )?;
/// assert_eq!(facility.latitude(), 1.3011);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Facility {
    /// Identifier assigned by the upstream feed.
    pub id: String,
    /// Street address.
    pub address: String,
    /// Geographic position (`x = longitude`, `y = latitude`).
    pub location: Coord,
    /// Survey-grid position (`x = easting`, `y = northing`).
    pub grid: Coord,
    /// Estimated number of parking lots.
    pub total_lots: u32,
}

/// Errors returned by [`Facility::new`].
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FacilityError {
    /// The identifier was empty or whitespace.
    #[error("facility id must not be blank")]
    BlankId,
    /// The address was empty or whitespace.
    #[error("facility {id} must have an address")]
    BlankAddress {
        /// Identifier of the offending facility.
        id: String,
    },
    /// The geographic position was not finite or fell outside WGS84 bounds.
    #[error("facility {id} has invalid location ({latitude}, {longitude})")]
    InvalidLocation {
        /// Identifier of the offending facility.
        id: String,
        /// Latitude in degrees.
        latitude: f64,
        /// Longitude in degrees.
        longitude: f64,
    },
}

impl Facility {
    /// Validates and constructs a [`Facility`].
    pub fn new(
        id: impl Into<String>,
        address: impl Into<String>,
        location: Coord,
        grid: Coord,
        total_lots: u32,
    ) -> Result<Self, FacilityError> {
        let id = id.into();
        let address = address.into();
        if id.trim().is_empty() {
            return Err(FacilityError::BlankId);
        }
        if address.trim().is_empty() {
            return Err(FacilityError::BlankAddress { id });
        }
        if !is_valid_location(location) {
            return Err(FacilityError::InvalidLocation {
                id,
                latitude: location.y,
                longitude: location.x,
            });
        }
        Ok(Self {
            id,
            address,
            location,
            grid,
            total_lots,
        })
    }

    /// Latitude in degrees.
    #[must_use]
    pub const fn latitude(&self) -> f64 {
        self.location.y
    }

    /// Longitude in degrees.
    #[must_use]
    pub const fn longitude(&self) -> f64 {
        self.location.x
    }
}

fn is_valid_location(location: Coord) -> bool {
    location.x.is_finite()
        && location.y.is_finite()
        && (-90.0..=90.0).contains(&location.y)
        && (-180.0..=180.0).contains(&location.x)
}

/// The most recent availability reading for one facility.
///
/// Stores keep at most one snapshot per facility; ingestion overwrites it in
/// place.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AvailabilitySnapshot {
    /// Identifier of the facility the reading belongs to.
    pub facility_id: String,
    /// Number of free lots at `last_updated`.
    pub available_lots: i64,
    /// Time of the reading, or of ingestion when the feed omitted it.
    pub last_updated: DateTime<Utc>,
}

/// A facility returned by a nearest-facility query.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct RankedResult {
    /// Facility identifier.
    pub id: String,
    /// Street address.
    pub address: String,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Estimated capacity.
    pub total_lots: u32,
    /// Free lots in the latest snapshot.
    pub available_lots: i64,
    /// Great-circle distance from the query point in kilometres.
    pub distance_km: f64,
}

impl RankedResult {
    /// Combine a facility, its snapshot and the computed distance.
    #[must_use]
    pub fn new(facility: Facility, snapshot: &AvailabilitySnapshot, distance_km: f64) -> Self {
        let latitude = facility.latitude();
        let longitude = facility.longitude();
        Self {
            id: facility.id,
            address: facility.address,
            latitude,
            longitude,
            total_lots: facility.total_lots,
            available_lots: snapshot.available_lots,
            distance_km,
        }
    }
}
