//! Nearest-facility queries over stored availability.

use geo::Coord;
use thiserror::Error;

use crate::{AvailabilityStore, Page, RankedResult, StoreError, rank};

/// Page requested when the caller does not choose one.
pub const DEFAULT_PAGE: usize = 1;
/// Page size used when the caller does not choose one.
pub const DEFAULT_PER_PAGE: usize = 10;
/// Largest page size a caller may request.
pub const MAX_PER_PAGE: usize = 100;

/// A validated nearest-facility request.
///
/// # Examples
///
/// ```
/// use parkside_core::NearestQuery;
///
/// # fn main() -> Result<(), parkside_core::NearestQueryError> {
/// let query = NearestQuery::new(1.30, 103.80, 1, 10)?;
/// assert_eq!(query.page().per_page(), 10);
/// assert!(NearestQuery::new(91.0, 103.80, 1, 10).is_err());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearestQuery {
    location: Coord,
    page: Page,
}

/// Errors returned by [`NearestQuery::new`].
#[derive(Debug, Error, PartialEq)]
pub enum NearestQueryError {
    /// Latitude was outside `[-90, 90]` or not finite.
    #[error("latitude {value} must be between -90 and 90")]
    Latitude {
        /// Rejected value.
        value: f64,
    },
    /// Longitude was outside `[-180, 180]` or not finite.
    #[error("longitude {value} must be between -180 and 180")]
    Longitude {
        /// Rejected value.
        value: f64,
    },
    /// Page number was zero.
    #[error("page must be at least 1")]
    Page,
    /// Page size was zero or above [`MAX_PER_PAGE`].
    #[error("per_page {value} must be between 1 and {MAX_PER_PAGE}")]
    PerPage {
        /// Rejected value.
        value: usize,
    },
}

impl NearestQuery {
    /// Validate and construct a query.
    pub fn new(
        latitude: f64,
        longitude: f64,
        page: usize,
        per_page: usize,
    ) -> Result<Self, NearestQueryError> {
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(NearestQueryError::Latitude { value: latitude });
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(NearestQueryError::Longitude { value: longitude });
        }
        if page == 0 {
            return Err(NearestQueryError::Page);
        }
        if per_page > MAX_PER_PAGE {
            return Err(NearestQueryError::PerPage { value: per_page });
        }
        let page = Page::new(page, per_page)
            .map_err(|_| NearestQueryError::PerPage { value: per_page })?;
        Ok(Self {
            location: Coord {
                x: longitude,
                y: latitude,
            },
            page,
        })
    }

    /// Query the first page with the default page size.
    pub fn at(latitude: f64, longitude: f64) -> Result<Self, NearestQueryError> {
        Self::new(latitude, longitude, DEFAULT_PAGE, DEFAULT_PER_PAGE)
    }

    /// Query point (`x = longitude`, `y = latitude`).
    #[must_use]
    pub const fn location(&self) -> Coord {
        self.location
    }

    /// Requested page.
    #[must_use]
    pub const fn page(&self) -> Page {
        self.page
    }
}

/// Return facilities with free lots, nearest first, for the requested page.
///
/// Only facilities whose latest snapshot reports more than zero available
/// lots are considered.
pub fn find_nearest<S>(store: &S, query: &NearestQuery) -> Result<Vec<RankedResult>, StoreError>
where
    S: AvailabilityStore + ?Sized,
{
    let candidates = store.list_where_available_lots_greater_than(0)?;
    log::debug!(
        "ranking {} candidate facilities around ({}, {})",
        candidates.len(),
        query.location.y,
        query.location.x
    );
    Ok(rank(query.location, candidates, query.page))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MemoryParkingStore;
    use crate::{AvailabilityStore, Facility, FacilityStore};
    use chrono::Utc;
    use rstest::{fixture, rstest};

    #[fixture]
    fn store() -> MemoryParkingStore {
        let mut store = MemoryParkingStore::default();
        let facilities = [
            ("F1", 1.30, 103.80),
            ("F2", 1.35, 103.90),
            ("F3", 1.31, 103.80),
        ]
        .map(|(id, lat, lon)| {
            Facility::new(
                id,
                "address",
                Coord { x: lon, y: lat },
                Coord { x: 0.0, y: 0.0 },
                100,
            )
            .expect("valid facility")
        });
        store.upsert_batch(&facilities).expect("seed facilities");
        let now = Utc::now();
        store.upsert("F1", 10, now).expect("seed F1");
        store.upsert("F2", 0, now).expect("seed F2");
        store.upsert("F3", 3, now).expect("seed F3");
        store
    }

    #[rstest]
    #[case(90.5, 103.8, NearestQueryError::Latitude { value: 90.5 })]
    #[case(-90.5, 103.8, NearestQueryError::Latitude { value: -90.5 })]
    #[case(1.3, 180.5, NearestQueryError::Longitude { value: 180.5 })]
    #[case(1.3, -180.5, NearestQueryError::Longitude { value: -180.5 })]
    fn rejects_out_of_range_coordinates(
        #[case] lat: f64,
        #[case] lon: f64,
        #[case] expected: NearestQueryError,
    ) {
        assert_eq!(NearestQuery::at(lat, lon), Err(expected));
    }

    #[rstest]
    fn rejects_nan_coordinates() {
        assert!(matches!(
            NearestQuery::at(f64::NAN, 103.8),
            Err(NearestQueryError::Latitude { .. })
        ));
    }

    #[rstest]
    #[case(0, 10, NearestQueryError::Page)]
    #[case(1, 0, NearestQueryError::PerPage { value: 0 })]
    #[case(1, 101, NearestQueryError::PerPage { value: 101 })]
    fn rejects_invalid_paging(
        #[case] page: usize,
        #[case] per_page: usize,
        #[case] expected: NearestQueryError,
    ) {
        assert_eq!(NearestQuery::new(1.3, 103.8, page, per_page), Err(expected));
    }

    #[rstest]
    fn accepts_boundaries() {
        assert!(NearestQuery::new(-90.0, -180.0, 1, 1).is_ok());
        assert!(NearestQuery::new(90.0, 180.0, 1, MAX_PER_PAGE).is_ok());
    }

    #[rstest]
    fn excludes_facilities_without_free_lots(store: MemoryParkingStore) {
        let query = NearestQuery::at(1.30, 103.80).expect("valid query");
        let results = find_nearest(&store, &query).expect("query succeeds");
        let ids: Vec<_> = results.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["F1", "F3"]);
        assert!(results[0].distance_km < 1e-9);
        assert_eq!(results[0].available_lots, 10);
    }

    #[rstest]
    fn second_page_holds_the_remainder(store: MemoryParkingStore) {
        let query = NearestQuery::new(1.30, 103.80, 2, 1).expect("valid query");
        let results = find_nearest(&store, &query).expect("query succeeds");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "F3");
    }
}
