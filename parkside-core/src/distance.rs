//! Great-circle distance and result ranking.
//!
//! Ranking is a full scan: every candidate is measured, sorted and then
//! sliced into the requested page.

use std::ops::Range;

use geo::Coord;
use thiserror::Error;

use crate::{AvailabilitySnapshot, Facility, RankedResult};

/// Mean Earth radius in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine distance in kilometres between two WGS84 coordinates
/// (`x = longitude`, `y = latitude`).
///
/// # Examples
///
/// ```
/// use geo::Coord;
/// use parkside_core::haversine_km;
///
/// let singapore = Coord { x: 103.8198, y: 1.3521 };
/// let kuala_lumpur = Coord { x: 101.6869, y: 3.1390 };
/// let km = haversine_km(singapore, kuala_lumpur);
/// assert!((300.0..320.0).contains(&km));
/// assert_eq!(haversine_km(singapore, singapore), 0.0);
/// ```
#[must_use]
pub fn haversine_km(a: Coord, b: Coord) -> f64 {
    let lat_a = a.y.to_radians();
    let lat_b = b.y.to_radians();
    let half_d_lat = (b.y - a.y).to_radians() / 2.0;
    let half_d_lon = (b.x - a.x).to_radians() / 2.0;
    let h = half_d_lat.sin().powi(2) + lat_a.cos() * lat_b.cos() * half_d_lon.sin().powi(2);
    // Rounding can push `h` a hair past 1 for antipodal points.
    let h = h.clamp(0.0, 1.0);
    2.0 * EARTH_RADIUS_KM * h.sqrt().atan2((1.0 - h).sqrt())
}

/// A one-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    number: usize,
    per_page: usize,
}

/// Errors returned by [`Page::new`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PageError {
    /// Page numbers start at one.
    #[error("page must be at least 1")]
    ZeroPage,
    /// A page must hold at least one result.
    #[error("per_page must be at least 1")]
    ZeroPerPage,
}

impl Page {
    /// Validate and construct a page request.
    pub const fn new(number: usize, per_page: usize) -> Result<Self, PageError> {
        if number == 0 {
            return Err(PageError::ZeroPage);
        }
        if per_page == 0 {
            return Err(PageError::ZeroPerPage);
        }
        Ok(Self { number, per_page })
    }

    /// One-based page number.
    #[must_use]
    pub const fn number(&self) -> usize {
        self.number
    }

    /// Maximum results per page.
    #[must_use]
    pub const fn per_page(&self) -> usize {
        self.per_page
    }

    /// Index range covered by this page within `total` sorted results.
    ///
    /// Returns `None` when the page starts past the end of the results.
    #[must_use]
    pub fn bounds(&self, total: usize) -> Option<Range<usize>> {
        let from = (self.number - 1).saturating_mul(self.per_page);
        let to = from.saturating_add(self.per_page).min(total);
        (from <= to).then_some(from..to)
    }
}

/// Measure, sort and paginate candidate facilities around `query`.
///
/// Results are ordered by ascending distance with the facility id as the
/// tie-break. A page past the end yields an empty vector.
pub fn rank<I>(query: Coord, candidates: I, page: Page) -> Vec<RankedResult>
where
    I: IntoIterator<Item = (Facility, AvailabilitySnapshot)>,
{
    let mut ranked: Vec<RankedResult> = candidates
        .into_iter()
        .map(|(facility, snapshot)| {
            let distance_km = haversine_km(query, facility.location);
            RankedResult::new(facility, &snapshot, distance_km)
        })
        .collect();
    ranked.sort_by(|a, b| {
        a.distance_km
            .total_cmp(&b.distance_km)
            .then_with(|| a.id.cmp(&b.id))
    });

    match page.bounds(ranked.len()) {
        Some(range) => ranked.drain(range).collect(),
        None => Vec::new(),
    }
}
