//! Property-based tests for projection and distance ranking.
//!
//! # Invariants tested
//!
//! - **Finite projection:** any finite grid pair projects to finite degrees.
//! - **Identity:** the distance from a point to itself is zero.
//! - **Symmetry:** swapping the endpoints changes the distance by at most 1e-6 km.
//! - **Ordering:** ranked results are sorted by ascending distance.
//! - **Pagination:** a page never exceeds `per_page` and pages tile the results.

use chrono::Utc;
use geo::Coord;
use parkside_core::{AvailabilitySnapshot, Facility, Page, haversine_km, rank, svy21_to_wgs84};
use proptest::prelude::*;

fn coord_strategy() -> impl Strategy<Value = Coord> {
    (-90.0f64..=90.0, -180.0f64..=180.0).prop_map(|(lat, lon)| Coord { x: lon, y: lat })
}

fn candidates_strategy() -> impl Strategy<Value = Vec<(Facility, AvailabilitySnapshot)>> {
    prop::collection::vec((1.0f64..1.5, 103.6f64..104.0, 1i64..500), 0..40).prop_map(|rows| {
        rows.into_iter()
            .enumerate()
            .map(|(index, (lat, lon, lots))| {
                let id = format!("F{index:03}");
                let facility = Facility::new(
                    id.as_str(),
                    "address",
                    Coord { x: lon, y: lat },
                    Coord { x: 0.0, y: 0.0 },
                    100,
                )
                .expect("generated facility is valid");
                let snapshot = AvailabilitySnapshot {
                    facility_id: id,
                    available_lots: lots,
                    last_updated: Utc::now(),
                };
                (facility, snapshot)
            })
            .collect()
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property: finite grid input never projects to NaN or infinity.
    #[test]
    fn projection_of_finite_input_is_finite(
        x in prop::num::f64::NORMAL | prop::num::f64::ZERO,
        y in prop::num::f64::NORMAL | prop::num::f64::ZERO,
    ) {
        let (lat, lon) = svy21_to_wgs84(x, y);
        prop_assert!(lat.is_finite() && lon.is_finite());
    }

    /// Property: a point is zero kilometres from itself.
    #[test]
    fn distance_to_self_is_zero(point in coord_strategy()) {
        prop_assert_eq!(haversine_km(point, point), 0.0);
    }

    /// Property: distance does not depend on argument order.
    #[test]
    fn distance_is_symmetric(a in coord_strategy(), b in coord_strategy()) {
        let forward = haversine_km(a, b);
        let backward = haversine_km(b, a);
        prop_assert!((forward - backward).abs() <= 1e-6);
        prop_assert!(forward >= 0.0 && forward.is_finite());
    }

    /// Property: ranked results are sorted by distance.
    #[test]
    fn ranking_is_sorted(
        query in coord_strategy(),
        candidates in candidates_strategy(),
    ) {
        let total = candidates.len();
        let page = Page::new(1, total.max(1)).expect("valid page");
        let results = rank(query, candidates, page);
        prop_assert_eq!(results.len(), total);
        for pair in results.windows(2) {
            prop_assert!(pair[0].distance_km <= pair[1].distance_km);
        }
    }

    /// Property: pages are bounded and concatenate to the full ranking.
    #[test]
    fn pages_tile_the_ranking(
        candidates in candidates_strategy(),
        per_page in 1usize..12,
    ) {
        let query = Coord { x: 103.8, y: 1.3 };
        let total = candidates.len();
        let everything = rank(query, candidates.clone(), Page::new(1, total.max(1)).expect("valid page"));

        let mut stitched = Vec::new();
        let page_count = total.div_ceil(per_page);
        for number in 1..=page_count + 1 {
            let page = Page::new(number, per_page).expect("valid page");
            let chunk = rank(query, candidates.clone(), page);
            prop_assert!(chunk.len() <= per_page);
            if number > page_count {
                prop_assert!(chunk.is_empty());
            }
            stitched.extend(chunk);
        }
        prop_assert_eq!(stitched, everything);
    }
}
