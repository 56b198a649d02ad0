//! Inverse transverse Mercator projection from SVY21 to WGS84.
//!
//! SVY21 (EPSG:3414) is a transverse Mercator grid on the WGS84 ellipsoid.
//! [`Svy21Projector`] precomputes the meridian-arc and footpoint series once
//! and then converts grid pairs with plain arithmetic, so a shared instance
//! can serve any number of threads.

use std::f64::consts::PI;
use std::sync::LazyLock;

use geo::Coord;

/// WGS84 semi-major axis in metres.
const SEMI_MAJOR_AXIS: f64 = 6_378_137.0;
/// WGS84 flattening.
const FLATTENING: f64 = 1.0 / 298.257_223_563;
/// Origin latitude, 1°22'00" N.
const ORIGIN_LATITUDE: f64 = 1.366_666_666_666_667;
/// Origin longitude, 103°50'00" E.
const ORIGIN_LONGITUDE: f64 = 103.833_333_333_333_3;
/// False northing in metres.
const FALSE_NORTHING: f64 = 38_744.572;
/// False easting in metres.
const FALSE_EASTING: f64 = 28_001.642;
/// Central meridian scale factor.
const SCALE_FACTOR: f64 = 1.0;
/// Largest grid offset from the false origin, in metres, fed to the series.
/// Inputs further out are clamped so finite input always gives finite output.
pub const MAX_GRID_OFFSET: f64 = 1_000_000.0;

const DEGREES_TO_RADIANS: f64 = PI / 180.0;

static DEFAULT_PROJECTOR: LazyLock<Svy21Projector> = LazyLock::new(Svy21Projector::new);

/// Precomputed SVY21 projection constants.
///
/// # Examples
///
/// ```
/// use geo::Coord;
/// use parkside_core::Svy21Projector;
///
/// let projector = Svy21Projector::shared();
/// let wgs84 = projector.project(Coord { x: 28_947.5, y: 29_208.5 });
/// assert!((1.27..1.29).contains(&wgs84.y));
/// assert!((103.7..103.9).contains(&wgs84.x));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Svy21Projector {
    e2: f64,
    n: f64,
    meridian_arc_per_degree: f64,
    origin_meridian_arc: f64,
}

impl Default for Svy21Projector {
    fn default() -> Self {
        Self::new()
    }
}

impl Svy21Projector {
    /// Build a projector for the SVY21 grid parameters.
    #[must_use]
    pub fn new() -> Self {
        let a = SEMI_MAJOR_AXIS;
        let b = a * (1.0 - FLATTENING);
        let e2 = (2.0 * FLATTENING) - (FLATTENING * FLATTENING);
        let n = (a - b) / (a + b);
        let n2 = n * n;
        let n4 = n2 * n2;
        let meridian_arc_per_degree = a
            * (1.0 - n)
            * (1.0 - n2)
            * (1.0 + (9.0 * n2 / 4.0) + (225.0 * n4 / 64.0))
            * DEGREES_TO_RADIANS;
        let origin_meridian_arc = meridian_arc(e2, ORIGIN_LATITUDE);
        Self {
            e2,
            n,
            meridian_arc_per_degree,
            origin_meridian_arc,
        }
    }

    /// Process-wide projector built on first use.
    #[must_use]
    pub fn shared() -> &'static Self {
        &DEFAULT_PROJECTOR
    }

    /// Convert an SVY21 pair (`x = easting`, `y = northing`) into WGS84
    /// degrees (`x = longitude`, `y = latitude`).
    ///
    /// Equal inputs always produce bit-identical outputs. Offsets from the
    /// false origin beyond [`MAX_GRID_OFFSET`] are clamped to it.
    #[must_use]
    pub fn project(&self, grid: Coord) -> Coord {
        let northing_offset = (grid.y - FALSE_NORTHING).clamp(-MAX_GRID_OFFSET, MAX_GRID_OFFSET);
        let e_prime = (grid.x - FALSE_EASTING).clamp(-MAX_GRID_OFFSET, MAX_GRID_OFFSET);
        let k = SCALE_FACTOR;
        let (n, e2) = (self.n, self.e2);
        let n2 = n * n;
        let n3 = n2 * n;
        let n4 = n3 * n;

        let footpoint_arc = self.origin_meridian_arc + northing_offset / k;
        let sigma = (footpoint_arc / self.meridian_arc_per_degree) * DEGREES_TO_RADIANS;
        let lat_prime = sigma
            + ((3.0 * n / 2.0) - (27.0 * n3 / 32.0)) * (2.0 * sigma).sin()
            + ((21.0 * n2 / 16.0) - (55.0 * n4 / 32.0)) * (4.0 * sigma).sin()
            + (151.0 * n3 / 96.0) * (6.0 * sigma).sin()
            + (1097.0 * n4 / 512.0) * (8.0 * sigma).sin();

        let sin_lat = lat_prime.sin();
        let sin2 = sin_lat * sin_lat;
        let rho = SEMI_MAJOR_AXIS * (1.0 - e2) / (1.0 - e2 * sin2).powf(1.5);
        let v = SEMI_MAJOR_AXIS / (1.0 - e2 * sin2).sqrt();
        let psi = v / rho;
        let psi2 = psi * psi;
        let psi3 = psi2 * psi;
        let psi4 = psi3 * psi;
        let t = lat_prime.tan();
        let t2 = t * t;
        let t4 = t2 * t2;
        let t6 = t4 * t2;

        let x = e_prime / (k * v);
        let x2 = x * x;
        let x3 = x2 * x;
        let x5 = x3 * x2;
        let x7 = x5 * x2;

        let lat_factor = t / (k * rho);
        let lat_term1 = lat_factor * (e_prime * x / 2.0);
        let lat_term2 = lat_factor
            * (e_prime * x3 / 24.0)
            * ((-4.0 * psi2) + (9.0 * psi * (1.0 - t2)) + (12.0 * t2));
        let lat_term3 = lat_factor
            * (e_prime * x5 / 720.0)
            * ((8.0 * psi4 * (11.0 - 24.0 * t2)) - (12.0 * psi3 * (21.0 - 71.0 * t2))
                + (15.0 * psi2 * (15.0 - 98.0 * t2 + 15.0 * t4))
                + (180.0 * psi * (5.0 * t2 - 3.0 * t4))
                + (360.0 * t4));
        let lat_term4 = lat_factor
            * (e_prime * x7 / 40_320.0)
            * (1385.0 - 3633.0 * t2 + 4095.0 * t4 + 1575.0 * t6);
        let latitude = lat_prime - lat_term1 + lat_term2 - lat_term3 + lat_term4;

        let sec_lat = lat_prime.cos().recip();
        let lon_term1 = x * sec_lat;
        let lon_term2 = (x3 * sec_lat / 6.0) * (psi + 2.0 * t2);
        let lon_term3 = (x5 * sec_lat / 120.0)
            * ((-4.0 * psi3 * (1.0 - 6.0 * t2))
                + (psi2 * (9.0 - 68.0 * t2))
                + (72.0 * psi * t2)
                + (24.0 * t4));
        let lon_term4 =
            (x7 * sec_lat / 5040.0) * (61.0 + 662.0 * t2 + 1320.0 * t4 + 720.0 * t6);
        let longitude = ORIGIN_LONGITUDE * DEGREES_TO_RADIANS + lon_term1 - lon_term2 + lon_term3
            - lon_term4;

        Coord {
            x: longitude / DEGREES_TO_RADIANS,
            y: latitude / DEGREES_TO_RADIANS,
        }
    }
}

/// Meridian arc length from the equator to `latitude` degrees.
fn meridian_arc(e2: f64, latitude: f64) -> f64 {
    let e4 = e2 * e2;
    let e6 = e4 * e2;
    let a0 = 1.0 - (e2 / 4.0) - (3.0 * e4 / 64.0) - (5.0 * e6 / 256.0);
    let a2 = (3.0 / 8.0) * (e2 + (e4 / 4.0) + (15.0 * e6 / 128.0));
    let a4 = (15.0 / 256.0) * (e4 + (3.0 * e6 / 4.0));
    let a6 = 35.0 * e6 / 3072.0;
    let phi = latitude * DEGREES_TO_RADIANS;
    SEMI_MAJOR_AXIS
        * ((a0 * phi) - (a2 * (2.0 * phi).sin()) + (a4 * (4.0 * phi).sin())
            - (a6 * (6.0 * phi).sin()))
}

/// Convert an SVY21 `(x, y)` pair to `(latitude, longitude)` using the shared
/// projector.
#[must_use]
pub fn svy21_to_wgs84(x: f64, y: f64) -> (f64, f64) {
    let wgs84 = Svy21Projector::shared().project(Coord { x, y });
    (wgs84.y, wgs84.x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn assert_close(actual: f64, expected: f64, tolerance: f64) {
        let delta = (actual - expected).abs();
        assert!(
            delta <= tolerance,
            "expected {expected}, got {actual} (|Δ| = {delta})"
        );
    }

    #[rstest]
    fn grid_origin_maps_to_projection_origin() {
        let (lat, lon) = svy21_to_wgs84(FALSE_EASTING, FALSE_NORTHING);
        assert_close(lat, ORIGIN_LATITUDE, 1e-9);
        assert_close(lon, ORIGIN_LONGITUDE, 1e-9);
    }

    #[rstest]
    #[case(28_947.5, 29_208.5, 1.280_425_8, 103.841_832_2)]
    #[case(30_314.793_6, 31_490.494_2, 1.301_063_3, 103.854_118_0)]
    fn projects_known_points(
        #[case] x: f64,
        #[case] y: f64,
        #[case] lat: f64,
        #[case] lon: f64,
    ) {
        let (actual_lat, actual_lon) = svy21_to_wgs84(x, y);
        assert_close(actual_lat, lat, 1e-6);
        assert_close(actual_lon, lon, 1e-6);
    }

    #[rstest]
    fn zero_input_is_finite_and_not_origin() {
        let (lat, lon) = svy21_to_wgs84(0.0, 0.0);
        assert!(lat.is_finite() && lon.is_finite());
        assert!(lat != 0.0 || lon != 0.0);
        assert_close(lat, 1.016_264, 1e-5);
        assert_close(lon, 103.581_752, 1e-5);
    }

    #[rstest]
    fn repeated_projection_is_bit_identical() {
        let first = svy21_to_wgs84(31_000.25, 33_500.75);
        let second = svy21_to_wgs84(31_000.25, 33_500.75);
        assert_eq!(first.0.to_bits(), second.0.to_bits());
        assert_eq!(first.1.to_bits(), second.1.to_bits());
    }

    #[rstest]
    #[case(1e100, 0.0)]
    #[case(1e50, 1e50)]
    #[case(f64::MAX, f64::MAX)]
    #[case(-f64::MAX, f64::MAX)]
    #[case(0.0, -1e30)]
    fn far_out_of_grid_input_stays_finite(#[case] x: f64, #[case] y: f64) {
        let (lat, lon) = svy21_to_wgs84(x, y);
        assert!(lat.is_finite(), "latitude {lat} for ({x}, {y})");
        assert!(lon.is_finite(), "longitude {lon} for ({x}, {y})");
        assert!((-90.0..=90.0).contains(&lat));
    }

    #[rstest]
    fn offsets_beyond_the_limit_are_clamped() {
        let edge = svy21_to_wgs84(FALSE_EASTING + 2.0 * MAX_GRID_OFFSET, FALSE_NORTHING);
        let beyond = svy21_to_wgs84(1e100, FALSE_NORTHING);
        assert_eq!(edge, beyond);
    }

    #[rstest]
    fn fresh_projector_matches_shared_instance() {
        let grid = Coord {
            x: 25_000.0,
            y: 40_000.0,
        };
        assert_eq!(Svy21Projector::new().project(grid), Svy21Projector::shared().project(grid));
    }
}
