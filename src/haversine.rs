//! Great-circle distances (always available, no external dependency).
//!
//! Less accurate than a road network (ignores roads) but never fails.

use rayon::prelude::*;

use crate::matrix::{DistanceMatrix, MatrixSource};
use crate::stop::Coordinate;

/// Earth radius in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine distance between two points in kilometers.
///
/// Degenerate or numerically invalid input yields 0.0.
pub fn haversine_km(from: Coordinate, to: Coordinate) -> f64 {
    let (lat1, lng1) = from;
    let (lat2, lng2) = to;

    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lng = (lng2 - lng1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    let km = EARTH_RADIUS_KM * c;
    if km.is_finite() { km.max(0.0) } else { 0.0 }
}

/// Total great-circle length along `points`, rounded to 2 decimals.
pub fn route_distance(points: &[Coordinate]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }
    let total: f64 = points
        .windows(2)
        .map(|pair| haversine_km(pair[0], pair[1]))
        .sum();
    round_to(total, 2)
}

pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Builds analytical distance matrices.
#[derive(Debug, Clone, Copy, Default)]
pub struct HaversineMatrix;

impl HaversineMatrix {
    pub fn matrix_for(&self, locations: &[Coordinate]) -> DistanceMatrix {
        let rows: Vec<Vec<f64>> = locations
            .par_iter()
            .enumerate()
            .map(|(i, from)| {
                locations
                    .iter()
                    .enumerate()
                    .map(|(j, to)| if i == j { 0.0 } else { haversine_km(*from, *to) })
                    .collect()
            })
            .collect();

        DistanceMatrix::from_rows(rows, None, MatrixSource::Haversine)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_same_point() {
        let dist = haversine_km((28.6139, 77.2090), (28.6139, 77.2090));
        assert!(dist.abs() < 1e-9, "Same point should have ~0 distance");
    }

    #[test]
    fn test_haversine_known_distance() {
        // Delhi (28.61, 77.21) to Mumbai (19.08, 72.88), roughly 1150 km
        let dist = haversine_km((28.6139, 77.2090), (19.0760, 72.8777));
        assert!(dist > 1100.0 && dist < 1200.0, "Delhi to Mumbai should be ~1150km, got {}", dist);
    }

    #[test]
    fn test_haversine_symmetric() {
        let a = (28.6139, 77.2090);
        let b = (28.5245, 77.1855);
        assert!((haversine_km(a, b) - haversine_km(b, a)).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_input_is_zero() {
        assert_eq!(haversine_km((f64::NAN, 0.0), (1.0, 1.0)), 0.0);
    }

    #[test]
    fn test_route_distance_short_inputs() {
        assert_eq!(route_distance(&[]), 0.0);
        assert_eq!(route_distance(&[(28.6, 77.2)]), 0.0);
    }

    #[test]
    fn test_route_distance_rounded() {
        let points = [(28.6139, 77.2090), (28.6145, 77.2100), (28.6139, 77.2090)];
        let dist = route_distance(&points);
        assert_eq!(dist, round_to(dist, 2));
        assert!(dist > 0.0);
    }

    #[test]
    fn test_matrix_diagonal_is_zero_and_symmetric() {
        let locations = vec![(28.61, 77.20), (28.62, 77.21), (28.50, 77.30)];
        let matrix = HaversineMatrix.matrix_for(&locations);

        for i in 0..locations.len() {
            assert_eq!(matrix.distance(i, i), 0.0, "Diagonal should be zero");
        }
        assert_eq!(matrix.distance(0, 2), matrix.distance(2, 0));
        assert!(matrix.durations().is_none());
    }
}
