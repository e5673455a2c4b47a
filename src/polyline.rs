//! Route geometry as decoded coordinate sequences.
//!
//! Providers hand back GeoJSON-ordered `[lng, lat]` pairs; internally every
//! point is `(lat, lng)`.

use serde::{Deserialize, Serialize};

use crate::haversine::route_distance;
use crate::stop::Coordinate;

/// The path travelled along one tour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polyline {
    points: Vec<Coordinate>,
}

impl Polyline {
    pub fn new(points: Vec<Coordinate>) -> Self {
        Self { points }
    }

    /// Straight segments between the ordered stops, used when no road
    /// geometry is available.
    pub fn straight_line(stops: &[Coordinate]) -> Self {
        Self::new(stops.to_vec())
    }

    /// Converts GeoJSON `[lng, lat]` positions.
    pub fn from_lng_lat(positions: &[[f64; 2]]) -> Self {
        Self::new(positions.iter().map(|[lng, lat]| (*lat, *lng)).collect())
    }

    pub fn points(&self) -> &[Coordinate] {
        &self.points
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Great-circle length along the points, rounded to 2 decimals.
    pub fn length_km(&self) -> f64 {
        route_distance(&self.points)
    }
}
