//! Greedy nearest-neighbour tours, accelerated by a uniform spatial grid.

use std::collections::HashMap;

use crate::haversine::haversine_km;
use crate::stop::Coordinate;
use crate::tour::Tour;

/// Number of cells along the combined lat+lng span.
const GRID_DIVISIONS: f64 = 50.0;

/// Smallest allowed cell edge, in degrees.
const MIN_CELL_SIZE: f64 = 1e-6;

type Cell = (i64, i64);

/// Uniform bucket grid over the bounding box of a point set.
#[derive(Debug, Clone)]
pub struct SpatialGrid {
    min_lat: f64,
    min_lng: f64,
    cell_size: f64,
    buckets: HashMap<Cell, Vec<usize>>,
}

impl SpatialGrid {
    pub fn new(points: &[Coordinate]) -> Self {
        let (mut min_lat, mut max_lat) = (f64::INFINITY, f64::NEG_INFINITY);
        let (mut min_lng, mut max_lng) = (f64::INFINITY, f64::NEG_INFINITY);
        for &(lat, lng) in points {
            min_lat = min_lat.min(lat);
            max_lat = max_lat.max(lat);
            min_lng = min_lng.min(lng);
            max_lng = max_lng.max(lng);
        }
        if points.is_empty() {
            (min_lat, max_lat, min_lng, max_lng) = (0.0, 0.0, 0.0, 0.0);
        }

        let span = (max_lat - min_lat) + (max_lng - min_lng);
        let cell_size = (span / GRID_DIVISIONS).max(MIN_CELL_SIZE);

        let mut grid = Self {
            min_lat,
            min_lng,
            cell_size,
            buckets: HashMap::new(),
        };
        for (index, &point) in points.iter().enumerate() {
            let cell = grid.cell_of(point);
            grid.buckets.entry(cell).or_default().push(index);
        }
        grid
    }

    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    pub fn cell_of(&self, (lat, lng): Coordinate) -> Cell {
        (
            ((lat - self.min_lat) / self.cell_size).floor() as i64,
            ((lng - self.min_lng) / self.cell_size).floor() as i64,
        )
    }

    /// Point indices in the cell containing `point` and its 8 neighbours,
    /// in row-major neighbour order.
    pub fn neighbourhood(&self, point: Coordinate) -> impl Iterator<Item = usize> + '_ {
        let (cx, cy) = self.cell_of(point);
        (-1..=1)
            .flat_map(move |dx| (-1..=1).map(move |dy| (cx + dx, cy + dy)))
            .filter_map(|cell| self.buckets.get(&cell))
            .flatten()
            .copied()
    }
}

/// Builds a closed tour from `depot` by repeatedly moving to the nearest
/// unvisited point.
///
/// Candidates come from the grid neighbourhood of the current point; when
/// none of them is unvisited every remaining point is scanned. Ties go to the
/// first candidate seen. Returns an empty tour for empty input.
pub fn nearest_neighbor_tour(points: &[Coordinate], depot: usize) -> Tour {
    let n = points.len();
    if n == 0 {
        return Tour::new(Vec::new());
    }

    let grid = SpatialGrid::new(points);
    let mut visited = vec![false; n];
    visited[depot] = true;
    let mut route = Vec::with_capacity(n + 1);
    route.push(depot);
    let mut current = depot;

    for _ in 1..n {
        let from = points[current];
        let closest = |candidates: &mut dyn Iterator<Item = usize>| {
            let mut best: Option<(usize, f64)> = None;
            for candidate in candidates {
                if visited[candidate] {
                    continue;
                }
                let distance = haversine_km(from, points[candidate]);
                if best.is_none_or(|(_, best_distance)| distance < best_distance) {
                    best = Some((candidate, distance));
                }
            }
            best
        };

        let next = closest(&mut grid.neighbourhood(from))
            .or_else(|| closest(&mut (0..n)))
            .map(|(index, _)| index);

        // Unreachable while unvisited points remain; the exhaustive scan
        // always finds one.
        let Some(next) = next else { break };
        visited[next] = true;
        route.push(next);
        current = next;
    }

    route.push(depot);
    Tour::new(route)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tour::is_valid_partition;

    #[test]
    fn test_cell_size_has_floor() {
        let grid = SpatialGrid::new(&[(10.0, 10.0), (10.0, 10.0)]);
        assert_eq!(grid.cell_size(), MIN_CELL_SIZE);
    }

    #[test]
    fn test_cell_size_from_span() {
        let grid = SpatialGrid::new(&[(0.0, 0.0), (1.0, 4.0)]);
        assert!((grid.cell_size() - 0.1).abs() < 1e-12);
        assert_eq!(grid.cell_of((0.0, 0.0)), (0, 0));
        assert_eq!(grid.cell_of((0.55, 0.25)), (5, 2));
    }

    #[test]
    fn test_two_points() {
        let tour = nearest_neighbor_tour(&[(28.61, 77.20), (28.62, 77.21)], 0);
        assert_eq!(tour.indices(), &[0, 1, 0]);
    }

    #[test]
    fn test_single_point_returns_to_depot() {
        let tour = nearest_neighbor_tour(&[(28.61, 77.20)], 0);
        assert_eq!(tour.indices(), &[0, 0]);
    }

    #[test]
    fn test_empty_input() {
        assert!(nearest_neighbor_tour(&[], 0).is_empty());
    }

    #[test]
    fn test_visits_in_line_order() {
        let points = vec![(0.0, 0.0), (0.0, 3.0), (0.0, 1.0), (0.0, 2.0)];
        let tour = nearest_neighbor_tour(&points, 0);
        assert_eq!(tour.indices(), &[0, 2, 3, 1, 0]);
    }

    #[test]
    fn test_falls_back_to_full_scan_for_far_points() {
        // Dense cluster plus one outlier far outside any neighbourhood.
        let mut points: Vec<Coordinate> = (0..20).map(|i| (0.0, i as f64 * 0.001)).collect();
        points.push((5.0, 5.0));
        let tour = nearest_neighbor_tour(&points, 0);

        assert!(is_valid_partition(&[tour.clone()], points.len(), 0));
        assert_eq!(tour.indices()[tour.len() - 2], 20);
    }

    #[test]
    fn test_depot_not_first_index() {
        let points = vec![(0.0, 1.0), (0.0, 0.0), (0.0, 2.0)];
        let tour = nearest_neighbor_tour(&points, 1);
        assert_eq!(tour.indices(), &[1, 0, 2, 1]);
    }

    #[test]
    fn test_large_input_is_complete() {
        let points: Vec<Coordinate> = (0..500)
            .map(|i| (28.4 + (i % 25) as f64 * 0.01, 77.0 + (i / 25) as f64 * 0.013))
            .collect();
        let tour = nearest_neighbor_tour(&points, 7);
        assert_eq!(tour.len(), points.len() + 1);
        assert!(is_valid_partition(&[tour], points.len(), 7));
    }
}
