//! VRP solver orchestration.
//!
//! Fallback chain:
//! 1. the injected metaheuristic backend, when present and it finds an
//!    assignment;
//! 2. cluster-and-route: partition stops geographically, then route each
//!    group with the nearest-neighbour heuristic from the depot.
//!
//! Stage 2 cannot fail for non-empty input, so `solve` always returns a
//! valid partition.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::cluster::partition;
use crate::matrix::DistanceMatrix;
use crate::nearest::nearest_neighbor_tour;
use crate::stop::Coordinate;
use crate::tour::{Tour, is_valid_partition};
use crate::traits::{BackendOutcome, NoSolver, SolverBackend};

/// Which stage produced a solution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    Metaheuristic,
    ClusterNearestNeighbor,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    pub tours: Vec<Tour>,
    pub algorithm: Algorithm,
}

#[derive(Clone)]
pub struct VrpSolver {
    backend: Arc<dyn SolverBackend>,
}

impl Default for VrpSolver {
    fn default() -> Self {
        Self::new(Arc::new(NoSolver))
    }
}

impl VrpSolver {
    pub fn new(backend: Arc<dyn SolverBackend>) -> Self {
        Self { backend }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Solves for up to `vehicles` tours over `points`, all closed at
    /// `depot`. The vehicle count is capped at the number of points.
    ///
    /// `matrix` must be indexed like `points`. Callers validate that
    /// `points` is non-empty, `vehicles >= 1` and `depot` is in range.
    pub fn solve(
        &self,
        matrix: &DistanceMatrix,
        points: &[Coordinate],
        vehicles: usize,
        depot: usize,
        budget: Duration,
    ) -> Solution {
        let vehicles = vehicles.min(points.len());
        match self.backend.solve(matrix, vehicles, depot, budget) {
            BackendOutcome::Solved(tours) if is_valid_partition(&tours, points.len(), depot) => {
                debug!(backend = self.backend.name(), "metaheuristic stage succeeded");
                return Solution {
                    tours,
                    algorithm: Algorithm::Metaheuristic,
                };
            }
            BackendOutcome::Solved(_) => {
                warn!(backend = self.backend.name(), "solver returned an invalid partition, falling back");
            }
            BackendOutcome::NoAssignment => {
                warn!(backend = self.backend.name(), "solver found no assignment, falling back");
            }
            BackendOutcome::Unavailable => {
                debug!("no metaheuristic solver present, using cluster-and-route");
            }
        }

        Solution {
            tours: cluster_and_route(points, vehicles, depot),
            algorithm: Algorithm::ClusterNearestNeighbor,
        }
    }
}

/// Partitions `points` into `vehicles` groups and routes each from the
/// depot. Returns `min(vehicles, points.len())` tours; groups that end up
/// holding only the depot get an empty tour.
pub fn cluster_and_route(points: &[Coordinate], vehicles: usize, depot: usize) -> Vec<Tour> {
    if points.is_empty() {
        return Vec::new();
    }
    if vehicles <= 1 {
        return vec![nearest_neighbor_tour(points, depot)];
    }

    let mut tours: Vec<Tour> = partition(points, vehicles)
        .into_iter()
        .map(|mut group| {
            // The depot leads every group so the router seeds at local index 0.
            group.retain(|&index| index != depot);
            group.insert(0, depot);

            let local: Vec<Coordinate> = group.iter().map(|&index| points[index]).collect();
            let order = nearest_neighbor_tour(&local, 0);
            Tour::new(order.indices().iter().map(|&local| group[local]).collect())
        })
        .collect();

    tours.resize_with(vehicles.min(points.len()), || Tour::empty(depot));
    tours
}
