//! Seams for the collaborators the optimizer consumes.
//!
//! Every collaborator is optional or best-effort: implementations report
//! failure through explicit return values and the optimizer decides how to
//! fall back.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CacheError, ProviderError};
use crate::matrix::DistanceMatrix;
use crate::polyline::Polyline;
use crate::stop::Coordinate;
use crate::tour::Tour;

/// Raw distance table returned by a routing provider.
///
/// Indexed by the order of the locations passed in. May be asymmetric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableData {
    pub distances_km: Vec<Vec<f64>>,
    pub durations_min: Option<Vec<Vec<f64>>>,
}

/// Provides a road-network distance table for a set of locations.
pub trait DistanceTableProvider: Send + Sync {
    fn table_for(&self, locations: &[Coordinate]) -> Result<TableData, ProviderError>;
}

/// Provides the road path travelled along an ordered list of locations.
pub trait RouteGeometryProvider: Send + Sync {
    fn geometry_for(&self, ordered: &[Coordinate]) -> Result<Polyline, ProviderError>;
}

/// Key/value store used for memoisation.
///
/// Calls are best-effort; the caller never lets an error escape.
pub trait CacheBackend: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;

    /// Cheap availability check. Returning `false` lets callers skip `get`/`set` entirely.
    fn is_available(&self) -> bool {
        true
    }
}

/// Outcome of a solver backend run.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendOutcome {
    /// One tour per vehicle.
    Solved(Vec<Tour>),
    /// The backend ran but found no feasible assignment.
    NoAssignment,
    /// The capability is not present in this build or runtime.
    Unavailable,
}

/// A metaheuristic VRP solver capability.
pub trait SolverBackend: Send + Sync {
    fn name(&self) -> &'static str;

    fn solve(
        &self,
        matrix: &DistanceMatrix,
        vehicles: usize,
        depot: usize,
        budget: Duration,
    ) -> BackendOutcome;
}

/// Backend used when no metaheuristic solver is present.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSolver;

impl SolverBackend for NoSolver {
    fn name(&self) -> &'static str {
        "none"
    }

    fn solve(&self, _: &DistanceMatrix, _: usize, _: usize, _: Duration) -> BackendOutcome {
        BackendOutcome::Unavailable
    }
}
