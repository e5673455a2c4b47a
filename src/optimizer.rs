//! End-to-end route optimisation.
//!
//! Validates the request, consults the result cache, obtains a distance
//! matrix, solves, enriches each tour with road geometry when available and
//! derives cost/time/savings metrics. Only input violations are reported as
//! errors; every other failure degrades to a fallback.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::cache::{ResultCache, cache_key};
use crate::config::OptimizerConfig;
use crate::error::OptimizeError;
use crate::gls::GuidedLocalSearch;
use crate::haversine::round_to;
use crate::matrix::{DistanceMatrix, DistanceMatrixService, MatrixSource};
use crate::metrics::{MetricsCalculator, SavingsMetrics};
use crate::polyline::Polyline;
use crate::solver::{Algorithm, VrpSolver};
use crate::stop::{Coordinate, Stop};
use crate::tour::{Tour, is_valid_partition};
use crate::traits::{DistanceTableProvider, RouteGeometryProvider, SolverBackend};

#[derive(Debug, Clone, PartialEq)]
pub struct OptimizeRequest {
    pub stops: Vec<Stop>,
    pub vehicles: usize,
    pub depot_index: usize,
    /// Overrides the configured solver budget.
    pub time_limit: Option<Duration>,
}

impl OptimizeRequest {
    pub fn new(stops: Vec<Stop>) -> Self {
        Self {
            stops,
            vehicles: 1,
            depot_index: 0,
            time_limit: None,
        }
    }

    pub fn with_vehicles(mut self, vehicles: usize) -> Self {
        self.vehicles = vehicles;
        self
    }

    pub fn with_depot(mut self, depot_index: usize) -> Self {
        self.depot_index = depot_index;
        self
    }

    pub fn with_time_limit(mut self, time_limit: Duration) -> Self {
        self.time_limit = Some(time_limit);
        self
    }
}

/// One entry of a vehicle's itinerary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteStop {
    pub sequence: usize,
    pub stop_index: usize,
    pub stop_id: i64,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub distance_from_previous_km: f64,
    pub time_from_previous_min: f64,
    pub cumulative_distance_km: f64,
    pub cumulative_time_min: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleRoute {
    pub vehicle: usize,
    pub tour: Tour,
    /// Every tour position, including the closing return to the depot.
    pub stops: Vec<RouteStop>,
    pub distance_km: f64,
    pub time_min: f64,
    pub path: Polyline,
    /// Great-circle length along `path`.
    pub path_km: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub routes: Vec<VehicleRoute>,
    pub total_distance_km: f64,
    pub total_cost_inr: f64,
    pub total_time_min: f64,
    pub computation_time_ms: u64,
    pub algorithm: Algorithm,
    pub distance_source: MatrixSource,
    pub from_cache: bool,
    pub metrics: SavingsMetrics,
}

impl OptimizationResult {
    pub fn tours(&self) -> Vec<&Tour> {
        self.routes.iter().map(|route| &route.tour).collect()
    }
}

/// Per-leg values along one tour.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct Leg {
    distance_km: f64,
    minutes: f64,
}

/// Stop-independent part of a solution; this is what gets cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct SolvedRoutes {
    tours: Vec<Tour>,
    legs: Vec<Vec<Leg>>,
    paths: Vec<Polyline>,
    algorithm: Algorithm,
    distance_source: MatrixSource,
}

impl SolvedRoutes {
    /// Whether this payload can be laid over `stop_count` stops. Cache
    /// entries come from a shared backend and are checked before use.
    fn fits(&self, stop_count: usize, depot: usize) -> bool {
        self.legs.len() == self.tours.len()
            && self.paths.len() == self.tours.len()
            && is_valid_partition(&self.tours, stop_count, depot)
            && self
                .tours
                .iter()
                .zip(&self.legs)
                .all(|(tour, legs)| legs.len() + 1 == tour.len())
    }
}

#[derive(Serialize)]
struct RouteKey<'a> {
    coords: &'a [Coordinate],
    vehicles: usize,
    depot: usize,
}

/// Route optimisation service. Collaborators are injected explicitly.
#[derive(Clone)]
pub struct RouteOptimizer {
    config: OptimizerConfig,
    table_provider: Option<Arc<dyn DistanceTableProvider>>,
    geometry_provider: Option<Arc<dyn RouteGeometryProvider>>,
    solver: VrpSolver,
    cache: ResultCache,
    metrics: MetricsCalculator,
}

impl Default for RouteOptimizer {
    fn default() -> Self {
        Self::new(OptimizerConfig::default())
    }
}

impl RouteOptimizer {
    /// Haversine distances, no metaheuristic, no cache.
    pub fn new(config: OptimizerConfig) -> Self {
        let metrics = MetricsCalculator::from_config(&config);
        Self {
            config,
            table_provider: None,
            geometry_provider: None,
            solver: VrpSolver::default(),
            cache: ResultCache::disabled(),
            metrics,
        }
    }

    /// Built-in guided local search with an in-memory cache.
    pub fn standard(config: OptimizerConfig) -> Self {
        let workers = config.search_workers;
        Self::new(config)
            .with_solver_backend(Arc::new(GuidedLocalSearch::new(workers)))
            .with_cache(ResultCache::in_memory())
    }

    pub fn with_table_provider(mut self, provider: Arc<dyn DistanceTableProvider>) -> Self {
        self.table_provider = Some(provider);
        self
    }

    pub fn with_geometry_provider(mut self, provider: Arc<dyn RouteGeometryProvider>) -> Self {
        self.geometry_provider = Some(provider);
        self
    }

    pub fn with_solver_backend(mut self, backend: Arc<dyn SolverBackend>) -> Self {
        self.solver = VrpSolver::new(backend);
        self
    }

    pub fn with_cache(mut self, cache: ResultCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    pub fn metrics(&self) -> &MetricsCalculator {
        &self.metrics
    }

    fn matrix_service(&self) -> DistanceMatrixService {
        let service = DistanceMatrixService::new(self.cache.clone(), self.config.table_ttl);
        match &self.table_provider {
            Some(provider) => service.with_provider(provider.clone()),
            None => service,
        }
    }

    /// Checks the caller contract.
    pub fn validate(&self, request: &OptimizeRequest) -> Result<(), OptimizeError> {
        let count = request.stops.len();
        if count < self.config.min_stops {
            return Err(OptimizeError::TooFewStops {
                min: self.config.min_stops,
                actual: count,
            });
        }
        if count > self.config.max_stops {
            return Err(OptimizeError::TooManyStops {
                max: self.config.max_stops,
                actual: count,
            });
        }
        if request.vehicles == 0 {
            return Err(OptimizeError::NoVehicles);
        }
        if request.depot_index >= count {
            return Err(OptimizeError::DepotOutOfRange {
                depot: request.depot_index,
                stops: count,
            });
        }

        let mut ids = HashSet::with_capacity(count);
        for stop in &request.stops {
            // Deserialised stops bypass Stop::new, so re-check here.
            Stop::new(stop.id(), stop.name(), stop.latitude(), stop.longitude())?;
            if !ids.insert(stop.id()) {
                return Err(OptimizeError::DuplicateStopId(stop.id()));
            }
        }
        Ok(())
    }

    pub fn optimize(&self, request: &OptimizeRequest) -> Result<OptimizationResult, OptimizeError> {
        self.validate(request)?;
        let started = Instant::now();

        // No point in more tours than stops.
        let vehicles = request.vehicles.min(request.stops.len());
        let coords: Vec<Coordinate> = request.stops.iter().map(Stop::coordinate).collect();
        let key = cache_key(
            "route",
            &RouteKey {
                coords: &coords,
                vehicles,
                depot: request.depot_index,
            },
        );

        let cached = self
            .cache
            .get::<SolvedRoutes>(&key)
            .filter(|solved| {
                let fits = solved.fits(coords.len(), request.depot_index);
                if !fits {
                    warn!(key = %key, "cached routes do not match request, recomputing");
                }
                fits
            });

        let (solved, from_cache) = match cached {
            Some(solved) => {
                debug!(key = %key, "route cache hit");
                (solved, true)
            }
            None => {
                let solved = self.solve(request, vehicles, &coords);
                self.cache.set(&key, &solved, self.config.route_ttl);
                (solved, false)
            }
        };

        let mut result = self.assemble(&request.stops, solved, from_cache);
        result.computation_time_ms = started.elapsed().as_millis() as u64;

        info!(
            stops = request.stops.len(),
            vehicles,
            distance_km = result.total_distance_km,
            algorithm = ?result.algorithm,
            from_cache,
            elapsed_ms = result.computation_time_ms,
            "route optimized"
        );
        Ok(result)
    }

    fn solve(&self, request: &OptimizeRequest, vehicles: usize, coords: &[Coordinate]) -> SolvedRoutes {
        let matrix = self.matrix_service().matrix_for(coords);
        let budget = request.time_limit.unwrap_or(self.config.time_limit);
        let solution = self.solver.solve(
            &matrix,
            coords,
            vehicles,
            request.depot_index,
            budget,
        );

        let legs = solution
            .tours
            .iter()
            .map(|tour| self.legs_for(&matrix, tour))
            .collect();
        let paths = solution
            .tours
            .iter()
            .map(|tour| self.path_for(tour, coords))
            .collect();

        SolvedRoutes {
            tours: solution.tours,
            legs,
            paths,
            algorithm: solution.algorithm,
            distance_source: matrix.source(),
        }
    }

    fn legs_for(&self, matrix: &DistanceMatrix, tour: &Tour) -> Vec<Leg> {
        tour.legs()
            .map(|(from, to)| {
                let distance_km = matrix.distance(from, to);
                let minutes = matrix
                    .duration(from, to)
                    .unwrap_or_else(|| self.metrics.leg_minutes(distance_km));
                Leg {
                    distance_km,
                    minutes,
                }
            })
            .collect()
    }

    fn path_for(&self, tour: &Tour, coords: &[Coordinate]) -> Polyline {
        let ordered: Vec<Coordinate> = tour.indices().iter().map(|&i| coords[i]).collect();
        let Some(provider) = &self.geometry_provider else {
            return Polyline::straight_line(&ordered);
        };
        if tour.len() <= 2 {
            return Polyline::straight_line(&ordered);
        }

        match provider.geometry_for(&ordered) {
            Ok(polyline) if !polyline.is_empty() => polyline,
            Ok(_) => Polyline::straight_line(&ordered),
            Err(err) => {
                warn!(error = %err, "route geometry unavailable, using straight lines");
                Polyline::straight_line(&ordered)
            }
        }
    }

    fn assemble(&self, stops: &[Stop], solved: SolvedRoutes, from_cache: bool) -> OptimizationResult {
        let mut total_km = 0.0;
        let mut routes = Vec::with_capacity(solved.tours.len());

        for (vehicle, ((tour, legs), path)) in solved
            .tours
            .into_iter()
            .zip(solved.legs)
            .zip(solved.paths)
            .enumerate()
        {
            let mut cumulative_km = 0.0;
            let mut cumulative_min = 0.0;
            let mut route_stops = Vec::with_capacity(tour.len());

            for (sequence, &index) in tour.indices().iter().enumerate() {
                let leg = match sequence {
                    0 => Leg {
                        distance_km: 0.0,
                        minutes: 0.0,
                    },
                    _ => legs[sequence - 1],
                };
                cumulative_km += leg.distance_km;
                cumulative_min += leg.minutes;

                let stop = &stops[index];
                route_stops.push(RouteStop {
                    sequence,
                    stop_index: index,
                    stop_id: stop.id(),
                    name: stop.name().to_string(),
                    latitude: stop.latitude(),
                    longitude: stop.longitude(),
                    distance_from_previous_km: round_to(leg.distance_km, 3),
                    time_from_previous_min: round_to(leg.minutes, 1),
                    cumulative_distance_km: round_to(cumulative_km, 3),
                    cumulative_time_min: round_to(cumulative_min, 1),
                });
            }

            total_km += cumulative_km;
            routes.push(VehicleRoute {
                vehicle,
                tour,
                stops: route_stops,
                distance_km: round_to(cumulative_km, 2),
                time_min: round_to(cumulative_min, 1),
                path_km: path.length_km(),
                path,
            });
        }

        let total_distance_km = round_to(total_km, 2);
        OptimizationResult {
            routes,
            total_distance_km,
            total_cost_inr: self.metrics.distance_to_cost(total_distance_km),
            total_time_min: self.metrics.distance_to_time(total_distance_km),
            computation_time_ms: 0,
            algorithm: solved.algorithm,
            distance_source: solved.distance_source,
            from_cache,
            metrics: self.metrics.savings(total_distance_km),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::CacheBackend;

    fn stop(id: i64, lat: f64, lng: f64) -> Stop {
        Stop::new(id, format!("stop {}", id), lat, lng).unwrap()
    }

    fn delhi() -> Vec<Stop> {
        vec![
            stop(1, 28.6139, 77.2090),
            stop(2, 28.6145, 77.2100),
            stop(3, 28.6150, 77.2110),
        ]
    }

    #[test]
    fn test_validate_rejects_single_stop() {
        let optimizer = RouteOptimizer::default();
        let err = optimizer
            .validate(&OptimizeRequest::new(vec![stop(1, 0.0, 0.0)]))
            .unwrap_err();
        assert_eq!(err, OptimizeError::TooFewStops { min: 2, actual: 1 });
    }

    #[test]
    fn test_validate_rejects_zero_vehicles() {
        let request = OptimizeRequest::new(delhi()).with_vehicles(0);
        assert_eq!(
            RouteOptimizer::default().validate(&request),
            Err(OptimizeError::NoVehicles)
        );
    }

    #[test]
    fn test_validate_rejects_depot_out_of_range() {
        let request = OptimizeRequest::new(delhi()).with_depot(3);
        assert_eq!(
            RouteOptimizer::default().validate(&request),
            Err(OptimizeError::DepotOutOfRange { depot: 3, stops: 3 })
        );
    }

    #[test]
    fn test_validate_rejects_duplicate_ids() {
        let stops = vec![stop(1, 28.6, 77.2), stop(1, 28.7, 77.3)];
        assert_eq!(
            RouteOptimizer::default().validate(&OptimizeRequest::new(stops)),
            Err(OptimizeError::DuplicateStopId(1))
        );
    }

    #[test]
    fn test_validate_rejects_deserialised_bad_coordinates() {
        let json = r#"{"id": 9, "name": "x", "street": null, "city": null,
            "postal_code": null, "latitude": 120.0, "longitude": 0.0}"#;
        let bad: Stop = serde_json::from_str(json).unwrap();
        let request = OptimizeRequest::new(vec![stop(1, 0.0, 0.0), bad]);
        assert!(matches!(
            RouteOptimizer::default().validate(&request),
            Err(OptimizeError::InvalidCoordinate { id: 9, .. })
        ));
    }

    #[test]
    fn test_too_many_stops() {
        let config = OptimizerConfig {
            max_stops: 2,
            ..OptimizerConfig::default()
        };
        let err = RouteOptimizer::new(config)
            .optimize(&OptimizeRequest::new(delhi()))
            .unwrap_err();
        assert_eq!(err, OptimizeError::TooManyStops { max: 2, actual: 3 });
    }

    #[test]
    fn test_vehicles_capped_at_stop_count() {
        let result = RouteOptimizer::default()
            .optimize(&OptimizeRequest::new(delhi()).with_vehicles(usize::MAX))
            .unwrap();

        assert_eq!(result.routes.len(), 3);
        assert!(is_valid_partition(&result.tours().into_iter().cloned().collect::<Vec<_>>(), 3, 0));
    }

    #[test]
    fn test_foreign_cache_entry_is_recomputed() {
        let backend = Arc::new(crate::cache::MemoryCache::new());
        let optimizer = RouteOptimizer::default().with_cache(ResultCache::new(backend.clone()));
        let request = OptimizeRequest::new(delhi());
        let coords: Vec<Coordinate> = request.stops.iter().map(Stop::coordinate).collect();
        let key = cache_key(
            "route",
            &RouteKey {
                coords: &coords,
                vehicles: 1,
                depot: 0,
            },
        );

        let foreign = SolvedRoutes {
            tours: vec![Tour::new(vec![0, 7, 0])],
            legs: vec![vec![Leg { distance_km: 1.0, minutes: 2.0 }; 2]],
            paths: vec![Polyline::new(Vec::new())],
            algorithm: Algorithm::Metaheuristic,
            distance_source: MatrixSource::Provider,
        };
        let raw = serde_json::to_string(&foreign).unwrap();
        backend.set(&key, &raw, Duration::from_secs(60)).unwrap();

        let result = optimizer.optimize(&request).unwrap();
        assert!(!result.from_cache);
        assert_eq!(result.algorithm, Algorithm::ClusterNearestNeighbor);
        assert_eq!(result.routes[0].tour.len(), 4);
    }

    #[test]
    fn test_cached_legs_must_match_tours() {
        let solved = SolvedRoutes {
            tours: vec![Tour::new(vec![0, 1, 2, 0])],
            legs: vec![vec![Leg { distance_km: 1.0, minutes: 2.0 }]],
            paths: vec![Polyline::new(Vec::new())],
            algorithm: Algorithm::ClusterNearestNeighbor,
            distance_source: MatrixSource::Haversine,
        };
        assert!(!solved.fits(3, 0));
        assert!(!SolvedRoutes { legs: Vec::new(), ..solved.clone() }.fits(3, 0));

        let complete = SolvedRoutes {
            legs: vec![vec![Leg { distance_km: 1.0, minutes: 2.0 }; 3]],
            ..solved
        };
        assert!(complete.fits(3, 0));
        assert!(!complete.fits(4, 0));
    }

    #[test]
    fn test_path_km_follows_path() {
        let result = RouteOptimizer::default()
            .optimize(&OptimizeRequest::new(delhi()))
            .unwrap();
        let route = &result.routes[0];
        assert_eq!(route.path_km, route.path.length_km());
        assert!(route.path_km > 0.0);
    }

    #[test]
    fn test_route_stops_cumulative() {
        let result = RouteOptimizer::default()
            .optimize(&OptimizeRequest::new(delhi()))
            .unwrap();
        let route = &result.routes[0];

        assert_eq!(route.stops.len(), 4);
        assert_eq!(route.stops[0].cumulative_distance_km, 0.0);
        let last = route.stops.last().unwrap();
        assert_eq!(last.stop_id, 1);
        assert!((last.cumulative_distance_km - route.distance_km).abs() < 0.01);
        assert_eq!(route.path.points().len(), 4);
    }
}
