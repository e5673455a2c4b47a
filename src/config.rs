//! Optimizer configuration.

use std::time::Duration;

/// Tunables for the optimisation pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizerConfig {
    /// Cost per kilometre (INR).
    pub cost_per_km: f64,
    /// Average driving speed used for time estimates.
    pub avg_speed_kmh: f64,
    /// Unoptimised baseline as a multiple of the optimised distance.
    pub baseline_factor: f64,
    /// Solver time budget.
    pub time_limit: Duration,
    /// Parallel search workers for the metaheuristic stage.
    pub search_workers: usize,
    /// TTL for cached distance tables.
    pub table_ttl: Duration,
    /// TTL for cached solved routes.
    pub route_ttl: Duration,
    pub min_stops: usize,
    pub max_stops: usize,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            cost_per_km: 12.0,
            avg_speed_kmh: 30.0,
            baseline_factor: 1.3,
            time_limit: Duration::from_secs(2),
            search_workers: 8,
            table_ttl: Duration::from_secs(3600),
            route_ttl: Duration::from_secs(600),
            min_stops: 2,
            max_stops: 1000,
        }
    }
}

impl OptimizerConfig {
    /// Reads overrides from `ROUTE_OPTIMIZER_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup.
    ///
    /// Missing or unparsable values keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let parse_f64 = |key: &str| lookup(key).and_then(|v| v.trim().parse::<f64>().ok());
        let parse_u64 = |key: &str| lookup(key).and_then(|v| v.trim().parse::<u64>().ok());

        if let Some(value) = parse_f64("ROUTE_OPTIMIZER_COST_PER_KM") {
            config.cost_per_km = value;
        }
        if let Some(value) = parse_f64("ROUTE_OPTIMIZER_AVG_SPEED_KMH") {
            config.avg_speed_kmh = value;
        }
        if let Some(secs) = parse_u64("ROUTE_OPTIMIZER_TIME_LIMIT_SECS") {
            config.time_limit = Duration::from_secs(secs);
        }
        if let Some(workers) = parse_u64("ROUTE_OPTIMIZER_SEARCH_WORKERS") {
            config.search_workers = (workers as usize).max(1);
        }
        if let Some(secs) = parse_u64("ROUTE_OPTIMIZER_TABLE_TTL_SECS") {
            config.table_ttl = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_u64("ROUTE_OPTIMIZER_ROUTE_TTL_SECS") {
            config.route_ttl = Duration::from_secs(secs);
        }
        if let Some(max) = parse_u64("ROUTE_OPTIMIZER_MAX_STOPS") {
            config.max_stops = max as usize;
        }

        config
    }
}
