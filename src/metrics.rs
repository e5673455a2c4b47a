//! Cost, time and savings derived from travelled distance.
//!
//! Savings are measured against an assumed unoptimised baseline of
//! `baseline_factor` times the optimised distance. This is a fixed
//! approximation, not a measured naive-order route.

use serde::{Deserialize, Serialize};

use crate::config::OptimizerConfig;
use crate::haversine::round_to;

/// Savings relative to the assumed unoptimised baseline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavingsMetrics {
    pub baseline_distance_km: f64,
    pub distance_saved_km: f64,
    pub distance_saved_percent: f64,
    pub cost_saved_inr: f64,
    pub cost_saved_percent: f64,
    pub time_saved_min: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricsCalculator {
    pub cost_per_km: f64,
    pub avg_speed_kmh: f64,
    pub baseline_factor: f64,
}

impl Default for MetricsCalculator {
    fn default() -> Self {
        Self::from_config(&OptimizerConfig::default())
    }
}

impl MetricsCalculator {
    pub fn from_config(config: &OptimizerConfig) -> Self {
        Self {
            cost_per_km: config.cost_per_km,
            avg_speed_kmh: config.avg_speed_kmh,
            baseline_factor: config.baseline_factor,
        }
    }

    /// Cost in INR, rounded to 2 decimals.
    pub fn distance_to_cost(&self, distance_km: f64) -> f64 {
        round_to(distance_km * self.cost_per_km, 2)
    }

    /// Minutes at the configured average speed, rounded to 1 decimal.
    pub fn distance_to_time(&self, distance_km: f64) -> f64 {
        distance_to_time(distance_km, self.avg_speed_kmh)
    }

    /// Unrounded minutes for a single leg.
    pub fn leg_minutes(&self, distance_km: f64) -> f64 {
        if self.avg_speed_kmh <= 0.0 {
            0.0
        } else {
            distance_km / self.avg_speed_kmh * 60.0
        }
    }

    pub fn savings(&self, optimized_km: f64) -> SavingsMetrics {
        let baseline = optimized_km * self.baseline_factor;
        let saved_km = (baseline - optimized_km).max(0.0);
        let saved_cost = saved_km * self.cost_per_km;
        let baseline_cost = baseline * self.cost_per_km;

        SavingsMetrics {
            baseline_distance_km: round_to(baseline, 2),
            distance_saved_km: round_to(saved_km, 2),
            distance_saved_percent: percent(saved_km, baseline),
            cost_saved_inr: round_to(saved_cost, 2),
            cost_saved_percent: percent(saved_cost, baseline_cost),
            time_saved_min: round_to(self.leg_minutes(saved_km), 1),
        }
    }
}

/// Minutes to cover `distance_km` at `speed_kmh`, rounded to 1 decimal.
/// A non-positive speed yields 0.
pub fn distance_to_time(distance_km: f64, speed_kmh: f64) -> f64 {
    if speed_kmh <= 0.0 {
        return 0.0;
    }
    round_to(distance_km / speed_kmh * 60.0, 1)
}

fn percent(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        round_to((part / whole * 100.0).clamp(0.0, 100.0), 2)
    } else {
        0.0
    }
}
