//! route-optimizer core
//!
//! Near-optimal visiting orders over geographic stops, split across one or
//! more vehicles that all start and end at a depot, with cost/time metrics
//! relative to a naive baseline.

pub mod cache;
pub mod cluster;
pub mod config;
pub mod error;
pub mod gls;
pub mod haversine;
pub mod matrix;
pub mod metrics;
pub mod nearest;
pub mod optimizer;
pub mod osrm;
pub mod polyline;
pub mod solver;
pub mod stop;
pub mod tour;
pub mod traits;

pub use config::OptimizerConfig;
pub use error::OptimizeError;
pub use optimizer::{OptimizationResult, OptimizeRequest, RouteOptimizer};
pub use stop::Stop;
