//! Test fixtures for route-optimizer.
//!
//! Provides realistic test data:
//! - Real Delhi NCR landmark locations
//! - Helpers to turn them into stops

pub mod delhi_locations;

pub use delhi_locations::*;
