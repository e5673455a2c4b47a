//! Distance matrices and the service that obtains them.
//!
//! A matrix is always obtainable for non-empty input: provider tables are an
//! optional enrichment and any provider failure falls back to great-circle
//! distances.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::cache::{ResultCache, cache_key};
use crate::error::ProviderError;
use crate::haversine::{HaversineMatrix, round_to};
use crate::stop::Coordinate;
use crate::tour::Tour;
use crate::traits::{DistanceTableProvider, TableData};

/// Where a matrix's values came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatrixSource {
    Provider,
    Haversine,
}

/// Square distance (km) and optional duration (minutes) matrix.
///
/// The diagonal is always zero.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceMatrix {
    size: usize,
    distances: Vec<f64>,
    durations: Option<Vec<f64>>,
    source: MatrixSource,
}

impl DistanceMatrix {
    /// Builds a matrix from square rows. Diagonal entries are forced to zero.
    pub fn from_rows(
        rows: Vec<Vec<f64>>,
        duration_rows: Option<Vec<Vec<f64>>>,
        source: MatrixSource,
    ) -> Self {
        let size = rows.len();
        let flatten = |rows: Vec<Vec<f64>>| {
            let mut flat = Vec::with_capacity(size * size);
            for (i, row) in rows.into_iter().enumerate() {
                for (j, value) in row.into_iter().enumerate() {
                    flat.push(if i == j { 0.0 } else { value });
                }
            }
            flat
        };

        Self {
            size,
            distances: flatten(rows),
            durations: duration_rows.map(flatten),
            source,
        }
    }

    /// Validates a provider table against the expected size.
    pub fn from_table(table: TableData, expected: usize) -> Result<Self, ProviderError> {
        check_square(&table.distances_km, expected, "distances")?;
        if let Some(durations) = &table.durations_min {
            check_square(durations, expected, "durations")?;
        }
        Ok(Self::from_rows(
            table.distances_km,
            table.durations_min,
            MatrixSource::Provider,
        ))
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn source(&self) -> MatrixSource {
        self.source
    }

    pub fn distance(&self, from: usize, to: usize) -> f64 {
        self.distances[from * self.size + to]
    }

    /// Travel time in minutes, if the matrix carries durations.
    pub fn duration(&self, from: usize, to: usize) -> Option<f64> {
        self.durations
            .as_ref()
            .map(|durations| durations[from * self.size + to])
    }

    pub fn durations(&self) -> Option<&[f64]> {
        self.durations.as_deref()
    }

    pub fn is_symmetric(&self) -> bool {
        (0..self.size).all(|i| {
            (i + 1..self.size).all(|j| (self.distance(i, j) - self.distance(j, i)).abs() < 1e-9)
        })
    }

    /// Sum of consecutive distances along `tour`, rounded to 2 decimals.
    pub fn route_distance(&self, tour: &Tour) -> f64 {
        if tour.len() < 2 {
            return 0.0;
        }
        round_to(tour.legs().map(|(a, b)| self.distance(a, b)).sum(), 2)
    }

    /// Integral arc costs in metres, row-major.
    pub fn scaled_costs(&self) -> Vec<i64> {
        self.distances
            .iter()
            .map(|km| (km * 1000.0).round() as i64)
            .collect()
    }
}

fn check_square(rows: &[Vec<f64>], expected: usize, what: &str) -> Result<(), ProviderError> {
    if rows.len() != expected || rows.iter().any(|row| row.len() != expected) {
        return Err(ProviderError::Malformed(format!(
            "{} table is not {}x{}",
            what, expected, expected
        )));
    }
    if rows.iter().flatten().any(|v| !v.is_finite() || *v < 0.0) {
        return Err(ProviderError::Malformed(format!(
            "{} table contains invalid values",
            what
        )));
    }
    Ok(())
}

#[derive(Serialize)]
struct TableKey<'a> {
    coords: &'a [Coordinate],
}

/// Produces distance matrices, preferring a provider when one is configured.
#[derive(Clone)]
pub struct DistanceMatrixService {
    provider: Option<Arc<dyn DistanceTableProvider>>,
    cache: ResultCache,
    table_ttl: Duration,
}

impl DistanceMatrixService {
    pub fn new(cache: ResultCache, table_ttl: Duration) -> Self {
        Self {
            provider: None,
            cache,
            table_ttl,
        }
    }

    pub fn with_provider(mut self, provider: Arc<dyn DistanceTableProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Returns a matrix for `locations`. Never fails.
    pub fn matrix_for(&self, locations: &[Coordinate]) -> DistanceMatrix {
        let Some(provider) = &self.provider else {
            return HaversineMatrix.matrix_for(locations);
        };
        if locations.is_empty() {
            return HaversineMatrix.matrix_for(locations);
        }

        match self.provider_matrix(provider.as_ref(), locations) {
            Ok(matrix) => matrix,
            Err(err) => {
                warn!(error = %err, stops = locations.len(), "distance table unavailable, using haversine");
                HaversineMatrix.matrix_for(locations)
            }
        }
    }

    fn provider_matrix(
        &self,
        provider: &dyn DistanceTableProvider,
        locations: &[Coordinate],
    ) -> Result<DistanceMatrix, ProviderError> {
        let key = cache_key("osrm:table", &TableKey { coords: locations });

        if let Some(table) = self.cache.get::<TableData>(&key) {
            match DistanceMatrix::from_table(table, locations.len()) {
                Ok(matrix) => {
                    debug!(key = %key, "distance table cache hit");
                    return Ok(matrix);
                }
                Err(err) => debug!(error = %err, "ignoring unusable cached table"),
            }
        }

        let table = provider.table_for(locations)?;
        let matrix = DistanceMatrix::from_table(table.clone(), locations.len())?;
        self.cache.set(&key, &table, self.table_ttl);
        Ok(matrix)
    }
}
