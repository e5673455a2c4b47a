//! Stops to be routed.
//!
//! A stop carries opaque display fields alongside its coordinates. Only the
//! coordinates take part in optimisation.

use serde::{Deserialize, Serialize};

use crate::error::OptimizeError;

/// A (latitude, longitude) pair in decimal degrees.
pub type Coordinate = (f64, f64);

/// A single location to visit. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stop {
    id: i64,
    name: String,
    street: Option<String>,
    city: Option<String>,
    postal_code: Option<String>,
    latitude: f64,
    longitude: f64,
}

impl Stop {
    /// Creates a stop, rejecting coordinates outside the valid ranges.
    pub fn new(
        id: i64,
        name: impl Into<String>,
        latitude: f64,
        longitude: f64,
    ) -> Result<Self, OptimizeError> {
        if !latitude.is_finite()
            || !longitude.is_finite()
            || !(-90.0..=90.0).contains(&latitude)
            || !(-180.0..=180.0).contains(&longitude)
        {
            return Err(OptimizeError::InvalidCoordinate {
                id,
                latitude,
                longitude,
            });
        }

        Ok(Self {
            id,
            name: name.into(),
            street: None,
            city: None,
            postal_code: None,
            latitude,
            longitude,
        })
    }

    /// Attaches free-text address lines.
    pub fn with_address(
        mut self,
        street: impl Into<String>,
        city: impl Into<String>,
        postal_code: Option<String>,
    ) -> Self {
        self.street = Some(street.into());
        self.city = Some(city.into());
        self.postal_code = postal_code;
        self
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn street(&self) -> Option<&str> {
        self.street.as_deref()
    }

    pub fn city(&self) -> Option<&str> {
        self.city.as_deref()
    }

    pub fn postal_code(&self) -> Option<&str> {
        self.postal_code.as_deref()
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    pub fn coordinate(&self) -> Coordinate {
        (self.latitude, self.longitude)
    }
}
