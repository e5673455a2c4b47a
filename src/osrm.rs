//! OSRM HTTP adapter for distance tables and route geometry.

use std::time::Duration;

use serde::Deserialize;

use crate::error::ProviderError;
use crate::polyline::Polyline;
use crate::stop::Coordinate;
use crate::traits::{DistanceTableProvider, RouteGeometryProvider, TableData};

#[derive(Debug, Clone)]
pub struct OsrmConfig {
    pub base_url: String,
    pub profile: String,
    pub timeout_secs: u64,
}

impl Default for OsrmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://router.project-osrm.org".to_string(),
            profile: "driving".to_string(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OsrmClient {
    config: OsrmConfig,
    client: reqwest::blocking::Client,
}

impl OsrmClient {
    pub fn new(config: OsrmConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    pub fn table_url(&self, locations: &[Coordinate]) -> String {
        format!(
            "{}/table/v1/{}/{}?annotations=distance,duration",
            self.base_url(),
            self.config.profile,
            coords_param(locations)
        )
    }

    pub fn route_url(&self, ordered: &[Coordinate]) -> String {
        format!(
            "{}/route/v1/{}/{}?overview=full&geometries=geojson",
            self.base_url(),
            self.config.profile,
            coords_param(ordered)
        )
    }

    fn base_url(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }

    fn fetch<T: serde::de::DeserializeOwned>(&self, url: String) -> Result<T, ProviderError> {
        let response = self.client.get(url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Status(status.as_u16()));
        }
        response
            .json::<T>()
            .map_err(|err| ProviderError::Malformed(err.to_string()))
    }
}

impl DistanceTableProvider for OsrmClient {
    fn table_for(&self, locations: &[Coordinate]) -> Result<TableData, ProviderError> {
        if locations.is_empty() {
            return Ok(TableData {
                distances_km: Vec::new(),
                durations_min: None,
            });
        }
        let body: OsrmTableResponse = self.fetch(self.table_url(locations))?;
        convert_table(body)
    }
}

impl RouteGeometryProvider for OsrmClient {
    fn geometry_for(&self, ordered: &[Coordinate]) -> Result<Polyline, ProviderError> {
        if ordered.len() < 2 {
            return Ok(Polyline::straight_line(ordered));
        }
        let body: OsrmRouteResponse = self.fetch(self.route_url(ordered))?;
        convert_route(body)
    }
}

/// `lng,lat;lng,lat;...` as OSRM expects.
fn coords_param(locations: &[Coordinate]) -> String {
    locations
        .iter()
        .map(|(lat, lng)| format!("{:.6},{:.6}", lng, lat))
        .collect::<Vec<_>>()
        .join(";")
}

#[derive(Debug, Deserialize)]
struct OsrmTableResponse {
    code: String,
    message: Option<String>,
    /// Metres.
    distances: Option<Vec<Vec<Option<f64>>>>,
    /// Seconds.
    durations: Option<Vec<Vec<Option<f64>>>>,
}

#[derive(Debug, Deserialize)]
struct OsrmRouteResponse {
    code: String,
    message: Option<String>,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    geometry: Option<GeoJsonLine>,
}

#[derive(Debug, Deserialize)]
struct GeoJsonLine {
    coordinates: Vec<[f64; 2]>,
}

fn check_code(code: String, message: Option<String>) -> Result<(), ProviderError> {
    if code == "Ok" {
        Ok(())
    } else {
        Err(ProviderError::Rejected {
            code,
            message: message.unwrap_or_default(),
        })
    }
}

fn scale_rows(
    rows: Vec<Vec<Option<f64>>>,
    divisor: f64,
    what: &str,
) -> Result<Vec<Vec<f64>>, ProviderError> {
    rows.into_iter()
        .map(|row| {
            row.into_iter()
                .map(|value| {
                    value
                        .map(|v| v / divisor)
                        .ok_or_else(|| ProviderError::Malformed(format!("unroutable pair in {}", what)))
                })
                .collect()
        })
        .collect()
}

fn convert_table(body: OsrmTableResponse) -> Result<TableData, ProviderError> {
    check_code(body.code, body.message)?;
    let distances = body
        .distances
        .ok_or_else(|| ProviderError::Malformed("missing distances".to_string()))?;

    Ok(TableData {
        distances_km: scale_rows(distances, 1000.0, "distances")?,
        durations_min: body
            .durations
            .map(|rows| scale_rows(rows, 60.0, "durations"))
            .transpose()?,
    })
}

fn convert_route(body: OsrmRouteResponse) -> Result<Polyline, ProviderError> {
    check_code(body.code, body.message)?;
    let geometry = body
        .routes
        .into_iter()
        .next()
        .and_then(|route| route.geometry)
        .filter(|line| !line.coordinates.is_empty())
        .ok_or_else(|| ProviderError::Malformed("route has no geometry".to_string()))?;

    Ok(Polyline::from_lng_lat(&geometry.coordinates))
}
