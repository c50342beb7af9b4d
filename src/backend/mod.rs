//! Backend collaborator: satellite state, population data and coverage.
//!
//! All calls are blocking and run on Bevy's IO task pool. The
//! [`SatelliteSource`] trait is the seam between the viewer and the network;
//! tests substitute an in-memory source.

pub mod http;

use std::sync::Arc;

use bevy::math::DVec2;
use bevy::prelude::*;
use serde::Deserialize;

use crate::types::{GeoPoint, SatelliteFrame};

pub use self::http::HttpBackend;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("HTTP {code}: {body}")]
    Status { code: u16, body: String },

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("backend reported an error: {0}")]
    Backend(String),

    #[error("could not decode resource: {0}")]
    Decode(String),

    #[error("invalid request input: {0}")]
    InvalidInput(String),

    #[error("invalid URL {url:?}: {source}")]
    InvalidUrl {
        url: String,
        source: url::ParseError,
    },
}

impl FetchError {
    /// Responses that carried no usable data, as opposed to failed requests.
    pub fn is_no_data(&self) -> bool {
        matches!(self, FetchError::Malformed(_))
    }
}

/// Source of satellite state and auxiliary data.
pub trait SatelliteSource: Send + Sync + 'static {
    /// Satellite state at `elapsed_seconds` past the epoch. `Ok(None)` means
    /// the backend answered without usable data.
    fn position(
        &self,
        elapsed_seconds: f64,
        radius_km: f64,
    ) -> Result<Option<SatelliteFrame>, FetchError>;

    /// Locator for the population density raster.
    fn population_density_locator(&self) -> Result<String, FetchError>;

    /// Raw bytes of a resource named by a locator.
    fn fetch_resource(&self, locator: &str) -> Result<Vec<u8>, FetchError>;

    /// Estimated population within `radius_km` of `point`.
    fn population_estimate(&self, point: GeoPoint, radius_km: f64) -> Result<i64, FetchError>;

    /// Population covered by the spotbeam over one orbit.
    fn coverage_score(&self) -> Result<i64, FetchError>;
}

/// Shared handle to the active satellite source.
#[derive(Resource, Clone)]
pub struct Backend(pub Arc<dyn SatelliteSource>);

impl Backend {
    pub fn new(source: impl SatelliteSource) -> Self {
        Self(Arc::new(source))
    }

    pub fn source(&self) -> Arc<dyn SatelliteSource> {
        Arc::clone(&self.0)
    }
}

/// `GET /position` body.
///
/// Every field is optional so that an empty or partial body parses and is
/// then rejected as "no data" rather than as a failure.
#[derive(Deserialize, Debug, Default, Clone)]
pub struct PositionResponse {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub spotbeam_polygon: Option<Vec<[f64; 2]>>,
    pub elapsed_seconds: Option<f64>,
    pub simulation_time_iso: Option<String>,
}

impl PositionResponse {
    /// Validate into a frame. Missing or non-finite coordinates, or a
    /// spotbeam with fewer than three finite points, yield `None`.
    pub fn into_frame(self, requested_elapsed: f64) -> Option<SatelliteFrame> {
        let subpoint = GeoPoint::new(self.latitude?, self.longitude?);
        if !subpoint.is_finite() {
            return None;
        }

        let spotbeam: Vec<DVec2> = self
            .spotbeam_polygon?
            .into_iter()
            .map(|[lon, lat]| DVec2::new(lon, lat))
            .collect();
        if spotbeam.len() < 3 || !spotbeam.iter().all(|p| p.is_finite()) {
            return None;
        }

        let elapsed_seconds = self
            .elapsed_seconds
            .filter(|e| e.is_finite())
            .unwrap_or(requested_elapsed);

        Some(SatelliteFrame {
            subpoint,
            spotbeam,
            elapsed_seconds,
            simulation_time_iso: self.simulation_time_iso.unwrap_or_default(),
        })
    }
}

/// `GET /population-density` body.
#[derive(Deserialize, Debug, Clone)]
pub struct DensityMapResponse {
    pub map_url: Option<String>,
    pub error: Option<String>,
}

/// `GET /population-estimate` body.
#[derive(Deserialize, Debug, Clone)]
pub struct EstimateResponse {
    pub estimated_population: Option<i64>,
}

/// `GET /coverage-score` body.
#[derive(Deserialize, Debug, Clone)]
pub struct CoverageResponse {
    pub coverage_score: Option<i64>,
    pub error: Option<String>,
}
