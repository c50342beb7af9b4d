//! Blocking HTTP implementation of [`SatelliteSource`].

use std::io::Read;
use std::time::Duration;

use serde::de::DeserializeOwned;
use url::Url;

use super::{
    CoverageResponse, DensityMapResponse, EstimateResponse, FetchError, PositionResponse,
    SatelliteSource,
};
use crate::types::{GeoPoint, SatelliteFrame};

/// Upper bound on a downloaded raster.
const MAX_RESOURCE_BYTES: u64 = 64 * 1024 * 1024;

impl From<ureq::Error> for FetchError {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::Status(code, response) => FetchError::Status {
                code,
                body: response.into_string().unwrap_or_default(),
            },
            ureq::Error::Transport(transport) => FetchError::Transport(transport.to_string()),
        }
    }
}

pub struct HttpBackend {
    agent: ureq::Agent,
    /// API root, always with a trailing slash so joins stay below it
    base_url: Url,
}

impl HttpBackend {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, FetchError> {
        let root = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&root).map_err(|source| FetchError::InvalidUrl {
            url: base_url.to_string(),
            source,
        })?;
        Ok(Self {
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
            base_url,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> Result<T, FetchError> {
        let url = resolve_locator(&self.base_url, endpoint)?;
        let mut request = self.agent.get(url.as_str());
        for (key, value) in query {
            request = request.query(key, value);
        }
        let response = request.call()?;
        response
            .into_json::<T>()
            .map_err(|e| FetchError::Malformed(e.to_string()))
    }
}

impl SatelliteSource for HttpBackend {
    fn position(
        &self,
        elapsed_seconds: f64,
        radius_km: f64,
    ) -> Result<Option<SatelliteFrame>, FetchError> {
        let response: PositionResponse = self.get_json(
            "position",
            &[
                ("elapsed_seconds", elapsed_seconds.to_string()),
                ("radius_km", radius_km.to_string()),
            ],
        )?;
        Ok(response.into_frame(elapsed_seconds))
    }

    fn population_density_locator(&self) -> Result<String, FetchError> {
        let response: DensityMapResponse = self.get_json("population-density", &[])?;
        match (response.map_url, response.error) {
            (Some(url), _) if !url.is_empty() => Ok(url),
            (_, Some(error)) => Err(FetchError::Backend(error)),
            _ => Err(FetchError::Malformed("missing map_url".to_string())),
        }
    }

    fn fetch_resource(&self, locator: &str) -> Result<Vec<u8>, FetchError> {
        let url = resolve_locator(&self.base_url, locator)?;
        let response = self.agent.get(url.as_str()).call()?;
        read_capped(response.into_reader(), MAX_RESOURCE_BYTES)
    }

    fn population_estimate(&self, point: GeoPoint, radius_km: f64) -> Result<i64, FetchError> {
        if !point.is_finite() || !radius_km.is_finite() {
            return Err(FetchError::InvalidInput(format!(
                "non-finite estimate request ({}, {}, {} km)",
                point.lat, point.lon, radius_km
            )));
        }

        let response: EstimateResponse = self.get_json(
            "population-estimate",
            &[
                ("lat", point.lat.to_string()),
                ("lon", point.lon.to_string()),
                ("radius_km", radius_km.to_string()),
            ],
        )?;
        response
            .estimated_population
            .ok_or_else(|| FetchError::Malformed("missing estimated_population".to_string()))
    }

    fn coverage_score(&self) -> Result<i64, FetchError> {
        let response: CoverageResponse = self.get_json("coverage-score", &[])?;
        match (response.coverage_score, response.error) {
            (Some(score), _) => Ok(score),
            (None, Some(error)) => Err(FetchError::Backend(error)),
            (None, None) => Err(FetchError::Malformed("missing coverage_score".to_string())),
        }
    }
}

/// Resolve a resource locator against the API root.
///
/// Standard reference resolution: absolute and protocol-relative locators
/// keep their own host, a leading `/` resolves against the origin, and
/// anything else resolves below the API root.
pub fn resolve_locator(base_url: &Url, locator: &str) -> Result<Url, FetchError> {
    base_url.join(locator).map_err(|source| FetchError::InvalidUrl {
        url: locator.to_string(),
        source,
    })
}

/// Read a body of at most `limit` bytes.
///
/// One byte past the limit is read so an oversized body is reported
/// instead of silently cut short.
fn read_capped(reader: impl Read, limit: u64) -> Result<Vec<u8>, FetchError> {
    let mut bytes = Vec::new();
    reader
        .take(limit + 1)
        .read_to_end(&mut bytes)
        .map_err(|e| FetchError::Transport(e.to_string()))?;
    if bytes.len() as u64 > limit {
        return Err(FetchError::InvalidInput(format!(
            "resource exceeds {} MiB",
            limit / (1024 * 1024)
        )));
    }
    Ok(bytes)
}
