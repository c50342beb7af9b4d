//! Core types and constants shared by the simulation and rendering layers.

use bevy::math::DVec2;
use chrono::DateTime;

/// Degrees to radians conversion factor
pub const DEG_TO_RAD: f64 = std::f64::consts::PI / 180.0;

/// Radians to degrees conversion factor
pub const RAD_TO_DEG: f64 = 180.0 / std::f64::consts::PI;

/// Seconds per day
pub const SECONDS_PER_DAY: f64 = 86400.0;

/// Maximum number of ground-track points retained for the trail.
pub const TRAIL_CAPACITY: usize = 1000;

/// Geodetic coordinate on the globe, in degrees.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeoPoint {
    /// Latitude in degrees, positive north
    pub lat: f64,
    /// Longitude in degrees, positive east, in (-180, 180]
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Both coordinates are finite numbers.
    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lon.is_finite()
    }
}

/// Satellite state for one requested simulation time.
///
/// Produced by the backend, consumed immediately by the sync loop. Only the
/// most recently applied frame is retained.
#[derive(Clone, Debug, PartialEq)]
pub struct SatelliteFrame {
    /// Sub-satellite point
    pub subpoint: GeoPoint,
    /// Coverage footprint as (lon, lat) pairs, closed implicitly
    pub spotbeam: Vec<DVec2>,
    /// Echo of the requested elapsed seconds
    pub elapsed_seconds: f64,
    /// Absolute simulation time as reported by the backend
    pub simulation_time_iso: String,
}

/// Human-readable time labels for the control surface.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TimeLabels {
    /// "Day 02"
    pub day: String,
    /// "Hour 01:01:01"
    pub hour: String,
    /// "2025-10-04 12:17:46 UTC"
    pub utc: String,
}

impl TimeLabels {
    pub fn from_frame(frame: &SatelliteFrame) -> Self {
        let (day, hour) = day_hour_labels(frame.elapsed_seconds);
        Self {
            day,
            hour,
            utc: utc_label(&frame.simulation_time_iso),
        }
    }

    /// Combined "Day NN / Hour HH:MM:SS" label.
    pub fn day_hour(&self) -> String {
        format!("{} / {}", self.day, self.hour)
    }
}

/// Split elapsed seconds into day and hour-of-day labels.
///
/// Negative elapsed time counts days backwards from the epoch, so one second
/// before the epoch is "Day -1 / Hour 23:59:59".
pub fn day_hour_labels(elapsed_seconds: f64) -> (String, String) {
    let total = elapsed_seconds.floor() as i64;
    let day = total.div_euclid(SECONDS_PER_DAY as i64);
    let second_of_day = total.rem_euclid(SECONDS_PER_DAY as i64);

    let hours = second_of_day / 3600;
    let minutes = (second_of_day % 3600) / 60;
    let seconds = second_of_day % 60;

    (
        format!("Day {:02}", day),
        format!("Hour {:02}:{:02}:{:02}", hours, minutes, seconds),
    )
}

/// Format elapsed seconds as "Day NN / Hour HH:MM:SS".
pub fn format_elapsed_label(elapsed_seconds: f64) -> String {
    let (day, hour) = day_hour_labels(elapsed_seconds);
    format!("{} / {}", day, hour)
}

/// Format an RFC 3339 timestamp as "YYYY-MM-DD HH:MM:SS UTC".
///
/// Strings that do not parse are shown verbatim.
pub fn utc_label(iso: &str) -> String {
    match DateTime::parse_from_rfc3339(iso) {
        Ok(time) => time
            .with_timezone(&chrono::Utc)
            .format("%Y-%m-%d %H:%M:%S UTC")
            .to_string(),
        Err(_) => iso.to_string(),
    }
}
