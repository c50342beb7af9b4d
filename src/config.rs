//! Runtime configuration for the viewer.
//!
//! `ViewerConfig` is inserted as a resource before the simulation plugins are
//! added. The binary fills it from the command line; tests build it directly.

use std::time::Duration;

use bevy::prelude::*;
use clap::{Parser, ValueEnum};

use crate::time::Direction;
use crate::types::TRAIL_CAPACITY;

/// How position responses that arrive out of order are handled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum ResponseOrdering {
    /// Apply a response only if it answers a newer request than the last
    /// applied one.
    #[default]
    LatestRequest,
    /// Apply every successful response as it arrives.
    ArrivalOrder,
}

/// Whether resolved frames extend the ground-track trail.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum DisplayMode {
    /// Append each resolved position to the trail
    #[default]
    GroundTrack,
    /// Show only the current position and spotbeam
    SpotbeamOnly,
}

impl DisplayMode {
    pub fn toggled(self) -> Self {
        match self {
            DisplayMode::GroundTrack => DisplayMode::SpotbeamOnly,
            DisplayMode::SpotbeamOnly => DisplayMode::GroundTrack,
        }
    }
}

/// Viewer configuration resource.
#[derive(Resource, Clone, Debug)]
pub struct ViewerConfig {
    /// Base URL of the backend API, without trailing slash
    pub backend_url: String,
    /// Spotbeam radius requested with every position fetch
    pub spotbeam_radius_km: f64,
    /// Radius for hover/click population estimates
    pub estimate_radius_km: f64,
    /// Globe radius in render units
    pub globe_radius: f64,
    /// Maximum retained trail points
    pub trail_capacity: usize,
    /// Quiet period before a hover triggers an estimate request
    pub hover_debounce: Duration,
    /// Out-of-order response policy for position fetches
    pub response_ordering: ResponseOrdering,
    /// Cap on outstanding position requests; ticks beyond it skip issuing
    pub max_in_flight: usize,
    /// Transport-level timeout for every backend request
    pub request_timeout: Duration,
    /// Whether resolved frames extend the trail
    pub display_mode: DisplayMode,
    /// Initial simulated elapsed seconds
    pub start_elapsed_seconds: f64,
    /// Initial speed multiplier
    pub start_speed: f64,
    /// Initial direction
    pub start_direction: Direction,
    /// Start with the clock paused
    pub start_paused: bool,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            backend_url: "http://127.0.0.1:5000/api".to_string(),
            spotbeam_radius_km: 1000.0,
            estimate_radius_km: 100.0,
            globe_radius: 5.0,
            trail_capacity: TRAIL_CAPACITY,
            hover_debounce: Duration::from_millis(200),
            response_ordering: ResponseOrdering::LatestRequest,
            max_in_flight: 16,
            request_timeout: Duration::from_secs(10),
            display_mode: DisplayMode::GroundTrack,
            start_elapsed_seconds: 0.0,
            start_speed: 1.0,
            start_direction: Direction::Forward,
            start_paused: false,
        }
    }
}

/// Command-line arguments for the viewer binary.
#[derive(Parser, Debug)]
#[command(name = "groundtrack", about = "Satellite ground-track viewer")]
pub struct Cli {
    /// Backend API base URL
    #[arg(long, default_value = "http://127.0.0.1:5000/api")]
    pub backend_url: String,

    /// Spotbeam radius in kilometres
    #[arg(long, default_value_t = 1000.0)]
    pub spotbeam_radius_km: f64,

    /// Population estimate radius in kilometres
    #[arg(long, default_value_t = 100.0)]
    pub estimate_radius_km: f64,

    /// Maximum trail points retained
    #[arg(long, default_value_t = TRAIL_CAPACITY)]
    pub trail_capacity: usize,

    /// Hover debounce in milliseconds
    #[arg(long, default_value_t = 200)]
    pub hover_debounce_ms: u64,

    /// How out-of-order position responses are applied
    #[arg(long, value_enum, default_value_t = ResponseOrdering::LatestRequest)]
    pub ordering: ResponseOrdering,

    /// Maximum outstanding position requests
    #[arg(long, default_value_t = 16)]
    pub max_in_flight: usize,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 10)]
    pub timeout_secs: u64,

    /// Trail or spotbeam-only display
    #[arg(long, value_enum, default_value_t = DisplayMode::GroundTrack)]
    pub mode: DisplayMode,

    /// Initial elapsed simulation seconds
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub start: f64,

    /// Initial speed multiplier (non-negative)
    #[arg(long, default_value_t = 1.0)]
    pub speed: f64,

    /// Initial direction
    #[arg(long, value_enum, default_value_t = Direction::Forward)]
    pub direction: Direction,

    /// Start paused
    #[arg(long)]
    pub paused: bool,
}

impl From<Cli> for ViewerConfig {
    fn from(cli: Cli) -> Self {
        Self {
            backend_url: cli.backend_url.trim_end_matches('/').to_string(),
            spotbeam_radius_km: cli.spotbeam_radius_km,
            estimate_radius_km: cli.estimate_radius_km,
            trail_capacity: cli.trail_capacity,
            hover_debounce: Duration::from_millis(cli.hover_debounce_ms),
            response_ordering: cli.ordering,
            max_in_flight: cli.max_in_flight,
            request_timeout: Duration::from_secs(cli.timeout_secs),
            display_mode: cli.mode,
            start_elapsed_seconds: cli.start,
            start_speed: cli.speed,
            start_direction: cli.direction,
            start_paused: cli.paused,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults_match_config_defaults() {
        let cli = Cli::parse_from(["groundtrack"]);
        let from_cli = ViewerConfig::from(cli);
        let default = ViewerConfig::default();

        assert_eq!(from_cli.backend_url, default.backend_url);
        assert_eq!(from_cli.spotbeam_radius_km, default.spotbeam_radius_km);
        assert_eq!(from_cli.trail_capacity, default.trail_capacity);
        assert_eq!(from_cli.hover_debounce, default.hover_debounce);
        assert_eq!(from_cli.response_ordering, default.response_ordering);
        assert_eq!(from_cli.request_timeout, default.request_timeout);
        assert_eq!(from_cli.start_direction, default.start_direction);
        assert!(!from_cli.start_paused);
    }

    #[test]
    fn test_cli_overrides() {
        let cli = Cli::parse_from([
            "groundtrack",
            "--backend-url",
            "http://sat.local:8080/api/",
            "--ordering",
            "arrival-order",
            "--direction",
            "reverse",
            "--start",
            "-3600",
            "--speed",
            "100",
            "--mode",
            "spotbeam-only",
            "--paused",
        ]);
        let config = ViewerConfig::from(cli);

        assert_eq!(config.backend_url, "http://sat.local:8080/api");
        assert_eq!(config.response_ordering, ResponseOrdering::ArrivalOrder);
        assert_eq!(config.start_direction, Direction::Reverse);
        assert_eq!(config.start_elapsed_seconds, -3600.0);
        assert_eq!(config.start_speed, 100.0);
        assert_eq!(config.display_mode, DisplayMode::SpotbeamOnly);
        assert!(config.start_paused);
    }

    #[test]
    fn test_display_mode_toggle() {
        assert_eq!(DisplayMode::GroundTrack.toggled(), DisplayMode::SpotbeamOnly);
        assert_eq!(DisplayMode::SpotbeamOnly.toggled(), DisplayMode::GroundTrack);
    }
}
