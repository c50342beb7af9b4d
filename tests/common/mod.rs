//! Common test utilities for integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bevy::math::DVec2;
use bevy::prelude::*;
use groundtrack::CorePlugin;
use groundtrack::backend::{Backend, FetchError, SatelliteSource};
use groundtrack::config::ViewerConfig;
use groundtrack::types::{GeoPoint, SatelliteFrame};

/// Shared knobs and counters for [`MockSource`].
#[derive(Default)]
pub struct MockState {
    pub position_calls: AtomicUsize,
    pub locator_calls: AtomicUsize,
    pub resource_calls: AtomicUsize,
    pub estimate_calls: AtomicUsize,
    pub coverage_calls: AtomicUsize,

    pub fail_position: AtomicBool,
    pub fail_resource: AtomicBool,
    /// Delay applied to resource downloads
    pub resource_delay: Mutex<Duration>,
    /// Elapsed seconds of every position request, in call order
    pub requested: Mutex<Vec<f64>>,
    /// Points of every estimate request, in call order
    pub estimate_points: Mutex<Vec<GeoPoint>>,
}

/// In-memory satellite source.
///
/// The satellite sits on the equator and drifts east one degree per
/// simulated minute.
#[derive(Clone, Default)]
pub struct MockSource(pub Arc<MockState>);

impl MockSource {
    pub fn state(&self) -> Arc<MockState> {
        Arc::clone(&self.0)
    }
}

pub fn frame_at(elapsed_seconds: f64) -> SatelliteFrame {
    let lon = (elapsed_seconds / 60.0).rem_euclid(360.0) - 180.0;
    SatelliteFrame {
        subpoint: GeoPoint::new(0.0, lon),
        spotbeam: vec![
            DVec2::new(lon - 2.0, -2.0),
            DVec2::new(lon, 2.0),
            DVec2::new(lon + 2.0, -2.0),
        ],
        elapsed_seconds,
        simulation_time_iso: "2025-10-04T12:17:46+00:00".to_string(),
    }
}

/// Tiny PNG standing in for the density raster.
pub fn density_png() -> Vec<u8> {
    let mut png = Vec::new();
    let img = image::RgbaImage::from_pixel(4, 2, image::Rgba([200, 40, 40, 128]));
    img.write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
        .expect("encode png");
    png
}

impl SatelliteSource for MockSource {
    fn position(
        &self,
        elapsed_seconds: f64,
        _radius_km: f64,
    ) -> Result<Option<SatelliteFrame>, FetchError> {
        self.0.position_calls.fetch_add(1, Ordering::SeqCst);
        self.0.requested.lock().unwrap().push(elapsed_seconds);
        if self.0.fail_position.load(Ordering::SeqCst) {
            return Err(FetchError::Status {
                code: 500,
                body: "{\"error\": \"propagation failed\"}".to_string(),
            });
        }
        Ok(Some(frame_at(elapsed_seconds)))
    }

    fn population_density_locator(&self) -> Result<String, FetchError> {
        self.0.locator_calls.fetch_add(1, Ordering::SeqCst);
        Ok("/static/textures/population_density_map.png".to_string())
    }

    fn fetch_resource(&self, _locator: &str) -> Result<Vec<u8>, FetchError> {
        self.0.resource_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.0.resource_delay.lock().unwrap();
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
        if self.0.fail_resource.load(Ordering::SeqCst) {
            return Err(FetchError::Status {
                code: 404,
                body: "not found".to_string(),
            });
        }
        Ok(density_png())
    }

    fn population_estimate(&self, point: GeoPoint, radius_km: f64) -> Result<i64, FetchError> {
        self.0.estimate_calls.fetch_add(1, Ordering::SeqCst);
        self.0.estimate_points.lock().unwrap().push(point);
        Ok((point.lat.abs() * 1000.0 + radius_km) as i64)
    }

    fn coverage_score(&self) -> Result<i64, FetchError> {
        self.0.coverage_calls.fetch_add(1, Ordering::SeqCst);
        Ok(4_200_000)
    }
}

/// Headless app with the core plugins over a mock backend.
pub fn create_core_app(config: ViewerConfig, source: MockSource) -> App {
    let mut app = App::new();
    app.add_plugins(MinimalPlugins)
        .insert_resource(config)
        .insert_resource(Backend::new(source))
        .add_plugins(CorePlugin);
    app
}

/// Update until `done` holds or the frame budget runs out.
pub fn run_until(app: &mut App, max_frames: usize, mut done: impl FnMut(&mut App) -> bool) -> bool {
    for _ in 0..max_frames {
        app.update();
        if done(app) {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    false
}

/// Run a fixed number of frames.
pub fn run_frames(app: &mut App, frames: usize) {
    for _ in 0..frames {
        app.update();
        std::thread::sleep(Duration::from_millis(1));
    }
}
