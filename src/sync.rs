//! Per-frame synchronisation between the simulation clock and satellite state.
//!
//! Every frame, after the clock tick, one position request is issued for the
//! new elapsed time. Requests run on the IO task pool and may complete in any
//! order. Each request carries a sequence tag; under
//! [`ResponseOrdering::LatestRequest`] a response older than the last applied
//! one is dropped, under [`ResponseOrdering::ArrivalOrder`] every response is
//! applied as it lands.
//!
//! A successful frame replaces the derived visual state in [`GroundTrack`]. A
//! failed request pauses the clock; the frame loop itself keeps running.

use bevy::math::DVec3;
use bevy::prelude::*;
use bevy::tasks::{IoTaskPool, Task, block_on, futures_lite::future};

use crate::backend::{Backend, FetchError};
use crate::config::{DisplayMode, ResponseOrdering, ViewerConfig};
use crate::control::{ControlCommand, ControlSet, StatusLine};
use crate::geo::{globe_rotation, to_surface_position};
use crate::time::{ClockSet, SimulationClock};
use crate::trail::TrailBuffer;
use crate::types::{GeoPoint, SatelliteFrame, TimeLabels};

/// Satellite marker height as a multiple of the globe radius.
pub const MARKER_ALTITUDE: f64 = 1.02;

/// Trail height as a multiple of the globe radius.
pub const TRAIL_ALTITUDE: f64 = 1.01;

/// Spotbeam outline height as a multiple of the globe radius.
pub const SPOTBEAM_ALTITUDE: f64 = 1.005;

/// Closed outline of the current spotbeam in the globe's earth-fixed frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SpotbeamOutline {
    /// Points with the first repeated at the end
    pub points: Vec<DVec3>,
    /// Bumped on every replacement so the renderer knows to rebuild
    pub revision: u64,
}

/// Derived visual state, rebuilt from each applied frame.
///
/// Pure geometry in the globe's earth-fixed frame; the render layer owns
/// every mesh and material.
#[derive(Resource, Debug)]
pub struct GroundTrack {
    /// Satellite marker position
    pub satellite: Option<DVec3>,
    /// Historical ground track
    pub trail: TrailBuffer,
    pub spotbeam: SpotbeamOutline,
    /// Globe spin about +Y, radians
    pub globe_rotation: f64,
    pub labels: TimeLabels,
    /// Most recently applied frame
    pub last_frame: Option<SatelliteFrame>,
}

impl GroundTrack {
    pub fn new(trail_capacity: usize) -> Self {
        Self {
            satellite: None,
            trail: TrailBuffer::with_capacity(trail_capacity),
            spotbeam: SpotbeamOutline::default(),
            globe_rotation: 0.0,
            labels: TimeLabels::default(),
            last_frame: None,
        }
    }
}

impl Default for GroundTrack {
    fn default() -> Self {
        Self::new(crate::types::TRAIL_CAPACITY)
    }
}

/// A position request handed to the backend.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameRequest {
    pub tag: u64,
    pub elapsed_seconds: f64,
}

/// What happened to a resolved request.
#[derive(Clone, Debug, PartialEq)]
pub enum Resolution {
    /// Frame applied to the derived state
    Applied,
    /// Older than the last applied frame; dropped
    Stale,
    /// Response carried no usable data; state unchanged
    NoData,
    /// Request failed; clock paused
    Failed(FetchError),
}

/// Counters for diagnostics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub issued: u64,
    pub applied: u64,
    pub stale: u64,
    pub no_data: u64,
    pub failed: u64,
}

/// Request bookkeeping for the sync loop.
#[derive(Resource, Debug)]
pub struct SyncLoop {
    pub ordering: ResponseOrdering,
    pub display_mode: DisplayMode,
    globe_radius: f64,
    spotbeam_radius_km: f64,
    max_in_flight: usize,
    next_tag: u64,
    last_applied_tag: Option<u64>,
    last_requested_elapsed: Option<f64>,
    in_flight: usize,
    pub stats: SyncStats,
}

impl Default for SyncLoop {
    fn default() -> Self {
        Self::from_config(&ViewerConfig::default())
    }
}

impl SyncLoop {
    pub fn from_config(config: &ViewerConfig) -> Self {
        Self {
            ordering: config.response_ordering,
            display_mode: config.display_mode,
            globe_radius: config.globe_radius,
            spotbeam_radius_km: config.spotbeam_radius_km,
            max_in_flight: config.max_in_flight.max(1),
            next_tag: 0,
            last_applied_tag: None,
            last_requested_elapsed: None,
            in_flight: 0,
            stats: SyncStats::default(),
        }
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn spotbeam_radius_km(&self) -> f64 {
        self.spotbeam_radius_km
    }

    /// Whether this frame should issue a request.
    ///
    /// While playing, every frame requests. While paused, a request is only
    /// issued if the elapsed time differs from the last one requested (which
    /// covers the very first frame).
    pub fn wants_request(&self, clock: &SimulationClock) -> bool {
        if self.in_flight >= self.max_in_flight {
            return false;
        }
        clock.is_playing() || self.last_requested_elapsed != Some(clock.elapsed_seconds())
    }

    /// Register a new request for `elapsed_seconds`.
    pub fn issue(&mut self, elapsed_seconds: f64) -> FrameRequest {
        let request = FrameRequest {
            tag: self.next_tag,
            elapsed_seconds,
        };
        self.next_tag += 1;
        self.in_flight += 1;
        self.last_requested_elapsed = Some(elapsed_seconds);
        self.stats.issued += 1;
        request
    }

    /// Fold a completed request into the clock and derived state.
    pub fn resolve(
        &mut self,
        tag: u64,
        outcome: Result<Option<SatelliteFrame>, FetchError>,
        clock: &mut SimulationClock,
        track: &mut GroundTrack,
    ) -> Resolution {
        self.in_flight = self.in_flight.saturating_sub(1);

        let frame = match outcome {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                self.stats.no_data += 1;
                return Resolution::NoData;
            }
            Err(err) if err.is_no_data() => {
                self.stats.no_data += 1;
                return Resolution::NoData;
            }
            Err(err) => {
                clock.set_playing(false);
                self.stats.failed += 1;
                return Resolution::Failed(err);
            }
        };

        if self.ordering == ResponseOrdering::LatestRequest
            && self.last_applied_tag.is_some_and(|applied| tag < applied)
        {
            self.stats.stale += 1;
            return Resolution::Stale;
        }

        self.apply(frame, track);
        self.last_applied_tag = Some(self.last_applied_tag.map_or(tag, |t| t.max(tag)));
        self.stats.applied += 1;
        Resolution::Applied
    }

    fn apply(&self, frame: SatelliteFrame, track: &mut GroundTrack) {
        let GeoPoint { lat, lon } = frame.subpoint;
        let radius = self.globe_radius;

        track.satellite = Some(to_surface_position(lat, lon, radius * MARKER_ALTITUDE));

        if self.display_mode == DisplayMode::GroundTrack {
            track
                .trail
                .push(to_surface_position(lat, lon, radius * TRAIL_ALTITUDE));
        }

        let mut points: Vec<DVec3> = frame
            .spotbeam
            .iter()
            .map(|p| to_surface_position(p.y, p.x, radius * SPOTBEAM_ALTITUDE))
            .collect();
        if let (Some(&first), Some(&last)) = (points.first(), points.last())
            && first.distance_squared(last) > 1e-18
        {
            points.push(first);
        }
        track.spotbeam = SpotbeamOutline {
            points,
            revision: track.spotbeam.revision + 1,
        };

        track.globe_rotation = globe_rotation(frame.elapsed_seconds);
        track.labels = TimeLabels::from_frame(&frame);
        track.last_frame = Some(frame);
    }
}

/// In-flight position request.
#[derive(Component)]
pub struct PositionTask {
    pub tag: u64,
    task: Task<Result<Option<SatelliteFrame>, FetchError>>,
}

/// System set for issuing and collecting position requests.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub struct SyncSet;

/// Plugin driving the request-per-frame loop.
pub struct SyncPlugin;

impl Plugin for SyncPlugin {
    fn build(&self, app: &mut App) {
        let config = app
            .world()
            .get_resource::<ViewerConfig>()
            .cloned()
            .unwrap_or_default();

        app.insert_resource(SyncLoop::from_config(&config))
            .insert_resource(GroundTrack::new(config.trail_capacity))
            .configure_sets(Update, SyncSet.after(ClockSet).after(ControlSet))
            .add_systems(Update, toggle_display_mode.in_set(ControlSet))
            .add_systems(
                Update,
                (issue_position_request, collect_position_responses)
                    .chain()
                    .in_set(SyncSet),
            );
    }
}

fn toggle_display_mode(mut commands: MessageReader<ControlCommand>, mut sync: ResMut<SyncLoop>) {
    for command in commands.read() {
        if *command == ControlCommand::ToggleDisplayMode {
            sync.display_mode = sync.display_mode.toggled();
            info!("Display mode: {:?}", sync.display_mode);
        }
    }
}

/// Spawn a position request for the clock's current elapsed time.
fn issue_position_request(
    mut commands: Commands,
    mut sync: ResMut<SyncLoop>,
    clock: Res<SimulationClock>,
    backend: Res<Backend>,
) {
    if !sync.wants_request(&clock) {
        return;
    }

    let request = sync.issue(clock.elapsed_seconds());
    let radius_km = sync.spotbeam_radius_km();
    let source = backend.source();

    let task = IoTaskPool::get()
        .spawn(async move { source.position(request.elapsed_seconds, radius_km) });

    commands.spawn(PositionTask {
        tag: request.tag,
        task,
    });
}

/// Apply every position request that completed since the last frame.
fn collect_position_responses(
    mut commands: Commands,
    mut tasks: Query<(Entity, &mut PositionTask)>,
    mut sync: ResMut<SyncLoop>,
    mut clock: ResMut<SimulationClock>,
    mut track: ResMut<GroundTrack>,
    mut status: ResMut<StatusLine>,
) {
    for (entity, mut pending) in &mut tasks {
        let Some(outcome) = block_on(future::poll_once(&mut pending.task)) else {
            continue;
        };
        commands.entity(entity).despawn();

        match sync.resolve(pending.tag, outcome, &mut clock, &mut track) {
            Resolution::Applied | Resolution::NoData => {}
            Resolution::Stale => debug!("Dropped stale position response #{}", pending.tag),
            Resolution::Failed(err) => {
                error!("Position fetch failed, pausing simulation: {err}");
                status.error(format!("Position fetch failed: {err}"));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use bevy::math::DVec2;

    use crate::types::SECONDS_PER_DAY;

    fn frame(elapsed: f64, lat: f64, lon: f64) -> SatelliteFrame {
        SatelliteFrame {
            subpoint: GeoPoint::new(lat, lon),
            spotbeam: vec![
                DVec2::new(lon - 1.0, lat - 1.0),
                DVec2::new(lon, lat + 1.0),
                DVec2::new(lon + 1.0, lat - 1.0),
            ],
            elapsed_seconds: elapsed,
            simulation_time_iso: "2025-10-04T12:17:46+00:00".to_string(),
        }
    }

    fn setup(ordering: ResponseOrdering) -> (SyncLoop, SimulationClock, GroundTrack) {
        let config = ViewerConfig {
            response_ordering: ordering,
            ..Default::default()
        };
        (
            SyncLoop::from_config(&config),
            SimulationClock::new(0.0),
            GroundTrack::new(config.trail_capacity),
        )
    }

    #[test]
    fn test_applied_frame_updates_everything() {
        let (mut sync, mut clock, mut track) = setup(ResponseOrdering::LatestRequest);
        let request = sync.issue(3661.0);

        let resolution = sync.resolve(
            request.tag,
            Ok(Some(frame(86400.0 * 2.0 + 3661.0, 0.0, 0.0))),
            &mut clock,
            &mut track,
        );

        assert_eq!(resolution, Resolution::Applied);
        assert_eq!(track.trail.len(), 1);
        let satellite = track.satellite.unwrap();
        assert_abs_diff_eq!(satellite.x, 5.0 * MARKER_ALTITUDE, epsilon = 1e-9);
        assert_eq!(track.labels.day_hour(), "Day 02 / Hour 01:01:01");
        assert_eq!(track.spotbeam.revision, 1);
        // Outline closed by repeating the first point
        assert_eq!(track.spotbeam.points.len(), 4);
        assert_eq!(track.spotbeam.points[0], track.spotbeam.points[3]);
        assert_eq!(sync.in_flight(), 0);
    }

    #[test]
    fn test_already_closed_polygon_not_duplicated() {
        let (mut sync, mut clock, mut track) = setup(ResponseOrdering::LatestRequest);
        let mut f = frame(0.0, 10.0, 10.0);
        let first = f.spotbeam[0];
        f.spotbeam.push(first);

        let request = sync.issue(0.0);
        sync.resolve(request.tag, Ok(Some(f)), &mut clock, &mut track);
        assert_eq!(track.spotbeam.points.len(), 4);
    }

    #[test]
    fn test_failure_pauses_and_keeps_state() {
        let (mut sync, mut clock, mut track) = setup(ResponseOrdering::LatestRequest);
        let request = sync.issue(0.0);

        let resolution = sync.resolve(
            request.tag,
            Err(FetchError::Status {
                code: 500,
                body: "{\"error\": \"boom\"}".to_string(),
            }),
            &mut clock,
            &mut track,
        );

        assert!(matches!(resolution, Resolution::Failed(_)));
        assert!(!clock.is_playing());
        assert!(track.trail.is_empty());
        assert!(track.last_frame.is_none());
    }

    #[test]
    fn test_no_data_is_silent_noop() {
        let (mut sync, mut clock, mut track) = setup(ResponseOrdering::LatestRequest);
        let first = sync.issue(0.0);
        sync.resolve(first.tag, Ok(Some(frame(0.0, 1.0, 1.0))), &mut clock, &mut track);
        let revision = track.spotbeam.revision;

        let empty = sync.issue(10.0);
        assert_eq!(
            sync.resolve(empty.tag, Ok(None), &mut clock, &mut track),
            Resolution::NoData
        );
        let malformed = sync.issue(20.0);
        assert_eq!(
            sync.resolve(
                malformed.tag,
                Err(FetchError::Malformed("expected value".into())),
                &mut clock,
                &mut track
            ),
            Resolution::NoData
        );

        assert!(clock.is_playing());
        assert_eq!(track.trail.len(), 1);
        assert_eq!(track.spotbeam.revision, revision);
        assert_eq!(track.last_frame.as_ref().unwrap().elapsed_seconds, 0.0);
    }

    #[test]
    fn test_latest_request_drops_older_response() {
        let (mut sync, mut clock, mut track) = setup(ResponseOrdering::LatestRequest);
        let older = sync.issue(100.0);
        let newer = sync.issue(200.0);

        // Newer lands first
        sync.resolve(newer.tag, Ok(Some(frame(200.0, 2.0, 2.0))), &mut clock, &mut track);
        let late = sync.resolve(older.tag, Ok(Some(frame(100.0, 1.0, 1.0))), &mut clock, &mut track);

        assert_eq!(late, Resolution::Stale);
        assert_eq!(track.last_frame.as_ref().unwrap().elapsed_seconds, 200.0);
        assert_eq!(track.trail.len(), 1);
        assert_eq!(sync.stats.stale, 1);
    }

    #[test]
    fn test_latest_request_applies_in_order_responses() {
        let (mut sync, mut clock, mut track) = setup(ResponseOrdering::LatestRequest);
        let a = sync.issue(100.0);
        let b = sync.issue(200.0);

        // Both were outstanding together; in-order arrival applies both
        sync.resolve(a.tag, Ok(Some(frame(100.0, 1.0, 1.0))), &mut clock, &mut track);
        sync.resolve(b.tag, Ok(Some(frame(200.0, 2.0, 2.0))), &mut clock, &mut track);
        assert_eq!(track.trail.len(), 2);
        assert_eq!(sync.stats.applied, 2);
    }

    #[test]
    fn test_arrival_order_applies_late_response() {
        let (mut sync, mut clock, mut track) = setup(ResponseOrdering::ArrivalOrder);
        let older = sync.issue(100.0);
        let newer = sync.issue(200.0);

        sync.resolve(newer.tag, Ok(Some(frame(200.0, 2.0, 2.0))), &mut clock, &mut track);
        let late = sync.resolve(older.tag, Ok(Some(frame(100.0, 1.0, 1.0))), &mut clock, &mut track);

        // Known consistency gap: display moves behind the clock
        assert_eq!(late, Resolution::Applied);
        assert_eq!(track.last_frame.as_ref().unwrap().elapsed_seconds, 100.0);
        assert_eq!(track.trail.len(), 2);
    }

    #[test]
    fn test_spotbeam_only_mode_skips_trail() {
        let (mut sync, mut clock, mut track) = setup(ResponseOrdering::LatestRequest);
        sync.display_mode = DisplayMode::SpotbeamOnly;
        let request = sync.issue(0.0);
        sync.resolve(request.tag, Ok(Some(frame(0.0, 1.0, 1.0))), &mut clock, &mut track);
        assert!(track.trail.is_empty());
        assert!(track.satellite.is_some());
        assert_eq!(track.spotbeam.revision, 1);
    }

    #[test]
    fn test_rotation_follows_total_elapsed() {
        let (mut sync, mut clock, mut track) = setup(ResponseOrdering::LatestRequest);
        let request = sync.issue(0.0);
        sync.resolve(
            request.tag,
            Ok(Some(frame(SECONDS_PER_DAY * 1.5, 0.0, 0.0))),
            &mut clock,
            &mut track,
        );
        assert_abs_diff_eq!(
            track.globe_rotation,
            1.5 * std::f64::consts::TAU,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_paused_clock_requests_once() {
        let (mut sync, mut clock, _) = setup(ResponseOrdering::LatestRequest);
        clock.set_playing(false);

        assert!(sync.wants_request(&clock));
        sync.issue(clock.elapsed_seconds());
        assert!(!sync.wants_request(&clock));
    }

    #[test]
    fn test_playing_clock_requests_every_frame() {
        let (mut sync, clock, _) = setup(ResponseOrdering::LatestRequest);
        for _ in 0..3 {
            assert!(sync.wants_request(&clock));
            sync.issue(clock.elapsed_seconds());
        }
        assert_eq!(sync.in_flight(), 3);
    }

    #[test]
    fn test_in_flight_cap() {
        let config = ViewerConfig {
            max_in_flight: 2,
            ..Default::default()
        };
        let mut sync = SyncLoop::from_config(&config);
        let mut clock = SimulationClock::new(0.0);
        let mut track = GroundTrack::default();

        let first = sync.issue(0.0);
        sync.issue(0.0);
        assert!(!sync.wants_request(&clock));

        sync.resolve(first.tag, Ok(None), &mut clock, &mut track);
        assert!(sync.wants_request(&clock));
    }
}
