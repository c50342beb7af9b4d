//! Pointer picking on the globe and population estimates.
//!
//! Hover picks are debounced: only the last hover inside a quiet period
//! triggers a request. Clicks request immediately. Both do nothing unless the
//! population overlay is active, and neither ever touches simulation state.

use std::time::Duration;

use bevy::prelude::*;
use bevy::tasks::{IoTaskPool, Task, block_on, futures_lite::future};
use bevy::window::PrimaryWindow;

use crate::backend::{Backend, FetchError};
use crate::camera::MainCamera;
use crate::config::ViewerConfig;
use crate::geo::{GlobeRay, ray_to_geodetic};
use crate::overlay::PopulationOverlay;
use crate::sync::GroundTrack;
use crate::types::GeoPoint;

/// Single pending value that fires after a quiet period.
///
/// Scheduling a new value replaces (cancels) the previous one.
#[derive(Clone, Debug)]
pub struct Debouncer<T> {
    delay: Duration,
    pending: Option<(T, Duration)>,
}

impl<T> Debouncer<T> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    pub fn schedule(&mut self, value: T, now: Duration) {
        self.pending = Some((value, now + self.delay));
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Take the pending value if its deadline has passed.
    pub fn poll(&mut self, now: Duration) -> Option<T> {
        match &self.pending {
            Some((_, deadline)) if now >= *deadline => self.pending.take().map(|(v, _)| v),
            _ => None,
        }
    }
}

/// One estimate request, tagged with the pointer event that caused it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PickRequest {
    pub event_id: u64,
    pub point: GeoPoint,
}

/// Tooltip content for the population overlay.
#[derive(Resource, Clone, Debug, Default, PartialEq)]
pub struct PopulationTooltip {
    pub visible: bool,
    /// Anchor in window coordinates
    pub screen: Vec2,
    /// Coordinates the shown estimate belongs to
    pub point: Option<GeoPoint>,
    pub estimate: Option<i64>,
    pub error: Option<String>,
}

impl PopulationTooltip {
    pub fn hide(&mut self) {
        *self = Self::default();
    }

    /// Text body for the tooltip.
    pub fn text(&self) -> Option<String> {
        if !self.visible {
            return None;
        }
        let point = self.point?;
        let coords = format!("Lat {:.2}°, Lon {:.2}°", point.lat, point.lon);
        let detail = match (&self.estimate, &self.error) {
            (Some(n), _) => format!("Est. population: {}", group_thousands(*n)),
            (None, Some(err)) => format!("Estimate unavailable: {err}"),
            (None, None) => "Estimating…".to_string(),
        };
        Some(format!("{coords}\n{detail}"))
    }
}

/// Format an integer with comma thousands separators.
pub fn group_thousands(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    if n < 0 { format!("-{out}") } else { out }
}

/// Picker bookkeeping: debounce timer, event ids and ready requests.
#[derive(Resource, Debug)]
pub struct PickerState {
    debounce: Debouncer<PickRequest>,
    next_event_id: u64,
    /// Only responses for this event may update the tooltip
    latest_event_id: Option<u64>,
    ready: Vec<PickRequest>,
}

impl Default for PickerState {
    fn default() -> Self {
        Self::new(Duration::from_millis(200))
    }
}

impl PickerState {
    pub fn new(debounce: Duration) -> Self {
        Self {
            debounce: Debouncer::new(debounce),
            next_event_id: 0,
            latest_event_id: None,
            ready: Vec::new(),
        }
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_event_id;
        self.next_event_id += 1;
        self.latest_event_id = Some(id);
        id
    }

    /// Pointer moved. `hit` is the picked coordinate, if any.
    pub fn hover(
        &mut self,
        hit: Option<GeoPoint>,
        screen: Vec2,
        now: Duration,
        tooltip: &mut PopulationTooltip,
    ) {
        let Some(point) = hit.filter(GeoPoint::is_finite) else {
            self.miss(tooltip);
            return;
        };

        let event_id = self.next_id();
        self.debounce.schedule(PickRequest { event_id, point }, now);
        show_pending(tooltip, point, screen);
    }

    /// Pointer clicked. Requests immediately and drops any pending hover.
    pub fn click(&mut self, hit: Option<GeoPoint>, screen: Vec2, tooltip: &mut PopulationTooltip) {
        let Some(point) = hit.filter(GeoPoint::is_finite) else {
            self.miss(tooltip);
            return;
        };

        self.debounce.cancel();
        let event_id = self.next_id();
        self.ready.push(PickRequest { event_id, point });
        show_pending(tooltip, point, screen);
    }

    /// Ray missed the globe: hide the tooltip and forget pending work.
    pub fn miss(&mut self, tooltip: &mut PopulationTooltip) {
        self.debounce.cancel();
        self.ready.clear();
        self.latest_event_id = None;
        tooltip.hide();
    }

    /// Requests that should be sent now.
    pub fn take_ready(&mut self, now: Duration) -> Vec<PickRequest> {
        let mut ready = std::mem::take(&mut self.ready);
        if let Some(request) = self.debounce.poll(now) {
            ready.push(request);
        }
        ready
    }

    pub fn has_pending(&self) -> bool {
        self.debounce.is_pending() || !self.ready.is_empty()
    }

    /// Apply an estimate response. Responses for superseded events are
    /// dropped; returns whether the tooltip changed.
    pub fn accept(
        &self,
        request: PickRequest,
        result: Result<i64, FetchError>,
        tooltip: &mut PopulationTooltip,
    ) -> bool {
        if self.latest_event_id != Some(request.event_id) {
            return false;
        }
        tooltip.point = Some(request.point);
        match result {
            Ok(estimate) => {
                tooltip.estimate = Some(estimate);
                tooltip.error = None;
            }
            Err(err) => {
                tooltip.estimate = None;
                tooltip.error = Some(err.to_string());
            }
        }
        true
    }
}

fn show_pending(tooltip: &mut PopulationTooltip, point: GeoPoint, screen: Vec2) {
    tooltip.visible = true;
    tooltip.screen = screen;
    tooltip.point = Some(point);
    tooltip.estimate = None;
    tooltip.error = None;
}

/// Pick the globe from a world-space ray.
pub fn pick(ray: GlobeRay, globe_radius: f64, globe_rotation: f64) -> Option<GeoPoint> {
    ray_to_geodetic(ray, globe_radius, globe_rotation)
}

/// Whether the pointer is over UI; set by the UI layer each frame.
#[derive(Resource, Default, PartialEq, Eq)]
pub struct PointerOverUi(pub bool);

/// In-flight estimate request.
#[derive(Component)]
pub struct EstimateTask {
    request: PickRequest,
    task: Task<Result<i64, FetchError>>,
}

/// System set for pointer handling and estimate dispatch.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub struct PickerSet;

/// Headless part of the picker: debounce dispatch, responses and overlay gating.
pub struct PickerPlugin;

impl Plugin for PickerPlugin {
    fn build(&self, app: &mut App) {
        let config = app
            .world()
            .get_resource::<ViewerConfig>()
            .cloned()
            .unwrap_or_default();

        app.insert_resource(PickerState::new(config.hover_debounce))
            .init_resource::<PopulationTooltip>()
            .init_resource::<PointerOverUi>()
            .add_systems(
                Update,
                (
                    reset_when_overlay_inactive,
                    dispatch_estimates,
                    collect_estimates,
                )
                    .chain()
                    .in_set(PickerSet),
            );
    }
}

/// Pointer input from the primary window; only added to windowed apps.
pub struct PointerPickPlugin;

impl Plugin for PointerPickPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Update, pointer_pick.before(PickerSet));
    }
}

/// Turn cursor movement and clicks into hover/click picks.
fn pointer_pick(
    window_query: Query<&Window, With<PrimaryWindow>>,
    camera_query: Query<(&Camera, &GlobalTransform), With<MainCamera>>,
    mouse: Res<ButtonInput<MouseButton>>,
    overlay: Res<PopulationOverlay>,
    over_ui: Res<PointerOverUi>,
    track: Res<GroundTrack>,
    config: Res<ViewerConfig>,
    time: Res<Time<Real>>,
    mut state: ResMut<PickerState>,
    mut tooltip: ResMut<PopulationTooltip>,
    mut last_cursor: Local<Option<Vec2>>,
) {
    if !overlay.is_active() || over_ui.0 {
        return;
    }

    let Ok(window) = window_query.single() else {
        return;
    };
    let Some(cursor) = window.cursor_position() else {
        if last_cursor.take().is_some() {
            state.miss(&mut tooltip);
        }
        return;
    };

    let clicked = mouse.just_pressed(MouseButton::Left);
    let moved = *last_cursor != Some(cursor);
    if !clicked && !moved {
        return;
    }
    *last_cursor = Some(cursor);

    let Ok((camera, camera_transform)) = camera_query.single() else {
        return;
    };
    let hit = camera
        .viewport_to_world(camera_transform, cursor)
        .ok()
        .and_then(|ray| {
            let world_ray = GlobeRay::new(ray.origin.as_dvec3(), ray.direction.as_dvec3());
            pick(world_ray, config.globe_radius, track.globe_rotation)
        });

    if clicked {
        state.click(hit, cursor, &mut tooltip);
    } else {
        state.hover(hit, cursor, time.elapsed(), &mut tooltip);
    }
}

/// Hovering and clicking are inert while the overlay is off.
fn reset_when_overlay_inactive(
    overlay: Res<PopulationOverlay>,
    mut state: ResMut<PickerState>,
    mut tooltip: ResMut<PopulationTooltip>,
) {
    if !overlay.is_active() && (tooltip.visible || state.has_pending()) {
        state.miss(&mut tooltip);
    }
}

fn dispatch_estimates(
    mut commands: Commands,
    mut state: ResMut<PickerState>,
    backend: Res<Backend>,
    config: Res<ViewerConfig>,
    time: Res<Time<Real>>,
) {
    for request in state.take_ready(time.elapsed()) {
        if !request.point.is_finite() {
            continue;
        }
        let source = backend.source();
        let radius_km = config.estimate_radius_km;
        let task = IoTaskPool::get()
            .spawn(async move { source.population_estimate(request.point, radius_km) });
        commands.spawn(EstimateTask { request, task });
    }
}

fn collect_estimates(
    mut commands: Commands,
    mut tasks: Query<(Entity, &mut EstimateTask)>,
    state: Res<PickerState>,
    mut tooltip: ResMut<PopulationTooltip>,
) {
    for (entity, mut pending) in &mut tasks {
        let Some(result) = block_on(future::poll_once(&mut pending.task)) else {
            continue;
        };
        commands.entity(entity).despawn();

        if let Err(err) = &result {
            warn!("Population estimate failed: {err}");
        }
        if !state.accept(pending.request, result, &mut tooltip) {
            debug!("Dropped estimate for superseded event #{}", pending.request.event_id);
        }
    }
}
