//! Orbit camera around the globe.
//!
//! Right-drag orbits, scroll wheel zooms. The camera always looks at the
//! globe centre.

use bevy::{
    input::mouse::{AccumulatedMouseMotion, AccumulatedMouseScroll},
    prelude::*,
};

use crate::config::ViewerConfig;
use crate::picker::PointerOverUi;

/// Closest camera distance as a multiple of the globe radius.
pub const MIN_DISTANCE_FACTOR: f32 = 1.3;

/// Furthest camera distance as a multiple of the globe radius.
pub const MAX_DISTANCE_FACTOR: f32 = 10.0;

/// Initial camera distance as a multiple of the globe radius.
pub const DEFAULT_DISTANCE_FACTOR: f32 = 3.0;

/// Fractional zoom per scroll line.
pub const ZOOM_SPEED: f32 = 0.1;

/// Radians of orbit per pixel dragged.
pub const ORBIT_SPEED: f32 = 0.005;

/// Pitch limit, just short of the poles to keep `looking_at` stable.
const MAX_PITCH: f32 = 1.5;

/// Marker component for the main camera.
#[derive(Component)]
pub struct MainCamera;

/// Spherical camera placement around the origin.
#[derive(Resource, Clone, Copy, Debug, PartialEq)]
pub struct OrbitCamera {
    pub yaw: f32,
    pub pitch: f32,
    pub distance: f32,
    pub min_distance: f32,
    pub max_distance: f32,
}

impl OrbitCamera {
    pub fn for_globe(radius: f32) -> Self {
        Self {
            yaw: 0.0,
            pitch: 0.3,
            distance: radius * DEFAULT_DISTANCE_FACTOR,
            min_distance: radius * MIN_DISTANCE_FACTOR,
            max_distance: radius * MAX_DISTANCE_FACTOR,
        }
    }

    /// Logarithmic zoom; positive `lines` moves closer.
    pub fn zoom(&mut self, lines: f32) {
        let factor = (1.0 - lines * ZOOM_SPEED).max(0.1);
        self.distance = (self.distance * factor).clamp(self.min_distance, self.max_distance);
    }

    pub fn orbit(&mut self, delta: Vec2) {
        self.yaw -= delta.x * ORBIT_SPEED;
        self.pitch = (self.pitch + delta.y * ORBIT_SPEED).clamp(-MAX_PITCH, MAX_PITCH);
    }

    pub fn transform(&self) -> Transform {
        let rotation = Quat::from_euler(EulerRot::YXZ, self.yaw, -self.pitch, 0.0);
        let position = rotation * Vec3::new(0.0, 0.0, self.distance);
        Transform::from_translation(position).looking_at(Vec3::ZERO, Vec3::Y)
    }
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self::for_globe(ViewerConfig::default().globe_radius as f32)
    }
}

/// Plugin providing camera functionality.
pub struct CameraPlugin;

impl Plugin for CameraPlugin {
    fn build(&self, app: &mut App) {
        let radius = app
            .world()
            .get_resource::<ViewerConfig>()
            .map_or(ViewerConfig::default().globe_radius, |c| c.globe_radius);

        app.insert_resource(OrbitCamera::for_globe(radius as f32))
            .add_systems(Startup, setup_camera)
            .add_systems(Update, (camera_zoom, camera_orbit, apply_orbit).chain());
    }
}

/// Spawn the main camera with a perspective projection.
fn setup_camera(mut commands: Commands, orbit: Res<OrbitCamera>) {
    commands.spawn((Camera3d::default(), orbit.transform(), MainCamera));
}

/// Handle mouse scroll wheel for zoom.
fn camera_zoom(
    mouse_scroll: Res<AccumulatedMouseScroll>,
    over_ui: Res<PointerOverUi>,
    mut orbit: ResMut<OrbitCamera>,
) {
    if mouse_scroll.delta.y == 0.0 || over_ui.0 {
        return;
    }
    orbit.zoom(mouse_scroll.delta.y);
}

/// Handle right mouse button drag for orbiting.
fn camera_orbit(
    mouse_buttons: Res<ButtonInput<MouseButton>>,
    mouse_motion: Res<AccumulatedMouseMotion>,
    mut orbit: ResMut<OrbitCamera>,
) {
    if !mouse_buttons.pressed(MouseButton::Right) || mouse_motion.delta == Vec2::ZERO {
        return;
    }
    orbit.orbit(mouse_motion.delta);
}

fn apply_orbit(
    orbit: Res<OrbitCamera>,
    mut camera_query: Query<&mut Transform, With<MainCamera>>,
) {
    if !orbit.is_changed() {
        return;
    }
    let Ok(mut transform) = camera_query.single_mut() else {
        return;
    };
    *transform = orbit.transform();
}
