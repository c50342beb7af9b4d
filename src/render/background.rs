//! Starfield and lighting.

use std::f32::consts::PI;

use bevy::prelude::*;

use crate::config::ViewerConfig;

const STAR_COUNT: usize = 600;

/// Star shell radius as a multiple of the globe radius.
const STAR_SHELL: f32 = 40.0;

pub struct BackgroundPlugin;

impl Plugin for BackgroundPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(ClearColor(Color::srgb(0.01, 0.01, 0.03)))
            .add_systems(Startup, (spawn_starfield, spawn_lighting));
    }
}

/// Evenly spread unit directions (golden-angle spiral).
pub fn fibonacci_directions(count: usize) -> impl Iterator<Item = Vec3> {
    let golden = PI * (3.0 - 5.0_f32.sqrt());
    (0..count).map(move |i| {
        let y = 1.0 - 2.0 * (i as f32 + 0.5) / count as f32;
        let r = (1.0 - y * y).sqrt();
        let theta = golden * i as f32;
        Vec3::new(r * theta.cos(), y, r * theta.sin())
    })
}

fn spawn_starfield(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    config: Res<ViewerConfig>,
) {
    let star_material = materials.add(StandardMaterial {
        base_color: Color::WHITE,
        emissive: LinearRgba::WHITE * 0.5,
        unlit: true,
        ..default()
    });
    let shell = config.globe_radius as f32 * STAR_SHELL;
    let star_mesh = meshes.add(Sphere::new(shell * 0.002));

    for (i, direction) in fibonacci_directions(STAR_COUNT).enumerate() {
        // Cheap size variation without a RNG
        let scale = 0.5 + (i * 7 % 10) as f32 / 10.0;
        commands.spawn((
            Mesh3d(star_mesh.clone()),
            MeshMaterial3d(star_material.clone()),
            Transform::from_translation(direction * shell).with_scale(Vec3::splat(scale)),
        ));
    }

    info!("Spawned {STAR_COUNT} background stars");
}

fn spawn_lighting(mut commands: Commands) {
    commands.insert_resource(GlobalAmbientLight {
        color: Color::WHITE,
        brightness: 300.0,
        ..default()
    });

    commands.spawn((
        DirectionalLight {
            illuminance: 6000.0,
            shadows_enabled: false,
            ..default()
        },
        Transform::from_xyz(30.0, 10.0, 30.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));

    info!("Scene lighting initialized");
}
