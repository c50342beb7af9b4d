//! Globe, population overlay sphere and satellite marker.
//!
//! The globe entity carries the earth rotation. Everything drawn in the
//! earth-fixed frame (marker, spotbeam, overlay) is a child of it, so a
//! single transform keeps them aligned with the picker's inverse transform.

use std::f64::consts::TAU;

use bevy::asset::RenderAssetUsages;
use bevy::mesh::{Indices, PrimitiveTopology};
use bevy::prelude::*;
use bevy::render::render_resource::{Extent3d, TextureDimension, TextureFormat};

use crate::config::ViewerConfig;
use crate::geo::to_surface_position;
use crate::overlay::{DecodedRaster, PopulationOverlay};
use crate::sync::GroundTrack;

/// Overlay shell height as a multiple of the globe radius.
const OVERLAY_ALTITUDE: f32 = 1.002;

/// Marker sphere radius as a fraction of the globe radius.
const MARKER_SIZE: f32 = 0.02;

const LON_SEGMENTS: u32 = 128;
const LAT_SEGMENTS: u32 = 64;

/// Longitude at u = 0 of the untextured globe.
const GLOBE_FIRST_LON: f64 = -180.0;

/// Longitude at column 0 of the density raster. The backend rolls its
/// -180..180 source half a width before rendering, so the PNG spans 0..360.
pub const DENSITY_FIRST_LON: f64 = 0.0;

/// Root entity rotated with the earth.
#[derive(Component)]
pub struct Globe;

#[derive(Component)]
pub struct SatelliteMarker;

/// Sphere showing the population raster.
#[derive(Component)]
pub struct PopulationLayer {
    /// Set once the raster has been uploaded
    textured: bool,
}

pub struct GlobePlugin;

impl Plugin for GlobePlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, spawn_globe).add_systems(
            Update,
            (
                rotate_globe,
                place_marker,
                (upload_population_texture, show_population_layer).chain(),
            ),
        );
    }
}

/// Lat/lon grid vertex: position, outward normal and equirectangular UV.
///
/// `u` runs from 0 at `first_lon` eastward through one full turn.
pub fn grid_vertex(
    lat: f64,
    lon: f64,
    first_lon: f64,
    radius: f64,
) -> ([f32; 3], [f32; 3], [f32; 2]) {
    let p = to_surface_position(lat, lon, radius);
    let n = p.normalize_or_zero();
    let u = (lon - first_lon) / 360.0;
    let v = (90.0 - lat) / 180.0;
    (
        p.as_vec3().to_array(),
        n.as_vec3().to_array(),
        [u as f32, v as f32],
    )
}

/// Sphere mesh whose UVs follow the globe's lat/lon convention, so an
/// equirectangular raster whose first column sits at `first_lon` lands on
/// the right coordinates. The seam is placed at `first_lon`.
pub fn globe_mesh(radius: f64, first_lon: f64, lon_segments: u32, lat_segments: u32) -> Mesh {
    let lon_segments = lon_segments.max(3);
    let lat_segments = lat_segments.max(2);
    let row = lon_segments + 1;

    let mut positions = Vec::with_capacity((row * (lat_segments + 1)) as usize);
    let mut normals = Vec::with_capacity(positions.capacity());
    let mut uvs = Vec::with_capacity(positions.capacity());

    for i in 0..=lat_segments {
        let lat = 90.0 - 180.0 * f64::from(i) / f64::from(lat_segments);
        for j in 0..=lon_segments {
            let lon = first_lon + 360.0 * f64::from(j) / f64::from(lon_segments);
            let (p, n, uv) = grid_vertex(lat, lon, first_lon, radius);
            positions.push(p);
            normals.push(n);
            uvs.push(uv);
        }
    }

    // Counter-clockwise seen from outside
    let mut indices = Vec::with_capacity((lon_segments * lat_segments * 6) as usize);
    for i in 0..lat_segments {
        for j in 0..lon_segments {
            let a = i * row + j;
            let b = a + row;
            let c = a + 1;
            let d = b + 1;
            indices.extend_from_slice(&[a, b, d, a, d, c]);
        }
    }

    Mesh::new(PrimitiveTopology::TriangleList, RenderAssetUsages::default())
        .with_inserted_attribute(Mesh::ATTRIBUTE_POSITION, positions)
        .with_inserted_attribute(Mesh::ATTRIBUTE_NORMAL, normals)
        .with_inserted_attribute(Mesh::ATTRIBUTE_UV_0, uvs)
        .with_inserted_indices(Indices::U32(indices))
}

/// GPU image for a decoded raster.
pub fn raster_image(raster: &DecodedRaster) -> Image {
    Image::new(
        Extent3d {
            width: raster.width,
            height: raster.height,
            depth_or_array_layers: 1,
        },
        TextureDimension::D2,
        raster.rgba.clone(),
        TextureFormat::Rgba8UnormSrgb,
        RenderAssetUsages::default(),
    )
}

/// Globe rotation as a render-space quaternion.
pub fn globe_quat(rotation: f64) -> Quat {
    Quat::from_rotation_y(rotation.rem_euclid(TAU) as f32)
}

fn spawn_globe(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    config: Res<ViewerConfig>,
) {
    let radius = config.globe_radius;

    let globe_material = materials.add(StandardMaterial {
        base_color: Color::srgb(0.12, 0.3, 0.55),
        perceptual_roughness: 0.9,
        ..default()
    });

    let overlay_material = materials.add(StandardMaterial {
        base_color: Color::WHITE,
        alpha_mode: AlphaMode::Blend,
        unlit: true,
        ..default()
    });

    let marker_color = Color::srgb(1.0, 0.85, 0.2);
    let marker_material = materials.add(StandardMaterial {
        base_color: marker_color,
        emissive: marker_color.to_linear() * 2.0,
        unlit: true,
        ..default()
    });

    commands
        .spawn((
            Mesh3d(meshes.add(globe_mesh(
                radius,
                GLOBE_FIRST_LON,
                LON_SEGMENTS,
                LAT_SEGMENTS,
            ))),
            MeshMaterial3d(globe_material),
            Transform::IDENTITY,
            Globe,
        ))
        .with_children(|parent| {
            parent.spawn((
                Mesh3d(meshes.add(globe_mesh(
                    radius * f64::from(OVERLAY_ALTITUDE),
                    DENSITY_FIRST_LON,
                    LON_SEGMENTS,
                    LAT_SEGMENTS,
                ))),
                MeshMaterial3d(overlay_material),
                Transform::IDENTITY,
                Visibility::Hidden,
                PopulationLayer { textured: false },
            ));
            parent.spawn((
                Mesh3d(meshes.add(Sphere::new(radius as f32 * MARKER_SIZE))),
                MeshMaterial3d(marker_material),
                Transform::IDENTITY,
                Visibility::Hidden,
                SatelliteMarker,
            ));
        });

    info!("Spawned globe (radius {radius})");
}

fn rotate_globe(track: Res<GroundTrack>, mut globe: Query<&mut Transform, With<Globe>>) {
    if !track.is_changed() {
        return;
    }
    let Ok(mut transform) = globe.single_mut() else {
        return;
    };
    transform.rotation = globe_quat(track.globe_rotation);
}

fn place_marker(
    track: Res<GroundTrack>,
    mut marker: Query<(&mut Transform, &mut Visibility), With<SatelliteMarker>>,
) {
    if !track.is_changed() {
        return;
    }
    let Ok((mut transform, mut visibility)) = marker.single_mut() else {
        return;
    };
    match track.satellite {
        Some(position) => {
            transform.translation = position.as_vec3();
            *visibility = Visibility::Inherited;
        }
        None => *visibility = Visibility::Hidden,
    }
}

/// Build the texture once, the first time the raster is available.
fn upload_population_texture(
    overlay: Res<PopulationOverlay>,
    mut images: ResMut<Assets<Image>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut layer: Query<(&mut PopulationLayer, &MeshMaterial3d<StandardMaterial>)>,
) {
    let Some(raster) = overlay.resource() else {
        return;
    };
    let Ok((mut layer, material)) = layer.single_mut() else {
        return;
    };
    if layer.textured {
        return;
    }

    let image = images.add(raster_image(raster));
    if let Some(material) = materials.get_mut(&material.0) {
        material.base_color_texture = Some(image);
    }
    layer.textured = true;
    debug!("Uploaded population texture");
}

fn show_population_layer(
    overlay: Res<PopulationOverlay>,
    mut layer: Query<(&PopulationLayer, &mut Visibility)>,
) {
    let Ok((layer, mut visibility)) = layer.single_mut() else {
        return;
    };
    let wanted = if overlay.is_active() && layer.textured {
        Visibility::Inherited
    } else {
        Visibility::Hidden
    };
    visibility.set_if_neq(wanted);
}
