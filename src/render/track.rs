//! Ground track trail and spotbeam outline.

use bevy::asset::RenderAssetUsages;
use bevy::math::DVec3;
use bevy::mesh::PrimitiveTopology;
use bevy::prelude::*;

use super::globe::{Globe, globe_quat};
use crate::sync::GroundTrack;

/// Settings for trail rendering.
#[derive(Resource)]
pub struct TrailSettings {
    pub color: Color,
}

impl Default for TrailSettings {
    fn default() -> Self {
        Self {
            color: Color::srgba(1.0, 0.4, 0.2, 0.9),
        }
    }
}

/// Current spotbeam outline entity and the revision it was built from.
#[derive(Component)]
pub struct SpotbeamMesh {
    pub revision: u64,
}

pub struct TrackPlugin;

impl Plugin for TrackPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<TrailSettings>()
            .add_systems(Update, (draw_trail, rebuild_spotbeam));
    }
}

/// Line strip mesh through the outline points.
pub fn outline_mesh(points: &[DVec3]) -> Mesh {
    let positions: Vec<[f32; 3]> = points.iter().map(|p| p.as_vec3().to_array()).collect();
    Mesh::new(PrimitiveTopology::LineStrip, RenderAssetUsages::default())
        .with_inserted_attribute(Mesh::ATTRIBUTE_POSITION, positions)
}

/// Draw the trail in world space; gizmos do not follow the globe transform.
fn draw_trail(mut gizmos: Gizmos, track: Res<GroundTrack>, settings: Res<TrailSettings>) {
    if track.trail.len() < 2 {
        return;
    }
    let rotation = globe_quat(track.globe_rotation);
    gizmos.linestrip(
        track.trail.iter().map(|p| rotation * p.as_vec3()),
        settings.color,
    );
}

/// Replace the outline mesh when a new spotbeam arrives.
///
/// The old mesh asset is removed along with its entity so outlines do not
/// accumulate.
fn rebuild_spotbeam(
    mut commands: Commands,
    track: Res<GroundTrack>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut material: Local<Option<Handle<StandardMaterial>>>,
    existing: Query<(Entity, &SpotbeamMesh, &Mesh3d)>,
    globe: Query<Entity, With<Globe>>,
) {
    let outline = &track.spotbeam;
    if existing.iter().any(|(_, m, _)| m.revision == outline.revision) {
        return;
    }
    let Ok(globe) = globe.single() else {
        return;
    };

    for (entity, _, mesh) in &existing {
        meshes.remove(&mesh.0);
        commands.entity(entity).despawn();
    }

    if outline.points.len() < 2 {
        return;
    }

    let material = material
        .get_or_insert_with(|| {
            materials.add(StandardMaterial {
                base_color: Color::srgb(0.3, 1.0, 0.6),
                unlit: true,
                ..default()
            })
        })
        .clone();

    commands.spawn((
        Mesh3d(meshes.add(outline_mesh(&outline.points))),
        MeshMaterial3d(material),
        Transform::IDENTITY,
        SpotbeamMesh {
            revision: outline.revision,
        },
        ChildOf(globe),
    ));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::SpotbeamOutline;

    fn spotbeam_app() -> App {
        let mut app = App::new();
        app.add_plugins((MinimalPlugins, AssetPlugin::default()))
            .init_asset::<Mesh>()
            .init_asset::<StandardMaterial>()
            .init_resource::<GroundTrack>()
            .add_systems(Update, rebuild_spotbeam);
        app.world_mut().spawn((Transform::IDENTITY, Globe));
        app
    }

    fn publish_outline(app: &mut App, revision: u64, offset: f64) {
        let points = vec![
            DVec3::new(offset, 1.0, 0.0),
            DVec3::new(offset, 0.0, 1.0),
            DVec3::new(offset, -1.0, 0.0),
            DVec3::new(offset, 1.0, 0.0),
        ];
        app.world_mut().resource_mut::<GroundTrack>().spotbeam =
            SpotbeamOutline { points, revision };
        app.update();
    }

    fn outlines(app: &mut App) -> Vec<(u64, Handle<Mesh>)> {
        let world = app.world_mut();
        let mut query = world.query::<(&SpotbeamMesh, &Mesh3d)>();
        query
            .iter(world)
            .map(|(m, mesh)| (m.revision, mesh.0.clone()))
            .collect()
    }

    #[test]
    fn test_outline_mesh_keeps_points() {
        let points = [DVec3::X, DVec3::Y, DVec3::Z, DVec3::X];
        let mesh = outline_mesh(&points);
        assert_eq!(mesh.count_vertices(), 4);
        assert_eq!(mesh.primitive_topology(), PrimitiveTopology::LineStrip);
    }

    #[test]
    fn test_replacing_outline_releases_previous_mesh() {
        let mut app = spotbeam_app();

        publish_outline(&mut app, 1, 0.0);
        assert_eq!(outlines(&mut app).len(), 1);
        assert_eq!(app.world().resource::<Assets<Mesh>>().len(), 1);

        publish_outline(&mut app, 2, 0.5);
        publish_outline(&mut app, 3, 1.0);

        let current = outlines(&mut app);
        assert_eq!(current.len(), 1);
        assert_eq!(current[0].0, 3);

        let meshes = app.world().resource::<Assets<Mesh>>();
        assert_eq!(meshes.len(), 1);
        assert!(meshes.contains(&current[0].1));
    }

    #[test]
    fn test_same_revision_is_not_rebuilt() {
        let mut app = spotbeam_app();
        publish_outline(&mut app, 1, 0.0);
        let before = outlines(&mut app);

        app.update();
        app.update();

        assert_eq!(outlines(&mut app), before);
        assert_eq!(app.world().resource::<Assets<Mesh>>().len(), 1);
    }
}
