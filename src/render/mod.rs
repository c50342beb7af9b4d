//! Scene construction: globe, overlay, marker, trail and spotbeam.
//!
//! Reads the pure geometry in [`GroundTrack`](crate::sync::GroundTrack) and
//! owns every mesh, material and texture derived from it.

mod background;
pub mod globe;
pub mod track;

use bevy::prelude::*;

use self::background::BackgroundPlugin;
use self::globe::GlobePlugin;
use self::track::TrackPlugin;

pub use self::globe::{Globe, PopulationLayer, SatelliteMarker};
pub use self::track::{SpotbeamMesh, TrailSettings};

/// Plugin aggregating all rendering functionality.
pub struct RenderPlugin;

impl Plugin for RenderPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins((BackgroundPlugin, GlobePlugin, TrackPlugin));
    }
}
