//! Groundtrack - Satellite Ground-Track Viewer
//!
//! A simulated clock drives per-frame position requests against a backend;
//! resolved frames become a satellite marker, a bounded ground-track trail,
//! a spotbeam outline and a rotating globe. A population density overlay,
//! debounced population estimates and an on-demand coverage score ride on
//! the same backend.
//!
//! The library exposes the headless core ([`CorePlugin`]) so it can run and
//! be tested without a window; the binary adds rendering, camera, input and
//! UI on top.

pub mod backend;
pub mod camera;
pub mod config;
pub mod control;
pub mod coverage;
pub mod geo;
pub mod input;
pub mod overlay;
pub mod picker;
pub mod render;
pub mod sync;
pub mod time;
pub mod trail;
pub mod types;
pub mod ui;

use bevy::prelude::*;

use crate::config::ViewerConfig;

/// Clock, sync loop, control surface, overlay, picker and coverage.
///
/// Insert [`ViewerConfig`] and a [`backend::Backend`] before adding this
/// plugin; a missing config falls back to defaults.
pub struct CorePlugin;

impl Plugin for CorePlugin {
    fn build(&self, app: &mut App) {
        if !app.world().contains_resource::<ViewerConfig>() {
            app.init_resource::<ViewerConfig>();
        }

        app.add_plugins((
            control::ControlPlugin,
            time::TimePlugin,
            sync::SyncPlugin,
            overlay::OverlayPlugin,
            picker::PickerPlugin,
            coverage::CoveragePlugin,
        ))
        .configure_sets(Update, picker::PickerSet.after(sync::SyncSet));
    }
}
