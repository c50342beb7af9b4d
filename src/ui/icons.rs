//! Phosphor icon definitions for the UI.
//!
//! Icons are initialized via `setup_fonts` when the app starts.

use bevy::prelude::*;
use bevy_egui::{EguiContexts, egui};

/// Resource to track if fonts have been initialized.
#[derive(Resource, Default)]
pub struct FontsInitialized(pub bool);

/// System to initialize Phosphor icon fonts.
/// Runs in EguiPrimaryContextPass where the egui context is guaranteed to be ready.
pub fn setup_fonts(mut contexts: EguiContexts, mut initialized: ResMut<FontsInitialized>) {
    if initialized.0 {
        return;
    }

    let Ok(ctx) = contexts.ctx_mut() else {
        return;
    };

    let mut fonts = egui::FontDefinitions::default();
    egui_phosphor::add_to_fonts(&mut fonts, egui_phosphor::Variant::Regular);

    ctx.set_fonts(fonts);
    initialized.0 = true;

    info!("Phosphor icon fonts initialized");
}

// Browse all icons at https://phosphoricons.com/

pub const PLAY: &str = egui_phosphor::regular::PLAY;
pub const PAUSE: &str = egui_phosphor::regular::PAUSE;
/// Forward direction
pub const FORWARD: &str = egui_phosphor::regular::FAST_FORWARD;
/// Reverse direction
pub const REWIND: &str = egui_phosphor::regular::REWIND;
pub const HELP: &str = egui_phosphor::regular::QUESTION;
pub const CLOSE: &str = egui_phosphor::regular::X;

/// Population overlay toggle
pub const POPULATION: &str = egui_phosphor::regular::USERS_THREE;
/// Coverage score request
pub const COVERAGE: &str = egui_phosphor::regular::TARGET;
/// Ground track display mode
pub const TRACK: &str = egui_phosphor::regular::PATH;
/// Spotbeam-only display mode
pub const SPOTBEAM: &str = egui_phosphor::regular::BROADCAST;

pub const WARNING: &str = egui_phosphor::regular::WARNING;
pub const INFO: &str = egui_phosphor::regular::INFO;
pub const CLOCK: &str = egui_phosphor::regular::CLOCK;
pub const GLOBE: &str = egui_phosphor::regular::GLOBE;
pub const SPINNER: &str = egui_phosphor::regular::CIRCLE_NOTCH;
