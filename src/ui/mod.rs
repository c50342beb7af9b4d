//! UI module providing the egui control surface.

mod dock;
pub mod icons;
mod popups;

use bevy::prelude::*;
use bevy_egui::EguiPrimaryContextPass;

pub use dock::{HelpTooltipState, SHORTCUTS, preset_index, speed_label};

/// Plugin that adds all UI systems.
pub struct UiPlugin;

impl Plugin for UiPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<HelpTooltipState>()
            .init_resource::<icons::FontsInitialized>()
            // Font initialization MUST run before any UI systems that use icons
            .add_systems(EguiPrimaryContextPass, icons::setup_fonts)
            .add_systems(
                EguiPrimaryContextPass,
                (
                    dock::dock_system,
                    popups::tooltip_system,
                    popups::alert_system,
                    popups::track_pointer_over_ui,
                )
                    .chain()
                    .after(icons::setup_fonts)
                    .run_if(|init: Res<icons::FontsInitialized>| init.0),
            );
    }
}
