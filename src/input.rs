//! Keyboard shortcuts.
//!
//! Keys map onto the same [`ControlCommand`]s the dock sends, so shortcuts
//! and buttons cannot drift apart.

use bevy::prelude::*;
use bevy_egui::EguiContexts;

use crate::control::{ControlCommand, ControlSet};
use crate::time::Direction;

/// Speed presets on the number row.
pub const SPEED_PRESETS: [(KeyCode, f64); 4] = [
    (KeyCode::Digit1, 1.0),
    (KeyCode::Digit2, 10.0),
    (KeyCode::Digit3, 100.0),
    (KeyCode::Digit4, 1000.0),
];

pub struct InputPlugin;

impl Plugin for InputPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Update, keyboard_shortcuts.before(ControlSet));
    }
}

/// Commands for the keys pressed this frame.
pub fn shortcut_commands(keys: &ButtonInput<KeyCode>) -> Vec<ControlCommand> {
    let mut out = Vec::new();

    // Space: play/pause
    if keys.just_pressed(KeyCode::Space) {
        out.push(ControlCommand::TogglePlaying);
    }

    if keys.just_pressed(KeyCode::ArrowLeft) {
        out.push(ControlCommand::SetDirection(Direction::Reverse));
    }
    if keys.just_pressed(KeyCode::ArrowRight) {
        out.push(ControlCommand::SetDirection(Direction::Forward));
    }

    // [ and ] halve/double speed
    if keys.just_pressed(KeyCode::BracketLeft) {
        out.push(ControlCommand::ScaleSpeed(0.5));
    }
    if keys.just_pressed(KeyCode::BracketRight) {
        out.push(ControlCommand::ScaleSpeed(2.0));
    }

    for (key, speed) in SPEED_PRESETS {
        if keys.just_pressed(key) {
            out.push(ControlCommand::SetSpeed(speed));
        }
    }

    if keys.just_pressed(KeyCode::KeyP) {
        out.push(ControlCommand::TogglePopulationOverlay);
    }
    if keys.just_pressed(KeyCode::KeyC) {
        out.push(ControlCommand::RequestCoverageScore);
    }
    if keys.just_pressed(KeyCode::KeyG) {
        out.push(ControlCommand::ToggleDisplayMode);
    }

    out
}

fn keyboard_shortcuts(
    keys: Res<ButtonInput<KeyCode>>,
    mut contexts: EguiContexts,
    mut writer: MessageWriter<ControlCommand>,
) {
    // Typing into a text field must not drive the simulation
    if let Ok(ctx) = contexts.ctx_mut()
        && ctx.wants_keyboard_input()
    {
        return;
    }

    writer.write_batch(shortcut_commands(&keys));
}
