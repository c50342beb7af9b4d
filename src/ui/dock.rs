//! Dock (bottom bar) with every primary control.
//!
//! - Play/Pause toggle and direction
//! - Speed multiplier and presets
//! - Day/Hour and UTC labels
//! - Population overlay, coverage score and display mode
//! - Status text
//!
//! Nothing here mutates simulation state directly; every action is a
//! [`ControlCommand`].

use bevy::prelude::*;
use bevy_egui::{EguiContexts, egui};

use super::icons;
use crate::config::DisplayMode;
use crate::control::{ControlCommand, StatusLine};
use crate::coverage::CoverageScore;
use crate::input::SPEED_PRESETS;
use crate::overlay::PopulationOverlay;
use crate::sync::{GroundTrack, SyncLoop};
use crate::time::{Direction, SimulationClock};

/// Colors for the dock UI.
pub(super) mod colors {
    use bevy_egui::egui::Color32;

    pub const DOCK_BG: Color32 = Color32::from_rgba_premultiplied(26, 26, 36, 240);
    pub const ACTIVE: Color32 = Color32::from_rgb(85, 221, 136);
    pub const INACTIVE: Color32 = Color32::from_rgb(120, 120, 130);
    pub const PLAY_ICON: Color32 = Color32::from_rgb(85, 221, 136);
    pub const PAUSE_ICON: Color32 = Color32::from_rgb(221, 170, 85);
    pub const ERROR: Color32 = Color32::from_rgb(235, 100, 90);
    pub const TEXT: Color32 = Color32::from_rgb(220, 220, 230);
}

/// Resource for help tooltip visibility.
#[derive(Resource, Default)]
pub struct HelpTooltipState {
    pub visible: bool,
}

/// Index of the preset matching `speed`, if any.
pub fn preset_index(speed: f64) -> Option<usize> {
    SPEED_PRESETS
        .iter()
        .position(|(_, preset)| (speed - preset).abs() < 1e-9)
}

/// Label for the speed multiplier ("10x", "0.5x").
pub fn speed_label(speed: f64) -> String {
    if speed.fract() == 0.0 {
        format!("{}x", speed as i64)
    } else {
        format!("{speed}x")
    }
}

/// Read-only state the dock renders.
pub struct DockView<'a> {
    pub clock: &'a SimulationClock,
    pub track: &'a GroundTrack,
    pub overlay: &'a PopulationOverlay,
    pub coverage: &'a CoverageScore,
    pub mode: DisplayMode,
    pub status: &'a StatusLine,
}

/// System that renders the dock at the bottom.
pub fn dock_system(
    mut contexts: EguiContexts,
    clock: Res<SimulationClock>,
    track: Res<GroundTrack>,
    overlay: Res<PopulationOverlay>,
    coverage: Res<CoverageScore>,
    sync: Res<SyncLoop>,
    status: Res<StatusLine>,
    mut help_state: ResMut<HelpTooltipState>,
    mut writer: MessageWriter<ControlCommand>,
) {
    let Ok(ctx) = contexts.ctx_mut() else {
        return;
    };

    let view = DockView {
        clock: &clock,
        track: &track,
        overlay: &overlay,
        coverage: &coverage,
        mode: sync.display_mode,
        status: &status,
    };
    let mut out = Vec::new();

    egui::TopBottomPanel::bottom("dock")
        .exact_height(56.0)
        .frame(
            egui::Frame::new()
                .fill(colors::DOCK_BG)
                .inner_margin(egui::Margin::symmetric(20, 10)),
        )
        .show(ctx, |ui| {
            ui.horizontal_centered(|ui| {
                ui.spacing_mut().item_spacing.x = 14.0;

                render_play_pause(ui, &view, &mut out);
                render_direction(ui, &view, &mut out);
                ui.separator();
                render_speed(ui, &view, &mut out);
                ui.separator();
                render_time_labels(ui, &view);
                ui.separator();
                render_feature_buttons(ui, &view, &mut out);

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.spacing_mut().item_spacing.x = 10.0;
                    render_help_button(ui, &mut help_state);
                    render_status(ui, view.status);
                });
            });
        });

    if help_state.visible {
        render_help_overlay(ctx);
    }

    writer.write_batch(out);
}

fn render_play_pause(ui: &mut egui::Ui, view: &DockView, out: &mut Vec<ControlCommand>) {
    let (icon, color, tooltip) = if view.clock.is_playing() {
        (icons::PAUSE, colors::PAUSE_ICON, "Pause (Space)")
    } else {
        (icons::PLAY, colors::PLAY_ICON, "Play (Space)")
    };

    let button = egui::Button::new(egui::RichText::new(icon).size(22.0).color(color))
        .min_size(egui::vec2(40.0, 36.0));

    if ui.add(button).on_hover_text(tooltip).clicked() {
        out.push(ControlCommand::TogglePlaying);
    }
}

fn render_direction(ui: &mut egui::Ui, view: &DockView, out: &mut Vec<ControlCommand>) {
    let current = view.clock.direction();
    for (direction, icon, tooltip) in [
        (Direction::Reverse, icons::REWIND, "Run backward (Left)"),
        (Direction::Forward, icons::FORWARD, "Run forward (Right)"),
    ] {
        let active = current == direction;
        let color = if active { colors::ACTIVE } else { colors::INACTIVE };
        let button = egui::Button::new(egui::RichText::new(icon).size(18.0).color(color))
            .frame(active)
            .min_size(egui::vec2(32.0, 30.0));
        if ui.add(button).on_hover_text(tooltip).clicked() && !active {
            out.push(ControlCommand::SetDirection(direction));
        }
    }
}

fn render_speed(ui: &mut egui::Ui, view: &DockView, out: &mut Vec<ControlCommand>) {
    let current = preset_index(view.clock.speed());

    ui.horizontal(|ui| {
        ui.spacing_mut().item_spacing.x = 4.0;
        for (i, (_, speed)) in SPEED_PRESETS.iter().enumerate() {
            let active = current == Some(i);
            let color = if active { colors::ACTIVE } else { colors::INACTIVE };
            let mut text = egui::RichText::new(speed_label(*speed)).size(14.0).color(color);
            if active {
                text = text.strong();
            }
            let tooltip = format!("{} speed (press {})", speed_label(*speed), i + 1);
            if ui
                .add(egui::Button::new(text).frame(active).min_size(egui::vec2(40.0, 28.0)))
                .on_hover_text(tooltip)
                .clicked()
            {
                out.push(ControlCommand::SetSpeed(*speed));
            }
        }

        // Free-form multiplier; the drag value cannot go negative
        let mut speed = view.clock.speed();
        let response = ui
            .add(
                egui::DragValue::new(&mut speed)
                    .range(0.0..=1.0e6)
                    .speed(1.0)
                    .suffix("x"),
            )
            .on_hover_text("Speed multiplier ([ / ] halve/double)");
        if response.changed() {
            out.push(ControlCommand::SetSpeed(speed));
        }
    });
}

fn render_time_labels(ui: &mut egui::Ui, view: &DockView) {
    let labels = &view.track.labels;
    let day_hour = if labels.day.is_empty() {
        "Day -- / Hour --:--:--".to_string()
    } else {
        labels.day_hour()
    };

    ui.vertical(|ui| {
        ui.label(
            egui::RichText::new(format!("{} {}", icons::CLOCK, day_hour))
                .monospace()
                .size(13.0)
                .color(colors::TEXT),
        );
        if !labels.utc.is_empty() {
            ui.label(
                egui::RichText::new(&labels.utc)
                    .monospace()
                    .size(11.0)
                    .color(colors::INACTIVE),
            );
        }
    });
}

fn render_feature_buttons(ui: &mut egui::Ui, view: &DockView, out: &mut Vec<ControlCommand>) {
    // Population overlay
    let loading = view.overlay.is_fetching();
    let active = view.overlay.is_active();
    let color = if active { colors::ACTIVE } else { colors::TEXT };
    let icon = if loading { icons::SPINNER } else { icons::POPULATION };
    let tooltip = if loading {
        "Loading population density…"
    } else if active {
        "Hide population density (P)"
    } else {
        "Show population density (P)"
    };
    let button = egui::Button::new(egui::RichText::new(icon).size(18.0).color(color))
        .frame(active)
        .min_size(egui::vec2(32.0, 30.0));
    if ui.add(button).on_hover_text(tooltip).clicked() {
        out.push(ControlCommand::TogglePopulationOverlay);
    }

    // Coverage score
    let running = view.coverage.is_running();
    let icon = if running { icons::SPINNER } else { icons::COVERAGE };
    let button = egui::Button::new(egui::RichText::new(icon).size(18.0).color(colors::TEXT))
        .min_size(egui::vec2(32.0, 30.0));
    if ui
        .add_enabled(!running, button)
        .on_hover_text("Compute coverage score (C)")
        .clicked()
    {
        out.push(ControlCommand::RequestCoverageScore);
    }

    // Display mode
    let (icon, tooltip) = match view.mode {
        DisplayMode::GroundTrack => (icons::TRACK, "Ground track mode; switch to spotbeam only (G)"),
        DisplayMode::SpotbeamOnly => (icons::SPOTBEAM, "Spotbeam only; switch to ground track (G)"),
    };
    let button = egui::Button::new(egui::RichText::new(icon).size(18.0).color(colors::TEXT))
        .min_size(egui::vec2(32.0, 30.0));
    if ui.add(button).on_hover_text(tooltip).clicked() {
        out.push(ControlCommand::ToggleDisplayMode);
    }
}

fn render_status(ui: &mut egui::Ui, status: &StatusLine) {
    let Some(text) = &status.text else {
        return;
    };
    let (icon, color) = if status.is_error {
        (icons::WARNING, colors::ERROR)
    } else {
        (icons::INFO, colors::TEXT)
    };
    ui.label(
        egui::RichText::new(format!("{icon} {text}"))
            .size(13.0)
            .color(color),
    );
}

fn render_help_button(ui: &mut egui::Ui, help_state: &mut HelpTooltipState) {
    let button = egui::Button::new(egui::RichText::new(icons::HELP).size(18.0))
        .min_size(egui::vec2(32.0, 32.0));

    let response = ui.add(button);

    if response.hovered() || help_state.visible {
        help_state.visible = response.hovered();
    }

    if response.clicked() {
        help_state.visible = !help_state.visible;
    }
}

/// Keyboard shortcuts listed in the help overlay.
pub const SHORTCUTS: [(&str, &str); 9] = [
    ("Space", "Play/Pause"),
    ("Left/Right", "Run backward/forward"),
    ("[ / ]", "Halve/double speed"),
    ("1-4", "Set speed (1x/10x/100x/1000x)"),
    ("P", "Population density overlay"),
    ("C", "Coverage score"),
    ("G", "Ground track / spotbeam only"),
    ("Right drag", "Orbit camera"),
    ("Scroll", "Zoom"),
];

fn render_help_overlay(ctx: &egui::Context) {
    egui::Window::new("Keyboard Shortcuts")
        .collapsible(false)
        .resizable(false)
        .anchor(egui::Align2::RIGHT_BOTTOM, egui::vec2(-70.0, -70.0))
        .frame(
            egui::Frame::new()
                .fill(colors::DOCK_BG)
                .inner_margin(16)
                .stroke(egui::Stroke::new(1.0, egui::Color32::from_rgb(60, 60, 80))),
        )
        .show(ctx, |ui| {
            egui::Grid::new("shortcuts_grid")
                .num_columns(2)
                .spacing([20.0, 6.0])
                .show(ui, |ui| {
                    for (key, action) in SHORTCUTS {
                        ui.label(egui::RichText::new(key).strong().monospace().size(14.0));
                        ui.label(egui::RichText::new(action).size(14.0));
                        ui.end_row();
                    }
                });
        });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preset_index() {
        assert_eq!(preset_index(1.0), Some(0));
        assert_eq!(preset_index(1000.0), Some(3));
        assert_eq!(preset_index(2.0), None);
    }

    #[test]
    fn test_speed_label() {
        assert_eq!(speed_label(10.0), "10x");
        assert_eq!(speed_label(0.5), "0.5x");
        assert_eq!(speed_label(0.0), "0x");
    }
}
