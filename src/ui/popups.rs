//! Population tooltip and blocking alert.

use bevy::prelude::*;
use bevy_egui::{EguiContexts, egui};

use super::dock::colors;
use super::icons;
use crate::control::{Alert, ControlCommand};
use crate::picker::{PointerOverUi, PopulationTooltip};

/// Offset of the tooltip from the cursor, in points.
const TOOLTIP_OFFSET: egui::Vec2 = egui::vec2(14.0, 14.0);

pub fn tooltip_system(mut contexts: EguiContexts, tooltip: Res<PopulationTooltip>) {
    let Some(text) = tooltip.text() else {
        return;
    };
    let Ok(ctx) = contexts.ctx_mut() else {
        return;
    };

    let anchor = egui::pos2(tooltip.screen.x, tooltip.screen.y) + TOOLTIP_OFFSET;
    egui::Area::new(egui::Id::new("population_tooltip"))
        .fixed_pos(anchor)
        .interactable(false)
        .order(egui::Order::Tooltip)
        .show(ctx, |ui| {
            egui::Frame::popup(ui.style()).show(ui, |ui| {
                ui.label(
                    egui::RichText::new(format!("{} {}", icons::GLOBE, text))
                        .size(13.0)
                        .color(colors::TEXT),
                );
            });
        });
}

pub fn alert_system(
    mut contexts: EguiContexts,
    alert: Res<Alert>,
    mut writer: MessageWriter<ControlCommand>,
) {
    let Some(message) = &alert.message else {
        return;
    };
    let Ok(ctx) = contexts.ctx_mut() else {
        return;
    };

    egui::Window::new(format!("{} Error", icons::WARNING))
        .collapsible(false)
        .resizable(false)
        .anchor(egui::Align2::CENTER_CENTER, egui::Vec2::ZERO)
        .show(ctx, |ui| {
            ui.set_max_width(360.0);
            ui.label(egui::RichText::new(message).size(14.0).color(colors::ERROR));
            ui.add_space(8.0);
            if ui.button(format!("{} OK", icons::CLOSE)).clicked() {
                writer.write(ControlCommand::DismissAlert);
            }
        });
}

/// Record whether egui owns the pointer so globe picking and zoom stand down.
pub fn track_pointer_over_ui(mut contexts: EguiContexts, mut over_ui: ResMut<PointerOverUi>) {
    let over = contexts
        .ctx_mut()
        .map(|ctx| ctx.is_pointer_over_area() || ctx.wants_pointer_input())
        .unwrap_or(false);
    over_ui.set_if_neq(PointerOverUi(over));
}
