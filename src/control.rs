//! Typed control surface.
//!
//! Every user action (dock buttons, keyboard shortcuts, tests) arrives as a
//! [`ControlCommand`] message. Each subsystem reads the commands that concern
//! the state it owns, so the clock is only touched here, the overlay only in
//! `overlay`, and so on. Feedback flows back through [`StatusLine`] and
//! [`Alert`].

use bevy::prelude::*;

use crate::time::{ClockSet, Direction, SimulationClock};

/// User-facing operations.
#[derive(Message, Debug, Clone, PartialEq)]
pub enum ControlCommand {
    SetPlaying(bool),
    TogglePlaying,
    SetDirection(Direction),
    /// Non-negative speed multiplier; negative values are rejected
    SetSpeed(f64),
    /// Multiply the current speed (keyboard halve/double)
    ScaleSpeed(f64),
    SetPopulationOverlay(bool),
    TogglePopulationOverlay,
    RequestCoverageScore,
    ToggleDisplayMode,
    DismissAlert,
}

/// Non-blocking status text shown in the dock.
#[derive(Resource, Default, Debug, Clone, PartialEq)]
pub struct StatusLine {
    pub text: Option<String>,
    pub is_error: bool,
}

impl StatusLine {
    pub fn info(&mut self, text: impl Into<String>) {
        self.text = Some(text.into());
        self.is_error = false;
    }

    pub fn error(&mut self, text: impl Into<String>) {
        self.text = Some(text.into());
        self.is_error = true;
    }

    pub fn clear(&mut self) {
        self.text = None;
        self.is_error = false;
    }
}

/// Blocking alert; the UI shows it until dismissed.
#[derive(Resource, Default, Debug, Clone, PartialEq)]
pub struct Alert {
    pub message: Option<String>,
}

impl Alert {
    pub fn raise(&mut self, message: impl Into<String>) {
        self.message = Some(message.into());
    }
}

/// System set for command handlers; runs before the clock tick so a command
/// issued this frame applies to this frame's tick.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub struct ControlSet;

/// Plugin registering the control surface.
pub struct ControlPlugin;

impl Plugin for ControlPlugin {
    fn build(&self, app: &mut App) {
        app.add_message::<ControlCommand>()
            .init_resource::<StatusLine>()
            .init_resource::<Alert>()
            .configure_sets(Update, ControlSet.before(ClockSet))
            .add_systems(
                Update,
                (apply_clock_commands, dismiss_alert).in_set(ControlSet),
            );
    }
}

/// Apply play/pause, direction and speed commands to the clock.
fn apply_clock_commands(
    mut commands: MessageReader<ControlCommand>,
    mut clock: ResMut<SimulationClock>,
    mut status: ResMut<StatusLine>,
) {
    for command in commands.read() {
        match *command {
            ControlCommand::SetPlaying(playing) => set_playing(&mut clock, &mut status, playing),
            ControlCommand::TogglePlaying => {
                let playing = !clock.is_playing();
                set_playing(&mut clock, &mut status, playing);
            }
            ControlCommand::SetDirection(direction) => {
                clock.set_direction(direction);
                info!("Direction: {}", direction.label());
            }
            ControlCommand::SetSpeed(speed) => set_speed(&mut clock, &mut status, speed),
            ControlCommand::ScaleSpeed(factor) => {
                let speed = clock.speed() * factor;
                set_speed(&mut clock, &mut status, speed);
            }
            _ => {}
        }
    }
}

fn set_playing(clock: &mut SimulationClock, status: &mut StatusLine, playing: bool) {
    clock.set_playing(playing);
    // Resuming is how the user acknowledges a fetch failure
    if playing && status.is_error {
        status.clear();
    }
    info!("Simulation {}", if playing { "running" } else { "paused" });
}

fn set_speed(clock: &mut SimulationClock, status: &mut StatusLine, speed: f64) {
    match clock.set_speed(speed) {
        Ok(()) => info!("Time scale: {}x", clock.speed()),
        Err(err) => {
            warn!("Rejected speed change: {err}");
            status.error(err.to_string());
        }
    }
}

fn dismiss_alert(mut commands: MessageReader<ControlCommand>, mut alert: ResMut<Alert>) {
    if commands
        .read()
        .any(|c| matches!(c, ControlCommand::DismissAlert))
    {
        alert.message = None;
    }
}
