//! Simulation clock for the ground-track viewer.
//!
//! Holds the signed simulated elapsed time and advances it once per frame
//! from the real wall-clock delta, scaled by speed and direction.

use std::time::Duration;

use bevy::prelude::*;
use clap::ValueEnum;

use crate::config::ViewerConfig;

/// Direction of simulated time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum Direction {
    #[default]
    Forward,
    Reverse,
}

impl Direction {
    /// +1 forward, -1 reverse.
    pub fn sign(self) -> f64 {
        match self {
            Direction::Forward => 1.0,
            Direction::Reverse => -1.0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Direction::Forward => "forward",
            Direction::Reverse => "reverse",
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ClockError {
    #[error("speed multiplier {0} is negative; use the direction to run backwards")]
    NegativeSpeed(f64),

    #[error("speed multiplier {0} is not a finite number")]
    NonFiniteSpeed(f64),
}

/// Simulated time resource.
///
/// `elapsed_seconds` only changes inside [`SimulationClock::tick`], and only
/// while playing. Setters take effect at the next tick.
#[derive(Resource, Clone, Debug)]
pub struct SimulationClock {
    elapsed_seconds: f64,
    playing: bool,
    direction: Direction,
    speed: f64,
    /// Wall time of the previous tick; not simulated state
    last_tick_wall: Option<Duration>,
}

impl Default for SimulationClock {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl SimulationClock {
    /// Playing forward at 1x from `elapsed_seconds`.
    pub fn new(elapsed_seconds: f64) -> Self {
        Self {
            elapsed_seconds,
            playing: true,
            direction: Direction::Forward,
            speed: 1.0,
            last_tick_wall: None,
        }
    }

    /// Clock configured from the viewer's start settings.
    ///
    /// An invalid start speed falls back to 1x.
    pub fn from_config(config: &ViewerConfig) -> Self {
        let mut clock = Self::new(config.start_elapsed_seconds);
        clock.direction = config.start_direction;
        clock.playing = !config.start_paused;
        if let Err(err) = clock.set_speed(config.start_speed) {
            warn!("Ignoring start speed: {err}");
        }
        clock
    }

    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed_seconds
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Advance by the wall time since the previous tick.
    ///
    /// Returns the wall delta in seconds. The first tick only records the wall
    /// time and returns zero. A wall clock that moves backwards yields zero.
    pub fn tick(&mut self, wall_now: Duration) -> f64 {
        let wall_delta = match self.last_tick_wall {
            Some(previous) => wall_now.saturating_sub(previous).as_secs_f64(),
            None => 0.0,
        };
        self.last_tick_wall = Some(wall_now);

        if self.playing {
            self.elapsed_seconds += wall_delta * self.speed * self.direction.sign();
        }

        wall_delta
    }

    pub fn set_direction(&mut self, direction: Direction) {
        self.direction = direction;
    }

    /// Set the speed multiplier. Zero freezes time while nominally playing.
    pub fn set_speed(&mut self, speed: f64) -> Result<(), ClockError> {
        if !speed.is_finite() {
            return Err(ClockError::NonFiniteSpeed(speed));
        }
        if speed < 0.0 {
            return Err(ClockError::NegativeSpeed(speed));
        }
        self.speed = speed;
        Ok(())
    }

    pub fn set_playing(&mut self, playing: bool) {
        self.playing = playing;
    }
}

/// Plugin providing the per-frame clock tick.
pub struct TimePlugin;

impl Plugin for TimePlugin {
    fn build(&self, app: &mut App) {
        let clock = app
            .world()
            .get_resource::<ViewerConfig>()
            .map(SimulationClock::from_config)
            .unwrap_or_default();

        app.insert_resource(clock)
            .add_systems(Update, advance_clock.in_set(ClockSet));
    }
}

/// System set containing the clock tick. Everything that reads the new
/// elapsed time for this frame runs after it.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClockSet;

/// Tick the simulation clock once per frame from real time.
fn advance_clock(mut clock: ResMut<SimulationClock>, time: Res<Time<Real>>) {
    clock.tick(time.elapsed());
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn secs(s: f64) -> Duration {
        Duration::from_secs_f64(s)
    }

    #[test]
    fn test_first_tick_records_wall_time_only() {
        let mut clock = SimulationClock::new(0.0);
        assert_eq!(clock.tick(secs(42.0)), 0.0);
        assert_eq!(clock.elapsed_seconds(), 0.0);
    }

    #[test]
    fn test_speed_100_one_second() {
        let mut clock = SimulationClock::new(0.0);
        clock.set_speed(100.0).unwrap();
        clock.tick(secs(0.0));
        let delta = clock.tick(secs(1.0));
        assert_relative_eq!(delta, 1.0);
        assert_relative_eq!(clock.elapsed_seconds(), 100.0);
    }

    #[test]
    fn test_reverse_decreases() {
        let mut clock = SimulationClock::new(500.0);
        clock.set_direction(Direction::Reverse);
        clock.set_speed(10.0).unwrap();
        clock.tick(secs(0.0));
        clock.tick(secs(2.0));
        assert_relative_eq!(clock.elapsed_seconds(), 480.0);
    }

    #[test]
    fn test_reverse_crosses_epoch() {
        let mut clock = SimulationClock::new(5.0);
        clock.set_direction(Direction::Reverse);
        clock.tick(secs(0.0));
        clock.tick(secs(10.0));
        assert_relative_eq!(clock.elapsed_seconds(), -5.0);
    }

    #[test]
    fn test_paused_does_not_advance() {
        let mut clock = SimulationClock::new(10.0);
        clock.set_playing(false);
        clock.tick(secs(0.0));
        let delta = clock.tick(secs(1000.0));
        assert_relative_eq!(delta, 1000.0);
        assert_eq!(clock.elapsed_seconds(), 10.0);
    }

    #[test]
    fn test_zero_speed_freezes_while_playing() {
        let mut clock = SimulationClock::new(10.0);
        clock.set_speed(0.0).unwrap();
        clock.tick(secs(0.0));
        clock.tick(secs(5.0));
        assert!(clock.is_playing());
        assert_eq!(clock.elapsed_seconds(), 10.0);
    }

    #[test]
    fn test_negative_speed_rejected() {
        let mut clock = SimulationClock::new(0.0);
        assert_eq!(clock.set_speed(-2.0), Err(ClockError::NegativeSpeed(-2.0)));
        assert_eq!(clock.speed(), 1.0);
    }

    #[test]
    fn test_non_finite_speed_rejected() {
        let mut clock = SimulationClock::new(0.0);
        assert!(matches!(
            clock.set_speed(f64::NAN),
            Err(ClockError::NonFiniteSpeed(_))
        ));
        assert!(clock.set_speed(f64::INFINITY).is_err());
        assert_eq!(clock.speed(), 1.0);
    }

    #[test]
    fn test_setters_are_not_retroactive() {
        let mut clock = SimulationClock::new(0.0);
        clock.tick(secs(0.0));
        clock.tick(secs(1.0));
        assert_relative_eq!(clock.elapsed_seconds(), 1.0);

        clock.set_speed(50.0).unwrap();
        clock.set_direction(Direction::Reverse);
        // Nothing changes until the next tick
        assert_relative_eq!(clock.elapsed_seconds(), 1.0);

        clock.tick(secs(2.0));
        assert_relative_eq!(clock.elapsed_seconds(), -49.0);
    }

    #[test]
    fn test_wall_clock_going_backwards_yields_zero() {
        let mut clock = SimulationClock::new(0.0);
        clock.tick(secs(5.0));
        assert_eq!(clock.tick(secs(4.0)), 0.0);
        assert_eq!(clock.elapsed_seconds(), 0.0);
    }

    #[test]
    fn test_from_config() {
        let config = ViewerConfig {
            start_elapsed_seconds: 7200.0,
            start_speed: 60.0,
            start_direction: Direction::Reverse,
            start_paused: true,
            ..Default::default()
        };
        let clock = SimulationClock::from_config(&config);
        assert_eq!(clock.elapsed_seconds(), 7200.0);
        assert_eq!(clock.speed(), 60.0);
        assert_eq!(clock.direction(), Direction::Reverse);
        assert!(!clock.is_playing());
    }

    #[test]
    fn test_from_config_invalid_speed_falls_back() {
        let config = ViewerConfig {
            start_speed: -5.0,
            ..Default::default()
        };
        assert_eq!(SimulationClock::from_config(&config).speed(), 1.0);
    }

    mod monotonicity {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_monotonic_within_direction(
                speed in 0.001f64..1000.0,
                deltas in proptest::collection::vec(0.001f64..1.0, 1..50),
                reverse in any::<bool>(),
            ) {
                let mut clock = SimulationClock::new(0.0);
                clock.set_speed(speed).unwrap();
                if reverse {
                    clock.set_direction(Direction::Reverse);
                }

                let mut wall = 0.0;
                clock.tick(secs(wall));
                let mut previous = clock.elapsed_seconds();
                for d in deltas {
                    wall += d;
                    clock.tick(secs(wall));
                    let now = clock.elapsed_seconds();
                    if reverse {
                        prop_assert!(now < previous);
                    } else {
                        prop_assert!(now > previous);
                    }
                    previous = now;
                }
            }
        }
    }
}
