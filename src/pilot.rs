use serde::Deserialize;

use crate::error::BehaviourError;
use crate::vehicle::Vehicle;

/// Coarse game phase. Input scripts may restrict themselves to some phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameState {
    #[default]
    Gameplay,
    Paused,
    Menu,
    Cutscene,
}

/// Everything a pilot learns about the world besides its own vehicle.
#[derive(Debug, Clone, Copy)]
pub struct UpdateContext {
    pub time: f64,
    pub dt: f64,
    pub game_state: GameState,
}

impl UpdateContext {
    pub fn new(time: f64, dt: f64) -> Self {
        Self { time, dt, game_state: GameState::Gameplay }
    }
}

/// Anything that writes throttle commands into a vehicle's engines once per
/// fixed step: AI behaviours and player input scripts alike.
///
/// Pilots never hold on to the vehicle; it is lent to every call.
pub trait Pilot {
    /// Check the vehicle has what this pilot needs. On failure nothing is
    /// mutated and the pilot must not be started.
    fn initialize(&mut self, vehicle: &Vehicle) -> Result<(), BehaviourError>;

    /// Begin driving the vehicle. A no-op unless initialized.
    fn start(&mut self, vehicle: &mut Vehicle);

    /// Stop driving the vehicle and zero the throttle this pilot owns.
    fn stop(&mut self, vehicle: &mut Vehicle);

    /// Write this step's commands. Returns false when the pilot is not running.
    fn update(&mut self, vehicle: &mut Vehicle, ctx: &UpdateContext) -> bool;

    fn is_running(&self) -> bool;

    /// Human-readable name for logging/display.
    fn name(&self) -> &str {
        "unnamed"
    }
}
