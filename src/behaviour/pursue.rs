use nalgebra::Vector3;
use serde::Deserialize;

use crate::error::{BehaviourError, ConfigError, ConfigResult};
use crate::pilot::{Pilot, UpdateContext};
use crate::vehicle::Vehicle;

use super::{BehaviourCore, BehaviourState, SteeringConfig};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PursueConfig {
    pub standoff_distance: f64,     // m
}

impl PursueConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        if !(self.standoff_distance > 0.0 && self.standoff_distance.is_finite()) {
            return Err(ConfigError::InvalidParameter {
                name: "pursue.standoff_distance",
                reason: format!("must be finite and positive, got {}", self.standoff_distance),
            });
        }
        Ok(())
    }
}

impl Default for PursueConfig {
    fn default() -> Self {
        Self { standoff_distance: 30.0 }
    }
}

// ---------------------------------------------------------------------------
// Pursue behaviour
// ---------------------------------------------------------------------------

/// Turns onto the selected target and closes to a standoff distance.
///
/// Forward throttle comes from the movement loop on the normalized range
/// error, scaled by how well the nose is lined up (no thrust while the
/// target is abeam or behind).
pub struct Pursue {
    core: BehaviourCore,
    config: PursueConfig,
}

impl Pursue {
    pub fn new(config: PursueConfig, steering: SteeringConfig) -> Self {
        Self { core: BehaviourCore::new(steering), config }
    }

    pub fn state(&self) -> BehaviourState {
        self.core.state()
    }
}

impl Pilot for Pursue {
    fn initialize(&mut self, vehicle: &Vehicle) -> Result<(), BehaviourError> {
        self.core.initialize(vehicle, true)
    }

    fn start(&mut self, _vehicle: &mut Vehicle) {
        self.core.start("pursue");
    }

    fn stop(&mut self, vehicle: &mut Vehicle) {
        self.core.stop(vehicle, "pursue");
    }

    fn update(&mut self, vehicle: &mut Vehicle, ctx: &UpdateContext) -> bool {
        if !self.core.is_running() {
            return false;
        }

        let Some(target) = vehicle.selected_target() else {
            // Hold heading, cut forward thrust
            if let Some(controls) = vehicle.controls_mut() {
                controls.set_rotation_throttle_values(Vector3::zeros());
                controls.set_translation_throttle_values(Vector3::zeros());
            }
            return true;
        };

        self.core.steer_toward(vehicle, &target.position, ctx.dt);

        let to_target = target.position - vehicle.state().pos;
        let distance = to_target.norm();
        let standoff = self.config.standoff_distance;
        let range_error = ((distance - standoff) / standoff).clamp(-1.0, 1.0);
        let alignment = to_target
            .try_normalize(1e-9)
            .map_or(0.0, |dir| vehicle.state().forward().dot(&dir).max(0.0));

        let forward = self.core.movement_forward(range_error, ctx.dt) * alignment;
        if let Some(controls) = vehicle.controls_mut() {
            controls.set_translation_throttle_values(Vector3::new(0.0, 0.0, forward));
        }
        true
    }

    fn is_running(&self) -> bool {
        self.core.is_running()
    }

    fn name(&self) -> &str {
        "pursue"
    }
}
