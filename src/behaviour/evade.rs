use nalgebra::{UnitQuaternion, Vector3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use tracing::debug;

use crate::error::{BehaviourError, ConfigError, ConfigResult};
use crate::pilot::{Pilot, UpdateContext};
use crate::vehicle::Vehicle;

use super::weave::weave_direction;
use super::{BehaviourCore, BehaviourState, SteeringConfig};

// ---------------------------------------------------------------------------
// Evade configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EvadeConfig {
    pub max_evade_angle_offset: f64,        // deg, about world up
    pub weave_speed: f64,
    pub weave_radius: f64,
    pub return_to_center_factor: f64,       // blend per metre from origin
    pub direction_update_interval: f64,     // s
}

impl EvadeConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        let checks = [
            ("evade.max_evade_angle_offset", self.max_evade_angle_offset),
            ("evade.weave_speed", self.weave_speed),
            ("evade.weave_radius", self.weave_radius),
            ("evade.return_to_center_factor", self.return_to_center_factor),
        ];
        for (name, value) in checks {
            if !(value >= 0.0 && value.is_finite()) {
                return Err(ConfigError::InvalidParameter {
                    name,
                    reason: format!("must be finite and non-negative, got {}", value),
                });
            }
        }
        if !(self.direction_update_interval > 0.0) {
            return Err(ConfigError::InvalidParameter {
                name: "evade.direction_update_interval",
                reason: format!("must be positive, got {}", self.direction_update_interval),
            });
        }
        Ok(())
    }
}

impl Default for EvadeConfig {
    fn default() -> Self {
        Self {
            max_evade_angle_offset: 90.0,
            weave_speed: 1.0,
            weave_radius: 5.0,
            return_to_center_factor: 0.0005,
            direction_update_interval: 2.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Evade behaviour
// ---------------------------------------------------------------------------

/// Flies away from the selected target on a randomly offset, weaving path,
/// drifting back toward the world origin the further out it gets.
pub struct Evade {
    core: BehaviourCore,
    config: EvadeConfig,
    rng: StdRng,
    evade_direction: Vector3<f64>,
    next_direction_update: f64,
}

impl Evade {
    pub fn new(config: EvadeConfig, steering: SteeringConfig, seed: u64) -> Self {
        Self {
            core: BehaviourCore::new(steering),
            config,
            rng: StdRng::seed_from_u64(seed),
            evade_direction: Vector3::z(),
            next_direction_update: 0.0,
        }
    }

    pub fn state(&self) -> BehaviourState {
        self.core.state()
    }

    /// Current world-frame travel direction before weaving.
    pub fn evade_direction(&self) -> Vector3<f64> {
        self.evade_direction
    }

    /// Re-pick the travel direction. Skipped when no target is selected.
    pub fn update_evade_direction(&mut self, vehicle: &Vehicle) {
        let Some(target) = vehicle.selected_target() else {
            return;
        };
        let pos = vehicle.state().pos;
        let Some(away) = (pos - target.position).try_normalize(1e-9) else {
            return;
        };

        let max = self.config.max_evade_angle_offset;
        let max = if max.is_finite() { max.abs() } else { 0.0 };
        let offset = self.rng.gen_range(-max..=max).to_radians();
        let rotated = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), offset) * away;

        let to_center = -pos;
        let strength = (to_center.norm() * self.config.return_to_center_factor).clamp(0.0, 1.0);
        let blended = match to_center.try_normalize(1e-9) {
            Some(center) => rotated.lerp(&center, strength),
            None => rotated,
        };
        self.evade_direction = blended.try_normalize(1e-9).unwrap_or(rotated);
        debug!(
            vehicle = %vehicle.name,
            offset_deg = offset.to_degrees(),
            center_blend = strength,
            "evade direction updated"
        );
    }
}

impl Pilot for Evade {
    fn initialize(&mut self, vehicle: &Vehicle) -> Result<(), BehaviourError> {
        self.core.initialize(vehicle, true)
    }

    fn start(&mut self, vehicle: &mut Vehicle) {
        if !self.core.start("evade") {
            return;
        }
        self.evade_direction = vehicle.state().forward();
        self.update_evade_direction(vehicle);
        self.next_direction_update = vehicle.state().time + self.config.direction_update_interval;
    }

    fn stop(&mut self, vehicle: &mut Vehicle) {
        self.core.stop(vehicle, "evade");
    }

    fn update(&mut self, vehicle: &mut Vehicle, ctx: &UpdateContext) -> bool {
        if !self.core.is_running() {
            return false;
        }

        if ctx.time >= self.next_direction_update {
            self.update_evade_direction(vehicle);
            self.next_direction_update = ctx.time + self.config.direction_update_interval;
        }

        let heading = weave_direction(
            &self.evade_direction,
            ctx.time,
            self.config.weave_speed,
            self.config.weave_radius,
        );
        let aim = vehicle.state().pos + heading;
        self.core.steer_toward(vehicle, &aim, ctx.dt);

        if let Some(controls) = vehicle.controls_mut() {
            controls.set_translation_throttle_values(Vector3::new(0.0, 0.0, 1.0));
        }
        true
    }

    fn is_running(&self) -> bool {
        self.core.is_running()
    }

    fn name(&self) -> &str {
        "evade"
    }
}
