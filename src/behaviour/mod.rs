pub mod evade;
pub mod pursue;
pub mod weave;

pub use evade::{Evade, EvadeConfig};
pub use pursue::{Pursue, PursueConfig};
pub use weave::{perlin, weave_direction};

use nalgebra::Vector3;
use serde::Deserialize;
use tracing::debug;

use crate::error::{BehaviourError, Capability};
use crate::gnc::{turn_toward, Axis, PidController3D, ShipPidController};
use crate::vehicle::Vehicle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BehaviourState {
    #[default]
    NotStarted,
    Started,
    Stopped,
}

// ---------------------------------------------------------------------------
// Steering configuration shared by autonomous behaviours
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SteeringConfig {
    /// Heading error (deg) per axis that saturates the steering error.
    pub max_rotation_angles: Vector3<f64>,
    pub pid: ShipPidController,
    /// Zero the PID integrators every time the behaviour starts.
    pub reset_integral_on_start: bool,
}

impl Default for SteeringConfig {
    fn default() -> Self {
        Self {
            max_rotation_angles: Vector3::new(360.0, 360.0, 45.0),
            pid: ShipPidController::new(
                PidController3D::uniform(4.0, 0.0, 0.5),
                PidController3D::uniform(1.5, 0.0, 0.3),
            ),
            reset_integral_on_start: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Behaviour core: lifecycle plus the steering loop
// ---------------------------------------------------------------------------

/// Lifecycle and steering loop every autonomous behaviour is built on.
#[derive(Debug, Clone)]
pub struct BehaviourCore {
    state: BehaviourState,
    initialized: bool,
    pub steering: SteeringConfig,
    prev_steering_error: Option<Vector3<f64>>,
    prev_movement_error: Option<f64>,
}

impl BehaviourCore {
    pub fn new(steering: SteeringConfig) -> Self {
        Self {
            state: BehaviourState::NotStarted,
            initialized: false,
            steering,
            prev_steering_error: None,
            prev_movement_error: None,
        }
    }

    pub fn state(&self) -> BehaviourState {
        self.state
    }

    pub fn initialized(&self) -> bool {
        self.initialized
    }

    pub fn is_running(&self) -> bool {
        self.state == BehaviourState::Started
    }

    /// Check capabilities and mark the behaviour ready. Leaves every flag
    /// untouched on failure.
    pub fn initialize(&mut self, vehicle: &Vehicle, needs_weapons: bool) -> Result<(), BehaviourError> {
        require_capabilities(vehicle, needs_weapons)?;
        self.initialized = true;
        Ok(())
    }

    /// Returns whether the behaviour actually started.
    pub fn start(&mut self, name: &str) -> bool {
        if !self.initialized {
            debug!(behaviour = name, "start ignored: not initialized");
            return false;
        }
        self.state = BehaviourState::Started;
        self.prev_steering_error = None;
        self.prev_movement_error = None;
        if self.steering.reset_integral_on_start {
            self.steering.pid.reset_integrals();
        }
        debug!(behaviour = name, "behaviour started");
        true
    }

    /// Zeroes the steering and translation throttle the behaviour owns.
    ///
    /// Zeroing goes through the normal setters, so while the engines have
    /// `controls_disabled` set the last commands stay in place until the
    /// controls are re-enabled and something writes them.
    pub fn stop(&mut self, vehicle: &mut Vehicle, name: &str) {
        self.state = BehaviourState::Stopped;
        if let Some(controls) = vehicle.controls_mut() {
            controls.set_rotation_throttle_values(Vector3::zeros());
            controls.set_translation_throttle_values(Vector3::zeros());
        }
        debug!(behaviour = name, vehicle = %vehicle.name, "behaviour stopped");
    }

    /// Run the steering PID toward a world position and write the result as
    /// rotation throttle. Returns the normalized steering error.
    pub fn steer_toward(&mut self, vehicle: &mut Vehicle, target: &Vector3<f64>, dt: f64) -> Vector3<f64> {
        let error = turn_toward(vehicle.state(), target, &self.steering.max_rotation_angles);
        let rate = match self.prev_steering_error {
            Some(prev) if dt > 0.0 => (error - prev) / dt,
            _ => Vector3::zeros(),
        };
        self.prev_steering_error = Some(error);

        for axis in Axis::ALL {
            let i = axis.index();
            self.steering.pid.set_steering_error(axis, error[i], rate[i]);
        }
        let output = self.steering.pid.steering_control_values();
        if let Some(controls) = vehicle.controls_mut() {
            controls.set_rotation_throttle_values(output);
        }
        error
    }

    /// Feed the forward movement loop and return its (unclamped) output.
    pub fn movement_forward(&mut self, error: f64, dt: f64) -> f64 {
        let rate = match self.prev_movement_error {
            Some(prev) if dt > 0.0 => (error - prev) / dt,
            _ => 0.0,
        };
        self.prev_movement_error = Some(error);
        self.steering.pid.set_movement_error(Axis::Z, error, rate);
        self.steering.pid.movement_control_values().z
    }
}

/// Engines are always required; weapons supply the target selection.
pub fn require_capabilities(vehicle: &Vehicle, needs_weapons: bool) -> Result<(), BehaviourError> {
    let missing = if vehicle.engines.is_none() {
        Some(Capability::Engines)
    } else if needs_weapons && vehicle.weapons.is_none() {
        Some(Capability::Weapons)
    } else {
        None
    };
    match missing {
        Some(capability) => Err(BehaviourError::MissingCapability {
            vehicle: vehicle.name.clone(),
            capability,
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamics::{BodyProperties, SimBody, State};
    use crate::vehicle::presets;

    fn fighter() -> Vehicle {
        let mut v = presets::fighter("f", Vector3::zeros(), 0.02).unwrap();
        v.start();
        v
    }

    #[test]
    fn start_requires_initialize() {
        let mut core = BehaviourCore::new(SteeringConfig::default());
        assert!(!core.start("t"));
        assert_eq!(core.state(), BehaviourState::NotStarted);

        core.initialize(&fighter(), true).unwrap();
        assert!(core.start("t"));
        assert!(core.is_running());
    }

    #[test]
    fn missing_engines_reported_first() {
        let body = SimBody::new(State::at_rest(Vector3::zeros()), BodyProperties::default(), 0.02);
        let hulk = Vehicle::new("hulk", body);
        let mut core = BehaviourCore::new(SteeringConfig::default());
        let err = core.initialize(&hulk, true).unwrap_err();
        assert_eq!(
            err,
            BehaviourError::MissingCapability { vehicle: "hulk".into(), capability: Capability::Engines }
        );
        assert!(!core.initialized());
    }

    #[test]
    fn stop_zeroes_owned_throttle() {
        let mut v = fighter();
        let mut core = BehaviourCore::new(SteeringConfig::default());
        core.initialize(&v, false).unwrap();
        core.start("t");
        core.steer_toward(&mut v, &Vector3::new(10.0, 0.0, 10.0), 0.02);
        v.controls_mut().unwrap().set_translation_throttle_values(Vector3::new(0.0, 0.0, 1.0));
        v.controls_mut().unwrap().set_boost_throttle_values(Vector3::new(0.0, 0.0, 1.0));
        assert!(v.controls().unwrap().steering_values().norm() > 0.0);

        core.stop(&mut v, "t");
        let c = v.controls().unwrap();
        assert_eq!(core.state(), BehaviourState::Stopped);
        assert_eq!(c.steering_values(), Vector3::zeros());
        assert_eq!(c.translation_throttle_values(), Vector3::zeros());
        // Boost is not owned by behaviours
        assert_eq!(c.boost_throttle_values().z, 1.0);
    }

    #[test]
    fn stop_during_freeze_leaves_throttle() {
        let mut v = fighter();
        let mut core = BehaviourCore::new(SteeringConfig::default());
        core.initialize(&v, false).unwrap();
        core.start("t");
        core.steer_toward(&mut v, &Vector3::new(10.0, 0.0, 10.0), 0.02);
        v.controls_mut().unwrap().set_translation_throttle_values(Vector3::new(0.0, 0.0, 1.0));
        let steering = v.controls().unwrap().steering_values();

        v.controls_mut().unwrap().controls_disabled = true;
        core.stop(&mut v, "t");
        assert_eq!(core.state(), BehaviourState::Stopped);
        let c = v.controls().unwrap();
        assert_eq!(c.steering_values(), steering);
        assert_eq!(c.translation_throttle_values().z, 1.0);
    }

    #[test]
    fn steering_output_turns_toward_target() {
        let mut v = fighter();
        let mut core = BehaviourCore::new(SteeringConfig::default());
        let err = core.steer_toward(&mut v, &Vector3::new(10.0, 0.0, 10.0), 0.02);
        assert!(err.y > 0.0);
        assert!(v.controls().unwrap().steering_values().y > 0.0);
    }

    #[test]
    fn integral_reset_on_start_when_configured() {
        let v = fighter();
        let steering = SteeringConfig {
            pid: ShipPidController::new(PidController3D::uniform(1.0, 0.5, 0.0), PidController3D::default()),
            reset_integral_on_start: true,
            ..SteeringConfig::default()
        };
        let mut core = BehaviourCore::new(steering);
        core.initialize(&v, false).unwrap();
        core.steering.pid.set_steering_error(Axis::X, 1.0, 0.0);
        assert!(core.steering.pid.steering.axis(Axis::X).integral() > 0.0);
        core.start("t");
        assert_eq!(core.steering.pid.steering.axis(Axis::X).integral(), 0.0);
    }
}
