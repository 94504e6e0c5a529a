use nalgebra::Vector3;
use tracing::debug;

use crate::dynamics::RigidBody;
use crate::error::{AxisLabel, ConfigError, ConfigResult};

use super::engines3d::ForceBudget;
use super::power::PowerSource;

// ---------------------------------------------------------------------------
// Throttle state
// ---------------------------------------------------------------------------

/// Commanded fraction of available force per axis.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ThrottleState {
    pub steering: Vector3<f64>,         // [-1, 1] per axis
    pub translation: Vector3<f64>,      // [min_i, max_i] per axis
    pub boost: Vector3<f64>,            // [-1, 1] per axis
}

// ---------------------------------------------------------------------------
// Engines: the throttle interface shared by player input and AI
// ---------------------------------------------------------------------------

/// Activation, throttle and throttle limits for one vehicle.
///
/// Throttle setters record values even while the engines are deactivated;
/// they are simply not turned into forces until reactivation. While
/// `controls_disabled` is set every setter is a silent no-op, which is the
/// intended way to freeze a vehicle's controls. `clear_all_inputs` ignores
/// that gate.
#[derive(Debug, Clone)]
pub struct Engines {
    activated: bool,
    pub activate_at_start: bool,
    throttle: ThrottleState,
    min_translation: Vector3<f64>,
    max_translation: Vector3<f64>,
    pub controls_disabled: bool,
}

impl Engines {
    pub fn new() -> Self {
        Self {
            activated: false,
            activate_at_start: true,
            throttle: ThrottleState::default(),
            // Limited reverse on the forward axis
            min_translation: Vector3::new(-1.0, -1.0, -0.1),
            max_translation: Vector3::new(1.0, 1.0, 1.0),
            controls_disabled: false,
        }
    }

    pub fn with_limits(min: Vector3<f64>, max: Vector3<f64>) -> ConfigResult<Self> {
        let mut engines = Self::new();
        engines.set_translation_throttle_limits(min, max)?;
        Ok(engines)
    }

    /// Called once when the vehicle enters the simulation.
    pub fn start(&mut self) {
        if self.activate_at_start {
            self.set_engine_activation(true);
        }
    }

    pub fn activated(&self) -> bool {
        self.activated
    }

    /// Deactivating zeroes steering and translation; boost is left as is.
    pub fn set_engine_activation(&mut self, activated: bool) {
        self.activated = activated;
        if !activated {
            self.throttle.steering = Vector3::zeros();
            self.throttle.translation = Vector3::zeros();
        }
        debug!(activated, "engine activation changed");
    }

    pub fn set_translation_throttle_limits(&mut self, min: Vector3<f64>, max: Vector3<f64>) -> ConfigResult<()> {
        for (i, axis) in AxisLabel::ALL.into_iter().enumerate() {
            if !min[i].is_finite() || !max[i].is_finite() || min[i] > max[i] {
                return Err(ConfigError::ThrottleLimits { axis, min: min[i], max: max[i] });
            }
        }
        self.min_translation = min;
        self.max_translation = max;
        Ok(())
    }

    pub fn min_translation_throttle_values(&self) -> Vector3<f64> {
        self.min_translation
    }

    pub fn max_translation_throttle_values(&self) -> Vector3<f64> {
        self.max_translation
    }

    pub fn throttle(&self) -> &ThrottleState {
        &self.throttle
    }

    pub fn steering_values(&self) -> Vector3<f64> {
        self.throttle.steering
    }

    pub fn translation_throttle_values(&self) -> Vector3<f64> {
        self.throttle.translation
    }

    pub fn boost_throttle_values(&self) -> Vector3<f64> {
        self.throttle.boost
    }

    pub fn set_translation_throttle_values(&mut self, values: Vector3<f64>) {
        if self.controls_disabled {
            return;
        }
        self.throttle.translation = self.clamp_translation(values);
    }

    pub fn increment_translation_throttle_values(&mut self, delta: Vector3<f64>) {
        if self.controls_disabled {
            return;
        }
        self.throttle.translation = self.clamp_translation(self.throttle.translation + delta);
    }

    pub fn set_rotation_throttle_values(&mut self, values: Vector3<f64>) {
        if self.controls_disabled {
            return;
        }
        self.throttle.steering = clamp_unit(values);
    }

    pub fn increment_rotation_throttle_values(&mut self, delta: Vector3<f64>) {
        if self.controls_disabled {
            return;
        }
        self.throttle.steering = clamp_unit(self.throttle.steering + delta);
    }

    /// Always symmetric [-1, 1]; translation limits do not apply to boost.
    pub fn set_boost_throttle_values(&mut self, values: Vector3<f64>) {
        if self.controls_disabled {
            return;
        }
        self.throttle.boost = clamp_unit(values);
    }

    pub fn clear_all_inputs(&mut self) {
        self.throttle = ThrottleState::default();
    }

    /// Clamp a translation throttle vector to the configured per-axis limits.
    pub fn clamp_translation(&self, values: Vector3<f64>) -> Vector3<f64> {
        Vector3::new(
            clamp_axis(values.x, self.min_translation.x, self.max_translation.x),
            clamp_axis(values.y, self.min_translation.y, self.max_translation.y),
            clamp_axis(values.z, self.min_translation.z, self.max_translation.z),
        )
    }
}

impl Default for Engines {
    fn default() -> Self {
        Self::new()
    }
}

fn clamp_unit(v: Vector3<f64>) -> Vector3<f64> {
    v.map(|x| clamp_axis(x, -1.0, 1.0))
}

/// NaN input is treated as zero throttle.
fn clamp_axis(x: f64, min: f64, max: f64) -> f64 {
    if x.is_nan() {
        return 0.0_f64.clamp(min, max);
    }
    x.clamp(min, max)
}

// ---------------------------------------------------------------------------
// Propulsion: the force-model interface a vehicle drives
// ---------------------------------------------------------------------------

/// Implement this to plug a force model into a vehicle.
///
/// The default methods describe a throttle-only model: it accepts commands
/// but produces no force, and reports zero speed envelopes.
pub trait Propulsion {
    fn controls(&self) -> &Engines;

    fn controls_mut(&mut self) -> &mut Engines;

    /// Called once when the vehicle enters the simulation.
    fn start(&mut self) {
        self.controls_mut().start();
    }

    /// Refresh available forces before force application.
    fn update_available_forces(&mut self, _power: Option<&dyn PowerSource>) {}

    /// Turn the current throttle into force and torque on the body.
    fn fixed_step(&mut self, _body: &mut dyn RigidBody) {}

    /// Maximum speed per axis from default forces, for loadout data.
    fn default_max_speed_by_axis(&self, _with_boost: bool, _body: &dyn RigidBody) -> ConfigResult<Vector3<f64>> {
        Ok(Vector3::zeros())
    }

    /// Maximum speed per axis from current forces, for normalizing speed
    /// indicators.
    fn current_max_speed_by_axis(&self, _with_boost: bool, _body: &dyn RigidBody) -> ConfigResult<Vector3<f64>> {
        Ok(Vector3::zeros())
    }

    fn force_budget(&self) -> Option<&ForceBudget> {
        None
    }

    /// Body-relative force applied on the last fixed step.
    fn last_applied_force(&self) -> Vector3<f64> {
        Vector3::zeros()
    }

    fn name(&self) -> &str {
        "Engines"
    }
}

impl Propulsion for Engines {
    fn controls(&self) -> &Engines {
        self
    }

    fn controls_mut(&mut self) -> &mut Engines {
        self
    }
}
