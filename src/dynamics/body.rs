use nalgebra::Vector3;
use serde::Deserialize;

use crate::dynamics::state::State;
use crate::error::{ConfigError, ConfigResult};

// ---------------------------------------------------------------------------
// Rigid-body collaborator interface
// ---------------------------------------------------------------------------

/// How an applied vector is interpreted by the integrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForceMode {
    /// Newtons (or N·m): divided by mass (or inertia).
    Force,
    /// Direct acceleration, mass independent.
    Acceleration,
}

/// The rigid body the propulsion core pushes on.
///
/// Engines borrow the body for the duration of one fixed step; they never
/// own it.
pub trait RigidBody {
    fn mass(&self) -> f64;
    fn linear_drag(&self) -> f64;
    fn angular_drag(&self) -> f64;
    fn fixed_delta_time(&self) -> f64;

    /// Torque in body axes.
    fn apply_relative_torque(&mut self, torque: Vector3<f64>, mode: ForceMode);

    /// Force in body axes, applied for one fixed step.
    fn apply_relative_force(&mut self, force: Vector3<f64>);
}

// ---------------------------------------------------------------------------
// Mass and drag properties
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BodyProperties {
    pub mass: f64,                      // kg
    pub drag: f64,                      // 1/s, linear drag coefficient
    pub angular_drag: f64,              // 1/s
    pub inertia: Vector3<f64>,          // principal moments, kg·m^2
}

impl BodyProperties {
    pub fn validate(&self, dt: f64) -> ConfigResult<()> {
        let degenerate = !(self.mass > 0.0)
            || !(dt > 0.0)
            || !(self.drag >= 0.0)
            || !(self.angular_drag >= 0.0)
            || !self.mass.is_finite()
            || !self.drag.is_finite();
        if degenerate {
            return Err(ConfigError::DegenerateBody {
                mass: self.mass,
                drag: self.drag,
                dt,
            });
        }
        if self.inertia.iter().any(|i| !(*i > 0.0)) {
            return Err(ConfigError::InvalidParameter {
                name: "body.inertia",
                reason: format!("principal moments must be positive, got {:?}", self.inertia),
            });
        }
        Ok(())
    }
}

impl Default for BodyProperties {
    fn default() -> Self {
        // Space fighter tuning: unit mass, heavy drag so throttle maps to speed.
        Self {
            mass: 1.0,
            drag: 3.0,
            angular_drag: 4.0,
            inertia: Vector3::new(1.0, 1.0, 1.0),
        }
    }
}

// ---------------------------------------------------------------------------
// Reference rigid body driven by `sim::integrator`
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SimBody {
    pub state: State,
    pub props: BodyProperties,
    fixed_dt: f64,
    pending_accel: Vector3<f64>,        // world frame, m/s^2
    pending_alpha: Vector3<f64>,        // world frame, rad/s^2
}

impl SimBody {
    pub fn new(state: State, props: BodyProperties, fixed_dt: f64) -> Self {
        Self {
            state,
            props,
            fixed_dt,
            pending_accel: Vector3::zeros(),
            pending_alpha: Vector3::zeros(),
        }
    }

    pub fn pending_acceleration(&self) -> Vector3<f64> {
        self.pending_accel
    }

    pub fn pending_angular_acceleration(&self) -> Vector3<f64> {
        self.pending_alpha
    }

    /// Take and reset the accelerations accumulated this step.
    pub(crate) fn drain_pending(&mut self) -> (Vector3<f64>, Vector3<f64>) {
        let out = (self.pending_accel, self.pending_alpha);
        self.pending_accel = Vector3::zeros();
        self.pending_alpha = Vector3::zeros();
        out
    }
}

impl RigidBody for SimBody {
    fn mass(&self) -> f64 {
        self.props.mass
    }

    fn linear_drag(&self) -> f64 {
        self.props.drag
    }

    fn angular_drag(&self) -> f64 {
        self.props.angular_drag
    }

    fn fixed_delta_time(&self) -> f64 {
        self.fixed_dt
    }

    fn apply_relative_torque(&mut self, torque: Vector3<f64>, mode: ForceMode) {
        let alpha_body = match mode {
            ForceMode::Acceleration => torque,
            ForceMode::Force => torque.component_div(&self.props.inertia),
        };
        self.pending_alpha += self.state.quat * alpha_body;
    }

    fn apply_relative_force(&mut self, force: Vector3<f64>) {
        self.pending_accel += self.state.quat * (force / self.props.mass);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::UnitQuaternion;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn relative_force_rotates_into_world() {
        let mut state = State::at_rest(Vector3::zeros());
        state.quat = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), FRAC_PI_2);
        let mut body = SimBody::new(state, BodyProperties::default(), 0.02);
        body.apply_relative_force(Vector3::new(0.0, 0.0, 10.0));
        let a = body.pending_acceleration();
        assert!((a - Vector3::new(10.0, 0.0, 0.0)).norm() < 1e-9, "got {:?}", a);
    }

    #[test]
    fn acceleration_torque_ignores_inertia() {
        let props = BodyProperties { inertia: Vector3::new(4.0, 4.0, 4.0), ..BodyProperties::default() };
        let mut body = SimBody::new(State::at_rest(Vector3::zeros()), props, 0.02);
        body.apply_relative_torque(Vector3::new(2.0, 0.0, 0.0), ForceMode::Acceleration);
        assert!((body.pending_angular_acceleration().x - 2.0).abs() < 1e-12);
        body.apply_relative_torque(Vector3::new(2.0, 0.0, 0.0), ForceMode::Force);
        assert!((body.pending_angular_acceleration().x - 2.5).abs() < 1e-12);
    }

    #[test]
    fn zero_mass_is_degenerate() {
        let props = BodyProperties { mass: 0.0, ..BodyProperties::default() };
        assert!(matches!(props.validate(0.02), Err(ConfigError::DegenerateBody { .. })));
    }
}
