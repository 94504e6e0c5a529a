use nalgebra::Vector3;
use serde::Deserialize;

use super::pid::PidController;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

// ---------------------------------------------------------------------------
// Three independent PID loops addressed by axis
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PidController3D {
    pub x: PidController,
    pub y: PidController,
    pub z: PidController,
}

impl PidController3D {
    /// Same gains on every axis.
    pub fn uniform(kp: f64, ki: f64, kd: f64) -> Self {
        Self {
            x: PidController::new(kp, ki, kd),
            y: PidController::new(kp, ki, kd),
            z: PidController::new(kp, ki, kd),
        }
    }

    pub fn axis(&self, axis: Axis) -> &PidController {
        match axis {
            Axis::X => &self.x,
            Axis::Y => &self.y,
            Axis::Z => &self.z,
        }
    }

    pub fn axis_mut(&mut self, axis: Axis) -> &mut PidController {
        match axis {
            Axis::X => &mut self.x,
            Axis::Y => &mut self.y,
            Axis::Z => &mut self.z,
        }
    }

    pub fn set_error(&mut self, axis: Axis, error: f64, error_change_rate: f64) {
        self.axis_mut(axis).set_error(error, error_change_rate);
    }

    /// Feed all three axes at once.
    pub fn set_errors(&mut self, errors: &Vector3<f64>, rates: &Vector3<f64>) {
        for axis in Axis::ALL {
            let i = axis.index();
            self.set_error(axis, errors[i], rates[i]);
        }
    }

    pub fn set_integral_influence(&mut self, axis: Axis, influence: f64) {
        self.axis_mut(axis).set_integral_influence(influence);
    }

    pub fn set_integral_influence_all(&mut self, influence: f64) {
        for axis in Axis::ALL {
            self.set_integral_influence(axis, influence);
        }
    }

    pub fn control_value(&self, axis: Axis) -> f64 {
        self.axis(axis).control_value()
    }

    pub fn control_values(&self) -> Vector3<f64> {
        Vector3::new(
            self.x.control_value(),
            self.y.control_value(),
            self.z.control_value(),
        )
    }

    pub fn reset_integrals(&mut self) {
        self.x.reset_integral();
        self.y.reset_integral();
        self.z.reset_integral();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_route_to_matching_axis() {
        let mut pid = PidController3D::uniform(1.0, 0.0, 0.0);
        pid.set_error(Axis::Y, 0.4, 0.0);
        let out = pid.control_values();
        assert_eq!(out.x, 0.0);
        assert!((out.y - 0.4).abs() < 1e-12);
        assert_eq!(out.z, 0.0);
        assert!((pid.control_value(Axis::Y) - 0.4).abs() < 1e-12);
    }

    #[test]
    fn influence_per_axis() {
        let mut pid = PidController3D::uniform(0.0, 1.0, 0.0);
        pid.set_integral_influence(Axis::Z, 0.0);
        pid.set_errors(&Vector3::new(0.5, 0.5, 0.5), &Vector3::zeros());
        let out = pid.control_values();
        assert!((out.x - 0.5).abs() < 1e-12);
        assert_eq!(out.z, 0.0);
    }
}
