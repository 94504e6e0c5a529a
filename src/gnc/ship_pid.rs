use nalgebra::Vector3;
use serde::Deserialize;

use super::pid3d::{Axis, PidController3D};

/// Steering (angular) and movement (linear) control loops for one vehicle
/// behaviour. The two loops share nothing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ShipPidController {
    pub steering: PidController3D,
    pub movement: PidController3D,
}

impl ShipPidController {
    pub fn new(steering: PidController3D, movement: PidController3D) -> Self {
        Self { steering, movement }
    }

    pub fn set_steering_error(&mut self, axis: Axis, error: f64, error_change_rate: f64) {
        self.steering.set_error(axis, error, error_change_rate);
    }

    pub fn set_steering_integral_influence(&mut self, influence: f64) {
        self.steering.set_integral_influence_all(influence);
    }

    pub fn steering_control_values(&self) -> Vector3<f64> {
        self.steering.control_values()
    }

    pub fn set_movement_error(&mut self, axis: Axis, error: f64, error_change_rate: f64) {
        self.movement.set_error(axis, error, error_change_rate);
    }

    pub fn set_movement_integral_influence(&mut self, influence: f64) {
        self.movement.set_integral_influence_all(influence);
    }

    pub fn movement_control_values(&self) -> Vector3<f64> {
        self.movement.control_values()
    }

    pub fn reset_integrals(&mut self) {
        self.steering.reset_integrals();
        self.movement.reset_integrals();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steering_and_movement_are_independent() {
        let mut ship = ShipPidController::new(
            PidController3D::uniform(1.0, 0.5, 0.0),
            PidController3D::uniform(2.0, 0.5, 0.0),
        );
        ship.set_steering_error(Axis::X, 0.2, 0.0);
        assert_eq!(ship.movement_control_values(), Vector3::zeros());

        ship.set_movement_error(Axis::Z, 0.1, 0.0);
        assert!((ship.steering_control_values().x - 0.3).abs() < 1e-12);
        assert!((ship.movement_control_values().z - 0.25).abs() < 1e-12);
    }

    #[test]
    fn reset_integrals_clears_both_loops() {
        let mut ship = ShipPidController::new(
            PidController3D::uniform(0.0, 1.0, 0.0),
            PidController3D::uniform(0.0, 1.0, 0.0),
        );
        ship.set_steering_error(Axis::Y, 0.5, 0.0);
        ship.set_movement_error(Axis::Y, 0.5, 0.0);
        ship.reset_integrals();
        assert_eq!(ship.steering_control_values(), Vector3::zeros());
        assert_eq!(ship.movement_control_values(), Vector3::zeros());
    }
}
