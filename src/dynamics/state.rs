use nalgebra::{UnitQuaternion, Vector3};
use serde::Deserialize;

use crate::error::{ConfigError, ConfigResult};

// ---------------------------------------------------------------------------
// Rigid-body state snapshot: position, velocity, attitude, angular rate
// ---------------------------------------------------------------------------

/// Frame conventions:
/// - Body axes: +Z forward, +Y up, +X lateral (pitch axis).
/// - World axes share the same handedness; the scene origin is the arena
///   center that behaviours steer back toward.
#[derive(Debug, Clone)]
pub struct State {
    pub time: f64,
    pub pos: Vector3<f64>,              // m, world
    pub vel: Vector3<f64>,              // m/s, world
    pub quat: UnitQuaternion<f64>,      // body→world rotation
    pub omega: Vector3<f64>,            // rad/s, world frame angular velocity
}

impl State {
    pub fn at_rest(pos: Vector3<f64>) -> Self {
        Self {
            time: 0.0,
            pos,
            vel: Vector3::zeros(),
            quat: UnitQuaternion::identity(),
            omega: Vector3::zeros(),
        }
    }

    /// Body +Z axis in world frame.
    pub fn forward(&self) -> Vector3<f64> {
        self.quat * Vector3::z()
    }

    /// Body +Y axis in world frame.
    pub fn up(&self) -> Vector3<f64> {
        self.quat * Vector3::y()
    }

    pub fn speed(&self) -> f64 {
        self.vel.norm()
    }
}

// ---------------------------------------------------------------------------
// Simulation config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub dt: f64,
    pub max_time: f64,
    pub seed: u64,
}

impl SimConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        if !(self.dt > 0.0 && self.dt.is_finite()) {
            return Err(ConfigError::InvalidParameter {
                name: "sim.dt",
                reason: format!("fixed step must be positive, got {}", self.dt),
            });
        }
        if !(self.max_time >= 0.0) {
            return Err(ConfigError::InvalidParameter {
                name: "sim.max_time",
                reason: format!("must be non-negative, got {}", self.max_time),
            });
        }
        Ok(())
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            dt: 0.02,         // 50 Hz fixed step
            max_time: 60.0,
            seed: 7,
        }
    }
}
