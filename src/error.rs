use std::fmt;

use thiserror::Error;

/// Per-axis label used in error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisLabel {
    X,
    Y,
    Z,
}

impl AxisLabel {
    pub const ALL: [AxisLabel; 3] = [AxisLabel::X, AxisLabel::Y, AxisLabel::Z];
}

impl fmt::Display for AxisLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AxisLabel::X => "x",
            AxisLabel::Y => "y",
            AxisLabel::Z => "z",
        };
        f.write_str(s)
    }
}

/// Malformed vehicle or scenario configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("translation throttle limits on {axis} axis are inverted (min {min} > max {max})")]
    ThrottleLimits { axis: AxisLabel, min: f64, max: f64 },

    #[error("{field} on {axis} axis must be finite and non-negative, got {value}")]
    InvalidForce {
        field: &'static str,
        axis: AxisLabel,
        value: f64,
    },

    #[error("rigid body cannot support speed inversion (mass {mass}, drag {drag}, dt {dt})")]
    DegenerateBody { mass: f64, drag: f64, dt: f64 },

    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("failed to read scenario file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse scenario: {0}")]
    Parse(#[from] toml::de::Error),
}

/// A component a pilot needs on its vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Engines,
    Weapons,
    VehicleClass,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Capability::Engines => "engines",
            Capability::Weapons => "weapons",
            Capability::VehicleClass => "compatible vehicle class",
        };
        f.write_str(s)
    }
}

/// Pilot initialization failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BehaviourError {
    #[error("vehicle `{vehicle}` is missing required capability: {capability}")]
    MissingCapability {
        vehicle: String,
        capability: Capability,
    },
}

pub type ConfigResult<T> = Result<T, ConfigError>;
