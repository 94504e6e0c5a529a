use serde::Deserialize;

// ---------------------------------------------------------------------------
// PID Controller (single axis)
// ---------------------------------------------------------------------------

/// Single-axis PID.
///
/// The caller supplies both the error and its rate of change, so the
/// controller holds no time step of its own. The integral accumulator is
/// clamped to [-1, 1] and persists across calls until `reset_integral`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PidController {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
    /// Gates both the integral accumulation rate and its output
    /// contribution. Expected in [0, 1]; not clamped.
    pub integral_influence: f64,
    #[serde(skip)]
    proportional: f64,
    #[serde(skip)]
    integral: f64,
    #[serde(skip)]
    derivative: f64,
}

impl PidController {
    pub fn new(kp: f64, ki: f64, kd: f64) -> Self {
        Self {
            kp,
            ki,
            kd,
            integral_influence: 1.0,
            proportional: 0.0,
            integral: 0.0,
            derivative: 0.0,
        }
    }

    pub fn set_error(&mut self, error: f64, error_change_rate: f64) {
        self.proportional = self.kp * error;

        self.integral += self.integral_influence * (self.ki * error);
        // Anti-windup: clamp integral to prevent saturation
        self.integral = self.integral.clamp(-1.0, 1.0);

        self.derivative = self.kd * error_change_rate;
    }

    pub fn set_integral_influence(&mut self, influence: f64) {
        self.integral_influence = influence;
    }

    /// Unclamped; callers clamp before using the value as throttle.
    pub fn control_value(&self) -> f64 {
        self.proportional + self.integral_influence * self.integral + self.derivative
    }

    pub fn integral(&self) -> f64 {
        self.integral
    }

    pub fn reset_integral(&mut self) {
        self.integral = 0.0;
    }
}

impl Default for PidController {
    fn default() -> Self {
        Self::new(0.01, 0.0, 0.0)
    }
}
