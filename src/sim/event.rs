use nalgebra::Vector3;

use crate::dynamics::State;

// ---------------------------------------------------------------------------
// Flight events
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    /// Speed rose through this fraction of the reference top speed.
    SpeedReached { fraction: f64 },
    /// Distance from the anchor point crossed `radius`.
    RadiusCrossed { radius: f64, outbound: bool },
}

/// A discrete event that occurred during simulation.
#[derive(Debug, Clone)]
pub struct SimEvent {
    pub time: f64,
    pub vehicle: usize,
    pub kind: EventKind,
    pub state: State,
}

/// Trait for passive event detectors.
/// Implementations inspect consecutive states and report events.
pub trait EventDetector {
    fn check(&mut self, prev: &State, current: &State) -> Option<EventKind>;
}

/// Fires once when speed first rises through `fraction * top_speed`.
pub struct SpeedFractionDetector {
    pub fraction: f64,
    pub top_speed: f64,
    fired: bool,
}

impl SpeedFractionDetector {
    pub fn new(fraction: f64, top_speed: f64) -> Self {
        Self { fraction, top_speed, fired: false }
    }
}

impl EventDetector for SpeedFractionDetector {
    fn check(&mut self, prev: &State, current: &State) -> Option<EventKind> {
        if self.fired || !self.top_speed.is_finite() || self.top_speed <= 0.0 {
            return None;
        }
        let threshold = self.fraction * self.top_speed;
        if prev.speed() < threshold && current.speed() >= threshold {
            self.fired = true;
            Some(EventKind::SpeedReached { fraction: self.fraction })
        } else {
            None
        }
    }
}

/// Detects crossings of a sphere around `anchor`, in either direction.
pub struct RadiusDetector {
    pub anchor: Vector3<f64>,
    pub radius: f64,
}

impl RadiusDetector {
    pub fn new(anchor: Vector3<f64>, radius: f64) -> Self {
        Self { anchor, radius }
    }
}

impl EventDetector for RadiusDetector {
    fn check(&mut self, prev: &State, current: &State) -> Option<EventKind> {
        let before = (prev.pos - self.anchor).norm();
        let after = (current.pos - self.anchor).norm();
        if before < self.radius && after >= self.radius {
            Some(EventKind::RadiusCrossed { radius: self.radius, outbound: true })
        } else if before >= self.radius && after < self.radius {
            Some(EventKind::RadiusCrossed { radius: self.radius, outbound: false })
        } else {
            None
        }
    }
}
