pub mod event;
pub mod integrator;
pub mod runner;

pub use event::{EventDetector, EventKind, RadiusDetector, SimEvent, SpeedFractionDetector};
pub use integrator::step_body;
pub use runner::{Agent, Sample, Telemetry, World};
