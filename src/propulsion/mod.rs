pub mod engines;
pub mod engines3d;
pub mod power;

pub use engines::{Engines, Propulsion, ThrottleState};
pub use engines3d::{ForceBudget, ForceSource, VehicleEngines3D, VehicleEngines3DBuilder};
pub use power::{Power, PowerSource, PoweredSubsystem, SubsystemPower, SubsystemPowerConfiguration};
