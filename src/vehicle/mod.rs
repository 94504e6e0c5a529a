pub mod ship;

pub use ship::{presets, Target, Vehicle, VehicleClass, Weapons};
