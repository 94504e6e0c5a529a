pub mod behaviour;
pub mod config;
pub mod dynamics;
pub mod error;
pub mod gnc;
pub mod input;
pub mod io;
pub mod pilot;
pub mod propulsion;
pub mod sim;
pub mod vehicle;

pub use error::{BehaviourError, Capability, ConfigError, ConfigResult};
