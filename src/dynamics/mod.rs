pub mod body;
pub mod state;

pub use body::{BodyProperties, ForceMode, RigidBody, SimBody};
pub use state::{SimConfig, State};
