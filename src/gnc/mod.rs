pub mod guidance;
pub mod pid;
pub mod pid3d;
pub mod ship_pid;

pub use guidance::turn_toward;
pub use pid::PidController;
pub use pid3d::{Axis, PidController3D};
pub use ship_pid::ShipPidController;
