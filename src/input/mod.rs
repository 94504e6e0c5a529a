pub mod flight_controls;

pub use flight_controls::{FlightControls, FlightControlsConfig, InputFrame};
