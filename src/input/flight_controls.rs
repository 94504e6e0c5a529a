use nalgebra::{Vector2, Vector3};
use serde::Deserialize;
use tracing::debug;

use crate::error::{BehaviourError, Capability};
use crate::pilot::{GameState, Pilot, UpdateContext};
use crate::vehicle::{Vehicle, VehicleClass};

// ---------------------------------------------------------------------------
// Resolved input for one frame
// ---------------------------------------------------------------------------

/// Device-independent input snapshot: axes in [-1, 1], button edges and the
/// mouse position in viewport space ([0, 1] on both axes, origin bottom-left).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InputFrame {
    pub pitch: f64,
    pub yaw: f64,
    pub roll: f64,
    pub strafe_horizontal: f64,
    pub strafe_vertical: f64,
    pub throttle_up: bool,
    pub throttle_down: bool,
    /// Boost pressed this frame.
    pub boost_down: bool,
    /// Boost released this frame.
    pub boost_up: bool,
    pub mouse_viewport: Option<Vector2<f64>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FlightControlsConfig {
    pub link_yaw_and_roll: bool,
    pub yaw_roll_ratio: f64,
    pub mouse_steering_enabled: bool,
    pub mouse_vertical_inverted: bool,
    pub mouse_pitch_sensitivity: f64,
    pub mouse_yaw_sensitivity: f64,
    pub mouse_roll_sensitivity: f64,
    pub mouse_dead_radius: f64,
    pub keyboard_vertical_inverted: bool,
    pub throttle_sensitivity: Vector3<f64>,   // throttle units per second
    /// Empty means every game state.
    pub compatible_game_states: Vec<GameState>,
    /// Empty means every vehicle class.
    pub compatible_vehicle_classes: Vec<VehicleClass>,
}

impl Default for FlightControlsConfig {
    fn default() -> Self {
        Self {
            link_yaw_and_roll: false,
            yaw_roll_ratio: 1.0,
            mouse_steering_enabled: true,
            mouse_vertical_inverted: false,
            mouse_pitch_sensitivity: 1.0,
            mouse_yaw_sensitivity: 1.0,
            mouse_roll_sensitivity: 1.0,
            mouse_dead_radius: 0.0,
            keyboard_vertical_inverted: false,
            throttle_sensitivity: Vector3::new(1.0, 1.0, 1.0),
            compatible_game_states: Vec::new(),
            compatible_vehicle_classes: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Player flight controls
// ---------------------------------------------------------------------------

/// Maps an [`InputFrame`] onto a vehicle's engine throttle.
///
/// Use [`FlightControls::set_frame`] before each step when driven as a
/// [`Pilot`]; the frame's button edges are consumed by that step.
#[derive(Debug, Clone)]
pub struct FlightControls {
    pub config: FlightControlsConfig,
    initialized: bool,
    active: bool,
    mouse_input_enabled: bool,
    steering_enabled: bool,
    movement_enabled: bool,
    rotation_inputs: Vector3<f64>,
    translation_inputs: Vector3<f64>,
    boost_inputs: Vector3<f64>,
    frame: InputFrame,
}

impl FlightControls {
    pub fn new(config: FlightControlsConfig) -> Self {
        Self {
            config,
            initialized: false,
            active: false,
            mouse_input_enabled: true,
            steering_enabled: true,
            movement_enabled: true,
            rotation_inputs: Vector3::zeros(),
            translation_inputs: Vector3::zeros(),
            boost_inputs: Vector3::zeros(),
            frame: InputFrame::default(),
        }
    }

    pub fn initialized(&self) -> bool {
        self.initialized
    }

    pub fn input_active(&self) -> bool {
        self.active
    }

    /// Stop, re-initialize against `vehicle`, and optionally start.
    pub fn set_vehicle(&mut self, vehicle: &mut Vehicle, start: bool) -> Result<(), BehaviourError> {
        self.stop_input(vehicle);
        self.initialized = false;
        self.check_vehicle(vehicle)?;
        self.initialized = true;
        if start {
            self.start_input();
        }
        Ok(())
    }

    pub fn start_input(&mut self) {
        if self.initialized {
            self.active = true;
            debug!("flight controls started");
        }
    }

    pub fn stop_input(&mut self, vehicle: &mut Vehicle) {
        self.active = false;
        self.rotation_inputs = Vector3::zeros();
        self.translation_inputs = Vector3::zeros();
        self.boost_inputs = Vector3::zeros();
        if let Some(controls) = vehicle.controls_mut() {
            controls.set_rotation_throttle_values(self.rotation_inputs);
            controls.set_translation_throttle_values(self.translation_inputs);
            controls.set_boost_throttle_values(self.boost_inputs);
        }
    }

    pub fn set_mouse_input_enabled(&mut self, enabled: bool) {
        self.mouse_input_enabled = enabled;
    }

    pub fn enable_steering(&mut self) {
        self.steering_enabled = true;
    }

    pub fn disable_steering(&mut self, vehicle: &mut Vehicle, clear_current_values: bool) {
        self.steering_enabled = false;
        if clear_current_values {
            self.rotation_inputs = Vector3::zeros();
            if let Some(controls) = vehicle.controls_mut() {
                controls.set_rotation_throttle_values(self.rotation_inputs);
            }
        }
    }

    pub fn enable_movement(&mut self) {
        self.movement_enabled = true;
    }

    pub fn disable_movement(&mut self, vehicle: &mut Vehicle, clear_current_values: bool) {
        self.movement_enabled = false;
        if clear_current_values {
            self.translation_inputs = Vector3::zeros();
            self.boost_inputs = Vector3::zeros();
            if let Some(controls) = vehicle.controls_mut() {
                controls.set_translation_throttle_values(self.translation_inputs);
                controls.set_boost_throttle_values(self.boost_inputs);
            }
        }
    }

    /// Queue the input snapshot for the next pilot update.
    pub fn set_frame(&mut self, frame: InputFrame) {
        self.frame = frame;
    }

    /// Apply one input frame. Does nothing unless active and the game state
    /// is compatible.
    pub fn apply(&mut self, vehicle: &mut Vehicle, frame: &InputFrame, ctx: &UpdateContext) {
        if !self.active {
            return;
        }
        let states = &self.config.compatible_game_states;
        if !states.is_empty() && !states.contains(&ctx.game_state) {
            return;
        }

        if self.steering_enabled {
            match frame.mouse_viewport {
                Some(mouse) if self.mouse_input_enabled && self.config.mouse_steering_enabled => {
                    self.mouse_steering(frame, mouse)
                }
                _ => self.keyboard_steering(frame),
            }
            if let Some(controls) = vehicle.controls_mut() {
                controls.set_rotation_throttle_values(self.rotation_inputs);
            }
        }

        if self.movement_enabled {
            let current = vehicle.controls().map_or(Vector3::zeros(), |c| c.translation_throttle_values());
            self.movement(frame, current, ctx.dt);
            if let Some(controls) = vehicle.controls_mut() {
                controls.set_translation_throttle_values(self.translation_inputs);
                controls.set_boost_throttle_values(self.boost_inputs);
            }
        }
    }

    fn check_vehicle(&self, vehicle: &Vehicle) -> Result<(), BehaviourError> {
        let classes = &self.config.compatible_vehicle_classes;
        let capability = if !classes.is_empty() && !classes.contains(&vehicle.class) {
            Some(Capability::VehicleClass)
        } else if vehicle.engines.is_none() {
            Some(Capability::Engines)
        } else {
            None
        };
        match capability {
            Some(capability) => Err(BehaviourError::MissingCapability {
                vehicle: vehicle.name.clone(),
                capability,
            }),
            None => Ok(()),
        }
    }

    fn mouse_steering(&mut self, frame: &InputFrame, viewport: Vector2<f64>) {
        let c = &self.config;
        // Centered, -1..1 edge to edge
        let centered = (viewport - Vector2::new(0.5, 0.5)) * 2.0;
        let dist = (centered.norm() - c.mouse_dead_radius).max(0.0);
        let mouse = centered.try_normalize(1e-12).map_or(Vector2::zeros(), |n| n * dist);

        let vertical = if c.mouse_vertical_inverted { 1.0 } else { -1.0 };
        self.rotation_inputs.x = (vertical * mouse.y * c.mouse_pitch_sensitivity).clamp(-1.0, 1.0);

        if c.link_yaw_and_roll {
            self.rotation_inputs.z = (-mouse.x * c.mouse_roll_sensitivity).clamp(-1.0, 1.0);
            self.rotation_inputs.y = (-self.rotation_inputs.z * c.yaw_roll_ratio).clamp(-1.0, 1.0);
        } else {
            self.rotation_inputs.z = frame.roll;
            self.rotation_inputs.y = (mouse.x * c.mouse_yaw_sensitivity).clamp(-1.0, 1.0);
        }
    }

    fn keyboard_steering(&mut self, frame: &InputFrame) {
        let c = &self.config;
        let vertical = if c.keyboard_vertical_inverted { -1.0 } else { 1.0 };
        self.rotation_inputs.x = vertical * frame.pitch;

        if c.link_yaw_and_roll {
            self.rotation_inputs.z = -frame.yaw;
            self.rotation_inputs.y = (-self.rotation_inputs.z * c.yaw_roll_ratio).clamp(-1.0, 1.0);
        } else {
            self.rotation_inputs.z = frame.roll;
            self.rotation_inputs.y = frame.yaw;
        }
    }

    fn movement(&mut self, frame: &InputFrame, current: Vector3<f64>, dt: f64) {
        self.translation_inputs = current;
        if frame.throttle_up {
            self.translation_inputs.z += self.config.throttle_sensitivity.z * dt;
        } else if frame.throttle_down {
            self.translation_inputs.z -= self.config.throttle_sensitivity.z * dt;
        }

        self.translation_inputs.x = frame.strafe_horizontal;
        self.translation_inputs.y = frame.strafe_vertical;

        if frame.boost_down {
            self.boost_inputs = Vector3::new(0.0, 0.0, 1.0);
        } else if frame.boost_up {
            self.boost_inputs = Vector3::zeros();
        }
    }
}

impl Default for FlightControls {
    fn default() -> Self {
        Self::new(FlightControlsConfig::default())
    }
}

impl Pilot for FlightControls {
    fn initialize(&mut self, vehicle: &Vehicle) -> Result<(), BehaviourError> {
        self.check_vehicle(vehicle)?;
        self.initialized = true;
        Ok(())
    }

    fn start(&mut self, _vehicle: &mut Vehicle) {
        self.start_input();
    }

    fn stop(&mut self, vehicle: &mut Vehicle) {
        self.stop_input(vehicle);
    }

    fn update(&mut self, vehicle: &mut Vehicle, ctx: &UpdateContext) -> bool {
        if !self.active {
            return false;
        }
        let frame = self.frame;
        self.apply(vehicle, &frame, ctx);
        // Edges fire once
        self.frame.boost_down = false;
        self.frame.boost_up = false;
        true
    }

    fn is_running(&self) -> bool {
        self.active
    }

    fn name(&self) -> &str {
        "flight_controls"
    }
}
