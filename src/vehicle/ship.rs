use nalgebra::Vector3;
use serde::Deserialize;

use crate::dynamics::{RigidBody, SimBody, State};
use crate::error::ConfigResult;
use crate::propulsion::{Engines, Power, PowerSource, Propulsion};
use crate::sim::integrator::step_body;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleClass {
    #[default]
    Fighter,
    Bomber,
    CapitalShip,
}

/// A tracked world position a weapons system can lock on to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Target {
    pub id: usize,
    pub position: Vector3<f64>,
}

/// Weapons capability. Only target selection matters to the flight core.
#[derive(Debug, Clone, Default)]
pub struct Weapons {
    pub selected_target: Option<Target>,
}

// ---------------------------------------------------------------------------
// Vehicle: body plus optional capability components
// ---------------------------------------------------------------------------

pub struct Vehicle {
    pub name: String,
    pub class: VehicleClass,
    pub body: SimBody,
    pub engines: Option<Box<dyn Propulsion>>,
    pub power: Option<Power>,
    pub weapons: Option<Weapons>,
}

impl Vehicle {
    pub fn new(name: impl Into<String>, body: SimBody) -> Self {
        Self {
            name: name.into(),
            class: VehicleClass::default(),
            body,
            engines: None,
            power: None,
            weapons: None,
        }
    }

    pub fn with_class(mut self, class: VehicleClass) -> Self {
        self.class = class;
        self
    }

    pub fn with_engines(mut self, engines: impl Propulsion + 'static) -> Self {
        self.engines = Some(Box::new(engines));
        self
    }

    pub fn with_power(mut self, power: Power) -> Self {
        self.power = Some(power);
        self
    }

    pub fn with_weapons(mut self, weapons: Weapons) -> Self {
        self.weapons = Some(weapons);
        self
    }

    pub fn state(&self) -> &State {
        &self.body.state
    }

    /// Throttle interface of the engines, if the vehicle has any.
    pub fn controls(&self) -> Option<&Engines> {
        self.engines.as_deref().map(|e| e.controls())
    }

    pub fn controls_mut(&mut self) -> Option<&mut Engines> {
        self.engines.as_deref_mut().map(|e| e.controls_mut())
    }

    pub fn selected_target(&self) -> Option<Target> {
        self.weapons.as_ref().and_then(|w| w.selected_target)
    }

    /// Called once when the vehicle enters the simulation.
    pub fn start(&mut self) {
        if let Some(engines) = self.engines.as_deref_mut() {
            engines.start();
        }
    }

    /// Apply engine forces for this step, then integrate the body.
    ///
    /// Throttle must already hold this step's commands.
    pub fn fixed_step(&mut self) {
        if let Some(engines) = self.engines.as_deref_mut() {
            engines.update_available_forces(self.power.as_ref().map(|p| p as &dyn PowerSource));
            engines.fixed_step(&mut self.body);
        }
        step_body(&mut self.body);
    }

    /// Force applied by the engines on the last step (body axes).
    pub fn last_applied_force(&self) -> Vector3<f64> {
        self.engines.as_deref().map_or(Vector3::zeros(), |e| e.last_applied_force())
    }

    pub fn default_max_speed_by_axis(&self, with_boost: bool) -> ConfigResult<Vector3<f64>> {
        match self.engines.as_deref() {
            Some(e) => e.default_max_speed_by_axis(with_boost, &self.body as &dyn RigidBody),
            None => Ok(Vector3::zeros()),
        }
    }

    pub fn current_max_speed_by_axis(&self, with_boost: bool) -> ConfigResult<Vector3<f64>> {
        match self.engines.as_deref() {
            Some(e) => e.current_max_speed_by_axis(with_boost, &self.body as &dyn RigidBody),
            None => Ok(Vector3::zeros()),
        }
    }
}

// ---------------------------------------------------------------------------
// Preset vehicles
// ---------------------------------------------------------------------------

pub mod presets {
    use super::*;
    use crate::dynamics::BodyProperties;
    use crate::propulsion::{ForceSource, VehicleEngines3DBuilder};

    /// Light fighter on fixed default forces, armed, facing +Z.
    pub fn fighter(name: &str, pos: Vector3<f64>, dt: f64) -> ConfigResult<Vehicle> {
        let props = BodyProperties::default();
        props.validate(dt)?;
        let body = SimBody::new(State::at_rest(pos), props, dt);
        let engines = VehicleEngines3DBuilder::new().build()?;
        Ok(Vehicle::new(name, body)
            .with_class(VehicleClass::Fighter)
            .with_engines(engines)
            .with_weapons(Weapons::default()))
    }

    /// Fighter whose engine forces follow a 3 MW reactor split three ways.
    pub fn powered_fighter(name: &str, pos: Vector3<f64>, dt: f64) -> ConfigResult<Vehicle> {
        let props = BodyProperties::default();
        props.validate(dt)?;
        let body = SimBody::new(State::at_rest(pos), props, dt);
        let engines = VehicleEngines3DBuilder::new()
            .source(ForceSource::power_derived())
            .build()?;
        let power = Power::new(3000.0);
        power.validate()?;
        Ok(Vehicle::new(name, body)
            .with_class(VehicleClass::Fighter)
            .with_engines(engines)
            .with_power(power)
            .with_weapons(Weapons::default()))
    }
}
