use std::path::Path;

use nalgebra::Vector3;
use serde::Deserialize;
use tracing::warn;

use crate::behaviour::{Evade, EvadeConfig, Pursue, PursueConfig, SteeringConfig};
use crate::dynamics::{BodyProperties, SimBody, SimConfig, State};
use crate::error::{ConfigError, ConfigResult};
use crate::pilot::Pilot;
use crate::propulsion::{ForceBudget, ForceSource, Power, VehicleEngines3D, VehicleEngines3DBuilder};
use crate::sim::World;
use crate::vehicle::{Vehicle, VehicleClass, Weapons};

// ---------------------------------------------------------------------------
// Scenario file
// ---------------------------------------------------------------------------

/// Top-level TOML scenario: one `[sim]` table and any number of
/// `[[vehicle]]` entries.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    pub sim: SimConfig,
    #[serde(rename = "vehicle")]
    pub vehicles: Vec<VehicleConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PilotKind {
    Evade,
    Pursue,
    #[default]
    Idle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForceSourceKind {
    #[default]
    Fixed,
    Powered,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EnginesConfig {
    pub enabled: bool,
    pub activate_at_start: bool,
    pub min_throttle: Vector3<f64>,
    pub max_throttle: Vector3<f64>,
    pub apply_translation_forces_during_boost: bool,
    pub default_translation_forces: Vector3<f64>,
    pub default_rotation_forces: Vector3<f64>,
    pub default_boost_forces: Vector3<f64>,
    pub max_translation_forces: Vector3<f64>,
    pub max_rotation_forces: Vector3<f64>,
    pub source: ForceSourceKind,
    pub rotation_coefficients: Vector3<f64>,
    pub translation_coefficients: Vector3<f64>,
}

impl Default for EnginesConfig {
    fn default() -> Self {
        let budget = ForceBudget::default();
        Self {
            enabled: true,
            activate_at_start: true,
            min_throttle: Vector3::new(-1.0, -1.0, -0.1),
            max_throttle: Vector3::new(1.0, 1.0, 1.0),
            apply_translation_forces_during_boost: true,
            default_translation_forces: budget.default_translation,
            default_rotation_forces: budget.default_rotation,
            default_boost_forces: budget.default_boost,
            max_translation_forces: budget.max_translation,
            max_rotation_forces: budget.max_rotation,
            source: ForceSourceKind::Fixed,
            rotation_coefficients: Vector3::new(0.1, 0.1, 0.2),
            translation_coefficients: Vector3::new(0.1, 0.1, 0.2),
        }
    }
}

impl EnginesConfig {
    pub fn build(&self) -> ConfigResult<VehicleEngines3D> {
        let source = match self.source {
            ForceSourceKind::Fixed => ForceSource::FixedDefault,
            ForceSourceKind::Powered => ForceSource::PowerDerived {
                rotation_coefficients: self.rotation_coefficients,
                translation_coefficients: self.translation_coefficients,
            },
        };
        VehicleEngines3DBuilder::new()
            .throttle_limits(self.min_throttle, self.max_throttle)
            .activate_at_start(self.activate_at_start)
            .apply_translation_forces_during_boost(self.apply_translation_forces_during_boost)
            .default_translation_forces(self.default_translation_forces)
            .default_rotation_forces(self.default_rotation_forces)
            .default_boost_forces(self.default_boost_forces)
            .max_translation_forces(self.max_translation_forces)
            .max_rotation_forces(self.max_rotation_forces)
            .source(source)
            .build()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VehicleConfig {
    pub name: String,
    pub class: VehicleClass,
    pub pilot: PilotKind,
    /// Index of the vehicle this one tracks.
    pub target: Option<usize>,
    pub position: Vector3<f64>,
    pub velocity: Vector3<f64>,
    pub weapons: bool,
    pub body: BodyProperties,
    pub engines: EnginesConfig,
    pub power: Option<Power>,
    pub steering: SteeringConfig,
    pub evade: EvadeConfig,
    pub pursue: PursueConfig,
}

impl Default for VehicleConfig {
    fn default() -> Self {
        Self {
            name: "vehicle".into(),
            class: VehicleClass::Fighter,
            pilot: PilotKind::Idle,
            target: None,
            position: Vector3::zeros(),
            velocity: Vector3::zeros(),
            weapons: true,
            body: BodyProperties::default(),
            engines: EnginesConfig::default(),
            power: None,
            steering: SteeringConfig::default(),
            evade: EvadeConfig::default(),
            pursue: PursueConfig::default(),
        }
    }
}

impl VehicleConfig {
    pub fn validate(&self, dt: f64) -> ConfigResult<()> {
        self.body.validate(dt)?;
        if self.engines.enabled {
            self.engines.build()?;
        }
        if let Some(power) = &self.power {
            power.validate()?;
        }
        if !self.position.iter().chain(self.velocity.iter()).all(|x| x.is_finite()) {
            return Err(ConfigError::InvalidParameter {
                name: "vehicle.position",
                reason: format!("start position and velocity must be finite ({})", self.name),
            });
        }
        match self.pilot {
            PilotKind::Evade => self.evade.validate(),
            PilotKind::Pursue => self.pursue.validate(),
            PilotKind::Idle => Ok(()),
        }
    }

    pub fn build_vehicle(&self, dt: f64) -> ConfigResult<Vehicle> {
        let mut state = State::at_rest(self.position);
        state.vel = self.velocity;
        let mut vehicle = Vehicle::new(self.name.clone(), SimBody::new(state, self.body.clone(), dt))
            .with_class(self.class);
        if self.engines.enabled {
            vehicle = vehicle.with_engines(self.engines.build()?);
        }
        if let Some(power) = &self.power {
            vehicle = vehicle.with_power(power.clone());
        }
        if self.weapons {
            vehicle = vehicle.with_weapons(Weapons::default());
        }
        Ok(vehicle)
    }

    /// Bare body for a vehicle whose configuration was rejected. Falls back
    /// to default body properties and the origin where those are unusable.
    pub fn inert_vehicle(&self, dt: f64) -> Vehicle {
        let body = if self.body.validate(dt).is_ok() { self.body.clone() } else { BodyProperties::default() };
        let finite = |v: &Vector3<f64>| v.iter().all(|x| x.is_finite());
        let mut state = State::at_rest(if finite(&self.position) { self.position } else { Vector3::zeros() });
        if finite(&self.velocity) {
            state.vel = self.velocity;
        }
        Vehicle::new(self.name.clone(), SimBody::new(state, body, dt)).with_class(self.class)
    }

    pub fn build_pilot(&self, seed: u64) -> Option<Box<dyn Pilot>> {
        match self.pilot {
            PilotKind::Evade => Some(Box::new(Evade::new(self.evade.clone(), self.steering.clone(), seed))),
            PilotKind::Pursue => Some(Box::new(Pursue::new(self.pursue.clone(), self.steering.clone()))),
            PilotKind::Idle => None,
        }
    }
}

impl ScenarioConfig {
    pub fn from_toml_str(text: &str) -> ConfigResult<Self> {
        let scenario: ScenarioConfig = toml::from_str(text)?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Scenario-wide checks only. Problems confined to one vehicle are
    /// reported by `vehicle_errors` and handled in `build_world`.
    pub fn validate(&self) -> ConfigResult<()> {
        self.sim.validate()
    }

    /// Every `[[vehicle]]` entry that would be built without engines or pilot.
    pub fn vehicle_errors(&self) -> Vec<(usize, ConfigError)> {
        self.vehicles
            .iter()
            .enumerate()
            .filter_map(|(i, v)| self.check_vehicle(v).err().map(|err| (i, err)))
            .collect()
    }

    fn check_vehicle(&self, v: &VehicleConfig) -> ConfigResult<()> {
        v.validate(self.sim.dt)?;
        if let Some(t) = v.target {
            if t >= self.vehicles.len() {
                return Err(ConfigError::InvalidParameter {
                    name: "vehicle.target",
                    reason: format!("`{}` targets vehicle {} but only {} exist", v.name, t, self.vehicles.len()),
                });
            }
        }
        Ok(())
    }

    /// Build the world. Each evader gets its own seed derived from the run seed.
    ///
    /// A vehicle whose own configuration is bad still takes its slot (so
    /// target indices stay put) but flies inert: no engines, no pilot, no
    /// target. Only `[sim]` errors fail the whole build.
    pub fn build_world(&self) -> ConfigResult<World> {
        self.sim.validate()?;
        let mut world = World::new(self.sim.clone());
        for (i, v) in self.vehicles.iter().enumerate() {
            let built = self.check_vehicle(v).and_then(|()| v.build_vehicle(self.sim.dt));
            match built {
                Ok(vehicle) => {
                    let pilot = v.build_pilot(self.sim.seed.wrapping_add(i as u64));
                    world.add(vehicle, pilot, v.target);
                }
                Err(err) => {
                    warn!(vehicle = %v.name, %err, "vehicle disabled");
                    world.add(v.inert_vehicle(self.sim.dt), None, None);
                }
            }
        }
        Ok(world)
    }

    /// Powered evader at the origin chased by a pursuer 60 m behind it.
    pub fn duel() -> Self {
        let evader = VehicleConfig {
            name: "evader".into(),
            pilot: PilotKind::Evade,
            target: Some(1),
            engines: EnginesConfig { source: ForceSourceKind::Powered, ..EnginesConfig::default() },
            power: Some(Power::new(3000.0)),
            ..VehicleConfig::default()
        };
        let pursuer = VehicleConfig {
            name: "pursuer".into(),
            pilot: PilotKind::Pursue,
            target: Some(0),
            position: Vector3::new(0.0, 0.0, -60.0),
            ..VehicleConfig::default()
        };
        Self { sim: SimConfig::default(), vehicles: vec![evader, pursuer] }
    }
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self { sim: SimConfig::default(), vehicles: Vec::new() }
    }
}

/// Read and validate a scenario file.
pub fn load(path: impl AsRef<Path>) -> ConfigResult<ScenarioConfig> {
    let text = std::fs::read_to_string(path)?;
    ScenarioConfig::from_toml_str(&text)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENARIO: &str = r#"
        [sim]
        dt = 0.01
        max_time = 5.0
        seed = 3

        [[vehicle]]
        name = "runner"
        pilot = "evade"
        target = 1
        position = [0.0, 0.0, 0.0]

        [vehicle.engines]
        source = "powered"
        max_rotation_forces = [6.0, 6.0, 12.0]

        [vehicle.power]
        total_power = 1500.0

        [vehicle.evade]
        max_evade_angle_offset = 45.0

        [[vehicle]]
        name = "chaser"
        pilot = "pursue"
        target = 0
        position = [0.0, 0.0, -40.0]

        [vehicle.steering.pid.steering.x]
        kp = 2.0
        kd = 0.25
    "#;

    #[test]
    fn parses_full_scenario() {
        let s = ScenarioConfig::from_toml_str(SCENARIO).unwrap();
        assert_eq!(s.sim.dt, 0.01);
        assert_eq!(s.vehicles.len(), 2);

        let runner = &s.vehicles[0];
        assert_eq!(runner.pilot, PilotKind::Evade);
        assert_eq!(runner.engines.source, ForceSourceKind::Powered);
        assert_eq!(runner.engines.max_rotation_forces, Vector3::new(6.0, 6.0, 12.0));
        // Unlisted fields keep their defaults
        assert_eq!(runner.engines.default_translation_forces, Vector3::new(200.0, 200.0, 300.0));
        assert_eq!(runner.evade.weave_radius, 5.0);
        assert_eq!(runner.power.as_ref().map(|p| p.total_power), Some(1500.0));

        let chaser = &s.vehicles[1];
        assert_eq!(chaser.steering.pid.steering.x.kp, 2.0);
        assert_eq!(chaser.steering.max_rotation_angles, Vector3::new(360.0, 360.0, 45.0));
    }

    #[test]
    fn builds_world_from_scenario() {
        let s = ScenarioConfig::from_toml_str(SCENARIO).unwrap();
        let world = s.build_world().unwrap();
        let agents = world.agents();
        assert_eq!(agents.len(), 2);
        assert_eq!(agents[0].pilot_name(), "evade");
        assert_eq!(agents[1].pilot_name(), "pursue");
        assert!(agents[0].vehicle.power.is_some());
        assert_eq!(agents[1].vehicle.state().pos.z, -40.0);
    }

    #[test]
    fn dangling_target_disables_only_that_vehicle() {
        let text = r#"
            [[vehicle]]
            name = "lonely"
            pilot = "pursue"
            target = 4
        "#;
        let s = ScenarioConfig::from_toml_str(text).unwrap();
        let errors = s.vehicle_errors();
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], (0, ConfigError::InvalidParameter { name: "vehicle.target", .. })));

        let world = s.build_world().unwrap();
        let lonely = &world.agents()[0];
        assert!(lonely.pilot.is_none());
        assert!(lonely.target.is_none());
    }

    #[test]
    fn bad_vehicle_is_inert_and_the_rest_still_fly() {
        let text = r#"
            [sim]
            max_time = 10.0

            [[vehicle]]
            name = "broken"
            pilot = "evade"
            target = 1
            position = [0.0, 0.0, 80.0]
            [vehicle.engines]
            min_throttle = [0.5, -1.0, -1.0]
            max_throttle = [0.0, 1.0, 1.0]

            [[vehicle]]
            name = "hunter"
            pilot = "pursue"
            target = 0
        "#;
        let s = ScenarioConfig::from_toml_str(text).unwrap();
        assert!(matches!(s.vehicle_errors()[..], [(0, ConfigError::ThrottleLimits { .. })]));

        let mut world = s.build_world().unwrap();
        assert_eq!(world.agents().len(), 2);
        assert!(world.agents()[0].vehicle.engines.is_none());
        assert_eq!(world.agents()[1].pilot_name(), "pursue");

        let t = world.run();
        // Inert vehicle stays put; the hunter closes from 80 m
        assert_eq!(t.trajectories[0].last().unwrap().state.pos, Vector3::new(0.0, 0.0, 80.0));
        let range = t.trajectories[1].last().unwrap().target_range.unwrap();
        assert!(range < 60.0, "hunter ended {:.1} m out", range);
    }

    #[test]
    fn bad_sim_section_fails_whole_scenario() {
        let text = r#"
            [sim]
            dt = 0.0
        "#;
        assert!(matches!(ScenarioConfig::from_toml_str(text), Err(ConfigError::InvalidParameter { name: "sim.dt", .. })));
    }

    #[test]
    fn malformed_toml_is_parse_error() {
        assert!(matches!(ScenarioConfig::from_toml_str("[sim\ndt = 1"), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn massless_body_flies_inert_on_default_body() {
        let text = r#"
            [[vehicle]]
            name = "ghost"
            [vehicle.body]
            mass = 0.0
        "#;
        let s = ScenarioConfig::from_toml_str(text).unwrap();
        assert!(matches!(s.vehicle_errors()[..], [(0, ConfigError::DegenerateBody { .. })]));
        let world = s.build_world().unwrap();
        assert_eq!(world.agents()[0].vehicle.body.props.mass, BodyProperties::default().mass);
    }

    #[test]
    fn duel_is_valid() {
        let duel = ScenarioConfig::duel();
        duel.validate().unwrap();
        assert!(duel.vehicle_errors().is_empty());
        assert_eq!(duel.build_world().unwrap().agents().len(), 2);
    }
}
