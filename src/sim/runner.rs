use nalgebra::Vector3;
use tracing::{info, trace, warn};

use crate::dynamics::{SimConfig, State};
use crate::pilot::{GameState, Pilot, UpdateContext};
use crate::propulsion::ThrottleState;
use crate::vehicle::{Target, Vehicle};

use super::event::{EventDetector, SimEvent};

// ---------------------------------------------------------------------------
// Agents and telemetry
// ---------------------------------------------------------------------------

/// A vehicle, whoever is flying it, and the agent it tracks.
pub struct Agent {
    pub vehicle: Vehicle,
    pub pilot: Option<Box<dyn Pilot>>,
    pub target: Option<usize>,
    detectors: Vec<Box<dyn EventDetector>>,
}

impl Agent {
    pub fn pilot_name(&self) -> &str {
        self.pilot.as_deref().map_or("none", |p| p.name())
    }
}

/// One vehicle at one instant.
#[derive(Debug, Clone)]
pub struct Sample {
    pub time: f64,
    pub state: State,
    pub throttle: ThrottleState,
    pub applied_force: Vector3<f64>,    // body axes, N
    pub target_range: Option<f64>,      // m
}

#[derive(Debug, Clone, Default)]
pub struct Telemetry {
    pub names: Vec<String>,
    pub pilots: Vec<String>,
    /// One trajectory per vehicle, in world order.
    pub trajectories: Vec<Vec<Sample>>,
    pub events: Vec<SimEvent>,
}

// ---------------------------------------------------------------------------
// World: every vehicle on one fixed-step timeline
// ---------------------------------------------------------------------------

pub struct World {
    pub config: SimConfig,
    pub game_state: GameState,
    agents: Vec<Agent>,
    time: f64,
    started: bool,
}

impl World {
    pub fn new(config: SimConfig) -> Self {
        Self { config, game_state: GameState::Gameplay, agents: Vec::new(), time: 0.0, started: false }
    }

    /// Add a vehicle and return its index. `target` is another agent's index.
    pub fn add(&mut self, vehicle: Vehicle, pilot: Option<Box<dyn Pilot>>, target: Option<usize>) -> usize {
        self.agents.push(Agent { vehicle, pilot, target, detectors: Vec::new() });
        self.agents.len() - 1
    }

    pub fn add_detector(&mut self, agent: usize, detector: Box<dyn EventDetector>) {
        if let Some(a) = self.agents.get_mut(agent) {
            a.detectors.push(detector);
        }
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn agent_mut(&mut self, index: usize) -> Option<&mut Agent> {
        self.agents.get_mut(index)
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    /// Start every vehicle and its pilot. A pilot that fails to initialize
    /// is dropped; its vehicle keeps flying on whatever throttle it has.
    pub fn start(&mut self) {
        if self.started {
            return;
        }
        self.started = true;
        self.refresh_targets();
        for agent in &mut self.agents {
            agent.vehicle.start();
            let Some(pilot) = agent.pilot.as_deref_mut() else {
                continue;
            };
            match pilot.initialize(&agent.vehicle) {
                Ok(()) => pilot.start(&mut agent.vehicle),
                Err(err) => {
                    warn!(vehicle = %agent.vehicle.name, pilot = pilot.name(), %err, "pilot disabled");
                    agent.pilot = None;
                }
            }
        }
    }

    /// Copy each tracked agent's current position into its tracker's weapons.
    pub fn refresh_targets(&mut self) {
        let positions: Vec<Vector3<f64>> = self.agents.iter().map(|a| a.vehicle.state().pos).collect();
        for (i, agent) in self.agents.iter_mut().enumerate() {
            let target = agent
                .target
                .filter(|&j| j != i)
                .and_then(|j| positions.get(j).map(|&position| Target { id: j, position }));
            if let Some(weapons) = agent.vehicle.weapons.as_mut() {
                weapons.selected_target = target;
            }
        }
    }

    /// Advance one fixed step: targets, pilots, then forces and integration.
    pub fn step(&mut self) {
        self.refresh_targets();
        let ctx = UpdateContext { time: self.time, dt: self.config.dt, game_state: self.game_state };
        for agent in &mut self.agents {
            if let Some(pilot) = agent.pilot.as_deref_mut() {
                pilot.update(&mut agent.vehicle, &ctx);
            }
            agent.vehicle.fixed_step();
        }
        self.time += self.config.dt;
        trace!(time = self.time, "world step");
    }

    /// Stop every running pilot.
    pub fn stop(&mut self) {
        for agent in &mut self.agents {
            if let Some(pilot) = agent.pilot.as_deref_mut() {
                pilot.stop(&mut agent.vehicle);
            }
        }
    }

    pub fn sample(&self, index: usize) -> Option<Sample> {
        let agent = self.agents.get(index)?;
        let v = &agent.vehicle;
        let target_range = agent
            .target
            .filter(|&j| j != index)
            .and_then(|j| self.agents.get(j))
            .map(|t| (t.vehicle.state().pos - v.state().pos).norm());
        Some(Sample {
            time: self.time,
            state: v.state().clone(),
            throttle: v.controls().map(|c| *c.throttle()).unwrap_or_default(),
            applied_force: v.last_applied_force(),
            target_range,
        })
    }

    /// Run until `max_time`, recording every vehicle each step.
    pub fn run(&mut self) -> Telemetry {
        self.start();
        info!(vehicles = self.agents.len(), dt = self.config.dt, max_time = self.config.max_time, "simulation started");

        let n = self.agents.len();
        let steps = (self.config.max_time / self.config.dt).round() as usize;
        let cap = (steps + 1).min(200_000);
        let mut telemetry = Telemetry {
            names: self.agents.iter().map(|a| a.vehicle.name.clone()).collect(),
            pilots: self.agents.iter().map(|a| a.pilot_name().to_string()).collect(),
            trajectories: (0..n).map(|_| Vec::with_capacity(cap)).collect(),
            events: Vec::new(),
        };
        for (i, trajectory) in telemetry.trajectories.iter_mut().enumerate() {
            trajectory.extend(self.sample(i));
        }

        for _ in 0..steps {
            let prev: Vec<State> = self.agents.iter().map(|a| a.vehicle.state().clone()).collect();
            self.step();
            for i in 0..n {
                telemetry.trajectories[i].extend(self.sample(i));
                let agent = &mut self.agents[i];
                let current = agent.vehicle.state();
                for detector in &mut agent.detectors {
                    if let Some(kind) = detector.check(&prev[i], current) {
                        info!(vehicle = %agent.vehicle.name, time = self.time, ?kind, "flight event");
                        telemetry.events.push(SimEvent { time: self.time, vehicle: i, kind, state: current.clone() });
                    }
                }
            }
        }

        self.stop();
        info!(time = self.time, events = telemetry.events.len(), "simulation finished");
        telemetry
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behaviour::{Evade, EvadeConfig, Pursue, PursueConfig, SteeringConfig};
    use crate::dynamics::{BodyProperties, SimBody};
    use crate::vehicle::presets;

    fn config(max_time: f64) -> SimConfig {
        SimConfig { dt: 0.02, max_time, seed: 1 }
    }

    #[test]
    fn targets_follow_tracked_vehicle() {
        let mut w = World::new(config(1.0));
        let a = w.add(presets::fighter("a", Vector3::zeros(), 0.02).unwrap(), None, Some(1));
        w.add(presets::fighter("b", Vector3::new(0.0, 0.0, 40.0), 0.02).unwrap(), None, Some(1));
        w.refresh_targets();
        let agents = w.agents();
        assert_eq!(agents[a].vehicle.selected_target().map(|t| t.position.z), Some(40.0));
        // Self-targeting is ignored
        assert!(agents[1].vehicle.selected_target().is_none());
    }

    #[test]
    fn failed_pilot_is_dropped_and_others_run() {
        let mut w = World::new(config(2.0));
        let body = SimBody::new(State::at_rest(Vector3::new(0.0, 0.0, -20.0)), BodyProperties::default(), 0.02);
        let unarmed = Vehicle::new("unarmed", body);
        let evade = Evade::new(EvadeConfig::default(), SteeringConfig::default(), 1);
        w.add(unarmed, Some(Box::new(evade)), Some(1));
        let pursue = Pursue::new(PursueConfig::default(), SteeringConfig::default());
        w.add(presets::fighter("hunter", Vector3::zeros(), 0.02).unwrap(), Some(Box::new(pursue)), Some(0));

        let telemetry = w.run();
        assert!(w.agents()[0].pilot.is_none());
        assert_eq!(telemetry.pilots, vec!["none".to_string(), "pursue".to_string()]);
        let steps = telemetry.trajectories[1].len();
        assert_eq!(steps, 101);
        assert!(telemetry.trajectories[1].iter().any(|s| s.throttle.steering.norm() > 0.0));
    }

    #[test]
    fn run_records_every_step_and_stops_pilots() {
        let mut w = World::new(config(1.0));
        let evade = Evade::new(EvadeConfig::default(), SteeringConfig::default(), 3);
        w.add(presets::fighter("e", Vector3::zeros(), 0.02).unwrap(), Some(Box::new(evade)), Some(1));
        w.add(presets::fighter("idle", Vector3::new(0.0, 0.0, -30.0), 0.02).unwrap(), None, None);
        let t = w.run();
        assert_eq!(t.trajectories[0].len(), 51);
        assert!((w.time() - 1.0).abs() < 1e-9);
        let last = &t.trajectories[0][50];
        assert!(last.target_range.is_some_and(|r| r > 30.0));
        // Stopped pilot released the throttle
        assert_eq!(w.agents()[0].vehicle.controls().unwrap().translation_throttle_values(), Vector3::zeros());
        assert!(!w.agents()[0].pilot.as_ref().unwrap().is_running());
    }
}
