use serde::Deserialize;

use crate::error::{ConfigError, ConfigResult};

// ---------------------------------------------------------------------------
// Power subsystem: splits generated power between vehicle subsystems
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoweredSubsystem {
    Engines,
    Weapons,
    Health,
}

impl PoweredSubsystem {
    pub const ALL: [PoweredSubsystem; 3] = [
        PoweredSubsystem::Engines,
        PoweredSubsystem::Weapons,
        PoweredSubsystem::Health,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubsystemPowerConfiguration {
    Unpowered,
    /// Receives only its fixed share of total power.
    Fixed,
    /// Receives its fixed share plus a slice of the distributable pool.
    #[default]
    Distributable,
}

/// Read-only view of a vehicle's power allocation.
pub trait PowerSource {
    fn power_configuration(&self, subsystem: PoweredSubsystem) -> SubsystemPowerConfiguration;

    fn subsystem_total_power(&self, subsystem: PoweredSubsystem) -> f64;
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct SubsystemPower {
    pub configuration: SubsystemPowerConfiguration,
    pub fixed_fraction: f64,            // of total power
    pub distributable_fraction: f64,    // weight within the distributable pool
}

impl Default for SubsystemPower {
    fn default() -> Self {
        Self {
            configuration: SubsystemPowerConfiguration::Distributable,
            fixed_fraction: 0.0,
            distributable_fraction: 1.0 / 3.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Power {
    pub total_power: f64,               // kW
    pub engines: SubsystemPower,
    pub weapons: SubsystemPower,
    pub health: SubsystemPower,
}

impl Power {
    pub fn new(total_power: f64) -> Self {
        Self { total_power, ..Self::default() }
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if !(self.total_power >= 0.0 && self.total_power.is_finite()) {
            return Err(ConfigError::InvalidParameter {
                name: "power.total_power",
                reason: format!("must be finite and non-negative, got {}", self.total_power),
            });
        }
        let fixed: f64 = self.subsystems().iter().map(|s| s.fixed_fraction).sum();
        if self.subsystems().iter().any(|s| !(0.0..=1.0).contains(&s.fixed_fraction)) || fixed > 1.0 + 1e-9 {
            return Err(ConfigError::InvalidParameter {
                name: "power.fixed_fraction",
                reason: format!("fixed fractions must lie in [0, 1] and sum to at most 1, got {}", fixed),
            });
        }
        Ok(())
    }

    pub fn subsystem(&self, kind: PoweredSubsystem) -> &SubsystemPower {
        match kind {
            PoweredSubsystem::Engines => &self.engines,
            PoweredSubsystem::Weapons => &self.weapons,
            PoweredSubsystem::Health => &self.health,
        }
    }

    pub fn subsystem_mut(&mut self, kind: PoweredSubsystem) -> &mut SubsystemPower {
        match kind {
            PoweredSubsystem::Engines => &mut self.engines,
            PoweredSubsystem::Weapons => &mut self.weapons,
            PoweredSubsystem::Health => &mut self.health,
        }
    }

    pub fn set_power_configuration(&mut self, kind: PoweredSubsystem, configuration: SubsystemPowerConfiguration) {
        self.subsystem_mut(kind).configuration = configuration;
    }

    /// Fraction is clamped to [0, 1].
    pub fn set_subsystem_distributable_power_fraction(&mut self, kind: PoweredSubsystem, fraction: f64) {
        self.subsystem_mut(kind).distributable_fraction = fraction.clamp(0.0, 1.0);
    }

    /// Power left after every powered subsystem has taken its fixed share.
    pub fn distributable_power(&self) -> f64 {
        let fixed: f64 = self
            .subsystems()
            .iter()
            .filter(|s| s.configuration != SubsystemPowerConfiguration::Unpowered)
            .map(|s| s.fixed_fraction)
            .sum();
        (self.total_power * (1.0 - fixed)).max(0.0)
    }

    /// This subsystem's slice of the distributable pool.
    pub fn subsystem_distributable_power(&self, kind: PoweredSubsystem) -> f64 {
        let sub = self.subsystem(kind);
        if sub.configuration != SubsystemPowerConfiguration::Distributable {
            return 0.0;
        }
        let weight_sum: f64 = self
            .subsystems()
            .iter()
            .filter(|s| s.configuration == SubsystemPowerConfiguration::Distributable)
            .map(|s| s.distributable_fraction)
            .sum();
        if weight_sum <= 0.0 {
            return 0.0;
        }
        self.distributable_power() * sub.distributable_fraction / weight_sum
    }

    fn subsystems(&self) -> [&SubsystemPower; 3] {
        [&self.engines, &self.weapons, &self.health]
    }
}

impl Default for Power {
    fn default() -> Self {
        Self {
            total_power: 1000.0,
            engines: SubsystemPower::default(),
            weapons: SubsystemPower::default(),
            health: SubsystemPower::default(),
        }
    }
}

impl PowerSource for Power {
    fn power_configuration(&self, subsystem: PoweredSubsystem) -> SubsystemPowerConfiguration {
        self.subsystem(subsystem).configuration
    }

    fn subsystem_total_power(&self, subsystem: PoweredSubsystem) -> f64 {
        let sub = self.subsystem(subsystem);
        if sub.configuration == SubsystemPowerConfiguration::Unpowered {
            return 0.0;
        }
        self.total_power * sub.fixed_fraction + self.subsystem_distributable_power(subsystem)
    }
}
