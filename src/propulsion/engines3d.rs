use nalgebra::Vector3;
use tracing::trace;

use crate::dynamics::{ForceMode, RigidBody};
use crate::error::{AxisLabel, ConfigError, ConfigResult};

use super::engines::{Engines, Propulsion};
use super::power::{PowerSource, PoweredSubsystem, SubsystemPowerConfiguration};

/// Boost throttle above this engages full translation throttle on that axis.
const BOOST_ENGAGE_THRESHOLD: f64 = 0.5;

// ---------------------------------------------------------------------------
// Force budget: default, available and ceiling forces per axis
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct ForceBudget {
    pub available_translation: Vector3<f64>,    // N
    pub available_rotation: Vector3<f64>,       // rad/s^2 (acceleration torque)
    pub available_boost: Vector3<f64>,          // N
    pub max_translation: Vector3<f64>,
    pub max_rotation: Vector3<f64>,
    pub default_translation: Vector3<f64>,
    pub default_rotation: Vector3<f64>,
    pub default_boost: Vector3<f64>,
}

impl ForceBudget {
    pub fn validate(&self) -> ConfigResult<()> {
        let fields = [
            ("max_translation_forces", &self.max_translation),
            ("max_rotation_forces", &self.max_rotation),
            ("default_translation_forces", &self.default_translation),
            ("default_rotation_forces", &self.default_rotation),
            ("default_boost_forces", &self.default_boost),
        ];
        for (field, v) in fields {
            for (i, axis) in AxisLabel::ALL.into_iter().enumerate() {
                if !(v[i] >= 0.0 && v[i].is_finite()) {
                    return Err(ConfigError::InvalidForce { field, axis, value: v[i] });
                }
            }
        }
        Ok(())
    }

    /// Seed available forces from the defaults, under the ceilings.
    pub fn reset_to_defaults(&mut self) {
        self.available_translation = min3(&self.default_translation, &self.max_translation);
        self.available_rotation = min3(&self.default_rotation, &self.max_rotation);
        self.available_boost = self.default_boost;
    }
}

impl Default for ForceBudget {
    fn default() -> Self {
        Self {
            available_translation: Vector3::zeros(),
            available_rotation: Vector3::zeros(),
            available_boost: Vector3::zeros(),
            max_translation: Vector3::new(400.0, 400.0, 600.0),
            max_rotation: Vector3::new(8.0, 8.0, 18.0),
            default_translation: Vector3::new(200.0, 200.0, 300.0),
            default_rotation: Vector3::new(8.0, 8.0, 18.0),
            default_boost: Vector3::new(200.0, 200.0, 300.0),
        }
    }
}

/// Where available translation and rotation forces come from.
#[derive(Debug, Clone, PartialEq)]
pub enum ForceSource {
    /// Available forces stay at the defaults seeded on start.
    FixedDefault,
    /// Available forces follow the power delivered to the engines subsystem.
    /// Boost forces are never recomputed.
    PowerDerived {
        rotation_coefficients: Vector3<f64>,
        translation_coefficients: Vector3<f64>,
    },
}

impl ForceSource {
    pub fn power_derived() -> Self {
        ForceSource::PowerDerived {
            rotation_coefficients: Vector3::new(0.1, 0.1, 0.2),
            translation_coefficients: Vector3::new(0.1, 0.1, 0.2),
        }
    }
}

// ---------------------------------------------------------------------------
// 3D engine force model
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct VehicleEngines3D {
    controls: Engines,
    budget: ForceBudget,
    source: ForceSource,
    /// Boosting an axis also drives its translation throttle to full.
    pub apply_translation_forces_during_boost: bool,
    last_force: Vector3<f64>,
    last_torque: Vector3<f64>,
}

impl VehicleEngines3D {
    pub fn new(controls: Engines, budget: ForceBudget, source: ForceSource) -> ConfigResult<Self> {
        budget.validate()?;
        Ok(Self {
            controls,
            budget,
            source,
            apply_translation_forces_during_boost: true,
            last_force: Vector3::zeros(),
            last_torque: Vector3::zeros(),
        })
    }

    pub fn budget(&self) -> &ForceBudget {
        &self.budget
    }

    pub fn source(&self) -> &ForceSource {
        &self.source
    }

    pub fn available_translation_forces(&self) -> Vector3<f64> {
        self.budget.available_translation
    }

    pub fn available_rotation_forces(&self) -> Vector3<f64> {
        self.budget.available_rotation
    }

    pub fn available_boost_forces(&self) -> Vector3<f64> {
        self.budget.available_boost
    }

    pub fn last_applied_torque(&self) -> Vector3<f64> {
        self.last_torque
    }

    /// Replace the hard ceilings. Current available forces are re-clamped.
    pub fn set_force_limits(&mut self, max_translation: Vector3<f64>, max_rotation: Vector3<f64>) -> ConfigResult<()> {
        let mut next = self.budget.clone();
        next.max_translation = max_translation;
        next.max_rotation = max_rotation;
        next.validate()?;
        next.available_translation = min3(&next.available_translation, &max_translation);
        next.available_rotation = min3(&next.available_rotation, &max_rotation);
        self.budget = next;
        Ok(())
    }

    /// Boost override applied to the commanded translation throttle.
    pub fn next_translation_throttle_values(&self) -> Vector3<f64> {
        let throttle = self.controls.throttle();
        let mut next = throttle.translation;
        if self.apply_translation_forces_during_boost {
            let min = self.controls.min_translation_throttle_values();
            let max = self.controls.max_translation_throttle_values();
            for i in 0..2 {
                if throttle.boost[i] > BOOST_ENGAGE_THRESHOLD {
                    next[i] = sign(next[i]).clamp(min[i], max[i]);
                }
            }
            // Forward boost always pushes forward, whatever the throttle sign.
            if throttle.boost.z > BOOST_ENGAGE_THRESHOLD {
                next.z = 1.0_f64.clamp(min.z, max.z);
            }
        }
        next
    }

    /// Body-relative force for the current throttle, after the ceiling clamp.
    ///
    /// Only the upper bound is enforced; negative sums pass through.
    pub fn next_forces(&self) -> Vector3<f64> {
        let throttle = self.next_translation_throttle_values();
        let boost = self.controls.boost_throttle_values();
        let forces = throttle.component_mul(&self.budget.available_translation)
            + boost.component_mul(&self.budget.available_boost);
        min3(&forces, &self.budget.max_translation)
    }

    /// Steering torque (as angular acceleration) for the current throttle.
    pub fn next_torque(&self) -> Vector3<f64> {
        self.controls.steering_values().component_mul(&self.budget.available_rotation)
    }

    /// Terminal speed reached under a constant force against linear drag.
    pub fn speed_from_force(force: f64, body: &dyn RigidBody) -> ConfigResult<f64> {
        let mass = body.mass();
        let dt = body.fixed_delta_time();
        let drag = body.linear_drag();
        if !(mass > 0.0) || !(dt > 0.0) || !(drag >= 0.0) {
            return Err(ConfigError::DegenerateBody { mass, drag, dt });
        }

        let delta_v_thrust = (force / mass) * dt;
        let drag_factor = dt * drag;
        if drag_factor == 0.0 {
            // No drag: no terminal speed
            return Ok(if force == 0.0 { 0.0 } else { f64::INFINITY.copysign(force) });
        }
        Ok(delta_v_thrust / drag_factor)
    }

    fn speed_envelope(&self, forces: Vector3<f64>, body: &dyn RigidBody) -> ConfigResult<Vector3<f64>> {
        let clamped = min3(&forces, &self.budget.max_translation);
        Ok(Vector3::new(
            Self::speed_from_force(clamped.x, body)?,
            Self::speed_from_force(clamped.y, body)?,
            Self::speed_from_force(clamped.z, body)?,
        ))
    }
}

impl Propulsion for VehicleEngines3D {
    fn controls(&self) -> &Engines {
        &self.controls
    }

    fn controls_mut(&mut self) -> &mut Engines {
        &mut self.controls
    }

    fn start(&mut self) {
        self.controls.start();
        self.budget.reset_to_defaults();
    }

    fn update_available_forces(&mut self, power: Option<&dyn PowerSource>) {
        let ForceSource::PowerDerived { rotation_coefficients, translation_coefficients } = &self.source else {
            return;
        };
        let Some(power) = power else {
            return;
        };

        let b = &mut self.budget;
        if power.power_configuration(PoweredSubsystem::Engines) != SubsystemPowerConfiguration::Unpowered {
            let engine_power = power.subsystem_total_power(PoweredSubsystem::Engines);
            b.available_rotation = rotation_coefficients * engine_power;
            b.available_translation = translation_coefficients * engine_power;
        } else {
            b.available_rotation = b.default_rotation;
            b.available_translation = b.default_translation;
        }

        b.available_rotation = min3(&b.available_rotation, &b.max_rotation);
        b.available_translation = min3(&b.available_translation, &b.max_translation);
    }

    fn fixed_step(&mut self, body: &mut dyn RigidBody) {
        if !self.controls.activated() {
            self.last_force = Vector3::zeros();
            self.last_torque = Vector3::zeros();
            return;
        }

        let torque = self.next_torque();
        body.apply_relative_torque(torque, ForceMode::Acceleration);

        let force = self.next_forces();
        body.apply_relative_force(force);

        trace!(?force, ?torque, "engine forces applied");
        self.last_force = force;
        self.last_torque = torque;
    }

    fn default_max_speed_by_axis(&self, with_boost: bool, body: &dyn RigidBody) -> ConfigResult<Vector3<f64>> {
        let b = &self.budget;
        let boost = if with_boost { b.default_boost } else { Vector3::zeros() };
        self.speed_envelope(b.default_translation + boost, body)
    }

    fn current_max_speed_by_axis(&self, with_boost: bool, body: &dyn RigidBody) -> ConfigResult<Vector3<f64>> {
        let b = &self.budget;
        let boost = if with_boost { b.available_boost } else { Vector3::zeros() };
        self.speed_envelope(b.available_translation + boost, body)
    }

    fn force_budget(&self) -> Option<&ForceBudget> {
        Some(&self.budget)
    }

    fn last_applied_force(&self) -> Vector3<f64> {
        self.last_force
    }

    fn name(&self) -> &str {
        match self.source {
            ForceSource::FixedDefault => "VehicleEngines3D",
            ForceSource::PowerDerived { .. } => "PoweredVehicleEngines3D",
        }
    }
}

/// `sign(0) == 1`, matching the throttle convention that zero means forward.
fn sign(x: f64) -> f64 {
    if x >= 0.0 {
        1.0
    } else {
        -1.0
    }
}

fn min3(a: &Vector3<f64>, b: &Vector3<f64>) -> Vector3<f64> {
    a.zip_map(b, f64::min)
}

// ---------------------------------------------------------------------------
// Engine builder
// ---------------------------------------------------------------------------

pub struct VehicleEngines3DBuilder {
    min_throttle: Vector3<f64>,
    max_throttle: Vector3<f64>,
    activate_at_start: bool,
    budget: ForceBudget,
    source: ForceSource,
    apply_translation_forces_during_boost: bool,
}

impl VehicleEngines3DBuilder {
    pub fn new() -> Self {
        let controls = Engines::new();
        Self {
            min_throttle: controls.min_translation_throttle_values(),
            max_throttle: controls.max_translation_throttle_values(),
            activate_at_start: true,
            budget: ForceBudget::default(),
            source: ForceSource::FixedDefault,
            apply_translation_forces_during_boost: true,
        }
    }

    pub fn throttle_limits(mut self, min: Vector3<f64>, max: Vector3<f64>) -> Self { self.min_throttle = min; self.max_throttle = max; self }
    pub fn activate_at_start(mut self, v: bool) -> Self { self.activate_at_start = v; self }
    pub fn default_translation_forces(mut self, v: Vector3<f64>) -> Self { self.budget.default_translation = v; self }
    pub fn default_rotation_forces(mut self, v: Vector3<f64>) -> Self { self.budget.default_rotation = v; self }
    pub fn default_boost_forces(mut self, v: Vector3<f64>) -> Self { self.budget.default_boost = v; self }
    pub fn max_translation_forces(mut self, v: Vector3<f64>) -> Self { self.budget.max_translation = v; self }
    pub fn max_rotation_forces(mut self, v: Vector3<f64>) -> Self { self.budget.max_rotation = v; self }
    pub fn source(mut self, v: ForceSource) -> Self { self.source = v; self }
    pub fn apply_translation_forces_during_boost(mut self, v: bool) -> Self { self.apply_translation_forces_during_boost = v; self }

    pub fn build(self) -> ConfigResult<VehicleEngines3D> {
        let mut controls = Engines::with_limits(self.min_throttle, self.max_throttle)?;
        controls.activate_at_start = self.activate_at_start;
        let mut engines = VehicleEngines3D::new(controls, self.budget, self.source)?;
        engines.apply_translation_forces_during_boost = self.apply_translation_forces_during_boost;
        Ok(engines)
    }
}

impl Default for VehicleEngines3DBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamics::{BodyProperties, SimBody, State};
    use crate::propulsion::power::Power;

    fn body() -> SimBody {
        SimBody::new(State::at_rest(Vector3::zeros()), BodyProperties::default(), 0.02)
    }

    fn started(builder: VehicleEngines3DBuilder) -> VehicleEngines3D {
        let mut e = builder.build().unwrap();
        e.start();
        e
    }

    #[test]
    fn start_seeds_defaults_and_activates() {
        let e = started(VehicleEngines3DBuilder::new());
        assert!(e.controls().activated());
        assert_eq!(e.available_translation_forces(), Vector3::new(200.0, 200.0, 300.0));
        assert_eq!(e.available_rotation_forces(), Vector3::new(8.0, 8.0, 18.0));
        assert_eq!(e.available_boost_forces(), Vector3::new(200.0, 200.0, 300.0));
    }

    #[test]
    fn full_forward_throttle_applies_default_thrust() {
        let mut e = started(VehicleEngines3DBuilder::new());
        let mut b = body();
        e.controls_mut().set_translation_throttle_values(Vector3::new(0.0, 0.0, 1.0));
        e.fixed_step(&mut b);
        assert_eq!(e.last_applied_force(), Vector3::new(0.0, 0.0, 300.0));
        assert!((b.pending_acceleration() - Vector3::new(0.0, 0.0, 300.0)).norm() < 1e-9);
    }

    #[test]
    fn steering_applies_acceleration_torque() {
        let mut e = started(VehicleEngines3DBuilder::new());
        let mut b = body();
        b.props.inertia = Vector3::new(10.0, 10.0, 10.0);
        e.controls_mut().set_rotation_throttle_values(Vector3::new(0.5, -1.0, 1.0));
        e.fixed_step(&mut b);
        assert!((b.pending_angular_acceleration() - Vector3::new(4.0, -8.0, 18.0)).norm() < 1e-9);
    }

    #[test]
    fn deactivated_engines_apply_nothing() {
        let mut e = started(VehicleEngines3DBuilder::new());
        let mut b = body();
        e.controls_mut().set_translation_throttle_values(Vector3::new(0.0, 0.0, 1.0));
        e.controls_mut().set_engine_activation(false);
        e.controls_mut().set_boost_throttle_values(Vector3::new(0.0, 0.0, 1.0));
        e.fixed_step(&mut b);
        assert_eq!(b.pending_acceleration(), Vector3::zeros());
    }

    #[test]
    fn boost_forward_overrides_reverse_throttle() {
        let mut e = started(
            VehicleEngines3DBuilder::new().throttle_limits(Vector3::new(-1.0, -1.0, -1.0), Vector3::new(1.0, 1.0, 1.0)),
        );
        e.controls_mut().set_translation_throttle_values(Vector3::new(0.0, 0.0, -1.0));
        e.controls_mut().set_boost_throttle_values(Vector3::new(0.0, 0.0, 0.8));
        assert_eq!(e.next_translation_throttle_values().z, 1.0);
    }

    #[test]
    fn boost_forward_respects_max_throttle() {
        let mut e = started(
            VehicleEngines3DBuilder::new().throttle_limits(Vector3::new(-1.0, -1.0, -1.0), Vector3::new(1.0, 1.0, 0.6)),
        );
        e.controls_mut().set_translation_throttle_values(Vector3::new(0.0, 0.0, -1.0));
        e.controls_mut().set_boost_throttle_values(Vector3::new(0.0, 0.0, 1.0));
        assert!((e.next_translation_throttle_values().z - 0.6).abs() < 1e-12);
    }

    #[test]
    fn lateral_boost_follows_throttle_sign() {
        let mut e = started(VehicleEngines3DBuilder::new());
        e.controls_mut().set_translation_throttle_values(Vector3::new(-0.2, 0.0, 0.0));
        e.controls_mut().set_boost_throttle_values(Vector3::new(0.9, 0.9, 0.0));
        let next = e.next_translation_throttle_values();
        assert_eq!(next.x, -1.0);
        assert_eq!(next.y, 1.0, "zero throttle boosts in the positive direction");
    }

    #[test]
    fn boost_at_threshold_does_not_engage() {
        let mut e = started(VehicleEngines3DBuilder::new());
        e.controls_mut().set_translation_throttle_values(Vector3::new(0.0, 0.0, 0.2));
        e.controls_mut().set_boost_throttle_values(Vector3::new(0.0, 0.0, 0.5));
        assert!((e.next_translation_throttle_values().z - 0.2).abs() < 1e-12);
    }

    #[test]
    fn boost_override_disabled() {
        let mut e = started(VehicleEngines3DBuilder::new().apply_translation_forces_during_boost(false));
        e.controls_mut().set_boost_throttle_values(Vector3::new(0.0, 0.0, 1.0));
        assert_eq!(e.next_translation_throttle_values(), Vector3::zeros());
        // Boost force alone
        assert_eq!(e.next_forces(), Vector3::new(0.0, 0.0, 300.0));
    }

    #[test]
    fn forces_clamped_to_ceiling_from_above_only() {
        let mut e = started(VehicleEngines3DBuilder::new());
        e.controls_mut().set_translation_throttle_values(Vector3::new(-1.0, 1.0, 1.0));
        e.controls_mut().set_boost_throttle_values(Vector3::new(-1.0, 1.0, 1.0));
        let f = e.next_forces();
        // x: -200 + -200 passes through; y: 200 + 200 = 400 at ceiling; z: 300 + 300 = 600
        assert_eq!(f, Vector3::new(-400.0, 400.0, 600.0));

        e.set_force_limits(Vector3::new(100.0, 100.0, 100.0), Vector3::new(8.0, 8.0, 18.0)).unwrap();
        let f = e.next_forces();
        // Available translation was re-clamped to 100; boost keeps its 200/300.
        assert_eq!(f, Vector3::new(-300.0, 100.0, 100.0));
    }

    #[test]
    fn speed_inversion_matches_drag_model() {
        // m=1, d=3, dt=0.02, F=200 → dv=4, drag factor 0.06
        let b = body();
        let v = VehicleEngines3D::speed_from_force(200.0, &b).unwrap();
        assert!((v - 200.0 / 3.0).abs() < 1e-9, "got {}", v);
    }

    #[test]
    fn speed_inversion_without_drag_is_unbounded() {
        let mut b = body();
        b.props.drag = 0.0;
        assert_eq!(VehicleEngines3D::speed_from_force(10.0, &b).unwrap(), f64::INFINITY);
        assert_eq!(VehicleEngines3D::speed_from_force(-10.0, &b).unwrap(), f64::NEG_INFINITY);
        assert_eq!(VehicleEngines3D::speed_from_force(0.0, &b).unwrap(), 0.0);
    }

    #[test]
    fn speed_inversion_rejects_massless_body() {
        let mut b = body();
        b.props.mass = 0.0;
        assert!(matches!(
            VehicleEngines3D::speed_from_force(10.0, &b),
            Err(ConfigError::DegenerateBody { .. })
        ));
    }

    #[test]
    fn max_speed_envelopes() {
        let e = started(VehicleEngines3DBuilder::new());
        let b = body();
        let plain = e.default_max_speed_by_axis(false, &b).unwrap();
        assert!((plain - Vector3::new(200.0, 200.0, 300.0) / 3.0).norm() < 1e-9);
        // With boost: (400, 400, 600), exactly at the ceiling
        let boosted = e.current_max_speed_by_axis(true, &b).unwrap();
        assert!((boosted - Vector3::new(400.0, 400.0, 600.0) / 3.0).norm() < 1e-9);
    }

    #[test]
    fn power_derived_forces_follow_engine_power() {
        let mut e = started(VehicleEngines3DBuilder::new().source(ForceSource::power_derived()));
        let power = Power::new(3000.0); // 1000 to engines
        e.update_available_forces(Some(&power));
        // rotation: 1000 * (0.1, 0.1, 0.2) = (100, 100, 200) → ceiling (8, 8, 18)
        assert_eq!(e.available_rotation_forces(), Vector3::new(8.0, 8.0, 18.0));
        // translation: (100, 100, 200) under the (400, 400, 600) ceiling
        assert!((e.available_translation_forces() - Vector3::new(100.0, 100.0, 200.0)).norm() < 1e-9);
        // boost untouched
        assert_eq!(e.available_boost_forces(), Vector3::new(200.0, 200.0, 300.0));
    }

    #[test]
    fn power_derived_forces_never_exceed_ceiling() {
        let mut e = started(VehicleEngines3DBuilder::new().source(ForceSource::power_derived()));
        for total in [0.0, 10.0, 3_000.0, 1.0e7] {
            let power = Power::new(total);
            e.update_available_forces(Some(&power));
            let b = e.budget();
            for i in 0..3 {
                assert!(b.available_translation[i] <= b.max_translation[i]);
                assert!(b.available_rotation[i] <= b.max_rotation[i]);
            }
        }
    }

    #[test]
    fn unpowered_engines_fall_back_to_defaults() {
        let mut e = started(
            VehicleEngines3DBuilder::new()
                .source(ForceSource::power_derived())
                .default_rotation_forces(Vector3::new(20.0, 20.0, 20.0)),
        );
        let mut power = Power::new(3000.0);
        power.set_power_configuration(PoweredSubsystem::Engines, SubsystemPowerConfiguration::Unpowered);
        e.update_available_forces(Some(&power));
        assert_eq!(e.available_translation_forces(), Vector3::new(200.0, 200.0, 300.0));
        // Default above ceiling is still clamped
        assert_eq!(e.available_rotation_forces(), Vector3::new(8.0, 8.0, 18.0));
    }

    #[test]
    fn fixed_default_ignores_power() {
        let mut e = started(VehicleEngines3DBuilder::new());
        e.update_available_forces(Some(&Power::new(1.0)));
        assert_eq!(e.available_translation_forces(), Vector3::new(200.0, 200.0, 300.0));
    }

    #[test]
    fn negative_default_force_rejected() {
        let err = VehicleEngines3DBuilder::new()
            .default_boost_forces(Vector3::new(0.0, -1.0, 0.0))
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidForce { field: "default_boost_forces", .. }));
    }
}
