use nalgebra::UnitQuaternion;

use crate::dynamics::{RigidBody, SimBody};

// ---------------------------------------------------------------------------
// Fixed-step semi-implicit Euler with first-order drag
// ---------------------------------------------------------------------------

/// Advance a body by one fixed step using the accelerations accumulated
/// since the last step.
///
/// Drag is applied as `v_next = (v + a*dt) / (1 + drag*dt)`, which is the
/// model `VehicleEngines3D::speed_from_force` inverts: terminal speed is
/// reached where `a*dt == v*drag*dt`.
pub fn step_body(body: &mut SimBody) {
    let dt = body.fixed_delta_time();
    let drag = body.props.drag;
    let angular_drag = body.props.angular_drag;
    let (accel, alpha) = body.drain_pending();

    let s = &mut body.state;
    s.vel = (s.vel + accel * dt) / (1.0 + drag * dt);
    s.omega = (s.omega + alpha * dt) / (1.0 + angular_drag * dt);
    s.pos += s.vel * dt;

    // World-frame angular velocity: pre-multiply the incremental rotation.
    let dq = UnitQuaternion::from_scaled_axis(s.omega * dt);
    s.quat = UnitQuaternion::new_normalize((dq * s.quat).into_inner());
    s.time += dt;
}
