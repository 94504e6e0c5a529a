use nalgebra::Vector3;

use crate::dynamics::State;

// ---------------------------------------------------------------------------
// Guidance: angular error needed to point the nose at a world position
// ---------------------------------------------------------------------------

/// Per-axis steering error that turns the body +Z axis toward `target`.
///
/// Each component is the signed angle (degrees) of the rotation about that
/// body axis which reduces the error, divided by the matching entry of
/// `max_rotation_angles` and clamped to [-1, 1]:
/// - X (pitch): positive rotation swings the nose toward body -Y.
/// - Y (yaw): positive rotation swings the nose toward body +X.
/// - Z (roll): positive rotation swings body +Y toward body -X, so the
///   vehicle banks its top toward the target.
///
/// Roll is weighted by how far off the nose the target sits (off-axis angle
/// over the roll max angle), so it fades out as the nose comes on target.
///
/// A target at the vehicle position yields zero error.
pub fn turn_toward(state: &State, target: &Vector3<f64>, max_rotation_angles: &Vector3<f64>) -> Vector3<f64> {
    let to_target = target - state.pos;
    if to_target.norm() < 1e-9 {
        return Vector3::zeros();
    }
    let local = state.quat.inverse() * to_target;

    let pitch = (-local.y).atan2(local.z).to_degrees();
    let yaw = local.x.atan2(local.z).to_degrees();
    let lateral = local.x.hypot(local.y);
    let roll = if lateral > 1e-9 {
        let off_axis = lateral.atan2(local.z).to_degrees();
        let weight = if max_rotation_angles.z > 0.0 {
            (off_axis / max_rotation_angles.z).clamp(0.0, 1.0)
        } else {
            0.0
        };
        (-local.x).atan2(local.y).to_degrees() * weight
    } else {
        0.0
    };

    Vector3::new(
        normalize_angle(pitch, max_rotation_angles.x),
        normalize_angle(yaw, max_rotation_angles.y),
        normalize_angle(roll, max_rotation_angles.z),
    )
}

fn normalize_angle(angle_deg: f64, max_deg: f64) -> f64 {
    if max_deg <= 0.0 {
        return 0.0;
    }
    (angle_deg / max_deg).clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> State {
        State::at_rest(Vector3::zeros())
    }

    fn wide() -> Vector3<f64> {
        Vector3::new(180.0, 180.0, 180.0)
    }

    #[test]
    fn dead_ahead_has_no_error() {
        let e = turn_toward(&origin(), &Vector3::new(0.0, 0.0, 50.0), &wide());
        assert!(e.norm() < 1e-12, "got {:?}", e);
    }

    #[test]
    fn target_above_pitches_negative() {
        let e = turn_toward(&origin(), &Vector3::new(0.0, 10.0, 10.0), &wide());
        assert!((e.x + 0.25).abs() < 1e-9, "45 deg up over 180 deg max, got {}", e.x);
        assert!(e.y.abs() < 1e-12);
    }

    #[test]
    fn target_to_side_yaws_positive() {
        let e = turn_toward(&origin(), &Vector3::new(10.0, 0.0, 10.0), &wide());
        assert!(e.y > 0.0);
        assert!(e.x.abs() < 1e-12);
        // Bank top toward +X: negative roll
        assert!(e.z < 0.0);
    }

    #[test]
    fn roll_fades_near_alignment() {
        let max = Vector3::new(360.0, 360.0, 45.0);
        let near = turn_toward(&origin(), &Vector3::new(0.1, 0.0, 100.0), &max);
        let far = turn_toward(&origin(), &Vector3::new(100.0, 0.0, 1.0), &max);
        assert!(near.z.abs() < 0.01, "roll should be nearly off, got {}", near.z);
        assert!((far.z + 1.0).abs() < 1e-9, "roll should saturate, got {}", far.z);
    }

    #[test]
    fn errors_are_clamped_by_max_angle() {
        let max = Vector3::new(10.0, 10.0, 10.0);
        let e = turn_toward(&origin(), &Vector3::new(0.0, 0.0, -10.0), &max);
        assert!(e.x.abs() <= 1.0 && e.y.abs() <= 1.0);
        assert!((e.y.abs() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn zero_max_angle_disables_axis() {
        let e = turn_toward(&origin(), &Vector3::new(10.0, 10.0, 0.0), &Vector3::new(0.0, 90.0, 0.0));
        assert_eq!(e.x, 0.0);
        assert_eq!(e.z, 0.0);
        assert!(e.y > 0.0);
    }
}
