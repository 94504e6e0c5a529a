use std::io::{self, Write};

use crate::sim::Telemetry;

/// Write per-vehicle telemetry to CSV, one row per vehicle per step.
///
/// Columns: time, vehicle, pos_x, pos_y, pos_z, vel_x, vel_y, vel_z, speed,
///          steer_x, steer_y, steer_z, thr_x, thr_y, thr_z,
///          boost_x, boost_y, boost_z, force_x, force_y, force_z, target_range
pub fn write_telemetry<W: Write>(writer: &mut W, telemetry: &Telemetry) -> io::Result<()> {
    writeln!(
        writer,
        "time,vehicle,pos_x,pos_y,pos_z,vel_x,vel_y,vel_z,speed,\
         steer_x,steer_y,steer_z,thr_x,thr_y,thr_z,\
         boost_x,boost_y,boost_z,force_x,force_y,force_z,target_range"
    )?;

    let steps = telemetry.trajectories.iter().map(Vec::len).max().unwrap_or(0);
    for step in 0..steps {
        for (name, trajectory) in telemetry.names.iter().zip(&telemetry.trajectories) {
            let Some(s) = trajectory.get(step) else {
                continue;
            };
            let (st, th) = (&s.state, &s.throttle);
            let range = s.target_range.map(|r| format!("{:.3}", r)).unwrap_or_default();
            writeln!(
                writer,
                "{:.4},{},{:.4},{:.4},{:.4},{:.4},{:.4},{:.4},{:.4},\
                 {:.4},{:.4},{:.4},{:.4},{:.4},{:.4},\
                 {:.4},{:.4},{:.4},{:.3},{:.3},{:.3},{}",
                s.time,
                name,
                st.pos.x, st.pos.y, st.pos.z,
                st.vel.x, st.vel.y, st.vel.z,
                st.speed(),
                th.steering.x, th.steering.y, th.steering.z,
                th.translation.x, th.translation.y, th.translation.z,
                th.boost.x, th.boost.y, th.boost.z,
                s.applied_force.x, s.applied_force.y, s.applied_force.z,
                range,
            )?;
        }
    }

    Ok(())
}

/// Write telemetry to a CSV file at the given path.
pub fn write_telemetry_file(path: &str, telemetry: &Telemetry) -> io::Result<()> {
    let mut file = std::fs::File::create(path)?;
    write_telemetry(&mut file, telemetry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamics::State;
    use crate::propulsion::ThrottleState;
    use crate::sim::Sample;
    use nalgebra::Vector3;

    fn sample(time: f64, z: f64, range: Option<f64>) -> Sample {
        let mut state = State::at_rest(Vector3::new(0.0, 0.0, z));
        state.time = time;
        Sample {
            time,
            state,
            throttle: ThrottleState::default(),
            applied_force: Vector3::new(0.0, 0.0, 300.0),
            target_range: range,
        }
    }

    #[test]
    fn csv_output_has_header_and_rows() {
        let telemetry = Telemetry {
            names: vec!["a".into(), "b".into()],
            pilots: vec!["evade".into(), "none".into()],
            trajectories: vec![
                vec![sample(0.0, 0.0, Some(40.0)), sample(0.02, 0.1, Some(40.1))],
                vec![sample(0.0, -40.0, None), sample(0.02, -40.0, None)],
            ],
            events: Vec::new(),
        };

        let mut buf = Vec::new();
        write_telemetry(&mut buf, &telemetry).unwrap();
        let output = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = output.lines().collect();

        assert!(lines[0].starts_with("time,vehicle,"));
        assert_eq!(lines.len(), 5); // header + 2 vehicles x 2 steps
        assert!(lines[1].starts_with("0.0000,a,"));
        assert!(lines[1].ends_with(",40.000"));
        assert!(lines[2].starts_with("0.0000,b,"));
        assert!(lines[2].ends_with(','));
        assert_eq!(lines[1].split(',').count(), lines[0].split(',').count());
    }
}
