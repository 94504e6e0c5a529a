use std::io::{self, Write};

use nalgebra::Vector3;

use crate::sim::{EventKind, Telemetry};

/// Per-vehicle statistics computed from a run.
#[derive(Debug, Clone)]
pub struct VehicleSummary {
    pub name: String,
    pub pilot: String,
    pub max_speed: f64,
    pub mean_speed: f64,
    pub distance_travelled: f64,
    pub final_position: Vector3<f64>,
    pub min_target_range: Option<f64>,
    pub final_target_range: Option<f64>,
}

/// Summary of a whole run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub duration: f64,
    pub vehicles: Vec<VehicleSummary>,
    pub events: usize,
}

impl RunSummary {
    /// Compute summary from telemetry. Vehicles with no samples are skipped.
    pub fn from_telemetry(telemetry: &Telemetry) -> Self {
        let mut vehicles = Vec::new();
        for (i, trajectory) in telemetry.trajectories.iter().enumerate() {
            let Some(last) = trajectory.last() else {
                continue;
            };

            let max_speed = trajectory.iter().map(|s| s.state.speed()).fold(0.0_f64, f64::max);
            let mean_speed = trajectory.iter().map(|s| s.state.speed()).sum::<f64>() / trajectory.len() as f64;
            let distance_travelled = trajectory
                .windows(2)
                .map(|w| (w[1].state.pos - w[0].state.pos).norm())
                .sum();
            let min_target_range = trajectory
                .iter()
                .filter_map(|s| s.target_range)
                .fold(None, |acc: Option<f64>, r| Some(acc.map_or(r, |a| a.min(r))));

            vehicles.push(VehicleSummary {
                name: telemetry.names.get(i).cloned().unwrap_or_default(),
                pilot: telemetry.pilots.get(i).cloned().unwrap_or_default(),
                max_speed,
                mean_speed,
                distance_travelled,
                final_position: last.state.pos,
                min_target_range,
                final_target_range: last.target_range,
            });
        }

        let duration = telemetry
            .trajectories
            .iter()
            .filter_map(|t| t.last())
            .map(|s| s.time)
            .fold(0.0_f64, f64::max);

        RunSummary { duration, vehicles, events: telemetry.events.len() }
    }
}

/// Write run summary as JSON to a writer.
pub fn write_summary<W: Write>(writer: &mut W, summary: &RunSummary, telemetry: &Telemetry) -> io::Result<()> {
    writeln!(writer, "{{")?;
    writeln!(writer, "  \"duration_s\": {:.2},", summary.duration)?;
    writeln!(writer, "  \"vehicles\": [")?;
    for (i, v) in summary.vehicles.iter().enumerate() {
        writeln!(writer, "    {{")?;
        writeln!(writer, "      \"name\": \"{}\",", escape(&v.name))?;
        writeln!(writer, "      \"pilot\": \"{}\",", escape(&v.pilot))?;
        writeln!(writer, "      \"max_speed_ms\": {:.2},", v.max_speed)?;
        writeln!(writer, "      \"mean_speed_ms\": {:.2},", v.mean_speed)?;
        writeln!(writer, "      \"distance_m\": {:.2},", v.distance_travelled)?;
        writeln!(
            writer,
            "      \"final_position_m\": [{:.2}, {:.2}, {:.2}],",
            v.final_position.x, v.final_position.y, v.final_position.z
        )?;
        writeln!(writer, "      \"min_target_range_m\": {},", number_or_null(v.min_target_range))?;
        writeln!(writer, "      \"final_target_range_m\": {}", number_or_null(v.final_target_range))?;
        let sep = if i + 1 < summary.vehicles.len() { "," } else { "" };
        writeln!(writer, "    }}{}", sep)?;
    }
    writeln!(writer, "  ],")?;
    writeln!(writer, "  \"events\": [")?;
    for (i, e) in telemetry.events.iter().enumerate() {
        let vehicle = telemetry.names.get(e.vehicle).map(String::as_str).unwrap_or("");
        let sep = if i + 1 < telemetry.events.len() { "," } else { "" };
        writeln!(
            writer,
            "    {{ \"time_s\": {:.2}, \"vehicle\": \"{}\", \"kind\": \"{}\" }}{}",
            e.time,
            escape(vehicle),
            escape(&describe(&e.kind)),
            sep
        )?;
    }
    writeln!(writer, "  ]")?;
    writeln!(writer, "}}")?;
    Ok(())
}

/// Write run summary JSON to a file.
pub fn write_summary_file(path: &str, summary: &RunSummary, telemetry: &Telemetry) -> io::Result<()> {
    let mut file = std::fs::File::create(path)?;
    write_summary(&mut file, summary, telemetry)
}

fn describe(kind: &EventKind) -> String {
    match kind {
        EventKind::SpeedReached { fraction } => format!("speed {:.0}% of max", fraction * 100.0),
        EventKind::RadiusCrossed { radius, outbound } => {
            format!("{} {:.0} m", if *outbound { "left" } else { "entered" }, radius)
        }
    }
}

fn number_or_null(x: Option<f64>) -> String {
    match x {
        Some(v) if v.is_finite() => format!("{:.2}", v),
        _ => "null".into(),
    }
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamics::State;
    use crate::propulsion::ThrottleState;
    use crate::sim::{Sample, SimEvent};

    fn sample(time: f64, z: f64, vz: f64, range: Option<f64>) -> Sample {
        let mut state = State::at_rest(Vector3::new(0.0, 0.0, z));
        state.vel = Vector3::new(0.0, 0.0, vz);
        Sample { time, state, throttle: ThrottleState::default(), applied_force: Vector3::zeros(), target_range: range }
    }

    fn telemetry() -> Telemetry {
        Telemetry {
            names: vec!["evader".into(), "pursuer".into()],
            pilots: vec!["evade".into(), "pursue".into()],
            trajectories: vec![
                vec![sample(0.0, 0.0, 0.0, Some(60.0)), sample(1.0, 50.0, 100.0, Some(45.0)), sample(2.0, 150.0, 100.0, Some(70.0))],
                vec![sample(0.0, -60.0, 0.0, Some(60.0)), sample(1.0, 5.0, 80.0, Some(45.0)), sample(2.0, 80.0, 80.0, Some(70.0))],
            ],
            events: vec![SimEvent {
                time: 1.0,
                vehicle: 0,
                kind: EventKind::SpeedReached { fraction: 0.9 },
                state: State::at_rest(Vector3::zeros()),
            }],
        }
    }

    #[test]
    fn summary_tracks_speed_distance_and_range() {
        let s = RunSummary::from_telemetry(&telemetry());
        assert_eq!(s.vehicles.len(), 2);
        let e = &s.vehicles[0];
        assert!((e.max_speed - 100.0).abs() < 1e-9);
        assert!((e.distance_travelled - 150.0).abs() < 1e-9);
        assert_eq!(e.min_target_range, Some(45.0));
        assert_eq!(e.final_target_range, Some(70.0));
        assert!((s.duration - 2.0).abs() < 1e-9);
        assert_eq!(s.events, 1);
    }

    #[test]
    fn json_output_is_valid() {
        let t = telemetry();
        let summary = RunSummary::from_telemetry(&t);
        let mut buf = Vec::new();
        write_summary(&mut buf, &summary, &t).unwrap();
        let json = String::from_utf8(buf).unwrap();
        assert!(json.contains("\"evader\""));
        assert!(json.contains("\"min_target_range_m\": 45.00"));
        assert!(json.contains("speed 90% of max"));
        assert_eq!(json.matches('{').count(), json.matches('}').count());
    }

    #[test]
    fn missing_range_is_null() {
        assert_eq!(number_or_null(None), "null");
        assert_eq!(number_or_null(Some(f64::INFINITY)), "null");
        assert_eq!(escape("a\"b"), "a\\\"b");
    }
}
