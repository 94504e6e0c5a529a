use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use thruster_sim::config::{self, ScenarioConfig};
use thruster_sim::io::{csv, json, RunSummary};
use thruster_sim::sim::{RadiusDetector, SpeedFractionDetector, Telemetry, World};

/// Run a fixed-step propulsion and pursuit scenario.
#[derive(Debug, Parser)]
#[command(name = "thruster-sim", version)]
struct Args {
    /// TOML scenario file. Without one, a powered evader and a pursuer duel.
    #[arg(long)]
    config: Option<String>,
    /// Write per-step telemetry CSV here.
    #[arg(long)]
    csv: Option<String>,
    /// Write the JSON run summary here.
    #[arg(long)]
    json: Option<String>,
    /// Override the scenario's run length (s).
    #[arg(long)]
    max_time: Option<f64>,
    /// Override the scenario's random seed.
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let mut scenario = match &args.config {
        Some(path) => config::load(path).with_context(|| format!("loading scenario {}", path))?,
        None => ScenarioConfig::duel(),
    };
    if let Some(t) = args.max_time {
        scenario.sim.max_time = t;
    }
    if let Some(seed) = args.seed {
        scenario.sim.seed = seed;
    }
    scenario.validate()?;
    info!(vehicles = scenario.vehicles.len(), seed = scenario.sim.seed, "scenario loaded");

    let mut world = scenario.build_world()?;
    attach_detectors(&mut world)?;
    let telemetry = world.run();
    let summary = RunSummary::from_telemetry(&telemetry);

    print_report(&world, &telemetry, &summary);

    if let Some(path) = &args.csv {
        csv::write_telemetry_file(path, &telemetry).with_context(|| format!("writing {}", path))?;
        info!(path = %path, "telemetry written");
    }
    if let Some(path) = &args.json {
        json::write_summary_file(path, &summary, &telemetry).with_context(|| format!("writing {}", path))?;
        info!(path = %path, "summary written");
    }
    Ok(())
}

/// Top-speed and arena-boundary events for every powered vehicle.
fn attach_detectors(world: &mut World) -> Result<()> {
    let mut top_speeds = Vec::new();
    for agent in world.agents() {
        top_speeds.push(agent.vehicle.default_max_speed_by_axis(false)?.z);
    }
    for (i, top) in top_speeds.into_iter().enumerate() {
        if top > 0.0 {
            world.add_detector(i, Box::new(SpeedFractionDetector::new(0.9, top)));
        }
        world.add_detector(i, Box::new(RadiusDetector::new(nalgebra::Vector3::zeros(), 500.0)));
    }
    Ok(())
}

fn print_report(world: &World, telemetry: &Telemetry, summary: &RunSummary) {
    println!();
    println!("====================================================================");
    println!("  THRUSTER SIM  {} vehicles, {:.1} s", summary.vehicles.len(), summary.duration);
    println!("====================================================================");
    println!();

    println!("  Vehicles");
    println!("  ──────────────────────────────────────────────────────────────────");
    for agent in world.agents() {
        let v = &agent.vehicle;
        let engines = v.engines.as_deref().map_or("none", |e| e.name());
        let top = v.current_max_speed_by_axis(false).map(|m| m.z).unwrap_or(0.0);
        let boosted = v.current_max_speed_by_axis(true).map(|m| m.z).unwrap_or(0.0);
        println!(
            "  {:<10} pilot={:<8} engines={:<24} top={:>6.1} m/s  boost={:>6.1} m/s",
            v.name,
            agent.pilot_name(),
            engines,
            top,
            boosted
        );
    }
    println!();

    println!("  Flight Events");
    println!("  ──────────────────────────────────────────────────────────────────");
    if telemetry.events.is_empty() {
        println!("  (none)");
    }
    for e in &telemetry.events {
        let name = telemetry.names.get(e.vehicle).map(String::as_str).unwrap_or("?");
        println!(
            "  t={:>6.2}s  {:<10} {:?}  speed={:>6.1} m/s",
            e.time,
            name,
            e.kind,
            e.state.speed()
        );
    }
    println!();

    println!("  Performance Summary");
    println!("  ──────────────────────────────────────────────────────────────────");
    for v in &summary.vehicles {
        let range = |r: Option<f64>| r.map_or("-".to_string(), |r| format!("{:.1} m", r));
        println!(
            "  {:<10} max {:>6.1} m/s  mean {:>6.1} m/s  flown {:>8.1} m  min range {:>9}  final range {:>9}",
            v.name,
            v.max_speed,
            v.mean_speed,
            v.distance_travelled,
            range(v.min_target_range),
            range(v.final_target_range)
        );
    }
    println!();

    // Sampled separation table for the first tracking vehicle
    if let Some(idx) = world.agents().iter().position(|a| a.target.is_some()) {
        println!("  Track: {}", telemetry.names[idx]);
        println!("  ──────────────────────────────────────────────────────────────────");
        println!("  {:>7}  {:>9}  {:>9}  {:>7}  {:>7}  {:>7}", "t (s)", "speed", "range", "thr_z", "pitch", "yaw");
        println!("  {}", "─".repeat(60));
        let trajectory = &telemetry.trajectories[idx];
        let interval = (trajectory.len() / 20).max(1);
        for (i, s) in trajectory.iter().enumerate() {
            if i % interval != 0 && i + 1 != trajectory.len() {
                continue;
            }
            println!(
                "  {:>7.2}  {:>9.1}  {:>9.1}  {:>7.2}  {:>7.2}  {:>7.2}",
                s.time,
                s.state.speed(),
                s.target_range.unwrap_or(f64::NAN),
                s.throttle.translation.z,
                s.throttle.steering.x,
                s.throttle.steering.y
            );
        }
        println!();
    }

    let steps = telemetry.trajectories.first().map_or(0, Vec::len);
    println!("  Simulation: {} steps, dt={} s", steps, world.config.dt);
    println!("====================================================================");
    println!();
}
