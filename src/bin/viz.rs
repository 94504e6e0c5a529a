use eframe::egui;
use egui_plot::{Line, Plot, PlotPoints};

use thruster_sim::config::ScenarioConfig;
use thruster_sim::sim::{Sample, Telemetry};

fn main() -> eframe::Result {
    let scenario = match std::env::args().nth(1) {
        Some(path) => thruster_sim::config::load(&path).unwrap_or_else(|err| {
            eprintln!("failed to load {}: {}; using default duel", path, err);
            ScenarioConfig::duel()
        }),
        None => ScenarioConfig::duel(),
    };
    let telemetry = match scenario.build_world() {
        Ok(mut world) => world.run(),
        Err(err) => {
            eprintln!("invalid scenario: {}", err);
            Telemetry::default()
        }
    };

    let app = SimViz { telemetry };
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([1200.0, 800.0]),
        ..Default::default()
    };
    eframe::run_native("Thruster Simulator", options, Box::new(|_| Ok(Box::new(app))))
}

struct SimViz {
    telemetry: Telemetry,
}

impl SimViz {
    /// One (time, value) line per vehicle, thinned to at most ~2000 points.
    fn series(&self, f: impl Fn(&Sample) -> Option<f64>) -> Vec<(String, Vec<[f64; 2]>)> {
        self.telemetry
            .names
            .iter()
            .zip(&self.telemetry.trajectories)
            .map(|(name, traj)| {
                let step = (traj.len() / 2000).max(1);
                let points = traj
                    .iter()
                    .step_by(step)
                    .filter_map(|s| f(s).map(|y| [s.time, y]))
                    .collect();
                (name.clone(), points)
            })
            .collect()
    }
}

impl eframe::App for SimViz {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::TopBottomPanel::top("header").show(ctx, |ui| {
            ui.heading("Thruster Simulator");
            let duration = self
                .telemetry
                .trajectories
                .iter()
                .filter_map(|t| t.last())
                .map(|s| s.time)
                .fold(0.0_f64, f64::max);
            ui.label(format!(
                "Vehicles: {}  |  Events: {}  |  Duration: {:.0} s",
                self.telemetry.names.len(),
                self.telemetry.events.len(),
                duration,
            ));
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            let available = ui.available_size();
            let half_w = available.x / 2.0 - 8.0;
            let half_h = available.y / 2.0 - 8.0;

            ui.horizontal(|ui| {
                ui.vertical(|ui| {
                    ui.label("Speed (m/s)");
                    let lines = self.series(|s| Some(s.state.speed()));
                    Plot::new("speed")
                        .width(half_w)
                        .height(half_h)
                        .x_axis_label("Time (s)")
                        .show(ui, |plot_ui| {
                            for (name, points) in lines {
                                plot_ui.line(Line::new(name, PlotPoints::from(points)));
                            }
                        });
                });

                ui.vertical(|ui| {
                    ui.label("Target range (m)");
                    let lines = self.series(|s| s.target_range);
                    Plot::new("range")
                        .width(half_w)
                        .height(half_h)
                        .x_axis_label("Time (s)")
                        .show(ui, |plot_ui| {
                            for (name, points) in lines {
                                plot_ui.line(Line::new(name, PlotPoints::from(points)));
                            }
                        });
                });
            });

            ui.horizontal(|ui| {
                ui.vertical(|ui| {
                    ui.label("Forward throttle");
                    let lines = self.series(|s| Some(s.throttle.translation.z));
                    Plot::new("throttle")
                        .width(half_w)
                        .height(half_h)
                        .x_axis_label("Time (s)")
                        .show(ui, |plot_ui| {
                            for (name, points) in lines {
                                plot_ui.line(Line::new(name, PlotPoints::from(points)));
                            }
                        });
                });

                // Top-down track (x vs z)
                ui.vertical(|ui| {
                    ui.label("Ground track (m)");
                    let tracks: Vec<(String, PlotPoints)> = self
                        .telemetry
                        .names
                        .iter()
                        .zip(&self.telemetry.trajectories)
                        .map(|(name, traj)| {
                            let step = (traj.len() / 2000).max(1);
                            let points: PlotPoints = traj.iter().step_by(step).map(|s| [s.state.pos.x, s.state.pos.z]).collect();
                            (name.clone(), points)
                        })
                        .collect();
                    Plot::new("track")
                        .width(half_w)
                        .height(half_h)
                        .x_axis_label("x (m)")
                        .data_aspect(1.0)
                        .show(ui, |plot_ui| {
                            for (name, points) in tracks {
                                plot_ui.line(Line::new(name, points));
                            }
                        });
                });
            });
        });
    }
}
