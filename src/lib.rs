pub mod about;
pub mod config;
pub mod controller;
pub mod location;
pub mod location_worker;
pub mod state;
pub mod store;
pub mod ui;
pub mod util;

// Re-export main types for testing
pub use crate::config::ConfigData;
pub use crate::controller::{LocationProvider, MapDisplay, OverrideController};
pub use crate::location::{Coordinate, SavedLocation};
pub use crate::state::State;
pub use crate::store::LocationStore;

// Constants
pub const PROGRAM_TITLE: &str = "Virtual Location";
pub const INITIAL_WIDTH: f32 = 480.0;
pub const INITIAL_HEIGHT: f32 = 640.0;

// Run flag shared with the location worker thread
pub use std::sync::{Arc, Condvar, Mutex};
pub type SharedStateFlag = Arc<(Mutex<bool>, Condvar)>;

use clap::Parser;
use eframe::{egui, glow};
use fast_config::Config;
use location::LocationEvent;
use location_worker::SimulatedLocation;
use std::path::PathBuf;
use std::sync::mpsc::Receiver;
use std::time::Duration;
use store::FileSlots;
use ui::{MapPanel, Screen};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// File holding the saved locations (defaults to the platform data dir)
    #[arg(short, long)]
    pub data_file: Option<PathBuf>,
    /// Answer "denied" when the app asks for location access
    #[arg(long, default_value_t = false)]
    pub deny_location: bool,
    /// Latitude reported by the simulated location service
    #[arg(long, requires = "lon", allow_hyphen_values = true)]
    pub lat: Option<f64>,
    /// Longitude reported by the simulated location service
    #[arg(long, requires = "lat", allow_hyphen_values = true)]
    pub lon: Option<f64>,
}

impl Args {
    /// Folds command line overrides into the loaded configuration.
    pub fn apply_to(&self, config: &ConfigData) -> ConfigData {
        let mut effective = config.clone();
        if let Some(path) = &self.data_file {
            effective.store_path = Some(path.clone());
        }
        if self.deny_location {
            effective.permission = config::PermissionSetting::Denied;
        }
        if let (Some(lat), Some(lon)) = (self.lat, self.lon) {
            effective.simulated_position = Coordinate::new(lat, lon);
        }
        effective
    }
}

// The main application struct
pub struct VirtualLocationApp {
    pub state: State,
    pub screen: Screen<SimulatedLocation, FileSlots>,
    events: Receiver<LocationEvent>,

    // Configuration
    pub config: Config<ConfigData>,
}

impl VirtualLocationApp {
    pub fn new(config: Config<ConfigData>, args: &Args) -> Self {
        let effective = args.apply_to(&config.data);
        let store_path = effective
            .store_path
            .clone()
            .unwrap_or_else(FileSlots::default_path);
        log::info!("Saved locations live in {}", store_path.display());

        let (provider, events) = SimulatedLocation::new(
            effective.simulated_position,
            effective.permission,
            Duration::from_millis(effective.update_interval_ms.max(1)),
        );
        let controller = OverrideController::new(
            MapPanel::default(),
            provider,
            LocationStore::new(FileSlots::new(store_path)),
            effective.controller_settings(),
        );

        Self {
            state: State::Initialising,
            screen: Screen::new(controller),
            events,
            config,
        }
    }

    // Initialization logic called once at the start
    fn init(&mut self) {
        self.screen.controller.start();
        self.state = State::Running;
        log::info!("Initialization complete. State set to Running.");
    }

    // Graceful shutdown logic
    fn shutdown_app(&mut self) {
        log::info!("Shutdown requested.");
        self.screen.controller.provider().stop();

        if let Err(e) = self.config.save() {
            log::error!("Failed to save configuration on exit: {}", e);
        } else {
            log::info!("Configuration saved.");
        }
        log::info!("Shutdown complete.");
    }
}

// Main eframe application loop
impl eframe::App for VirtualLocationApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Keep polling the update channel even when the user is idle
        ctx.request_repaint_after(Duration::from_millis(100));
        self.screen.drain_events(&self.events);

        egui::CentralPanel::default().show(ctx, |ui| match self.state {
            State::Initialising => {
                ui.centered_and_justified(|ui| {
                    ui.label("Initialising...");
                });
                self.init();
            }
            State::About => {
                ui::draw_about_screen(self, ui);
            }
            State::Running => {
                if ui::draw_running_state(&mut self.screen, ui, ctx) {
                    self.state = State::About;
                }
            }
        });
    }

    // Called when the application is about to close
    fn on_exit(&mut self, _gl: Option<&glow::Context>) {
        self.shutdown_app();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn args_override_config() {
        let args = Args::parse_from([
            "virtual_location",
            "--data-file",
            "/tmp/locations.json",
            "--deny-location",
            "--lat",
            "-33.5",
            "--lon",
            "151.25",
        ]);
        let effective = args.apply_to(&ConfigData::default());

        assert_eq!(effective.store_path, Some(PathBuf::from("/tmp/locations.json")));
        assert_eq!(effective.permission, config::PermissionSetting::Denied);
        assert_eq!(effective.simulated_position, Coordinate::new(-33.5, 151.25));
    }

    #[test]
    fn no_args_keep_config() {
        let args = Args::parse_from(["virtual_location"]);
        let config = ConfigData::default();
        assert_eq!(args.apply_to(&config), config);
    }
}
