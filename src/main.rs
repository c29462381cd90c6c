#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")] // hide console window on Windows in release

use std::process::exit;
use clap::Parser;
use eframe::egui;
use fast_config::Config;

use virtual_location::{ui, Args, ConfigData, VirtualLocationApp, INITIAL_HEIGHT, INITIAL_WIDTH, PROGRAM_TITLE};

// Application Entry Point
fn main() -> eframe::Result<()> {
    // Initialize logging
    env_logger::init();

    let args = Args::parse();

    log::info!("Starting {}", PROGRAM_TITLE);

    // Determine config path safely
    let config_dir = dirs::config_dir()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_else(|| ".".to_string()); // Fallback to current dir
    let config_path = format!("{}/virtual_location.json", config_dir);

    let config = match Config::new(&config_path, ConfigData::default()) {
        Ok(cfg) => cfg,
        Err(e) => {
            log::error!("Error creating config file at {}: {}", config_path, e);
            exit(1)
        }
    };

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([INITIAL_WIDTH, INITIAL_HEIGHT])
            .with_title(PROGRAM_TITLE),
        ..Default::default()
    };

    eframe::run_native(
        PROGRAM_TITLE,
        options,
        Box::new(move |cc| {
            ui::install_cjk_font(&cc.egui_ctx, config.data.cjk_font_path.as_deref());
            Ok(Box::new(VirtualLocationApp::new(config, &args)))
        }),
    )
}
