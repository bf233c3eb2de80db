#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")] // hide console window on Windows in release

use clap::Parser;
use eframe::egui;
use fast_config::Config;
use std::process::exit;
use tic_control::driver::Driver;
use tic_control::usb::UsbDriver;
use tic_control::{Args, ConfigData, TicGui, INITIAL_HEIGHT, INITIAL_WIDTH, PROGRAM_TITLE};

fn config_path(args: &Args) -> String {
    match &args.config {
        Some(path) => path.to_string_lossy().into_owned(),
        None => {
            let config_dir = dirs::config_dir()
                .map(|p| p.to_string_lossy().into_owned())
                .unwrap_or_else(|| ".".to_string()); // Fallback to current dir
            format!("{}/tic_control.json", config_dir)
        }
    }
}

// Prints the attached devices for --list
fn list_devices() -> i32 {
    match UsbDriver::new().list_connected_devices() {
        Ok(devices) => {
            for device in &devices {
                println!(
                    "{}  {}  firmware {}",
                    device.os_id,
                    device,
                    device.firmware_version_string()
                );
            }
            if devices.is_empty() {
                println!("No Tic devices found.");
            }
            0
        }
        Err(e) => {
            log::error!("Failed to list devices: {}", e);
            eprintln!("Error: {}", e);
            1
        }
    }
}

// Application Entry Point
fn main() -> eframe::Result<()> {
    // Initialize logging
    env_logger::init();

    let args = Args::parse();

    if args.list {
        exit(list_devices());
    }

    log::info!("Starting {}", PROGRAM_TITLE);

    let config_path = config_path(&args);
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

    let preferred_serial = args.serial.clone();
    eframe::run_native(
        PROGRAM_TITLE,
        options,
        Box::new(|_cc| Ok(Box::new(TicGui::new(config, preferred_serial)))),
    )
}
