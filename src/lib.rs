// Export modules for testing
pub mod about;
pub mod app;
pub mod config;
pub mod controller;
pub mod device;
pub mod driver;
pub mod error;
pub mod protocol;
pub mod settings;
pub mod state;
pub mod ui;
pub mod usb;
pub mod variables;
pub mod view;
pub mod window;

// Re-export main struct and types for testing
pub use crate::app::TicGui;
pub use crate::config::ConfigData;
pub use crate::controller::{ControllerOptions, MainController};
pub use crate::device::{Product, TicDevice};
pub use crate::driver::{DeviceHandle, Driver};
pub use crate::error::{Result, TicError};
pub use crate::settings::Settings;
pub use crate::state::State;
pub use crate::variables::Variables;
pub use crate::window::Window;

// Constants
pub const PROGRAM_TITLE: &str = "Pololu Tic Control Center";
pub const INITIAL_WIDTH: f32 = 760.0;
pub const INITIAL_HEIGHT: f32 = 520.0;

// Args struct for command line parsing
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Path of the JSON config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Print the connected Tics and exit
    #[arg(short, long, default_value_t = false)]
    pub list: bool,

    /// Connect to the Tic with this serial number at start-up
    #[arg(short, long)]
    pub serial: Option<String>,
}
