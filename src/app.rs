use crate::config::ConfigData;
use crate::controller::MainController;
use crate::state::State;
use crate::ui;
use crate::usb::UsbDriver;
use crate::view::WindowModel;
use crate::{INITIAL_HEIGHT, INITIAL_WIDTH};
use eframe::{egui, glow};
use fast_config::Config;
use std::time::Instant;

pub type GuiController = MainController<UsbDriver, WindowModel>;

// The main application struct
pub struct TicGui {
    pub state: State,
    pub controller: GuiController,
    pub config: Config<ConfigData>,
    preferred_serial: Option<String>,
    last_update: Instant,
}

impl TicGui {
    pub fn new(config: Config<ConfigData>, preferred_serial: Option<String>) -> Self {
        let controller = MainController::new(
            UsbDriver::new(),
            WindowModel::default(),
            config.data.controller_options(),
        );
        Self {
            state: State::Initialising,
            controller,
            config,
            preferred_serial,
            last_update: Instant::now(),
        }
    }

    // Initialization logic called once at the start
    fn init(&mut self) {
        match self.preferred_serial.take() {
            Some(serial) => self.controller.start_with_serial(&serial),
            None => self.controller.start(),
        }
        self.last_update = Instant::now();
        self.state = State::Running;
        log::info!("Initialization complete. State set to Running.");
    }

    // Runs the controller's periodic update once the configured interval has passed
    fn poll_device(&mut self) {
        if self.last_update.elapsed() >= self.config.data.update_interval() {
            self.last_update = Instant::now();
            self.controller.update();
        }
    }

    fn shutdown_app(&mut self) {
        log::info!("Shutdown requested.");
        if let Err(e) = self.config.save() {
            log::error!("Failed to save configuration on exit: {}", e);
        } else {
            log::info!("Configuration saved.");
        }
    }
}

// Main eframe application loop
impl eframe::App for TicGui {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Keep the poll timer running even when there is no input
        ctx.request_repaint_after(self.config.data.update_interval());

        if ctx.input(|i| i.viewport().close_requested()) && !self.controller.exit() {
            ctx.send_viewport_cmd(egui::ViewportCommand::CancelClose);
        }

        if self.state != State::Initialising {
            self.poll_device();
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::Resize::default()
                .default_width(INITIAL_WIDTH)
                .default_height(INITIAL_HEIGHT)
                .auto_sized()
                .show(ui, |ui| match self.state {
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
                        ui::draw_running_state(self, ui, ctx);
                    }
                });
        });
    }

    // Called when the application is about to close
    fn on_exit(&mut self, _gl: Option<&glow::Context>) {
        self.shutdown_app();
    }
}
