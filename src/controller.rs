use crate::device::{device_list_includes, device_lists_different, TicDevice};
use crate::driver::{DeviceHandle, Driver};
use crate::error::{Result, TicError};
use crate::settings::{ControlMode, DecayMode, Settings, StepMode};
use crate::variables::Variables;
use crate::window::Window;
use log::{debug, error, info, warn};

const LIST_ERROR_MESSAGE: &str = "Failed to get the list of devices.";
const CONNECTION_LOST_MESSAGE: &str = "The connection to the device was lost.";

#[derive(Debug, Clone, Copy)]
pub struct ControllerOptions {
    /// Connect on our own when exactly one device is attached.
    pub auto_connect: bool,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self { auto_connect: true }
    }
}

fn write_settings<H: DeviceHandle>(handle: &mut H, settings: &Settings) -> Result<()> {
    handle.set_settings(settings)?;
    handle.reinitialize()
}

/// Translates user intents into device operations and tells the window
/// when the model changed.
pub struct MainController<D: Driver, W: Window> {
    driver: D,
    window: W,
    options: ControllerOptions,

    /// Tics attached to the computer, as of the last refresh.
    device_list: Vec<TicDevice>,
    /// True if `device_list` changed during the last refresh.
    device_list_changed: bool,

    /// The open device, if we are connected.
    device_handle: Option<D::Handle>,

    /// Set when the last connection or connection attempt failed.
    connection_error: bool,
    connection_error_message: String,

    /// True if we are disconnected because the user asked for it.
    disconnected_by_user: bool,

    settings: Option<Settings>,
    /// True if the user edited `settings` since they were loaded or applied.
    settings_modified: bool,

    variables: Variables,
    variables_update_failed: bool,
}

impl<D: Driver, W: Window> MainController<D, W> {
    pub fn new(driver: D, window: W, options: ControllerOptions) -> Self {
        Self {
            driver,
            window,
            options,
            device_list: Vec::new(),
            device_list_changed: false,
            device_handle: None,
            connection_error: false,
            connection_error_message: String::new(),
            disconnected_by_user: false,
            settings: None,
            settings_modified: false,
            variables: Variables::default(),
            variables_update_failed: false,
        }
    }

    // --- Accessors ---

    pub fn connected(&self) -> bool {
        self.device_handle.is_some()
    }

    pub fn window(&self) -> &W {
        &self.window
    }

    pub fn window_mut(&mut self) -> &mut W {
        &mut self.window
    }

    pub fn connected_device(&self) -> Option<&TicDevice> {
        self.device_handle.as_ref().map(|h| h.device())
    }

    pub fn settings(&self) -> Option<&Settings> {
        self.settings.as_ref()
    }

    pub fn settings_modified(&self) -> bool {
        self.settings_modified
    }

    pub fn variables(&self) -> &Variables {
        &self.variables
    }

    pub fn variables_update_failed(&self) -> bool {
        self.variables_update_failed
    }

    /// The message of the sticky connection error, if one is set.
    pub fn connection_error(&self) -> Option<&str> {
        self.connection_error
            .then_some(self.connection_error_message.as_str())
    }

    pub fn disconnected_by_user(&self) -> bool {
        self.disconnected_by_user
    }

    // --- User intents ---

    /// Called once when the program starts.
    pub fn start(&mut self) {
        debug_assert!(!self.connected());
        if self.update_device_list() && !self.device_list.is_empty() {
            let first = self.device_list[0].clone();
            self.connect_device(&first);
        } else {
            self.handle_model_changed();
        }
    }

    /// Like `start`, but prefers the device with the given serial number.
    pub fn start_with_serial(&mut self, serial_number: &str) {
        debug_assert!(!self.connected());
        if !self.update_device_list() {
            self.handle_model_changed();
            return;
        }
        let preferred = self
            .device_list
            .iter()
            .find(|d| d.serial_number == serial_number)
            .or_else(|| {
                warn!("No device with serial number {} is connected.", serial_number);
                self.device_list.first()
            })
            .cloned();
        match preferred {
            Some(device) => self.connect_device(&device),
            None => self.handle_model_changed(),
        }
    }

    pub fn connect_device_with_os_id(&mut self, id: &str) {
        if self.connected_device().is_some_and(|d| d.os_id == id) {
            return;
        }
        if self.connected() && !self.disconnect_device() {
            return;
        }
        match self.device_list.iter().find(|d| d.os_id == id).cloned() {
            Some(device) => self.connect_device(&device),
            None => {
                warn!("Cannot connect: no device with OS id {}.", id);
                self.handle_model_changed();
            }
        }
    }

    /// Returns false if the user chose to keep the connection.
    pub fn disconnect_device(&mut self) -> bool {
        if !self.connected() {
            return true;
        }

        if self.settings_modified {
            let question = "The settings you changed have not been applied to the device.  \
                If you disconnect from the device now, those changes will be lost.  \
                Are you sure you want to disconnect?";
            if !self.window.confirm(question) {
                return false;
            }
        }

        self.really_disconnect();
        self.disconnected_by_user = true;
        self.connection_error = false;
        info!("Disconnected by user.");
        self.handle_model_changed();
        true
    }

    pub fn reload_settings(&mut self) {
        self.reload_settings_with(true);
    }

    pub fn reload_settings_with(&mut self, ask: bool) {
        if !self.connected() {
            return;
        }

        let question = "Are you sure you want to reload settings from the device \
            and discard your recent changes?";
        if ask && !self.window.confirm(question) {
            return;
        }

        let Some(handle) = self.device_handle.as_mut() else {
            return;
        };
        match handle.get_settings() {
            Ok(settings) => {
                self.settings = Some(settings);
                self.handle_settings_applied();
            }
            Err(e) => {
                self.settings_modified = true;
                self.show_error(&e, "There was an error loading the settings from the device.");
            }
        }
        self.handle_settings_changed();
    }

    pub fn restore_default_settings(&mut self) {
        if !self.connected() {
            return;
        }

        let question = "This will reset all of your device's settings back to their \
            default values.  You will lose your custom settings.  \
            Are you sure you want to continue?";
        if !self.window.confirm(question) {
            return;
        }

        let Some(handle) = self.device_handle.as_mut() else {
            return;
        };
        let restore_success = match handle.restore_defaults() {
            Ok(()) => true,
            Err(e) => {
                self.show_error(&e, "There was an error resetting to the default settings.");
                false
            }
        };

        // Reloads the settings and refreshes the window
        self.reload_settings_with(false);

        if restore_success {
            self.window
                .show_info_message("Your device's settings have been reset to their default values.");
        }
    }

    /// Called periodically by the GUI timer.
    pub fn update(&mut self) {
        let successfully_updated_list = self.update_device_list();

        if let Some(handle) = self.device_handle.as_ref() {
            let device_still_present =
                successfully_updated_list && device_list_includes(&self.device_list, handle.device());

            if device_still_present {
                // The stale flag already records a failure, so the error itself is dropped.
                if let Err(e) = self.reload_variables() {
                    debug!("Variables update failed: {}", e);
                }
                self.handle_variables_changed();
                if self.device_list_changed {
                    self.handle_device_changed();
                }
            } else {
                warn!("{}", CONNECTION_LOST_MESSAGE);
                self.disconnect_device_by_error(CONNECTION_LOST_MESSAGE);
                self.handle_model_changed();
            }
            return;
        }

        // Not connected, so consider connecting on our own
        if self.connection_error || self.disconnected_by_user || !self.options.auto_connect {
            // After an error or a deliberate disconnect the user reconnects by hand
        } else if successfully_updated_list && self.device_list.len() == 1 {
            let only = self.device_list[0].clone();
            self.connect_device(&only);
            return;
        }

        if self.device_list_changed {
            self.handle_device_changed();
        }
    }

    /// Returns true if the program may exit now.
    pub fn exit(&mut self) -> bool {
        if self.connected() && self.settings_modified {
            let question = "The settings you changed have not been applied to the device.  \
                If you exit now, those changes will be lost.  \
                Are you sure you want to exit?";
            self.window.confirm(question)
        } else {
            true
        }
    }

    /// Refreshes everything the window shows.
    pub fn handle_model_changed(&mut self) {
        self.handle_device_changed();
        self.handle_variables_changed();
        self.handle_settings_changed();
    }

    pub fn set_target_position(&mut self, position: i32) {
        let Some(handle) = self.device_handle.as_mut() else {
            return;
        };
        if let Err(e) = handle.set_target_position(position) {
            self.show_error(&e, "");
        }
    }

    pub fn set_target_velocity(&mut self, velocity: i32) {
        let Some(handle) = self.device_handle.as_mut() else {
            return;
        };
        if let Err(e) = handle.set_target_velocity(velocity) {
            self.show_error(&e, "");
        }
    }

    pub fn apply_settings(&mut self) {
        if !self.connected() {
            return;
        }
        let Some(mut fixed) = self.settings.clone() else {
            return;
        };

        let warnings = fixed.fix();
        let accepted = warnings.is_empty() || {
            let question = format!(
                "{}\n\nAccept these changes and apply settings?",
                warnings.join("\n")
            );
            self.window.confirm(&question)
        };

        if accepted {
            self.settings = Some(fixed.clone());
            if let Some(handle) = self.device_handle.as_mut() {
                match write_settings(handle, &fixed) {
                    Ok(()) => {
                        info!("Applied settings to {}.", handle.device());
                        self.handle_settings_applied();
                    }
                    Err(e) => self.show_error(&e, ""),
                }
            }
        }

        self.handle_settings_changed();
    }

    // These are called when the user changes a setting.

    pub fn handle_control_mode_input(&mut self, control_mode: ControlMode) {
        self.edit_settings(|s| s.control_mode = control_mode);
    }

    pub fn handle_input_min_input(&mut self, input_min: u16) {
        self.edit_settings(|s| s.input_min = input_min);
    }

    pub fn handle_input_neutral_min_input(&mut self, input_neutral_min: u16) {
        self.edit_settings(|s| s.input_neutral_min = input_neutral_min);
    }

    pub fn handle_input_neutral_max_input(&mut self, input_neutral_max: u16) {
        self.edit_settings(|s| s.input_neutral_max = input_neutral_max);
    }

    pub fn handle_input_max_input(&mut self, input_max: u16) {
        self.edit_settings(|s| s.input_max = input_max);
    }

    pub fn handle_output_min_input(&mut self, output_min: i32) {
        self.edit_settings(|s| s.output_min = output_min);
    }

    pub fn handle_output_max_input(&mut self, output_max: i32) {
        self.edit_settings(|s| s.output_max = output_max);
    }

    pub fn handle_speed_max_input(&mut self, speed_max: u32) {
        self.edit_settings(|s| s.speed_max = speed_max);
    }

    pub fn handle_speed_min_input(&mut self, speed_min: u32) {
        self.edit_settings(|s| s.speed_min = speed_min);
    }

    pub fn handle_accel_max_input(&mut self, accel_max: u32) {
        self.edit_settings(|s| s.accel_max = accel_max);
    }

    pub fn handle_decel_max_input(&mut self, decel_max: u32) {
        self.edit_settings(|s| s.decel_max = decel_max);
    }

    pub fn handle_step_mode_input(&mut self, step_mode: StepMode) {
        self.edit_settings(|s| s.step_mode = step_mode);
    }

    pub fn handle_current_limit_input(&mut self, current_limit: u32) {
        self.edit_settings(|s| s.current_limit = current_limit);
    }

    pub fn handle_decay_mode_input(&mut self, decay_mode: DecayMode) {
        self.edit_settings(|s| s.decay_mode = decay_mode);
    }

    // --- Internals ---

    fn edit_settings(&mut self, edit: impl FnOnce(&mut Settings)) {
        if !self.connected() {
            return;
        }
        if let Some(settings) = self.settings.as_mut() {
            edit(settings);
            self.settings_modified = true;
            self.handle_settings_changed();
        }
    }

    fn connect_device(&mut self, device: &TicDevice) {
        // Close the old handle in case one is already open
        self.really_disconnect();
        self.connection_error = false;
        self.disconnected_by_user = false;

        match self.driver.open(device) {
            Ok(handle) => {
                info!("Connected to {}.", device);
                self.device_handle = Some(handle);
            }
            Err(e) => {
                error!("Failed to connect to {}: {}", device, e);
                self.set_connection_error("Failed to connect to device.");
                self.show_error(&e, "There was an error connecting to the device.");
                self.handle_model_changed();
                return;
            }
        }

        if let Some(handle) = self.device_handle.as_mut() {
            match handle.get_settings() {
                Ok(settings) => self.settings = Some(settings),
                Err(e) => {
                    self.settings = Some(Settings::defaults(device.product));
                    self.show_error(&e, "There was an error loading settings from the device.");
                }
            }
        }
        self.handle_settings_applied();

        if let Err(e) = self.reload_variables() {
            self.show_error(&e, "There was an error getting the status of the device.");
        }

        self.handle_model_changed();
    }

    /// Drops the handle and everything that only makes sense while connected.
    fn really_disconnect(&mut self) {
        self.device_handle = None;
        self.settings = None;
        self.settings_modified = false;
        self.variables = Variables::default();
        self.variables_update_failed = false;
    }

    fn disconnect_device_by_error(&mut self, error_message: &str) {
        self.really_disconnect();
        self.disconnected_by_user = false;
        self.set_connection_error(error_message);
    }

    fn set_connection_error(&mut self, error_message: &str) {
        self.connection_error = true;
        self.connection_error_message = error_message.to_string();
    }

    /// Returns true for success, false for failure.
    fn update_device_list(&mut self) -> bool {
        match self.driver.list_connected_devices() {
            Ok(new_list) => {
                self.device_list_changed = device_lists_different(&self.device_list, &new_list);
                if self.device_list_changed {
                    info!("Device list changed: {} device(s) attached.", new_list.len());
                }
                self.device_list = new_list;
                true
            }
            Err(e) => {
                error!("Failed to list devices: {}", e);
                // Polling retries every tick, so only the first failure pops up a dialog
                let already_reported =
                    self.connection_error && self.connection_error_message == LIST_ERROR_MESSAGE;
                self.set_connection_error(LIST_ERROR_MESSAGE);
                if !already_reported {
                    self.show_error(&e, "There was an error getting the list of devices.");
                }
                false
            }
        }
    }

    fn show_error(&mut self, error: &TicError, context: &str) {
        let message = if context.is_empty() {
            error.to_string()
        } else {
            format!("{}  {}", context, error)
        };
        self.window.show_error_message(&message);
    }

    fn reload_variables(&mut self) -> Result<()> {
        let Some(handle) = self.device_handle.as_mut() else {
            return Ok(());
        };
        match handle.get_variables(true) {
            Ok(variables) => {
                self.variables = variables;
                self.variables_update_failed = false;
                Ok(())
            }
            Err(e) => {
                self.variables_update_failed = true;
                self.variables = Variables::default();
                Err(e)
            }
        }
    }

    /// Called whenever we might be connected to a different device.
    fn handle_device_changed(&mut self) {
        match self.device_handle.as_ref() {
            Some(handle) => {
                let device = handle.device();
                self.window.set_device_name(device.name(), true);
                self.window.set_serial_number(&device.serial_number);
                self.window
                    .set_firmware_version(&handle.firmware_version_string());
                self.window.set_connection_status("", false);
            }
            None => {
                let value = "N/A";
                self.window.set_device_name(value, false);
                self.window.set_serial_number(value);
                self.window.set_firmware_version(value);
                if self.connection_error {
                    self.window
                        .set_connection_status(&self.connection_error_message, true);
                } else {
                    self.window.set_connection_status("", false);
                }
            }
        }

        if self.device_list_changed {
            self.window.set_device_list_contents(&self.device_list);
        }

        let connected = self.connected();
        let selected = self.device_handle.as_ref().map(|h| h.device().os_id.as_str());
        self.window.set_device_list_selected(selected);

        self.window
            .set_connect_enabled(!connected && !self.device_list.is_empty());
        self.window.set_disconnect_enabled(connected);
        self.window.set_reload_settings_enabled(connected);
        self.window.set_restore_defaults_enabled(connected);
        self.window.set_tab_pages_enabled(connected);
    }

    fn handle_variables_changed(&mut self) {
        self.window
            .set_variables(&self.variables, self.variables_update_failed);
    }

    fn handle_settings_changed(&mut self) {
        let connected = self.connected();
        self.window
            .set_settings(self.settings.as_ref().filter(|_| connected));
        self.window
            .set_apply_settings_enabled(connected && self.settings_modified);
    }

    /// Called when the cached settings match what is running on the device.
    fn handle_settings_applied(&mut self) {
        let serial_mode = self
            .settings
            .as_ref()
            .is_some_and(|s| s.control_mode == ControlMode::Serial);
        self.window.set_manual_target_enabled(serial_mode);
        self.settings_modified = false;
    }
}
