use crate::device::TicDevice;
use crate::settings::Settings;
use crate::variables::Variables;
use crate::window::Window;
use crate::PROGRAM_TITLE;
use rfd::{MessageButtons, MessageDialog, MessageDialogResult, MessageLevel};

/// Everything the egui panels draw, as last reported by the controller.
#[derive(Debug, Clone)]
pub struct WindowModel {
    pub device_list: Vec<TicDevice>,
    pub selected_os_id: Option<String>,
    pub connection_status: String,
    pub connection_status_is_error: bool,
    pub device_name: String,
    pub device_name_is_link: bool,
    pub serial_number: String,
    pub firmware_version: String,

    pub connect_enabled: bool,
    pub disconnect_enabled: bool,
    pub reload_settings_enabled: bool,
    pub restore_defaults_enabled: bool,
    pub tab_pages_enabled: bool,
    pub apply_settings_enabled: bool,
    pub manual_target_enabled: bool,

    pub variables: Variables,
    pub variables_stale: bool,
    pub settings: Option<Settings>,

    // Manual target widgets; edited by the GUI, not the controller
    pub target_position: i32,
    pub target_velocity: i32,
}

impl Default for WindowModel {
    fn default() -> Self {
        Self {
            device_list: vec![],
            selected_os_id: None,
            connection_status: String::new(),
            connection_status_is_error: false,
            device_name: String::from("N/A"),
            device_name_is_link: false,
            serial_number: String::from("N/A"),
            firmware_version: String::from("N/A"),
            connect_enabled: false,
            disconnect_enabled: false,
            reload_settings_enabled: false,
            restore_defaults_enabled: false,
            tab_pages_enabled: false,
            apply_settings_enabled: false,
            manual_target_enabled: false,
            variables: Variables::default(),
            variables_stale: false,
            settings: None,
            target_position: 0,
            target_velocity: 0,
        }
    }
}

impl Window for WindowModel {
    fn set_device_list_contents(&mut self, devices: &[TicDevice]) {
        self.device_list = devices.to_vec();
    }

    fn set_device_list_selected(&mut self, os_id: Option<&str>) {
        self.selected_os_id = os_id.map(str::to_string);
    }

    fn set_connection_status(&mut self, status: &str, error: bool) {
        self.connection_status = status.to_string();
        self.connection_status_is_error = error;
    }

    fn set_device_name(&mut self, name: &str, link_enabled: bool) {
        self.device_name = name.to_string();
        self.device_name_is_link = link_enabled;
    }

    fn set_serial_number(&mut self, serial_number: &str) {
        self.serial_number = serial_number.to_string();
    }

    fn set_firmware_version(&mut self, firmware_version: &str) {
        self.firmware_version = firmware_version.to_string();
    }

    fn set_connect_enabled(&mut self, enabled: bool) {
        self.connect_enabled = enabled;
    }

    fn set_disconnect_enabled(&mut self, enabled: bool) {
        self.disconnect_enabled = enabled;
    }

    fn set_reload_settings_enabled(&mut self, enabled: bool) {
        self.reload_settings_enabled = enabled;
    }

    fn set_restore_defaults_enabled(&mut self, enabled: bool) {
        self.restore_defaults_enabled = enabled;
    }

    fn set_tab_pages_enabled(&mut self, enabled: bool) {
        self.tab_pages_enabled = enabled;
    }

    fn set_apply_settings_enabled(&mut self, enabled: bool) {
        self.apply_settings_enabled = enabled;
    }

    fn set_manual_target_enabled(&mut self, enabled: bool) {
        self.manual_target_enabled = enabled;
    }

    fn set_variables(&mut self, variables: &Variables, update_failed: bool) {
        self.variables = variables.clone();
        self.variables_stale = update_failed;
    }

    fn set_settings(&mut self, settings: Option<&Settings>) {
        self.settings = settings.cloned();
    }

    fn confirm(&mut self, question: &str) -> bool {
        let answer = MessageDialog::new()
            .set_title(PROGRAM_TITLE)
            .set_description(question)
            .set_buttons(MessageButtons::YesNo)
            .set_level(MessageLevel::Warning)
            .show();
        answer == MessageDialogResult::Yes
    }

    fn show_error_message(&mut self, message: &str) {
        log::error!("{}", message);
        MessageDialog::new()
            .set_title(PROGRAM_TITLE)
            .set_description(message)
            .set_buttons(MessageButtons::Ok)
            .set_level(MessageLevel::Error)
            .show();
    }

    fn show_info_message(&mut self, message: &str) {
        log::info!("{}", message);
        MessageDialog::new()
            .set_title(PROGRAM_TITLE)
            .set_description(message)
            .set_buttons(MessageButtons::Ok)
            .set_level(MessageLevel::Info)
            .show();
    }
}
