use crate::device::TicDevice;
use crate::settings::Settings;
use crate::variables::Variables;

/// What the controller drives when the model changes.
///
/// Setters only record what should be shown; the GUI reads the result back
/// when it draws. `confirm` blocks until the user answers.
pub trait Window {
    fn set_device_list_contents(&mut self, devices: &[TicDevice]);
    fn set_device_list_selected(&mut self, os_id: Option<&str>);

    /// `error` selects error styling for a non-empty status.
    fn set_connection_status(&mut self, status: &str, error: bool);

    fn set_device_name(&mut self, name: &str, link_enabled: bool);
    fn set_serial_number(&mut self, serial_number: &str);
    fn set_firmware_version(&mut self, firmware_version: &str);

    fn set_connect_enabled(&mut self, enabled: bool);
    fn set_disconnect_enabled(&mut self, enabled: bool);
    fn set_reload_settings_enabled(&mut self, enabled: bool);
    fn set_restore_defaults_enabled(&mut self, enabled: bool);
    fn set_tab_pages_enabled(&mut self, enabled: bool);
    fn set_apply_settings_enabled(&mut self, enabled: bool);
    fn set_manual_target_enabled(&mut self, enabled: bool);

    /// `update_failed` marks the snapshot as stale.
    fn set_variables(&mut self, variables: &Variables, update_failed: bool);
    fn set_settings(&mut self, settings: Option<&Settings>);

    fn confirm(&mut self, question: &str) -> bool;
    fn show_error_message(&mut self, message: &str);
    fn show_info_message(&mut self, message: &str);
}
