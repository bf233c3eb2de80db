use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use tic_control::controller::{ControllerOptions, MainController};
use tic_control::device::{Product, TicDevice};
use tic_control::driver::{DeviceHandle, Driver};
use tic_control::settings::{ControlMode, Settings, StepMode};
use tic_control::variables::{OperationState, Variables};
use tic_control::window::Window;
use tic_control::{Result, TicError};

// --- Fake device library ---

#[derive(Debug, Clone, PartialEq)]
enum Target {
    Position(i32),
    Velocity(i32),
}

#[derive(Default)]
struct Bus {
    devices: Vec<TicDevice>,
    settings: HashMap<String, Settings>,
    list_fails: bool,
    open_fails: bool,
    settings_fail: bool,
    variables_fail: bool,
    write_fails: bool,
    reinitialize_fails: bool,
    target_fails: bool,
    open_handles: usize,
    max_open_handles: usize,
    written: Vec<Settings>,
    reinitialized: usize,
    restored: usize,
    targets: Vec<Target>,
}

type SharedBus = Rc<RefCell<Bus>>;

struct FakeDriver(SharedBus);

struct FakeHandle {
    device: TicDevice,
    bus: SharedBus,
}

fn usb_failure() -> TicError {
    TicError::Usb(rusb::Error::Io)
}

impl Driver for FakeDriver {
    type Handle = FakeHandle;

    fn list_connected_devices(&self) -> Result<Vec<TicDevice>> {
        let bus = self.0.borrow();
        if bus.list_fails {
            return Err(usb_failure());
        }
        Ok(bus.devices.clone())
    }

    fn open(&self, device: &TicDevice) -> Result<FakeHandle> {
        let mut bus = self.0.borrow_mut();
        if bus.open_fails {
            return Err(TicError::Usb(rusb::Error::Access));
        }
        bus.open_handles += 1;
        bus.max_open_handles = bus.max_open_handles.max(bus.open_handles);
        Ok(FakeHandle {
            device: device.clone(),
            bus: self.0.clone(),
        })
    }
}

impl Drop for FakeHandle {
    fn drop(&mut self) {
        self.bus.borrow_mut().open_handles -= 1;
    }
}

impl DeviceHandle for FakeHandle {
    fn device(&self) -> &TicDevice {
        &self.device
    }

    fn get_settings(&mut self) -> Result<Settings> {
        let bus = self.bus.borrow();
        if bus.settings_fail {
            return Err(usb_failure());
        }
        Ok(bus
            .settings
            .get(&self.device.os_id)
            .cloned()
            .unwrap_or_else(|| Settings::defaults(self.device.product)))
    }

    fn set_settings(&mut self, settings: &Settings) -> Result<()> {
        let mut bus = self.bus.borrow_mut();
        if bus.write_fails {
            return Err(usb_failure());
        }
        bus.settings.insert(self.device.os_id.clone(), settings.clone());
        bus.written.push(settings.clone());
        Ok(())
    }

    fn reinitialize(&mut self) -> Result<()> {
        let mut bus = self.bus.borrow_mut();
        if bus.reinitialize_fails {
            return Err(TicError::Usb(rusb::Error::Pipe));
        }
        bus.reinitialized += 1;
        Ok(())
    }

    fn restore_defaults(&mut self) -> Result<()> {
        let mut bus = self.bus.borrow_mut();
        bus.restored += 1;
        bus.settings
            .insert(self.device.os_id.clone(), Settings::defaults(self.device.product));
        Ok(())
    }

    fn get_variables(&mut self, _clear_errors_occurred: bool) -> Result<Variables> {
        if self.bus.borrow().variables_fail {
            return Err(usb_failure());
        }
        Ok(Variables {
            operation_state: OperationState::Normal,
            vin_voltage: 12_000,
            ..Variables::default()
        })
    }

    fn set_target_position(&mut self, position: i32) -> Result<()> {
        let mut bus = self.bus.borrow_mut();
        if bus.target_fails {
            return Err(usb_failure());
        }
        bus.targets.push(Target::Position(position));
        Ok(())
    }

    fn set_target_velocity(&mut self, velocity: i32) -> Result<()> {
        let mut bus = self.bus.borrow_mut();
        if bus.target_fails {
            return Err(usb_failure());
        }
        bus.targets.push(Target::Velocity(velocity));
        Ok(())
    }
}

// --- Recording window ---

#[derive(Default)]
struct FakeWindow {
    answers: VecDeque<bool>, // replies to confirm(); empty means yes
    questions: Vec<String>,
    errors: Vec<String>,
    infos: Vec<String>,
    device_list: Vec<TicDevice>,
    selected: Option<String>,
    status: (String, bool),
    device_name: String,
    connect_enabled: bool,
    disconnect_enabled: bool,
    tab_pages_enabled: bool,
    apply_enabled: bool,
    manual_target_enabled: bool,
    variables: Variables,
    variables_stale: bool,
    settings: Option<Settings>,
}

impl Window for FakeWindow {
    fn set_device_list_contents(&mut self, devices: &[TicDevice]) {
        self.device_list = devices.to_vec();
    }
    fn set_device_list_selected(&mut self, os_id: Option<&str>) {
        self.selected = os_id.map(str::to_string);
    }
    fn set_connection_status(&mut self, status: &str, error: bool) {
        self.status = (status.to_string(), error);
    }
    fn set_device_name(&mut self, name: &str, _link_enabled: bool) {
        self.device_name = name.to_string();
    }
    fn set_serial_number(&mut self, _serial_number: &str) {}
    fn set_firmware_version(&mut self, _firmware_version: &str) {}
    fn set_connect_enabled(&mut self, enabled: bool) {
        self.connect_enabled = enabled;
    }
    fn set_disconnect_enabled(&mut self, enabled: bool) {
        self.disconnect_enabled = enabled;
    }
    fn set_reload_settings_enabled(&mut self, _enabled: bool) {}
    fn set_restore_defaults_enabled(&mut self, _enabled: bool) {}
    fn set_tab_pages_enabled(&mut self, enabled: bool) {
        self.tab_pages_enabled = enabled;
    }
    fn set_apply_settings_enabled(&mut self, enabled: bool) {
        self.apply_enabled = enabled;
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
        self.questions.push(question.to_string());
        self.answers.pop_front().unwrap_or(true)
    }
    fn show_error_message(&mut self, message: &str) {
        self.errors.push(message.to_string());
    }
    fn show_info_message(&mut self, message: &str) {
        self.infos.push(message.to_string());
    }
}

// --- Helpers ---

type Controller = MainController<FakeDriver, FakeWindow>;

fn tic(os_id: &str, serial: &str) -> TicDevice {
    TicDevice {
        os_id: os_id.to_string(),
        serial_number: serial.to_string(),
        product: Product::T825,
        firmware_version: 0x0106,
    }
}

fn setup(devices: Vec<TicDevice>) -> (Controller, SharedBus) {
    let bus = Rc::new(RefCell::new(Bus {
        devices,
        ..Bus::default()
    }));
    let controller = MainController::new(
        FakeDriver(bus.clone()),
        FakeWindow::default(),
        ControllerOptions::default(),
    );
    (controller, bus)
}

fn connected_setup() -> (Controller, SharedBus) {
    let (mut controller, bus) = setup(vec![tic("1-1", "00000001")]);
    controller.start();
    assert!(controller.connected());
    (controller, bus)
}

// --- Connection ---

#[test]
fn test_start_connects_to_first_device() {
    let (mut controller, bus) = setup(vec![tic("1-1", "00000001"), tic("1-2", "00000002")]);
    controller.start();

    assert!(controller.connected());
    assert_eq!(controller.connected_device().unwrap().os_id, "1-1");
    assert!(controller.settings().is_some());
    assert!(!controller.settings_modified());
    assert_eq!(controller.variables().operation_state, OperationState::Normal);

    let window = controller.window();
    assert_eq!(window.device_list.len(), 2);
    assert_eq!(window.selected.as_deref(), Some("1-1"));
    assert_eq!(window.device_name, "Tic T825 Stepper Motor Controller");
    assert_eq!(window.status, (String::new(), false));
    assert!(!window.connect_enabled);
    assert!(window.disconnect_enabled);
    assert!(window.tab_pages_enabled);
    assert!(window.manual_target_enabled);
    assert!(window.settings.is_some());
    assert_eq!(bus.borrow().open_handles, 1);
}

#[test]
fn test_start_without_devices_stays_disconnected() {
    let (mut controller, _bus) = setup(vec![]);
    controller.start();

    assert!(!controller.connected());
    assert!(controller.connection_error().is_none());
    let window = controller.window();
    assert_eq!(window.device_name, "N/A");
    assert!(!window.connect_enabled);
    assert!(window.settings.is_none());
}

#[test]
fn test_start_with_serial_prefers_matching_device() {
    let (mut controller, _bus) = setup(vec![tic("1-1", "00000001"), tic("1-2", "00000002")]);
    controller.start_with_serial("00000002");
    assert_eq!(controller.connected_device().unwrap().os_id, "1-2");
}

#[test]
fn test_connect_then_disconnect_releases_handle() {
    let (mut controller, bus) = connected_setup();

    assert!(controller.disconnect_device());

    assert!(!controller.connected());
    assert!(controller.disconnected_by_user());
    assert!(controller.connection_error().is_none());
    assert!(controller.settings().is_none());
    assert_eq!(bus.borrow().open_handles, 0);

    let window = controller.window();
    assert!(window.connect_enabled);
    assert!(!window.disconnect_enabled);
    assert!(window.selected.is_none());
    assert!(window.settings.is_none());
}

#[test]
fn test_failed_connect_sets_connection_error() {
    let (mut controller, bus) = setup(vec![tic("1-1", "00000001")]);
    bus.borrow_mut().open_fails = true;

    controller.start();

    assert!(!controller.connected());
    assert_eq!(controller.connection_error(), Some("Failed to connect to device."));
    let window = controller.window();
    assert_eq!(window.status, ("Failed to connect to device.".to_string(), true));
    assert_eq!(window.errors.len(), 1);
    assert!(window.errors[0].starts_with("There was an error connecting to the device.  USB error:"));
}

#[test]
fn test_connect_with_os_id_switches_devices() {
    let (mut controller, bus) = setup(vec![tic("1-1", "00000001"), tic("1-2", "00000002")]);
    controller.start();

    controller.connect_device_with_os_id("1-2");

    assert_eq!(controller.connected_device().unwrap().os_id, "1-2");
    assert!(!controller.disconnected_by_user());
    assert_eq!(controller.window().selected.as_deref(), Some("1-2"));
    let bus = bus.borrow();
    assert_eq!(bus.open_handles, 1);
    assert_eq!(bus.max_open_handles, 1);
}

#[test]
fn test_connect_with_unknown_os_id_does_nothing() {
    let (mut controller, _bus) = setup(vec![tic("1-1", "00000001")]);
    controller.start();
    controller.disconnect_device();

    controller.connect_device_with_os_id("9-9");
    assert!(!controller.connected());
}

#[test]
fn test_disconnect_with_unapplied_changes_can_be_refused() {
    let (mut controller, _bus) = connected_setup();
    controller.handle_speed_max_input(1234);
    controller.window_mut().answers.push_back(false);

    assert!(!controller.disconnect_device());

    assert!(controller.connected());
    assert!(controller.settings_modified());
    assert_eq!(controller.window().questions.len(), 1);
}

#[test]
fn test_switching_devices_can_be_refused() {
    let (mut controller, bus) = setup(vec![tic("1-1", "00000001"), tic("1-2", "00000002")]);
    controller.start();
    controller.handle_speed_min_input(100);
    controller.window_mut().answers.push_back(false);

    controller.connect_device_with_os_id("1-2");

    assert_eq!(controller.connected_device().unwrap().os_id, "1-1");
    assert!(controller.settings_modified());
    assert_eq!(controller.settings().unwrap().speed_min, 100);
    assert_eq!(controller.window().questions.len(), 1);
    assert_eq!(bus.borrow().open_handles, 1);
}

#[test]
fn test_connect_falls_back_to_defaults_when_settings_fail() {
    let (mut controller, bus) = setup(vec![tic("1-1", "00000001")]);
    let mut custom = Settings::defaults(Product::T825);
    custom.speed_max = 1000;
    bus.borrow_mut().settings.insert("1-1".to_string(), custom);
    bus.borrow_mut().settings_fail = true;

    controller.start();

    assert!(controller.connected());
    assert!(controller.connection_error().is_none());
    assert!(!controller.settings_modified());
    assert_eq!(controller.settings(), Some(&Settings::defaults(Product::T825)));
    let window = controller.window();
    assert_eq!(window.errors.len(), 1);
    assert!(window.errors[0].starts_with("There was an error loading settings from the device.  USB error:"));
    assert_eq!(window.settings, Some(Settings::defaults(Product::T825)));
}

// --- Settings ---

#[test]
fn test_field_edit_marks_settings_modified() {
    let (mut controller, _bus) = connected_setup();
    assert!(!controller.window().apply_enabled);

    controller.handle_control_mode_input(ControlMode::AnalogPosition);
    controller.handle_accel_max_input(5000);

    assert!(controller.settings_modified());
    let settings = controller.settings().unwrap();
    assert_eq!(settings.control_mode, ControlMode::AnalogPosition);
    assert_eq!(settings.accel_max, 5000);
    let window = controller.window();
    assert!(window.apply_enabled);
    assert_eq!(window.settings.as_ref().unwrap().accel_max, 5000);
}

#[test]
fn test_field_edit_ignored_when_disconnected() {
    let (mut controller, _bus) = setup(vec![]);
    controller.start();

    controller.handle_current_limit_input(1000);

    assert!(!controller.settings_modified());
    assert!(controller.settings().is_none());
}

#[test]
fn test_apply_settings_writes_and_reinitializes() {
    let (mut controller, bus) = connected_setup();
    controller.handle_control_mode_input(ControlMode::RcSpeed);
    controller.handle_current_limit_input(640);

    controller.apply_settings();

    assert!(!controller.settings_modified());
    assert!(controller.window().questions.is_empty());
    assert!(!controller.window().apply_enabled);
    // Manual targets are only accepted in serial mode
    assert!(!controller.window().manual_target_enabled);
    let bus = bus.borrow();
    assert_eq!(bus.written.len(), 1);
    assert_eq!(bus.written[0].control_mode, ControlMode::RcSpeed);
    assert_eq!(bus.written[0].current_limit, 640);
    assert_eq!(bus.reinitialized, 1);
}

#[test]
fn test_apply_invalid_settings_asks_before_fixing() {
    let (mut controller, bus) = connected_setup();
    controller.handle_input_min_input(3000);
    controller.handle_input_max_input(1000);
    controller.window_mut().answers.push_back(false);

    controller.apply_settings();

    assert!(controller.settings_modified());
    assert_eq!(controller.settings().unwrap().input_min, 3000);
    assert!(bus.borrow().written.is_empty());
    let question = &controller.window().questions[0];
    assert!(question.contains("swapped"));
    assert!(question.ends_with("Accept these changes and apply settings?"));

    controller.apply_settings();

    assert!(!controller.settings_modified());
    assert_eq!(controller.settings().unwrap().input_min, 1000);
    assert_eq!(controller.settings().unwrap().input_max, 3000);
    assert_eq!(bus.borrow().written[0].input_min, 1000);
}

#[test]
fn test_failed_write_keeps_settings_modified() {
    let (mut controller, bus) = connected_setup();
    bus.borrow_mut().write_fails = true;
    controller.handle_accel_max_input(7000);

    controller.apply_settings();

    assert!(controller.settings_modified());
    assert_eq!(controller.settings().unwrap().accel_max, 7000);
    assert!(controller.window().apply_enabled);
    let errors = &controller.window().errors;
    assert_eq!(errors.len(), 1);
    assert!(errors[0].starts_with("USB error:"));
    assert_eq!(bus.borrow().reinitialized, 0);
}

#[test]
fn test_failed_reinitialize_keeps_settings_modified() {
    let (mut controller, bus) = connected_setup();
    bus.borrow_mut().reinitialize_fails = true;
    controller.handle_step_mode_input(StepMode::Half);

    controller.apply_settings();

    assert!(controller.settings_modified());
    assert!(controller.window().apply_enabled);
    let errors = &controller.window().errors;
    assert_eq!(errors.len(), 1);
    assert!(errors[0].starts_with("USB error:"));
    assert_eq!(bus.borrow().written.len(), 1);
}

#[test]
fn test_reload_settings_discards_changes() {
    let (mut controller, _bus) = connected_setup();
    controller.handle_output_max_input(999);

    controller.reload_settings();

    assert_eq!(controller.window().questions.len(), 1);
    assert!(!controller.settings_modified());
    assert_eq!(controller.settings().unwrap().output_max, 200);
}

#[test]
fn test_failed_reload_keeps_settings_modified() {
    let (mut controller, bus) = connected_setup();
    bus.borrow_mut().settings_fail = true;

    controller.reload_settings();

    assert!(controller.settings_modified());
    assert!(controller.window().apply_enabled);
    assert!(controller.window().errors[0]
        .starts_with("There was an error loading the settings from the device."));
}

#[test]
fn test_restore_default_settings() {
    let (mut controller, bus) = setup(vec![tic("1-1", "00000001")]);
    let mut custom = Settings::defaults(Product::T825);
    custom.current_limit = 1024;
    bus.borrow_mut().settings.insert("1-1".to_string(), custom);
    controller.start();
    assert_eq!(controller.settings().unwrap().current_limit, 1024);

    controller.restore_default_settings();

    assert_eq!(bus.borrow().restored, 1);
    assert_eq!(controller.settings(), Some(&Settings::defaults(Product::T825)));
    let window = controller.window();
    assert_eq!(window.questions.len(), 1);
    assert_eq!(window.infos.len(), 1);
}

#[test]
fn test_restore_default_settings_refused() {
    let (mut controller, bus) = connected_setup();
    controller.window_mut().answers.push_back(false);

    controller.restore_default_settings();

    assert_eq!(bus.borrow().restored, 0);
    assert!(controller.window().infos.is_empty());
}

// --- Periodic update ---

#[test]
fn test_update_refreshes_variables() {
    let (mut controller, _bus) = connected_setup();
    controller.update();

    assert!(controller.connected());
    assert!(!controller.variables_update_failed());
    assert_eq!(controller.window().variables.vin_voltage, 12_000);
}

#[test]
fn test_update_keeps_polling_after_variable_failures() {
    let (mut controller, bus) = connected_setup();
    bus.borrow_mut().variables_fail = true;

    controller.update();
    controller.update();

    assert!(controller.connected());
    assert!(controller.variables_update_failed());
    assert_eq!(controller.variables(), &Variables::default());
    assert!(controller.window().variables_stale);
    assert!(controller.window().errors.is_empty());

    bus.borrow_mut().variables_fail = false;
    controller.update();
    assert!(!controller.variables_update_failed());
    assert!(!controller.window().variables_stale);
}

#[test]
fn test_update_detects_lost_device() {
    let (mut controller, bus) = connected_setup();
    bus.borrow_mut().devices.clear();

    controller.update();

    assert!(!controller.connected());
    assert!(!controller.disconnected_by_user());
    assert_eq!(
        controller.connection_error(),
        Some("The connection to the device was lost.")
    );
    assert_eq!(
        controller.window().status,
        ("The connection to the device was lost.".to_string(), true)
    );
    assert_eq!(bus.borrow().open_handles, 0);

    // No automatic reconnect after an error
    bus.borrow_mut().devices.push(tic("1-1", "00000001"));
    controller.update();
    assert!(!controller.connected());
    assert_eq!(controller.window().device_list.len(), 1);
    assert!(controller.window().connect_enabled);

    // Connecting by hand clears the error
    controller.connect_device_with_os_id("1-1");
    assert!(controller.connected());
    assert!(controller.connection_error().is_none());
}

#[test]
fn test_update_auto_connects_single_device() {
    let (mut controller, bus) = setup(vec![]);
    controller.start();
    assert!(!controller.connected());

    bus.borrow_mut().devices.push(tic("1-1", "00000001"));
    controller.update();

    assert!(controller.connected());
}

#[test]
fn test_update_does_not_auto_connect_with_several_devices() {
    let (mut controller, bus) = setup(vec![]);
    controller.start();

    bus.borrow_mut().devices = vec![tic("1-1", "00000001"), tic("1-2", "00000002")];
    controller.update();

    assert!(!controller.connected());
    assert_eq!(controller.window().device_list.len(), 2);
}

#[test]
fn test_update_respects_user_disconnect() {
    let (mut controller, _bus) = connected_setup();
    controller.disconnect_device();

    controller.update();

    assert!(!controller.connected());
}

#[test]
fn test_update_respects_auto_connect_option() {
    let bus = Rc::new(RefCell::new(Bus::default()));
    let mut controller = MainController::new(
        FakeDriver(bus.clone()),
        FakeWindow::default(),
        ControllerOptions { auto_connect: false },
    );
    controller.start();

    bus.borrow_mut().devices.push(tic("1-1", "00000001"));
    controller.update();

    assert!(!controller.connected());
}

#[test]
fn test_device_list_failure_reported_once() {
    let (mut controller, bus) = setup(vec![tic("1-1", "00000001")]);
    bus.borrow_mut().list_fails = true;

    controller.start();
    controller.update();
    controller.update();

    assert!(!controller.connected());
    assert_eq!(controller.connection_error(), Some("Failed to get the list of devices."));
    assert_eq!(controller.window().errors.len(), 1);
    assert!(controller.window().errors[0].starts_with("There was an error getting the list of devices."));
}

// --- Exit and manual targets ---

#[test]
fn test_exit_asks_only_with_unapplied_changes() {
    let (mut controller, _bus) = connected_setup();
    assert!(controller.exit());
    assert!(controller.window().questions.is_empty());

    controller.handle_decel_max_input(500);
    controller.window_mut().answers.push_back(false);
    assert!(!controller.exit());
    assert!(controller.exit());
    assert_eq!(controller.window().questions.len(), 2);
}

#[test]
fn test_manual_targets() {
    let (mut controller, bus) = connected_setup();

    controller.set_target_position(500);
    controller.set_target_velocity(-2000);

    assert_eq!(
        bus.borrow().targets,
        vec![Target::Position(500), Target::Velocity(-2000)]
    );

    controller.disconnect_device();
    controller.set_target_position(1);
    assert_eq!(bus.borrow().targets.len(), 2);
}

#[test]
fn test_failed_manual_target_shows_bare_error() {
    let (mut controller, bus) = connected_setup();
    bus.borrow_mut().target_fails = true;

    controller.set_target_position(500);
    controller.set_target_velocity(10);

    assert!(controller.connected());
    assert!(bus.borrow().targets.is_empty());
    let errors = &controller.window().errors;
    assert_eq!(errors.len(), 2);
    for message in errors {
        assert!(message.starts_with("USB error:"));
        assert!(!message.contains("  "));
    }
}
