use crate::device::TicDevice;
use crate::error::Result;
use crate::settings::Settings;
use crate::variables::Variables;

/// Device enumeration and opening.
pub trait Driver {
    type Handle: DeviceHandle;

    /// Lists the Tics currently attached, in a stable order.
    fn list_connected_devices(&self) -> Result<Vec<TicDevice>>;

    fn open(&self, device: &TicDevice) -> Result<Self::Handle>;
}

/// An open connection to one Tic. Dropping the handle closes it.
pub trait DeviceHandle {
    fn device(&self) -> &TicDevice;

    fn firmware_version_string(&self) -> String {
        self.device().firmware_version_string()
    }

    fn get_settings(&mut self) -> Result<Settings>;

    /// Writes settings to non-volatile memory. They take effect after `reinitialize`.
    fn set_settings(&mut self, settings: &Settings) -> Result<()>;

    fn reinitialize(&mut self) -> Result<()>;

    fn restore_defaults(&mut self) -> Result<()>;

    fn get_variables(&mut self, clear_errors_occurred: bool) -> Result<Variables>;

    fn set_target_position(&mut self, position: i32) -> Result<()>;

    fn set_target_velocity(&mut self, velocity: i32) -> Result<()>;
}
