use crate::settings::{DecayMode, StepMode};
use crate::error::TicError;

pub const VENDOR_ID: u16 = 0x1FFB; // Pololu

// Tic models, keyed by USB product ID
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Product {
    T825,
    T834,
    T500,
    T249,
    Tic36v4,
}

impl Product {
    pub const ALL: [Product; 5] = [
        Product::T825,
        Product::T834,
        Product::T500,
        Product::T249,
        Product::Tic36v4,
    ];

    pub fn usb_product_id(self) -> u16 {
        match self {
            Product::T825 => 0x00B3,
            Product::T834 => 0x00B5,
            Product::T500 => 0x00BD,
            Product::T249 => 0x00C9,
            Product::Tic36v4 => 0x00CB,
        }
    }

    pub fn from_usb_product_id(product_id: u16) -> Result<Self, TicError> {
        Product::ALL
            .into_iter()
            .find(|p| p.usb_product_id() == product_id)
            .ok_or(TicError::UnknownProduct(product_id))
    }

    pub fn name(self) -> &'static str {
        match self {
            Product::T825 => "Tic T825 Stepper Motor Controller",
            Product::T834 => "Tic T834 Stepper Motor Controller",
            Product::T500 => "Tic T500 Stepper Motor Controller",
            Product::T249 => "Tic T249 Stepper Motor Controller",
            Product::Tic36v4 => "Tic 36v4 High-Power Stepper Motor Controller",
        }
    }

    /// Finest microstepping mode the driver chip supports.
    pub fn max_step_mode(self) -> StepMode {
        match self {
            Product::T500 => StepMode::Microstep8,
            Product::Tic36v4 => StepMode::Microstep256,
            _ => StepMode::Microstep32,
        }
    }

    pub fn supports_decay_mode(self, mode: DecayMode) -> bool {
        match self {
            Product::T825 => matches!(mode, DecayMode::Mixed | DecayMode::Slow | DecayMode::Fast),
            Product::T834 => true,
            // No user-selectable decay mode on the other drivers
            _ => mode == DecayMode::Mixed,
        }
    }

    /// Highest current limit code the device accepts.
    pub fn max_current_limit_code(self) -> u8 {
        match self {
            Product::T825 | Product::T834 => 124,
            Product::T500 => 32,
            Product::T249 => 112,
            Product::Tic36v4 => 127,
        }
    }

    /// Milliamps for a current limit code; codes past the maximum are capped.
    pub fn current_limit_code_to_ma(self, code: u8) -> u32 {
        let code = code.min(self.max_current_limit_code()) as u32;
        match self {
            Product::T500 => T500_CURRENT_TABLE[code as usize] as u32,
            Product::T249 => code * 40,
            Product::Tic36v4 => code * 71_615 / 1000,
            Product::T825 | Product::T834 => code * 32,
        }
    }

    /// Highest code whose current does not exceed `ma`.
    pub fn current_limit_ma_to_code(self, ma: u32) -> u8 {
        (0..=self.max_current_limit_code())
            .rev()
            .find(|&code| self.current_limit_code_to_ma(code) <= ma)
            .unwrap_or(0)
    }

    pub fn max_current_limit(self) -> u32 {
        self.current_limit_code_to_ma(self.max_current_limit_code())
    }
}

// The T500 driver's current limit is not linear in the code
const T500_CURRENT_TABLE: [u16; 33] = [
    0, 1, 174, 343, 495, 634, 762, 880, 990, 1092, 1189, 1281, 1368, 1452, 1532, 1611, 1687,
    1762, 1835, 1909, 1982, 2056, 2131, 2207, 2285, 2366, 2451, 2540, 2634, 2734, 2843, 2962,
    3093,
];

impl std::fmt::Display for Product {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

// A Tic found on the bus, identified by its OS id
#[derive(Debug, Clone, Eq)]
pub struct TicDevice {
    pub os_id: String,
    pub serial_number: String,
    pub product: Product,
    pub firmware_version: u16, // bcdDevice
}

impl PartialEq for TicDevice {
    fn eq(&self, other: &Self) -> bool {
        self.os_id == other.os_id
    }
}

impl TicDevice {
    pub fn name(&self) -> &'static str {
        self.product.name()
    }

    /// Formats the BCD firmware version like "1.06".
    pub fn firmware_version_string(&self) -> String {
        format!(
            "{}.{:02X}",
            self.firmware_version >> 8,
            self.firmware_version & 0xFF
        )
    }
}

// How the device is displayed in the device list
impl std::fmt::Display for TicDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "#{}, {}",
            if self.serial_number.is_empty() { "N/A" } else { &self.serial_number },
            self.product.name()
        )
    }
}

/// True if the two lists differ in length or in any device's OS id.
pub fn device_lists_different(a: &[TicDevice], b: &[TicDevice]) -> bool {
    a.len() != b.len() || a.iter().zip(b).any(|(x, y)| x.os_id != y.os_id)
}

/// True if a device with the same OS id is in the list.
pub fn device_list_includes(list: &[TicDevice], device: &TicDevice) -> bool {
    list.iter().any(|d| d.os_id == device.os_id)
}
