// Run-time status read back from the Tic

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum OperationState {
    #[default]
    Reset,
    Deenergized,
    SoftError,
    WaitingForErrLine,
    StartingUp,
    Normal,
    Unknown(u8),
}

impl OperationState {
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => OperationState::Reset,
            2 => OperationState::Deenergized,
            4 => OperationState::SoftError,
            6 => OperationState::WaitingForErrLine,
            8 => OperationState::StartingUp,
            10 => OperationState::Normal,
            other => OperationState::Unknown(other),
        }
    }
}

impl std::fmt::Display for OperationState {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            OperationState::Reset => write!(f, "Reset"),
            OperationState::Deenergized => write!(f, "De-energized"),
            OperationState::SoftError => write!(f, "Soft error"),
            OperationState::WaitingForErrLine => write!(f, "Waiting for ERR line"),
            OperationState::StartingUp => write!(f, "Starting up"),
            OperationState::Normal => write!(f, "Normal"),
            OperationState::Unknown(v) => write!(f, "Unknown ({})", v),
        }
    }
}

/// Names of the bits in the error status / errors occurred registers, by bit position.
pub const ERROR_NAMES: [&str; 9] = [
    "Intentionally de-energized",
    "Motor driver error",
    "Low VIN",
    "Kill switch active",
    "Required input invalid",
    "Serial error",
    "Command timeout",
    "Safe start violation",
    "ERR line high",
];

/// Returns the names of the error bits set in `bits`.
pub fn error_names(bits: u32) -> Vec<&'static str> {
    ERROR_NAMES
        .iter()
        .enumerate()
        .filter(|(i, _)| bits & (1 << i) != 0)
        .map(|(_, name)| *name)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Variables {
    pub operation_state: OperationState,
    pub energized: bool,
    pub position_uncertain: bool,
    pub error_status: u16,
    pub errors_occurred: u32,
    pub planning_mode: u8,
    pub target_position: i32,
    pub target_velocity: i32,
    pub starting_speed: u32,
    pub max_speed: u32,
    pub max_decel: u32,
    pub max_accel: u32,
    pub current_position: i32,
    pub current_velocity: i32,
    pub acting_target_position: i32,
    pub time_since_last_step: u32,
    pub device_reset: u8,
    pub vin_voltage: u16, // millivolts
    pub up_time: u32,     // milliseconds
    pub encoder_position: i32,
    pub rc_pulse_width: u16,
    pub step_mode: u8,
    pub current_limit_code: u8,
    pub decay_mode: u8,
    pub input_state: u8,
    pub input_after_averaging: u16,
    pub input_after_hysteresis: u16,
    pub input_after_scaling: i32,
}

impl Variables {
    /// Formats `up_time` as "H:MM:SS".
    pub fn up_time_string(&self) -> String {
        let total_seconds = self.up_time / 1000;
        format!(
            "{}:{:02}:{:02}",
            total_seconds / 3600,
            total_seconds / 60 % 60,
            total_seconds % 60
        )
    }
}
