use crate::device::Product;
use crate::error::{Result, TicError};
use crate::settings::{ControlMode, DecayMode, Settings, StepMode};
use crate::variables::{OperationState, Variables};
use log::warn;

// Vendor-specific USB requests
pub const CMD_SET_TARGET_POSITION: u8 = 0xE0;
pub const CMD_SET_TARGET_VELOCITY: u8 = 0xE3;
pub const CMD_GET_VARIABLE: u8 = 0xA1;
pub const CMD_GET_VARIABLE_AND_CLEAR_ERRORS_OCCURRED: u8 = 0xA2;
pub const CMD_GET_SETTING: u8 = 0xA8;
pub const CMD_SET_SETTING: u8 = 0x13;
pub const CMD_REINITIALIZE: u8 = 0x10;

// Setting offsets
pub const SETTING_NOT_INITIALIZED: u8 = 0x00;
const SETTING_CONTROL_MODE: usize = 0x01;
const SETTING_INPUT_MIN: usize = 0x22;
const SETTING_INPUT_NEUTRAL_MIN: usize = 0x24;
const SETTING_INPUT_NEUTRAL_MAX: usize = 0x26;
const SETTING_INPUT_MAX: usize = 0x28;
const SETTING_OUTPUT_MIN: usize = 0x2A;
const SETTING_OUTPUT_MAX: usize = 0x32;
const SETTING_CURRENT_LIMIT: usize = 0x40;
const SETTING_STEP_MODE: usize = 0x41;
const SETTING_DECAY_MODE: usize = 0x42;
const SETTING_STARTING_SPEED: usize = 0x43;
const SETTING_SPEED_MAX: usize = 0x47;
const SETTING_DECEL_MAX: usize = 0x4B;
const SETTING_ACCEL_MAX: usize = 0x4F;

pub const SETTINGS_SIZE: usize = 0x58;

// Variable offsets
const VAR_OPERATION_STATE: usize = 0x00;
const VAR_MISC_FLAGS1: usize = 0x01;
const VAR_ERROR_STATUS: usize = 0x02;
const VAR_ERRORS_OCCURRED: usize = 0x04;
const VAR_PLANNING_MODE: usize = 0x09;
const VAR_TARGET_POSITION: usize = 0x0A;
const VAR_TARGET_VELOCITY: usize = 0x0E;
const VAR_STARTING_SPEED: usize = 0x12;
const VAR_SPEED_MAX: usize = 0x16;
const VAR_DECEL_MAX: usize = 0x1A;
const VAR_ACCEL_MAX: usize = 0x1E;
const VAR_CURRENT_POSITION: usize = 0x22;
const VAR_CURRENT_VELOCITY: usize = 0x26;
const VAR_ACTING_TARGET_POSITION: usize = 0x2A;
const VAR_TIME_SINCE_LAST_STEP: usize = 0x2E;
const VAR_DEVICE_RESET: usize = 0x32;
const VAR_VIN_VOLTAGE: usize = 0x33;
const VAR_UP_TIME: usize = 0x35;
const VAR_ENCODER_POSITION: usize = 0x39;
const VAR_RC_PULSE_WIDTH: usize = 0x3D;
const VAR_STEP_MODE: usize = 0x49;
const VAR_CURRENT_LIMIT: usize = 0x4A;
const VAR_DECAY_MODE: usize = 0x4B;
const VAR_INPUT_STATE: usize = 0x4C;
const VAR_INPUT_AFTER_AVERAGING: usize = 0x4D;
const VAR_INPUT_AFTER_HYSTERESIS: usize = 0x4F;
const VAR_INPUT_AFTER_SCALING: usize = 0x51;

pub const VARIABLES_SIZE: usize = 0x55;

const MISC_FLAGS1_ENERGIZED: u8 = 1 << 0;
const MISC_FLAGS1_POSITION_UNCERTAIN: u8 = 1 << 1;

fn read_u16(buf: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([buf[offset], buf[offset + 1]])
}

fn read_u32(buf: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([buf[offset], buf[offset + 1], buf[offset + 2], buf[offset + 3]])
}

fn read_i32(buf: &[u8], offset: usize) -> i32 {
    read_u32(buf, offset) as i32
}

fn push_bytes(writes: &mut Vec<(u8, u8)>, offset: usize, bytes: &[u8]) {
    for (i, b) in bytes.iter().enumerate() {
        writes.push(((offset + i) as u8, *b));
    }
}

/// Splits a 32-bit command argument into the (wValue, wIndex) pair of a control transfer.
pub fn split_u32(value: u32) -> (u16, u16) {
    (value as u16, (value >> 16) as u16)
}

/// Decodes the managed fields out of a raw settings block.
///
/// Out-of-range enum bytes fall back to the factory default for that field
/// so a half-initialized device still loads.
pub fn decode_settings(product: Product, buf: &[u8]) -> Result<Settings> {
    if buf.len() < SETTINGS_SIZE {
        return Err(TicError::ShortRead {
            expected: SETTINGS_SIZE,
            actual: buf.len(),
        });
    }

    let defaults = Settings::defaults(product);

    let control_mode = ControlMode::from_u8(buf[SETTING_CONTROL_MODE]).unwrap_or_else(|| {
        warn!("Unknown control mode {} in settings.", buf[SETTING_CONTROL_MODE]);
        defaults.control_mode
    });
    let step_mode = StepMode::from_u8(buf[SETTING_STEP_MODE]).unwrap_or_else(|| {
        warn!("Unknown step mode {} in settings.", buf[SETTING_STEP_MODE]);
        defaults.step_mode
    });
    let decay_mode = DecayMode::from_u8(buf[SETTING_DECAY_MODE]).unwrap_or_else(|| {
        warn!("Unknown decay mode {} in settings.", buf[SETTING_DECAY_MODE]);
        defaults.decay_mode
    });

    Ok(Settings {
        product,
        control_mode,
        input_min: read_u16(buf, SETTING_INPUT_MIN),
        input_neutral_min: read_u16(buf, SETTING_INPUT_NEUTRAL_MIN),
        input_neutral_max: read_u16(buf, SETTING_INPUT_NEUTRAL_MAX),
        input_max: read_u16(buf, SETTING_INPUT_MAX),
        output_min: read_i32(buf, SETTING_OUTPUT_MIN),
        output_max: read_i32(buf, SETTING_OUTPUT_MAX),
        speed_max: read_u32(buf, SETTING_SPEED_MAX),
        speed_min: read_u32(buf, SETTING_STARTING_SPEED),
        accel_max: read_u32(buf, SETTING_ACCEL_MAX),
        decel_max: read_u32(buf, SETTING_DECEL_MAX),
        step_mode,
        current_limit: product.current_limit_code_to_ma(buf[SETTING_CURRENT_LIMIT]),
        decay_mode,
    })
}

/// Encodes the managed fields as single-byte (offset, value) setting writes.
pub fn encode_settings(settings: &Settings) -> Vec<(u8, u8)> {
    let mut writes = Vec::new();
    let current_code = settings.product.current_limit_ma_to_code(settings.current_limit);

    push_bytes(&mut writes, SETTING_CONTROL_MODE, &[settings.control_mode as u8]);
    push_bytes(&mut writes, SETTING_INPUT_MIN, &settings.input_min.to_le_bytes());
    push_bytes(&mut writes, SETTING_INPUT_NEUTRAL_MIN, &settings.input_neutral_min.to_le_bytes());
    push_bytes(&mut writes, SETTING_INPUT_NEUTRAL_MAX, &settings.input_neutral_max.to_le_bytes());
    push_bytes(&mut writes, SETTING_INPUT_MAX, &settings.input_max.to_le_bytes());
    push_bytes(&mut writes, SETTING_OUTPUT_MIN, &settings.output_min.to_le_bytes());
    push_bytes(&mut writes, SETTING_OUTPUT_MAX, &settings.output_max.to_le_bytes());
    push_bytes(&mut writes, SETTING_CURRENT_LIMIT, &[current_code]);
    push_bytes(&mut writes, SETTING_STEP_MODE, &[settings.step_mode as u8]);
    push_bytes(&mut writes, SETTING_DECAY_MODE, &[settings.decay_mode as u8]);
    push_bytes(&mut writes, SETTING_STARTING_SPEED, &settings.speed_min.to_le_bytes());
    push_bytes(&mut writes, SETTING_SPEED_MAX, &settings.speed_max.to_le_bytes());
    push_bytes(&mut writes, SETTING_DECEL_MAX, &settings.decel_max.to_le_bytes());
    push_bytes(&mut writes, SETTING_ACCEL_MAX, &settings.accel_max.to_le_bytes());

    writes
}

pub fn decode_variables(buf: &[u8]) -> Result<Variables> {
    if buf.len() < VARIABLES_SIZE {
        return Err(TicError::ShortRead {
            expected: VARIABLES_SIZE,
            actual: buf.len(),
        });
    }

    let misc_flags = buf[VAR_MISC_FLAGS1];

    Ok(Variables {
        operation_state: OperationState::from_u8(buf[VAR_OPERATION_STATE]),
        energized: misc_flags & MISC_FLAGS1_ENERGIZED != 0,
        position_uncertain: misc_flags & MISC_FLAGS1_POSITION_UNCERTAIN != 0,
        error_status: read_u16(buf, VAR_ERROR_STATUS),
        errors_occurred: read_u32(buf, VAR_ERRORS_OCCURRED),
        planning_mode: buf[VAR_PLANNING_MODE],
        target_position: read_i32(buf, VAR_TARGET_POSITION),
        target_velocity: read_i32(buf, VAR_TARGET_VELOCITY),
        starting_speed: read_u32(buf, VAR_STARTING_SPEED),
        max_speed: read_u32(buf, VAR_SPEED_MAX),
        max_decel: read_u32(buf, VAR_DECEL_MAX),
        max_accel: read_u32(buf, VAR_ACCEL_MAX),
        current_position: read_i32(buf, VAR_CURRENT_POSITION),
        current_velocity: read_i32(buf, VAR_CURRENT_VELOCITY),
        acting_target_position: read_i32(buf, VAR_ACTING_TARGET_POSITION),
        time_since_last_step: read_u32(buf, VAR_TIME_SINCE_LAST_STEP),
        device_reset: buf[VAR_DEVICE_RESET],
        vin_voltage: read_u16(buf, VAR_VIN_VOLTAGE),
        up_time: read_u32(buf, VAR_UP_TIME),
        encoder_position: read_i32(buf, VAR_ENCODER_POSITION),
        rc_pulse_width: read_u16(buf, VAR_RC_PULSE_WIDTH),
        step_mode: buf[VAR_STEP_MODE],
        current_limit_code: buf[VAR_CURRENT_LIMIT],
        decay_mode: buf[VAR_DECAY_MODE],
        input_state: buf[VAR_INPUT_STATE],
        input_after_averaging: read_u16(buf, VAR_INPUT_AFTER_AVERAGING),
        input_after_hysteresis: read_u16(buf, VAR_INPUT_AFTER_HYSTERESIS),
        input_after_scaling: read_i32(buf, VAR_INPUT_AFTER_SCALING),
    })
}
