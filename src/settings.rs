use crate::device::Product;

pub const INPUT_MAX_VALUE: u16 = 4095; // 12-bit analog/RC scaled input
pub const MAX_ALLOWED_SPEED: u32 = 500_000_000; // steps per 10000 s
pub const MIN_ALLOWED_ACCEL: u32 = 100; // steps per second per 100 s
pub const MAX_ALLOWED_ACCEL: u32 = 0x7FFF_FFFF;

// What the Tic uses as its target
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ControlMode {
    Serial = 0,
    StepDir = 1,
    RcPosition = 2,
    RcSpeed = 3,
    AnalogPosition = 4,
    AnalogSpeed = 5,
    EncoderPosition = 6,
    EncoderSpeed = 7,
}

impl ControlMode {
    pub const ALL: [ControlMode; 8] = [
        ControlMode::Serial,
        ControlMode::StepDir,
        ControlMode::RcPosition,
        ControlMode::RcSpeed,
        ControlMode::AnalogPosition,
        ControlMode::AnalogSpeed,
        ControlMode::EncoderPosition,
        ControlMode::EncoderSpeed,
    ];

    pub fn from_u8(value: u8) -> Option<Self> {
        Self::ALL.get(value as usize).copied()
    }

    /// Modes where the input range maps onto a speed rather than a position.
    pub fn is_speed_mode(self) -> bool {
        matches!(
            self,
            ControlMode::RcSpeed | ControlMode::AnalogSpeed | ControlMode::EncoderSpeed
        )
    }
}

impl std::fmt::Display for ControlMode {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let s = match self {
            ControlMode::Serial => "Serial / I\u{b2}C / USB",
            ControlMode::StepDir => "STEP/DIR",
            ControlMode::RcPosition => "RC position",
            ControlMode::RcSpeed => "RC speed",
            ControlMode::AnalogPosition => "Analog position",
            ControlMode::AnalogSpeed => "Analog speed",
            ControlMode::EncoderPosition => "Encoder position",
            ControlMode::EncoderSpeed => "Encoder speed",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum StepMode {
    Full = 0,
    Half = 1,
    Microstep4 = 2,
    Microstep8 = 3,
    Microstep16 = 4,
    Microstep32 = 5,
    Microstep64 = 7,
    Microstep128 = 8,
    Microstep256 = 9,
}

impl StepMode {
    pub const ALL: [StepMode; 9] = [
        StepMode::Full,
        StepMode::Half,
        StepMode::Microstep4,
        StepMode::Microstep8,
        StepMode::Microstep16,
        StepMode::Microstep32,
        StepMode::Microstep64,
        StepMode::Microstep128,
        StepMode::Microstep256,
    ];

    pub fn from_u8(value: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|m| *m as u8 == value)
    }

    pub fn microsteps_per_step(self) -> u32 {
        match self {
            StepMode::Full => 1,
            StepMode::Half => 2,
            StepMode::Microstep4 => 4,
            StepMode::Microstep8 => 8,
            StepMode::Microstep16 => 16,
            StepMode::Microstep32 => 32,
            StepMode::Microstep64 => 64,
            StepMode::Microstep128 => 128,
            StepMode::Microstep256 => 256,
        }
    }
}

impl std::fmt::Display for StepMode {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            StepMode::Full => write!(f, "Full step"),
            StepMode::Half => write!(f, "1/2 step"),
            m => write!(f, "1/{} step", m.microsteps_per_step()),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DecayMode {
    Mixed = 0,
    Slow = 1,
    Fast = 2,
    Mixed25 = 3,
    Mixed75 = 4,
}

impl DecayMode {
    pub const ALL: [DecayMode; 5] = [
        DecayMode::Mixed,
        DecayMode::Slow,
        DecayMode::Fast,
        DecayMode::Mixed25,
        DecayMode::Mixed75,
    ];

    pub fn from_u8(value: u8) -> Option<Self> {
        Self::ALL.get(value as usize).copied()
    }
}

impl std::fmt::Display for DecayMode {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let s = match self {
            DecayMode::Mixed => "Mixed",
            DecayMode::Slow => "Slow",
            DecayMode::Fast => "Fast",
            DecayMode::Mixed25 => "Mixed 25%",
            DecayMode::Mixed75 => "Mixed 75%",
        };
        write!(f, "{}", s)
    }
}

/// The subset of the Tic's non-volatile settings this tool edits.
///
/// Speeds are in microsteps per 10000 seconds, accelerations in microsteps
/// per 100 square seconds, and the current limit in milliamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub product: Product,
    pub control_mode: ControlMode,
    pub input_min: u16,
    pub input_neutral_min: u16,
    pub input_neutral_max: u16,
    pub input_max: u16,
    pub output_min: i32,
    pub output_max: i32,
    pub speed_max: u32,
    pub speed_min: u32, // starting speed
    pub accel_max: u32,
    pub decel_max: u32, // 0 means use accel_max
    pub step_mode: StepMode,
    pub current_limit: u32,
    pub decay_mode: DecayMode,
}

impl Settings {
    /// Factory defaults for the given product.
    pub fn defaults(product: Product) -> Self {
        Self {
            product,
            control_mode: ControlMode::Serial,
            input_min: 0,
            input_neutral_min: 2015,
            input_neutral_max: 2080,
            input_max: INPUT_MAX_VALUE,
            output_min: -200,
            output_max: 200,
            speed_max: 2_000_000,
            speed_min: 0,
            accel_max: 40_000,
            decel_max: 0,
            step_mode: StepMode::Full,
            current_limit: product.current_limit_code_to_ma(product.current_limit_ma_to_code(192)),
            decay_mode: DecayMode::Mixed,
        }
    }

    /// Brings every field into a range the device accepts.
    ///
    /// Returns one human-readable line per adjustment; an empty vector means
    /// the settings were already valid.
    pub fn fix(&mut self) -> Vec<String> {
        let mut warnings = Vec::new();

        for (name, value) in [
            ("input minimum", &mut self.input_min),
            ("input neutral minimum", &mut self.input_neutral_min),
            ("input neutral maximum", &mut self.input_neutral_max),
            ("input maximum", &mut self.input_max),
        ] {
            if *value > INPUT_MAX_VALUE {
                *value = INPUT_MAX_VALUE;
                warnings.push(format!(
                    "The {} is too high, so it will be changed to {}.",
                    name, INPUT_MAX_VALUE
                ));
            }
        }

        if self.input_min > self.input_max {
            std::mem::swap(&mut self.input_min, &mut self.input_max);
            warnings.push(
                "The input minimum is greater than the input maximum, \
                so they will be swapped."
                    .to_string(),
            );
        }

        if self.input_neutral_min < self.input_min {
            self.input_neutral_min = self.input_min;
            warnings.push(format!(
                "The input neutral minimum is less than the input minimum, \
                so it will be changed to {}.",
                self.input_min
            ));
        }

        if self.input_neutral_max > self.input_max {
            self.input_neutral_max = self.input_max;
            warnings.push(format!(
                "The input neutral maximum is greater than the input maximum, \
                so it will be changed to {}.",
                self.input_max
            ));
        }

        if self.input_neutral_max < self.input_min {
            self.input_neutral_max = self.input_min;
            warnings.push(format!(
                "The input neutral maximum is less than the input minimum, \
                so it will be changed to {}.",
                self.input_min
            ));
        }

        if self.input_neutral_min > self.input_max {
            self.input_neutral_min = self.input_max;
            warnings.push(format!(
                "The input neutral minimum is greater than the input maximum, \
                so it will be changed to {}.",
                self.input_max
            ));
        }

        // Both neutral bounds are inside the input range now, so their average is too
        if self.input_neutral_min > self.input_neutral_max {
            let average = ((self.input_neutral_min as u32 + self.input_neutral_max as u32) / 2) as u16;
            self.input_neutral_min = average;
            self.input_neutral_max = average;
            warnings.push(format!(
                "The input neutral minimum is greater than the input neutral maximum, \
                so both will be changed to {}.",
                average
            ));
        }

        if self.output_min > 0 {
            self.output_min = 0;
            warnings.push("The output minimum cannot be positive, so it will be changed to 0.".to_string());
        }

        if self.output_max < 0 {
            self.output_max = 0;
            warnings.push("The output maximum cannot be negative, so it will be changed to 0.".to_string());
        }

        if self.speed_max > MAX_ALLOWED_SPEED {
            self.speed_max = MAX_ALLOWED_SPEED;
            warnings.push(format!(
                "The maximum speed is too high, so it will be changed to {}.",
                MAX_ALLOWED_SPEED
            ));
        }

        if self.speed_min > self.speed_max {
            self.speed_min = self.speed_max;
            warnings.push(
                "The starting speed is greater than the maximum speed, \
                so it will be changed to be equal to the maximum speed."
                    .to_string(),
            );
        }

        if self.accel_max < MIN_ALLOWED_ACCEL {
            self.accel_max = MIN_ALLOWED_ACCEL;
            warnings.push(format!(
                "The maximum acceleration is too low, so it will be changed to {}.",
                MIN_ALLOWED_ACCEL
            ));
        } else if self.accel_max > MAX_ALLOWED_ACCEL {
            self.accel_max = MAX_ALLOWED_ACCEL;
            warnings.push(format!(
                "The maximum acceleration is too high, so it will be changed to {}.",
                MAX_ALLOWED_ACCEL
            ));
        }

        if self.decel_max != 0 && self.decel_max < MIN_ALLOWED_ACCEL {
            self.decel_max = MIN_ALLOWED_ACCEL;
            warnings.push(format!(
                "The maximum deceleration is too low, so it will be changed to {}.",
                MIN_ALLOWED_ACCEL
            ));
        } else if self.decel_max > MAX_ALLOWED_ACCEL {
            self.decel_max = MAX_ALLOWED_ACCEL;
            warnings.push(format!(
                "The maximum deceleration is too high, so it will be changed to {}.",
                MAX_ALLOWED_ACCEL
            ));
        }

        let max_step_mode = self.product.max_step_mode();
        if self.step_mode > max_step_mode {
            warnings.push(format!(
                "The {} does not support {} mode, so the step mode will be changed to {}.",
                self.product, self.step_mode, max_step_mode
            ));
            self.step_mode = max_step_mode;
        }

        let max_current = self.product.max_current_limit();
        if self.current_limit > max_current {
            self.current_limit = max_current;
            warnings.push(format!(
                "The current limit is too high, so it will be lowered to {} mA.",
                max_current
            ));
        }

        let rounded = self
            .product
            .current_limit_code_to_ma(self.product.current_limit_ma_to_code(self.current_limit));
        if rounded != self.current_limit {
            self.current_limit = rounded;
            warnings.push(format!(
                "The current limit will be rounded down to {} mA.",
                rounded
            ));
        }

        if !self.product.supports_decay_mode(self.decay_mode) {
            warnings.push(format!(
                "The {} does not support the {} decay mode, so it will be changed to {}.",
                self.product,
                self.decay_mode,
                DecayMode::Mixed
            ));
            self.decay_mode = DecayMode::Mixed;
        }

        warnings
    }
}
