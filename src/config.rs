use serde::{Deserialize, Serialize};

pub const DEFAULT_UPDATE_INTERVAL_MS: u64 = 50;

// Configuration data saved to JSON
#[derive(Debug, Serialize, Deserialize)]
pub struct ConfigData {
    #[serde(default = "default_update_interval_ms")]
    pub update_interval_ms: u64, // How often the device status is polled
    #[serde(default = "default_auto_connect")]
    pub auto_connect: bool, // Connect on our own when exactly one Tic is attached
}

fn default_update_interval_ms() -> u64 {
    DEFAULT_UPDATE_INTERVAL_MS
}

fn default_auto_connect() -> bool {
    true
}

// Default values for a new configuration
impl Default for ConfigData {
    fn default() -> Self {
        Self {
            update_interval_ms: default_update_interval_ms(),
            auto_connect: default_auto_connect(),
        }
    }
}

impl ConfigData {
    /// Polling interval, never faster than 10 ms.
    pub fn update_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.update_interval_ms.max(10))
    }

    pub fn controller_options(&self) -> crate::controller::ControllerOptions {
        crate::controller::ControllerOptions {
            auto_connect: self.auto_connect,
        }
    }
}
