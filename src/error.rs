use thiserror::Error;

/// Errors raised while talking to a Tic over USB.
#[derive(Debug, Error)]
pub enum TicError {
    /// Failure reported by libusb
    #[error("USB error: {0}")]
    Usb(#[from] rusb::Error),

    /// A control transfer returned fewer bytes than requested
    #[error("Expected to read {expected} bytes from the device, got {actual}.")]
    ShortRead { expected: usize, actual: usize },

    /// The device is not (or no longer) attached
    #[error("The device {0} was not found.")]
    DeviceNotFound(String),

    /// The USB product id does not belong to a known Tic model
    #[error("Unknown Tic product ID: 0x{0:04X}.")]
    UnknownProduct(u16),
}

pub type Result<T> = std::result::Result<T, TicError>;
