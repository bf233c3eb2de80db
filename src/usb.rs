use crate::device::{Product, TicDevice, VENDOR_ID};
use crate::driver::{DeviceHandle, Driver};
use crate::error::{Result, TicError};
use crate::protocol;
use crate::settings::Settings;
use crate::variables::Variables;
use log::{debug, info, trace, warn};
use rusb::{Direction, GlobalContext, Recipient, RequestType};
use std::{cell::RefCell, thread, time::Duration};

const USB_TIMEOUT: Duration = Duration::from_millis(300);
const READ_CHUNK_SIZE: usize = 15; // max bytes per get-setting / get-variable request
const RESTORE_DEFAULTS_POLL_MS: u64 = 50;
const RESTORE_DEFAULTS_POLL_ATTEMPTS: u32 = 20;

fn request_in() -> u8 {
    rusb::request_type(Direction::In, RequestType::Vendor, Recipient::Device)
}

fn request_out() -> u8 {
    rusb::request_type(Direction::Out, RequestType::Vendor, Recipient::Device)
}

/// Builds an OS id from the bus number and port path, e.g. "1-2.4".
fn os_id_for(device: &rusb::Device<GlobalContext>) -> String {
    let ports = device
        .port_numbers()
        .map(|p| p.iter().map(u8::to_string).collect::<Vec<_>>().join("."))
        .unwrap_or_else(|_| format!("addr{}", device.address()));
    format!("{}-{}", device.bus_number(), ports)
}

/// Packs a decoded device version back into bcdDevice form.
fn bcd_from_version(version: rusb::Version) -> u16 {
    let major = version.major() as u16;
    (major / 10) << 12
        | (major % 10) << 8
        | (version.minor() as u16) << 4
        | version.sub_minor() as u16
}

/// Serial number recorded for this device on an earlier scan.
fn cached_serial_number(known: &[TicDevice], os_id: &str, product: Product) -> Option<String> {
    known
        .iter()
        .find(|d| d.os_id == os_id && d.product == product && !d.serial_number.is_empty())
        .map(|d| d.serial_number.clone())
}

fn read_serial_number(
    device: &rusb::Device<GlobalContext>,
    desc: &rusb::DeviceDescriptor,
    product: Product,
) -> String {
    match device.open() {
        Ok(handle) => handle
            .read_serial_number_string_ascii(desc)
            .unwrap_or_else(|e| {
                warn!("Failed to read serial number: {}", e);
                String::new()
            }),
        Err(e) => {
            warn!("Failed to open {} to read its serial number: {}", product, e);
            String::new()
        }
    }
}

/// Creates a TicDevice from a libusb device, or None if it is not a Tic.
///
/// Only devices missing from `known` are opened to read their serial number.
fn tic_device_from_usb(device: &rusb::Device<GlobalContext>, known: &[TicDevice]) -> Option<TicDevice> {
    let desc = match device.device_descriptor() {
        Ok(desc) => desc,
        Err(e) => {
            trace!("Skipping device without a readable descriptor: {}", e);
            return None;
        }
    };
    if desc.vendor_id() != VENDOR_ID {
        return None;
    }
    let product = Product::from_usb_product_id(desc.product_id()).ok()?;

    let os_id = os_id_for(device);
    let serial_number = cached_serial_number(known, &os_id, product).unwrap_or_else(|| {
        debug!("Reading serial number of new device {}.", os_id);
        read_serial_number(device, &desc, product)
    });

    Some(TicDevice {
        os_id,
        serial_number,
        product,
        firmware_version: bcd_from_version(desc.device_version()),
    })
}

/// Talks to real Tics through libusb.
#[derive(Debug, Default)]
pub struct UsbDriver {
    // Result of the last scan
    known_devices: RefCell<Vec<TicDevice>>,
}

impl UsbDriver {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Driver for UsbDriver {
    type Handle = UsbHandle;

    fn list_connected_devices(&self) -> Result<Vec<TicDevice>> {
        let mut known = self.known_devices.borrow_mut();
        let mut devices: Vec<TicDevice> = rusb::devices()?
            .iter()
            .filter_map(|d| tic_device_from_usb(&d, &known))
            .collect();
        devices.sort_by(|a, b| a.os_id.cmp(&b.os_id));
        trace!("Found {} Tic devices.", devices.len());
        *known = devices.clone();
        Ok(devices)
    }

    fn open(&self, device: &TicDevice) -> Result<UsbHandle> {
        let usb_device = rusb::devices()?
            .iter()
            .find(|d| os_id_for(d) == device.os_id)
            .ok_or_else(|| TicError::DeviceNotFound(device.os_id.clone()))?;
        let handle = usb_device.open()?;
        info!("Opened {} ({}).", device, device.os_id);
        Ok(UsbHandle {
            device: device.clone(),
            handle,
        })
    }
}

pub struct UsbHandle {
    device: TicDevice,
    handle: rusb::DeviceHandle<GlobalContext>,
}

impl UsbHandle {
    fn send_command(&self, request: u8, value: u16, index: u16) -> Result<()> {
        self.handle
            .write_control(request_out(), request, value, index, &[], USB_TIMEOUT)?;
        Ok(())
    }

    fn send_command_u32(&self, request: u8, argument: u32) -> Result<()> {
        let (value, index) = protocol::split_u32(argument);
        self.send_command(request, value, index)
    }

    /// Reads `len` bytes starting at `offset` with repeated vendor requests.
    fn read_block(&self, request: u8, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        let mut offset = 0;
        while offset < len {
            let chunk = READ_CHUNK_SIZE.min(len - offset);
            let read = self.handle.read_control(
                request_in(),
                request,
                0,
                offset as u16,
                &mut buf[offset..offset + chunk],
                USB_TIMEOUT,
            )?;
            if read != chunk {
                return Err(TicError::ShortRead {
                    expected: chunk,
                    actual: read,
                });
            }
            offset += chunk;
        }
        Ok(buf)
    }

    fn set_setting_byte(&self, offset: u8, value: u8) -> Result<()> {
        self.send_command(protocol::CMD_SET_SETTING, value as u16, offset as u16)
    }

    fn get_setting_byte(&self, offset: u8) -> Result<u8> {
        let mut buf = [0u8; 1];
        let read = self.handle.read_control(
            request_in(),
            protocol::CMD_GET_SETTING,
            0,
            offset as u16,
            &mut buf,
            USB_TIMEOUT,
        )?;
        if read != 1 {
            return Err(TicError::ShortRead { expected: 1, actual: read });
        }
        Ok(buf[0])
    }
}

impl DeviceHandle for UsbHandle {
    fn device(&self) -> &TicDevice {
        &self.device
    }

    fn get_settings(&mut self) -> Result<Settings> {
        let buf = self.read_block(protocol::CMD_GET_SETTING, protocol::SETTINGS_SIZE)?;
        protocol::decode_settings(self.device.product, &buf)
    }

    fn set_settings(&mut self, settings: &Settings) -> Result<()> {
        let writes = protocol::encode_settings(settings);
        debug!("Writing {} setting bytes to {}.", writes.len(), self.device);
        for (offset, value) in writes {
            self.set_setting_byte(offset, value)?;
        }
        Ok(())
    }

    fn reinitialize(&mut self) -> Result<()> {
        self.send_command(protocol::CMD_REINITIALIZE, 0, 0)
    }

    fn restore_defaults(&mut self) -> Result<()> {
        self.set_setting_byte(protocol::SETTING_NOT_INITIALIZED, 1)?;
        self.reinitialize()?;

        // The device clears the flag once its defaults are written
        for _ in 0..RESTORE_DEFAULTS_POLL_ATTEMPTS {
            thread::sleep(Duration::from_millis(RESTORE_DEFAULTS_POLL_MS));
            if self.get_setting_byte(protocol::SETTING_NOT_INITIALIZED)? == 0 {
                info!("Restored default settings on {}.", self.device);
                return Ok(());
            }
        }
        warn!("{} did not finish restoring its defaults in time.", self.device);
        Ok(())
    }

    fn get_variables(&mut self, clear_errors_occurred: bool) -> Result<Variables> {
        let request = if clear_errors_occurred {
            protocol::CMD_GET_VARIABLE_AND_CLEAR_ERRORS_OCCURRED
        } else {
            protocol::CMD_GET_VARIABLE
        };
        let buf = self.read_block(request, protocol::VARIABLES_SIZE)?;
        protocol::decode_variables(&buf)
    }

    fn set_target_position(&mut self, position: i32) -> Result<()> {
        self.send_command_u32(protocol::CMD_SET_TARGET_POSITION, position as u32)
    }

    fn set_target_velocity(&mut self, velocity: i32) -> Result<()> {
        self.send_command_u32(protocol::CMD_SET_TARGET_VELOCITY, velocity as u32)
    }
}

impl Drop for UsbHandle {
    fn drop(&mut self) {
        info!("Closing connection to {}.", self.device);
    }
}
