//! USB HID transport

use hidapi::{HidApi, HidDevice};
use log::info;

use super::{Report, Transport, REPORT_SIZE};
use crate::errors::TransportError;

pub const KEEPKEY_VENDOR_ID: u16 = 0x2b24;
pub const KEEPKEY_PRODUCT_ID: u16 = 0x0002;

pub struct HidTransport {
    device: HidDevice,
    _api: HidApi,
}

impl HidTransport {
    /// Open the first attached KeepKey
    pub fn open() -> Result<Self, TransportError> {
        let api = HidApi::new()?;
        let device = api.open(KEEPKEY_VENDOR_ID, KEEPKEY_PRODUCT_ID)?;
        if let Ok(Some(serial)) = device.get_serial_number_string() {
            info!("✅ Opened KeepKey {}", serial);
        }
        Ok(Self { device, _api: api })
    }
}

impl Transport for HidTransport {
    fn write_packet(&mut self, packet: &Report) -> Result<(), TransportError> {
        // Leading zero selects the default report id
        let mut report = [0u8; REPORT_SIZE + 1];
        report[1..].copy_from_slice(packet);
        self.device.write(&report)?;
        Ok(())
    }

    fn read_packet(&mut self) -> Result<Report, TransportError> {
        let mut report = [0u8; REPORT_SIZE];
        let read = self.device.read(&mut report)?;
        if read != REPORT_SIZE {
            return Err(TransportError::Framing(format!(
                "short HID read: {} of {} bytes",
                read, REPORT_SIZE
            )));
        }
        Ok(report)
    }
}
