//! Runtime configuration for signing sessions and device links

use std::fmt;

use clap::ValueEnum;

use crate::transport::udp::DEFAULT_EMULATOR_ADDR;

pub const DEFAULT_COIN_NAME: &str = "Bitcoin";

/// Which kind of device to talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DeviceType {
    /// Hardware wallet over USB
    Usb,
    /// Firmware emulator over UDP
    Emulator,
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceType::Usb => write!(f, "USB"),
            DeviceType::Emulator => write!(f, "EMULATOR"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkConfig {
    pub device_type: DeviceType,
    pub emulator_addr: String,
}

impl LinkConfig {
    pub fn new(device_type: DeviceType) -> Self {
        Self {
            device_type,
            emulator_addr: DEFAULT_EMULATOR_ADDR.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Coin name announced in the begin-signing message
    pub coin_name: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            coin_name: DEFAULT_COIN_NAME.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_type_parsing() {
        assert_eq!(DeviceType::from_str("USB", true).unwrap(), DeviceType::Usb);
        assert_eq!(DeviceType::from_str("emulator", true).unwrap(), DeviceType::Emulator);
        assert!(DeviceType::from_str("bluetooth", true).is_err());
        assert_eq!(DeviceType::Emulator.to_string(), "EMULATOR");
    }

    #[test]
    fn test_defaults() {
        assert_eq!(SessionConfig::default().coin_name, "Bitcoin");
        assert_eq!(LinkConfig::new(DeviceType::Usb).emulator_addr, "127.0.0.1:21324");
    }
}
