pub mod reader;
pub mod registry;

use core::fmt;

use serde::{Deserialize, Serialize};
use thiserror_no_std::Error;

pub use reader::{Sample, SampleReader, Samples, Timestamp};
pub use registry::{Probe, ProbeRegistry};

/// Maximum number of probes the logger tracks. Every per-probe table,
/// the CSV columns and the summary surface are sized from this.
pub const MAX_PROBES: usize = 3;

/// ROM family code shared by all DS18B20 devices.
pub const DS18B20_FAMILY_CODE: u8 = 0x28;

/// 64-bit 1-Wire ROM id. The family code lives in the low byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceAddress(pub u64);

impl DeviceAddress {
    pub const fn family_code(self) -> u8 {
        (self.0 & 0xFF) as u8
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016X}", self.0)
    }
}

/// DS18B20 conversion resolution.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Resolution {
    Bits9,
    Bits10,
    Bits11,
    #[default]
    Bits12,
}

impl Resolution {
    pub const fn bits(self) -> u8 {
        match self {
            Self::Bits9 => 9,
            Self::Bits10 => 10,
            Self::Bits11 => 11,
            Self::Bits12 => 12,
        }
    }

    /// Worst-case conversion time from the DS18B20 datasheet.
    pub const fn conversion_time_ms(self) -> u32 {
        match self {
            Self::Bits9 => 94,
            Self::Bits10 => 188,
            Self::Bits11 => 375,
            Self::Bits12 => 750,
        }
    }
}

/// Bus operation that produced a [`BusError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusOperation {
    Search,
    SetResolution,
    TriggerConversion,
    ReadTemperature,
}

impl fmt::Display for BusOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Search => "device search",
            Self::SetResolution => "set resolution",
            Self::TriggerConversion => "trigger conversion",
            Self::ReadTemperature => "read temperature",
        })
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusError {
    #[error("1-Wire {operation} failed with code {code}")]
    Transport { operation: BusOperation, code: i32 },
    #[error("scratchpad CRC mismatch on {0}")]
    Crc(DeviceAddress),
}

/// The 1-Wire bus with DS18B20 support, as provided by the platform.
///
/// Drivers map their transport errors into [`BusError`] after logging the
/// vendor error, so the core never depends on a particular bus driver.
pub trait OneWireBus {
    /// Continue the ROM search. `Ok(None)` means the search is exhausted;
    /// the search cannot be restarted.
    fn search_next(&mut self) -> impl Future<Output = Result<Option<DeviceAddress>, BusError>>;

    /// Whether the device can be driven as a DS18B20.
    fn is_compatible(&mut self, address: DeviceAddress) -> bool {
        address.family_code() == DS18B20_FAMILY_CODE
    }

    fn set_resolution(
        &mut self,
        address: DeviceAddress,
        resolution: Resolution,
    ) -> impl Future<Output = Result<(), BusError>>;

    /// Start a conversion and wait until it has completed.
    fn trigger_conversion(
        &mut self,
        address: DeviceAddress,
    ) -> impl Future<Output = Result<(), BusError>>;

    /// Read the last converted temperature in degrees Celsius.
    fn read_celsius(&mut self, address: DeviceAddress)
    -> impl Future<Output = Result<f32, BusError>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn test_family_code_is_low_byte() {
        let address = DeviceAddress(0x3C00_0000_1234_5628);
        assert_eq!(address.family_code(), DS18B20_FAMILY_CODE);
        assert_eq!(DeviceAddress(0x10).family_code(), 0x10);
    }

    #[test]
    fn test_address_formats_as_padded_hex() {
        assert_eq!(DeviceAddress(0xAB28).to_string(), "000000000000AB28");
    }

    #[test]
    fn test_conversion_time_follows_resolution() {
        assert_eq!(Resolution::default(), Resolution::Bits12);
        assert_eq!(Resolution::Bits12.conversion_time_ms(), 750);
        assert_eq!(Resolution::Bits9.conversion_time_ms(), 94);
        assert!(Resolution::Bits10.conversion_time_ms() < Resolution::Bits11.conversion_time_ms());
    }

    #[test]
    fn test_bus_error_names_operation_and_code() {
        let err = BusError::Transport {
            operation: BusOperation::ReadTemperature,
            code: 263,
        };
        assert_eq!(
            err.to_string(),
            "1-Wire read temperature failed with code 263"
        );
    }
}
