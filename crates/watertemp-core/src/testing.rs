//! Test doubles for the collaborator traits

use alloc::collections::BTreeMap;
use alloc::rc::Rc;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::cell::Cell;

use embedded_hal_async::delay::DelayNs;

use crate::display_manager::TextSurface;
use crate::sensors::{
    BusError, BusOperation, DS18B20_FAMILY_CODE, DeviceAddress, OneWireBus, Resolution,
};
use crate::storage::{StorageError, StorageMedium};
use crate::telemetry::Uptime;

#[derive(Debug, Clone, Copy)]
pub struct MockDevice {
    pub address: DeviceAddress,
    pub celsius: f32,
}

pub fn ds18b20(serial: u64, celsius: f32) -> MockDevice {
    MockDevice {
        address: DeviceAddress((serial << 8) | DS18B20_FAMILY_CODE as u64),
        celsius,
    }
}

/// A DS1822-style device from a family the logger does not drive.
pub fn unknown_device(serial: u64) -> MockDevice {
    MockDevice {
        address: DeviceAddress((serial << 8) | 0x10),
        celsius: 0.0,
    }
}

fn transport(operation: BusOperation) -> BusError {
    BusError::Transport { operation, code: -1 }
}

#[derive(Debug, Default)]
pub struct MockBus {
    devices: Vec<MockDevice>,
    cursor: usize,
    searches: usize,
    fail_search_after: Option<usize>,
    resolutions_set: usize,
    triggers: usize,
    fail_reads: Option<DeviceAddress>,
    fail_triggers: Option<DeviceAddress>,
}

impl MockBus {
    pub fn new(devices: &[MockDevice]) -> Self {
        Self {
            devices: devices.to_vec(),
            ..Self::default()
        }
    }

    /// Let `count` searches succeed, then fail the next one.
    pub fn fail_search_after(&mut self, count: usize) {
        self.fail_search_after = Some(count);
    }

    pub fn fail_reads_on(&mut self, address: DeviceAddress) {
        self.fail_reads = Some(address);
    }

    pub fn fail_triggers_on(&mut self, address: DeviceAddress) {
        self.fail_triggers = Some(address);
    }

    pub fn searches(&self) -> usize {
        self.searches
    }

    pub fn resolutions_set(&self) -> usize {
        self.resolutions_set
    }

    pub fn triggers(&self) -> usize {
        self.triggers
    }
}

impl OneWireBus for MockBus {
    async fn search_next(&mut self) -> Result<Option<DeviceAddress>, BusError> {
        if self.fail_search_after == Some(self.searches) {
            return Err(transport(BusOperation::Search));
        }
        self.searches += 1;
        let device = self.devices.get(self.cursor).map(|d| d.address);
        self.cursor += 1;
        Ok(device)
    }

    async fn set_resolution(
        &mut self,
        _address: DeviceAddress,
        _resolution: Resolution,
    ) -> Result<(), BusError> {
        self.resolutions_set += 1;
        Ok(())
    }

    async fn trigger_conversion(&mut self, address: DeviceAddress) -> Result<(), BusError> {
        if self.fail_triggers == Some(address) {
            return Err(transport(BusOperation::TriggerConversion));
        }
        self.triggers += 1;
        Ok(())
    }

    async fn read_celsius(&mut self, address: DeviceAddress) -> Result<f32, BusError> {
        if self.fail_reads == Some(address) {
            return Err(transport(BusOperation::ReadTemperature));
        }
        self.devices
            .iter()
            .find(|d| d.address == address)
            .map(|d| d.celsius)
            .ok_or(BusError::Crc(address))
    }
}

/// In-memory FAT stand-in: one line list per file name.
#[derive(Debug, Default)]
pub struct MemoryMedium {
    files: BTreeMap<String, Vec<String>>,
    mounted: bool,
    mounts: usize,
    mount_attempts: usize,
    mounts_allowed: Option<usize>,
    unmounts: usize,
    append_calls: usize,
    fail_mount: bool,
    fail_writes: bool,
    writes_allowed: Option<usize>,
}

impl MemoryMedium {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_mount(&mut self, fail: bool) {
        self.fail_mount = fail;
    }

    pub fn fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    /// Let `count` mounts succeed, then fail every later one.
    pub fn fail_mounts_after(&mut self, count: usize) {
        self.mounts_allowed = Some(count);
    }

    /// Let `count` appends succeed, then fail every later one.
    pub fn fail_writes_after(&mut self, count: usize) {
        self.writes_allowed = Some(count);
    }

    pub fn lines(&self, file_name: &str) -> Vec<String> {
        self.files.get(file_name).cloned().unwrap_or_default()
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn mounts(&self) -> usize {
        self.mounts
    }

    pub fn mount_attempts(&self) -> usize {
        self.mount_attempts
    }

    pub fn unmounts(&self) -> usize {
        self.unmounts
    }

    pub fn append_calls(&self) -> usize {
        self.append_calls
    }
}

impl StorageMedium for MemoryMedium {
    type Volume = ();

    fn mount(&mut self) -> Result<(), StorageError> {
        self.mount_attempts += 1;
        let over_budget = self.mounts_allowed.is_some_and(|n| self.mounts >= n);
        if self.fail_mount || over_budget {
            return Err(StorageError::MountFailed);
        }
        self.mounted = true;
        self.mounts += 1;
        Ok(())
    }

    fn append_line(
        &mut self,
        _volume: &(),
        file_name: &str,
        line: &str,
    ) -> Result<(), StorageError> {
        self.append_calls += 1;
        assert!(self.mounted, "append while unmounted");
        let over_budget = self.writes_allowed.is_some_and(|n| self.append_calls > n);
        if self.fail_writes || over_budget {
            return Err(StorageError::WriteFailed);
        }
        self.files
            .entry(file_name.to_string())
            .or_default()
            .push(line.to_string());
        Ok(())
    }

    fn unmount(&mut self, _volume: ()) -> Result<(), StorageError> {
        self.mounted = false;
        self.unmounts += 1;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct RecordingSurface {
    text: String,
    updates: usize,
}

impl RecordingSurface {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn updates(&self) -> usize {
        self.updates
    }
}

impl TextSurface for RecordingSurface {
    fn set_text(&mut self, text: &str) {
        self.text = text.to_string();
        self.updates += 1;
    }
}

/// Clock that advances one second per reading, so tick `n` is at `n` seconds.
#[derive(Debug, Default)]
pub struct StepClock {
    secs: Cell<u64>,
}

impl Uptime for StepClock {
    fn uptime_secs(&self) -> u64 {
        let next = self.secs.get() + 1;
        self.secs.set(next);
        next
    }
}

/// Delay that returns immediately and adds up what it was asked to wait.
#[derive(Debug, Clone, Default)]
pub struct RecordingDelay {
    total_ns: Rc<Cell<u64>>,
}

impl RecordingDelay {
    pub fn total_ms(&self) -> u64 {
        self.total_ns.get() / 1_000_000
    }
}

impl DelayNs for RecordingDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.total_ns.set(self.total_ns.get() + ns as u64);
    }
}
