//! Probe discovery and the fixed-capacity probe table

use log::{debug, info};

use super::{BusError, DeviceAddress, MAX_PROBES, OneWireBus, Resolution};

/// A DS18B20 accepted during discovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Probe {
    address: DeviceAddress,
    slot: usize,
    resolution: Resolution,
}

impl Probe {
    pub const fn address(&self) -> DeviceAddress {
        self.address
    }

    /// Position of this probe in every per-probe table, in discovery order.
    pub const fn slot(&self) -> usize {
        self.slot
    }

    pub const fn resolution(&self) -> Resolution {
        self.resolution
    }
}

/// Probes found on the bus at startup.
///
/// Built once by [`ProbeRegistry::discover`] and never modified afterwards.
#[derive(Debug, Clone, Default)]
pub struct ProbeRegistry {
    probes: heapless::Vec<Probe, MAX_PROBES>,
    skipped: usize,
}

impl ProbeRegistry {
    /// Walk the bus ROM search and accept up to `capacity` DS18B20 probes.
    ///
    /// Devices from other families are logged and skipped without using up
    /// capacity. Every accepted probe is configured with `resolution`. Any
    /// bus error aborts discovery.
    pub async fn discover<B: OneWireBus>(
        bus: &mut B,
        capacity: usize,
        resolution: Resolution,
    ) -> Result<Self, BusError> {
        let capacity = capacity.min(MAX_PROBES);
        let mut registry = Self::default();

        info!("Device search started, accepting up to {} probe(s)", capacity);
        while registry.probes.len() < capacity {
            let Some(address) = bus.search_next().await? else {
                break;
            };

            if !bus.is_compatible(address) {
                info!("Found an unknown device, address: {}", address);
                registry.skipped += 1;
                continue;
            }

            let slot = registry.probes.len();
            info!("Found a DS18B20[{}], address: {}", slot, address);
            bus.set_resolution(address, resolution).await?;
            debug!("DS18B20[{}] set to {}-bit resolution", slot, resolution.bits());

            // Capacity is checked by the loop condition
            let _ = registry.probes.push(Probe {
                address,
                slot,
                resolution,
            });
        }

        if registry.probes.len() == capacity {
            info!("Max DS18B20 number reached, stop searching");
        }
        info!(
            "Searching done, {} DS18B20 device(s) found",
            registry.probes.len()
        );

        Ok(registry)
    }

    pub fn probes(&self) -> &[Probe] {
        &self.probes
    }

    pub fn len(&self) -> usize {
        self.probes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.probes.is_empty()
    }

    /// Number of devices seen during discovery that were not DS18B20s.
    pub fn skipped_devices(&self) -> usize {
        self.skipped
    }
}
