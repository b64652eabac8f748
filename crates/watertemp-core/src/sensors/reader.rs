//! Per-tick probe sampling

use core::fmt;

use log::{debug, error, warn};

use super::{MAX_PROBES, OneWireBus, Probe, ProbeRegistry};
use crate::app_state::TelemetryError;
use crate::config::{FaultPolicy, TemperatureUnit};

/// Elapsed time since startup, split for the CSV time column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Timestamp {
    pub hours: u64,
    pub minutes: u8,
    pub seconds: u8,
}

impl Timestamp {
    pub const fn from_secs(secs: u64) -> Self {
        Self {
            hours: secs / 3600,
            minutes: ((secs % 3600) / 60) as u8,
            seconds: (secs % 60) as u8,
        }
    }
}

/// Formats as unpadded `H:M:S`.
impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.hours, self.minutes, self.seconds)
    }
}

/// One probe's reading for one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub slot: usize,
    /// Temperature in the configured unit. `None` marks a failed read that
    /// was skipped under [`FaultPolicy::Degrade`].
    pub value: Option<f32>,
    pub timestamp: Timestamp,
}

/// All samples taken in one tick, in registry order.
pub type Samples = heapless::Vec<Sample, MAX_PROBES>;

#[derive(Debug, Clone, Copy)]
pub struct SampleReader {
    unit: TemperatureUnit,
    policy: FaultPolicy,
}

impl SampleReader {
    pub const fn new(unit: TemperatureUnit, policy: FaultPolicy) -> Self {
        Self { unit, policy }
    }

    /// Trigger and read every probe in the registry.
    ///
    /// Under [`FaultPolicy::Halt`] the first failing probe aborts the whole
    /// read; under [`FaultPolicy::Degrade`] it yields a sample without a
    /// value and the remaining probes are still read.
    pub async fn read_all<B: OneWireBus>(
        &self,
        bus: &mut B,
        registry: &ProbeRegistry,
        timestamp: Timestamp,
    ) -> Result<Samples, TelemetryError> {
        let mut samples = Samples::new();

        for probe in registry.probes() {
            let value = match self.read_probe(bus, probe).await {
                Ok(value) => Some(value),
                Err(e) => match self.policy {
                    FaultPolicy::Halt => {
                        error!("DS18B20[{}] read failed: {}", probe.slot(), e);
                        return Err(e);
                    }
                    FaultPolicy::Degrade => {
                        warn!("DS18B20[{}] read failed, marking missing: {}", probe.slot(), e);
                        None
                    }
                },
            };

            // The registry never holds more than MAX_PROBES entries
            let _ = samples.push(Sample {
                slot: probe.slot(),
                value,
                timestamp,
            });
        }

        Ok(samples)
    }

    async fn read_probe<B: OneWireBus>(
        &self,
        bus: &mut B,
        probe: &Probe,
    ) -> Result<f32, TelemetryError> {
        let slot = probe.slot();
        bus.trigger_conversion(probe.address())
            .await
            .map_err(|error| TelemetryError::Read { slot, error })?;
        let celsius = bus
            .read_celsius(probe.address())
            .await
            .map_err(|error| TelemetryError::Read { slot, error })?;

        let value = self.unit.from_celsius(celsius);
        debug!(
            "temperature read from DS18B20[{}]: {:.2}{}",
            slot,
            value,
            self.unit.symbol()
        );
        Ok(value)
    }
}
