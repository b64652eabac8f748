//! Runtime configuration for the telemetry loop
//!
//! Every field has a default matching the shipped firmware, so a partial
//! config file only needs to name the values it changes.

use embassy_time::Duration;
use serde::{Deserialize, Serialize};

use crate::sensors::Resolution;

/// Default sampling cadence.
pub const DEFAULT_TICK_INTERVAL_MS: u32 = 200;

/// Number of ticks the storage window stays mounted after startup.
pub const DEFAULT_CLOSE_AFTER_TICKS: u32 = 10;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Delay at the top of every tick, in milliseconds
    pub tick_interval_ms: u32,
    /// Extra delay added to each tick once the storage window is closed
    pub closed_extra_delay_ms: u32,
    /// Conversion resolution applied to every discovered probe
    pub resolution: Resolution,
    /// Unit all readings are converted to at read time
    pub unit: TemperatureUnit,
    pub window: WindowPolicy,
    /// What to do when a probe trigger or read fails mid-loop
    pub read_faults: FaultPolicy,
    /// What to do when appending a record fails
    pub storage_faults: FaultPolicy,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            closed_extra_delay_ms: 0,
            resolution: Resolution::default(),
            unit: TemperatureUnit::default(),
            window: WindowPolicy::default(),
            read_faults: FaultPolicy::Halt,
            storage_faults: FaultPolicy::Halt,
        }
    }
}

impl TelemetryConfig {
    /// Time to wait before sampling, given the current window state.
    pub fn tick_delay(&self, window_open: bool) -> Duration {
        let mut millis = self.tick_interval_ms as u64;
        if !window_open {
            millis += self.closed_extra_delay_ms as u64;
        }
        Duration::from_millis(millis)
    }
}

/// Wear-limiting policy for the removable storage medium.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct WindowPolicy {
    /// Close the window once it has been open for this many ticks. The
    /// check runs after the tick's record is written, so `0` behaves like
    /// `1`: every opening persists at least one record.
    pub close_after_ticks: u32,
    /// Remount after this many closed ticks. `None` keeps the medium
    /// unmounted for the rest of the run; `Some(0)` behaves like `Some(1)`.
    /// A failed remount waits this many ticks again before retrying.
    pub reopen_after_ticks: Option<u32>,
}

impl Default for WindowPolicy {
    fn default() -> Self {
        Self {
            close_after_ticks: DEFAULT_CLOSE_AFTER_TICKS,
            reopen_after_ticks: None,
        }
    }
}

/// How the loop reacts to a collaborator failure in the middle of a run.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FaultPolicy {
    /// Log the fault and stop the loop; the display keeps its last frame
    #[default]
    Halt,
    /// Log the fault, drop the affected data and keep sampling
    Degrade,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TemperatureUnit {
    Celsius,
    #[default]
    Fahrenheit,
}

impl TemperatureUnit {
    /// Convert a probe reading in degrees Celsius to this unit.
    pub fn from_celsius(self, celsius: f32) -> f32 {
        match self {
            Self::Celsius => celsius,
            Self::Fahrenheit => celsius * 1.8 + 32.0,
        }
    }

    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Celsius => "C",
            Self::Fahrenheit => "F",
        }
    }
}
