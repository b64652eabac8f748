//! Loop state, session context and error types for watertemp

use thiserror_no_std::Error;

use crate::sensors::{BusError, OneWireBus, ProbeRegistry};
use crate::stats::ExtremaTracker;
use crate::storage::{StorageError, StorageMedium, StorageWindow};
use crate::telemetry::Uptime;

/// Run state of the telemetry loop after startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Sampling { window_open: bool },
    /// A fatal fault stopped the loop; the display keeps its last frame
    Halted,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TelemetryError {
    #[error("probe discovery failed: {0}")]
    Discovery(BusError),
    #[error("probe {slot} read failed: {error}")]
    Read { slot: usize, error: BusError },
    #[error("storage fault: {0}")]
    Storage(StorageError),
    #[error("telemetry loop has halted")]
    Halted,
}

impl From<StorageError> for TelemetryError {
    fn from(value: StorageError) -> Self {
        Self::Storage(value)
    }
}

/// Everything the loop owns for the life of the process.
///
/// Built once at startup and threaded through every tick, so no
/// collaborator handle lives in a global.
pub struct Session<B, M, C>
where
    B: OneWireBus,
    M: StorageMedium,
    C: Uptime,
{
    pub bus: B,
    pub registry: ProbeRegistry,
    pub window: StorageWindow<M>,
    pub clock: C,
    pub extrema: ExtremaTracker,
    /// Completed sampling ticks
    pub ticks: u32,
}

impl<B, M, C> Session<B, M, C>
where
    B: OneWireBus,
    M: StorageMedium,
    C: Uptime,
{
    pub fn new(bus: B, registry: ProbeRegistry, window: StorageWindow<M>, clock: C) -> Self {
        Self {
            bus,
            registry,
            window,
            clock,
            extrema: ExtremaTracker::new(),
            ticks: 0,
        }
    }
}
