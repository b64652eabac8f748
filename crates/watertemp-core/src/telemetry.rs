//! The telemetry loop: discovery, then sample → extrema → persist → render
//! on a fixed cadence until power loss or a fatal fault.

use embedded_hal_async::delay::DelayNs;
use log::{error, info, warn};

use crate::app_state::{LoopState, Session, TelemetryError};
use crate::config::{FaultPolicy, TelemetryConfig};
use crate::display_manager::{DisplayRenderer, TextSurface};
use crate::sensors::{MAX_PROBES, OneWireBus, ProbeRegistry, SampleReader, Timestamp};
use crate::storage::{StorageError, StorageMedium, StorageWindow, WindowEvent, format_record};

/// Time since startup, as kept by the platform timer.
pub trait Uptime {
    fn uptime_secs(&self) -> u64;
}

/// What happened during one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    /// 1-based tick number
    pub tick: u32,
    pub timestamp: Timestamp,
    /// Whether this tick's record reached the medium
    pub persisted: bool,
    pub window_event: Option<WindowEvent>,
}

pub struct TelemetryLoop<'a, B, M, C, D, A, S>
where
    B: OneWireBus,
    M: StorageMedium,
    C: Uptime,
    D: DelayNs,
    A: TextSurface,
    S: TextSurface,
{
    session: Session<B, M, C>,
    renderer: DisplayRenderer<'a, A, S>,
    delay: D,
    config: TelemetryConfig,
    reader: SampleReader,
    state: LoopState,
}

impl<'a, B, M, C, D, A, S> TelemetryLoop<'a, B, M, C, D, A, S>
where
    B: OneWireBus,
    M: StorageMedium,
    C: Uptime,
    D: DelayNs,
    A: TextSurface,
    S: TextSurface,
{
    /// Discover the probes, open the storage window and write the header.
    ///
    /// A bus error during discovery or a failure to mount or write the
    /// header aborts startup.
    pub async fn start(
        mut bus: B,
        medium: M,
        clock: C,
        delay: D,
        renderer: DisplayRenderer<'a, A, S>,
        config: TelemetryConfig,
    ) -> Result<Self, TelemetryError> {
        info!("Telemetry loop starting");

        let registry = ProbeRegistry::discover(&mut bus, MAX_PROBES, config.resolution)
            .await
            .map_err(|e| {
                error!("Probe discovery failed: {}", e);
                TelemetryError::Discovery(e)
            })?;

        let window = StorageWindow::open(medium, config.window).map_err(|e| {
            error!("Failed to open storage window: {}", e);
            TelemetryError::Storage(e)
        })?;

        Ok(Self {
            session: Session::new(bus, registry, window, clock),
            renderer,
            delay,
            reader: SampleReader::new(config.unit, config.read_faults),
            config,
            state: LoopState::Sampling { window_open: true },
        })
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn session(&self) -> &Session<B, M, C> {
        &self.session
    }

    /// Run one sampling tick.
    ///
    /// A fatal fault is logged, moves the loop to [`LoopState::Halted`] and
    /// is returned; every later call returns [`TelemetryError::Halted`].
    pub async fn tick(&mut self) -> Result<TickReport, TelemetryError> {
        if self.state == LoopState::Halted {
            return Err(TelemetryError::Halted);
        }

        match self.step().await {
            Ok(report) => {
                self.state = LoopState::Sampling {
                    window_open: self.session.window.is_open(),
                };
                Ok(report)
            }
            Err(e) => {
                error!("Telemetry loop halted: {}", e);
                self.state = LoopState::Halted;
                Err(e)
            }
        }
    }

    /// Tick until a fatal fault, then hand the fault back.
    pub async fn run(mut self) -> TelemetryError {
        loop {
            if let Err(e) = self.tick().await {
                return e;
            }
        }
    }

    async fn step(&mut self) -> Result<TickReport, TelemetryError> {
        let window_open = self.session.window.is_open();
        let delay = self.config.tick_delay(window_open);
        let millis = u32::try_from(delay.as_millis()).unwrap_or(u32::MAX);
        self.delay.delay_ms(millis).await;

        let timestamp = Timestamp::from_secs(self.session.clock.uptime_secs());
        let samples = self
            .reader
            .read_all(&mut self.session.bus, &self.session.registry, timestamp)
            .await?;

        for sample in &samples {
            self.session.extrema.update(sample);
        }

        let record = format_record(timestamp, &samples);
        let persisted = self.persist(&record)?;

        self.renderer
            .render(self.session.registry.len(), &samples, &self.session.extrema)
            .await;

        self.session.ticks += 1;
        let window_event = match self.session.window.tick() {
            Ok(event) => event,
            Err(e) => {
                self.storage_fault(e)?;
                None
            }
        };

        Ok(TickReport {
            tick: self.session.ticks,
            timestamp,
            persisted,
            window_event,
        })
    }

    fn persist(&mut self, record: &str) -> Result<bool, TelemetryError> {
        if !self.session.window.is_open() {
            return Ok(false);
        }

        match self.session.window.append(record) {
            Ok(()) => Ok(true),
            Err(e) => {
                self.storage_fault(e)?;
                Ok(false)
            }
        }
    }

    /// Apply the storage fault policy. Under `Degrade` the window is closed
    /// and the loop carries on without persistence.
    fn storage_fault(&mut self, e: StorageError) -> Result<(), TelemetryError> {
        match self.config.storage_faults {
            FaultPolicy::Halt => Err(TelemetryError::Storage(e)),
            FaultPolicy::Degrade => {
                warn!("Storage unavailable, continuing without persistence: {}", e);
                if let Err(e) = self.session.window.close() {
                    warn!("Failed to unmount after storage fault: {}", e);
                }
                Ok(())
            }
        }
    }
}
