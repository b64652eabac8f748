//! Display Manager for the two text surfaces
//!
//! Surface A shows the latest reading of every active probe, surface B the
//! running min/max summary of all probe slots. Text is built from
//! already-computed samples and extrema only, so rendering never waits on
//! the bus or the storage medium.

use core::fmt::Write;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex;
use log::debug;

use crate::sensors::{MAX_PROBES, Sample};
use crate::stats::ExtremaTracker;

/// Longest text pushed to a surface: three 20-character lines.
pub const MAX_SURFACE_TEXT: usize = 96;

pub type SurfaceText = heapless::String<MAX_SURFACE_TEXT>;

/// Readings text shown when discovery found no probes.
pub const NO_PROBE_TEXT: &str = "No probe";

/// One independent text output.
pub trait TextSurface {
    fn set_text(&mut self, text: &str);
}

/// The two surfaces updated together on every tick.
pub struct SurfacePair<A, B> {
    /// Latest reading per active probe
    pub readings: A,
    /// Min/max summary for every probe slot
    pub summary: B,
}

/// Lock the graphics toolkit requires around a batch of surface updates.
pub type SurfaceLock<A, B> = Mutex<CriticalSectionRawMutex, SurfacePair<A, B>>;

/// Build the readings text: one `Probe <n>: <value>` line per active probe.
pub fn format_readings(probe_count: usize, samples: &[Sample]) -> SurfaceText {
    let mut text = SurfaceText::new();
    let probe_count = probe_count.min(MAX_PROBES);

    if probe_count == 0 {
        let _ = text.push_str(NO_PROBE_TEXT);
        return text;
    }

    for slot in 0..probe_count {
        if slot > 0 {
            let _ = text.push('\n');
        }
        let value = samples
            .iter()
            .find(|sample| sample.slot == slot)
            .and_then(|sample| sample.value);
        let _ = match value {
            Some(value) => write!(text, "Probe {}: {:.1}", slot, value),
            None => write!(text, "Probe {}: --", slot),
        };
    }

    text
}

/// Build the summary text: a `P<n>: <min>, <max>` row for every slot,
/// whether or not a probe is present. Unset slots show their sentinels.
pub fn format_summary(extrema: &ExtremaTracker) -> SurfaceText {
    let mut text = SurfaceText::new();

    for (slot, range) in extrema.slots().iter().enumerate() {
        if slot > 0 {
            let _ = text.push('\n');
        }
        let _ = write!(text, "P{}: {:.1}, {:.1}", slot, range.min, range.max);
    }

    text
}

/// Pushes formatted text to the surface pair under the surface lock.
pub struct DisplayRenderer<'a, A, B> {
    surfaces: &'a SurfaceLock<A, B>,
}

impl<'a, A, B> DisplayRenderer<'a, A, B>
where
    A: TextSurface,
    B: TextSurface,
{
    pub fn new(surfaces: &'a SurfaceLock<A, B>) -> Self {
        Self { surfaces }
    }

    /// Update both surfaces. The lock is held only while the surfaces are
    /// written and is released when the guard drops.
    pub async fn render(&self, probe_count: usize, samples: &[Sample], extrema: &ExtremaTracker) {
        let readings = format_readings(probe_count, samples);
        let summary = format_summary(extrema);

        let mut surfaces = self.surfaces.lock().await;
        debug!("printing to display");
        surfaces.readings.set_text(&readings);
        surfaces.summary.set_text(&summary);
    }
}
