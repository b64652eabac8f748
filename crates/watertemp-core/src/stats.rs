//! Running extrema per probe slot

use crate::sensors::{MAX_PROBES, Sample};

/// Lowest and highest value seen on one probe since startup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extrema {
    pub min: f32,
    pub max: f32,
}

impl Extrema {
    /// Wide-open range used before the first sample arrives.
    pub const UNSET: Self = Self {
        min: f32::INFINITY,
        max: f32::NEG_INFINITY,
    };

    /// Widen the range to include `value`. NaN is ignored.
    pub fn include(&mut self, value: f32) {
        if value < self.min {
            self.min = value;
        }
        if value > self.max {
            self.max = value;
        }
    }

    pub fn is_set(&self) -> bool {
        self.min <= self.max
    }
}

impl Default for Extrema {
    fn default() -> Self {
        Self::UNSET
    }
}

/// Extrema for every probe slot, kept for the life of the process.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtremaTracker {
    slots: [Extrema; MAX_PROBES],
}

impl ExtremaTracker {
    pub const fn new() -> Self {
        Self {
            slots: [Extrema::UNSET; MAX_PROBES],
        }
    }

    /// Fold one sample into its slot. Missing values leave the slot as is.
    pub fn update(&mut self, sample: &Sample) {
        if let (Some(value), Some(extrema)) = (sample.value, self.slots.get_mut(sample.slot)) {
            extrema.include(value);
        }
    }

    pub fn get(&self, slot: usize) -> Option<&Extrema> {
        self.slots.get(slot)
    }

    pub fn slots(&self) -> &[Extrema; MAX_PROBES] {
        &self.slots
    }
}
