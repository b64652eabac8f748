//! CSV record format for the data file
//!
//! One line per tick: `H:M:S,<p0>,<p1>,<p2>`. Time fields are unpadded,
//! values have one decimal place, and every one of the [`MAX_PROBES`]
//! columns is always present, holding [`MISSING_VALUE`] when there is no
//! reading for that slot.

use core::fmt::Write;

use super::MISSING_VALUE;
use crate::sensors::{MAX_PROBES, Sample, Timestamp};

/// Longest record: a six digit hour count plus three `-999.9` columns fits
/// with room to spare.
pub const MAX_RECORD_LEN: usize = 64;

pub type RecordLine = heapless::String<MAX_RECORD_LEN>;

/// Format one tick's samples as a data file line, without the separator.
pub fn format_record(timestamp: Timestamp, samples: &[Sample]) -> RecordLine {
    let mut line = RecordLine::new();
    let _ = write!(line, "{}", timestamp);

    for slot in 0..MAX_PROBES {
        let value = samples
            .iter()
            .find(|sample| sample.slot == slot)
            .and_then(|sample| sample.value);

        let _ = match value {
            Some(value) => write!(line, ",{:.1}", value),
            None => write!(line, ",{}", MISSING_VALUE),
        };
    }

    line
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(slot: usize, value: Option<f32>) -> Sample {
        Sample {
            slot,
            value,
            timestamp: Timestamp::from_secs(1),
        }
    }

    #[test]
    fn test_single_probe_record() {
        let line = format_record(Timestamp::from_secs(1), &[sample(0, Some(98.6))]);
        assert_eq!(line.as_str(), "0:0:1,98.6,NULL,NULL");
    }

    #[test]
    fn test_three_probe_record_rounds_to_one_decimal() {
        let samples = [
            sample(0, Some(70.04)),
            sample(1, Some(71.26)),
            sample(2, Some(-4.0)),
        ];
        let line = format_record(Timestamp::from_secs(3725), &samples);
        assert_eq!(line.as_str(), "1:2:5,70.0,71.3,-4.0");
    }

    #[test]
    fn test_missing_reading_uses_placeholder() {
        let samples = [sample(0, None), sample(1, Some(50.0))];
        let line = format_record(Timestamp::from_secs(61), &samples);
        assert_eq!(line.as_str(), "0:1:1,NULL,50.0,NULL");
    }

    #[test]
    fn test_no_probes_still_writes_every_column() {
        let line = format_record(Timestamp::from_secs(0), &[]);
        assert_eq!(line.as_str(), "0:0:0,NULL,NULL,NULL");
    }

    #[test]
    fn test_long_uptime_fits() {
        let samples = [
            sample(0, Some(-999.9)),
            sample(1, Some(-999.9)),
            sample(2, Some(-999.9)),
        ];
        let line = format_record(Timestamp::from_secs(999_999 * 3600 + 3599), &samples);
        assert_eq!(line.as_str(), "999999:59:59,-999.9,-999.9,-999.9");
    }
}
