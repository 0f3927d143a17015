use crate::dsp::LevelReading;

use super::catalog::MachineProfile;
use super::metrics::{Metrics, Status};

/// Peak magnitude (0-255) above which an out-of-band peak counts as real.
pub const SIGNIFICANT_SIGNAL: u8 = 200;

/// Individual checks behind a verdict.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Assessment {
    pub status: Status,
    pub db_exceeded: bool,
    pub freq_abnormal: bool,
    pub significant_peak: bool,
}

/// Compare one reading against a machine's envelope.
///
/// A stray peak outside the operating band only matters when it carries
/// enough energy; an excessive level is abnormal on its own.
pub fn assess(db: f32, peak_frequency: u32, max_magnitude: u8, profile: &MachineProfile) -> Assessment {
    let db_exceeded = db > profile.max_db;
    let freq_abnormal = !profile.peak_freq_range.contains(peak_frequency as f32);
    let significant_peak = max_magnitude > SIGNIFICANT_SIGNAL;
    let status = if db_exceeded || (significant_peak && freq_abnormal) {
        Status::Abnormal
    } else {
        Status::Normal
    };
    Assessment {
        status,
        db_exceeded,
        freq_abnormal,
        significant_peak,
    }
}

pub fn classify(reading: &LevelReading, profile: &MachineProfile) -> Status {
    assess(reading.db, reading.peak_frequency, reading.max_magnitude, profile).status
}

/// Build the published snapshot for a reading.
pub fn to_metrics(reading: &LevelReading, profile: &MachineProfile) -> Metrics {
    Metrics {
        db: reading.db,
        peak_frequency: reading.peak_frequency,
        is_stable: reading.is_stable,
        status: classify(reading, profile),
    }
}
