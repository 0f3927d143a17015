//! Level and dominant-frequency extraction from one analysis block.

use crate::calibration::Calibration;

use super::spectrum::bin_frequency;

/// dB added so a full-scale RMS of 1.0 reads 100 dB before calibration.
pub const REFERENCE_OFFSET_DB: f64 = 100.0;
/// Smallest RMS fed to the logarithm; silence reads 0 dB uncalibrated.
pub const RMS_FLOOR: f64 = 1e-5;
/// RMS above which the signal counts as stable (noise-floor gate).
pub const STABILITY_THRESHOLD: f32 = 0.001;

/// Everything the classifier needs from one block.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LevelReading {
    pub rms: f32,
    /// Calibrated level rounded to one decimal.
    pub db: f32,
    /// Dominant frequency rounded to whole Hz.
    pub peak_frequency: u32,
    /// Magnitude of the dominant bin on the 0-255 scale.
    pub max_magnitude: u8,
    pub is_stable: bool,
}

/// Root mean square of a block; 0 for an empty block.
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
    (sum / samples.len() as f64).sqrt() as f32
}

/// Calibrated level in dB, rounded to one decimal.
pub fn level_db(rms: f32, calibration: Calibration) -> f32 {
    let raw = 20.0 * (rms as f64).max(RMS_FLOOR).log10()
        + REFERENCE_OFFSET_DB
        + calibration.offset_db() as f64;
    round_to_tenth(raw) as f32
}

fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Index and value of the largest bin. Ties resolve to the lowest index.
pub fn peak_bin(magnitudes: &[u8]) -> Option<(usize, u8)> {
    let mut best: Option<(usize, u8)> = None;
    for (idx, &value) in magnitudes.iter().enumerate() {
        if best.is_none_or(|(_, current)| value > current) {
            best = Some((idx, value));
        }
    }
    best
}

/// Dominant frequency in whole Hz for a bin index.
pub fn peak_frequency_hz(bin: usize, sample_rate: u32) -> u32 {
    bin_frequency(bin, sample_rate).round() as u32
}

/// Derive level, dominant frequency and the stability gate from one block.
pub fn extract(
    samples: &[f32],
    magnitudes: &[u8],
    sample_rate: u32,
    calibration: Calibration,
) -> LevelReading {
    let rms = rms(samples);
    let (bin, max_magnitude) = peak_bin(magnitudes).unwrap_or((0, 0));
    LevelReading {
        rms,
        db: level_db(rms, calibration),
        peak_frequency: peak_frequency_hz(bin, sample_rate),
        max_magnitude,
        is_stable: rms > STABILITY_THRESHOLD,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cal(value: f32) -> Calibration {
        Calibration::new(value).unwrap()
    }

    #[test]
    fn full_scale_square_wave_reads_reference_level() {
        let block = [1.0_f32, -1.0, 1.0, -1.0];
        assert_eq!(rms(&block), 1.0);
        assert_eq!(level_db(1.0, Calibration::ZERO), 100.0);
    }

    #[test]
    fn silence_hits_the_floor_instead_of_negative_infinity() {
        let reading = extract(&[0.0; 64], &[0; 16], 48_000, Calibration::ZERO);
        assert_eq!(reading.db, 0.0);
        assert!(!reading.is_stable);
        assert_eq!(reading.peak_frequency, 0);
    }

    #[test]
    fn level_is_rounded_to_one_decimal() {
        // 20*log10(0.0123) + 100 = 61.798...
        assert_eq!(level_db(0.0123, Calibration::ZERO), 61.8);
    }

    #[test]
    fn calibration_shifts_level_linearly() {
        let block: Vec<f32> = (0..512).map(|i| 0.0123 * ((i as f32) * 0.2).sin()).collect();
        let base = extract(&block, &[], 48_000, Calibration::ZERO).db;
        for step in -60..=60 {
            let shifted = extract(&block, &[], 48_000, cal(step as f32)).db;
            assert!(
                (shifted - base - step as f32).abs() < 1e-3,
                "offset {step}: {base} -> {shifted}"
            );
        }
    }

    #[test]
    fn extraction_is_idempotent_on_a_frozen_block() {
        let block: Vec<f32> = (0..256).map(|i| ((i as f32) * 0.05).cos() * 0.3).collect();
        let magnitudes: Vec<u8> = (0..128).map(|i| (i * 7 % 251) as u8).collect();
        let first = extract(&block, &magnitudes, 44_100, cal(-4.0));
        let second = extract(&block, &magnitudes, 44_100, cal(-4.0));
        assert_eq!(first, second);
    }

    #[test]
    fn peak_bin_prefers_first_of_equal_maxima() {
        assert_eq!(peak_bin(&[3, 9, 1, 9, 2]), Some((1, 9)));
        assert_eq!(peak_bin(&[]), None);
    }

    #[test]
    fn peak_frequency_rounds_to_nearest_hz() {
        // bin 1 at 44.1 kHz is 21.533 Hz.
        assert_eq!(peak_frequency_hz(1, 44_100), 22);
        assert_eq!(peak_frequency_hz(100, 48_000), 2_344);
    }

    #[test]
    fn stability_gate_uses_rms_threshold() {
        let quiet = [0.0005_f32; 32];
        let audible = [0.01_f32; 32];
        assert!(!extract(&quiet, &[], 48_000, Calibration::ZERO).is_stable);
        assert!(extract(&audible, &[], 48_000, Calibration::ZERO).is_stable);
    }
}
