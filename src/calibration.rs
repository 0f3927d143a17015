//! User-adjustable decibel correction for microphone sensitivity.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lowest accepted calibration offset in dB.
pub const CALIBRATION_MIN_DB: f32 = -60.0;
/// Highest accepted calibration offset in dB.
pub const CALIBRATION_MAX_DB: f32 = 60.0;

/// Rejected calibration input. The previously active value stays in effect.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CalibrationError {
    #[error("Calibration offset {value} dB is outside [-60, 60]")]
    OutOfRange { value: f32 },
    #[error("Calibration offset must be a finite number")]
    NotFinite,
    #[error("Could not parse calibration offset {input:?}")]
    Parse { input: String },
}

/// Additive dB offset, validated to lie in the accepted range.
///
/// Out-of-range values are rejected rather than clamped.
#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f32", into = "f32")]
pub struct Calibration(f32);

impl Calibration {
    pub const ZERO: Calibration = Calibration(0.0);

    pub fn new(offset_db: f32) -> Result<Self, CalibrationError> {
        if !offset_db.is_finite() {
            return Err(CalibrationError::NotFinite);
        }
        if !(CALIBRATION_MIN_DB..=CALIBRATION_MAX_DB).contains(&offset_db) {
            return Err(CalibrationError::OutOfRange { value: offset_db });
        }
        Ok(Self(offset_db))
    }

    pub fn offset_db(self) -> f32 {
        self.0
    }
}

impl TryFrom<f32> for Calibration {
    type Error = CalibrationError;

    fn try_from(value: f32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Calibration> for f32 {
    fn from(value: Calibration) -> Self {
        value.0
    }
}

impl FromStr for Calibration {
    type Err = CalibrationError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let trimmed = input.trim();
        let trimmed = trimmed.strip_suffix("dB").unwrap_or(trimmed).trim_end();
        let value: f32 = trimmed.parse().map_err(|_| CalibrationError::Parse {
            input: input.to_string(),
        })?;
        Self::new(value)
    }
}

impl fmt::Display for Calibration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:+.1} dB", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_range_bounds() {
        assert!(Calibration::new(-60.0).is_ok());
        assert!(Calibration::new(60.0).is_ok());
        assert_eq!(Calibration::new(12.5).unwrap().offset_db(), 12.5);
    }

    #[test]
    fn rejects_out_of_range_instead_of_clamping() {
        assert_eq!(
            Calibration::new(60.5),
            Err(CalibrationError::OutOfRange { value: 60.5 })
        );
        assert_eq!(Calibration::new(f32::NAN), Err(CalibrationError::NotFinite));
    }

    #[test]
    fn parses_plain_and_suffixed_values() {
        assert_eq!("-3.5".parse::<Calibration>().unwrap().offset_db(), -3.5);
        assert_eq!(" 4 dB ".parse::<Calibration>().unwrap().offset_db(), 4.0);
        assert!(matches!(
            "loud".parse::<Calibration>(),
            Err(CalibrationError::Parse { .. })
        ));
        assert!(matches!(
            "75".parse::<Calibration>(),
            Err(CalibrationError::OutOfRange { .. })
        ));
    }

    #[test]
    fn serde_rejects_invalid_offsets() {
        #[derive(Deserialize)]
        struct Wrapper {
            calibration: Calibration,
        }
        let ok: Wrapper = toml::from_str("calibration = 6.0").unwrap();
        assert_eq!(ok.calibration.offset_db(), 6.0);
        assert!(toml::from_str::<Wrapper>("calibration = 99.0").is_err());
    }
}
