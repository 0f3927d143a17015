//! Reference machine profiles.
//!
//! The built-in catalog is compiled in; a `[[machines]]` TOML file may replace
//! it at startup. Profiles are read-only once loaded.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Expected band for a machine's dominant frequency, inclusive, in Hz.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrequencyRange {
    pub low: f32,
    pub high: f32,
}

impl FrequencyRange {
    pub fn contains(&self, hz: f32) -> bool {
        hz >= self.low && hz <= self.high
    }
}

/// Acceptability envelope for one machine type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MachineProfile {
    pub id: String,
    pub name: String,
    pub category: String,
    pub max_db: f32,
    pub peak_freq_range: FrequencyRange,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to read catalog {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid catalog at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Catalog contains no machines")]
    Empty,
    #[error("Invalid machine profile {id:?}: {reason}")]
    InvalidProfile { id: String, reason: String },
}

#[derive(Deserialize)]
struct CatalogFile {
    machines: Vec<MachineProfile>,
}

fn profile(
    id: &str,
    name: &str,
    category: &str,
    max_db: f32,
    low: f32,
    high: f32,
) -> MachineProfile {
    MachineProfile {
        id: id.to_string(),
        name: name.to_string(),
        category: category.to_string(),
        max_db,
        peak_freq_range: FrequencyRange { low, high },
    }
}

/// Built-in catalog in display order.
pub fn builtin_catalog() -> Vec<MachineProfile> {
    vec![
        profile("centrifugal-pump", "Centrifugal Pump", "Pumps", 85.0, 50.0, 400.0),
        profile("air-compressor", "Piston Air Compressor", "Compressors", 92.0, 30.0, 250.0),
        profile("induction-motor", "Induction Motor", "Motors", 78.0, 50.0, 200.0),
        profile("cooling-fan", "Axial Cooling Fan", "Ventilation", 72.0, 80.0, 600.0),
        profile("gearbox", "Helical Gearbox", "Drivetrain", 88.0, 200.0, 1_500.0),
        profile("diesel-generator", "Diesel Generator", "Power", 98.0, 25.0, 180.0),
        profile("conveyor-belt", "Belt Conveyor", "Material Handling", 80.0, 40.0, 300.0),
        profile("hvac-blower", "HVAC Blower", "Ventilation", 70.0, 60.0, 500.0),
    ]
}

/// Load a catalog from a TOML file with one `[[machines]]` table per profile.
pub fn load_catalog(path: &Path) -> Result<Vec<MachineProfile>, CatalogError> {
    let text = std::fs::read_to_string(path).map_err(|source| CatalogError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let file: CatalogFile = toml::from_str(&text).map_err(|source| CatalogError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    validate(&file.machines)?;
    tracing::info!(
        "Loaded {} machine profiles from {}",
        file.machines.len(),
        path.display()
    );
    Ok(file.machines)
}

pub fn find_profile<'a>(catalog: &'a [MachineProfile], id: &str) -> Option<&'a MachineProfile> {
    catalog.iter().find(|profile| profile.id == id)
}

fn validate(machines: &[MachineProfile]) -> Result<(), CatalogError> {
    if machines.is_empty() {
        return Err(CatalogError::Empty);
    }
    let mut seen = HashSet::new();
    for machine in machines {
        let invalid = |reason: &str| CatalogError::InvalidProfile {
            id: machine.id.clone(),
            reason: reason.to_string(),
        };
        if machine.id.trim().is_empty() {
            return Err(invalid("id is empty"));
        }
        if !seen.insert(machine.id.as_str()) {
            return Err(invalid("duplicate id"));
        }
        let range = machine.peak_freq_range;
        if !machine.max_db.is_finite() || !range.low.is_finite() || !range.high.is_finite() {
            return Err(invalid("limits must be finite"));
        }
        if range.low > range.high {
            return Err(invalid("peak frequency range is inverted"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn builtin_catalog_is_valid() {
        let catalog = builtin_catalog();
        validate(&catalog).unwrap();
        assert_eq!(
            find_profile(&catalog, "induction-motor").map(|p| p.max_db),
            Some(78.0)
        );
        assert!(find_profile(&catalog, "turbine").is_none());
    }

    #[test]
    fn loads_catalog_from_toml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("catalog.toml");
        std::fs::write(
            &path,
            r#"
[[machines]]
id = "lathe"
name = "Bench Lathe"
category = "Machining"
max_db = 72.0
peak_freq_range = { low = 50.0, high = 200.0 }
"#,
        )
        .unwrap();
        let catalog = load_catalog(&path).unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog[0].name, "Bench Lathe");
        assert!(catalog[0].peak_freq_range.contains(50.0));
    }

    #[test]
    fn rejects_inverted_range_and_duplicates() {
        let mut machines = builtin_catalog();
        machines[0].peak_freq_range = FrequencyRange {
            low: 500.0,
            high: 100.0,
        };
        assert!(matches!(
            validate(&machines),
            Err(CatalogError::InvalidProfile { .. })
        ));

        let mut machines = builtin_catalog();
        machines[1].id = machines[0].id.clone();
        assert!(matches!(
            validate(&machines),
            Err(CatalogError::InvalidProfile { .. })
        ));
        assert!(matches!(validate(&[]), Err(CatalogError::Empty)));
    }
}
