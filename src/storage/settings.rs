//! Instrument settings stored as TOML.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::StorageError;
use crate::audio::AudioInputConfig;
use crate::calibration::Calibration;
use crate::session::clock::DEFAULT_REFRESH_HZ;

/// Default filename for the settings file inside the app directory.
pub const SETTINGS_FILE_NAME: &str = "settings.toml";

const MAX_REFRESH_HZ: u32 = 240;

/// User-editable settings. Missing keys fall back to defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub calibration: Calibration,
    #[serde(default = "default_refresh_hz")]
    pub refresh_hz: u32,
    /// Optional catalog file replacing the built-in machine list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog_path: Option<PathBuf>,
    #[serde(default)]
    pub audio_input: AudioInputConfig,
}

fn default_refresh_hz() -> u32 {
    DEFAULT_REFRESH_HZ
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            calibration: Calibration::ZERO,
            refresh_hz: DEFAULT_REFRESH_HZ,
            catalog_path: None,
            audio_input: AudioInputConfig::default(),
        }
    }
}

impl Settings {
    pub fn normalized(mut self) -> Self {
        self.refresh_hz = self.refresh_hz.clamp(1, MAX_REFRESH_HZ);
        self
    }
}

/// Load settings from `path`, returning defaults when the file is missing.
pub fn load_or_default(path: &Path) -> Result<Settings, StorageError> {
    if !path.exists() {
        return Ok(Settings::default());
    }
    let text = std::fs::read_to_string(path).map_err(|source| StorageError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&text)
        .map_err(|source| StorageError::ParseToml {
            path: path.to_path_buf(),
            source,
        })
        .map(Settings::normalized)
}

/// Write the TOML settings file atomically so a crash never leaves it half written.
pub fn save(settings: &Settings, path: &Path) -> Result<(), StorageError> {
    let data = toml::to_string_pretty(settings).map_err(|source| StorageError::SerializeToml {
        path: path.to_path_buf(),
        source,
    })?;
    atomic_write(path, data.as_bytes())
}

fn atomic_write(path: &Path, data: &[u8]) -> Result<(), StorageError> {
    use rand::TryRngCore;

    let write_error = |path: &Path, source: std::io::Error| StorageError::Write {
        path: path.to_path_buf(),
        source,
    };
    let dir = path.parent().ok_or_else(|| {
        write_error(
            path,
            std::io::Error::other("settings path has no parent directory"),
        )
    })?;
    std::fs::create_dir_all(dir).map_err(|source| StorageError::CreateDir {
        path: dir.to_path_buf(),
        source,
    })?;
    let file_name = path
        .file_name()
        .ok_or_else(|| write_error(path, std::io::Error::other("settings path has no file name")))?;

    let mut bytes = [0u8; 6];
    rand::rngs::OsRng.try_fill_bytes(&mut bytes).map_err(|source| {
        write_error(
            path,
            std::io::Error::other(format!("failed to generate temporary file suffix: {source}")),
        )
    })?;
    let suffix: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
    let tmp_path = dir.join(format!("{}.tmp-{suffix}", file_name.to_string_lossy()));

    let result = (|| {
        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&tmp_path)?;
        file.write_all(data)?;
        file.sync_all()?;
        drop(file);
        std::fs::rename(&tmp_path, path)
    })();
    if let Err(source) = result {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(write_error(path, source));
    }
    sync_parent_dir(dir)
}

fn sync_parent_dir(dir: &Path) -> Result<(), StorageError> {
    #[cfg(unix)]
    {
        let dir_handle = std::fs::File::open(dir).map_err(|source| StorageError::Write {
            path: dir.to_path_buf(),
            source,
        })?;
        dir_handle.sync_all().map_err(|source| StorageError::Write {
            path: dir.to_path_buf(),
            source,
        })?;
    }
    #[cfg(not(unix))]
    {
        let _ = dir;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let settings = load_or_default(&dir.path().join(SETTINGS_FILE_NAME)).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join(SETTINGS_FILE_NAME);
        let settings = Settings {
            calibration: Calibration::new(-12.5).unwrap(),
            refresh_hz: 30,
            catalog_path: Some(PathBuf::from("machines.toml")),
            audio_input: AudioInputConfig {
                device: Some("USB Mic".into()),
                ..AudioInputConfig::default()
            },
        };
        save(&settings, &path).unwrap();
        assert_eq!(load_or_default(&path).unwrap(), settings);

        let leftovers = std::fs::read_dir(path.parent().unwrap())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().contains(".tmp-"))
            .count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn out_of_range_calibration_is_a_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE_NAME);
        std::fs::write(&path, "calibration = 80.0\n").unwrap();
        assert!(matches!(
            load_or_default(&path),
            Err(StorageError::ParseToml { .. })
        ));
    }

    #[test]
    fn refresh_rate_is_clamped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE_NAME);
        std::fs::write(&path, "refresh_hz = 100000\n").unwrap();
        assert_eq!(load_or_default(&path).unwrap().refresh_hz, MAX_REFRESH_HZ);
    }
}
