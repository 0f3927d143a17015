use std::path::{Path, PathBuf};

use super::history::{HISTORY_DB_FILE_NAME, HistoryDatabase};
use super::settings::{self, SETTINGS_FILE_NAME, Settings};
use super::{Persistence, StorageError};
use crate::app_dirs;
use crate::calibration::Calibration;
use crate::session::HistoryRecord;

/// On-disk store: `settings.toml` plus `history.db` in one directory.
pub struct AppStore {
    dir: PathBuf,
    settings: Settings,
    history: HistoryDatabase,
}

impl AppStore {
    /// Open the store inside the application directory.
    pub fn open_default() -> Result<Self, StorageError> {
        let dir = app_dirs::app_root_dir()?;
        Self::open_in(&dir)
    }

    pub fn open_in(dir: &Path) -> Result<Self, StorageError> {
        std::fs::create_dir_all(dir).map_err(|source| StorageError::CreateDir {
            path: dir.to_path_buf(),
            source,
        })?;
        let settings = settings::load_or_default(&dir.join(SETTINGS_FILE_NAME))?;
        let history = HistoryDatabase::open(&dir.join(HISTORY_DB_FILE_NAME))?;
        tracing::debug!("Opened store at {}", dir.display());
        Ok(Self {
            dir: dir.to_path_buf(),
            settings,
            history,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Apply `update` and persist the result. The in-memory copy only changes
    /// when the write succeeds.
    pub fn update_settings(
        &mut self,
        update: impl FnOnce(&mut Settings),
    ) -> Result<(), StorageError> {
        let mut next = self.settings.clone();
        update(&mut next);
        let next = next.normalized();
        settings::save(&next, &self.settings_path())?;
        self.settings = next;
        Ok(())
    }

    fn settings_path(&self) -> PathBuf {
        self.dir.join(SETTINGS_FILE_NAME)
    }
}

impl Persistence for AppStore {
    fn load_calibration(&self) -> Result<Calibration, StorageError> {
        Ok(self.settings.calibration)
    }

    fn save_calibration(&mut self, calibration: Calibration) -> Result<(), StorageError> {
        self.update_settings(|settings| settings.calibration = calibration)
    }

    fn load_history(&self) -> Result<Vec<HistoryRecord>, StorageError> {
        self.history.load()
    }

    fn append_history(
        &mut self,
        record: HistoryRecord,
    ) -> Result<Vec<HistoryRecord>, StorageError> {
        self.history.append(&record)
    }

    fn clear_history(&mut self) -> Result<(), StorageError> {
        self.history.clear()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn calibration_persists_across_reopen() {
        let dir = tempdir().unwrap();
        let offset = Calibration::new(4.5).unwrap();
        {
            let mut store = AppStore::open_in(dir.path()).unwrap();
            assert_eq!(store.load_calibration().unwrap(), Calibration::ZERO);
            store.save_calibration(offset).unwrap();
        }
        let store = AppStore::open_in(dir.path()).unwrap();
        assert_eq!(store.load_calibration().unwrap(), offset);
        assert!(dir.path().join(SETTINGS_FILE_NAME).is_file());
        assert!(dir.path().join(HISTORY_DB_FILE_NAME).is_file());
    }

    #[test]
    fn update_settings_normalizes_before_saving() {
        let dir = tempdir().unwrap();
        let mut store = AppStore::open_in(dir.path()).unwrap();
        store.update_settings(|s| s.refresh_hz = 0).unwrap();
        assert_eq!(store.settings().refresh_hz, 1);
        let reloaded = settings::load_or_default(&dir.path().join(SETTINGS_FILE_NAME)).unwrap();
        assert_eq!(reloaded.refresh_hz, 1);
    }
}
