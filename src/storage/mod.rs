//! Persistence of calibration and measurement history.
//!
//! The session engine only talks to the [`Persistence`] trait. [`AppStore`]
//! keeps settings in TOML and history in SQLite under the app directory;
//! [`MemoryStore`] keeps everything in process.

use std::path::PathBuf;

use thiserror::Error;

use crate::app_dirs::AppDirError;
use crate::calibration::Calibration;
use crate::session::HistoryRecord;

mod app_store;
mod history;
mod memory;
pub mod settings;

pub use app_store::AppStore;
pub use history::HistoryDatabase;
pub use memory::MemoryStore;
pub use settings::Settings;

/// Maximum number of history records retained; oldest are evicted first.
pub const HISTORY_CAPACITY: usize = 50;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("No suitable config directory available")]
    NoConfigDir,
    #[error("Unable to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid settings at {path}: {source}")]
    ParseToml {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Failed to serialize settings for {path}: {source}")]
    SerializeToml {
        path: PathBuf,
        source: toml::ser::Error,
    },
    #[error("History database query failed: {0}")]
    Sql(#[from] rusqlite::Error),
    #[error("Failed to format history timestamp: {0}")]
    FormatTime(#[from] time::error::Format),
}

impl From<AppDirError> for StorageError {
    fn from(error: AppDirError) -> Self {
        match error {
            AppDirError::NoBaseDir => StorageError::NoConfigDir,
            AppDirError::CreateDir { path, source } => StorageError::CreateDir { path, source },
        }
    }
}

/// Storage collaborator used by the session engine.
///
/// History is returned most recent first and never holds more than
/// [`HISTORY_CAPACITY`] records. Calibration is last-write-wins.
pub trait Persistence {
    fn load_calibration(&self) -> Result<Calibration, StorageError>;

    fn save_calibration(&mut self, calibration: Calibration) -> Result<(), StorageError>;

    fn load_history(&self) -> Result<Vec<HistoryRecord>, StorageError>;

    /// Append one record and return the capped history.
    fn append_history(&mut self, record: HistoryRecord)
    -> Result<Vec<HistoryRecord>, StorageError>;

    fn clear_history(&mut self) -> Result<(), StorageError>;
}
