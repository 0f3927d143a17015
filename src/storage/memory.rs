use std::collections::VecDeque;

use super::{HISTORY_CAPACITY, Persistence, StorageError};
use crate::calibration::Calibration;
use crate::session::HistoryRecord;

/// In-process store with the same retention rules as [`super::AppStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    calibration: Calibration,
    /// Most recent first.
    history: VecDeque<HistoryRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_calibration(calibration: Calibration) -> Self {
        Self {
            calibration,
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }
}

impl Persistence for MemoryStore {
    fn load_calibration(&self) -> Result<Calibration, StorageError> {
        Ok(self.calibration)
    }

    fn save_calibration(&mut self, calibration: Calibration) -> Result<(), StorageError> {
        self.calibration = calibration;
        Ok(())
    }

    fn load_history(&self) -> Result<Vec<HistoryRecord>, StorageError> {
        Ok(self.history.iter().cloned().collect())
    }

    fn append_history(
        &mut self,
        record: HistoryRecord,
    ) -> Result<Vec<HistoryRecord>, StorageError> {
        self.history.push_front(record);
        self.history.truncate(HISTORY_CAPACITY);
        self.load_history()
    }

    fn clear_history(&mut self) -> Result<(), StorageError> {
        self.history.clear();
        Ok(())
    }
}
