use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::diagnostics::{MachineProfile, Metrics, Status};

/// Terminal verdict of one measurement session. Never mutated once created.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: Uuid,
    pub machine_id: String,
    pub machine_name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub status: Status,
    pub db: f32,
    pub peak_frequency: u32,
}

impl HistoryRecord {
    /// Freeze `metrics` as the verdict for `machine`.
    pub fn new(machine: &MachineProfile, metrics: &Metrics, created_at: OffsetDateTime) -> Self {
        Self {
            id: Uuid::new_v4(),
            machine_id: machine.id.clone(),
            machine_name: machine.name.clone(),
            created_at,
            status: metrics.status,
            db: metrics.db,
            peak_frequency: metrics.peak_frequency,
        }
    }
}
