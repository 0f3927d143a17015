use std::fmt;

use serde::{Deserialize, Serialize};

/// Verdict for one snapshot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    /// No measurement yet.
    #[default]
    Idle,
    Normal,
    Abnormal,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Idle => "IDLE",
            Status::Normal => "NORMAL",
            Status::Abnormal => "ABNORMAL",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "IDLE" => Some(Status::Idle),
            "NORMAL" => Some(Status::Normal),
            "ABNORMAL" => Some(Status::Abnormal),
            _ => None,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value snapshot published once per refresh tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub db: f32,
    pub peak_frequency: u32,
    pub is_stable: bool,
    pub status: Status,
}

impl Metrics {
    /// Zeroed snapshot reported before the pipeline has a full block.
    pub const fn idle() -> Self {
        Self {
            db: 0.0,
            peak_frequency: 0,
            is_stable: false,
            status: Status::Idle,
        }
    }
}
