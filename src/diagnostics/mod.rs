//! Machine envelopes and pass/fail classification.

pub mod catalog;
pub mod classifier;
pub mod metrics;

pub use catalog::{
    CatalogError, FrequencyRange, MachineProfile, builtin_catalog, find_profile, load_catalog,
};
pub use classifier::{Assessment, SIGNIFICANT_SIGNAL, assess, classify, to_metrics};
pub use metrics::{Metrics, Status};
