//! Configuration module
//!
//! Compile-time defaults for the controller, the simulated process and the
//! link, plus the persisted settings record.

pub mod params;
pub mod storage;

pub use params::*;
pub use storage::{load_or_initialize, SettingsStore, StorageError, StoredSettings};
