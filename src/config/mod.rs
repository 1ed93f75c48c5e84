//! Configuration loading and validation.

mod settings;

pub use settings::{CalendarSyncConfig, Config, ReconcilerConfig, SchedulingConfig};
