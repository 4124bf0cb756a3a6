use thiserror::Error;

use crate::application::store::StoreError;
use crate::application::sync::PreferenceError;
use crate::config::LoadError;
use crate::infra::telemetry::TelemetryError;

/// Top-level failure surfaced by the binary.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to load configuration: {0}")]
    Config(#[from] LoadError),
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    #[error(transparent)]
    Preference(#[from] PreferenceError),
    #[error(transparent)]
    Store(#[from] StoreError),
}
