//! Config composition: builder defaults and the merge service.

pub mod service;

use config::builder::DefaultState;
use config::{ConfigBuilder, ConfigError};

/// Builder seeded with the values every layer falls back to.
pub(crate) fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    config::Config::builder()
        .set_default("store.open_timeout_ms", 5_000_i64)?
        .set_default("store.open_retry_interval_ms", 50_i64)
}
