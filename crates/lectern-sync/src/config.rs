//! Sync-layer configuration.
//!
//! All knobs have defaults matching the behaviour the UI was tuned against;
//! deployments override them via a TOML file and/or `LECTERN_`-prefixed
//! environment variables.

use std::{path::Path, time::Duration};

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
  /// How long a cached query snapshot stays servable, in seconds.
  pub cache_ttl_secs: u64,

  /// Default minimum spacing between listener deliveries, in milliseconds.
  pub debounce_max_wait_ms: u64,

  /// Fixed debounce window for the answer feed, in milliseconds. Tighter
  /// than the default because answers are the primary live-feedback signal.
  pub answer_feed_wait_ms: u64,

  /// Idle time after which the sweeper closes an active session, in seconds.
  pub inactivity_threshold_secs: u64,

  /// Minimum spacing between sweeps, in seconds.
  pub sweep_min_interval_secs: u64,

  /// Idle time after which closed/archived session data is purged, in
  /// seconds.
  pub retention_secs: u64,
}

impl Default for SyncConfig {
  fn default() -> Self {
    Self {
      cache_ttl_secs:            300,
      debounce_max_wait_ms:      2_000,
      answer_feed_wait_ms:       1_000,
      inactivity_threshold_secs: 3 * 60 * 60,
      sweep_min_interval_secs:   10 * 60,
      retention_secs:            24 * 60 * 60,
    }
  }
}

impl SyncConfig {
  /// Load configuration from an optional TOML file merged with `LECTERN_`
  /// environment variables. Missing file and missing keys fall back to the
  /// defaults.
  pub fn load(path: Option<&Path>) -> Result<Self, config::ConfigError> {
    let mut builder = config::Config::builder();
    if let Some(path) = path {
      builder =
        builder.add_source(config::File::from(path.to_path_buf()).required(false));
    }
    builder
      .add_source(config::Environment::with_prefix("LECTERN"))
      .build()?
      .try_deserialize()
  }

  pub fn cache_ttl(&self) -> Duration { Duration::from_secs(self.cache_ttl_secs) }

  pub fn debounce_max_wait(&self) -> Duration {
    Duration::from_millis(self.debounce_max_wait_ms)
  }

  pub fn answer_feed_wait(&self) -> Duration {
    Duration::from_millis(self.answer_feed_wait_ms)
  }

  pub fn inactivity_threshold(&self) -> chrono::Duration {
    chrono::Duration::seconds(self.inactivity_threshold_secs as i64)
  }

  pub fn sweep_min_interval(&self) -> chrono::Duration {
    chrono::Duration::seconds(self.sweep_min_interval_secs as i64)
  }

  pub fn retention(&self) -> chrono::Duration {
    chrono::Duration::seconds(self.retention_secs as i64)
  }
}
