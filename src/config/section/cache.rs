//! `[cache]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [cache]
//! ttl = 3600000          # ms, -1 = never expire
//! max_size = 10485760    # bytes, optional
//! sweep_interval = 1000  # ms between background sweeps
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Resource set cache settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Entry lifetime in milliseconds; `-1` keeps entries until purged.
    pub ttl: i64,

    /// Size budget in bytes (content plus serialized headers).
    pub max_size: Option<usize>,

    /// Milliseconds between background expiry sweeps.
    pub sweep_interval: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: 3_600_000,
            max_size: None,
            sweep_interval: 1000,
        }
    }
}

impl CacheConfig {
    /// Entry lifetime, `None` when entries never expire.
    pub fn ttl(&self) -> Option<Duration> {
        u64::try_from(self.ttl).ok().map(Duration::from_millis)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval.max(1))
    }
}
