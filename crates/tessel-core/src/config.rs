//! Configuration for kernel execution.

use serde::{Deserialize, Serialize};

use crate::{Result, TesselError};

/// Environment variable overriding [`KernelConfig::parallel_threshold`].
pub const ENV_PARALLEL_THRESHOLD: &str = "TESSEL_PARALLEL_THRESHOLD";
/// Environment variable overriding [`KernelConfig::num_threads`].
pub const ENV_NUM_THREADS: &str = "TESSEL_NUM_THREADS";

/// Controls how [`ParallelOps`](crate::ops::ParallelOps) schedules kernels.
///
/// Deserializes with defaults for missing fields, so it can be embedded in a
/// host application's own config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    /// Minimum number of output elements before kernels run on rayon.
    /// Smaller workloads use the sequential kernels.
    pub parallel_threshold: usize,

    /// Size of a dedicated thread pool. `None` uses rayon's global pool.
    pub num_threads: Option<usize>,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            parallel_threshold: 8192,
            num_threads: None,
        }
    }
}

impl KernelConfig {
    /// Defaults overridden by `TESSEL_PARALLEL_THRESHOLD` / `TESSEL_NUM_THREADS`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for the env keys.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(v) = lookup(ENV_PARALLEL_THRESHOLD) {
            config.parallel_threshold = parse_usize(ENV_PARALLEL_THRESHOLD, &v)?;
        }
        if let Some(v) = lookup(ENV_NUM_THREADS) {
            config.num_threads = Some(parse_usize(ENV_NUM_THREADS, &v)?);
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_threads == Some(0) {
            return Err(TesselError::Config("num_threads must be at least 1".into()));
        }
        Ok(())
    }
}

fn parse_usize(key: &str, value: &str) -> Result<usize> {
    value
        .trim()
        .parse()
        .map_err(|e| TesselError::Config(format!("{key}={value:?}: {e}")))
}
