//! Runner configuration
//!
//! Defines the tunables of the execution engine. Cluster connection settings
//! live in the client crate; this only covers how a run observes its pod.

use std::time::Duration;

use anyhow::Context;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);
const DEFAULT_START_TIMEOUT: Duration = Duration::from_secs(300);

/// Runner configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerConfig {
    /// How often pod status is polled while waiting for start and completion
    pub poll_interval: Duration,
    /// How long a pod may stay `Pending` before the run gives up on it
    pub start_timeout: Duration,
}

impl RunnerConfig {
    /// Creates a new configuration with defaults
    pub fn new() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            start_timeout: DEFAULT_START_TIMEOUT,
        }
    }

    /// Overrides the status poll interval
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Overrides how long a pod may take to start
    pub fn with_start_timeout(mut self, start_timeout: Duration) -> Self {
        self.start_timeout = start_timeout;
        self
    }

    /// Creates configuration from environment variables
    ///
    /// Expected environment variables:
    /// - K8SRUN_POLL_INTERVAL_MS (optional, milliseconds, default: 2000)
    /// - K8SRUN_START_TIMEOUT_SECS (optional, seconds, default: 300)
    pub fn from_env() -> anyhow::Result<Self> {
        let mut config = Self::new();

        if let Ok(raw) = std::env::var("K8SRUN_POLL_INTERVAL_MS") {
            let millis = raw
                .trim()
                .parse::<u64>()
                .with_context(|| format!("K8SRUN_POLL_INTERVAL_MS is not a number: {:?}", raw))?;
            config.poll_interval = Duration::from_millis(millis);
        }

        if let Ok(raw) = std::env::var("K8SRUN_START_TIMEOUT_SECS") {
            let secs = raw
                .trim()
                .parse::<u64>()
                .with_context(|| format!("K8SRUN_START_TIMEOUT_SECS is not a number: {:?}", raw))?;
            config.start_timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.poll_interval.is_zero() {
            anyhow::bail!("poll_interval must be greater than 0");
        }

        if self.start_timeout.is_zero() {
            anyhow::bail!("start_timeout must be greater than 0");
        }

        Ok(())
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self::new()
    }
}
