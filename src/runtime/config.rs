//! Runtime configuration: the bounded grace period `ControlPlane::run` gives
//! the lease manager and scheduler to stop before abandoning them.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub shutdown_timeout: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self { shutdown_timeout: Duration::from_secs(5) }
    }
}

impl RuntimeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }
}

