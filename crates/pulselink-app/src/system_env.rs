//! Production Environment implementation on the tokio clock.
//!
//! `SystemEnv` reads `tokio::time::Instant`, which follows real time in
//! production and virtual time under a paused test runtime. Command timeouts
//! can therefore be tested without waiting.

use std::time::Duration;

use pulselink_core::Environment;

/// Environment backed by the tokio clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a new system environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    type Instant = tokio::time::Instant;

    fn now(&self) -> Self::Instant {
        tokio::time::Instant::now()
    }

    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }
}
