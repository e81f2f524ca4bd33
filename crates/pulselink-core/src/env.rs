//! Environment abstraction for deterministic testing.
//!
//! Decouples the sync logic from the wall clock. Production uses real time,
//! tests use tokio's paused clock so command timeouts can be exercised without
//! waiting.

use std::time::Duration;

/// Abstract environment providing time and async sleep.
///
/// # Invariants
///
/// - `now()` never goes backwards within a single execution context.
pub trait Environment: Clone + Send + Sync + 'static {
    /// The specific instant type used by this environment.
    ///
    /// Production environments use a monotonic clock, while simulation
    /// environments use virtual time.
    type Instant: Copy + Ord + Send + Sync + std::ops::Sub<Output = Duration>;

    /// Current time (monotonic).
    fn now(&self) -> Self::Instant;

    /// Sleeps for the specified duration.
    ///
    /// Only driver code may sleep; the channel state machine never does.
    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send;
}
