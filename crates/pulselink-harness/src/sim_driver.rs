//! Simulation driver wiring the production runtime to a simulated companion.
//!
//! `SimDriver` spawns the real [`Runtime`] with a [`SimTransport`] and the
//! tokio-clock [`SystemEnv`]. Under `#[tokio::test(start_paused = true)]` the
//! clock is virtual, so timeouts resolve instantly and runs are reproducible
//! for a given seed.

use std::time::Duration;

use pulselink_app::{ChannelHandle, Runtime, SystemEnv};
use pulselink_core::{ChannelConfig, ChannelSnapshot};
use tokio::task::JoinHandle;

use crate::{
    invariants::{InvariantRegistry, Observation},
    sim_companion::{SimCompanion, SimCompanionConfig},
};

/// How long [`SimDriver::settle`] lets the runtime drain its queue.
const SETTLE_TIME: Duration = Duration::from_millis(1);

/// Running simulation: runtime task, its handle and the companion.
pub struct SimDriver {
    handle: ChannelHandle,
    companion: SimCompanion,
    task: JoinHandle<()>,
    invariants: Option<InvariantRegistry>,
    last: ChannelSnapshot,
}

impl SimDriver {
    /// Spawn a runtime talking to a fresh companion.
    ///
    /// Must be called inside a tokio runtime.
    pub fn start(companion: SimCompanionConfig, channel: ChannelConfig) -> Self {
        let companion = SimCompanion::new(companion);
        let (runtime, handle) = Runtime::new(companion.transport(), SystemEnv::new(), channel);
        let task = tokio::spawn(runtime.run());
        let last = handle.snapshot();

        Self { handle, companion, task, invariants: None, last }
    }

    /// Check `registry` on every [`Self::settle`].
    #[must_use]
    pub fn with_invariants(mut self, registry: InvariantRegistry) -> Self {
        self.invariants = Some(registry);
        self
    }

    /// Handle to the runtime.
    pub fn handle(&self) -> &ChannelHandle {
        &self.handle
    }

    /// The simulated companion.
    pub fn companion(&self) -> &SimCompanion {
        &self.companion
    }

    /// Activate and wait for the session to come up.
    pub async fn activate(&mut self) -> ChannelSnapshot {
        self.handle.activate();
        self.settle(&format!("activate #{}", self.companion.activations() + 1)).await
    }

    /// Let the runtime process everything queued so far, then check
    /// invariants against the previous settle point.
    ///
    /// # Panics
    ///
    /// Panics if a registered invariant is violated.
    pub async fn settle(&mut self, context: &str) -> ChannelSnapshot {
        tokio::time::sleep(SETTLE_TIME).await;
        let after = self.handle.snapshot();

        if let Some(registry) = &self.invariants {
            let observation = Observation {
                before: self.last.clone(),
                after: after.clone(),
                companion_workout: self.companion.workout(),
            };
            registry.assert_all(&observation, context);
        }

        self.last = after.clone();
        after
    }

    /// Shut the runtime down and wait for its task.
    pub async fn stop(self) {
        self.handle.shutdown();
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "sync runtime task failed");
        }
    }
}
