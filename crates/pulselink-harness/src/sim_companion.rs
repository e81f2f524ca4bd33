//! Scripted companion device and the transport that talks to it.
//!
//! [`SimCompanion`] plays the watch side: it answers commands, tracks its own
//! workout and produces seeded metric streams. [`SimTransport`] implements
//! [`Transport`] on top of it so the production [`pulselink_app::Runtime`]
//! runs unchanged in tests.
//!
//! Every payload crossing the simulated link is CBOR-encoded on the sending
//! side and decoded on the receiving side, so wire failures surface the way
//! they would on a device.

use std::sync::{Arc, Mutex, MutexGuard};

use pulselink_app::{Callbacks, Transport};
use pulselink_core::RequestId;
use pulselink_proto::{Command, MetricUpdate, Payload, ProtocolError, keys};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Default seed for simulated metrics.
pub const DEFAULT_SEED: u64 = 0x5EED;

/// Behaviour knobs for the simulated companion.
#[derive(Debug, Clone)]
pub struct SimCompanionConfig {
    /// Platform supports pairing at all
    pub supported: bool,
    /// Companion app reported as installed on activation
    pub installed: bool,
    /// Companion reported as reachable on activation
    pub reachable: bool,
    /// Error text reported with activation completion
    pub activation_error: Option<String>,
    /// Answer `startWorkout` with `success: false`
    pub reject_start: bool,
    /// Swallow commands without replying
    pub drop_replies: bool,
    /// Fail every send
    pub fail_sends: bool,
    /// Seed for metric generation
    pub seed: u64,
}

impl Default for SimCompanionConfig {
    fn default() -> Self {
        Self {
            supported: true,
            installed: true,
            reachable: true,
            activation_error: None,
            reject_start: false,
            drop_replies: false,
            fail_sends: false,
            seed: DEFAULT_SEED,
        }
    }
}

struct CompanionState {
    config: SimCompanionConfig,
    callbacks: Option<Callbacks>,
    rng: ChaCha8Rng,
    workout: Option<String>,
    heart_rate: f64,
    steps: i64,
    active_energy: f64,
    distance: f64,
    activations: usize,
    sends: usize,
    receipts: usize,
    wire_bytes: usize,
}

/// Simulated companion device.
///
/// Clones share the same device. Triggers such as [`Self::set_reachable`]
/// report through the callbacks the runtime attached, so they only take
/// effect once a runtime exists.
#[derive(Clone)]
pub struct SimCompanion {
    state: Arc<Mutex<CompanionState>>,
}

impl SimCompanion {
    /// Create a companion with `config`.
    pub fn new(config: SimCompanionConfig) -> Self {
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        Self {
            state: Arc::new(Mutex::new(CompanionState {
                config,
                callbacks: None,
                rng,
                workout: None,
                heart_rate: 72.0,
                steps: 0,
                active_energy: 0.0,
                distance: 0.0,
                activations: 0,
                sends: 0,
                receipts: 0,
                wire_bytes: 0,
            })),
        }
    }

    /// Transport endpoint connected to this companion.
    pub fn transport(&self) -> SimTransport {
        SimTransport { companion: self.clone() }
    }

    /// Change the behaviour knobs. Takes effect for the next command.
    pub fn configure(&self, update: impl FnOnce(&mut SimCompanionConfig)) {
        update(&mut self.lock().config);
    }

    /// Report a reachability change.
    pub fn set_reachable(&self, reachable: bool) {
        let state = self.lock();
        if let Some(callbacks) = &state.callbacks {
            callbacks.reachability_changed(reachable);
        }
    }

    /// Report an install-state change.
    pub fn set_installed(&self, installed: bool) {
        let state = self.lock();
        if let Some(callbacks) = &state.callbacks {
            callbacks.install_state_changed(installed);
        }
    }

    /// Platform tears the session down: inactive, then deactivated.
    pub fn deactivate(&self) {
        let state = self.lock();
        if let Some(callbacks) = &state.callbacks {
            callbacks.session_became_inactive();
            callbacks.session_deactivated();
        }
    }

    /// Advance the simulated metrics and push them.
    ///
    /// With `expect_receipt`, the push carries a reply slot whose answer is
    /// counted in [`Self::receipts`].
    pub fn push_metrics(&self, expect_receipt: bool) -> MetricUpdate {
        let update = {
            let mut state = self.lock();
            state.advance();
            state.current()
        };
        self.push(update.to_payload(), expect_receipt);
        update
    }

    /// Push an arbitrary payload.
    ///
    /// A payload that does not survive the wire is dropped before the phone
    /// sees it.
    pub fn push(&self, payload: Payload, expect_receipt: bool) {
        let mut state = self.lock();
        let Some(callbacks) = state.callbacks.clone() else {
            tracing::debug!("push before attach dropped");
            return;
        };

        let payload = match state.carry(&payload) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(error = %e, "push lost on the wire");
                return;
            },
        };

        let reply = expect_receipt.then(|| {
            let companion = self.clone();
            Box::new(move |receipt: Payload| {
                let mut state = companion.lock();
                match state.carry(&receipt) {
                    Ok(receipt) if receipt.get_bool(keys::RECEIVED) == Some(true) => {
                        state.receipts += 1;
                    },
                    Ok(_) => tracing::debug!("receipt without received flag ignored"),
                    Err(e) => tracing::warn!(error = %e, "receipt lost on the wire"),
                }
            }) as pulselink_app::ReplyHandler
        });
        callbacks.message_received(payload, reply);
    }

    /// Workout the companion believes is running.
    pub fn workout(&self) -> Option<String> {
        self.lock().workout.clone()
    }

    /// Number of activation requests seen.
    pub fn activations(&self) -> usize {
        self.lock().activations
    }

    /// Number of commands the transport was asked to send.
    pub fn sends(&self) -> usize {
        self.lock().sends
    }

    /// Number of receipts returned for pushes.
    pub fn receipts(&self) -> usize {
        self.lock().receipts
    }

    /// Total encoded bytes carried in either direction.
    pub fn wire_bytes(&self) -> usize {
        self.lock().wire_bytes
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned (a thread panicked while
    /// holding the lock). Acceptable for simulation code.
    #[allow(clippy::expect_used)]
    fn lock(&self) -> MutexGuard<'_, CompanionState> {
        self.state.lock().expect("Mutex poisoned")
    }
}

impl CompanionState {
    fn advance(&mut self) {
        let drift: f64 = self.rng.gen_range(-4.0..4.0);
        self.heart_rate = (self.heart_rate + drift).clamp(50.0, 190.0);
        self.steps += self.rng.gen_range(0..40);
        self.active_energy += self.rng.gen_range(0.0..1.5);
        self.distance += self.rng.gen_range(0.0..0.03);
    }

    fn current(&self) -> MetricUpdate {
        MetricUpdate {
            heart_rate: Some(self.heart_rate),
            steps: Some(self.steps),
            active_energy: Some(self.active_energy),
            distance: Some(self.distance),
        }
    }

    /// Encode `payload`, count its bytes and decode it on the far side.
    fn carry(&mut self, payload: &Payload) -> Result<Payload, ProtocolError> {
        let bytes = payload.to_bytes()?;
        self.wire_bytes += bytes.len();
        Payload::decode(&bytes)
    }

    /// Command over the wire, answer, answer back over the wire.
    fn exchange(&mut self, payload: &Payload) -> Result<Payload, ProtocolError> {
        let received = self.carry(payload)?;
        let reply = self.answer(&received)?;
        self.carry(&reply)
    }

    fn answer(&mut self, payload: &Payload) -> Result<Payload, ProtocolError> {
        let command = Command::from_payload(payload)?;

        let reply = match command {
            Command::StartWorkout { workout_type } => {
                if self.config.reject_start {
                    Payload::acknowledgment(false)
                } else {
                    self.workout = Some(workout_type);
                    Payload::acknowledgment(true)
                }
            },
            Command::StopWorkout => {
                self.workout = None;
                Payload::acknowledgment(true)
            },
            Command::RequestSnapshot => {
                self.advance();
                self.current().to_payload()
            },
        };
        Ok(reply)
    }
}

/// Transport endpoint backed by a [`SimCompanion`].
pub struct SimTransport {
    companion: SimCompanion,
}

impl Transport for SimTransport {
    fn attach(&mut self, callbacks: Callbacks) {
        self.companion.lock().callbacks = Some(callbacks);
    }

    fn is_supported(&self) -> bool {
        self.companion.lock().config.supported
    }

    fn activate(&mut self) {
        let mut state = self.companion.lock();
        state.activations += 1;

        let Some(callbacks) = state.callbacks.clone() else {
            return;
        };
        callbacks.activation_completed(state.config.activation_error.clone());
        callbacks.install_state_changed(state.config.installed);
        callbacks.reachability_changed(state.config.reachable);
    }

    fn send_message(&mut self, request_id: RequestId, payload: Payload) {
        let mut state = self.companion.lock();
        state.sends += 1;

        let Some(callbacks) = state.callbacks.clone() else {
            return;
        };

        if state.config.fail_sends {
            callbacks.send_failed(request_id, "simulated delivery failure");
            return;
        }
        if state.config.drop_replies {
            tracing::debug!(%request_id, "companion dropped command");
            return;
        }

        match state.exchange(&payload) {
            Ok(reply) => callbacks.reply_received(request_id, reply),
            Err(e) => callbacks.send_failed(request_id, e.to_string()),
        }
    }
}
