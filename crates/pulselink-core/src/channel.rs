//! Companion sync channel state machine.
//!
//! Tracks the transport session, pairing status, the workout session and the
//! latest metrics. Uses the action pattern: [`SyncChannel::handle`] consumes a
//! [`ChannelEvent`] and returns [`ChannelAction`]s for the runtime to execute.
//! The state machine does no I/O and never reads the clock; time arrives
//! inside events.
//!
//! # Command flow
//!
//! ```text
//!  SendCommand ──reachable?──no──> CommandFinished(Err(Unreachable))
//!                   │
//!                  yes
//!                   v
//!              Transmit ──> pending ──ReplyReceived──> apply + CommandFinished
//!                              │
//!                              ├──SendFailed──> CommandFinished(Err(TransportFailure))
//!                              └──Tick past timeout──> CommandFinished(Err(Timeout))
//! ```
//!
//! Events are applied strictly in the order they are handed in. Replies are
//! matched to commands by [`RequestId`], so a reply that arrives after its
//! command already finished is logged and dropped.

use std::{
    collections::BTreeMap,
    fmt,
    ops::Sub,
    time::{Duration, Instant},
};

use pulselink_proto::{Action, Command, MetricUpdate, Payload};

use crate::{
    ChannelSnapshot, ConnectionStatus, MetricSnapshot, SessionState, SyncError, WorkoutSession,
};

/// Time an outstanding command may wait for its reply.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(10);

/// Interval at which the runtime feeds [`ChannelEvent::Tick`].
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(250);

/// Channel configuration
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Bound on the wait for a command reply
    pub command_timeout: Duration,
    /// Tick period (should be well below `command_timeout`)
    pub tick_interval: Duration,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self { command_timeout: DEFAULT_COMMAND_TIMEOUT, tick_interval: DEFAULT_TICK_INTERVAL }
    }
}

/// Identifies one transmitted command and its reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identifies the reply slot of an inbound message that expects an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReplyToken(pub u64);

/// Events fed into the channel.
///
/// Generic over `I` (Instant type) to support both production
/// (`std::time::Instant`) and simulation (`tokio::time::Instant`).
#[derive(Debug, Clone)]
pub enum ChannelEvent<I = Instant> {
    /// Application asks for the transport session to be established.
    Activate {
        /// Whether the platform supports companion pairing at all.
        supported: bool,
    },

    /// Transport finished an activation attempt.
    ActivationCompleted {
        /// Diagnostic if the platform reported an error.
        error: Option<String>,
    },

    /// Transport reported a reachability change.
    ReachabilityChanged {
        /// New reachability.
        reachable: bool,
    },

    /// Transport reported a companion install-state change.
    InstallStateChanged {
        /// New install state.
        installed: bool,
    },

    /// Platform marked the session inactive.
    SessionBecameInactive,

    /// Platform tore the session down.
    SessionDeactivated,

    /// Application wants to send a command.
    SendCommand {
        /// Identifier the reply will carry.
        request_id: RequestId,
        /// Command to send.
        command: Command,
        /// Current time, used for the reply deadline.
        now: I,
    },

    /// Companion answered a command.
    ReplyReceived {
        /// Command being answered.
        request_id: RequestId,
        /// Reply payload.
        payload: Payload,
    },

    /// Transport could not deliver a command.
    SendFailed {
        /// Command that failed.
        request_id: RequestId,
        /// Underlying diagnostic.
        reason: String,
    },

    /// Companion pushed data unprompted.
    MessageReceived {
        /// Pushed payload.
        payload: Payload,
        /// Reply slot, if the companion waits for a receipt.
        reply: Option<ReplyToken>,
    },

    /// Time tick for timeout processing.
    Tick {
        /// Current time from the environment.
        now: I,
    },
}

/// Log levels for channel diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug information
    Debug,
    /// Informational message
    Info,
    /// Warning
    Warn,
    /// Error
    Error,
}

/// Actions produced by the channel for the runtime to execute.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelAction {
    /// Ask the transport to (re)activate its session.
    ActivateTransport,

    /// Send a command payload to the companion.
    Transmit {
        /// Identifier to attach to the reply or failure.
        request_id: RequestId,
        /// Encoded command.
        payload: Payload,
    },

    /// Answer an inbound message's reply slot.
    Acknowledge {
        /// Reply slot from [`ChannelEvent::MessageReceived`].
        token: ReplyToken,
        /// Receipt payload.
        payload: Payload,
    },

    /// A command reached its final outcome.
    CommandFinished {
        /// Finished command.
        request_id: RequestId,
        /// Its selector.
        action: Action,
        /// Outcome.
        result: Result<(), SyncError>,
    },

    /// Observable state changed; publish a fresh snapshot.
    Publish,

    /// Session was torn down. Feed [`ChannelEvent::Activate`] back in once
    /// the `Deactivated` snapshot has been published.
    Reactivate,

    /// Diagnostic for the runtime's logger.
    Log {
        /// Severity.
        level: LogLevel,
        /// Message text.
        message: String,
    },
}

#[derive(Debug, Clone)]
struct PendingCommand<I> {
    command: Command,
    sent_at: I,
}

/// Companion sync channel state machine.
///
/// Pure state machine: no I/O, no clock, no callbacks. The runtime owning it
/// is the only writer of connection, workout and metric state.
#[derive(Debug, Clone)]
pub struct SyncChannel<I = Instant>
where
    I: Copy + Ord + Send + Sync + Sub<Output = Duration>,
{
    config: ChannelConfig,
    session: SessionState,
    connection: ConnectionStatus,
    workout: WorkoutSession,
    metrics: MetricSnapshot,
    /// Commands transmitted and still waiting for a reply, in send order.
    pending: BTreeMap<RequestId, PendingCommand<I>>,
}

impl<I> SyncChannel<I>
where
    I: Copy + Ord + Send + Sync + Sub<Output = Duration>,
{
    /// Create a channel in [`SessionState::Idle`] with default status flags.
    pub fn new(config: ChannelConfig) -> Self {
        Self {
            config,
            session: SessionState::Idle,
            connection: ConnectionStatus::default(),
            workout: WorkoutSession::inactive(),
            metrics: MetricSnapshot::default(),
            pending: BTreeMap::new(),
        }
    }

    /// Process an event and return actions.
    pub fn handle(&mut self, event: ChannelEvent<I>) -> Vec<ChannelAction> {
        match event {
            ChannelEvent::Activate { supported } => self.handle_activate(supported),
            ChannelEvent::ActivationCompleted { error } => self.handle_activation_completed(error),
            ChannelEvent::ReachabilityChanged { reachable } => {
                self.connection.reachable = reachable;
                let entry = log(LogLevel::Debug, format!("reachability changed: {reachable}"));
                vec![entry, ChannelAction::Publish]
            },
            ChannelEvent::InstallStateChanged { installed } => {
                self.connection.installed = installed;
                let entry = log(LogLevel::Debug, format!("install state changed: {installed}"));
                vec![entry, ChannelAction::Publish]
            },
            ChannelEvent::SessionBecameInactive => self.handle_inactive(),
            ChannelEvent::SessionDeactivated => self.handle_deactivated(),
            ChannelEvent::SendCommand { request_id, command, now } => {
                self.handle_send_command(request_id, command, now)
            },
            ChannelEvent::ReplyReceived { request_id, payload } => {
                self.handle_reply(request_id, &payload)
            },
            ChannelEvent::SendFailed { request_id, reason } => {
                self.handle_send_failed(request_id, reason)
            },
            ChannelEvent::MessageReceived { payload, reply } => {
                self.handle_inbound(&payload, reply)
            },
            ChannelEvent::Tick { now } => self.handle_tick(now),
        }
    }

    fn handle_activate(&mut self, supported: bool) -> Vec<ChannelAction> {
        if !supported {
            return vec![log(
                LogLevel::Warn,
                "companion pairing not supported on this platform, activation skipped",
            )];
        }

        if self.session == SessionState::Activating {
            return vec![log(LogLevel::Debug, "activation already in progress")];
        }

        self.session = SessionState::Activating;
        vec![ChannelAction::ActivateTransport, ChannelAction::Publish]
    }

    fn handle_activation_completed(&mut self, error: Option<String>) -> Vec<ChannelAction> {
        // The platform reports activation errors but keeps the session usable
        self.session = SessionState::Active;

        let entry = match error {
            Some(reason) => log(LogLevel::Error, format!("session activation failed: {reason}")),
            None => log(LogLevel::Info, "session activated"),
        };
        vec![entry, ChannelAction::Publish]
    }

    fn handle_inactive(&mut self) -> Vec<ChannelAction> {
        if self.session != SessionState::Active {
            return vec![log(
                LogLevel::Debug,
                format!("inactive report ignored in state {}", self.session),
            )];
        }

        self.session = SessionState::InactiveTransient;
        vec![log(LogLevel::Info, "session became inactive"), ChannelAction::Publish]
    }

    fn handle_deactivated(&mut self) -> Vec<ChannelAction> {
        self.session = SessionState::Deactivated;
        vec![
            log(LogLevel::Info, "session deactivated, reactivating"),
            ChannelAction::Publish,
            ChannelAction::Reactivate,
        ]
    }

    fn handle_send_command(
        &mut self,
        request_id: RequestId,
        command: Command,
        now: I,
    ) -> Vec<ChannelAction> {
        let action = command.action();

        if !self.connection.reachable {
            return vec![
                log(
                    LogLevel::Warn,
                    format!("{action} {request_id} not sent: companion unreachable"),
                ),
                finished(request_id, action, Err(SyncError::Unreachable)),
            ];
        }

        if self.pending.contains_key(&request_id) {
            return vec![finished(
                request_id,
                action,
                Err(SyncError::TransportFailure {
                    reason: format!("request {request_id} already outstanding"),
                }),
            )];
        }

        let payload = command.to_payload();
        self.pending.insert(request_id, PendingCommand { command, sent_at: now });

        vec![
            log(LogLevel::Debug, format!("sending {action} {request_id}")),
            ChannelAction::Transmit { request_id, payload },
        ]
    }

    fn handle_reply(&mut self, request_id: RequestId, payload: &Payload) -> Vec<ChannelAction> {
        let Some(pending) = self.pending.remove(&request_id) else {
            return vec![log(
                LogLevel::Warn,
                format!("reply for unknown or finished request {request_id} dropped"),
            )];
        };

        let action = pending.command.action();
        let mut actions = Vec::new();

        let result = match pending.command {
            Command::StartWorkout { workout_type } => {
                if payload.success() == Some(true) {
                    let session = WorkoutSession::active(workout_type);
                    if self.workout != session {
                        self.workout = session;
                        actions.push(ChannelAction::Publish);
                    }
                    Ok(())
                } else {
                    Err(SyncError::CommandRejected { action })
                }
            },
            Command::StopWorkout => {
                if payload.success() == Some(true) {
                    if self.workout.is_active() {
                        self.workout = WorkoutSession::inactive();
                        actions.push(ChannelAction::Publish);
                    }
                    Ok(())
                } else {
                    Err(SyncError::CommandRejected { action })
                }
            },
            Command::RequestSnapshot => {
                if self.metrics.apply(&MetricUpdate::from_payload(payload)) {
                    actions.push(ChannelAction::Publish);
                }
                Ok(())
            },
        };

        if let Err(e) = &result {
            actions.push(log(LogLevel::Warn, format!("{action} {request_id} failed: {e}")));
        }
        actions.push(finished(request_id, action, result));
        actions
    }

    fn handle_send_failed(&mut self, request_id: RequestId, reason: String) -> Vec<ChannelAction> {
        let Some(pending) = self.pending.remove(&request_id) else {
            return vec![log(
                LogLevel::Warn,
                format!("send failure for unknown or finished request {request_id} dropped"),
            )];
        };

        let action = pending.command.action();
        vec![
            log(LogLevel::Error, format!("failed to send {action} {request_id}: {reason}")),
            finished(request_id, action, Err(SyncError::TransportFailure { reason })),
        ]
    }

    fn handle_inbound(
        &mut self,
        payload: &Payload,
        reply: Option<ReplyToken>,
    ) -> Vec<ChannelAction> {
        let mut actions = Vec::new();

        let update = MetricUpdate::from_payload(payload);
        if update.is_empty() {
            actions.push(log(LogLevel::Debug, "push carried no metric fields"));
        } else if self.metrics.apply(&update) {
            actions.push(ChannelAction::Publish);
        }

        if let Some(token) = reply {
            actions.push(ChannelAction::Acknowledge { token, payload: Payload::receipt() });
        }

        actions
    }

    fn handle_tick(&mut self, now: I) -> Vec<ChannelAction> {
        let timeout = self.config.command_timeout;
        let expired: Vec<RequestId> = self
            .pending
            .iter()
            .filter(|(_, pending)| now - pending.sent_at > timeout)
            .map(|(id, _)| *id)
            .collect();

        let mut actions = Vec::new();
        for request_id in expired {
            let Some(pending) = self.pending.remove(&request_id) else {
                continue;
            };
            let action = pending.command.action();
            let elapsed = now - pending.sent_at;

            actions.push(log(LogLevel::Warn, format!("{action} {request_id} timed out")));
            actions.push(finished(request_id, action, Err(SyncError::Timeout { action, elapsed })));
        }
        actions
    }

    /// Transport session lifecycle state.
    pub fn session_state(&self) -> SessionState {
        self.session
    }

    /// Installation and reachability flags.
    pub fn connection(&self) -> ConnectionStatus {
        self.connection
    }

    /// Current workout session.
    pub fn workout(&self) -> &WorkoutSession {
        &self.workout
    }

    /// Latest metrics.
    pub fn metrics(&self) -> MetricSnapshot {
        self.metrics
    }

    /// Number of commands waiting for a reply.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Channel configuration.
    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    /// Clone of all observable state.
    pub fn snapshot(&self) -> ChannelSnapshot {
        ChannelSnapshot {
            session: self.session,
            connection: self.connection,
            workout: self.workout.clone(),
            metrics: self.metrics,
        }
    }
}

fn log(level: LogLevel, message: impl Into<String>) -> ChannelAction {
    ChannelAction::Log { level, message: message.into() }
}

fn finished(request_id: RequestId, action: Action, result: Result<(), SyncError>) -> ChannelAction {
    ChannelAction::CommandFinished { request_id, action, result }
}
