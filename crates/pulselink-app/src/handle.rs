//! Application-facing handle to a running [`Runtime`](crate::Runtime).

use pulselink_core::{ChannelSnapshot, SyncError};
use pulselink_proto::{Action, Command};
use tokio::sync::{mpsc, oneshot, watch};

use crate::runtime::Inbound;

/// Clonable handle for driving the sync channel and observing its state.
///
/// Every method is non-blocking: requests are queued for the runtime task.
#[derive(Clone)]
pub struct ChannelHandle {
    inbox: mpsc::UnboundedSender<Inbound>,
    snapshots: watch::Receiver<ChannelSnapshot>,
}

impl ChannelHandle {
    pub(crate) fn new(
        inbox: mpsc::UnboundedSender<Inbound>,
        snapshots: watch::Receiver<ChannelSnapshot>,
    ) -> Self {
        Self { inbox, snapshots }
    }

    /// Request session activation.
    ///
    /// A no-op (logged) on platforms without pairing support and while an
    /// activation is already in flight.
    pub fn activate(&self) {
        if self.inbox.send(Inbound::Activate).is_err() {
            tracing::warn!("activate requested after runtime shutdown");
        }
    }

    /// Queue a command for the companion.
    ///
    /// The returned ticket resolves once the command reaches its outcome.
    /// Dropping the ticket does not cancel the command.
    pub fn send_command(&self, command: Command) -> CommandTicket {
        let action = command.action();
        let (respond, outcome) = oneshot::channel();

        if self.inbox.send(Inbound::Command { command, respond }).is_err() {
            tracing::warn!(%action, "command issued after runtime shutdown");
        }
        CommandTicket { action, outcome }
    }

    /// Ask the companion to start a workout of `workout_type`.
    pub fn start_workout(&self, workout_type: impl Into<String>) -> CommandTicket {
        self.send_command(Command::start_workout(workout_type))
    }

    /// Ask the companion to stop the current workout.
    pub fn stop_workout(&self) -> CommandTicket {
        self.send_command(Command::StopWorkout)
    }

    /// Ask the companion for its current metrics.
    pub fn request_snapshot(&self) -> CommandTicket {
        self.send_command(Command::RequestSnapshot)
    }

    /// Receiver that is notified whenever observable state changes.
    pub fn subscribe(&self) -> watch::Receiver<ChannelSnapshot> {
        self.snapshots.clone()
    }

    /// Latest published state.
    pub fn snapshot(&self) -> ChannelSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Stop the runtime after the requests queued so far.
    pub fn shutdown(&self) {
        // Already stopped is fine
        let _ = self.inbox.send(Inbound::Shutdown);
    }
}

/// Pending outcome of one command.
#[derive(Debug)]
pub struct CommandTicket {
    action: Action,
    outcome: oneshot::Receiver<Result<(), SyncError>>,
}

impl CommandTicket {
    /// Selector of the command this ticket tracks.
    pub fn action(&self) -> Action {
        self.action
    }

    /// Wait for the command's outcome.
    ///
    /// # Errors
    ///
    /// - `SyncError::Unreachable` if the companion was not reachable
    /// - `SyncError::CommandRejected` if the companion declined
    /// - `SyncError::TransportFailure` if the send failed or the runtime
    ///   stopped first
    /// - `SyncError::Timeout` if no reply arrived in time
    pub async fn wait(self) -> Result<(), SyncError> {
        self.outcome.await.unwrap_or_else(|_| {
            Err(SyncError::TransportFailure { reason: "sync runtime stopped".to_owned() })
        })
    }
}
