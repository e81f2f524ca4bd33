//! Transport trait for abstracting the companion link.
//!
//! The [`Transport`] trait decouples the runtime from the platform's pairing
//! API. Calls into the transport are fire-and-forget; everything the platform
//! reports later, on whatever task it likes, comes back through
//! [`Callbacks`] and is applied by the runtime in delivery order.

use pulselink_core::RequestId;
use pulselink_proto::Payload;
use tokio::sync::mpsc;

use crate::runtime::Inbound;

/// One-shot answer slot attached to an inbound message.
pub type ReplyHandler = Box<dyn FnOnce(Payload) + Send>;

/// Notifications a transport reports back to the runtime.
pub enum TransportEvent {
    /// Activation attempt finished.
    ActivationCompleted {
        /// Diagnostic if the platform reported an error.
        error: Option<String>,
    },
    /// Companion reachability changed.
    ReachabilityChanged(bool),
    /// Companion install state changed.
    InstallStateChanged(bool),
    /// Session marked inactive.
    SessionBecameInactive,
    /// Session torn down.
    SessionDeactivated,
    /// Companion answered a command.
    ReplyReceived {
        /// Command being answered.
        request_id: RequestId,
        /// Reply payload.
        payload: Payload,
    },
    /// Command could not be delivered.
    SendFailed {
        /// Command that failed.
        request_id: RequestId,
        /// Underlying diagnostic.
        reason: String,
    },
    /// Companion pushed data.
    MessageReceived {
        /// Pushed payload.
        payload: Payload,
        /// Present if the companion waits for a receipt.
        reply: Option<ReplyHandler>,
    },
}

impl std::fmt::Debug for TransportEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ActivationCompleted { error } => {
                f.debug_struct("ActivationCompleted").field("error", error).finish()
            },
            Self::ReachabilityChanged(reachable) => {
                f.debug_tuple("ReachabilityChanged").field(reachable).finish()
            },
            Self::InstallStateChanged(installed) => {
                f.debug_tuple("InstallStateChanged").field(installed).finish()
            },
            Self::SessionBecameInactive => f.write_str("SessionBecameInactive"),
            Self::SessionDeactivated => f.write_str("SessionDeactivated"),
            Self::ReplyReceived { request_id, payload } => f
                .debug_struct("ReplyReceived")
                .field("request_id", request_id)
                .field("payload", payload)
                .finish(),
            Self::SendFailed { request_id, reason } => f
                .debug_struct("SendFailed")
                .field("request_id", request_id)
                .field("reason", reason)
                .finish(),
            Self::MessageReceived { payload, reply } => f
                .debug_struct("MessageReceived")
                .field("payload", payload)
                .field("expects_reply", &reply.is_some())
                .finish(),
        }
    }
}

/// Clonable handle a transport uses to report events.
///
/// Safe to call from any task or thread. Events reported after the runtime
/// stopped are dropped.
#[derive(Clone)]
pub struct Callbacks {
    inbox: mpsc::UnboundedSender<Inbound>,
}

impl Callbacks {
    pub(crate) fn new(inbox: mpsc::UnboundedSender<Inbound>) -> Self {
        Self { inbox }
    }

    /// Report a transport event.
    pub fn report(&self, event: TransportEvent) {
        if self.inbox.send(Inbound::Transport(event)).is_err() {
            tracing::trace!("transport event after runtime shutdown dropped");
        }
    }

    /// Activation finished, optionally with an error.
    pub fn activation_completed(&self, error: Option<String>) {
        self.report(TransportEvent::ActivationCompleted { error });
    }

    /// Reachability changed.
    pub fn reachability_changed(&self, reachable: bool) {
        self.report(TransportEvent::ReachabilityChanged(reachable));
    }

    /// Install state changed.
    pub fn install_state_changed(&self, installed: bool) {
        self.report(TransportEvent::InstallStateChanged(installed));
    }

    /// Session became inactive.
    pub fn session_became_inactive(&self) {
        self.report(TransportEvent::SessionBecameInactive);
    }

    /// Session was deactivated.
    pub fn session_deactivated(&self) {
        self.report(TransportEvent::SessionDeactivated);
    }

    /// Reply to a transmitted command arrived.
    pub fn reply_received(&self, request_id: RequestId, payload: Payload) {
        self.report(TransportEvent::ReplyReceived { request_id, payload });
    }

    /// Transmitted command failed.
    pub fn send_failed(&self, request_id: RequestId, reason: impl Into<String>) {
        self.report(TransportEvent::SendFailed { request_id, reason: reason.into() });
    }

    /// Companion pushed a message.
    pub fn message_received(&self, payload: Payload, reply: Option<ReplyHandler>) {
        self.report(TransportEvent::MessageReceived { payload, reply });
    }
}

/// Platform pairing API as seen by the runtime.
///
/// Only the runtime task calls into the transport, so implementations need
/// no internal locking for that. None of the methods may block.
///
/// # Implementations
///
/// - **Simulation**: `SimTransport` in `pulselink-harness`, backed by a
///   scripted companion
/// - **Device**: a wrapper over the platform's session API
pub trait Transport: Send + 'static {
    /// Store the callbacks used for every later report.
    ///
    /// Called once by the runtime before any other method.
    fn attach(&mut self, callbacks: Callbacks);

    /// Whether pairing is supported on this platform at all.
    fn is_supported(&self) -> bool;

    /// Begin session activation; completion is reported through callbacks.
    fn activate(&mut self);

    /// Send a command; the reply or a failure is reported through callbacks
    /// tagged with `request_id`.
    fn send_message(&mut self, request_id: RequestId, payload: Payload);
}
