//! Single-owner runtime for the sync channel.
//!
//! The Runtime owns the [`SyncChannel`] and the [`Transport`] and is the only
//! code that touches either. Everything else talks to it through one
//! unbounded queue:
//! - [`ChannelHandle`]: commands and activation from the application
//! - [`Callbacks`]: reports from the transport
//!
//! Messages are applied strictly in the order they were enqueued. A periodic
//! tick drives command timeouts.

use std::collections::HashMap;

use pulselink_core::{
    ChannelAction, ChannelConfig, ChannelEvent, ChannelSnapshot, Environment, LogLevel,
    ReplyToken, RequestId, SyncChannel, SyncError,
};
use pulselink_proto::{Command, Payload};
use tokio::sync::{mpsc, oneshot, watch};

use crate::{
    ChannelHandle, Transport,
    transport::{Callbacks, ReplyHandler, TransportEvent},
};

/// Everything the runtime's queue carries.
pub(crate) enum Inbound {
    Activate,
    Command { command: Command, respond: oneshot::Sender<Result<(), SyncError>> },
    Transport(TransportEvent),
    Shutdown,
}

/// Runtime that serializes all channel work onto one task.
///
/// # Type Parameters
///
/// - `T`: Companion transport
/// - `E`: Environment providing time
pub struct Runtime<T, E>
where
    T: Transport,
    E: Environment,
{
    channel: SyncChannel<E::Instant>,
    transport: T,
    env: E,
    inbox: mpsc::UnboundedReceiver<Inbound>,
    snapshots: watch::Sender<ChannelSnapshot>,
    responders: HashMap<RequestId, oneshot::Sender<Result<(), SyncError>>>,
    reply_handlers: HashMap<ReplyToken, ReplyHandler>,
    next_request_id: u64,
    next_reply_token: u64,
}

impl<T, E> Runtime<T, E>
where
    T: Transport,
    E: Environment,
{
    /// Create a runtime and the handle that drives it.
    ///
    /// The transport receives its [`Callbacks`] here, before any activation.
    pub fn new(mut transport: T, env: E, config: ChannelConfig) -> (Self, ChannelHandle) {
        let (tx, inbox) = mpsc::unbounded_channel();
        let channel = SyncChannel::new(config);
        let (snapshots, observer) = watch::channel(channel.snapshot());

        transport.attach(Callbacks::new(tx.clone()));

        let runtime = Self {
            channel,
            transport,
            env,
            inbox,
            snapshots,
            responders: HashMap::new(),
            reply_handlers: HashMap::new(),
            next_request_id: 0,
            next_reply_token: 0,
        };
        (runtime, ChannelHandle::new(tx, observer))
    }

    /// Run until [`ChannelHandle::shutdown`] is called or every sender is
    /// gone.
    ///
    /// Commands still outstanding when the loop ends resolve with
    /// `SyncError::TransportFailure`.
    pub async fn run(mut self) {
        let tick_interval = self.channel.config().tick_interval;
        let mut last_tick = self.env.now();

        loop {
            let since_tick = self.env.now() - last_tick;
            let until_tick = tick_interval.saturating_sub(since_tick);

            tokio::select! {
                message = self.inbox.recv() => {
                    match message {
                        Some(Inbound::Shutdown) | None => break,
                        Some(message) => self.process(message),
                    }
                },
                () = self.env.sleep(until_tick) => {},
            }

            let now = self.env.now();
            if now - last_tick >= tick_interval {
                last_tick = now;
                self.dispatch(ChannelEvent::Tick { now });
            }
        }

        tracing::debug!(outstanding = self.responders.len(), "sync runtime stopped");
    }

    fn process(&mut self, message: Inbound) {
        let event = match message {
            Inbound::Activate => {
                ChannelEvent::Activate { supported: self.transport.is_supported() }
            },
            Inbound::Command { command, respond } => {
                self.next_request_id += 1;
                let request_id = RequestId(self.next_request_id);
                self.responders.insert(request_id, respond);
                ChannelEvent::SendCommand { request_id, command, now: self.env.now() }
            },
            Inbound::Transport(event) => self.translate(event),
            Inbound::Shutdown => return,
        };
        self.dispatch(event);
    }

    fn translate(&mut self, event: TransportEvent) -> ChannelEvent<E::Instant> {
        match event {
            TransportEvent::ActivationCompleted { error } => {
                ChannelEvent::ActivationCompleted { error }
            },
            TransportEvent::ReachabilityChanged(reachable) => {
                ChannelEvent::ReachabilityChanged { reachable }
            },
            TransportEvent::InstallStateChanged(installed) => {
                ChannelEvent::InstallStateChanged { installed }
            },
            TransportEvent::SessionBecameInactive => ChannelEvent::SessionBecameInactive,
            TransportEvent::SessionDeactivated => ChannelEvent::SessionDeactivated,
            TransportEvent::ReplyReceived { request_id, payload } => {
                ChannelEvent::ReplyReceived { request_id, payload }
            },
            TransportEvent::SendFailed { request_id, reason } => {
                ChannelEvent::SendFailed { request_id, reason }
            },
            TransportEvent::MessageReceived { payload, reply } => {
                let reply = reply.map(|handler| {
                    self.next_reply_token += 1;
                    let token = ReplyToken(self.next_reply_token);
                    self.reply_handlers.insert(token, handler);
                    token
                });
                ChannelEvent::MessageReceived { payload, reply }
            },
        }
    }

    fn dispatch(&mut self, event: ChannelEvent<E::Instant>) {
        let actions = self.channel.handle(event);
        for action in actions {
            self.execute(action);
        }
    }

    fn execute(&mut self, action: ChannelAction) {
        match action {
            ChannelAction::ActivateTransport => self.transport.activate(),
            ChannelAction::Transmit { request_id, payload } => {
                self.transport.send_message(request_id, payload);
            },
            ChannelAction::Acknowledge { token, payload } => self.acknowledge(token, payload),
            ChannelAction::CommandFinished { request_id, action, result } => {
                let Some(respond) = self.responders.remove(&request_id) else {
                    tracing::warn!(%request_id, %action, "finished command had no waiter");
                    return;
                };
                if respond.send(result).is_err() {
                    tracing::debug!(%request_id, %action, "command waiter went away");
                }
            },
            ChannelAction::Publish => {
                self.snapshots.send_replace(self.channel.snapshot());
            },
            ChannelAction::Reactivate => {
                let supported = self.transport.is_supported();
                self.dispatch(ChannelEvent::Activate { supported });
            },
            ChannelAction::Log { level, message } => match level {
                LogLevel::Debug => tracing::debug!("{message}"),
                LogLevel::Info => tracing::info!("{message}"),
                LogLevel::Warn => tracing::warn!("{message}"),
                LogLevel::Error => tracing::error!("{message}"),
            },
        }
    }

    fn acknowledge(&mut self, token: ReplyToken, payload: Payload) {
        match self.reply_handlers.remove(&token) {
            Some(handler) => handler(payload),
            None => tracing::warn!(token = token.0, "no reply handler for acknowledgment"),
        }
    }
}
