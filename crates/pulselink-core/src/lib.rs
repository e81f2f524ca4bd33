//! PulseLink core logic.
//!
//! Sans-IO state for keeping a workout companion in sync:
//!
//! - [`SyncChannel`]: transport session lifecycle, pairing status, workout
//!   session and metrics, driven by [`ChannelEvent`]s and answering with
//!   [`ChannelAction`]s.
//! - [`health`]: body profile read from and written to a health-data store.
//!
//! Nothing here performs I/O or reads a clock. The runtime in `pulselink-app`
//! owns a [`SyncChannel`] and executes its actions.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod channel;
pub mod env;
pub mod error;
pub mod health;
pub mod session;
pub mod state;

pub use channel::{
    ChannelAction, ChannelConfig, ChannelEvent, DEFAULT_COMMAND_TIMEOUT, DEFAULT_TICK_INTERVAL,
    LogLevel, ReplyToken, RequestId, SyncChannel,
};
pub use env::Environment;
pub use error::{ErrorKind, SyncError};
pub use health::{HealthError, HealthProfile, HealthStore, MemoryHealthStore, UserProfile};
pub use session::SessionState;
pub use state::{ChannelSnapshot, ConnectionStatus, MetricSnapshot, WorkoutSession};
