//! Application layer for PulseLink
//!
//! Runs the sans-IO sync channel on a single owner task and turns its state
//! into something a frontend can show.
//!
//! # Components
//!
//! - [`Runtime`]: drains one queue of handle requests and transport reports
//! - [`ChannelHandle`]: application-facing commands and state subscription
//! - [`Transport`]: trait for the platform pairing API
//! - [`Dashboard`]: presentation model built from a channel snapshot

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod handle;
mod runtime;
mod system_env;
mod transport;
pub mod view;

pub use handle::{ChannelHandle, CommandTicket};
pub use runtime::Runtime;
pub use system_env::SystemEnv;
pub use transport::{Callbacks, ReplyHandler, Transport, TransportEvent};
pub use view::{Dashboard, HealthStatus, WorkoutPicker};
