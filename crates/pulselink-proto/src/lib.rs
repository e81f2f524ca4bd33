//! PulseLink message contract.
//!
//! Messages exchanged with the paired companion device are flat key-value
//! maps. This crate defines that contract independently of any transport:
//!
//! - [`Payload`]: ordered map of text keys to scalar [`Value`]s, with CBOR
//!   encoding for transports that carry bytes.
//! - [`Command`]: outbound commands (start/stop workout, request snapshot) and
//!   their `action` selector.
//! - [`MetricUpdate`]: the metric fields an inbound reply or push carries.
//!
//! # Invariants
//!
//! Decoding metrics is lenient per field: a key with an unexpected type is
//! ignored without discarding the rest of the payload. Decoding commands is
//! strict, since a companion must not act on a malformed request.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod command;
pub mod errors;
pub mod keys;
pub mod payload;
pub mod update;
pub mod value;

pub use command::{Action, Command};
pub use errors::{ProtocolError, Result};
pub use payload::Payload;
pub use update::MetricUpdate;
pub use value::Value;
