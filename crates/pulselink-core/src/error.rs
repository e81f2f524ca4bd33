//! Error types for the sync channel.
//!
//! Every failure in this crate ends the operation that caused it and nothing
//! else: errors are reported to the caller of that operation and logged, the
//! process keeps running and channel state stays as it was.

use std::time::Duration;

use pulselink_proto::Action;
use thiserror::Error;

/// Coarse error classification shared by the sync channel and the health
/// profile manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Command attempted while the companion was not reachable.
    Unreachable,
    /// Underlying send, activation or store call failed.
    TransportFailure,
    /// Companion answered but declined the command.
    CommandRejected,
    /// Health-data store authorization not granted.
    AuthorizationDenied,
    /// Outstanding command exceeded the configured timeout.
    Timeout,
    /// Health data is not available on this device.
    Unavailable,
}

/// Errors reported for a single command.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// Companion not reachable; no transport call was made
    #[error("companion device is not reachable")]
    Unreachable,

    /// Send failed or the channel runtime is gone
    #[error("transport failure: {reason}")]
    TransportFailure {
        /// Underlying diagnostic
        reason: String,
    },

    /// Companion replied without a positive acknowledgment
    #[error("companion rejected {action}")]
    CommandRejected {
        /// Rejected command selector
        action: Action,
    },

    /// No reply arrived in time
    #[error("{action} timed out after {elapsed:?}")]
    Timeout {
        /// Command selector that timed out
        action: Action,
        /// How long we waited
        elapsed: Duration,
    },
}

impl SyncError {
    /// Classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unreachable => ErrorKind::Unreachable,
            Self::TransportFailure { .. } => ErrorKind::TransportFailure,
            Self::CommandRejected { .. } => ErrorKind::CommandRejected,
            Self::Timeout { .. } => ErrorKind::Timeout,
        }
    }

    /// Returns true if re-issuing the same command may succeed.
    ///
    /// Nothing retries automatically; this only informs the caller. A
    /// rejection is a decision by the companion and is never transient, and
    /// an unreachable companion has to come back first.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::TransportFailure { .. } | Self::Timeout { .. })
    }
}
