//! Transport session lifecycle.
//!
//! ```text
//! ┌──────┐ activate ┌────────────┐ completion (ok or error) ┌────────┐
//! │ Idle │─────────>│ Activating │─────────────────────────>│ Active │
//! └──────┘          └────────────┘                          └────────┘
//!                         ^                                  │      ^
//!                         │ auto-reactivate         inactive │      │ completion
//!                         │                                  v      │
//!                   ┌─────────────┐    deactivated    ┌───────────────────┐
//!                   │ Deactivated │<──────────────────│ InactiveTransient │
//!                   └─────────────┘                   └───────────────────┘
//! ```
//!
//! There is no terminal state. Deactivation always re-issues activation, so a
//! channel keeps trying for as long as its host process runs.

use std::fmt;

/// Lifecycle state of the underlying transport session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Nothing requested yet
    #[default]
    Idle,
    /// Activation requested, completion not yet reported
    Activating,
    /// Activation completed (possibly with a reported error)
    Active,
    /// Platform reported the session inactive; a deactivation usually follows
    InactiveTransient,
    /// Platform tore the session down; published once, then reactivated
    Deactivated,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Activating => "activating",
            Self::Active => "active",
            Self::InactiveTransient => "inactive",
            Self::Deactivated => "deactivated",
        };
        f.write_str(name)
    }
}
