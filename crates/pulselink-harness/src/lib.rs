//! Deterministic simulation harness for PulseLink sync testing.
//!
//! A scripted companion implements the transport trait, so the production
//! runtime and state machine run unchanged under tokio's virtual clock.
//!
//! # Invariant Testing
//!
//! The `invariants` module checks behavioral properties after every settle
//! point of a run. Use [`InvariantRegistry::standard()`] for the common sync
//! invariants.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod invariants;
pub mod sim_companion;
pub mod sim_driver;

pub use invariants::{
    Invariant, InvariantRegistry, InvariantResult, MetricsRetained, Observation,
    SessionNeverReturnsToIdle, Violation, WorkoutAcknowledged,
};
pub use sim_companion::{DEFAULT_SEED, SimCompanion, SimCompanionConfig, SimTransport};
pub use sim_driver::SimDriver;
