//! Invariant checking for simulated sync runs.
//!
//! Invariants are properties that must hold after every step of a run,
//! whatever order callbacks, pushes and commands arrive in. Each check sees an
//! [`Observation`]: the channel snapshot before and after the step plus the
//! companion's own view.
//!
//! # Usage
//!
//! ```ignore
//! let registry = InvariantRegistry::standard();
//! registry.assert_all(&observation, "after push");
//! ```

mod checks;

use pulselink_core::ChannelSnapshot;

pub use checks::{MetricsRetained, SessionNeverReturnsToIdle, WorkoutAcknowledged};

/// What a check can see after one step.
#[derive(Debug, Clone)]
pub struct Observation {
    /// Channel state before the step
    pub before: ChannelSnapshot,
    /// Channel state after the step
    pub after: ChannelSnapshot,
    /// Workout the companion believes is running
    pub companion_workout: Option<String>,
}

/// Invariant check result.
pub type InvariantResult = Result<(), Violation>;

/// Invariant violation with context.
#[derive(Debug, Clone)]
pub struct Violation {
    /// Name of the violated invariant.
    pub invariant: &'static str,
    /// Description of what went wrong.
    pub message: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.invariant, self.message)
    }
}

impl std::error::Error for Violation {}

/// A property checked against every [`Observation`].
pub trait Invariant: Send + Sync {
    /// Invariant name for error reporting.
    fn name(&self) -> &'static str;

    /// Check the invariant against one step.
    fn check(&self, observation: &Observation) -> InvariantResult;
}

/// Registry of invariants to check.
pub struct InvariantRegistry {
    invariants: Vec<Box<dyn Invariant>>,
}

impl Default for InvariantRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl InvariantRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self { invariants: Vec::new() }
    }

    /// Registry with every standard sync invariant.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.add(MetricsRetained);
        registry.add(SessionNeverReturnsToIdle);
        registry.add(WorkoutAcknowledged);
        registry
    }

    /// Add an invariant to the registry.
    pub fn add<I: Invariant + 'static>(&mut self, invariant: I) {
        self.invariants.push(Box::new(invariant));
    }

    /// Check all invariants.
    ///
    /// Returns `Ok(())` if all hold, or every violation found.
    pub fn check_all(&self, observation: &Observation) -> Result<(), Vec<Violation>> {
        let violations: Vec<_> =
            self.invariants.iter().filter_map(|inv| inv.check(observation).err()).collect();

        if violations.is_empty() { Ok(()) } else { Err(violations) }
    }

    /// Check all invariants, panicking with every violation found.
    ///
    /// Use this in tests where you want immediate failure with context.
    ///
    /// # Panics
    ///
    /// Panics if any invariant is violated.
    #[allow(clippy::panic)]
    pub fn assert_all(&self, observation: &Observation, context: &str) {
        if let Err(violations) = self.check_all(observation) {
            let messages: Vec<_> = violations.iter().map(ToString::to_string).collect();
            panic!("Invariant violation {context}:\n  {}", messages.join("\n  "));
        }
    }

    /// Number of registered invariants.
    pub fn len(&self) -> usize {
        self.invariants.len()
    }

    /// Check if registry is empty.
    pub fn is_empty(&self) -> bool {
        self.invariants.is_empty()
    }
}
