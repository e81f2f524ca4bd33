//! Standard invariant checks.

use pulselink_core::SessionState;

use super::{Invariant, InvariantResult, Observation, Violation};

/// A metric, once known, is never forgotten.
///
/// Updates only overwrite the fields they carry, so a field that was `Some`
/// before a step is still `Some` after it.
pub struct MetricsRetained;

impl Invariant for MetricsRetained {
    fn name(&self) -> &'static str {
        "metrics_retained"
    }

    fn check(&self, observation: &Observation) -> InvariantResult {
        let before = &observation.before.metrics;
        let after = &observation.after.metrics;

        let lost = [
            ("heart_rate", before.heart_rate.is_some() && after.heart_rate.is_none()),
            ("steps", before.steps.is_some() && after.steps.is_none()),
            ("active_energy", before.active_energy.is_some() && after.active_energy.is_none()),
            ("distance", before.distance.is_some() && after.distance.is_none()),
        ];

        match lost.iter().find(|(_, lost)| *lost) {
            Some((field, _)) => Err(Violation {
                invariant: self.name(),
                message: format!("{field} was known and is now unset"),
            }),
            None => Ok(()),
        }
    }
}

/// Once activation was requested the session never goes back to idle.
///
/// Deactivation re-issues activation, so there is no path back.
pub struct SessionNeverReturnsToIdle;

impl Invariant for SessionNeverReturnsToIdle {
    fn name(&self) -> &'static str {
        "session_never_returns_to_idle"
    }

    fn check(&self, observation: &Observation) -> InvariantResult {
        if observation.before.session != SessionState::Idle
            && observation.after.session == SessionState::Idle
        {
            return Err(Violation {
                invariant: self.name(),
                message: format!("session went {} -> idle", observation.before.session),
            });
        }
        Ok(())
    }
}

/// The channel only shows a workout the companion has started.
///
/// The channel may lag behind the companion (a reply was lost), never the
/// other way round.
pub struct WorkoutAcknowledged;

impl Invariant for WorkoutAcknowledged {
    fn name(&self) -> &'static str {
        "workout_acknowledged"
    }

    fn check(&self, observation: &Observation) -> InvariantResult {
        let shown = &observation.after.workout;
        if shown.is_active() && observation.companion_workout.is_none() {
            return Err(Violation {
                invariant: self.name(),
                message: format!(
                    "channel shows {:?} but the companion runs nothing",
                    shown.workout_type()
                ),
            });
        }
        Ok(())
    }
}
