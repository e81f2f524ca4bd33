//! Observable channel state.
//!
//! These are the values the presentation layer renders. The sync channel is
//! their only writer; observers receive cloned [`ChannelSnapshot`]s.

use pulselink_proto::MetricUpdate;

use crate::SessionState;

/// Pairing status reported by the transport.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectionStatus {
    /// Companion app is installed on the paired device.
    pub installed: bool,
    /// Companion can currently receive messages.
    pub reachable: bool,
}

/// Workout session running on the companion.
///
/// The workout type is present exactly when a session is active. The type is
/// the only field, so the two can never disagree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkoutSession {
    workout_type: Option<String>,
}

impl WorkoutSession {
    /// No workout running.
    pub fn inactive() -> Self {
        Self { workout_type: None }
    }

    /// Workout of the given type running.
    pub fn active(workout_type: impl Into<String>) -> Self {
        Self { workout_type: Some(workout_type.into()) }
    }

    /// Whether a workout is running.
    pub fn is_active(&self) -> bool {
        self.workout_type.is_some()
    }

    /// Running workout type. `None` if inactive.
    pub fn workout_type(&self) -> Option<&str> {
        self.workout_type.as_deref()
    }
}

/// Latest known metric values. `None` until the first update carrying the
/// field.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MetricSnapshot {
    /// Heart rate in beats per minute.
    pub heart_rate: Option<f64>,
    /// Step count.
    pub steps: Option<i64>,
    /// Active energy in kilocalories.
    pub active_energy: Option<f64>,
    /// Distance in kilometres.
    pub distance: Option<f64>,
}

impl MetricSnapshot {
    /// Merge the fields present in `update`, leaving the others untouched.
    ///
    /// Returns `true` if any stored value changed.
    pub fn apply(&mut self, update: &MetricUpdate) -> bool {
        let before = *self;

        if let Some(heart_rate) = update.heart_rate {
            self.heart_rate = Some(heart_rate);
        }
        if let Some(steps) = update.steps {
            self.steps = Some(steps);
        }
        if let Some(active_energy) = update.active_energy {
            self.active_energy = Some(active_energy);
        }
        if let Some(distance) = update.distance {
            self.distance = Some(distance);
        }

        *self != before
    }
}

/// Everything an observer can see, captured at one instant.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChannelSnapshot {
    /// Transport session lifecycle state.
    pub session: SessionState,
    /// Installation and reachability flags.
    pub connection: ConnectionStatus,
    /// Current workout session.
    pub workout: WorkoutSession,
    /// Latest metrics.
    pub metrics: MetricSnapshot,
}
