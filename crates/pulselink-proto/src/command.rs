//! Outbound commands.
//!
//! | action           | extra keys    |
//! |------------------|---------------|
//! | `startWorkout`   | `workoutType` |
//! | `stopWorkout`    | none          |
//! | `getCurrentData` | none          |

use std::{fmt, str::FromStr};

use crate::{
    Payload,
    errors::{ProtocolError, Result},
    keys,
};

/// Command selector carried in the `action` key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Start a workout session on the companion.
    StartWorkout,
    /// Stop the running workout session.
    StopWorkout,
    /// Ask the companion for its current metrics.
    GetCurrentData,
}

impl Action {
    /// Wire name of this action.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::StartWorkout => "startWorkout",
            Self::StopWorkout => "stopWorkout",
            Self::GetCurrentData => "getCurrentData",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "startWorkout" => Ok(Self::StartWorkout),
            "stopWorkout" => Ok(Self::StopWorkout),
            "getCurrentData" => Ok(Self::GetCurrentData),
            other => Err(ProtocolError::UnknownAction(other.to_owned())),
        }
    }
}

/// Command sent to the companion device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Start a workout of the given type.
    StartWorkout {
        /// Workout type name, e.g. `"Running"`.
        workout_type: String,
    },
    /// Stop the current workout.
    StopWorkout,
    /// Request a metric snapshot.
    RequestSnapshot,
}

impl Command {
    /// Convenience constructor for [`Command::StartWorkout`].
    pub fn start_workout(workout_type: impl Into<String>) -> Self {
        Self::StartWorkout { workout_type: workout_type.into() }
    }

    /// Action selector for this command.
    pub fn action(&self) -> Action {
        match self {
            Self::StartWorkout { .. } => Action::StartWorkout,
            Self::StopWorkout => Action::StopWorkout,
            Self::RequestSnapshot => Action::GetCurrentData,
        }
    }

    /// Encode into a transport-neutral payload.
    pub fn to_payload(&self) -> Payload {
        let payload = Payload::new().with(keys::ACTION, self.action().as_str());
        match self {
            Self::StartWorkout { workout_type } => {
                payload.with(keys::WORKOUT_TYPE, workout_type.as_str())
            },
            Self::StopWorkout | Self::RequestSnapshot => payload,
        }
    }

    /// Parse a command from a received payload (companion side).
    ///
    /// # Errors
    ///
    /// - `ProtocolError::MissingField` if `action`, or `workoutType` for
    ///   `startWorkout`, is absent
    /// - `ProtocolError::WrongType` if either key is not text
    /// - `ProtocolError::UnknownAction` for an unrecognised selector
    pub fn from_payload(payload: &Payload) -> Result<Self> {
        let action: Action = required_str(payload, keys::ACTION)?.parse()?;

        match action {
            Action::StartWorkout => {
                let workout_type = required_str(payload, keys::WORKOUT_TYPE)?;
                Ok(Self::start_workout(workout_type))
            },
            Action::StopWorkout => Ok(Self::StopWorkout),
            Action::GetCurrentData => Ok(Self::RequestSnapshot),
        }
    }
}

fn required_str<'a>(payload: &'a Payload, key: &'static str) -> Result<&'a str> {
    let value = payload.get(key).ok_or(ProtocolError::MissingField(key))?;
    value.as_str().ok_or(ProtocolError::WrongType { key, expected: "text" })
}
